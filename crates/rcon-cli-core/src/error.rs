//! Error types for rcon-cli

use std::path::PathBuf;
use thiserror::Error;

/// Result type for rcon-cli operations
pub type Result<T> = std::result::Result<T, RconError>;

/// rcon-cli error types
#[derive(Debug, Error)]
pub enum RconError {
    /// Configuration could not be obtained
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    /// Batch mode started without an address
    #[error("address is not set: to set address add -a host:port")]
    EmptyAddress,

    /// Batch mode started without a password
    #[error("password is not set: to set password add -p password")]
    EmptyPassword,

    /// A single command string was empty
    #[error("command is not set")]
    CommandEmpty,

    /// The batch itself was empty
    #[error("no commands to execute")]
    NoCommands,

    /// Establishing the remote console failed
    #[error("auth: {0}")]
    Dial(#[source] Box<RconError>),

    /// A remote command failed
    #[error("execute: {0}")]
    Execute(#[source] Box<RconError>),

    /// Transport level failure
    #[error("connection error: {0}")]
    Connection(String),

    /// The server rejected the credentials
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// Malformed or unexpected data from the server
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Deadline elapsed while dialing or waiting for a response
    #[error("timeout: {0}")]
    Timeout(String),

    /// Protocol tag outside of rcon/telnet/web
    #[error("unsupported protocol type {0:?}")]
    UnsupportedProtocol(String),

    /// Local I/O failure (output stream, input stream)
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl RconError {
    /// Wrap a dial failure
    pub fn dial(err: RconError) -> Self {
        RconError::Dial(Box::new(err))
    }

    /// Wrap a remote execution failure
    pub fn execute(err: RconError) -> Self {
        RconError::Execute(Box::new(err))
    }

    /// True for failures that happened while connecting rather than executing
    pub fn is_dial(&self) -> bool {
        matches!(self, RconError::Dial(_))
    }
}

/// Errors raised while reading the configuration file
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read
    #[error("read file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The executable location could not be determined
    #[error("locate executable: {0}")]
    Executable(#[source] std::io::Error),

    /// Extension other than `.yaml`, `.yml` or `.json`
    #[error("unsupported file extension {0}")]
    UnsupportedExtension(String),

    /// YAML syntax error
    #[error("parse yaml: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON syntax error
    #[error("parse json: {0}")]
    Json(#[from] serde_json::Error),

    /// Parsed fine but holds an invalid value
    #[error("config validation error: {0}")]
    Validation(String),
}

impl ConfigError {
    /// True when the underlying failure is a missing file
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ConfigError::Read { source, .. } if source.kind() == std::io::ErrorKind::NotFound
        )
    }
}

/// Errors raised by the request log sink
#[derive(Debug, Error)]
pub enum LogError {
    #[error("create directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("write: {0}")]
    Write(#[source] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrapped_messages() {
        let err = RconError::execute(RconError::Timeout("no response".into()));
        assert_eq!(err.to_string(), "execute: timeout: no response");

        let err = RconError::dial(RconError::AuthFailed("bad password".into()));
        assert_eq!(err.to_string(), "auth: authentication failed: bad password");
        assert!(err.is_dial());
    }

    #[test]
    fn test_not_found_detection() {
        let err = ConfigError::Read {
            path: PathBuf::from("missing.yaml"),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert!(err.is_not_found());
        assert!(!ConfigError::UnsupportedExtension(".ini".into()).is_not_found());
    }
}
