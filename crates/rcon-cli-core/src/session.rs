//! Session model: everything needed to talk to one remote server

use crate::error::RconError;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Dial and execute deadline used when the session does not set one
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Wire protocol used to reach the remote console
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Protocol {
    /// Source RCON (binary packets over TCP)
    #[default]
    Rcon,
    /// Line oriented telnet console
    Telnet,
    /// JSON messages over a WebSocket
    Web,
}

impl Protocol {
    /// All protocols, in the order they are presented to users
    pub const ALL: [Protocol; 3] = [Protocol::Rcon, Protocol::Web, Protocol::Telnet];

    /// Tag used on the command line and in config files
    pub fn as_str(self) -> &'static str {
        match self {
            Protocol::Rcon => "rcon",
            Protocol::Telnet => "telnet",
            Protocol::Web => "web",
        }
    }

    /// Whether one connection may serve several independent commands.
    ///
    /// WebRCON servers drop idle sockets between commands, so web handles
    /// are opened per batch unless keep-alive is requested.
    pub fn is_persistent(self) -> bool {
        !matches!(self, Protocol::Web)
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Protocol {
    type Err = RconError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rcon" => Ok(Protocol::Rcon),
            "telnet" => Ok(Protocol::Telnet),
            "web" => Ok(Protocol::Web),
            other => Err(RconError::UnsupportedProtocol(other.to_string())),
        }
    }
}

/// Connection details for one program invocation
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Session {
    /// Remote `host:port`; empty until resolved or prompted
    pub address: String,
    /// Shared secret; never logged
    pub password: String,
    /// Selected protocol; `None` means the default (`rcon`)
    pub protocol: Option<Protocol>,
    /// Request log file; `None` disables request logging
    pub log: Option<PathBuf>,
    /// Report remote failures and keep going instead of aborting the batch
    pub skip_errors: bool,
    /// Dial and execute deadline
    pub timeout: Option<Duration>,
}

impl Session {
    /// Create a session for an address and password
    pub fn new(address: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            password: password.into(),
            ..Default::default()
        }
    }

    /// Protocol that will actually be dialed
    pub fn protocol(&self) -> Protocol {
        self.protocol.unwrap_or_default()
    }

    /// Deadline that will actually be applied. Zero means unset.
    pub fn timeout(&self) -> Duration {
        self.timeout
            .filter(|t| !t.is_zero())
            .unwrap_or(DEFAULT_TIMEOUT)
    }

    /// Check the invariant required before dialing
    pub fn ensure_credentials(&self) -> Result<(), RconError> {
        if self.address.is_empty() {
            return Err(RconError::EmptyAddress);
        }
        if self.password.is_empty() {
            return Err(RconError::EmptyPassword);
        }
        Ok(())
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let password = if self.password.is_empty() { "" } else { "***" };
        f.debug_struct("Session")
            .field("address", &self.address)
            .field("password", &password)
            .field("protocol", &self.protocol)
            .field("log", &self.log)
            .field("skip_errors", &self.skip_errors)
            .field("timeout", &self.timeout)
            .finish()
    }
}
