//! rcon
//!
//! Sends commands to a remote console over one of three protocols:
//! - rcon: Source RCON (Minecraft, Factorio, Project Zomboid...)
//! - telnet: 7 Days to Die style line console
//! - web: WebRCON (Rust)
//!
//! Commands given as arguments run as one batch. Without commands the
//! program reads them from stdin until `:q`.

use anyhow::Result;
use clap::Parser;
use rcon_cli_core::{Config, Protocol, RconError, Session, resolve};
use rcon_cli_executor::Executor;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tokio::io::BufReader;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(
    name = "rcon",
    version,
    about = "CLI for executing queries on a remote server"
)]
struct Cli {
    /// Remote server address [host:port]
    #[arg(short, long, value_name = "HOST:PORT", default_value = "")]
    address: String,

    /// Remote server password
    #[arg(short, long, default_value = "", hide_default_value = true)]
    password: String,

    /// Protocol to use: rcon, telnet or web
    #[arg(short = 't', long = "type", value_name = "TYPE")]
    protocol: Option<Protocol>,

    /// Append every request and response to this file
    #[arg(short, long, value_name = "PATH")]
    log: Option<PathBuf>,

    /// Configuration file (defaults to rcon.yaml next to the executable)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Environment in the configuration file
    #[arg(short, long, value_name = "NAME")]
    env: Option<String>,

    /// Print remote errors and keep executing the remaining commands
    #[arg(short, long)]
    skip: bool,

    /// Dial and response timeout in seconds
    #[arg(short = 'T', long, value_name = "SECONDS")]
    timeout: Option<u64>,

    /// Keep web connections open between batches
    #[arg(long)]
    web_keep_alive: bool,

    /// Increase diagnostics on stderr (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Commands to execute; none starts the interactive mode
    #[arg(value_name = "COMMAND")]
    commands: Vec<String>,
}

impl Cli {
    fn explicit_session(&self) -> Session {
        Session {
            address: self.address.clone(),
            password: self.password.clone(),
            protocol: self.protocol,
            log: self.log.clone(),
            skip_errors: self.skip,
            timeout: self
                .timeout
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
        }
    }
}

fn init_logging(verbose: u8) -> Result<()> {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

/// Merge flags with the configuration file, which is skipped entirely when
/// both address and password were given
fn session(cli: &Cli) -> Result<Session, RconError> {
    let explicit = cli.explicit_session();
    if !explicit.address.is_empty() && !explicit.password.is_empty() {
        return Ok(explicit);
    }

    let config = Config::load(cli.config.as_deref())?;
    Ok(resolve(explicit, &config, cli.env.as_deref()))
}

async fn run(cli: &Cli, executor: &Executor) -> Result<(), RconError> {
    let mut session = session(cli)?;
    debug!("Resolved session: {:?}", session);

    if cli.commands.is_empty() {
        let mut input = BufReader::new(tokio::io::stdin());
        let mut out = tokio::io::stdout();
        return executor.interactive(&mut input, &mut out, &mut session).await;
    }

    session.ensure_credentials()?;
    let mut out = tokio::io::stdout();
    executor.execute(&mut out, &session, &cli.commands).await
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;

    info!("rcon {} starting", env!("CARGO_PKG_VERSION"));

    let executor = Executor::new().web_keep_alive(cli.web_keep_alive);
    let result = run(&cli, &executor).await;
    let closed = executor.close().await;

    if let Err(e) = result.and(closed) {
        eprintln!("{}", e);
        return Ok(ExitCode::FAILURE);
    }

    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_build_session() {
        let cli = Cli::parse_from([
            "rcon", "-a", "127.0.0.1:16260", "-p", "password", "-t", "web", "-s", "-T", "3",
            "players", "status",
        ]);
        let session = cli.explicit_session();

        assert_eq!(session.address, "127.0.0.1:16260");
        assert_eq!(session.protocol, Some(Protocol::Web));
        assert!(session.skip_errors);
        assert_eq!(session.timeout, Some(Duration::from_secs(3)));
        assert_eq!(cli.commands, vec!["players", "status"]);
    }

    #[test]
    fn test_zero_timeout_is_unset() {
        let cli = Cli::parse_from(["rcon", "-T", "0", "status"]);
        assert_eq!(cli.explicit_session().timeout, None);
    }

    #[test]
    fn test_unknown_type_rejected() {
        assert!(Cli::try_parse_from(["rcon", "-t", "ssh"]).is_err());
    }

    #[test]
    fn test_explicit_credentials_skip_config() {
        let cli = Cli::parse_from([
            "rcon", "-a", "127.0.0.1:16260", "-p", "password", "-c", "/nonexistent/rcon.json",
        ]);
        let session = session(&cli).unwrap();
        assert_eq!(session.address, "127.0.0.1:16260");
    }

    #[test]
    fn test_missing_named_config_fails() {
        let cli = Cli::parse_from(["rcon", "-c", "/nonexistent/rcon.yaml", "status"]);
        let err = session(&cli).unwrap_err();
        assert!(err.to_string().starts_with("config: "));
    }
}
