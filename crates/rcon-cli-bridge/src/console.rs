//! Remote console capability and protocol selection

use crate::rcon::RconClient;
use crate::telnet::TelnetClient;
use crate::web::WebClient;
use async_trait::async_trait;
use rcon_cli_core::{Protocol, Result};
use std::time::Duration;

/// An authenticated connection to a remote console
///
/// Implement this trait to add a new server protocol.
#[async_trait]
pub trait RemoteConsole: Send {
    /// Send one command and wait for its response
    async fn execute(&mut self, command: &str) -> Result<String>;

    /// Release the connection. Calling it again is a no-op.
    async fn close(&mut self) -> Result<()>;
}

/// Opens remote consoles for a protocol
#[async_trait]
pub trait Dialer: Send + Sync {
    /// Connect and authenticate, applying `timeout` to the attempt
    async fn dial(
        &self,
        protocol: Protocol,
        address: &str,
        password: &str,
        timeout: Duration,
    ) -> Result<Box<dyn RemoteConsole>>;
}

/// Dialer backed by real network connections
#[derive(Debug, Clone, Copy, Default)]
pub struct NetworkDialer;

#[async_trait]
impl Dialer for NetworkDialer {
    async fn dial(
        &self,
        protocol: Protocol,
        address: &str,
        password: &str,
        timeout: Duration,
    ) -> Result<Box<dyn RemoteConsole>> {
        let console: Box<dyn RemoteConsole> = match protocol {
            Protocol::Rcon => Box::new(RconClient::dial(address, password, timeout).await?),
            Protocol::Telnet => Box::new(TelnetClient::dial(address, password, timeout).await?),
            Protocol::Web => Box::new(WebClient::dial(address, password, timeout).await?),
        };
        Ok(console)
    }
}
