//! Telnet console client
//!
//! Line oriented CRLF protocol used by 7 Days to Die and similar servers.
//! The server has no response framing, so a response is whatever arrives
//! until the line stream goes quiet.

use crate::console::RemoteConsole;
use async_trait::async_trait;
use rcon_cli_core::{RconError, Result};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::Instant;
use tracing::{debug, info};

pub const CRLF: &str = "\r\n";

/// Server prompts and replies recognised during login
pub mod responses {
    pub const ENTER_PASSWORD: &str = "Please enter password:";
    pub const AUTH_SUCCESS: &str = "Logon successful.";
    pub const AUTH_INCORRECT_PASSWORD: &str = "Password incorrect";
    pub const AUTH_TOO_MANY_FAILS: &str = "Too many failed login attempts!";
}

/// Quiet period that ends a response
pub const DEFAULT_IDLE: Duration = Duration::from_millis(200);

/// Authenticated telnet console connection
pub struct TelnetClient {
    stream: Option<TcpStream>,
    address: String,
    timeout: Duration,
    idle: Duration,
}

impl TelnetClient {
    /// Connect, log in and discard the welcome banner
    pub async fn dial(address: &str, password: &str, timeout: Duration) -> Result<Self> {
        info!("Connecting to telnet console at {}", address);

        let stream = tokio::time::timeout(timeout, TcpStream::connect(address))
            .await
            .map_err(|_| RconError::Timeout(format!("telnet connect exceeded {:?}", timeout)))?
            .map_err(|e| RconError::Connection(format!("telnet connect failed: {}", e)))?;

        let mut client = Self {
            stream: Some(stream),
            address: address.to_string(),
            timeout,
            idle: DEFAULT_IDLE,
        };

        if let Err(e) = client.login(password).await {
            let _ = client.close().await;
            return Err(e);
        }

        info!("Telnet authenticated at {}", client.address);
        Ok(client)
    }

    /// Override the quiet period that ends a response
    pub fn with_idle(mut self, idle: Duration) -> Self {
        self.idle = idle;
        self
    }

    async fn login(&mut self, password: &str) -> Result<()> {
        self.read_until(&[responses::ENTER_PASSWORD]).await?;
        self.write_line(password).await?;

        let reply = self
            .read_until(&[
                responses::AUTH_SUCCESS,
                responses::AUTH_INCORRECT_PASSWORD,
                responses::AUTH_TOO_MANY_FAILS,
            ])
            .await?;

        if reply.contains(responses::AUTH_INCORRECT_PASSWORD) {
            return Err(RconError::AuthFailed("telnet password incorrect".to_string()));
        }
        if reply.contains(responses::AUTH_TOO_MANY_FAILS) {
            return Err(RconError::AuthFailed(
                "telnet too many failed login attempts".to_string(),
            ));
        }

        let mut banner = Vec::new();
        self.read_until_idle(&mut banner).await?;
        debug!("Telnet banner: {} bytes", banner.len());
        Ok(())
    }

    fn stream(&mut self) -> Result<&mut TcpStream> {
        self.stream
            .as_mut()
            .ok_or_else(|| RconError::Connection("telnet not connected".to_string()))
    }

    async fn write_line(&mut self, line: &str) -> Result<()> {
        let timeout = self.timeout;
        let data = format!("{}{}", line, CRLF);
        let stream = self.stream()?;

        tokio::time::timeout(timeout, stream.write_all(data.as_bytes()))
            .await
            .map_err(|_| RconError::Timeout(format!("telnet send exceeded {:?}", timeout)))?
            .map_err(|e| RconError::Connection(format!("telnet send failed: {}", e)))
    }

    /// Read one chunk, waiting at most `wait`. `Ok(None)` means nothing arrived.
    ///
    /// Chunks are raw bytes: a character may be split across two of them.
    async fn read_chunk(&mut self, wait: Duration) -> Result<Option<Vec<u8>>> {
        let stream = self.stream()?;
        let mut buf = [0u8; 4096];

        match tokio::time::timeout(wait, stream.read(&mut buf)).await {
            Err(_) => Ok(None),
            Ok(Ok(0)) => Err(RconError::Connection(
                "telnet connection closed by server".to_string(),
            )),
            Ok(Ok(n)) => Ok(Some(buf[..n].to_vec())),
            Ok(Err(e)) => Err(RconError::Connection(format!("telnet read failed: {}", e))),
        }
    }

    /// Accumulate input until any of `needles` appears or the timeout elapses
    async fn read_until(&mut self, needles: &[&str]) -> Result<String> {
        let deadline = Instant::now() + self.timeout;
        let mut received = Vec::new();

        while !needles.iter().any(|n| contains(&received, n.as_bytes())) {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.read_chunk(remaining).await? {
                Some(chunk) => received.extend_from_slice(&chunk),
                None => {
                    return Err(RconError::Timeout(format!(
                        "waiting for {:?} exceeded {:?}",
                        needles, self.timeout
                    )));
                }
            }
        }

        Ok(String::from_utf8_lossy(&received).into_owned())
    }

    /// Accumulate input until the stream stays quiet for the idle period
    async fn read_until_idle(&mut self, received: &mut Vec<u8>) -> Result<()> {
        while let Some(chunk) = self.read_chunk(self.idle).await? {
            received.extend_from_slice(&chunk);
        }
        Ok(())
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    needle.is_empty() || haystack.windows(needle.len()).any(|window| window == needle)
}

/// Drop the server's command echo and blank lines
fn clean_response(raw: &str, command: &str) -> String {
    let echo = format!("Executing command '{}'", command);
    raw.lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.is_empty() && !line.contains(&echo))
        .collect::<Vec<_>>()
        .join("\n")
}

#[async_trait]
impl RemoteConsole for TelnetClient {
    async fn execute(&mut self, command: &str) -> Result<String> {
        debug!("Telnet exec: {}", command);
        self.write_line(command).await?;

        let mut received = self.read_chunk(self.timeout).await?.ok_or_else(|| {
            RconError::Timeout(format!("telnet response exceeded {:?}", self.timeout))
        })?;
        self.read_until_idle(&mut received).await?;

        Ok(clean_response(&String::from_utf8_lossy(&received), command))
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(mut stream) = self.stream.take() {
            let _ = stream.write_all(format!("exit{}", CRLF).as_bytes()).await;
            let _ = stream.shutdown().await;
            info!("Telnet disconnected from {}", self.address);
        }
        Ok(())
    }
}
