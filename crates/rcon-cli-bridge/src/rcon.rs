//! Source RCON protocol client
//!
//! Implements the Valve Source RCON protocol used by most dedicated game servers.
//! Protocol spec: https://developer.valvesoftware.com/wiki/Source_RCON_Protocol

use crate::console::RemoteConsole;
use async_trait::async_trait;
use rcon_cli_core::{RconError, Result};
use std::future::Future;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

/// RCON packet type constants
pub mod packet_type {
    /// Response to a command
    pub const RESPONSE_VALUE: i32 = 0;
    /// Authentication response / Execute command (context-dependent)
    pub const EXEC_COMMAND: i32 = 2;
    pub const AUTH_RESPONSE: i32 = 2;
    /// Authenticate with password
    pub const AUTH: i32 = 3;
}

/// Longest response body a server may send in one packet
pub const MAX_BODY_SIZE: usize = 4096;

/// Longest command body accepted by servers
pub const MAX_COMMAND_LEN: usize = 1000;

/// id(4) + type(4) + two null terminators
const MIN_PACKET_SIZE: usize = 10;

/// Largest size field value accepted from a server
pub const MAX_PACKET_SIZE: usize = MIN_PACKET_SIZE + MAX_BODY_SIZE;

/// RCON packet types for creating packets
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PacketType {
    /// Execute a command
    ExecCommand,
    /// Authenticate with password
    Auth,
}

impl PacketType {
    /// Get the wire protocol value
    pub fn as_i32(self) -> i32 {
        match self {
            PacketType::ExecCommand => packet_type::EXEC_COMMAND,
            PacketType::Auth => packet_type::AUTH,
        }
    }
}

/// A single RCON packet
#[derive(Debug)]
pub struct RconPacket {
    pub id: i32,
    pub packet_type: i32,
    pub body: String,
}

impl RconPacket {
    /// Create a new packet
    pub fn new(id: i32, packet_type: PacketType, body: impl Into<String>) -> Self {
        Self {
            id,
            packet_type: packet_type.as_i32(),
            body: body.into(),
        }
    }

    /// Serialize packet to bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        let body_bytes = self.body.as_bytes();
        // Size = id(4) + type(4) + body + null(1) + null(1)
        let size = 4 + 4 + body_bytes.len() + 2;

        let mut buf = Vec::with_capacity(4 + size);
        buf.extend_from_slice(&(size as i32).to_le_bytes());
        buf.extend_from_slice(&self.id.to_le_bytes());
        buf.extend_from_slice(&self.packet_type.to_le_bytes());
        buf.extend_from_slice(body_bytes);
        buf.push(0); // Body null terminator
        buf.push(0); // Packet null terminator

        buf
    }

    /// Parse packet from bytes (excluding size prefix)
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < MIN_PACKET_SIZE {
            return Err(RconError::Protocol("RCON packet too short".to_string()));
        }

        let id = i32::from_le_bytes([data[0], data[1], data[2], data[3]]);
        let packet_type = i32::from_le_bytes([data[4], data[5], data[6], data[7]]);

        // Body is everything after type until the first null
        let body_end = data[8..]
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(data.len() - 8);
        let body = String::from_utf8_lossy(&data[8..8 + body_end]).to_string();

        Ok(Self {
            id,
            packet_type,
            body,
        })
    }
}

/// Authenticated Source RCON connection
pub struct RconClient {
    /// TCP stream to RCON server, `None` once closed
    stream: Option<TcpStream>,
    /// Server address
    address: String,
    /// Next packet ID
    next_id: i32,
    /// Deadline for every network wait
    timeout: Duration,
}

impl RconClient {
    /// Connect and authenticate with the RCON server
    pub async fn dial(address: &str, password: &str, timeout: Duration) -> Result<Self> {
        info!("Connecting to RCON at {}", address);

        let stream = with_deadline(timeout, "RCON connect", TcpStream::connect(address))
            .await?
            .map_err(|e| RconError::Connection(format!("RCON connect failed: {}", e)))?;

        let mut client = Self {
            stream: Some(stream),
            address: address.to_string(),
            next_id: 1,
            timeout,
        };

        if let Err(e) = client.authenticate(password).await {
            let _ = client.close().await;
            return Err(e);
        }

        info!("RCON authenticated at {}", client.address);
        Ok(client)
    }

    async fn authenticate(&mut self, password: &str) -> Result<()> {
        let auth_id = self.take_id();
        self.send_packet(&RconPacket::new(auth_id, PacketType::Auth, password))
            .await?;

        // Source servers send an empty RESPONSE_VALUE before the auth reply
        let mut response = self.recv_packet().await?;
        if response.packet_type == packet_type::RESPONSE_VALUE {
            debug!("Skipping empty response before auth reply");
            response = self.recv_packet().await?;
        }

        if response.packet_type != packet_type::AUTH_RESPONSE {
            return Err(RconError::Protocol(format!(
                "unexpected auth response type {}",
                response.packet_type
            )));
        }

        if response.id == -1 {
            return Err(RconError::AuthFailed(
                "RCON authentication failed".to_string(),
            ));
        }

        if response.id != auth_id {
            warn!(
                "RCON auth response ID mismatch: expected {}, got {}",
                auth_id, response.id
            );
        }

        Ok(())
    }

    fn take_id(&mut self) -> i32 {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1).max(1);
        id
    }

    fn stream(&mut self) -> Result<&mut TcpStream> {
        self.stream
            .as_mut()
            .ok_or_else(|| RconError::Connection("RCON not connected".to_string()))
    }

    /// Send a packet
    async fn send_packet(&mut self, packet: &RconPacket) -> Result<()> {
        let bytes = packet.to_bytes();
        let timeout = self.timeout;
        let stream = self.stream()?;

        with_deadline(timeout, "RCON send", stream.write_all(&bytes))
            .await?
            .map_err(|e| RconError::Connection(format!("RCON send failed: {}", e)))?;

        Ok(())
    }

    /// Receive a packet
    async fn recv_packet(&mut self) -> Result<RconPacket> {
        let timeout = self.timeout;
        let stream = self.stream()?;

        // Read size (4 bytes, little endian)
        let mut size_buf = [0u8; 4];
        with_deadline(timeout, "RCON response", stream.read_exact(&mut size_buf))
            .await?
            .map_err(|e| RconError::Connection(format!("RCON recv size failed: {}", e)))?;
        let size = i32::from_le_bytes(size_buf);

        if size < MIN_PACKET_SIZE as i32 || size as usize > MAX_PACKET_SIZE {
            return Err(RconError::Protocol(format!(
                "RCON packet size out of range: {} bytes",
                size
            )));
        }

        // Read packet body
        let mut data = vec![0u8; size as usize];
        with_deadline(timeout, "RCON response", stream.read_exact(&mut data))
            .await?
            .map_err(|e| RconError::Connection(format!("RCON recv body failed: {}", e)))?;

        RconPacket::from_bytes(&data)
    }

    async fn round_trip(&mut self, cmd_id: i32, command: &str) -> Result<String> {
        self.send_packet(&RconPacket::new(cmd_id, PacketType::ExecCommand, command))
            .await?;

        let response = self.recv_packet().await?;

        if response.packet_type != packet_type::RESPONSE_VALUE {
            return Err(RconError::Protocol(format!(
                "unexpected response type {}",
                response.packet_type
            )));
        }

        if response.id != cmd_id {
            return Err(RconError::Protocol(format!(
                "response ID mismatch: expected {}, got {}",
                cmd_id, response.id
            )));
        }

        debug!(
            "RCON response: {}",
            response.body.chars().take(100).collect::<String>()
        );
        Ok(response.body)
    }

    /// Drop a stream that can no longer be trusted to be in sync
    fn discard(&mut self) {
        if self.stream.take().is_some() {
            warn!("RCON connection to {} dropped after failed exchange", self.address);
        }
    }
}

#[async_trait]
impl RemoteConsole for RconClient {
    async fn execute(&mut self, command: &str) -> Result<String> {
        if command.len() > MAX_COMMAND_LEN {
            return Err(RconError::Protocol(format!(
                "command too long: {} bytes (max {})",
                command.len(),
                MAX_COMMAND_LEN
            )));
        }

        let cmd_id = self.take_id();
        debug!("RCON exec: {}", command);
        match self.round_trip(cmd_id, command).await {
            Ok(body) => Ok(body),
            Err(e) => {
                // A late or partly read reply would pair with the next request
                self.discard();
                Err(e)
            }
        }
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(mut stream) = self.stream.take() {
            let _ = stream.shutdown().await;
            info!("RCON disconnected from {}", self.address);
        }
        Ok(())
    }
}

/// Run `future` with a deadline, mapping expiry to a timeout error
async fn with_deadline<F: Future>(timeout: Duration, what: &str, future: F) -> Result<F::Output> {
    tokio::time::timeout(timeout, future)
        .await
        .map_err(|_| RconError::Timeout(format!("{} exceeded {:?}", what, timeout)))
}
