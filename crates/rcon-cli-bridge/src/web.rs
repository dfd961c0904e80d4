//! WebRCON client (Rust dedicated server)
//!
//! Commands are JSON messages over a WebSocket opened at
//! `ws://<address>/<password>`, the password percent-encoded as one path
//! segment. Replies carry the request `Identifier`;
//! console broadcasts use other identifiers and are skipped.

use crate::console::RemoteConsole;
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use rcon_cli_core::{RconError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info};

/// Name the client reports in every request
pub const CLIENT_NAME: &str = "WebRcon";

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// WebRCON message, used for both requests and replies
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct WebMessage {
    pub identifier: i32,
    pub message: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "Type", skip_serializing_if = "String::is_empty")]
    pub kind: String,
}

/// Authenticated WebRCON connection
pub struct WebClient {
    socket: Option<Socket>,
    address: String,
    timeout: Duration,
    next_id: i32,
}

impl WebClient {
    /// Open the WebSocket; the server authenticates by URL path
    pub async fn dial(address: &str, password: &str, timeout: Duration) -> Result<Self> {
        info!("Connecting to WebRCON at {}", address);

        let url = format!("ws://{}/{}", address, urlencoding::encode(password));
        let (socket, _) = tokio::time::timeout(timeout, tokio_tungstenite::connect_async(url))
            .await
            .map_err(|_| RconError::Timeout(format!("WebRCON connect exceeded {:?}", timeout)))?
            .map_err(map_connect_error)?;

        info!("WebRCON connected at {}", address);
        Ok(Self {
            socket: Some(socket),
            address: address.to_string(),
            timeout,
            next_id: 42,
        })
    }

    fn take_id(&mut self) -> i32 {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1).max(1);
        id
    }

    async fn await_reply(&mut self, id: i32) -> Result<String> {
        let socket = self
            .socket
            .as_mut()
            .ok_or_else(|| RconError::Connection("WebRCON not connected".to_string()))?;

        loop {
            let frame = match socket.next().await {
                Some(Ok(frame)) => frame,
                Some(Err(e)) => {
                    return Err(RconError::Connection(format!("WebRCON read failed: {}", e)));
                }
                None => {
                    return Err(RconError::Connection(
                        "WebRCON connection closed by server".to_string(),
                    ));
                }
            };

            match frame {
                Message::Text(text) => {
                    let reply: WebMessage = serde_json::from_str(&text).map_err(|e| {
                        RconError::Protocol(format!("invalid WebRCON message: {}", e))
                    })?;
                    if reply.identifier == id {
                        return Ok(reply.message);
                    }
                    debug!("Skipping WebRCON message for identifier {}", reply.identifier);
                }
                Message::Close(_) => {
                    return Err(RconError::Connection(
                        "WebRCON connection closed by server".to_string(),
                    ));
                }
                _ => {}
            }
        }
    }
}

fn map_connect_error(err: tungstenite::Error) -> RconError {
    match err {
        tungstenite::Error::Http(response) => {
            RconError::AuthFailed(format!("WebRCON handshake rejected: {}", response.status()))
        }
        other => RconError::Connection(format!("WebRCON connect failed: {}", other)),
    }
}

#[async_trait]
impl RemoteConsole for WebClient {
    async fn execute(&mut self, command: &str) -> Result<String> {
        let id = self.take_id();
        let request = WebMessage {
            identifier: id,
            message: command.to_string(),
            name: CLIENT_NAME.to_string(),
            kind: String::new(),
        };
        let payload = serde_json::to_string(&request)
            .map_err(|e| RconError::Protocol(format!("encode WebRCON message: {}", e)))?;

        debug!("WebRCON exec: {}", command);
        let timeout = self.timeout;
        let socket = self
            .socket
            .as_mut()
            .ok_or_else(|| RconError::Connection("WebRCON not connected".to_string()))?;

        tokio::time::timeout(timeout, socket.send(Message::Text(payload.into())))
            .await
            .map_err(|_| RconError::Timeout(format!("WebRCON send exceeded {:?}", timeout)))?
            .map_err(|e| RconError::Connection(format!("WebRCON send failed: {}", e)))?;

        tokio::time::timeout(timeout, self.await_reply(id))
            .await
            .map_err(|_| RconError::Timeout(format!("WebRCON response exceeded {:?}", timeout)))?
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(mut socket) = self.socket.take() {
            let _ = socket.close(None).await;
            info!("WebRCON disconnected from {}", self.address);
        }
        Ok(())
    }
}
