//! Remote console adapters for rcon-cli
//!
//! Every supported server family is reached through the same
//! [`RemoteConsole`] capability:
//!
//! - **rcon**: Source RCON binary packets over TCP
//! - **telnet**: line oriented console (7 Days to Die and similar)
//! - **web**: WebRCON JSON messages over a WebSocket (Rust)
//!
//! A [`Dialer`] picks the adapter for a protocol tag once, at connect time.

mod console;
mod rcon;
mod telnet;
mod web;

pub use console::{Dialer, NetworkDialer, RemoteConsole};
pub use rcon::{PacketType, RconClient, RconPacket};
pub use telnet::TelnetClient;
pub use web::{WebClient, WebMessage};
