//! # rcon-cli-executor
//!
//! Runs commands against a remote console.
//!
//! This crate provides:
//! - `Dispatcher`: owns the single cached connection for a session
//! - `execute_all`: batch execution with skip/halt-on-error policy
//! - `run_interactive`: the prompt driven read loop
//! - `Executor`: convenience wrapper tying the three together

pub mod batch;
pub mod dispatcher;
pub mod interactive;

#[cfg(test)]
pub(crate) mod mock;

pub use batch::{SEPARATOR, execute_all};
pub use dispatcher::Dispatcher;
pub use interactive::{QUIT_COMMAND, run_interactive};

use rcon_cli_bridge::{Dialer, NetworkDialer};
use rcon_cli_core::{Result, Session};
use tokio::io::{AsyncBufRead, AsyncWrite};

/// Command executor for one session
///
/// The owner must call [`Executor::close`] on every exit path.
pub struct Executor<D: Dialer = NetworkDialer> {
    dispatcher: Dispatcher<D>,
}

impl Executor<NetworkDialer> {
    /// Create an executor that dials real servers
    pub fn new() -> Self {
        Self::with_dialer(NetworkDialer)
    }
}

impl Default for Executor<NetworkDialer> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: Dialer> Executor<D> {
    /// Create an executor with a custom dialer
    pub fn with_dialer(dialer: D) -> Self {
        Self {
            dispatcher: Dispatcher::new(dialer),
        }
    }

    /// Keep web connections open across batches
    pub fn web_keep_alive(mut self, keep_alive: bool) -> Self {
        self.dispatcher = self.dispatcher.with_web_keep_alive(keep_alive);
        self
    }

    /// Execute a batch of commands
    pub async fn execute<W, S>(&self, out: &mut W, session: &Session, commands: &[S]) -> Result<()>
    where
        W: AsyncWrite + Unpin,
        S: AsRef<str>,
    {
        execute_all(&self.dispatcher, out, session, commands).await
    }

    /// Run the interactive loop
    pub async fn interactive<R, W>(
        &self,
        input: &mut R,
        out: &mut W,
        session: &mut Session,
    ) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        run_interactive(&self.dispatcher, input, out, session).await
    }

    /// Close the cached connection, if any
    pub async fn close(&self) -> Result<()> {
        self.dispatcher.close().await
    }

    pub fn dispatcher(&self) -> &Dispatcher<D> {
        &self.dispatcher
    }
}
