//! Connection cache
//!
//! The dispatcher owns the only live remote console of a session. It dials
//! lazily on first use, reuses the handle afterwards and hands it back to
//! the network only through [`Dispatcher::close`] or, for protocols that
//! cannot stay connected, [`Dispatcher::finish_batch`].

use rcon_cli_bridge::{Dialer, RemoteConsole};
use rcon_cli_core::{Protocol, RconError, Result, Session};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// A live console and the protocol it was dialed with
struct Connection {
    protocol: Protocol,
    console: Box<dyn RemoteConsole>,
}

/// Lazily dialed, single connection per session
pub struct Dispatcher<D: Dialer> {
    dialer: D,
    /// `None` while disconnected. The lock also serializes execution and
    /// makes the first dial single-flight.
    connection: Mutex<Option<Connection>>,
    web_keep_alive: bool,
}

impl<D: Dialer> Dispatcher<D> {
    pub fn new(dialer: D) -> Self {
        Self {
            dialer,
            connection: Mutex::new(None),
            web_keep_alive: false,
        }
    }

    /// Keep web connections cached across batches instead of reopening them
    pub fn with_web_keep_alive(mut self, keep_alive: bool) -> Self {
        self.web_keep_alive = keep_alive;
        self
    }

    /// Dial now if not already connected
    pub async fn connect(&self, session: &Session) -> Result<()> {
        let mut slot = self.connection.lock().await;
        self.ensure_connected(&mut slot, session).await?;
        Ok(())
    }

    /// Execute one command, dialing first if needed.
    ///
    /// A transport, timeout or framing failure leaves the connection out of
    /// sync, so it is closed and the next command dials again.
    pub async fn execute(&self, session: &Session, command: &str) -> Result<String> {
        let mut slot = self.connection.lock().await;
        let connection = self.ensure_connected(&mut slot, session).await?;
        let result = connection.console.execute(command).await;

        if let Err(e) = &result {
            if breaks_connection(e) {
                warn!("Dropping connection after failed command: {}", e);
                if let Err(close_err) = Self::close_slot(&mut slot).await {
                    debug!("Close after failure: {}", close_err);
                }
            }
        }
        result
    }

    /// End of a batch: drop connections that must not outlive it
    pub async fn finish_batch(&self) -> Result<()> {
        let mut slot = self.connection.lock().await;
        let keep = match slot.as_ref() {
            Some(connection) => connection.protocol.is_persistent() || self.web_keep_alive,
            None => true,
        };
        if keep {
            return Ok(());
        }

        debug!("Closing non-persistent connection after batch");
        Self::close_slot(&mut slot).await
    }

    /// Close the cached connection. Safe to call when disconnected.
    pub async fn close(&self) -> Result<()> {
        let mut slot = self.connection.lock().await;
        Self::close_slot(&mut slot).await
    }

    pub async fn is_connected(&self) -> bool {
        self.connection.lock().await.is_some()
    }

    async fn close_slot(slot: &mut Option<Connection>) -> Result<()> {
        match slot.take() {
            Some(mut connection) => {
                info!("Closing {} connection", connection.protocol);
                connection.console.close().await
            }
            None => Ok(()),
        }
    }

    async fn ensure_connected<'a>(
        &self,
        slot: &'a mut Option<Connection>,
        session: &Session,
    ) -> Result<&'a mut Connection> {
        if slot.is_none() {
            session.ensure_credentials()?;

            let protocol = session.protocol();
            debug!("Dialing {} at {}", protocol, session.address);
            let console = self
                .dialer
                .dial(
                    protocol,
                    &session.address,
                    &session.password,
                    session.timeout(),
                )
                .await
                .map_err(RconError::dial)?;

            *slot = Some(Connection { protocol, console });
        }

        slot.as_mut()
            .ok_or_else(|| RconError::Connection("not connected".to_string()))
    }
}

fn breaks_connection(err: &RconError) -> bool {
    matches!(
        err,
        RconError::Timeout(_) | RconError::Connection(_) | RconError::Protocol(_)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockDialer;
    use std::time::Duration;

    fn session() -> Session {
        Session::new("127.0.0.1:16260", "password")
    }

    #[tokio::test]
    async fn test_lazy_dial_and_reuse() {
        let dialer = MockDialer::new();
        let dispatcher = Dispatcher::new(dialer.clone());
        assert!(!dispatcher.is_connected().await);
        assert_eq!(dialer.dials(), 0);

        dispatcher.execute(&session(), "one").await.unwrap();
        dispatcher.execute(&session(), "two").await.unwrap();

        assert_eq!(dialer.dials(), 1);
        assert_eq!(dialer.dialed(), vec![Protocol::Rcon]);
        assert_eq!(dialer.executed(), vec!["one", "two"]);
    }

    #[tokio::test]
    async fn test_refuses_without_credentials() {
        let dialer = MockDialer::new();
        let dispatcher = Dispatcher::new(dialer.clone());

        let err = dispatcher
            .execute(&Session::new("", "password"), "help")
            .await
            .unwrap_err();
        assert!(matches!(err, RconError::EmptyAddress));

        let err = dispatcher
            .connect(&Session::new("127.0.0.1:16260", ""))
            .await
            .unwrap_err();
        assert!(matches!(err, RconError::EmptyPassword));
        assert_eq!(dialer.dials(), 0);
    }

    #[tokio::test]
    async fn test_dial_failure_leaves_nothing_cached() {
        let dialer = MockDialer::new().refusing();
        let dispatcher = Dispatcher::new(dialer.clone());

        let err = dispatcher.connect(&session()).await.unwrap_err();
        assert!(err.is_dial());
        assert_eq!(err.to_string(), "auth: authentication failed: bad password");
        assert!(!dispatcher.is_connected().await);

        // Next attempt dials again rather than reusing a broken handle
        let _ = dispatcher.connect(&session()).await;
        assert_eq!(dialer.dials(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_first_use_dials_once() {
        let dialer = MockDialer::new().slow(Duration::from_millis(50));
        let dispatcher = Dispatcher::new(dialer.clone());
        let session = session();

        let (a, b) = tokio::join!(
            dispatcher.execute(&session, "a"),
            dispatcher.execute(&session, "b")
        );
        a.unwrap();
        b.unwrap();
        assert_eq!(dialer.dials(), 1);
    }

    #[tokio::test]
    async fn test_failed_command_redials() {
        let dialer = MockDialer::new().time_out_on("slow");
        let dispatcher = Dispatcher::new(dialer.clone());

        let err = dispatcher.execute(&session(), "slow").await.unwrap_err();
        assert!(matches!(err, RconError::Timeout(_)));
        assert!(!dispatcher.is_connected().await);
        assert_eq!(dialer.closes(), 1);

        assert_eq!(
            dispatcher.execute(&session(), "help").await.unwrap(),
            "response to help"
        );
        assert_eq!(dialer.dials(), 2);
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let dialer = MockDialer::new();
        let dispatcher = Dispatcher::new(dialer.clone());

        dispatcher.close().await.unwrap();
        dispatcher.connect(&session()).await.unwrap();
        dispatcher.close().await.unwrap();
        dispatcher.close().await.unwrap();

        assert!(!dispatcher.is_connected().await);
        assert_eq!(dialer.closes(), 1);
    }

    #[tokio::test]
    async fn test_finish_batch_policy() {
        let web = Session {
            protocol: Some(Protocol::Web),
            ..session()
        };

        let dialer = MockDialer::new();
        let dispatcher = Dispatcher::new(dialer.clone());
        dispatcher.connect(&web).await.unwrap();
        dispatcher.finish_batch().await.unwrap();
        assert!(!dispatcher.is_connected().await);

        let dispatcher = Dispatcher::new(dialer.clone()).with_web_keep_alive(true);
        dispatcher.connect(&web).await.unwrap();
        dispatcher.finish_batch().await.unwrap();
        assert!(dispatcher.is_connected().await);

        let dispatcher = Dispatcher::new(dialer.clone());
        dispatcher.connect(&session()).await.unwrap();
        dispatcher.finish_batch().await.unwrap();
        assert!(dispatcher.is_connected().await);
    }
}
