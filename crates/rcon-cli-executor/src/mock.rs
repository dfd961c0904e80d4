//! In-memory dialer and console for executor tests

use async_trait::async_trait;
use rcon_cli_bridge::{Dialer, RemoteConsole};
use rcon_cli_core::{Protocol, RconError, Result};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Default)]
struct Calls {
    dials: Vec<Protocol>,
    closes: usize,
    executed: Vec<String>,
}

/// Dialer recording every interaction. Clones share the same record.
#[derive(Clone, Default)]
pub struct MockDialer {
    calls: Arc<Mutex<Calls>>,
    responses: Arc<HashMap<String, String>>,
    failing: Arc<HashSet<String>>,
    stalling: Arc<HashSet<String>>,
    refuse: bool,
    dial_delay: Option<Duration>,
}

impl MockDialer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reply to `command` with `response` instead of the default echo
    pub fn respond(mut self, command: &str, response: &str) -> Self {
        Arc::make_mut(&mut self.responses).insert(command.to_string(), response.to_string());
        self
    }

    /// Make `command` fail remotely
    pub fn fail_on(mut self, command: &str) -> Self {
        Arc::make_mut(&mut self.failing).insert(command.to_string());
        self
    }

    /// Make `command` time out. The console stays out of sync afterwards,
    /// answering every later command with a mismatched reply.
    pub fn time_out_on(mut self, command: &str) -> Self {
        Arc::make_mut(&mut self.stalling).insert(command.to_string());
        self
    }

    /// Reject every dial as bad credentials
    pub fn refusing(mut self) -> Self {
        self.refuse = true;
        self
    }

    /// Sleep inside dial, to widen race windows
    pub fn slow(mut self, delay: Duration) -> Self {
        self.dial_delay = Some(delay);
        self
    }

    pub fn dials(&self) -> usize {
        self.calls.lock().unwrap().dials.len()
    }

    pub fn dialed(&self) -> Vec<Protocol> {
        self.calls.lock().unwrap().dials.clone()
    }

    pub fn closes(&self) -> usize {
        self.calls.lock().unwrap().closes
    }

    pub fn executed(&self) -> Vec<String> {
        self.calls.lock().unwrap().executed.clone()
    }
}

#[async_trait]
impl Dialer for MockDialer {
    async fn dial(
        &self,
        protocol: Protocol,
        _address: &str,
        _password: &str,
        _timeout: Duration,
    ) -> Result<Box<dyn RemoteConsole>> {
        if let Some(delay) = self.dial_delay {
            tokio::time::sleep(delay).await;
        }
        self.calls.lock().unwrap().dials.push(protocol);

        if self.refuse {
            return Err(RconError::AuthFailed("bad password".to_string()));
        }

        Ok(Box::new(MockConsole {
            dialer: self.clone(),
            closed: false,
            desynced: false,
        }))
    }
}

struct MockConsole {
    dialer: MockDialer,
    closed: bool,
    desynced: bool,
}

#[async_trait]
impl RemoteConsole for MockConsole {
    async fn execute(&mut self, command: &str) -> Result<String> {
        if self.closed {
            return Err(RconError::Connection("closed".to_string()));
        }
        self.dialer
            .calls
            .lock()
            .unwrap()
            .executed
            .push(command.to_string());

        if self.desynced {
            return Err(RconError::Protocol("response ID mismatch".to_string()));
        }
        if self.dialer.stalling.contains(command) {
            self.desynced = true;
            return Err(RconError::Timeout(format!("{} exceeded 200ms", command)));
        }
        if self.dialer.failing.contains(command) {
            return Err(RconError::Protocol(format!("unknown command {}", command)));
        }

        Ok(self
            .dialer
            .responses
            .get(command)
            .cloned()
            .unwrap_or_else(|| format!("response to {}", command)))
    }

    async fn close(&mut self) -> Result<()> {
        if !self.closed {
            self.closed = true;
            self.dialer.calls.lock().unwrap().closes += 1;
        }
        Ok(())
    }
}
