//! Ownership of the byte link to the microcontroller.
//!
//! `LinkManager` is an explicit state machine:
//!
//! ```text
//! Disconnected --ensure_connected--> Connecting --open ok--> Connected
//!      ^                                  |                      |
//!      +---------- open failed -----------+---- read/write err --+
//! ```
//!
//! Every failure closes and discards the handle and arms a single fixed
//! backoff; the next `ensure_connected` before the deadline reports
//! `LinkError::BackingOff` instead of touching the connector.

use std::sync::Arc;
use std::time::{Duration, Instant};

use irrigation_traits::{Clock, Connection, Connector, MonotonicClock};

use crate::config::LinkCfg;
use crate::error::LinkError;
use crate::hw_error::map_link_error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Disconnected,
    /// Held only while `Connector::open` runs inside `ensure_connected`;
    /// every return from it leaves `Connected` or `Disconnected`.
    Connecting,
    Connected,
}

/// Floor applied to the configured reconnect backoff.
pub const MIN_BACKOFF: Duration = Duration::from_millis(1);

pub struct LinkManager<C: Connector> {
    connector: C,
    conn: Option<Box<dyn Connection + Send>>,
    state: LinkState,
    clock: Arc<dyn Clock + Send + Sync>,
    read_timeout: Duration,
    backoff: Duration,
    retry_at: Option<Instant>,
    opens: u64,
    failures: u64,
}

impl<C: Connector> std::fmt::Debug for LinkManager<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkManager")
            .field("endpoint", &self.connector.describe())
            .field("state", &self.state)
            .field("opens", &self.opens)
            .field("failures", &self.failures)
            .finish()
    }
}

impl<C: Connector> LinkManager<C> {
    pub fn new(connector: C, cfg: &LinkCfg) -> Self {
        Self {
            connector,
            conn: None,
            state: LinkState::Disconnected,
            clock: Arc::new(MonotonicClock::new()),
            read_timeout: cfg.read_timeout,
            backoff: cfg.reconnect_backoff.max(MIN_BACKOFF),
            retry_at: None,
            opens: 0,
            failures: 0,
        }
    }

    /// Replace the backoff clock (tests use `ManualClock`).
    pub fn with_clock(mut self, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        self.clock = clock;
        self
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == LinkState::Connected
    }

    pub fn endpoint(&self) -> String {
        self.connector.describe()
    }

    /// Successful opens after the first one.
    pub fn reconnects(&self) -> u64 {
        self.opens.saturating_sub(1)
    }

    /// Link failures seen so far (failed opens plus failed reads/writes).
    pub fn failures(&self) -> u64 {
        self.failures
    }

    /// Time left before the next open attempt is allowed.
    pub fn remaining_backoff(&self) -> Duration {
        self.retry_at
            .map_or(Duration::ZERO, |at| self.clock.until(at))
    }

    /// Open the link unless it is already up or the backoff is still running.
    pub fn ensure_connected(&mut self) -> Result<(), LinkError> {
        if self.state == LinkState::Connected {
            return Ok(());
        }
        let remaining = self.remaining_backoff();
        if !remaining.is_zero() {
            return Err(LinkError::BackingOff { remaining });
        }

        self.state = LinkState::Connecting;
        tracing::debug!(endpoint = %self.connector.describe(), "opening link");
        match self.connector.open() {
            Ok(conn) => {
                self.conn = Some(conn);
                self.state = LinkState::Connected;
                self.retry_at = None;
                self.opens += 1;
                if self.opens > 1 {
                    tracing::info!(
                        endpoint = %self.connector.describe(),
                        reconnects = self.reconnects(),
                        "link re-established"
                    );
                } else {
                    tracing::info!(endpoint = %self.connector.describe(), "link open");
                }
                Ok(())
            }
            Err(e) => {
                let err = match map_link_error(e.as_ref()) {
                    LinkError::EndOfStream => LinkError::EndOfStream,
                    _ => LinkError::Open(e.to_string()),
                };
                self.fail(&err);
                Err(err)
            }
        }
    }

    /// Read with the configured timeout. `Ok(0)` means nothing arrived.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize, LinkError> {
        let conn = self.conn.as_mut().ok_or(LinkError::NotConnected)?;
        match conn.read(buf, self.read_timeout) {
            Ok(n) => Ok(n),
            Err(e) => {
                let err = map_link_error(e.as_ref());
                self.fail(&err);
                Err(err)
            }
        }
    }

    /// Write one whole command. Not retried; a failure drops the link.
    pub fn write(&mut self, bytes: &[u8]) -> Result<(), LinkError> {
        let conn = self.conn.as_mut().ok_or(LinkError::NotConnected)?;
        match conn.write_all(bytes) {
            Ok(()) => Ok(()),
            Err(e) => {
                let err = map_link_error(e.as_ref());
                self.fail(&err);
                Err(err)
            }
        }
    }

    /// Release the connection without arming the backoff.
    pub fn close(&mut self) {
        self.release();
        self.state = LinkState::Disconnected;
    }

    fn fail(&mut self, err: &LinkError) {
        self.failures += 1;
        self.release();
        self.state = LinkState::Disconnected;
        if err.is_terminal() {
            return;
        }
        self.retry_at = Some(self.clock.now() + self.backoff);
        tracing::warn!(
            endpoint = %self.connector.describe(),
            error = %err,
            backoff_ms = self.backoff.as_millis() as u64,
            "link failure; will reconnect"
        );
    }

    fn release(&mut self) {
        if let Some(mut conn) = self.conn.take()
            && let Err(e) = conn.close()
        {
            tracing::debug!(error = %e, "error while closing link");
        }
    }
}

impl<C: Connector> Drop for LinkManager<C> {
    fn drop(&mut self) {
        self.release();
    }
}
