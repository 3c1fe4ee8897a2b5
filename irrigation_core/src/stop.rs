//! Cooperative cancellation for the service loop.
//!
//! The loop polls `StopSignal::is_stopped` between iterations and sleeps
//! its reconnect backoff through `StopSignal::wait`, so a stop request
//! (Ctrl-C in the CLI) cuts the backoff short.
use crossbeam_channel as xch;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Requests a stop. Cheap to clone; safe to call from a signal handler thread.
#[derive(Debug, Clone)]
pub struct StopHandle {
    flag: Arc<AtomicBool>,
    tx: xch::Sender<()>,
}

#[derive(Debug)]
pub struct StopSignal {
    flag: Arc<AtomicBool>,
    rx: xch::Receiver<()>,
    _keepalive: Option<xch::Sender<()>>,
}

pub fn stop_pair() -> (StopHandle, StopSignal) {
    let flag = Arc::new(AtomicBool::new(false));
    let (tx, rx) = xch::bounded(1);
    (
        StopHandle {
            flag: Arc::clone(&flag),
            tx,
        },
        StopSignal {
            flag,
            rx,
            _keepalive: None,
        },
    )
}

impl StopHandle {
    pub fn stop(&self) {
        self.flag.store(true, Ordering::SeqCst);
        // full channel means a wake-up is already pending
        let _ = self.tx.try_send(());
    }
}

impl StopSignal {
    /// A signal nobody can trigger.
    pub fn never() -> Self {
        let (handle, mut signal) = stop_pair();
        // hold a sender so `wait` blocks instead of seeing a closed channel
        signal._keepalive = Some(handle.tx);
        signal
    }

    pub fn is_stopped(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Sleep up to `d`, returning early with `true` if a stop was requested.
    pub fn wait(&self, d: Duration) -> bool {
        if self.is_stopped() {
            return true;
        }
        match self.rx.recv_timeout(d) {
            Ok(()) => true,
            Err(xch::RecvTimeoutError::Timeout) => self.is_stopped(),
            Err(xch::RecvTimeoutError::Disconnected) => {
                // every handle is gone; nobody can stop us any more
                std::thread::sleep(d);
                self.is_stopped()
            }
        }
    }
}
