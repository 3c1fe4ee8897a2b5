//! Scripted link fake for tests and benches.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use irrigation_traits::{BoxError, Connection, Connector};

/// One scripted read outcome.
#[derive(Debug, Clone, Copy)]
pub enum Step {
    /// Bytes returned by the next read (split if the caller's buffer is smaller).
    Data(&'static [u8]),
    /// Read timeout with nothing received.
    Timeout,
    /// Transient link error; the connection is dropped by the manager.
    Fail(&'static str),
    /// Stream exhausted.
    End,
}

/// Connector whose connections replay a shared read script.
///
/// The script is shared across reconnects, so a `Fail` step followed by
/// `Data` models a link that comes back mid-record. An exhausted script
/// reads as end of stream.
pub struct ScriptedConnector {
    script: Arc<Mutex<VecDeque<Step>>>,
    written: Arc<Mutex<Vec<u8>>>,
    open_failures: usize,
    write_failures: Arc<AtomicUsize>,
    opens: Arc<AtomicUsize>,
    closes: Arc<AtomicUsize>,
}

impl ScriptedConnector {
    pub fn new(script: Vec<Step>) -> Self {
        Self {
            script: Arc::new(Mutex::new(script.into())),
            written: Arc::new(Mutex::new(Vec::new())),
            open_failures: 0,
            write_failures: Arc::new(AtomicUsize::new(0)),
            opens: Arc::new(AtomicUsize::new(0)),
            closes: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Fail the next `n` calls to `open`.
    pub fn with_open_failures(mut self, n: usize) -> Self {
        self.open_failures = n;
        self
    }

    /// Fail the next `n` writes.
    pub fn with_write_failures(self, n: usize) -> Self {
        self.write_failures.store(n, Ordering::SeqCst);
        self
    }

    /// Everything written so far, across connections.
    pub fn written(&self) -> Arc<Mutex<Vec<u8>>> {
        Arc::clone(&self.written)
    }

    pub fn opens(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.opens)
    }

    pub fn closes(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.closes)
    }
}

/// Written bytes split into lines, for assertions.
pub fn written_lines(written: &Mutex<Vec<u8>>) -> Vec<String> {
    let bytes = written.lock().unwrap_or_else(PoisonError::into_inner);
    String::from_utf8_lossy(&bytes)
        .lines()
        .map(str::to_owned)
        .collect()
}

impl Connector for ScriptedConnector {
    fn open(&mut self) -> Result<Box<dyn Connection + Send>, BoxError> {
        if self.open_failures > 0 {
            self.open_failures -= 1;
            return Err(Box::new(std::io::Error::other("scripted open failure")));
        }
        self.opens.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptedConnection {
            script: Arc::clone(&self.script),
            written: Arc::clone(&self.written),
            write_failures: Arc::clone(&self.write_failures),
            closes: Arc::clone(&self.closes),
        }))
    }

    fn describe(&self) -> String {
        "scripted".to_string()
    }
}

struct ScriptedConnection {
    script: Arc<Mutex<VecDeque<Step>>>,
    written: Arc<Mutex<Vec<u8>>>,
    write_failures: Arc<AtomicUsize>,
    closes: Arc<AtomicUsize>,
}

impl Connection for ScriptedConnection {
    fn read(&mut self, buf: &mut [u8], _timeout: Duration) -> Result<usize, BoxError> {
        let mut script = self.script.lock().unwrap_or_else(PoisonError::into_inner);
        match script.pop_front() {
            Some(Step::Data(bytes)) => {
                let n = bytes.len().min(buf.len());
                buf[..n].copy_from_slice(&bytes[..n]);
                if n < bytes.len() {
                    script.push_front(Step::Data(&bytes[n..]));
                }
                Ok(n)
            }
            Some(Step::Timeout) => Ok(0),
            Some(Step::Fail(msg)) => Err(Box::new(std::io::Error::other(msg))),
            Some(Step::End) | None => Err(Box::new(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "script exhausted",
            ))),
        }
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<(), BoxError> {
        let fail = self
            .write_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if fail {
            return Err(Box::new(std::io::Error::other("scripted write failure")));
        }
        self.written
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(bytes);
        Ok(())
    }

    fn close(&mut self) -> Result<(), BoxError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
