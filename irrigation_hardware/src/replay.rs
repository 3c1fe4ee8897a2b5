//! Replays a captured telemetry file as if it were arriving over the link.
//!
//! The file is served in fixed-size chunks so records straddle read
//! boundaries the way they do on a real UART. Commands written back are
//! copied to a shared sink (stdout in the CLI). Once the file is exhausted
//! every read fails with `HwError::EndOfStream`.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use irrigation_traits::{BoxError, Connection, Connector};

use crate::error::HwError;

/// Where replayed commands end up.
pub type SharedSink = Arc<Mutex<dyn Write + Send>>;

pub struct ReplayConnector {
    path: PathBuf,
    chunk_size: usize,
    sink: SharedSink,
}

impl ReplayConnector {
    pub fn new(path: impl AsRef<Path>, chunk_size: usize, sink: SharedSink) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            chunk_size: chunk_size.max(1),
            sink,
        }
    }
}

impl Connector for ReplayConnector {
    fn open(&mut self) -> Result<Box<dyn Connection + Send>, BoxError> {
        let data = std::fs::read(&self.path).map_err(HwError::Io)?;
        tracing::debug!(path = %self.path.display(), bytes = data.len(), "replay opened");
        Ok(Box::new(ReplayConnection {
            data,
            pos: 0,
            chunk_size: self.chunk_size,
            sink: Arc::clone(&self.sink),
        }))
    }

    fn describe(&self) -> String {
        format!("replay:{}", self.path.display())
    }
}

pub struct ReplayConnection {
    data: Vec<u8>,
    pos: usize,
    chunk_size: usize,
    sink: SharedSink,
}

impl Connection for ReplayConnection {
    fn read(&mut self, buf: &mut [u8], _timeout: Duration) -> Result<usize, BoxError> {
        let remaining = self.data.len().saturating_sub(self.pos);
        if remaining == 0 {
            return Err(Box::new(HwError::EndOfStream));
        }
        let n = remaining.min(self.chunk_size).min(buf.len());
        buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<(), BoxError> {
        let mut sink = self
            .sink
            .lock()
            .map_err(|_| HwError::Serial("replay sink poisoned".into()))?;
        sink.write_all(bytes).map_err(HwError::Io)?;
        sink.flush().map_err(HwError::Io)?;
        Ok(())
    }
}
