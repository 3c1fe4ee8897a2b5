//! Newline framing over a raw byte stream.
//!
//! Bytes from each read are appended to one pending buffer; complete lines
//! are handed out lazily through [`Lines`], and whatever follows the last
//! delimiter stays pending for the next read. The buffer survives link
//! reconnects: a reopened port continues the same byte stream.

use crate::error::FramingError;

#[derive(Debug)]
pub struct LineFramer {
    pending: Vec<u8>,
    /// Offset of the first byte not yet handed out.
    start: usize,
    /// Bytes before this offset are known to hold no delimiter.
    scanned: usize,
    max_pending: usize,
}

impl LineFramer {
    pub fn new(max_pending: usize) -> Self {
        Self {
            pending: Vec::new(),
            start: 0,
            scanned: 0,
            max_pending: max_pending.max(1),
        }
    }

    /// Append a chunk and iterate over the lines it completes.
    ///
    /// Lines left unconsumed when the iterator is dropped are kept and come
    /// out first on the next call. Once no complete line remains, a tail
    /// longer than `max_pending` is discarded and reported as
    /// [`FramingError::Overflow`].
    pub fn feed(&mut self, chunk: &[u8]) -> Lines<'_> {
        self.compact();
        self.pending.extend_from_slice(chunk);
        Lines {
            framer: self,
            done: false,
        }
    }

    /// Bytes received but not yet returned as a line.
    pub fn pending_len(&self) -> usize {
        self.pending.len() - self.start
    }

    /// Drop all pending bytes, returning how many were discarded.
    pub fn reset(&mut self) -> usize {
        let discarded = self.pending_len();
        self.pending.clear();
        self.start = 0;
        self.scanned = 0;
        discarded
    }

    fn next_line(&mut self) -> Option<String> {
        let from = self.scanned.max(self.start);
        match self.pending[from..].iter().position(|&b| b == b'\n') {
            Some(rel) => {
                let end = from + rel;
                let mut line = &self.pending[self.start..end];
                if let [head @ .., b'\r'] = line {
                    line = head;
                }
                let text = String::from_utf8_lossy(line).into_owned();
                self.start = end + 1;
                self.scanned = self.start;
                Some(text)
            }
            None => {
                self.scanned = self.pending.len();
                None
            }
        }
    }

    fn compact(&mut self) {
        if self.start == 0 {
            return;
        }
        self.pending.drain(..self.start);
        self.scanned = self.scanned.saturating_sub(self.start);
        self.start = 0;
    }
}

/// Lazy sequence of complete lines produced by [`LineFramer::feed`].
pub struct Lines<'a> {
    framer: &'a mut LineFramer,
    done: bool,
}

impl Iterator for Lines<'_> {
    type Item = Result<String, FramingError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if let Some(line) = self.framer.next_line() {
            return Some(Ok(line));
        }
        self.done = true;
        let limit = self.framer.max_pending;
        if self.framer.pending_len() > limit {
            let discarded = self.framer.reset();
            return Some(Err(FramingError::Overflow { limit, discarded }));
        }
        None
    }
}

impl Drop for Lines<'_> {
    fn drop(&mut self) {
        self.framer.compact();
    }
}
