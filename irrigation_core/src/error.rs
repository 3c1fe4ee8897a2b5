use std::time::Duration;

use thiserror::Error;

/// Link-level failures. None of these are fatal to the process.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LinkError {
    #[error("link i/o error: {0}")]
    Io(String),
    #[error("device disconnected: {0}")]
    Disconnected(String),
    #[error("link open failed: {0}")]
    Open(String),
    #[error("end of stream")]
    EndOfStream,
    #[error("link not connected")]
    NotConnected,
    #[error("reconnect backoff, {remaining:?} left")]
    BackingOff { remaining: Duration },
}

impl LinkError {
    /// True when the stream has ended for good (replay exhausted).
    pub fn is_terminal(&self) -> bool {
        matches!(self, LinkError::EndOfStream)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FramingError {
    #[error("pending record exceeded {limit} bytes without a newline; {discarded} bytes discarded")]
    Overflow { limit: usize, discarded: usize },
}

/// Failures of the dose collaborator. Recovered locally with `seconds = 0`.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EstimatorError {
    #[error("no dose estimator configured")]
    Unavailable,
    #[error("dose estimator failed: {0}")]
    Failed(String),
    #[error("dose estimator returned a non-finite prediction ({0})")]
    NonFinite(f64),
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum BuildError {
    #[error("missing thresholds")]
    MissingThresholds,
    #[error("invalid thresholds: wet ({wet}) must be below dry ({dry})")]
    InvalidThresholds { wet: f64, dry: f64 },
    #[error("feature contract requires '{0}', which the window cannot produce")]
    UnknownFeature(String),
    #[error("linear weight names '{0}', which is not in the feature contract")]
    UnknownWeight(String),
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
