//! Seams between the irrigation loop and the outside world.
//!
//! The core only ever talks to a serial-like byte link and to a dose model
//! through these traits, so both can be swapped for fakes in tests.
pub mod clock;

pub use clock::{Clock, ManualClock, MonotonicClock};

use std::time::Duration;

/// Boxed error returned across trait boundaries.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// An open byte link to the microcontroller.
pub trait Connection {
    /// Read whatever bytes are available, waiting at most `timeout`.
    ///
    /// `Ok(0)` means the timeout elapsed with nothing to read.
    fn read(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize, BoxError>;

    fn write_all(&mut self, bytes: &[u8]) -> Result<(), BoxError>;

    /// Release the underlying handle. Called once before the connection is dropped.
    fn close(&mut self) -> Result<(), BoxError> {
        Ok(())
    }
}

/// Factory for connections; called on start-up and after every link failure.
pub trait Connector {
    fn open(&mut self) -> Result<Box<dyn Connection + Send>, BoxError>;

    /// Human-readable endpoint name for logs (e.g. `/dev/rfcomm0@9600`).
    fn describe(&self) -> String;
}

impl<C: Connector + ?Sized> Connector for Box<C> {
    fn open(&mut self) -> Result<Box<dyn Connection + Send>, BoxError> {
        (**self).open()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

/// External dose model.
///
/// The estimator owns its feature contract: `predict` receives values in
/// exactly the order of `feature_names`.
pub trait DoseEstimator {
    fn feature_names(&self) -> &[String];

    /// Continuous watering duration in seconds. Must not have side effects.
    fn predict(&self, features: &[f64]) -> Result<f64, BoxError>;
}

impl<E: DoseEstimator + ?Sized> DoseEstimator for Box<E> {
    fn feature_names(&self) -> &[String] {
        (**self).feature_names()
    }

    fn predict(&self, features: &[f64]) -> Result<f64, BoxError> {
        (**self).predict(features)
    }
}
