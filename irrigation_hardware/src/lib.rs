//! Link backends for the irrigation loop.
//!
//! - `SerialConnector` (feature `hardware`): the real UART / rfcomm device.
//! - `ReplayConnector`: a captured telemetry file served in chunks.
//! - `SimulatedField`: a synthetic bed that dries over time and reacts to
//!   watering commands.
pub mod error;
pub mod replay;
#[cfg(feature = "hardware")]
pub mod serial;
pub mod sim;

pub use error::HwError;
pub use replay::{ReplayConnector, SharedSink};
#[cfg(feature = "hardware")]
pub use serial::SerialConnector;
pub use sim::{FieldParams, SimulatedField};
