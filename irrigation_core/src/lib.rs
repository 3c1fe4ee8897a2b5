#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Irrigation control loop (hardware-agnostic).
//!
//! Telemetry arrives as newline-terminated `KEY:VALUE` records over a
//! serial-like link; every accepted record produces exactly one
//! `CMD:<WATER_ON|WATER_OFF>;SEC:<n>` command back to the microcontroller.
//! All I/O goes through `irrigation_traits::Connector` and every dose
//! model through `irrigation_traits::DoseEstimator`.
//!
//! ## Architecture
//!
//! - **Link** (`link`): open / reconnect state machine with a fixed backoff
//! - **Framing** (`framer`): byte chunks to complete lines, bounded buffer
//! - **Parsing** (`telemetry`): line to `Reading`, soft failure as `None`
//! - **Decision** (`engine`): two-threshold hysteresis on the soil signal
//! - **History** (`window`): last N readings and the dose feature vector
//! - **Dose** (`dose`, `estimators`): estimator call, snapped to allowed durations
//! - **Command** (`command`): wire encoding
//! - **Orchestration** (`controller`, `service`, `stop`)

pub mod command;
pub mod config;
pub mod controller;
pub mod conversions;
pub mod dose;
pub mod engine;
pub mod error;
pub mod estimators;
pub mod framer;
pub mod hw_error;
pub mod link;
pub mod mocks;
pub mod service;
pub mod stop;
pub mod telemetry;
pub mod window;

pub use command::{Command, encode, truncate_seconds};
pub use config::{DoseCfg, LinkCfg, SoilAggregation, TelemetryCfg, Thresholds};
pub use controller::{Controller, ControllerBuilder, Cycle};
pub use conversions::{controller_from_config, estimator_from_config};
pub use dose::{DoseOutcome, DosePlanner, snap_to_allowed};
pub use engine::{Decision, DecisionState, HysteresisEngine};
pub use error::{BuildError, EstimatorError, FramingError, LinkError, Report, Result};
pub use estimators::{FixedEstimator, LinearEstimator};
pub use framer::LineFramer;
pub use link::{LinkManager, LinkState};
pub use service::{ExitReason, RunSummary, Service};
pub use stop::{StopHandle, StopSignal, stop_pair};
pub use telemetry::{Reading, TelemetryParser};
pub use window::{FeatureVector, InsufficientData, Window};
