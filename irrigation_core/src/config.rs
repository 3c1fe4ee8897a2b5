//! Runtime configuration for the irrigation controller.
//!
//! These are the structs the core consumes. They are separate from the
//! TOML schema in `irrigation_config`; see `conversions` for the mapping.

use std::time::Duration;

use crate::error::BuildError;

/// Which statistic of the two soil probes drives the ON/OFF decision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SoilAggregation {
    #[default]
    Mean,
    Max,
}

impl SoilAggregation {
    #[inline]
    pub fn apply(self, soil1: f64, soil2: f64) -> f64 {
        match self {
            SoilAggregation::Mean => 0.5 * (soil1 + soil2),
            SoilAggregation::Max => soil1.max(soil2),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            SoilAggregation::Mean => "mean",
            SoilAggregation::Max => "max",
        }
    }
}

/// Hysteresis band. Construction guarantees `wet < dry`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    dry: f64,
    wet: f64,
}

impl Thresholds {
    pub fn new(dry: f64, wet: f64) -> Result<Self, BuildError> {
        if !(dry.is_finite() && wet.is_finite()) || wet >= dry {
            return Err(BuildError::InvalidThresholds { wet, dry });
        }
        Ok(Self { dry, wet })
    }

    /// Signal at or above which watering starts.
    #[inline]
    pub fn dry(&self) -> f64 {
        self.dry
    }

    /// Signal at or below which watering stops.
    #[inline]
    pub fn wet(&self) -> f64 {
        self.wet
    }
}

/// Telemetry record layout.
#[derive(Debug, Clone)]
pub struct TelemetryCfg {
    pub separator: char,
    pub soil1_key: String,
    pub soil2_key: String,
    pub temperature_key: String,
    pub humidity_key: String,
    pub light_key: String,
    pub require_light: bool,
    pub prefilter: bool,
}

impl Default for TelemetryCfg {
    fn default() -> Self {
        Self {
            separator: ':',
            soil1_key: "S1".into(),
            soil2_key: "S2".into(),
            temperature_key: "T".into(),
            humidity_key: "H".into(),
            light_key: "L".into(),
            require_light: false,
            prefilter: true,
        }
    }
}

/// Link timing.
#[derive(Debug, Clone)]
pub struct LinkCfg {
    pub read_timeout: Duration,
    pub reconnect_backoff: Duration,
    /// Upper bound on pending unframed bytes.
    pub max_line_bytes: usize,
}

impl Default for LinkCfg {
    fn default() -> Self {
        Self {
            read_timeout: Duration::from_millis(1000),
            reconnect_backoff: Duration::from_millis(2000),
            max_line_bytes: 4096,
        }
    }
}

/// Dose quantization.
#[derive(Debug, Clone)]
pub struct DoseCfg {
    /// Pump durations the actuator supports, in the order ties are broken.
    pub allowed_seconds: Vec<u32>,
}

impl Default for DoseCfg {
    fn default() -> Self {
        Self {
            allowed_seconds: vec![8, 14, 18, 24],
        }
    }
}
