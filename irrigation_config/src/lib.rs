#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schemas and the feature-contract loader for the irrigation loop.
//!
//! - `Config` and its sections are deserialized from TOML and validated.
//! - The feature contract is the JSON artifact shipped next to a dose model:
//!   `{"features": ["soil_avg_pre_mean", ...]}`.
use std::collections::{BTreeMap, HashSet};

use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Serial {
    /// Device path, e.g. `/dev/serial0` (UART) or `/dev/rfcomm0` (Bluetooth SPP).
    pub port: String,
    pub baud: u32,
    /// Upper bound on a single blocking read (ms).
    pub read_timeout_ms: u64,
    /// Wait after a link failure before the next open attempt (ms).
    pub reconnect_backoff_ms: u64,
}

impl Default for Serial {
    fn default() -> Self {
        Self {
            port: "/dev/rfcomm0".to_string(),
            baud: 9600,
            read_timeout_ms: 1000,
            reconnect_backoff_ms: 2000,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Framing {
    /// Longest pending record tolerated before the buffer is discarded.
    pub max_line_bytes: usize,
}

impl Default for Framing {
    fn default() -> Self {
        Self {
            max_line_bytes: 4096,
        }
    }
}

/// Telemetry key names. The MCU firmware variants disagree on naming
/// (`S1`/`SOIL1`, `T`/`TEMP`, ...) and on the key/value separator.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Telemetry {
    pub separator: char,
    pub soil1_key: String,
    pub soil2_key: String,
    pub temperature_key: String,
    pub humidity_key: String,
    pub light_key: String,
    pub require_light: bool,
    /// Drop lines lacking both soil keys before a full parse.
    pub prefilter: bool,
}

impl Default for Telemetry {
    fn default() -> Self {
        Self {
            separator: ':',
            soil1_key: "S1".to_string(),
            soil2_key: "S2".to_string(),
            temperature_key: "T".to_string(),
            humidity_key: "H".to_string(),
            light_key: "L".to_string(),
            require_light: false,
            prefilter: true,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct WindowCfg {
    /// Readings kept for dose features.
    pub capacity: usize,
}

impl Default for WindowCfg {
    fn default() -> Self {
        Self { capacity: 10 }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Aggregation {
    #[default]
    Mean,
    Max,
}

#[derive(Debug, Deserialize)]
pub struct ControlCfg {
    /// Start watering once the soil signal reaches this value.
    pub dry_threshold: f64,
    /// Stop watering once the soil signal falls to this value.
    pub wet_threshold: f64,
    #[serde(default)]
    pub aggregation: Aggregation,
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EstimatorKind {
    #[default]
    None,
    Fixed,
    Linear,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct LinearCfg {
    pub intercept: f64,
    /// Coefficient per feature name; names absent here weigh zero.
    pub weights: BTreeMap<String, f64>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DoseCfg {
    /// Discrete pump run durations the actuator supports (s).
    pub allowed_seconds: Vec<u32>,
    /// Path to the feature-contract JSON. Relative paths resolve against the config file.
    pub contract: Option<String>,
    pub estimator: EstimatorKind,
    /// Prediction returned by the `fixed` estimator.
    pub fixed_seconds: Option<f64>,
    pub linear: Option<LinearCfg>,
}

impl Default for DoseCfg {
    fn default() -> Self {
        Self {
            allowed_seconds: vec![8, 14, 18, 24],
            contract: None,
            estimator: EstimatorKind::None,
            fixed_seconds: None,
            linear: None,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub serial: Serial,
    #[serde(default)]
    pub framing: Framing,
    #[serde(default)]
    pub telemetry: Telemetry,
    #[serde(default)]
    pub window: WindowCfg,
    pub control: ControlCfg,
    #[serde(default)]
    pub dose: DoseCfg,
    #[serde(default)]
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Serial
        if self.serial.port.trim().is_empty() {
            eyre::bail!("serial.port must not be empty");
        }
        if self.serial.baud == 0 {
            eyre::bail!("serial.baud must be > 0");
        }
        if self.serial.read_timeout_ms == 0 {
            eyre::bail!("serial.read_timeout_ms must be >= 1");
        }
        if self.serial.read_timeout_ms > 60_000 {
            eyre::bail!("serial.read_timeout_ms is unreasonably large (>60s)");
        }
        if self.serial.reconnect_backoff_ms == 0 {
            eyre::bail!("serial.reconnect_backoff_ms must be >= 1");
        }
        if self.serial.reconnect_backoff_ms > 10 * 60 * 1000 {
            eyre::bail!("serial.reconnect_backoff_ms is unreasonably large (>10min)");
        }

        // Framing
        if self.framing.max_line_bytes < 16 {
            eyre::bail!("framing.max_line_bytes must be >= 16");
        }

        // Telemetry
        let t = &self.telemetry;
        if t.separator == ',' || t.separator.is_whitespace() {
            eyre::bail!("telemetry.separator must not be ',' or whitespace");
        }
        let keys = [
            ("telemetry.soil1_key", &t.soil1_key),
            ("telemetry.soil2_key", &t.soil2_key),
            ("telemetry.temperature_key", &t.temperature_key),
            ("telemetry.humidity_key", &t.humidity_key),
            ("telemetry.light_key", &t.light_key),
        ];
        let mut seen = HashSet::new();
        for (name, key) in keys {
            if key.trim().is_empty() {
                eyre::bail!("{name} must not be empty");
            }
            if key.contains(',') || key.contains(t.separator) {
                eyre::bail!("{name} must not contain ',' or the separator");
            }
            if !seen.insert(key.as_str()) {
                eyre::bail!("{name} duplicates another telemetry key ({key})");
            }
        }

        // Window
        if self.window.capacity == 0 {
            eyre::bail!("window.capacity must be >= 1");
        }
        if self.window.capacity > 10_000 {
            eyre::bail!("window.capacity is unreasonably large (>10000)");
        }

        // Control
        let c = &self.control;
        if !c.dry_threshold.is_finite() || !c.wet_threshold.is_finite() {
            eyre::bail!("control thresholds must be finite numbers");
        }
        if c.wet_threshold >= c.dry_threshold {
            eyre::bail!(
                "control.wet_threshold must be < control.dry_threshold (got wet={}, dry={})",
                c.wet_threshold,
                c.dry_threshold
            );
        }

        // Dose
        let d = &self.dose;
        if d.allowed_seconds.is_empty() {
            eyre::bail!("dose.allowed_seconds must not be empty");
        }
        if d.allowed_seconds.contains(&0) {
            eyre::bail!("dose.allowed_seconds entries must be > 0");
        }
        match d.estimator {
            EstimatorKind::None => {}
            EstimatorKind::Fixed => match d.fixed_seconds {
                Some(s) if s.is_finite() && s >= 0.0 => {}
                Some(_) => eyre::bail!("dose.fixed_seconds must be a finite number >= 0"),
                None => eyre::bail!("dose.fixed_seconds is required when dose.estimator = \"fixed\""),
            },
            EstimatorKind::Linear => {
                let Some(lin) = &d.linear else {
                    eyre::bail!("[dose.linear] is required when dose.estimator = \"linear\"");
                };
                if !lin.intercept.is_finite() {
                    eyre::bail!("dose.linear.intercept must be finite");
                }
                if let Some((name, _)) = lin.weights.iter().find(|(_, w)| !w.is_finite()) {
                    eyre::bail!("dose.linear.weights.{name} must be finite");
                }
            }
        }

        // Logging
        if let Some(rot) = self.logging.rotation.as_deref()
            && !matches!(rot, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly");
        }

        Ok(())
    }
}

/// Feature contract artifact: the ordered list of inputs a dose model expects.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct FeatureContract {
    pub features: Vec<String>,
}

impl FeatureContract {
    pub fn from_json(s: &str) -> eyre::Result<Self> {
        let contract: FeatureContract = serde_json::from_str(s)
            .map_err(|e| eyre::eyre!("parse feature contract JSON: {e}"))?;
        contract.check()?;
        Ok(contract)
    }

    fn check(&self) -> eyre::Result<()> {
        if self.features.is_empty() {
            eyre::bail!("feature contract lists no features");
        }
        let mut seen = HashSet::new();
        for name in &self.features {
            if name.trim().is_empty() {
                eyre::bail!("feature contract contains an empty feature name");
            }
            if !seen.insert(name.as_str()) {
                eyre::bail!("feature contract lists '{name}' more than once");
            }
        }
        Ok(())
    }
}

pub fn load_feature_contract(path: &std::path::Path) -> eyre::Result<FeatureContract> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| eyre::eyre!("open feature contract {:?}: {}", path, e))?;
    FeatureContract::from_json(&text)
        .map_err(|e| eyre::eyre!("feature contract {:?}: {}", path, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[control]
dry_threshold = 521.0
wet_threshold = 480.0
"#;

    #[test]
    fn minimal_config_fills_defaults() {
        let cfg = load_toml(MINIMAL).unwrap();
        cfg.validate().unwrap();
        assert_eq!(cfg.serial.baud, 9600);
        assert_eq!(cfg.serial.reconnect_backoff_ms, 2000);
        assert_eq!(cfg.window.capacity, 10);
        assert_eq!(cfg.dose.allowed_seconds, vec![8, 14, 18, 24]);
        assert_eq!(cfg.telemetry.separator, ':');
        assert_eq!(cfg.control.aggregation, Aggregation::Mean);
        assert_eq!(cfg.dose.estimator, EstimatorKind::None);
    }

    #[test]
    fn contract_rejects_duplicates() {
        let err = FeatureContract::from_json(r#"{"features": ["a", "b", "a"]}"#).unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn contract_preserves_order() {
        let c = FeatureContract::from_json(r#"{"features": ["z", "a", "m"]}"#).unwrap();
        assert_eq!(c.features, vec!["z", "a", "m"]);
    }
}
