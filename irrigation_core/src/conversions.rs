//! `From` implementations bridging `irrigation_config` types to core types,
//! plus the one place a whole `Controller` is assembled from a config file.

use std::time::Duration;

use irrigation_config::{EstimatorKind, FeatureContract};
use irrigation_traits::DoseEstimator;

use crate::config::{DoseCfg, LinkCfg, SoilAggregation, TelemetryCfg};
use crate::controller::Controller;
use crate::error::{BuildError, Result};
use crate::estimators::{FixedEstimator, LinearEstimator};
use crate::window::FeatureVector;

// ── Telemetry ────────────────────────────────────────────────────────────────

impl From<&irrigation_config::Telemetry> for TelemetryCfg {
    fn from(c: &irrigation_config::Telemetry) -> Self {
        Self {
            separator: c.separator,
            soil1_key: c.soil1_key.clone(),
            soil2_key: c.soil2_key.clone(),
            temperature_key: c.temperature_key.clone(),
            humidity_key: c.humidity_key.clone(),
            light_key: c.light_key.clone(),
            require_light: c.require_light,
            prefilter: c.prefilter,
        }
    }
}

// ── Link ─────────────────────────────────────────────────────────────────────

impl From<&irrigation_config::Config> for LinkCfg {
    fn from(c: &irrigation_config::Config) -> Self {
        Self {
            read_timeout: Duration::from_millis(c.serial.read_timeout_ms),
            reconnect_backoff: Duration::from_millis(c.serial.reconnect_backoff_ms),
            max_line_bytes: c.framing.max_line_bytes,
        }
    }
}

// ── Control / dose ───────────────────────────────────────────────────────────

impl From<irrigation_config::Aggregation> for SoilAggregation {
    fn from(a: irrigation_config::Aggregation) -> Self {
        match a {
            irrigation_config::Aggregation::Mean => SoilAggregation::Mean,
            irrigation_config::Aggregation::Max => SoilAggregation::Max,
        }
    }
}

impl From<&irrigation_config::DoseCfg> for DoseCfg {
    fn from(c: &irrigation_config::DoseCfg) -> Self {
        Self {
            allowed_seconds: c.allowed_seconds.clone(),
        }
    }
}

/// Build the configured estimator. Without a contract file the estimator
/// sees every feature the window produces, in canonical order.
pub fn estimator_from_config(
    dose: &irrigation_config::DoseCfg,
    contract: Option<&FeatureContract>,
) -> std::result::Result<Option<Box<dyn DoseEstimator>>, BuildError> {
    let names = contract.map_or_else(FeatureVector::producible_names, |c| c.features.clone());
    match dose.estimator {
        EstimatorKind::None => Ok(None),
        EstimatorKind::Fixed => {
            let seconds = dose
                .fixed_seconds
                .ok_or(BuildError::InvalidConfig("fixed estimator needs fixed_seconds"))?;
            Ok(Some(Box::new(FixedEstimator::new(names, seconds))))
        }
        EstimatorKind::Linear => {
            let lin = dose
                .linear
                .as_ref()
                .ok_or(BuildError::InvalidConfig("linear estimator needs [dose.linear]"))?;
            let est = LinearEstimator::new(names, lin.intercept, &lin.weights)?;
            Ok(Some(Box::new(est)))
        }
    }
}

/// Assemble the controller described by a validated config.
pub fn controller_from_config(
    cfg: &irrigation_config::Config,
    contract: Option<&FeatureContract>,
) -> Result<Controller> {
    let estimator = estimator_from_config(&cfg.dose, contract)?;
    Controller::builder()
        .thresholds(cfg.control.dry_threshold, cfg.control.wet_threshold)
        .aggregation(cfg.control.aggregation.into())
        .telemetry(TelemetryCfg::from(&cfg.telemetry))
        .window_capacity(cfg.window.capacity)
        .dose(DoseCfg::from(&cfg.dose))
        .boxed_estimator(estimator)
        .try_build()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(extra: &str) -> irrigation_config::Config {
        let text = format!(
            "[control]\ndry_threshold = 521.0\nwet_threshold = 480.0\n{extra}"
        );
        irrigation_config::load_toml(&text).unwrap()
    }

    #[test]
    fn default_contract_is_every_producible_feature() {
        let cfg = config("[dose]\nestimator = \"fixed\"\nfixed_seconds = 9.0\n");
        let est = estimator_from_config(&cfg.dose, None).unwrap().unwrap();
        assert_eq!(est.feature_names(), FeatureVector::producible_names().as_slice());
    }

    #[test]
    fn contract_feature_outside_window_is_rejected() {
        let cfg = config("[dose]\nestimator = \"fixed\"\nfixed_seconds = 9.0\n");
        let contract = FeatureContract::from_json(r#"{"features": ["rain_mm"]}"#).unwrap();
        let err = controller_from_config(&cfg, Some(&contract)).unwrap_err();
        assert_eq!(
            err.downcast_ref::<BuildError>(),
            Some(&BuildError::UnknownFeature("rain_mm".into()))
        );
    }

    #[test]
    fn link_cfg_uses_milliseconds() {
        let cfg = config("[serial]\nread_timeout_ms = 250\nreconnect_backoff_ms = 50\n");
        let link = LinkCfg::from(&cfg);
        assert_eq!(link.read_timeout, Duration::from_millis(250));
        assert_eq!(link.reconnect_backoff, Duration::from_millis(50));
        assert_eq!(link.max_line_bytes, 4096);
    }
}
