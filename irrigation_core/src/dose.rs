//! Dose step: window features → external estimator → discrete pump duration.

use irrigation_traits::DoseEstimator;

use crate::config::DoseCfg;
use crate::error::{BuildError, EstimatorError};
use crate::telemetry::Reading;
use crate::window::{FeatureVector, InsufficientData, Window};

/// Nearest element of `allowed` to `x`; ties go to the earlier element.
///
/// `None` when `allowed` is empty or `x` is not finite.
pub fn snap_to_allowed(x: f64, allowed: &[u32]) -> Option<u32> {
    if !x.is_finite() {
        return None;
    }
    let mut best: Option<(u32, f64)> = None;
    for &a in allowed {
        let d = (f64::from(a) - x).abs();
        match best {
            Some((_, best_d)) if d >= best_d => {}
            _ => best = Some((a, d)),
        }
    }
    best.map(|(a, _)| a)
}

/// Pick the contract's features out of `fv`, in contract order.
pub fn assemble(fv: &FeatureVector, contract: &[String]) -> Result<Vec<f64>, BuildError> {
    contract
        .iter()
        .map(|name| {
            fv.get(name)
                .ok_or_else(|| BuildError::UnknownFeature(name.clone()))
        })
        .collect()
}

/// Result of the dose step for one watering record.
#[derive(Debug, Clone, PartialEq)]
pub enum DoseOutcome {
    Planned { predicted: f64, seconds: u32 },
    InsufficientHistory(InsufficientData),
    Unavailable(EstimatorError),
}

impl DoseOutcome {
    /// Seconds to put on the wire; zero unless a dose was planned.
    pub fn seconds(&self) -> u32 {
        match self {
            DoseOutcome::Planned { seconds, .. } => *seconds,
            _ => 0,
        }
    }
}

pub struct DosePlanner {
    estimator: Option<Box<dyn DoseEstimator>>,
    allowed: Vec<u32>,
}

impl std::fmt::Debug for DosePlanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DosePlanner")
            .field(
                "contract",
                &self.estimator.as_ref().map(|e| e.feature_names().len()),
            )
            .field("allowed", &self.allowed)
            .finish()
    }
}

impl DosePlanner {
    /// Check the estimator's contract against what the window can produce.
    pub fn new(estimator: Option<Box<dyn DoseEstimator>>, cfg: DoseCfg) -> Result<Self, BuildError> {
        if cfg.allowed_seconds.is_empty() {
            return Err(BuildError::InvalidConfig("allowed dose durations must not be empty"));
        }
        if let Some(est) = &estimator {
            let producible = FeatureVector::producible_names();
            if let Some(missing) = est
                .feature_names()
                .iter()
                .find(|name| !producible.contains(*name))
            {
                return Err(BuildError::UnknownFeature(missing.clone()));
            }
        }
        Ok(Self {
            estimator,
            allowed: cfg.allowed_seconds,
        })
    }

    pub fn allowed(&self) -> &[u32] {
        &self.allowed
    }

    pub fn has_estimator(&self) -> bool {
        self.estimator.is_some()
    }

    pub fn plan(&self, window: &Window, at_event: &Reading) -> DoseOutcome {
        let fv = match window.build_features(at_event) {
            Ok(fv) => fv,
            Err(short) => return DoseOutcome::InsufficientHistory(short),
        };
        let Some(est) = &self.estimator else {
            return DoseOutcome::Unavailable(EstimatorError::Unavailable);
        };
        let inputs = match assemble(&fv, est.feature_names()) {
            Ok(v) => v,
            Err(e) => return DoseOutcome::Unavailable(EstimatorError::Failed(e.to_string())),
        };
        let predicted = match est.predict(&inputs) {
            Ok(p) => p,
            Err(e) => return DoseOutcome::Unavailable(EstimatorError::Failed(e.to_string())),
        };
        match snap_to_allowed(predicted, &self.allowed) {
            Some(seconds) => DoseOutcome::Planned { predicted, seconds },
            None => DoseOutcome::Unavailable(EstimatorError::NonFinite(predicted)),
        }
    }
}
