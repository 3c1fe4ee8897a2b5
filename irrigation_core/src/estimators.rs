//! Dose estimators that ship with the controller.
//!
//! Trained models plug in through `irrigation_traits::DoseEstimator`; these
//! two cover bench setups and hand-fitted linear models.

use std::collections::BTreeMap;

use irrigation_traits::{BoxError, DoseEstimator};

use crate::error::BuildError;

/// Always predicts the same duration.
#[derive(Debug, Clone)]
pub struct FixedEstimator {
    features: Vec<String>,
    seconds: f64,
}

impl FixedEstimator {
    pub fn new(contract: Vec<String>, seconds: f64) -> Self {
        Self {
            features: contract,
            seconds,
        }
    }
}

impl DoseEstimator for FixedEstimator {
    fn feature_names(&self) -> &[String] {
        &self.features
    }

    fn predict(&self, _features: &[f64]) -> Result<f64, BoxError> {
        Ok(self.seconds)
    }
}

/// `intercept + Σ weight_i · feature_i` over the contract features.
#[derive(Debug, Clone)]
pub struct LinearEstimator {
    features: Vec<String>,
    intercept: f64,
    weights: Vec<f64>,
}

impl LinearEstimator {
    /// Align `weights` to `contract` order. Contract features without a
    /// weight get zero; a weight naming a feature outside the contract is an error.
    pub fn new(
        contract: Vec<String>,
        intercept: f64,
        weights: &BTreeMap<String, f64>,
    ) -> Result<Self, BuildError> {
        if let Some(stray) = weights.keys().find(|k| !contract.contains(*k)) {
            return Err(BuildError::UnknownWeight(stray.clone()));
        }
        let aligned = contract
            .iter()
            .map(|name| weights.get(name).copied().unwrap_or(0.0))
            .collect();
        Ok(Self {
            features: contract,
            intercept,
            weights: aligned,
        })
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }
}

impl DoseEstimator for LinearEstimator {
    fn feature_names(&self) -> &[String] {
        &self.features
    }

    fn predict(&self, features: &[f64]) -> Result<f64, BoxError> {
        if features.len() != self.weights.len() {
            return Err(format!(
                "expected {} features, got {}",
                self.weights.len(),
                features.len()
            )
            .into());
        }
        Ok(self.intercept
            + self
                .weights
                .iter()
                .zip(features)
                .map(|(w, x)| w * x)
                .sum::<f64>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn linear_aligns_weights_to_contract_order() {
        let mut w = BTreeMap::new();
        w.insert("soil_avg_at_event".to_string(), 0.05);
        w.insert("temp_at_event".to_string(), 0.5);
        let est = LinearEstimator::new(
            names(&["temp_at_event", "humidity_at_event", "soil_avg_at_event"]),
            -20.0,
            &w,
        )
        .unwrap();
        assert_eq!(est.weights(), &[0.5, 0.0, 0.05]);
        let y = est.predict(&[24.0, 60.0, 530.0]).unwrap();
        assert!((y - (-20.0 + 12.0 + 26.5)).abs() < 1e-9);
    }

    #[test]
    fn linear_rejects_stray_weight() {
        let mut w = BTreeMap::new();
        w.insert("rain".to_string(), 1.0);
        let err = LinearEstimator::new(names(&["temp_at_event"]), 0.0, &w).unwrap_err();
        assert_eq!(err, BuildError::UnknownWeight("rain".into()));
    }

    #[test]
    fn linear_rejects_wrong_arity() {
        let est = LinearEstimator::new(names(&["a", "b"]), 0.0, &BTreeMap::new()).unwrap();
        assert!(est.predict(&[1.0]).is_err());
    }

    #[test]
    fn fixed_ignores_inputs() {
        let est = FixedEstimator::new(names(&["soil_avg_at_event"]), 13.0);
        assert_eq!(est.predict(&[999.0]).unwrap(), 13.0);
        assert_eq!(est.feature_names(), &["soil_avg_at_event".to_string()]);
    }
}
