//! Two-state hysteresis over the aggregated soil signal.
//!
//! Raw capacitive probes read higher when the soil is drier, so watering
//! starts at `signal >= dry` and stops at `signal <= wet`. Between the two
//! thresholds the state does not change.

use crate::config::{SoilAggregation, Thresholds};
use crate::telemetry::Reading;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecisionState {
    #[default]
    Idle,
    Watering,
}

impl DecisionState {
    /// Wire label used in commands.
    pub fn label(self) -> &'static str {
        match self {
            DecisionState::Idle => "WATER_OFF",
            DecisionState::Watering => "WATER_ON",
        }
    }
}

/// Outcome of feeding one reading to the engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decision {
    pub state: DecisionState,
    pub previous: DecisionState,
    /// Aggregated soil value the decision was made on.
    pub signal: f64,
}

impl Decision {
    pub fn changed(&self) -> bool {
        self.state != self.previous
    }
}

#[derive(Debug, Clone)]
pub struct HysteresisEngine {
    state: DecisionState,
    thresholds: Thresholds,
    aggregation: SoilAggregation,
}

impl HysteresisEngine {
    pub fn new(thresholds: Thresholds, aggregation: SoilAggregation) -> Self {
        Self {
            state: DecisionState::Idle,
            thresholds,
            aggregation,
        }
    }

    pub fn state(&self) -> DecisionState {
        self.state
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    pub fn aggregation(&self) -> SoilAggregation {
        self.aggregation
    }

    /// Aggregated soil signal for `r`.
    #[inline]
    pub fn signal(&self, r: &Reading) -> f64 {
        self.aggregation.apply(r.soil1(), r.soil2())
    }

    /// Advance the state machine on one raw signal value.
    pub fn step(&mut self, signal: f64) -> Decision {
        let previous = self.state;
        self.state = match previous {
            DecisionState::Idle if signal >= self.thresholds.dry() => DecisionState::Watering,
            DecisionState::Watering if signal <= self.thresholds.wet() => DecisionState::Idle,
            s => s,
        };
        Decision {
            state: self.state,
            previous,
            signal,
        }
    }

    pub fn update(&mut self, r: &Reading) -> Decision {
        let signal = self.signal(r);
        self.step(signal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> HysteresisEngine {
        HysteresisEngine::new(Thresholds::new(521.0, 480.0).unwrap(), SoilAggregation::Mean)
    }

    #[test]
    fn starts_idle() {
        assert_eq!(engine().state(), DecisionState::Idle);
    }

    #[test]
    fn thresholds_are_inclusive() {
        let mut e = engine();
        assert!(e.step(521.0).changed());
        assert_eq!(e.state(), DecisionState::Watering);
        assert!(e.step(480.0).changed());
        assert_eq!(e.state(), DecisionState::Idle);
    }

    #[test]
    fn band_is_sticky_both_ways() {
        let mut e = engine();
        for v in [500.0, 520.99, 480.01] {
            assert!(!e.step(v).changed());
        }
        e.step(600.0);
        for v in [500.0, 520.99, 480.01, 700.0] {
            assert_eq!(e.step(v).state, DecisionState::Watering);
        }
    }

    #[test]
    fn max_aggregation_reacts_to_driest_probe() {
        let mut e = HysteresisEngine::new(
            Thresholds::new(521.0, 480.0).unwrap(),
            SoilAggregation::Max,
        );
        let r = Reading::new(530.0, 500.0, 20.0, 50.0, None);
        let d = e.update(&r);
        assert_eq!(d.signal, 530.0);
        assert_eq!(d.state, DecisionState::Watering);
    }

    #[test]
    fn labels() {
        assert_eq!(DecisionState::Idle.label(), "WATER_OFF");
        assert_eq!(DecisionState::Watering.label(), "WATER_ON");
    }
}
