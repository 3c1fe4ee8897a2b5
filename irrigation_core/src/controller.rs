//! The per-record pipeline: parse → decide → window → (dose) → command.
//!
//! `Controller` owns every piece of mutable loop state (decision state,
//! window) and is built once at startup through `Controller::builder()`.

use irrigation_traits::DoseEstimator;

use crate::command::Command;
use crate::config::{DoseCfg, SoilAggregation, TelemetryCfg, Thresholds};
use crate::dose::{DoseOutcome, DosePlanner};
use crate::engine::{Decision, DecisionState, HysteresisEngine};
use crate::error::{BuildError, Result};
use crate::telemetry::{Reading, TelemetryParser};
use crate::window::Window;

/// Everything that happened for one accepted record.
#[derive(Debug, Clone, PartialEq)]
pub struct Cycle {
    pub reading: Reading,
    pub decision: Decision,
    /// `None` while idle; the dose step only runs when watering.
    pub dose: Option<DoseOutcome>,
    pub command: Command,
}

pub struct Controller {
    parser: TelemetryParser,
    engine: HysteresisEngine,
    window: Window,
    planner: DosePlanner,
}

impl std::fmt::Debug for Controller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("state", &self.engine.state())
            .field("thresholds", self.engine.thresholds())
            .field(
                "window",
                &format!("{}/{}", self.window.len(), self.window.capacity()),
            )
            .field("planner", &self.planner)
            .finish()
    }
}

impl Controller {
    pub fn builder() -> ControllerBuilder {
        ControllerBuilder::default()
    }

    pub fn state(&self) -> DecisionState {
        self.engine.state()
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    pub fn engine(&self) -> &HysteresisEngine {
        &self.engine
    }

    pub fn planner(&self) -> &DosePlanner {
        &self.planner
    }

    /// Run one framed line through the pipeline.
    ///
    /// Returns `None` for a line that is not a complete record; nothing is
    /// mutated in that case.
    pub fn process_line(&mut self, line: &str) -> Option<Cycle> {
        if self.parser.config().prefilter && !self.parser.passes_prefilter(line) {
            tracing::trace!(line, "line skipped by prefilter");
            return None;
        }
        let Some(reading) = self.parser.parse(line) else {
            tracing::debug!(line, "dropping incomplete telemetry record");
            return None;
        };
        Some(self.process_reading(reading))
    }

    /// Decide on a parsed reading, record it, and plan a dose if watering.
    pub fn process_reading(&mut self, reading: Reading) -> Cycle {
        let decision = self.engine.update(&reading);
        if decision.changed() {
            tracing::info!(
                from = decision.previous.label(),
                to = decision.state.label(),
                soil = decision.signal,
                aggregation = self.engine.aggregation().name(),
                "decision changed"
            );
        }
        self.window.append(reading);

        let dose = match decision.state {
            DecisionState::Idle => None,
            DecisionState::Watering => {
                let outcome = self.planner.plan(&self.window, &reading);
                match &outcome {
                    DoseOutcome::Planned { predicted, seconds } => {
                        tracing::info!(predicted, seconds, "dose planned");
                    }
                    DoseOutcome::InsufficientHistory(short) => {
                        tracing::debug!(%short, "not enough history for a dose");
                    }
                    DoseOutcome::Unavailable(e) => {
                        tracing::warn!(error = %e, "dose unavailable; sending 0 s");
                    }
                }
                Some(outcome)
            }
        };

        let seconds = dose.as_ref().map_or(0, DoseOutcome::seconds);
        Cycle {
            reading,
            decision,
            dose,
            command: Command::new(decision.state, seconds),
        }
    }
}

/// Builder for `Controller`. Thresholds are required; the rest defaults.
#[derive(Default)]
pub struct ControllerBuilder {
    thresholds: Option<(f64, f64)>,
    aggregation: SoilAggregation,
    telemetry: TelemetryCfg,
    window_capacity: Option<usize>,
    dose: DoseCfg,
    estimator: Option<Box<dyn DoseEstimator>>,
}

impl ControllerBuilder {
    /// Start watering at `dry`, stop at `wet`.
    pub fn thresholds(mut self, dry: f64, wet: f64) -> Self {
        self.thresholds = Some((dry, wet));
        self
    }

    pub fn aggregation(mut self, aggregation: SoilAggregation) -> Self {
        self.aggregation = aggregation;
        self
    }

    pub fn telemetry(mut self, cfg: TelemetryCfg) -> Self {
        self.telemetry = cfg;
        self
    }

    pub fn window_capacity(mut self, n: usize) -> Self {
        self.window_capacity = Some(n);
        self
    }

    pub fn dose(mut self, cfg: DoseCfg) -> Self {
        self.dose = cfg;
        self
    }

    pub fn estimator(mut self, estimator: impl DoseEstimator + 'static) -> Self {
        self.estimator = Some(Box::new(estimator));
        self
    }

    pub fn boxed_estimator(mut self, estimator: Option<Box<dyn DoseEstimator>>) -> Self {
        self.estimator = estimator;
        self
    }

    pub fn try_build(self) -> Result<Controller> {
        let (dry, wet) = self
            .thresholds
            .ok_or_else(|| eyre::Report::new(BuildError::MissingThresholds))?;
        let thresholds = Thresholds::new(dry, wet)?;
        let capacity = self.window_capacity.unwrap_or(10);
        if capacity == 0 {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "window capacity must be >= 1",
            )));
        }
        let planner = DosePlanner::new(self.estimator, self.dose)?;
        if !planner.has_estimator() {
            tracing::warn!("no dose estimator configured; watering commands carry 0 s");
        }
        Ok(Controller {
            parser: TelemetryParser::new(self.telemetry),
            engine: HysteresisEngine::new(thresholds, self.aggregation),
            window: Window::new(capacity),
            planner,
        })
    }
}
