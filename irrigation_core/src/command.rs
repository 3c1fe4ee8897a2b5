//! Wire encoding of actuation commands: `CMD:<WATER_ON|WATER_OFF>;SEC:<int>\n`.

use std::fmt;

use crate::engine::DecisionState;

/// One command per processed record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Command {
    decision: DecisionState,
    seconds: u32,
}

impl Command {
    /// Seconds are dropped for `Idle`; only a watering command carries a dose.
    pub fn new(decision: DecisionState, seconds: u32) -> Self {
        let seconds = match decision {
            DecisionState::Watering => seconds,
            DecisionState::Idle => 0,
        };
        Self { decision, seconds }
    }

    pub fn decision(&self) -> DecisionState {
        self.decision
    }

    pub fn seconds(&self) -> u32 {
        self.seconds
    }

    pub fn to_line(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "CMD:{};SEC:{}", self.decision.label(), self.seconds)
    }
}

/// Encode a decision with a continuous duration; fractions are truncated.
pub fn encode(decision: DecisionState, seconds: f64) -> String {
    Command::new(decision, truncate_seconds(seconds)).to_line()
}

/// Truncate toward zero. Negative, NaN and sub-second values become 0;
/// values past `u32::MAX` saturate.
pub fn truncate_seconds(seconds: f64) -> u32 {
    // `as` saturates and maps NaN to 0
    seconds.trunc() as u32
}
