use crate::types::Channel;
use serde::Serialize;
use std::time::Duration;

// ---------------------------------------------------------------------------
// DispenseStep
// ---------------------------------------------------------------------------

/// One actuation: hold `channel` open for `duration_secs`.
///
/// Durations are fixed when the plan is built; reloading calibration later
/// never changes a plan that already exists.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DispenseStep {
    pub channel: Channel,
    pub label: String,
    /// Units dispensed. Zero marks a manual test step.
    pub amount: f64,
    pub duration_secs: f64,
    /// Seconds per unit used to compute the duration (zero for test steps).
    pub rate_used: f64,
}

impl DispenseStep {
    pub fn measured(channel: Channel, label: impl Into<String>, amount: f64, rate: f64) -> Self {
        Self {
            channel,
            label: label.into(),
            amount,
            duration_secs: amount * rate,
            rate_used: rate,
        }
    }

    pub fn test(channel: Channel, label: impl Into<String>, seconds: f64) -> Self {
        Self {
            channel,
            label: label.into(),
            amount: 0.0,
            duration_secs: seconds,
            rate_used: 0.0,
        }
    }

    pub fn is_test(&self) -> bool {
        self.amount == 0.0
    }

    pub fn duration(&self) -> Duration {
        saturating_secs(self.duration_secs)
    }
}

/// Seconds to a `Duration`, clamped: negative or NaN is zero, anything too
/// large for a `Duration` is `Duration::MAX`.
pub fn saturating_secs(secs: f64) -> Duration {
    if secs.is_nan() || secs <= 0.0 {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
}

// ---------------------------------------------------------------------------
// DispensePlan
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct DispensePlan {
    steps: Vec<DispenseStep>,
}

impl DispensePlan {
    pub fn new(steps: Vec<DispenseStep>) -> Self {
        Self { steps }
    }

    pub fn steps(&self) -> &[DispenseStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Sum of every step's hold time, saturating at `Duration::MAX`.
    pub fn dispense_time(&self) -> Duration {
        self.steps
            .iter()
            .map(DispenseStep::duration)
            .fold(Duration::ZERO, Duration::saturating_add)
    }

    /// Expected wall time: every hold plus a settle pause between steps.
    pub fn estimated_total(&self, settle: Duration) -> Duration {
        let pauses = u32::try_from(self.steps.len().saturating_sub(1)).unwrap_or(u32::MAX);
        self.dispense_time()
            .saturating_add(settle.saturating_mul(pauses))
    }
}

// ---------------------------------------------------------------------------
// Pacing
// ---------------------------------------------------------------------------

/// Timing rules the worker applies to one job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    /// Pause between consecutive steps.
    pub settle: Duration,
    /// Abort the remaining steps once this much time has elapsed.
    pub max_total: Option<Duration>,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            settle: Duration::from_millis(500),
            max_total: None,
        }
    }
}
