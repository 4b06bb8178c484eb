//! Polling schedules
//!
//! A schedule yields the pauses between successive status checks: a short
//! warm-up ramp, then a steady interval forever, optionally cut off once the
//! cumulative wait has exceeded a maximum. The interval that crosses the
//! bound is still yielded.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Lazy sequence of wait intervals
#[derive(Debug, Clone)]
pub struct PollingSchedule {
    warmup: Vec<Duration>,
    rest: Duration,
    max_duration: Option<Duration>,
    position: usize,
    elapsed: Duration,
    exhausted: bool,
}

impl PollingSchedule {
    /// Create a schedule from a warm-up ramp, a steady interval and an optional bound
    pub fn new(warmup: Vec<Duration>, rest: Duration, max_duration: Option<Duration>) -> Self {
        Self {
            warmup,
            rest,
            max_duration,
            position: 0,
            elapsed: Duration::ZERO,
            exhausted: false,
        }
    }

    /// Total time yielded so far
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Maximum cumulative wait, if bounded
    pub fn max_duration(&self) -> Option<Duration> {
        self.max_duration
    }
}

impl Default for PollingSchedule {
    fn default() -> Self {
        Self::new(
            vec![
                Duration::from_millis(100),
                Duration::from_millis(200),
                Duration::from_millis(300),
                Duration::from_millis(500),
            ],
            Duration::from_secs(1),
            None,
        )
    }
}

impl Iterator for PollingSchedule {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        if self.exhausted || self.max_duration.is_some_and(|max| self.elapsed > max) {
            self.exhausted = true;
            return None;
        }

        let interval = self.warmup.get(self.position).copied().unwrap_or(self.rest);
        if self.position < self.warmup.len() {
            self.position += 1;
        }
        self.elapsed += interval;
        Some(interval)
    }
}

/// Serializable polling settings, in seconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    /// Warm-up intervals
    pub warmup_secs: Vec<f64>,
    /// Steady interval after the warm-up
    pub rest_secs: f64,
    /// Stop once the cumulative wait has exceeded this
    pub max_duration_secs: Option<f64>,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            warmup_secs: vec![0.1, 0.2, 0.3, 0.5],
            rest_secs: 1.0,
            max_duration_secs: None,
        }
    }
}

impl PollingConfig {
    /// Default ramp bounded by `max_duration`
    pub fn bounded(max_duration: Duration) -> Self {
        Self {
            max_duration_secs: Some(max_duration.as_secs_f64()),
            ..Self::default()
        }
    }

    /// Constant interval with no warm-up
    pub fn fixed(interval: Duration, max_duration: Option<Duration>) -> Self {
        Self {
            warmup_secs: Vec::new(),
            rest_secs: interval.as_secs_f64(),
            max_duration_secs: max_duration.map(|d| d.as_secs_f64()),
        }
    }

    /// Build a fresh schedule
    pub fn schedule(&self) -> Result<PollingSchedule> {
        let warmup = self
            .warmup_secs
            .iter()
            .map(|&secs| to_duration("warmup_secs", secs))
            .collect::<Result<Vec<_>>>()?;

        let rest = to_duration("rest_secs", self.rest_secs)?;
        if rest.is_zero() {
            return Err(Error::invalid_value("rest_secs", "must be greater than zero"));
        }

        let max_duration = self
            .max_duration_secs
            .map(|secs| to_duration("max_duration_secs", secs))
            .transpose()?;

        Ok(PollingSchedule::new(warmup, rest, max_duration))
    }
}

fn to_duration(field: &str, secs: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(secs)
        .map_err(|e| Error::invalid_value(field, format!("{secs} is not a valid duration: {e}")))
}
