//! Immutable snapshot of one counting experiment.
//!
//! The rate calculation upstream produces the observed count, the expected
//! background, and the expected signal (in total and per gap between ordered
//! observed energies). The engine only reads it.

use serde::Serialize;
use tracing::warn;

use super::error::{Result, StatsError};
use crate::logging::{event_names, Stage};

/// Observed count with its background and signal expectations.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountingResult {
    events: u64,
    background: f64,
    signal: f64,
    /// Expected signal in each of the `events + 1` gaps; empty when unavailable.
    interval_signals: Vec<f64>,
}

impl CountingResult {
    /// Build a snapshot without per-gap data.
    ///
    /// Negative means are clamped to zero. NaN or infinite means are rejected.
    pub fn new(events: u64, background: f64, signal: f64) -> Result<Self> {
        Ok(Self {
            events,
            background: checked_mean("background", background)?,
            signal: checked_mean("signal", signal)?,
            interval_signals: Vec::new(),
        })
    }

    /// Attach the expected signal in each gap between observed events.
    ///
    /// The maximum-gap method needs exactly `events + 1` entries. Any other
    /// length is dropped with a warning and the snapshot falls back to the
    /// Poisson method.
    pub fn with_intervals(mut self, intervals: Vec<f64>) -> Result<Self> {
        let expected = self.events.saturating_add(1);
        if intervals.len() as u64 != expected {
            warn!(
                event = event_names::INPUT_INTERVALS_DROPPED,
                stage = %Stage::Input,
                expected,
                got = intervals.len(),
                "interval count does not match observed events; using Poisson p-value"
            );
            self.interval_signals.clear();
            return Ok(self);
        }

        self.interval_signals = intervals
            .into_iter()
            .map(|mu| checked_mean("interval signal", mu))
            .collect::<Result<Vec<_>>>()?;
        Ok(self)
    }

    /// Observed event count `N`.
    pub fn events(&self) -> u64 {
        self.events
    }

    /// Expected background events `b`.
    pub fn background(&self) -> f64 {
        self.background
    }

    /// Total expected signal events `mu_0`.
    pub fn signal(&self) -> f64 {
        self.signal
    }

    /// Expected signal per gap (`mu_1..mu_k`).
    pub fn interval_signals(&self) -> &[f64] {
        &self.interval_signals
    }

    pub fn has_intervals(&self) -> bool {
        !self.interval_signals.is_empty()
    }

    /// Largest fraction of the total signal expected in a single gap.
    ///
    /// Zero without gap data or without signal; capped at one.
    pub fn max_interval_fraction(&self) -> f64 {
        if !self.has_intervals() || self.signal <= 0.0 {
            return 0.0;
        }
        let largest = self
            .interval_signals
            .iter()
            .copied()
            .fold(0.0_f64, f64::max);
        (largest / self.signal).min(1.0)
    }
}

fn checked_mean(field: &'static str, value: f64) -> Result<f64> {
    if !value.is_finite() {
        return Err(StatsError::invalid(
            field,
            format!("must be finite, got {value}"),
        ));
    }
    Ok(clamp_mean(field, value))
}

/// Clamp a negative or NaN expectation to zero, logging the correction.
pub(crate) fn clamp_mean(field: &'static str, value: f64) -> f64 {
    if value >= 0.0 {
        return value;
    }
    warn!(
        event = event_names::INPUT_CLAMPED,
        stage = %Stage::Input,
        field,
        value,
        "invalid expectation clamped to zero"
    );
    0.0
}
