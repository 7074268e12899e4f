//! The engine's public operations.
//!
//! - [`log_likelihood`]: `ln P(N | b + s)`
//! - [`log_p_value`]: maximum-gap p-value when gap data is available,
//!   Poisson otherwise
//! - [`scale_to_p_value`]: factor `x` such that the signal `x * s` reaches a
//!   target p-value
//! - [`confidence_interval`]: Feldman-Cousins signal interval
//!
//! Each takes plain numbers; [`CountingResult`] has the same operations as
//! methods. A scale of `+inf` means no finite rescaling reaches the target.

use dd_math::log_poisson_pmf;
use serde::Serialize;
use tracing::debug;

use super::counting::{clamp_mean, CountingResult};
use super::error::{Result, StatsError};
use super::feldman_cousins::{self, ConfidenceInterval};
use super::pvalue::{maximum_gap_log_p_value, poisson_log_p_value};
use super::root::RootFinder;
use crate::config::{AnalysisConfig, EngineConfig, RootConfig};
use crate::logging::{event_names, Stage};

/// Optional settings for an analysis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AnalysisOptions {
    /// Target log p-value, `ln(1 - CL)`.
    pub lnp: f64,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            lnp: (0.1f64).ln(),
        }
    }
}

impl AnalysisOptions {
    pub fn new(lnp: f64) -> Result<Self> {
        if lnp.is_nan() || lnp > 0.0 {
            return Err(StatsError::invalid(
                "lnp",
                format!("must be a log probability (<= 0), got {lnp}"),
            ));
        }
        Ok(Self { lnp })
    }

    /// From a confidence level in `[0, 1]`.
    pub fn from_confidence_level(cl: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&cl) {
            return Err(StatsError::invalid(
                "confidence level",
                format!("must be within [0, 1], got {cl}"),
            ));
        }
        Ok(Self { lnp: (-cl).ln_1p() })
    }

    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self {
            lnp: config.default_lnp,
        }
    }

    pub fn confidence_level(&self) -> f64 {
        -self.lnp.exp_m1()
    }
}

/// `ln P(n | b + s)`.
pub fn log_likelihood(n: u64, background: f64, signal: f64) -> f64 {
    log_poisson_pmf(
        n,
        clamp_mean("background", background) + clamp_mean("signal", signal),
    )
}

/// Exclusion log p-value for signal `s`.
///
/// With gap data the maximum-gap method is used, with the largest gap
/// holding `max_fraction * s` expected events. Otherwise the Poisson
/// probability of `n` or fewer events from the signal alone. Neither method
/// subtracts background; `_background` is taken for symmetry with the other
/// operations.
pub fn log_p_value(
    n: u64,
    _background: f64,
    signal: f64,
    has_intervals: bool,
    max_fraction: f64,
) -> Result<f64> {
    let signal = clamp_mean("signal", signal);
    if has_intervals {
        maximum_gap_log_p_value(signal, max_fraction * signal)
    } else {
        poisson_log_p_value(n, signal)
    }
}

/// Factor `x` by which the signal must be multiplied for the log p-value to
/// reach `lnp`.
///
/// Returns `0` when `lnp >= 0` and `+inf` when no finite factor exists (no
/// signal, `lnp = -inf`, or a maximum-gap analysis without a populated gap).
pub fn scale_to_p_value(
    lnp: f64,
    n: u64,
    _background: f64,
    signal: f64,
    has_intervals: bool,
    max_fraction: f64,
    root: &RootConfig,
) -> Result<f64> {
    if lnp.is_nan() {
        return Err(StatsError::invalid("lnp", "must not be NaN"));
    }
    if lnp >= 0.0 {
        return Ok(0.0);
    }
    let mu = clamp_mean("signal", signal);
    if mu <= 0.0 || lnp == f64::NEG_INFINITY {
        return Ok(f64::INFINITY);
    }
    let fraction = if max_fraction.is_nan() {
        0.0
    } else {
        max_fraction.min(1.0)
    };
    if has_intervals && fraction <= 0.0 {
        return Ok(f64::INFINITY);
    }

    // lnp(x) = -x mu: zero events, or the whole signal in the largest gap
    if n == 0 || (has_intervals && fraction >= 1.0) {
        let x = -lnp / mu;
        debug!(
            event = event_names::SCALE_CLOSED_FORM,
            stage = %Stage::Scale,
            n, mu, x,
            "closed-form scale"
        );
        return Ok(x);
    }

    let seed = (n.max(1) as f64) / mu;
    let finder = RootFinder::new(root);
    if has_intervals {
        finder.solve_decreasing(
            |x| maximum_gap_log_p_value(x * mu, x * fraction * mu),
            lnp,
            seed,
        )
    } else {
        finder.solve_decreasing(|x| poisson_log_p_value(n, x * mu), lnp, seed)
    }
}

/// Feldman-Cousins interval on the signal for `n` events over background `b`.
pub fn confidence_interval(
    lnp: f64,
    n: u64,
    background: f64,
    config: &EngineConfig,
) -> Result<ConfidenceInterval> {
    feldman_cousins::confidence_interval(lnp, n, background, config)
}

impl CountingResult {
    pub fn log_likelihood(&self) -> f64 {
        log_likelihood(self.events(), self.background(), self.signal())
    }

    pub fn log_p_value(&self) -> Result<f64> {
        log_p_value(
            self.events(),
            self.background(),
            self.signal(),
            self.has_intervals(),
            self.max_interval_fraction(),
        )
    }

    pub fn scale_to_p_value(&self, options: &AnalysisOptions, config: &EngineConfig) -> Result<f64> {
        scale_to_p_value(
            options.lnp,
            self.events(),
            self.background(),
            self.signal(),
            self.has_intervals(),
            self.max_interval_fraction(),
            &config.root,
        )
    }

    pub fn confidence_interval(
        &self,
        options: &AnalysisOptions,
        config: &EngineConfig,
    ) -> Result<ConfidenceInterval> {
        confidence_interval(options.lnp, self.events(), self.background(), config)
    }
}

/// One row of a multi-experiment report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExperimentSummary {
    pub name: String,
    pub events: u64,
    pub background: f64,
    pub signal: f64,
    pub has_intervals: bool,
    pub log_likelihood: f64,
    pub log_p_value: f64,
    /// Target log p-value the scale and interval were computed for.
    pub lnp: f64,
    /// Signal rescaling reaching `lnp`; serialized as `null` when infinite.
    pub scale: f64,
    pub interval: ConfidenceInterval,
}

/// Run every operation on one experiment.
pub fn summarize(
    name: &str,
    result: &CountingResult,
    options: &AnalysisOptions,
    config: &EngineConfig,
) -> Result<ExperimentSummary> {
    let summary = ExperimentSummary {
        name: name.to_string(),
        events: result.events(),
        background: result.background(),
        signal: result.signal(),
        has_intervals: result.has_intervals(),
        log_likelihood: result.log_likelihood(),
        log_p_value: result.log_p_value()?,
        lnp: options.lnp,
        scale: result.scale_to_p_value(options, config)?,
        interval: result.confidence_interval(options, config)?,
    };
    debug!(
        event = event_names::SUMMARY_EXPERIMENT,
        stage = %Stage::Summary,
        name,
        scale = summary.scale,
        "experiment summarized"
    );
    Ok(summary)
}
