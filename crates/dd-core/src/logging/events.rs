//! Event names and stages attached to log records.
//!
//! Every record the engine emits carries an `event` field from
//! [`event_names`] and, where it applies, a `stage` field from [`Stage`], so
//! JSONL consumers can filter without parsing messages.

use serde::{Deserialize, Serialize};

/// Where in a computation a record was emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Startup and configuration loading.
    Init,
    /// Input sanitizing and result construction.
    Input,
    /// p-value evaluation.
    PValue,
    /// Signal rescaling root search.
    Scale,
    /// Feldman-Cousins interval construction.
    Interval,
    /// Batch summaries over many experiments.
    Summary,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Init => "init",
            Stage::Input => "input",
            Stage::PValue => "p_value",
            Stage::Scale => "scale",
            Stage::Interval => "interval",
            Stage::Summary => "summary",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Standard event names used in logging.
pub mod event_names {
    // Run lifecycle
    pub const RUN_STARTED: &str = "run.started";
    pub const RUN_FINISHED: &str = "run.finished";

    // Config
    pub const CONFIG_LOADED: &str = "config.loaded";
    pub const CONFIG_DEFAULT_USED: &str = "config.default_used";

    // Input
    pub const INPUT_CLAMPED: &str = "input.clamped";
    pub const INPUT_INTERVALS_DROPPED: &str = "input.intervals_dropped";

    // p-values
    pub const PVALUE_MAXIMUM_GAP_SERIES: &str = "pvalue.maximum_gap_series";

    // Scale search
    pub const SCALE_CLOSED_FORM: &str = "scale.closed_form";
    pub const SCALE_BRACKETED: &str = "scale.bracketed";
    pub const SCALE_SOLVED: &str = "scale.solved";

    // Interval construction
    pub const INTERVAL_DEGENERATE: &str = "interval.degenerate";
    pub const INTERVAL_BOUND: &str = "interval.bound";

    // Summary
    pub const SUMMARY_EXPERIMENT: &str = "summary.experiment";
}
