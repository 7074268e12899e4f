//! Statistical inference for rare-event counting experiments.
//!
//! This library provides:
//! - Poisson and maximum-gap exclusion p-values
//! - Rescaling of a signal prediction to a target p-value
//! - Feldman-Cousins signal confidence intervals
//! - Configuration loading, structured logging, and exit codes for `ddstat`
//!
//! The binary entry point is in `main.rs`.

pub mod config;
pub mod exit_codes;
pub mod experiments;
pub mod inference;
pub mod logging;
pub mod output;

pub use inference::{
    confidence_interval, log_likelihood, log_p_value, scale_to_p_value, AnalysisOptions,
    ConfidenceInterval, CountingResult, StatsError,
};
