//! Inference engine: p-values, signal rescaling, and confidence intervals
//! for counting experiments.

pub mod analysis;
pub mod counting;
pub mod error;
pub mod feldman_cousins;
pub mod pvalue;
pub mod root;

pub use analysis::{
    confidence_interval, log_likelihood, log_p_value, scale_to_p_value, summarize,
    AnalysisOptions, ExperimentSummary,
};
pub use counting::CountingResult;
pub use error::{Result, StatsError};
pub use feldman_cousins::{accepts, log_ordering_term, ConfidenceInterval};
pub use pvalue::{maximum_gap_log_p_value, poisson_log_p_value, MAX_GAP_TERMS};
pub use root::RootFinder;
