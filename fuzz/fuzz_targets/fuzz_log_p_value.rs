//! Fuzz target for p-values and signal rescaling.
//!
//! Any finite counting result must produce a p-value that is a log
//! probability, and a rescaling that is either finite or the +inf sentinel.

#![no_main]

use arbitrary::Arbitrary;
use dd_core::config::EngineConfig;
use dd_core::{AnalysisOptions, CountingResult};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct Input {
    events: u16,
    background: f64,
    signal: f64,
    intervals: Vec<f64>,
    lnp: f64,
}

fuzz_target!(|input: Input| {
    let Ok(mut result) = CountingResult::new(
        u64::from(input.events),
        input.background,
        input.signal,
    ) else {
        return;
    };
    if !input.intervals.is_empty() && input.intervals.len() <= 64 {
        result = match result.with_intervals(input.intervals) {
            Ok(result) => result,
            Err(_) => return,
        };
    }

    if let Ok(lnp) = result.log_p_value() {
        assert!(!lnp.is_nan());
        assert!(lnp <= 0.0);
    }

    let Ok(options) = AnalysisOptions::new(input.lnp) else {
        return;
    };
    if let Ok(scale) = result.scale_to_p_value(&options, &EngineConfig::default()) {
        assert!(!scale.is_nan());
        assert!(scale >= 0.0);
    }
});
