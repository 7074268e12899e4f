//! Fuzz target for Feldman-Cousins interval construction.

#![no_main]

use arbitrary::Arbitrary;
use dd_core::config::EngineConfig;
use dd_core::confidence_interval;
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct Input {
    events: u8,
    background: f64,
    lnp: f64,
}

fuzz_target!(|input: Input| {
    // keep the searches short; huge backgrounds only slow the fuzzer down
    if !(0.0..=1e3).contains(&input.background) || input.lnp < -50.0 {
        return;
    }
    let config = EngineConfig::default();
    if let Ok(interval) = confidence_interval(
        input.lnp,
        u64::from(input.events),
        input.background,
        &config,
    ) {
        assert!(interval.lower >= 0.0);
        assert!(interval.lower <= interval.upper);
    }
});
