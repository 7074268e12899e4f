//! Fuzz target for engine configuration parsing.
//!
//! Tests that TOML config parsing and validation handle arbitrary input
//! without panicking.

#![no_main]

use dd_core::config::EngineConfig;
use libfuzzer_sys::fuzz_target;
use std::path::Path;

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        // Should never panic, only return an error
        let _ = EngineConfig::from_toml_str(text, Path::new("fuzz.toml"));
    }
});
