//! Fuzz target for experiment list parsing.

#![no_main]

use dd_core::experiments::ExperimentFile;
use libfuzzer_sys::fuzz_target;
use std::path::Path;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(file) = ExperimentFile::from_toml_str(text, Path::new("fuzz.toml")) {
        for entry in &file.experiment {
            let _ = entry.to_counting_result();
        }
    }
});
