//! Batch input: a TOML file describing several counting experiments.
//!
//! ```toml
//! [[experiment]]
//! name = "XENON 2012"
//! observed = 2
//! background = 1.0
//! signal = 3.2
//! intervals = [0.3, 1.9, 1.0]   # optional, one entry per gap (observed + 1)
//! ```

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::inference::{CountingResult, StatsError};

/// Errors reading an experiments file.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid TOML in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("experiment {name:?}: {source}")]
    Invalid {
        name: String,
        #[source]
        source: StatsError,
    },

    #[error("{path} contains no [[experiment]] entries")]
    Empty { path: PathBuf },
}

/// Top-level experiments file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExperimentFile {
    #[serde(default)]
    pub experiment: Vec<ExperimentEntry>,
}

/// One `[[experiment]]` table.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExperimentEntry {
    pub name: String,
    pub observed: u64,
    #[serde(default)]
    pub background: f64,
    pub signal: f64,
    #[serde(default)]
    pub intervals: Option<Vec<f64>>,
}

impl ExperimentEntry {
    /// Validate into the engine's snapshot type.
    pub fn to_counting_result(&self) -> Result<CountingResult, InputError> {
        let invalid = |source: StatsError| InputError::Invalid {
            name: self.name.clone(),
            source,
        };
        let result =
            CountingResult::new(self.observed, self.background, self.signal).map_err(invalid)?;
        match &self.intervals {
            Some(intervals) => result.with_intervals(intervals.clone()).map_err(invalid),
            None => Ok(result),
        }
    }
}

impl ExperimentFile {
    pub fn from_toml_str(text: &str, path: &Path) -> Result<Self, InputError> {
        let file: ExperimentFile = toml::from_str(text).map_err(|source| InputError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        if file.experiment.is_empty() {
            return Err(InputError::Empty {
                path: path.to_path_buf(),
            });
        }
        Ok(file)
    }

    pub fn from_file(path: &Path) -> Result<Self, InputError> {
        let text = std::fs::read_to_string(path).map_err(|source| InputError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        [[experiment]]
        name = "low background"
        observed = 2
        background = 0.6
        signal = 4.0
        intervals = [1.0, 2.0, 1.0]

        [[experiment]]
        name = "no background"
        observed = 0
        signal = 1.5
    "#;

    #[test]
    fn parses_entries() {
        let file = ExperimentFile::from_toml_str(SAMPLE, Path::new("sample.toml")).unwrap();
        assert_eq!(file.experiment.len(), 2);
        assert_eq!(file.experiment[1].background, 0.0);
        assert!(file.experiment[1].intervals.is_none());

        let result = file.experiment[0].to_counting_result().unwrap();
        assert!(result.has_intervals());
        assert_eq!(result.max_interval_fraction(), 0.5);
    }

    #[test]
    fn rejects_empty_file() {
        let err = ExperimentFile::from_toml_str("", Path::new("empty.toml")).unwrap_err();
        assert!(matches!(err, InputError::Empty { .. }));
    }

    #[test]
    fn rejects_unknown_keys() {
        let text = "[[experiment]]\nname = \"x\"\nobserved = 1\nsignal = 1.0\nbackgroud = 2.0\n";
        let err = ExperimentFile::from_toml_str(text, Path::new("typo.toml")).unwrap_err();
        assert!(matches!(err, InputError::Parse { .. }));
    }

    #[test]
    fn non_finite_values_name_the_experiment() {
        let text = "[[experiment]]\nname = \"bad\"\nobserved = 1\nsignal = nan\n";
        let file = ExperimentFile::from_toml_str(text, Path::new("nan.toml")).unwrap();
        let err = file.experiment[0].to_counting_result().unwrap_err();
        assert!(err.to_string().contains("\"bad\""));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = ExperimentFile::from_file(Path::new("/nonexistent/experiments.toml")).unwrap_err();
        assert!(matches!(err, InputError::Io { .. }));
    }
}
