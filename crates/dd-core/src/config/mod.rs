//! Engine configuration loading and validation.
//!
//! This module handles:
//! - Typed settings for the root finder and interval builder
//! - Config resolution order (CLI > env > XDG > system > defaults)
//! - Semantic validation (positive tolerances, non-zero step caps)
//!
//! Every field has a default, so an empty file is a valid configuration.

pub mod resolve;
pub mod validate;

pub use resolve::{resolve_config_path, ConfigSource};
pub use validate::{validate_config, ValidationError};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur during config loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("Invalid TOML in config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Semantic validation failed: {0}")]
    ValidationError(#[from] ValidationError),

    #[error("I/O error reading {path}: {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Complete engine configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub analysis: AnalysisConfig,
    pub root: RootConfig,
    pub interval: IntervalConfig,
}

/// Defaults applied to analyses that do not set their own target.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    /// Target log p-value; `ln(0.1)` is a 90% confidence level.
    pub default_lnp: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            default_lnp: -std::f64::consts::LN_10,
        }
    }
}

/// Tolerances and iteration caps for the bracket-then-bisect solver.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RootConfig {
    /// Absolute bracket width at which bisection stops.
    pub x_tolerance: f64,
    /// Absolute gap between the function values at the bracket ends.
    pub f_tolerance: f64,
    /// Maximum doublings or halvings while bracketing.
    pub max_bracket_steps: usize,
    /// Maximum bisection steps once bracketed.
    pub max_bisection_steps: usize,
}

impl Default for RootConfig {
    fn default() -> Self {
        Self {
            x_tolerance: 1e-5,
            f_tolerance: 1e-5,
            // enough to walk across the whole f64 exponent range
            max_bracket_steps: 1100,
            max_bisection_steps: 500,
        }
    }
}

/// Precision of the Feldman-Cousins boundary searches.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IntervalConfig {
    /// Relative bracket width at which a boundary search stops.
    pub relative_precision: f64,
}

impl Default for IntervalConfig {
    fn default() -> Self {
        Self {
            relative_precision: 100.0 * f64::EPSILON,
        }
    }
}

impl EngineConfig {
    /// Parse and validate TOML text. `path` is only used in error messages.
    pub fn from_toml_str(text: &str, path: &Path) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(text).map_err(|source| ConfigError::ParseError {
            path: path.to_path_buf(),
            source,
        })?;
        validate_config(&config)?;
        Ok(config)
    }

    /// Read, parse, and validate a config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound {
                path: path.to_path_buf(),
            });
        }
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::IoError {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text, path)
    }
}

/// Configuration with provenance information.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub config: EngineConfig,
    /// Path of the file the config came from (None if using defaults).
    pub path: Option<PathBuf>,
    pub source: ConfigSource,
}

/// Load configuration with the standard resolution order.
///
/// An explicit path that does not exist is an error; a missing file anywhere
/// else falls through to the built-in defaults.
pub fn load_config(cli_path: Option<&Path>) -> Result<ResolvedConfig, ConfigError> {
    if let Some(path) = cli_path {
        if !path.exists() {
            return Err(ConfigError::NotFound {
                path: path.to_path_buf(),
            });
        }
    }

    let (path, source) = resolve_config_path(cli_path);
    let config = match &path {
        Some(p) => EngineConfig::from_file(p)?,
        None => EngineConfig::default(),
    };

    Ok(ResolvedConfig {
        config,
        path,
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_documented_values() {
        let config = EngineConfig::default();
        assert_eq!(config.analysis.default_lnp, (0.1f64).ln());
        assert_eq!(config.root.x_tolerance, 1e-5);
        assert_eq!(config.root.f_tolerance, 1e-5);
        assert_eq!(config.interval.relative_precision, 100.0 * f64::EPSILON);
    }

    #[test]
    fn empty_toml_is_default() {
        let config = EngineConfig::from_toml_str("", Path::new("empty.toml")).unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let text = r#"
            [root]
            x_tolerance = 1e-7
        "#;
        let config = EngineConfig::from_toml_str(text, Path::new("partial.toml")).unwrap();
        assert_eq!(config.root.x_tolerance, 1e-7);
        assert_eq!(config.root.f_tolerance, 1e-5);
        assert_eq!(config.analysis, AnalysisConfig::default());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let text = "[root]\nx_tol = 1e-7\n";
        let err = EngineConfig::from_toml_str(text, Path::new("typo.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn invalid_values_fail_validation() {
        let text = "[analysis]\ndefault_lnp = 0.5\n";
        let err = EngineConfig::from_toml_str(text, Path::new("bad.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn load_from_explicit_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[analysis]\ndefault_lnp = -2.995732273553991").unwrap();

        let resolved = load_config(Some(file.path())).unwrap();
        assert_eq!(resolved.source, ConfigSource::CliArgument);
        assert_eq!(resolved.path.as_deref(), Some(file.path()));
        assert!((resolved.config.analysis.default_lnp - (0.05f64).ln()).abs() < 1e-12);
    }

    #[test]
    fn load_missing_explicit_file_fails() {
        let err = load_config(Some(Path::new("/nonexistent/ddstat.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound { .. }));
    }
}
