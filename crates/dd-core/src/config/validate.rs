//! Semantic validation of engine configuration.

use thiserror::Error;

use super::EngineConfig;

/// Validation result type.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Configuration validation errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

impl ValidationError {
    /// Error code for structured error reporting.
    pub fn code(&self) -> u32 {
        match self {
            ValidationError::InvalidValue { .. } => 65,
        }
    }
}

/// Validate an engine configuration semantically.
pub fn validate_config(config: &EngineConfig) -> ValidationResult<()> {
    let lnp = config.analysis.default_lnp;
    if lnp.is_nan() || lnp >= 0.0 {
        return Err(invalid(
            "analysis.default_lnp",
            format!("must be a negative log p-value, got {lnp}"),
        ));
    }

    check_positive("root.x_tolerance", config.root.x_tolerance)?;
    check_positive("root.f_tolerance", config.root.f_tolerance)?;
    check_nonzero("root.max_bracket_steps", config.root.max_bracket_steps)?;
    check_nonzero("root.max_bisection_steps", config.root.max_bisection_steps)?;

    let precision = config.interval.relative_precision;
    check_positive("interval.relative_precision", precision)?;
    if precision >= 1.0 {
        return Err(invalid(
            "interval.relative_precision",
            format!("must be below 1, got {precision}"),
        ));
    }

    Ok(())
}

fn check_positive(field: &str, value: f64) -> ValidationResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(field, format!("must be positive and finite, got {value}")))
    }
}

fn check_nonzero(field: &str, value: usize) -> ValidationResult<()> {
    if value == 0 {
        Err(invalid(field, "must be at least 1".to_string()))
    } else {
        Ok(())
    }
}

fn invalid(field: &str, message: String) -> ValidationError {
    ValidationError::InvalidValue {
        field: field.to_string(),
        message,
    }
}
