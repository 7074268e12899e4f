//! Output formatting for `ddstat`.
//!
//! stdout carries exactly one result document per invocation: pretty JSON by
//! default, or a fixed-width table for people.

use serde::Serialize;

/// Output format for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed JSON (default)
    #[default]
    Json,
    /// Fixed-width text table
    Human,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Human => write!(f, "human"),
        }
    }
}

/// Width of a value column in human tables.
pub const COLUMN_WIDTH: usize = 12;

/// Width of the row-label column in human tables.
pub const LABEL_WIDTH: usize = 22;

/// Format with five significant digits, switching to exponent notation
/// outside `[1e-4, 1e5)`.
pub fn format_sig(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if value == 0.0 {
        return "0.0000".to_string();
    }
    let magnitude = value.abs().log10().floor();
    if (-4.0..5.0).contains(&magnitude) {
        let decimals = (4.0 - magnitude).max(0.0) as usize;
        format!("{value:.decimals$}")
    } else {
        format!("{value:.4e}")
    }
}

/// One labelled row of a human table.
pub fn table_row<I>(label: &str, cells: I) -> String
where
    I: IntoIterator<Item = String>,
{
    let mut line = format!("{label:<LABEL_WIDTH$}");
    for cell in cells {
        line.push_str(&format!("{cell:>COLUMN_WIDTH$}"));
    }
    line.trim_end().to_string()
}

/// Serialize a result document as pretty JSON.
pub fn to_json<T: Serialize>(value: &T) -> serde_json::Result<String> {
    serde_json::to_string_pretty(value)
}
