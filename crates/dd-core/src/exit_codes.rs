//! Exit codes for the `ddstat` CLI.
//!
//! Exit code ranges:
//! - 0: success
//! - 10-19: user/environment errors (bad arguments, bad config)
//! - 20-29: numerical or I/O failures

use crate::config::ConfigError;
use crate::inference::StatsError;

/// Exit codes for `ddstat` operations.
///
/// These codes are a stable contract for scripts driving the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Success
    Ok = 0,

    /// Invalid arguments or input values
    ArgsError = 10,

    /// Configuration file missing, malformed, or invalid
    ConfigError = 11,

    /// A bracket, bisection, or series hit its iteration cap
    NonConvergence = 20,

    /// I/O error reading input or writing output
    IoError = 21,
}

impl ExitCode {
    /// Convert to i32 for process exit.
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    pub fn is_success(self) -> bool {
        self == ExitCode::Ok
    }

    /// User/environment error (10-19), fixable by changing the invocation.
    pub fn is_user_error(self) -> bool {
        (10..20).contains(&(self as i32))
    }

    /// Name used in JSON error output.
    pub fn code_name(&self) -> &'static str {
        match self {
            ExitCode::Ok => "OK",
            ExitCode::ArgsError => "ERR_ARGS",
            ExitCode::ConfigError => "ERR_CONFIG",
            ExitCode::NonConvergence => "ERR_NON_CONVERGENCE",
            ExitCode::IoError => "ERR_IO",
        }
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

impl From<&StatsError> for ExitCode {
    fn from(err: &StatsError) -> Self {
        match err {
            StatsError::NonConvergence { .. } => ExitCode::NonConvergence,
            StatsError::InvalidInput { .. } => ExitCode::ArgsError,
        }
    }
}

impl From<&ConfigError> for ExitCode {
    fn from(err: &ConfigError) -> Self {
        match err {
            ConfigError::IoError { .. } => ExitCode::IoError,
            _ => ExitCode::ConfigError,
        }
    }
}

impl std::fmt::Display for ExitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.code_name(), self.as_i32())
    }
}
