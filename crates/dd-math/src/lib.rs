//! Counting-statistics math utilities.

pub mod error;
pub mod math;

pub use error::ConvergenceError;
pub use math::gamma::*;
pub use math::poisson::*;
pub use math::stable::*;
