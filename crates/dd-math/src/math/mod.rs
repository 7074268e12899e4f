//! Core math modules.

pub mod gamma;
pub mod poisson;
pub mod stable;
