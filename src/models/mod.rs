//! Data models

pub mod measurement;
pub mod prediction;

pub use measurement::*;
pub use prediction::*;
