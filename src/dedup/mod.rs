//! Content-based duplicate detection.

pub mod algorithm;
pub mod tracker;

pub use algorithm::HashAlgorithm;
pub use tracker::{DuplicateStats, DuplicateTracker};
