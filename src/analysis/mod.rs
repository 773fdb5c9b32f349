//! Analysis history statistics.

pub mod aggregator;

pub use aggregator::*;
