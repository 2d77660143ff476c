//! Metrics Cache - In-memory per-job training metrics
//!
//! Holds the live loss time-series for each job and synthesizes
//! plausible demo data for jobs with no recorded history.

pub mod cache;
pub mod demo;

pub use cache::MetricsCache;
