//! Training Engine - Pluggable execution backend for fine-tuning jobs
//!
//! The orchestrator drives any [`TrainingEngine`] implementation; the
//! bundled [`SimulatedEngine`] produces realistic metrics, logs, and
//! checkpoint records without touching a GPU.

pub mod engine;
pub mod simulated;

pub use engine::{TrainingEngine, TrainingRunConfig};
pub use simulated::SimulatedEngine;
