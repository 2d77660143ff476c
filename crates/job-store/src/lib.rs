//! Job Store - File-backed persistence for fine-tuning jobs
//!
//! Provides a JSON job registry with atomic read-modify-write semantics
//! and per-job artifact storage for logs and checkpoints.

pub mod artifacts;
pub mod files;
pub mod store;

pub use artifacts::ArtifactStore;
pub use store::JobStore;
