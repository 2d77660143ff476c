//! Job Core - Foundation for the fine-tuning job platform
//!
//! Provides core types, error handling, configuration, and the
//! running-job registry shared by the persistence and orchestration crates.

pub mod config;
pub mod error;
pub mod registry;
pub mod types;

pub use config::{PlatformConfig, ServerConfig, SimulationConfig, StorageConfig, TrainingDefaults};
pub use error::{Error, Result};
pub use registry::{RunningJobRegistry, RunningJobRegistryHandle};
pub use types::*;
