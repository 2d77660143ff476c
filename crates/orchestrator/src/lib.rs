//! Orchestrator - Job lifecycle management and HTTP API
//!
//! Owns the pending -> running -> completed/failed state machine,
//! spawns background execution units, and serves the dashboard API.

pub mod http_api;
pub mod server;
pub mod service;

pub use server::OrchestratorServer;
pub use service::JobOrchestrator;
