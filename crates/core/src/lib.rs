//! Templup core library.
//!
//! This crate provides the foundational components of the template update
//! engine: configuration, database persistence, the version registry,
//! customization analysis, the merge engine with conflict resolution,
//! backup/rollback, deployment triggering, and the update orchestrator.

pub mod analyzer;
pub mod backup;
pub mod config;
pub mod db;
pub mod deploy;
pub mod errors;
pub mod merge;
pub mod models;
pub mod orchestrator;
pub mod registry;

// Re-exports for convenience.
pub use analyzer::CustomizationAnalyzer;
pub use backup::BackupManager;
pub use config::AppConfig;
pub use db::Database;
pub use orchestrator::{UpdateOrchestrator, UpdateState};
pub use registry::VersionRegistry;
