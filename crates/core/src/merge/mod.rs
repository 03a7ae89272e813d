//! Merge subsystem: per-file merge dispatch, branding re-injection, and
//! conflict resolution.

pub mod branding;
pub mod engine;
pub mod resolver;

pub use engine::{MergeEngine, MergeOutcome};
pub use resolver::{ConflictResolver, Resolution};
