//! REST API route modules.

pub mod audit;
pub mod backups;
pub mod conflicts;
pub mod customizations;
pub mod status;
pub mod updates;
