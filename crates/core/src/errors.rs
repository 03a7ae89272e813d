//! Comprehensive error types for the Templup core library.
//!
//! Each subsystem has its own error type derived with `thiserror`, and a
//! top-level [`CoreError`] enum unifies them all for callers that want a
//! single error type.
//!
//! A merge conflict is deliberately *not* an error anywhere in this module:
//! conflicts are a normal, expected outcome of an update attempt and are
//! reported through [`crate::models::UpdateReport`] instead.

use thiserror::Error;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Unified error type for the entire core library.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Version(#[from] VersionError),

    #[error(transparent)]
    Analyzer(#[from] AnalyzerError),

    #[error(transparent)]
    Merge(#[from] MergeError),

    #[error(transparent)]
    Backup(#[from] BackupError),

    #[error(transparent)]
    Deploy(#[from] DeployError),

    #[error(transparent)]
    Update(#[from] UpdateError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

// ---------------------------------------------------------------------------
// Version registry errors
// ---------------------------------------------------------------------------

/// Errors from version parsing and the version registry.
#[derive(Debug, Error)]
pub enum VersionError {
    /// A version string contained a non-numeric component.
    ///
    /// Fails fast: no state is changed when this is returned.
    #[error("invalid version format '{0}': components must be dotted numbers")]
    InvalidFormat(String),

    /// The requested version does not exist in the registry.
    #[error("version {0} not found in registry")]
    NotFound(String),

    /// The registry catalog file could not be loaded.
    #[error("registry catalog error at '{path}': {detail}")]
    CatalogError {
        path: String,
        detail: String,
    },

    /// A payload file referenced by a catalog entry is missing.
    #[error("payload missing for version {version}, file '{file}'")]
    PayloadMissing {
        version: String,
        file: String,
    },

    /// Generic I/O wrapper.
    #[error("registry I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Customization analyzer errors
// ---------------------------------------------------------------------------

/// Errors from the customization analyzer.
#[derive(Debug, Error)]
pub enum AnalyzerError {
    /// The template is not registered in the store.
    #[error("template not found: {0}")]
    TemplateNotFound(String),

    /// Database error while reading baseline / live content.
    #[error("analyzer database error: {0}")]
    DatabaseError(#[from] DatabaseError),
}

// ---------------------------------------------------------------------------
// Merge errors
// ---------------------------------------------------------------------------

/// Errors from the merge engine and conflict resolver.
///
/// A detected conflict is not among these; they are system failures around
/// the merge, not the merge outcome itself.
#[derive(Debug, Error)]
pub enum MergeError {
    /// The requested conflict ID was not found.
    #[error("conflict not found: {0}")]
    ConflictNotFound(String),

    /// Attempted to resolve a conflict that is already resolved.
    #[error("conflict {0} is already resolved")]
    AlreadyResolved(String),

    /// The provided resolution is not one of the known strategies.
    #[error("invalid resolution for conflict {id}: {detail}")]
    InvalidResolution {
        id: String,
        detail: String,
    },

    /// Database error when persisting merge results or conflicts.
    #[error("merge database error: {0}")]
    DatabaseError(#[from] DatabaseError),
}

// ---------------------------------------------------------------------------
// Backup errors
// ---------------------------------------------------------------------------

/// Errors from the backup & rollback manager.
#[derive(Debug, Error)]
pub enum BackupError {
    /// The backup id does not exist or does not belong to the given template.
    ///
    /// Returned without any mutation having been performed.
    #[error("backup not found for template '{template_id}': {backup_id}")]
    NotFound {
        template_id: String,
        backup_id: String,
    },

    /// The backup exists but is past its retention window.
    #[error("backup {backup_id} expired on {expired_at}")]
    Expired {
        backup_id: String,
        expired_at: String,
    },

    /// Writing the snapshot failed. An update attempt must abort before the
    /// merge step when this occurs, since no update may proceed without a
    /// recoverable snapshot.
    #[error("backup snapshot write failed: {0}")]
    SnapshotFailed(String),

    /// Database error during backup or restore.
    #[error("backup database error: {0}")]
    DatabaseError(#[from] DatabaseError),
}

// ---------------------------------------------------------------------------
// Deployment errors
// ---------------------------------------------------------------------------

/// Errors from the deployment trigger.
#[derive(Debug, Error)]
pub enum DeployError {
    /// The external deployment endpoint rejected or failed the request.
    ///
    /// The merge result is preserved when this occurs; callers surface the
    /// fallback guidance instead of rolling back.
    #[error("deployment trigger failed for template '{template_id}': {detail}")]
    TriggerFailed {
        template_id: String,
        detail: String,
    },

    /// HTTP-level transport error (network, TLS, timeout).
    #[error("deployment HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// No deployment webhook is configured.
    #[error("no deployment webhook configured")]
    NotConfigured,
}

// ---------------------------------------------------------------------------
// Update orchestrator errors
// ---------------------------------------------------------------------------

/// Errors from the update orchestrator.
#[derive(Debug, Error)]
pub enum UpdateError {
    /// Another update for the same template is already mid-flight.
    ///
    /// Per-template updates are serialized; concurrent attempts are rejected
    /// rather than interleaved.
    #[error("update already in progress for template '{0}'")]
    AlreadyRunning(String),

    /// The template is not registered in the store.
    #[error("template not found: {0}")]
    TemplateNotFound(String),

    /// A state-machine transition was invalid.
    #[error("invalid update state transition from {from} to {to}")]
    InvalidStateTransition {
        from: String,
        to: String,
    },

    /// Version registry error during an update.
    #[error("update version error: {0}")]
    VersionError(#[from] VersionError),

    /// Analyzer error during an update.
    #[error("update analyzer error: {0}")]
    AnalyzerError(#[from] AnalyzerError),

    /// Merge subsystem error during an update.
    #[error("update merge error: {0}")]
    MergeError(#[from] MergeError),

    /// Backup error during an update. When the initial snapshot fails the
    /// attempt is aborted before anything is merged.
    #[error("update backup error: {0}")]
    BackupError(#[from] BackupError),

    /// Deployment error during an explicitly requested trigger.
    #[error("update deployment error: {0}")]
    DeployError(#[from] DeployError),

    /// Database error during an update.
    #[error("update database error: {0}")]
    DatabaseError(#[from] DatabaseError),
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors from configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file not found.
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    /// TOML parse error.
    #[error("configuration parse error: {0}")]
    ParseError(String),

    /// A required environment variable is not set.
    #[error("required environment variable '{var}' is not set (referenced by config field '{field}')")]
    EnvVarMissing {
        var: String,
        field: String,
    },

    /// A config value is invalid.
    #[error("invalid configuration value for '{field}': {detail}")]
    InvalidValue {
        field: String,
        detail: String,
    },

    /// Generic I/O error reading the config file.
    #[error("configuration I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Database errors
// ---------------------------------------------------------------------------

/// Errors from the SQLite persistence layer.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Underlying rusqlite error.
    #[error("database error: {0}")]
    SqliteError(#[from] rusqlite::Error),

    /// A migration failed.
    #[error("database migration failed (version {version}): {detail}")]
    MigrationFailed {
        version: u32,
        detail: String,
    },

    /// A record was not found.
    #[error("{entity} not found: {id}")]
    NotFound {
        entity: String,
        id: String,
    },

    /// A write the engine depends on did not land.
    #[error("store write failed for {entity}: {detail}")]
    WriteFailed {
        entity: String,
        detail: String,
    },

    /// Generic I/O error (e.g. file permissions).
    #[error("database I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_messages() {
        let err = VersionError::InvalidFormat("2.x.1".into());
        assert_eq!(
            err.to_string(),
            "invalid version format '2.x.1': components must be dotted numbers"
        );

        let err = BackupError::NotFound {
            template_id: "tpl-1".into(),
            backup_id: "bak-9".into(),
        };
        assert!(err.to_string().contains("bak-9"));

        let err = UpdateError::AlreadyRunning("tpl-1".into());
        assert!(err.to_string().contains("already in progress"));

        let err = ConfigError::EnvVarMissing {
            var: "TEMPLUP_DEPLOY_SECRET".into(),
            field: "deploy.secret_env".into(),
        };
        assert!(err.to_string().contains("TEMPLUP_DEPLOY_SECRET"));
    }

    #[test]
    fn test_core_error_from_subsystem() {
        let version_err = VersionError::NotFound("9.9.9".into());
        let core_err: CoreError = version_err.into();
        assert!(matches!(core_err, CoreError::Version(_)));

        let db_err = DatabaseError::NotFound {
            entity: "backup".into(),
            id: "abc".into(),
        };
        let core_err: CoreError = CoreError::Database(db_err);
        assert!(matches!(core_err, CoreError::Database(_)));
    }
}
