//! Conflict resolution actions.
//!
//! Named operations for settling a queued merge conflict: keep the customer's
//! content, accept the incoming update, or supply hand-merged content.
//! Resolution writes the chosen content back to the template's live files and
//! records the decision in the audit log.

use tracing::{debug, info, warn};

use crate::db::Database;
use crate::errors::MergeError;
use crate::models::AuditEntry;

/// Named resolution strategies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Keep the customer's content; the incoming update is not applied to
    /// this file.
    KeepCustomized,
    /// Accept the incoming update, discarding the customization. The file's
    /// baseline advances to the incoming content.
    AcceptIncoming,
    /// Use hand-merged content; the baseline advances to the incoming
    /// content so the manual merge reads as a fresh customization.
    Manual(String),
}

impl Resolution {
    /// Stable name recorded in the conflict row and audit log.
    pub fn label(&self) -> &'static str {
        match self {
            Self::KeepCustomized => "keep_customized",
            Self::AcceptIncoming => "accept_incoming",
            Self::Manual(_) => "manual",
        }
    }
}

/// Stateless conflict resolution operations.
pub struct ConflictResolver;

impl ConflictResolver {
    /// Keep the customer's content for the conflicted file.
    pub fn keep_customized(
        conflict_id: &str,
        resolved_by: &str,
        db: &Database,
    ) -> Result<(), MergeError> {
        info!(conflict_id, resolved_by, "resolving conflict: keep customized");
        Self::apply(conflict_id, &Resolution::KeepCustomized, resolved_by, db)
    }

    /// Accept the incoming update, discarding the customization.
    pub fn accept_incoming(
        conflict_id: &str,
        resolved_by: &str,
        db: &Database,
    ) -> Result<(), MergeError> {
        info!(conflict_id, resolved_by, "resolving conflict: accept incoming");
        Self::apply(conflict_id, &Resolution::AcceptIncoming, resolved_by, db)
    }

    /// Resolve with hand-merged content.
    pub fn manual(
        conflict_id: &str,
        content: &str,
        resolved_by: &str,
        db: &Database,
    ) -> Result<(), MergeError> {
        info!(conflict_id, resolved_by, "resolving conflict: manual merge");
        Self::apply(
            conflict_id,
            &Resolution::Manual(content.to_string()),
            resolved_by,
            db,
        )
    }

    /// Validate, write the chosen content, and close the conflict record.
    pub fn apply(
        conflict_id: &str,
        resolution: &Resolution,
        resolved_by: &str,
        db: &Database,
    ) -> Result<(), MergeError> {
        let conflict = db
            .get_conflict(conflict_id)?
            .ok_or_else(|| MergeError::ConflictNotFound(conflict_id.to_string()))?;

        if conflict.status != "pending" {
            return Err(MergeError::AlreadyResolved(conflict_id.to_string()));
        }

        match resolution {
            Resolution::KeepCustomized => {
                // Live content already holds the customized version; nothing
                // to write.
                debug!(conflict_id, path = %conflict.file_path, "keeping customized content");
            }
            Resolution::AcceptIncoming => {
                let incoming = conflict.incoming_content.as_deref().ok_or_else(|| {
                    MergeError::InvalidResolution {
                        id: conflict_id.to_string(),
                        detail: "conflict has no incoming content to accept".to_string(),
                    }
                })?;
                db.upsert_template_file(
                    &conflict.template_id,
                    &conflict.file_path,
                    Some(incoming),
                    incoming,
                )?;
            }
            Resolution::Manual(content) => {
                if content.trim().is_empty() {
                    return Err(MergeError::InvalidResolution {
                        id: conflict_id.to_string(),
                        detail: "manual resolution requires non-empty content".to_string(),
                    });
                }
                db.upsert_template_file(
                    &conflict.template_id,
                    &conflict.file_path,
                    conflict.incoming_content.as_deref(),
                    content,
                )?;
            }
        }

        db.resolve_conflict(conflict_id, "resolved", resolution.label(), resolved_by)?;

        let details = format!(
            "resolved conflict on '{}' with strategy '{}'",
            conflict.file_path,
            resolution.label()
        );
        if let Err(e) = db.insert_audit_entry(
            &AuditEntry::success("conflict_resolved", &details),
            Some(&conflict.template_id),
        ) {
            warn!(conflict_id, error = %e, "audit write failed");
        }

        info!(conflict_id, resolution = resolution.label(), "conflict resolved");
        Ok(())
    }

    /// Discard a pending conflict without writing any content. Used when the
    /// caller re-runs the update with customization preservation turned off.
    pub fn discard(conflict_id: &str, resolved_by: &str, db: &Database) -> Result<(), MergeError> {
        let conflict = db
            .get_conflict(conflict_id)?
            .ok_or_else(|| MergeError::ConflictNotFound(conflict_id.to_string()))?;
        if conflict.status != "pending" {
            return Err(MergeError::AlreadyResolved(conflict_id.to_string()));
        }
        db.resolve_conflict(conflict_id, "discarded", "discarded", resolved_by)?;
        debug!(conflict_id, "conflict discarded");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ConflictRecord, CustomizationType};

    fn setup() -> (Database, String) {
        let db = Database::in_memory().unwrap();
        db.initialize().unwrap();
        db.upsert_template("tpl-1", "Sacred Valley", "1.5.2").unwrap();
        db.upsert_template_file("tpl-1", "theme.css", Some(".x { a: 1; }"), ".x { a: 2; }")
            .unwrap();

        let mut conflict =
            ConflictRecord::new("tpl-1", "theme.css", CustomizationType::Styling, "2.0.0");
        conflict.base_content = Some(".x { a: 1; }".into());
        conflict.customized_content = Some(".x { a: 2; }".into());
        conflict.incoming_content = Some(".x { a: 1; b: 3; }".into());
        db.insert_conflict(&conflict).unwrap();
        (db, conflict.id)
    }

    #[test]
    fn test_keep_customized_leaves_file_alone() {
        let (db, id) = setup();
        ConflictResolver::keep_customized(&id, "admin", &db).unwrap();

        let file = db.get_template_file("tpl-1", "theme.css").unwrap().unwrap();
        assert_eq!(file.live_content, ".x { a: 2; }");
        let conflict = db.get_conflict(&id).unwrap().unwrap();
        assert_eq!(conflict.status, "resolved");
        assert_eq!(conflict.resolution.as_deref(), Some("keep_customized"));
    }

    #[test]
    fn test_accept_incoming_advances_baseline() {
        let (db, id) = setup();
        ConflictResolver::accept_incoming(&id, "admin", &db).unwrap();

        let file = db.get_template_file("tpl-1", "theme.css").unwrap().unwrap();
        assert_eq!(file.live_content, ".x { a: 1; b: 3; }");
        assert_eq!(file.baseline_content.as_deref(), Some(".x { a: 1; b: 3; }"));
    }

    #[test]
    fn test_manual_resolution_writes_content() {
        let (db, id) = setup();
        ConflictResolver::manual(&id, ".x { a: 2; b: 3; }", "admin", &db).unwrap();

        let file = db.get_template_file("tpl-1", "theme.css").unwrap().unwrap();
        assert_eq!(file.live_content, ".x { a: 2; b: 3; }");
        assert_eq!(file.baseline_content.as_deref(), Some(".x { a: 1; b: 3; }"));
    }

    #[test]
    fn test_manual_empty_content_rejected() {
        let (db, id) = setup();
        let result = ConflictResolver::manual(&id, "   ", "admin", &db);
        assert!(matches!(result, Err(MergeError::InvalidResolution { .. })));
    }

    #[test]
    fn test_cannot_resolve_twice() {
        let (db, id) = setup();
        ConflictResolver::keep_customized(&id, "admin", &db).unwrap();
        let result = ConflictResolver::accept_incoming(&id, "admin", &db);
        assert!(matches!(result, Err(MergeError::AlreadyResolved(_))));
    }

    #[test]
    fn test_not_found() {
        let db = Database::in_memory().unwrap();
        db.initialize().unwrap();
        let result = ConflictResolver::keep_customized("ghost", "admin", &db);
        assert!(matches!(result, Err(MergeError::ConflictNotFound(_))));
    }

    #[test]
    fn test_discard() {
        let (db, id) = setup();
        ConflictResolver::discard(&id, "admin", &db).unwrap();
        let conflict = db.get_conflict(&id).unwrap().unwrap();
        assert_eq!(conflict.status, "discarded");
    }
}
