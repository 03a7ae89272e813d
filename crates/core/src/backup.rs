//! Backup and rollback management.
//!
//! A backup snapshots every file of a template (baseline and live content)
//! before any mutating update step. Rollback restores the snapshot verbatim.
//! Both run inside a single SQLite transaction, so a failure midway leaves
//! the prior state intact rather than a mix.

use std::sync::Arc;

use chrono::{Duration, Utc};
use rusqlite::params;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::db::Database;
use crate::errors::{BackupError, DatabaseError};
use crate::models::Backup;

// ---------------------------------------------------------------------------
// Manager
// ---------------------------------------------------------------------------

/// Creates and restores whole-template snapshots.
pub struct BackupManager {
    db: Arc<Database>,
    default_retention_days: u32,
}

impl BackupManager {
    pub fn new(db: Arc<Database>, default_retention_days: u32) -> Self {
        Self {
            db,
            default_retention_days,
        }
    }

    /// Snapshot the template's current file state under a fresh backup id.
    ///
    /// Must run before the merge engine writes anything; an update attempt
    /// that cannot secure a snapshot is aborted by the orchestrator.
    pub fn create_backup(&self, template_id: &str) -> Result<Backup, BackupError> {
        self.create_backup_with_retention(template_id, self.default_retention_days)
    }

    /// Snapshot with an explicit retention window (versions can declare
    /// their own).
    pub fn create_backup_with_retention(
        &self,
        template_id: &str,
        retention_days: u32,
    ) -> Result<Backup, BackupError> {
        if self.db.get_template(template_id)?.is_none() {
            return Err(BackupError::DatabaseError(DatabaseError::NotFound {
                entity: "template".into(),
                id: template_id.into(),
            }));
        }

        let backup = Backup {
            id: Uuid::new_v4().to_string(),
            template_id: template_id.to_string(),
            timestamp: Utc::now(),
            retention_days,
            used_for_rollback: false,
            rollback_date: None,
        };

        let copied = self
            .db
            .transaction(|conn| {
                conn.execute(
                    "INSERT INTO backups (id, template_id, created_at, retention_days, used_for_rollback, rollback_date)
                     VALUES (?1, ?2, ?3, ?4, 0, NULL)",
                    params![
                        backup.id,
                        backup.template_id,
                        backup.timestamp.to_rfc3339(),
                        backup.retention_days
                    ],
                )?;
                let copied = conn.execute(
                    "INSERT INTO backup_files (backup_id, path, baseline_content, live_content)
                     SELECT ?1, path, baseline_content, live_content
                     FROM template_files WHERE template_id = ?2",
                    params![backup.id, backup.template_id],
                )?;
                Ok(copied)
            })
            .map_err(|e| BackupError::SnapshotFailed(e.to_string()))?;

        info!(
            template_id,
            backup_id = %backup.id,
            files = copied,
            retention_days,
            "backup created"
        );
        Ok(backup)
    }

    /// Restore a snapshot verbatim.
    ///
    /// Rejected without any mutation when the backup does not belong to the
    /// template or has expired. A second rollback with the same consumed
    /// backup id succeeds idempotently, restoring the same snapshot and
    /// refreshing `rollback_date`.
    pub fn rollback(&self, template_id: &str, backup_id: &str) -> Result<(), BackupError> {
        let backup = self
            .db
            .get_backup(backup_id)?
            .filter(|b| b.template_id == template_id)
            .ok_or_else(|| BackupError::NotFound {
                template_id: template_id.to_string(),
                backup_id: backup_id.to_string(),
            })?;

        let expires_at = backup.expires_at();
        if Utc::now() > expires_at {
            return Err(BackupError::Expired {
                backup_id: backup_id.to_string(),
                expired_at: expires_at.to_rfc3339(),
            });
        }

        if backup.used_for_rollback {
            debug!(backup_id, "backup already consumed, restoring again idempotently");
        }

        let now = Utc::now().to_rfc3339();
        self.db.transaction(|conn| {
            // Files created after the snapshot must disappear for the
            // restore to be verbatim.
            conn.execute(
                "DELETE FROM template_files WHERE template_id = ?1",
                params![template_id],
            )?;
            let restored = conn.execute(
                "INSERT INTO template_files (template_id, path, baseline_content, live_content, updated_at)
                 SELECT ?1, path, baseline_content, live_content, ?2
                 FROM backup_files WHERE backup_id = ?3",
                params![template_id, now, backup_id],
            )?;
            conn.execute(
                "UPDATE backups SET used_for_rollback = 1, rollback_date = ?2 WHERE id = ?1",
                params![backup_id, now],
            )?;
            debug!(backup_id, files = restored, "snapshot restored");
            Ok(())
        })?;

        info!(template_id, backup_id, "rollback complete");
        Ok(())
    }

    /// Fetch a backup, enforcing template ownership.
    pub fn get_backup(&self, template_id: &str, backup_id: &str) -> Result<Backup, BackupError> {
        self.db
            .get_backup(backup_id)?
            .filter(|b| b.template_id == template_id)
            .ok_or_else(|| BackupError::NotFound {
                template_id: template_id.to_string(),
                backup_id: backup_id.to_string(),
            })
    }

    /// List a template's backups, newest first.
    pub fn list_backups(&self, template_id: &str, limit: u32) -> Result<Vec<Backup>, BackupError> {
        Ok(self.db.list_backups(template_id, limit)?)
    }

    /// Delete backups past their retention window. There is no background
    /// scheduler; callers invoke this opportunistically.
    pub fn purge_expired(&self) -> Result<usize, BackupError> {
        let now = Utc::now();
        let purged = self.db.transaction(|conn| {
            let mut stmt = conn.prepare("SELECT id, created_at, retention_days FROM backups")?;
            let rows = stmt
                .query_map([], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, u32>(2)?,
                    ))
                })?
                .collect::<Result<Vec<_>, _>>()?;
            drop(stmt);

            let mut purged = 0usize;
            for (id, created_at, retention_days) in rows {
                let created = chrono::DateTime::parse_from_rfc3339(&created_at)
                    .map(|dt| dt.with_timezone(&Utc))
                    .unwrap_or(chrono::DateTime::<Utc>::UNIX_EPOCH);
                if now > created + Duration::days(i64::from(retention_days)) {
                    conn.execute("DELETE FROM backup_files WHERE backup_id = ?1", params![id])?;
                    conn.execute("DELETE FROM backups WHERE id = ?1", params![id])?;
                    purged += 1;
                }
            }
            Ok(purged)
        })?;

        if purged > 0 {
            warn!(purged, "purged expired backups");
        }
        Ok(purged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (Arc<Database>, BackupManager) {
        let db = Arc::new(Database::in_memory().unwrap());
        db.initialize().unwrap();
        db.upsert_template("tpl-1", "Sacred Valley", "1.5.2").unwrap();
        db.upsert_template_file("tpl-1", "index.html", Some("<h1>base</h1>"), "<h1>live</h1>")
            .unwrap();
        db.upsert_template_file("tpl-1", "theme.css", Some(".x{}"), ".x{color:teal}")
            .unwrap();
        let manager = BackupManager::new(Arc::clone(&db), 30);
        (db, manager)
    }

    #[test]
    fn test_create_backup_snapshots_all_files() {
        let (db, manager) = setup();
        let backup = manager.create_backup("tpl-1").unwrap();

        let count: i64 = db
            .conn()
            .query_row(
                "SELECT COUNT(*) FROM backup_files WHERE backup_id = ?1",
                params![backup.id],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 2);
        assert_eq!(backup.retention_days, 30);
        assert!(!backup.used_for_rollback);
    }

    #[test]
    fn test_create_backup_unknown_template() {
        let (_db, manager) = setup();
        assert!(manager.create_backup("ghost").is_err());
    }

    #[test]
    fn test_rollback_restores_byte_for_byte() {
        let (db, manager) = setup();
        let backup = manager.create_backup("tpl-1").unwrap();

        // Mutate after the snapshot: edit one file, add another.
        db.set_live_content("tpl-1", "index.html", "<h1>changed</h1>")
            .unwrap();
        db.upsert_template_file("tpl-1", "extra.html", Some("x"), "x")
            .unwrap();

        manager.rollback("tpl-1", &backup.id).unwrap();

        let files = db.list_template_files("tpl-1").unwrap();
        assert_eq!(files.len(), 2);
        let index = files.iter().find(|f| f.path == "index.html").unwrap();
        assert_eq!(index.live_content, "<h1>live</h1>");
        assert_eq!(index.baseline_content.as_deref(), Some("<h1>base</h1>"));

        let consumed = manager.get_backup("tpl-1", &backup.id).unwrap();
        assert!(consumed.used_for_rollback);
        assert!(consumed.rollback_date.is_some());
    }

    #[test]
    fn test_second_rollback_is_idempotent() {
        let (db, manager) = setup();
        let backup = manager.create_backup("tpl-1").unwrap();
        manager.rollback("tpl-1", &backup.id).unwrap();

        db.set_live_content("tpl-1", "index.html", "<h1>drift</h1>")
            .unwrap();
        manager.rollback("tpl-1", &backup.id).unwrap();

        let index = db.get_template_file("tpl-1", "index.html").unwrap().unwrap();
        assert_eq!(index.live_content, "<h1>live</h1>");
    }

    #[test]
    fn test_rollback_wrong_template_rejected() {
        let (db, manager) = setup();
        db.upsert_template("tpl-2", "Other", "1.0.0").unwrap();
        let backup = manager.create_backup("tpl-1").unwrap();

        let result = manager.rollback("tpl-2", &backup.id);
        assert!(matches!(result, Err(BackupError::NotFound { .. })));
        // No mutation happened.
        let index = db.get_template_file("tpl-1", "index.html").unwrap().unwrap();
        assert_eq!(index.live_content, "<h1>live</h1>");
    }

    #[test]
    fn test_rollback_expired_rejected() {
        let (db, manager) = setup();
        let backup = manager.create_backup("tpl-1").unwrap();
        let old = (Utc::now() - Duration::days(45)).to_rfc3339();
        db.conn()
            .execute(
                "UPDATE backups SET created_at = ?2 WHERE id = ?1",
                params![backup.id, old],
            )
            .unwrap();

        let result = manager.rollback("tpl-1", &backup.id);
        assert!(matches!(result, Err(BackupError::Expired { .. })));
    }

    #[test]
    fn test_purge_expired() {
        let (db, manager) = setup();
        let keep = manager.create_backup("tpl-1").unwrap();
        let stale = manager.create_backup("tpl-1").unwrap();
        let old = (Utc::now() - Duration::days(60)).to_rfc3339();
        db.conn()
            .execute(
                "UPDATE backups SET created_at = ?2 WHERE id = ?1",
                params![stale.id, old],
            )
            .unwrap();

        assert_eq!(manager.purge_expired().unwrap(), 1);
        assert!(manager.get_backup("tpl-1", &keep.id).is_ok());
        assert!(manager.get_backup("tpl-1", &stale.id).is_err());
    }
}
