//! Typed query helpers for every table in the Templup database.

use chrono::Utc;
use rusqlite::params;
use tracing::debug;

use super::Database;
use crate::errors::DatabaseError;
use crate::models::{AuditEntry, Backup, ConflictRecord, Deployment, DeploymentStatus};

// ---------------------------------------------------------------------------
// Domain structs returned by queries
// ---------------------------------------------------------------------------

/// A row from the `templates` table.
#[derive(Debug, Clone)]
pub struct TemplateEntry {
    pub id: String,
    pub name: String,
    pub current_version: String,
    pub state: String,
    pub updated_at: String,
}

/// A row from the `template_files` table.
#[derive(Debug, Clone)]
pub struct TemplateFileEntry {
    pub path: String,
    /// `None` when no baseline is recorded (the customer never completed a
    /// prior successful update for this file).
    pub baseline_content: Option<String>,
    pub live_content: String,
    pub updated_at: String,
}

/// A row from the `update_checks` table.
#[derive(Debug, Clone)]
pub struct UpdateCheckEntry {
    pub id: i64,
    pub template_id: String,
    pub current_version: String,
    pub latest_version: String,
    pub updates_found: i64,
    pub security: bool,
    pub checked_at: String,
}

/// A row from the `audit_log` table.
#[derive(Debug, Clone)]
pub struct AuditLogEntry {
    pub id: i64,
    pub action: String,
    pub template_id: Option<String>,
    pub details: Option<String>,
    pub success: bool,
    pub created_at: String,
}

// ---------------------------------------------------------------------------
// Query implementations
// ---------------------------------------------------------------------------

impl Database {
    // -- templates ----------------------------------------------------------

    /// Register (or update) a template record.
    pub fn upsert_template(
        &self,
        id: &str,
        name: &str,
        current_version: &str,
    ) -> Result<(), DatabaseError> {
        let now = Utc::now().to_rfc3339();
        self.conn().execute(
            "INSERT INTO templates (id, name, current_version, state, updated_at)
             VALUES (?1, ?2, ?3, 'idle', ?4)
             ON CONFLICT(id) DO UPDATE SET name = ?2, current_version = ?3, updated_at = ?4",
            params![id, name, current_version, now],
        )?;
        debug!(id, current_version, "upserted template");
        Ok(())
    }

    /// Fetch a template record by id.
    pub fn get_template(&self, id: &str) -> Result<Option<TemplateEntry>, DatabaseError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, name, current_version, state, updated_at FROM templates WHERE id = ?1",
        )?;
        let mut rows = stmt.query_map(params![id], |row| {
            Ok(TemplateEntry {
                id: row.get(0)?,
                name: row.get(1)?,
                current_version: row.get(2)?,
                state: row.get(3)?,
                updated_at: row.get(4)?,
            })
        })?;
        match rows.next() {
            Some(Ok(entry)) => Ok(Some(entry)),
            Some(Err(e)) => Err(e.into()),
            None => Ok(None),
        }
    }

    /// Set a template's current version.
    pub fn set_template_version(&self, id: &str, version: &str) -> Result<(), DatabaseError> {
        let now = Utc::now().to_rfc3339();
        let n = self.conn().execute(
            "UPDATE templates SET current_version = ?2, updated_at = ?3 WHERE id = ?1",
            params![id, version, now],
        )?;
        if n == 0 {
            return Err(DatabaseError::NotFound {
                entity: "template".into(),
                id: id.into(),
            });
        }
        Ok(())
    }

    /// Set a template's lifecycle state string.
    pub fn set_template_state(&self, id: &str, state: &str) -> Result<(), DatabaseError> {
        let now = Utc::now().to_rfc3339();
        self.conn().execute(
            "UPDATE templates SET state = ?2, updated_at = ?3 WHERE id = ?1",
            params![id, state, now],
        )?;
        Ok(())
    }

    // -- template files -----------------------------------------------------

    /// Insert or replace a template file (baseline and live content).
    pub fn upsert_template_file(
        &self,
        template_id: &str,
        path: &str,
        baseline_content: Option<&str>,
        live_content: &str,
    ) -> Result<(), DatabaseError> {
        let now = Utc::now().to_rfc3339();
        self.conn().execute(
            "INSERT INTO template_files (template_id, path, baseline_content, live_content, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(template_id, path)
             DO UPDATE SET baseline_content = ?3, live_content = ?4, updated_at = ?5",
            params![template_id, path, baseline_content, live_content, now],
        )?;
        Ok(())
    }

    /// Overwrite only the live content of a file (customer edit).
    pub fn set_live_content(
        &self,
        template_id: &str,
        path: &str,
        live_content: &str,
    ) -> Result<(), DatabaseError> {
        let now = Utc::now().to_rfc3339();
        let n = self.conn().execute(
            "UPDATE template_files SET live_content = ?3, updated_at = ?4
             WHERE template_id = ?1 AND path = ?2",
            params![template_id, path, live_content, now],
        )?;
        if n == 0 {
            return Err(DatabaseError::NotFound {
                entity: "template file".into(),
                id: format!("{}:{}", template_id, path),
            });
        }
        Ok(())
    }

    /// List all files of a template, ordered by path.
    pub fn list_template_files(
        &self,
        template_id: &str,
    ) -> Result<Vec<TemplateFileEntry>, DatabaseError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT path, baseline_content, live_content, updated_at
             FROM template_files WHERE template_id = ?1 ORDER BY path",
        )?;
        let entries = stmt
            .query_map(params![template_id], |row| {
                Ok(TemplateFileEntry {
                    path: row.get(0)?,
                    baseline_content: row.get(1)?,
                    live_content: row.get(2)?,
                    updated_at: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    /// Fetch a single template file.
    pub fn get_template_file(
        &self,
        template_id: &str,
        path: &str,
    ) -> Result<Option<TemplateFileEntry>, DatabaseError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT path, baseline_content, live_content, updated_at
             FROM template_files WHERE template_id = ?1 AND path = ?2",
        )?;
        let mut rows = stmt.query_map(params![template_id, path], |row| {
            Ok(TemplateFileEntry {
                path: row.get(0)?,
                baseline_content: row.get(1)?,
                live_content: row.get(2)?,
                updated_at: row.get(3)?,
            })
        })?;
        match rows.next() {
            Some(Ok(entry)) => Ok(Some(entry)),
            Some(Err(e)) => Err(e.into()),
            None => Ok(None),
        }
    }

    // -- backups ------------------------------------------------------------

    /// Fetch a backup record by id.
    pub fn get_backup(&self, backup_id: &str) -> Result<Option<Backup>, DatabaseError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, template_id, created_at, retention_days, used_for_rollback, rollback_date
             FROM backups WHERE id = ?1",
        )?;
        let mut rows = stmt.query_map(params![backup_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, u32>(3)?,
                row.get::<_, bool>(4)?,
                row.get::<_, Option<String>>(5)?,
            ))
        })?;
        match rows.next() {
            Some(Ok((id, template_id, created_at, retention_days, used, rollback_date))) => {
                Ok(Some(Backup {
                    id,
                    template_id,
                    timestamp: parse_ts(&created_at),
                    retention_days,
                    used_for_rollback: used,
                    rollback_date: rollback_date.as_deref().map(parse_ts),
                }))
            }
            Some(Err(e)) => Err(e.into()),
            None => Ok(None),
        }
    }

    /// List backups for a template, newest first.
    pub fn list_backups(&self, template_id: &str, limit: u32) -> Result<Vec<Backup>, DatabaseError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, template_id, created_at, retention_days, used_for_rollback, rollback_date
             FROM backups WHERE template_id = ?1 ORDER BY created_at DESC LIMIT ?2",
        )?;
        let entries = stmt
            .query_map(params![template_id, limit], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, u32>(3)?,
                    row.get::<_, bool>(4)?,
                    row.get::<_, Option<String>>(5)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries
            .into_iter()
            .map(
                |(id, template_id, created_at, retention_days, used, rollback_date)| Backup {
                    id,
                    template_id,
                    timestamp: parse_ts(&created_at),
                    retention_days,
                    used_for_rollback: used,
                    rollback_date: rollback_date.as_deref().map(parse_ts),
                },
            )
            .collect())
    }

    // -- conflicts ----------------------------------------------------------

    /// Persist a merge conflict for manual review.
    pub fn insert_conflict(&self, conflict: &ConflictRecord) -> Result<(), DatabaseError> {
        let now = Utc::now().to_rfc3339();
        self.conn().execute(
            "INSERT INTO conflicts
             (id, template_id, file_path, customization_type, base_content,
              customized_content, incoming_content, target_version, status,
              resolution, resolved_by, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                conflict.id,
                conflict.template_id,
                conflict.file_path,
                conflict.customization_type.to_string(),
                conflict.base_content,
                conflict.customized_content,
                conflict.incoming_content,
                conflict.target_version,
                conflict.status,
                conflict.resolution,
                conflict.resolved_by,
                now
            ],
        )?;
        debug!(id = %conflict.id, file = %conflict.file_path, "inserted conflict");
        Ok(())
    }

    /// Fetch a conflict by id.
    pub fn get_conflict(&self, id: &str) -> Result<Option<ConflictRecord>, DatabaseError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, template_id, file_path, customization_type, base_content,
                    customized_content, incoming_content, target_version, status,
                    resolution, resolved_by
             FROM conflicts WHERE id = ?1",
        )?;
        let mut rows = stmt.query_map(params![id], map_conflict_row)?;
        match rows.next() {
            Some(Ok(entry)) => Ok(Some(entry)),
            Some(Err(e)) => Err(e.into()),
            None => Ok(None),
        }
    }

    /// List conflicts for a template, optionally filtered by status.
    pub fn list_conflicts(
        &self,
        template_id: &str,
        status: Option<&str>,
        limit: u32,
    ) -> Result<Vec<ConflictRecord>, DatabaseError> {
        let conn = self.conn();
        let entries = match status {
            Some(status) => {
                let mut stmt = conn.prepare(
                    "SELECT id, template_id, file_path, customization_type, base_content,
                            customized_content, incoming_content, target_version, status,
                            resolution, resolved_by
                     FROM conflicts WHERE template_id = ?1 AND status = ?2
                     ORDER BY created_at DESC LIMIT ?3",
                )?;
                let rows = stmt.query_map(params![template_id, status, limit], map_conflict_row)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
            None => {
                let mut stmt = conn.prepare(
                    "SELECT id, template_id, file_path, customization_type, base_content,
                            customized_content, incoming_content, target_version, status,
                            resolution, resolved_by
                     FROM conflicts WHERE template_id = ?1
                     ORDER BY created_at DESC LIMIT ?2",
                )?;
                let rows = stmt.query_map(params![template_id, limit], map_conflict_row)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
        };
        Ok(entries)
    }

    /// Mark a conflict resolved (or discarded) with the chosen resolution.
    pub fn resolve_conflict(
        &self,
        id: &str,
        status: &str,
        resolution: &str,
        resolved_by: &str,
    ) -> Result<(), DatabaseError> {
        let now = Utc::now().to_rfc3339();
        let n = self.conn().execute(
            "UPDATE conflicts SET status = ?2, resolution = ?3, resolved_by = ?4, resolved_at = ?5
             WHERE id = ?1",
            params![id, status, resolution, resolved_by, now],
        )?;
        if n == 0 {
            return Err(DatabaseError::NotFound {
                entity: "conflict".into(),
                id: id.into(),
            });
        }
        Ok(())
    }

    /// Discard every pending conflict of a template in one statement.
    ///
    /// Used when a rollback or a fresh update attempt supersedes the queued
    /// conflicts of an earlier attempt. Returns the number of rows closed.
    pub fn discard_pending_conflicts(
        &self,
        template_id: &str,
        resolution: &str,
        resolved_by: &str,
    ) -> Result<usize, DatabaseError> {
        let now = Utc::now().to_rfc3339();
        let n = self.conn().execute(
            "UPDATE conflicts
             SET status = 'discarded', resolution = ?2, resolved_by = ?3, resolved_at = ?4
             WHERE template_id = ?1 AND status = 'pending'",
            params![template_id, resolution, resolved_by, now],
        )?;
        if n > 0 {
            debug!(template_id, count = n, resolution, "discarded pending conflicts");
        }
        Ok(n)
    }

    /// Count unresolved conflicts for a template.
    pub fn count_pending_conflicts(&self, template_id: &str) -> Result<i64, DatabaseError> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM conflicts WHERE template_id = ?1 AND status = 'pending'",
            params![template_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    // -- deployments --------------------------------------------------------

    /// Persist a deployment record.
    pub fn insert_deployment(&self, deployment: &Deployment) -> Result<(), DatabaseError> {
        self.conn().execute(
            "INSERT INTO deployments (id, template_id, url, status, deployed_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                deployment.id,
                deployment.template_id,
                deployment.url,
                deployment.status.to_string(),
                deployment.deployed_at.to_rfc3339()
            ],
        )?;
        Ok(())
    }

    /// Update a deployment's status and URL.
    pub fn update_deployment(
        &self,
        id: &str,
        status: DeploymentStatus,
        url: Option<&str>,
    ) -> Result<(), DatabaseError> {
        let n = self.conn().execute(
            "UPDATE deployments SET status = ?2, url = COALESCE(?3, url) WHERE id = ?1",
            params![id, status.to_string(), url],
        )?;
        if n == 0 {
            return Err(DatabaseError::NotFound {
                entity: "deployment".into(),
                id: id.into(),
            });
        }
        Ok(())
    }

    /// List deployments for a template, newest first.
    pub fn list_deployments(
        &self,
        template_id: &str,
        limit: u32,
    ) -> Result<Vec<Deployment>, DatabaseError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, template_id, url, status, deployed_at
             FROM deployments WHERE template_id = ?1 ORDER BY deployed_at DESC LIMIT ?2",
        )?;
        let entries = stmt
            .query_map(params![template_id, limit], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries
            .into_iter()
            .map(|(id, template_id, url, status, deployed_at)| Deployment {
                id,
                template_id,
                url,
                status: DeploymentStatus::from_str_val(&status),
                deployed_at: parse_ts(&deployed_at),
            })
            .collect())
    }

    // -- update checks ------------------------------------------------------

    /// Record an update check in the audit trail.
    pub fn insert_update_check(
        &self,
        template_id: &str,
        current_version: &str,
        latest_version: &str,
        updates_found: usize,
        security: bool,
    ) -> Result<i64, DatabaseError> {
        let now = Utc::now().to_rfc3339();
        let conn = self.conn();
        conn.execute(
            "INSERT INTO update_checks
             (template_id, current_version, latest_version, updates_found, security, checked_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                template_id,
                current_version,
                latest_version,
                updates_found as i64,
                security,
                now
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// The most recent update check for a template.
    pub fn last_update_check(
        &self,
        template_id: &str,
    ) -> Result<Option<UpdateCheckEntry>, DatabaseError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, template_id, current_version, latest_version, updates_found, security, checked_at
             FROM update_checks WHERE template_id = ?1 ORDER BY id DESC LIMIT 1",
        )?;
        let mut rows = stmt.query_map(params![template_id], |row| {
            Ok(UpdateCheckEntry {
                id: row.get(0)?,
                template_id: row.get(1)?,
                current_version: row.get(2)?,
                latest_version: row.get(3)?,
                updates_found: row.get(4)?,
                security: row.get(5)?,
                checked_at: row.get(6)?,
            })
        })?;
        match rows.next() {
            Some(Ok(entry)) => Ok(Some(entry)),
            Some(Err(e)) => Err(e.into()),
            None => Ok(None),
        }
    }

    // -- audit log ----------------------------------------------------------

    /// Insert an audit-log entry.
    pub fn insert_audit_entry(
        &self,
        entry: &AuditEntry,
        template_id: Option<&str>,
    ) -> Result<i64, DatabaseError> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO audit_log (action, template_id, details, success, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                entry.action,
                template_id,
                entry.details,
                entry.success,
                entry.timestamp.to_rfc3339()
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Return the most recent N audit entries, newest first.
    pub fn list_audit_log(&self, limit: u32) -> Result<Vec<AuditLogEntry>, DatabaseError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, action, template_id, details, success, created_at
             FROM audit_log ORDER BY id DESC LIMIT ?1",
        )?;
        let entries = stmt
            .query_map(params![limit], |row| {
                Ok(AuditLogEntry {
                    id: row.get(0)?,
                    action: row.get(1)?,
                    template_id: row.get(2)?,
                    details: row.get(3)?,
                    success: row.get(4)?,
                    created_at: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    // -- kv state -----------------------------------------------------------

    /// Set a key in the kv_state table.
    pub fn set_state(&self, key: &str, value: &str) -> Result<(), DatabaseError> {
        let now = Utc::now().to_rfc3339();
        self.conn().execute(
            "INSERT INTO kv_state (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = ?2, updated_at = ?3",
            params![key, value, now],
        )?;
        Ok(())
    }

    /// Get a key from the kv_state table.
    pub fn get_state(&self, key: &str) -> Result<Option<String>, DatabaseError> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT value FROM kv_state WHERE key = ?1")?;
        let mut rows = stmt.query_map(params![key], |row| row.get(0))?;
        match rows.next() {
            Some(Ok(val)) => Ok(Some(val)),
            Some(Err(e)) => Err(e.into()),
            None => Ok(None),
        }
    }
}

// ---------------------------------------------------------------------------
// Row mapping helpers
// ---------------------------------------------------------------------------

fn map_conflict_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ConflictRecord> {
    Ok(ConflictRecord {
        id: row.get(0)?,
        template_id: row.get(1)?,
        file_path: row.get(2)?,
        customization_type: crate::models::CustomizationType::from_str_val(
            &row.get::<_, String>(3)?,
        ),
        base_content: row.get(4)?,
        customized_content: row.get(5)?,
        incoming_content: row.get(6)?,
        target_version: row.get(7)?,
        status: row.get(8)?,
        resolution: row.get(9)?,
        resolved_by: row.get(10)?,
    })
}

/// Parse a stored RFC 3339 timestamp, falling back to the epoch for rows
/// written by hand.
fn parse_ts(s: &str) -> chrono::DateTime<Utc> {
    chrono::DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| chrono::DateTime::<Utc>::UNIX_EPOCH)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CustomizationType;

    fn db() -> Database {
        let db = Database::in_memory().unwrap();
        db.initialize().unwrap();
        db
    }

    #[test]
    fn test_template_roundtrip() {
        let db = db();
        db.upsert_template("tpl-1", "Sacred Valley", "1.5.2").unwrap();

        let entry = db.get_template("tpl-1").unwrap().unwrap();
        assert_eq!(entry.current_version, "1.5.2");
        assert_eq!(entry.state, "idle");

        db.set_template_version("tpl-1", "2.0.0").unwrap();
        db.set_template_state("tpl-1", "merging").unwrap();
        let entry = db.get_template("tpl-1").unwrap().unwrap();
        assert_eq!(entry.current_version, "2.0.0");
        assert_eq!(entry.state, "merging");
    }

    #[test]
    fn test_set_version_unknown_template() {
        let db = db();
        let result = db.set_template_version("ghost", "1.0.0");
        assert!(matches!(result, Err(DatabaseError::NotFound { .. })));
    }

    #[test]
    fn test_template_files() {
        let db = db();
        db.upsert_template("tpl-1", "t", "1.0.0").unwrap();
        db.upsert_template_file("tpl-1", "index.html", Some("<h1>base</h1>"), "<h1>live</h1>")
            .unwrap();

        let files = db.list_template_files("tpl-1").unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].baseline_content.as_deref(), Some("<h1>base</h1>"));

        db.set_live_content("tpl-1", "index.html", "<h1>edited</h1>")
            .unwrap();
        let file = db.get_template_file("tpl-1", "index.html").unwrap().unwrap();
        assert_eq!(file.live_content, "<h1>edited</h1>");
    }

    #[test]
    fn test_conflict_roundtrip() {
        let db = db();
        let mut conflict =
            ConflictRecord::new("tpl-1", "styles/theme.css", CustomizationType::Styling, "2.0.0");
        conflict.customized_content = Some(".brand { color: teal; }".into());
        db.insert_conflict(&conflict).unwrap();

        assert_eq!(db.count_pending_conflicts("tpl-1").unwrap(), 1);

        let fetched = db.get_conflict(&conflict.id).unwrap().unwrap();
        assert_eq!(fetched.customization_type, CustomizationType::Styling);
        assert_eq!(fetched.target_version, "2.0.0");

        db.resolve_conflict(&conflict.id, "resolved", "keep_customized", "admin")
            .unwrap();
        assert_eq!(db.count_pending_conflicts("tpl-1").unwrap(), 0);

        let pending = db.list_conflicts("tpl-1", Some("pending"), 10).unwrap();
        assert!(pending.is_empty());
        let all = db.list_conflicts("tpl-1", None, 10).unwrap();
        assert_eq!(all.len(), 1);
    }

    #[test]
    fn test_discard_pending_conflicts_bulk() {
        let db = db();
        for path in ["a.css", "b.css"] {
            let conflict =
                ConflictRecord::new("tpl-1", path, CustomizationType::Styling, "2.0.0");
            db.insert_conflict(&conflict).unwrap();
        }
        let resolved =
            ConflictRecord::new("tpl-1", "c.css", CustomizationType::Styling, "2.0.0");
        db.insert_conflict(&resolved).unwrap();
        db.resolve_conflict(&resolved.id, "resolved", "keep_customized", "admin")
            .unwrap();

        let n = db
            .discard_pending_conflicts("tpl-1", "superseded", "system")
            .unwrap();
        assert_eq!(n, 2);
        assert_eq!(db.count_pending_conflicts("tpl-1").unwrap(), 0);

        // Already-resolved rows are left alone.
        let kept = db.get_conflict(&resolved.id).unwrap().unwrap();
        assert_eq!(kept.status, "resolved");
        assert_eq!(kept.resolution.as_deref(), Some("keep_customized"));
    }

    #[test]
    fn test_update_check_audit() {
        let db = db();
        db.insert_update_check("tpl-1", "1.5.2", "2.1.0", 2, true)
            .unwrap();
        let last = db.last_update_check("tpl-1").unwrap().unwrap();
        assert_eq!(last.latest_version, "2.1.0");
        assert!(last.security);
    }

    #[test]
    fn test_audit_log() {
        let db = db();
        db.insert_audit_entry(&AuditEntry::success("update", "merged 3 files"), Some("tpl-1"))
            .unwrap();
        db.insert_audit_entry(&AuditEntry::failure("deploy", "webhook timeout"), Some("tpl-1"))
            .unwrap();

        let entries = db.list_audit_log(10).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].action, "deploy");
        assert!(!entries[0].success);
    }

    #[test]
    fn test_kv_state() {
        let db = db();
        assert!(db.get_state("missing").unwrap().is_none());
        db.set_state("last_purge", "2025-01-01T00:00:00Z").unwrap();
        db.set_state("last_purge", "2025-02-01T00:00:00Z").unwrap();
        assert_eq!(
            db.get_state("last_purge").unwrap().as_deref(),
            Some("2025-02-01T00:00:00Z")
        );
    }
}
