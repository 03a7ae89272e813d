//! Database schema definitions and migration runner.
//!
//! Migrations are simple SQL strings applied in order. The schema version is
//! tracked in the SQLite `user_version` pragma.

use rusqlite::Connection;
use tracing::{debug, info};

use crate::errors::DatabaseError;

/// All migrations, in order. Each entry is `(version, description, sql)`.
/// Versions start at 1.
static MIGRATIONS: &[(u32, &str, &str)] = &[
    (
        1,
        "initial schema",
        r#"
        CREATE TABLE IF NOT EXISTS templates (
            id              TEXT PRIMARY KEY,
            name            TEXT NOT NULL DEFAULT '',
            current_version TEXT NOT NULL,
            state           TEXT NOT NULL DEFAULT 'idle',
            updated_at      TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS template_files (
            template_id      TEXT NOT NULL REFERENCES templates(id),
            path             TEXT NOT NULL,
            baseline_content TEXT,
            live_content     TEXT NOT NULL DEFAULT '',
            updated_at       TEXT NOT NULL,
            PRIMARY KEY (template_id, path)
        );

        CREATE TABLE IF NOT EXISTS backups (
            id                TEXT PRIMARY KEY,
            template_id       TEXT NOT NULL REFERENCES templates(id),
            created_at        TEXT NOT NULL,
            retention_days    INTEGER NOT NULL DEFAULT 30,
            used_for_rollback INTEGER NOT NULL DEFAULT 0,
            rollback_date     TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_backups_template ON backups (template_id);

        CREATE TABLE IF NOT EXISTS backup_files (
            backup_id        TEXT NOT NULL REFERENCES backups(id),
            path             TEXT NOT NULL,
            baseline_content TEXT,
            live_content     TEXT NOT NULL DEFAULT '',
            PRIMARY KEY (backup_id, path)
        );

        CREATE TABLE IF NOT EXISTS conflicts (
            id                 TEXT PRIMARY KEY,
            template_id        TEXT NOT NULL,
            file_path          TEXT NOT NULL,
            customization_type TEXT NOT NULL,
            base_content       TEXT,
            customized_content TEXT,
            incoming_content   TEXT,
            target_version     TEXT NOT NULL DEFAULT '',
            status             TEXT NOT NULL DEFAULT 'pending',
            resolution         TEXT,
            resolved_by        TEXT,
            created_at         TEXT NOT NULL,
            resolved_at        TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_conflicts_status ON conflicts (status);
        CREATE INDEX IF NOT EXISTS idx_conflicts_template ON conflicts (template_id);

        CREATE TABLE IF NOT EXISTS deployments (
            id          TEXT PRIMARY KEY,
            template_id TEXT NOT NULL,
            url         TEXT,
            status      TEXT NOT NULL DEFAULT 'pending',
            deployed_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_deployments_template ON deployments (template_id);

        CREATE TABLE IF NOT EXISTS update_checks (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            template_id     TEXT NOT NULL,
            current_version TEXT NOT NULL,
            latest_version  TEXT NOT NULL,
            updates_found   INTEGER NOT NULL DEFAULT 0,
            security        INTEGER NOT NULL DEFAULT 0,
            checked_at      TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_update_checks_template ON update_checks (template_id);

        CREATE TABLE IF NOT EXISTS audit_log (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            action      TEXT NOT NULL,
            template_id TEXT,
            details     TEXT,
            success     INTEGER NOT NULL DEFAULT 1,
            created_at  TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_audit_log_created_at ON audit_log (created_at);
        CREATE INDEX IF NOT EXISTS idx_audit_log_action ON audit_log (action);

        CREATE TABLE IF NOT EXISTS kv_state (
            key         TEXT PRIMARY KEY,
            value       TEXT NOT NULL,
            updated_at  TEXT NOT NULL
        );
        "#,
    ),
];

/// Run all pending migrations against `conn`.
pub fn run_migrations(conn: &Connection) -> Result<(), DatabaseError> {
    let current_version = get_schema_version(conn)?;
    info!(
        current_version,
        target_version = MIGRATIONS.last().map(|m| m.0).unwrap_or(0),
        "checking database migrations"
    );

    for &(version, description, sql) in MIGRATIONS {
        if version > current_version {
            info!(version, description, "applying migration");
            conn.execute_batch(sql)
                .map_err(|e| DatabaseError::MigrationFailed {
                    version,
                    detail: e.to_string(),
                })?;
            set_schema_version(conn, version)?;
            debug!(version, "migration applied successfully");
        }
    }

    Ok(())
}

/// Read the current schema version from the SQLite `user_version` pragma.
fn get_schema_version(conn: &Connection) -> Result<u32, DatabaseError> {
    let version: u32 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    Ok(version)
}

/// Set the schema version via the SQLite `user_version` pragma.
fn set_schema_version(conn: &Connection, version: u32) -> Result<(), DatabaseError> {
    conn.pragma_update(None, "user_version", version)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_run_idempotently() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), 1);
    }

    #[test]
    fn test_tables_created() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        let tables: Vec<String> = {
            let mut stmt = conn
                .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
                .unwrap();
            stmt.query_map([], |row| row.get(0))
                .unwrap()
                .filter_map(|r| r.ok())
                .collect()
        };

        assert!(tables.contains(&"templates".to_string()));
        assert!(tables.contains(&"template_files".to_string()));
        assert!(tables.contains(&"backups".to_string()));
        assert!(tables.contains(&"backup_files".to_string()));
        assert!(tables.contains(&"conflicts".to_string()));
        assert!(tables.contains(&"deployments".to_string()));
        assert!(tables.contains(&"update_checks".to_string()));
        assert!(tables.contains(&"audit_log".to_string()));
        assert!(tables.contains(&"kv_state".to_string()));
    }
}
