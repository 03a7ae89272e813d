//! Templup command-line management tool.
//!
//! Provides subcommands for registering templates, checking for and running
//! updates, managing merge conflicts and backups, viewing the audit log, and
//! generating / validating configuration files.

mod style;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};
use tracing_subscriber::EnvFilter;

use templup_core::analyzer::CustomizationAnalyzer;
use templup_core::backup::BackupManager;
use templup_core::config::AppConfig;
use templup_core::db::Database;
use templup_core::deploy::{DeploymentTrigger, WebhookDeployer};
use templup_core::errors::DeployError;
use templup_core::merge::{ConflictResolver, Resolution};
use templup_core::orchestrator::UpdateOrchestrator;
use templup_core::registry::VersionRegistry;

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// Templup command-line management tool.
#[derive(Parser, Debug)]
#[command(
    name = "templup",
    version,
    about = "Manage and inspect a Templup update engine"
)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, global = true, default_value = "/etc/templup/config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Register a template instance (or update its name/version).
    Register {
        /// Template ID.
        id: String,

        /// Human-readable template name.
        #[arg(long)]
        name: String,

        /// Currently installed template version.
        #[arg(long)]
        version: String,

        /// Import the files in this directory as the template's pristine
        /// baseline and live content.
        #[arg(long)]
        files: Option<PathBuf>,
    },

    /// Show the current status of a template.
    Status {
        /// Template ID.
        id: String,
    },

    /// Check the version registry for available updates.
    Check {
        /// Template ID.
        id: String,

        /// Print the raw JSON status instead of a summary.
        #[arg(long)]
        json: bool,
    },

    /// Run an update to a target version.
    Update {
        /// Template ID.
        id: String,

        /// Target version (e.g. 2.1.0).
        version: String,

        /// Overwrite customizations instead of preserving them.
        #[arg(long)]
        no_preserve: bool,

        /// Trigger deployment after a clean merge.
        #[arg(long)]
        deploy: bool,
    },

    /// Restore a template from a backup snapshot.
    Rollback {
        /// Template ID.
        id: String,

        /// Backup ID to restore.
        backup_id: String,
    },

    /// Manage merge conflicts.
    Conflicts {
        #[command(subcommand)]
        action: ConflictsAction,
    },

    /// Manage backup snapshots.
    Backups {
        #[command(subcommand)]
        action: BackupsAction,
    },

    /// Show recent audit log entries.
    Audit {
        /// Maximum number of entries to show.
        #[arg(short, long, default_value = "20")]
        limit: u32,
    },

    /// Generate a default configuration file.
    Init {
        /// Output path for the generated config file.
        #[arg(short, long, default_value = "./templup.toml")]
        output: PathBuf,
    },

    /// Validate a configuration file.
    Validate,
}

#[derive(Subcommand, Debug)]
enum ConflictsAction {
    /// List conflicts for a template.
    List {
        /// Template ID.
        id: String,

        /// Filter by status: pending, resolved, discarded.
        #[arg(short, long)]
        status: Option<String>,

        /// Number of results.
        #[arg(long, default_value = "20")]
        limit: u32,
    },
    /// Show details of a specific conflict.
    Show {
        /// Conflict ID.
        id: String,
    },
    /// Resolve a conflict.
    Resolve {
        /// Conflict ID.
        id: String,

        /// Resolution: keep (customized), incoming, or manual.
        #[arg(long)]
        accept: String,

        /// Replacement content for a manual resolution, read from this file.
        #[arg(long)]
        content_file: Option<PathBuf>,
    },
    /// Discard a pending conflict, keeping the customized content.
    Discard {
        /// Conflict ID.
        id: String,
    },
}

#[derive(Subcommand, Debug)]
enum BackupsAction {
    /// List backups for a template.
    List {
        /// Template ID.
        id: String,

        /// Number of results.
        #[arg(long, default_value = "20")]
        limit: u32,
    },
    /// Create a backup snapshot now.
    Create {
        /// Template ID.
        id: String,
    },
    /// Delete backups past their retention window.
    Purge,
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> ExitCode {
    // Minimal logging for CLI
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("warn"))
        .with_target(false)
        .without_time()
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", style::error(&format!("{:#}", e)));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Init { output } => cmd_init(&output),
        Commands::Validate => cmd_validate(&cli.config),
        _ => {
            // All other commands need the config and database
            let config = load_config(&cli.config)?;
            let db = open_database(&config)?;

            match cli.command {
                Commands::Register {
                    id,
                    name,
                    version,
                    files,
                } => cmd_register(&db, &id, &name, &version, files.as_deref()),
                Commands::Status { id } => cmd_status(&db, &id),
                Commands::Check { id, json } => {
                    let orchestrator = build_orchestrator(&config, db)?;
                    cmd_check(&orchestrator, &id, json)
                }
                Commands::Update {
                    id,
                    version,
                    no_preserve,
                    deploy,
                } => {
                    let orchestrator = build_orchestrator(&config, db)?;
                    cmd_update(&orchestrator, &id, &version, !no_preserve, deploy).await
                }
                Commands::Rollback { id, backup_id } => {
                    let orchestrator = build_orchestrator(&config, db)?;
                    cmd_rollback(&orchestrator, &id, &backup_id)
                }
                Commands::Conflicts { action } => cmd_conflicts(&db, action),
                Commands::Backups { action } => {
                    let backups = BackupManager::new(db.clone(), config.backup.retention_days);
                    cmd_backups(&backups, action)
                }
                Commands::Audit { limit } => cmd_audit(&db, limit),
                _ => unreachable!(),
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Config helpers
// ---------------------------------------------------------------------------

fn load_config(path: &PathBuf) -> Result<AppConfig> {
    let mut config =
        AppConfig::load_from_file(path).context("failed to load configuration file")?;
    config
        .resolve_env_vars()
        .context("failed to resolve environment variables")?;
    Ok(config)
}

fn open_database(config: &AppConfig) -> Result<Arc<Database>> {
    let db_path = config.server.data_dir.join("templup.db");
    let db = Database::new(&db_path).context("failed to open database")?;
    db.initialize().context("failed to initialize database")?;
    Ok(Arc::new(db))
}

fn build_orchestrator(config: &AppConfig, db: Arc<Database>) -> Result<UpdateOrchestrator> {
    let registry = VersionRegistry::load(&config.registry.path, config.backup.retention_days)
        .context("failed to load version registry")?;
    let analyzer = CustomizationAnalyzer::new(db.clone(), config.analyzer.ignore_patterns.clone());
    let backups = BackupManager::new(db.clone(), config.backup.retention_days);

    let deployer: Option<Arc<dyn DeploymentTrigger>> =
        match WebhookDeployer::from_config(&config.deploy) {
            Ok(d) => Some(Arc::new(d)),
            Err(DeployError::NotConfigured) => None,
            Err(e) => return Err(e).context("failed to initialize deployment trigger"),
        };

    Ok(UpdateOrchestrator::new(
        db,
        registry,
        analyzer,
        backups,
        deployer,
        config.deploy.clone(),
    ))
}

// ---------------------------------------------------------------------------
// Subcommand implementations
// ---------------------------------------------------------------------------

fn cmd_init(output: &PathBuf) -> Result<()> {
    if output.exists() {
        anyhow::bail!(
            "file already exists: {}. Use a different path or remove the existing file.",
            output.display()
        );
    }

    std::fs::write(output, AppConfig::default_toml()).context("failed to write config file")?;

    println!("Default configuration written to {}", output.display());
    println!();
    println!("Next steps:");
    println!("  1. Edit the config file with your registry path and deploy webhook");
    println!("  2. Set the referenced environment variables (TEMPLUP_DEPLOY_SECRET, ...)");
    println!(
        "  3. Validate with: templup validate --config {}",
        output.display()
    );
    println!(
        "  4. Start the daemon: templup-daemon --config {}",
        output.display()
    );

    Ok(())
}

fn cmd_validate(config_path: &PathBuf) -> Result<()> {
    println!("Validating configuration: {}", config_path.display());
    println!();

    let config = AppConfig::load_from_file(config_path).context("failed to parse configuration")?;

    // Check structure
    println!("  [OK] TOML structure is valid");

    // Resolve env vars (non-fatal warnings)
    let mut config = config;
    let _ = config.resolve_env_vars();
    println!("  [OK] Environment variable references processed");

    // Validate values
    match config.validate() {
        Ok(()) => {
            println!("  [OK] All required fields are valid");
        }
        Err(e) => {
            println!("  [FAIL] Validation error: {}", e);
            anyhow::bail!("configuration validation failed");
        }
    }

    // Summary
    println!();
    println!("Configuration summary:");
    println!("  Registry path : {}", config.registry.path.display());
    println!("  Retention     : {} days", config.backup.retention_days);
    println!(
        "  Deploy webhook: {}",
        config.deploy.webhook_url.as_deref().unwrap_or("not set")
    );
    println!(
        "  Deploy secret : {}",
        if config.deploy.secret.is_some() {
            "set"
        } else {
            "not set"
        }
    );
    println!("  Web listen    : {}", config.server.listen);
    println!("  Data directory: {}", config.server.data_dir.display());
    println!();
    println!("Configuration is valid.");

    Ok(())
}

fn cmd_register(
    db: &Database,
    id: &str,
    name: &str,
    version: &str,
    files: Option<&Path>,
) -> Result<()> {
    db.upsert_template(id, name, version)
        .context("failed to register template")?;
    println!("{}", style::success(&format!("Template '{}' registered at v{}", id, version)));

    if let Some(dir) = files {
        let mut imported = 0usize;
        let mut paths = Vec::new();
        collect_files(dir, dir, &mut paths)?;
        for rel in &paths {
            let content = std::fs::read_to_string(dir.join(rel))
                .with_context(|| format!("failed to read {}", rel))?;
            db.upsert_template_file(id, rel, Some(&content), &content)
                .context("failed to import template file")?;
            imported += 1;
        }
        println!(
            "{}",
            style::success(&format!("Imported {} file(s) from {}", imported, dir.display()))
        );
    }

    Ok(())
}

/// Walk `dir` recursively, collecting forward-slash relative paths.
fn collect_files(root: &Path, dir: &Path, out: &mut Vec<String>) -> Result<()> {
    for entry in std::fs::read_dir(dir).with_context(|| format!("failed to read {}", dir.display()))? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            collect_files(root, &path, out)?;
        } else if let Ok(rel) = path.strip_prefix(root) {
            out.push(rel.to_string_lossy().replace('\\', "/"));
        }
    }
    Ok(())
}

fn cmd_status(db: &Database, id: &str) -> Result<()> {
    let template = db
        .get_template(id)
        .context("database error")?
        .ok_or_else(|| anyhow::anyhow!("template '{}' not found", id))?;

    let pending = db
        .count_pending_conflicts(id)
        .context("failed to count conflicts")?;

    let last_check = db
        .last_update_check(id)
        .context("failed to read update checks")?;

    println!();
    println!("{}", style::header(&template.name));
    println!("{}", "═".repeat(template.name.len().max(10)));
    println!();
    println!("  Template ID      : {}", template.id);
    println!("  Current version  : {}", template.current_version);
    println!("  State            : {}", template.state);
    println!(
        "  Pending conflicts: {}",
        if pending > 0 {
            style::warn(&pending.to_string())
        } else {
            pending.to_string()
        }
    );
    match last_check {
        Some(check) => {
            println!("  Last checked     : {}", check.checked_at);
            println!("  Latest published : {}", check.latest_version);
            if check.security {
                println!("  {}", style::warn("Security updates available"));
            }
        }
        None => println!("  Last checked     : {}", style::dim("never")),
    }
    println!();

    Ok(())
}

fn cmd_check(orchestrator: &UpdateOrchestrator, id: &str, json: bool) -> Result<()> {
    let template = orchestrator
        .db()
        .get_template(id)
        .context("database error")?
        .ok_or_else(|| anyhow::anyhow!("template '{}' not found", id))?;

    let status = orchestrator
        .check_updates(id, &template.current_version)
        .map_err(|e| anyhow::anyhow!("update check failed: {}", e))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!();
    println!("  Current version : {}", status.current_version);
    println!("  Latest version  : {}", status.latest_version);

    if !status.update_available {
        println!();
        println!("{}", style::success("Template is up to date"));
        println!();
        return Ok(());
    }

    if status.security_updates_available {
        println!("  {}", style::warn("Security updates available"));
    }

    println!();
    println!(
        "{}",
        style::header(&format!(
            "Available updates ({})",
            status.available_updates.len()
        ))
    );
    println!();

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Version", "Type", "Released", "Breaking", "Changes"]);

    for v in &status.available_updates {
        let breaking = if v.breaking {
            Cell::new("yes").fg(comfy_table::Color::Red)
        } else {
            Cell::new("no")
        };
        table.add_row(vec![
            Cell::new(&v.version),
            Cell::new(v.version_type.to_string()),
            Cell::new(v.release_date.format("%Y-%m-%d").to_string()),
            breaking,
            Cell::new(v.changes.len().to_string()),
        ]);
    }

    println!("{}", table);
    println!();

    Ok(())
}

async fn cmd_update(
    orchestrator: &UpdateOrchestrator,
    id: &str,
    version: &str,
    preserve: bool,
    deploy: bool,
) -> Result<()> {
    println!("Updating template '{}' to v{}...", id, version);
    println!();

    let report = orchestrator
        .run_update(id, version, preserve, deploy)
        .await
        .map_err(|e| anyhow::anyhow!("update failed: {}", e))?;

    println!("  From version : {}", report.from_version);
    println!("  To version   : {}", report.to_version);
    println!("  Backup       : {}", report.backup_id);
    println!("  Files applied: {}", report.applied_files.len());

    if let Some(ref migration) = report.migration {
        println!();
        println!("{}", style::header("Migration notes"));
        println!("{}", migration);
    }

    if let Some(ref deployment) = report.deployment {
        println!();
        match deployment.url {
            Some(ref url) => println!("{}", style::success(&format!("Deployed: {}", url))),
            None => println!("  Deployment: {}", deployment.status),
        }
    }
    if let Some(ref fallback) = report.deploy_fallback {
        println!();
        println!("{}", style::warn("Deployment trigger failed"));
        println!("{}", fallback);
    }

    println!();
    if report.succeeded() {
        println!("{}", style::success("Update completed"));
    } else {
        println!(
            "{}",
            style::warn(&format!(
                "{} conflict(s) need review before the version advances",
                report.conflicts.len()
            ))
        );
        for c in &report.conflicts {
            println!("  {} {} ({})", style::dim(&c.id[..8.min(c.id.len())]), c.file_path, c.customization_type);
        }
        println!();
        println!("Resolve with: templup conflicts resolve <id> --accept keep|incoming|manual");
    }
    println!();

    Ok(())
}

fn cmd_rollback(orchestrator: &UpdateOrchestrator, id: &str, backup_id: &str) -> Result<()> {
    orchestrator
        .rollback(id, backup_id)
        .map_err(|e| anyhow::anyhow!("rollback failed: {}", e))?;

    println!(
        "{}",
        style::success(&format!("Template '{}' restored from backup {}", id, backup_id))
    );
    Ok(())
}

fn cmd_conflicts(db: &Database, action: ConflictsAction) -> Result<()> {
    match action {
        ConflictsAction::List { id, status, limit } => {
            let conflicts = db
                .list_conflicts(&id, status.as_deref(), limit)
                .context("failed to list conflicts")?;

            if conflicts.is_empty() {
                println!();
                println!("{}", style::success("No conflicts found"));
                println!();
                return Ok(());
            }

            println!();
            println!(
                "{}",
                style::header(&format!("Conflicts ({})", conflicts.len()))
            );
            println!();

            let mut table = Table::new();
            table.load_preset(UTF8_FULL);
            table.set_content_arrangement(ContentArrangement::Dynamic);
            table.set_header(vec!["ID", "File", "Type", "Target", "Status"]);

            for c in &conflicts {
                let id_short = if c.id.len() > 8 { &c.id[..8] } else { &c.id };
                let status_cell = match c.status.as_str() {
                    "pending" => Cell::new("⧗ pending").fg(comfy_table::Color::Yellow),
                    "resolved" => Cell::new("✓ resolved").fg(comfy_table::Color::Green),
                    "discarded" => Cell::new("discarded"),
                    other => Cell::new(other),
                };
                table.add_row(vec![
                    Cell::new(id_short),
                    Cell::new(&c.file_path),
                    Cell::new(c.customization_type.to_string()),
                    Cell::new(&c.target_version),
                    status_cell,
                ]);
            }

            println!("{}", table);
            println!();

            Ok(())
        }

        ConflictsAction::Show { id } => {
            let conflict = db
                .get_conflict(&id)
                .context("database error")?
                .ok_or_else(|| anyhow::anyhow!("conflict '{}' not found", id))?;

            println!("Conflict: {}", conflict.id);
            println!("==========={}", "=".repeat(conflict.id.len()));
            println!();
            println!("  File path     : {}", conflict.file_path);
            println!("  Type          : {}", conflict.customization_type);
            println!("  Target version: {}", conflict.target_version);
            println!("  Status        : {}", conflict.status);

            if let Some(ref resolution) = conflict.resolution {
                println!("  Resolution    : {}", resolution);
                println!(
                    "  Resolved by   : {}",
                    conflict.resolved_by.as_deref().unwrap_or("-")
                );
            }

            print_content("Customized content", conflict.customized_content.as_deref());
            print_content("Incoming content", conflict.incoming_content.as_deref());

            Ok(())
        }

        ConflictsAction::Resolve {
            id,
            accept,
            content_file,
        } => {
            let resolution = match accept.as_str() {
                "keep" => Resolution::KeepCustomized,
                "incoming" => Resolution::AcceptIncoming,
                "manual" => {
                    let path = content_file.ok_or_else(|| {
                        anyhow::anyhow!("manual resolution requires --content-file")
                    })?;
                    let content = std::fs::read_to_string(&path)
                        .with_context(|| format!("failed to read {}", path.display()))?;
                    Resolution::Manual(content)
                }
                other => {
                    anyhow::bail!(
                        "invalid resolution '{}': use 'keep', 'incoming' or 'manual'",
                        other
                    );
                }
            };

            ConflictResolver::apply(&id, &resolution, "cli", db)
                .map_err(|e| anyhow::anyhow!("failed to resolve conflict: {}", e))?;

            println!(
                "{}",
                style::success(&format!("Conflict {} resolved ({})", id, resolution.label()))
            );
            Ok(())
        }

        ConflictsAction::Discard { id } => {
            ConflictResolver::discard(&id, "cli", db)
                .map_err(|e| anyhow::anyhow!("failed to discard conflict: {}", e))?;

            println!("{}", style::success(&format!("Conflict {} discarded", id)));
            Ok(())
        }
    }
}

fn cmd_backups(backups: &BackupManager, action: BackupsAction) -> Result<()> {
    match action {
        BackupsAction::List { id, limit } => {
            let list = backups
                .list_backups(&id, limit)
                .map_err(|e| anyhow::anyhow!("failed to list backups: {}", e))?;

            if list.is_empty() {
                println!("No backups found.");
                return Ok(());
            }

            println!();
            println!("{}", style::header(&format!("Backups ({})", list.len())));
            println!();

            let mut table = Table::new();
            table.load_preset(UTF8_FULL);
            table.set_content_arrangement(ContentArrangement::Dynamic);
            table.set_header(vec!["ID", "Created", "Expires", "Rolled back"]);

            let now = chrono::Utc::now();
            for b in &list {
                let expires = b.expires_at();
                let expires_cell = if expires < now {
                    Cell::new(format!("{} (expired)", expires.format("%Y-%m-%d")))
                        .fg(comfy_table::Color::Red)
                } else {
                    Cell::new(expires.format("%Y-%m-%d").to_string())
                };
                let rolled_back = match b.rollback_date {
                    Some(d) => d.format("%Y-%m-%d %H:%M").to_string(),
                    None => "-".to_string(),
                };
                table.add_row(vec![
                    Cell::new(&b.id),
                    Cell::new(b.timestamp.format("%Y-%m-%d %H:%M").to_string()),
                    expires_cell,
                    Cell::new(rolled_back),
                ]);
            }

            println!("{}", table);
            println!();

            Ok(())
        }

        BackupsAction::Create { id } => {
            let backup = backups
                .create_backup(&id)
                .map_err(|e| anyhow::anyhow!("failed to create backup: {}", e))?;

            println!(
                "{}",
                style::success(&format!(
                    "Backup {} created (expires {})",
                    backup.id,
                    backup.expires_at().format("%Y-%m-%d")
                ))
            );
            Ok(())
        }

        BackupsAction::Purge => {
            let purged = backups
                .purge_expired()
                .map_err(|e| anyhow::anyhow!("failed to purge backups: {}", e))?;

            println!("{}", style::success(&format!("Purged {} expired backup(s)", purged)));
            Ok(())
        }
    }
}

fn cmd_audit(db: &Database, limit: u32) -> Result<()> {
    let entries = db
        .list_audit_log(limit)
        .context("failed to list audit entries")?;

    if entries.is_empty() {
        println!("No audit log entries found.");
        return Ok(());
    }

    println!("{:<22} {:<20} {:<8} DETAILS", "TIMESTAMP", "ACTION", "OK");
    println!("{}", "-".repeat(90));

    for entry in &entries {
        println!(
            "{:<22} {:<20} {:<8} {}",
            &entry.created_at[..19.min(entry.created_at.len())],
            entry.action,
            if entry.success { "ok" } else { "FAIL" },
            truncate(entry.details.as_deref().unwrap_or(""), 50),
        );
    }

    println!();
    println!("{} entries shown", entries.len());

    Ok(())
}

// ---------------------------------------------------------------------------
// Utilities
// ---------------------------------------------------------------------------

fn print_content(label: &str, content: Option<&str>) {
    if let Some(content) = content {
        println!();
        println!("{} ({} bytes):", label, content.len());
        println!("{}", "-".repeat(40));
        if content.len() > 1000 {
            println!(
                "{}...\n[truncated, {} bytes total]",
                prefix(content, 1000),
                content.len()
            );
        } else {
            println!("{}", content);
        }
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        format!("{}...", prefix(s, max_len.saturating_sub(3)))
    }
}

/// Longest prefix of `s` that fits in `max` bytes without splitting a
/// character. File content here is customer-supplied and freely multibyte.
fn prefix(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_short_string_unchanged() {
        assert_eq!(truncate("hello", 10), "hello");
    }

    #[test]
    fn test_truncate_adds_ellipsis() {
        assert_eq!(truncate("hello world", 8), "hello...");
    }

    #[test]
    fn test_truncate_lands_on_char_boundary() {
        // "é" is two bytes; a naive byte slice at 4 would split the second
        // one and panic.
        let s = "ééé";
        assert_eq!(truncate(s, 5), "é...");
        assert_eq!(truncate("日本語テスト", 9), "日本...");
    }

    #[test]
    fn test_prefix_multibyte() {
        let s = "aé日";
        assert_eq!(prefix(s, s.len()), s);
        assert_eq!(prefix(s, 4), "aé");
        assert_eq!(prefix(s, 2), "a");
        assert_eq!(prefix(s, 0), "");
    }
}
