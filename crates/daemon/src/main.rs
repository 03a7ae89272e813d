//! Templup daemon entry point.
//!
//! Loads configuration, initializes all subsystems, starts the web server,
//! and handles graceful shutdown.

mod signals;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use templup_core::analyzer::CustomizationAnalyzer;
use templup_core::backup::BackupManager;
use templup_core::config::AppConfig;
use templup_core::db::Database;
use templup_core::deploy::{DeploymentTrigger, WebhookDeployer};
use templup_core::errors::DeployError;
use templup_core::orchestrator::UpdateOrchestrator;
use templup_core::registry::VersionRegistry;
use templup_web::WebServer;

// ---------------------------------------------------------------------------
// CLI arguments
// ---------------------------------------------------------------------------

/// Templup template update daemon.
#[derive(Parser, Debug)]
#[command(
    name = "templup-daemon",
    version,
    about = "Template update and customization-preservation daemon"
)]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long)]
    config: PathBuf,

    /// Override the log level from the config file (trace, debug, info, warn, error).
    #[arg(long)]
    log_level: Option<String>,
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load and resolve configuration
    let mut config =
        AppConfig::load_from_file(&args.config).context("failed to load configuration file")?;
    config
        .resolve_env_vars()
        .context("failed to resolve environment variables in config")?;
    config
        .validate()
        .context("configuration validation failed")?;

    // Initialize tracing
    let log_level = args
        .log_level
        .as_deref()
        .unwrap_or(&config.server.log_level);

    let filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .init();

    // Startup banner
    info!("========================================");
    info!("  Templup Daemon v{}", env!("CARGO_PKG_VERSION"));
    info!("========================================");
    info!("Config file  : {}", args.config.display());
    info!("Registry     : {}", config.registry.path.display());
    info!("Retention    : {} days", config.backup.retention_days);
    info!("Web listen   : {}", config.server.listen);
    info!("Data dir     : {}", config.server.data_dir.display());
    info!("Log level    : {}", log_level);
    info!("========================================");

    // Ensure data directory exists
    std::fs::create_dir_all(&config.server.data_dir)
        .context("failed to create data directory")?;

    // Initialize database
    let db_path = config.server.data_dir.join("templup.db");
    let db = Arc::new(Database::new(&db_path).context("failed to open database")?);
    db.initialize()
        .context("failed to initialize database schema")?;
    info!("Database initialized at {}", db_path.display());

    // Load the version registry
    let registry = VersionRegistry::load(&config.registry.path, config.backup.retention_days)
        .context("failed to load version registry")?;
    info!(
        "Version registry loaded ({} published versions)",
        registry.len()
    );

    // Analyzer and backup manager share the database handle
    let analyzer = CustomizationAnalyzer::new(db.clone(), config.analyzer.ignore_patterns.clone());
    let backups = BackupManager::new(db.clone(), config.backup.retention_days);

    // Deployment trigger is optional; without a webhook URL the daemon runs
    // in update-only mode and reports manual deployment instructions.
    let deployer: Option<Arc<dyn DeploymentTrigger>> =
        match WebhookDeployer::from_config(&config.deploy) {
            Ok(d) => {
                info!("Deployment webhook configured");
                Some(Arc::new(d))
            }
            Err(DeployError::NotConfigured) => {
                info!("No deployment webhook configured, auto-deploy disabled");
                None
            }
            Err(e) => return Err(e).context("failed to initialize deployment trigger"),
        };

    let orchestrator = Arc::new(UpdateOrchestrator::new(
        db.clone(),
        registry,
        analyzer,
        backups,
        deployer,
        config.deploy.clone(),
    ));
    info!("Update orchestrator initialized");

    // Start web server in background
    let web_server = WebServer::new(config.clone(), db, orchestrator);
    let listen_addr = config.server.listen.clone();
    let web_handle = tokio::spawn(async move {
        if let Err(e) = web_server.start(&listen_addr).await {
            error!("Web server error: {}", e);
        }
    });

    // Wait for shutdown signal
    signals::wait_for_shutdown().await;

    info!("Shutdown signal received, stopping...");
    web_handle.abort();

    info!("Templup daemon stopped.");
    Ok(())
}
