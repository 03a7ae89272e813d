//! Update orchestration.
//!
//! The [`UpdateOrchestrator`] is the single entry point for template updates.
//! It coordinates the fixed sequence for one attempt:
//!
//! 1. Resolve the target version against the registry.
//! 2. Snapshot the template (never skipped).
//! 3. Analyze customer customizations.
//! 4. Merge each incoming file update, queuing conflicts.
//! 5. Optionally trigger deployment when the merge was clean.
//!
//! Per-template updates are serialized: a second request for a template
//! already mid-update is rejected rather than interleaved, since the merge
//! writes the template's file set non-atomically across files.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::analyzer::CustomizationAnalyzer;
use crate::backup::BackupManager;
use crate::config::DeployConfig;
use crate::db::Database;
use crate::deploy::DeploymentTrigger;
use crate::errors::{UpdateError, VersionError};
use crate::merge::MergeEngine;
use crate::models::{
    AuditEntry, Deployment, DeploymentStatus, UpdateReport, UpdateStatus,
};
use crate::registry::{Version, VersionRegistry};

// ---------------------------------------------------------------------------
// Update state machine
// ---------------------------------------------------------------------------

/// States of an update attempt.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UpdateState {
    Idle,
    CheckingUpdates,
    UpdatesAvailable,
    AwaitingSelection,
    BackingUp,
    AnalyzingCustomizations,
    Merging,
    Succeeded,
    Deploying,
    Deployed,
    DeployFailed,
    ConflictsPending,
    RollingBack,
    RolledBack,
}

impl std::fmt::Display for UpdateState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::CheckingUpdates => write!(f, "checking_updates"),
            Self::UpdatesAvailable => write!(f, "updates_available"),
            Self::AwaitingSelection => write!(f, "awaiting_selection"),
            Self::BackingUp => write!(f, "backing_up"),
            Self::AnalyzingCustomizations => write!(f, "analyzing_customizations"),
            Self::Merging => write!(f, "merging"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::Deploying => write!(f, "deploying"),
            Self::Deployed => write!(f, "deployed"),
            Self::DeployFailed => write!(f, "deploy_failed"),
            Self::ConflictsPending => write!(f, "conflicts_pending"),
            Self::RollingBack => write!(f, "rolling_back"),
            Self::RolledBack => write!(f, "rolled_back"),
        }
    }
}

impl UpdateState {
    pub fn from_str_val(s: &str) -> Self {
        match s {
            "checking_updates" => Self::CheckingUpdates,
            "updates_available" => Self::UpdatesAvailable,
            "awaiting_selection" => Self::AwaitingSelection,
            "backing_up" => Self::BackingUp,
            "analyzing_customizations" => Self::AnalyzingCustomizations,
            "merging" => Self::Merging,
            "succeeded" => Self::Succeeded,
            "deploying" => Self::Deploying,
            "deployed" => Self::Deployed,
            "deploy_failed" => Self::DeployFailed,
            "conflicts_pending" => Self::ConflictsPending,
            "rolling_back" => Self::RollingBack,
            "rolled_back" => Self::RolledBack,
            _ => Self::Idle,
        }
    }
}

/// Status summary for one template, as seen by the operation surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateStatus {
    pub template_id: String,
    pub name: String,
    pub current_version: String,
    pub state: UpdateState,
    pub pending_conflicts: i64,
    pub last_checked: Option<String>,
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Coordinates check, backup, analyze, merge and deploy for every template.
pub struct UpdateOrchestrator {
    db: Arc<Database>,
    registry: VersionRegistry,
    analyzer: CustomizationAnalyzer,
    backups: BackupManager,
    deployer: Option<Arc<dyn DeploymentTrigger>>,
    deploy_config: DeployConfig,
    /// Templates with an update or rollback currently in flight.
    active: Arc<Mutex<HashSet<String>>>,
}

impl UpdateOrchestrator {
    pub fn new(
        db: Arc<Database>,
        registry: VersionRegistry,
        analyzer: CustomizationAnalyzer,
        backups: BackupManager,
        deployer: Option<Arc<dyn DeploymentTrigger>>,
        deploy_config: DeployConfig,
    ) -> Self {
        info!("initializing update orchestrator");
        Self {
            db,
            registry,
            analyzer,
            backups,
            deployer,
            deploy_config,
            active: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn registry(&self) -> &VersionRegistry {
        &self.registry
    }

    pub fn analyzer(&self) -> &CustomizationAnalyzer {
        &self.analyzer
    }

    pub fn backups(&self) -> &BackupManager {
        &self.backups
    }

    // -----------------------------------------------------------------------
    // Check
    // -----------------------------------------------------------------------

    /// Compute [`UpdateStatus`] for a template against the registry.
    ///
    /// The status is recomputed on every call; only the check itself is
    /// recorded, as an audit entry.
    pub fn check_updates(
        &self,
        template_id: &str,
        current_version: &str,
    ) -> Result<UpdateStatus, UpdateError> {
        if self.db.get_template(template_id)?.is_none() {
            return Err(UpdateError::TemplateNotFound(template_id.to_string()));
        }

        let available_updates = self.registry.updates_since(current_version)?;
        let security = VersionRegistry::has_security_update(&available_updates);
        let latest_version = self
            .registry
            .latest()
            .map(|v| v.version.clone())
            .unwrap_or_else(|| current_version.to_string());

        let status = UpdateStatus {
            current_version: current_version.to_string(),
            latest_version,
            update_available: !available_updates.is_empty(),
            security_updates_available: security,
            available_updates,
            last_checked: Utc::now(),
        };

        // The check record is part of the audit trail the caller relies on;
        // a failed write fails the check.
        self.db.insert_update_check(
            template_id,
            current_version,
            &status.latest_version,
            status.available_updates.len(),
            security,
        )?;
        info!(
            template_id,
            current_version,
            updates = status.available_updates.len(),
            security,
            "update check complete"
        );
        Ok(status)
    }

    // -----------------------------------------------------------------------
    // Update
    // -----------------------------------------------------------------------

    /// Run one update attempt to an explicit target version.
    ///
    /// Returns an [`UpdateReport`] whether the merge was clean or produced
    /// conflicts; conflicts are an expected outcome, not an error. The
    /// per-template lock is released via a drop guard so it is freed even if
    /// the attempt panics.
    pub async fn run_update(
        &self,
        template_id: &str,
        target_version: &str,
        preserve_customizations: bool,
        auto_deploy: bool,
    ) -> Result<UpdateReport, UpdateError> {
        let _guard = self.acquire(template_id)?;

        let template = self
            .db
            .get_template(template_id)?
            .ok_or_else(|| UpdateError::TemplateNotFound(template_id.to_string()))?;
        let from_version = template.current_version.clone();

        // Expired backups are purged opportunistically; there is no
        // background scheduler.
        if let Err(e) = self.backups.purge_expired() {
            warn!(error = %e, "expired-backup purge failed");
        }

        self.set_state(template_id, UpdateState::CheckingUpdates);
        let target = self.registry.get(target_version)?.clone();
        if Version::compare(&target.version, &from_version)? <= 0 {
            self.set_state(template_id, UpdateState::Idle);
            return Err(UpdateError::VersionError(VersionError::NotFound(format!(
                "{} is not newer than installed {}",
                target.version, from_version
            ))));
        }
        let package = self.registry.package_for(&target.version)?;

        info!(
            template_id,
            from_version,
            target_version = %target.version,
            breaking = target.breaking,
            files = package.files.len(),
            preserve_customizations,
            auto_deploy,
            "starting update"
        );

        // Backup must exist before the merge writes anything; a failed
        // snapshot aborts the whole attempt.
        self.set_state(template_id, UpdateState::BackingUp);
        let backup = match self
            .backups
            .create_backup_with_retention(template_id, package.backup_retention_days)
        {
            Ok(backup) => backup,
            Err(e) => {
                self.set_state(template_id, UpdateState::Idle);
                self.audit(
                    &AuditEntry::failure("update", &format!("backup failed: {e}")),
                    template_id,
                );
                return Err(e.into());
            }
        };

        self.set_state(template_id, UpdateState::AnalyzingCustomizations);
        let customizations = self.analyzer.analyze(template_id)?;
        let by_file: HashMap<&str, &crate::models::CustomerCustomization> =
            customizations.iter().map(|c| (c.file.as_str(), c)).collect();

        self.set_state(template_id, UpdateState::Merging);

        // Pending conflicts from an earlier attempt describe content this
        // attempt is about to rewrite; they are superseded, not resolved.
        let superseded = self
            .db
            .discard_pending_conflicts(template_id, "superseded", "system")?;
        if superseded > 0 {
            info!(
                template_id,
                superseded, "discarded pending conflicts from a previous attempt"
            );
        }

        let mut applied_files = Vec::new();
        let mut conflicts = Vec::new();

        for update in &package.files {
            let outcome = MergeEngine::merge_file(
                template_id,
                &target.version,
                update,
                by_file.get(update.path.as_str()).copied(),
                preserve_customizations,
            );
            if let Some(conflict) = outcome.conflict {
                self.db.insert_conflict(&conflict).map_err(crate::errors::MergeError::from)?;
                conflicts.push(conflict);
            } else {
                // The file's baseline advances to the pristine incoming
                // content; live gets the merge result.
                self.db.upsert_template_file(
                    template_id,
                    &outcome.path,
                    Some(&update.content),
                    &outcome.content,
                )?;
                applied_files.push(outcome.path);
            }
        }

        let mut deployment = None;
        let mut deploy_fallback = None;

        if conflicts.is_empty() {
            self.db.set_template_version(template_id, &target.version)?;
            self.set_state(template_id, UpdateState::Succeeded);
            info!(
                template_id,
                version = %target.version,
                files = applied_files.len(),
                "update merged cleanly"
            );

            if auto_deploy {
                let (dep, fallback) = self.deploy(template_id, &target.version).await;
                deploy_fallback = fallback;
                deployment = dep;
            }
            self.set_state(template_id, UpdateState::Idle);
        } else {
            // Partial application: cleanly merged files are written, the
            // rest wait for manual resolution.
            self.set_state(template_id, UpdateState::ConflictsPending);
            info!(
                template_id,
                applied = applied_files.len(),
                conflicts = conflicts.len(),
                "update produced conflicts"
            );
        }

        let details = format!(
            "{} -> {}: {} applied, {} conflicts",
            from_version,
            target.version,
            applied_files.len(),
            conflicts.len()
        );
        let audit = if conflicts.is_empty() {
            AuditEntry::success("update", &details)
        } else {
            AuditEntry::failure("update", &details)
        };
        self.audit(&audit, template_id);

        Ok(UpdateReport {
            template_id: template_id.to_string(),
            from_version,
            to_version: target.version,
            backup_id: backup.id,
            applied_files,
            conflicts,
            migration: package.migration,
            deployment,
            deploy_fallback,
            completed_at: Utc::now(),
        })
    }

    // -----------------------------------------------------------------------
    // Deployment
    // -----------------------------------------------------------------------

    /// Trigger deployment for an already-merged template.
    ///
    /// A failed trigger never reverts the merge: the template stays
    /// updated-but-not-deployed and fallback guidance is returned.
    pub async fn trigger_deployment(
        &self,
        template_id: &str,
    ) -> Result<Deployment, UpdateError> {
        let template = self
            .db
            .get_template(template_id)?
            .ok_or_else(|| UpdateError::TemplateNotFound(template_id.to_string()))?;

        // An unresolved merge must be settled before the template goes out.
        if self.db.count_pending_conflicts(template_id)? > 0 {
            return Err(UpdateError::InvalidStateTransition {
                from: UpdateState::ConflictsPending.to_string(),
                to: UpdateState::Deploying.to_string(),
            });
        }

        let (deployment, _) = self.deploy(template_id, &template.current_version).await;
        self.set_state(template_id, UpdateState::Idle);

        deployment.ok_or(UpdateError::DeployError(
            crate::errors::DeployError::NotConfigured,
        ))
    }

    async fn deploy(
        &self,
        template_id: &str,
        version: &str,
    ) -> (Option<Deployment>, Option<String>) {
        let Some(deployer) = self.deployer.as_ref() else {
            debug!(template_id, "no deployment trigger configured");
            return (None, None);
        };

        self.set_state(template_id, UpdateState::Deploying);
        let mut deployment = Deployment {
            id: Uuid::new_v4().to_string(),
            template_id: template_id.to_string(),
            url: None,
            status: DeploymentStatus::Pending,
            deployed_at: Utc::now(),
        };
        if let Err(e) = self.db.insert_deployment(&deployment) {
            warn!(template_id, error = %e, "failed to record deployment");
        }

        match deployer.trigger(template_id, version).await {
            Ok(outcome) => {
                deployment.status = DeploymentStatus::Success;
                deployment.url = outcome.url;
                if let Err(e) = self.db.update_deployment(
                    &deployment.id,
                    DeploymentStatus::Success,
                    deployment.url.as_deref(),
                ) {
                    warn!(template_id, error = %e, "failed to record deployment result");
                }
                self.set_state(template_id, UpdateState::Deployed);
                self.audit(
                    &AuditEntry::success("deploy", &format!("deployed version {version}")),
                    template_id,
                );
                (Some(deployment), None)
            }
            Err(e) => {
                warn!(template_id, error = %e, "deployment trigger failed");
                deployment.status = DeploymentStatus::Failed;
                if let Err(e) =
                    self.db
                        .update_deployment(&deployment.id, DeploymentStatus::Failed, None)
                {
                    warn!(template_id, error = %e, "failed to record deployment result");
                }
                self.set_state(template_id, UpdateState::DeployFailed);
                self.audit(&AuditEntry::failure("deploy", &e.to_string()), template_id);

                let mut fallback = self.deploy_config.fallback_instructions.clone();
                if let Some(contact) = &self.deploy_config.support_contact {
                    fallback.push_str(&format!(" Support: {contact}"));
                }
                (Some(deployment), Some(fallback))
            }
        }
    }

    // -----------------------------------------------------------------------
    // Rollback
    // -----------------------------------------------------------------------

    /// Restore a template from one of its backups.
    ///
    /// Serialized against updates through the same per-template lock. File
    /// content is restored verbatim; the recorded current version is left
    /// untouched, since snapshots capture file state only.
    pub fn rollback(&self, template_id: &str, backup_id: &str) -> Result<(), UpdateError> {
        let _guard = self.acquire(template_id)?;

        if self.db.get_template(template_id)?.is_none() {
            return Err(UpdateError::TemplateNotFound(template_id.to_string()));
        }

        self.set_state(template_id, UpdateState::RollingBack);
        let result = self.backups.rollback(template_id, backup_id);

        let (state, audit) = match &result {
            Ok(()) => (
                UpdateState::RolledBack,
                AuditEntry::success("rollback", &format!("restored backup {backup_id}")),
            ),
            Err(e) => (
                UpdateState::Idle,
                AuditEntry::failure("rollback", &e.to_string()),
            ),
        };
        self.set_state(template_id, state);
        self.audit(&audit, template_id);
        if result.is_ok() {
            // The restored snapshot predates the conflicted attempt; its
            // queued conflicts no longer describe the live content.
            let discarded = self
                .db
                .discard_pending_conflicts(template_id, "rolled_back", "system")?;
            if discarded > 0 {
                info!(template_id, discarded, "discarded conflicts of the rolled-back attempt");
            }
            self.set_state(template_id, UpdateState::Idle);
        }

        result.map_err(UpdateError::from)
    }

    // -----------------------------------------------------------------------
    // Status
    // -----------------------------------------------------------------------

    /// Status summary for one template.
    pub fn get_status(&self, template_id: &str) -> Result<TemplateStatus, UpdateError> {
        let template = self
            .db
            .get_template(template_id)?
            .ok_or_else(|| UpdateError::TemplateNotFound(template_id.to_string()))?;

        let pending_conflicts = self.db.count_pending_conflicts(template_id)?;
        let last_checked = self
            .db
            .last_update_check(template_id)?
            .map(|c| c.checked_at);

        Ok(TemplateStatus {
            template_id: template.id,
            name: template.name,
            current_version: template.current_version,
            state: UpdateState::from_str_val(&template.state),
            pending_conflicts,
            last_checked,
        })
    }

    /// Whether an update or rollback is currently in flight for the template.
    pub fn is_active(&self, template_id: &str) -> bool {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(template_id)
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn acquire(&self, template_id: &str) -> Result<ActiveUpdateGuard, UpdateError> {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if !active.insert(template_id.to_string()) {
            return Err(UpdateError::AlreadyRunning(template_id.to_string()));
        }
        Ok(ActiveUpdateGuard {
            active: Arc::clone(&self.active),
            template_id: template_id.to_string(),
        })
    }

    fn set_state(&self, template_id: &str, state: UpdateState) {
        debug!(template_id, state = %state, "update state transition");
        if let Err(e) = self.db.set_template_state(template_id, &state.to_string()) {
            warn!(template_id, error = %e, "failed to persist template state");
        }
    }

    /// Best-effort audit write. General audit entries never fail the
    /// operation they describe, but a failed write is logged rather than
    /// dropped silently.
    fn audit(&self, entry: &AuditEntry, template_id: &str) {
        if let Err(e) = self.db.insert_audit_entry(entry, Some(template_id)) {
            warn!(template_id, action = %entry.action, error = %e, "audit write failed");
        }
    }
}

// ---------------------------------------------------------------------------
// Per-template lock RAII guard
// ---------------------------------------------------------------------------

/// Drop guard that releases the per-template update lock.
///
/// Ensures the lock is freed even if an update attempt panics.
struct ActiveUpdateGuard {
    active: Arc<Mutex<HashSet<String>>>,
    template_id: String,
}

impl Drop for ActiveUpdateGuard {
    fn drop(&mut self) {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.template_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_state_display_roundtrip() {
        for state in [
            UpdateState::Idle,
            UpdateState::CheckingUpdates,
            UpdateState::BackingUp,
            UpdateState::AnalyzingCustomizations,
            UpdateState::Merging,
            UpdateState::Succeeded,
            UpdateState::Deploying,
            UpdateState::Deployed,
            UpdateState::DeployFailed,
            UpdateState::ConflictsPending,
            UpdateState::RollingBack,
            UpdateState::RolledBack,
        ] {
            assert_eq!(UpdateState::from_str_val(&state.to_string()), state);
        }
    }

    #[test]
    fn test_unknown_state_defaults_to_idle() {
        assert_eq!(UpdateState::from_str_val("bogus"), UpdateState::Idle);
    }
}
