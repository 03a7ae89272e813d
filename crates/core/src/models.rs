//! Domain model types used throughout Templup.
//!
//! These types bridge the update engine, database layer, and web API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Template versions
// ---------------------------------------------------------------------------

/// Release type of a template version.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VersionType {
    Major,
    Minor,
    Patch,
    Hotfix,
}

impl std::fmt::Display for VersionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Major => write!(f, "major"),
            Self::Minor => write!(f, "minor"),
            Self::Patch => write!(f, "patch"),
            Self::Hotfix => write!(f, "hotfix"),
        }
    }
}

/// Kind of change shipped in a version.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    Feature,
    Bugfix,
    Enhancement,
    Security,
    Ui,
    Engine,
}

impl std::fmt::Display for ChangeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Feature => write!(f, "feature"),
            Self::Bugfix => write!(f, "bugfix"),
            Self::Enhancement => write!(f, "enhancement"),
            Self::Security => write!(f, "security"),
            Self::Ui => write!(f, "ui"),
            Self::Engine => write!(f, "engine"),
        }
    }
}

/// Which layer of the template a change touches.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChangeCategory {
    Frontend,
    Backend,
    Config,
    Dependencies,
}

impl std::fmt::Display for ChangeCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Frontend => write!(f, "frontend"),
            Self::Backend => write!(f, "backend"),
            Self::Config => write!(f, "config"),
            Self::Dependencies => write!(f, "dependencies"),
        }
    }
}

/// A single change entry declared by a template version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateChange {
    /// What kind of change this is.
    #[serde(rename = "type")]
    pub change_type: ChangeType,
    /// Which layer it touches.
    pub category: ChangeCategory,
    /// Human-readable description.
    pub description: String,
    /// Files this change rewrites (paths relative to the template root).
    pub files: Vec<String>,
    /// Whether this change can be merged with a customization at all.
    pub preserve_customizations: bool,
    /// Force manual review regardless of customization type.
    #[serde(default)]
    pub requires_manual_review: bool,
}

/// A published template version.
///
/// Immutable once published; created by whoever curates the registry, never
/// by the engine itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateVersion {
    /// Dotted numeric version string, e.g. `2.1.0`.
    pub version: String,
    /// Release date.
    pub release_date: DateTime<Utc>,
    /// Release type.
    #[serde(rename = "type")]
    pub version_type: VersionType,
    /// Whether the version may require migration steps beyond file replacement.
    pub breaking: bool,
    /// Declared changes.
    pub changes: Vec<TemplateChange>,
    /// Free-text migration instructions, if any.
    #[serde(default)]
    pub migration: Option<String>,
}

// ---------------------------------------------------------------------------
// Update status
// ---------------------------------------------------------------------------

/// Result of an update check. Recomputed on every check; never persisted as
/// authoritative state beyond the audit log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateStatus {
    pub current_version: String,
    pub latest_version: String,
    /// Versions strictly newer than current, ascending.
    pub available_updates: Vec<TemplateVersion>,
    pub update_available: bool,
    /// True iff any available update contains a `security` change.
    pub security_updates_available: bool,
    pub last_checked: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Customizations
// ---------------------------------------------------------------------------

/// Classification of a customer-introduced delta.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CustomizationType {
    Branding,
    Styling,
    Content,
    Functionality,
}

impl std::fmt::Display for CustomizationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Branding => write!(f, "branding"),
            Self::Styling => write!(f, "styling"),
            Self::Content => write!(f, "content"),
            Self::Functionality => write!(f, "functionality"),
        }
    }
}

impl CustomizationType {
    /// Parse a stored type string.
    pub fn from_str_val(s: &str) -> Self {
        match s {
            "branding" => Self::Branding,
            "styling" => Self::Styling,
            "functionality" => Self::Functionality,
            _ => Self::Content,
        }
    }
}

/// A customer-introduced deviation from the baseline, computed fresh on each
/// update attempt; not stored long-term.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerCustomization {
    /// File path relative to the template root.
    pub file: String,
    /// Baseline content at the last successful update.
    pub original_content: String,
    /// Current live content.
    pub customized_content: String,
    /// What kind of customization this is.
    pub customization_type: CustomizationType,
    pub last_modified: DateTime<Utc>,
    /// Whether the merge engine can reconcile this delta automatically.
    pub preservable: bool,
}

// ---------------------------------------------------------------------------
// Backups
// ---------------------------------------------------------------------------

/// A pre-update snapshot of a template's files.
///
/// Immutable once written, except for the two rollback-tracking fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Backup {
    pub id: String,
    pub template_id: String,
    pub timestamp: DateTime<Utc>,
    pub retention_days: u32,
    /// Set once the backup has been consumed by a rollback.
    pub used_for_rollback: bool,
    pub rollback_date: Option<DateTime<Utc>>,
}

impl Backup {
    /// When this backup falls out of its retention window.
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.timestamp + chrono::Duration::days(self.retention_days as i64)
    }
}

// ---------------------------------------------------------------------------
// Deployments
// ---------------------------------------------------------------------------

/// Status of a deployment.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentStatus {
    Pending,
    Success,
    Failed,
}

impl std::fmt::Display for DeploymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Success => write!(f, "success"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl DeploymentStatus {
    /// Parse a stored status string.
    pub fn from_str_val(s: &str) -> Self {
        match s {
            "success" => Self::Success,
            "failed" => Self::Failed,
            _ => Self::Pending,
        }
    }
}

/// A deployment triggered after a conflict-free merge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deployment {
    pub id: String,
    pub template_id: String,
    pub url: Option<String>,
    pub status: DeploymentStatus,
    pub deployed_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Conflicts (model-layer)
// ---------------------------------------------------------------------------

/// A persisted merge conflict queued for manual review.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictRecord {
    pub id: String,
    pub template_id: String,
    pub file_path: String,
    pub customization_type: CustomizationType,
    /// Baseline content the customization diverged from.
    pub base_content: Option<String>,
    /// The customer's current content (the "proposed" value pending review).
    pub customized_content: Option<String>,
    /// The content the incoming version wants to write.
    pub incoming_content: Option<String>,
    /// Version that produced the conflict.
    pub target_version: String,
    pub status: String,
    pub resolution: Option<String>,
    pub resolved_by: Option<String>,
}

impl ConflictRecord {
    /// Create a new conflict record with defaults.
    pub fn new(
        template_id: impl Into<String>,
        file_path: impl Into<String>,
        customization_type: CustomizationType,
        target_version: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            template_id: template_id.into(),
            file_path: file_path.into(),
            customization_type,
            base_content: None,
            customized_content: None,
            incoming_content: None,
            target_version: target_version.into(),
            status: "pending".to_string(),
            resolution: None,
            resolved_by: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Update report
// ---------------------------------------------------------------------------

/// Outcome of a single update attempt.
///
/// Distinguishes "nothing changed" from "partially changed": `applied_files`
/// lists what was written, `conflicts` what was not. Overall success is
/// defined as `conflicts.is_empty()`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateReport {
    pub template_id: String,
    pub from_version: String,
    pub to_version: String,
    /// Snapshot taken before the merge step. Always present when the attempt
    /// reached the merge, whether or not the merge succeeded.
    pub backup_id: String,
    /// Files the merge wrote.
    pub applied_files: Vec<String>,
    /// Conflicts queued for manual review.
    pub conflicts: Vec<ConflictRecord>,
    /// Migration instructions for the target version, if any. Surfaced to the
    /// caller, never executed by the engine.
    pub migration: Option<String>,
    /// Deployment result if auto-deploy was requested and the merge was clean.
    pub deployment: Option<Deployment>,
    /// Manual fallback guidance when the deployment trigger failed.
    pub deploy_fallback: Option<String>,
    pub completed_at: DateTime<Utc>,
}

impl UpdateReport {
    /// `true` when every file touched by the target version merged cleanly.
    pub fn succeeded(&self) -> bool {
        self.conflicts.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Update package
// ---------------------------------------------------------------------------

/// One file rewritten by an update package.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileUpdate {
    /// Path relative to the template root.
    pub path: String,
    /// Full updated content for the file.
    pub content: String,
    /// Whether the owning change allows merging with a customization.
    pub preserve_customizations: bool,
    /// Whether the owning change forces manual review.
    pub requires_manual_review: bool,
}

/// Everything needed to apply one version: file updates, migration steps,
/// and rollback metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdatePackage {
    pub version: String,
    pub breaking: bool,
    pub files: Vec<FileUpdate>,
    pub migration: Option<String>,
    /// Retention window backups for this update will carry.
    pub backup_retention_days: u32,
}

// ---------------------------------------------------------------------------
// Audit entry
// ---------------------------------------------------------------------------

/// An audit-log entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub action: String,
    pub details: String,
    pub success: bool,
    pub timestamp: DateTime<Utc>,
}

impl AuditEntry {
    /// Create a success audit entry.
    pub fn success(action: &str, details: &str) -> Self {
        Self {
            action: action.to_string(),
            details: details.to_string(),
            success: true,
            timestamp: Utc::now(),
        }
    }

    /// Create a failure audit entry.
    pub fn failure(action: &str, details: &str) -> Self {
        Self {
            action: action.to_string(),
            details: details.to_string(),
            success: false,
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enum_display() {
        assert_eq!(ChangeType::Security.to_string(), "security");
        assert_eq!(ChangeCategory::Frontend.to_string(), "frontend");
        assert_eq!(CustomizationType::Branding.to_string(), "branding");
        assert_eq!(DeploymentStatus::Failed.to_string(), "failed");
        assert_eq!(VersionType::Hotfix.to_string(), "hotfix");
    }

    #[test]
    fn test_customization_type_roundtrip() {
        for ty in [
            CustomizationType::Branding,
            CustomizationType::Styling,
            CustomizationType::Content,
            CustomizationType::Functionality,
        ] {
            assert_eq!(CustomizationType::from_str_val(&ty.to_string()), ty);
        }
    }

    #[test]
    fn test_backup_expiry() {
        let backup = Backup {
            id: "b1".into(),
            template_id: "tpl".into(),
            timestamp: Utc::now(),
            retention_days: 30,
            used_for_rollback: false,
            rollback_date: None,
        };
        assert!(backup.expires_at() > Utc::now());
    }

    #[test]
    fn test_report_success_definition() {
        let mut report = UpdateReport {
            template_id: "tpl".into(),
            from_version: "1.0.0".into(),
            to_version: "1.1.0".into(),
            backup_id: "b1".into(),
            applied_files: vec!["index.html".into()],
            conflicts: Vec::new(),
            migration: None,
            deployment: None,
            deploy_fallback: None,
            completed_at: Utc::now(),
        };
        assert!(report.succeeded());

        report.conflicts.push(ConflictRecord::new(
            "tpl",
            "styles/theme.css",
            CustomizationType::Styling,
            "1.1.0",
        ));
        assert!(!report.succeeded());
    }
}
