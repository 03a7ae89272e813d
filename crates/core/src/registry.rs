//! Version registry & comparator.
//!
//! The registry is append-only external configuration: a `catalog.toml` file
//! listing every published [`TemplateVersion`], plus a `payloads/<version>/`
//! directory tree holding the updated file contents each version ships. This
//! component never mutates the catalog.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info};

use crate::errors::VersionError;
use crate::models::{FileUpdate, TemplateVersion, UpdatePackage};

// ---------------------------------------------------------------------------
// Version
// ---------------------------------------------------------------------------

/// A parsed dotted numeric version.
///
/// Missing trailing components compare as 0, so `2.1` == `2.1.0`.
#[derive(Debug, Clone)]
pub struct Version {
    components: Vec<u64>,
    raw: String,
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == std::cmp::Ordering::Equal
    }
}

impl Eq for Version {}

impl Version {
    /// Parse a dotted numeric version string.
    ///
    /// Any non-numeric or empty component fails with
    /// [`VersionError::InvalidFormat`] -- fast, before any state changes.
    pub fn parse(s: &str) -> Result<Self, VersionError> {
        if s.trim().is_empty() {
            return Err(VersionError::InvalidFormat(s.to_string()));
        }
        let components = s
            .trim()
            .split('.')
            .map(|c| c.parse::<u64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| VersionError::InvalidFormat(s.to_string()))?;
        Ok(Self {
            components,
            raw: s.trim().to_string(),
        })
    }

    /// The original string this version was parsed from.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Compare two version strings, returning -1, 0, or 1.
    pub fn compare(a: &str, b: &str) -> Result<i32, VersionError> {
        let va = Version::parse(a)?;
        let vb = Version::parse(b)?;
        Ok(match va.cmp(&vb) {
            std::cmp::Ordering::Less => -1,
            std::cmp::Ordering::Equal => 0,
            std::cmp::Ordering::Greater => 1,
        })
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        let len = self.components.len().max(other.components.len());
        for i in 0..len {
            // Missing trailing components read as 0.
            let a = self.components.get(i).copied().unwrap_or(0);
            let b = other.components.get(i).copied().unwrap_or(0);
            match a.cmp(&b) {
                std::cmp::Ordering::Equal => continue,
                ord => return ord,
            }
        }
        std::cmp::Ordering::Equal
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.raw)
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// On-disk catalog file shape.
#[derive(Debug, Deserialize)]
struct Catalog {
    #[serde(default)]
    versions: Vec<TemplateVersion>,
}

/// The ordered catalog of published template versions.
pub struct VersionRegistry {
    versions: Vec<TemplateVersion>,
    payload_dir: PathBuf,
    default_retention_days: u32,
}

impl VersionRegistry {
    /// Load the registry from a directory containing `catalog.toml` and
    /// `payloads/`.
    ///
    /// Entries are sorted ascending by version at load time; an unparsable
    /// version in the catalog is a hard error.
    pub fn load<P: AsRef<Path>>(
        registry_dir: P,
        default_retention_days: u32,
    ) -> Result<Self, VersionError> {
        let registry_dir = registry_dir.as_ref();
        let catalog_path = registry_dir.join("catalog.toml");
        info!(path = %catalog_path.display(), "loading version registry");

        let contents =
            std::fs::read_to_string(&catalog_path).map_err(|e| VersionError::CatalogError {
                path: catalog_path.display().to_string(),
                detail: e.to_string(),
            })?;
        let catalog: Catalog =
            toml::from_str(&contents).map_err(|e| VersionError::CatalogError {
                path: catalog_path.display().to_string(),
                detail: e.to_string(),
            })?;

        let mut versions = catalog.versions;
        // Validate every version string up front.
        let mut parsed: Vec<(Version, usize)> = Vec::with_capacity(versions.len());
        for (i, entry) in versions.iter().enumerate() {
            parsed.push((Version::parse(&entry.version)?, i));
        }
        parsed.sort_by(|(a, _), (b, _)| a.cmp(b));
        versions = parsed
            .into_iter()
            .map(|(_, i)| versions[i].clone())
            .collect();

        debug!(count = versions.len(), "version registry loaded");
        Ok(Self {
            versions,
            payload_dir: registry_dir.join("payloads"),
            default_retention_days,
        })
    }

    /// Build a registry from in-memory entries (tests).
    pub fn from_versions(
        mut versions: Vec<TemplateVersion>,
        payload_dir: PathBuf,
        default_retention_days: u32,
    ) -> Result<Self, VersionError> {
        let mut keyed: Vec<(Version, TemplateVersion)> = Vec::with_capacity(versions.len());
        for entry in versions.drain(..) {
            keyed.push((Version::parse(&entry.version)?, entry));
        }
        keyed.sort_by(|(a, _), (b, _)| a.cmp(b));
        Ok(Self {
            versions: keyed.into_iter().map(|(_, v)| v).collect(),
            payload_dir,
            default_retention_days,
        })
    }

    /// All registry entries strictly newer than `current`, ascending.
    ///
    /// Never includes `current` itself.
    pub fn updates_since(&self, current: &str) -> Result<Vec<TemplateVersion>, VersionError> {
        let current = Version::parse(current)?;
        let mut updates: Vec<TemplateVersion> = Vec::new();
        for entry in &self.versions {
            // Catalog versions are validated at load time.
            let v = Version::parse(&entry.version)?;
            if v > current {
                updates.push(entry.clone());
            }
        }
        debug!(
            current = %current,
            count = updates.len(),
            "computed available updates"
        );
        Ok(updates)
    }

    /// True iff any change in any of `updates` is a security change.
    pub fn has_security_update(updates: &[TemplateVersion]) -> bool {
        updates.iter().any(|u| {
            u.changes
                .iter()
                .any(|c| c.change_type == crate::models::ChangeType::Security)
        })
    }

    /// The newest published version, if the catalog is non-empty.
    pub fn latest(&self) -> Option<&TemplateVersion> {
        self.versions.last()
    }

    /// Number of published versions in the catalog.
    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    /// Look up a catalog entry by exact version (after normalization, so
    /// `2.1` finds `2.1.0`).
    pub fn get(&self, version: &str) -> Result<&TemplateVersion, VersionError> {
        let wanted = Version::parse(version)?;
        self.versions
            .iter()
            .find(|e| Version::parse(&e.version).map(|v| v == wanted).unwrap_or(false))
            .ok_or_else(|| VersionError::NotFound(version.to_string()))
    }

    /// Assemble the update package for a target version: every file its
    /// changes rewrite, with content read fresh from the payload directory.
    pub fn package_for(&self, target_version: &str) -> Result<UpdatePackage, VersionError> {
        let entry = self.get(target_version)?;
        let version_dir = self.payload_dir.join(&entry.version);

        let mut files: Vec<FileUpdate> = Vec::new();
        for change in &entry.changes {
            for file in &change.files {
                let path = version_dir.join(file);
                let content =
                    std::fs::read_to_string(&path).map_err(|_| VersionError::PayloadMissing {
                        version: entry.version.clone(),
                        file: file.clone(),
                    })?;
                files.push(FileUpdate {
                    path: file.clone(),
                    content,
                    preserve_customizations: change.preserve_customizations,
                    requires_manual_review: change.requires_manual_review,
                });
            }
        }

        info!(
            version = %entry.version,
            files = files.len(),
            breaking = entry.breaking,
            "assembled update package"
        );
        Ok(UpdatePackage {
            version: entry.version.clone(),
            breaking: entry.breaking,
            files,
            migration: entry.migration.clone(),
            backup_retention_days: self.default_retention_days,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ChangeCategory, ChangeType, TemplateChange, VersionType};
    use chrono::Utc;

    fn version(v: &str, changes: Vec<TemplateChange>) -> TemplateVersion {
        TemplateVersion {
            version: v.to_string(),
            release_date: Utc::now(),
            version_type: VersionType::Minor,
            breaking: false,
            changes,
            migration: None,
        }
    }

    fn security_change(file: &str) -> TemplateChange {
        TemplateChange {
            change_type: ChangeType::Security,
            category: ChangeCategory::Backend,
            description: "patch injection vector".into(),
            files: vec![file.into()],
            preserve_customizations: false,
            requires_manual_review: false,
        }
    }

    fn feature_change(file: &str) -> TemplateChange {
        TemplateChange {
            change_type: ChangeType::Feature,
            category: ChangeCategory::Frontend,
            description: "new gallery widget".into(),
            files: vec![file.into()],
            preserve_customizations: true,
            requires_manual_review: false,
        }
    }

    fn registry(entries: Vec<TemplateVersion>) -> VersionRegistry {
        VersionRegistry::from_versions(entries, PathBuf::from("/nonexistent"), 30).unwrap()
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            Version::parse("2.x.1"),
            Err(VersionError::InvalidFormat(_))
        ));
        assert!(matches!(
            Version::parse(""),
            Err(VersionError::InvalidFormat(_))
        ));
        assert!(matches!(
            Version::parse("1..2"),
            Err(VersionError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_missing_trailing_components_are_zero() {
        assert_eq!(Version::compare("2.1", "2.1.0").unwrap(), 0);
        assert_eq!(Version::compare("2", "2.0.0").unwrap(), 0);
        assert_eq!(Version::compare("2.1", "2.1.1").unwrap(), -1);
    }

    #[test]
    fn test_compare_is_antisymmetric() {
        let cases = [("1.0.0", "2.0.0"), ("1.5.2", "1.5.10"), ("2.1", "2.1.0")];
        for (a, b) in cases {
            assert_eq!(
                Version::compare(a, b).unwrap(),
                -Version::compare(b, a).unwrap()
            );
        }
    }

    #[test]
    fn test_compare_is_transitive() {
        let (a, b, c) = ("1.2.3", "1.10.0", "2.0");
        assert!(Version::compare(a, b).unwrap() < 0);
        assert!(Version::compare(b, c).unwrap() < 0);
        assert!(Version::compare(a, c).unwrap() < 0);
    }

    #[test]
    fn test_numeric_not_lexicographic() {
        assert_eq!(Version::compare("1.9.0", "1.10.0").unwrap(), -1);
    }

    #[test]
    fn test_updates_since_excludes_current_and_sorts_ascending() {
        let reg = registry(vec![
            version("2.1.0", vec![feature_change("index.html")]),
            version("1.5.2", vec![]),
            version("2.0.0", vec![security_change("api/auth.js")]),
        ]);

        let updates = reg.updates_since("1.5.2").unwrap();
        let versions: Vec<&str> = updates.iter().map(|u| u.version.as_str()).collect();
        assert_eq!(versions, vec!["2.0.0", "2.1.0"]);
        assert!(VersionRegistry::has_security_update(&updates));

        let none = reg.updates_since("2.1.0").unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn test_updates_since_rejects_invalid_current() {
        let reg = registry(vec![version("1.0.0", vec![])]);
        assert!(matches!(
            reg.updates_since("not-a-version"),
            Err(VersionError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_get_normalizes() {
        let reg = registry(vec![version("2.1.0", vec![])]);
        assert_eq!(reg.get("2.1").unwrap().version, "2.1.0");
        assert!(matches!(reg.get("9.9.9"), Err(VersionError::NotFound(_))));
    }

    #[test]
    fn test_load_from_disk_and_package() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("catalog.toml"),
            r#"
[[versions]]
version = "1.1.0"
release_date = "2025-06-01T00:00:00Z"
type = "minor"
breaking = false

[[versions.changes]]
type = "feature"
category = "frontend"
description = "refreshed hero section"
files = ["index.html"]
preserve_customizations = true
"#,
        )
        .unwrap();
        let payload = dir.path().join("payloads").join("1.1.0");
        std::fs::create_dir_all(&payload).unwrap();
        std::fs::write(payload.join("index.html"), "<h1>v1.1.0</h1>").unwrap();

        let reg = VersionRegistry::load(dir.path(), 30).unwrap();
        let pkg = reg.package_for("1.1.0").unwrap();
        assert_eq!(pkg.files.len(), 1);
        assert_eq!(pkg.files[0].path, "index.html");
        assert_eq!(pkg.files[0].content, "<h1>v1.1.0</h1>");
        assert_eq!(pkg.backup_retention_days, 30);
    }

    #[test]
    fn test_package_missing_payload() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("catalog.toml"),
            r#"
[[versions]]
version = "1.1.0"
release_date = "2025-06-01T00:00:00Z"
type = "minor"
breaking = false

[[versions.changes]]
type = "feature"
category = "frontend"
description = "refreshed hero section"
files = ["missing.html"]
preserve_customizations = true
"#,
        )
        .unwrap();
        let reg = VersionRegistry::load(dir.path(), 30).unwrap();
        assert!(matches!(
            reg.package_for("1.1.0"),
            Err(VersionError::PayloadMissing { .. })
        ));
    }
}
