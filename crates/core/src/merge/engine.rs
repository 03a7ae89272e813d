//! Per-file merge dispatch.
//!
//! Each incoming file update is reconciled against at most one classified
//! customization. The outcome is always one of: apply the update, or surface
//! an explicit conflict. A conflict here is an expected result, not an error;
//! the engine never silently overwrites a preserved customization.

use tracing::{debug, info, warn};

use crate::merge::branding;
use crate::models::{ConflictRecord, CustomerCustomization, CustomizationType, FileUpdate};

// ---------------------------------------------------------------------------
// Outcome type
// ---------------------------------------------------------------------------

/// The result of merging one file update.
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    /// Path relative to the template root.
    pub path: String,
    /// The content that should be live after this merge. When the outcome is
    /// a conflict this is the unchanged customized content.
    pub content: String,
    /// Whether the incoming update was applied (fully or with branding
    /// values re-injected).
    pub applied: bool,
    /// The conflict record to persist, when the file could not be merged.
    pub conflict: Option<ConflictRecord>,
}

impl MergeOutcome {
    fn applied(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
            applied: true,
            conflict: None,
        }
    }

    fn conflicted(path: impl Into<String>, content: impl Into<String>, conflict: ConflictRecord) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
            applied: false,
            conflict: Some(conflict),
        }
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Stateless per-file merge engine.
pub struct MergeEngine;

impl MergeEngine {
    /// Merge one incoming file update against the customization recorded for
    /// the same path, if any.
    ///
    /// `preserve_customizations` is the caller's choice for this update run.
    /// Passing `false` applies the update destructively over any
    /// customization; that path must always be an explicit opt-in.
    pub fn merge_file(
        template_id: &str,
        target_version: &str,
        update: &FileUpdate,
        customization: Option<&CustomerCustomization>,
        preserve_customizations: bool,
    ) -> MergeOutcome {
        let Some(customization) = customization else {
            debug!(path = %update.path, "no customization, applying update directly");
            return MergeOutcome::applied(&update.path, &update.content);
        };

        if !preserve_customizations {
            warn!(
                path = %update.path,
                customization_type = %customization.customization_type,
                "discarding customization at caller's request"
            );
            return MergeOutcome::applied(&update.path, &update.content);
        }

        let conflict = |customization_type: CustomizationType| {
            let mut record = ConflictRecord::new(
                template_id,
                &update.path,
                customization_type,
                target_version,
            );
            record.base_content = Some(customization.original_content.clone());
            record.customized_content = Some(customization.customized_content.clone());
            record.incoming_content = Some(update.content.clone());
            record
        };

        // A change that demands manual review conflicts no matter how the
        // customization is classified.
        if update.requires_manual_review {
            debug!(path = %update.path, "change requires manual review");
            return MergeOutcome::conflicted(
                &update.path,
                &customization.customized_content,
                conflict(customization.customization_type),
            );
        }

        // The change itself declares it cannot coexist with customizations.
        if !update.preserve_customizations {
            debug!(path = %update.path, "change cannot be merged with customizations");
            return MergeOutcome::conflicted(
                &update.path,
                &customization.customized_content,
                conflict(customization.customization_type),
            );
        }

        if !customization.preservable {
            debug!(
                path = %update.path,
                customization_type = %customization.customization_type,
                "customization not preservable, queuing for review"
            );
            return MergeOutcome::conflicted(
                &update.path,
                &customization.customized_content,
                conflict(customization.customization_type),
            );
        }

        match customization.customization_type {
            CustomizationType::Branding => {
                // Branding never conflicts: lift the known keys out of the
                // customized content and write them into the update.
                let values = branding::extract(&customization.customized_content);
                let merged = branding::inject(&update.content, &values);
                info!(
                    path = %update.path,
                    keys = values.len(),
                    "branding merge applied"
                );
                MergeOutcome::applied(&update.path, merged)
            }
            // Styling and content merges are deliberately conservative: the
            // customized content is returned unchanged as the proposed value
            // and a reviewer decides.
            CustomizationType::Styling | CustomizationType::Content => {
                debug!(
                    path = %update.path,
                    customization_type = %customization.customization_type,
                    "conservative strategy, queuing conflict"
                );
                MergeOutcome::conflicted(
                    &update.path,
                    &customization.customized_content,
                    conflict(customization.customization_type),
                )
            }
            // Unreachable in practice (functionality is never preservable),
            // but handled the same way for exhaustiveness.
            CustomizationType::Functionality => MergeOutcome::conflicted(
                &update.path,
                &customization.customized_content,
                conflict(CustomizationType::Functionality),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn update(path: &str, content: &str) -> FileUpdate {
        FileUpdate {
            path: path.to_string(),
            content: content.to_string(),
            preserve_customizations: true,
            requires_manual_review: false,
        }
    }

    fn customization(
        file: &str,
        original: &str,
        customized: &str,
        customization_type: CustomizationType,
    ) -> CustomerCustomization {
        CustomerCustomization {
            file: file.to_string(),
            original_content: original.to_string(),
            customized_content: customized.to_string(),
            customization_type,
            last_modified: Utc::now(),
            preservable: !matches!(customization_type, CustomizationType::Functionality),
        }
    }

    #[test]
    fn test_no_customization_applies_directly() {
        let outcome = MergeEngine::merge_file(
            "tpl-1",
            "2.0.0",
            &update("index.html", "<h1>v2</h1>"),
            None,
            true,
        );
        assert!(outcome.applied);
        assert!(outcome.conflict.is_none());
        assert_eq!(outcome.content, "<h1>v2</h1>");
    }

    #[test]
    fn test_opt_out_discards_customization() {
        let c = customization("a.css", ".x{}", ".x{color:red}", CustomizationType::Styling);
        let outcome =
            MergeEngine::merge_file("tpl-1", "2.0.0", &update("a.css", ".x{gap:1rem}"), Some(&c), false);
        assert!(outcome.applied);
        assert_eq!(outcome.content, ".x{gap:1rem}");
    }

    #[test]
    fn test_unpreservable_conflicts() {
        let c = customization(
            "cart.js",
            "function f() {}",
            "function f() { track(); }",
            CustomizationType::Functionality,
        );
        let outcome = MergeEngine::merge_file(
            "tpl-1",
            "2.0.0",
            &update("cart.js", "function f() { v2(); }"),
            Some(&c),
            true,
        );
        assert!(!outcome.applied);
        let conflict = outcome.conflict.unwrap();
        assert_eq!(conflict.customization_type, CustomizationType::Functionality);
        // File content is left as the customer had it.
        assert_eq!(outcome.content, "function f() { track(); }");
    }

    #[test]
    fn test_branding_merge_never_conflicts() {
        let c = customization(
            "config/site.toml",
            "brand_name = \"Acme Wellness\"\n",
            "brand_name = \"Sacred Valley Elixirs\"\n",
            CustomizationType::Branding,
        );
        let incoming = "brand_name = \"Acme Wellness\"\nfeature_flags = [\"reviews\"]\n";
        let outcome = MergeEngine::merge_file(
            "tpl-1",
            "2.0.0",
            &update("config/site.toml", incoming),
            Some(&c),
            true,
        );
        assert!(outcome.applied);
        assert!(outcome.conflict.is_none());
        assert!(outcome.content.contains("Sacred Valley Elixirs"));
        assert!(outcome.content.contains("feature_flags"));
    }

    #[test]
    fn test_styling_always_conflicts() {
        let c = customization(
            "theme.css",
            ".hero { padding: 2rem; }",
            ".hero { padding: 4rem; }",
            CustomizationType::Styling,
        );
        let outcome = MergeEngine::merge_file(
            "tpl-1",
            "2.0.0",
            &update("theme.css", ".hero { padding: 2rem; gap: 1rem; }"),
            Some(&c),
            true,
        );
        assert!(!outcome.applied);
        let conflict = outcome.conflict.unwrap();
        assert_eq!(conflict.customization_type, CustomizationType::Styling);
        assert_eq!(
            conflict.customized_content.as_deref(),
            Some(".hero { padding: 4rem; }")
        );
    }

    #[test]
    fn test_content_always_conflicts() {
        let c = customization(
            "about.html",
            "<p>old</p>",
            "<p>our story</p>",
            CustomizationType::Content,
        );
        let outcome = MergeEngine::merge_file(
            "tpl-1",
            "2.0.0",
            &update("about.html", "<p>new baseline</p>"),
            Some(&c),
            true,
        );
        assert!(!outcome.applied);
    }

    #[test]
    fn test_manual_review_short_circuits_branding() {
        let c = customization(
            "config/site.toml",
            "brand_name = \"Acme\"\n",
            "brand_name = \"Sacred Valley Elixirs\"\n",
            CustomizationType::Branding,
        );
        let mut u = update("config/site.toml", "brand_name = \"Acme\"\nengine = 2\n");
        u.requires_manual_review = true;
        let outcome = MergeEngine::merge_file("tpl-1", "2.0.0", &u, Some(&c), true);
        assert!(!outcome.applied);
        assert!(outcome.conflict.is_some());
    }

    #[test]
    fn test_change_level_opt_out_conflicts() {
        let c = customization(
            "about.html",
            "<p>old</p>",
            "<p>custom</p>",
            CustomizationType::Content,
        );
        let mut u = update("about.html", "<p>rewritten</p>");
        u.preserve_customizations = false;
        let outcome = MergeEngine::merge_file("tpl-1", "2.0.0", &u, Some(&c), true);
        assert!(!outcome.applied);
        assert!(outcome.conflict.is_some());
    }
}
