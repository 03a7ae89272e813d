//! Customization analysis.
//!
//! Compares each template file's live content against the pristine baseline
//! recorded at the last successful update and classifies every delta by the
//! kind of content it touches. Analysis is a pure read: nothing here mutates
//! customer files or caches results between calls.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use glob_match::glob_match;
use regex_lite::Regex;
use tracing::{debug, info};

use crate::db::Database;
use crate::errors::AnalyzerError;
use crate::models::{CustomerCustomization, CustomizationType};

// ---------------------------------------------------------------------------
// Analyzer
// ---------------------------------------------------------------------------

/// Classifies customer edits per file by comparing live content against the
/// stored baseline.
pub struct CustomizationAnalyzer {
    db: Arc<Database>,
    ignore_patterns: Vec<String>,
    branding_pattern: Regex,
    styling_pattern: Regex,
    logic_pattern: Regex,
}

impl CustomizationAnalyzer {
    pub fn new(db: Arc<Database>, ignore_patterns: Vec<String>) -> Self {
        // The branding schema is fixed: brand name, tagline, the two theme
        // colors, and the public domain. Matches both config-style
        // assignments and CSS custom properties carrying the same keys.
        let branding_pattern = Regex::new(
            r#"(?i)(brand[_-]?name|tagline|primary[_-]?color|secondary[_-]?color|domain|--brand-[a-z-]+)\s*[:=]"#,
        )
        .unwrap_or_else(|e| panic!("branding pattern: {e}"));
        let styling_pattern =
            Regex::new(r"(--[a-z][a-z0-9-]*\s*:|^\s*\.[a-zA-Z][\w-]*\s*\{|@media|@import\s+url)")
                .unwrap_or_else(|e| panic!("styling pattern: {e}"));
        let logic_pattern = Regex::new(
            r"(\bfunction\b|=>|\bconst\s+\w+\s*=|\blet\s+\w+\s*=|\breturn\b|\bimport\s+\{|<script)",
        )
        .unwrap_or_else(|e| panic!("logic pattern: {e}"));

        Self {
            db,
            ignore_patterns,
            branding_pattern,
            styling_pattern,
            logic_pattern,
        }
    }

    /// Compute the customization set for a template: one entry per file whose
    /// live content differs from its baseline.
    ///
    /// Files with no recorded baseline are skipped rather than reported as
    /// customizations, since there is nothing sound to diff against.
    pub fn analyze(&self, template_id: &str) -> Result<Vec<CustomerCustomization>, AnalyzerError> {
        if self.db.get_template(template_id)?.is_none() {
            return Err(AnalyzerError::TemplateNotFound(template_id.to_string()));
        }

        let files = self.db.list_template_files(template_id)?;
        let mut customizations = Vec::new();

        for file in files {
            if self.is_ignored(&file.path) {
                debug!(path = %file.path, "file matches ignore pattern, skipping");
                continue;
            }
            let Some(baseline) = file.baseline_content else {
                debug!(path = %file.path, "no baseline recorded, skipping");
                continue;
            };
            if baseline == file.live_content {
                continue;
            }

            let customization_type = self.classify(&file.path, &baseline, &file.live_content);
            let preservable = !matches!(customization_type, CustomizationType::Functionality);
            // The store stamps every live-content write; that is when the
            // customer last touched the file.
            let last_modified = DateTime::parse_from_rfc3339(&file.updated_at)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now());
            debug!(
                path = %file.path,
                customization_type = %customization_type,
                preservable,
                "customization detected"
            );
            customizations.push(CustomerCustomization {
                file: file.path,
                original_content: baseline,
                customized_content: file.live_content,
                customization_type,
                last_modified,
                preservable,
            });
        }

        info!(
            template_id,
            count = customizations.len(),
            "customization analysis complete"
        );
        Ok(customizations)
    }

    fn is_ignored(&self, path: &str) -> bool {
        self.ignore_patterns.iter().any(|p| glob_match(p, path))
    }

    /// Classification is driven by which kind of content the delta touches,
    /// checked in precedence order: executable logic beats everything else,
    /// then brand variables, then CSS structure, then freeform text.
    fn classify(&self, path: &str, baseline: &str, live: &str) -> CustomizationType {
        let changed = changed_lines(baseline, live);

        if is_logic_file(path) || changed.iter().any(|l| self.logic_pattern.is_match(l)) {
            return CustomizationType::Functionality;
        }
        if changed.iter().any(|l| self.branding_pattern.is_match(l)) {
            return CustomizationType::Branding;
        }
        if is_styling_file(path) || changed.iter().any(|l| self.styling_pattern.is_match(l)) {
            return CustomizationType::Styling;
        }
        CustomizationType::Content
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Lines present in `live` but not in `baseline`, plus lines removed from the
/// baseline. Order-insensitive line diff is enough here: classification only
/// needs to know what kind of text changed, not where.
fn changed_lines(baseline: &str, live: &str) -> Vec<String> {
    let base_set: HashSet<&str> = baseline.lines().collect();
    let live_set: HashSet<&str> = live.lines().collect();

    let mut changed: Vec<String> = live
        .lines()
        .filter(|l| !base_set.contains(l))
        .map(str::to_string)
        .collect();
    changed.extend(
        baseline
            .lines()
            .filter(|l| !live_set.contains(l))
            .map(str::to_string),
    );
    changed
}

fn is_logic_file(path: &str) -> bool {
    path.ends_with(".js")
        || path.ends_with(".jsx")
        || path.ends_with(".ts")
        || path.ends_with(".tsx")
        || path.ends_with(".mjs")
}

fn is_styling_file(path: &str) -> bool {
    path.ends_with(".css") || path.ends_with(".scss") || path.ends_with(".less")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyzer() -> CustomizationAnalyzer {
        let db = Arc::new(Database::in_memory().unwrap());
        db.initialize().unwrap();
        db.upsert_template("tpl-1", "Sacred Valley", "1.5.2").unwrap();
        CustomizationAnalyzer::new(db, vec!["node_modules/**".to_string(), "*.lock".to_string()])
    }

    fn db_of(analyzer: &CustomizationAnalyzer) -> &Database {
        &analyzer.db
    }

    #[test]
    fn test_unknown_template_rejected() {
        let analyzer = analyzer();
        let result = analyzer.analyze("ghost");
        assert!(matches!(result, Err(AnalyzerError::TemplateNotFound(_))));
    }

    #[test]
    fn test_unchanged_files_not_reported() {
        let analyzer = analyzer();
        db_of(&analyzer)
            .upsert_template_file("tpl-1", "index.html", Some("<h1>hi</h1>"), "<h1>hi</h1>")
            .unwrap();
        assert!(analyzer.analyze("tpl-1").unwrap().is_empty());
    }

    #[test]
    fn test_missing_baseline_skipped() {
        let analyzer = analyzer();
        db_of(&analyzer)
            .upsert_template_file("tpl-1", "new.html", None, "<p>fresh</p>")
            .unwrap();
        assert!(analyzer.analyze("tpl-1").unwrap().is_empty());
    }

    #[test]
    fn test_ignored_patterns_skipped() {
        let analyzer = analyzer();
        db_of(&analyzer)
            .upsert_template_file("tpl-1", "yarn.lock", Some("a"), "b")
            .unwrap();
        db_of(&analyzer)
            .upsert_template_file("tpl-1", "node_modules/pkg/index.js", Some("a"), "b")
            .unwrap();
        assert!(analyzer.analyze("tpl-1").unwrap().is_empty());
    }

    #[test]
    fn test_last_modified_comes_from_the_store() {
        let analyzer = analyzer();
        db_of(&analyzer)
            .upsert_template_file("tpl-1", "pages/about.html", Some("<p>a</p>"), "<p>b</p>")
            .unwrap();

        let stored = db_of(&analyzer)
            .get_template_file("tpl-1", "pages/about.html")
            .unwrap()
            .unwrap();
        let expected = DateTime::parse_from_rfc3339(&stored.updated_at)
            .unwrap()
            .with_timezone(&Utc);

        let result = analyzer.analyze("tpl-1").unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].last_modified, expected);
    }

    #[test]
    fn test_branding_classification() {
        let analyzer = analyzer();
        db_of(&analyzer)
            .upsert_template_file(
                "tpl-1",
                "config/site.toml",
                Some("brand_name = \"Acme Wellness\"\ntagline = \"Feel better\"\n"),
                "brand_name = \"Sacred Valley Elixirs\"\ntagline = \"Feel better\"\n",
            )
            .unwrap();
        let result = analyzer.analyze("tpl-1").unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].customization_type, CustomizationType::Branding);
        assert!(result[0].preservable);
    }

    #[test]
    fn test_styling_classification() {
        let analyzer = analyzer();
        db_of(&analyzer)
            .upsert_template_file(
                "tpl-1",
                "styles/theme.css",
                Some(".hero { padding: 2rem; }\n"),
                ".hero { padding: 4rem; }\n",
            )
            .unwrap();
        let result = analyzer.analyze("tpl-1").unwrap();
        assert_eq!(result[0].customization_type, CustomizationType::Styling);
        assert!(result[0].preservable);
    }

    #[test]
    fn test_logic_change_never_preservable() {
        let analyzer = analyzer();
        db_of(&analyzer)
            .upsert_template_file(
                "tpl-1",
                "scripts/cart.js",
                Some("function addToCart(item) { return item; }\n"),
                "function addToCart(item) { return track(item); }\n",
            )
            .unwrap();
        let result = analyzer.analyze("tpl-1").unwrap();
        assert_eq!(result[0].customization_type, CustomizationType::Functionality);
        assert!(!result[0].preservable);
    }

    #[test]
    fn test_script_block_in_html_is_functionality() {
        let analyzer = analyzer();
        db_of(&analyzer)
            .upsert_template_file(
                "tpl-1",
                "index.html",
                Some("<p>welcome</p>\n"),
                "<p>welcome</p>\n<script>trackVisit()</script>\n",
            )
            .unwrap();
        let result = analyzer.analyze("tpl-1").unwrap();
        assert_eq!(result[0].customization_type, CustomizationType::Functionality);
    }

    #[test]
    fn test_freeform_text_is_content() {
        let analyzer = analyzer();
        db_of(&analyzer)
            .upsert_template_file(
                "tpl-1",
                "pages/about.html",
                Some("<p>We sell things.</p>\n"),
                "<p>Founded in the Sacred Valley, we craft herbal elixirs.</p>\n",
            )
            .unwrap();
        let result = analyzer.analyze("tpl-1").unwrap();
        assert_eq!(result[0].customization_type, CustomizationType::Content);
        assert!(result[0].preservable);
    }
}
