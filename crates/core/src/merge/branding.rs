//! Branding key extraction and re-injection.
//!
//! Branding merges never conflict: the known key/value pairs are lifted out
//! of the customized content and written back into the incoming update's
//! content, leaving everything else the update changed untouched. The key
//! schema is fixed on purpose; arbitrary key extraction would make merge
//! correctness depend on guessing the customer's intent.

use std::sync::OnceLock;

use regex_lite::Regex;
use tracing::debug;

/// The closed set of branding keys the merge understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrandingKey {
    BrandName,
    Tagline,
    PrimaryColor,
    SecondaryColor,
    Domain,
}

impl BrandingKey {
    pub const ALL: [BrandingKey; 5] = [
        BrandingKey::BrandName,
        BrandingKey::Tagline,
        BrandingKey::PrimaryColor,
        BrandingKey::SecondaryColor,
        BrandingKey::Domain,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::BrandName => "brand_name",
            Self::Tagline => "tagline",
            Self::PrimaryColor => "primary_color",
            Self::SecondaryColor => "secondary_color",
            Self::Domain => "domain",
        }
    }

    /// Matches an assignment line for this key in either config form
    /// (`brand_name = "..."`) or CSS custom-property form
    /// (`--brand-name: ...;`).
    fn pattern(self) -> &'static Regex {
        match self {
            Self::BrandName => static_regex(
                &BRAND_NAME_RE,
                r#"(?m)^(?P<prefix>\s*(?:--brand-name|brand[_-]?name)\s*[:=]\s*)(?P<value>[^\r\n]*?)(?P<suffix>;?\s*)$"#,
            ),
            Self::Tagline => static_regex(
                &TAGLINE_RE,
                r#"(?m)^(?P<prefix>\s*(?:--brand-tagline|tagline)\s*[:=]\s*)(?P<value>[^\r\n]*?)(?P<suffix>;?\s*)$"#,
            ),
            Self::PrimaryColor => static_regex(
                &PRIMARY_COLOR_RE,
                r#"(?m)^(?P<prefix>\s*(?:--primary-color|primary[_-]?color)\s*[:=]\s*)(?P<value>[^\r\n]*?)(?P<suffix>;?\s*)$"#,
            ),
            Self::SecondaryColor => static_regex(
                &SECONDARY_COLOR_RE,
                r#"(?m)^(?P<prefix>\s*(?:--secondary-color|secondary[_-]?color)\s*[:=]\s*)(?P<value>[^\r\n]*?)(?P<suffix>;?\s*)$"#,
            ),
            Self::Domain => static_regex(
                &DOMAIN_RE,
                r#"(?m)^(?P<prefix>\s*domain\s*[:=]\s*)(?P<value>[^\r\n]*?)(?P<suffix>;?\s*)$"#,
            ),
        }
    }
}

static BRAND_NAME_RE: OnceLock<Regex> = OnceLock::new();
static TAGLINE_RE: OnceLock<Regex> = OnceLock::new();
static PRIMARY_COLOR_RE: OnceLock<Regex> = OnceLock::new();
static SECONDARY_COLOR_RE: OnceLock<Regex> = OnceLock::new();
static DOMAIN_RE: OnceLock<Regex> = OnceLock::new();

fn static_regex(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| match Regex::new(pattern) {
        Ok(re) => re,
        Err(e) => panic!("invalid branding pattern: {e}"),
    })
}

/// One extracted branding value, with its original quoting stripped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrandingValue {
    pub key: BrandingKey,
    pub value: String,
}

/// Extract every known branding key present in `content`.
pub fn extract(content: &str) -> Vec<BrandingValue> {
    let mut values = Vec::new();
    for key in BrandingKey::ALL {
        if let Some(caps) = key.pattern().captures(content) {
            let raw = caps.name("value").map(|m| m.as_str()).unwrap_or("");
            let value = strip_quotes(raw.trim()).to_string();
            if !value.is_empty() {
                debug!(key = key.name(), %value, "extracted branding value");
                values.push(BrandingValue { key, value });
            }
        }
    }
    values
}

/// Re-inject extracted branding values into `incoming`, preserving the
/// incoming content's own quoting style per line. Keys absent from either
/// side are left alone.
pub fn inject(incoming: &str, values: &[BrandingValue]) -> String {
    let mut result = incoming.to_string();
    for bv in values {
        let re = bv.key.pattern();
        if let Some(caps) = re.captures(&result) {
            let prefix = caps.name("prefix").map(|m| m.as_str()).unwrap_or("");
            let suffix = caps.name("suffix").map(|m| m.as_str()).unwrap_or("");
            let incoming_value = caps.name("value").map(|m| m.as_str()).unwrap_or("");
            let quoted = requote(incoming_value.trim(), &bv.value);
            let full = caps.get(0).map(|m| (m.start(), m.end()));
            if let Some((start, end)) = full {
                let replacement = format!("{prefix}{quoted}{suffix}");
                result.replace_range(start..end, &replacement);
                debug!(key = bv.key.name(), "re-injected branding value");
            }
        }
    }
    result
}

fn strip_quotes(s: &str) -> &str {
    let s = s.strip_suffix(';').unwrap_or(s).trim();
    if (s.starts_with('"') && s.ends_with('"') && s.len() >= 2)
        || (s.starts_with('\'') && s.ends_with('\'') && s.len() >= 2)
    {
        &s[1..s.len() - 1]
    } else {
        s
    }
}

/// Wrap `value` in the same quoting the incoming value used.
fn requote(incoming_value: &str, value: &str) -> String {
    if incoming_value.starts_with('"') {
        format!("\"{value}\"")
    } else if incoming_value.starts_with('\'') {
        format!("'{value}'")
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_config_form() {
        let content = "brand_name = \"Sacred Valley Elixirs\"\ntagline = \"Herbal goodness\"\ndomain = sacredvalley.example\n";
        let values = extract(content);
        assert_eq!(values.len(), 3);
        assert!(values
            .iter()
            .any(|v| v.key == BrandingKey::BrandName && v.value == "Sacred Valley Elixirs"));
        assert!(values
            .iter()
            .any(|v| v.key == BrandingKey::Domain && v.value == "sacredvalley.example"));
    }

    #[test]
    fn test_extract_css_form() {
        let content = ":root {\n  --brand-name: 'Sacred Valley Elixirs';\n  --primary-color: #2e7d32;\n}\n";
        let values = extract(content);
        assert!(values
            .iter()
            .any(|v| v.key == BrandingKey::BrandName && v.value == "Sacred Valley Elixirs"));
        assert!(values
            .iter()
            .any(|v| v.key == BrandingKey::PrimaryColor && v.value == "#2e7d32"));
    }

    #[test]
    fn test_inject_preserves_incoming_quoting() {
        let incoming = "brand_name = \"Acme Wellness\"\nnew_feature = true\n";
        let values = vec![BrandingValue {
            key: BrandingKey::BrandName,
            value: "Sacred Valley Elixirs".into(),
        }];
        let merged = inject(incoming, &values);
        assert!(merged.contains("brand_name = \"Sacred Valley Elixirs\""));
        assert!(merged.contains("new_feature = true"));
    }

    #[test]
    fn test_inject_key_missing_from_incoming_is_noop() {
        let incoming = "primary_color = #111111\n";
        let values = vec![BrandingValue {
            key: BrandingKey::Tagline,
            value: "Feel better".into(),
        }];
        assert_eq!(inject(incoming, &values), incoming);
    }

    #[test]
    fn test_roundtrip_through_extract_and_inject() {
        let customized = "brand_name = \"Sacred Valley Elixirs\"\nprimary_color = \"#2e7d32\"\n";
        let incoming = "brand_name = \"Acme Wellness\"\nprimary_color = \"#0000ff\"\nversion = 2\n";
        let merged = inject(incoming, &extract(customized));
        assert!(merged.contains("Sacred Valley Elixirs"));
        assert!(merged.contains("#2e7d32"));
        assert!(merged.contains("version = 2"));
    }
}
