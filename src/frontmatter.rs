//! Front-matter conventions: the leading `---` YAML block, the accepted
//! date formats, tag normalization, and slug generation.

use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::sync::OnceLock;

pub type Metadata = BTreeMap<String, Value>;

static FRONTMATTER: OnceLock<Regex> = OnceLock::new();
static SLUG_STRIP: OnceLock<Regex> = OnceLock::new();
static SLUG_COLLAPSE: OnceLock<Regex> = OnceLock::new();

fn frontmatter_regex() -> &'static Regex {
    FRONTMATTER.get_or_init(|| Regex::new(r"(?s)^---\s*\n(.*?)\n---[ \t]*(?:\n(.*))?$").unwrap())
}

/// Splits a document into its front-matter mapping and body text.
///
/// A document with no leading `---` block yields an empty mapping and the
/// whole document as body. Malformed YAML between the fences is an error
/// (the caller attaches the file path).
pub fn split(raw: &str) -> Result<(Metadata, String), String> {
    let Some(captures) = frontmatter_regex().captures(raw) else {
        return Ok((Metadata::new(), raw.to_string()));
    };

    let yaml = captures.get(1).unwrap().as_str();
    let body = captures.get(2).map_or("", |m| m.as_str());

    let metadata = if yaml.trim().is_empty() {
        Metadata::new()
    } else {
        serde_yaml::from_str(yaml).map_err(|e| format!("invalid front-matter: {e}"))?
    };

    Ok((metadata, body.trim_start_matches('\n').to_string()))
}

/// Renders a scalar front-matter value (string, number, bool) to its string
/// form. Sequences and mappings have no scalar form.
pub fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Parses a front-matter date value.
///
/// String values are tried against the five supported formats in a fixed
/// order, first match wins. Any other value type, or a string matching no
/// format, is an error.
pub fn parse_date(value: &Value) -> Result<NaiveDateTime, String> {
    match value {
        Value::String(s) => {
            parse_date_str(s).ok_or_else(|| format!("unsupported date format: {s:?}"))
        }
        other => Err(format!("unsupported date type: {other:?}")),
    }
}

fn parse_date_str(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    for fmt in ["%Y-%m-%d", "%Y/%m/%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return date.and_hms_opt(0, 0, 0);
        }
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y/%m/%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    None
}

/// Normalizes the `tags` front-matter value: lists pass through, a
/// comma-separated string is split and trimmed, anything else is no tags.
pub fn tags(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Sequence(seq)) => seq.iter().filter_map(scalar_to_string).collect(),
        Some(Value::String(s)) => s
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

/// Cleans arbitrary text into a URL-safe fragment: lowercased, characters
/// outside word characters, whitespace, CJK ideographs, and hyphens
/// removed, whitespace/underscore runs collapsed to single hyphens,
/// hyphens trimmed from both ends.
pub fn slugify(text: &str) -> String {
    let strip = SLUG_STRIP.get_or_init(|| Regex::new(r"[^\w\s\x{4e00}-\x{9fff}-]").unwrap());
    let collapse = SLUG_COLLAPSE.get_or_init(|| Regex::new(r"[\s_]+").unwrap());

    let lowered = text.to_lowercase();
    let stripped = strip.replace_all(&lowered, "");
    let collapsed = collapse.replace_all(&stripped, "-");
    collapsed.trim_matches('-').to_string()
}

/// Builds the post slug: `<YYYY-MM-DD>-<cleaned-title>`. A title that
/// cleans down to nothing degrades to the bare date.
pub fn make_slug(title: &str, date: NaiveDateTime) -> String {
    let cleaned = slugify(title);
    let date_part = date.format("%Y-%m-%d");
    if cleaned.is_empty() {
        date_part.to_string()
    } else {
        format!("{date_part}-{cleaned}")
    }
}
