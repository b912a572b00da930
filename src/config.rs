//! Configuration logic for the colophon pipeline.
//!
//! This module handles the deserialization of `colophon.toml` and provides
//! sane defaults for any missing optional fields. The `site` and `build`
//! sections are required; `theme_config` is an arbitrary passthrough table
//! owned by the active theme.

use crate::error::{Error, Result};
use crate::urls;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// The root configuration schema for a colophon project.
///
/// This struct represents the top-level mapping of the `colophon.toml`
/// file. A `Config` only exists after [`Config::load`] has succeeded, so
/// every lookup made through it is backed by a fully validated document.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    /// Site identity (title, description, author, origin, base path).
    pub site: SiteConfig,

    /// Build paths and artifact toggles.
    pub build: BuildConfig,

    /// Theme-defined settings (`posts_per_page`, `date_format`, ...),
    /// passed through to templates untouched.
    #[serde(default)]
    pub theme_config: toml::Table,

    /// Directory the config file was loaded from; anchors every relative
    /// path in the document.
    #[serde(skip)]
    root: PathBuf,

    /// The raw parsed document, kept for dotted-path lookups.
    #[serde(skip)]
    raw: toml::Table,
}

/// Metadata describing the website for templates, RSS, and SEO purposes.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SiteConfig {
    /// The name of the website, used in `<title>` tags and RSS headers.
    pub title: String,

    /// A short description of the site for meta tags and the RSS channel.
    pub description: String,

    /// The default author name shown by themes.
    pub author: String,

    /// The absolute origin for feed and sitemap links
    /// (e.g. "https://example.com"). Empty disables absolute URLs.
    #[serde(default)]
    pub url: String,

    /// URL prefix when the site is served from a sub-directory
    /// (e.g. "/myblog" for GitHub project pages).
    #[serde(default)]
    pub base_path: String,

    /// BCP-47 language tag for the RSS channel.
    #[serde(default = "default_language")]
    pub language: String,
}

/// Paths and toggles that control the build.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct BuildConfig {
    /// Target directory for the generated site.
    pub output_dir: PathBuf,

    /// Name of the theme directory under `themes/`.
    pub theme: String,

    /// Directory containing the markdown posts. Defaults to `./md`.
    #[serde(default = "default_md_dir")]
    pub md_dir: PathBuf,

    /// Whether to write `rss.xml`.
    #[serde(default = "default_bool_true")]
    pub generate_rss: bool,

    /// Whether to write `sitemap.xml`.
    #[serde(default = "default_bool_true")]
    pub generate_sitemap: bool,
}

impl Config {
    /// Loads and validates the configuration document.
    pub fn load(path: &Path) -> Result<Config> {
        let text = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;

        let raw: toml::Table = toml::from_str(&text)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        let mut config: Config = toml::from_str(&text)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;

        config.raw = raw;
        config.root = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."))
            .to_path_buf();
        Ok(config)
    }

    /// Resolves a dotted path ("theme_config.posts_per_page") against the
    /// raw document. Absent segments yield `None`; callers supply their own
    /// defaults.
    pub fn lookup(&self, dotted: &str) -> Option<&toml::Value> {
        let mut segments = dotted.split('.');
        let mut current = self.raw.get(segments.next()?)?;
        for segment in segments {
            current = current.as_table()?.get(segment)?;
        }
        Some(current)
    }

    /// Page size for the index, when pagination is enabled. Non-positive
    /// values count as disabled.
    pub fn posts_per_page(&self) -> Option<usize> {
        let n = self.lookup("theme_config.posts_per_page")?.as_integer()?;
        (n > 0).then_some(n as usize)
    }

    /// The date format templates use unless they override it per call.
    pub fn date_format(&self) -> String {
        self.lookup("theme_config.date_format")
            .and_then(|v| v.as_str())
            .unwrap_or("%Y-%m-%d")
            .to_string()
    }

    /// Syntect theme for fenced code blocks.
    pub fn syntax_theme(&self) -> String {
        self.lookup("theme_config.syntax_theme")
            .and_then(|v| v.as_str())
            .unwrap_or("base16-ocean.dark")
            .to_string()
    }

    /// The configured base path in normalized form.
    pub fn base_path(&self) -> String {
        urls::normalize_base_path(&self.site.base_path)
    }

    /// Site origin without its trailing slash; empty when unconfigured.
    pub fn site_origin(&self) -> String {
        urls::site_origin(&self.site.url)
    }

    pub fn md_dir(&self) -> PathBuf {
        self.root.join(&self.build.md_dir)
    }

    pub fn output_dir(&self) -> PathBuf {
        self.root.join(&self.build.output_dir)
    }

    /// Directory of the configured theme.
    pub fn theme_dir(&self) -> PathBuf {
        self.root.join("themes").join(&self.build.theme)
    }
}

// --- Default value providers ---

fn default_language() -> String { "en".to_string() }
fn default_md_dir() -> PathBuf { PathBuf::from("md") }
fn default_bool_true() -> bool { true }

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(dir: &Path, text: &str) -> PathBuf {
        let path = dir.join("colophon.toml");
        let mut f = fs::File::create(&path).unwrap();
        f.write_all(text.as_bytes()).unwrap();
        path
    }

    const MINIMAL: &str = r#"
[site]
title = "Test Blog"
description = "A test"
author = "Tester"

[build]
output_dir = "public"
theme = "default"
"#;

    #[test]
    fn loads_minimal_config_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path(), MINIMAL);
        let config = Config::load(&path).unwrap();

        assert_eq!(config.site.title, "Test Blog");
        assert_eq!(config.site.language, "en");
        assert_eq!(config.build.md_dir, PathBuf::from("md"));
        assert!(config.build.generate_rss);
        assert_eq!(config.posts_per_page(), None);
        assert_eq!(config.date_format(), "%Y-%m-%d");
        assert_eq!(config.base_path(), "");
        assert_eq!(config.md_dir(), dir.path().join("md"));
        assert_eq!(config.theme_dir(), dir.path().join("themes/default"));
    }

    #[test]
    fn missing_required_section_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path(), "[site]\ntitle = \"x\"\n");
        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, Error::Config(_)), "{err}");
    }

    #[test]
    fn missing_required_field_names_the_field() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            dir.path(),
            "[site]\ntitle = \"x\"\ndescription = \"y\"\nauthor = \"z\"\n[build]\ntheme = \"default\"\n",
        );
        let err = Config::load(&path).unwrap_err();
        assert!(err.to_string().contains("output_dir"), "{err}");
    }

    #[test]
    fn dotted_lookup_reaches_theme_config() {
        let dir = tempfile::tempdir().unwrap();
        let text = format!("{MINIMAL}\n[theme_config]\nposts_per_page = 10\ndate_format = \"%d/%m/%Y\"\n");
        let config = Config::load(&write_config(dir.path(), &text)).unwrap();

        assert_eq!(config.posts_per_page(), Some(10));
        assert_eq!(config.date_format(), "%d/%m/%Y");
        assert_eq!(
            config.lookup("theme_config.posts_per_page").and_then(|v| v.as_integer()),
            Some(10)
        );
        assert!(config.lookup("theme_config.nope").is_none());
        assert!(config.lookup("nope.nope").is_none());
    }

    #[test]
    fn non_positive_page_size_disables_pagination() {
        let dir = tempfile::tempdir().unwrap();
        let text = format!("{MINIMAL}\n[theme_config]\nposts_per_page = 0\n");
        let config = Config::load(&write_config(dir.path(), &text)).unwrap();
        assert_eq!(config.posts_per_page(), None);
    }

    #[test]
    fn base_path_is_normalized() {
        let dir = tempfile::tempdir().unwrap();
        let text = MINIMAL.replace("[build]", "base_path = \"myblog/\"\n[build]");
        let config = Config::load(&write_config(dir.path(), &text)).unwrap();
        assert_eq!(config.base_path(), "/myblog");
    }
}
