//! Theme loading and validation.
//!
//! A theme is a directory holding `theme.json` metadata, a `templates/`
//! tree, and optionally a `static/` tree copied verbatim into the output.
//! A configured theme that cannot be found is a hard error; there is no
//! silent fallback to a default.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Templates every theme must provide, by logical name.
const REQUIRED_TEMPLATES: [&str; 3] = ["base", "index", "post"];

/// Contents of `theme.json`. Everything but `name` is optional; a missing
/// file altogether is synthesized from the directory name.
#[derive(Debug, Clone, Deserialize)]
pub struct ThemeMeta {
    pub name: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Logical template name to file name overrides.
    #[serde(default)]
    pub templates: HashMap<String, String>,
}

fn default_version() -> String {
    "1.0.0".to_string()
}

#[derive(Debug)]
pub struct Theme {
    templates_dir: PathBuf,
    static_dir: Option<PathBuf>,
    pub meta: ThemeMeta,
}

impl Theme {
    /// Loads and validates a theme directory.
    pub fn load(dir: &Path) -> Result<Theme> {
        let root = fs::canonicalize(dir).map_err(|_| {
            Error::Theme(format!("theme directory not found: {}", dir.display()))
        })?;

        let meta_path = root.join("theme.json");
        let meta = if meta_path.exists() {
            let text = fs::read_to_string(&meta_path)
                .map_err(|e| Error::Theme(format!("cannot read {}: {e}", meta_path.display())))?;
            serde_json::from_str(&text)
                .map_err(|e| Error::Theme(format!("invalid {}: {e}", meta_path.display())))?
        } else {
            ThemeMeta {
                name: root
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "theme".to_string()),
                version: default_version(),
                author: None,
                description: None,
                templates: HashMap::new(),
            }
        };

        let templates_dir = root.join("templates");
        if !templates_dir.is_dir() {
            return Err(Error::Theme(format!(
                "theme '{}' has no templates directory at {}",
                meta.name,
                templates_dir.display()
            )));
        }

        let static_dir = root.join("static");
        let static_dir = if static_dir.exists() {
            if !static_dir.is_dir() {
                return Err(Error::Theme(format!(
                    "theme '{}': static path is not a directory: {}",
                    meta.name,
                    static_dir.display()
                )));
            }
            Some(static_dir)
        } else {
            None
        };

        let theme = Theme { templates_dir, static_dir, meta };

        for logical in REQUIRED_TEMPLATES {
            theme.resolve_template(logical).map_err(|_| {
                Error::Theme(format!(
                    "theme '{}' is missing the required template '{}' ({})",
                    theme.meta.name,
                    logical,
                    theme.template_file(logical)
                ))
            })?;
        }

        Ok(theme)
    }

    /// File name a logical view resolves to: the `templates` mapping entry
    /// if one exists, `<name>.html` otherwise.
    pub fn template_file(&self, logical: &str) -> String {
        self.meta
            .templates
            .get(logical)
            .cloned()
            .unwrap_or_else(|| format!("{logical}.html"))
    }

    /// Absolute path of a logical template; errors if the file is absent.
    pub fn resolve_template(&self, logical: &str) -> Result<PathBuf> {
        let path = self.templates_dir.join(self.template_file(logical));
        if path.is_file() {
            Ok(path)
        } else {
            Err(Error::Theme(format!(
                "template '{}' not found at {}",
                logical,
                path.display()
            )))
        }
    }

    /// Whether a logical view has a template file on disk.
    pub fn has_template(&self, logical: &str) -> bool {
        self.resolve_template(logical).is_ok()
    }

    /// Absolute templates root.
    pub fn templates_dir(&self) -> &Path {
        &self.templates_dir
    }

    /// Absolute static-assets root, if the theme ships one.
    pub fn static_dir(&self) -> Option<&Path> {
        self.static_dir.as_deref()
    }

    pub fn name(&self) -> &str {
        &self.meta.name
    }

    pub fn version(&self) -> &str {
        &self.meta.version
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scaffold(dir: &Path, with_meta: bool) {
        fs::create_dir_all(dir.join("templates")).unwrap();
        if with_meta {
            fs::write(
                dir.join("theme.json"),
                r#"{"name": "plain", "version": "2.1.0", "templates": {"post": "article.html"}}"#,
            )
            .unwrap();
        }
        fs::write(dir.join("templates/base.html"), "<html></html>").unwrap();
        fs::write(dir.join("templates/index.html"), "{% extends \"base.html\" %}").unwrap();
        let post_file = if with_meta { "article.html" } else { "post.html" };
        fs::write(
            dir.join("templates").join(post_file),
            "{% extends \"base.html\" %}",
        )
        .unwrap();
    }

    #[test]
    fn loads_theme_with_metadata_and_mapping() {
        let dir = tempfile::tempdir().unwrap();
        scaffold(dir.path(), true);

        let theme = Theme::load(dir.path()).unwrap();
        assert_eq!(theme.name(), "plain");
        assert_eq!(theme.version(), "2.1.0");
        assert_eq!(theme.template_file("post"), "article.html");
        assert_eq!(theme.template_file("index"), "index.html");
        assert!(theme.templates_dir().is_absolute());
    }

    #[test]
    fn missing_theme_json_derives_defaults_from_dirname() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("minimal");
        scaffold(&root, false);

        let theme = Theme::load(&root).unwrap();
        assert_eq!(theme.name(), "minimal");
        assert_eq!(theme.version(), "1.0.0");
    }

    #[test]
    fn missing_directory_is_a_theme_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Theme::load(&dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, Error::Theme(_)), "{err}");
        assert!(err.to_string().contains("not found"), "{err}");
    }

    #[test]
    fn invalid_theme_json_is_a_hard_error() {
        let dir = tempfile::tempdir().unwrap();
        scaffold(dir.path(), false);
        fs::write(dir.path().join("theme.json"), "{not json").unwrap();

        let err = Theme::load(dir.path()).unwrap_err();
        assert!(err.to_string().contains("invalid"), "{err}");
    }

    #[test]
    fn missing_required_template_fails_load() {
        let dir = tempfile::tempdir().unwrap();
        scaffold(dir.path(), false);
        fs::remove_file(dir.path().join("templates/post.html")).unwrap();

        let err = Theme::load(dir.path()).unwrap_err();
        assert!(err.to_string().contains("post"), "{err}");
    }

    #[test]
    fn static_path_must_be_a_directory() {
        let dir = tempfile::tempdir().unwrap();
        scaffold(dir.path(), false);
        fs::write(dir.path().join("static"), "not a dir").unwrap();

        let err = Theme::load(dir.path()).unwrap_err();
        assert!(err.to_string().contains("static"), "{err}");
    }

    #[test]
    fn optional_views_report_presence() {
        let dir = tempfile::tempdir().unwrap();
        scaffold(dir.path(), false);

        let theme = Theme::load(dir.path()).unwrap();
        assert!(theme.has_template("index"));
        assert!(!theme.has_template("archive"));
    }
}
