//! Content extraction: turns a tree of markdown files into [`Post`]
//! records. Markdown conversion is a value-in/value-out function of the
//! source text, so converting two unrelated documents in sequence can
//! never leak state between them.

use crate::error::{Error, Result};
use crate::frontmatter;
use crate::models::Post;
use crate::urls;
use chrono::{DateTime, Local, NaiveDateTime};
use pulldown_cmark::{html, CodeBlockKind, CowStr, Event, Options, Parser, Tag, TagEnd};
use rayon::prelude::*;
use regex::{Captures, Regex};
use serde_yaml::Value;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use syntect::highlighting::{Theme, ThemeSet};
use syntect::html::highlighted_html_for_string;
use syntect::parsing::SyntaxSet;
use walkdir::WalkDir;

const MARKDOWN_EXTENSION: &str = "md";

static IMG_SRC: OnceLock<Regex> = OnceLock::new();

fn img_src_regex() -> &'static Regex {
    IMG_SRC.get_or_init(|| Regex::new(r#"(?i)(<img[^>]*?src=")([^"]+)(")"#).unwrap())
}

/// Parses markdown posts from a content root.
///
/// Holds the immutable conversion inputs (syntax definitions, highlight
/// theme, normalized base path); every conversion is a pure function over
/// them.
pub struct MarkdownProcessor {
    md_dir: PathBuf,
    base_path: String,
    syntax_set: SyntaxSet,
    syntax_theme: Theme,
}

impl MarkdownProcessor {
    /// `base_path` may be raw; it is normalized here. `syntax_theme` falls
    /// back to the default highlight theme when the name is unknown.
    pub fn new(md_dir: impl Into<PathBuf>, base_path: &str, syntax_theme: &str) -> MarkdownProcessor {
        let md_dir = md_dir.into();
        let md_dir = fs::canonicalize(&md_dir).unwrap_or(md_dir);
        let theme_set = ThemeSet::load_defaults();
        let syntax_theme = theme_set
            .themes
            .get(syntax_theme)
            .unwrap_or_else(|| &theme_set.themes["base16-ocean.dark"])
            .clone();

        MarkdownProcessor {
            md_dir,
            base_path: urls::normalize_base_path(base_path),
            syntax_set: SyntaxSet::load_defaults_newlines(),
            syntax_theme,
        }
    }

    /// Loads every `.md` file under the content root.
    ///
    /// Per-file failures are reported on stderr with the offending path and
    /// skipped; the rest of the scan continues. The result is sorted by
    /// date descending (stable, so equal dates keep discovery order) with
    /// colliding slugs de-duplicated by numeric suffix.
    pub fn load_posts(&self) -> Vec<Post> {
        if !self.md_dir.exists() {
            return Vec::new();
        }

        let files: Vec<PathBuf> = WalkDir::new(&self.md_dir)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| e.path().extension().is_some_and(|ext| ext == MARKDOWN_EXTENSION))
            .map(|e| e.into_path())
            .collect();

        let results: Vec<Result<Post>> = files.par_iter().map(|p| self.parse_post(p)).collect();

        let mut posts = Vec::new();
        for result in results {
            match result {
                Ok(post) => posts.push(post),
                Err(e) => eprintln!("warning: skipping post: {e}"),
            }
        }

        posts.sort_by(|a, b| b.date.cmp(&a.date));
        dedupe_slugs(&mut posts);
        posts
    }

    /// Parses a single post file. A missing `title` or an unparseable
    /// date/front-matter block fails this file only.
    pub fn parse_post(&self, path: &Path) -> Result<Post> {
        // canonical form keeps relative-path computation and the collected
        // image paths consistent with the canonicalized content root
        let path = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        let path = path.as_path();

        let raw = fs::read_to_string(path)
            .map_err(|e| Error::content(path, format!("cannot read file: {e}")))?;
        let (metadata, body) =
            frontmatter::split(&raw).map_err(|reason| Error::content(path, reason))?;

        let title = metadata
            .get("title")
            .and_then(frontmatter::scalar_to_string)
            .ok_or_else(|| Error::content(path, "missing required front-matter field: title"))?;

        let date = match metadata.get("date") {
            Some(value) => {
                frontmatter::parse_date(value).map_err(|reason| Error::content(path, reason))?
            }
            None => file_mtime(path)?,
        };

        let scalar = |key: &str| {
            metadata
                .get(key)
                .and_then(frontmatter::scalar_to_string)
                .unwrap_or_default()
        };
        let author = scalar("author");
        let description = scalar("description");
        let password = scalar("password");
        let encrypted = matches!(metadata.get("encrypted"), Some(Value::Bool(true)));

        let relative_path = self.relative_path(path);
        let converted = self.render_markdown(&body);
        let (html, images) = self.extract_images(&converted, path, &relative_path);

        Ok(Post {
            filepath: path.to_path_buf(),
            slug: frontmatter::make_slug(&title, date),
            relative_path,
            title,
            date,
            author,
            description,
            tags: frontmatter::tags(metadata.get("tags")),
            content: body,
            html,
            images,
            encrypted,
            password,
            metadata,
        })
    }

    /// Converts one markdown body to HTML: tables, footnotes, strikethrough
    /// and task lists enabled, fenced code highlighted through syntect,
    /// headings given slugified `id` attributes.
    pub fn render_markdown(&self, md: &str) -> String {
        let parser = Parser::new_ext(md, Options::all());

        let mut events = Vec::new();
        let mut code_buf = String::new();
        let mut code_lang = String::new();
        let mut in_code_block = false;
        let mut heading = None;

        for event in parser {
            match event {
                Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(label))) => {
                    in_code_block = true;
                    code_lang = label.to_string();
                    code_buf.clear();
                }
                Event::End(TagEnd::CodeBlock) if in_code_block => {
                    in_code_block = false;
                    let syntax = self
                        .syntax_set
                        .find_syntax_by_token(&code_lang)
                        .unwrap_or_else(|| self.syntax_set.find_syntax_plain_text());

                    let highlighted = highlighted_html_for_string(
                        &code_buf,
                        &self.syntax_set,
                        syntax,
                        &self.syntax_theme,
                    )
                    .unwrap_or_else(|_| format!("<pre><code>{code_buf}</code></pre>"));

                    push(&mut events, &mut heading, Event::Html(highlighted.into()));
                }
                Event::Start(tag @ Tag::Heading { id: None, .. }) => {
                    heading = Some((tag, Vec::new()));
                }
                Event::End(TagEnd::Heading(level)) if heading.is_some() => {
                    let (tag, buffered) = heading.take().unwrap();
                    events.push(Event::Start(with_heading_id(tag, &buffered)));
                    events.extend(buffered);
                    events.push(Event::End(TagEnd::Heading(level)));
                }
                Event::Text(text) if in_code_block => code_buf.push_str(&text),
                other if !in_code_block => push(&mut events, &mut heading, other),
                _ => {}
            }
        }

        let mut html_output = String::new();
        html::push_html(&mut html_output, events.into_iter());
        html_output
    }

    /// Collects local image references from converted HTML and rewrites
    /// each `src` to its location in the output tree. External references
    /// (`http(s)`, protocol-relative, `data:`, site-absolute) pass through.
    fn extract_images(&self, html: &str, source: &Path, relative_path: &str) -> (String, Vec<PathBuf>) {
        let source_dir = source.parent().unwrap_or(Path::new(""));
        let rel_parent = relative_path.rsplit_once('/').map_or("", |(parent, _)| parent);

        let mut images = Vec::new();
        let rewritten = img_src_regex()
            .replace_all(html, |caps: &Captures| {
                let src = &caps[2];
                if is_external(src) {
                    return caps[0].to_string();
                }

                let cleaned = src.trim_start_matches("./");
                images.push(source_dir.join(cleaned));

                let target = if rel_parent.is_empty() {
                    format!("{}/assets/images/{cleaned}", self.base_path)
                } else {
                    format!("{}/assets/images/{rel_parent}/{cleaned}", self.base_path)
                };
                format!("{}{target}{}", &caps[1], &caps[3])
            })
            .into_owned();

        (rewritten, images)
    }

    /// Source path relative to the content root, `/`-separated, extension
    /// stripped. A file outside the root degrades to its stem.
    fn relative_path(&self, path: &Path) -> String {
        match path.strip_prefix(&self.md_dir) {
            Ok(rel) => rel
                .with_extension("")
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/"),
            Err(_) => path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default(),
        }
    }
}

/// Extracts the plain text of a markdown body, for snippets and search.
pub fn strip_markdown(md: &str) -> String {
    let parser = Parser::new(md);
    let mut plain_text = String::new();

    for event in parser {
        match event {
            Event::Text(text) | Event::Code(text) => {
                plain_text.push_str(&text);
                plain_text.push(' ');
            }
            _ => {}
        }
    }
    plain_text.trim().to_string()
}

fn push<'a>(events: &mut Vec<Event<'a>>, heading: &mut Option<(Tag<'a>, Vec<Event<'a>>)>, event: Event<'a>) {
    match heading {
        Some((_, buffered)) => buffered.push(event),
        None => events.push(event),
    }
}

fn with_heading_id<'a>(tag: Tag<'a>, buffered: &[Event<'a>]) -> Tag<'a> {
    let Tag::Heading { level, classes, attrs, .. } = tag else {
        return tag;
    };

    let mut text = String::new();
    for event in buffered {
        if let Event::Text(t) | Event::Code(t) = event {
            text.push_str(t);
        }
    }

    let slug = frontmatter::slugify(&text);
    let id = (!slug.is_empty()).then(|| CowStr::from(slug));
    Tag::Heading { level, id, classes, attrs }
}

fn is_external(src: &str) -> bool {
    src.starts_with("http://")
        || src.starts_with("https://")
        || src.starts_with("//")
        || src.starts_with('/')
        || src.starts_with("data:")
        || src.starts_with("mailto:")
}

fn file_mtime(path: &Path) -> Result<NaiveDateTime> {
    let modified = fs::metadata(path)
        .and_then(|m| m.modified())
        .map_err(|e| Error::content(path, format!("cannot stat file: {e}")))?;
    Ok(DateTime::<Local>::from(modified).naive_local())
}

/// Same-day same-title posts collide; later occurrences (in sorted order)
/// get `-2`, `-3`, ... suffixes so slugs stay unique and deterministic.
fn dedupe_slugs(posts: &mut [Post]) {
    let mut seen: HashMap<String, usize> = HashMap::new();
    for post in posts {
        let n = seen.entry(post.slug.clone()).or_insert(0);
        *n += 1;
        if *n > 1 {
            post.slug = format!("{}-{n}", post.slug);
        }
    }
}
