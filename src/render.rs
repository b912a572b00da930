//! Template rendering: binds a [`Theme`] and [`Config`] into a Tera
//! environment and produces the HTML for each view. Missing optional view
//! templates (archive, tag, tags) fall back to the index template; the
//! context always carries `is_archive`/`is_tag_page`/`is_tags_index` flags
//! so a shared template can branch.

use crate::config::Config;
use crate::crypto;
use crate::error::{Error, Result};
use crate::models::{Pagination, Post};
use crate::theme::Theme;
use chrono::{Datelike, Local, NaiveDateTime};
use regex::Regex;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::OnceLock;
use tera::{Context, Tera, Value};

static TAG_STRIP: OnceLock<Regex> = OnceLock::new();

pub struct Renderer {
    tera: Tera,
    base_context: Context,
    index_template: String,
    post_template: String,
    archive_template: Option<String>,
    tag_template: Option<String>,
    tags_template: Option<String>,
}

#[derive(Serialize)]
struct ArchiveYear<'p> {
    year: i32,
    months: Vec<ArchiveMonth<'p>>,
}

#[derive(Serialize)]
struct ArchiveMonth<'p> {
    month: u32,
    posts: Vec<&'p Post>,
}

#[derive(Serialize)]
struct TagStat<'p> {
    name: &'p str,
    count: usize,
    posts: &'p [&'p Post],
}

impl Renderer {
    pub fn new(theme: &Theme, config: &Config) -> Result<Renderer> {
        let glob = format!("{}/**/*.html", theme.templates_dir().display());
        let mut tera = Tera::new(&glob)
            .map_err(|e| Error::Render(format!("failed to load theme templates: {}", describe(e))))?;

        let default_format = config.date_format();
        tera.register_filter(
            "format_date",
            move |value: &Value, args: &HashMap<String, Value>| {
                let raw = value
                    .as_str()
                    .ok_or_else(|| tera::Error::msg("format_date expects a date string"))?;
                let date = parse_context_date(raw)
                    .ok_or_else(|| tera::Error::msg(format!("unrecognized date value: {raw}")))?;
                let format = args
                    .get("format")
                    .and_then(|v| v.as_str())
                    .unwrap_or(&default_format);
                Ok(Value::String(date.format(format).to_string()))
            },
        );

        tera.register_filter(
            "truncate_html",
            |value: &Value, args: &HashMap<String, Value>| {
                let html = value
                    .as_str()
                    .ok_or_else(|| tera::Error::msg("truncate_html expects a string"))?;
                let length = args.get("length").and_then(|v| v.as_u64()).unwrap_or(200) as usize;
                Ok(Value::String(truncate_text(&strip_tags(html), length)))
            },
        );

        let base_path = config.base_path();
        let fn_base_path = base_path.clone();
        tera.register_function("static_url", move |args: &HashMap<String, Value>| {
            let path = args
                .get("path")
                .and_then(|v| v.as_str())
                .ok_or_else(|| tera::Error::msg("static_url requires a `path` argument"))?;
            let path = path.trim_start_matches('/');
            if path.starts_with("static/") {
                Ok(Value::String(format!("{fn_base_path}/{path}")))
            } else {
                Ok(Value::String(format!("{fn_base_path}/static/{path}")))
            }
        });

        let mut base_context = Context::new();
        base_context.insert("site", &config.site);
        base_context.insert("config", config);
        base_context.insert(
            "theme",
            &serde_json::json!({ "name": theme.name(), "version": theme.version() }),
        );
        base_context.insert("current_year", &Local::now().year());
        base_context.insert("base_path", &base_path);
        // defined-but-absent defaults let one template serve several views
        base_context.insert("pagination", &Value::Null);
        base_context.insert("is_archive", &false);
        base_context.insert("is_tag_page", &false);
        base_context.insert("is_tags_index", &false);

        Ok(Renderer {
            tera,
            base_context,
            index_template: theme.template_file("index"),
            post_template: theme.template_file("post"),
            archive_template: theme.has_template("archive").then(|| theme.template_file("archive")),
            tag_template: theme.has_template("tag").then(|| theme.template_file("tag")),
            tags_template: theme.has_template("tags").then(|| theme.template_file("tags")),
        })
    }

    /// Renders one index page. With a positive `posts_per_page` the sorted
    /// list is sliced to the requested 1-indexed page and a pagination
    /// descriptor accompanies it; otherwise the full list renders without
    /// one.
    pub fn render_index(
        &self,
        posts: &[Post],
        page: usize,
        posts_per_page: Option<usize>,
    ) -> Result<String> {
        let mut context = self.base_context.clone();
        match posts_per_page {
            Some(size) if size > 0 => {
                let pagination = Pagination::paginate(posts.len(), size, page);
                let (start, end) = pagination.bounds(size);
                context.insert("posts", &posts[start..end]);
                context.insert("pagination", &pagination);
            }
            _ => context.insert("posts", &posts),
        }
        self.render(&self.index_template, &context)
    }

    /// Renders a post page. For an encrypted post the template receives the
    /// post with its body replaced by the encrypted payload (and the raw
    /// markdown blanked); the plaintext never reaches the output.
    pub fn render_post(&self, post: &Post) -> Result<String> {
        let mut context = self.base_context.clone();
        if post.encrypted {
            let mut sealed = post.clone();
            sealed.html = crypto::encrypt(&post.html, &post.password)?;
            sealed.content = String::new();
            context.insert("post", &sealed);
        } else {
            context.insert("post", post);
        }
        self.render(&self.post_template, &context)
    }

    /// Renders the archive view: posts grouped year → month, newest first.
    pub fn render_archive(&self, posts: &[Post]) -> Result<String> {
        let template = self.archive_template.as_deref().unwrap_or(&self.index_template);
        let mut context = self.base_context.clone();
        context.insert("posts", &posts);
        context.insert("archive", &organize_by_date(posts));
        context.insert("is_archive", &true);
        self.render(template, &context)
    }

    /// Renders the page for a single tag.
    pub fn render_tag_page(&self, tag: &str, posts: &[&Post]) -> Result<String> {
        let template = self.tag_template.as_deref().unwrap_or(&self.index_template);
        let mut context = self.base_context.clone();
        context.insert("tag", tag);
        context.insert("posts", &posts);
        context.insert("is_tag_page", &true);
        self.render(template, &context)
    }

    /// Renders the tag index: every known tag with its post count, sorted
    /// by tag name.
    pub fn render_tags_index(&self, tags_map: &BTreeMap<String, Vec<&Post>>) -> Result<String> {
        let template = self.tags_template.as_deref().unwrap_or(&self.index_template);
        let stats: Vec<TagStat> = tags_map
            .iter()
            .map(|(name, posts)| TagStat { name, count: posts.len(), posts })
            .collect();

        let mut context = self.base_context.clone();
        context.insert("tags", &stats);
        context.insert("posts", &[] as &[&Post]);
        context.insert("is_tags_index", &true);
        self.render(template, &context)
    }

    fn render(&self, template: &str, context: &Context) -> Result<String> {
        self.tera
            .render(template, context)
            .map_err(|e| Error::Render(format!("template '{template}': {}", describe(e))))
    }
}

/// Tag name → posts carrying it, ordered by tag name.
pub fn collect_tags(posts: &[Post]) -> BTreeMap<String, Vec<&Post>> {
    let mut map: BTreeMap<String, Vec<&Post>> = BTreeMap::new();
    for post in posts {
        for tag in &post.tags {
            map.entry(tag.clone()).or_default().push(post);
        }
    }
    map
}

fn organize_by_date(posts: &[Post]) -> Vec<ArchiveYear<'_>> {
    let mut years: BTreeMap<i32, BTreeMap<u32, Vec<&Post>>> = BTreeMap::new();
    for post in posts {
        years
            .entry(post.date.year())
            .or_default()
            .entry(post.date.month())
            .or_default()
            .push(post);
    }

    years
        .into_iter()
        .rev()
        .map(|(year, months)| ArchiveYear {
            year,
            months: months
                .into_iter()
                .rev()
                .map(|(month, posts)| ArchiveMonth { month, posts })
                .collect(),
        })
        .collect()
}

/// Parses the ISO form chrono serializes post dates to.
fn parse_context_date(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S"))
        .ok()
}

pub(crate) fn strip_tags(html: &str) -> String {
    let re = TAG_STRIP.get_or_init(|| Regex::new(r"<[^>]+>").unwrap());
    re.replace_all(html, "").into_owned()
}

/// Truncates plain text to at most `length` characters, cutting back to
/// the last whole word and appending an ellipsis when anything was lost.
pub(crate) fn truncate_text(text: &str, length: usize) -> String {
    if text.chars().count() <= length {
        return text.to_string();
    }

    let clipped: String = text.chars().take(length).collect();
    let cut = match clipped.rfind(' ') {
        Some(idx) => &clipped[..idx],
        None => clipped.as_str(),
    };
    format!("{cut}...")
}

fn describe(e: tera::Error) -> String {
    let mut msg = e.to_string();
    let mut source = std::error::Error::source(&e);
    while let Some(s) = source {
        msg.push_str(": ");
        msg.push_str(&s.to_string());
        source = s.source();
    }
    msg
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontmatter;
    use std::fs;
    use std::path::Path;

    fn write_theme(root: &Path) {
        let templates = root.join("themes/plain/templates");
        fs::create_dir_all(&templates).unwrap();
        fs::write(
            templates.join("base.html"),
            "<html><body>{% block content %}{% endblock content %}</body></html>",
        )
        .unwrap();
        fs::write(
            templates.join("index.html"),
            r#"{% extends "base.html" %}{% block content %}
{% if is_archive %}<h1>Archive</h1>{% endif %}
{% if is_tag_page %}<h1>Tag: {{ tag }}</h1>{% endif %}
{% if is_tags_index %}{% for t in tags %}<li>{{ t.name }} ({{ t.count }})</li>{% endfor %}{% endif %}
{% for post in posts %}<article><a>{{ post.title }}</a><time>{{ post.date | format_date }}</time></article>{% endfor %}
{% if pagination %}<span>Page {{ pagination.page }} / {{ pagination.total_pages }}</span>
{% if pagination.has_prev %}<a class="prev" href="{{ base_path }}/page/{{ pagination.prev_page }}.html">prev</a>{% endif %}
{% if pagination.has_next %}<a class="next" href="{{ base_path }}/page/{{ pagination.next_page }}.html">next</a>{% endif %}
{% endif %}
<link href="{{ static_url(path="css/style.css") }}">
{% endblock content %}"#,
        )
        .unwrap();
        fs::write(
            templates.join("post.html"),
            r#"{% extends "base.html" %}{% block content %}<h1>{{ post.title }}</h1>
<p class="summary">{{ post.html | truncate_html(length=40) }}</p>
<div class="body">{{ post.html | safe }}</div>{% endblock content %}"#,
        )
        .unwrap();
    }

    fn write_config(root: &Path, base_path: &str) -> Config {
        let text = format!(
            r#"
[site]
title = "Render Test"
description = "d"
author = "a"
base_path = "{base_path}"

[build]
output_dir = "public"
theme = "plain"
"#
        );
        let path = root.join("colophon.toml");
        fs::write(&path, text).unwrap();
        Config::load(&path).unwrap()
    }

    fn renderer(root: &Path, base_path: &str) -> Renderer {
        write_theme(root);
        let config = write_config(root, base_path);
        let theme = Theme::load(&config.theme_dir()).unwrap();
        Renderer::new(&theme, &config).unwrap()
    }

    fn post(title: &str, date: &str, tags: &[&str]) -> Post {
        let date = frontmatter::parse_date(&serde_yaml::Value::String(date.to_string())).unwrap();
        Post {
            filepath: format!("{title}.md").into(),
            relative_path: frontmatter::slugify(title),
            slug: frontmatter::make_slug(title, date),
            title: title.to_string(),
            date,
            author: String::new(),
            description: String::new(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            content: format!("body of {title}"),
            html: format!("<p>body of {title}</p>"),
            images: Vec::new(),
            encrypted: false,
            password: String::new(),
            metadata: BTreeMap::new(),
        }
    }

    #[test]
    fn index_paginates_25_posts_into_3_pages() {
        let dir = tempfile::tempdir().unwrap();
        let r = renderer(dir.path(), "");
        let posts: Vec<Post> = (0..25).map(|i| post(&format!("Post {i}"), "2024-01-01", &[])).collect();

        let page1 = r.render_index(&posts, 1, Some(10)).unwrap();
        assert!(page1.contains("Page 1 / 3"), "{page1}");
        assert!(page1.contains(r#"class="next" href="/page/2.html""#), "{page1}");
        assert!(!page1.contains("class=\"prev\""), "{page1}");

        let page3 = r.render_index(&posts, 3, Some(10)).unwrap();
        assert!(page3.contains("Page 3 / 3"), "{page3}");
        assert!(page3.contains(r#"class="prev" href="/page/2.html""#), "{page3}");
        assert!(!page3.contains("class=\"next\""), "{page3}");
        // 5 posts on the last page
        assert_eq!(page3.matches("<article>").count(), 5);
    }

    #[test]
    fn unpaginated_index_lists_everything() {
        let dir = tempfile::tempdir().unwrap();
        let r = renderer(dir.path(), "");
        let posts: Vec<Post> = (0..25).map(|i| post(&format!("Post {i}"), "2024-01-01", &[])).collect();

        let html = r.render_index(&posts, 1, None).unwrap();
        assert_eq!(html.matches("<article>").count(), 25);
        assert!(!html.contains("Page 1"), "{html}");
    }

    #[test]
    fn filters_and_static_url_resolve() {
        let dir = tempfile::tempdir().unwrap();
        let r = renderer(dir.path(), "/myblog");
        let posts = vec![post("Welcome", "2024-01-15", &[])];

        let html = r.render_index(&posts, 1, None).unwrap();
        assert!(html.contains("<time>2024-01-15</time>"), "{html}");
        assert!(html.contains(r#"href="/myblog/static/css/style.css""#), "{html}");
    }

    #[test]
    fn post_page_carries_title_and_body() {
        let dir = tempfile::tempdir().unwrap();
        let r = renderer(dir.path(), "");

        let html = r.render_post(&post("Hello", "2024-01-01", &[])).unwrap();
        assert!(html.contains("<h1>Hello</h1>"), "{html}");
        assert!(html.contains("<p>body of Hello</p>"), "{html}");
    }

    #[test]
    fn encrypted_post_never_leaks_plaintext() {
        let dir = tempfile::tempdir().unwrap();
        let r = renderer(dir.path(), "");

        let mut secret = post("Secret", "2024-01-01", &[]);
        secret.html = "<p>TOP SECRET BODY</p>".to_string();
        secret.encrypted = true;
        secret.password = "pw".to_string();

        let html = r.render_post(&secret).unwrap();
        assert!(!html.contains("TOP SECRET"), "{html}");

        // the body div holds the raw payload; it must decrypt back
        let payload = html
            .split(r#"<div class="body">"#)
            .nth(1)
            .and_then(|rest| rest.split("</div>").next())
            .unwrap();
        assert_eq!(payload.split(':').count(), 3, "{payload}");
        assert_eq!(crypto::decrypt(payload, "pw").unwrap(), "<p>TOP SECRET BODY</p>");
    }

    #[test]
    fn archive_falls_back_to_index_template() {
        let dir = tempfile::tempdir().unwrap();
        let r = renderer(dir.path(), "");
        let posts = vec![
            post("A", "2024-03-01", &[]),
            post("B", "2024-01-01", &[]),
            post("C", "2023-06-01", &[]),
        ];

        let html = r.render_archive(&posts).unwrap();
        assert!(html.contains("<h1>Archive</h1>"), "{html}");
        assert_eq!(html.matches("<article>").count(), 3);
    }

    #[test]
    fn archive_groups_by_year_then_month_newest_first() {
        let posts = vec![
            post("A", "2024-03-01", &[]),
            post("B", "2024-01-01", &[]),
            post("C", "2023-06-01", &[]),
        ];

        let grouped = organize_by_date(&posts);
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped[0].year, 2024);
        assert_eq!(grouped[0].months[0].month, 3);
        assert_eq!(grouped[0].months[1].month, 1);
        assert_eq!(grouped[1].year, 2023);
        assert_eq!(grouped[1].months[0].posts[0].title, "C");
    }

    #[test]
    fn tag_views_render_through_the_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let r = renderer(dir.path(), "");
        let posts = vec![
            post("A", "2024-03-01", &["rust", "web"]),
            post("B", "2024-01-01", &["rust"]),
        ];

        let tags = collect_tags(&posts);
        assert_eq!(tags["rust"].len(), 2);

        let tag_page = r.render_tag_page("rust", &tags["rust"]).unwrap();
        assert!(tag_page.contains("<h1>Tag: rust</h1>"), "{tag_page}");
        assert_eq!(tag_page.matches("<article>").count(), 2);

        let tags_index = r.render_tags_index(&tags).unwrap();
        assert!(tags_index.contains("<li>rust (2)</li>"), "{tags_index}");
        assert!(tags_index.contains("<li>web (1)</li>"), "{tags_index}");
    }

    #[test]
    fn truncation_respects_word_boundaries() {
        assert_eq!(truncate_text("short text", 200), "short text");
        assert_eq!(
            truncate_text("the quick brown fox jumps over the lazy dog", 15),
            "the quick..."
        );
        assert_eq!(truncate_text("averylongunbrokenword", 5), "avery...");
    }

    #[test]
    fn tags_are_stripped_before_truncation() {
        assert_eq!(strip_tags("<p>Hello <b>world</b></p>"), "Hello world");
    }
}
