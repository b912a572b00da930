//! The core build engine for `colophon`.
//!
//! This module orchestrates the entire generation pass: per-post pages and
//! image copy-through (in parallel via Rayon), paginated index pages, the
//! archive and tag views, theme static assets, and the auxiliary artifacts
//! (search index, RSS feed, sitemap). A fixed post set in, a complete site
//! tree out, deterministically.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::models::{Post, SearchEntry, SearchIndex};
use crate::parser::strip_markdown;
use crate::render::{self, Renderer};
use crate::rss;
use crate::sitemap;
use crate::theme::Theme;
use crate::urls;
use chrono::Utc;
use rayon::prelude::*;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// One whole site build over an immutable post set.
///
/// Failure policy: a render or write failure aborts the build with the
/// offending post named. Output already written stays on disk.
pub struct Generator<'a> {
    config: &'a Config,
    theme: &'a Theme,
    renderer: &'a Renderer,
    posts: &'a [Post],
}

impl<'a> Generator<'a> {
    pub fn new(
        config: &'a Config,
        theme: &'a Theme,
        renderer: &'a Renderer,
        posts: &'a [Post],
    ) -> Generator<'a> {
        Generator { config, theme, renderer, posts }
    }

    /// Runs the full build into the configured output directory. The
    /// directory is created if absent and never wiped; colliding artifact
    /// names are overwritten.
    pub fn generate(&self) -> Result<()> {
        let output = self.config.output_dir();
        fs::create_dir_all(&output)
            .map_err(|e| Error::Generation(format!("cannot create {}: {e}", output.display())))?;

        // list views and artifacts see encrypted bodies blanked; only the
        // post page itself embeds the (sealed) body
        let listed = redact_encrypted(self.posts);

        self.generate_posts(&output)?;
        self.generate_index_pages(&output, &listed)?;
        self.generate_archive(&output, &listed)?;
        self.generate_tag_pages(&output, &listed)?;
        self.copy_static_assets(&output)?;
        self.generate_search_index(&output, &listed)?;

        if self.config.build.generate_rss {
            write_file(&output.join("rss.xml"), rss::generate_rss(&listed, self.config))?;
        }
        if self.config.build.generate_sitemap {
            let tags: Vec<String> = render::collect_tags(&listed).into_keys().collect();
            write_file(
                &output.join("sitemap.xml"),
                sitemap::generate_sitemap(&listed, &tags, self.config),
            )?;
        }

        Ok(())
    }

    /// Renders every post page and copies its referenced images, mirroring
    /// the `relative_path` structure under `posts/` and `assets/images/`.
    fn generate_posts(&self, output: &Path) -> Result<()> {
        let md_root = self.canonical_md_root();

        let results: Vec<Result<()>> = self
            .posts
            .par_iter()
            .map(|post| self.generate_post(output, &md_root, post))
            .collect();
        results.into_iter().collect::<Result<Vec<_>>>()?;
        Ok(())
    }

    fn generate_post(&self, output: &Path, md_root: &Path, post: &Post) -> Result<()> {
        let html = self.renderer.render_post(post).map_err(|e| match e {
            Error::Render(msg) => {
                Error::Render(format!("{}: {msg}", post.filepath.display()))
            }
            other => other,
        })?;

        let dest = output.join("posts").join(format!("{}.html", post.relative_path));
        write_file(&dest, html)?;

        for image in &post.images {
            let rel = image
                .strip_prefix(md_root)
                .map(Path::to_path_buf)
                .unwrap_or_else(|_| image_fallback_path(post, image));
            let image_dest = output.join("assets/images").join(rel);

            if let Some(parent) = image_dest.parent() {
                fs::create_dir_all(parent).map_err(|e| {
                    Error::Generation(format!("cannot create {}: {e}", parent.display()))
                })?;
            }
            fs::copy(image, &image_dest).map_err(|e| {
                Error::Generation(format!(
                    "cannot copy image {} referenced by {}: {e}",
                    image.display(),
                    post.filepath.display()
                ))
            })?;
        }

        Ok(())
    }

    /// Page 1 lands at the site root; later pages at `page/<n>.html`. No
    /// configured page size means one unpaginated index.
    fn generate_index_pages(&self, output: &Path, listed: &[Post]) -> Result<()> {
        match self.config.posts_per_page() {
            Some(size) => {
                let total_pages = listed.len().div_ceil(size).max(1);
                for page in 1..=total_pages {
                    let html = self.renderer.render_index(listed, page, Some(size))?;
                    let dest = if page == 1 {
                        output.join("index.html")
                    } else {
                        output.join("page").join(format!("{page}.html"))
                    };
                    write_file(&dest, html)?;
                }
            }
            None => {
                let html = self.renderer.render_index(listed, 1, None)?;
                write_file(&output.join("index.html"), html)?;
            }
        }
        Ok(())
    }

    fn generate_archive(&self, output: &Path, listed: &[Post]) -> Result<()> {
        let html = self.renderer.render_archive(listed)?;
        write_file(&output.join("archive.html"), html)
    }

    fn generate_tag_pages(&self, output: &Path, listed: &[Post]) -> Result<()> {
        let tags_map = render::collect_tags(listed);
        if tags_map.is_empty() {
            return Ok(());
        }

        for (tag, tagged) in &tags_map {
            let html = self.renderer.render_tag_page(tag, tagged)?;
            write_file(&output.join("tags").join(format!("{tag}.html")), html)?;
        }

        let html = self.renderer.render_tags_index(&tags_map)?;
        write_file(&output.join("tags/index.html"), html)
    }

    fn copy_static_assets(&self, output: &Path) -> Result<()> {
        if let Some(static_dir) = self.theme.static_dir() {
            copy_dir_all(static_dir, &output.join("static")).map_err(|e| {
                Error::Generation(format!(
                    "cannot copy theme static assets from {}: {e}",
                    static_dir.display()
                ))
            })?;
        }
        Ok(())
    }

    fn generate_search_index(&self, output: &Path, listed: &[Post]) -> Result<()> {
        let base = self.config.base_path();
        let entries: Vec<SearchEntry> = listed
            .iter()
            .map(|post| SearchEntry {
                title: post.title.clone(),
                url: urls::join(&base, &format!("/posts/{}.html", post.relative_path)),
                date: post.date.format("%Y-%m-%dT%H:%M:%S").to_string(),
                tags: post.tags.clone(),
                description: search_description(post),
                relative_path: post.relative_path.clone(),
            })
            .collect();

        let index = SearchIndex {
            total_posts: entries.len(),
            posts: entries,
            generated_at: Utc::now().to_rfc3339(),
        };

        let json = serde_json::to_string_pretty(&index)
            .map_err(|e| Error::Generation(format!("cannot serialize search index: {e}")))?;
        write_file(&output.join("search-index.json"), json)
    }

    fn canonical_md_root(&self) -> PathBuf {
        let md_dir = self.config.md_dir();
        fs::canonicalize(&md_dir).unwrap_or(md_dir)
    }
}

fn search_description(post: &Post) -> String {
    if post.description.is_empty() {
        strip_markdown(&post.content).chars().take(140).collect()
    } else {
        post.description.clone()
    }
}

/// Copies the post set with encrypted bodies blanked, for every view and
/// artifact that is not the sealed post page itself.
fn redact_encrypted(posts: &[Post]) -> Vec<Post> {
    posts
        .iter()
        .map(|post| {
            let mut post = post.clone();
            if post.encrypted {
                post.html = String::new();
                post.content = String::new();
            }
            post
        })
        .collect()
}

/// Destination for a post image living outside the content root.
fn image_fallback_path(post: &Post, image: &Path) -> PathBuf {
    let file_name = image.file_name().map(PathBuf::from).unwrap_or_default();
    match post.relative_path.rsplit_once('/') {
        Some((parent, _)) => Path::new(parent).join(file_name),
        None => file_name,
    }
}

fn write_file(dest: &Path, contents: String) -> Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| Error::Generation(format!("cannot create {}: {e}", parent.display())))?;
    }
    fs::write(dest, contents)
        .map_err(|e| Error::Generation(format!("cannot write {}: {e}", dest.display())))
}

/// Standard recursive directory copy.
fn copy_dir_all(src: impl AsRef<Path>, dst: impl AsRef<Path>) -> io::Result<()> {
    fs::create_dir_all(&dst)?;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let ty = entry.file_type()?;
        if ty.is_dir() {
            copy_dir_all(entry.path(), dst.as_ref().join(entry.file_name()))?;
        } else {
            fs::copy(entry.path(), dst.as_ref().join(entry.file_name()))?;
        }
    }
    Ok(())
}
