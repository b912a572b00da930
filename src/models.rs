use chrono::NaiveDateTime;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// One parsed article. Created once during extraction, immutable afterward;
/// the full set is sorted by descending `date` before rendering sees it.
#[derive(Debug, Clone, Serialize)]
pub struct Post {
    /// Source file location.
    pub filepath: PathBuf,
    /// Path relative to the content root, `/`-separated, extension stripped.
    /// Doubles as the URL path segment and the image output subpath.
    pub relative_path: String,
    /// `<YYYY-MM-DD>-<cleaned-title>`, de-duplicated across the post set.
    pub slug: String,
    pub title: String,
    pub date: NaiveDateTime,
    pub author: String,
    pub description: String,
    pub tags: Vec<String>,
    /// Raw markdown body.
    pub content: String,
    /// Converted body, local image references rewritten to the output tree.
    pub html: String,
    /// Absolute source paths of every locally-referenced image in the body.
    pub images: Vec<PathBuf>,
    pub encrypted: bool,
    #[serde(skip_serializing)]
    pub password: String,
    /// The full original front-matter mapping, for themes that want
    /// non-standard fields.
    pub metadata: BTreeMap<String, serde_yaml::Value>,
}

/// Derived per `render_index` call; absent when no page size is configured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Pagination {
    /// 1-indexed current page.
    pub page: usize,
    pub total_pages: usize,
    pub total_posts: usize,
    pub has_prev: bool,
    pub has_next: bool,
    pub prev_page: Option<usize>,
    pub next_page: Option<usize>,
}

impl Pagination {
    pub fn paginate(total_posts: usize, posts_per_page: usize, page: usize) -> Pagination {
        let total_pages = total_posts.div_ceil(posts_per_page);
        Pagination {
            page,
            total_pages,
            total_posts,
            has_prev: page > 1,
            has_next: page < total_pages,
            prev_page: (page > 1).then(|| page - 1),
            next_page: (page < total_pages).then(|| page + 1),
        }
    }

    /// The half-open index range this page covers, clamped to the post count.
    pub fn bounds(&self, posts_per_page: usize) -> (usize, usize) {
        let start = (self.page - 1)
            .saturating_mul(posts_per_page)
            .min(self.total_posts);
        let end = (start + posts_per_page).min(self.total_posts);
        (start, end)
    }
}

/// The client-side search document written to `search-index.json`.
#[derive(Debug, Serialize)]
pub struct SearchIndex {
    pub posts: Vec<SearchEntry>,
    /// RFC-3339 UTC timestamp of the generation run.
    pub generated_at: String,
    pub total_posts: usize,
}

#[derive(Debug, Serialize)]
pub struct SearchEntry {
    pub title: String,
    /// `<base_path>/posts/<relative_path>.html`
    pub url: String,
    /// ISO-8601, seconds precision.
    pub date: String,
    pub tags: Vec<String>,
    pub description: String,
    pub relative_path: String,
}
