use crate::config::Config;
use crate::models::Post;
use crate::parser::strip_markdown;
use crate::urls;
use chrono::{NaiveDateTime, TimeZone, Utc};
use rss::extension::atom::{AtomExtension, Link};
use rss::{ChannelBuilder, GuidBuilder, ItemBuilder};

/// Newest posts included in the feed.
const FEED_SIZE: usize = 15;

fn format_rss_date(date: NaiveDateTime) -> String {
    Utc.from_utc_datetime(&date).to_rfc2822()
}

fn item_description(post: &Post) -> String {
    if post.description.is_empty() {
        strip_markdown(&post.content).chars().take(500).collect()
    } else {
        post.description.clone()
    }
}

/// Builds the RSS 2.0 document. Every link carries the site origin and the
/// normalized base path; `posts` is expected in date-descending order.
pub fn generate_rss(posts: &[Post], config: &Config) -> String {
    let origin = config.site_origin();
    let base = config.base_path();
    let site_link = format!("{origin}{base}/");

    let items: Vec<_> = posts
        .iter()
        .take(FEED_SIZE)
        .map(|p| {
            let link = format!(
                "{origin}{}",
                urls::join(&base, &format!("/posts/{}.html", p.relative_path))
            );
            ItemBuilder::default()
                .title(Some(p.title.clone()))
                .link(Some(link.clone()))
                .guid(Some(GuidBuilder::default().value(link).permalink(true).build()))
                .description(Some(item_description(p)))
                .author((!p.author.is_empty()).then(|| p.author.clone()))
                .pub_date(Some(format_rss_date(p.date)))
                .build()
        })
        .collect();

    let mut self_link = Link::default();
    self_link.set_href(format!("{origin}{base}/rss.xml"));
    self_link.set_rel("self".to_string());
    self_link.set_mime_type(Some("application/rss+xml".to_string()));
    let mut atom_ext = AtomExtension::default();
    atom_ext.set_links(vec![self_link]);

    ChannelBuilder::default()
        .title(config.site.title.clone())
        .link(site_link)
        .description(config.site.description.clone())
        .language(Some(config.site.language.clone()))
        .atom_ext(Some(atom_ext))
        .items(items)
        .build()
        .to_string()
}
