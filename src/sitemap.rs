use crate::config::Config;
use crate::models::Post;

/// Builds `sitemap.xml`: home, archive, tags index, every post page, and
/// every tag page, each prefixed with the site origin and normalized base
/// path. Post entries carry their date as `<lastmod>`.
pub fn generate_sitemap(posts: &[Post], tags: &[String], config: &Config) -> String {
    let prefix = format!("{}{}", config.site_origin(), config.base_path());

    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n",
    );

    push_url(&mut xml, &format!("{prefix}/"), None);
    push_url(&mut xml, &format!("{prefix}/archive.html"), None);
    push_url(&mut xml, &format!("{prefix}/tags/"), None);

    for post in posts {
        push_url(
            &mut xml,
            &format!("{prefix}/posts/{}.html", post.relative_path),
            Some(post.date.format("%Y-%m-%d").to_string()),
        );
    }

    for tag in tags {
        push_url(&mut xml, &format!("{prefix}/tags/{tag}.html"), None);
    }

    xml.push_str("</urlset>\n");
    xml
}

fn push_url(xml: &mut String, loc: &str, lastmod: Option<String>) {
    xml.push_str("  <url>\n");
    xml.push_str(&format!("    <loc>{}</loc>\n", escape(loc)));
    if let Some(lastmod) = lastmod {
        xml.push_str(&format!("    <lastmod>{lastmod}</lastmod>\n"));
    }
    xml.push_str("  </url>\n");
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
