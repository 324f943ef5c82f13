/**
 * RSS Feed
 */
use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};

use crate::config::SiteConfig;
use crate::db::models::Post;
use crate::db::posts;
use crate::error::ApiResult;
use crate::routes::public_cache;
use crate::AppState;

const FEED_SIZE: i64 = 50;

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

fn rfc822(dt: &DateTime<Utc>) -> String {
    dt.format("%a, %d %b %Y %H:%M:%S +0000").to_string()
}

fn published_date(post: &Post) -> DateTime<Utc> {
    post.published_at.unwrap_or(post.created_at)
}

/// RSS 2.0 document for `posts`, newest first as given.
pub fn render_feed(config: &SiteConfig, posts: &[Post]) -> String {
    let mut items = String::new();
    for post in posts {
        let post_url = format!("{}/posts/{}", config.site_url, post.slug);
        let description = post.excerpt.as_deref().unwrap_or("");
        items.push_str(&format!(
            "    <item>\n\
             \x20     <title>{}</title>\n\
             \x20     <link>{}</link>\n\
             \x20     <description>{}</description>\n\
             \x20     <pubDate>{}</pubDate>\n\
             \x20     <guid isPermaLink=\"true\">{}</guid>\n",
            escape_xml(&post.title),
            escape_xml(&post_url),
            escape_xml(description),
            rfc822(&published_date(post)),
            escape_xml(&post_url),
        ));
        if let Some(category) = post.category.as_deref().filter(|c| !c.is_empty()) {
            items.push_str(&format!("      <category>{}</category>\n", escape_xml(category)));
        }
        items.push_str("    </item>\n");
    }

    let feed_url = format!("{}/rss.xml", config.site_url);
    let posts_url = format!("{}/posts", config.site_url);
    let last_build = posts
        .first()
        .map(|p| format!("    <lastBuildDate>{}</lastBuildDate>\n", rfc822(&published_date(p))))
        .unwrap_or_default();

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:atom="http://www.w3.org/2005/Atom">
  <channel>
    <title>{}</title>
    <link>{}</link>
    <description>{}</description>
    <language>en-us</language>
    <atom:link href="{}" rel="self" type="application/rss+xml"/>
{}{}  </channel>
</rss>"#,
        escape_xml(&config.site_title),
        escape_xml(&posts_url),
        escape_xml(&config.site_description),
        escape_xml(&feed_url),
        last_build,
        items,
    )
}

fn feed_response(config: &SiteConfig, posts: &[Post]) -> Response {
    (
        public_cache(config.public_cache_secs),
        [(header::CONTENT_TYPE, "application/rss+xml; charset=utf-8")],
        render_feed(config, posts),
    )
        .into_response()
}

/// GET /rss.xml
pub async fn rss_feed(State(state): State<AppState>) -> ApiResult<Response> {
    let pool = state.pool()?;
    let posts = posts::recent_published(pool, FEED_SIZE).await?;
    Ok(feed_response(&state.config, &posts))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use uuid::Uuid;

    fn post(title: &str, slug: &str, published_at: Option<DateTime<Utc>>) -> Post {
        let created = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        Post {
            id: Uuid::new_v4(),
            title: title.to_string(),
            slug: slug.to_string(),
            excerpt: Some("A & B".to_string()),
            content: "Body".to_string(),
            image_url: None,
            category: Some("notes".to_string()),
            tags: vec![],
            status: "published".to_string(),
            featured: false,
            background_color: "#000000".to_string(),
            opacity: 100,
            sort_order: None,
            created_at: created,
            updated_at: created,
            published_at,
        }
    }

    fn config() -> SiteConfig {
        let mut config = crate::test_state().config.as_ref().clone();
        config.site_url = "https://example.com".to_string();
        config.site_title = "Ada's <Blog>".to_string();
        config
    }

    #[test]
    fn test_escape_xml() {
        assert_eq!(escape_xml("a & b"), "a &amp; b");
        assert_eq!(escape_xml("<title>"), "&lt;title&gt;");
        assert_eq!(escape_xml("\"quote\""), "&quot;quote&quot;");
    }

    #[test]
    fn test_rfc822_format() {
        let dt = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();
        assert_eq!(rfc822(&dt), "Mon, 15 Jan 2024 12:00:00 +0000");
    }

    #[test]
    fn test_render_feed_items() {
        let published = Utc.with_ymd_and_hms(2024, 3, 2, 9, 30, 0).unwrap();
        let xml = render_feed(&config(), &[post("First", "first", Some(published))]);

        assert!(xml.contains("<title>Ada&apos;s &lt;Blog&gt;</title>"));
        assert!(xml.contains("<link>https://example.com/posts/first</link>"));
        assert!(xml.contains("<description>A &amp; B</description>"));
        assert!(xml.contains("<pubDate>Sat, 02 Mar 2024 09:30:00 +0000</pubDate>"));
        assert!(xml.contains("<category>notes</category>"));
        assert!(xml.contains("<lastBuildDate>Sat, 02 Mar 2024 09:30:00 +0000</lastBuildDate>"));
    }

    #[test]
    fn test_render_feed_falls_back_to_created_at() {
        let xml = render_feed(&config(), &[post("Old", "old", None)]);
        assert!(xml.contains("<pubDate>Mon, 01 Jan 2024 00:00:00 +0000</pubDate>"));
    }

    #[test]
    fn test_feed_uses_public_cache_window() {
        let mut config = config();
        config.public_cache_secs = 120;
        let res = feed_response(&config, &[]);
        assert_eq!(
            res.headers().get(header::CACHE_CONTROL).unwrap(),
            "public, max-age=120, stale-while-revalidate=1200"
        );
        assert_eq!(
            res.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/rss+xml; charset=utf-8"
        );
    }

    #[test]
    fn test_empty_feed_has_no_items() {
        let xml = render_feed(&config(), &[]);
        assert!(!xml.contains("<item>"));
        assert!(!xml.contains("lastBuildDate"));
        assert!(xml.ends_with("</rss>"));
    }
}
