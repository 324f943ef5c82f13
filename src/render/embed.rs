/**
 * Embed URL resolution
 * Maps share links from known providers to their embeddable player URLs
 */
use regex::Regex;
use serde::{Deserialize, Serialize};

lazy_static::lazy_static! {
    static ref YOUTUBE_ID: Regex =
        Regex::new(r"(?:youtube\.com/(?:watch\?(?:[^#\s]*&)?v=|embed/|shorts/|v/)|youtu\.be/)([A-Za-z0-9_-]{11})").unwrap();
    static ref VIMEO_ID: Regex = Regex::new(r"vimeo\.com/(?:video/)?(\d+)").unwrap();
    static ref DRIVE_FILE_ID: Regex = Regex::new(r"/d/([A-Za-z0-9_-]+)").unwrap();
    static ref DRIVE_QUERY_ID: Regex = Regex::new(r"[?&]id=([A-Za-z0-9_-]+)").unwrap();
    static ref DRIVE_EDITOR_SUFFIX: Regex = Regex::new(r"/(?:edit|view)[^/]*$").unwrap();
}

/// Video file extensions a browser can play directly.
pub const DIRECT_VIDEO_EXTENSIONS: &[&str] = &["mp4", "webm", "ogg", "mov"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbedProvider {
    Youtube,
    Vimeo,
    Twitter,
    Codepen,
    Googledrive,
    Iframe,
}

impl EmbedProvider {
    /// Guess the provider from the host portion of a URL.
    pub fn detect(url: &str) -> Self {
        if url.contains("youtube.com") || url.contains("youtu.be") {
            EmbedProvider::Youtube
        } else if url.contains("vimeo.com") {
            EmbedProvider::Vimeo
        } else if url.contains("twitter.com") || url.contains("x.com/") {
            EmbedProvider::Twitter
        } else if url.contains("codepen.io") {
            EmbedProvider::Codepen
        } else if url.contains("drive.google.com") || url.contains("docs.google.com") {
            EmbedProvider::Googledrive
        } else {
            EmbedProvider::Iframe
        }
    }
}

pub fn youtube_id(url: &str) -> Option<&str> {
    YOUTUBE_ID
        .captures(url)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

pub fn youtube_embed_url(url: &str) -> Option<String> {
    youtube_id(url).map(|id| format!("https://www.youtube.com/embed/{}", id))
}

pub fn vimeo_embed_url(url: &str) -> Option<String> {
    VIMEO_ID
        .captures(url)
        .and_then(|c| c.get(1))
        .map(|id| format!("https://player.vimeo.com/video/{}", id.as_str()))
}

/// Google Docs, Sheets and Slides are previewed in place; every other Drive
/// file goes through the generic `/file/d/{id}/preview` player.
pub fn google_drive_embed_url(url: &str) -> Option<String> {
    let file_id = DRIVE_FILE_ID
        .captures(url)
        .or_else(|| DRIVE_QUERY_ID.captures(url))
        .and_then(|c| c.get(1))?
        .as_str();

    if is_google_editor_document(url) {
        if DRIVE_EDITOR_SUFFIX.is_match(url) {
            return Some(DRIVE_EDITOR_SUFFIX.replace(url, "/preview").into_owned());
        }
        if url.ends_with("/preview") {
            return Some(url.to_string());
        }
        return Some(format!("{}/preview", url.trim_end_matches('/')));
    }

    Some(format!("https://drive.google.com/file/d/{}/preview", file_id))
}

pub fn is_google_editor_document(url: &str) -> bool {
    url.contains("/document/") || url.contains("/spreadsheets/") || url.contains("/presentation/")
}

pub fn is_direct_video(url: &str) -> bool {
    let path = url.split(['?', '#']).next().unwrap_or("");
    path.rsplit_once('.')
        .map(|(_, ext)| DIRECT_VIDEO_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Resolve the player URL for an embed block. Unrecognized shapes fall back
/// to the URL as given.
pub fn resolve_embed_url(url: &str, provider: Option<EmbedProvider>) -> String {
    let provider = provider.unwrap_or_else(|| EmbedProvider::detect(url));
    let resolved = match provider {
        EmbedProvider::Youtube => youtube_embed_url(url),
        EmbedProvider::Vimeo => vimeo_embed_url(url),
        EmbedProvider::Codepen => Some(url.replace("/pen/", "/embed/")),
        EmbedProvider::Googledrive => google_drive_embed_url(url),
        EmbedProvider::Twitter | EmbedProvider::Iframe => None,
    };
    resolved.unwrap_or_else(|| url.to_string())
}
