/*!
 * Text Renderer
 * Converts author text (markdown-like syntax, raw anchors and embed tokens)
 * into HTML ready to inject into a page.
 *
 * The passes run in a fixed order and each one scans the output of the
 * previous pass. Reordering them changes the output: images must be consumed
 * before links, lists before italics, and so on.
 *
 * Input is trusted single-author content. Nothing here sanitizes script or
 * arbitrary markup beyond normalizing anchor attributes.
 */
pub mod embed;

use regex::{Captures, Regex};

lazy_static::lazy_static! {
    static ref MD_IMAGE: Regex = Regex::new(r"!\[([^\]]*?)\]\(([^)]+)\)").unwrap();
    static ref YOUTUBE_TOKEN: Regex = Regex::new(r"\[youtube:([A-Za-z0-9_-]{11})\]").unwrap();
    static ref YOUTUBE_LINK: Regex = Regex::new(
        r"!?\[youtube\]\((https://(?:www\.)?(?:youtube\.com/watch\?v=|youtu\.be/)([A-Za-z0-9_-]{11})[^)]*)\)"
    )
    .unwrap();
    static ref VIMEO_LINK: Regex =
        Regex::new(r"!?\[vimeo\]\((https?://(?:www\.|player\.)?vimeo\.com/[^)\s]+)\)").unwrap();
    static ref VIDEO_LINK: Regex = Regex::new(r"!?\[video\]\((https?://[^)\s]+)\)").unwrap();
    static ref DRIVE_LINK: Regex =
        Regex::new(r"!?\[googledrive\]\((https://(?:drive|docs)\.google\.com/[^)\s]+)\)").unwrap();
    static ref HTML_ANCHOR: Regex =
        Regex::new(r#"(?is)<a\s+[^>]*?href\s*=\s*["']([^"']*)["'][^>]*>(.*?)</a>"#).unwrap();
    static ref MD_LINK: Regex = Regex::new(r"\[([^\]]+)\]\(([^)]+)\)").unwrap();
    static ref HEADING: Regex = Regex::new(r"^(#{1,3})\s+(.*)$").unwrap();
    static ref LIST_ITEM: Regex = Regex::new(r"^[*-]\s+(.*)$").unwrap();
    static ref BOLD: Regex = Regex::new(r"\*\*([^*\n]+?)\*\*").unwrap();
    static ref ITALIC: Regex = Regex::new(r"\*([^*\n]+?)\*").unwrap();
    static ref HTML_TAG: Regex = Regex::new(r"</?[A-Za-z][^>]*>").unwrap();
    static ref BLANK_LINES: Regex = Regex::new(r"\n[ \t]*\n").unwrap();
    static ref WRAPPED_HEADING: Regex = Regex::new(
        r#"(?s)<div class="mb-6">\s*(<h([1-3])[^>]*>.*?</h[1-3]>)\s*</div>"#
    )
    .unwrap();
}

const LINK_ATTRS: &str =
    r#"target="_blank" rel="noopener noreferrer" class="text-blue-400 hover:text-blue-300 underline""#;
const IMAGE_CLASS: &str = "w-full h-auto rounded-lg shadow-lg my-6";
const IFRAME_ALLOW: &str =
    "accelerometer; autoplay; clipboard-write; encrypted-media; gyroscope; picture-in-picture";
const LIST_OPEN: &str = r#"<ul class="list-disc list-outside mb-4 pl-5 space-y-1">"#;
const LIST_ITEM_OPEN: &str = r#"<li class="text-white mb-1 ml-4">"#;
const PARAGRAPH_OPEN: &str = r#"<div class="mb-6">"#;

/// Container prefixes produced by the embed pass.
pub const EMBED_CONTAINER_PREFIXES: &[&str] =
    &[r#"<div class="aspect-video"#, r#"<div class="drive-embed"#];

/// Image alt texts that mark embed tokens; the image pass leaves these for
/// the embed pass.
const EMBED_ALTS: &[&str] = &["youtube", "vimeo", "video", "googledrive"];

/// Link texts the link pass never turns into anchors, so an unresolved
/// `[youtube](..)` or `[googledrive](..)` token stays literal.
const EMBED_LINK_TOKENS: &[&str] = &["youtube", "googledrive"];

const BLOCK_PREFIXES: &[&str] = &["<h", "<ul", "</ul>", "<img"];

/// Render author text to HTML. Empty or whitespace-only input yields an
/// empty string; no pass fails, unparseable tokens stay as literal text.
pub fn render_markdown(text: &str) -> String {
    if text.trim().is_empty() {
        return String::new();
    }

    let normalized = text.replace("\r\n", "\n");
    let html = render_images(&normalized);
    let html = render_embeds(&html);
    let html = normalize_html_anchors(&html);
    let html = render_links(&html);
    let html = render_headings(&html);
    let html = render_lists(&html);
    let html = render_emphasis(&html);
    let html = wrap_paragraphs(&html);

    tracing::trace!(input_len = text.len(), output_len = html.len(), "rendered markdown");
    html
}

fn is_embed_alt(text: &str) -> bool {
    EMBED_ALTS.contains(&text.trim().to_ascii_lowercase().as_str())
}

fn anchor(url: &str, text: &str) -> String {
    format!(r#"<a href="{}" {}>{}</a>"#, url, LINK_ATTRS, text)
}

fn iframe_container(src: &str, title: &str) -> String {
    format!(
        r#"<div class="aspect-video rounded-lg overflow-hidden shadow-lg my-6"><iframe src="{}" class="w-full h-full" frameborder="0" allow="{}" allowfullscreen title="{}"></iframe></div>"#,
        src, IFRAME_ALLOW, title
    )
}

/// `![alt](url)`. Image syntax with an embed keyword as alt text is left for
/// the embed pass.
fn render_images(input: &str) -> String {
    MD_IMAGE
        .replace_all(input, |caps: &Captures| {
            let alt = &caps[1];
            if is_embed_alt(alt) {
                return caps[0].to_string();
            }
            format!(
                r#"<img src="{}" alt="{}" class="{}" loading="lazy" />"#,
                &caps[2], alt, IMAGE_CLASS
            )
        })
        .into_owned()
}

fn render_embeds(input: &str) -> String {
    let html = YOUTUBE_TOKEN.replace_all(input, |caps: &Captures| {
        iframe_container(&format!("https://www.youtube.com/embed/{}", &caps[1]), "YouTube video")
    });

    let html = YOUTUBE_LINK.replace_all(&html, |caps: &Captures| {
        iframe_container(&format!("https://www.youtube.com/embed/{}", &caps[2]), "YouTube video")
    });

    let html = VIMEO_LINK.replace_all(&html, |caps: &Captures| {
        match embed::vimeo_embed_url(&caps[1]) {
            Some(src) => iframe_container(&src, "Vimeo video"),
            None => caps[0].to_string(),
        }
    });

    let html = VIDEO_LINK.replace_all(&html, |caps: &Captures| {
        let url = &caps[1];
        if !embed::is_direct_video(url) {
            return caps[0].to_string();
        }
        format!(
            r#"<div class="aspect-video rounded-lg overflow-hidden shadow-lg my-6"><video src="{}" class="w-full h-full" controls preload="metadata"></video></div>"#,
            url
        )
    });

    let html = DRIVE_LINK.replace_all(&html, |caps: &Captures| {
        let url = &caps[1];
        match embed::google_drive_embed_url(url) {
            Some(src) if embed::is_google_editor_document(url) => format!(
                r#"<div class="drive-embed aspect-[4/3] rounded-lg overflow-hidden shadow-lg my-6"><iframe src="{}" class="w-full h-full" frameborder="0" allowfullscreen title="Google document"></iframe></div>"#,
                src
            ),
            Some(src) => iframe_container(&src, "Google Drive file"),
            None => caps[0].to_string(),
        }
    });

    html.into_owned()
}

/// Raw `<a href>` tags are rewritten with the standard link attributes.
fn normalize_html_anchors(input: &str) -> String {
    HTML_ANCHOR
        .replace_all(input, |caps: &Captures| anchor(&caps[1], &caps[2]))
        .into_owned()
}

/// `[text](url)`, skipping matches preceded by `!` and embed tokens.
fn render_links(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut last = 0;

    for caps in MD_LINK.captures_iter(input) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        let after_bang = input[..whole.start()].ends_with('!');
        if after_bang || EMBED_LINK_TOKENS.contains(&&caps[1]) {
            continue;
        }
        out.push_str(&input[last..whole.start()]);
        out.push_str(&anchor(&caps[2], &caps[1]));
        last = whole.end();
    }

    out.push_str(&input[last..]);
    out
}

fn render_headings(input: &str) -> String {
    input
        .split('\n')
        .map(|line| {
            let trimmed = line.trim();
            match HEADING.captures(trimmed) {
                Some(caps) => {
                    let (level, class) = match caps[1].len() {
                        3 => (3, "text-xl font-bold text-white mb-3 mt-6"),
                        2 => (2, "text-2xl font-bold text-white mb-3 mt-6"),
                        _ => (1, "text-3xl font-bold text-white mb-4 mt-0"),
                    };
                    format!(
                        r#"<h{lvl} class="{class}">{text}</h{lvl}>"#,
                        lvl = level,
                        class = class,
                        text = caps[2].trim_end()
                    )
                }
                None => line.to_string(),
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Contiguous `*`/`-` lines become one `<ul>`. Item text gets its bold and
/// italic formatting here; the emphasis pass skips list lines.
fn render_lists(input: &str) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut items: Vec<String> = Vec::new();

    for line in input.split('\n') {
        match LIST_ITEM.captures(line.trim()) {
            Some(caps) => {
                items.push(format!("{}{}</li>", LIST_ITEM_OPEN, format_inline(&caps[1])));
            }
            None => {
                if !items.is_empty() {
                    lines.push(format!("{}{}</ul>", LIST_OPEN, items.concat()));
                    items.clear();
                }
                lines.push(line.to_string());
            }
        }
    }

    if !items.is_empty() {
        lines.push(format!("{}{}</ul>", LIST_OPEN, items.concat()));
    }

    lines.join("\n")
}

fn format_bold(text: &str) -> String {
    BOLD.replace_all(text, r#"<strong class="font-bold text-white">$1</strong>"#)
        .into_owned()
}

fn format_italic(text: &str) -> String {
    ITALIC
        .replace_all(text, r#"<em class="italic text-white">$1</em>"#)
        .into_owned()
}

fn format_inline(text: &str) -> String {
    let has_markup = HTML_TAG.is_match(text);
    let bolded = format_bold(text);
    if has_markup {
        bolded
    } else {
        format_italic(&bolded)
    }
}

/// Bold, then italic. Italic never runs on a line that already carried
/// markup from an earlier pass, so a `*` inside an attribute is safe.
fn render_emphasis(input: &str) -> String {
    input
        .split('\n')
        .map(|line| {
            if line.starts_with(LIST_OPEN) {
                line.to_string()
            } else {
                format_inline(line)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn is_block_level(line: &str) -> bool {
    BLOCK_PREFIXES.iter().any(|p| line.starts_with(p))
        || EMBED_CONTAINER_PREFIXES.iter().any(|p| line.starts_with(p))
}

/// Split on blank lines. Inside a chunk, block-level lines pass through and
/// each run of other lines becomes one paragraph.
fn wrap_paragraphs(input: &str) -> String {
    let mut chunks: Vec<String> = Vec::new();

    for chunk in BLANK_LINES.split(input) {
        let chunk = chunk.trim();
        if chunk.is_empty() {
            continue;
        }

        let mut parts: Vec<String> = Vec::new();
        let mut paragraph: Vec<&str> = Vec::new();
        for line in chunk.split('\n') {
            let trimmed = line.trim();
            if is_block_level(trimmed) {
                if !paragraph.is_empty() {
                    parts.push(format!("{}{}</div>", PARAGRAPH_OPEN, paragraph.join("\n")));
                    paragraph.clear();
                }
                parts.push(trimmed.to_string());
            } else {
                paragraph.push(line);
            }
        }
        if !paragraph.is_empty() {
            let text = paragraph.join("\n");
            let text = text.trim();
            if !text.is_empty() {
                parts.push(format!("{}{}</div>", PARAGRAPH_OPEN, text));
            }
        }

        chunks.push(parts.join("\n"));
    }

    let html = chunks.join("\n\n");
    WRAPPED_HEADING.replace_all(&html, "$1").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn count(haystack: &str, needle: &str) -> usize {
        haystack.matches(needle).count()
    }

    #[test]
    fn test_empty_and_whitespace_render_to_nothing() {
        assert_eq!(render_markdown(""), "");
        assert_eq!(render_markdown("   "), "");
        assert_eq!(render_markdown("\n\t\n"), "");
    }

    #[test]
    fn test_plain_text_gets_exactly_one_paragraph() {
        assert_eq!(
            render_markdown("Just some words, nothing else."),
            r#"<div class="mb-6">Just some words, nothing else.</div>"#
        );
    }

    #[test]
    fn test_bold_and_italic() {
        let bold = render_markdown("**bold**");
        assert_eq!(count(&bold, "<strong"), 1);
        assert!(bold.contains(">bold</strong>"));
        assert!(!bold.contains("<em"));

        let italic = render_markdown("*italic*");
        assert_eq!(count(&italic, "<em"), 1);
        assert!(italic.contains(">italic</em>"));

        let both = render_markdown("**bold** and *italic*");
        assert_eq!(count(&both, "<strong"), 1);
        assert_eq!(count(&both, "<em"), 1);
        assert!(both.contains(r#"<strong class="font-bold text-white">bold</strong> and <em class="italic text-white">italic</em>"#));
    }

    #[test]
    fn test_image_is_not_also_a_link() {
        let html = render_markdown("![alt](http://x/y.png)");
        assert!(html.contains(r#"<img src="http://x/y.png" alt="alt""#));
        assert!(html.contains(r#"loading="lazy""#));
        assert!(!html.contains("<a "));
        assert!(!html.contains(r#"<div class="mb-6">"#));
    }

    #[test]
    fn test_youtube_link_becomes_iframe() {
        let html = render_markdown("[youtube](https://youtube.com/watch?v=dQw4w9WgXcQ)");
        assert!(html.contains(r#"<iframe src="https://www.youtube.com/embed/dQw4w9WgXcQ""#));
        assert!(!html.contains("<a "));
        assert!(html.starts_with(r#"<div class="aspect-video"#));
    }

    #[test]
    fn test_youtube_token_and_image_syntax() {
        let token = render_markdown("[youtube:dQw4w9WgXcQ]");
        assert!(token.contains("https://www.youtube.com/embed/dQw4w9WgXcQ"));

        let image_like = render_markdown("![youtube](https://youtu.be/dQw4w9WgXcQ)");
        assert!(image_like.contains("https://www.youtube.com/embed/dQw4w9WgXcQ"));
        assert!(!image_like.contains("<img"));
        assert!(!image_like.contains('!'));
    }

    #[test]
    fn test_unparseable_embed_is_left_literal() {
        let html = render_markdown("[youtube](https://example.com/not-a-video)");
        assert_eq!(
            html,
            r#"<div class="mb-6">[youtube](https://example.com/not-a-video)</div>"#
        );
    }

    #[test]
    fn test_vimeo_and_direct_video() {
        let vimeo = render_markdown("[vimeo](https://vimeo.com/76979871)");
        assert!(vimeo.contains("https://player.vimeo.com/video/76979871"));

        let video = render_markdown("[video](https://cdn.example.com/reel.mp4)");
        assert!(video.contains(r#"<video src="https://cdn.example.com/reel.mp4""#));

        let not_video = render_markdown("[video](https://cdn.example.com/reel.avi)");
        assert!(!not_video.contains("<video"));
        assert!(not_video.contains(r#"<a href="https://cdn.example.com/reel.avi""#));
    }

    #[test]
    fn test_link_titled_video_is_an_anchor() {
        let html = render_markdown("Watch the [Video](https://example.com/talk)");
        assert!(html.contains(r#"<a href="https://example.com/talk""#));
        assert!(html.contains(">Video</a>"));
        assert!(!html.contains("[Video]"));

        let unresolved = render_markdown("[googledrive](https://example.com/x)");
        assert!(!unresolved.contains("<a "));
    }

    #[test]
    fn test_google_drive_embeds() {
        let file = render_markdown("[googledrive](https://drive.google.com/file/d/abc123/view)");
        assert!(file.contains("https://drive.google.com/file/d/abc123/preview"));

        let doc = render_markdown("![googledrive](https://docs.google.com/document/d/doc9/edit)");
        assert!(doc.contains("https://docs.google.com/document/d/doc9/preview"));
        assert!(doc.starts_with(r#"<div class="drive-embed"#));
    }

    #[test]
    fn test_markdown_link_and_raw_anchor_are_normalized() {
        let html = render_markdown("See [docs](https://example.com) or <a href='https://x.io'>x</a>");
        assert_eq!(count(&html, r#"target="_blank""#), 2);
        assert!(html.contains(r#"<a href="https://example.com" target="_blank" rel="noopener noreferrer""#));
        assert!(html.contains(r#"<a href="https://x.io" target="_blank""#));
    }

    #[test]
    fn test_heading_is_never_inside_paragraph() {
        let html = render_markdown("# Title\nBody");
        assert_eq!(
            html,
            "<h1 class=\"text-3xl font-bold text-white mb-4 mt-0\">Title</h1>\n<div class=\"mb-6\">Body</div>"
        );
    }

    #[test]
    fn test_heading_levels_checked_longest_first() {
        let html = render_markdown("## Two\n\n### Three");
        assert!(html.contains(">Two</h2>"));
        assert!(html.contains(">Three</h3>"));
        assert!(!html.contains("<h1"));
    }

    #[test]
    fn test_hash_without_space_is_not_a_heading() {
        assert!(!render_markdown("#hashtag").contains("<h1"));
    }

    #[test]
    fn test_list_followed_by_paragraph() {
        let html = render_markdown("- a\n- b\n\nNot a list");
        assert_eq!(count(&html, "<ul"), 1);
        assert_eq!(count(&html, "<li"), 2);
        assert!(html.ends_with(r#"<div class="mb-6">Not a list</div>"#));
        assert!(html.starts_with(LIST_OPEN));
    }

    #[test]
    fn test_star_bullets_are_not_italic() {
        let html = render_markdown("* one\n* **two** and *three*");
        assert_eq!(count(&html, "<li"), 2);
        assert_eq!(count(&html, "<strong"), 1);
        assert_eq!(count(&html, "<em"), 1);
    }

    #[test]
    fn test_non_list_line_terminates_list() {
        let html = render_markdown("- a\ntext\n- b");
        assert_eq!(count(&html, "<ul"), 2);
    }

    #[test]
    fn test_italic_skipped_on_lines_with_markup() {
        let html = render_markdown("<span data-x=\"*\">a</span> *b*");
        assert!(!html.contains("<em"));
    }

    #[test]
    fn test_multiple_paragraphs() {
        let html = render_markdown("first\n\nsecond\n  \nthird");
        assert_eq!(count(&html, r#"<div class="mb-6">"#), 3);
    }
}
