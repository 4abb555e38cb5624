use chrono::{DateTime, Utc};

use crate::emoji::EmojiResolver;
use crate::model::{DocumentEntry, ROOT_DEPTH, RenderedPost};
use crate::text::{VideoDomains, escape_markdown_text, normalize_body, tokens_to_text};

pub const UNKNOWN_DATE: &str = "unknown date";
pub const DEFAULT_INDENT: &str = "> ";
const DATE_FORMAT: &str = "%Y-%m-%d %H:%M UTC";

#[derive(Debug, Clone, Copy)]
pub struct RenderStyle<'a> {
    pub indent: &'a str,
    pub resolver: EmojiResolver<'a>,
    pub video_domains: &'a VideoDomains,
}

pub fn render_document(entries: &[DocumentEntry], style: &RenderStyle<'_>) -> String {
    let mut output = String::new();
    for entry in entries {
        match entry {
            DocumentEntry::Post(post) => render_post(&mut output, post, style),
            DocumentEntry::Separator => output.push('\n'),
        }
    }
    output
}

fn render_post(output: &mut String, entry: &RenderedPost, style: &RenderStyle<'_>) {
    let indent = style.indent.repeat(entry.depth);
    let post = &entry.post;

    output.push_str(&indent);
    if let Some(avatar) = post.avatar_url.as_deref().filter(|url| !url.trim().is_empty()) {
        output.push_str(&format!("![avatar]({}) ", avatar.trim()));
    }
    if !post.author_handle.is_empty() {
        output.push_str(&format!(
            "**{}** ",
            escape_markdown_text(&post.author_handle)
        ));
    }

    let date = format_timestamp(&post.timestamp);
    if entry.depth == ROOT_DEPTH {
        output.push_str(&format!("[{date}]({})", post.id));
    } else {
        output.push_str(&format!("[{date}]"));
    }
    output.push('\n');

    let body = tokens_to_text(&post.text, &style.resolver);
    for line in normalize_body(&body, style.video_domains) {
        output.push_str(&indent);
        output.push_str(&line);
        output.push('\n');
    }
}

pub fn format_timestamp(timestamp: &str) -> String {
    DateTime::parse_from_rfc3339(timestamp.trim()).map_or_else(
        |_| UNKNOWN_DATE.to_string(),
        |parsed| parsed.with_timezone(&Utc).format(DATE_FORMAT).to_string(),
    )
}
