use once_cell::sync::Lazy;
use regex::Regex;

use crate::emoji::EmojiResolver;
use crate::model::TextToken;
use crate::permalink::bare_host;

pub const DEFAULT_VIDEO_DOMAINS: &[&str] = &[
    "youtube.com",
    "youtu.be",
    "m.youtube.com",
    "music.youtube.com",
];

const ELLIPSIS: char = '\u{2026}';
const ESCAPED_CHARS: &[char] = &['\\', '*', '_', '`', '[', ']'];
const LINK_OPENERS: &[&str] = &["](", ")(", "("];
const URL_JOINERS: &[char] = &['=', '&', '/', '?', '#', '.', '-', '_', '%'];

static BARE_SCHEME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^https?://$").expect("valid regex"));
static URL_CHARSET_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9A-Za-z\-._~:/?#\[\]@!$&'()*+,;=%]+$").expect("valid regex")
});
static ELLIPSIS_LINE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:\u{2026}|\.{3})$").expect("valid regex"));
static URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"https?://[^\s<>"()\[\]]+"#).expect("valid regex"));
static MULTI_SPACE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[ \t]{2,}").expect("valid regex"));
static EMPTY_PARENS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(\s*\)").expect("valid regex"));

/// Hosts whose links are removed from post bodies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoDomains {
    hosts: Vec<String>,
}

impl VideoDomains {
    pub fn new<I, S>(hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let hosts = hosts
            .into_iter()
            .map(|host| {
                let host = host.as_ref().trim().to_ascii_lowercase();
                host.strip_prefix("www.")
                    .map(ToString::to_string)
                    .unwrap_or(host)
            })
            .filter(|host| !host.is_empty())
            .collect();
        Self { hosts }
    }

    pub fn matches(&self, url: &str) -> bool {
        bare_host(url).is_some_and(|host| self.hosts.iter().any(|known| *known == host))
    }
}

impl Default for VideoDomains {
    fn default() -> Self {
        Self::new(DEFAULT_VIDEO_DOMAINS)
    }
}

/// Join body tokens into plain text, resolving glyph images.
pub fn tokens_to_text(tokens: &[TextToken], resolver: &EmojiResolver<'_>) -> String {
    let mut text = String::new();
    for token in tokens {
        match token {
            TextToken::Text { text: chunk } => text.push_str(chunk),
            TextToken::Emoji { src, alt } => {
                text.push_str(resolver.resolve(src, alt.as_deref()).as_text());
            }
            TextToken::Break => text.push('\n'),
        }
    }
    text
}

/// Turn a post body into the escaped, compacted lines written to the document.
pub fn normalize_body(text: &str, video_domains: &VideoDomains) -> Vec<String> {
    let lines = text
        .split('\n')
        .map(|line| line.trim_end_matches('\r'))
        .collect::<Vec<_>>();

    strip_split_video_links(&lines, video_domains)
        .into_iter()
        .map(|line| strip_inline_video_links(&line, video_domains))
        .filter(|line| !line.trim().is_empty())
        .map(|line| escape_markdown(&wrap_bare_urls(&line)))
        .collect()
}

/// Drop video links the source view broke over several lines, e.g.
/// `https://` / `youtu.be/abc?si` / `=XYZ`.
fn strip_split_video_links(lines: &[&str], video_domains: &VideoDomains) -> Vec<String> {
    let mut kept = Vec::with_capacity(lines.len());
    let mut idx = 0;

    while idx < lines.len() {
        let line = lines[idx].trim();
        if BARE_SCHEME_RE.is_match(line) {
            let (candidate, next_idx) = join_url_continuation(lines, idx);
            if next_idx > idx + 1 && video_domains.matches(&candidate) {
                idx = next_idx;
                continue;
            }
        }

        kept.push(lines[idx].to_string());
        idx += 1;
    }

    kept
}

fn join_url_continuation(lines: &[&str], scheme_idx: usize) -> (String, usize) {
    let mut candidate = lines[scheme_idx].trim().to_string();
    let mut idx = scheme_idx + 1;

    while idx < lines.len() {
        let next = lines[idx].trim();
        if ELLIPSIS_LINE_RE.is_match(next) {
            idx += 1;
            break;
        }

        let (part, truncated) = match next.strip_suffix(ELLIPSIS) {
            Some(part) => (part, true),
            None => (next, false),
        };
        if BARE_SCHEME_RE.is_match(part)
            || !URL_CHARSET_RE.is_match(part)
            || !continues_url(&candidate, part)
        {
            break;
        }

        candidate.push_str(part);
        idx += 1;
        if truncated {
            break;
        }
    }

    (candidate, idx)
}

/// A line continues the URL while the host is incomplete or either side of
/// the join is URL punctuation. A plain word after a finished path does not.
fn continues_url(candidate: &str, next: &str) -> bool {
    let after_scheme = candidate.split_once("://").map_or(candidate, |(_, rest)| rest);
    !after_scheme.contains('/')
        || candidate.ends_with(URL_JOINERS)
        || next.starts_with(URL_JOINERS)
}

fn strip_inline_video_links(line: &str, video_domains: &VideoDomains) -> String {
    let mut removed = false;
    let stripped = URL_RE.replace_all(line, |caps: &regex::Captures<'_>| {
        let url = caps[0].trim_end_matches(ELLIPSIS);
        if video_domains.matches(url) {
            removed = true;
            String::new()
        } else {
            caps[0].to_string()
        }
    });

    if !removed {
        return line.to_string();
    }

    let collapsed = MULTI_SPACE_RE.replace_all(&stripped, " ");
    let without_parens = EMPTY_PARENS_RE.replace_all(&collapsed, "");
    MULTI_SPACE_RE
        .replace_all(&without_parens, " ")
        .trim()
        .to_string()
}

/// Parenthesize raw URLs that are not already part of link markup.
pub fn wrap_bare_urls(line: &str) -> String {
    let mut output = String::with_capacity(line.len() + 4);
    let mut last = 0;

    for found in URL_RE.find_iter(line) {
        let prefix = &line[..found.start()];
        output.push_str(&line[last..found.start()]);
        if LINK_OPENERS.iter().any(|opener| prefix.ends_with(opener)) {
            output.push_str(found.as_str());
        } else {
            output.push('(');
            output.push_str(found.as_str());
            output.push(')');
        }
        last = found.end();
    }

    output.push_str(&line[last..]);
    output
}

/// Escape markdown control characters outside of URLs.
pub fn escape_markdown(line: &str) -> String {
    let mut output = String::with_capacity(line.len() + 8);
    let mut last = 0;

    for found in URL_RE.find_iter(line) {
        output.push_str(&escape_markdown_text(&line[last..found.start()]));
        output.push_str(found.as_str());
        last = found.end();
    }

    output.push_str(&escape_markdown_text(&line[last..]));
    output
}

pub fn escape_markdown_text(text: &str) -> String {
    let mut output = String::with_capacity(text.len());
    for ch in text.chars() {
        if ESCAPED_CHARS.contains(&ch) {
            output.push('\\');
        }
        output.push(ch);
    }
    output
}

#[cfg(test)]
mod tests {
    use super::{
        VideoDomains, escape_markdown, escape_markdown_text, normalize_body, tokens_to_text,
        wrap_bare_urls,
    };
    use crate::emoji::{EmojiResolver, EmojiTable};
    use crate::model::TextToken;

    fn normalize(text: &str) -> Vec<String> {
        normalize_body(text, &VideoDomains::default())
    }

    #[test]
    fn split_youtube_link_is_removed_entirely() {
        let lines = normalize("watch this\nhttps://\nyoutu.be/abc?si\n=XYZ\nso good");
        assert_eq!(lines, vec!["watch this", "so good"]);
    }

    #[test]
    fn split_link_with_ellipsis_line_is_removed() {
        let lines = normalize("https://\nwww.youtube.com/watch?v=\nabc123\n\u{2026}\nafter");
        assert_eq!(lines, vec!["after"]);
    }

    #[test]
    fn word_after_split_link_is_kept() {
        let lines = normalize("new vid\nhttps://\nyoutu.be/abc\nthanks");
        assert_eq!(lines, vec!["new vid", "thanks"]);
    }

    #[test]
    fn split_link_to_other_host_is_kept() {
        let lines = normalize("https://\nexample.com/a\ntail text");
        assert_eq!(lines, vec!["https://", "example.com/a", "tail text"]);
    }

    #[test]
    fn inline_youtube_link_leaves_no_artifacts() {
        let lines = normalize("new video (https://youtu.be/abc?si=x) out now");
        assert_eq!(lines, vec!["new video out now"]);

        let lines = normalize("https://www.youtube.com/watch?v=abc");
        assert!(lines.is_empty());
    }

    #[test]
    fn lookalike_host_is_not_stripped() {
        let lines = normalize("see https://youtu.be.example.com/x");
        assert_eq!(lines, vec!["see (https://youtu.be.example.com/x)"]);
    }

    #[test]
    fn blank_lines_are_dropped() {
        let lines = normalize("first\n\n   \nsecond\r\n");
        assert_eq!(lines, vec!["first", "second"]);
    }

    #[test]
    fn bare_urls_are_wrapped_once() {
        assert_eq!(
            wrap_bare_urls("read https://example.com/a now"),
            "read (https://example.com/a) now"
        );
        assert_eq!(
            wrap_bare_urls("[site](https://example.com/a)"),
            "[site](https://example.com/a)"
        );
        assert_eq!(
            wrap_bare_urls("(https://example.com/a)"),
            "(https://example.com/a)"
        );
    }

    #[test]
    fn escaping_protects_urls() {
        let escaped = escape_markdown("h____n900 posted (https://example.com/some_path_x)");
        assert_eq!(
            escaped,
            "h\\_\\_\\_\\_n900 posted (https://example.com/some_path_x)"
        );
    }

    #[test]
    fn escaping_covers_control_characters() {
        assert_eq!(escape_markdown_text(r"a*b`c[d]\e"), r"a\*b\`c\[d\]\\e");
    }

    #[test]
    fn body_with_underscored_url_round_trips() {
        let lines = normalize("by snake_case see https://example.com/a_b_c");
        assert_eq!(lines, vec!["by snake\\_case see (https://example.com/a_b_c)"]);
    }

    #[test]
    fn tokens_join_with_breaks_and_emoji() {
        let table = EmojiTable::NotLoaded;
        let resolver = EmojiResolver::new(&table);
        let tokens = vec![
            TextToken::Text {
                text: "hi ".to_string(),
            },
            TextToken::Emoji {
                src: "https://abs-0.twimg.com/emoji/v2/svg/1f44b.svg".to_string(),
                alt: None,
            },
            TextToken::Break,
            TextToken::Text {
                text: "bye".to_string(),
            },
        ];

        assert_eq!(tokens_to_text(&tokens, &resolver), "hi \u{1f44b}\nbye");
    }

    #[test]
    fn custom_video_domains_replace_defaults() {
        let domains = VideoDomains::new(["www.vimeo.com"]);
        let lines = normalize_body("a https://vimeo.com/1 b https://youtu.be/x", &domains);
        assert_eq!(lines, vec!["a b (https://youtu.be/x)"]);
    }
}
