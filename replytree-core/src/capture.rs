use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Deserialize;
use walkdir::WalkDir;

use crate::error::{Result, ReplytreeError};
use crate::model::{PostRecord, TextToken};
use crate::permalink::normalize_permalink;

const CAPTURE_EXTENSIONS: &[&str] = &["json", "jsonl"];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Capture {
    pub records: Vec<PostRecord>,
    pub sources: Vec<PathBuf>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPost {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    author_handle: Option<String>,
    #[serde(default)]
    author_name: Option<String>,
    #[serde(default)]
    avatar_url: Option<String>,
    #[serde(default)]
    text: Option<RawText>,
    #[serde(default)]
    timestamp: Option<String>,
    #[serde(default)]
    is_reply: bool,
    #[serde(default)]
    has_replies: bool,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawText {
    Plain(String),
    Tokens(Vec<TextToken>),
}

/// Read a capture file, or every capture file below a directory in path order.
pub fn read_capture(path: &Path) -> Result<Capture> {
    let sources = if path.is_dir() {
        capture_files(path)
    } else {
        vec![path.to_path_buf()]
    };

    if sources.is_empty() {
        return Err(ReplytreeError::InvalidCapture {
            path: path.to_path_buf(),
            reason: "no .json or .jsonl files found".to_string(),
        });
    }

    let mut warnings = Vec::new();
    let mut records = Vec::new();
    for source in &sources {
        let raw = read_capture_raw(source)?;
        for (idx, post) in parse_capture(source, &raw)?.into_iter().enumerate() {
            records.push(into_record(source, idx + 1, post, &mut warnings)?);
        }
    }

    let records = dedup_records(records, &mut warnings);
    tracing::debug!(
        files = sources.len(),
        records = records.len(),
        "read capture"
    );

    Ok(Capture {
        records,
        sources,
        warnings,
    })
}

fn capture_files(root: &Path) -> Vec<PathBuf> {
    let mut files = WalkDir::new(root)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(walkdir::DirEntry::into_path)
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| CAPTURE_EXTENSIONS.contains(&ext))
        })
        .collect::<Vec<_>>();
    files.sort();
    files
}

fn read_capture_raw(path: &Path) -> Result<String> {
    let bytes = fs::read(path).map_err(|source| ReplytreeError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(ReplytreeError::EmptyCapture {
            path: path.to_path_buf(),
        });
    }

    String::from_utf8(bytes).map_err(|_| ReplytreeError::NonUtf8Capture {
        path: path.to_path_buf(),
    })
}

fn parse_capture(path: &Path, raw: &str) -> Result<Vec<RawPost>> {
    if raw.trim_start().starts_with('[') {
        return serde_json::from_str::<Vec<RawPost>>(raw).map_err(|source| {
            ReplytreeError::InvalidJson {
                path: path.to_path_buf(),
                source,
            }
        });
    }

    let mut posts = Vec::new();
    for (line_idx, line) in raw.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let post = serde_json::from_str::<RawPost>(trimmed).map_err(|source| {
            ReplytreeError::InvalidJsonLine {
                path: path.to_path_buf(),
                line: line_idx + 1,
                source,
            }
        })?;
        posts.push(post);
    }

    Ok(posts)
}

fn into_record(
    path: &Path,
    position: usize,
    raw: RawPost,
    warnings: &mut Vec<String>,
) -> Result<PostRecord> {
    let present = |link: &String| !link.trim().is_empty();
    let Some(link) = raw.id.filter(present).or(raw.url.filter(present)) else {
        return Err(ReplytreeError::InvalidCapture {
            path: path.to_path_buf(),
            reason: format!("record {position} has no id or url"),
        });
    };
    let id = normalize_permalink(&link);

    let timestamp = raw.timestamp.unwrap_or_default();
    let timestamp = match normalize_timestamp(&timestamp) {
        Some(normalized) => normalized,
        None => {
            warnings.push(format!(
                "unparseable timestamp {timestamp:?} on {id}; treating as unknown"
            ));
            String::new()
        }
    };

    let text = match raw.text {
        Some(RawText::Plain(text)) => plain_tokens(&text),
        Some(RawText::Tokens(tokens)) => tokens,
        None => Vec::new(),
    };

    Ok(PostRecord {
        id,
        author_handle: raw.author_handle.unwrap_or_default(),
        author_name: raw.author_name.unwrap_or_default(),
        avatar_url: raw.avatar_url.filter(|url| !url.trim().is_empty()),
        text,
        timestamp,
        is_reply: raw.is_reply,
        has_replies: raw.has_replies,
    })
}

fn plain_tokens(text: &str) -> Vec<TextToken> {
    let mut tokens = Vec::new();
    for (idx, line) in text.split('\n').enumerate() {
        if idx > 0 {
            tokens.push(TextToken::Break);
        }
        if !line.is_empty() {
            tokens.push(TextToken::Text {
                text: line.to_string(),
            });
        }
    }
    tokens
}

/// Normalize to UTC with millisecond precision so string order is time order.
///
/// Empty input stays empty; `None` means the input did not parse.
pub fn normalize_timestamp(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Some(String::new());
    }

    DateTime::parse_from_rfc3339(trimmed).ok().map(|parsed| {
        parsed
            .with_timezone(&Utc)
            .to_rfc3339_opts(SecondsFormat::Millis, true)
    })
}

/// Keep the first record for every id.
pub fn dedup_records(records: Vec<PostRecord>, warnings: &mut Vec<String>) -> Vec<PostRecord> {
    let mut seen = HashSet::new();
    let mut unique = Vec::with_capacity(records.len());

    for record in records {
        if seen.insert(record.id.clone()) {
            unique.push(record);
        } else {
            warnings.push(format!("dropped duplicate post {}", record.id));
        }
    }

    unique
}
