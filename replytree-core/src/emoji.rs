use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use once_cell::sync::{Lazy, OnceCell};
use regex::Regex;

use crate::error::{Result, ReplytreeError};

pub const EMOJI_PLACEHOLDER: &str = "[emoji]";

static CODEPOINTS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9A-Fa-f]{2,6}(?:-[0-9A-Fa-f]{2,6})*$").expect("valid regex")
});

/// Image URL to Unicode lookup, in one of its three load states.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum EmojiTable {
    /// No map was configured or the configured file could not be used.
    #[default]
    NotLoaded,
    Empty,
    Populated(HashMap<String, String>),
}

impl EmojiTable {
    pub fn from_entries(entries: HashMap<String, String>) -> Self {
        if entries.is_empty() {
            Self::Empty
        } else {
            Self::Populated(entries)
        }
    }

    pub fn lookup(&self, src: &str) -> Option<&str> {
        match self {
            Self::Populated(entries) => entries.get(src).map(String::as_str),
            Self::NotLoaded | Self::Empty => None,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Populated(entries) => entries.len(),
            Self::NotLoaded | Self::Empty => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub fn read_emoji_map(path: &Path) -> Result<EmojiTable> {
    let raw = fs::read_to_string(path).map_err(|source| ReplytreeError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let entries = serde_json::from_str::<HashMap<String, String>>(&raw).map_err(|source| {
        ReplytreeError::InvalidEmojiMap {
            path: path.to_path_buf(),
            source,
        }
    })?;

    Ok(EmojiTable::from_entries(entries))
}

/// Optional emoji map file, read at most once on first use.
#[derive(Debug, Default)]
pub struct EmojiMapSource {
    path: Option<PathBuf>,
    table: OnceCell<EmojiTable>,
}

impl EmojiMapSource {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self {
            path,
            table: OnceCell::new(),
        }
    }

    pub fn preloaded(table: EmojiTable) -> Self {
        Self {
            path: None,
            table: OnceCell::with_value(table),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.table.get().is_some()
    }

    pub fn table(&self) -> &EmojiTable {
        self.table.get_or_init(|| {
            let Some(path) = self.path.as_deref() else {
                return EmojiTable::NotLoaded;
            };

            match read_emoji_map(path) {
                Ok(table) => {
                    tracing::debug!(path = %path.display(), entries = table.len(), "loaded emoji map");
                    table
                }
                Err(ReplytreeError::Io { source, .. }) if source.kind() == ErrorKind::NotFound => {
                    tracing::debug!(path = %path.display(), "emoji map not present");
                    EmojiTable::NotLoaded
                }
                Err(err) => {
                    tracing::warn!("ignoring emoji map: {err}");
                    EmojiTable::NotLoaded
                }
            }
        })
    }

    pub fn resolver(&self) -> EmojiResolver<'_> {
        EmojiResolver::new(self.table())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmojiResolution {
    Mapped(String),
    Codepoints(String),
    AltText(String),
    Placeholder,
}

impl EmojiResolution {
    pub fn as_text(&self) -> &str {
        match self {
            Self::Mapped(text) | Self::Codepoints(text) | Self::AltText(text) => text,
            Self::Placeholder => EMOJI_PLACEHOLDER,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct EmojiResolver<'a> {
    table: &'a EmojiTable,
}

impl<'a> EmojiResolver<'a> {
    pub fn new(table: &'a EmojiTable) -> Self {
        Self { table }
    }

    pub fn resolve(&self, src: &str, alt: Option<&str>) -> EmojiResolution {
        if let Some(mapped) = self.table.lookup(src) {
            return EmojiResolution::Mapped(mapped.to_string());
        }

        if let Some(decoded) = decode_filename_codepoints(src) {
            return EmojiResolution::Codepoints(decoded);
        }

        match alt.map(str::trim) {
            Some(alt) if !alt.is_empty() => EmojiResolution::AltText(alt.to_string()),
            _ => EmojiResolution::Placeholder,
        }
    }
}

/// Decode names like `1f1fa-1f1f8.svg` into the characters they spell.
fn decode_filename_codepoints(src: &str) -> Option<String> {
    let without_query = src.split(['?', '#']).next().unwrap_or_default();
    let file_name = without_query.rsplit('/').next().unwrap_or_default();
    let stem = file_name.split('.').next().unwrap_or_default();

    if !CODEPOINTS_RE.is_match(stem) {
        return None;
    }

    let decoded = stem
        .split('-')
        .map(|part| u32::from_str_radix(part, 16).ok().and_then(char::from_u32))
        .collect::<Option<Vec<char>>>()?;

    if decoded.iter().any(|ch| ch.is_control())
        || !decoded.iter().copied().any(is_emoji_scalar)
    {
        return None;
    }

    Some(decoded.into_iter().collect())
}

/// Scalars emoji image names are built from, keycap mark and `©`/`®` included.
fn is_emoji_scalar(ch: char) -> bool {
    matches!(
        u32::from(ch),
        0xA9 | 0xAE | 0x203C..=0x3299 | 0x1F000..=0x1FAFF | 0xE0020..=0xE007F
    )
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::fs;

    use tempfile::tempdir;

    use super::{EmojiMapSource, EmojiResolution, EmojiResolver, EmojiTable, read_emoji_map};

    const FLAG_SRC: &str = "https://abs-0.twimg.com/emoji/v2/svg/1f1fa-1f1f8.svg";

    #[test]
    fn table_entry_wins_over_filename() {
        let table = EmojiTable::from_entries(HashMap::from([(
            "https://abs-0.twimg.com/emoji/v2/svg/2764.svg".to_string(),
            "\u{2764}\u{fe0f}".to_string(),
        )]));
        let resolver = EmojiResolver::new(&table);

        let resolved = resolver.resolve("https://abs-0.twimg.com/emoji/v2/svg/2764.svg", None);
        assert_eq!(resolved, EmojiResolution::Mapped("\u{2764}\u{fe0f}".to_string()));
    }

    #[test]
    fn filename_codepoints_decode_sequences() {
        let table = EmojiTable::NotLoaded;
        let resolved = EmojiResolver::new(&table).resolve(FLAG_SRC, Some("flag"));
        assert_eq!(resolved.as_text(), "\u{1f1fa}\u{1f1f8}");
    }

    #[test]
    fn falls_back_to_alt_then_placeholder() {
        let table = EmojiTable::Empty;
        let resolver = EmojiResolver::new(&table);

        let alt = resolver.resolve("https://cdn.example.com/emoji/party_parrot.gif", Some(" :parrot: "));
        assert_eq!(alt, EmojiResolution::AltText(":parrot:".to_string()));

        let none = resolver.resolve("https://cdn.example.com/emoji/party_parrot.gif", Some("  "));
        assert_eq!(none, EmojiResolution::Placeholder);
        assert_eq!(none.as_text(), "[emoji]");
    }

    #[test]
    fn short_hex_filename_falls_back_to_alt() {
        let table = EmojiTable::NotLoaded;
        let resolved =
            EmojiResolver::new(&table).resolve("https://cdn.example.com/emoji/a.png", Some(":a:"));
        assert_eq!(resolved, EmojiResolution::AltText(":a:".to_string()));
    }

    #[test]
    fn hex_word_filename_falls_back_to_alt() {
        let table = EmojiTable::NotLoaded;
        let resolved = EmojiResolver::new(&table)
            .resolve("https://cdn.example.com/emoji/bad.gif", Some(":bad:"));
        assert_eq!(resolved, EmojiResolution::AltText(":bad:".to_string()));

        let control = EmojiResolver::new(&table)
            .resolve("https://cdn.example.com/emoji/0a-1f44d.png", Some("x"));
        assert_eq!(control, EmojiResolution::AltText("x".to_string()));
    }

    #[test]
    fn short_twemoji_names_still_decode() {
        let table = EmojiTable::NotLoaded;
        let resolver = EmojiResolver::new(&table);

        assert_eq!(
            resolver.resolve("https://abs-0.twimg.com/emoji/v2/svg/a9.svg", None),
            EmojiResolution::Codepoints("\u{a9}".to_string())
        );
        assert_eq!(
            resolver
                .resolve("https://abs-0.twimg.com/emoji/v2/svg/23-20e3.svg", None)
                .as_text(),
            "#\u{20e3}"
        );
    }

    #[test]
    fn invalid_codepoint_is_not_decoded() {
        let table = EmojiTable::NotLoaded;
        let resolved =
            EmojiResolver::new(&table).resolve("https://cdn.example.com/d800.png", Some("x"));
        assert_eq!(resolved, EmojiResolution::AltText("x".to_string()));
    }

    #[test]
    fn map_source_loads_once() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("emoji-map.json");
        fs::write(&path, r#"{"https://e.example/a.png":"A"}"#).expect("write");

        let source = EmojiMapSource::new(Some(path.clone()));
        assert!(!source.is_initialized());
        assert_eq!(source.table().lookup("https://e.example/a.png"), Some("A"));

        fs::write(&path, r#"{"https://e.example/a.png":"B"}"#).expect("rewrite");
        assert_eq!(source.table().lookup("https://e.example/a.png"), Some("A"));
    }

    #[test]
    fn map_source_missing_file_is_not_loaded() {
        let temp = tempdir().expect("tempdir");
        let source = EmojiMapSource::new(Some(temp.path().join("missing.json")));
        assert_eq!(source.table(), &EmojiTable::NotLoaded);
        assert_eq!(EmojiMapSource::new(None).table(), &EmojiTable::NotLoaded);
    }

    #[test]
    fn empty_map_is_loaded_empty() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("emoji-map.json");
        fs::write(&path, "{}").expect("write");

        assert_eq!(read_emoji_map(&path).expect("read"), EmojiTable::Empty);
    }

    #[test]
    fn invalid_map_reports_path() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("emoji-map.json");
        fs::write(&path, "[1,2]").expect("write");

        let err = read_emoji_map(&path).expect_err("must fail");
        assert!(format!("{err}").contains("invalid emoji map"));
        assert_eq!(EmojiMapSource::new(Some(path)).table(), &EmojiTable::NotLoaded);
    }
}
