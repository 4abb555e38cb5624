use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReplytreeError {
    #[error("invalid handle: {0}")]
    InvalidHandle(String),

    #[error("unknown thread shape: {0}")]
    InvalidShape(String),

    #[error("cannot determine home directory")]
    HomeDirectoryNotFound,

    #[error("capture is empty: {path}")]
    EmptyCapture { path: PathBuf },

    #[error("capture file is not valid UTF-8: {path}")]
    NonUtf8Capture { path: PathBuf },

    #[error("invalid capture {path}: {reason}")]
    InvalidCapture { path: PathBuf, reason: String },

    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("sqlite error on {path}: {source}")]
    Sqlite {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("invalid json in {path}: {source}")]
    InvalidJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid json line in {path} at line {line}: {source}")]
    InvalidJsonLine {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid emoji map {path}: {source}")]
    InvalidEmojiMap {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, ReplytreeError>;
