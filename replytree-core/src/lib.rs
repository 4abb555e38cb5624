pub mod capture;
pub mod checkpoint;
pub mod config;
pub mod emoji;
pub mod error;
pub mod flatten;
pub mod group;
pub mod model;
pub mod permalink;
pub mod render;
pub mod segment;
pub mod service;
pub mod text;

pub use capture::{Capture, read_capture};
pub use checkpoint::{CheckpointStore, apply_checkpoint, next_checkpoint};
pub use config::StatePaths;
pub use emoji::{EmojiMapSource, EmojiResolver, EmojiTable};
pub use error::{ReplytreeError, Result};
pub use flatten::{FlattenPolicy, Nested, TwoLevel};
pub use group::{AdjacentAnchor, Attribution, KnownParents, ReplyAttribution};
pub use model::{
    Checkpoint, DocumentEntry, DocumentReport, FlattenShape, PostRecord, RenderedPost, Section,
    TextToken, Thread, ThreadPost,
};
pub use permalink::{normalize_permalink, parse_handle};
pub use service::{RenderOptions, build_entries, render_capture, render_records};
pub use text::VideoDomains;
