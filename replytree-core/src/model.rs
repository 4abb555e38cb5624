use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ReplytreeError;
use crate::permalink::same_handle;

pub const ROOT_DEPTH: usize = 0;
pub const OPENER_DEPTH: usize = 1;
pub const CONTINUATION_DEPTH: usize = 2;

/// One piece of a captured post body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TextToken {
    Text {
        text: String,
    },
    /// An inline glyph image, resolved to Unicode at render time.
    Emoji {
        src: String,
        #[serde(default)]
        alt: Option<String>,
    },
    Break,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostRecord {
    pub id: String,
    pub author_handle: String,
    pub author_name: String,
    pub avatar_url: Option<String>,
    pub text: Vec<TextToken>,
    pub timestamp: String,
    pub is_reply: bool,
    pub has_replies: bool,
}

impl PostRecord {
    pub fn is_owned_by(&self, owner: &str) -> bool {
        same_handle(&self.author_handle, owner)
    }

    pub fn is_root_for(&self, owner: &str) -> bool {
        self.is_owned_by(owner) && !self.is_reply
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub root: PostRecord,
    pub comments: Vec<PostRecord>,
}

/// A post placed in a thread by the grouper.
///
/// `Anchor` is a non-owner post that owner replies may attach to;
/// `OwnerReply` records which anchor it was attributed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThreadPost {
    Anchor {
        post: PostRecord,
        reply_ids: Vec<String>,
    },
    OwnerReply {
        post: PostRecord,
        parent_id: String,
    },
}

impl ThreadPost {
    pub fn post(&self) -> &PostRecord {
        match self {
            Self::Anchor { post, .. } | Self::OwnerReply { post, .. } => post,
        }
    }

    pub fn into_post(self) -> PostRecord {
        match self {
            Self::Anchor { post, .. } | Self::OwnerReply { post, .. } => post,
        }
    }

    pub fn is_parent(&self) -> bool {
        matches!(self, Self::Anchor { .. })
    }

    pub fn has_reply(&self) -> bool {
        matches!(self, Self::Anchor { reply_ids, .. } if !reply_ids.is_empty())
    }

    pub fn parent_id(&self) -> Option<&str> {
        match self {
            Self::OwnerReply { parent_id, .. } => Some(parent_id),
            Self::Anchor { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thread {
    /// Handle of the non-owner author the thread is keyed on.
    pub handle: String,
    pub posts: Vec<ThreadPost>,
}

impl Thread {
    /// Timestamp of the first non-owner post, or of the first post when the
    /// thread holds none.
    pub fn start_timestamp(&self) -> &str {
        self.posts
            .iter()
            .find(|entry| entry.is_parent())
            .or_else(|| self.posts.first())
            .map_or("", |entry| entry.post().timestamp.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPost {
    pub post: PostRecord,
    pub depth: usize,
    /// 1-based within the section; 0 for the root post.
    pub thread_number: usize,
    /// 1-based within the thread; 0 for the root post.
    pub comment_number: usize,
    pub parent_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentEntry {
    Post(RenderedPost),
    Separator,
}

impl DocumentEntry {
    pub fn as_post(&self) -> Option<&RenderedPost> {
        match self {
            Self::Post(post) => Some(post),
            Self::Separator => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub resume_id: String,
    pub exclusive: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FlattenShape {
    #[default]
    TwoLevel,
    Nested,
}

impl fmt::Display for FlattenShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TwoLevel => write!(f, "two-level"),
            Self::Nested => write!(f, "nested"),
        }
    }
}

impl FromStr for FlattenShape {
    type Err = ReplytreeError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input {
            "two-level" => Ok(Self::TwoLevel),
            "nested" => Ok(Self::Nested),
            _ => Err(ReplytreeError::InvalidShape(input.to_string())),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentReport {
    pub markdown: String,
    pub section_count: usize,
    pub post_count: usize,
    pub checkpoint: Option<Checkpoint>,
    pub warnings: Vec<String>,
}
