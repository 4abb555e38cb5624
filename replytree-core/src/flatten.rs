use crate::group::Grouping;
use crate::model::{
    CONTINUATION_DEPTH, DocumentEntry, FlattenShape, OPENER_DEPTH, PostRecord, ROOT_DEPTH,
    RenderedPost, Section,
};

/// Turns one section into its ordered, depth-annotated posts.
pub trait FlattenPolicy {
    fn flatten_section(&self, section: &Section, grouping: &Grouping) -> Vec<RenderedPost>;
}

/// Root at depth 0, each thread's first post at depth 1 and the rest at 2.
#[derive(Debug, Clone, Copy, Default)]
pub struct TwoLevel;

/// Unbounded nesting driven by the `has_replies` chain markers.
#[derive(Debug, Clone, Copy, Default)]
pub struct Nested;

pub fn policy_for(shape: FlattenShape) -> Box<dyn FlattenPolicy> {
    match shape {
        FlattenShape::TwoLevel => Box::new(TwoLevel),
        FlattenShape::Nested => Box::new(Nested),
    }
}

impl FlattenPolicy for TwoLevel {
    fn flatten_section(&self, section: &Section, grouping: &Grouping) -> Vec<RenderedPost> {
        let mut threads = grouping.threads.iter().collect::<Vec<_>>();
        threads.sort_by(|left, right| left.start_timestamp().cmp(right.start_timestamp()));

        let mut posts = vec![root_entry(&section.root)];
        for (thread_idx, thread) in threads.into_iter().enumerate() {
            for (comment_idx, entry) in thread.posts.iter().enumerate() {
                posts.push(RenderedPost {
                    post: entry.post().clone(),
                    depth: if comment_idx == 0 {
                        OPENER_DEPTH
                    } else {
                        CONTINUATION_DEPTH
                    },
                    thread_number: thread_idx + 1,
                    comment_number: comment_idx + 1,
                    parent_id: entry.parent_id().map(ToString::to_string),
                });
            }
        }

        posts
    }
}

impl FlattenPolicy for Nested {
    fn flatten_section(&self, section: &Section, _grouping: &Grouping) -> Vec<RenderedPost> {
        let mut posts = vec![root_entry(&section.root)];
        let mut chain = Vec::<&PostRecord>::new();
        let mut thread_number = 0;
        let mut comment_number = 0;

        for post in &section.comments {
            if !post.is_reply {
                chain.clear();
            }
            if chain.is_empty() {
                thread_number += 1;
                comment_number = 0;
            }
            comment_number += 1;

            posts.push(RenderedPost {
                post: post.clone(),
                depth: OPENER_DEPTH + chain.len(),
                thread_number,
                comment_number,
                parent_id: chain.last().map(|parent| parent.id.clone()),
            });

            if post.has_replies {
                chain.push(post);
            } else {
                chain.clear();
            }
        }

        posts
    }
}

fn root_entry(root: &PostRecord) -> RenderedPost {
    RenderedPost {
        post: root.clone(),
        depth: ROOT_DEPTH,
        thread_number: 0,
        comment_number: 0,
        parent_id: None,
    }
}

/// Concatenate flattened sections with a separator between neighbours.
pub fn join_sections(sections: Vec<Vec<RenderedPost>>) -> Vec<DocumentEntry> {
    let mut entries = Vec::new();
    for (idx, posts) in sections.into_iter().enumerate() {
        if idx > 0 {
            entries.push(DocumentEntry::Separator);
        }
        entries.extend(posts.into_iter().map(DocumentEntry::Post));
    }
    entries
}
