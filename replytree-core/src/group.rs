use std::collections::HashMap;

use crate::model::{PostRecord, Thread, ThreadPost};
use crate::permalink::handle_key;

/// Decides which non-owner post an owner reply answers.
///
/// The grouper calls `observe` for every post in stream order, then asks
/// `parent_of` for each owner reply.
pub trait ReplyAttribution {
    fn observe(&mut self, post: &PostRecord, owner: &str);
    fn parent_of(&self, reply: &PostRecord) -> Option<String>;
}

/// Pairs an owner reply with the non-owner post shown right before it.
///
/// The timeline view shows a reply directly under the post it answers, so
/// stream adjacency stands in for a real parent link. A reply to an older,
/// non-adjacent post is attributed to the wrong anchor.
#[derive(Debug, Clone, Default)]
pub struct AdjacentAnchor {
    last_anchor: Option<String>,
}

impl ReplyAttribution for AdjacentAnchor {
    fn observe(&mut self, post: &PostRecord, owner: &str) {
        if !post.is_owned_by(owner) {
            self.last_anchor = Some(post.id.clone());
        }
    }

    fn parent_of(&self, _reply: &PostRecord) -> Option<String> {
        self.last_anchor.clone()
    }
}

/// Explicit reply id to parent id links, for sources that expose them.
#[derive(Debug, Clone, Default)]
pub struct KnownParents {
    links: HashMap<String, String>,
}

impl KnownParents {
    pub fn new(links: HashMap<String, String>) -> Self {
        Self { links }
    }
}

impl ReplyAttribution for KnownParents {
    fn observe(&mut self, _post: &PostRecord, _owner: &str) {}

    fn parent_of(&self, reply: &PostRecord) -> Option<String> {
        self.links.get(&reply.id).cloned()
    }
}

/// Which attribution a render run uses for every section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Attribution {
    #[default]
    Adjacent,
    /// Reply id to parent id, as `KnownParents` takes them.
    Known(HashMap<String, String>),
}

impl Attribution {
    pub fn attributor(&self) -> Box<dyn ReplyAttribution> {
        match self {
            Self::Adjacent => Box::new(AdjacentAnchor::default()),
            Self::Known(links) => Box::new(KnownParents::new(links.clone())),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Grouping {
    /// Threads in first-seen handle order.
    pub threads: Vec<Thread>,
    /// Owner posts that could not be attributed to any anchor.
    pub orphans: Vec<PostRecord>,
}

pub fn group_threads(
    comments: &[PostRecord],
    owner: &str,
    attribution: &mut dyn ReplyAttribution,
) -> Grouping {
    let mut threads = Vec::<Thread>::new();
    let mut thread_by_handle = HashMap::<String, usize>::new();
    let mut anchor_at = HashMap::<String, (usize, usize)>::new();
    let mut orphans = Vec::new();

    for post in comments {
        if !post.is_owned_by(owner) {
            let thread_idx = *thread_by_handle
                .entry(handle_key(&post.author_handle))
                .or_insert_with(|| {
                    threads.push(Thread {
                        handle: post.author_handle.clone(),
                        posts: Vec::new(),
                    });
                    threads.len() - 1
                });
            let thread = &mut threads[thread_idx];
            anchor_at.insert(post.id.clone(), (thread_idx, thread.posts.len()));
            thread.posts.push(ThreadPost::Anchor {
                post: post.clone(),
                reply_ids: Vec::new(),
            });
            attribution.observe(post, owner);
            continue;
        }

        attribution.observe(post, owner);
        let location = post
            .is_reply
            .then(|| attribution.parent_of(post))
            .flatten()
            .and_then(|parent_id| anchor_at.get(&parent_id).map(|at| (parent_id, *at)));

        let Some((parent_id, (thread_idx, anchor_idx))) = location else {
            tracing::debug!(id = %post.id, "owner reply has no preceding anchor");
            orphans.push(post.clone());
            continue;
        };

        let thread = &mut threads[thread_idx];
        if let ThreadPost::Anchor { reply_ids, .. } = &mut thread.posts[anchor_idx] {
            reply_ids.push(post.id.clone());
        }
        thread.posts.push(ThreadPost::OwnerReply {
            post: post.clone(),
            parent_id,
        });
    }

    for thread in &mut threads {
        thread
            .posts
            .sort_by(|left, right| left.post().timestamp.cmp(&right.post().timestamp));
    }

    Grouping { threads, orphans }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::{AdjacentAnchor, KnownParents, group_threads};
    use crate::model::{PostRecord, ThreadPost};

    fn post(id: &str, handle: &str, timestamp: &str) -> PostRecord {
        PostRecord {
            id: id.to_string(),
            author_handle: handle.to_string(),
            timestamp: timestamp.to_string(),
            is_reply: true,
            ..PostRecord::default()
        }
    }

    #[test]
    fn owner_reply_pairs_with_adjacent_anchor() {
        let comments = vec![
            post("a", "@bob", "2024-01-01T00:00:01.000Z"),
            post("b", "@me", "2024-01-01T00:00:02.000Z"),
        ];

        let grouping = group_threads(&comments, "@me", &mut AdjacentAnchor::default());
        assert_eq!(grouping.threads.len(), 1);
        let thread = &grouping.threads[0];
        assert_eq!(thread.handle, "@bob");
        assert!(thread.posts[0].is_parent());
        assert!(thread.posts[0].has_reply());
        assert_eq!(
            thread.posts[0],
            ThreadPost::Anchor {
                post: comments[0].clone(),
                reply_ids: vec!["b".to_string()],
            }
        );
        assert_eq!(thread.posts[1].parent_id(), Some("a"));
        assert!(grouping.orphans.is_empty());
    }

    #[test]
    fn same_handle_posts_share_a_thread() {
        let comments = vec![
            post("a1", "@bob", "2024-01-01T00:00:01.000Z"),
            post("c1", "@carol", "2024-01-01T00:00:02.000Z"),
            post("a2", "@bob", "2024-01-01T00:00:03.000Z"),
            post("r", "@me", "2024-01-01T00:00:04.000Z"),
        ];

        let grouping = group_threads(&comments, "@me", &mut AdjacentAnchor::default());
        let handles = grouping
            .threads
            .iter()
            .map(|thread| thread.handle.as_str())
            .collect::<Vec<_>>();
        assert_eq!(handles, vec!["@bob", "@carol"]);
        assert_eq!(grouping.threads[0].posts.len(), 3);
        assert_eq!(grouping.threads[0].posts[2].parent_id(), Some("a2"));
        assert!(!grouping.threads[0].posts[0].has_reply());
    }

    #[test]
    fn handle_case_does_not_split_threads() {
        let comments = vec![
            post("a1", "@Bob", "2024-01-01T00:00:01.000Z"),
            post("a2", "bob", "2024-01-01T00:00:02.000Z"),
            post("r", "@Me", "2024-01-01T00:00:03.000Z"),
        ];

        let grouping = group_threads(&comments, "@me", &mut AdjacentAnchor::default());
        assert_eq!(grouping.threads.len(), 1);
        assert_eq!(grouping.threads[0].handle, "@Bob");
        assert_eq!(grouping.threads[0].posts.len(), 3);
        assert_eq!(grouping.threads[0].posts[2].parent_id(), Some("a2"));
    }

    #[test]
    fn empty_handle_forms_its_own_thread() {
        let comments = vec![
            post("x", "", "2024-01-01T00:00:01.000Z"),
            post("c", "@carol", "2024-01-01T00:00:02.000Z"),
            post("x2", "", "2024-01-01T00:00:03.000Z"),
            post("y", "@me", "2024-01-01T00:00:04.000Z"),
        ];

        let grouping = group_threads(&comments, "@me", &mut AdjacentAnchor::default());
        assert_eq!(grouping.threads.len(), 2);
        let unlabeled = &grouping.threads[0];
        assert_eq!(unlabeled.handle, "");
        let ids = unlabeled
            .posts
            .iter()
            .map(|entry| entry.post().id.as_str())
            .collect::<Vec<_>>();
        assert_eq!(ids, vec!["x", "x2", "y"]);
        assert!(unlabeled.posts[1].has_reply());
        assert_eq!(unlabeled.posts[2].parent_id(), Some("x2"));
        assert!(grouping.orphans.is_empty());
    }

    #[test]
    fn orphan_owner_reply_is_dropped() {
        let comments = vec![
            post("r", "@me", "2024-01-01T00:00:01.000Z"),
            post("a", "@bob", "2024-01-01T00:00:02.000Z"),
        ];

        let grouping = group_threads(&comments, "@me", &mut AdjacentAnchor::default());
        assert_eq!(grouping.threads.len(), 1);
        assert_eq!(grouping.threads[0].posts.len(), 1);
        assert_eq!(grouping.orphans.len(), 1);
        assert_eq!(grouping.orphans[0].id, "r");
    }

    #[test]
    fn thread_posts_sort_by_timestamp_with_empty_first() {
        let comments = vec![
            post("a1", "@bob", "2024-01-01T00:00:05.000Z"),
            post("a2", "@bob", ""),
            post("a3", "@bob", "2024-01-01T00:00:01.000Z"),
        ];

        let grouping = group_threads(&comments, "@me", &mut AdjacentAnchor::default());
        let ids = grouping.threads[0]
            .posts
            .iter()
            .map(|entry| entry.post().id.as_str())
            .collect::<Vec<_>>();
        assert_eq!(ids, vec!["a2", "a3", "a1"]);
    }

    #[test]
    fn explicit_parent_links_replace_adjacency() {
        let comments = vec![
            post("a", "@bob", "2024-01-01T00:00:01.000Z"),
            post("c", "@carol", "2024-01-01T00:00:02.000Z"),
            post("r", "@me", "2024-01-01T00:00:03.000Z"),
        ];
        let mut links = KnownParents::new(HashMap::from([("r".to_string(), "a".to_string())]));

        let grouping = group_threads(&comments, "@me", &mut links);
        assert_eq!(grouping.threads[0].posts.len(), 2);
        assert_eq!(grouping.threads[0].posts[1].parent_id(), Some("a"));
        assert_eq!(grouping.threads[1].posts.len(), 1);
    }
}
