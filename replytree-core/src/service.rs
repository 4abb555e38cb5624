use std::path::Path;

use crate::capture::{dedup_records, read_capture};
use crate::checkpoint::{apply_checkpoint, next_checkpoint};
use crate::emoji::EmojiMapSource;
use crate::error::Result;
use crate::flatten::{join_sections, policy_for};
use crate::group::{Attribution, group_threads};
use crate::model::{Checkpoint, DocumentEntry, DocumentReport, FlattenShape, PostRecord};
use crate::render::{DEFAULT_INDENT, RenderStyle, render_document};
use crate::segment::segment_sections;
use crate::text::VideoDomains;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOptions {
    /// Handle of the tracked profile whose timeline was captured.
    pub owner: String,
    pub indent: String,
    pub shape: FlattenShape,
    pub attribution: Attribution,
    pub video_domains: VideoDomains,
}

impl RenderOptions {
    pub fn new(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            indent: DEFAULT_INDENT.to_string(),
            shape: FlattenShape::default(),
            attribution: Attribution::default(),
            video_domains: VideoDomains::default(),
        }
    }
}

/// Segment, group and flatten a capture into document entries.
pub fn build_entries(
    records: &[PostRecord],
    options: &RenderOptions,
    warnings: &mut Vec<String>,
) -> Vec<DocumentEntry> {
    let records = dedup_records(records.to_vec(), warnings);
    let sections = segment_sections(&records, &options.owner);
    let policy = policy_for(options.shape);

    let mut flattened = Vec::with_capacity(sections.len());
    for section in &sections {
        let mut attributor = options.attribution.attributor();
        let grouping = group_threads(&section.comments, &options.owner, attributor.as_mut());
        if options.shape == FlattenShape::TwoLevel {
            for orphan in &grouping.orphans {
                tracing::debug!(id = %orphan.id, root = %section.root.id, "dropping unattributed owner reply");
                warnings.push(format!(
                    "dropped owner reply {} with no preceding post to answer",
                    orphan.id
                ));
            }
        }
        tracing::debug!(
            root = %section.root.id,
            comments = section.comments.len(),
            threads = grouping.threads.len(),
            "flattening section"
        );
        flattened.push(policy.flatten_section(section, &grouping));
    }

    join_sections(flattened)
}

pub fn render_records(
    records: &[PostRecord],
    options: &RenderOptions,
    emoji: &EmojiMapSource,
) -> DocumentReport {
    let mut warnings = Vec::new();
    let entries = build_entries(records, options, &mut warnings);
    let style = RenderStyle {
        indent: &options.indent,
        resolver: emoji.resolver(),
        video_domains: &options.video_domains,
    };

    DocumentReport {
        markdown: render_document(&entries, &style),
        section_count: entries
            .iter()
            .filter(|entry| matches!(entry, DocumentEntry::Separator))
            .count()
            + usize::from(!entries.is_empty()),
        post_count: entries
            .iter()
            .filter(|entry| entry.as_post().is_some())
            .count(),
        checkpoint: next_checkpoint(records),
        warnings,
    }
}

/// Read a capture from disk, resume from `checkpoint` when given, and render it.
pub fn render_capture(
    path: &Path,
    options: &RenderOptions,
    emoji: &EmojiMapSource,
    checkpoint: Option<&Checkpoint>,
) -> Result<DocumentReport> {
    let capture = read_capture(path)?;
    let mut warnings = capture.warnings;
    let resume_from = next_checkpoint(&capture.records);

    let records = match checkpoint {
        Some(checkpoint) => apply_checkpoint(capture.records, checkpoint, &mut warnings),
        None => capture.records,
    };

    let mut report = render_records(&records, options, emoji);
    warnings.append(&mut report.warnings);
    report.warnings = warnings;
    report.checkpoint = resume_from;
    Ok(report)
}
