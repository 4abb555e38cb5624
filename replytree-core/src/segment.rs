use crate::model::{PostRecord, Section};

/// Split a capture into sections, one per root post by `owner`.
///
/// Posts seen before the first root have no section to join and are dropped.
pub fn segment_sections(records: &[PostRecord], owner: &str) -> Vec<Section> {
    let mut sections = Vec::new();
    let mut current = None::<Section>;
    let mut leading = 0usize;

    for record in records {
        if record.is_root_for(owner) {
            if let Some(section) = current.take() {
                sections.push(section);
            }
            current = Some(Section {
                root: record.clone(),
                comments: Vec::new(),
            });
            continue;
        }

        match current.as_mut() {
            Some(section) => section.comments.push(record.clone()),
            None => leading += 1,
        }
    }

    if let Some(section) = current {
        sections.push(section);
    }

    if leading > 0 {
        tracing::debug!(leading, "dropped posts captured before the first root post");
    }

    sections
}
