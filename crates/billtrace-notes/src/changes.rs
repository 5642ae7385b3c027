//! Stage I: the chronological change tracker. Diffs a checkpoint's note
//! against the previous checkpoint's, per spec.md §4.9.

use std::collections::HashSet;

use billtrace_models::{ChangeKind, FiscalNote, SectionChange, SECTION_KEYS};

/// Diffs `current` against `previous` (the prior checkpoint's note, if any)
/// and returns one [`SectionChange`] per section key, in §6 order.
///
/// A section is `unchanged` if its normalized sentence set equals the
/// prior's; `added` if the prior was empty; `removed` if current is empty;
/// `revised` otherwise.
pub fn diff_notes(previous: Option<&FiscalNote>, current: &FiscalNote) -> Vec<SectionChange> {
    SECTION_KEYS
        .iter()
        .map(|&key| {
            let prior_body = previous
                .and_then(|n| n.sections().into_iter().find(|(k, _)| *k == key))
                .map(|(_, body)| body)
                .unwrap_or("");
            let current_body = current
                .sections()
                .into_iter()
                .find(|(k, _)| *k == key)
                .map(|(_, body)| body)
                .unwrap_or("");
            diff_section(key, prior_body, current_body)
        })
        .collect()
}

fn diff_section(key: &str, prior_body: &str, current_body: &str) -> SectionChange {
    let prior_sentences = normalized_sentence_set(prior_body);
    let current_sentences = normalized_sentence_set(current_body);

    let kind = if prior_sentences.is_empty() && current_sentences.is_empty() {
        ChangeKind::Unchanged
    } else if prior_sentences == current_sentences {
        ChangeKind::Unchanged
    } else if prior_sentences.is_empty() {
        ChangeKind::Added
    } else if current_sentences.is_empty() {
        ChangeKind::Removed
    } else {
        ChangeKind::Revised
    };

    let changed_sentences = match kind {
        ChangeKind::Unchanged => Vec::new(),
        ChangeKind::Removed => Vec::new(),
        ChangeKind::Added | ChangeKind::Revised => current_sentences
            .difference(&prior_sentences)
            .cloned()
            .collect(),
    };

    SectionChange {
        section: key.to_string(),
        kind,
        changed_sentences,
    }
}

/// Splits a section body into sentences and normalizes whitespace in each,
/// so trivial reformatting doesn't register as a change.
fn normalized_sentence_set(body: &str) -> HashSet<String> {
    body.split(['.', '!', '?'])
        .map(|s| s.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note_with(overview: &str) -> FiscalNote {
        let mut note = FiscalNote::default();
        note.overview = overview.to_string();
        note
    }

    #[test]
    fn empty_to_empty_is_unchanged() {
        let prior = FiscalNote::default();
        let current = FiscalNote::default();
        let changes = diff_notes(Some(&prior), &current);
        let overview = changes.iter().find(|c| c.section == "overview").unwrap();
        assert_eq!(overview.kind, ChangeKind::Unchanged);
    }

    #[test]
    fn first_checkpoint_with_no_previous_note_is_added() {
        let current = note_with("The bill appropriates funds.");
        let changes = diff_notes(None, &current);
        let overview = changes.iter().find(|c| c.section == "overview").unwrap();
        assert_eq!(overview.kind, ChangeKind::Added);
        assert_eq!(overview.changed_sentences.len(), 1);
    }

    #[test]
    fn identical_bodies_are_unchanged_modulo_whitespace() {
        let prior = note_with("The bill   appropriates funds.");
        let current = note_with("The bill appropriates funds.");
        let changes = diff_notes(Some(&prior), &current);
        let overview = changes.iter().find(|c| c.section == "overview").unwrap();
        assert_eq!(overview.kind, ChangeKind::Unchanged);
    }

    #[test]
    fn new_sentence_marks_section_revised() {
        let prior = note_with("The bill appropriates funds.");
        let current = note_with("The bill appropriates funds. A new hearing was held.");
        let changes = diff_notes(Some(&prior), &current);
        let overview = changes.iter().find(|c| c.section == "overview").unwrap();
        assert_eq!(overview.kind, ChangeKind::Revised);
        assert_eq!(overview.changed_sentences, vec!["A new hearing was held"]);
    }

    #[test]
    fn emptied_section_is_removed() {
        let prior = note_with("The bill appropriates funds.");
        let current = note_with("");
        let changes = diff_notes(Some(&prior), &current);
        let overview = changes.iter().find(|c| c.section == "overview").unwrap();
        assert_eq!(overview.kind, ChangeKind::Removed);
    }
}
