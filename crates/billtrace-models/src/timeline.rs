/// One entry of the chronologically authoritative timeline: a status event
/// decorated with the document names attached to it. Per spec.md §3/§4.3.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TimelineEntry {
    pub date: String,
    pub text: String,
    pub documents: Vec<String>,
}

/// The full ordered timeline for a bill.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Timeline {
    pub entries: Vec<TimelineEntry>,
    /// Set when validation failed twice and the resolver fell back to a
    /// deterministic ordering (spec.md §4.3).
    #[serde(default)]
    pub chronology_degraded: bool,
}

impl Timeline {
    /// Document names in the order they first appear across all entries —
    /// the traversal order the pipeline processes documents in.
    pub fn document_order(&self) -> Vec<&str> {
        self.entries
            .iter()
            .flat_map(|entry| entry.documents.iter().map(String::as_str))
            .collect()
    }

    /// Every document name named anywhere in the timeline, as a set.
    pub fn document_set(&self) -> std::collections::HashSet<&str> {
        self.document_order().into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_order_follows_entry_order() {
        let timeline = Timeline {
            entries: vec![
                TimelineEntry {
                    date: "1/1/2025".into(),
                    text: "Introduced".into(),
                    documents: vec!["HB1".into()],
                },
                TimelineEntry {
                    date: "2/1/2025".into(),
                    text: "Passed first reading".into(),
                    documents: vec!["HB1_HD1".into(), "HB1_HD1_HSCR7".into()],
                },
            ],
            chronology_degraded: false,
        };
        assert_eq!(
            timeline.document_order(),
            vec!["HB1", "HB1_HD1", "HB1_HD1_HSCR7"]
        );
    }
}
