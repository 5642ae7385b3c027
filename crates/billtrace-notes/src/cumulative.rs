//! The checkpoint predicate and visible-numbers rule that drive the
//! generator's state machine, per spec.md §4.6.

use std::collections::HashSet;

use billtrace_models::document::{document_name_matches, strip_text_suffix};
use billtrace_models::{Document, MoneyOccurrence};

/// A note is emitted after appending `document` iff it's the first document
/// overall, or its URL contains `CommReports` (a committee report was
/// published). Amendments alone never trigger emission.
pub fn is_checkpoint(index: usize, document: &Document) -> bool {
    index == 0 || document.url.contains("CommReports")
}

/// The subset of `numbers` visible at a checkpoint: those whose `filename`
/// matches a document name already in `processed`, per the two-branch rule
/// of spec.md §4.6. This is the invariant that keeps later-version numbers
/// from leaking into an earlier checkpoint's note.
pub fn visible_numbers<'a>(
    numbers: &'a [MoneyOccurrence],
    processed: &HashSet<&str>,
) -> Vec<&'a MoneyOccurrence> {
    numbers
        .iter()
        .filter(|occurrence| {
            let stripped = strip_text_suffix(&occurrence.filename);
            processed
                .iter()
                .any(|name| document_name_matches(stripped, name))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use billtrace_models::{Currency, DocumentKind};

    fn doc(name: &str, url: &str) -> Document {
        Document::new(name, url, DocumentKind::Htm)
    }

    fn money(filename: &str, amount: f64) -> MoneyOccurrence {
        MoneyOccurrence {
            amount,
            currency: Currency::Usd,
            filename: filename.to_string(),
            context: String::new(),
            offset_chars: 0,
        }
    }

    #[test]
    fn first_document_is_always_a_checkpoint() {
        assert!(is_checkpoint(0, &doc("HB1", "https://x/HB1.htm")));
    }

    #[test]
    fn committee_report_url_triggers_checkpoint() {
        assert!(is_checkpoint(
            2,
            &doc("HB1_HD1_HSCR7", "https://x/CommReports/HSCR7.htm")
        ));
    }

    #[test]
    fn amendment_alone_does_not_trigger_checkpoint() {
        assert!(!is_checkpoint(1, &doc("HB1_HD1", "https://x/HB1_HD1.htm")));
    }

    #[test]
    fn number_leak_guard_excludes_later_documents() {
        let numbers = vec![
            money("HB1.txt", 100.0),
            money("HB1_HD1.txt", 200.0),
            money("HB1_HD1_HSCR7.txt", 300.0),
        ];
        let processed: HashSet<&str> = ["HB1"].into_iter().collect();
        let visible = visible_numbers(&numbers, &processed);
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].amount, 100.0);
    }

    #[test]
    fn all_numbers_visible_once_all_processed() {
        let numbers = vec![
            money("HB1.txt", 100.0),
            money("HB1_HD1.txt", 200.0),
            money("HB1_HD1_HSCR7.txt", 300.0),
        ];
        let processed: HashSet<&str> = ["HB1", "HB1_HD1", "HB1_HD1_HSCR7"].into_iter().collect();
        assert_eq!(visible_numbers(&numbers, &processed).len(), 3);
    }
}
