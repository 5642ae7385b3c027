use chrono::{DateTime, Utc};

/// The two document formats the portal serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Htm,
    Pdf,
}

/// A single document discovered for a bill. `name` is the portal's label and
/// is the join key used by every downstream stage — it must be unique within
/// a bill.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Document {
    pub name: String,
    pub url: String,
    pub kind: DocumentKind,
    pub text: Option<String>,
    pub fetched_at: Option<DateTime<Utc>>,
}

impl Document {
    pub fn new(name: impl Into<String>, url: impl Into<String>, kind: DocumentKind) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            kind,
            text: None,
            fetched_at: None,
        }
    }

    /// The text file name this document's extracted content is persisted under.
    pub fn text_filename(&self) -> String {
        format!("{}.txt", self.name)
    }
}

/// Derived document type, classified purely from `name` per the rules in
/// spec.md §4.2. Never stored as authority — always recomputed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum DocumentType {
    Introduction,
    Amendment,
    CommitteeReport,
    Testimony,
    Other,
}

const COMMITTEE_REPORT_TOKENS: &[&str] = &["HSCR", "SSCR", "CCR", "SCR", "HCR"];

fn has_amendment_token(name: &str) -> bool {
    // Matches HD\d|SD\d|CD\d|HFA\d|SFA\d without pulling in regex for a
    // pattern this shaped: a two/three-letter prefix immediately followed by
    // a digit, bounded by `_` or end of string on both sides.
    let prefixes = ["HD", "SD", "CD", "HFA", "SFA"];
    for segment in name.split('_') {
        for prefix in prefixes {
            if let Some(rest) = segment.strip_prefix(prefix) {
                if rest.chars().next().is_some_and(|c| c.is_ascii_digit()) {
                    return true;
                }
            }
        }
    }
    false
}

/// Classify a document purely by its `name`, per spec.md §4.2.
pub fn classify(name: &str) -> DocumentType {
    if name.contains("TESTIMONY") {
        return DocumentType::Testimony;
    }
    if COMMITTEE_REPORT_TOKENS
        .iter()
        .any(|token| name.contains(token))
    {
        return DocumentType::CommitteeReport;
    }
    if has_amendment_token(name) {
        return DocumentType::Amendment;
    }
    // Bill introduction: `{chamber}B{number}` with no further underscored
    // modifier, e.g. `HB1483` or `HB1483_`.
    let trimmed = name.trim_end_matches('_');
    if !trimmed.contains('_') {
        return DocumentType::Introduction;
    }
    DocumentType::Other
}

/// Strip the suffixes documents acquire on disk (`.txt`, `.PDF.txt`,
/// `.HTM.txt`) so a `MoneyOccurrence.filename` can be compared against a
/// timeline document name. Per spec.md §4.6.
pub fn strip_text_suffix(filename: &str) -> &str {
    for suffix in [".HTM.txt", ".PDF.txt", ".htm.txt", ".pdf.txt", ".txt"] {
        if let Some(stripped) = filename.strip_suffix(suffix) {
            return stripped;
        }
    }
    filename
}

/// The version/kind indicators that must not appear in the suffix past
/// `N + "_"` for a later document's numbers to "belong" to an earlier
/// document name `N` under spec.md §4.6 rule (2).
pub const VERSION_OR_KIND_INDICATORS: &[&str] = &[
    "CD1", "CD2", "CD3", "HD1", "HD2", "HD3", "SD1", "SD2", "SD3", "TESTIMONY", "HSCR", "SSCR",
    "CCR",
];

/// Does filename `f` (after suffix-stripping) "belong to" a processed
/// document name `n`, per the two-branch rule of spec.md §4.6?
pub fn document_name_matches(f: &str, n: &str) -> bool {
    if f == n {
        return true;
    }
    let Some(rest) = f.strip_prefix(n).and_then(|r| r.strip_prefix('_')) else {
        return false;
    };
    !VERSION_OR_KIND_INDICATORS
        .iter()
        .any(|indicator| rest.contains(indicator))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_introduction() {
        assert_eq!(classify("HB1483"), DocumentType::Introduction);
        assert_eq!(classify("HB1483_"), DocumentType::Introduction);
    }

    #[test]
    fn classifies_testimony() {
        assert_eq!(
            classify("HB1483_HD1_TESTIMONY_FIN_02-25-25_"),
            DocumentType::Testimony
        );
    }

    #[test]
    fn classifies_committee_report() {
        assert_eq!(classify("HB1483_HD1_HSCR629_"), DocumentType::CommitteeReport);
        assert_eq!(classify("HB1483_CD1_CCR233_"), DocumentType::CommitteeReport);
    }

    #[test]
    fn classifies_amendment() {
        assert_eq!(classify("HB1483_HD1"), DocumentType::Amendment);
        assert_eq!(classify("HB1483_CD1_HFA7"), DocumentType::Amendment);
    }

    #[test]
    fn falls_back_to_other() {
        assert_eq!(classify("HB1483_MISC_NOTE"), DocumentType::Other);
    }

    #[test]
    fn strips_known_text_suffixes() {
        assert_eq!(strip_text_suffix("HB1483.PDF.txt"), "HB1483");
        assert_eq!(strip_text_suffix("HB1483.HTM.txt"), "HB1483");
        assert_eq!(strip_text_suffix("HB1483.txt"), "HB1483");
    }

    #[test]
    fn matches_exact_and_safe_prefix() {
        assert!(document_name_matches("HB1", "HB1"));
        assert!(document_name_matches("HB1_HD1", "HB1"));
        assert!(!document_name_matches(
            "HB1_HD1_HSCR7",
            "HB1"
        ));
    }

    #[test]
    fn rejects_unrelated_prefix() {
        assert!(!document_name_matches("HB10", "HB1"));
    }
}
