use std::collections::BTreeMap;

use crate::document::DocumentType;
use crate::money::MoneyOccurrence;

/// The 12 fiscal-note section keys, in the fixed order spec.md §6 defines.
pub const SECTION_KEYS: [&str; 12] = [
    "overview",
    "appropriations",
    "assumptions_and_methodology",
    "agency_impact",
    "economic_impact",
    "policy_impact",
    "revenue_sources",
    "six_year_fiscal_implications",
    "operating_revenue_impact",
    "capital_expenditure_impact",
    "fiscal_implications_after_6_years",
    "updates_from_previous_fiscal_note",
];

/// A fiscal note body: the 12 fixed section keys mapped to narrative
/// strings. Uses a struct (not a raw map) so the schema the LLM is asked to
/// fill is statically known everywhere the note is handled.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FiscalNote {
    pub overview: String,
    pub appropriations: String,
    pub assumptions_and_methodology: String,
    pub agency_impact: String,
    pub economic_impact: String,
    pub policy_impact: String,
    pub revenue_sources: String,
    pub six_year_fiscal_implications: String,
    pub operating_revenue_impact: String,
    pub capital_expenditure_impact: String,
    pub fiscal_implications_after_6_years: String,
    pub updates_from_previous_fiscal_note: String,
}

impl FiscalNote {
    /// Iterate `(section_key, body)` pairs in the canonical §6 order.
    pub fn sections(&self) -> [(&'static str, &str); 12] {
        [
            ("overview", &self.overview),
            ("appropriations", &self.appropriations),
            ("assumptions_and_methodology", &self.assumptions_and_methodology),
            ("agency_impact", &self.agency_impact),
            ("economic_impact", &self.economic_impact),
            ("policy_impact", &self.policy_impact),
            ("revenue_sources", &self.revenue_sources),
            (
                "six_year_fiscal_implications",
                &self.six_year_fiscal_implications,
            ),
            ("operating_revenue_impact", &self.operating_revenue_impact),
            (
                "capital_expenditure_impact",
                &self.capital_expenditure_impact,
            ),
            (
                "fiscal_implications_after_6_years",
                &self.fiscal_implications_after_6_years,
            ),
            (
                "updates_from_previous_fiscal_note",
                &self.updates_from_previous_fiscal_note,
            ),
        ]
    }

    /// Mutable access to a section body by key, used by the attribution
    /// enhancer to rewrite citations in place.
    pub fn section_mut(&mut self, key: &str) -> Option<&mut String> {
        match key {
            "overview" => Some(&mut self.overview),
            "appropriations" => Some(&mut self.appropriations),
            "assumptions_and_methodology" => Some(&mut self.assumptions_and_methodology),
            "agency_impact" => Some(&mut self.agency_impact),
            "economic_impact" => Some(&mut self.economic_impact),
            "policy_impact" => Some(&mut self.policy_impact),
            "revenue_sources" => Some(&mut self.revenue_sources),
            "six_year_fiscal_implications" => Some(&mut self.six_year_fiscal_implications),
            "operating_revenue_impact" => Some(&mut self.operating_revenue_impact),
            "capital_expenditure_impact" => Some(&mut self.capital_expenditure_impact),
            "fiscal_implications_after_6_years" => {
                Some(&mut self.fiscal_implications_after_6_years)
            }
            "updates_from_previous_fiscal_note" => {
                Some(&mut self.updates_from_previous_fiscal_note)
            }
            _ => None,
        }
    }
}

/// Metadata recorded alongside each emitted note.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct NoteMetadata {
    pub bill: String,
    pub checkpoint_document: String,
    pub predecessors: Vec<String>,
    pub numbers_used: usize,
    pub generated_at: chrono::DateTime<chrono::Utc>,
    pub prev_note_digest: Option<String>,
}

/// A money occurrence as cited from a note, decorated with the document
/// type it came from (used for attribution and prompt phrasing).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CitedMoney {
    pub amount: f64,
    pub filename: String,
    pub context: String,
    pub doc_type: DocumentType,
}

impl From<(MoneyOccurrence, DocumentType)> for CitedMoney {
    fn from((occurrence, doc_type): (MoneyOccurrence, DocumentType)) -> Self {
        CitedMoney {
            amount: occurrence.amount,
            filename: occurrence.filename,
            context: occurrence.context,
            doc_type,
        }
    }
}

/// The two parallel per-bill integer namespaces described in spec.md §3/§6:
/// `docnum -> document name` and `numnum -> money occurrence`.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct CitationMap {
    pub documents: BTreeMap<u32, String>,
    pub numbers: BTreeMap<u32, CitedMoney>,
}

impl CitationMap {
    /// Assign (or fetch) the stable docnum for `name`, in discovery order.
    pub fn docnum_for(&mut self, name: &str) -> u32 {
        if let Some((&id, _)) = self.documents.iter().find(|(_, n)| n.as_str() == name) {
            return id;
        }
        let next = self.documents.keys().max().copied().unwrap_or(0) + 1;
        self.documents.insert(next, name.to_string());
        next
    }

    /// Assign the next numnum for a cited money occurrence.
    pub fn numnum_for(&mut self, money: CitedMoney) -> u32 {
        let next = self.numbers.keys().max().copied().unwrap_or(0) + 1;
        self.numbers.insert(next, money);
        next
    }
}

/// One attributed source passage for a generated sentence.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct AttributedChunk {
    pub filename: String,
    pub chunk_text: String,
    pub score: f32,
}

/// Per-sentence attribution record: zero or one best-scoring source passage.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SentenceAttribution {
    pub sentence_text: String,
    pub attributed_chunks: Vec<AttributedChunk>,
    pub best_chunk_index: Option<usize>,
}

/// A section's change classification relative to the prior checkpoint, per
/// spec.md §4.9.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Unchanged,
    Added,
    Revised,
    Removed,
}

/// One section's entry in a checkpoint's change ledger.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SectionChange {
    pub section: String,
    pub kind: ChangeKind,
    pub changed_sentences: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn docnum_is_stable_and_sequential() {
        let mut map = CitationMap::default();
        assert_eq!(map.docnum_for("HB1483"), 1);
        assert_eq!(map.docnum_for("HB1483_HD1"), 2);
        assert_eq!(map.docnum_for("HB1483"), 1);
    }

    #[test]
    fn section_mut_reaches_every_key() {
        let mut note = FiscalNote::default();
        for key in SECTION_KEYS {
            let slot = note.section_mut(key).expect("known key");
            *slot = format!("{key}-body");
        }
        assert_eq!(note.overview, "overview-body");
        assert_eq!(
            note.updates_from_previous_fiscal_note,
            "updates_from_previous_fiscal_note-body"
        );
    }
}
