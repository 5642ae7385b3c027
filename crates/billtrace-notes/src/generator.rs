//! Stage 5: the central cumulative-context state machine. Walks a bill's
//! timeline in chronological order, accumulating document text, and emits a
//! structured fiscal note at each checkpoint (spec.md §4.6).

use std::collections::{HashMap, HashSet};

use billtrace_llm::LlmClient;
use billtrace_models::document::classify;
use billtrace_models::{Document, DocumentType, FiscalNote, MoneyOccurrence, NoteMetadata, SECTION_KEYS};
use serde_json::json;
use sha2::{Digest, Sha256};
use tracing::{info, instrument, warn};

use crate::cumulative::{is_checkpoint, visible_numbers};
use crate::error::Error;

/// One emitted checkpoint: the note body plus its metadata, ready for the
/// storage crate to persist under `notes/{name}.json` /
/// `notes/{name}_metadata.json`.
#[derive(Debug, Clone)]
pub struct GeneratedNote {
    pub checkpoint_document: String,
    pub note: FiscalNote,
    pub metadata: NoteMetadata,
    /// The visible money occurrences at this checkpoint, carried forward so
    /// the attribution stage (§4.7) doesn't need to recompute them.
    pub visible_numbers: Vec<MoneyOccurrence>,
}

/// Runs the generator over the bill's full document order, per spec.md
/// §4.6. `documents` supplies URL/kind lookups (for the checkpoint
/// predicate) in any order; `texts` supplies each document's extracted
/// plain text, keyed by name. A document present in the timeline but absent
/// from `texts` (extraction failed and an empty file was persisted) simply
/// contributes empty text and zero numbers, per spec.md's boundary case.
#[instrument(skip(llm, documents, texts, numbers), fields(bill))]
pub async fn generate_notes(
    llm: &impl LlmClient,
    bill: &str,
    document_order: &[String],
    documents: &[Document],
    texts: &HashMap<String, String>,
    numbers: &[MoneyOccurrence],
) -> Result<Vec<GeneratedNote>, Error> {
    let by_name: HashMap<&str, &Document> =
        documents.iter().map(|d| (d.name.as_str(), d)).collect();

    let mut cumulative_context = String::new();
    let mut previous_note: Option<FiscalNote> = None;
    let mut processed: Vec<String> = Vec::new();
    let mut results = Vec::new();

    for (index, name) in document_order.iter().enumerate() {
        let text = texts.get(name).map(String::as_str).unwrap_or("");
        cumulative_context.push_str(&format!("=== Document: {name} ===\n{text}\n\n"));
        processed.push(name.clone());

        let Some(document) = by_name.get(name.as_str()) else {
            continue;
        };

        if !is_checkpoint(index, document) {
            continue;
        }

        let processed_set: HashSet<&str> = processed.iter().map(String::as_str).collect();
        let visible: Vec<MoneyOccurrence> = visible_numbers(numbers, &processed_set)
            .into_iter()
            .cloned()
            .collect();

        let note = request_note(
            llm,
            bill,
            name,
            &cumulative_context,
            &visible,
            &by_name,
            previous_note.as_ref(),
        )
        .await?;

        info!(checkpoint = %name, numbers_used = visible.len(), "emitted fiscal note");

        let predecessors: Vec<String> = processed
            .iter()
            .filter(|p| p.as_str() != name.as_str())
            .cloned()
            .collect();

        let metadata = NoteMetadata {
            bill: bill.to_string(),
            checkpoint_document: name.clone(),
            predecessors,
            numbers_used: visible.len(),
            generated_at: chrono::Utc::now(),
            prev_note_digest: previous_note.as_ref().map(digest_note),
        };

        results.push(GeneratedNote {
            checkpoint_document: name.clone(),
            note: note.clone(),
            metadata,
            visible_numbers: visible,
        });

        previous_note = Some(note);
        cumulative_context.clear();
    }

    Ok(results)
}

async fn request_note(
    llm: &impl LlmClient,
    bill: &str,
    checkpoint: &str,
    cumulative_context: &str,
    visible: &[MoneyOccurrence],
    by_name: &HashMap<&str, &Document>,
    previous_note: Option<&FiscalNote>,
) -> Result<FiscalNote, Error> {
    let schema = response_schema();

    for attempt in 0..2 {
        let prompt = build_prompt(cumulative_context, visible, by_name, previous_note, attempt > 0);
        let response = llm.complete_json(&prompt, &schema).await?;

        match serde_json::from_value::<FiscalNote>(response) {
            Ok(note) => return Ok(note),
            Err(err) => {
                warn!(attempt, %err, "fiscal note response failed schema validation");
            }
        }
    }

    Err(Error::SchemaFailure {
        bill: bill.to_string(),
        checkpoint: checkpoint.to_string(),
        reason: "response did not contain all 12 section keys as strings after a repair retry"
            .to_string(),
    })
}

/// Assembles the prompt in the order spec.md §4.6 requires: section-key
/// descriptions, cumulative context, visible-numbers bullets, the citation
/// rule, and (if present) the previous note with a "surface only what
/// changed" instruction.
fn build_prompt(
    cumulative_context: &str,
    visible: &[MoneyOccurrence],
    by_name: &HashMap<&str, &Document>,
    previous_note: Option<&FiscalNote>,
    is_repair: bool,
) -> String {
    let mut prompt = String::new();

    prompt.push_str("Produce a fiscal note as a JSON object with exactly these 12 string-valued keys, in this order:\n");
    for key in SECTION_KEYS {
        prompt.push_str(&format!("- {key}\n"));
    }

    prompt.push_str("\nDocument text accumulated since the last fiscal note:\n");
    prompt.push_str(cumulative_context);

    prompt.push_str("\nAmounts visible at this checkpoint:\n");
    for occurrence in visible {
        let doc_type = document_type_for(&occurrence.filename, by_name);
        prompt.push_str(&format!(
            "- ${:.2} from {} ({})\n",
            occurrence.amount,
            doc_type_label(doc_type),
            occurrence.filename
        ));
    }

    prompt.push_str(
        "\nEvery dollar amount in your response must be followed immediately by \
         (filename) naming the document it came from.\n",
    );

    if let Some(previous) = previous_note {
        prompt.push_str(
            "\nHere is the previously emitted fiscal note. Surface only what has changed since \
             then; do not repeat unchanged material.\n",
        );
        for (key, body) in previous.sections() {
            prompt.push_str(&format!("{key}: {body}\n"));
        }
    }

    if is_repair {
        prompt.push_str(
            "\nYour previous response did not match the required schema. Respond with a single \
             JSON object containing exactly the 12 keys listed above, each a string.\n",
        );
    }

    prompt
}

fn document_type_for(filename: &str, by_name: &HashMap<&str, &Document>) -> DocumentType {
    let stripped = billtrace_models::document::strip_text_suffix(filename);
    by_name
        .get(stripped)
        .map(|d| classify(&d.name))
        .unwrap_or_else(|| classify(stripped))
}

fn doc_type_label(doc_type: DocumentType) -> &'static str {
    match doc_type {
        DocumentType::Introduction => "the introduction",
        DocumentType::Amendment => "an amendment",
        DocumentType::CommitteeReport => "a committee report",
        DocumentType::Testimony => "testimony",
        DocumentType::Other => "a document",
    }
}

fn response_schema() -> serde_json::Value {
    let required: Vec<&str> = SECTION_KEYS.to_vec();
    let properties: serde_json::Map<String, serde_json::Value> = SECTION_KEYS
        .iter()
        .map(|k| (k.to_string(), json!({"type": "string"})))
        .collect();
    json!({
        "type": "object",
        "required": required,
        "properties": properties,
    })
}

fn digest_note(note: &FiscalNote) -> String {
    let mut hasher = Sha256::new();
    for (_, body) in note.sections() {
        hasher.update(body.as_bytes());
        hasher.update(b"\n");
    }
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use billtrace_llm::Error as LlmError;
    use billtrace_models::{Currency, DocumentKind};

    #[derive(Debug)]
    struct FakeLlm {
        responses: std::sync::Mutex<Vec<serde_json::Value>>,
    }

    impl LlmClient for FakeLlm {
        async fn complete_json(
            &self,
            _prompt: &str,
            _schema: &serde_json::Value,
        ) -> Result<serde_json::Value, LlmError> {
            let mut responses = self.responses.lock().unwrap();
            if responses.is_empty() {
                panic!("FakeLlm ran out of canned responses");
            }
            Ok(responses.remove(0))
        }
    }

    fn full_note_json(overview: &str) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        for key in SECTION_KEYS {
            let body = if key == "overview" { overview.to_string() } else { String::new() };
            map.insert(key.to_string(), json!(body));
        }
        serde_json::Value::Object(map)
    }

    #[tokio::test]
    async fn single_introduction_emits_exactly_one_note_with_no_predecessors() {
        let llm = FakeLlm {
            responses: std::sync::Mutex::new(vec![full_note_json("Appropriates $250,000 (HB999)")]),
        };
        let documents = vec![Document::new("HB999", "https://x/HB999.htm", DocumentKind::Htm)];
        let mut texts = HashMap::new();
        texts.insert("HB999".to_string(), "Appropriates $250,000 for pilot.".to_string());
        let numbers = vec![MoneyOccurrence {
            amount: 250000.0,
            currency: Currency::Usd,
            filename: "HB999.txt".to_string(),
            context: "Appropriates $250,000 for pilot.".to_string(),
            offset_chars: 0,
        }];

        let notes = generate_notes(
            &llm,
            "HB_999_2025",
            &["HB999".to_string()],
            &documents,
            &texts,
            &numbers,
        )
        .await
        .unwrap();

        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].metadata.predecessors, Vec::<String>::new());
        assert_eq!(notes[0].metadata.numbers_used, 1);
        assert!(notes[0].metadata.prev_note_digest.is_none());
    }

    #[tokio::test]
    async fn retries_once_on_schema_failure_then_succeeds() {
        let llm = FakeLlm {
            responses: std::sync::Mutex::new(vec![
                json!({"not": "the right shape"}),
                full_note_json("repaired"),
            ]),
        };
        let documents = vec![Document::new("HB1", "https://x/HB1.htm", DocumentKind::Htm)];
        let texts = HashMap::new();
        let notes = generate_notes(&llm, "HB_1_2025", &["HB1".to_string()], &documents, &texts, &[])
            .await
            .unwrap();
        assert_eq!(notes[0].note.overview, "repaired");
    }

    #[tokio::test]
    async fn fails_the_bill_after_two_bad_responses() {
        let llm = FakeLlm {
            responses: std::sync::Mutex::new(vec![
                json!({"bad": true}),
                json!({"still": "bad"}),
            ]),
        };
        let documents = vec![Document::new("HB1", "https://x/HB1.htm", DocumentKind::Htm)];
        let texts = HashMap::new();
        let result =
            generate_notes(&llm, "HB_1_2025", &["HB1".to_string()], &documents, &texts, &[]).await;
        assert!(matches!(result, Err(Error::SchemaFailure { .. })));
    }

    #[test]
    fn digest_changes_when_note_body_changes() {
        let mut a = FiscalNote::default();
        a.overview = "first".to_string();
        let mut b = FiscalNote::default();
        b.overview = "second".to_string();
        assert_ne!(digest_note(&a), digest_note(&b));
    }
}
