use std::collections::HashSet;

use billtrace_llm::LlmClient;
use billtrace_models::{PortalSnapshot, Timeline, TimelineEntry};
use serde_json::json;
use tracing::{instrument, warn};

use crate::error::Error;

/// Resolves a total order over `snapshot.documents` from the textual status
/// events, per spec.md §4.3. Tries the LLM twice; on repeated invalid
/// responses falls back to a deterministic ordering and flags the result.
#[instrument(skip(llm, snapshot), fields(bill = %bill))]
pub async fn resolve_chronology(
    llm: &impl LlmClient,
    bill: &str,
    snapshot: &PortalSnapshot,
) -> Result<Timeline, Error> {
    for attempt in 0..2 {
        let prompt = build_prompt(bill, snapshot);
        let schema = response_schema();
        let response = llm.complete_json(&prompt, &schema).await?;

        match parse_and_validate(&response, snapshot) {
            Ok(timeline) => return Ok(timeline),
            Err(reason) => {
                warn!(attempt, %reason, "chronology response failed validation");
                if attempt == 1 {
                    break;
                }
            }
        }
    }

    Ok(deterministic_fallback(snapshot))
}

fn build_prompt(bill: &str, snapshot: &PortalSnapshot) -> String {
    let documents: Vec<&str> = snapshot.documents.iter().map(|d| d.name.as_str()).collect();
    let events: Vec<String> = snapshot
        .status_rows
        .iter()
        .map(|row| format!("- {} ({}): {}", row.date, row.chamber, row.text))
        .collect();

    format!(
        "Bill {bill} has the following status history, in order:\n{}\n\n\
         And the following documents, listed alphabetically (not chronologically):\n{}\n\n\
         Emit a JSON array, one element per status event above in the same order, each of the \
         form {{\"date\": ..., \"text\": ..., \"documents\": [document names attached to this \
         event]}}. Every document name must appear in exactly one event's \"documents\" array. \
         Testimony documents belong to the hearing event they were submitted to. Committee \
         report documents belong to the event announcing that report.",
        events.join("\n"),
        documents.join(", "),
    )
}

fn response_schema() -> serde_json::Value {
    json!({
        "type": "array",
        "items": {
            "type": "object",
            "required": ["date", "text", "documents"],
            "properties": {
                "date": {"type": "string"},
                "text": {"type": "string"},
                "documents": {"type": "array", "items": {"type": "string"}}
            }
        }
    })
}

fn parse_and_validate(response: &serde_json::Value, snapshot: &PortalSnapshot) -> Result<Timeline, String> {
    let entries: Vec<TimelineEntry> =
        serde_json::from_value(response.clone()).map_err(|e| e.to_string())?;

    if entries.len() != snapshot.status_rows.len() {
        return Err(format!(
            "expected {} entries (one per status event), got {}",
            snapshot.status_rows.len(),
            entries.len()
        ));
    }
    for (entry, expected) in entries.iter().zip(&snapshot.status_rows) {
        if entry.date != expected.date || entry.text != expected.text {
            return Err("entry order does not match the observed status-event order".to_string());
        }
    }

    let expected_names: HashSet<&str> = snapshot.documents.iter().map(|d| d.name.as_str()).collect();
    let mut seen: HashSet<&str> = HashSet::new();
    for entry in &entries {
        for name in &entry.documents {
            if !expected_names.contains(name.as_str()) {
                return Err(format!("unknown document name {name:?} in response"));
            }
            if !seen.insert(name.as_str()) {
                return Err(format!("document {name:?} assigned to more than one event"));
            }
        }
    }
    if seen.len() != expected_names.len() {
        return Err("not every document was assigned to an event".to_string());
    }

    Ok(Timeline {
        entries,
        chronology_degraded: false,
    })
}

/// Status-event order first, with unassigned documents grouped at the end
/// sorted by name, per spec.md §4.3.
fn deterministic_fallback(snapshot: &PortalSnapshot) -> Timeline {
    let mut remaining: Vec<&str> = snapshot.documents.iter().map(|d| d.name.as_str()).collect();
    remaining.sort_unstable();

    let mut entries: Vec<TimelineEntry> = snapshot
        .status_rows
        .iter()
        .map(|row| TimelineEntry {
            date: row.date.clone(),
            text: row.text.clone(),
            documents: Vec::new(),
        })
        .collect();

    if let Some(last) = entries.last_mut() {
        last.documents = remaining.into_iter().map(String::from).collect();
    } else {
        entries.push(TimelineEntry {
            date: String::new(),
            text: "unassigned".to_string(),
            documents: remaining.into_iter().map(String::from).collect(),
        });
    }

    Timeline {
        entries,
        chronology_degraded: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use billtrace_models::{Document, DocumentKind};

    fn sample_snapshot() -> PortalSnapshot {
        PortalSnapshot {
            status_rows: vec![
                billtrace_models::StatusEvent {
                    date: "1/1/2025".into(),
                    chamber: "H".into(),
                    text: "Introduced".into(),
                },
                billtrace_models::StatusEvent {
                    date: "2/1/2025".into(),
                    chamber: "H".into(),
                    text: "Passed First Reading".into(),
                },
            ],
            documents: vec![
                Document::new("HB1", "https://x/HB1.htm", DocumentKind::Htm),
                Document::new("HB1_HD1", "https://x/HB1_HD1.htm", DocumentKind::Htm),
            ],
            committee_report_names: vec![],
        }
    }

    #[test]
    fn deterministic_fallback_assigns_all_documents_to_last_event() {
        let timeline = deterministic_fallback(&sample_snapshot());
        assert!(timeline.chronology_degraded);
        assert_eq!(timeline.document_set().len(), 2);
        assert_eq!(timeline.entries.last().unwrap().documents.len(), 2);
    }

    #[test]
    fn validate_rejects_document_assigned_twice() {
        let snapshot = sample_snapshot();
        let bad = serde_json::json!([
            {"date": "1/1/2025", "text": "Introduced", "documents": ["HB1", "HB1_HD1"]},
            {"date": "2/1/2025", "text": "Passed First Reading", "documents": ["HB1"]},
        ]);
        assert!(parse_and_validate(&bad, &snapshot).is_err());
    }

    #[test]
    fn validate_accepts_well_formed_response() {
        let snapshot = sample_snapshot();
        let good = serde_json::json!([
            {"date": "1/1/2025", "text": "Introduced", "documents": ["HB1"]},
            {"date": "2/1/2025", "text": "Passed First Reading", "documents": ["HB1_HD1"]},
        ]);
        let timeline = parse_and_validate(&good, &snapshot).unwrap();
        assert!(!timeline.chronology_degraded);
        assert_eq!(timeline.document_order(), vec!["HB1", "HB1_HD1"]);
    }
}
