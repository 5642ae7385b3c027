//! One bill's full acquisition-through-attribution run, per spec.md §5's
//! strict happens-before ordering: each stage's artifact is persisted
//! before the next stage starts, so a restarted run can resume by reading
//! what's already on disk rather than recomputing it.

use std::collections::HashMap;
use std::path::PathBuf;

use billtrace_browser::BrowserSession;
use billtrace_config::Config;
use billtrace_documents::{extract_money_occurrences, fetch_document};
use billtrace_llm::{EmbeddingClient, LlmClient};
use billtrace_models::document::classify;
use billtrace_models::{
    BillId, CitationMap, Document, FiscalNote, MoneyOccurrence, PipelineError, RetrievalLogEntry,
    SectionChange, SentenceAttribution,
};
use billtrace_notes::{diff_notes, enhance_note, generate_notes};
use billtrace_portal::{resolve_chronology, scrape_bill};
use billtrace_queue::{JobQueue, KvStore};
use billtrace_storage::{ensure_bill_dirs, write_json_atomic, write_text, BillPaths};
use tracing::{info, instrument};

use crate::convert;

/// The combined note artifact persisted at `notes/{checkpoint}.json`: the
/// section bodies with citations already rewritten, plus the citation map
/// and per-sentence attributions the enhancer produced for them.
#[derive(Debug, serde::Serialize)]
struct NoteArtifact {
    note: FiscalNote,
    citations: CitationMap,
    attributions: HashMap<String, Vec<SentenceAttribution>>,
}

/// One entry of `changes.json`: a checkpoint's section-by-section diff
/// against the previous checkpoint (spec.md §4.9).
#[derive(Debug, serde::Serialize)]
struct ChangeLedgerEntry {
    checkpoint_document: String,
    sections: Vec<SectionChange>,
}

macro_rules! bail_if_cancelled {
    ($queue:expr, $bill:expr) => {
        if $queue.is_cancel_requested(&$bill.canonical()).await {
            return Err(PipelineError::CancelRequested {
                bill: $bill.canonical(),
            });
        }
    };
}

#[instrument(skip(config, queue, llm, embed), fields(bill = %bill))]
pub async fn run_bill_inner<K: KvStore>(
    config: &Config,
    queue: &JobQueue<K>,
    llm: &impl LlmClient,
    embed: &impl EmbeddingClient,
    bill: &BillId,
) -> Result<(), PipelineError> {
    let bill_str = bill.canonical();
    let paths = BillPaths::new(&config.bills_root, bill);
    ensure_bill_dirs(&paths)
        .await
        .map_err(convert::storage_err)?;

    // Stage A: one browser session, reused for every document (spec.md §4.1).
    let mut browser = BrowserSession::open(&bill_str, paths.documents_dir())
        .await
        .map_err(convert::browser_err)?;

    // Stage B: landing-page scrape.
    let snapshot = scrape_bill(&mut browser, &config.portal_host, bill)
        .await
        .map_err(|e| convert::portal_err(&bill_str, e))?;
    write_json_atomic(&paths.stage1_output(bill), &snapshot)
        .await
        .map_err(convert::storage_err)?;

    // Stage C: chronological ordering.
    let timeline = resolve_chronology(llm, &bill_str, &snapshot)
        .await
        .map_err(|e| convert::portal_err(&bill_str, e))?;
    write_json_atomic(&paths.chronology_output(bill), &timeline)
        .await
        .map_err(convert::storage_err)?;

    let document_order: Vec<String> = timeline.document_order().into_iter().map(str::to_string).collect();
    let by_name: HashMap<&str, &Document> =
        snapshot.documents.iter().map(|d| (d.name.as_str(), d)).collect();

    // Stage D/E: fetch + extract text, then scan for monetary amounts, one
    // document at a time, checking for cancellation between each.
    let pdf_scratch_dir: PathBuf = paths.root().join("pdf_scratch");
    let mut texts: HashMap<String, String> = HashMap::new();
    let mut numbers: Vec<MoneyOccurrence> = Vec::new();
    let mut retrieval_log: Vec<RetrievalLogEntry> = Vec::new();

    for name in &document_order {
        bail_if_cancelled!(queue, bill);

        let Some(document) = by_name.get(name.as_str()) else {
            continue;
        };

        let (text, log_entry) = fetch_document(&mut browser, document, &pdf_scratch_dir)
            .await
            .map_err(|e| convert::document_fetch_err(&document.name, &document.url, e))?;

        write_text(&paths.document_text(name), &text)
            .await
            .map_err(convert::storage_err)?;

        numbers.extend(extract_money_occurrences(name, &text));
        texts.insert(name.clone(), text);
        retrieval_log.push(log_entry);
    }

    browser.close().await.map_err(convert::browser_err)?;

    write_json_atomic(&paths.numbers(), &numbers)
        .await
        .map_err(convert::storage_err)?;
    write_json_atomic(&paths.retrieval_log(), &retrieval_log)
        .await
        .map_err(convert::storage_err)?;

    // Stage F: cumulative-context fiscal note generation.
    let generated = generate_notes(llm, &bill_str, &document_order, &snapshot.documents, &texts, &numbers)
        .await
        .map_err(|e| convert::notes_err(&bill_str, e))?;

    let known_documents: Vec<String> = snapshot.documents.iter().map(|d| d.name.clone()).collect();
    let mut previous_note: Option<FiscalNote> = None;
    let mut change_ledger: Vec<ChangeLedgerEntry> = Vec::new();

    // The docnum/numnum namespaces are per-bill, assigned in discovery
    // order (spec.md §5), so one `CitationMap` accumulates across every
    // checkpoint rather than restarting at each note.
    let mut citation_map = CitationMap::default();

    for generated_note in generated {
        bail_if_cancelled!(queue, bill);

        // Stage G: citation resolution and sentence-level attribution.
        let (note, attributions) = enhance_note(
            embed,
            generated_note.note,
            &known_documents,
            &generated_note.visible_numbers,
            classify,
            &mut citation_map,
        )
        .await
        .map_err(|e| convert::notes_err(&bill_str, e))?;

        // Stage I: diff against the prior checkpoint.
        let sections = diff_notes(previous_note.as_ref(), &note);
        change_ledger.push(ChangeLedgerEntry {
            checkpoint_document: generated_note.checkpoint_document.clone(),
            sections,
        });

        let artifact = NoteArtifact {
            note: note.clone(),
            citations: citation_map.clone(),
            attributions,
        };
        write_json_atomic(&paths.note_body(&generated_note.checkpoint_document), &artifact)
            .await
            .map_err(convert::storage_err)?;
        write_json_atomic(
            &paths.note_metadata(&generated_note.checkpoint_document),
            &generated_note.metadata,
        )
        .await
        .map_err(convert::storage_err)?;

        info!(checkpoint = %generated_note.checkpoint_document, "persisted note and change ledger entry");
        previous_note = Some(note);
    }

    write_json_atomic(&paths.changes(), &change_ledger)
        .await
        .map_err(convert::storage_err)?;
    write_json_atomic(&paths.document_mapping(), &citation_map.documents)
        .await
        .map_err(convert::storage_err)?;

    Ok(())
}
