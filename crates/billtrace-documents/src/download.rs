use std::path::Path;

use billtrace_browser::BrowserSession;
use billtrace_models::{Document, DocumentKind, Extractor, RetrievalLogEntry, RetrievalOutcome};
use tracing::{instrument, warn};

use crate::error::Error;
use crate::extract::extract_visible_text;

const MIN_PRIMARY_PDF_BYTES: usize = 1000;

/// Fetches one document through the shared browser session, extracts its
/// text, and returns both the extracted text and a retrieval-log entry. Per
/// spec.md §4.4, PDF total failure persists an empty file rather than
/// propagating an error — the run continues.
#[instrument(skip(browser), fields(document = %document.name))]
pub async fn fetch_document(
    browser: &mut BrowserSession,
    document: &Document,
    pdf_scratch_dir: &Path,
) -> Result<(String, RetrievalLogEntry), Error> {
    let at = chrono::Utc::now();

    let (text, extractor, outcome) = match document.kind {
        DocumentKind::Htm => {
            let html = browser.get_with_retry(&document.url).await?;
            let text = extract_visible_text(&html);
            let outcome = if text.is_empty() {
                RetrievalOutcome::EmptyAfterExtraction
            } else {
                RetrievalOutcome::Ok
            };
            (text, Some(Extractor::Html), outcome)
        }
        DocumentKind::Pdf => fetch_pdf(browser, document, pdf_scratch_dir).await?,
    };

    let entry = RetrievalLogEntry {
        document_name: document.name.clone(),
        url: document.url.clone(),
        outcome,
        extractor,
        bytes_extracted: text.len(),
        at,
    };
    Ok((text, entry))
}

async fn fetch_pdf(
    browser: &mut BrowserSession,
    document: &Document,
    pdf_scratch_dir: &Path,
) -> Result<(String, Option<Extractor>, RetrievalOutcome), Error> {
    let downloaded = match browser.download_with_retry(&document.url, "pdf").await {
        Ok(path) => path,
        Err(err) => {
            warn!(error = %err, "pdf download failed, persisting empty text");
            return Ok((String::new(), None, RetrievalOutcome::Failed));
        }
    };

    let primary = extract_pdf_primary(&downloaded);
    if primary.as_ref().is_some_and(|t| t.len() >= MIN_PRIMARY_PDF_BYTES) {
        return Ok((primary.unwrap(), Some(Extractor::PdfPrimary), RetrievalOutcome::Ok));
    }

    warn!(
        path = %downloaded.display(),
        "primary PDF extractor yielded < {MIN_PRIMARY_PDF_BYTES} bytes, trying secondary"
    );
    match extract_pdf_secondary(&downloaded, pdf_scratch_dir) {
        Some(text) if !text.is_empty() => {
            Ok((text, Some(Extractor::PdfSecondary), RetrievalOutcome::Ok))
        }
        _ => Ok((
            primary.unwrap_or_default(),
            Some(Extractor::PdfSecondary),
            RetrievalOutcome::EmptyAfterExtraction,
        )),
    }
}

fn extract_pdf_primary(path: &Path) -> Option<String> {
    pdf_extract::extract_text(path).ok()
}

fn extract_pdf_secondary(path: &Path, scratch_dir: &Path) -> Option<String> {
    let bindings = pdfium_render::prelude::Pdfium::bind_to_system_library().ok()?;
    let pdfium = pdfium_render::prelude::Pdfium::new(bindings);
    let document = pdfium.load_pdf_from_file(path, None).ok()?;
    let _ = scratch_dir;

    let mut text = String::new();
    for page in document.pages().iter() {
        if let Ok(page_text) = page.text() {
            text.push_str(&page_text.all());
            text.push('\n');
        }
    }
    Some(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_pdf_primary_reports_none_on_missing_file() {
        let missing = Path::new("/nonexistent/does-not-exist.pdf");
        assert!(extract_pdf_primary(missing).is_none());
    }
}
