use std::collections::HashMap;

use billtrace_browser::BrowserSession;
use billtrace_models::{BillId, Document, DocumentKind, PortalSnapshot, StatusEvent};
use scraper::{Html, Selector};
use tracing::instrument;

use crate::error::Error;

/// Builds the canonical bill URL from spec.md §6's template.
pub fn bill_url(portal_host: &str, bill: &BillId) -> String {
    format!(
        "https://{portal_host}/session/measure_indiv.aspx?billtype={}&billnumber={}&year={}",
        bill.portal_bill_type(),
        bill.number,
        bill.year
    )
}

/// Loads the bill's landing page through the shared browser session and
/// reduces it to a [`PortalSnapshot`], per spec.md §4.2.
#[instrument(skip(browser))]
pub async fn scrape_bill(
    browser: &mut BrowserSession,
    portal_host: &str,
    bill: &BillId,
) -> Result<PortalSnapshot, Error> {
    let url = bill_url(portal_host, bill);
    let html = browser.get_with_retry(&url).await?;
    let snapshot = parse_bill_page(&html, &url)?;

    if snapshot.status_rows.is_empty() || snapshot.documents.is_empty() {
        return Err(Error::EmptyBill {
            bill: bill.canonical(),
        });
    }
    Ok(snapshot)
}

/// Pure parsing step, split out from `scrape_bill` so it can be unit tested
/// against fixture HTML without a browser.
pub fn parse_bill_page(html: &str, page_url: &str) -> Result<PortalSnapshot, Error> {
    let document = Html::parse_document(html);

    let status_rows = parse_status_table(&document);
    let (documents, committee_report_names) = parse_document_links(&document, page_url)?;

    Ok(PortalSnapshot {
        status_rows,
        documents,
        committee_report_names,
    })
}

fn parse_status_table(document: &Html) -> Vec<StatusEvent> {
    let Ok(row_selector) = Selector::parse("table.status, #statusTable") else {
        return Vec::new();
    };
    let Ok(tr_selector) = Selector::parse("tr") else {
        return Vec::new();
    };
    let Ok(td_selector) = Selector::parse("td") else {
        return Vec::new();
    };

    let mut rows = Vec::new();
    for table in document.select(&row_selector) {
        for tr in table.select(&tr_selector) {
            let cells: Vec<String> = tr
                .select(&td_selector)
                .map(|td| td.text().collect::<String>().trim().to_string())
                .filter(|text| !text.is_empty())
                .collect();
            let [date, chamber, text] = match cells.as_slice() {
                [date, chamber, rest @ ..] if !rest.is_empty() => {
                    [date.clone(), chamber.clone(), rest.join(" ")]
                }
                _ => continue,
            };
            rows.push(StatusEvent { date, chamber, text });
        }
    }
    rows
}

fn parse_document_links(
    document: &Html,
    page_url: &str,
) -> Result<(Vec<Document>, Vec<String>), Error> {
    let base = url::Url::parse(page_url).map_err(|source| Error::MalformedHref {
        href: page_url.to_string(),
        reason: source.to_string(),
    })?;
    let Ok(link_selector) = Selector::parse("a[href]") else {
        return Ok((Vec::new(), Vec::new()));
    };

    // Keyed by (base name without extension) so an `.htm` and a `.pdf` for
    // the same document collapse into one entry, preferring `.htm`
    // (spec.md §4.2).
    let mut by_base_name: HashMap<String, Document> = HashMap::new();
    let mut committee_report_names = Vec::new();
    let mut order: Vec<String> = Vec::new();

    for link in document.select(&link_selector) {
        let Some(href) = link.value().attr("href") else {
            continue;
        };
        let Some((name, kind)) = classify_document_href(href) else {
            continue;
        };
        let absolute = base
            .join(href)
            .map(|u| u.to_string())
            .unwrap_or_else(|_| href.to_string());

        if billtrace_models::document::classify(&name)
            == billtrace_models::DocumentType::CommitteeReport
        {
            committee_report_names.push(name.clone());
        }

        let entry = by_base_name.entry(name.clone()).or_insert_with(|| {
            order.push(name.clone());
            Document::new(name.clone(), absolute.clone(), kind)
        });
        // Prefer htm over pdf for the same base name.
        if entry.kind == DocumentKind::Pdf && kind == DocumentKind::Htm {
            entry.kind = DocumentKind::Htm;
            entry.url = absolute;
        }
    }

    let documents = order
        .into_iter()
        .filter_map(|name| by_base_name.remove(&name))
        .collect();

    Ok((documents, committee_report_names))
}

/// Derives a document's `name` and `kind` from an href's filename, e.g.
/// `.../HB1483_HD1_.HTM` -> `("HB1483_HD1_", Htm)`. Returns `None` for
/// links that aren't document downloads (nav links, anchors, scripts).
fn classify_document_href(href: &str) -> Option<(String, DocumentKind)> {
    let file_name = href.rsplit('/').next().unwrap_or(href);
    let (stem, ext) = file_name.rsplit_once('.')?;
    let kind = match ext.to_ascii_lowercase().as_str() {
        "htm" | "html" => DocumentKind::Htm,
        "pdf" => DocumentKind::Pdf,
        _ => return None,
    };
    if stem.is_empty() {
        return None;
    }
    Some((stem.to_string(), kind))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_PAGE: &str = r#"
        <html><body>
        <table class="status">
            <tr><td>01/05/2025</td><td>H</td><td>Introduced</td></tr>
            <tr><td>02/10/2025</td><td>H</td><td>Passed First Reading</td></tr>
        </table>
        <div class="documents">
            <a href="/docs/HB1483_.HTM">Bill Text</a>
            <a href="/docs/HB1483_.PDF">Bill Text PDF</a>
            <a href="/docs/HB1483_HD1_HSCR629_.HTM">Committee Report</a>
        </div>
        </body></html>
    "#;

    #[test]
    fn parses_status_rows_in_dom_order() {
        let snapshot = parse_bill_page(SAMPLE_PAGE, "https://example.test/bill").unwrap();
        assert_eq!(snapshot.status_rows.len(), 2);
        assert_eq!(snapshot.status_rows[0].text, "Introduced");
        assert_eq!(snapshot.status_rows[1].text, "Passed First Reading");
    }

    #[test]
    fn prefers_htm_over_pdf_for_same_base_name() {
        let snapshot = parse_bill_page(SAMPLE_PAGE, "https://example.test/bill").unwrap();
        let doc = snapshot
            .documents
            .iter()
            .find(|d| d.name == "HB1483_")
            .unwrap();
        assert_eq!(doc.kind, DocumentKind::Htm);
    }

    #[test]
    fn collects_committee_report_names() {
        let snapshot = parse_bill_page(SAMPLE_PAGE, "https://example.test/bill").unwrap();
        assert_eq!(snapshot.committee_report_names, vec!["HB1483_HD1_HSCR629_"]);
    }

    #[test]
    fn bill_url_matches_template() {
        use billtrace_models::{BillId, Chamber};
        let id = BillId::new(Chamber::House, 1483, 2025);
        assert_eq!(
            bill_url("portal.example.gov", &id),
            "https://portal.example.gov/session/measure_indiv.aspx?billtype=HB&billnumber=1483&year=2025"
        );
    }
}
