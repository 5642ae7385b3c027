use scraper::Html;

/// Strips `<script>/<style>/<noscript>` and extracts visible text with
/// whitespace normalized: runs of whitespace collapse to a single space,
/// two-or-more newlines are preserved as a paragraph break. Per spec.md §4.4.
pub fn extract_visible_text(html: &str) -> String {
    use scraper::Selector;

    let document = Html::parse_document(html);
    // `descendants()` walks every text node regardless of ancestry, so
    // script/style/noscript bodies are excluded by id rather than by
    // checking each text node's immediate parent.
    let excluded_ids: std::collections::HashSet<_> = Selector::parse("script, style, noscript")
        .into_iter()
        .flat_map(|selector| document.select(&selector).collect::<Vec<_>>())
        .flat_map(|el| el.descendants().map(|d| d.id()))
        .collect();

    let text: String = document
        .root_element()
        .descendants()
        .filter(|node| !excluded_ids.contains(&node.id()))
        .filter_map(|node| node.value().as_text().map(|t| t.to_string()))
        .collect::<Vec<_>>()
        .join(" ");

    normalize_whitespace(&text)
}

fn normalize_whitespace(text: &str) -> String {
    let paragraphs: Vec<String> = text
        .split("\n\n")
        .map(|para| para.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|para| !para.is_empty())
        .collect();
    paragraphs.join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_script_and_style_content() {
        let html = "<html><body><script>alert(1)</script><style>.x{}</style><p>Hello world</p></body></html>";
        let text = extract_visible_text(html);
        assert!(text.contains("Hello world"));
        assert!(!text.contains("alert"));
        assert!(!text.contains(".x{}"));
    }

    #[test]
    fn collapses_internal_whitespace_runs() {
        let normalized = normalize_whitespace("Hello    \n  world");
        assert_eq!(normalized, "Hello world");
    }

    #[test]
    fn preserves_paragraph_breaks() {
        let normalized = normalize_whitespace("First paragraph.\n\nSecond paragraph.");
        assert_eq!(normalized, "First paragraph.\n\nSecond paragraph.");
    }
}
