use billtrace_models::MoneyOccurrence;
use regex::Regex;
use std::sync::OnceLock;

const CONTEXT_WINDOW: usize = 50;

fn money_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        // Thousands separators are optional, not required: spec.md §4.5
        // calls out "5000" followed by "$" as one match, so a 3-digit
        // group boundary without a comma (e.g. "5" + "000") must still be
        // accepted, not just "5,000".
        Regex::new(
            r"(?x)
            ^(?:\$|USD\s*)
             [0-9]{1,3}(?:,?[0-9]{3})*
             (?:\.[0-9]{1,2})?$
            |
            ^[0-9]{1,3}(?:,?[0-9]{3})*
             (?:\.[0-9]{1,2})?
             \s*(?:\$|USD)$
            ",
        )
        .expect("static money pattern is valid")
    })
}

/// Scans whitespace-tokenized `text` for monetary amounts, per spec.md
/// §4.5's recognition grammar, and emits one [`MoneyOccurrence`] per match
/// in discovery (token) order. No deduplication — repeated amounts in
/// different contexts are both recorded.
pub fn extract_money_occurrences(filename: &str, text: &str) -> Vec<MoneyOccurrence> {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    let mut occurrences = Vec::new();
    let mut consumed_by_prior_pair = false;

    let mut i = 0;
    while i < tokens.len() {
        if consumed_by_prior_pair {
            consumed_by_prior_pair = false;
            i += 1;
            continue;
        }

        // "5000" followed by "$" is one match, not two: a token paired with
        // its neighbor to complete a split currency marker consumes that
        // neighbor so it isn't also matched on its own next iteration.
        let paired_with_next = (i + 1 < tokens.len())
            .then(|| format!("{}{}", tokens[i], tokens[i + 1]))
            .filter(|candidate| money_pattern().is_match(candidate));

        let (matched_candidate, consumes_next) = match paired_with_next {
            Some(candidate) => (Some(candidate), true),
            None if money_pattern().is_match(tokens[i]) => (Some(tokens[i].to_string()), false),
            None => (None, false),
        };

        if let Some(candidate) = matched_candidate {
            if let Some(amount) = parse_amount(&candidate) {
                let start = i.saturating_sub(CONTEXT_WINDOW);
                let end = (i + CONTEXT_WINDOW + 1).min(tokens.len());
                let context = tokens[start..end].join(" ");
                let offset_chars = token_offset_chars(text, i);

                occurrences.push(MoneyOccurrence {
                    amount,
                    currency: billtrace_models::Currency::default(),
                    filename: filename.to_string(),
                    context,
                    offset_chars,
                });
            }
            consumed_by_prior_pair = consumes_next;
        }

        i += 1;
    }

    occurrences
}

fn parse_amount(candidate: &str) -> Option<f64> {
    let cleaned: String = candidate
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse().ok()
}

fn token_offset_chars(text: &str, token_index: usize) -> usize {
    text.split_whitespace()
        .take(token_index)
        .map(|t| t.len() + 1)
        .sum()
}
