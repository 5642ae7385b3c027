//! Stage 6/7: binds generated sentences and cited amounts back to the
//! source passage they came from, per spec.md §4.7.

use std::collections::HashMap;
use std::sync::OnceLock;

use billtrace_llm::EmbeddingClient;
use billtrace_models::{
    AttributedChunk, CitationMap, CitedMoney, DocumentType, FiscalNote, MoneyOccurrence,
    SentenceAttribution, SECTION_KEYS,
};
use regex::Regex;

use crate::error::Error;

fn document_paren_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\(([^()]+)\)").expect("static pattern is valid"))
}

fn money_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"(?x)
            \$\s?[0-9]{1,3}(?:,[0-9]{3})*(?:\.[0-9]{1,2})?
            |
            [0-9]{1,3}(?:,[0-9]{3})*(?:\.[0-9]{1,2})?\s?(?:\$|USD)
            ",
        )
        .expect("static pattern is valid")
    })
}

/// Replaces every `(DocumentName)` parenthetical in `body` that matches a
/// known document name — exact match first, then prefix — with `[n]` from
/// the shared `CitationMap`.
pub fn resolve_document_citations(
    body: &str,
    known_documents: &[String],
    citation_map: &mut CitationMap,
) -> String {
    document_paren_pattern()
        .replace_all(body, |captures: &regex::Captures| {
            let candidate = captures[1].trim();
            match match_document_name(candidate, known_documents) {
                Some(name) => format!("[{}]", citation_map.docnum_for(name)),
                None => captures[0].to_string(),
            }
        })
        .into_owned()
}

fn match_document_name<'a>(candidate: &str, known_documents: &'a [String]) -> Option<&'a str> {
    if let Some(name) = known_documents.iter().find(|n| n.as_str() == candidate) {
        return Some(name.as_str());
    }
    known_documents
        .iter()
        .find(|n| n.starts_with(candidate) || candidate.starts_with(n.as_str()))
        .map(String::as_str)
}

/// For each dollar amount in `body`, finds the visible [`MoneyOccurrence`]
/// whose amount matches and whose context is most textually similar to the
/// enclosing sentence, and appends `[m]` from the shared `CitationMap`.
pub fn resolve_money_citations(
    body: &str,
    visible: &[MoneyOccurrence],
    doc_type_of: impl Fn(&str) -> DocumentType,
    citation_map: &mut CitationMap,
) -> String {
    let matches: Vec<(usize, usize, f64)> = money_pattern()
        .find_iter(body)
        .filter_map(|m| parse_amount(m.as_str()).map(|amount| (m.start(), m.end(), amount)))
        .collect();

    if matches.is_empty() {
        return body.to_string();
    }

    let mut result = String::with_capacity(body.len());
    let mut cursor = 0;

    for (start, end, amount) in matches {
        result.push_str(&body[cursor..end]);
        cursor = end;

        let sentence = enclosing_sentence(body, start);
        if let Some(occurrence) = best_matching_occurrence(amount, sentence, visible) {
            let cited = CitedMoney::from((occurrence.clone(), doc_type_of(&occurrence.filename)));
            let numnum = citation_map.numnum_for(cited);
            result.push_str(&format!(" [{numnum}]"));
        }
    }
    result.push_str(&body[cursor..]);
    result
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

fn enclosing_sentence(body: &str, offset: usize) -> &str {
    let start = body[..offset]
        .rfind(['.', '!', '?'])
        .map(|i| i + 1)
        .unwrap_or(0);
    let end = body[offset..]
        .find(['.', '!', '?'])
        .map(|i| offset + i + 1)
        .unwrap_or(body.len());
    body[start..end].trim()
}

fn best_matching_occurrence<'a>(
    amount: f64,
    sentence: &str,
    visible: &'a [MoneyOccurrence],
) -> Option<&'a MoneyOccurrence> {
    visible
        .iter()
        .filter(|occ| (occ.amount - amount).abs() < 0.01)
        .max_by(|a, b| {
            jaccard_similarity(sentence, &a.context)
                .partial_cmp(&jaccard_similarity(sentence, &b.context))
                .unwrap_or(std::cmp::Ordering::Equal)
        })
}

fn jaccard_similarity(a: &str, b: &str) -> f64 {
    let words_of = |s: &str| -> std::collections::HashSet<String> {
        s.split_whitespace()
            .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
            .filter(|w| !w.is_empty())
            .collect()
    };
    let a_words = words_of(a);
    let b_words = words_of(b);
    if a_words.is_empty() || b_words.is_empty() {
        return 0.0;
    }
    let intersection = a_words.intersection(&b_words).count() as f64;
    let union = a_words.union(&b_words).count() as f64;
    intersection / union
}

/// Splits `body` into sentences and attributes each to its best-scoring
/// cited money occurrence, per spec.md §4.7's "zero or one attributed
/// passage" post-condition. Candidates are the contexts of every money
/// citation (`[m]`) present in the sentence — the only source passages the
/// core has text for at sentence granularity.
pub async fn attribute_sentences(
    embed: &impl EmbeddingClient,
    body: &str,
    citation_map: &CitationMap,
) -> Result<Vec<SentenceAttribution>, Error> {
    let numnum_pattern = Regex::new(r"\[(\d+)\]").expect("static pattern is valid");
    let sentences = split_sentences(body);
    if sentences.is_empty() {
        return Ok(Vec::new());
    }

    let candidate_sets: Vec<Vec<(String, String)>> = sentences
        .iter()
        .map(|sentence| {
            numnum_pattern
                .captures_iter(sentence)
                .filter_map(|c| c[1].parse::<u32>().ok())
                .filter_map(|numnum| citation_map.numbers.get(&numnum))
                .map(|cited| (cited.filename.clone(), cited.context.clone()))
                .collect()
        })
        .collect();

    let sentence_embeddings = embed.embed(&sentences).await?;

    let mut attributions = Vec::with_capacity(sentences.len());
    for (i, sentence) in sentences.iter().enumerate() {
        let candidates = &candidate_sets[i];
        if candidates.is_empty() {
            attributions.push(SentenceAttribution {
                sentence_text: sentence.clone(),
                attributed_chunks: Vec::new(),
                best_chunk_index: None,
            });
            continue;
        }

        let chunk_texts: Vec<String> = candidates.iter().map(|(_, t)| t.clone()).collect();
        let chunk_embeddings = embed.embed(&chunk_texts).await?;

        let mut chunks = Vec::with_capacity(candidates.len());
        let mut best_index = 0;
        let mut best_score = f32::MIN;
        for (idx, ((filename, chunk_text), chunk_embedding)) in
            candidates.iter().zip(&chunk_embeddings).enumerate()
        {
            let score = billtrace_llm::cosine_similarity(&sentence_embeddings[i], chunk_embedding);
            if score > best_score {
                best_score = score;
                best_index = idx;
            }
            chunks.push(AttributedChunk {
                filename: filename.clone(),
                chunk_text: chunk_text.clone(),
                score,
            });
        }

        attributions.push(SentenceAttribution {
            sentence_text: sentence.clone(),
            attributed_chunks: chunks,
            best_chunk_index: Some(best_index),
        });
    }

    Ok(attributions)
}

/// Splits on `.`/`!`/`?` followed by whitespace, a common best-effort
/// sentence boundary heuristic (no NLP dependency for this). Written by hand
/// rather than as a regex split because the `regex` crate doesn't support
/// the lookbehind needed to keep the terminator with its sentence.
fn split_sentences(body: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut start = 0;

    for (i, c) in body.char_indices() {
        if !matches!(c, '.' | '!' | '?') {
            continue;
        }
        let after = &body[i + c.len_utf8()..];
        let followed_by_whitespace_or_end =
            after.chars().next().map(char::is_whitespace).unwrap_or(true);
        if !followed_by_whitespace_or_end {
            continue;
        }
        let ws_len: usize = after
            .chars()
            .take_while(|ch| ch.is_whitespace())
            .map(char::len_utf8)
            .sum();
        sentences.push(body[start..i + c.len_utf8()].trim().to_string());
        start = i + c.len_utf8() + ws_len;
    }
    if start < body.len() {
        let tail = body[start..].trim();
        if !tail.is_empty() {
            sentences.push(tail.to_string());
        }
    }

    sentences.retain(|s| !s.is_empty());
    sentences
}

/// Runs citation resolution + sentence attribution over every section of a
/// note, for every section in [`SECTION_KEYS`] order.
pub async fn enhance_note(
    embed: &impl EmbeddingClient,
    mut note: FiscalNote,
    known_documents: &[String],
    visible: &[MoneyOccurrence],
    doc_type_of: impl Fn(&str) -> DocumentType + Copy,
    citation_map: &mut CitationMap,
) -> Result<(FiscalNote, HashMap<String, Vec<SentenceAttribution>>), Error> {
    let mut attributions = HashMap::new();

    for key in SECTION_KEYS {
        let original = note.section_mut(key).expect("known key").clone();
        let with_money = resolve_money_citations(&original, visible, doc_type_of, citation_map);

        // Attribute against the body with only money citations resolved:
        // the `numnum` and `docnum` namespaces both render as bare `[k]`
        // brackets, so once document parentheticals are also rewritten to
        // `[n]` the two namespaces become indistinguishable by pattern
        // alone. At this point the only bracketed numbers present are
        // genuine `[m]` money citations, so `\[(\d+)\]` can't collide with
        // a docnum that happens to share the same integer.
        let section_attributions = attribute_sentences(embed, &with_money, citation_map).await?;
        attributions.insert(key.to_string(), section_attributions);

        let with_docs = resolve_document_citations(&with_money, known_documents, citation_map);
        *note.section_mut(key).expect("known key") = with_docs;
    }

    Ok((note, attributions))
}

#[cfg(test)]
mod tests {
    use super::*;
    use billtrace_llm::Error as LlmError;
    use billtrace_models::Currency;

    #[derive(Debug)]
    struct FakeEmbed;

    impl EmbeddingClient for FakeEmbed {
        async fn embed(&self, sentences: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
            Ok(sentences
                .iter()
                .map(|s| {
                    let len = s.len() as f32;
                    vec![len, 1.0]
                })
                .collect())
        }
    }

    #[test]
    fn exact_document_name_becomes_docnum_citation() {
        let mut map = CitationMap::default();
        let known = vec!["HB999".to_string()];
        let result = resolve_document_citations("Appropriates funds (HB999).", &known, &mut map);
        assert_eq!(result, "Appropriates funds [1].");
        assert_eq!(map.documents.get(&1), Some(&"HB999".to_string()));
    }

    #[test]
    fn prefix_match_when_exact_not_found() {
        let mut map = CitationMap::default();
        let known = vec!["HB999_HD1_HSCR7_".to_string()];
        let result = resolve_document_citations("Per the report (HB999_HD1).", &known, &mut map);
        assert_eq!(result, "Per the report [1].");
    }

    #[test]
    fn unresolvable_parenthetical_is_left_untouched() {
        let mut map = CitationMap::default();
        let known = vec!["HB999".to_string()];
        let result = resolve_document_citations("See (unrelated note).", &known, &mut map);
        assert_eq!(result, "See (unrelated note).");
        assert!(map.documents.is_empty());
    }

    #[test]
    fn money_citation_appends_numnum_after_amount() {
        let mut map = CitationMap::default();
        let visible = vec![MoneyOccurrence {
            amount: 250000.0,
            currency: Currency::Usd,
            filename: "HB999.txt".to_string(),
            context: "Appropriates $250,000 for pilot.".to_string(),
            offset_chars: 0,
        }];
        let result = resolve_money_citations(
            "Appropriates $250,000 for pilot.",
            &visible,
            |_| DocumentType::Introduction,
            &mut map,
        );
        assert!(result.contains("$250,000 [1]"));
    }

    #[test]
    fn amounts_with_no_visible_occurrence_are_left_uncited() {
        let mut map = CitationMap::default();
        let result = resolve_money_citations("Costs $999 today.", &[], |_| DocumentType::Other, &mut map);
        assert_eq!(result, "Costs $999 today.");
    }

    #[tokio::test]
    async fn every_sentence_has_zero_or_one_best_chunk() {
        let embed = FakeEmbed;
        let mut map = CitationMap::default();
        map.numbers.insert(
            1,
            CitedMoney {
                amount: 100.0,
                filename: "HB1.txt".to_string(),
                context: "The agency requests 100 dollars for travel.".to_string(),
                doc_type: DocumentType::Introduction,
            },
        );
        let body = "This is the first sentence [1]. This is unrelated.";
        let attributions = attribute_sentences(&embed, body, &map).await.unwrap();
        assert_eq!(attributions.len(), 2);
        assert!(attributions[0].best_chunk_index.is_some());
        assert!(attributions[1].best_chunk_index.is_none());
    }

    #[tokio::test]
    async fn docnum_and_numnum_sharing_an_integer_do_not_cross_attribute() {
        // The sentence cites document HB1 (destined for docnum 1) and has no
        // money amount in it; a different sentence cites $100 (numnum 1).
        // If attribution ran after document citations were rewritten, both
        // `[1]`s would look identical and the document-citation sentence
        // would wrongly pick up the money occurrence's context.
        let embed = FakeEmbed;
        let mut map = CitationMap::default();
        let known = vec!["HB1".to_string()];
        let visible = vec![MoneyOccurrence {
            amount: 100.0,
            currency: Currency::Usd,
            filename: "HB1.txt".to_string(),
            context: "The agency requests 100 dollars for travel.".to_string(),
            offset_chars: 0,
        }];

        let body = "Per the introduction (HB1) no funds are requested. Travel costs $100.";
        let mut note = FiscalNote::default();
        note.overview = body.to_string();

        let (note, attributions) = enhance_note(
            &embed,
            note,
            &known,
            &visible,
            |_| DocumentType::Introduction,
            &mut map,
        )
        .await
        .unwrap();

        assert_eq!(
            note.overview,
            "Per the introduction [1] no funds are requested. Travel costs $100 [1]."
        );

        let overview_attributions = &attributions["overview"];
        let doc_sentence = &overview_attributions[0];
        assert!(
            doc_sentence.attributed_chunks.is_empty(),
            "a bare document citation must not be attributed to the money occurrence sharing its number"
        );
    }
}
