//! Local text heuristics: relevance scoring and theme extraction.
//!
//! These never call the language model; they are deterministic functions of the text.

use std::collections::{BTreeSet, HashMap};

/// Words that are long enough to pass the theme length filter but carry no topic.
pub const STOP_WORDS: &[&str] = &[
    "that", "this", "with", "from", "they", "have", "will", "been", "were", "said", "what",
    "when", "where", "would", "could", "should", "about", "which", "their", "there", "these",
    "those",
];

pub const MAX_THEMES_PER_SOURCE: usize = 5;

/// Lowercased word terms, split on anything that is not alphanumeric.
pub fn terms(text: &str) -> BTreeSet<String> {
    let mut out = BTreeSet::new();
    let mut cur = String::new();
    for ch in text.chars() {
        if ch.is_alphanumeric() {
            cur.extend(ch.to_lowercase());
        } else if !cur.is_empty() {
            out.insert(std::mem::take(&mut cur));
        }
    }
    if !cur.is_empty() {
        out.insert(cur);
    }
    out
}

/// Whitespace-delimited word count.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// `|query ∩ text| / |query|`, or 0 when the query has no terms.
pub fn overlap_ratio(query_terms: &BTreeSet<String>, text: &str) -> f64 {
    if query_terms.is_empty() {
        return 0.0;
    }
    let text_terms = terms(text);
    let hits = query_terms.intersection(&text_terms).count();
    hits as f64 / query_terms.len() as f64
}

/// Relevance heuristic on a 0..=10 scale.
///
/// Weighted blend of query overlap in the content (40%), query overlap in the generated
/// summary (40%), and content length saturating at 100 words (20%), scaled by 10 and capped.
pub fn relevance_score(content: &str, query: &str, summary: &str) -> f64 {
    let q = terms(query);
    let content_overlap = overlap_ratio(&q, content);
    let summary_overlap = overlap_ratio(&q, summary);
    let quality = (word_count(content) as f64 / 100.0).min(1.0);
    let blended = content_overlap * 4.0 + summary_overlap * 4.0 + quality * 2.0;
    10.0 * blended.clamp(0.0, 1.0)
}

/// Counts items and returns `(item, count)` by descending count.
///
/// Ties keep first-seen order.
pub fn rank_by_frequency<I, S>(items: I) -> Vec<(String, usize)>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut ranked: Vec<(String, usize)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for item in items {
        let item = item.as_ref();
        match index.get(item) {
            Some(&i) => ranked[i].1 += 1,
            None => {
                index.insert(item.to_string(), ranked.len());
                ranked.push((item.to_string(), 1));
            }
        }
    }
    // `sort_by` is stable, which keeps first-seen order among equal counts.
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked
}

fn theme_candidate(raw: &str) -> Option<String> {
    let w = raw
        .trim_matches(|c: char| !c.is_alphanumeric())
        .to_lowercase();
    if w.chars().count() <= 4 || STOP_WORDS.contains(&w.as_str()) {
        return None;
    }
    Some(w)
}

/// Up to five recurring keywords from `content`, title-cased.
///
/// A keyword is a word longer than four characters, not a stop word, seen more than once.
pub fn extract_themes(content: &str) -> Vec<String> {
    rank_by_frequency(content.split_whitespace().filter_map(theme_candidate))
        .into_iter()
        .filter(|(_, n)| *n > 1)
        .take(MAX_THEMES_PER_SOURCE)
        .map(|(w, _)| title_case(&w))
        .collect()
}

/// Uppercases the first letter of each alphabetic run, lowercases the rest.
pub fn title_case(word: &str) -> String {
    let mut out = String::with_capacity(word.len());
    let mut boundary = true;
    for ch in word.chars() {
        if ch.is_alphabetic() {
            if boundary {
                out.extend(ch.to_uppercase());
            } else {
                out.extend(ch.to_lowercase());
            }
            boundary = false;
        } else {
            out.push(ch);
            boundary = true;
        }
    }
    out
}

/// First `max_chars` characters of `s` (char-boundary safe).
pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

/// Like `truncate_chars`, appending `...` when something was cut.
pub fn clip_with_ellipsis(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let mut out = truncate_chars(s, max_chars);
    out.push_str("...");
    out
}
