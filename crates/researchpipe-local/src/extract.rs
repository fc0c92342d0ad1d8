//! HTML → readable text for the browser backend.

use html_scraper::{ElementRef, Html, Selector};
use std::io::Cursor;

/// Preferred content containers, most specific first.
const CONTENT_SELECTORS: &[&str] = &[
    "main",
    "article",
    "[role='main']",
    ".content",
    ".main-content",
    "#content",
    "#main",
    ".post-content",
    ".entry-content",
    ".article-content",
];

const BOILERPLATE_PHRASES: &[&str] = &["Advertisement", "Skip to content"];

/// Convert HTML to readable plain text.
///
/// Deterministic and "good enough"; callers bound the output themselves.
pub fn html_to_text(html: &str, width: usize) -> String {
    html2text::from_read(Cursor::new(html.as_bytes()), width).unwrap_or_else(|_| html.to_string())
}

pub fn norm_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn page_title(doc: &Html) -> String {
    Selector::parse("title")
        .ok()
        .and_then(|sel| doc.select(&sel).next())
        .map(|el| norm_ws(&el.text().collect::<String>()))
        .unwrap_or_default()
}

/// Text of `el`, skipping script/style content, whitespace-normalized.
fn visible_text(el: &ElementRef) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for node in el.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|a| {
            a.value().as_element().is_some_and(|e| {
                matches!(e.name(), "script" | "style" | "noscript" | "template")
            })
        });
        if !hidden {
            parts.push(text);
        }
    }
    norm_ws(&parts.join(" "))
}

fn class_or_id_lc(el: &ElementRef) -> String {
    let mut out = String::new();
    if let Some(c) = el.value().attr("class") {
        out.push_str(c);
        out.push(' ');
    }
    if let Some(i) = el.value().attr("id") {
        out.push_str(i);
    }
    out.to_ascii_lowercase()
}

fn is_boilerplate_container(el: &ElementRef) -> bool {
    let s = class_or_id_lc(el);
    if s.is_empty() {
        return false;
    }
    [
        "nav", "navbar", "menu", "sidebar", "footer", "header", "banner", "cookie", "consent",
        "advert", "promo", "subscribe", "newsletter",
    ]
    .iter()
    .any(|bad| s.contains(bad))
}

fn link_text_chars(el: &ElementRef) -> usize {
    let Ok(sel) = Selector::parse("a") else {
        return 0;
    };
    el.select(&sel)
        .map(|a| a.text().map(|t| t.chars().count()).sum::<usize>())
        .sum()
}

/// Largest block matched by the first content selector that matches anything.
fn semantic_main_text(doc: &Html) -> Option<String> {
    for raw in CONTENT_SELECTORS {
        let Ok(sel) = Selector::parse(raw) else {
            continue;
        };
        let best = doc
            .select(&sel)
            .filter(|el| !is_boilerplate_container(el))
            .map(|el| visible_text(&el))
            .max_by_key(|t| t.chars().count());
        if let Some(text) = best.filter(|t| !t.is_empty()) {
            return Some(text);
        }
    }
    None
}

/// Densest non-link block among generic containers, for pages without semantic markup.
fn dense_block_text(doc: &Html, max_elems: usize) -> Option<String> {
    let sel = Selector::parse("section, div").ok()?;
    let mut best_score: i64 = 0;
    let mut best: Option<String> = None;
    for el in doc.select(&sel).take(max_elems) {
        if is_boilerplate_container(&el) {
            continue;
        }
        let text = visible_text(&el);
        let chars = text.chars().count();
        if chars < 20 {
            continue;
        }
        let links = link_text_chars(&el);
        let mut score = chars as i64 - 2 * links as i64;
        if links > chars / 2 {
            score -= 500;
        }
        if score > best_score {
            best_score = score;
            best = Some(text);
        }
    }
    best
}

/// Main readable text of a page.
///
/// Semantic containers first, then the densest generic block, then the whole document.
pub fn main_text(doc: &Html, html: &str) -> String {
    semantic_main_text(doc)
        .or_else(|| dense_block_text(doc, 20_000))
        .unwrap_or_else(|| norm_ws(&html_to_text(html, 200)))
}

/// Collapses whitespace and strips common page furniture.
pub fn clean_content(text: &str) -> String {
    let mut out = norm_ws(text);
    for phrase in BOILERPLATE_PHRASES {
        out = out.replace(phrase, "");
    }
    norm_ws(&out)
}

/// Sentences mentioning the query, most query words first, kept while they fit `budget`
/// characters. Returns `content` unchanged when nothing matches.
pub fn filter_by_query(content: &str, query: &str, budget: usize) -> String {
    let words: Vec<String> = query.split_whitespace().map(str::to_lowercase).collect();
    if words.is_empty() || content.is_empty() {
        return content.to_string();
    }
    let mut scored: Vec<(usize, &str)> = content
        .split('.')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| {
            let lc = s.to_lowercase();
            let score = words.iter().filter(|w| lc.contains(w.as_str())).count();
            (score > 0).then_some((score, s))
        })
        .collect();
    if scored.is_empty() {
        return content.to_string();
    }
    scored.sort_by(|a, b| b.0.cmp(&a.0));

    let mut out = String::new();
    let mut used = 0usize;
    for (_, sentence) in scored {
        let n = sentence.chars().count();
        if !out.is_empty() {
            if used + 2 + n > budget {
                break;
            }
            out.push_str(". ");
            used += 2;
        }
        out.push_str(sentence);
        used += n;
    }
    out
}

/// First `max_chars` characters plus `...` when cut; the flag reports the cut.
pub fn truncate_with_ellipsis(s: &str, max_chars: usize) -> (String, bool) {
    if s.chars().count() <= max_chars {
        return (s.to_string(), false);
    }
    let mut out: String = s.chars().take(max_chars).collect();
    out.push_str("...");
    (out, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn extracts_text_from_simple_html() {
        let html = r#"<html><body><h1>Hello</h1><p>world</p></body></html>"#;
        let out = html_to_text(html, 80);
        assert!(out.contains("Hello"));
        assert!(out.contains("world"));
    }

    #[test]
    fn main_text_prefers_semantic_containers() {
        let html = r#"
        <html><head><title> Solar  Report </title><script>var x = "hidden";</script></head><body>
          <nav class="nav"><a href="/x">Home</a></nav>
          <main><h1>Title</h1><p>Hello world.</p><script>track()</script><p>More text here.</p></main>
          <footer class="footer"><a href="/y">Privacy</a></footer>
        </body></html>
        "#;
        let doc = Html::parse_document(html);
        assert_eq!(page_title(&doc), "Solar Report");
        let out = main_text(&doc, html);
        assert!(out.contains("Hello world."));
        assert!(out.contains("More text here."));
        assert!(!out.contains("Privacy"));
        assert!(!out.contains("track()"));
    }

    #[test]
    fn main_text_picks_the_largest_match() {
        let html = r#"<body>
            <article>short one</article>
            <article>a much longer article body with many more words in it</article>
        </body>"#;
        let doc = Html::parse_document(html);
        assert_eq!(
            main_text(&doc, html),
            "a much longer article body with many more words in it"
        );
    }

    #[test]
    fn main_text_falls_back_to_dense_blocks_then_whole_page() {
        let html = r#"<body>
            <div class="sidebar"><a href="/a">one</a><a href="/b">two</a></div>
            <div><p>Dense paragraph text about wind turbines and grid storage.</p></div>
        </body>"#;
        let doc = Html::parse_document(html);
        assert!(main_text(&doc, html).starts_with("Dense paragraph text"));

        let bare = "<body><p>tiny</p></body>";
        let doc = Html::parse_document(bare);
        assert!(main_text(&doc, bare).contains("tiny"));
    }

    #[test]
    fn clean_content_strips_furniture() {
        assert_eq!(
            clean_content("Skip to content   Solar\n\n\n power Advertisement grows"),
            "Solar power grows"
        );
    }

    #[test]
    fn query_filter_ranks_sentences_and_respects_budget() {
        let text = "Cats sleep a lot. Solar energy is cheap. Renewable energy grows fast. Dogs bark";
        assert_eq!(
            filter_by_query(text, "renewable energy", 1_000),
            "Renewable energy grows fast. Solar energy is cheap"
        );
        assert_eq!(
            filter_by_query(text, "renewable energy", 30),
            "Renewable energy grows fast"
        );
        assert_eq!(filter_by_query(text, "volcano", 1_000), text);
    }

    #[test]
    fn truncation_marks_the_cut() {
        assert_eq!(truncate_with_ellipsis("abcdef", 3), ("abc...".to_string(), true));
        assert_eq!(truncate_with_ellipsis("abc", 3), ("abc".to_string(), false));
    }

    proptest! {
        #[test]
        fn truncation_never_exceeds_budget(s in ".{0,200}", n in 0usize..100) {
            let (out, cut) = truncate_with_ellipsis(&s, n);
            let limit = if cut { n + 3 } else { n.max(s.chars().count()) };
            prop_assert!(out.chars().count() <= limit);
        }
    }
}
