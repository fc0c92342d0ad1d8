use html_scraper::{Html, Selector};
use researchpipe_core::ImageCandidate;
use std::collections::BTreeSet;

fn resolve(href: &str, base: Option<&url::Url>) -> Option<url::Url> {
    match url::Url::parse(href) {
        Ok(u) => Some(u),
        Err(_) => base.and_then(|b| b.join(href).ok()),
    }
}

/// Deduped absolute links from a parsed page.
///
/// - Resolves relative links against `base_url` when provided.
/// - Drops fragments and `javascript:`/`mailto:` targets.
/// - Returns at most `max_links`, in document order.
pub fn extract_links(doc: &Html, base_url: Option<&str>, max_links: usize) -> Vec<String> {
    let max_links = max_links.min(500);
    if max_links == 0 {
        return Vec::new();
    }
    let base = base_url.and_then(|u| url::Url::parse(u).ok());
    let Ok(sel) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    let mut seen = BTreeSet::new();
    let mut out = Vec::new();
    for el in doc.select(&sel) {
        if out.len() >= max_links {
            break;
        }
        let Some(href) = el.value().attr("href").map(str::trim) else {
            continue;
        };
        let href_lc = href.to_ascii_lowercase();
        if href.is_empty() || href_lc.starts_with("javascript:") || href_lc.starts_with("mailto:")
        {
            continue;
        }
        let Some(mut u) = resolve(href, base.as_ref()) else {
            continue;
        };
        u.set_fragment(None);
        let s = u.to_string();
        if seen.insert(s.clone()) {
            out.push(s);
        }
    }
    out
}

/// Raw `<img>` candidates in document order; `src` is left as written in the page.
pub fn extract_image_candidates(doc: &Html) -> Vec<ImageCandidate> {
    let Ok(sel) = Selector::parse("img[src]") else {
        return Vec::new();
    };
    doc.select(&sel)
        .filter_map(|el| {
            let src = el.value().attr("src")?.trim();
            if src.is_empty() {
                return None;
            }
            Some(ImageCandidate {
                src: src.to_string(),
                alt: el
                    .value()
                    .attr("alt")
                    .map(str::trim)
                    .filter(|a| !a.is_empty())
                    .map(str::to_string),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn links_are_absolute_deduped_and_fragment_free() {
        let doc = Html::parse_document(
            r##"<a href="/a#top">A</a><a href="/a">A again</a>
               <a href="https://other.org/x">X</a><a href="mailto:me@x.org">mail</a>
               <a href="javascript:void(0)">js</a><a href="rel/b">B</a>"##,
        );
        let links = extract_links(&doc, Some("https://example.com/dir/page"), 10);
        assert_eq!(
            links,
            vec![
                "https://example.com/a",
                "https://other.org/x",
                "https://example.com/dir/rel/b",
            ]
        );
        assert_eq!(extract_links(&doc, None, 10), vec!["https://other.org/x"]);
        assert_eq!(extract_links(&doc, Some("https://example.com/"), 1).len(), 1);
    }

    #[test]
    fn image_candidates_keep_src_and_alt() {
        let doc = Html::parse_document(
            r#"<img src="/chart.png" alt=" Installed capacity "><img src=""><img src="x.gif">"#,
        );
        let imgs = extract_image_candidates(&doc);
        assert_eq!(imgs.len(), 2);
        assert_eq!(imgs[0].src, "/chart.png");
        assert_eq!(imgs[0].alt.as_deref(), Some("Installed capacity"));
        assert_eq!(imgs[1].alt, None);
    }
}
