use researchpipe_core::{ImageCandidate, ImageFilter, ImageRef};

const SKIP_PATTERNS: &[&str] = &[
    "icon", "logo", "button", "arrow", "pixel", "spacer", "tracking", "analytics", "beacon",
    "counter",
];
/// Matched only as a whole path segment or word, so `/uploads/` and `/downloads/` pass.
const SKIP_WORDS: &[&str] = &["ads"];
const SMALL_SIZES: &[&str] = &["16x16", "24x24", "32x32", "48x48", "1x1"];
const SKIP_FILES: &[&str] = &["favicon", "sprite", "thumbnail", "avatar"];
const CONTENT_HINTS: &[&str] = &["content", "article", "photo", "image", "media", "gallery"];
const IMAGE_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png", ".gif", ".webp", ".svg"];

/// URL and alt-text heuristics for telling content images from page chrome.
#[derive(Debug, Clone)]
pub struct ContentImageFilter {
    max_per_page: usize,
}

impl Default for ContentImageFilter {
    fn default() -> Self {
        Self { max_per_page: 5 }
    }
}

impl ContentImageFilter {
    pub fn new(max_per_page: usize) -> Self {
        Self { max_per_page }
    }

    /// Absolute form of an `<img src>`: protocol-relative → https, relative → joined.
    pub fn normalize_url(src: &str, page_url: &str) -> Option<String> {
        if let Some(rest) = src.strip_prefix("//") {
            return Some(format!("https://{rest}"));
        }
        if src.starts_with("http://") || src.starts_with("https://") {
            return Some(src.to_string());
        }
        let base = url::Url::parse(page_url).ok()?;
        base.join(src).ok().map(|u| u.to_string())
    }

    pub fn is_content_image(url: &str, alt: &str) -> bool {
        let url_lc = url.to_lowercase();
        let alt_lc = alt.to_lowercase();
        if SKIP_PATTERNS
            .iter()
            .any(|p| url_lc.contains(p) || alt_lc.contains(p))
            || has_word(&url_lc, SKIP_WORDS)
            || has_word(&alt_lc, SKIP_WORDS)
        {
            return false;
        }
        if SMALL_SIZES.iter().any(|s| url_lc.contains(s))
            || SKIP_FILES.iter().any(|f| url_lc.contains(f))
        {
            return false;
        }
        if alt.trim().chars().count() > 10 {
            return true;
        }
        if CONTENT_HINTS.iter().any(|h| url_lc.contains(h)) {
            return true;
        }
        IMAGE_EXTENSIONS.iter().any(|e| url_lc.contains(e))
            && !["icon", "thumb", "small"].iter().any(|s| url_lc.contains(s))
    }
}

fn has_word(text: &str, words: &[&str]) -> bool {
    text.split(|c: char| !c.is_alphanumeric())
        .any(|w| words.contains(&w))
}

impl ImageFilter for ContentImageFilter {
    fn select(&self, page_url: &str, candidates: &[ImageCandidate]) -> Vec<ImageRef> {
        candidates
            .iter()
            .filter(|c| !c.src.starts_with("data:"))
            .filter_map(|c| {
                let url = Self::normalize_url(&c.src, page_url)?;
                let alt = c.alt.clone().unwrap_or_default();
                Self::is_content_image(&url, &alt).then(|| ImageRef {
                    url,
                    alt,
                    source_page: page_url.to_string(),
                })
            })
            .take(self.max_per_page)
            .collect()
    }
}
