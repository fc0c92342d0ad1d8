use crate::extract::norm_ws;
use html_scraper::{Html, Selector};
use researchpipe_core::{Error, Result, SearchProvider, SearchQuery, SearchResponse, SearchResult};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

pub const DUCKDUCKGO_HTML_ENDPOINT: &str = "https://html.duckduckgo.com/html/";

fn timeout_ms_from_query(q: &SearchQuery) -> u64 {
    // Provider requests can hang indefinitely without an explicit timeout.
    q.timeout_ms.unwrap_or(20_000).clamp(1_000, 60_000)
}

fn env_nonempty(k: &str) -> Option<String> {
    std::env::var(k)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// DuckDuckGo's region code for a two-letter language hint.
fn duckduckgo_region(language: &str) -> Option<&'static str> {
    match language {
        "en" => Some("us-en"),
        "zh" => Some("cn-zh"),
        _ => None,
    }
}

/// Resolves DuckDuckGo's `/l/?uddg=` redirect wrapper to the target URL.
fn unwrap_redirect(href: &str) -> Option<String> {
    let href = href.trim();
    let absolute = match href.strip_prefix("//") {
        Some(rest) => format!("https://{rest}"),
        None if href.starts_with('/') => format!("https://duckduckgo.com{href}"),
        None => href.to_string(),
    };
    let u = url::Url::parse(&absolute).ok()?;
    let is_ddg = u
        .host_str()
        .is_some_and(|h| h == "duckduckgo.com" || h.ends_with(".duckduckgo.com"));
    if is_ddg && u.path().starts_with("/l/") {
        let target = u
            .query_pairs()
            .find(|(k, _)| k == "uddg")
            .map(|(_, v)| v.into_owned())?;
        return url::Url::parse(&target)
            .ok()
            .filter(|t| matches!(t.scheme(), "http" | "https"))
            .map(|t| t.to_string());
    }
    matches!(u.scheme(), "http" | "https").then(|| u.to_string())
}

fn is_duckduckgo(url: &str) -> bool {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.contains("duckduckgo.com")))
        .unwrap_or(true)
}

/// Parses DuckDuckGo's HTML results page into at most `limit` ranked results.
///
/// Result containers are read first; when none parse (layout drift), every absolute
/// non-DuckDuckGo link on the page is taken instead, with its text as the title.
pub fn parse_duckduckgo_html(html: &str, limit: usize) -> Vec<SearchResult> {
    let doc = Html::parse_document(html);
    let (Ok(container), Ok(title_sel), Ok(snippet_sel), Ok(any_link)) = (
        Selector::parse(".result"),
        Selector::parse("a.result__a"),
        Selector::parse(".result__snippet"),
        Selector::parse("a[href]"),
    ) else {
        return Vec::new();
    };

    let mut seen = BTreeSet::new();
    let mut out = Vec::new();
    for el in doc.select(&container) {
        if out.len() >= limit {
            return out;
        }
        let Some(a) = el.select(&title_sel).next() else {
            continue;
        };
        let title = norm_ws(&a.text().collect::<String>());
        if title.chars().count() < 3 {
            continue;
        }
        let Some(url) = a.value().attr("href").and_then(unwrap_redirect) else {
            continue;
        };
        if is_duckduckgo(&url) || !seen.insert(url.clone()) {
            continue;
        }
        let description = el
            .select(&snippet_sel)
            .next()
            .map(|s| norm_ws(&s.text().collect::<String>()))
            .unwrap_or_default();
        out.push(SearchResult {
            title,
            url,
            description,
        });
    }
    if !out.is_empty() {
        return out;
    }

    tracing::debug!("no duckduckgo result containers parsed; falling back to page links");
    for a in doc.select(&any_link) {
        if out.len() >= limit {
            break;
        }
        let Some(href) = a.value().attr("href") else {
            continue;
        };
        if !(href.starts_with("http://") || href.starts_with("https://") || href.starts_with("//"))
        {
            continue;
        }
        let Some(url) = unwrap_redirect(href) else {
            continue;
        };
        let title = norm_ws(&a.text().collect::<String>());
        if title.chars().count() < 3 || is_duckduckgo(&url) || !seen.insert(url.clone()) {
            continue;
        }
        out.push(SearchResult {
            title,
            url,
            description: String::new(),
        });
    }
    out
}

/// Keyless web search over DuckDuckGo's HTML endpoint.
#[derive(Debug, Clone)]
pub struct DuckDuckGoSearchProvider {
    client: reqwest::Client,
    endpoint: String,
    results_limit: usize,
}

impl DuckDuckGoSearchProvider {
    pub fn new(client: reqwest::Client, results_limit: usize) -> Self {
        Self {
            client,
            endpoint: DUCKDUCKGO_HTML_ENDPOINT.to_string(),
            results_limit,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait::async_trait]
impl SearchProvider for DuckDuckGoSearchProvider {
    fn name(&self) -> &'static str {
        "duckduckgo"
    }

    async fn search(&self, q: &SearchQuery) -> Result<SearchResponse> {
        let t0 = Instant::now();
        let limit = q
            .max_results
            .unwrap_or(self.results_limit)
            .min(self.results_limit.max(1));
        let mut req = self
            .client
            .get(&self.endpoint)
            .query(&[("q", q.query.as_str())]);
        if let Some(kl) = q.language.as_deref().and_then(duckduckgo_region) {
            req = req.query(&[("kl", kl)]);
        }
        let resp = req
            .timeout(std::time::Duration::from_millis(timeout_ms_from_query(q)))
            .send()
            .await
            .map_err(|e| Error::Search(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Search(format!("duckduckgo search HTTP {status}")));
        }
        let body = resp.text().await.map_err(|e| Error::Search(e.to_string()))?;
        let fetched_ms = t0.elapsed().as_millis();

        let results = parse_duckduckgo_html(&body, limit);
        tracing::debug!(query = %q.query, results = results.len(), "duckduckgo search");

        let mut timings_ms = BTreeMap::new();
        timings_ms.insert("fetch".to_string(), fetched_ms);
        timings_ms.insert("search".to_string(), t0.elapsed().as_millis());
        Ok(SearchResponse {
            results,
            provider: "duckduckgo".to_string(),
            timings_ms,
        })
    }
}

#[derive(Debug, Deserialize)]
struct SearxngSearchResponse {
    results: Option<Vec<SearxngResult>>,
}

#[derive(Debug, Deserialize)]
struct SearxngResult {
    url: Option<String>,
    title: Option<String>,
    content: Option<String>,
}

/// Search through a self-hosted SearXNG instance's JSON API.
#[derive(Debug, Clone)]
pub struct SearxngSearchProvider {
    client: reqwest::Client,
    endpoint: String,
    results_limit: usize,
}

impl SearxngSearchProvider {
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>, results_limit: usize) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            results_limit,
        }
    }

    pub fn from_env(client: reqwest::Client, results_limit: usize) -> Result<Self> {
        let endpoint = env_nonempty("RESEARCHPIPE_SEARXNG_ENDPOINT").ok_or_else(|| {
            Error::NotConfigured("missing RESEARCHPIPE_SEARXNG_ENDPOINT".to_string())
        })?;
        Ok(Self::new(client, endpoint, results_limit))
    }

    fn endpoint_search_for(base_endpoint: &str) -> String {
        // Accept either a base URL (…/), or a full /search endpoint.
        let mut base = base_endpoint.trim().trim_end_matches('/').to_string();
        if !base.ends_with("/search") {
            base.push_str("/search");
        }
        base
    }
}

#[async_trait::async_trait]
impl SearchProvider for SearxngSearchProvider {
    fn name(&self) -> &'static str {
        "searxng"
    }

    async fn search(&self, q: &SearchQuery) -> Result<SearchResponse> {
        let t0 = Instant::now();
        let max_results = q
            .max_results
            .unwrap_or(self.results_limit)
            .min(self.results_limit.max(1));

        let mut req = self
            .client
            .get(Self::endpoint_search_for(&self.endpoint))
            .query(&[("q", q.query.as_str()), ("format", "json")]);
        if let Some(lang) = q.language.as_deref() {
            req = req.query(&[("language", lang)]);
        }

        let resp = req
            .timeout(std::time::Duration::from_millis(timeout_ms_from_query(q)))
            .send()
            .await
            .map_err(|e| Error::Search(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Search(format!("searxng search HTTP {status}")));
        }
        let parsed: SearxngSearchResponse = resp
            .json()
            .await
            .map_err(|e| Error::Search(e.to_string()))?;

        let mut out = Vec::new();
        for r in parsed.results.unwrap_or_default() {
            if out.len() >= max_results {
                break;
            }
            let Some(url) = r.url else { continue };
            out.push(SearchResult {
                title: r.title.unwrap_or_default(),
                url,
                description: r.content.unwrap_or_default(),
            });
        }

        let mut timings_ms = BTreeMap::new();
        timings_ms.insert("search".to_string(), t0.elapsed().as_millis());
        Ok(SearchResponse {
            results: out,
            provider: "searxng".to_string(),
            timings_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::Query, http::StatusCode, routing::get, Json, Router};
    use std::collections::HashMap;
    use std::net::SocketAddr;

    const DDG_PAGE: &str = r#"<html><body>
      <div class="result">
        <h2><a class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fenergy.example.org%2Freport&amp;rut=abc">Energy  Report 2024</a></h2>
        <a class="result__snippet">Renewables grew <b>fast</b>.</a>
      </div>
      <div class="result">
        <a class="result__a" href="https://news.example.com/solar">Solar news</a>
      </div>
      <div class="result"><a class="result__a" href="https://x.example.com/">ok</a></div>
      <div class="result">
        <a class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fenergy.example.org%2Freport">Duplicate report</a>
      </div>
      <div class="result"><a class="result__a" href="https://duckduckgo.com/about">About DuckDuckGo</a></div>
    </body></html>"#;

    struct EnvGuard {
        k: &'static str,
        prev: Option<String>,
    }

    impl EnvGuard {
        fn set(k: &'static str, v: &str) -> Self {
            let prev = std::env::var(k).ok();
            std::env::set_var(k, v);
            Self { k, prev }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            if let Some(v) = self.prev.take() {
                std::env::set_var(self.k, v);
            } else {
                std::env::remove_var(self.k);
            }
        }
    }

    #[test]
    fn parses_result_containers_and_unwraps_redirects() {
        let rs = parse_duckduckgo_html(DDG_PAGE, 10);
        assert_eq!(
            rs,
            vec![
                SearchResult {
                    title: "Energy Report 2024".to_string(),
                    url: "https://energy.example.org/report".to_string(),
                    description: "Renewables grew fast.".to_string(),
                },
                SearchResult {
                    title: "Solar news".to_string(),
                    url: "https://news.example.com/solar".to_string(),
                    description: String::new(),
                },
            ]
        );
        assert_eq!(parse_duckduckgo_html(DDG_PAGE, 1).len(), 1);
    }

    #[test]
    fn falls_back_to_plain_links_when_layout_changes() {
        let html = r#"<body>
            <a href="https://duckduckgo.com/settings">Settings page</a>
            <a href="/relative">Relative link</a>
            <a href="https://wind.example.org/a">Wind power basics</a>
            <a href="https://wind.example.org/a">Wind power again</a>
        </body>"#;
        let rs = parse_duckduckgo_html(html, 10);
        assert_eq!(rs.len(), 1);
        assert_eq!(rs[0].url, "https://wind.example.org/a");
        assert_eq!(rs[0].title, "Wind power basics");
    }

    #[test]
    fn searxng_endpoint_accepts_base_or_search_path() {
        assert_eq!(
            SearxngSearchProvider::endpoint_search_for("http://localhost:8888/"),
            "http://localhost:8888/search"
        );
        assert_eq!(
            SearxngSearchProvider::endpoint_search_for("http://localhost:8888/search"),
            "http://localhost:8888/search"
        );
    }

    #[test]
    fn searxng_from_env_requires_an_endpoint() {
        let _g = EnvGuard::set("RESEARCHPIPE_SEARXNG_ENDPOINT", "  ");
        let err = SearxngSearchProvider::from_env(reqwest::Client::new(), 10).unwrap_err();
        assert!(matches!(err, Error::NotConfigured(_)));
    }

    #[test]
    fn timeouts_are_clamped() {
        let mut q = SearchQuery::new("x");
        assert_eq!(timeout_ms_from_query(&q), 20_000);
        q.timeout_ms = Some(10);
        assert_eq!(timeout_ms_from_query(&q), 1_000);
        q.timeout_ms = Some(10_000_000);
        assert_eq!(timeout_ms_from_query(&q), 60_000);
    }

    async fn serve(app: Router) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    #[tokio::test]
    async fn duckduckgo_provider_sends_query_and_region() {
        let app = Router::new().route(
            "/html/",
            get(|Query(params): Query<HashMap<String, String>>| async move {
                if params.get("q").map(String::as_str) != Some("solar energy")
                    || params.get("kl").map(String::as_str) != Some("cn-zh")
                {
                    return (StatusCode::BAD_REQUEST, String::new());
                }
                (StatusCode::OK, DDG_PAGE.to_string())
            }),
        );
        let addr = serve(app).await;
        let p = DuckDuckGoSearchProvider::new(reqwest::Client::new(), 10)
            .with_endpoint(format!("http://{addr}/html/"));
        let mut q = SearchQuery::new("solar energy");
        q.language = Some("zh".to_string());
        let resp = p.search(&q).await.unwrap();
        assert_eq!(resp.provider, "duckduckgo");
        assert_eq!(resp.results.len(), 2);
        assert!(resp.timings_ms.contains_key("search"));
    }

    #[tokio::test]
    async fn searxng_provider_maps_results_and_http_errors() {
        let app = Router::new()
            .route(
                "/search",
                get(|Query(params): Query<HashMap<String, String>>| async move {
                    assert_eq!(params.get("format").map(String::as_str), Some("json"));
                    Json(serde_json::json!({
                        "results": [
                            {"url": "https://a.example.com", "title": "A", "content": "first"},
                            {"title": "no url"},
                            {"url": "https://b.example.com", "title": "B"},
                            {"url": "https://c.example.com", "title": "C"}
                        ]
                    }))
                }),
            )
            .route(
                "/broken/search",
                get(|| async { StatusCode::SERVICE_UNAVAILABLE }),
            );
        let addr = serve(app).await;

        let p = SearxngSearchProvider::new(reqwest::Client::new(), format!("http://{addr}"), 2);
        let resp = p.search(&SearchQuery::new("wind")).await.unwrap();
        assert_eq!(resp.provider, "searxng");
        let urls: Vec<_> = resp.results.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(urls, vec!["https://a.example.com", "https://b.example.com"]);
        assert_eq!(resp.results[1].description, "");

        let broken =
            SearxngSearchProvider::new(reqwest::Client::new(), format!("http://{addr}/broken"), 2);
        let err = broken.search(&SearchQuery::new("wind")).await.unwrap_err();
        assert!(matches!(err, Error::Search(ref m) if m.contains("503")));
    }
}
