//! Search providers.
//!
//! The pipeline talks to the external paper source through the
//! [`SearchProvider`] trait, one page of raw hits at a time. The shipped
//! implementation scrapes Google Scholar over plain HTTP; tests substitute a
//! fake. Nothing outside this module touches HTML or Scholar URLs.

use crate::error::{PaperpipeError, Result};
use async_trait::async_trait;
use regex::Regex;
use scraper::{Html, Selector};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// Default Google Scholar URL
pub const DEFAULT_SCHOLAR_URL: &str = "https://scholar.google.com";

/// User agent string for requests
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// Results per Scholar page; a short page means there is no next page.
const PAGE_SIZE: usize = 10;

/// Opaque pagination cursor, produced and consumed by the same provider.
pub type PageToken = String;

/// One raw search hit before normalization. `None` means the source did not
/// expose the field.
#[derive(Debug, Clone, Default)]
pub struct RawHit {
    pub title: Option<String>,
    pub url: Option<String>,
    pub authors: Option<String>,
    pub year: Option<String>,
    pub snippet: Option<String>,
    pub venue: Option<String>,
    pub citations: Option<String>,
}

/// One fetched page of results plus the cursor for the following page.
#[derive(Debug, Default)]
pub struct ProviderPage {
    pub hits: Vec<RawHit>,
    pub next: Option<PageToken>,
}

/// A paged source of paper search results.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Display name, used as the venue fallback and in logs.
    fn name(&self) -> &str;

    /// Fetch one page of hits. `token` of `None` starts a fresh query;
    /// a `next` of `None` in the returned page ends pagination.
    async fn fetch_page(&self, query: &str, token: Option<&str>) -> Result<ProviderPage>;
}

/// Google Scholar over HTTP.
pub struct ScholarProvider {
    client: reqwest::Client,
    base_url: String,
    settle_delay: Duration,
}

impl ScholarProvider {
    /// Create a provider against the default Scholar URL.
    ///
    /// `settle_delay_secs` is waited before the first page of each query.
    pub fn new(settle_delay_secs: u64) -> Result<Self> {
        Self::with_base_url(DEFAULT_SCHOLAR_URL, settle_delay_secs)
    }

    /// Create a provider against a mirror or test server.
    pub fn with_base_url(base_url: &str, settle_delay_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .cookie_store(true)
            .build()
            .map_err(|e| PaperpipeError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            settle_delay: Duration::from_secs(settle_delay_secs),
        })
    }
}

#[async_trait]
impl SearchProvider for ScholarProvider {
    fn name(&self) -> &str {
        "Google Scholar"
    }

    async fn fetch_page(&self, query: &str, token: Option<&str>) -> Result<ProviderPage> {
        let start: usize = match token {
            Some(t) => t
                .parse()
                .map_err(|_| PaperpipeError::Parse(format!("Bad page token: {}", t)))?,
            None => 0,
        };

        if token.is_none() && !self.settle_delay.is_zero() {
            tokio::time::sleep(self.settle_delay).await;
        }

        // Random delay to avoid detection
        let jitter = rand::random::<u64>() % 1500 + 500;
        tokio::time::sleep(Duration::from_millis(jitter)).await;

        let url = build_search_url(&self.base_url, query, start)?;
        debug!(start, url = %url, "Fetching page");

        let html = fetch_html(&self.client, &url).await?;

        if html.contains("Solving the above CAPTCHA") || html.contains("unusual traffic") {
            warn!(start, "CAPTCHA detected");
            return Err(PaperpipeError::Captcha);
        }

        let hits = parse_result_items(&html)?;
        info!(start, count = hits.len(), "Parsed results");

        let next = (hits.len() == PAGE_SIZE).then(|| (start + PAGE_SIZE).to_string());
        Ok(ProviderPage { hits, next })
    }
}

/// Build a Scholar search URL for one page of results.
fn build_search_url(base_url: &str, query: &str, start: usize) -> Result<Url> {
    let mut url = Url::parse(&format!("{}/scholar", base_url))
        .map_err(|e| PaperpipeError::Config(format!("Invalid base URL: {}", e)))?;

    {
        let mut params = url.query_pairs_mut();
        params.append_pair("q", query);
        params.append_pair("hl", "en-US"); // Force English locale for consistent parsing
        params.append_pair("start", &start.to_string());
    }

    Ok(url)
}

/// Fetch page content using browser-like headers.
async fn fetch_html(client: &reqwest::Client, url: &Url) -> Result<String> {
    let response = client
        .get(url.as_str())
        .header("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8")
        .header("Accept-Language", "en-US,en;q=0.9")
        .header("Upgrade-Insecure-Requests", "1")
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        return Err(PaperpipeError::Api {
            code: i32::from(status.as_u16()),
            message: format!("HTTP error: {}", status),
        });
    }

    response.text().await.map_err(PaperpipeError::Network)
}

/// Parse Scholar result HTML into raw hits.
///
/// Hits without a parseable title block are dropped here; every other field
/// is optional and left for the search stage to default.
pub fn parse_result_items(html: &str) -> Result<Vec<RawHit>> {
    let document = Html::parse_document(html);

    let item_selector = Selector::parse("div.gs_r.gs_or.gs_scl")
        .map_err(|e| PaperpipeError::Parse(e.to_string()))?;
    let title_selector =
        Selector::parse("h3.gs_rt").map_err(|e| PaperpipeError::Parse(e.to_string()))?;
    let link_selector =
        Selector::parse("h3.gs_rt a").map_err(|e| PaperpipeError::Parse(e.to_string()))?;
    let meta_selector =
        Selector::parse("div.gs_a").map_err(|e| PaperpipeError::Parse(e.to_string()))?;
    let snippet_selector =
        Selector::parse("div.gs_rs").map_err(|e| PaperpipeError::Parse(e.to_string()))?;
    let cite_selector =
        Selector::parse("div.gs_fl a").map_err(|e| PaperpipeError::Parse(e.to_string()))?;

    let year_regex =
        Regex::new(r"\b(19|20)\d{2}\b").map_err(|e| PaperpipeError::Parse(e.to_string()))?;
    let cite_regex =
        Regex::new(r"Cited by\s*(\d+)").map_err(|e| PaperpipeError::Parse(e.to_string()))?;

    let mut hits = Vec::new();

    for item in document.select(&item_selector) {
        let mut hit = RawHit::default();

        // Title and direct URL
        if let Some(title_elem) = item.select(&title_selector).next() {
            if let Some(link) = item.select(&link_selector).next() {
                hit.title = Some(link.text().collect::<String>().trim().to_string());
                hit.url = link
                    .value()
                    .attr("href")
                    .filter(|h| !h.is_empty())
                    .map(String::from);
            } else {
                // Title without link
                hit.title = Some(title_elem.text().collect::<String>().trim().to_string());
            }
        }

        // Authors, year and venue from the metadata line ("A, B - Venue, 2021 - site")
        if let Some(meta_elem) = item.select(&meta_selector).next() {
            let meta_text = meta_elem.text().collect::<String>();
            let parts: Vec<&str> = meta_text.split(" - ").collect();

            if let Some(authors) = parts.first() {
                let authors = authors.trim();
                if !authors.is_empty() {
                    hit.authors = Some(authors.to_string());
                }
            }

            if parts.len() >= 2 {
                let venue_year = parts[1];
                if let Some(year_match) = year_regex.find(venue_year) {
                    hit.year = Some(year_match.as_str().to_string());
                    let venue = venue_year[..year_match.start()]
                        .trim()
                        .trim_end_matches(',');
                    if !venue.is_empty() {
                        hit.venue = Some(venue.to_string());
                    }
                } else {
                    let venue = venue_year.trim();
                    if !venue.is_empty() {
                        hit.venue = Some(venue.to_string());
                    }
                }
            }
        }

        // Abstract snippet
        if let Some(snippet_elem) = item.select(&snippet_selector).next() {
            hit.snippet = Some(snippet_elem.text().collect::<String>().trim().to_string());
        }

        // Citation count from the "Cited by" footer link
        for link in item.select(&cite_selector) {
            let href = link.value().attr("href").unwrap_or("");
            if href.contains("cites=") {
                let text = link.text().collect::<String>();
                if let Some(caps) = cite_regex.captures(&text) {
                    if let Some(count) = caps.get(1) {
                        hit.citations = Some(count.as_str().to_string());
                        break;
                    }
                }
            }
        }

        // Only keep hits with a title block
        if hit.title.as_deref().is_some_and(|t| !t.is_empty()) {
            hits.push(hit);
        }
    }

    Ok(hits)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const RESULT_HTML: &str = r#"
<html><body>
<div class="gs_r gs_or gs_scl">
  <div class="gs_ri">
    <h3 class="gs_rt"><a href="https://example.com/rough.pdf">Intrusion Detection via Rough Sets</a></h3>
    <div class="gs_a">J Doe, A Smith - Fuzzy Systems, 2021 - example.com</div>
    <div class="gs_rs">We study rough set approximations for anomaly detection.</div>
    <div class="gs_fl"><a href="/scholar?cites=123">Cited by 42</a></div>
  </div>
</div>
<div class="gs_r gs_or gs_scl">
  <div class="gs_ri">
    <h3 class="gs_rt">Unlinked Technical Report</h3>
    <div class="gs_a">B Jones - 1999</div>
  </div>
</div>
</body></html>
"#;

    #[test]
    fn test_build_search_url() {
        let url = build_search_url(DEFAULT_SCHOLAR_URL, "machine learning", 10).unwrap();
        assert!(url.as_str().contains("q=machine+learning"));
        assert!(url.as_str().contains("start=10"));
    }

    #[test]
    fn test_parse_result_items() {
        let hits = parse_result_items(RESULT_HTML).unwrap();
        assert_eq!(hits.len(), 2);

        let first = &hits[0];
        assert_eq!(
            first.title.as_deref(),
            Some("Intrusion Detection via Rough Sets")
        );
        assert_eq!(first.url.as_deref(), Some("https://example.com/rough.pdf"));
        assert_eq!(first.authors.as_deref(), Some("J Doe, A Smith"));
        assert_eq!(first.year.as_deref(), Some("2021"));
        assert_eq!(first.venue.as_deref(), Some("Fuzzy Systems"));
        assert_eq!(first.citations.as_deref(), Some("42"));

        let second = &hits[1];
        assert_eq!(second.title.as_deref(), Some("Unlinked Technical Report"));
        assert!(second.url.is_none());
        assert_eq!(second.year.as_deref(), Some("1999"));
        assert!(second.venue.is_none());
        assert!(second.citations.is_none());
    }

    #[test]
    fn test_parse_empty_html() {
        let hits = parse_result_items("<html><body></body></html>").unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_page_short_page_ends_pagination() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/scholar"))
            .and(query_param("q", "rough sets"))
            .respond_with(ResponseTemplate::new(200).set_body_string(RESULT_HTML))
            .mount(&server)
            .await;

        let provider = ScholarProvider::with_base_url(&server.uri(), 0).unwrap();
        let page = provider.fetch_page("rough sets", None).await.unwrap();
        assert_eq!(page.hits.len(), 2);
        assert!(page.next.is_none());
    }

    #[tokio::test]
    async fn test_fetch_page_captcha_detected() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/scholar"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("<html>Please show you're not a robot. Solving the above CAPTCHA</html>"),
            )
            .mount(&server)
            .await;

        let provider = ScholarProvider::with_base_url(&server.uri(), 0).unwrap();
        let err = provider.fetch_page("anything", None).await.unwrap_err();
        assert!(matches!(err, PaperpipeError::Captcha));
    }

    #[tokio::test]
    async fn test_fetch_page_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/scholar"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let provider = ScholarProvider::with_base_url(&server.uri(), 0).unwrap();
        let err = provider.fetch_page("anything", None).await.unwrap_err();
        assert!(matches!(err, PaperpipeError::Api { code: 503, .. }));
    }
}
