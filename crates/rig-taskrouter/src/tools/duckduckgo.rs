//! DuckDuckGo HTML search
//!
//! Used when no Tavily key is configured. DuckDuckGo has no free JSON API,
//! so results are scraped from the HTML endpoint.

use async_trait::async_trait;
use reqwest::Client;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{SearchHit, WebSearch};
use crate::error::TaskRouterError;

const DEFAULT_ENDPOINT: &str = "https://html.duckduckgo.com";
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

pub struct DuckDuckGoSearch {
    client: Client,
    endpoint: String,
    max_results: usize,
    timeout: Duration,
}

impl DuckDuckGoSearch {
    pub fn new(max_results: usize) -> Self {
        Self {
            client: Client::new(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            max_results,
            timeout: Duration::from_secs(30),
        }
    }

    /// Point the client at another base URL
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Parse result blocks out of the HTML page
    fn parse_html(&self, html: &str) -> Vec<SearchHit> {
        let mut hits = Vec::new();
        let mut seen = HashSet::new();

        // Each organic result starts with an anchor of class "result__a"
        for block in html.split("class=\"result__a\"").skip(1) {
            if hits.len() >= self.max_results {
                break;
            }

            let Some(url) = extract_href(block) else {
                continue;
            };
            if url.contains("duckduckgo.com") || !seen.insert(url.clone()) {
                continue;
            }

            let title = block
                .find('>')
                .and_then(|start| {
                    let rest = &block[start + 1..];
                    rest.find("</a>").map(|end| strip_tags(&rest[..end]))
                })
                .filter(|t| !t.is_empty())
                .or_else(|| extract_domain(&url))
                .unwrap_or_else(|| "Result".to_string());

            let content = block
                .find("result__snippet")
                .and_then(|pos| {
                    let rest = &block[pos..];
                    let start = rest.find('>')? + 1;
                    let end = rest[start..].find("</a>").or_else(|| rest[start..].find("</div>"))?;
                    Some(strip_tags(&rest[start..start + end]))
                })
                .unwrap_or_default();

            hits.push(SearchHit::new(title, url, content));
        }

        hits
    }
}

#[async_trait]
impl WebSearch for DuckDuckGoSearch {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, TaskRouterError> {
        let url = format!("{}/html/?q={}", self.endpoint, urlencoding::encode(query));
        debug!(url = %url, "Fetching search results");

        let response = self
            .client
            .get(&url)
            .header("User-Agent", USER_AGENT)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| TaskRouterError::retrieval_failure(format!("DuckDuckGo request failed: {}", e)))?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(TaskRouterError::retrieval_failure(
                "Rate limited by search provider, please wait",
            ));
        }
        if !status.is_success() {
            return Err(TaskRouterError::retrieval_failure(format!(
                "DuckDuckGo HTTP {}",
                status
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| TaskRouterError::retrieval_failure(e.to_string()))?;
        let hits = self.parse_html(&body);

        if hits.is_empty() {
            warn!(query, "No search results found");
        } else {
            info!(query, count = hits.len(), "Search completed");
        }
        Ok(hits)
    }

    fn name(&self) -> &str {
        "duckduckgo"
    }
}

/// Resolve the result link, unwrapping DuckDuckGo's `uddg=` redirect
fn extract_href(block: &str) -> Option<String> {
    let start = block.find("href=\"")? + 6;
    let rest = &block[start..];
    let href = html_unescape(&rest[..rest.find('"')?]);

    if let Some(pos) = href.find("uddg=") {
        let encoded = &href[pos + 5..];
        let encoded = encoded.split('&').next().unwrap_or(encoded);
        let decoded = urlencoding::decode(encoded).ok()?.into_owned();
        return decoded.starts_with("http").then_some(decoded);
    }
    if let Some(stripped) = href.strip_prefix("//") {
        return Some(format!("https://{}", stripped));
    }
    href.starts_with("http").then_some(href)
}

/// Extract the domain name from a URL.
fn extract_domain(url: &str) -> Option<String> {
    url.split("//")
        .nth(1)?
        .split('/')
        .next()
        .map(|s| s.to_string())
}

fn strip_tags(fragment: &str) -> String {
    let mut out = String::with_capacity(fragment.len());
    let mut in_tag = false;
    for c in fragment.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    html_unescape(out.split_whitespace().collect::<Vec<_>>().join(" ").as_str())
}

fn html_unescape(s: &str) -> String {
    s.replace("&amp;", "&")
        .replace("&quot;", "\"")
        .replace("&#x27;", "'")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const SAMPLE: &str = r#"
<div class="result results_links">
  <h2 class="result__title">
    <a rel="nofollow" class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fen.wikipedia.org%2Fwiki%2FTCP&amp;rut=abc">Transmission <b>Control</b> Protocol</a>
  </h2>
  <a class="result__snippet" href="x">The <b>TCP</b> handshake uses SYN &amp; ACK.</a>
</div>
<div class="result results_links">
  <a rel="nofollow" class="result__a" href="https://example.com/tcp">Example TCP</a>
  <a class="result__snippet" href="y">Second snippet</a>
</div>
<div class="result results_links">
  <a rel="nofollow" class="result__a" href="https://example.com/tcp">Duplicate</a>
</div>
"#;

    #[test]
    fn test_parse_html_results() {
        let hits = DuckDuckGoSearch::new(5).parse_html(SAMPLE);

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].url, "https://en.wikipedia.org/wiki/TCP");
        assert_eq!(hits[0].title, "Transmission Control Protocol");
        assert_eq!(hits[0].content, "The TCP handshake uses SYN & ACK.");
        assert_eq!(hits[1].url, "https://example.com/tcp");
        assert_eq!(hits[1].content, "Second snippet");
    }

    #[test]
    fn test_parse_html_respects_limit() {
        let hits = DuckDuckGoSearch::new(1).parse_html(SAMPLE);
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn test_extract_domain() {
        assert_eq!(
            extract_domain("https://doc.rust-lang.org/book/"),
            Some("doc.rust-lang.org".to_string())
        );
        assert_eq!(extract_domain("no-scheme"), None);
    }

    #[tokio::test]
    async fn test_search_against_mock_server() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/html/"))
            .and(query_param("q", "tcp handshake"))
            .respond_with(ResponseTemplate::new(200).set_body_string(SAMPLE))
            .mount(&mock_server)
            .await;

        let search = DuckDuckGoSearch::new(5).with_endpoint(mock_server.uri());
        let hits = search.search("tcp handshake").await.unwrap();
        assert_eq!(hits.len(), 2);
    }

    #[tokio::test]
    async fn test_rate_limit_is_retrieval_failure() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&mock_server)
            .await;

        let search = DuckDuckGoSearch::new(5).with_endpoint(mock_server.uri());
        let err = search.search("x").await.unwrap_err();
        assert!(matches!(err, TaskRouterError::RetrievalFailure(_)));
    }
}
