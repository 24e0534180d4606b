//! Tavily web search
//!
//! `POST {endpoint}/search` with a bearer key. One request per search: any
//! failure comes back at once and the researcher falls back to its
//! no-results finding.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::info;

use super::{SearchHit, WebSearch};
use crate::error::TaskRouterError;

const DEFAULT_ENDPOINT: &str = "https://api.tavily.com";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_MAX_RESULTS: u32 = 5;
/// Upper bound accepted by the API
const MAX_RESULTS_LIMIT: u32 = 20;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SearchDepth {
    #[default]
    Basic,
    Advanced,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Topic {
    #[default]
    General,
    News,
}

/// Failures talking to Tavily
#[derive(Debug, thiserror::Error)]
pub enum TavilyError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("rejected API key")]
    Unauthorized,

    #[error("rate limited")]
    RateLimited,

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("undecodable response: {0}")]
    Decode(String),
}

impl TavilyError {
    fn from_status(status: StatusCode, body: String) -> Self {
        match status {
            StatusCode::UNAUTHORIZED => TavilyError::Unauthorized,
            StatusCode::TOO_MANY_REQUESTS => TavilyError::RateLimited,
            other => TavilyError::Status {
                status: other.as_u16(),
                body,
            },
        }
    }
}

impl From<reqwest::Error> for TavilyError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TavilyError::Timeout
        } else if e.is_decode() {
            TavilyError::Decode(e.to_string())
        } else {
            TavilyError::Connection(e.to_string())
        }
    }
}

impl From<TavilyError> for TaskRouterError {
    fn from(e: TavilyError) -> Self {
        TaskRouterError::retrieval_failure(format!("tavily: {}", e))
    }
}

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    max_results: u32,
    search_depth: SearchDepth,
    topic: Topic,
    include_answer: bool,
    include_raw_content: bool,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    content: String,
}

impl From<SearchResult> for SearchHit {
    fn from(r: SearchResult) -> Self {
        SearchHit::new(r.title, r.url, r.content)
    }
}

/// Tavily client used by the researcher for deep questions
///
/// ```ignore
/// let search = TavilySearch::new(std::env::var("TAVILY_API_KEY")?);
/// let hits = search.search("page replacement algorithms").await?;
/// ```
pub struct TavilySearch {
    client: Client,
    api_key: String,
    endpoint: String,
    timeout: Duration,
    max_results: u32,
    search_depth: SearchDepth,
    topic: Topic,
}

impl TavilySearch {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout: DEFAULT_TIMEOUT,
            max_results: DEFAULT_MAX_RESULTS,
            search_depth: SearchDepth::default(),
            topic: Topic::default(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_results(mut self, max_results: u32) -> Self {
        self.max_results = max_results.clamp(1, MAX_RESULTS_LIMIT);
        self
    }

    pub fn with_search_depth(mut self, depth: SearchDepth) -> Self {
        self.search_depth = depth;
        self
    }

    pub fn with_topic(mut self, topic: Topic) -> Self {
        self.topic = topic;
        self
    }

    fn request<'a>(&self, query: &'a str) -> SearchRequest<'a> {
        SearchRequest {
            query,
            max_results: self.max_results,
            search_depth: self.search_depth,
            topic: self.topic,
            include_answer: false,
            include_raw_content: false,
        }
    }

    async fn post(&self, query: &str) -> Result<SearchResponse, TavilyError> {
        let response = self
            .client
            .post(format!("{}/search", self.endpoint))
            .bearer_auth(&self.api_key)
            .timeout(self.timeout)
            .json(&self.request(query))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(TavilyError::from_status(status, text));
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl WebSearch for TavilySearch {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, TaskRouterError> {
        let response = self.post(query).await?;
        info!(query, hits = response.results.len(), "Tavily search done");
        Ok(response.results.into_iter().map(SearchHit::from).collect())
    }

    fn name(&self) -> &str {
        "tavily"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static_assertions::assert_impl_all!(TavilyError: Send, Sync);

    #[test]
    fn test_default_request_body() {
        let search = TavilySearch::new("k");
        let json = serde_json::to_value(search.request("virtual memory")).unwrap();

        assert_eq!(json["query"], "virtual memory");
        assert_eq!(json["max_results"], 5);
        assert_eq!(json["search_depth"], "basic");
        assert_eq!(json["topic"], "general");
        assert_eq!(json["include_answer"], false);
        assert_eq!(json["include_raw_content"], false);
    }

    #[test]
    fn test_builder_clamps_and_trims() {
        let search = TavilySearch::new("k")
            .with_max_results(50)
            .with_search_depth(SearchDepth::Advanced)
            .with_topic(Topic::News)
            .with_endpoint("http://localhost:9999/");

        assert_eq!(search.max_results, MAX_RESULTS_LIMIT);
        assert_eq!(search.endpoint, "http://localhost:9999");
        let json = serde_json::to_value(search.request("q")).unwrap();
        assert_eq!(json["search_depth"], "advanced");
        assert_eq!(json["topic"], "news");
    }

    #[test]
    fn test_status_mapping() {
        assert!(matches!(
            TavilyError::from_status(StatusCode::UNAUTHORIZED, String::new()),
            TavilyError::Unauthorized
        ));
        assert!(matches!(
            TavilyError::from_status(StatusCode::TOO_MANY_REQUESTS, String::new()),
            TavilyError::RateLimited
        ));
        assert!(matches!(
            TavilyError::from_status(StatusCode::BAD_GATEWAY, "upstream".into()),
            TavilyError::Status { status: 502, .. }
        ));
    }

    #[test]
    fn test_becomes_retrieval_failure() {
        let error: TaskRouterError = TavilyError::RateLimited.into();
        assert!(matches!(error, TaskRouterError::RetrievalFailure(_)));
        assert_eq!(error.to_string(), "Retrieval failure: tavily: rate limited");
    }
}
