//! External tools called by the workers
//!
//! - Web search: [`TavilySearch`] (API key) or [`DuckDuckGoSearch`] (HTML, no key)
//! - Code execution: [`ProcessSandbox`]

mod duckduckgo;
mod sandbox;
mod tavily;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::TaskRouterError;

pub use duckduckgo::DuckDuckGoSearch;
pub use sandbox::{dedent, CodeSandbox, Language, ProcessSandbox, DEFAULT_SANDBOX_TIMEOUT};
pub use tavily::{SearchDepth, TavilyError, TavilySearch, Topic};

/// One web search result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub content: String,
}

impl SearchHit {
    pub fn new(
        title: impl Into<String>,
        url: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            content: content.into(),
        }
    }
}

/// Web search backend
#[async_trait]
pub trait WebSearch: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, TaskRouterError>;

    /// Backend name for logging
    fn name(&self) -> &str;
}
