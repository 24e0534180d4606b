use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Vertex executions allowed per run unless the caller says otherwise
pub const DEFAULT_MAX_STEPS: usize = 15;

/// Long enough for a slow research call plus its web search
pub const DEFAULT_VERTEX_TIMEOUT: Duration = Duration::from_secs(300);

/// Limits applied to a single run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub max_steps: usize,

    #[serde(with = "humantime_serde")]
    pub vertex_timeout: Duration,

    /// Log every route taken at debug level
    #[serde(default = "enabled")]
    pub tracing_enabled: bool,
}

fn enabled() -> bool {
    true
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_steps: DEFAULT_MAX_STEPS,
            vertex_timeout: DEFAULT_VERTEX_TIMEOUT,
            tracing_enabled: true,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn with_vertex_timeout(mut self, timeout: Duration) -> Self {
        self.vertex_timeout = timeout;
        self
    }

    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.tracing_enabled = enabled;
        self
    }
}
