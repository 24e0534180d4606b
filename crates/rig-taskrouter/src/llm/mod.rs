//! LLM Provider abstractions
//!
//! Workers never talk to a provider directly; they go through the
//! [`ModelGateway`], which pins the model configuration and call timeout.
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │   Router / Supervisor / Workers         │
//! └─────────────────┬───────────────────────┘
//!                   │ complete(prompt)
//!                   ▼
//! ┌─────────────────────────────────────────┐
//! │        ModelGateway                     │
//! │  - fixed LLMConfig (temperature 0.3)    │
//! │  - timeout → ModelUnavailable           │
//! └─────────────────┬───────────────────────┘
//!                   │ LLMProvider (trait)
//!          ┌────────┼──────────────────┐
//!          ▼        ▼                  ▼
//! ┌──────────────┐ ┌───────────────┐ ┌──────────────────┐
//! │ OpenAI-compat│ │RigAgentAdapter│ │ ScriptedProvider │
//! │ (LiteLLM)    │ │ (rig Agent<M>)│ │ (tests)          │
//! └──────────────┘ └───────────────┘ └──────────────────┘
//! ```

mod config;
mod gateway;
mod mock;
mod openai_compat;
mod provider;

pub use config::{LLMConfig, TokenUsage, DEFAULT_MODEL, DEFAULT_TEMPERATURE};
pub use gateway::{ModelGateway, DEFAULT_MODEL_TIMEOUT};
pub use mock::ScriptedProvider;
pub use openai_compat::OpenAICompatibleProvider;
pub use provider::{LLMProvider, LLMResponse};
