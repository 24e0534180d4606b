//! Compatibility layer for Rig framework integration
//!
//! ```text
//! ┌──────────────────────────────┐
//! │ LLMProvider trait            │
//! │ (messages + LLMConfig)       │
//! └──────────────┬───────────────┘
//!                │ adapts
//!                ▼
//! ┌──────────────────────────────┐
//! │ RigAgentAdapter              │
//! │ (wraps rig::agent::Agent<M>) │
//! └──────────────┬───────────────┘
//!                ▼
//!        Rig providers (OpenAI, ...)
//! ```

mod rig_agent_adapter;

pub use rig_agent_adapter::RigAgentAdapter;
