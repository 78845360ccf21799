//! All AI/LLM functionality

pub mod client;

// Re-export main types for convenience
pub use client::{Generation, LlmClient, SummaryModel, estimate_tokens};
