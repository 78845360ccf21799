//! Topic collection, summarization and delivery

pub mod collect;
pub mod deliver;
pub mod retry;
pub mod run;
pub mod summarize;

// Re-export the main entry point for convenience
pub use run::{RunConfig, run_digest};
