/// Topic Digest - summarizes recent activity in the topics of a Telegram forum group.
///
/// One run enumerates the open forum topics, collects each topic's messages
/// inside a time window, asks Gemini for a summary (chunked for busy topics)
/// and posts the result as a reply in the topic, or to Saved Messages in test
/// mode.
///
/// # Architecture
///
/// The system uses:
/// - grammers for the Telegram MTProto user session (`telegram` feature)
/// - reqwest for the Gemini `generateContent` REST endpoint
/// - tokio-retry for bounded, jittered retries of summary requests
/// - Tokio for async runtime
///
/// # Example
///
/// ```no_run
/// use topic_digest::ai::LlmClient;
/// use topic_digest::core::config::AppConfig;
/// use topic_digest::telegram::ForumGateway;
/// use topic_digest::worker::{RunConfig, run_digest};
///
/// async fn digest(gateway: &dyn ForumGateway) -> Result<(), Box<dyn std::error::Error>> {
///     // Set up structured logging
///     topic_digest::setup_logging();
///
///     let config = AppConfig::from_env()?;
///     let model = LlmClient::new(config.gemini_api_keys.clone(), config.gemini_model.clone())?;
///     let run = RunConfig::from_app_config(&config, chrono::Utc::now());
///
///     let report = run_digest(gateway, &model, &run).await?;
///     println!("{} summaries sent", report.summaries_sent());
///     Ok(())
/// }
/// ```
// Module declarations
pub mod ai;
pub mod core;
pub mod errors;
pub mod prompt;
pub mod telegram;
pub mod utils;
pub mod worker;

pub use ai::estimate_tokens;
pub use errors::DigestError;

/// Configure structured logging with JSON output.
///
/// The level comes from `RUST_LOG` and defaults to `info`. Calling this more
/// than once is harmless; later calls leave the first subscriber in place.
///
/// # Example
///
/// ```
/// // Initialize structured logging at the start of a run
/// topic_digest::setup_logging();
/// ```
pub fn setup_logging() {
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::prelude::*;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer().json().with_target(true);

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}
