#![allow(clippy::missing_errors_doc)]

use anyhow::Context;
use topic_digest::ai::LlmClient;
use topic_digest::core::config::AppConfig;
use topic_digest::telegram::TelegramClient;
use topic_digest::telegram::client::connect_authorized;
use topic_digest::worker::{RunConfig, run_digest};
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    topic_digest::setup_logging();

    let config = AppConfig::from_env().map_err(|e| {
        error!("Config error: {}", e);
        e
    })?;
    let run = RunConfig::from_app_config(&config, chrono::Utc::now());
    info!(
        "Starting digest run (test_mode={}, {} Gemini key(s), model {})",
        config.test_mode,
        config.gemini_api_keys.len(),
        config.gemini_model
    );

    let client = connect_authorized(
        config.tg_api_id,
        &config.tg_api_hash,
        &config.tg_session_string,
    )
    .await
    .context("Telegram login failed")?;
    let gateway = TelegramClient::for_group(client, &config.target_group).await?;
    let model = LlmClient::new(config.gemini_api_keys.clone(), config.gemini_model.clone())?;

    let report = run_digest(&gateway, &model, &run).await?;
    info!(
        "Digest complete: {} sent, {} quiet, {} failed",
        report.summaries_sent(),
        report.no_activity().len(),
        report.failed().len()
    );
    Ok(())
}
