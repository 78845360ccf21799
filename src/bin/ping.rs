//! Send one message to `TEST_TARGET_GROUP` to check that a session can post.

use std::env;

use anyhow::Context;
use topic_digest::core::config::parse_target_group;
use topic_digest::telegram::client::{connect_authorized, resolve_target};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    topic_digest::setup_logging();

    let require = |name: &str| env::var(name).with_context(|| format!("{name} is required"));
    let api_id = require("TG_API_ID")?
        .trim()
        .parse::<i32>()
        .context("TG_API_ID must be a number")?;
    let api_hash = require("TG_API_HASH")?;
    let session = require("TG_SESSION_STRING")?;
    let target = parse_target_group(&require("TEST_TARGET_GROUP")?)?;
    let message = env::var("TEST_MESSAGE").unwrap_or_else(|_| "test".to_string());

    let client = connect_authorized(api_id, &api_hash, &session).await?;
    let chat = resolve_target(&client, &target).await?;
    client
        .send_message(chat, message.as_str())
        .await
        .context("Failed to send test message")?;

    let me = client.get_me().await?;
    let sender = me
        .username()
        .map_or_else(|| me.id().to_string(), |u| format!("@{u}"));
    info!("Sent '{}' as {} to {:?}", message, sender, target);
    Ok(())
}
