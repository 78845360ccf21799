use chrono::{DateTime, Utc};
use tracing::{Instrument, error, info, info_span, warn};

use super::collect::{collect_messages, enumerate_topics};
use super::deliver::{deliver_summary, format_summary_message, notify_no_summaries};
use super::summarize::Summarizer;
use crate::ai::SummaryModel;
use crate::core::config::{AppConfig, DigestSettings};
use crate::core::models::{RunReport, Topic, TopicOutcome};
use crate::core::window::TimeWindow;
use crate::errors::DigestError;
use crate::prompt::PromptContext;
use crate::telegram::ForumGateway;

/// Everything a run needs besides its two collaborators.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub settings: DigestSettings,
    pub test_mode: bool,
    pub topic_filter: Option<String>,
    pub ignored_topics: Vec<String>,
    pub window: TimeWindow,
    pub prompt: PromptContext,
}

impl RunConfig {
    /// Resolve the time window and prompt context for a run starting at `now`.
    #[must_use]
    pub fn from_app_config(config: &AppConfig, now: DateTime<Utc>) -> Self {
        let window = TimeWindow::resolve(now, config.last_run_at, config.display_timezone);
        let prompt = PromptContext {
            window_label: window.label(),
            window_hours: window.hours(),
            today: now.with_timezone(&config.display_timezone).date_naive(),
            language: config.summary_language.clone(),
            vip_speakers: config.vip_speakers.clone(),
        };
        Self {
            settings: DigestSettings::from_config(config),
            test_mode: config.test_mode,
            topic_filter: config.topic_filter.clone(),
            ignored_topics: config.ignored_topics.clone(),
            window,
            prompt,
        }
    }
}

/// Apply the title filter and the ignore list.
#[must_use]
pub fn select_topics(topics: Vec<Topic>, filter: Option<&str>, ignored: &[String]) -> Vec<Topic> {
    topics
        .into_iter()
        .filter(|t| filter.is_none_or(|f| t.title.contains(f)))
        .filter(|t| {
            !ignored
                .iter()
                .any(|entry| *entry == t.title || entry.parse::<i32>().is_ok_and(|id| id == t.id))
        })
        .collect()
}

async fn process_topic<G, M>(
    gateway: &G,
    model: &M,
    run: &RunConfig,
    topic: &Topic,
    key_slot: usize,
) -> TopicOutcome
where
    G: ForumGateway + ?Sized,
    M: SummaryModel + ?Sized,
{
    let collected = match collect_messages(gateway, topic, &run.window, &run.settings).await {
        Ok(collected) => collected,
        Err(e) => {
            error!("Failed to collect messages for topic '{}': {}", topic.title, e);
            return TopicOutcome::CollectionFailed(e.to_string());
        }
    };

    if collected.is_empty() {
        info!("Topic '{}': no messages in window", topic.title);
        return TopicOutcome::NoActivity;
    }
    info!(
        "Topic '{}': {} messages in window{}",
        topic.title,
        collected.len(),
        if collected.truncated { " (truncated)" } else { "" }
    );

    let summarizer = Summarizer::new(model, &run.settings, &run.prompt);
    let summary = match summarizer
        .summarize_topic(&topic.title, &collected, key_slot)
        .await
    {
        Ok(summary) => summary,
        Err(failure) => {
            warn!("No summary for topic '{}': {}", topic.title, failure);
            return TopicOutcome::SummaryFailed(failure.to_string());
        }
    };

    let payload = format_summary_message(&topic.title, collected.len(), &summary.body());
    deliver_summary(gateway, topic, &payload, run.test_mode).await
}

/// Summarize every selected topic once, in order.
///
/// # Errors
///
/// Returns an error if topic enumeration fails. Per-topic failures and a
/// failed test-mode notice are logged and the report is still returned.
pub async fn run_digest<G, M>(gateway: &G, model: &M, run: &RunConfig) -> Result<RunReport, DigestError>
where
    G: ForumGateway + ?Sized,
    M: SummaryModel + ?Sized,
{
    let run_id = uuid::Uuid::new_v4();
    let span = info_span!("digest_run", run_id = %run_id, test_mode = run.test_mode);

    async move {
        info!("Summarizing window {}", run.window.label());

        let topics = enumerate_topics(gateway, run.settings.topic_page_size).await?;
        let topics = select_topics(topics, run.topic_filter.as_deref(), &run.ignored_topics);

        let mut report = RunReport::default();
        if topics.is_empty() {
            match &run.topic_filter {
                Some(filter) => info!("No topics matched filter '{}'.", filter),
                None => info!("No forum topics found."),
            }
            return Ok(report);
        }
        info!("Found {} topics. Processing recent messages...", topics.len());

        for (index, topic) in topics.iter().enumerate() {
            let outcome = process_topic(gateway, model, run, topic, index).await;
            report.record(&topic.title, outcome);
        }

        info!(
            "Run finished: {} sent, {} without activity, {} failed",
            report.summaries_sent(),
            report.no_activity().len(),
            report.failed().len()
        );

        if run.test_mode && report.summaries_sent() == 0 {
            if let Err(e) = notify_no_summaries(gateway, &report, run.window.hours()).await {
                error!("Failed to send the no-summary notice: {}", e);
            }
        }

        Ok(report)
    }
    .instrument(span)
    .await
}
