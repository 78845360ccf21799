use tracing::{error, info, warn};

use crate::core::models::{Destination, RunReport, Topic, TopicOutcome};
use crate::errors::DigestError;
use crate::prompt::SUMMARY_MARKER;
use crate::telegram::ForumGateway;

pub const AI_DISCLAIMER: &str = "⚠️ AI-generated summary; it may be inaccurate or incomplete.";

/// Full text of a summary post: marker header, disclaimer, body.
#[must_use]
pub fn format_summary_message(topic_title: &str, message_count: usize, body: &str) -> String {
    format!(
        "{SUMMARY_MARKER} {topic_title} ({message_count} messages)\n{AI_DISCLAIMER}\n\n{body}"
    )
}

/// Test runs keep everything private; normal runs reply in the topic.
#[must_use]
pub fn destination_for(topic: &Topic, test_mode: bool) -> Destination {
    if test_mode {
        Destination::SavedMessages
    } else {
        Destination::TopicReply {
            reply_to: topic.top_message,
        }
    }
}

/// Post a formatted summary and report what happened.
///
/// A write-permission rejection sends the same content, annotated with the
/// reason, to Saved Messages instead. No failure here ends the run.
pub async fn deliver_summary<G>(
    gateway: &G,
    topic: &Topic,
    payload: &str,
    test_mode: bool,
) -> TopicOutcome
where
    G: ForumGateway + ?Sized,
{
    let destination = destination_for(topic, test_mode);
    let err = match gateway.send_message(destination, payload).await {
        Ok(()) => {
            match destination {
                Destination::SavedMessages => info!("Sent summary to Saved Messages"),
                Destination::TopicReply { .. } => info!("Sent summary to topic '{}'", topic.title),
            }
            return TopicOutcome::Delivered;
        }
        Err(e) => e,
    };

    let reason = match err {
        DigestError::WriteForbidden(reason) => reason,
        other => {
            error!(
                "Failed to deliver summary for topic '{}': {}",
                topic.title, other
            );
            return TopicOutcome::DeliveryFailed(other.to_string());
        }
    };

    warn!(
        "Posting to topic '{}' was refused ({}), redirecting to Saved Messages",
        topic.title, reason
    );
    let redirected = format!(
        "(Could not post in topic '{}': {reason})\n\n{payload}",
        topic.title
    );
    match gateway
        .send_message(Destination::SavedMessages, &redirected)
        .await
    {
        Ok(()) => TopicOutcome::WriteRestricted(reason),
        Err(e) => {
            error!(
                "Redirect to Saved Messages failed for topic '{}': {}",
                topic.title, e
            );
            TopicOutcome::DeliveryFailed(format!("{reason}; redirect failed: {e}"))
        }
    }
}

/// Notice sent when a test run produced no summaries.
#[must_use]
pub fn build_no_summary_notice(report: &RunReport, window_hours: i64) -> String {
    let mut lines = vec![format!(
        "No summaries sent from the last {window_hours} hours."
    )];
    let quiet = report.no_activity();
    if !quiet.is_empty() {
        lines.push(format!("No activity in topics: {}", quiet.join(", ")));
    }
    let unsummarized = report.summary_failures();
    if !unsummarized.is_empty() {
        lines.push(format!(
            "Failed to summarize topics: {}",
            unsummarized.join(", ")
        ));
    }
    let undelivered = report.delivery_failures();
    if !undelivered.is_empty() {
        lines.push(format!(
            "Failed to deliver summaries for topics: {}",
            undelivered.join(", ")
        ));
    }
    lines.join("\n")
}

/// # Errors
///
/// Returns an error if the notice cannot be sent.
pub async fn notify_no_summaries<G>(
    gateway: &G,
    report: &RunReport,
    window_hours: i64,
) -> Result<(), DigestError>
where
    G: ForumGateway + ?Sized,
{
    let notice = build_no_summary_notice(report, window_hours);
    gateway
        .send_message(Destination::SavedMessages, &notice)
        .await?;
    info!("Sent notice to Saved Messages about missing summaries");
    Ok(())
}
