mod common;

use common::{FakeGateway, topic};
use topic_digest::core::models::{Destination, RunReport, TopicOutcome};
use topic_digest::worker::deliver::{
    AI_DISCLAIMER, build_no_summary_notice, deliver_summary, destination_for,
    format_summary_message, notify_no_summaries,
};

#[test]
fn test_summary_message_layout() {
    let text = format_summary_message("Alpha", 42, "- point");
    assert_eq!(
        text,
        format!("[Summary] Topic: Alpha (42 messages)\n{AI_DISCLAIMER}\n\n- point")
    );
}

#[test]
fn test_destination_follows_test_mode() {
    let mut alpha = topic(5, "Alpha");
    alpha.top_message = 55;
    assert_eq!(destination_for(&alpha, true), Destination::SavedMessages);
    assert_eq!(
        destination_for(&alpha, false),
        Destination::TopicReply { reply_to: 55 }
    );
}

#[tokio::test]
async fn test_delivery_replies_in_the_topic() {
    let gateway = FakeGateway::new();
    let outcome = deliver_summary(&gateway, &topic(5, "Alpha"), "payload", false).await;

    assert_eq!(outcome, TopicOutcome::Delivered);
    assert_eq!(
        gateway.sent(),
        vec![(Destination::TopicReply { reply_to: 5 }, "payload".to_string())]
    );
}

#[tokio::test]
async fn test_test_mode_delivers_to_saved_messages() {
    let gateway = FakeGateway::new().forbidding_replies("CHAT_WRITE_FORBIDDEN");
    let outcome = deliver_summary(&gateway, &topic(5, "Alpha"), "payload", true).await;

    assert_eq!(outcome, TopicOutcome::Delivered);
    assert_eq!(gateway.sent()[0].0, Destination::SavedMessages);
}

#[tokio::test]
async fn test_write_forbidden_redirects_to_saved_messages() {
    let gateway = FakeGateway::new().forbidding_replies("CHAT_WRITE_FORBIDDEN");
    let outcome = deliver_summary(&gateway, &topic(5, "Alpha"), "payload", false).await;

    assert_eq!(
        outcome,
        TopicOutcome::WriteRestricted("CHAT_WRITE_FORBIDDEN".to_string())
    );
    let sent = gateway.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, Destination::SavedMessages);
    assert_eq!(
        sent[0].1,
        "(Could not post in topic 'Alpha': CHAT_WRITE_FORBIDDEN)\n\npayload"
    );
    assert!(outcome.is_failure());
}

#[tokio::test]
async fn test_other_send_errors_are_recorded_not_raised() {
    let gateway = FakeGateway::new().failing_sends();
    let outcome = deliver_summary(&gateway, &topic(5, "Alpha"), "payload", false).await;

    assert!(matches!(outcome, TopicOutcome::DeliveryFailed(ref reason) if reason.contains("connection reset")));
    assert!(gateway.sent().is_empty());
}

#[test]
fn test_no_summary_notice_lists_quiet_and_failed_topics() {
    let mut report = RunReport::default();
    report.record("General", TopicOutcome::NoActivity);
    report.record("Alpha", TopicOutcome::SummaryFailed("prompt_blocked: OTHER".into()));
    report.record("Perps", TopicOutcome::NoActivity);

    assert_eq!(
        build_no_summary_notice(&report, 4),
        "No summaries sent from the last 4 hours.\n\
         No activity in topics: General, Perps\n\
         Failed to summarize topics: Alpha"
    );
    assert_eq!(report.failed(), vec!["Alpha"]);
    assert_eq!(
        build_no_summary_notice(&RunReport::default(), 12),
        "No summaries sent from the last 12 hours."
    );
}

#[test]
fn test_no_summary_notice_separates_delivery_failures() {
    let mut report = RunReport::default();
    report.record("Alpha", TopicOutcome::SummaryFailed("empty response".into()));
    report.record("Perps", TopicOutcome::DeliveryFailed("connection reset".into()));
    report.record("Locked", TopicOutcome::WriteRestricted("TOPIC_CLOSED".into()));

    assert_eq!(report.summary_failures(), vec!["Alpha"]);
    assert_eq!(report.delivery_failures(), vec!["Perps", "Locked"]);
    assert_eq!(
        build_no_summary_notice(&report, 4),
        "No summaries sent from the last 4 hours.\n\
         Failed to summarize topics: Alpha\n\
         Failed to deliver summaries for topics: Perps, Locked"
    );
}

#[tokio::test]
async fn test_notice_goes_to_saved_messages() {
    let gateway = FakeGateway::new();
    let mut report = RunReport::default();
    report.record("General", TopicOutcome::NoActivity);

    notify_no_summaries(&gateway, &report, 4).await.unwrap();

    let sent = gateway.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, Destination::SavedMessages);
    assert!(sent[0].1.contains("No activity in topics: General"));
}
