use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tracing::{debug, info};

use crate::core::config::DigestSettings;
use crate::core::models::{
    CollectedMessages, MessagePage, MessageRecord, PeerRef, Topic, TopicCursor,
};
use crate::core::window::TimeWindow;
use crate::errors::DigestError;
use crate::telegram::ForumGateway;
use crate::utils::filters::summarizable_text;

/// Display labels for the senders seen during one collection pass.
#[derive(Debug, Default)]
pub struct EntityCache {
    labels: HashMap<i64, String>,
}

impl EntityCache {
    /// Record labels for every user and chat attached to a search page.
    pub fn absorb(&mut self, page: &MessagePage) {
        for user in &page.users {
            let label = user
                .username
                .as_deref()
                .filter(|u| !u.is_empty())
                .map(|u| format!("@{u}"))
                .or_else(|| user.first_name.clone().filter(|n| !n.is_empty()))
                .unwrap_or_else(|| user.id.to_string());
            self.labels.insert(user.id, label);
        }

        for chat in &page.chats {
            let label = chat
                .title
                .clone()
                .filter(|t| !t.is_empty())
                .or_else(|| {
                    chat.username
                        .as_deref()
                        .filter(|u| !u.is_empty())
                        .map(|u| format!("@{u}"))
                })
                .unwrap_or_else(|| chat.id.to_string());
            self.labels.insert(chat.id, label);
        }
    }

    /// Label for a sender, falling back to its raw id.
    #[must_use]
    pub fn label(&self, peer: Option<PeerRef>) -> String {
        match peer {
            Some(peer) => self
                .labels
                .get(&peer.id())
                .cloned()
                .unwrap_or_else(|| peer.id().to_string()),
            None => "Unknown".to_string(),
        }
    }
}

/// List open forum topics that have a reference message.
///
/// Paging stops when the reported total is reached, a page comes back short,
/// or a page brings no topic that was not already seen.
///
/// # Errors
///
/// Propagates any listing error from the gateway.
pub async fn enumerate_topics<G>(gateway: &G, page_size: usize) -> Result<Vec<Topic>, DigestError>
where
    G: ForumGateway + ?Sized,
{
    let mut seen = HashSet::new();
    let mut topics = Vec::new();
    let mut cursor = TopicCursor::default();

    loop {
        let page = gateway.list_topics(cursor, page_size).await?;
        let page_len = page.topics.len();
        let mut new_ids = 0usize;

        for topic in page.topics {
            if !seen.insert(topic.id) {
                continue;
            }
            new_ids += 1;
            if topic.top_message <= 0 || topic.closed {
                debug!(
                    "Skipping topic '{}' (closed={}, top_message={})",
                    topic.title, topic.closed, topic.top_message
                );
                continue;
            }
            topics.push(topic);
        }

        if new_ids == 0 || page_len < page_size || seen.len() >= page.count {
            break;
        }
        cursor = page.next;
    }

    info!("Enumerated {} open topics ({} seen)", topics.len(), seen.len());
    Ok(topics)
}

async fn collect_scope<G>(
    gateway: &G,
    scope: i32,
    cutoff: DateTime<Utc>,
    tz: Tz,
    settings: &DigestSettings,
) -> Result<Vec<MessageRecord>, DigestError>
where
    G: ForumGateway + ?Sized,
{
    let mut cache = EntityCache::default();
    let mut records = Vec::new();
    let mut offset_id = 0;

    for page_no in 0..settings.max_pages {
        let page = gateway
            .search_messages(scope, offset_id, settings.message_page_size)
            .await?;
        let Some(oldest) = page.messages.last() else {
            break;
        };

        cache.absorb(&page);
        for message in &page.messages {
            if let Some(text) = summarizable_text(message, cutoff) {
                // summarizable_text guarantees a date
                let Some(date) = message.date else { continue };
                records.push(MessageRecord {
                    sender: cache.label(message.from),
                    text: text.to_string(),
                    time: date.with_timezone(&tz),
                });
            }
        }

        offset_id = oldest.id;
        if oldest.date.is_some_and(|d| d < cutoff) {
            debug!("Scope {} reached the cutoff on page {}", scope, page_no + 1);
            break;
        }
    }

    Ok(records)
}

/// Collect the topic's messages inside `window`, oldest first.
///
/// # Errors
///
/// Propagates search errors from the gateway.
pub async fn collect_messages<G>(
    gateway: &G,
    topic: &Topic,
    window: &TimeWindow,
    settings: &DigestSettings,
) -> Result<CollectedMessages, DigestError>
where
    G: ForumGateway + ?Sized,
{
    let cutoff = window.cutoff();
    let mut messages =
        collect_scope(gateway, topic.top_message, cutoff, window.tz, settings).await?;

    if messages.is_empty() && topic.id != topic.top_message {
        debug!(
            "No messages under top_message {} for '{}', retrying with topic id {}",
            topic.top_message, topic.title, topic.id
        );
        messages = collect_scope(gateway, topic.id, cutoff, window.tz, settings).await?;
    }

    messages.sort_by_key(|m| m.time);

    let truncated = messages.len() > settings.max_messages_per_topic;
    if truncated {
        let excess = messages.len() - settings.max_messages_per_topic;
        messages.drain(..excess);
        info!(
            "Topic '{}' truncated to the newest {} messages",
            topic.title, settings.max_messages_per_topic
        );
    }

    Ok(CollectedMessages {
        messages,
        truncated,
    })
}
