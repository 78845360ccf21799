use chrono::{DateTime, Utc};
use chrono_tz::Tz;

/// The supergroup whose forum topics are summarized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetGroup {
    /// Public username or `t.me` link, without the leading `@`.
    Username(String),
    /// Marked chat id, always carrying the `-100` channel prefix.
    Id(i64),
}

impl TargetGroup {
    /// Channel id without the `-100` marker, as MTProto expects it.
    ///
    /// Only negative ids carry the marker; positive ids are already bare.
    #[must_use]
    pub fn bare_channel_id(&self) -> Option<i64> {
        match self {
            TargetGroup::Id(marked) if *marked < 0 => {
                let digits = marked.unsigned_abs().to_string();
                match digits.strip_prefix("100") {
                    Some(rest) => rest.parse::<i64>().ok(),
                    None => digits.parse::<i64>().ok(),
                }
            }
            TargetGroup::Id(bare) => Some(*bare),
            TargetGroup::Username(_) => None,
        }
    }
}

/// A forum topic as listed by the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topic {
    pub id: i32,
    pub title: String,
    /// Id of the message that anchors the topic; replies to it land in the topic.
    pub top_message: i32,
    pub closed: bool,
}

/// Sender of a message, tagged by peer kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PeerRef {
    User(i64),
    Channel(i64),
    Chat(i64),
}

impl PeerRef {
    #[must_use]
    pub fn id(self) -> i64 {
        match self {
            PeerRef::User(id) | PeerRef::Channel(id) | PeerRef::Chat(id) => id,
        }
    }
}

/// A message as returned by a topic search page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage {
    pub id: i32,
    pub date: Option<DateTime<Utc>>,
    pub text: String,
    pub from: Option<PeerRef>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserEntity {
    pub id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatEntity {
    pub id: i64,
    pub title: Option<String>,
    pub username: Option<String>,
}

/// One page of a topic-scoped message search, newest first.
#[derive(Debug, Clone, Default)]
pub struct MessagePage {
    pub messages: Vec<RawMessage>,
    pub users: Vec<UserEntity>,
    pub chats: Vec<ChatEntity>,
}

/// Position after the last topic of a listing page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TopicCursor {
    pub offset_date: i32,
    pub offset_id: i32,
    pub offset_topic: i32,
}

/// One page of forum topics.
#[derive(Debug, Clone, Default)]
pub struct TopicPage {
    /// Total number of topics reported by the platform.
    pub count: usize,
    pub topics: Vec<Topic>,
    pub next: TopicCursor,
}

/// A message kept for summarization.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageRecord {
    pub sender: String,
    pub text: String,
    pub time: DateTime<Tz>,
}

/// Output of the collector for one topic.
#[derive(Debug, Clone, Default)]
pub struct CollectedMessages {
    pub messages: Vec<MessageRecord>,
    pub truncated: bool,
}

impl CollectedMessages {
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Keep only the `n` most recent messages, marking the set as truncated.
    #[must_use]
    pub fn most_recent(&self, n: usize) -> CollectedMessages {
        let start = self.messages.len().saturating_sub(n);
        CollectedMessages {
            messages: self.messages[start..].to_vec(),
            truncated: true,
        }
    }
}

/// Where a message is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    /// The account's private "Saved Messages" chat.
    SavedMessages,
    /// A reply to the given message in the target group.
    TopicReply { reply_to: i32 },
}

/// How a single topic ended up in a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopicOutcome {
    Delivered,
    NoActivity,
    CollectionFailed(String),
    SummaryFailed(String),
    /// Posting was refused; the summary went to Saved Messages instead.
    WriteRestricted(String),
    DeliveryFailed(String),
}

impl TopicOutcome {
    #[must_use]
    pub fn is_failure(&self) -> bool {
        !matches!(self, TopicOutcome::Delivered | TopicOutcome::NoActivity)
    }

    /// A summary was produced but could not be posted where it belongs.
    #[must_use]
    pub fn is_delivery_failure(&self) -> bool {
        matches!(
            self,
            TopicOutcome::WriteRestricted(_) | TopicOutcome::DeliveryFailed(_)
        )
    }
}

/// Per-run summary of what happened to every processed topic.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub outcomes: Vec<(String, TopicOutcome)>,
}

impl RunReport {
    pub fn record(&mut self, title: &str, outcome: TopicOutcome) {
        self.outcomes.push((title.to_string(), outcome));
    }

    #[must_use]
    pub fn summaries_sent(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, o)| matches!(o, TopicOutcome::Delivered))
            .count()
    }

    #[must_use]
    pub fn no_activity(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|(_, o)| matches!(o, TopicOutcome::NoActivity))
            .map(|(t, _)| t.as_str())
            .collect()
    }

    #[must_use]
    pub fn failed(&self) -> Vec<&str> {
        self.titles_where(TopicOutcome::is_failure)
    }

    /// Topics for which no summary could be produced.
    #[must_use]
    pub fn summary_failures(&self) -> Vec<&str> {
        self.titles_where(|o| o.is_failure() && !o.is_delivery_failure())
    }

    /// Topics whose summary did not reach the topic itself.
    #[must_use]
    pub fn delivery_failures(&self) -> Vec<&str> {
        self.titles_where(TopicOutcome::is_delivery_failure)
    }

    fn titles_where(&self, keep: impl Fn(&TopicOutcome) -> bool) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|(_, o)| keep(o))
            .map(|(t, _)| t.as_str())
            .collect()
    }
}
