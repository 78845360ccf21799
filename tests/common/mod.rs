#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use topic_digest::ai::{Generation, SummaryModel};
use topic_digest::core::config::DigestSettings;
use topic_digest::core::models::{
    Destination, MessagePage, PeerRef, RawMessage, Topic, TopicCursor, TopicPage, UserEntity,
};
use topic_digest::core::window::TimeWindow;
use topic_digest::errors::DigestError;
use topic_digest::prompt::PromptContext;
use topic_digest::telegram::ForumGateway;
use topic_digest::worker::retry::RetryPolicy;

/// 14:00 in Hong Kong, so the default window is four hours.
pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 14, 6, 0, 0).unwrap()
}

pub fn minutes_ago(minutes: i64) -> DateTime<Utc> {
    now() - chrono::Duration::minutes(minutes)
}

pub fn window() -> TimeWindow {
    TimeWindow::resolve(now(), None, chrono_tz::Asia::Hong_Kong)
}

pub fn fast_settings() -> DigestSettings {
    DigestSettings {
        chunk_delay: Duration::ZERO,
        retry: RetryPolicy {
            max_attempts: 3,
            backoff_unit: Duration::ZERO,
            max_backoff: Duration::ZERO,
        },
        ..DigestSettings::default()
    }
}

pub fn prompt_context() -> PromptContext {
    let window = window();
    PromptContext {
        window_label: window.label(),
        window_hours: window.hours(),
        today: now().date_naive(),
        language: "English".to_string(),
        vip_speakers: Vec::new(),
    }
}

pub fn topic(id: i32, title: &str) -> Topic {
    Topic {
        id,
        title: title.to_string(),
        top_message: id,
        closed: false,
    }
}

pub fn message(id: i32, date: DateTime<Utc>, text: &str, user: i64) -> RawMessage {
    RawMessage {
        id,
        date: Some(date),
        text: text.to_string(),
        from: Some(PeerRef::User(user)),
    }
}

/// `count` messages one second apart, all inside the default window.
pub fn recent_messages(count: usize) -> Vec<RawMessage> {
    (0..count)
        .map(|i| {
            let id = i32::try_from(i + 1).unwrap();
            let age = i64::try_from(count - i).unwrap();
            message(id, now() - chrono::Duration::seconds(age), &format!("message {id}"), 1)
        })
        .collect()
}

/// In-memory forum with scripted topic pages and per-scope message history.
#[derive(Default)]
pub struct FakeGateway {
    topic_pages: Mutex<VecDeque<Result<TopicPage, DigestError>>>,
    history: HashMap<i32, Vec<RawMessage>>,
    users: Vec<UserEntity>,
    failing_scopes: HashSet<i32>,
    forbidden_reason: Option<String>,
    fail_all_sends: bool,
    pub cursors: Mutex<Vec<TopicCursor>>,
    pub searches: Mutex<Vec<(i32, i32)>>,
    pub sent: Mutex<Vec<(Destination, String)>>,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// A single listing page holding all `topics`.
    pub fn with_topics(self, topics: Vec<Topic>) -> Self {
        let page = TopicPage {
            count: topics.len(),
            topics,
            next: TopicCursor::default(),
        };
        self.with_topic_page(Ok(page))
    }

    pub fn with_topic_page(self, page: Result<TopicPage, DigestError>) -> Self {
        self.topic_pages.lock().unwrap().push_back(page);
        self
    }

    /// Messages for a search scope, in any order.
    pub fn with_history(mut self, scope: i32, mut messages: Vec<RawMessage>) -> Self {
        messages.sort_by(|a, b| b.id.cmp(&a.id));
        self.history.insert(scope, messages);
        self
    }

    pub fn with_user(mut self, id: i64, username: Option<&str>, first_name: Option<&str>) -> Self {
        self.users.push(UserEntity {
            id,
            username: username.map(str::to_string),
            first_name: first_name.map(str::to_string),
        });
        self
    }

    pub fn with_failing_scope(mut self, scope: i32) -> Self {
        self.failing_scopes.insert(scope);
        self
    }

    /// Refuse every topic reply with the given RPC error name.
    pub fn forbidding_replies(mut self, reason: &str) -> Self {
        self.forbidden_reason = Some(reason.to_string());
        self
    }

    pub fn failing_sends(mut self) -> Self {
        self.fail_all_sends = true;
        self
    }

    pub fn sent(&self) -> Vec<(Destination, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn search_count(&self) -> usize {
        self.searches.lock().unwrap().len()
    }
}

#[async_trait]
impl ForumGateway for FakeGateway {
    async fn list_topics(&self, cursor: TopicCursor, _limit: usize) -> Result<TopicPage, DigestError> {
        self.cursors.lock().unwrap().push(cursor);
        self.topic_pages
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(TopicPage::default()))
    }

    async fn search_messages(
        &self,
        top_msg_id: i32,
        offset_id: i32,
        limit: usize,
    ) -> Result<MessagePage, DigestError> {
        self.searches.lock().unwrap().push((top_msg_id, offset_id));
        if self.failing_scopes.contains(&top_msg_id) {
            return Err(DigestError::TelegramError("FLOOD_WAIT".to_string()));
        }
        let messages = self
            .history
            .get(&top_msg_id)
            .map(|all| {
                all.iter()
                    .filter(|m| offset_id == 0 || m.id < offset_id)
                    .take(limit)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(MessagePage {
            messages,
            users: self.users.clone(),
            chats: Vec::new(),
        })
    }

    async fn send_message(&self, destination: Destination, text: &str) -> Result<(), DigestError> {
        if self.fail_all_sends {
            return Err(DigestError::TelegramError("connection reset".to_string()));
        }
        if let (Destination::TopicReply { .. }, Some(reason)) = (destination, &self.forbidden_reason) {
            return Err(DigestError::WriteForbidden(reason.clone()));
        }
        self.sent
            .lock()
            .unwrap()
            .push((destination, text.to_string()));
        Ok(())
    }
}

/// Model that replays scripted answers, then echoes a fixed summary.
#[derive(Default)]
pub struct ScriptedModel {
    script: Mutex<VecDeque<Result<Generation, DigestError>>>,
    pub calls: Mutex<Vec<(usize, String)>>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then(self, answer: Result<Generation, DigestError>) -> Self {
        self.script.lock().unwrap().push_back(answer);
        self
    }

    pub fn then_times(self, n: usize, make: impl Fn() -> Result<Generation, DigestError>) -> Self {
        (0..n).fold(self, |model, _| model.then(make()))
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn slots(&self) -> Vec<usize> {
        self.calls.lock().unwrap().iter().map(|(slot, _)| *slot).collect()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(_, prompt)| prompt.clone())
            .collect()
    }
}

#[async_trait]
impl SummaryModel for ScriptedModel {
    async fn generate(&self, key_slot: usize, prompt: &str) -> Result<Generation, DigestError> {
        self.calls
            .lock()
            .unwrap()
            .push((key_slot, prompt.to_string()));
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Generation::Text("- summary".to_string())))
    }
}

pub fn transient() -> Result<Generation, DigestError> {
    Err(DigestError::GeminiError("HTTP 503: overloaded".to_string()))
}
