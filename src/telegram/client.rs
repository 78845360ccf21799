//! Telegram MTProto client module
//!
//! Implements [`ForumGateway`] on top of a user session, so the digest can
//! read forum history that bot accounts never see.

use async_trait::async_trait;
use chrono::DateTime;
use grammers_client::types::PackedChat;
use grammers_client::{Client, Config, InitParams, InputMessage};
use grammers_session::Session;
use grammers_tl_types as tl;
use tracing::{info, warn};

use super::gateway::{ForumGateway, classify_send_error};
use super::session::{decode_session_string, encode_session_bytes};
use crate::core::models::{
    ChatEntity, Destination, MessagePage, PeerRef, RawMessage, TargetGroup, Topic, TopicCursor,
    TopicPage, UserEntity,
};
use crate::errors::DigestError;

/// Open an MTProto connection with the given session.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect(api_id: i32, api_hash: &str, session: Session) -> Result<Client, DigestError> {
    Client::connect(Config {
        session,
        api_id,
        api_hash: api_hash.to_string(),
        params: InitParams::default(),
    })
    .await
    .map_err(|e| DigestError::TelegramError(format!("Failed to connect: {e}")))
}

/// Connect with a stored session string and make sure it is logged in.
///
/// # Errors
///
/// Returns an error if the session string is invalid, the connection fails,
/// or the session is not authorized.
pub async fn connect_authorized(
    api_id: i32,
    api_hash: &str,
    session_string: &str,
) -> Result<Client, DigestError> {
    let bytes = decode_session_string(session_string)?;
    let session = Session::load(&bytes)
        .map_err(|e| DigestError::ConfigError(format!("TG_SESSION_STRING: {e}")))?;
    let client = connect(api_id, api_hash, session).await?;

    let authorized = client
        .is_authorized()
        .await
        .map_err(|e| DigestError::TelegramError(format!("Authorization check failed: {e}")))?;
    if !authorized {
        return Err(DigestError::ConfigError(
            "The provided session string is not authorized.".to_string(),
        ));
    }
    Ok(client)
}

/// Serialize the client's session for `TG_SESSION_STRING`.
#[must_use]
pub fn export_session(client: &Client) -> String {
    encode_session_bytes(&client.session().save())
}

/// Find the chat behind a configured target.
///
/// # Errors
///
/// Returns an error if the lookup fails or nothing matches.
pub async fn resolve_target(client: &Client, target: &TargetGroup) -> Result<PackedChat, DigestError> {
    match target {
        TargetGroup::Username(name) => client
            .resolve_username(name)
            .await
            .map_err(|e| DigestError::TelegramError(format!("Failed to resolve @{name}: {e}")))?
            .map(|chat| chat.pack())
            .ok_or_else(|| DigestError::ConfigError(format!("No chat named @{name}"))),
        TargetGroup::Id(marked) => {
            let bare = target.bare_channel_id().unwrap_or(marked.abs());
            let mut dialogs = client.iter_dialogs();
            while let Some(dialog) = dialogs
                .next()
                .await
                .map_err(|e| DigestError::TelegramError(format!("Failed to list dialogs: {e}")))?
            {
                let chat = dialog.chat();
                if chat.id() == bare {
                    return Ok(chat.pack());
                }
            }
            Err(DigestError::ConfigError(format!(
                "Chat {marked} is not among this account's dialogs"
            )))
        }
    }
}

fn timestamp(secs: i32) -> Option<chrono::DateTime<chrono::Utc>> {
    DateTime::from_timestamp(i64::from(secs), 0)
}

fn peer_ref(peer: &tl::enums::Peer) -> PeerRef {
    match peer {
        tl::enums::Peer::User(p) => PeerRef::User(p.user_id),
        tl::enums::Peer::Channel(p) => PeerRef::Channel(p.channel_id),
        tl::enums::Peer::Chat(p) => PeerRef::Chat(p.chat_id),
    }
}

fn raw_message(message: &tl::enums::Message) -> RawMessage {
    match message {
        tl::enums::Message::Message(m) => RawMessage {
            id: m.id,
            date: timestamp(m.date),
            text: m.message.clone(),
            from: m.from_id.as_ref().map(peer_ref),
        },
        tl::enums::Message::Service(m) => RawMessage {
            id: m.id,
            date: timestamp(m.date),
            text: String::new(),
            from: m.from_id.as_ref().map(peer_ref),
        },
        tl::enums::Message::Empty(m) => RawMessage {
            id: m.id,
            date: None,
            text: String::new(),
            from: None,
        },
    }
}

fn user_entity(user: &tl::enums::User) -> UserEntity {
    match user {
        tl::enums::User::User(u) => UserEntity {
            id: u.id,
            username: u.username.clone(),
            first_name: u.first_name.clone(),
        },
        tl::enums::User::Empty(u) => UserEntity {
            id: u.id,
            ..UserEntity::default()
        },
    }
}

fn chat_entity(chat: &tl::enums::Chat) -> ChatEntity {
    match chat {
        tl::enums::Chat::Chat(c) => ChatEntity {
            id: c.id,
            title: Some(c.title.clone()),
            username: None,
        },
        tl::enums::Chat::Forbidden(c) => ChatEntity {
            id: c.id,
            title: Some(c.title.clone()),
            username: None,
        },
        tl::enums::Chat::Channel(c) => ChatEntity {
            id: c.id,
            title: Some(c.title.clone()),
            username: c.username.clone(),
        },
        tl::enums::Chat::ChannelForbidden(c) => ChatEntity {
            id: c.id,
            title: Some(c.title.clone()),
            username: None,
        },
        tl::enums::Chat::Empty(c) => ChatEntity {
            id: c.id,
            ..ChatEntity::default()
        },
    }
}

/// Telegram gateway bound to one forum supergroup.
pub struct TelegramClient {
    client: Client,
    group: PackedChat,
    me: PackedChat,
}

impl TelegramClient {
    /// # Errors
    ///
    /// Returns an error if the target cannot be resolved or the account lookup fails.
    pub async fn for_group(client: Client, target: &TargetGroup) -> Result<Self, DigestError> {
        let group = resolve_target(&client, target).await?;
        let me = client
            .get_me()
            .await
            .map_err(|e| DigestError::TelegramError(format!("Failed to fetch own account: {e}")))?
            .pack();
        info!("Resolved target group {:?}", target);
        Ok(Self { client, group, me })
    }

    fn group_channel(&self) -> Result<tl::enums::InputChannel, DigestError> {
        self.group.try_to_input_channel().ok_or_else(|| {
            DigestError::ConfigError("TARGET_GROUP is not a forum supergroup".to_string())
        })
    }
}

#[async_trait]
impl ForumGateway for TelegramClient {
    async fn list_topics(
        &self,
        cursor: TopicCursor,
        limit: usize,
    ) -> Result<TopicPage, DigestError> {
        let request = tl::functions::channels::GetForumTopics {
            channel: self.group_channel()?,
            q: None,
            offset_date: cursor.offset_date,
            offset_id: cursor.offset_id,
            offset_topic: cursor.offset_topic,
            limit: i32::try_from(limit).unwrap_or(i32::MAX),
        };

        let tl::enums::messages::ForumTopics::Topics(result) = self
            .client
            .invoke(&request)
            .await
            .map_err(|e| DigestError::TelegramError(format!("channels.getForumTopics: {e}")))?;

        let mut next = cursor;
        let mut topics = Vec::with_capacity(result.topics.len());
        for entry in &result.topics {
            let tl::enums::ForumTopic::Topic(t) = entry else {
                continue;
            };
            let top_date = result.messages.iter().find_map(|m| match m {
                tl::enums::Message::Message(msg) if msg.id == t.top_message => Some(msg.date),
                _ => None,
            });
            next = TopicCursor {
                offset_date: top_date.unwrap_or(t.date),
                offset_id: t.top_message,
                offset_topic: t.id,
            };
            topics.push(Topic {
                id: t.id,
                title: t.title.clone(),
                top_message: t.top_message,
                closed: t.closed,
            });
        }

        Ok(TopicPage {
            count: usize::try_from(result.count).unwrap_or(0),
            topics,
            next,
        })
    }

    async fn search_messages(
        &self,
        top_msg_id: i32,
        offset_id: i32,
        limit: usize,
    ) -> Result<MessagePage, DigestError> {
        let request = tl::functions::messages::Search {
            peer: self.group.to_input_peer(),
            q: String::new(),
            from_id: None,
            saved_peer_id: None,
            saved_reaction: None,
            top_msg_id: Some(top_msg_id),
            filter: tl::enums::MessagesFilter::InputMessagesFilterEmpty,
            min_date: 0,
            max_date: 0,
            offset_id,
            add_offset: 0,
            limit: i32::try_from(limit).unwrap_or(i32::MAX),
            max_id: 0,
            min_id: 0,
            hash: 0,
        };

        let result = self
            .client
            .invoke(&request)
            .await
            .map_err(|e| DigestError::TelegramError(format!("messages.search: {e}")))?;

        let (messages, users, chats) = match result {
            tl::enums::messages::Messages::Messages(m) => (m.messages, m.users, m.chats),
            tl::enums::messages::Messages::Slice(m) => (m.messages, m.users, m.chats),
            tl::enums::messages::Messages::ChannelMessages(m) => (m.messages, m.users, m.chats),
            tl::enums::messages::Messages::NotModified(_) => {
                warn!("messages.search returned NotModified for topic {}", top_msg_id);
                return Ok(MessagePage::default());
            }
        };

        Ok(MessagePage {
            messages: messages.iter().map(raw_message).collect(),
            users: users.iter().map(user_entity).collect(),
            chats: chats.iter().map(chat_entity).collect(),
        })
    }

    async fn send_message(&self, destination: Destination, text: &str) -> Result<(), DigestError> {
        let (chat, message) = match destination {
            Destination::SavedMessages => (self.me, InputMessage::text(text)),
            Destination::TopicReply { reply_to } => {
                (self.group, InputMessage::text(text).reply_to(Some(reply_to)))
            }
        };

        self.client
            .send_message(chat, message)
            .await
            .map(|_| ())
            .map_err(|e| classify_send_error(&e.to_string()))
    }
}
