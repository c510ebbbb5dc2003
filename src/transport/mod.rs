//! Narrow capability interface over the messaging session.
//!
//! The policy engine never talks to a concrete client; everything it needs from
//! the network goes through [`Transport`]. Identifiers are plain strings and may
//! arrive either bare (`39333`) or fully qualified (`39333@s.whatsapp.net`), so
//! callers normalize before comparing.
pub mod mock;
pub mod telegram;

use crate::util::same_user;
use async_trait::async_trait;
use thiserror::Error;

pub use mock::MockTransport;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("the bot lacks the privilege for this action")]
    PermissionDenied,
    #[error("participant or message not found")]
    NotFound,
    #[error("network failure: {0}")]
    Network(String),
    #[error("unsupported by this transport: {0}")]
    Unsupported(&'static str),
}

pub type TResult<T> = Result<T, TransportError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Sticker,
    Video,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaRef {
    pub kind: MediaKind,
    pub file_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotedMessage {
    pub id: String,
    pub sender: String,
    pub media: Option<MediaRef>,
}

#[derive(Debug, Clone, Default)]
pub struct IncomingMessage {
    pub id: String,
    pub chat_id: String,
    pub is_group: bool,
    pub sender: String,
    pub from_me: bool,
    pub text: String,
    /// Users the transport already resolved from the message entities.
    pub mentions: Vec<String>,
    pub quoted: Option<QuotedMessage>,
    pub media: Option<MediaRef>,
    /// Unix milliseconds.
    pub timestamp: i64,
}

#[derive(Debug, Clone)]
pub struct MemberEvent {
    pub chat_id: String,
    pub users: Vec<String>,
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub id: String,
    pub is_admin: bool,
}

#[async_trait]
pub trait Transport: Send + Sync {
    fn bot_id(&self) -> String;

    async fn send_message(&self, chat: &str, text: &str, mentions: &[String]) -> TResult<()>;

    async fn reply(&self, chat: &str, to: &str, text: &str, mentions: &[String]) -> TResult<()>;

    async fn delete_message(&self, chat: &str, msg: &str) -> TResult<()>;

    async fn list_participants(&self, chat: &str) -> TResult<Vec<Participant>>;

    /// Whether `user` is in the chat right now. Scans the roster unless the
    /// backend can ask about a single member.
    async fn is_participant(&self, chat: &str, user: &str) -> TResult<bool> {
        let roster = self.list_participants(chat).await?;
        Ok(roster.iter().any(|p| same_user(&p.id, user)))
    }

    /// Translates a raw `@handle` token into a user identifier.
    async fn resolve_mention(&self, chat: &str, raw: &str) -> TResult<Option<String>>;

    async fn contact_name(&self, user: &str) -> TResult<String>;

    async fn group_name(&self, chat: &str) -> TResult<String>;

    async fn remove_participants(&self, chat: &str, users: &[String]) -> TResult<()>;

    async fn promote(&self, chat: &str, users: &[String]) -> TResult<()>;

    async fn demote(&self, chat: &str, users: &[String]) -> TResult<()>;

    /// When `admins_only` is set only admins may post in the chat.
    async fn set_announce(&self, chat: &str, admins_only: bool) -> TResult<()>;

    async fn send_sticker(&self, chat: &str, media: &MediaRef) -> TResult<()>;
}
