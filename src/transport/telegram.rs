//! Telegram adapter built on teloxide.
//!
//! The Bot API can't enumerate plain members, so the roster of a chat is the
//! administrator list plus every user the bot has seen posting or joining there.
use super::{
    IncomingMessage, MediaKind, MediaRef, MemberEvent, Participant, QuotedMessage, TResult,
    Transport, TransportError,
};
use crate::util::normalize_id;
use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use std::sync::Mutex;
use teloxide::payloads::SendMessageSetters;
use teloxide::prelude::*;
use teloxide::types::{
    ChatKind, ChatMemberStatus, ChatPermissions, InputFile, MessageEntityKind, ParseMode, User,
};
use teloxide::utils::html;
use teloxide::RequestError;

/// What an inbound Telegram message means to the engine.
#[derive(Debug, Clone)]
pub enum Inbound {
    Message(IncomingMessage),
    Joined(MemberEvent),
    Left(MemberEvent),
}

#[derive(Default)]
struct Seen {
    members: HashMap<i64, BTreeSet<i64>>,
    usernames: HashMap<String, i64>,
    names: HashMap<i64, String>,
}

pub struct TelegramTransport {
    bot: AutoSend<Bot>,
    me: i64,
    seen: Mutex<Seen>,
}

impl TelegramTransport {
    pub async fn new(bot: AutoSend<Bot>) -> anyhow::Result<Self> {
        let me = bot.get_me().await?.user.id;
        Ok(TelegramTransport {
            bot,
            me,
            seen: Mutex::new(Seen::default()),
        })
    }

    fn seen(&self) -> std::sync::MutexGuard<'_, Seen> {
        self.seen.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn remember(&self, chat: i64, user: &User) {
        let mut seen = self.seen();
        seen.members.entry(chat).or_default().insert(user.id);
        if let Some(name) = &user.username {
            seen.usernames.insert(name.to_lowercase(), user.id);
        }
        seen.names.insert(user.id, user.full_name());
    }

    fn forget(&self, chat: i64, user: i64) {
        if let Some(members) = self.seen().members.get_mut(&chat) {
            members.remove(&user);
        }
    }

    /// Converts a Telegram message, recording the users it mentions along the way.
    pub fn inbound(&self, msg: &Message) -> Option<Inbound> {
        let chat = msg.chat.id;
        let is_group = msg.chat.is_group() || msg.chat.is_supergroup();
        let timestamp = i64::from(msg.date) * 1000;

        if let Some(users) = msg.new_chat_members() {
            for u in users {
                self.remember(chat, u);
            }
            return Some(Inbound::Joined(MemberEvent {
                chat_id: chat.to_string(),
                users: users
                    .iter()
                    .filter(|u| u.id != self.me)
                    .map(|u| u.id.to_string())
                    .collect(),
                timestamp,
            }));
        }
        if let Some(user) = msg.left_chat_member() {
            self.forget(chat, user.id);
            return Some(Inbound::Left(MemberEvent {
                chat_id: chat.to_string(),
                users: vec![user.id.to_string()],
                timestamp,
            }));
        }

        let from = msg.from()?;
        if is_group {
            self.remember(chat, from);
        }
        let text = msg.text().or_else(|| msg.caption()).unwrap_or_default();
        let mentions = msg
            .entities()
            .or_else(|| msg.caption_entities())
            .map(|entities| {
                entities
                    .iter()
                    .filter_map(|e| match &e.kind {
                        MessageEntityKind::TextMention { user } => Some(user.id.to_string()),
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default();
        let quoted = msg.reply_to_message().map(|q| QuotedMessage {
            id: q.id.to_string(),
            sender: q.from().map(|u| u.id.to_string()).unwrap_or_default(),
            media: media_of(q),
        });
        Some(Inbound::Message(IncomingMessage {
            id: msg.id.to_string(),
            chat_id: chat.to_string(),
            is_group,
            sender: from.id.to_string(),
            from_me: from.id == self.me,
            text: text.to_owned(),
            mentions,
            quoted,
            media: media_of(msg),
            timestamp,
        }))
    }

    /// Escapes `text` for HTML and turns `@<id>` tags of `mentions` into links.
    fn render(&self, text: &str, mentions: &[String]) -> String {
        let mut out = html::escape(text);
        let seen = self.seen();
        for m in mentions {
            let id = match parse_user(m) {
                Ok(id) => id,
                Err(_) => continue,
            };
            let label = seen
                .names
                .get(&id)
                .cloned()
                .unwrap_or_else(|| id.to_string());
            out = out.replace(
                &format!("@{}", id),
                &html::user_mention(id, &html::escape(&label)),
            );
        }
        out
    }
}

fn media_of(msg: &Message) -> Option<MediaRef> {
    if let Some(sizes) = msg.photo() {
        return sizes.last().map(|p| MediaRef {
            kind: MediaKind::Image,
            file_id: p.file_id.clone(),
        });
    }
    if let Some(s) = msg.sticker() {
        return Some(MediaRef {
            kind: MediaKind::Sticker,
            file_id: s.file_id.clone(),
        });
    }
    if let Some(v) = msg.video() {
        return Some(MediaRef {
            kind: MediaKind::Video,
            file_id: v.file_id.clone(),
        });
    }
    msg.document().map(|d| MediaRef {
        kind: MediaKind::Other,
        file_id: d.file_id.clone(),
    })
}

fn parse_chat(raw: &str) -> TResult<i64> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| TransportError::NotFound)
}

fn parse_user(raw: &str) -> TResult<i64> {
    normalize_id(raw)
        .parse::<i64>()
        .map_err(|_| TransportError::NotFound)
}

fn parse_msg(raw: &str) -> TResult<i32> {
    raw.trim()
        .parse::<i32>()
        .map_err(|_| TransportError::NotFound)
}

/// The Bot API reports most failures as free text, so the mapping goes by message.
fn classify(err: RequestError) -> TransportError {
    match err {
        RequestError::NetworkError(e) => TransportError::Network(e.to_string()),
        other => {
            let text = other.to_string();
            let lower = text.to_lowercase();
            if lower.contains("rights")
                || lower.contains("admin")
                || lower.contains("forbidden")
                || lower.contains("can't remove chat owner")
            {
                TransportError::PermissionDenied
            } else if lower.contains("not found") || lower.contains("user_not_participant") {
                TransportError::NotFound
            } else {
                TransportError::Network(text)
            }
        }
    }
}

#[async_trait]
impl Transport for TelegramTransport {
    fn bot_id(&self) -> String {
        self.me.to_string()
    }

    async fn send_message(&self, chat: &str, text: &str, mentions: &[String]) -> TResult<()> {
        self.bot
            .send_message(parse_chat(chat)?, self.render(text, mentions))
            .parse_mode(ParseMode::Html)
            .await
            .map_err(classify)?;
        Ok(())
    }

    async fn reply(&self, chat: &str, to: &str, text: &str, mentions: &[String]) -> TResult<()> {
        self.bot
            .send_message(parse_chat(chat)?, self.render(text, mentions))
            .parse_mode(ParseMode::Html)
            .reply_to_message_id(parse_msg(to)?)
            .await
            .map_err(classify)?;
        Ok(())
    }

    async fn delete_message(&self, chat: &str, msg: &str) -> TResult<()> {
        self.bot
            .delete_message(parse_chat(chat)?, parse_msg(msg)?)
            .await
            .map_err(classify)?;
        Ok(())
    }

    async fn list_participants(&self, chat: &str) -> TResult<Vec<Participant>> {
        let chat_id = parse_chat(chat)?;
        let admins = self
            .bot
            .get_chat_administrators(chat_id)
            .await
            .map_err(classify)?;
        let mut roster: Vec<Participant> = admins
            .iter()
            .filter(|m| {
                matches!(
                    m.status(),
                    ChatMemberStatus::Administrator | ChatMemberStatus::Owner
                )
            })
            .map(|m| Participant {
                id: m.user.id.to_string(),
                is_admin: true,
            })
            .collect();
        let admin_ids: BTreeSet<i64> = admins.iter().map(|m| m.user.id).collect();
        let seen = self.seen();
        if let Some(members) = seen.members.get(&chat_id) {
            roster.extend(
                members
                    .iter()
                    .filter(|id| !admin_ids.contains(id))
                    .map(|id| Participant {
                        id: id.to_string(),
                        is_admin: false,
                    }),
            );
        }
        Ok(roster)
    }

    /// Asks Telegram directly, so members the bot hasn't seen still count.
    async fn is_participant(&self, chat: &str, user: &str) -> TResult<bool> {
        let member = self
            .bot
            .get_chat_member(parse_chat(chat)?, parse_user(user)?)
            .await
            .map_err(classify)?;
        Ok(!matches!(
            member.status(),
            ChatMemberStatus::Banned | ChatMemberStatus::Left
        ))
    }

    async fn resolve_mention(&self, _chat: &str, raw: &str) -> TResult<Option<String>> {
        let handle = raw.trim_start_matches('@');
        if handle.parse::<i64>().is_ok() {
            return Ok(Some(handle.to_owned()));
        }
        Ok(self
            .seen()
            .usernames
            .get(&handle.to_lowercase())
            .map(|id| id.to_string()))
    }

    async fn contact_name(&self, user: &str) -> TResult<String> {
        let id = parse_user(user)?;
        let cached = self.seen().names.get(&id).cloned();
        if let Some(name) = cached {
            return Ok(name);
        }
        let chat = self.bot.get_chat(id).await.map_err(classify)?;
        match chat.kind {
            ChatKind::Private(p) => p.first_name.ok_or(TransportError::NotFound),
            _ => Err(TransportError::NotFound),
        }
    }

    async fn group_name(&self, chat: &str) -> TResult<String> {
        let chat = self
            .bot
            .get_chat(parse_chat(chat)?)
            .await
            .map_err(classify)?;
        match chat.kind {
            ChatKind::Public(p) => p.title.ok_or(TransportError::NotFound),
            _ => Err(TransportError::Unsupported("private chats have no title")),
        }
    }

    /// Telegram only bans; the user is unbanned right after so they could be
    /// invited again. Re-entry of banned users is policed by the engine.
    async fn remove_participants(&self, chat: &str, users: &[String]) -> TResult<()> {
        let chat_id = parse_chat(chat)?;
        for user in users {
            let id = parse_user(user)?;
            self.bot
                .kick_chat_member(chat_id, id)
                .await
                .map_err(classify)?;
            if let Err(e) = self.bot.unban_chat_member(chat_id, id).await {
                log::debug!("Unban after removal of {} failed: {}", id, e);
            }
            self.forget(chat_id, id);
        }
        Ok(())
    }

    async fn promote(&self, chat: &str, users: &[String]) -> TResult<()> {
        let chat_id = parse_chat(chat)?;
        for user in users {
            self.bot
                .promote_chat_member(chat_id, parse_user(user)?)
                .can_manage_chat(true)
                .can_change_info(true)
                .can_delete_messages(true)
                .can_invite_users(true)
                .can_restrict_members(true)
                .can_pin_messages(true)
                .await
                .map_err(classify)?;
        }
        Ok(())
    }

    async fn demote(&self, chat: &str, users: &[String]) -> TResult<()> {
        let chat_id = parse_chat(chat)?;
        for user in users {
            self.bot
                .promote_chat_member(chat_id, parse_user(user)?)
                .can_manage_chat(false)
                .can_change_info(false)
                .can_delete_messages(false)
                .can_invite_users(false)
                .can_restrict_members(false)
                .can_pin_messages(false)
                .can_promote_members(false)
                .await
                .map_err(classify)?;
        }
        Ok(())
    }

    async fn set_announce(&self, chat: &str, admins_only: bool) -> TResult<()> {
        let perm = if admins_only {
            ChatPermissions::default()
        } else {
            ChatPermissions::new()
                .can_send_messages(true)
                .can_send_media_messages(true)
                .can_send_other_messages(true)
                .can_send_polls(true)
                .can_add_web_page_previews(true)
        };
        self.bot
            .set_chat_permissions(parse_chat(chat)?, perm)
            .await
            .map_err(classify)?;
        Ok(())
    }

    async fn send_sticker(&self, chat: &str, media: &MediaRef) -> TResult<()> {
        self.bot
            .send_sticker(parse_chat(chat)?, InputFile::file_id(media.file_id.clone()))
            .await
            .map_err(classify)?;
        Ok(())
    }
}
