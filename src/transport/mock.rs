//! In-memory transport that records every outbound call. Used by the test suites.
use super::{MediaRef, Participant, TResult, Transport, TransportError};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Send {
        chat: String,
        text: String,
        mentions: Vec<String>,
    },
    Reply {
        chat: String,
        to: String,
        text: String,
    },
    Delete {
        chat: String,
        msg: String,
    },
    Remove {
        chat: String,
        users: Vec<String>,
    },
    Promote {
        chat: String,
        users: Vec<String>,
    },
    Demote {
        chat: String,
        users: Vec<String>,
    },
    Announce {
        chat: String,
        admins_only: bool,
    },
    Sticker {
        chat: String,
        file_id: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    /// Both fresh messages and replies.
    Send,
    Delete,
    Remove,
    Promote,
    ListParticipants,
    ContactName,
}

#[derive(Default)]
struct State {
    calls: Vec<Call>,
    rosters: HashMap<String, Vec<Participant>>,
    names: HashMap<String, String>,
    failing: HashMap<Op, TransportError>,
    unresolvable: HashSet<String>,
    /// Members present in a chat but missing from its listing.
    unlisted: HashMap<String, HashSet<String>>,
}

pub struct MockTransport {
    bot: String,
    state: Mutex<State>,
}

impl MockTransport {
    pub fn new(bot: &str) -> Self {
        MockTransport {
            bot: bot.to_owned(),
            state: Mutex::new(State::default()),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Replaces the roster of `chat` with `(id, is_admin)` pairs.
    pub fn with_roster(self, chat: &str, members: &[(&str, bool)]) -> Self {
        self.state().rosters.insert(
            chat.to_owned(),
            members
                .iter()
                .map(|(id, is_admin)| Participant {
                    id: id.to_string(),
                    is_admin: *is_admin,
                })
                .collect(),
        );
        self
    }

    /// Puts `user` in `chat` without listing them, like a member the bot
    /// hasn't seen yet.
    pub fn with_unlisted(self, chat: &str, user: &str) -> Self {
        self.state()
            .unlisted
            .entry(chat.to_owned())
            .or_default()
            .insert(bare(user));
        self
    }

    pub fn with_name(self, user: &str, name: &str) -> Self {
        self.state().names.insert(user.to_owned(), name.to_owned());
        self
    }

    /// Contact lookups for `user` fail from now on.
    pub fn unresolvable(self, user: &str) -> Self {
        self.state().unresolvable.insert(user.to_owned());
        self
    }

    pub fn fail(&self, op: Op, err: TransportError) {
        self.state().failing.insert(op, err);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state().calls.clone()
    }

    pub fn clear(&self) {
        self.state().calls.clear();
    }

    /// Every text sent either as a fresh message or as a reply.
    pub fn texts(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Send { text, .. } | Call::Reply { text, .. } => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn last_text(&self) -> Option<String> {
        self.texts().pop()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Delete { msg, .. } => Some(msg),
                _ => None,
            })
            .collect()
    }

    pub fn removed(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Remove { users, .. } => Some(users),
                _ => None,
            })
            .flatten()
            .collect()
    }

    fn check(&self, op: Op) -> TResult<()> {
        match self.state().failing.get(&op) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn record(&self, call: Call) {
        self.state().calls.push(call);
    }
}

fn bare(id: &str) -> String {
    id.split('@').next().unwrap_or(id).to_owned()
}

#[async_trait]
impl Transport for MockTransport {
    fn bot_id(&self) -> String {
        self.bot.clone()
    }

    async fn send_message(&self, chat: &str, text: &str, mentions: &[String]) -> TResult<()> {
        self.check(Op::Send)?;
        self.record(Call::Send {
            chat: chat.to_owned(),
            text: text.to_owned(),
            mentions: mentions.to_vec(),
        });
        Ok(())
    }

    async fn reply(&self, chat: &str, to: &str, text: &str, _mentions: &[String]) -> TResult<()> {
        self.check(Op::Send)?;
        self.record(Call::Reply {
            chat: chat.to_owned(),
            to: to.to_owned(),
            text: text.to_owned(),
        });
        Ok(())
    }

    async fn delete_message(&self, chat: &str, msg: &str) -> TResult<()> {
        self.check(Op::Delete)?;
        self.record(Call::Delete {
            chat: chat.to_owned(),
            msg: msg.to_owned(),
        });
        Ok(())
    }

    async fn list_participants(&self, chat: &str) -> TResult<Vec<Participant>> {
        self.check(Op::ListParticipants)?;
        Ok(self.state().rosters.get(chat).cloned().unwrap_or_default())
    }

    async fn is_participant(&self, chat: &str, user: &str) -> TResult<bool> {
        self.check(Op::ListParticipants)?;
        let state = self.state();
        let listed = state
            .rosters
            .get(chat)
            .map_or(false, |r| r.iter().any(|p| bare(&p.id) == bare(user)));
        let unlisted = state
            .unlisted
            .get(chat)
            .map_or(false, |u| u.contains(&bare(user)));
        Ok(listed || unlisted)
    }

    async fn resolve_mention(&self, chat: &str, raw: &str) -> TResult<Option<String>> {
        let handle = raw.trim_start_matches('@');
        let roster = self.list_participants(chat).await?;
        Ok(roster
            .into_iter()
            .find(|p| p.id.split('@').next() == Some(handle))
            .map(|p| p.id))
    }

    async fn contact_name(&self, user: &str) -> TResult<String> {
        self.check(Op::ContactName)?;
        let state = self.state();
        if state.unresolvable.contains(user) {
            return Err(TransportError::NotFound);
        }
        Ok(state
            .names
            .get(user)
            .cloned()
            .unwrap_or_else(|| user.split('@').next().unwrap_or(user).to_owned()))
    }

    async fn group_name(&self, chat: &str) -> TResult<String> {
        Ok(format!("Gruppo {}", chat))
    }

    async fn remove_participants(&self, chat: &str, users: &[String]) -> TResult<()> {
        self.check(Op::Remove)?;
        let mut state = self.state();
        if let Some(roster) = state.rosters.get_mut(chat) {
            roster.retain(|p| !users.iter().any(|u| bare(u) == bare(&p.id)));
        }
        if let Some(unlisted) = state.unlisted.get_mut(chat) {
            for u in users {
                unlisted.remove(&bare(u));
            }
        }
        state.calls.push(Call::Remove {
            chat: chat.to_owned(),
            users: users.to_vec(),
        });
        Ok(())
    }

    async fn promote(&self, chat: &str, users: &[String]) -> TResult<()> {
        self.check(Op::Promote)?;
        self.record(Call::Promote {
            chat: chat.to_owned(),
            users: users.to_vec(),
        });
        Ok(())
    }

    async fn demote(&self, chat: &str, users: &[String]) -> TResult<()> {
        self.check(Op::Promote)?;
        self.record(Call::Demote {
            chat: chat.to_owned(),
            users: users.to_vec(),
        });
        Ok(())
    }

    async fn set_announce(&self, chat: &str, admins_only: bool) -> TResult<()> {
        self.record(Call::Announce {
            chat: chat.to_owned(),
            admins_only,
        });
        Ok(())
    }

    async fn send_sticker(&self, chat: &str, media: &MediaRef) -> TResult<()> {
        self.record(Call::Sticker {
            chat: chat.to_owned(),
            file_id: media.file_id.clone(),
        });
        Ok(())
    }
}
