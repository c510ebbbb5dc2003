//! Moderation checks run on every inbound message before command dispatch.
//!
//! Order is fixed: mute, ban, antilink, slowmode, blocked words, admin-only
//! mode. The first check that fires ends processing for the message.
use crate::database::db_utils::{record_message, with_group};
use crate::database::XpAward;
use crate::util::{consts, contains_link, is_user_admin, mention_tag};
use crate::{Cxt, TgErr};
use rand::Rng;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Deleted,
    Replied(String),
    DeletedAndReplied(String),
    /// Checks passed and the message is a command.
    Continue,
    NoOp,
}

impl Action {
    pub fn halts(&self) -> bool {
        !matches!(self, Action::Continue)
    }
}

/// Runs the checks and carries out their side effects on the transport.
pub async fn process(cx: &Cxt) -> TgErr<Action> {
    if cx.update.from_me {
        return Ok(Action::NoOp);
    }
    if cx.update.is_group {
        if let Some(action) = enforce_policy(cx).await? {
            return Ok(action);
        }
        if let Some(text) = award_progress(cx) {
            cx.send(text, &[cx.update.sender.clone()]).await?;
        }
    }
    if is_command(cx) {
        Ok(Action::Continue)
    } else {
        Ok(Action::NoOp)
    }
}

async fn enforce_policy(cx: &Cxt) -> TgErr<Option<Action>> {
    let chat = cx.chat_id();
    let sender = cx.sender();
    let policy = with_group(&cx.store, chat, |g| g.clone());

    if policy.is_muted(&sender) {
        delete_quietly(cx).await;
        return Ok(Some(Action::Deleted));
    }

    if policy.is_banned(&sender) {
        if let Err(e) = cx
            .transport
            .remove_participants(chat, &[cx.update.sender.clone()])
            .await
        {
            log::warn!("Can't remove banned user {} from {}: {}", sender, chat, e);
        }
        return Ok(Some(Action::NoOp));
    }

    // Resolved lazily, at most once per message.
    let mut admin: Option<bool> = None;

    if policy.antilink && contains_link(&cx.update.text) {
        let is_admin = is_user_admin(cx, &sender).await;
        admin = Some(is_admin);
        if !is_admin {
            delete_quietly(cx).await;
            let text = format!(
                "🚫 {} i link non sono permessi in questo gruppo!",
                mention_tag(&sender)
            );
            cx.send(&text, &[cx.update.sender.clone()]).await?;
            return Ok(Some(Action::DeletedAndReplied(text)));
        }
    }

    if policy.slowmode > 0 {
        let now = cx.update.timestamp;
        let allowed = with_group(&cx.store, chat, |g| g.slowmode_allows(&sender, now));
        if !allowed {
            delete_quietly(cx).await;
            return Ok(Some(Action::Deleted));
        }
    }

    if let Some(word) = policy.blocked_word_in(&cx.update.text) {
        // Admin commands may name a blocked word, `sblocca` has to.
        let exempt = if is_command(cx) {
            let is_admin = match admin {
                Some(a) => a,
                None => is_user_admin(cx, &sender).await,
            };
            admin = Some(is_admin);
            is_admin
        } else {
            false
        };
        if !exempt {
            log::info!("Blocked word {:?} from {} in {}", word, sender, chat);
            delete_quietly(cx).await;
            let text = format!(
                "🚫 {} il tuo messaggio conteneva una parola vietata.",
                mention_tag(&sender)
            );
            cx.send(&text, &[cx.update.sender.clone()]).await?;
            return Ok(Some(Action::DeletedAndReplied(text)));
        }
    }

    if policy.admin_mode {
        let is_admin = match admin {
            Some(a) => a,
            None => is_user_admin(cx, &sender).await,
        };
        if !is_admin {
            delete_quietly(cx).await;
            return Ok(Some(Action::Deleted));
        }
    }

    Ok(None)
}

fn is_command(cx: &Cxt) -> bool {
    cx.update.text.trim_start().starts_with(cx.config.prefix.as_str())
}

/// Counts the message and awards XP, returning a level-up announcement.
fn award_progress(cx: &Cxt) -> Option<String> {
    let amount = rand::thread_rng().gen_range(consts::XP_MIN_AWARD..=consts::XP_MAX_AWARD);
    match record_message(&cx.store, &cx.sender(), amount, cx.update.timestamp) {
        XpAward::LevelUp { level } => Some(format!(
            "🎉 {} è salito al livello {}!",
            mention_tag(&cx.update.sender),
            level
        )),
        _ => None,
    }
}

/// Deletion is best effort, the transport may lack the permission.
async fn delete_quietly(cx: &Cxt) {
    if let Err(e) = cx
        .transport
        .delete_message(cx.chat_id(), &cx.update.id)
        .await
    {
        log::debug!("Can't delete {} in {}: {}", cx.update.id, cx.chat_id(), e);
    }
}
