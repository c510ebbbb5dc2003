//! Membership changes: greetings, farewells and keeping banned users out.
use crate::database::db_utils::{ensure_group, reset_warn};
use crate::transport::MemberEvent;
use crate::util::{mention_tag, normalize_id, render_template};
use crate::{TgErr, Warden};

pub async fn greet_members(w: &Warden, ev: &MemberEvent) -> TgErr<()> {
    let policy = ensure_group(&w.store, &ev.chat_id);
    let mut welcome = Vec::new();
    for user in &ev.users {
        if policy.is_banned(user) {
            log::info!("Banned user {} rejoined {}, removing", user, ev.chat_id);
            if let Err(e) = w
                .transport
                .remove_participants(&ev.chat_id, &[user.clone()])
                .await
            {
                log::warn!("Can't remove banned user {} from {}: {}", user, ev.chat_id, e);
            }
        } else if policy.welcome_enabled {
            welcome.push(user.clone());
        }
    }
    if welcome.is_empty() {
        return Ok(());
    }
    let group = group_name(w, &ev.chat_id).await;
    for user in welcome {
        let name = display_name(w, &user).await;
        let text = render_template(&policy.welcome_message, &name, &group);
        if let Err(e) = w.transport.send_message(&ev.chat_id, &text, &[user]).await {
            log::warn!("Welcome in {} failed: {}", ev.chat_id, e);
        }
    }
    Ok(())
}

/// Warnings don't follow a user out of the group.
pub async fn farewell_members(w: &Warden, ev: &MemberEvent) -> TgErr<()> {
    for user in &ev.users {
        reset_warn(&w.store, &ev.chat_id, user, ev.timestamp);
    }
    let policy = ensure_group(&w.store, &ev.chat_id);
    if policy.goodbye_enabled {
        let group = group_name(w, &ev.chat_id).await;
        for user in &ev.users {
            let name = display_name(w, user).await;
            let text = render_template(&policy.goodbye_message, &name, &group);
            if let Err(e) = w
                .transport
                .send_message(&ev.chat_id, &text, &[user.clone()])
                .await
            {
                log::warn!("Goodbye in {} failed: {}", ev.chat_id, e);
            }
        }
    }
    w.store.clone().persist().await?;
    Ok(())
}

/// Falls back to a plain mention when the contact can't be resolved.
async fn display_name(w: &Warden, user: &str) -> String {
    match w.transport.contact_name(user).await {
        Ok(name) if !name.trim().is_empty() && name != normalize_id(user) => {
            format!("{} ({})", mention_tag(user), name)
        }
        Ok(_) => mention_tag(user),
        Err(e) => {
            log::debug!("No contact name for {}: {}", user, e);
            mention_tag(user)
        }
    }
}

async fn group_name(w: &Warden, chat: &str) -> String {
    match w.transport.group_name(chat).await {
        Ok(name) => name,
        Err(e) => {
            log::debug!("No subject for {}: {}", chat, e);
            String::from("questo gruppo")
        }
    }
}
