use crate::database::db_utils::{ban_user, reset_warn, unban_user};
use crate::transport::TransportError;
use crate::util::{extract_targets, failure_text, is_in_roster, mention_tag, target_is_fair_game};
use crate::{Cxt, TgErr};

pub async fn ban(cx: &Cxt) -> TgErr<()> {
    let target = match extract_targets(cx).await.into_iter().next() {
        Some(t) => t,
        None => {
            cx.reply_to("❌ Menziona l'utente da bannare.").await?;
            return Ok(());
        }
    };
    if !target_is_fair_game(cx, &target, "bannare").await? {
        return Ok(());
    }
    let tag = mention_tag(&target);
    let newly = ban_user(&cx.store, cx.chat_id(), &target);

    // A roster lookup failure still lets the removal attempt decide.
    if let Ok(false) = is_in_roster(cx, &target).await {
        let text = if newly {
            format!(
                "🔨 {} è stato bannato. Non è nel gruppo ora, verrà rimosso se rientra.",
                tag
            )
        } else {
            format!("ℹ️ {} è già bannato e non è nel gruppo.", tag)
        };
        cx.reply_mentioning(text, &[target]).await?;
        return Ok(());
    }

    match cx
        .transport
        .remove_participants(cx.chat_id(), &[target.clone()])
        .await
    {
        Ok(()) => {
            reset_warn(&cx.store, cx.chat_id(), &target, cx.update.timestamp);
            cx.reply_mentioning(format!("🔨 {} è stato bannato.", tag), &[target])
                .await?;
        }
        Err(TransportError::NotFound) => {
            cx.reply_mentioning(
                format!("🔨 {} è stato bannato, ma non è nel gruppo.", tag),
                &[target],
            )
            .await?;
        }
        Err(e) => {
            log::warn!("Ban of {} in {} failed: {}", target, cx.chat_id(), e);
            cx.reply_to(format!(
                "{}\n{} resta nella lista dei bannati.",
                failure_text(&e),
                tag
            ))
            .await?;
        }
    }
    Ok(())
}

pub async fn unban(cx: &Cxt) -> TgErr<()> {
    let mut lines = Vec::new();
    let targets = extract_targets(cx).await;
    for target in &targets {
        if unban_user(&cx.store, cx.chat_id(), target) {
            lines.push(format!("✅ {} non è più bannato.", mention_tag(target)));
        } else {
            lines.push(format!("ℹ️ {} non era bannato.", mention_tag(target)));
        }
    }
    cx.reply_mentioning(lines.join("\n"), &targets).await?;
    Ok(())
}

/// Removes a member without remembering them in the ban list.
pub async fn kick(cx: &Cxt) -> TgErr<()> {
    let target = match extract_targets(cx).await.into_iter().next() {
        Some(t) => t,
        None => {
            cx.reply_to("❌ Menziona l'utente da rimuovere.").await?;
            return Ok(());
        }
    };
    if !target_is_fair_game(cx, &target, "rimuovere").await? {
        return Ok(());
    }
    let tag = mention_tag(&target);
    match is_in_roster(cx, &target).await {
        Ok(false) => {
            cx.reply_mentioning(format!("❌ {} non è nel gruppo.", tag), &[target])
                .await?;
            return Ok(());
        }
        Ok(true) => {}
        Err(e) => log::warn!("Roster lookup failed in {}: {}", cx.chat_id(), e),
    }
    match cx
        .transport
        .remove_participants(cx.chat_id(), &[target.clone()])
        .await
    {
        Ok(()) => {
            reset_warn(&cx.store, cx.chat_id(), &target, cx.update.timestamp);
            cx.reply_mentioning(format!("👢 {} è stato rimosso.", tag), &[target])
                .await?;
        }
        Err(TransportError::NotFound) => {
            cx.reply_mentioning(format!("❌ {} non è nel gruppo.", tag), &[target])
                .await?;
        }
        Err(e) => {
            log::warn!("Kick of {} in {} failed: {}", target, cx.chat_id(), e);
            cx.reply_to(failure_text(&e)).await?;
        }
    }
    Ok(())
}
