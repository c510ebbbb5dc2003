use crate::database::db_utils::{mute_user, unmute_user};
use crate::util::{extract_targets, mention_tag, target_is_fair_game};
use crate::{Cxt, TgErr};

/// Muted users keep their membership; the pipeline deletes whatever they post.
pub async fn mute(cx: &Cxt) -> TgErr<()> {
    let target = match extract_targets(cx).await.into_iter().next() {
        Some(t) => t,
        None => {
            cx.reply_to("❌ Menziona l'utente da silenziare.").await?;
            return Ok(());
        }
    };
    if !target_is_fair_game(cx, &target, "silenziare").await? {
        return Ok(());
    }
    let tag = mention_tag(&target);
    let text = if mute_user(&cx.store, cx.chat_id(), &target) {
        format!("🔇 {} è stato silenziato.", tag)
    } else {
        format!("ℹ️ {} è già silenziato.", tag)
    };
    cx.reply_mentioning(text, &[target]).await?;
    Ok(())
}

pub async fn unmute(cx: &Cxt) -> TgErr<()> {
    let target = match extract_targets(cx).await.into_iter().next() {
        Some(t) => t,
        None => {
            cx.reply_to("❌ Menziona l'utente da smutare.").await?;
            return Ok(());
        }
    };
    let tag = mention_tag(&target);
    let text = if unmute_user(&cx.store, cx.chat_id(), &target) {
        format!("🔊 {} può di nuovo scrivere.", tag)
    } else {
        format!("ℹ️ {} non è silenziato.", tag)
    };
    cx.reply_mentioning(text, &[target]).await?;
    Ok(())
}
