use crate::database::db_utils::{
    get_warn_count, get_warn_limit, insert_warn, rm_single_warn, set_warn_limit,
};
use crate::database::WarnOutcome;
use crate::util::{extract_targets, failure_text, mention_tag, target_is_fair_game};
use crate::{Cxt, TgErr};

pub async fn warn(cx: &Cxt) -> TgErr<()> {
    let target = match extract_targets(cx).await.into_iter().next() {
        Some(t) => t,
        None => {
            cx.reply_to("❌ Menziona l'utente da avvertire.").await?;
            return Ok(());
        }
    };
    if !target_is_fair_game(cx, &target, "avvertire").await? {
        return Ok(());
    }
    warn_user(cx, &target).await
}

/// Adds a warning and removes the user once the group threshold is reached.
pub async fn warn_user(cx: &Cxt, target: &str) -> TgErr<()> {
    let tag = mention_tag(target);
    let mentions = [target.to_owned()];
    match insert_warn(
        &cx.store,
        cx.chat_id(),
        target,
        &cx.sender(),
        cx.update.timestamp,
    ) {
        WarnOutcome::Warned { count, limit } => {
            cx.reply_mentioning(
                format!(
                    "⚠️ {} ha ricevuto un avvertimento ({}/{}).",
                    tag, count, limit
                ),
                &mentions,
            )
            .await?;
        }
        WarnOutcome::LimitReached { limit } => {
            match cx
                .transport
                .remove_participants(cx.chat_id(), &mentions)
                .await
            {
                Ok(()) => {
                    cx.reply_mentioning(
                        format!(
                            "⛔ {} ha raggiunto {}/{} avvertimenti ed è stato rimosso.",
                            tag, limit, limit
                        ),
                        &mentions,
                    )
                    .await?;
                }
                Err(e) => {
                    log::warn!("Auto-kick of {} in {} failed: {}", target, cx.chat_id(), e);
                    cx.reply_mentioning(
                        format!(
                            "⛔ {} ha raggiunto il limite di avvertimenti ma non posso rimuoverlo.\n{}",
                            tag,
                            failure_text(&e)
                        ),
                        &mentions,
                    )
                    .await?;
                }
            }
        }
    }
    Ok(())
}

pub async fn unwarn(cx: &Cxt) -> TgErr<()> {
    let target = match extract_targets(cx).await.into_iter().next() {
        Some(t) => t,
        None => {
            cx.reply_to("❌ Menziona l'utente.").await?;
            return Ok(());
        }
    };
    let tag = mention_tag(&target);
    let limit = get_warn_limit(&cx.store, cx.chat_id());
    let text = match rm_single_warn(
        &cx.store,
        cx.chat_id(),
        &target,
        &cx.sender(),
        cx.update.timestamp,
    ) {
        Some(left) => format!(
            "✅ Avvertimento rimosso, {} ora ne ha {}/{}.",
            tag, left, limit
        ),
        None => format!("ℹ️ {} non ha avvertimenti.", tag),
    };
    cx.reply_mentioning(text, &[target]).await?;
    Ok(())
}

pub async fn warns(cx: &Cxt) -> TgErr<()> {
    let target = extract_targets(cx)
        .await
        .into_iter()
        .next()
        .unwrap_or_else(|| cx.sender());
    let count = get_warn_count(&cx.store, cx.chat_id(), &target);
    let limit = get_warn_limit(&cx.store, cx.chat_id());
    let tag = mention_tag(&target);
    let text = if count == 0 {
        format!("✅ {} non ha avvertimenti.", tag)
    } else {
        format!("⚠️ {} ha {}/{} avvertimenti.", tag, count, limit)
    };
    cx.reply_mentioning(text, &[target]).await?;
    Ok(())
}

pub async fn warn_limit(cx: &Cxt) -> TgErr<()> {
    let lim = match cx.args().first().and_then(|a| a.parse::<u32>().ok()) {
        Some(n) if n >= 1 => n,
        _ => {
            cx.reply_to("❌ Indica un numero di avvertimenti valido (almeno 1).")
                .await?;
            return Ok(());
        }
    };
    set_warn_limit(&cx.store, cx.chat_id(), lim);
    cx.reply_to(format!(
        "✅ Dopo {} avvertimenti l'utente verrà rimosso.",
        lim
    ))
    .await?;
    Ok(())
}
