use crate::database::db_utils::{
    add_blacklist, ensure_group, get_blacklist, rm_blacklist, set_admin_mode, set_antilink,
    set_goodbye, set_goodbye_message, set_slowmode, set_welcome, set_welcome_message,
};
use crate::transport::TransportError;
use crate::util::{consts, extract_targets, failure_text, mention_tag, TimeUnit, Toggle};
use crate::{Cxt, TgErr};
use std::str::FromStr;

/// Mentions every roster member in one message. Members that can't be
/// resolved are left out.
pub async fn tag_all(cx: &Cxt) -> TgErr<()> {
    let roster = match cx.transport.list_participants(cx.chat_id()).await {
        Ok(r) => r,
        Err(e) => {
            log::warn!("Can't list members of {}: {}", cx.chat_id(), e);
            cx.reply_to(failure_text(&e)).await?;
            return Ok(());
        }
    };
    let mut mentions = Vec::with_capacity(roster.len());
    let mut lines = Vec::with_capacity(roster.len());
    for member in roster {
        match cx.transport.contact_name(&member.id).await {
            Ok(name) => {
                lines.push(format!("➤ {} ({})", mention_tag(&member.id), name));
                mentions.push(member.id);
            }
            Err(e) => log::debug!("Skipping {} in tag: {}", member.id, e),
        }
    }
    if mentions.is_empty() {
        cx.reply_to("❌ Non sono riuscito a menzionare nessuno.").await?;
        return Ok(());
    }
    let header = match cx.arg_text() {
        "" => String::from("📢 Attenzione a tutti!"),
        text => format!("📢 {}", text),
    };
    cx.send(format!("{}\n\n{}", header, lines.join("\n")), &mentions)
        .await?;
    Ok(())
}

pub async fn antilink(cx: &Cxt) -> TgErr<()> {
    let arg = match cx.args().first() {
        Some(a) => a.to_string(),
        None => {
            let on = ensure_group(&cx.store, cx.chat_id()).antilink;
            cx.reply_to(format!(
                "🔗 Antilink: {}",
                if on { "attivo" } else { "disattivo" }
            ))
            .await?;
            return Ok(());
        }
    };
    match Toggle::from_str(&arg) {
        Ok(Toggle::On) => {
            set_antilink(&cx.store, cx.chat_id(), true);
            cx.reply_to("✅ Antilink attivato.").await?;
        }
        Ok(Toggle::Off) => {
            set_antilink(&cx.store, cx.chat_id(), false);
            cx.reply_to("✅ Antilink disattivato.").await?;
        }
        _ => {
            cx.reply_to("❌ Usa on oppure off.").await?;
        }
    }
    Ok(())
}

pub async fn slowmode(cx: &Cxt) -> TgErr<()> {
    let arg = match cx.args().first() {
        Some(a) => a.to_lowercase(),
        None => {
            let secs = ensure_group(&cx.store, cx.chat_id()).slowmode;
            let text = if secs == 0 {
                String::from("🐢 Slowmode disattivato.")
            } else {
                format!("🐢 Slowmode: un messaggio ogni {} secondi.", secs)
            };
            cx.reply_to(text).await?;
            return Ok(());
        }
    };
    if matches!(Toggle::from_str(&arg), Ok(Toggle::Off)) || arg == "0" {
        set_slowmode(&cx.store, cx.chat_id(), 0);
        cx.reply_to("✅ Slowmode disattivato.").await?;
        return Ok(());
    }
    match TimeUnit::from_str(&arg) {
        Ok(t) => match t.as_secs() {
            Some(secs) if secs <= consts::MAX_SLOWMODE_SECS => {
                set_slowmode(&cx.store, cx.chat_id(), secs);
                cx.reply_to(format!("✅ Slowmode impostato a {}.", t)).await?;
            }
            _ => {
                cx.reply_to(format!(
                    "❌ Lo slowmode può durare al massimo {} ore.",
                    consts::MAX_SLOWMODE_SECS / 3600
                ))
                .await?;
            }
        },
        Err(e) => {
            cx.reply_to(format!("❌ {}", e)).await?;
        }
    }
    Ok(())
}

pub async fn blacklist_word(cx: &Cxt) -> TgErr<()> {
    let word = cx.arg_text().to_lowercase();
    let text = if add_blacklist(&cx.store, cx.chat_id(), &word) {
        format!("🚫 \"{}\" aggiunta alle parole bloccate.", word)
    } else {
        format!("ℹ️ \"{}\" è già bloccata.", word)
    };
    cx.reply_to(text).await?;
    Ok(())
}

pub async fn remove_blacklist(cx: &Cxt) -> TgErr<()> {
    let word = cx.arg_text().to_lowercase();
    let text = if rm_blacklist(&cx.store, cx.chat_id(), &word) {
        format!("✅ \"{}\" non è più bloccata.", word)
    } else {
        format!("ℹ️ \"{}\" non era bloccata.", word)
    };
    cx.reply_to(text).await?;
    Ok(())
}

pub async fn list_blacklist(cx: &Cxt) -> TgErr<()> {
    let words = get_blacklist(&cx.store, cx.chat_id());
    if words.is_empty() {
        cx.reply_to("ℹ️ Nessuna parola bloccata in questo gruppo.")
            .await?;
        return Ok(());
    }
    let list = words
        .iter()
        .map(|w| format!("• {}", w))
        .collect::<Vec<_>>()
        .join("\n");
    cx.reply_to(format!("🚫 Parole bloccate:\n{}", list)).await?;
    Ok(())
}

pub async fn welcome_toggle(cx: &Cxt) -> TgErr<()> {
    greeting_toggle(cx, true).await
}

pub async fn goodbye_toggle(cx: &Cxt) -> TgErr<()> {
    greeting_toggle(cx, false).await
}

async fn greeting_toggle(cx: &Cxt, welcome: bool) -> TgErr<()> {
    let label = if welcome { "benvenuto" } else { "addio" };
    let arg = match cx.args().first() {
        Some(a) => a.to_string(),
        None => {
            let g = ensure_group(&cx.store, cx.chat_id());
            let (on, template) = if welcome {
                (g.welcome_enabled, g.welcome_message)
            } else {
                (g.goodbye_enabled, g.goodbye_message)
            };
            cx.reply_to(format!(
                "👋 Messaggio di {}: {}\n\n{}",
                label,
                if on { "attivo" } else { "disattivo" },
                template
            ))
            .await?;
            return Ok(());
        }
    };
    let on = match Toggle::from_str(&arg) {
        Ok(Toggle::On) => true,
        Ok(Toggle::Off) => false,
        _ => {
            cx.reply_to("❌ Usa on oppure off.").await?;
            return Ok(());
        }
    };
    if welcome {
        set_welcome(&cx.store, cx.chat_id(), on);
    } else {
        set_goodbye(&cx.store, cx.chat_id(), on);
    }
    cx.reply_to(format!(
        "✅ Messaggio di {} {}.",
        label,
        if on { "attivato" } else { "disattivato" }
    ))
    .await?;
    Ok(())
}

pub async fn set_welcome_text(cx: &Cxt) -> TgErr<()> {
    set_welcome_message(&cx.store, cx.chat_id(), cx.arg_text());
    cx.reply_to("✅ Messaggio di benvenuto aggiornato.").await?;
    Ok(())
}

pub async fn set_goodbye_text(cx: &Cxt) -> TgErr<()> {
    set_goodbye_message(&cx.store, cx.chat_id(), cx.arg_text());
    cx.reply_to("✅ Messaggio di addio aggiornato.").await?;
    Ok(())
}

/// Admin-only mode is enforced by the pipeline even when the transport can't
/// restrict the chat itself.
pub async fn close_chat(cx: &Cxt) -> TgErr<()> {
    set_admin_mode(&cx.store, cx.chat_id(), true);
    if let Err(e) = cx.transport.set_announce(cx.chat_id(), true).await {
        log::info!("Announce mode not applied in {}: {}", cx.chat_id(), e);
    }
    cx.reply_to("🔒 Gruppo chiuso, ora solo gli admin possono scrivere.")
        .await?;
    Ok(())
}

pub async fn open_chat(cx: &Cxt) -> TgErr<()> {
    set_admin_mode(&cx.store, cx.chat_id(), false);
    if let Err(e) = cx.transport.set_announce(cx.chat_id(), false).await {
        log::info!("Announce mode not lifted in {}: {}", cx.chat_id(), e);
    }
    cx.reply_to("🔓 Gruppo aperto, tutti possono scrivere.")
        .await?;
    Ok(())
}

pub async fn delete(cx: &Cxt) -> TgErr<()> {
    let quoted = match &cx.update.quoted {
        Some(q) => q,
        None => {
            cx.reply_to("❌ Rispondi al messaggio da eliminare.").await?;
            return Ok(());
        }
    };
    if let Err(e) = cx.transport.delete_message(cx.chat_id(), &quoted.id).await {
        log::warn!("Can't delete {} in {}: {}", quoted.id, cx.chat_id(), e);
        cx.reply_to(failure_text(&e)).await?;
    }
    Ok(())
}

pub async fn promote(cx: &Cxt) -> TgErr<()> {
    let targets = extract_targets(cx).await;
    let text = match cx.transport.promote(cx.chat_id(), &targets).await {
        Ok(()) => format!("⬆️ Promossi ad admin: {}", tag_list(&targets)),
        Err(e) => return report_role_failure(cx, e).await,
    };
    cx.reply_mentioning(text, &targets).await?;
    Ok(())
}

pub async fn demote(cx: &Cxt) -> TgErr<()> {
    let targets = extract_targets(cx).await;
    let text = match cx.transport.demote(cx.chat_id(), &targets).await {
        Ok(()) => format!("⬇️ Non più admin: {}", tag_list(&targets)),
        Err(e) => return report_role_failure(cx, e).await,
    };
    cx.reply_mentioning(text, &targets).await?;
    Ok(())
}

fn tag_list(users: &[String]) -> String {
    users
        .iter()
        .map(|u| mention_tag(u))
        .collect::<Vec<_>>()
        .join(", ")
}

async fn report_role_failure(cx: &Cxt, e: TransportError) -> TgErr<()> {
    log::warn!("Role change in {} failed: {}", cx.chat_id(), e);
    cx.reply_to(failure_text(&e)).await?;
    Ok(())
}
