use super::commands::{Permission, COMMANDS};
use crate::database::db_utils::{counts, get_botdata};
use crate::transport::{MediaKind, MediaRef};
use crate::util::{failure_text, format_duration};
use crate::{Cxt, TgErr};
use chrono::{TimeZone, Utc};

pub async fn menu(cx: &Cxt) -> TgErr<()> {
    let prefix = &cx.config.prefix;
    let section = |title: &str, filter: &dyn Fn(Permission) -> bool| {
        let lines: Vec<String> = COMMANDS
            .iter()
            .filter(|c| filter(c.permission))
            .map(|c| format!("• {}{} : {}", prefix, c.usage, c.description))
            .collect();
        format!("*{}*\n{}", title, lines.join("\n"))
    };
    let text = format!(
        "🤖 *{}*\n\n{}\n\n{}",
        cx.config.bot_name,
        section("Comandi", &|p| p != Permission::GroupAdmin),
        section("Admin", &|p| p == Permission::GroupAdmin),
    );
    cx.reply_to(text).await?;
    Ok(())
}

/// Turns the attached or quoted image into a sticker.
pub async fn sticker(cx: &Cxt) -> TgErr<()> {
    let media = cx
        .update
        .media
        .as_ref()
        .or_else(|| cx.update.quoted.as_ref().and_then(|q| q.media.as_ref()))
        .filter(|m| stickerable(m));
    let media = match media {
        Some(m) => m,
        None => {
            cx.reply_to("❌ Invia o rispondi a un'immagine con .s")
                .await?;
            return Ok(());
        }
    };
    if let Err(e) = cx.transport.send_sticker(cx.chat_id(), media).await {
        log::warn!("Sticker in {} failed: {}", cx.chat_id(), e);
        cx.reply_to(failure_text(&e)).await?;
    }
    Ok(())
}

fn stickerable(media: &MediaRef) -> bool {
    matches!(media.kind, MediaKind::Image | MediaKind::Sticker)
}

pub async fn uptime(cx: &Cxt) -> TgErr<()> {
    cx.reply_to(format!(
        "⏱️ Attivo da {}",
        format_duration(cx.started.elapsed().as_secs())
    ))
    .await?;
    Ok(())
}

pub async fn bot_info(cx: &Cxt) -> TgErr<()> {
    let (groups, users) = counts(&cx.store);
    let data = get_botdata(&cx.store);
    let first_start = data
        .first_start
        .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
        .map(|t| t.format("%d/%m/%Y").to_string())
        .unwrap_or_else(|| String::from("-"));
    cx.reply_to(format!(
        "🤖 *{}* v{}\n\n👥 Gruppi: {}\n👤 Utenti: {}\n⌨️ Prefisso: {}\n📈 Comandi eseguiti: {}\n📅 Attivo dal: {}\n⏱️ Uptime: {}",
        cx.config.bot_name,
        env!("CARGO_PKG_VERSION"),
        groups,
        users,
        cx.config.prefix,
        data.commands_run,
        first_start,
        format_duration(cx.started.elapsed().as_secs())
    ))
    .await?;
    Ok(())
}
