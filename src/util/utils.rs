use crate::transport::TransportError;
use crate::{Cxt, TgErr};
use anyhow::anyhow;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref LINK_RE: Regex = Regex::new(
        r"(?i)(https?://\S+|www\.\S+|chat\.whatsapp\.com/\S+|t\.me/\S+|\b[a-z0-9-]+\.(com|net|org|it|io|me|ly|gg|xyz|info|co)\b)"
    )
    .expect("link pattern is valid");
}

/// Reduces an identifier to its numeric part: `39333@s.whatsapp.net` and `39333`
/// name the same user.
pub fn normalize_id(raw: &str) -> String {
    let raw = raw.trim().trim_start_matches('+');
    raw.split('@').next().unwrap_or(raw).to_owned()
}

pub fn same_user(a: &str, b: &str) -> bool {
    normalize_id(a) == normalize_id(b)
}

pub fn mention_tag(user: &str) -> String {
    format!("@{}", normalize_id(user))
}

pub fn render_template(template: &str, user: &str, group: &str) -> String {
    template.replace("{user}", user).replace("{group}", group)
}

pub fn contains_link(text: &str) -> bool {
    LINK_RE.is_match(text)
}

pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

pub fn format_duration(total_secs: u64) -> String {
    let days = total_secs / 86_400;
    let hours = (total_secs % 86_400) / 3600;
    let minutes = (total_secs % 3600) / 60;
    let secs = total_secs % 60;
    let mut parts = Vec::new();
    if days > 0 {
        parts.push(format!("{}g", days));
    }
    if hours > 0 {
        parts.push(format!("{}h", hours));
    }
    if minutes > 0 {
        parts.push(format!("{}m", minutes));
    }
    parts.push(format!("{}s", secs));
    parts.join(" ")
}

/// User-facing text for a failed transport call.
pub fn failure_text(err: &TransportError) -> &'static str {
    match err {
        TransportError::PermissionDenied => {
            "❌ Non ho i permessi di amministratore per farlo, rendimi admin!"
        }
        TransportError::NotFound => "❌ Utente o messaggio non trovato.",
        TransportError::Network(_) => "❌ Errore di rete, riprova più tardi.",
        TransportError::Unsupported(_) => "❌ Operazione non supportata qui.",
    }
}

/// Roster lookup for admin status. Any lookup failure counts as "not admin".
pub async fn is_user_admin(cx: &Cxt, user: &str) -> bool {
    if cx.config.is_privileged(user) {
        return true;
    }
    if !cx.update.is_group {
        return false;
    }
    match cx.transport.list_participants(cx.chat_id()).await {
        Ok(roster) => roster
            .iter()
            .any(|p| p.is_admin && same_user(&p.id, user)),
        Err(e) => {
            log::warn!("Admin lookup failed in {}: {}", cx.chat_id(), e);
            false
        }
    }
}

pub async fn is_in_roster(cx: &Cxt, user: &str) -> Result<bool, TransportError> {
    cx.transport.is_participant(cx.chat_id(), user).await
}

pub async fn is_group(cx: &Cxt) -> TgErr<()> {
    if cx.update.is_group {
        return Ok(());
    }
    cx.reply_to("❌ Questo comando funziona solo nei gruppi.")
        .await?;
    Err(anyhow!("This isnt a group"))
}

pub async fn user_should_be_admin(cx: &Cxt) -> TgErr<()> {
    if is_user_admin(cx, &cx.sender()).await {
        return Ok(());
    }
    cx.reply_to("❌ Solo gli admin possono usare questo comando.")
        .await?;
    Err(anyhow!("User isnt admin"))
}

/// Refuses actions against the bot itself, the owner/sudo users and admins.
/// Returns `false` after replying when `target` is protected.
pub async fn target_is_fair_game(cx: &Cxt, target: &str, verb: &str) -> TgErr<bool> {
    if same_user(target, &cx.transport.bot_id()) {
        cx.reply_to(format!("😅 Non posso {} me stesso!", verb))
            .await?;
        return Ok(false);
    }
    if cx.config.is_privileged(target) {
        cx.reply_to(format!("❌ Non posso {} il mio proprietario.", verb))
            .await?;
        return Ok(false);
    }
    if is_user_admin(cx, target).await {
        cx.reply_to(format!("❌ Non posso {} un admin.", verb))
            .await?;
        return Ok(false);
    }
    Ok(true)
}

/// Users targeted by a command: resolved mentions, raw `@handle` arguments the
/// transport can resolve, and finally the author of the quoted message.
pub async fn extract_targets(cx: &Cxt) -> Vec<String> {
    fn push(id: &str, targets: &mut Vec<String>) {
        let id = normalize_id(id);
        if !id.is_empty() && !targets.contains(&id) {
            targets.push(id);
        }
    }
    let mut targets: Vec<String> = Vec::new();
    for m in &cx.update.mentions {
        push(m, &mut targets);
    }
    if targets.is_empty() {
        for raw in cx.args().into_iter().filter(|a| a.starts_with('@')) {
            match cx.transport.resolve_mention(cx.chat_id(), raw).await {
                Ok(Some(id)) => push(&id, &mut targets),
                Ok(None) => log::debug!("Unresolved mention {}", raw),
                Err(e) => log::warn!("Mention resolution failed for {}: {}", raw, e),
            }
        }
    }
    if targets.is_empty() {
        if let Some(q) = &cx.update.quoted {
            push(&q.sender, &mut targets);
        }
    }
    targets
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_splits_at_first_at() {
        assert_eq!(normalize_id("39333@s.whatsapp.net"), "39333");
        assert_eq!(normalize_id(" +39333 "), "39333");
        assert_eq!(normalize_id("1@2@3"), "1");
        assert!(same_user("5@c.us", "5"));
    }

    #[test]
    fn link_detection() {
        assert!(contains_link("check www.example.com"));
        assert!(contains_link("https://foo.bar/x"));
        assert!(contains_link("vai su example.com ora"));
        assert!(contains_link("entra chat.whatsapp.com/AbC"));
        assert!(!contains_link("ciao a tutti, come va?"));
        assert!(!contains_link("ore 10.30"));
    }

    #[test]
    fn templates_and_durations() {
        assert_eq!(
            render_template("ciao {user} in {group}, {user}!", "@1", "Amici"),
            "ciao @1 in Amici, @1!"
        );
        assert_eq!(format_duration(5), "5s");
        assert_eq!(format_duration(90_061), "1g 1h 1m 1s");
    }
}
