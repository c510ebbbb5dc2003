use super::{
    BotData, GameSession, GroupPolicy, Guess, Store, UserEconomy, UserStats, WarnEvent,
    WarnEventKind, WarnOutcome, XpAward,
};
use crate::util::{consts, normalize_id};

/// Returns the policy record for `chat`, creating it with defaults when absent.
pub fn ensure_group(db: &Store, chat: &str) -> GroupPolicy {
    with_group(db, chat, |g| g.clone())
}

/// Runs `f` against the (lazily created) policy record of `chat`.
pub fn with_group<R>(db: &Store, chat: &str, f: impl FnOnce(&mut GroupPolicy) -> R) -> R {
    db.mutate(|c| f(c.groups.entry(chat.to_owned()).or_default()))
}

pub fn mute_user(db: &Store, chat: &str, user: &str) -> bool {
    with_group(db, chat, |g| g.mute(user))
}

pub fn unmute_user(db: &Store, chat: &str, user: &str) -> bool {
    with_group(db, chat, |g| g.unmute(user))
}

pub fn ban_user(db: &Store, chat: &str, user: &str) -> bool {
    with_group(db, chat, |g| g.ban(user))
}

pub fn unban_user(db: &Store, chat: &str, user: &str) -> bool {
    with_group(db, chat, |g| g.unban(user))
}

pub fn insert_warn(db: &Store, chat: &str, user: &str, issuer: &str, now: i64) -> WarnOutcome {
    db.mutate(|c| {
        let outcome = c.groups.entry(chat.to_owned()).or_default().warn(user);
        let kind = match outcome {
            WarnOutcome::Warned { .. } => WarnEventKind::Warn,
            WarnOutcome::LimitReached { .. } => WarnEventKind::AutoKick,
        };
        log_warn_event(&mut c.warnings, chat, user, issuer, kind, now);
        outcome
    })
}

pub fn rm_single_warn(db: &Store, chat: &str, user: &str, issuer: &str, now: i64) -> Option<u32> {
    db.mutate(|c| {
        let left = c.groups.entry(chat.to_owned()).or_default().unwarn(user)?;
        log_warn_event(&mut c.warnings, chat, user, issuer, WarnEventKind::Unwarn, now);
        Some(left)
    })
}

/// Drops the warnings entry of a user that left or was removed.
pub fn reset_warn(db: &Store, chat: &str, user: &str, now: i64) -> bool {
    db.mutate(|c| {
        let cleared = c
            .groups
            .get_mut(chat)
            .map(|g| g.clear_warnings(user))
            .unwrap_or(false);
        if cleared {
            log_warn_event(&mut c.warnings, chat, user, "", WarnEventKind::Reset, now);
        }
        cleared
    })
}

pub fn get_warn_count(db: &Store, chat: &str, user: &str) -> u32 {
    db.read(|c| c.groups.get(chat).map(|g| g.warn_count(user)).unwrap_or(0))
}

pub fn get_warn_limit(db: &Store, chat: &str) -> u32 {
    with_group(db, chat, |g| g.auto_kick_warns)
}

pub fn set_warn_limit(db: &Store, chat: &str, limit: u32) {
    with_group(db, chat, |g| g.auto_kick_warns = limit.max(1))
}

pub fn get_warn_log(db: &Store, chat: &str) -> Vec<WarnEvent> {
    db.read(|c| c.warnings.get(chat).cloned().unwrap_or_default())
}

fn log_warn_event(
    log: &mut std::collections::BTreeMap<String, Vec<WarnEvent>>,
    chat: &str,
    user: &str,
    issuer: &str,
    kind: WarnEventKind,
    at: i64,
) {
    let events = log.entry(chat.to_owned()).or_default();
    events.push(WarnEvent {
        user: normalize_id(user),
        issuer: normalize_id(issuer),
        kind,
        at,
    });
    if events.len() > consts::WARN_LOG_LIMIT {
        let excess = events.len() - consts::WARN_LOG_LIMIT;
        events.drain(..excess);
    }
}

pub fn set_antilink(db: &Store, chat: &str, on: bool) {
    with_group(db, chat, |g| g.antilink = on)
}

pub fn set_slowmode(db: &Store, chat: &str, secs: u64) {
    with_group(db, chat, |g| {
        g.slowmode = secs;
        g.last_message.clear();
    })
}

pub fn set_admin_mode(db: &Store, chat: &str, on: bool) {
    with_group(db, chat, |g| g.admin_mode = on)
}

pub fn add_blacklist(db: &Store, chat: &str, word: &str) -> bool {
    with_group(db, chat, |g| g.block_word(word))
}

pub fn rm_blacklist(db: &Store, chat: &str, word: &str) -> bool {
    with_group(db, chat, |g| g.unblock_word(word))
}

pub fn get_blacklist(db: &Store, chat: &str) -> Vec<String> {
    with_group(db, chat, |g| g.blocked_words.iter().cloned().collect())
}

pub fn set_welcome(db: &Store, chat: &str, on: bool) {
    with_group(db, chat, |g| g.welcome_enabled = on)
}

pub fn set_goodbye(db: &Store, chat: &str, on: bool) {
    with_group(db, chat, |g| g.goodbye_enabled = on)
}

pub fn set_welcome_message(db: &Store, chat: &str, template: &str) {
    with_group(db, chat, |g| g.welcome_message = template.to_owned())
}

pub fn set_goodbye_message(db: &Store, chat: &str, template: &str) {
    with_group(db, chat, |g| g.goodbye_message = template.to_owned())
}

/// Runs `f` on the economy record of `user`, creating it with the starting balance.
pub fn with_economy<R>(db: &Store, user: &str, f: impl FnOnce(&mut UserEconomy) -> R) -> R {
    db.mutate(|c| f(c.economy.entry(normalize_id(user)).or_default()))
}

pub fn get_economy(db: &Store, user: &str) -> UserEconomy {
    with_economy(db, user, |e| e.clone())
}

pub fn with_stats<R>(db: &Store, user: &str, f: impl FnOnce(&mut UserStats) -> R) -> R {
    db.mutate(|c| f(c.stats.entry(normalize_id(user)).or_default()))
}

pub fn get_stats(db: &Store, user: &str) -> UserStats {
    db.read(|c| c.stats.get(&normalize_id(user)).cloned().unwrap_or_default())
}

/// Counts the message and tries an XP award in one step.
pub fn record_message(db: &Store, user: &str, amount: u64, now: i64) -> XpAward {
    with_stats(db, user, |s| {
        s.messages += 1;
        s.award_xp(amount, now)
    })
}

/// Top users ordered by level, then xp.
pub fn top_stats(db: &Store, n: usize) -> Vec<(String, UserStats)> {
    let mut all: Vec<_> = db.read(|c| {
        c.stats
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    });
    all.sort_by(|a, b| {
        b.1.level
            .cmp(&a.1.level)
            .then(b.1.xp.cmp(&a.1.xp))
            .then(a.0.cmp(&b.0))
    });
    all.truncate(n);
    all
}

pub fn guess_number(db: &Store, chat: &str, user: &str, n: u8) -> Guess {
    db.mutate(|c| {
        let mut rng = rand::thread_rng();
        let session = c
            .games
            .entry(chat.to_owned())
            .or_insert_with(|| GameSession::new(&mut rng));
        session.guess(user, n, &mut rng)
    })
}

pub fn bump_commands(db: &Store) {
    db.mutate(|c| c.botdata.commands_run += 1)
}

pub fn mark_started(db: &Store, now: i64) {
    db.mutate(|c| {
        if c.botdata.first_start.is_none() {
            c.botdata.first_start = Some(now);
        }
    })
}

pub fn get_botdata(db: &Store) -> BotData {
    db.read(|c| c.botdata.clone())
}

/// `(groups, users)` currently tracked.
pub fn counts(db: &Store) -> (usize, usize) {
    db.read(|c| {
        let mut users: std::collections::BTreeSet<&String> = c.stats.keys().collect();
        users.extend(c.economy.keys());
        (c.groups.len(), users.len())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> Store {
        Store::new("unused")
    }

    #[test]
    fn ensure_group_is_idempotent() {
        let db = store();
        let first = ensure_group(&db, "g");
        mute_user(&db, "g", "1");
        let second = ensure_group(&db, "g");
        let third = ensure_group(&db, "g");
        assert_eq!(first, GroupPolicy::default());
        assert!(second.is_muted("1"));
        assert_eq!(second, third);
        assert_eq!(db.read(|c| c.groups.len()), 1);
    }

    #[test]
    fn warn_log_is_bounded_and_records_auto_kick() {
        let db = store();
        set_warn_limit(&db, "g", 100);
        for i in 0..60 {
            insert_warn(&db, "g", "1", "admin", i);
        }
        let log = get_warn_log(&db, "g");
        assert_eq!(log.len(), consts::WARN_LOG_LIMIT);
        assert_eq!(log.first().map(|e| e.at), Some(10));

        set_warn_limit(&db, "g", 1);
        assert_eq!(
            insert_warn(&db, "g", "2", "admin", 99),
            WarnOutcome::LimitReached { limit: 1 }
        );
        assert_eq!(
            get_warn_log(&db, "g").last().map(|e| e.kind),
            Some(WarnEventKind::AutoKick)
        );
    }

    #[test]
    fn warn_limit_never_drops_below_one() {
        let db = store();
        set_warn_limit(&db, "g", 0);
        assert_eq!(get_warn_limit(&db, "g"), 1);
    }

    #[test]
    fn economy_is_created_lazily_with_default_balance() {
        let db = store();
        assert_eq!(get_economy(&db, "5@s.whatsapp.net").money, consts::DEFAULT_MONEY);
        with_economy(&db, "5", |e| e.credit(10));
        assert_eq!(get_economy(&db, "5").money, consts::DEFAULT_MONEY + 10);
    }

    #[test]
    fn record_message_counts_even_when_xp_rejected() {
        let db = store();
        assert!(matches!(record_message(&db, "1", 10, 0), XpAward::Gained { .. }));
        assert_eq!(record_message(&db, "1", 10, 1_000), XpAward::Rejected);
        let s = get_stats(&db, "1");
        assert_eq!((s.messages, s.xp), (2, 10));
    }

    #[test]
    fn leaderboard_orders_by_level_then_xp() {
        let db = store();
        with_stats(&db, "a", |s| s.level = 2);
        with_stats(&db, "b", |s| {
            s.level = 2;
            s.xp = 50
        });
        with_stats(&db, "c", |s| s.xp = 90);
        let top: Vec<_> = top_stats(&db, 2).into_iter().map(|(k, _)| k).collect();
        assert_eq!(top, vec!["b".to_string(), "a".to_string()]);
    }

    #[test]
    fn guessing_the_secret_starts_a_new_session() {
        let db = store();
        guess_number(&db, "g", "1", 50);
        let secret = db.read(|c| c.games["g"].secret);
        assert!(matches!(
            guess_number(&db, "g", "2", secret),
            Guess::Correct { attempts: 1 }
        ));
        let next = db.read(|c| c.games["g"].clone());
        assert_ne!(next.secret, secret);
        assert!(next.attempts.is_empty());
        assert!(!matches!(
            guess_number(&db, "g", "2", secret),
            Guess::Correct { .. }
        ));
    }
}
