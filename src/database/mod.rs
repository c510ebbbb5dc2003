pub mod db;
pub mod db_utils;
pub use db::Store;

use crate::util::{consts, normalize_id};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::convert::TryFrom;

/// Per-group configuration and moderation lists.
///
/// Every list is keyed by the normalized (numeric) part of a user identifier,
/// the mutators below normalize on the way in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GroupPolicy {
    pub muted_users: BTreeSet<String>,
    pub banned_users: BTreeSet<String>,
    pub warnings: BTreeMap<String, u32>,
    pub blocked_words: BTreeSet<String>,
    pub antilink: bool,
    pub slowmode: u64,
    #[serde(skip)]
    pub last_message: HashMap<String, i64>,
    pub admin_mode: bool,
    pub welcome_enabled: bool,
    pub goodbye_enabled: bool,
    pub welcome_message: String,
    pub goodbye_message: String,
    pub auto_kick_warns: u32,
}

impl Default for GroupPolicy {
    fn default() -> Self {
        GroupPolicy {
            muted_users: BTreeSet::new(),
            banned_users: BTreeSet::new(),
            warnings: BTreeMap::new(),
            blocked_words: BTreeSet::new(),
            antilink: false,
            slowmode: 0,
            last_message: HashMap::new(),
            admin_mode: false,
            welcome_enabled: true,
            goodbye_enabled: true,
            welcome_message: consts::DEFAULT_WELCOME.to_owned(),
            goodbye_message: consts::DEFAULT_GOODBYE.to_owned(),
            auto_kick_warns: consts::DEFAULT_AUTO_KICK_WARNS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarnOutcome {
    Warned { count: u32, limit: u32 },
    /// The threshold was hit; the warnings entry is already gone.
    LimitReached { limit: u32 },
}

impl GroupPolicy {
    pub fn is_muted(&self, user: &str) -> bool {
        self.muted_users.contains(&normalize_id(user))
    }

    pub fn is_banned(&self, user: &str) -> bool {
        self.banned_users.contains(&normalize_id(user))
    }

    /// Returns `false` when the user was already muted.
    pub fn mute(&mut self, user: &str) -> bool {
        self.muted_users.insert(normalize_id(user))
    }

    pub fn unmute(&mut self, user: &str) -> bool {
        self.muted_users.remove(&normalize_id(user))
    }

    pub fn ban(&mut self, user: &str) -> bool {
        self.banned_users.insert(normalize_id(user))
    }

    pub fn unban(&mut self, user: &str) -> bool {
        self.banned_users.remove(&normalize_id(user))
    }

    pub fn warn_count(&self, user: &str) -> u32 {
        self.warnings.get(&normalize_id(user)).copied().unwrap_or(0)
    }

    pub fn warn(&mut self, user: &str) -> WarnOutcome {
        let user = normalize_id(user);
        let limit = self.auto_kick_warns.max(1);
        let count = self.warnings.get(&user).copied().unwrap_or(0).saturating_add(1);
        if count >= limit {
            self.warnings.remove(&user);
            return WarnOutcome::LimitReached { limit };
        }
        self.warnings.insert(user, count);
        WarnOutcome::Warned { count, limit }
    }

    /// Drops one warning. `None` if the user had none, otherwise the remaining count.
    pub fn unwarn(&mut self, user: &str) -> Option<u32> {
        let user = normalize_id(user);
        let count = self.warnings.get(&user).copied()?;
        let left = count.saturating_sub(1);
        if left == 0 {
            self.warnings.remove(&user);
        } else {
            self.warnings.insert(user, left);
        }
        Some(left)
    }

    pub fn clear_warnings(&mut self, user: &str) -> bool {
        self.warnings.remove(&normalize_id(user)).is_some()
    }

    pub fn block_word(&mut self, word: &str) -> bool {
        let word = word.trim().to_lowercase();
        !word.is_empty() && self.blocked_words.insert(word)
    }

    pub fn unblock_word(&mut self, word: &str) -> bool {
        self.blocked_words.remove(&word.trim().to_lowercase())
    }

    pub fn blocked_word_in(&self, text: &str) -> Option<&str> {
        let text = text.to_lowercase();
        self.blocked_words
            .iter()
            .find(|w| text.contains(w.as_str()))
            .map(String::as_str)
    }

    /// Slowmode gate. Accepting a post records `now`; a rejected post leaves the
    /// previous timestamp untouched.
    pub fn slowmode_allows(&mut self, user: &str, now: i64) -> bool {
        if self.slowmode == 0 {
            return true;
        }
        let user = normalize_id(user);
        let window = i64::try_from(self.slowmode)
            .unwrap_or(i64::MAX)
            .saturating_mul(1000);
        if let Some(last) = self.last_message.get(&user) {
            if now - last < window {
                return false;
            }
        }
        self.last_message.insert(user, now);
        true
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserEconomy {
    pub money: u64,
    pub bank: u64,
    pub inventory: Vec<String>,
    pub last_daily: Option<i64>,
    pub last_work: Option<i64>,
    pub last_rob: Option<i64>,
    pub last_crime: Option<i64>,
    pub last_weekly: Option<i64>,
    pub last_monthly: Option<i64>,
    /// Kept for record-shape compatibility; no command edits these yet.
    pub pet: Option<Pet>,
    pub partner: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pet {
    pub name: String,
    pub kind: String,
    #[serde(default)]
    pub level: u32,
}

impl Default for UserEconomy {
    fn default() -> Self {
        UserEconomy {
            money: consts::DEFAULT_MONEY,
            bank: 0,
            inventory: Vec::new(),
            last_daily: None,
            last_work: None,
            last_rob: None,
            last_crime: None,
            last_weekly: None,
            last_monthly: None,
            pet: None,
            partner: None,
        }
    }
}

impl UserEconomy {
    pub fn credit(&mut self, amount: u64) {
        self.money = self.money.saturating_add(amount);
    }

    /// Debits at most what is available and returns the amount actually taken.
    pub fn debit(&mut self, amount: u64) -> u64 {
        let taken = amount.min(self.money);
        self.money -= taken;
        taken
    }

    /// All-or-nothing debit, used for bets.
    pub fn try_debit(&mut self, amount: u64) -> bool {
        if self.money < amount {
            return false;
        }
        self.money -= amount;
        true
    }

    pub fn deposit(&mut self, amount: u64) -> bool {
        if !self.try_debit(amount) {
            return false;
        }
        self.bank = self.bank.saturating_add(amount);
        true
    }

    pub fn withdraw(&mut self, amount: u64) -> bool {
        if self.bank < amount {
            return false;
        }
        self.bank -= amount;
        self.credit(amount);
        true
    }
}

/// Milliseconds left before a cooldown-gated action may run again.
pub fn cooldown_left(last: Option<i64>, cooldown: i64, now: i64) -> Option<i64> {
    let elapsed = now - last?;
    if elapsed < cooldown {
        Some(cooldown - elapsed)
    } else {
        None
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserStats {
    pub level: u32,
    pub xp: u64,
    pub messages: u64,
    pub reputation: i64,
    pub bio: String,
    #[serde(rename = "lastXP")]
    pub last_xp: Option<i64>,
    pub last_rep: Option<i64>,
}

impl Default for UserStats {
    fn default() -> Self {
        UserStats {
            level: 1,
            xp: 0,
            messages: 0,
            reputation: 0,
            bio: String::new(),
            last_xp: None,
            last_rep: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XpAward {
    /// Inside the cooldown window; nothing changed.
    Rejected,
    Gained { xp: u64 },
    LevelUp { level: u32 },
}

impl UserStats {
    /// XP needed to leave the current level.
    pub fn next_level_xp(&self) -> u64 {
        u64::from(self.level).saturating_mul(consts::XP_PER_LEVEL)
    }

    pub fn award_xp(&mut self, amount: u64, now: i64) -> XpAward {
        if cooldown_left(self.last_xp, consts::XP_COOLDOWN_MS, now).is_some() {
            return XpAward::Rejected;
        }
        self.last_xp = Some(now);
        self.xp = self.xp.saturating_add(amount);
        if self.xp >= self.next_level_xp() {
            self.xp = 0;
            self.level += 1;
            return XpAward::LevelUp { level: self.level };
        }
        XpAward::Gained { xp: self.xp }
    }
}

/// Number guessing state for one chat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSession {
    pub secret: u8,
    #[serde(default)]
    pub attempts: BTreeMap<String, u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guess {
    TooLow,
    TooHigh,
    Correct { attempts: u32 },
}

impl GameSession {
    pub fn new<R: Rng + ?Sized>(rng: &mut R) -> Self {
        GameSession {
            secret: rng.gen_range(consts::GUESS_MIN..=consts::GUESS_MAX),
            attempts: BTreeMap::new(),
        }
    }

    /// Checks a guess. A correct guess rerolls the session with a different secret.
    pub fn guess<R: Rng + ?Sized>(&mut self, user: &str, n: u8, rng: &mut R) -> Guess {
        let user = normalize_id(user);
        let attempts = {
            let a = self.attempts.entry(user).or_insert(0);
            *a += 1;
            *a
        };
        if n < self.secret {
            return Guess::TooLow;
        }
        if n > self.secret {
            return Guess::TooHigh;
        }
        let old = self.secret;
        let mut next = GameSession::new(rng);
        while next.secret == old {
            next.secret = rng.gen_range(consts::GUESS_MIN..=consts::GUESS_MAX);
        }
        *self = next;
        Guess::Correct { attempts }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WarnEventKind {
    Warn,
    Unwarn,
    AutoKick,
    Reset,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WarnEvent {
    pub user: String,
    pub issuer: String,
    pub kind: WarnEventKind,
    pub at: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BotData {
    pub first_start: Option<i64>,
    pub commands_run: u64,
}

/// The whole in-memory state, one field per durable collection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Collections {
    pub groups: BTreeMap<String, GroupPolicy>,
    pub economy: BTreeMap<String, UserEconomy>,
    pub stats: BTreeMap<String, UserStats>,
    pub games: BTreeMap<String, GameSession>,
    pub warnings: BTreeMap<String, Vec<WarnEvent>>,
    pub botdata: BotData,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn lists_compare_on_numeric_part() {
        let mut g = GroupPolicy::default();
        assert!(g.mute("39333@s.whatsapp.net"));
        assert!(!g.mute("39333"));
        assert!(g.is_muted("39333@c.us"));
        assert_eq!(g.muted_users.len(), 1);

        assert!(g.ban("12"));
        assert!(!g.ban("12@s.whatsapp.net"));
        assert_eq!(g.banned_users.len(), 1);
        assert!(g.unban("12@x"));
        assert!(!g.is_banned("12"));
    }

    #[test]
    fn warn_removes_entry_at_threshold() {
        let mut g = GroupPolicy::default();
        assert_eq!(g.warn("7"), WarnOutcome::Warned { count: 1, limit: 3 });
        assert_eq!(g.warn("7@a"), WarnOutcome::Warned { count: 2, limit: 3 });
        assert_eq!(g.warn("7"), WarnOutcome::LimitReached { limit: 3 });
        assert!(!g.warnings.contains_key("7"));
        assert_eq!(g.warn_count("7"), 0);
    }

    #[test]
    fn unwarn_floors_at_zero() {
        let mut g = GroupPolicy::default();
        assert_eq!(g.unwarn("7"), None);
        g.warn("7");
        g.warn("7");
        assert_eq!(g.unwarn("7"), Some(1));
        assert_eq!(g.unwarn("7"), Some(0));
        assert!(!g.warnings.contains_key("7"));
        assert_eq!(g.unwarn("7"), None);
    }

    #[test]
    fn blocked_words_are_case_insensitive_substrings() {
        let mut g = GroupPolicy::default();
        assert!(g.block_word("  SPAM "));
        assert!(!g.block_word("spam"));
        assert!(!g.block_word("   "));
        assert_eq!(g.blocked_word_in("compra questo SpAmMoso"), Some("spam"));
        assert_eq!(g.blocked_word_in("ciao"), None);
    }

    #[test]
    fn slowmode_keeps_first_timestamp_on_reject() {
        let mut g = GroupPolicy {
            slowmode: 10,
            ..GroupPolicy::default()
        };
        assert!(g.slowmode_allows("5", 1_000));
        assert!(!g.slowmode_allows("5", 6_000));
        assert_eq!(g.last_message.get("5"), Some(&1_000));
        assert!(g.slowmode_allows("5", 11_000));
        assert_eq!(g.last_message.get("5"), Some(&11_000));
    }

    #[test]
    fn huge_slowmode_never_goes_negative() {
        let mut g = GroupPolicy {
            slowmode: u64::MAX,
            ..Default::default()
        };
        assert!(g.slowmode_allows("5", 1_000));
        assert!(!g.slowmode_allows("5", 2_000));
    }

    #[test]
    fn xp_is_rate_limited_and_levels_once() {
        let mut s = UserStats::default();
        assert_eq!(s.award_xp(60, 0), XpAward::Gained { xp: 60 });
        assert_eq!(s.award_xp(60, 59_999), XpAward::Rejected);
        assert_eq!(s.xp, 60);
        assert_eq!(s.award_xp(60, 60_000), XpAward::LevelUp { level: 2 });
        assert_eq!(s.xp, 0);
        assert_eq!(s.level, 2);
        assert_eq!(s.award_xp(150, 120_000), XpAward::Gained { xp: 150 });
        assert_eq!(s.award_xp(50, 180_000), XpAward::LevelUp { level: 3 });
    }

    #[test]
    fn debit_clamps_and_try_debit_refuses() {
        let mut e = UserEconomy::default();
        assert_eq!(e.money, 100);
        assert_eq!(e.debit(150), 100);
        assert_eq!(e.money, 0);
        assert!(!e.try_debit(1));
        e.credit(30);
        assert!(e.deposit(20));
        assert!(!e.withdraw(21));
        assert!(e.withdraw(20));
        assert_eq!((e.money, e.bank), (30, 0));
    }

    #[test]
    fn correct_guess_rerolls_secret() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut session = GameSession::new(&mut rng);
        let secret = session.secret;
        if secret > 1 {
            assert_eq!(session.guess("1", secret - 1, &mut rng), Guess::TooLow);
        }
        if secret < 100 {
            assert_eq!(session.guess("1", secret + 1, &mut rng), Guess::TooHigh);
        }
        let expected = *session.attempts.get("1").unwrap_or(&0) + 1;
        assert_eq!(
            session.guess("1", secret, &mut rng),
            Guess::Correct { attempts: expected }
        );
        assert_ne!(session.secret, secret);
        assert!(session.attempts.is_empty());
        assert_ne!(session.guess("2", secret, &mut rng), Guess::Correct { attempts: 1 });
    }

    #[test]
    fn cooldowns() {
        assert_eq!(cooldown_left(None, 10, 5), None);
        assert_eq!(cooldown_left(Some(0), 10, 4), Some(6));
        assert_eq!(cooldown_left(Some(0), 10, 10), None);
    }
}
