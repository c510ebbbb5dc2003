pub const BOT_NAME: &str = "GroupWarden";
pub const DEFAULT_PREFIX: &str = ".";
pub const DEFAULT_DATA_DIR: &str = "./data";

pub const SAVE_INTERVAL_SECS: u64 = 30;
pub const MAX_SLOWMODE_SECS: u64 = 24 * 60 * 60;

//All timestamps are unix milliseconds
pub const XP_COOLDOWN_MS: i64 = 60 * 1000;
pub const XP_MIN_AWARD: u64 = 5;
pub const XP_MAX_AWARD: u64 = 15;
pub const XP_PER_LEVEL: u64 = 100;

pub const DEFAULT_MONEY: u64 = 100;
pub const DAILY_REWARD: u64 = 200;
pub const DAILY_COOLDOWN_MS: i64 = 24 * 60 * 60 * 1000;
pub const WORK_MIN_REWARD: u64 = 50;
pub const WORK_MAX_REWARD: u64 = 150;
pub const WORK_COOLDOWN_MS: i64 = 60 * 60 * 1000;

pub const SLOT_BET: u64 = 10;
pub const SLOT_TRIPLE_PAYOUT: u64 = 100;
pub const SLOT_PAIR_PAYOUT: u64 = 20;
pub const GUESS_REWARD: u64 = 50;
pub const GUESS_MIN: u8 = 1;
pub const GUESS_MAX: u8 = 100;

pub const DEFAULT_AUTO_KICK_WARNS: u32 = 3;
pub const WARN_LOG_LIMIT: usize = 50;
pub const LEADERBOARD_SIZE: usize = 10;

pub const DEFAULT_WELCOME: &str = "👋 Benvenuto {user} in *{group}*!";
pub const DEFAULT_GOODBYE: &str = "👋 {user} ha lasciato *{group}*.";
