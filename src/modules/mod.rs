pub mod admin;
pub mod bans;
pub mod commands;
pub mod economy;
pub mod events;
pub mod games;
pub mod misc;
pub mod pipeline;
pub mod restrict;
pub mod warning;

pub use admin::*;
pub use bans::*;
pub use commands::{lookup, parse_command, ArgShape, Command, CommandDef, Permission, COMMANDS};
pub use economy::*;
pub use events::*;
pub use games::*;
pub use misc::*;
pub use pipeline::{process, Action};
pub use restrict::*;
pub use warning::*;

use crate::database::db_utils::bump_commands;
use crate::util::{extract_targets, is_group, user_should_be_admin};
use crate::{Cxt, TgErr};

pub async fn answer(cx: &Cxt) -> TgErr<()> {
    let action = process(cx).await?;
    if action.halts() {
        log::debug!("Pipeline stopped message {} with {:?}", cx.update.id, action);
        return Ok(());
    }
    let (name, _) = match parse_command(&cx.update.text, &cx.config.prefix) {
        Some(parsed) => parsed,
        None => return Ok(()),
    };
    let def = match lookup(&name) {
        Some(def) => def,
        None => {
            log::debug!("Unknown command {:?}", name);
            return Ok(());
        }
    };
    if !gate(cx, def).await? {
        return Ok(());
    }
    // A failed final reply doesn't undo what the handler already changed.
    let result = dispatch(cx, def.command).await;
    bump_commands(&cx.store);
    if def.mutates {
        cx.store.clone().persist().await?;
    }
    result
}

/// Applies the permission level and argument shape of a command. A refusal is
/// replied to and reported as `false`.
async fn gate(cx: &Cxt, def: &CommandDef) -> TgErr<bool> {
    let allowed = match def.permission {
        Permission::Anyone => Ok(()),
        Permission::Group => is_group(cx).await,
        Permission::GroupAdmin => match is_group(cx).await {
            Ok(()) => user_should_be_admin(cx).await,
            Err(e) => Err(e),
        },
    };
    if let Err(e) = allowed {
        log::debug!("{:?} refused for {}: {}", def.command, cx.sender(), e);
        return Ok(false);
    }
    let missing = match def.args {
        ArgShape::Required => cx.args().is_empty(),
        ArgShape::Users => extract_targets(cx).await.is_empty(),
        ArgShape::None | ArgShape::Optional => false,
    };
    if missing {
        cx.reply_to(format!("ℹ️ Uso: {}{}", cx.config.prefix, def.usage))
            .await?;
        return Ok(false);
    }
    Ok(true)
}

pub async fn dispatch(cx: &Cxt, command: Command) -> TgErr<()> {
    match command {
        Command::Menu => menu(cx).await,
        Command::Tag => tag_all(cx).await,
        Command::Ban => ban(cx).await,
        Command::Unban => unban(cx).await,
        Command::Kick => kick(cx).await,
        Command::Mute => mute(cx).await,
        Command::Unmute => unmute(cx).await,
        Command::Warn => warn(cx).await,
        Command::Unwarn => unwarn(cx).await,
        Command::Warns => warns(cx).await,
        Command::SetWarn => warn_limit(cx).await,
        Command::Antilink => antilink(cx).await,
        Command::Slowmode => slowmode(cx).await,
        Command::Block => blacklist_word(cx).await,
        Command::Unblock => remove_blacklist(cx).await,
        Command::Words => list_blacklist(cx).await,
        Command::Welcome => welcome_toggle(cx).await,
        Command::Goodbye => goodbye_toggle(cx).await,
        Command::SetWelcome => set_welcome_text(cx).await,
        Command::SetGoodbye => set_goodbye_text(cx).await,
        Command::Close => close_chat(cx).await,
        Command::Open => open_chat(cx).await,
        Command::Delete => delete(cx).await,
        Command::Promote => promote(cx).await,
        Command::Demote => demote(cx).await,
        Command::Rps => rps(cx).await,
        Command::Slot => slot(cx).await,
        Command::Guess => guess(cx).await,
        Command::EightBall => eight_ball(cx).await,
        Command::Choice => choice(cx).await,
        Command::Sticker => sticker(cx).await,
        Command::Uptime => uptime(cx).await,
        Command::BotInfo => bot_info(cx).await,
        Command::Balance => balance(cx).await,
        Command::Daily => daily(cx).await,
        Command::Work => work(cx).await,
        Command::Deposit => deposit(cx).await,
        Command::Withdraw => withdraw(cx).await,
        Command::Level => level(cx).await,
        Command::Leaderboard => leaderboard(cx).await,
    }
}
