use crate::database::cooldown_left;
use crate::database::db_utils::{get_economy, get_stats, top_stats, with_economy};
use crate::util::{consts, format_duration, mention_tag, Amount};
use crate::{Cxt, TgErr};
use rand::Rng;
use std::str::FromStr;

pub async fn balance(cx: &Cxt) -> TgErr<()> {
    let eco = get_economy(&cx.store, &cx.sender());
    cx.reply_to(format!(
        "💰 Portafoglio: {}\n🏦 Banca: {}\n💎 Totale: {}",
        eco.money,
        eco.bank,
        eco.money.saturating_add(eco.bank)
    ))
    .await?;
    Ok(())
}

pub async fn daily(cx: &Cxt) -> TgErr<()> {
    let now = cx.update.timestamp;
    let result = with_economy(&cx.store, &cx.sender(), |e| {
        if let Some(left) = cooldown_left(e.last_daily, consts::DAILY_COOLDOWN_MS, now) {
            return Err(left);
        }
        e.last_daily = Some(now);
        e.credit(consts::DAILY_REWARD);
        Ok(e.money)
    });
    let text = match result {
        Ok(money) => format!(
            "🎁 Hai ritirato {} monete! Saldo: {}",
            consts::DAILY_REWARD,
            money
        ),
        Err(left) => format!(
            "⏳ Hai già ritirato la ricompensa, riprova tra {}.",
            format_duration(millis_to_secs(left))
        ),
    };
    cx.reply_to(text).await?;
    Ok(())
}

pub async fn work(cx: &Cxt) -> TgErr<()> {
    let now = cx.update.timestamp;
    let pay = rand::thread_rng().gen_range(consts::WORK_MIN_REWARD..=consts::WORK_MAX_REWARD);
    let result = with_economy(&cx.store, &cx.sender(), |e| {
        if let Some(left) = cooldown_left(e.last_work, consts::WORK_COOLDOWN_MS, now) {
            return Err(left);
        }
        e.last_work = Some(now);
        e.credit(pay);
        Ok(e.money)
    });
    let text = match result {
        Ok(money) => format!("💼 Hai lavorato e guadagnato {} monete! Saldo: {}", pay, money),
        Err(left) => format!(
            "😴 Sei stanco, potrai lavorare di nuovo tra {}.",
            format_duration(millis_to_secs(left))
        ),
    };
    cx.reply_to(text).await?;
    Ok(())
}

pub async fn deposit(cx: &Cxt) -> TgErr<()> {
    transfer(cx, true).await
}

pub async fn withdraw(cx: &Cxt) -> TgErr<()> {
    transfer(cx, false).await
}

/// Moves money between wallet and bank. `tutto` moves the whole source balance.
async fn transfer(cx: &Cxt, to_bank: bool) -> TgErr<()> {
    let amount = cx
        .args()
        .first()
        .map(|a| Amount::from_str(a).unwrap_or(Amount::Error))
        .unwrap_or(Amount::Error);
    if let Amount::Error = amount {
        cx.reply_to("❌ Indica un importo valido oppure \"tutto\".")
            .await?;
        return Ok(());
    }
    let result = with_economy(&cx.store, &cx.sender(), |e| {
        let available = if to_bank { e.money } else { e.bank };
        let n = amount.resolve(available)?;
        let moved = if to_bank { e.deposit(n) } else { e.withdraw(n) };
        if moved {
            Some((n, e.money, e.bank))
        } else {
            None
        }
    });
    let text = match result {
        Some((n, money, bank)) if to_bank => format!(
            "🏦 Depositate {} monete.\n💰 Portafoglio: {}\n🏦 Banca: {}",
            n, money, bank
        ),
        Some((n, money, bank)) => format!(
            "💰 Prelevate {} monete.\n💰 Portafoglio: {}\n🏦 Banca: {}",
            n, money, bank
        ),
        None if to_bank => String::from("❌ Non hai abbastanza monete nel portafoglio."),
        None => String::from("❌ Non hai abbastanza monete in banca."),
    };
    cx.reply_to(text).await?;
    Ok(())
}

pub async fn level(cx: &Cxt) -> TgErr<()> {
    let target = cx
        .update
        .mentions
        .first()
        .cloned()
        .unwrap_or_else(|| cx.sender());
    let stats = get_stats(&cx.store, &target);
    cx.reply_mentioning(
        format!(
            "📊 {}\n⭐ Livello: {}\n✨ XP: {}/{}\n💬 Messaggi: {}",
            mention_tag(&target),
            stats.level,
            stats.xp,
            stats.next_level_xp(),
            stats.messages
        ),
        &[target],
    )
    .await?;
    Ok(())
}

pub async fn leaderboard(cx: &Cxt) -> TgErr<()> {
    let top = top_stats(&cx.store, consts::LEADERBOARD_SIZE);
    if top.is_empty() {
        cx.reply_to("📊 Nessuno in classifica per ora.").await?;
        return Ok(());
    }
    let medals = ["🥇", "🥈", "🥉"];
    let mut lines = Vec::with_capacity(top.len());
    let mut mentions = Vec::with_capacity(top.len());
    for (i, (user, stats)) in top.into_iter().enumerate() {
        let place = medals
            .get(i)
            .map(|m| m.to_string())
            .unwrap_or_else(|| format!("{}.", i + 1));
        lines.push(format!(
            "{} {} livello {} ({} XP)",
            place,
            mention_tag(&user),
            stats.level,
            stats.xp
        ));
        mentions.push(user);
    }
    cx.reply_mentioning(format!("🏆 Classifica\n\n{}", lines.join("\n")), &mentions)
        .await?;
    Ok(())
}

fn millis_to_secs(ms: i64) -> u64 {
    ((ms.max(0) + 999) / 1000) as u64
}
