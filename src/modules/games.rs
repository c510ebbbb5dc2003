use crate::database::db_utils::{guess_number, with_economy};
use crate::database::Guess;
use crate::util::{consts, mention_tag, RpsChoice, RPS_CHOICES};
use crate::{Cxt, TgErr};
use rand::seq::SliceRandom;
use std::str::FromStr;

const SLOT_SYMBOLS: [&str; 6] = ["🍒", "🍋", "🍊", "🍇", "🔔", "💎"];

const EIGHT_BALL: [&str; 12] = [
    "Sì, senza dubbio.",
    "È certo.",
    "Molto probabile.",
    "Le prospettive sono buone.",
    "Sì.",
    "Chiedimelo più tardi.",
    "Meglio non dirtelo ora.",
    "Non posso prevederlo ora.",
    "Non ci contare.",
    "La mia risposta è no.",
    "Le mie fonti dicono di no.",
    "Molto dubbio.",
];

pub async fn rps(cx: &Cxt) -> TgErr<()> {
    let arg = cx.args().first().copied().unwrap_or_default();
    let player = match RpsChoice::from_str(arg) {
        Ok(c) => c,
        Err(e) => {
            cx.reply_to(format!("❌ {}", e)).await?;
            return Ok(());
        }
    };
    let bot = pick(&RPS_CHOICES);
    let outcome = if player == bot {
        "🤝 Pareggio!"
    } else if player.beats(bot) {
        "🎉 Hai vinto!"
    } else {
        "😈 Ho vinto io!"
    };
    cx.reply_to(format!("Tu: {}\nIo: {}\n\n{}", player, bot, outcome))
        .await?;
    Ok(())
}

/// Three reels with a fixed bet. Three of a kind pays the jackpot, a pair pays
/// a small prize.
pub async fn slot(cx: &Cxt) -> TgErr<()> {
    let sender = cx.sender();
    if !with_economy(&cx.store, &sender, |e| e.try_debit(consts::SLOT_BET)) {
        cx.reply_to(format!(
            "💸 Ti servono almeno {} monete per giocare.",
            consts::SLOT_BET
        ))
        .await?;
        return Ok(());
    }
    let reels = spin();
    let prize = slot_prize(&reels);
    let balance = with_economy(&cx.store, &sender, |e| {
        e.credit(prize);
        e.money
    });
    let outcome = match prize {
        0 => format!("😢 Hai perso {} monete.", consts::SLOT_BET),
        p => format!("🎉 Hai vinto {} monete!", p),
    };
    cx.reply_to(format!(
        "🎰 | {} | {} | {} |\n\n{}\n💰 Saldo: {}",
        reels[0], reels[1], reels[2], outcome, balance
    ))
    .await?;
    Ok(())
}

fn spin() -> [&'static str; 3] {
    [
        pick(&SLOT_SYMBOLS),
        pick(&SLOT_SYMBOLS),
        pick(&SLOT_SYMBOLS),
    ]
}

fn slot_prize(reels: &[&str; 3]) -> u64 {
    if reels[0] == reels[1] && reels[1] == reels[2] {
        consts::SLOT_TRIPLE_PAYOUT
    } else if reels[0] == reels[1] || reels[1] == reels[2] || reels[0] == reels[2] {
        consts::SLOT_PAIR_PAYOUT
    } else {
        0
    }
}

pub async fn guess(cx: &Cxt) -> TgErr<()> {
    let n = match cx.args().first().and_then(|a| a.parse::<u8>().ok()) {
        Some(n) if (consts::GUESS_MIN..=consts::GUESS_MAX).contains(&n) => n,
        _ => {
            cx.reply_to(format!(
                "❌ Scrivi un numero tra {} e {}.",
                consts::GUESS_MIN,
                consts::GUESS_MAX
            ))
            .await?;
            return Ok(());
        }
    };
    let sender = cx.sender();
    let text = match guess_number(&cx.store, cx.chat_id(), &sender, n) {
        Guess::TooLow => format!("⬆️ {} è troppo basso!", n),
        Guess::TooHigh => format!("⬇️ {} è troppo alto!", n),
        Guess::Correct { attempts } => {
            with_economy(&cx.store, &sender, |e| e.credit(consts::GUESS_REWARD));
            format!(
                "🎉 {} ha indovinato {} in {} tentativi e vince {} monete!\nHo pensato a un nuovo numero.",
                mention_tag(&sender),
                n,
                attempts,
                consts::GUESS_REWARD
            )
        }
    };
    cx.reply_mentioning(text, &[sender]).await?;
    Ok(())
}

pub async fn eight_ball(cx: &Cxt) -> TgErr<()> {
    let answer = pick(&EIGHT_BALL);
    cx.reply_to(format!("🎱 {}", answer)).await?;
    Ok(())
}

pub async fn choice(cx: &Cxt) -> TgErr<()> {
    let options: Vec<&str> = cx
        .arg_text()
        .split('|')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .collect();
    if options.len() < 2 {
        cx.reply_to("❌ Dammi almeno due opzioni separate da |")
            .await?;
        return Ok(());
    }
    let chosen = pick(&options);
    cx.reply_to(format!("🤔 Scelgo: {}", chosen)).await?;
    Ok(())
}

/// Uniform pick over a non-empty set. Keeps the thread rng out of async state.
fn pick<T: Copy>(items: &[T]) -> T {
    *items
        .choose(&mut rand::thread_rng())
        .unwrap_or(&items[0])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_payouts() {
        assert_eq!(slot_prize(&["💎", "💎", "💎"]), consts::SLOT_TRIPLE_PAYOUT);
        assert_eq!(slot_prize(&["💎", "🍋", "💎"]), consts::SLOT_PAIR_PAYOUT);
        assert_eq!(slot_prize(&["🍒", "🍋", "💎"]), 0);
    }

    #[test]
    fn pick_stays_in_set() {
        for _ in 0..50 {
            assert!(EIGHT_BALL.contains(&pick(&EIGHT_BALL)));
        }
    }
}
