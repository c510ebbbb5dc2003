use groupwarden::database::db_utils::{
    add_blacklist, ban_user, ensure_group, get_blacklist, get_economy, get_warn_count,
    insert_warn, set_slowmode, with_stats,
};
use groupwarden::database::{GameSession, Store};
use groupwarden::transport::mock::{Call, Op};
use groupwarden::transport::{IncomingMessage, MemberEvent, MockTransport, TransportError};
use groupwarden::util::Config;
use groupwarden::Warden;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

const CHAT: &str = "g";

static CLOCK: AtomicI64 = AtomicI64::new(1_000_000);

fn tick(ms: i64) -> i64 {
    CLOCK.fetch_add(ms, Ordering::SeqCst) + ms
}

struct Harness {
    warden: Warden,
    mock: Arc<MockTransport>,
    dir: TempDir,
}

impl Harness {
    fn new(mock: MockTransport) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let mock = Arc::new(mock);
        let store = Arc::new(Store::open(dir.path()));
        let warden = Warden::new(store, mock.clone(), Config::default());
        Harness { warden, mock, dir }
    }

    fn standard() -> Self {
        Harness::new(
            MockTransport::new("bot")
                .with_roster(
                    CHAT,
                    &[("1@s.whatsapp.net", true), ("2@s.whatsapp.net", false), ("3", false)],
                )
                .with_name("2@s.whatsapp.net", "Mario"),
        )
    }

    fn store(&self) -> &Store {
        &self.warden.store
    }

    async fn post(&self, sender: &str, text: &str) -> IncomingMessage {
        self.post_with(sender, text, &[]).await
    }

    async fn post_with(&self, sender: &str, text: &str, mentions: &[&str]) -> IncomingMessage {
        let msg = group_msg(sender, text, mentions);
        self.warden.handle_message(msg.clone()).await.unwrap();
        msg
    }
}

fn group_msg(sender: &str, text: &str, mentions: &[&str]) -> IncomingMessage {
    let ts = tick(1000);
    IncomingMessage {
        id: format!("m{}", ts),
        chat_id: CHAT.to_string(),
        is_group: true,
        sender: sender.to_string(),
        text: text.to_string(),
        mentions: mentions.iter().map(|m| m.to_string()).collect(),
        timestamp: ts,
        ..Default::default()
    }
}

#[tokio::test]
async fn antilink_deletes_and_warns_non_admins_only() {
    let h = Harness::standard();
    h.post("1", ".antilink on").await;
    h.mock.clear();

    let msg = h.post("2", "check www.example.com").await;
    assert_eq!(h.mock.deleted(), vec![msg.id]);
    assert_eq!(h.mock.texts().len(), 1);
    assert!(h.mock.last_text().unwrap().contains("link"));

    h.mock.clear();
    h.post("1", "ecco https://example.com").await;
    assert!(h.mock.deleted().is_empty());
}

#[tokio::test]
async fn slowmode_drops_fast_posts_without_moving_the_window() {
    let h = Harness::standard();
    set_slowmode(h.store(), CHAT, 10);

    let first = h.post("2", "primo").await;
    let second = h.post("2", "secondo").await;
    assert_eq!(h.mock.deleted(), vec![second.id]);
    assert!(h.mock.texts().is_empty());
    let last = h
        .store()
        .read(|c| c.groups[CHAT].last_message.get("2").copied());
    assert_eq!(last, Some(first.timestamp));
}

#[tokio::test]
async fn third_warning_removes_the_user_and_clears_the_entry() {
    let h = Harness::standard();
    for round in 1..=3u32 {
        h.post_with("1", ".warn", &["2@s.whatsapp.net"]).await;
        if round < 3 {
            assert_eq!(get_warn_count(h.store(), CHAT, "2"), round);
            assert!(h.mock.removed().is_empty());
        }
    }
    assert_eq!(h.mock.removed(), vec!["2".to_string()]);
    assert!(h
        .store()
        .read(|c| !c.groups[CHAT].warnings.contains_key("2")));
    assert!(h.mock.last_text().unwrap().contains("rimosso"));
}

#[tokio::test]
async fn mute_is_idempotent_and_silences_the_user() {
    let h = Harness::standard();
    h.post_with("1", ".muta", &["2"]).await;
    h.post_with("1", ".muta", &["2"]).await;
    assert!(h.mock.last_text().unwrap().contains("già silenziato"));
    assert_eq!(
        h.store().read(|c| c.groups[CHAT].muted_users.len()),
        1
    );

    h.mock.clear();
    let msg = h.post("2", "ciao").await;
    assert_eq!(h.mock.deleted(), vec![msg.id]);
    assert!(h.mock.texts().is_empty());

    h.post_with("1", ".smuta", &["2"]).await;
    h.mock.clear();
    h.post("2", "ci sono").await;
    assert!(h.mock.deleted().is_empty());
}

#[tokio::test]
async fn ban_removes_and_remembers() {
    let h = Harness::standard();
    h.post_with("1", ".ban", &["2"]).await;
    assert_eq!(h.mock.removed(), vec!["2".to_string()]);
    assert!(h.store().read(|c| c.groups[CHAT].is_banned("2")));

    h.post_with("1", ".ban", &["2"]).await;
    assert!(h.mock.last_text().unwrap().contains("già bannato"));
    assert_eq!(h.mock.removed().len(), 1);
    assert!(h.dir.path().join("groups.json").exists());
}

#[tokio::test]
async fn refusals_tell_caller_and_capability_apart() {
    let h = Harness::standard();
    h.post_with("2", ".ban", &["3"]).await;
    assert!(h.mock.last_text().unwrap().contains("Solo gli admin"));
    assert!(h.mock.removed().is_empty());

    h.mock.fail(Op::Remove, TransportError::PermissionDenied);
    h.post_with("1", ".ban", &["3"]).await;
    let text = h.mock.last_text().unwrap();
    assert!(text.contains("permessi di amministratore"));
    assert!(text.contains("resta nella lista"));

    h.post_with("1", ".kick", &["1"]).await;
    assert!(h.mock.last_text().unwrap().contains("un admin"));
}

#[tokio::test]
async fn moderation_commands_need_a_group_and_a_target() {
    let h = Harness::standard();
    let mut private = group_msg("1", ".ban", &["2"]);
    private.is_group = false;
    private.chat_id = "1".to_string();
    h.warden.handle_message(private).await.unwrap();
    assert!(h.mock.last_text().unwrap().contains("solo nei gruppi"));

    h.post("1", ".warn").await;
    assert_eq!(h.mock.last_text().unwrap(), "ℹ️ Uso: .warn @utente");
}

#[tokio::test]
async fn admin_mode_suppresses_members() {
    let h = Harness::standard();
    h.post("1", ".chiudi").await;
    assert!(h.mock.calls().contains(&Call::Announce {
        chat: CHAT.to_string(),
        admins_only: true,
    }));
    h.mock.clear();

    let msg = h.post("2", "posso parlare?").await;
    assert_eq!(h.mock.deleted(), vec![msg.id]);
    h.post("1", "solo io").await;
    assert_eq!(h.mock.deleted().len(), 1);

    h.post("1", ".apri").await;
    h.post("3", "finalmente").await;
    assert_eq!(h.mock.deleted().len(), 1);
}

#[tokio::test]
async fn correct_guess_pays_and_starts_a_new_round() {
    let h = Harness::standard();
    h.store().mutate(|c| {
        c.games.insert(
            CHAT.to_string(),
            GameSession {
                secret: 42,
                attempts: Default::default(),
            },
        )
    });
    h.post("3", ".indovina 10").await;
    assert!(h.mock.last_text().unwrap().contains("troppo basso"));

    h.post("3", ".indovina 42").await;
    assert!(h.mock.last_text().unwrap().contains("indovinato"));
    let session = h.store().read(|c| c.games[CHAT].clone());
    assert_ne!(session.secret, 42);
    assert!(session.attempts.is_empty());
    assert_eq!(get_economy(h.store(), "3").money, 150);
}

#[tokio::test]
async fn tag_skips_members_that_cannot_be_resolved() {
    let h = Harness::new(
        MockTransport::new("bot")
            .with_roster(CHAT, &[("1", true), ("2", false), ("3", false)])
            .unresolvable("3"),
    );
    h.post("1", ".tag riunione").await;
    let sent = h
        .mock
        .calls()
        .into_iter()
        .find_map(|c| match c {
            Call::Send { text, mentions, .. } => Some((text, mentions)),
            _ => None,
        })
        .unwrap();
    assert!(sent.0.contains("riunione"));
    assert_eq!(sent.1, vec!["1".to_string(), "2".to_string()]);
}

#[tokio::test]
async fn joins_and_leaves() {
    let h = Harness::new(
        MockTransport::new("bot")
            .with_roster(CHAT, &[("1", true)])
            .unresolvable("5"),
    );
    h.warden
        .handle_join(MemberEvent {
            chat_id: CHAT.to_string(),
            users: vec!["5".to_string()],
            timestamp: tick(1000),
        })
        .await
        .unwrap();
    let greeting = h.mock.last_text().unwrap();
    assert!(greeting.contains("@5"));
    assert!(greeting.contains("Gruppo g"));

    h.mock.clear();
    ban_user(h.store(), CHAT, "6");
    h.warden
        .handle_join(MemberEvent {
            chat_id: CHAT.to_string(),
            users: vec!["6".to_string()],
            timestamp: tick(1000),
        })
        .await
        .unwrap();
    assert_eq!(h.mock.removed(), vec!["6".to_string()]);
    assert!(h.mock.texts().is_empty());

    insert_warn(h.store(), CHAT, "7", "1", 0);
    h.warden
        .handle_leave(MemberEvent {
            chat_id: CHAT.to_string(),
            users: vec!["7".to_string()],
            timestamp: tick(1000),
        })
        .await
        .unwrap();
    assert_eq!(get_warn_count(h.store(), CHAT, "7"), 0);
    assert!(h.mock.last_text().unwrap().contains("ha lasciato"));
}

#[tokio::test]
async fn daily_has_a_cooldown_and_deposit_moves_everything() {
    let h = Harness::standard();
    h.post("2", ".daily").await;
    h.post("2", ".daily").await;
    assert!(h.mock.last_text().unwrap().contains("già ritirato"));
    assert_eq!(get_economy(h.store(), "2").money, 300);

    h.post("2", ".deposita tutto").await;
    let eco = get_economy(h.store(), "2");
    assert_eq!((eco.money, eco.bank), (0, 300));
}

#[tokio::test]
async fn crossing_the_threshold_announces_a_level_up() {
    let h = Harness::standard();
    with_stats(h.store(), "2", |s| s.xp = 95);
    h.post("2@s.whatsapp.net", "ciao").await;
    assert!(h.mock.last_text().unwrap().contains("livello 2"));
    assert_eq!(h.store().read(|c| c.stats["2"].level), 2);
}

#[tokio::test]
async fn own_messages_are_ignored() {
    let h = Harness::standard();
    let mut msg = group_msg("bot", ".menu", &[]);
    msg.from_me = true;
    h.warden.handle_message(msg).await.unwrap();
    assert!(h.mock.calls().is_empty());
}

#[tokio::test]
async fn blocked_words_are_deleted_but_admins_can_manage_them() {
    let h = Harness::standard();
    add_blacklist(h.store(), CHAT, "spam");

    let msg = h.post("2", "compra SPAM qui").await;
    assert_eq!(h.mock.deleted(), vec![msg.id]);
    assert!(h.mock.last_text().unwrap().contains("parola vietata"));

    h.mock.clear();
    let msg = h.post("2", ".sblocca spam").await;
    assert_eq!(h.mock.deleted(), vec![msg.id]);
    assert_eq!(get_blacklist(h.store(), CHAT), vec!["spam".to_string()]);

    h.mock.clear();
    h.post("1", ".blocca spam").await;
    assert!(h.mock.last_text().unwrap().contains("già bloccata"));
    h.post("1", ".sblocca spam").await;
    assert!(h.mock.last_text().unwrap().contains("non è più bloccata"));
    assert!(h.mock.deleted().is_empty());
    assert!(get_blacklist(h.store(), CHAT).is_empty());
}

#[tokio::test]
async fn slowmode_rejects_values_out_of_range() {
    let h = Harness::standard();
    h.post("1", ".slowmode 18446744073709551615").await;
    assert!(h.mock.last_text().unwrap().contains("al massimo"));
    h.post("1", ".slowmode 307445734561825862m").await;
    assert!(h.mock.last_text().unwrap().contains("al massimo"));
    assert_eq!(ensure_group(h.store(), CHAT).slowmode, 0);

    h.post("1", ".slowmode 24h").await;
    assert_eq!(ensure_group(h.store(), CHAT).slowmode, 86_400);
    h.mock.clear();
    h.post("2", "uno").await;
    let second = h.post("2", "due").await;
    assert_eq!(h.mock.deleted(), vec![second.id]);
}

#[tokio::test]
async fn kick_and_ban_reach_members_missing_from_the_listing() {
    let h = Harness::new(
        MockTransport::new("bot")
            .with_roster(CHAT, &[("1", true)])
            .with_unlisted(CHAT, "4")
            .with_unlisted(CHAT, "5"),
    );
    h.post_with("1", ".kick", &["4"]).await;
    assert_eq!(h.mock.removed(), vec!["4".to_string()]);
    assert!(h.mock.last_text().unwrap().contains("rimosso"));

    h.post_with("1", ".kick", &["4"]).await;
    assert!(h.mock.last_text().unwrap().contains("non è nel gruppo"));
    assert_eq!(h.mock.removed().len(), 1);

    h.post_with("1", ".ban", &["5"]).await;
    assert_eq!(h.mock.removed(), vec!["4".to_string(), "5".to_string()]);
    assert!(h.store().read(|c| c.groups[CHAT].is_banned("5")));
}

#[tokio::test]
async fn banned_sender_is_removed_and_nothing_else_happens() {
    let h = Harness::standard();
    ban_user(h.store(), CHAT, "2");

    h.post("2@s.whatsapp.net", ".menu").await;
    assert_eq!(h.mock.removed(), vec!["2@s.whatsapp.net".to_string()]);
    assert!(h.mock.texts().is_empty());
    assert!(h.mock.deleted().is_empty());
    assert!(h.store().read(|c| !c.stats.contains_key("2")));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_events_in_one_chat_lose_no_updates() {
    let h = Harness::standard();
    let first = group_msg("1", ".warn", &["2"]);
    let second = group_msg("1", ".warn", &["2"]);
    let (a, b) = tokio::join!(
        h.warden.handle_message(first),
        h.warden.handle_message(second)
    );
    a.unwrap();
    b.unwrap();
    assert_eq!(get_warn_count(h.store(), CHAT, "2"), 2);

    let first = group_msg("3", "ciao", &[]);
    let second = group_msg("3", "ancora", &[]);
    let (a, b) = tokio::join!(
        h.warden.handle_message(first),
        h.warden.handle_message(second)
    );
    a.unwrap();
    b.unwrap();
    assert_eq!(h.store().read(|c| c.stats["3"].messages), 2);
}

#[tokio::test]
async fn level_shows_the_threshold_of_the_current_level() {
    let h = Harness::standard();
    with_stats(h.store(), "3", |s| {
        s.level = 3;
        s.xp = 262;
    });
    h.post("3", ".livello").await;
    let text = h.mock.last_text().unwrap();
    assert!(text.contains("Livello: 3"));
    assert!(text.contains("/300"));
}

#[tokio::test]
async fn changes_are_saved_even_when_the_reply_fails() {
    let h = Harness::standard();
    h.mock.fail(Op::Send, TransportError::Network("down".into()));
    let msg = group_msg("1", ".muta", &["2"]);
    assert!(h.warden.handle_message(msg).await.is_err());

    let reloaded = Store::open(h.dir.path());
    assert!(reloaded.read(|c| c.groups[CHAT].is_muted("2")));
}
