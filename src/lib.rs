pub mod database;
pub mod modules;
pub mod transport;
pub mod util;

use database::Store;
use std::sync::Arc;
use std::time::Instant;
use transport::{IncomingMessage, MemberEvent, Transport};
use util::{normalize_id, Config};

pub type TgErr<T> = anyhow::Result<T>;

/// Everything an event handler needs, shared across events.
#[derive(Clone)]
pub struct Warden {
    pub store: Arc<Store>,
    pub transport: Arc<dyn Transport>,
    pub config: Arc<Config>,
    pub started: Instant,
}

impl Warden {
    pub fn new(store: Arc<Store>, transport: Arc<dyn Transport>, config: Config) -> Self {
        Warden {
            store,
            transport,
            config: Arc::new(config),
            started: Instant::now(),
        }
    }

    pub fn context(&self, update: IncomingMessage) -> Cxt {
        Cxt {
            store: self.store.clone(),
            transport: self.transport.clone(),
            config: self.config.clone(),
            started: self.started,
            update,
        }
    }

    /// Entry point for an inbound message: moderation pipeline, then commands.
    pub async fn handle_message(&self, update: IncomingMessage) -> TgErr<()> {
        let cx = self.context(update);
        let _chat = self.store.lock_chat(cx.chat_id()).await;
        modules::answer(&cx).await
    }

    pub async fn handle_join(&self, event: MemberEvent) -> TgErr<()> {
        let _chat = self.store.lock_chat(&event.chat_id).await;
        modules::greet_members(self, &event).await
    }

    pub async fn handle_leave(&self, event: MemberEvent) -> TgErr<()> {
        let _chat = self.store.lock_chat(&event.chat_id).await;
        modules::farewell_members(self, &event).await
    }
}

/// A single inbound message together with the shared handles.
pub struct Cxt {
    pub store: Arc<Store>,
    pub transport: Arc<dyn Transport>,
    pub config: Arc<Config>,
    pub started: Instant,
    pub update: IncomingMessage,
}

impl Cxt {
    pub fn chat_id(&self) -> &str {
        &self.update.chat_id
    }

    pub fn sender(&self) -> String {
        normalize_id(&self.update.sender)
    }

    /// Text after the command word.
    pub fn arg_text(&self) -> &str {
        let text = self.update.text.trim_start();
        match text.find(char::is_whitespace) {
            Some(idx) => text[idx..].trim(),
            None => "",
        }
    }

    pub fn args(&self) -> Vec<&str> {
        self.arg_text().split_whitespace().collect()
    }

    pub async fn reply_to(&self, text: impl AsRef<str>) -> TgErr<()> {
        self.transport
            .reply(self.chat_id(), &self.update.id, text.as_ref(), &[])
            .await?;
        Ok(())
    }

    pub async fn reply_mentioning(&self, text: impl AsRef<str>, mentions: &[String]) -> TgErr<()> {
        self.transport
            .reply(self.chat_id(), &self.update.id, text.as_ref(), mentions)
            .await?;
        Ok(())
    }

    pub async fn send(&self, text: impl AsRef<str>, mentions: &[String]) -> TgErr<()> {
        self.transport
            .send_message(self.chat_id(), text.as_ref(), mentions)
            .await?;
        Ok(())
    }
}
