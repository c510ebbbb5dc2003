use groupwarden::database::db_utils::mark_started;
use groupwarden::database::Store;
use groupwarden::transport::telegram::{Inbound, TelegramTransport};
use groupwarden::util::{consts, now_ms, Config};
use groupwarden::{TgErr, Warden};
use std::sync::Arc;
use std::time::Duration;
use teloxide::prelude::*;
use tokio_stream::wrappers::UnboundedReceiverStream;

type Cxt = UpdateWithCx<AutoSend<Bot>, Message>;

async fn answer(warden: Warden, transport: Arc<TelegramTransport>, cx: Cxt) -> TgErr<()> {
    match transport.inbound(&cx.update) {
        Some(Inbound::Message(msg)) => warden.handle_message(msg).await,
        Some(Inbound::Joined(ev)) => warden.handle_join(ev).await,
        Some(Inbound::Left(ev)) => warden.handle_leave(ev).await,
        None => Ok(()),
    }
}

fn install_panic_hook(store: Arc<Store>) {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        default_hook(info);
        match store.try_save() {
            Ok(true) => {}
            Ok(false) => log::error!("Store busy while panicking, final save skipped"),
            Err(e) => log::error!("Final save after panic failed: {:#}", e),
        }
        std::process::exit(1);
    }));
}

async fn run() -> TgErr<()> {
    dotenv::dotenv().ok();
    teloxide::enable_logging!();
    let config = Config::from_env();
    let store = Arc::new(Store::open(&config.data_dir));
    mark_started(&store, now_ms());
    install_panic_hook(store.clone());

    let autosave = store.clone();
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(Duration::from_secs(consts::SAVE_INTERVAL_SECS));
        loop {
            tick.tick().await;
            if let Err(e) = autosave.clone().persist().await {
                log::error!("Periodic save failed: {:#}", e);
            }
        }
    });

    let bot = Bot::from_env().auto_send();
    let transport = Arc::new(TelegramTransport::new(bot.clone()).await?);
    let warden = Warden::new(store.clone(), transport.clone(), config);
    log::info!("{} started as {}", warden.config.bot_name, warden.transport.bot_id());

    Dispatcher::new(bot)
        .messages_handler(move |rx: DispatcherHandlerRx<AutoSend<Bot>, Message>| {
            let warden = warden.clone();
            let transport = transport.clone();
            UnboundedReceiverStream::new(rx).for_each_concurrent(None, move |cx| {
                let warden = warden.clone();
                let transport = transport.clone();
                async move { answer(warden, transport, cx).await.log_on_error().await }
            })
        })
        .setup_ctrlc_handler()
        .dispatch()
        .await;

    store.save()?;
    log::info!("Store saved, bye");
    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        log::error!("{:#}", e);
        std::process::exit(1);
    }
}
