use std::sync::Arc;

use teloxide::{dispatching::Dispatcher, dptree, prelude::*};

use tokio::sync::Mutex;
use tracing::info;

use anonrelay_core::{
    config::Config,
    domain::UserId,
    platform::{port::PlatformPort, timeout::TimeoutPlatform, types::RelayEvent},
    relay::{Relay, RelaySettings},
    router,
    store::PersistentStore,
    templates::Templates,
};

use crate::handlers;
use crate::TelegramPlatform;

/// Shared handler state. The single mutex serializes every event through the relay.
pub struct AppState {
    pub relay: Mutex<Relay>,
}

impl AppState {
    pub async fn dispatch(&self, event: RelayEvent) {
        let mut relay = self.relay.lock().await;
        router::dispatch(&mut relay, event).await;
    }
}

pub async fn run_polling(
    cfg: Arc<Config>,
    store: PersistentStore,
    templates: Templates,
) -> anyhow::Result<()> {
    let bot = Bot::new(cfg.token.clone());

    let me = bot.get_me().await?;
    info!(
        username = %me.username(),
        cache_root = %store.root().display(),
        "anonrelay started"
    );

    // Every outbound call is bounded; a hung request would otherwise block the dispatcher.
    let raw_platform: Arc<dyn PlatformPort> = Arc::new(TelegramPlatform::new(bot.clone(), me.id));
    let platform: Arc<dyn PlatformPort> =
        Arc::new(TimeoutPlatform::new(raw_platform, cfg.io_timeout()));

    let relay = Relay::new(
        UserId(me.id.0 as i64),
        store,
        platform,
        templates,
        RelaySettings::from(cfg.as_ref()),
    );
    let state = Arc::new(AppState {
        relay: Mutex::new(relay),
    });

    state.dispatch(RelayEvent::Started).await;

    let handler = dptree::entry()
        .branch(Update::filter_my_chat_member().endpoint(handlers::handle_my_chat_member))
        .branch(Update::filter_message().endpoint(handlers::handle_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .build()
        .dispatch()
        .await;

    Ok(())
}
