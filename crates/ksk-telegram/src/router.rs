use std::{collections::HashMap, sync::Arc};

use teloxide::{dispatching::Dispatcher, dptree, prelude::*};

use tokio::sync::{Mutex, OwnedMutexGuard};

use ksk_core::{
    config::Config,
    messaging::{
        port::MessagingPort,
        throttled::{ThrottleConfig, ThrottledMessenger},
    },
    publisher::RosterPublisher,
};

use crate::handlers;
use crate::TelegramMessenger;

#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<Config>,
    pub publisher: Arc<RosterPublisher>,
    pub http: reqwest::Client,
    pub chat_locks: Arc<ChatLocks>,
}

/// Serializes `/post` handling per chat so pages of one roster never
/// interleave with another posting in the same chat.
#[derive(Default)]
pub struct ChatLocks {
    inner: Mutex<HashMap<i64, Arc<Mutex<()>>>>,
}

impl ChatLocks {
    pub async fn lock_chat(&self, chat_id: i64) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().await;
            // Only the map holds idle locks; anyone posting or waiting owns a clone.
            map.retain(|_, l| Arc::strong_count(l) > 1);
            map.entry(chat_id)
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}

/// Client used for URL exports. Redirects are not followed so a public URL
/// cannot bounce the fetch to an internal address.
pub fn fetch_client() -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(concat!("ksk-bot/", env!("CARGO_PKG_VERSION")))
        .redirect(reqwest::redirect::Policy::none())
        .build()
}

pub async fn run_polling(cfg: Arc<Config>) -> anyhow::Result<()> {
    let bot = Bot::new(cfg.telegram_bot_token.clone());

    match bot.get_me().await {
        Ok(me) => tracing::info!(username = %me.username(), "ksk bot started"),
        Err(e) => tracing::warn!("get_me failed, continuing: {e}"),
    }
    tracing::info!(
        page_size = cfg.limits.page_size,
        max_lists = cfg.limits.max_lists,
        max_members = cfg.limits.max_members,
        policy = ?cfg.unresolved_policy,
        "pipeline limits"
    );

    // Space out sends so multi-page rosters stay under Telegram's per-chat
    // rate; the adapter still honours one RetryAfter on top of this.
    let raw_messenger: Arc<dyn MessagingPort> = Arc::new(TelegramMessenger::new(bot.clone()));
    let messenger: Arc<dyn MessagingPort> = Arc::new(ThrottledMessenger::new(
        raw_messenger,
        ThrottleConfig::with_per_chat_interval(cfg.send_interval),
    ));

    let http = fetch_client()?;

    let state = Arc::new(AppState {
        cfg,
        publisher: Arc::new(RosterPublisher::new(messenger)),
        http,
        chat_locks: Arc::new(ChatLocks::default()),
    });

    let handler = dptree::entry().branch(Update::filter_message().endpoint(handlers::handle_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .build()
        .dispatch()
        .await;

    Ok(())
}
