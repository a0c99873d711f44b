use std::{collections::HashMap, sync::Arc, time::Duration};

use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};

use crate::{
    domain::{ChatId, MessageRef},
    messaging::{port::MessagingPort, types::MessagingCapabilities},
    Result,
};

#[derive(Clone, Copy, Debug)]
pub struct ThrottleConfig {
    /// Minimum spacing between *any* outbound calls (global flood control).
    pub global_min_interval: Duration,
    /// Minimum spacing between calls to the same chat.
    pub per_chat_min_interval: Duration,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            global_min_interval: Duration::from_millis(40), // ~25/sec
            per_chat_min_interval: Duration::from_millis(1050), // ~0.95/sec
        }
    }
}

impl ThrottleConfig {
    pub fn with_per_chat_interval(per_chat_min_interval: Duration) -> Self {
        Self {
            per_chat_min_interval,
            ..Self::default()
        }
    }
}

#[derive(Debug)]
struct IntervalLimiter {
    interval: Duration,
    next: Instant,
}

impl IntervalLimiter {
    fn new(interval: Duration) -> Self {
        Self {
            interval,
            next: Instant::now(),
        }
    }

    /// Reserve the next slot and return the wait duration required before executing.
    fn reserve(&mut self) -> Duration {
        let now = Instant::now();
        let start = if now >= self.next { now } else { self.next };
        self.next = start + self.interval;
        start.saturating_duration_since(now)
    }
}

/// MessagingPort decorator that spaces out outbound calls.
///
/// Posting a long roster sends several messages back to back; this keeps
/// them under the platform's per-chat rate without blocking other chats.
pub struct ThrottledMessenger {
    inner: Arc<dyn MessagingPort>,
    cfg: ThrottleConfig,
    global: Mutex<IntervalLimiter>,
    per_chat: Mutex<HashMap<i64, Arc<Mutex<IntervalLimiter>>>>,
}

impl ThrottledMessenger {
    pub fn new(inner: Arc<dyn MessagingPort>, cfg: ThrottleConfig) -> Self {
        Self {
            inner,
            cfg,
            global: Mutex::new(IntervalLimiter::new(cfg.global_min_interval)),
            per_chat: Mutex::new(HashMap::new()),
        }
    }

    async fn limiter_for_chat(&self, chat_id: i64) -> Arc<Mutex<IntervalLimiter>> {
        let mut map = self.per_chat.lock().await;
        // A limiter whose slot has passed behaves like a fresh one.
        let now = Instant::now();
        map.retain(|_, lim| {
            Arc::strong_count(lim) > 1 || lim.try_lock().map_or(true, |l| l.next > now)
        });
        map.entry(chat_id)
            .or_insert_with(|| {
                Arc::new(Mutex::new(IntervalLimiter::new(
                    self.cfg.per_chat_min_interval,
                )))
            })
            .clone()
    }

    async fn throttle_chat(&self, chat_id: i64) {
        let global_wait = { self.global.lock().await.reserve() };
        let chat_wait = {
            let lim = self.limiter_for_chat(chat_id).await;
            let mut guard = lim.lock().await;
            guard.reserve()
        };

        let wait = global_wait.max(chat_wait);
        if wait > Duration::ZERO {
            sleep(wait).await;
        }
    }
}

#[async_trait::async_trait]
impl MessagingPort for ThrottledMessenger {
    fn capabilities(&self) -> MessagingCapabilities {
        self.inner.capabilities()
    }

    async fn send_html(&self, chat_id: ChatId, html: &str) -> Result<MessageRef> {
        self.throttle_chat(chat_id.0).await;
        self.inner.send_html(chat_id, html).await
    }

    async fn delete_message(&self, msg: MessageRef) -> Result<()> {
        self.throttle_chat(msg.chat_id.0).await;
        self.inner.delete_message(msg).await
    }
}
