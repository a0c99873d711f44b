//! Sends prepared rosters and retires earlier postings of the same list.
//!
//! The bot cannot read chat history, so it remembers (in memory only) which
//! messages carried which footer id. Re-posting a list deletes those first.
//! Cleanup is best-effort: a failed delete is logged and skipped.

use std::{collections::HashMap, sync::Arc};

use tokio::sync::Mutex;

use crate::{
    config::Limits,
    domain::{ChatId, MessageRef},
    messaging::port::MessagingPort,
    pipeline::RosterPosting,
    Result,
};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PublishReport {
    pub sent: usize,
    pub removed: usize,
    pub failed_deletes: usize,
}

impl PublishReport {
    fn absorb(&mut self, other: &PublishReport) {
        self.sent += other.sent;
        self.removed += other.removed;
        self.failed_deletes += other.failed_deletes;
    }
}

type PostingKey = (ChatId, String);

pub struct RosterPublisher {
    messenger: Arc<dyn MessagingPort>,
    posted: Mutex<HashMap<PostingKey, Vec<MessageRef>>>,
}

impl RosterPublisher {
    pub fn new(messenger: Arc<dyn MessagingPort>) -> Self {
        Self {
            messenger,
            posted: Mutex::new(HashMap::new()),
        }
    }

    pub fn messenger(&self) -> Arc<dyn MessagingPort> {
        self.messenger.clone()
    }

    /// `limits` with the message budget capped to what the messenger accepts.
    pub fn limits_for_messenger(&self, limits: Limits) -> Limits {
        limits.capped_to(self.messenger.capabilities().max_message_len)
    }

    /// Messages currently known to carry `roster_id` in `chat_id`.
    pub async fn posted(&self, chat_id: ChatId, roster_id: &str) -> Vec<MessageRef> {
        self.posted
            .lock()
            .await
            .get(&(chat_id, roster_id.to_string()))
            .cloned()
            .unwrap_or_default()
    }

    /// Post one roster's pages in order, after deleting its previous posting.
    ///
    /// If a send fails midway, the pages already sent are remembered so the
    /// next posting of this list still cleans them up.
    pub async fn publish(&self, chat_id: ChatId, posting: &RosterPosting) -> Result<PublishReport> {
        let key = (chat_id, posting.roster_id.clone());
        let mut report = PublishReport::default();

        let stale = self.posted.lock().await.remove(&key).unwrap_or_default();
        let capabilities = self.messenger.capabilities();
        for msg in stale {
            if !capabilities.supports_delete {
                report.failed_deletes += 1;
                continue;
            }
            match self.messenger.delete_message(msg).await {
                Ok(()) => report.removed += 1,
                Err(e) => {
                    report.failed_deletes += 1;
                    tracing::warn!(roster_id = %posting.roster_id, message_id = msg.message_id.0, "could not delete stale page: {e}");
                }
            }
        }

        let mut sent = Vec::with_capacity(posting.messages.len());
        for html in &posting.messages {
            match self.messenger.send_html(chat_id, html).await {
                Ok(r) => sent.push(r),
                Err(e) => {
                    tracing::error!(roster_id = %posting.roster_id, sent = sent.len(), "page send failed: {e}");
                    self.posted.lock().await.insert(key, sent);
                    return Err(e);
                }
            }
        }

        report.sent = sent.len();
        self.posted.lock().await.insert(key, sent);
        tracing::info!(
            roster_id = %posting.roster_id,
            chat_id = chat_id.0,
            sent = report.sent,
            removed = report.removed,
            "roster posted"
        );
        Ok(report)
    }

    /// Post several rosters one after another.
    pub async fn publish_all(
        &self,
        chat_id: ChatId,
        postings: &[RosterPosting],
    ) -> Result<PublishReport> {
        let mut total = PublishReport::default();
        for posting in postings {
            let report = self.publish(chat_id, posting).await?;
            total.absorb(&report);
        }
        Ok(total)
    }
}
