//! Telegram adapter (teloxide).
//!
//! Implements the `ksk-core` MessagingPort and attachment source over the
//! Telegram Bot API, plus the dispatcher that wires `/post` to the pipeline.

use async_trait::async_trait;

use teloxide::{net::Download, prelude::*, types::ParseMode};

use tokio::time::sleep;

pub mod handlers;
pub mod router;

use ksk_core::{
    domain::{ChatId, MessageId, MessageRef},
    errors::Error,
    ingest::{check_size, ByteSource},
    messaging::{port::MessagingPort, types::MessagingCapabilities},
    Result,
};

#[derive(Clone)]
pub struct TelegramMessenger {
    bot: Bot,
}

impl TelegramMessenger {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    fn tg_chat(chat_id: ChatId) -> teloxide::types::ChatId {
        teloxide::types::ChatId(chat_id.0)
    }

    fn tg_msg_id(message_id: MessageId) -> teloxide::types::MessageId {
        teloxide::types::MessageId(message_id.0)
    }

    fn map_err(e: teloxide::RequestError) -> Error {
        Error::External(format!("telegram error: {e}"))
    }

    /// Run a Bot API request, waiting out one flood-control reply.
    async fn call<T, Fut>(
        &self,
        what: &'static str,
        mut request: impl FnMut() -> Fut,
    ) -> Result<T>
    where
        Fut: std::future::IntoFuture<Output = std::result::Result<T, teloxide::RequestError>>,
        Fut::IntoFuture: Send,
    {
        match request().await {
            Err(teloxide::RequestError::RetryAfter(wait)) => {
                tracing::warn!(
                    what,
                    wait_ms = wait.as_millis() as u64,
                    "flood control, retrying once"
                );
                sleep(wait).await;
                request().await.map_err(Self::map_err)
            }
            other => other.map_err(Self::map_err),
        }
    }
}

#[async_trait]
impl MessagingPort for TelegramMessenger {
    fn capabilities(&self) -> MessagingCapabilities {
        MessagingCapabilities {
            supports_delete: true,
            max_message_len: 4096,
        }
    }

    async fn send_html(&self, chat_id: ChatId, html: &str) -> Result<MessageRef> {
        let msg = self
            .call("send_message", || {
                self.bot
                    .send_message(Self::tg_chat(chat_id), html.to_string())
                    .parse_mode(ParseMode::Html)
                    .disable_web_page_preview(true)
            })
            .await?;

        Ok(MessageRef {
            chat_id,
            message_id: MessageId(msg.id.0),
        })
    }

    async fn delete_message(&self, msg: MessageRef) -> Result<()> {
        self.call("delete_message", || {
            self.bot
                .delete_message(Self::tg_chat(msg.chat_id), Self::tg_msg_id(msg.message_id))
        })
        .await?;
        Ok(())
    }
}

/// A JSON file attached to (or replied to by) the `/post` command.
pub struct AttachmentSource {
    bot: Bot,
    file_id: String,
    declared_size: u64,
    max_bytes: u64,
}

impl AttachmentSource {
    pub fn new(bot: Bot, doc: &teloxide::types::Document, max_bytes: u64) -> Self {
        Self {
            bot,
            file_id: doc.file.id.clone(),
            declared_size: doc.file.size as u64,
            max_bytes,
        }
    }
}

#[async_trait]
impl ByteSource for AttachmentSource {
    fn kind(&self) -> &'static str {
        "attachment"
    }

    async fn fetch(&self) -> Result<Vec<u8>> {
        check_size(self.declared_size, self.max_bytes)?;

        let file = self
            .bot
            .get_file(self.file_id.clone())
            .await
            .map_err(|e| Error::Fetch(format!("telegram get_file failed: {e}")))?;

        let mut buf: Vec<u8> = Vec::with_capacity(self.declared_size as usize);
        self.bot
            .download_file(&file.path, &mut buf)
            .await
            .map_err(|e| Error::Fetch(format!("telegram download failed: {e}")))?;

        check_size(buf.len() as u64, self.max_bytes)?;
        Ok(buf)
    }
}
