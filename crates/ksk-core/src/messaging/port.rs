use async_trait::async_trait;

use crate::{
    domain::{ChatId, MessageRef},
    messaging::types::MessagingCapabilities,
    Result,
};

/// Cross-messenger port.
///
/// Sending is fire-and-forget from the core's point of view: adapters may
/// honour a single platform back-off, nothing more.
#[async_trait]
pub trait MessagingPort: Send + Sync {
    fn capabilities(&self) -> MessagingCapabilities;

    async fn send_html(&self, chat_id: ChatId, html: &str) -> Result<MessageRef>;
    async fn delete_message(&self, msg: MessageRef) -> Result<()>;
}
