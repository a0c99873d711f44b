//! Telegram update handlers.
//!
//! Only commands are acted on; everything else in the chat is ignored.
//! Commands may arrive as message text or as the caption of an attached
//! document (`/post` with a JSON file).

use std::sync::Arc;

use teloxide::{prelude::*, types::Message};

use crate::router::AppState;

mod commands;
mod post;

fn command_text(msg: &Message) -> Option<&str> {
    msg.text().or_else(|| msg.caption())
}

pub async fn handle_message(bot: Bot, msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let is_command = command_text(&msg)
        .map(|t| t.trim_start().starts_with('/'))
        .unwrap_or(false);
    if !is_command {
        return Ok(());
    }

    let _guard = state.chat_locks.lock_chat(msg.chat.id.0).await;
    commands::handle_command(bot, msg, state).await
}
