use std::sync::Arc;

use teloxide::prelude::*;

use ksk_core::{
    domain::{ChatId, MessageId, MessageRef},
    ingest::{is_url, ByteSource, HttpSource, InlineSource},
    pipeline::prepare,
    publisher::PublishReport,
    render::escape_html,
};

use crate::{router::AppState, AttachmentSource};

const USAGE_HTML: &str = "Send <code>/post</code> with the KSK JSON inline, \
as the caption of a <code>.json</code> file, or as a reply to one.";

/// Where the export for a `/post` comes from.
#[derive(Debug, PartialEq, Eq)]
enum SourceChoice {
    Inline(String),
    Url(String),
    Attachment,
    Missing,
}

/// Inline arguments win over an attachment; a lone URL is fetched.
fn choose_source(args: &str, has_document: bool) -> SourceChoice {
    let args = args.trim();
    if !args.is_empty() {
        if is_url(args) {
            return SourceChoice::Url(args.to_string());
        }
        return SourceChoice::Inline(args.to_string());
    }
    if has_document {
        return SourceChoice::Attachment;
    }
    SourceChoice::Missing
}

fn attached_document(msg: &Message) -> Option<&teloxide::types::Document> {
    msg.document()
        .or_else(|| msg.reply_to_message().and_then(|m| m.document()))
}

fn build_source(
    bot: &Bot,
    msg: &Message,
    state: &AppState,
    choice: SourceChoice,
) -> Option<Box<dyn ByteSource>> {
    let cfg = &state.cfg;
    match choice {
        SourceChoice::Inline(text) => Some(Box::new(InlineSource::new(text))),
        SourceChoice::Url(url) => Some(Box::new(HttpSource::new(
            state.http.clone(),
            url,
            cfg.max_attachment_bytes,
            cfg.fetch_timeout,
        ))),
        SourceChoice::Attachment => attached_document(msg).map(|doc| {
            Box::new(AttachmentSource::new(bot.clone(), doc, cfg.max_attachment_bytes))
                as Box<dyn ByteSource>
        }),
        SourceChoice::Missing => None,
    }
}

async fn post_export(
    state: &AppState,
    chat_id: ChatId,
    source: &dyn ByteSource,
) -> ksk_core::Result<PublishReport> {
    let bytes = source.fetch().await?;
    let limits = state.publisher.limits_for_messenger(state.cfg.limits);
    let postings = prepare(&bytes, &limits, state.cfg.unresolved_policy)?;
    state.publisher.publish_all(chat_id, &postings).await
}

pub(super) async fn handle_post(
    bot: Bot,
    msg: Message,
    state: Arc<AppState>,
    args: String,
) -> ResponseResult<()> {
    let chat_id = ChatId(msg.chat.id.0);
    let messenger = state.publisher.messenger();

    let choice = choose_source(&args, attached_document(&msg).is_some());
    let Some(source) = build_source(&bot, &msg, &state, choice) else {
        let _ = messenger.send_html(chat_id, USAGE_HTML).await;
        return Ok(());
    };

    match post_export(&state, chat_id, source.as_ref()).await {
        Ok(report) => {
            tracing::info!(
                chat_id = chat_id.0,
                source = source.kind(),
                sent = report.sent,
                removed = report.removed,
                failed_deletes = report.failed_deletes,
                "post complete"
            );
            if state.cfg.delete_command_message {
                let command = MessageRef {
                    chat_id,
                    message_id: MessageId(msg.id.0),
                };
                if let Err(e) = messenger.delete_message(command).await {
                    tracing::debug!("could not delete /post message: {e}");
                }
            }
        }
        Err(e) => {
            tracing::warn!(chat_id = chat_id.0, source = source.kind(), "post failed: {e}");
            let _ = messenger
                .send_html(chat_id, &format!("❌ {}", escape_html(&e.user_message())))
                .await;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inline_json_wins_over_attachment() {
        assert_eq!(
            choose_source(" {\"ksk\":{}} ", true),
            SourceChoice::Inline("{\"ksk\":{}}".to_string())
        );
    }

    #[test]
    fn lone_url_is_fetched() {
        assert_eq!(
            choose_source("https://example.com/ksk.json", false),
            SourceChoice::Url("https://example.com/ksk.json".to_string())
        );
    }

    #[test]
    fn falls_back_to_attachment_then_usage() {
        assert_eq!(choose_source("  ", true), SourceChoice::Attachment);
        assert_eq!(choose_source("", false), SourceChoice::Missing);
    }
}
