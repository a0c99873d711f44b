use std::sync::Arc;

use teloxide::prelude::*;

use ksk_core::domain::ChatId;

use crate::router::AppState;

use super::{command_text, post};

const HELP_HTML: &str = "<b>KSK roster bot</b>\n\n\
Post your KSK Classic lists from the addon's JSON export:\n\
• <code>/post {\"ksk\": ...}</code> with the JSON inline\n\
• <code>/post</code> as the caption of an attached <code>.json</code> file\n\
• <code>/post</code> as a reply to a message with the file\n\
• <code>/post https://…/ksk.json</code> to fetch it from a URL\n\n\
Posting a list again replaces its earlier messages in this chat.";

fn parse_command(text: &str) -> (String, String) {
    // Telegram may send `/cmd@botname arg1 ...`
    let mut parts = text.trim().splitn(2, char::is_whitespace);
    let first = parts.next().unwrap_or("").trim();
    let rest = parts.next().unwrap_or("").trim().to_string();

    let cmd = first
        .trim_start_matches('/')
        .split('@')
        .next()
        .unwrap_or("")
        .to_lowercase();

    (cmd, rest)
}

pub(super) async fn handle_command(
    bot: Bot,
    msg: Message,
    state: Arc<AppState>,
) -> ResponseResult<()> {
    let (cmd, args) = parse_command(command_text(&msg).unwrap_or(""));

    match cmd.as_str() {
        "post" => post::handle_post(bot, msg, state, args).await,
        "start" | "help" => {
            let _ = state
                .publisher
                .messenger()
                .send_html(ChatId(msg.chat.id.0), HELP_HTML)
                .await;
            Ok(())
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_command_with_bot_suffix_and_args() {
        let (cmd, args) = parse_command("/Post@ksk_bot  {\"ksk\": {}} ");
        assert_eq!(cmd, "post");
        assert_eq!(args, "{\"ksk\": {}}");
    }

    #[test]
    fn keeps_multiline_inline_json_intact() {
        let (cmd, args) = parse_command("/post\n{\n  \"ksk\": {}\n}");
        assert_eq!(cmd, "post");
        assert_eq!(args, "{\n  \"ksk\": {}\n}");
    }

    #[test]
    fn bare_command_has_no_args() {
        assert_eq!(parse_command("/help"), ("help".to_string(), String::new()));
    }
}
