use std::{env, fs, path::Path, str::FromStr, time::Duration};

use crate::{errors::Error, transform::UnresolvedPolicy, Result};

/// Bounds applied by the pipeline. Independent of the environment so the
/// pure stages can be driven directly.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Limits {
    /// Maximum number of lists in one export.
    pub max_lists: usize,
    /// Maximum member count of the largest single list.
    pub max_members: usize,
    /// Rows per posted page.
    pub page_size: usize,
    /// Per-column character budget of a rendered page.
    pub field_char_limit: usize,
    /// Character budget of a whole rendered page.
    pub message_char_limit: usize,
}

impl Limits {
    /// Shrink the message budget to what the messenger accepts; the field
    /// budget never exceeds the message budget.
    pub fn capped_to(self, max_message_len: usize) -> Self {
        let message_char_limit = self.message_char_limit.min(max_message_len);
        Self {
            message_char_limit,
            field_char_limit: self.field_char_limit.min(message_char_limit),
            ..self
        }
    }
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_lists: 50,
            max_members: 1000,
            page_size: 50,
            field_char_limit: 1024,
            message_char_limit: 4096,
        }
    }
}

/// Typed configuration for the bot, loaded from the environment.
#[derive(Clone, Debug)]
pub struct Config {
    pub telegram_bot_token: String,

    // Pipeline
    pub limits: Limits,
    pub unresolved_policy: UnresolvedPolicy,

    // Ingestion
    pub max_attachment_bytes: u64,
    pub fetch_timeout: Duration,

    // Posting
    pub send_interval: Duration,
    pub delete_command_message: bool,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        let telegram_bot_token = env_str("TELEGRAM_BOT_TOKEN").ok_or_else(|| {
            Error::Config("TELEGRAM_BOT_TOKEN environment variable is required".to_string())
        })?;

        let defaults = Limits::default();
        let limits = Limits {
            max_lists: env_parse("KSK_MAX_LISTS")?.unwrap_or(defaults.max_lists),
            max_members: env_parse("KSK_MAX_MEMBERS")?.unwrap_or(defaults.max_members),
            page_size: env_parse("KSK_PAGE_SIZE")?.unwrap_or(defaults.page_size),
            field_char_limit: env_parse("KSK_FIELD_CHAR_LIMIT")?
                .unwrap_or(defaults.field_char_limit),
            message_char_limit: env_parse("KSK_MESSAGE_CHAR_LIMIT")?
                .unwrap_or(defaults.message_char_limit),
        };
        check_limits(&limits)?;

        let unresolved_policy = match env_str("KSK_UNRESOLVED_POLICY") {
            Some(raw) => raw.parse::<UnresolvedPolicy>().map_err(Error::Config)?,
            None => UnresolvedPolicy::default(),
        };

        let max_attachment_bytes =
            env_parse::<u64>("KSK_MAX_ATTACHMENT_BYTES")?.unwrap_or(1024 * 1024);
        let fetch_timeout =
            Duration::from_millis(env_parse("KSK_FETCH_TIMEOUT_MS")?.unwrap_or(10_000));

        let send_interval =
            Duration::from_millis(env_parse("KSK_SEND_INTERVAL_MS")?.unwrap_or(1050));
        let delete_command_message = env_flag("KSK_DELETE_COMMAND_MESSAGE")?.unwrap_or(true);

        Ok(Self {
            telegram_bot_token,
            limits,
            unresolved_policy,
            max_attachment_bytes,
            fetch_timeout,
            send_interval,
            delete_command_message,
        })
    }
}

fn check_limits(limits: &Limits) -> Result<()> {
    if limits.page_size == 0 {
        return Err(Error::Config("KSK_PAGE_SIZE must be at least 1".to_string()));
    }
    if limits.max_lists == 0 {
        return Err(Error::Config("KSK_MAX_LISTS must be at least 1".to_string()));
    }
    if limits.field_char_limit > limits.message_char_limit {
        return Err(Error::Config(
            "KSK_FIELD_CHAR_LIMIT cannot exceed KSK_MESSAGE_CHAR_LIMIT".to_string(),
        ));
    }
    Ok(())
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok().and_then(non_empty)
}

/// Parse `key` if it is set; a value that does not parse is a config error
/// rather than a silent fallback to the default.
fn env_parse<T: FromStr>(key: &str) -> Result<Option<T>> {
    match env_str(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| Error::Config(format!("{key} has an invalid value: {raw:?}"))),
        None => Ok(None),
    }
}

fn env_flag(key: &str) -> Result<Option<bool>> {
    let Some(raw) = env_str(key) else {
        return Ok(None);
    };
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(Some(true)),
        "0" | "false" | "no" | "off" => Ok(Some(false)),
        _ => Err(Error::Config(format!("{key} must be a boolean, got {raw:?}"))),
    }
}

fn non_empty(s: String) -> Option<String> {
    (!s.trim().is_empty()).then_some(s)
}

/// `KEY=value` from one `.env` line; comments, blanks and keyless lines
/// yield nothing. Matching single or double quotes around the value are
/// removed.
fn dotenv_entry(line: &str) -> Option<(&str, &str)> {
    let line = line.trim();
    if line.starts_with('#') {
        return None;
    }
    let (key, value) = line.split_once('=')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    let value = value.trim();
    let unquoted = ['"', '\'']
        .iter()
        .find_map(|q| value.strip_prefix(*q)?.strip_suffix(*q))
        .unwrap_or(value);
    Some((key, unquoted))
}

/// Values already present in the environment win over the file.
fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };
    for (key, value) in contents.lines().filter_map(dotenv_entry) {
        if env::var_os(key).is_none() {
            env::set_var(key, value);
        }
    }
}
