use crate::{transform::UnresolvedReference, validate::Rejection};

/// Core error type for the roster bot.
///
/// Pipeline failures (decode, validation, unresolved references, render
/// budgets) are normal outcomes for untrusted input; the chat adapter turns
/// them into a short reply. Adapter crates map their own failures into
/// `External` / `Fetch`.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not decode export: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("export rejected: {0}")]
    Rejected(#[from] Rejection),

    #[error("unresolved reference: {0}")]
    Unresolved(#[from] UnresolvedReference),

    #[error("page for list {roster_id} exceeds the {field} budget ({len} > {limit} chars)")]
    RenderBudget {
        roster_id: String,
        field: &'static str,
        len: usize,
        limit: usize,
    },

    #[error("fetch failed: {0}")]
    Fetch(String),

    #[error("export exceeds {limit} bytes (read {len})")]
    PayloadTooLarge { len: u64, limit: u64 },

    #[error("refusing to fetch {0}")]
    BlockedUrl(String),

    #[error("external error: {0}")]
    External(String),
}

impl Error {
    /// Short, user-facing description (no payload echo).
    pub fn user_message(&self) -> String {
        match self {
            Error::Decode(_) => "That does not look like JSON.".to_string(),
            Error::Rejected(r) => format!("That does not look like KSK data: {r}."),
            Error::Unresolved(u) => format!("The export references missing data: {u}."),
            Error::RenderBudget { .. } => {
                "A page is too large to post; lower KSK_PAGE_SIZE.".to_string()
            }
            Error::Fetch(_) => "Could not retrieve the export.".to_string(),
            Error::PayloadTooLarge { limit, .. } => {
                format!("The export is larger than {limit} bytes.")
            }
            Error::BlockedUrl(_) => "Only public https:// URLs can be fetched.".to_string(),
            Error::Config(_) | Error::Io(_) | Error::External(_) => {
                "Something went wrong while posting.".to_string()
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
