//! Shape and size checks for untrusted exports.

use std::{collections::HashSet, fmt};

use serde::Deserialize;
use serde_json::Value;

use crate::{
    config::Limits,
    document::{KskDocument, ENVELOPE_KEY, REQUIRED_FIELDS},
};

/// Why an export was refused.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Rejection {
    /// A required field is missing or has the wrong type.
    MalformedShape { reason: String },
    /// Too many lists, or the largest list has too many members.
    OversizedInput {
        lists: usize,
        max_lists: usize,
        largest_list: usize,
        max_members: usize,
    },
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::MalformedShape { reason } => write!(f, "malformed shape ({reason})"),
            Rejection::OversizedInput {
                lists,
                max_lists,
                largest_list,
                max_members,
            } => write!(
                f,
                "over the limit (lists: {lists}/{max_lists}, largest list: {largest_list}/{max_members})"
            ),
        }
    }
}

impl std::error::Error for Rejection {}

fn malformed(reason: impl Into<String>) -> Rejection {
    Rejection::MalformedShape {
        reason: reason.into(),
    }
}

/// The addon nests everything under `ksk`; bare documents are accepted too.
fn unwrap_envelope(raw: &Value) -> &Value {
    match raw.get(ENVELOPE_KEY) {
        Some(inner) if inner.is_object() => inner,
        _ => raw,
    }
}

/// Check a decoded export and return its typed form.
///
/// Checks run in order: required fields and types, list count, members in
/// the single largest list, then list id uniqueness. The member bound is an
/// aggregate: the largest list's count is compared once.
pub fn validate(raw: &Value, limits: &Limits) -> Result<KskDocument, Rejection> {
    let body = unwrap_envelope(raw);
    let Some(obj) = body.as_object() else {
        return Err(malformed("document is not an object"));
    };

    let missing: Vec<&str> = REQUIRED_FIELDS
        .iter()
        .copied()
        .filter(|k| !obj.contains_key(*k))
        .collect();
    if !missing.is_empty() {
        return Err(malformed(format!("missing {}", missing.join(", "))));
    }

    let doc = KskDocument::deserialize(body).map_err(|e| malformed(e.to_string()))?;

    let lists = doc.lists.len();
    let largest_list = doc
        .lists
        .iter()
        .map(|l| l.member_ids.len())
        .max()
        .unwrap_or(0);
    if lists > limits.max_lists || largest_list > limits.max_members {
        tracing::warn!(
            lists,
            largest_list,
            max_lists = limits.max_lists,
            max_members = limits.max_members,
            "export over the size limit"
        );
        return Err(Rejection::OversizedInput {
            lists,
            max_lists: limits.max_lists,
            largest_list,
            max_members: limits.max_members,
        });
    }

    let mut seen = HashSet::new();
    for list in &doc.lists {
        if !seen.insert(list.id.as_str()) {
            return Err(malformed(format!("duplicate list id {}", list.id)));
        }
    }

    Ok(doc)
}
