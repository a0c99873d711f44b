//! Wire model of the KSK addon export.
//!
//! The addon writes short field names (`n`, `c`, `v`); they are mapped to
//! readable names here and nowhere else.

use serde::Deserialize;

/// Top-level key the addon wraps its export in.
pub const ENVELOPE_KEY: &str = "ksk";

/// Fields that must be present for a document to be considered KSK data.
pub const REQUIRED_FIELDS: [&str; 5] = ["classes", "date", "lists", "time", "users"];

/// Decode raw bytes into an untyped tree.
pub fn decode(bytes: &[u8]) -> crate::Result<serde_json::Value> {
    Ok(serde_json::from_slice(bytes)?)
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct KskDocument {
    pub date: String,
    pub time: String,
    pub classes: Vec<ClassRecord>,
    pub users: Vec<UserRecord>,
    pub lists: Vec<ListRecord>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct ClassRecord {
    pub id: String,
    #[serde(rename = "v")]
    pub label: String,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct UserRecord {
    pub id: String,
    #[serde(rename = "n")]
    pub name: String,
    #[serde(rename = "c")]
    pub class_id: String,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct ListRecord {
    pub id: String,
    #[serde(rename = "n")]
    pub name: String,
    #[serde(rename = "users")]
    pub member_ids: Vec<String>,
}

impl KskDocument {
    /// Label shown as "Last Updated": date and time joined by one space.
    pub fn updated_label(&self) -> String {
        format!("{} {}", self.date, self.time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_rejects_non_json() {
        let err = decode(b"not json {").unwrap_err();
        assert!(matches!(err, crate::Error::Decode(_)));
    }

    #[test]
    fn short_field_names_map_to_records() {
        let v = serde_json::json!({
            "date": "2021-01-01",
            "time": "12:00",
            "classes": [{"id": "c1", "v": "warrior"}],
            "users": [{"id": "u1", "n": "Alice", "c": "c1", "extra": true}],
            "lists": [{"id": "L1", "n": "Tank", "users": ["u1"]}]
        });
        let doc: KskDocument = serde_json::from_value(v).unwrap();
        assert_eq!(doc.users[0].class_id, "c1");
        assert_eq!(doc.lists[0].member_ids, vec!["u1".to_string()]);
        assert_eq!(doc.classes[0].label, "warrior");
        assert_eq!(doc.updated_label(), "2021-01-01 12:00");
    }
}
