//! Denormalize a validated export into display-ready rosters.

use std::{collections::HashMap, fmt, str::FromStr};

use crate::document::{ClassRecord, KskDocument, ListRecord, UserRecord};

/// Shown in place of unresolved data under [`UnresolvedPolicy::Placeholder`].
pub const PLACEHOLDER: &str = "?";

/// One ranking list resolved into (character, class) rows.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Roster {
    pub id: String,
    pub name: String,
    pub updated_label: String,
    pub rows: Vec<RosterRow>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RosterRow {
    pub character_name: String,
    pub class_name: String,
}

/// What to do when a member id or class id points at nothing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum UnresolvedPolicy {
    /// Drop unknown members, leave unknown classes blank. Logged.
    #[default]
    Skip,
    /// Keep a row for unknown members (their id, class `?`); unknown classes render `?`. Logged.
    Placeholder,
    /// Abort the transform on the first unresolved reference.
    Fail,
}

impl FromStr for UnresolvedPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "skip" | "drop" => Ok(Self::Skip),
            "placeholder" => Ok(Self::Placeholder),
            "fail" | "strict" => Ok(Self::Fail),
            other => Err(format!("unknown unresolved policy: {other}")),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UnresolvedReference {
    MissingUser { list_id: String, member_id: String },
    MissingClass { list_id: String, user_id: String, class_id: String },
}

impl fmt::Display for UnresolvedReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnresolvedReference::MissingUser { list_id, member_id } => {
                write!(f, "list {list_id} names unknown user {member_id}")
            }
            UnresolvedReference::MissingClass {
                list_id,
                user_id,
                class_id,
            } => write!(
                f,
                "user {user_id} in list {list_id} has unknown class {class_id}"
            ),
        }
    }
}

impl std::error::Error for UnresolvedReference {}

/// Id → record lookup tables, built once per document.
struct Index<'a> {
    users: HashMap<&'a str, &'a UserRecord>,
    classes: HashMap<&'a str, &'a ClassRecord>,
}

impl<'a> Index<'a> {
    fn build(doc: &'a KskDocument) -> Self {
        let mut users = HashMap::with_capacity(doc.users.len());
        for u in &doc.users {
            users.entry(u.id.as_str()).or_insert(u);
        }
        let mut classes = HashMap::with_capacity(doc.classes.len());
        for c in &doc.classes {
            classes.entry(c.id.as_str()).or_insert(c);
        }
        Self { users, classes }
    }

    fn user(&self, id: &str) -> Option<&'a UserRecord> {
        self.users.get(id).copied()
    }

    fn class(&self, id: &str) -> Option<&'a ClassRecord> {
        self.classes.get(id).copied()
    }
}

/// Uppercase the first code point and keep the rest exactly as given.
pub fn capitalize_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Build one roster per list, in list order.
pub fn transform(
    doc: &KskDocument,
    policy: UnresolvedPolicy,
) -> Result<Vec<Roster>, UnresolvedReference> {
    let index = Index::build(doc);
    let updated_label = doc.updated_label();

    doc.lists
        .iter()
        .map(|list| build_roster(list, &index, &updated_label, policy))
        .collect()
}

fn build_roster(
    list: &ListRecord,
    index: &Index<'_>,
    updated_label: &str,
    policy: UnresolvedPolicy,
) -> Result<Roster, UnresolvedReference> {
    let mut rows = Vec::with_capacity(list.member_ids.len());

    for member_id in &list.member_ids {
        let Some(user) = index.user(member_id) else {
            match policy {
                UnresolvedPolicy::Fail => {
                    return Err(UnresolvedReference::MissingUser {
                        list_id: list.id.clone(),
                        member_id: member_id.clone(),
                    });
                }
                UnresolvedPolicy::Skip => {
                    tracing::warn!(list_id = %list.id, %member_id, "dropping unknown member");
                }
                UnresolvedPolicy::Placeholder => {
                    tracing::warn!(
                        list_id = %list.id,
                        %member_id,
                        "unknown member, using placeholder"
                    );
                    rows.push(RosterRow {
                        character_name: member_id.clone(),
                        class_name: PLACEHOLDER.to_string(),
                    });
                }
            }
            continue;
        };

        let class_name = match index.class(&user.class_id) {
            Some(class) => capitalize_first(&class.label),
            None => match policy {
                UnresolvedPolicy::Fail => {
                    return Err(UnresolvedReference::MissingClass {
                        list_id: list.id.clone(),
                        user_id: user.id.clone(),
                        class_id: user.class_id.clone(),
                    });
                }
                UnresolvedPolicy::Skip => {
                    tracing::warn!(
                        list_id = %list.id,
                        user_id = %user.id,
                        class_id = %user.class_id,
                        "unknown class, leaving blank"
                    );
                    String::new()
                }
                UnresolvedPolicy::Placeholder => {
                    tracing::warn!(
                        list_id = %list.id,
                        user_id = %user.id,
                        class_id = %user.class_id,
                        "unknown class, using placeholder"
                    );
                    PLACEHOLDER.to_string()
                }
            },
        };

        rows.push(RosterRow {
            character_name: user.name.clone(),
            class_name,
        });
    }

    Ok(Roster {
        id: list.id.clone(),
        name: list.name.clone(),
        updated_label: updated_label.to_string(),
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(v: serde_json::Value) -> KskDocument {
        serde_json::from_value(v).unwrap()
    }

    fn sample() -> KskDocument {
        doc(json!({
            "date": "2021-01-01",
            "time": "12:00",
            "classes": [{"id": "c1", "v": "warrior"}, {"id": "c2", "v": "druid"}],
            "users": [
                {"id": "u1", "n": "Alice", "c": "c1"},
                {"id": "u2", "n": "Bob", "c": "c2"}
            ],
            "lists": [{"id": "L1", "n": "Tank", "users": ["u1", "u2"]}]
        }))
    }

    fn row(name: &str, class: &str) -> RosterRow {
        RosterRow {
            character_name: name.to_string(),
            class_name: class.to_string(),
        }
    }

    #[test]
    fn resolves_members_in_list_order() {
        let rosters = transform(&sample(), UnresolvedPolicy::Skip).unwrap();
        assert_eq!(rosters.len(), 1);
        let r = &rosters[0];
        assert_eq!(r.id, "L1");
        assert_eq!(r.name, "Tank");
        assert_eq!(r.updated_label, "2021-01-01 12:00");
        assert_eq!(r.rows, vec![row("Alice", "Warrior"), row("Bob", "Druid")]);
    }

    #[test]
    fn transform_is_idempotent() {
        let d = sample();
        assert_eq!(
            transform(&d, UnresolvedPolicy::Skip).unwrap(),
            transform(&d, UnresolvedPolicy::Skip).unwrap()
        );
    }

    #[test]
    fn capitalizes_only_the_first_code_point() {
        assert_eq!(capitalize_first("warrior"), "Warrior");
        assert_eq!(capitalize_first("DRUID"), "DRUID");
        assert_eq!(capitalize_first("death knight"), "Death knight");
        assert_eq!(capitalize_first("éclair"), "Éclair");
        assert_eq!(capitalize_first(""), "");
    }

    fn dangling() -> KskDocument {
        doc(json!({
            "date": "d",
            "time": "t",
            "classes": [{"id": "c1", "v": "warrior"}, {"id": "c2", "v": "mage"}],
            "users": [
                {"id": "u1", "n": "Alice", "c": "c1"},
                {"id": "u2", "n": "Ghost", "c": "c404"},
                {"id": "u3", "n": "Carol", "c": "c2"}
            ],
            "lists": [{"id": "L1", "n": "Main", "users": ["u1", "missing", "u2", "u3"]}]
        }))
    }

    #[test]
    fn skip_drops_members_and_blanks_classes_without_drift() {
        let rosters = transform(&dangling(), UnresolvedPolicy::Skip).unwrap();
        assert_eq!(
            rosters[0].rows,
            vec![row("Alice", "Warrior"), row("Ghost", ""), row("Carol", "Mage")]
        );
    }

    #[test]
    fn placeholder_keeps_a_row_per_member() {
        let rosters = transform(&dangling(), UnresolvedPolicy::Placeholder).unwrap();
        assert_eq!(
            rosters[0].rows,
            vec![
                row("Alice", "Warrior"),
                row("missing", PLACEHOLDER),
                row("Ghost", PLACEHOLDER),
                row("Carol", "Mage")
            ]
        );
    }

    #[test]
    fn fail_reports_first_unresolved_reference() {
        let err = transform(&dangling(), UnresolvedPolicy::Fail).unwrap_err();
        assert_eq!(
            err,
            UnresolvedReference::MissingUser {
                list_id: "L1".to_string(),
                member_id: "missing".to_string(),
            }
        );

        let mut d = dangling();
        d.lists[0].member_ids.retain(|m| m != "missing");
        let err = transform(&d, UnresolvedPolicy::Fail).unwrap_err();
        assert!(matches!(err, UnresolvedReference::MissingClass { ref class_id, .. } if class_id == "c404"));
    }

    #[test]
    fn first_record_wins_on_duplicate_ids() {
        let d = doc(json!({
            "date": "d",
            "time": "t",
            "classes": [{"id": "c1", "v": "rogue"}, {"id": "c1", "v": "priest"}],
            "users": [
                {"id": "u1", "n": "First", "c": "c1"},
                {"id": "u1", "n": "Second", "c": "c1"}
            ],
            "lists": [{"id": "L1", "n": "Main", "users": ["u1"]}]
        }));
        let rosters = transform(&d, UnresolvedPolicy::Skip).unwrap();
        assert_eq!(rosters[0].rows, vec![row("First", "Rogue")]);
    }

    #[test]
    fn empty_list_yields_empty_roster() {
        let mut d = sample();
        d.lists[0].member_ids.clear();
        let rosters = transform(&d, UnresolvedPolicy::Fail).unwrap();
        assert_eq!(rosters.len(), 1);
        assert!(rosters[0].rows.is_empty());
    }

    #[test]
    fn parses_policy_names() {
        assert_eq!("skip".parse::<UnresolvedPolicy>(), Ok(UnresolvedPolicy::Skip));
        assert_eq!(" Placeholder ".parse::<UnresolvedPolicy>(), Ok(UnresolvedPolicy::Placeholder));
        assert_eq!("strict".parse::<UnresolvedPolicy>(), Ok(UnresolvedPolicy::Fail));
        assert!("loud".parse::<UnresolvedPolicy>().is_err());
    }
}
