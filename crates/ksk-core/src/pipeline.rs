//! bytes → decode → validate → transform → paginate → render.
//!
//! Every stage runs before anything is sent, so a bad export never produces
//! a partial posting.

use crate::{
    config::Limits,
    document::decode,
    paginate::{paginate, Page},
    render::render_page,
    transform::{transform, UnresolvedPolicy},
    validate::validate,
    Result,
};

/// Rendered messages for one roster, in posting order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RosterPosting {
    pub roster_id: String,
    pub pages: Vec<Page>,
    pub messages: Vec<String>,
}

pub fn prepare(
    bytes: &[u8],
    limits: &Limits,
    policy: UnresolvedPolicy,
) -> Result<Vec<RosterPosting>> {
    let raw = decode(bytes)?;
    let doc = validate(&raw, limits)?;
    let rosters = transform(&doc, policy)?;

    let mut out = Vec::with_capacity(rosters.len());
    for roster in &rosters {
        let pages = paginate(roster, limits.page_size);
        let messages = pages
            .iter()
            .map(|p| render_page(p, limits))
            .collect::<Result<Vec<_>>>()?;
        out.push(RosterPosting {
            roster_id: roster.id.clone(),
            pages,
            messages,
        });
    }

    tracing::info!(
        rosters = out.len(),
        messages = out.iter().map(|r| r.messages.len()).sum::<usize>(),
        "export prepared"
    );
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{errors::Error, validate::Rejection};
    use serde_json::json;

    fn bytes(v: serde_json::Value) -> Vec<u8> {
        serde_json::to_vec(&v).unwrap()
    }

    fn example() -> serde_json::Value {
        json!({
            "ksk": {
                "date": "2021-01-01",
                "time": "12:00",
                "classes": [{"id": "c1", "v": "warrior"}, {"id": "c2", "v": "druid"}],
                "users": [
                    {"id": "u1", "n": "Alice", "c": "c1"},
                    {"id": "u2", "n": "Bob", "c": "c2"}
                ],
                "lists": [
                    {"id": "L1", "n": "Tank", "users": ["u1", "u2"]},
                    {"id": "L2", "n": "Empty", "users": []}
                ]
            }
        })
    }

    #[test]
    fn end_to_end_example() {
        let out = prepare(&bytes(example()), &Limits::default(), UnresolvedPolicy::Skip).unwrap();
        assert_eq!(out.len(), 2);

        let tank = &out[0];
        assert_eq!(tank.roster_id, "L1");
        assert_eq!(tank.pages.len(), 1);
        let page = &tank.pages[0];
        assert_eq!(page.updated_label.as_deref(), Some("2021-01-01 12:00"));
        let rows: Vec<(usize, &str, &str)> = page
            .rows
            .iter()
            .map(|r| (r.position, r.character_name.as_str(), r.class_name.as_str()))
            .collect();
        assert_eq!(rows, vec![(1, "Alice", "Warrior"), (2, "Bob", "Druid")]);
        assert_eq!(tank.messages.len(), 1);
        assert!(tank.messages[0].contains("ID: L1"));

        let empty = &out[1];
        assert_eq!(empty.pages.len(), 1);
        assert!(empty.pages[0].rows.is_empty());
        assert_eq!(empty.messages.len(), 1);
    }

    #[test]
    fn large_list_spans_pages() {
        let users: Vec<_> = (0..120)
            .map(|i| json!({"id": format!("u{i}"), "n": format!("Char{i}"), "c": "c1"}))
            .collect();
        let ids: Vec<String> = (0..120).map(|i| format!("u{i}")).collect();
        let doc = json!({
            "date": "d", "time": "t",
            "classes": [{"id": "c1", "v": "hunter"}],
            "users": users,
            "lists": [{"id": "L1", "n": "Big", "users": ids}]
        });
        let out = prepare(&bytes(doc), &Limits::default(), UnresolvedPolicy::Skip).unwrap();
        assert_eq!(out[0].messages.len(), 3);
        let positions: Vec<usize> = out[0]
            .pages
            .iter()
            .flat_map(|p| p.rows.iter().map(|r| r.position))
            .collect();
        assert_eq!(positions, (1..=120).collect::<Vec<_>>());
    }

    #[test]
    fn classifies_each_failure() {
        let limits = Limits::default();

        let err = prepare(b"{oops", &limits, UnresolvedPolicy::Skip).unwrap_err();
        assert!(matches!(err, Error::Decode(_)));

        let err = prepare(&bytes(json!({"ksk": {}})), &limits, UnresolvedPolicy::Skip).unwrap_err();
        assert!(matches!(err, Error::Rejected(Rejection::MalformedShape { .. })));

        let mut doc = example();
        doc["ksk"]["lists"][0]["users"] = json!(["u1", "nobody"]);
        let err = prepare(&bytes(doc), &limits, UnresolvedPolicy::Fail).unwrap_err();
        assert!(matches!(err, Error::Unresolved(_)));
    }
}
