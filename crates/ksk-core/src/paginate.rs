//! Split rosters into bounded pages.

use crate::transform::Roster;

/// One postable unit of a roster.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Page {
    pub title: String,
    /// Only set on the first page of a roster.
    pub updated_label: Option<String>,
    pub rows: Vec<PageRow>,
    /// Roster id, threaded onto every page so stale postings can be found.
    pub footer_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageRow {
    /// 1-based, continuous across the roster's pages.
    pub position: usize,
    pub character_name: String,
    pub class_name: String,
}

/// Number of pages `paginate` produces for `rows` rows.
pub fn page_count(rows: usize, page_size: usize) -> usize {
    rows.max(1).div_ceil(page_size.max(1))
}

/// Split a roster into consecutive windows of at most `page_size` rows.
///
/// An empty roster still yields one (empty) page carrying the title, label
/// and footer. A `page_size` of 0 is treated as 1.
pub fn paginate(roster: &Roster, page_size: usize) -> Vec<Page> {
    let page_size = page_size.max(1);
    let mut pages = Vec::with_capacity(page_count(roster.rows.len(), page_size));

    let mut start = 0usize;
    loop {
        let end = (start + page_size).min(roster.rows.len());
        let rows = roster.rows[start..end]
            .iter()
            .enumerate()
            .map(|(offset, r)| PageRow {
                position: start + offset + 1,
                character_name: r.character_name.clone(),
                class_name: r.class_name.clone(),
            })
            .collect();

        pages.push(Page {
            title: roster.name.clone(),
            updated_label: (start == 0).then(|| roster.updated_label.clone()),
            rows,
            footer_id: roster.id.clone(),
        });

        start = end;
        if start >= roster.rows.len() {
            break;
        }
    }

    pages
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::RosterRow;

    fn roster(n: usize) -> Roster {
        Roster {
            id: "L1".to_string(),
            name: "Tank".to_string(),
            updated_label: "2021-01-01 12:00".to_string(),
            rows: (0..n)
                .map(|i| RosterRow {
                    character_name: format!("char{i}"),
                    class_name: "Warrior".to_string(),
                })
                .collect(),
        }
    }

    #[test]
    fn empty_roster_yields_one_empty_page() {
        let pages = paginate(&roster(0), 50);
        assert_eq!(pages.len(), 1);
        assert!(pages[0].rows.is_empty());
        assert_eq!(pages[0].title, "Tank");
        assert_eq!(pages[0].updated_label.as_deref(), Some("2021-01-01 12:00"));
        assert_eq!(pages[0].footer_id, "L1");
    }

    #[test]
    fn page_counts_follow_ceiling_rule() {
        for (rows, size, expected) in [
            (0, 50, 1),
            (1, 50, 1),
            (50, 50, 1),
            (51, 50, 2),
            (100, 50, 2),
            (101, 50, 3),
            (7, 3, 3),
        ] {
            assert_eq!(paginate(&roster(rows), size).len(), expected, "{rows}/{size}");
            assert_eq!(page_count(rows, size), expected);
        }
    }

    #[test]
    fn concatenated_pages_reproduce_rows_with_continuous_positions() {
        let r = roster(123);
        let pages = paginate(&r, 50);

        let all: Vec<&PageRow> = pages.iter().flat_map(|p| p.rows.iter()).collect();
        assert_eq!(all.len(), r.rows.len());
        for (i, (page_row, roster_row)) in all.iter().zip(&r.rows).enumerate() {
            assert_eq!(page_row.position, i + 1);
            assert_eq!(page_row.character_name, roster_row.character_name);
            assert_eq!(page_row.class_name, roster_row.class_name);
        }
        assert!(pages.iter().all(|p| p.rows.len() <= 50));
        assert_eq!(pages[2].rows[0].position, 101);
    }

    #[test]
    fn only_first_page_carries_label_and_every_page_carries_footer() {
        let pages = paginate(&roster(120), 50);
        assert!(pages[0].updated_label.is_some());
        assert!(pages[1..].iter().all(|p| p.updated_label.is_none()));
        assert!(pages.iter().all(|p| p.footer_id == "L1" && p.title == "Tank"));
    }

    #[test]
    fn zero_page_size_is_treated_as_one() {
        let pages = paginate(&roster(3), 0);
        assert_eq!(pages.len(), 3);
        assert!(pages.iter().all(|p| p.rows.len() == 1));
    }
}
