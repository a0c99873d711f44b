//! Page → Telegram HTML.
//!
//! Each page becomes one message: bold title, an optional "Last Updated"
//! line, a monospace table with name / class / position columns, and an
//! `ID:` footer used to correlate postings of the same list.

use crate::{config::Limits, errors::Error, paginate::Page, Result};

pub const FOOTER_PREFIX: &str = "ID: ";

const NAME_HEADER: &str = "Name";
const CLASS_HEADER: &str = "Class";
const POSITION_HEADER: &str = "#";

/// Escape HTML special characters for Telegram HTML parse mode.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn width(s: &str) -> usize {
    s.chars().count()
}

fn pad_right(s: &str, w: usize) -> String {
    let fill = w.saturating_sub(width(s));
    format!("{s}{}", " ".repeat(fill))
}

fn pad_left(s: &str, w: usize) -> String {
    let fill = w.saturating_sub(width(s));
    format!("{}{s}", " ".repeat(fill))
}

fn column_width(values: &[&str], header: &str) -> usize {
    values
        .iter()
        .map(|s| width(s))
        .max()
        .unwrap_or(0)
        .max(width(header))
}

/// Render one page as a Telegram HTML message.
///
/// Fails with [`Error::RenderBudget`] when a column or the whole message
/// exceeds the configured character budgets; page size keeps this rare but
/// cannot rule it out for very long names.
pub fn render_page(page: &Page, limits: &Limits) -> Result<String> {
    let positions: Vec<String> = page.rows.iter().map(|r| r.position.to_string()).collect();

    let columns: [(&'static str, Vec<&str>); 3] = [
        (
            "name",
            page.rows.iter().map(|r| r.character_name.as_str()).collect(),
        ),
        (
            "class",
            page.rows.iter().map(|r| r.class_name.as_str()).collect(),
        ),
        ("position", positions.iter().map(String::as_str).collect()),
    ];
    for (field, values) in &columns {
        let len = width(&values.join("\n"));
        if len > limits.field_char_limit {
            return Err(budget_error(page, *field, len, limits.field_char_limit));
        }
    }

    let mut out = format!("<b>{}</b>\n", escape_html(&page.title));
    if let Some(label) = &page.updated_label {
        out.push_str(&format!("<i>Last Updated:</i> {}\n", escape_html(label)));
    }

    if page.rows.is_empty() {
        out.push_str("\n<i>No characters on this list.</i>\n");
    } else {
        let [(_, names), (_, classes), (_, positions)] = &columns;
        let name_w = column_width(names, NAME_HEADER);
        let class_w = column_width(classes, CLASS_HEADER);
        let pos_w = column_width(positions, POSITION_HEADER);

        let mut table = vec![format!(
            "{}  {}  {}",
            pad_right(NAME_HEADER, name_w),
            pad_right(CLASS_HEADER, class_w),
            pad_left(POSITION_HEADER, pos_w)
        )];
        for ((name, class), pos) in names.iter().zip(classes).zip(positions) {
            table.push(format!(
                "{}  {}  {}",
                pad_right(name, name_w),
                pad_right(class, class_w),
                pad_left(pos, pos_w)
            ));
        }

        out.push_str("<pre>");
        out.push_str(&escape_html(&table.join("\n")));
        out.push_str("</pre>\n");
    }

    out.push_str(&format!(
        "<i>{FOOTER_PREFIX}{}</i>",
        escape_html(&page.footer_id)
    ));

    let len = width(&out);
    if len > limits.message_char_limit {
        return Err(budget_error(page, "message", len, limits.message_char_limit));
    }
    Ok(out)
}

fn budget_error(page: &Page, field: &'static str, len: usize, limit: usize) -> Error {
    Error::RenderBudget {
        roster_id: page.footer_id.clone(),
        field,
        len,
        limit,
    }
}
