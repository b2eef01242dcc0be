use chrono::NaiveDate;

use crate::workbook::Cell;

pub const PLACEHOLDER_TOKENS: &[&str] = &["nil", "n/a", "#", "-", "total", "sub total"];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d",
    "%d-%m-%Y",
    "%d/%m/%Y",
    "%B %d, %Y",
    "%d-%b-%Y",
    "%d %B %Y",
    "%d %b %Y",
];

pub fn is_placeholder(s: &str) -> bool {
    let s = s.trim();
    PLACEHOLDER_TOKENS.iter().any(|t| s.eq_ignore_ascii_case(t))
}

/// Trimmed display text of a cell, `None` when blank. Unlike
/// [`to_clean_string`] this keeps placeholder tokens, so section markers
/// such as "Total" stay visible.
pub fn cell_text(cell: &Cell) -> Option<String> {
    let s = cell.to_string();
    let s = s.trim();
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

pub fn to_number(cell: &Cell) -> Option<f64> {
    match cell {
        Cell::Number(n) if n.is_finite() => Some(*n),
        Cell::Text(s) => parse_number(s),
        _ => None,
    }
}

fn parse_number(raw: &str) -> Option<f64> {
    let s = raw.trim();
    if s.is_empty() || is_placeholder(s) {
        return None;
    }
    let s = s.replace(',', "");
    s.parse::<f64>().ok().filter(|n| n.is_finite())
}

pub fn to_int(cell: &Cell) -> Option<i64> {
    to_number(cell).map(|n| n.trunc() as i64)
}

pub fn to_clean_string(cell: &Cell) -> Option<String> {
    cell_text(cell).filter(|s| !is_placeholder(s))
}

/// Normalize a cell to `YYYY-MM-DD`.
///
/// Structured date cells are formatted directly. Text is tried against
/// [`DATE_FORMATS`], then once more title-cased. When nothing matches the
/// trimmed text is returned unchanged.
pub fn to_date(cell: &Cell) -> Option<String> {
    match cell {
        Cell::Empty => None,
        Cell::DateTime(dt) => Some(dt.format("%Y-%m-%d").to_string()),
        other => {
            let raw = cell_text(other)?;
            Some(parse_date_text(&raw).unwrap_or(raw))
        }
    }
}

pub fn parse_date_text(raw: &str) -> Option<String> {
    let normalized = normalize_date_text(raw);
    try_formats(&normalized)
        .or_else(|| try_formats(&title_case(&normalized)))
        .map(|d| d.format("%Y-%m-%d").to_string())
}

fn normalize_date_text(raw: &str) -> String {
    // "January 31,2026" -> "January 31, 2026"
    let spaced = raw.trim().replace(',', ", ");
    spaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn try_formats(s: &str) -> Option<NaiveDate> {
    DATE_FORMATS.iter().find_map(|fmt| {
        if fmt.contains("%H") {
            chrono::NaiveDateTime::parse_from_str(s, fmt)
                .ok()
                .map(|dt| dt.date())
        } else {
            NaiveDate::parse_from_str(s, fmt).ok()
        }
    })
}

fn title_case(s: &str) -> String {
    s.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(|c| c.to_lowercase()))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
