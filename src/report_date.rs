use std::sync::OnceLock;

use chrono::{Local, NaiveDate};
use regex::Regex;
use tracing::{debug, warn};

use crate::amc::AmcProfile;
use crate::cells::{cell_text, parse_date_text, to_date};
use crate::workbook::{Cell, Sheet, Workbook};

pub trait Clock {
    fn today(&self) -> NaiveDate;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

#[cfg(test)]
pub struct FixedClock(pub NaiveDate);

#[cfg(test)]
impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateSource {
    Override,
    IndexSheet,
    FirstSheet,
    /// Nothing in the workbook matched; the run date was used instead.
    Clock,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedDate {
    pub value: String,
    pub source: DateSource,
}

impl ResolvedDate {
    pub fn is_fallback(&self) -> bool {
        self.source == DateSource::Clock
    }
}

fn phrase_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            // as on 31 Jan 2026 / as on 31-January-2026
            r"(?i)\bas\s+on\s*:?\s*(\d{1,2})(?:st|nd|rd|th)?[\s\-]+([A-Za-z]{3,9})[\s\-,]+(\d{4})",
            // as on January 31, 2026 / as on January 31,2026
            r"(?i)\bas\s+on\s*:?\s*([A-Za-z]{3,9})\s+(\d{1,2})(?:st|nd|rd|th)?\s*,?\s*(\d{4})",
            // as on 31/01/2026 / as on 31-01-2026
            r"(?i)\bas\s+on\s*:?\s*(\d{1,2})[\-/.](\d{1,2})[\-/.](\d{4})",
        ]
        .iter()
        .filter_map(|p| Regex::new(p).ok())
        .collect()
    })
}

pub fn date_from_phrase(text: &str) -> Option<String> {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let patterns = phrase_patterns();

    if let Some(c) = patterns.first().and_then(|p| p.captures(&collapsed)) {
        if let Some(d) = parse_date_text(&format!("{} {} {}", &c[1], &c[2], &c[3])) {
            return Some(d);
        }
    }
    if let Some(c) = patterns.get(1).and_then(|p| p.captures(&collapsed)) {
        if let Some(d) = parse_date_text(&format!("{} {}, {}", &c[1], &c[2], &c[3])) {
            return Some(d);
        }
    }
    if let Some(c) = patterns.get(2).and_then(|p| p.captures(&collapsed)) {
        let (day, month, year) = (c[1].parse().ok()?, c[2].parse().ok()?, c[3].parse().ok()?);
        return NaiveDate::from_ymd_opt(year, month, day).map(|d| d.format("%Y-%m-%d").to_string());
    }
    None
}

fn date_from_cell(cell: &Cell, profile: &AmcProfile) -> Option<String> {
    if let Cell::DateTime(_) = cell {
        return if profile.bare_date_cells { to_date(cell) } else { None };
    }
    let text = cell_text(cell)?;
    if text.to_lowercase().contains("as on") {
        return date_from_phrase(&text);
    }
    if profile.bare_date_cells {
        return parse_date_text(&text);
    }
    None
}

fn scan_sheet(sheet: &Sheet, profile: &AmcProfile) -> Option<String> {
    sheet
        .rows
        .iter()
        .take(profile.date_scan_rows)
        .flat_map(|row| row.iter())
        .find_map(|cell| date_from_cell(cell, profile))
}

fn from_index_sheet(workbook: &Workbook, profile: &AmcProfile) -> Option<String> {
    if profile.index_sheets.is_empty() {
        return None;
    }
    scan_sheet(workbook.find_sheet(profile.index_sheets)?, profile)
}

fn from_first_sheet(workbook: &Workbook, profile: &AmcProfile) -> Option<String> {
    let sheet = workbook.sheets.iter().find(|s| {
        !profile
            .index_sheets
            .iter()
            .chain(profile.ignored_sheets)
            .any(|aux| s.name.trim().eq_ignore_ascii_case(aux))
    })?;
    scan_sheet(sheet, profile)
}

type DateResolver = fn(&Workbook, &AmcProfile) -> Option<String>;

const DATE_RESOLVERS: &[(DateSource, DateResolver)] = &[
    (DateSource::IndexSheet, from_index_sheet),
    (DateSource::FirstSheet, from_first_sheet),
];

/// Pick the report date for a whole workbook.
///
/// An override is returned verbatim. Otherwise the index sheet and then the
/// first scheme sheet are scanned; if neither yields a date the clock's
/// current day is used and a warning is logged.
pub fn resolve_report_date(
    workbook: &Workbook,
    profile: &AmcProfile,
    date_override: Option<&str>,
    clock: &dyn Clock,
) -> ResolvedDate {
    if let Some(value) = date_override {
        return ResolvedDate {
            value: value.to_string(),
            source: DateSource::Override,
        };
    }
    for (source, resolver) in DATE_RESOLVERS {
        if let Some(value) = resolver(workbook, profile) {
            debug!("Report date {value} from {source:?}");
            return ResolvedDate {
                value,
                source: *source,
            };
        }
    }
    let value = clock.today().format("%Y-%m-%d").to_string();
    warn!("Could not extract report date, using current date {value}");
    ResolvedDate {
        value,
        source: DateSource::Clock,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amc::AmcKind;

    fn clock() -> FixedClock {
        FixedClock(NaiveDate::from_ymd_opt(2026, 3, 15).unwrap())
    }

    fn titled_sheet(name: &str, title: &str) -> Sheet {
        Sheet::new(
            name,
            vec![vec![Cell::Empty], vec![Cell::Empty, Cell::from(title)]],
        )
    }

    #[test]
    fn test_date_from_phrase_layouts() {
        assert_eq!(
            date_from_phrase("PORTFOLIO STATEMENT as on 31 Jan 2026").as_deref(),
            Some("2026-01-31")
        );
        assert_eq!(
            date_from_phrase("Monthly Portfolio Statement as on January 31,2026").as_deref(),
            Some("2026-01-31")
        );
        assert_eq!(
            date_from_phrase("Portfolio AS   ON   30-Nov-2025").as_deref(),
            Some("2025-11-30")
        );
        assert_eq!(
            date_from_phrase("Portfolio as on 31/12/2025").as_deref(),
            Some("2025-12-31")
        );
        assert_eq!(date_from_phrase("Portfolio as on month end"), None);
        assert_eq!(date_from_phrase("no anchor 31 Jan 2026"), None);
    }

    #[test]
    fn test_override_wins_verbatim() {
        let wb = Workbook::new(vec![titled_sheet("S1", "as on 31 Jan 2026")]);
        let r = resolve_report_date(&wb, AmcKind::Axis.profile(), Some("whatever"), &clock());
        assert_eq!(r.value, "whatever");
        assert_eq!(r.source, DateSource::Override);
    }

    #[test]
    fn test_index_sheet_before_first_sheet() {
        let wb = Workbook::new(vec![
            titled_sheet("Index", "Portfolio as on 28 Feb 2025"),
            titled_sheet("S1", "Portfolio as on 31 Jan 2026"),
        ]);
        let r = resolve_report_date(&wb, AmcKind::Axis.profile(), None, &clock());
        assert_eq!(r.value, "2025-02-28");
        assert_eq!(r.source, DateSource::IndexSheet);
    }

    #[test]
    fn test_first_scheme_sheet_skips_auxiliary() {
        let wb = Workbook::new(vec![
            Sheet::new("Index", vec![]),
            titled_sheet("S1", "Monthly Portfolio Statement as on January 31, 2026"),
        ]);
        let r = resolve_report_date(&wb, AmcKind::Axis.profile(), None, &clock());
        assert_eq!(r.value, "2026-01-31");
        assert_eq!(r.source, DateSource::FirstSheet);
    }

    #[test]
    fn test_falls_back_to_clock() {
        let wb = Workbook::new(vec![
            Sheet::new("Index", vec![]),
            titled_sheet("S1", "Monthly Portfolio Statement"),
        ]);
        let r = resolve_report_date(&wb, AmcKind::Axis.profile(), None, &clock());
        assert_eq!(r.value, "2026-03-15");
        assert!(r.is_fallback());
    }

    #[test]
    fn test_bare_date_cells_only_when_profile_allows() {
        let dt = NaiveDate::from_ymd_opt(2025, 6, 30)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let wb = Workbook::new(vec![Sheet::new("S1", vec![vec![Cell::DateTime(dt)]])]);
        let sbi = resolve_report_date(&wb, AmcKind::Sbi.profile(), None, &clock());
        assert_eq!(sbi.value, "2025-06-30");
        let axis = resolve_report_date(&wb, AmcKind::Axis.profile(), None, &clock());
        assert!(axis.is_fallback());
    }

    #[test]
    fn test_scan_depth_is_bounded() {
        let mut rows = vec![vec![Cell::Empty]; 6];
        rows.push(vec![Cell::from("as on 31 Jan 2026")]);
        let wb = Workbook::new(vec![Sheet::new("S1", rows)]);
        // Axis scans three rows only
        let r = resolve_report_date(&wb, AmcKind::Axis.profile(), None, &clock());
        assert!(r.is_fallback());
    }
}
