use std::fmt;

use tracing::debug;

use crate::amc::AmcProfile;
use crate::cells::cell_text;
use crate::workbook::Sheet;

/// Why a sheet produced no holdings. None of these are errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NoEquitySection,
    /// A debt, money-market or similar header followed the equity header
    /// before any listed subsection.
    NonEquityAllocation,
    NoListedSubsection,
    /// The listed subsection is present but explicitly marked NIL.
    NilSection,
    /// The subsection was found but no row carried a valid ISIN.
    NoHoldings,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NoEquitySection => "no equity section",
            Self::NonEquityAllocation => "non-equity allocation only",
            Self::NoListedSubsection => "no listed subsection",
            Self::NilSection => "listed equity is NIL",
            Self::NoHoldings => "no valid holding rows",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Located { data_start: usize },
    Skipped(SkipReason),
}

fn descriptive_text<'a>(
    sheet: &'a Sheet,
    row: usize,
    columns: &'a [usize],
) -> impl Iterator<Item = String> + 'a {
    let cells = sheet.rows.get(row);
    columns
        .iter()
        .filter_map(move |&col| cells.and_then(|r| r.get(col)).and_then(cell_text))
}

fn is_equity_header(text: &str) -> bool {
    let upper = text.to_uppercase();
    upper.contains("EQUITY") && upper.contains("RELATED")
}

fn is_listed_marker(text: &str, profile: &AmcProfile) -> bool {
    let lower = text.to_lowercase();
    let anchored = profile
        .listed_anchor
        .map_or(true, |anchor| lower.contains(anchor));
    anchored && profile.listed_keywords.iter().any(|k| lower.contains(k))
}

fn is_non_equity(text: &str, profile: &AmcProfile) -> bool {
    let lower = text.to_lowercase();
    profile.non_equity_markers.iter().any(|m| lower.contains(m))
}

fn is_nil(sheet: &Sheet, row: usize, profile: &AmcProfile) -> bool {
    let Some(col) = profile.nil_column else {
        return false;
    };
    // Some layouts put NIL on the marker row, others on the row below it.
    [row, row + 1].iter().any(|&r| {
        cell_text(sheet.cell(r, col)).is_some_and(|s| s.eq_ignore_ascii_case("nil"))
    })
}

/// Locate the listed-equity block of `sheet`.
pub fn locate_listed_equity(sheet: &Sheet, profile: &AmcProfile) -> Section {
    let Some(equity_row) = (0..sheet.rows.len()).find(|&i| {
        descriptive_text(sheet, i, profile.equity_columns).any(|t| is_equity_header(&t))
    }) else {
        return Section::Skipped(SkipReason::NoEquitySection);
    };
    debug!("  {}: equity header at row {}", sheet.name, equity_row + 1);

    let window_end = (equity_row + 1 + profile.listed_window).min(sheet.rows.len());
    for i in equity_row + 1..window_end {
        for text in descriptive_text(sheet, i, profile.listed_columns) {
            if is_non_equity(&text, profile) {
                debug!("  {}: '{text}' follows the equity header", sheet.name);
                return Section::Skipped(SkipReason::NonEquityAllocation);
            }
            if is_listed_marker(&text, profile) {
                if is_nil(sheet, i, profile) {
                    return Section::Skipped(SkipReason::NilSection);
                }
                debug!("  {}: listed subsection at row {}", sheet.name, i + 1);
                return Section::Located { data_start: i + 1 };
            }
        }
    }
    Section::Skipped(SkipReason::NoListedSubsection)
}
