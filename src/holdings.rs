use std::collections::HashMap;

use anyhow::{bail, Result};
use tracing::debug;

use crate::amc::AmcProfile;
use crate::cells::{cell_text, to_clean_string, to_int, to_number};
use crate::workbook::{Cell, Row, Sheet};

#[derive(Debug, Clone, PartialEq)]
pub struct Holding {
    pub scheme_short_code: String,
    pub isin: String,
    pub security_name: String,
    pub industry: Option<String>,
    pub quantity: Option<f64>,
    /// Rupees in lakhs.
    pub market_value: Option<f64>,
    pub pct_to_nav: Option<f64>,
}

impl Holding {
    /// Add another lot of the same security. A missing value on either side
    /// keeps the other; two missing values stay missing.
    fn absorb(&mut self, other: &Holding) {
        self.quantity = sum_opt(self.quantity, other.quantity);
        self.market_value = sum_opt(self.market_value, other.market_value);
        self.pct_to_nav = sum_opt(self.pct_to_nav, other.pct_to_nav);
    }
}

fn sum_opt(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    match (a, b) {
        (Some(x), Some(y)) => Some(x + y),
        (x, None) => x,
        (None, y) => y,
    }
}

pub fn is_valid_isin(raw: &str, prefixes: &[&str]) -> bool {
    let bytes = raw.as_bytes();
    bytes.len() == 12
        && bytes.iter().all(u8::is_ascii_alphanumeric)
        && bytes[..2].iter().all(u8::is_ascii_alphabetic)
        && (prefixes.is_empty() || prefixes.iter().any(|p| raw.starts_with(p)))
}

fn contains_phrase(haystack: &str, needle: &str) -> bool {
    haystack.match_indices(needle).any(|(start, m)| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + m.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}

fn is_end_marker(text: &str, profile: &AmcProfile) -> bool {
    let lower = text.trim().to_lowercase();
    profile.end_exact.iter().any(|m| lower == *m)
        || profile.end_prefixes.iter().any(|p| lower.starts_with(p))
        || profile.end_phrases.iter().any(|p| contains_phrase(&lower, p))
}

fn isin_of(row: &Row, profile: &AmcProfile) -> Option<String> {
    row.get(profile.columns.isin)
        .and_then(to_clean_string)
        .filter(|isin| is_valid_isin(isin, profile.isin_prefixes))
}

fn field<'a>(row: &'a Row, col: usize) -> &'a Cell {
    static EMPTY: Cell = Cell::Empty;
    row.get(col).unwrap_or(&EMPTY)
}

/// Read holding rows from `start` until the section's end marker.
///
/// Blank spacer rows and rows without a valid ISIN are skipped. A formula
/// error in a mapped cell of an otherwise valid row fails the whole sheet.
pub fn extract_holdings(
    sheet: &Sheet,
    start: usize,
    profile: &AmcProfile,
    short_code: &str,
) -> Result<Vec<Holding>> {
    let cols = &profile.columns;
    let mut holdings: Vec<Holding> = Vec::new();
    let mut by_isin: HashMap<String, usize> = HashMap::new();

    for (i, row) in sheet.rows.iter().enumerate().skip(start) {
        let markers: Vec<String> = profile
            .end_columns
            .iter()
            .filter_map(|&col| row.get(col).and_then(cell_text))
            .collect();
        if markers.is_empty() {
            continue;
        }

        let isin = isin_of(row, profile);
        if markers.iter().any(|m| is_end_marker(m, profile))
            && !(profile.end_requires_missing_isin && isin.is_some())
        {
            debug!("  {}: section ends at row {}", sheet.name, i + 1);
            break;
        }

        let Some(name) = to_clean_string(field(row, cols.name)) else {
            continue;
        };
        let Some(isin) = isin else {
            if let Cell::Error(e) = field(row, cols.isin) {
                bail!("{}: row {}: ISIN cell holds {e}", sheet.name, i + 1);
            }
            debug!("  {}: row {} has no valid ISIN", sheet.name, i + 1);
            continue;
        };
        if profile
            .required_columns
            .iter()
            .any(|&col| to_clean_string(field(row, col)).is_none())
        {
            continue;
        }
        for (label, col) in [
            ("quantity", cols.quantity),
            ("market value", cols.market_value),
            ("% to NAV", cols.pct_to_nav),
        ] {
            if let Cell::Error(e) = field(row, col) {
                bail!("{}: row {}: {label} cell holds {e}", sheet.name, i + 1);
            }
        }

        let quantity = if profile.integral_quantity {
            to_int(field(row, cols.quantity)).map(|q| q as f64)
        } else {
            to_number(field(row, cols.quantity))
        };
        let holding = Holding {
            scheme_short_code: short_code.to_string(),
            isin,
            security_name: name,
            industry: to_clean_string(field(row, cols.industry)),
            quantity,
            market_value: to_number(field(row, cols.market_value)),
            pct_to_nav: to_number(field(row, cols.pct_to_nav)),
        };

        match by_isin.get(&holding.isin) {
            Some(&idx) => {
                debug!("  {}: merging split lot of {}", sheet.name, holding.isin);
                holdings[idx].absorb(&holding);
            }
            None => {
                by_isin.insert(holding.isin.clone(), holdings.len());
                holdings.push(holding);
            }
        }
    }

    Ok(holdings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amc::AmcKind;

    fn axis_row(name: &str, isin: &str, qty: Cell, value: Cell, pct: Cell) -> Row {
        vec![
            Cell::Empty,
            Cell::from(name),
            Cell::from(isin),
            Cell::from("Banks"),
            qty,
            value,
            pct,
        ]
    }

    fn holding_rows(rows: Vec<Row>) -> Sheet {
        Sheet::new("AXEF", rows)
    }

    #[test]
    fn test_isin_validation() {
        assert!(is_valid_isin("INE012A01020", &[]));
        assert!(is_valid_isin("US0378331005", &[]));
        assert!(is_valid_isin("INE012A01020", &["INE"]));
        assert!(!is_valid_isin("US0378331005", &["INE"]));
        assert!(!is_valid_isin("INE012A0102", &[]));
        assert!(!is_valid_isin("INE012A010200", &[]));
        assert!(!is_valid_isin("", &[]));
        assert!(!is_valid_isin("12E012A01020", &[]));
        assert!(!is_valid_isin("INE012A0102-", &[]));
    }

    #[test]
    fn test_extracts_until_total() {
        let sheet = holding_rows(vec![
            axis_row("HDFC Bank Limited", "INE040A01034", 100.0.into(), 50.5.into(), 2.3.into()),
            vec![],
            axis_row("Infosys Limited", "INE009A01021", 10.0.into(), 15.0.into(), 0.7.into()),
            axis_row("Total", "", Cell::Empty, 65.5.into(), 3.0.into()),
            axis_row("Reliance Industries", "INE002A01018", 1.0.into(), 1.0.into(), 0.1.into()),
        ]);
        let h = extract_holdings(&sheet, 0, AmcKind::Axis.profile(), "AXEF").unwrap();
        assert_eq!(h.len(), 2);
        assert_eq!(h[0].isin, "INE040A01034");
        assert_eq!(h[0].quantity, Some(100.0));
        assert_eq!(h[0].market_value, Some(50.5));
        assert_eq!(h[0].industry.as_deref(), Some("Banks"));
        assert_eq!(h[1].scheme_short_code, "AXEF");
    }

    #[test]
    fn test_noise_rows_skipped_not_terminal() {
        let sheet = holding_rows(vec![
            axis_row("Name of the Instrument", "ISIN", Cell::from("Quantity"), Cell::Empty, Cell::Empty),
            axis_row("Shifted Row", "INE040A0103", 1.0.into(), 1.0.into(), 1.0.into()),
            axis_row("HDFC Bank Limited", "INE040A01034", 100.0.into(), 50.5.into(), 2.3.into()),
        ]);
        let h = extract_holdings(&sheet, 0, AmcKind::Axis.profile(), "AXEF").unwrap();
        assert_eq!(h.len(), 1);
    }

    #[test]
    fn test_company_named_like_marker_is_kept() {
        let sheet = holding_rows(vec![
            axis_row("Adani Total Gas Limited", "INE399L01023", 5.0.into(), 1.0.into(), 0.1.into()),
            axis_row("Sub Total", "", Cell::Empty, Cell::Empty, Cell::Empty),
        ]);
        let h = extract_holdings(&sheet, 0, AmcKind::Axis.profile(), "AXEF").unwrap();
        assert_eq!(h.len(), 1);
        assert_eq!(h[0].security_name, "Adani Total Gas Limited");
    }

    #[test]
    fn test_phrase_markers_match_whole_words() {
        let p = AmcKind::Sbi.profile();
        assert!(is_end_marker("Others", p));
        assert!(is_end_marker("b) Unlisted", p));
        assert!(is_end_marker("Debt Instruments", p));
        assert!(!is_end_marker("Brothers Industries", p));
        assert!(!is_end_marker("Totality Ltd", p));
    }

    #[test]
    fn test_duplicate_isin_summed() {
        let sheet = holding_rows(vec![
            axis_row("HDFC Bank Limited", "INE040A01034", 100.0.into(), 50.0.into(), 2.0.into()),
            axis_row("HDFC Bank Limited", "INE040A01034", 50.0.into(), 25.0.into(), 1.0.into()),
        ]);
        let h = extract_holdings(&sheet, 0, AmcKind::Axis.profile(), "AXEF").unwrap();
        assert_eq!(h.len(), 1);
        assert_eq!(h[0].quantity, Some(150.0));
        assert_eq!(h[0].market_value, Some(75.0));
        assert_eq!(h[0].pct_to_nav, Some(3.0));
    }

    #[test]
    fn test_duplicate_isin_none_safe() {
        let sheet = holding_rows(vec![
            axis_row("HDFC Bank Limited", "INE040A01034", 100.0.into(), Cell::Empty, Cell::Empty),
            axis_row("HDFC Bank Limited", "INE040A01034", Cell::from("NIL"), Cell::Empty, 1.0.into()),
        ]);
        let h = extract_holdings(&sheet, 0, AmcKind::Axis.profile(), "AXEF").unwrap();
        assert_eq!(h[0].quantity, Some(100.0));
        assert_eq!(h[0].market_value, None);
        assert_eq!(h[0].pct_to_nav, Some(1.0));
    }

    #[test]
    fn test_integral_quantity_truncates() {
        let sheet = holding_rows(vec![axis_row(
            "HDFC Bank Limited",
            "INE040A01034",
            Cell::from("1,234.9"),
            1.0.into(),
            1.0.into(),
        )]);
        let h = extract_holdings(&sheet, 0, AmcKind::Axis.profile(), "AXEF").unwrap();
        assert_eq!(h[0].quantity, Some(1234.0));
    }

    #[test]
    fn test_formula_error_fails_sheet() {
        let sheet = holding_rows(vec![axis_row(
            "HDFC Bank Limited",
            "INE040A01034",
            Cell::Error("#REF!".into()),
            1.0.into(),
            1.0.into(),
        )]);
        let err = extract_holdings(&sheet, 0, AmcKind::Axis.profile(), "AXEF").unwrap_err();
        assert!(err.to_string().contains("#REF!"));
    }

    #[test]
    fn test_kotak_total_in_industry_column() {
        let row = |name: &str, isin: &str, industry: &str| -> Row {
            vec![
                Cell::Empty,
                Cell::Empty,
                Cell::from(name),
                Cell::from(isin),
                Cell::from(industry),
                Cell::Empty,
                Cell::from(10.0),
                Cell::from(5.0),
                Cell::from(0.5),
            ]
        };
        let sheet = Sheet::new(
            "KOTAK",
            vec![
                row("Infosys Ltd.", "INE009A01021", "IT - Software"),
                row("", "", "Total"),
                row("Wipro Ltd.", "INE075A01022", "IT - Software"),
            ],
        );
        let h = extract_holdings(&sheet, 0, AmcKind::Kotak.profile(), "KOTAK").unwrap();
        assert_eq!(h.len(), 1);
    }

    #[test]
    fn test_sbi_requires_security_code() {
        let row = |code: &str, isin: &str| -> Row {
            vec![
                Cell::Empty,
                Cell::from(code),
                Cell::from("State Bank of India"),
                Cell::from(isin),
                Cell::from("Banks"),
                Cell::from(10.0),
                Cell::from(5.0),
                Cell::from(0.5),
            ]
        };
        let sheet = Sheet::new("SBIBCF", vec![row("", "INE062A01020"), row("SBIN", "INE062A01020")]);
        let h = extract_holdings(&sheet, 0, AmcKind::Sbi.profile(), "SBIBCF").unwrap();
        assert_eq!(h.len(), 1);
        assert_eq!(h[0].quantity, Some(10.0));
    }

    #[test]
    fn test_prefix_filter_for_domestic_only_layouts() {
        let row = |isin: &str| -> Row {
            vec![
                Cell::from("Some Company"),
                Cell::from(isin),
                Cell::from("Banks"),
                Cell::from(10.5),
                Cell::from(5.0),
                Cell::from(0.5),
            ]
        };
        let sheet = Sheet::new("EDEL", vec![row("US0378331005"), row("INE062A01020")]);
        let h = extract_holdings(&sheet, 0, AmcKind::Edelweiss.profile(), "EDEL").unwrap();
        assert_eq!(h.len(), 1);
        assert_eq!(h[0].quantity, Some(10.5));
    }
}
