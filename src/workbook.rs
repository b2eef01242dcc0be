use std::fmt;
use std::path::Path;

use calamine::{Data, Reader};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use tracing::{debug, warn};

use crate::error::{FolioError, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Number(f64),
    Text(String),
    Bool(bool),
    DateTime(NaiveDateTime),
    /// Cached formula error such as `#REF!` or `#N/A`.
    Error(String),
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            // Integral numbers render without a trailing ".0" so codes typed as
            // numbers (scheme ids, security codes) read back as written.
            Cell::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            Cell::Number(n) => write!(f, "{n}"),
            Cell::Text(s) => f.write_str(s),
            Cell::Bool(b) => write!(f, "{b}"),
            Cell::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
            Cell::Error(e) => f.write_str(e),
        }
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        if s.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(s.to_string())
        }
    }
}

impl From<f64> for Cell {
    fn from(n: f64) -> Self {
        Cell::Number(n)
    }
}

pub type Row = Vec<Cell>;

#[derive(Debug, Clone)]
pub struct Sheet {
    pub name: String,
    pub rows: Vec<Row>,
    /// Set when the container listed the sheet but its cells could not be decoded.
    pub read_error: Option<String>,
}

impl Sheet {
    pub fn new(name: impl Into<String>, rows: Vec<Row>) -> Self {
        Self {
            name: name.into(),
            rows,
            read_error: None,
        }
    }

    pub fn unreadable(name: impl Into<String>, err: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rows: Vec::new(),
            read_error: Some(err.into()),
        }
    }

    /// Cell at absolute (row, col); out-of-range positions read as empty.
    pub fn cell(&self, row: usize, col: usize) -> &Cell {
        static EMPTY: Cell = Cell::Empty;
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&EMPTY)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Workbook {
    pub sheets: Vec<Sheet>,
}

impl Workbook {
    pub fn new(sheets: Vec<Sheet>) -> Self {
        Self { sheets }
    }

    /// Read every sheet of an `.xlsx`/`.xlsm`/`.xls`/`.ods` file with cached
    /// formula values resolved.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(FolioError::FileNotFound(path.to_path_buf()));
        }
        let mut book = calamine::open_workbook_auto(path)?;
        let names = book.sheet_names().to_vec();
        let mut sheets = Vec::with_capacity(names.len());

        for name in names {
            match book.worksheet_range(&name) {
                Ok(range) => {
                    let rows = range_to_rows(&range);
                    debug!(sheet = %name, rows = rows.len(), "loaded sheet");
                    sheets.push(Sheet::new(name, rows));
                }
                Err(e) => {
                    warn!(sheet = %name, "unreadable sheet: {e}");
                    sheets.push(Sheet::unreadable(name, e.to_string()));
                }
            }
        }
        Ok(Self { sheets })
    }

    pub fn sheet_names(&self) -> impl Iterator<Item = &str> {
        self.sheets.iter().map(|s| s.name.as_str())
    }

    /// First sheet whose name matches one of `candidates`, compared
    /// case-insensitively and in candidate order.
    pub fn find_sheet(&self, candidates: &[&str]) -> Option<&Sheet> {
        candidates.iter().find_map(|c| {
            self.sheets
                .iter()
                .find(|s| s.name.trim().eq_ignore_ascii_case(c))
        })
    }
}

/// calamine ranges start at the first used cell; pad so indices are absolute.
fn range_to_rows(range: &calamine::Range<Data>) -> Vec<Row> {
    let Some((start_row, start_col)) = range.start() else {
        return Vec::new();
    };
    let mut rows: Vec<Row> = Vec::with_capacity(start_row as usize + range.height());
    rows.resize_with(start_row as usize, Vec::new);
    for r in range.rows() {
        let mut row: Row = Vec::with_capacity(start_col as usize + r.len());
        row.resize(start_col as usize, Cell::Empty);
        row.extend(r.iter().map(convert_cell));
        rows.push(row);
    }
    rows
}

fn convert_cell(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Float(f) => Cell::Number(*f),
        Data::String(s) => Cell::Text(s.clone()),
        Data::Bool(b) => Cell::Bool(*b),
        Data::DateTime(dt) => excel_serial_to_datetime(dt.as_f64())
            .map(Cell::DateTime)
            .unwrap_or(Cell::Number(dt.as_f64())),
        Data::DateTimeIso(s) => NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
            .map(Cell::DateTime)
            .unwrap_or_else(|_| Cell::Text(s.clone())),
        Data::DurationIso(s) => Cell::Text(s.clone()),
        Data::Error(e) => Cell::Error(e.to_string()),
    }
}

pub fn excel_serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    // Excel epoch is 1899-12-30 (accounting for the 1900 leap year bug)
    let base = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    let days = serial.trunc() as i64;
    let secs = ((serial - serial.trunc()) * 86_400.0).round() as i64;
    base.checked_add_signed(Duration::days(days) + Duration::seconds(secs))
}
