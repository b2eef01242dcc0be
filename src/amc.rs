use std::path::Path;

use crate::cells::cell_text;
use crate::workbook::Workbook;

// ---------------------------------------------------------------------------
// Descriptor types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnMap {
    pub name: usize,
    pub isin: usize,
    pub industry: usize,
    pub quantity: usize,
    pub market_value: usize,
    pub pct_to_nav: usize,
}

/// Everything that differs between AMC layouts. The extraction stages read
/// these values; none of them branch on which AMC they are handling.
#[derive(Debug)]
pub struct AmcProfile {
    // Auxiliary index sheet
    pub index_sheets: &'static [&'static str],
    pub index_header_rows: usize,
    pub index_code_column: usize,
    pub index_name_column: usize,
    pub index_scheme_code_column: Option<usize>,
    /// Keep index rows that carry a code but no name (name comes from a fallback).
    pub index_keeps_unnamed: bool,
    pub ignored_sheets: &'static [&'static str],

    // Section locator
    pub equity_columns: &'static [usize],
    pub listed_columns: &'static [usize],
    pub listed_anchor: Option<&'static str>,
    pub listed_keywords: &'static [&'static str],
    /// Rows after the equity header searched for the listed marker.
    pub listed_window: usize,
    pub non_equity_markers: &'static [&'static str],
    /// Column that reads "NIL" on (or right after) the listed row when the
    /// fund holds no listed equity.
    pub nil_column: Option<usize>,

    // Holding rows
    pub columns: ColumnMap,
    pub end_columns: &'static [usize],
    pub end_exact: &'static [&'static str],
    pub end_prefixes: &'static [&'static str],
    pub end_phrases: &'static [&'static str],
    /// Only honour an end marker on rows without a well-formed ISIN.
    pub end_requires_missing_isin: bool,
    pub isin_prefixes: &'static [&'static str],
    pub required_columns: &'static [usize],
    pub integral_quantity: bool,
    pub industry_as_sector: bool,

    // Display name fallbacks
    pub static_names: &'static [(&'static str, &'static str)],
    pub title_cell: Option<(usize, usize)>,
    pub title_keyword: Option<&'static str>,

    // Report date
    pub date_scan_rows: usize,
    /// Accept a bare date cell (not just an "as on" phrase) in the header rows.
    pub bare_date_cells: bool,
}

const LISTED_KEYWORDS: &[&str] = &["listed", "awaiting"];
const NON_EQUITY: &[&str] = &[
    "debt",
    "money market",
    "government",
    "securitised",
    "treps",
    "derivatives",
];
const TOTALS: &[&str] = &["total", "sub total", "sub-total"];
const NEXT_SUBSECTIONS: &[&str] = &["(b)", "(c)", "(d)"];

// ---------------------------------------------------------------------------
// Profiles
// ---------------------------------------------------------------------------

static SBI: AmcProfile = AmcProfile {
    index_sheets: &["Index"],
    index_header_rows: 3,
    index_code_column: 1,
    index_name_column: 2,
    index_scheme_code_column: Some(0),
    index_keeps_unnamed: false,
    ignored_sheets: &[],
    equity_columns: &[2],
    listed_columns: &[2],
    // SBI writes "a) Listed/awaiting listing on Stock Exchanges"
    listed_anchor: Some("a)"),
    listed_keywords: LISTED_KEYWORDS,
    listed_window: 10,
    non_equity_markers: NON_EQUITY,
    nil_column: Some(6),
    columns: ColumnMap {
        name: 2,
        isin: 3,
        industry: 4,
        quantity: 5,
        market_value: 6,
        pct_to_nav: 7,
    },
    end_columns: &[2],
    end_exact: TOTALS,
    end_prefixes: &["b)", "c)", "d)", "(b)", "(c)", "(d)"],
    end_phrases: &["debt instruments", "money market", "others", "unlisted"],
    end_requires_missing_isin: false,
    isin_prefixes: &[],
    // internal security code
    required_columns: &[1],
    integral_quantity: true,
    industry_as_sector: true,
    static_names: &[],
    title_cell: Some((2, 3)),
    title_keyword: None,
    date_scan_rows: 5,
    bare_date_cells: true,
};

static AXIS: AmcProfile = AmcProfile {
    index_sheets: &["Index"],
    index_header_rows: 1,
    index_code_column: 1,
    index_name_column: 2,
    index_scheme_code_column: None,
    index_keeps_unnamed: false,
    ignored_sheets: &[],
    equity_columns: &[1],
    listed_columns: &[1],
    listed_anchor: Some("(a)"),
    listed_keywords: LISTED_KEYWORDS,
    listed_window: 9,
    non_equity_markers: NON_EQUITY,
    nil_column: None,
    columns: ColumnMap {
        name: 1,
        isin: 2,
        industry: 3,
        quantity: 4,
        market_value: 5,
        pct_to_nav: 6,
    },
    end_columns: &[1],
    end_exact: &["total", "sub total"],
    end_prefixes: &["(b)", "unlisted"],
    end_phrases: &[],
    end_requires_missing_isin: true,
    isin_prefixes: &[],
    required_columns: &[],
    integral_quantity: true,
    industry_as_sector: false,
    static_names: &[],
    title_cell: None,
    title_keyword: None,
    date_scan_rows: 3,
    bare_date_cells: false,
};

static KOTAK: AmcProfile = AmcProfile {
    index_sheets: &["Scheme"],
    index_header_rows: 2,
    index_code_column: 0,
    index_name_column: 1,
    index_scheme_code_column: None,
    index_keeps_unnamed: false,
    ignored_sheets: &["Common Notes"],
    equity_columns: &[0],
    listed_columns: &[1],
    listed_anchor: None,
    listed_keywords: &["listed/awaiting"],
    listed_window: 9,
    non_equity_markers: NON_EQUITY,
    nil_column: None,
    columns: ColumnMap {
        name: 2,
        isin: 3,
        industry: 4,
        quantity: 6,
        market_value: 7,
        pct_to_nav: 8,
    },
    // Kotak puts "Total" in the industry column.
    end_columns: &[2, 4],
    end_exact: &["total"],
    end_prefixes: NEXT_SUBSECTIONS,
    end_phrases: &["unlisted", "awaiting listing"],
    end_requires_missing_isin: false,
    isin_prefixes: &[],
    required_columns: &[],
    integral_quantity: true,
    industry_as_sector: false,
    static_names: &[],
    title_cell: None,
    title_keyword: None,
    date_scan_rows: 3,
    bare_date_cells: false,
};

static MOTILAL: AmcProfile = AmcProfile {
    index_sheets: &["Index"],
    index_header_rows: 4,
    index_code_column: 4,
    index_name_column: 3,
    index_scheme_code_column: None,
    index_keeps_unnamed: false,
    ignored_sheets: &[],
    equity_columns: &[0, 1],
    listed_columns: &[0, 1],
    listed_anchor: None,
    listed_keywords: &["listed"],
    listed_window: 10,
    non_equity_markers: NON_EQUITY,
    nil_column: None,
    columns: ColumnMap {
        name: 1,
        isin: 3,
        industry: 4,
        quantity: 5,
        market_value: 6,
        pct_to_nav: 7,
    },
    end_columns: &[1],
    end_exact: &["total", "sub total"],
    end_prefixes: &["(b)"],
    end_phrases: &[],
    end_requires_missing_isin: false,
    isin_prefixes: &["INE"],
    required_columns: &[],
    integral_quantity: false,
    industry_as_sector: false,
    static_names: MOTILAL_SCHEMES,
    title_cell: Some((0, 1)),
    title_keyword: Some("motilal"),
    date_scan_rows: 10,
    bare_date_cells: true,
};

static EDELWEISS: AmcProfile = AmcProfile {
    index_sheets: &["Index"],
    index_header_rows: 3,
    index_code_column: 0,
    index_name_column: 1,
    index_scheme_code_column: None,
    index_keeps_unnamed: false,
    ignored_sheets: &[],
    equity_columns: &[0],
    listed_columns: &[0],
    listed_anchor: Some("(a)"),
    listed_keywords: LISTED_KEYWORDS,
    listed_window: 10,
    non_equity_markers: NON_EQUITY,
    nil_column: None,
    columns: ColumnMap {
        name: 0,
        isin: 1,
        industry: 2,
        quantity: 3,
        market_value: 4,
        pct_to_nav: 5,
    },
    end_columns: &[0],
    end_exact: TOTALS,
    end_prefixes: &["(b)", "(c)"],
    end_phrases: &[],
    end_requires_missing_isin: false,
    isin_prefixes: &["INE"],
    required_columns: &[],
    integral_quantity: false,
    industry_as_sector: false,
    static_names: &[],
    title_cell: None,
    title_keyword: None,
    date_scan_rows: 3,
    bare_date_cells: true,
};

static NIPPON: AmcProfile = AmcProfile {
    index_sheets: &["Index", "INDEX"],
    index_header_rows: 1,
    index_code_column: 0,
    index_name_column: 1,
    index_scheme_code_column: None,
    index_keeps_unnamed: true,
    ignored_sheets: &[],
    equity_columns: &[2],
    listed_columns: &[2],
    listed_anchor: None,
    listed_keywords: &["listed / awaiting", "listed/awaiting"],
    listed_window: 9,
    non_equity_markers: NON_EQUITY,
    nil_column: Some(5),
    columns: ColumnMap {
        name: 2,
        isin: 1,
        industry: 3,
        quantity: 4,
        market_value: 5,
        pct_to_nav: 6,
    },
    end_columns: &[2],
    end_exact: &["total"],
    end_prefixes: NEXT_SUBSECTIONS,
    end_phrases: &["unlisted"],
    end_requires_missing_isin: false,
    isin_prefixes: &[],
    required_columns: &[],
    integral_quantity: true,
    industry_as_sector: false,
    static_names: &[],
    title_cell: Some((0, 1)),
    title_keyword: None,
    date_scan_rows: 5,
    bare_date_cells: false,
};

static BAJAJ: AmcProfile = AmcProfile {
    index_sheets: &[],
    index_header_rows: 0,
    index_code_column: 0,
    index_name_column: 1,
    index_scheme_code_column: None,
    index_keeps_unnamed: false,
    ignored_sheets: &[],
    equity_columns: &[1],
    listed_columns: &[1],
    listed_anchor: Some("(a)"),
    listed_keywords: LISTED_KEYWORDS,
    listed_window: 3,
    non_equity_markers: NON_EQUITY,
    nil_column: None,
    columns: ColumnMap {
        name: 1,
        isin: 2,
        industry: 3,
        quantity: 4,
        market_value: 5,
        pct_to_nav: 6,
    },
    end_columns: &[1],
    end_exact: TOTALS,
    end_prefixes: &["(b)", "(c)"],
    end_phrases: &[],
    end_requires_missing_isin: false,
    isin_prefixes: &["INE"],
    required_columns: &[],
    integral_quantity: false,
    industry_as_sector: false,
    static_names: &[],
    title_cell: Some((0, 1)),
    title_keyword: None,
    date_scan_rows: 3,
    bare_date_cells: false,
};

/// Motilal reuses stable sheet codes across releases, but several monthly
/// files ship without an Index sheet.
const MOTILAL_SCHEMES: &[(&str, &str)] = &[
    ("YO01", "Motilal Oswal Nifty 50 ETF (Formerly known as Motilal Oswal M50 ETF)"),
    ("YO02", "Motilal Oswal Nifty Midcap 100 ETF (Formerly known as Motilal Oswal Midcap 100 ETF)"),
    ("YO05", "Motilal Oswal Focused Fund (Formerly known as Motilal Oswal Focused 25 Fund)"),
    ("YO07", "Motilal Oswal Midcap Fund (Formerly known as Motilal Oswal Midcap 30 Fund)"),
    ("YO08", "Motilal Oswal Flexi Cap Fund"),
    ("YO09", "Motilal Oswal ELSS Tax Saver Fund (Formerly Known as Motilal Oswal Long Term Equity Fund)"),
    ("YO10", "Motilal Oswal Balanced Advantage Fund (Formerly known as Motilal Oswal Dynamic Fund)"),
    ("YO16", "Motilal Oswal Nifty Midcap 150 Index Fund"),
    ("YO17", "Motilal Oswal Nifty Smallcap 250 Index Fund"),
    ("YO18", "Motilal Oswal Nifty 500 Index Fund (Formerly known as Motilal Oswal Nifty 500 Fund)"),
    ("YO19", "Motilal Oswal Nifty Bank Index Fund"),
    ("YO20", "Motilal Oswal Large and Midcap Fund"),
    ("YO21", "Motilal Oswal Nifty 50 Index Fund"),
    ("YO22", "Motilal Oswal Nifty Next 50 Index Fund"),
    ("YO24", "Motilal Oswal Multi Asset Fund"),
    ("YO31", "Motilal Oswal Nifty 200 Momentum 30 ETF"),
    ("YO32", "Motilal Oswal Nifty 200 Momentum 30 Index Fund"),
    ("YO33", "Motilal OswalBSE Low Volatility ETF"),
    ("YO34", "Motilal OswalBSE Low Volatility Index Fund"),
    ("YO35", "Motilal OswalBSE Financials ex Bank 30 Index Fund"),
    ("YO36", "Motilal OswalBSE Healthcare ETF"),
    ("YO37", "Motilal OswalBSE Enhanced Value ETF"),
    ("YO38", "Motilal OswalBSE Enhanced Value Index Fund"),
    ("YO39", "Motilal OswalBSE Quality ETF"),
    ("YO40", "Motilal OswalBSE Quality Index Fund"),
    ("YO43", "Motilal Oswal Nifty Microcap 250 Index Fund"),
    ("YO45", "Motilal Oswal Nifty 500 ETF"),
    ("YO46", "Motilal Oswal Small Cap Fund"),
    ("YO47", "Motilal Oswal Large Cap Fund"),
    ("YO48", "Motilal Oswal Nifty Realty ETF"),
    ("YO49", "Motilal Oswal Nifty Smallcap 250 ETF"),
    ("YO50", "Motilal Oswal Quant Fund"),
    ("YO51", "Motilal Oswal Multicap Fund"),
    ("YO52", "Motilal Oswal Nifty India Defence Index Fund"),
    ("YO53", "Motilal Oswal Manufacturing Fund"),
    ("YO54", "Motilal Oswal Business Cycle Fund"),
    ("YO55", "Motilal Oswal Nifty India Defence ETF"),
    ("YO56", "Motilal Oswal Nifty 500 Momentum 50 Index Fund"),
    ("YO57", "Motilal Oswal Nifty 500 Momentum 50 ETF"),
    ("YO58", "Motilal Oswal Digital India Fund"),
    ("YO59", "Motilal Oswal Nifty MidSmall Fin Servs Index Fund"),
    ("YO60", "MO Nifty MidSmall India Consumption Index Fund"),
    ("YO61", "Motilal Oswal Nifty MidSmall Healthcare Index Fund"),
    ("YO62", "MO Nifty MidSmall IT and Telecom Index Fund"),
    ("YO63", "MO Nifty Capital Market Index Fund"),
    ("YO64", "Motilal Oswal Arbitrage Fund"),
    ("YO65", "Motilal Oswal Innovation Opportunities Fund"),
    ("YO66", "Motilal Oswal Active Momentum Fund"),
    ("YO67", "Motilal Oswal Nifty Capital Market ETF"),
    ("YO68", "Motilal Oswal Infrastructure Fund"),
    ("YO69", "Motilal Oswal Nifty 50 Equal Weight ETF"),
    ("YO70", "Motilal Oswal Nifty Next 50 ETF"),
    ("YO71", "Motilal Oswal BSE India Infrastructure ETF"),
    ("YO72", "Motilal Oswal Services Fund"),
    ("YO73", "Motilal Oswal Nifty India Manufacturing ETF"),
    ("YO74", "Motilal Oswal Nifty PSE ETF"),
    ("YO75", "Motilal Oswal Nifty India Tourism ETF"),
    ("YO76", "Motilal Oswal Nifty Midcap 150 Momentum 50 ETF"),
    ("YO77", "Motilal Oswal Nifty Alpha 50 ETF"),
    ("YO78", "Motilal Oswal BSE 1000 Index Fund"),
    ("YO80", "Motilal Oswal Special Opportunities Fund"),
    ("YO82", "Motilal Oswal Consumption Fund"),
    ("YO83", "Motilal Oswal Nifty 100 ETF"),
    ("YO84", "Motilal Oswal Nifty Energy ETF"),
    ("YO85", "Motilal Oswal BSE Select IPO ETF"),
    ("YO86", "Motilal Oswal Nifty Services Sector ETF"),
    ("YO87", "Motilal Oswal Nifty MNC ETF"),
];

// ---------------------------------------------------------------------------
// AMC kinds
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AmcKind {
    Sbi,
    Axis,
    Kotak,
    Motilal,
    Edelweiss,
    Nippon,
    Bajaj,
}

impl AmcKind {
    pub fn key(&self) -> &'static str {
        match self {
            Self::Sbi => "sbi",
            Self::Axis => "axis",
            Self::Kotak => "kotak",
            Self::Motilal => "motilal",
            Self::Edelweiss => "edelweiss",
            Self::Nippon => "nippon",
            Self::Bajaj => "bajaj",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Sbi => "SBI Mutual Fund",
            Self::Axis => "Axis Mutual Fund",
            Self::Kotak => "Kotak Mahindra Mutual Fund",
            Self::Motilal => "Motilal Oswal Mutual Fund",
            Self::Edelweiss => "Edelweiss Mutual Fund",
            Self::Nippon => "Nippon India Mutual Fund",
            Self::Bajaj => "Bajaj Finserv Mutual Fund",
        }
    }

    pub fn short_code(&self) -> &'static str {
        match self {
            Self::Sbi => "SBI",
            Self::Axis => "AXIS",
            Self::Kotak => "KOTAKMF",
            Self::Motilal => "MOTILAL",
            Self::Edelweiss => "EDELWEISS",
            Self::Nippon => "NIPPON",
            Self::Bajaj => "BAJAJ",
        }
    }

    pub fn profile(&self) -> &'static AmcProfile {
        match self {
            Self::Sbi => &SBI,
            Self::Axis => &AXIS,
            Self::Kotak => &KOTAK,
            Self::Motilal => &MOTILAL,
            Self::Edelweiss => &EDELWEISS,
            Self::Nippon => &NIPPON,
            Self::Bajaj => &BAJAJ,
        }
    }

    pub fn is_auxiliary_sheet(&self, sheet_name: &str) -> bool {
        let p = self.profile();
        let name = sheet_name.trim();
        p.index_sheets
            .iter()
            .chain(p.ignored_sheets)
            .any(|aux| name.eq_ignore_ascii_case(aux))
    }
}

pub const ALL_AMCS: &[AmcKind] = &[
    AmcKind::Sbi,
    AmcKind::Axis,
    AmcKind::Kotak,
    AmcKind::Motilal,
    AmcKind::Edelweiss,
    AmcKind::Nippon,
    AmcKind::Bajaj,
];

pub fn get_by_key(key: &str) -> Option<AmcKind> {
    let key = key.trim();
    ALL_AMCS
        .iter()
        .find(|a| a.key().eq_ignore_ascii_case(key) || a.short_code().eq_ignore_ascii_case(key))
        .copied()
}

/// AMC whose key appears as a whole word in `text`.
fn kind_in_text(text: &str) -> Option<AmcKind> {
    let lower = text.to_lowercase();
    lower
        .split(|c: char| !c.is_ascii_alphanumeric())
        .find_map(|token| ALL_AMCS.iter().find(|a| a.key() == token).copied())
}

/// Guess the AMC from the file name, then its directories nearest first,
/// then header text in the first rows of each sheet.
pub fn detect(path: &Path, workbook: Option<&Workbook>) -> Option<AmcKind> {
    let stem = path.file_stem().map(|s| s.to_string_lossy());
    let from_path = stem.as_deref().and_then(kind_in_text).or_else(|| {
        path.parent()?
            .components()
            .rev()
            .find_map(|c| kind_in_text(&c.as_os_str().to_string_lossy()))
    });
    if from_path.is_some() {
        return from_path;
    }
    let workbook = workbook?;
    for sheet in workbook.sheets.iter().take(3) {
        for row in sheet.rows.iter().take(5) {
            if let Some(kind) = row
                .iter()
                .filter_map(cell_text)
                .find_map(|text| kind_in_text(&text))
            {
                return Some(kind);
            }
        }
    }
    None
}
