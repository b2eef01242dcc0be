use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::amc::{self, AmcKind};
use crate::error::{FolioError, Result};
use crate::models::ExtractionResult;
use crate::pipeline::extract_file;
use crate::report_date::{Clock, DateSource, ResolvedDate};

const EXCEL_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xls"];

const MONTHS: &[(&str, u32)] = &[
    ("january", 1),
    ("february", 2),
    ("march", 3),
    ("april", 4),
    ("may", 5),
    ("june", 6),
    ("july", 7),
    ("august", 8),
    ("september", 9),
    ("october", 10),
    ("november", 11),
    ("december", 12),
];

pub const SUMMARY_FILE: &str = "batch_summary.json";

#[derive(Debug, Clone, Serialize)]
pub struct FileOutcome {
    pub file: String,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_date: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub date_corrected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schemes: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub securities: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub holdings: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FileOutcome {
    fn failed(file: String, err: String) -> Self {
        Self {
            file,
            status: "error",
            output: None,
            report_date: None,
            date_corrected: false,
            schemes: None,
            securities: None,
            holdings: None,
            error: Some(err),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchSummary {
    pub batch_date: String,
    pub input_directory: String,
    pub files_processed: usize,
    pub success_count: usize,
    pub error_count: usize,
    pub results: Vec<FileOutcome>,
}

pub struct BatchOptions<'a> {
    pub input_dir: &'a Path,
    pub output_dir: &'a Path,
    pub kind: Option<AmcKind>,
}

pub fn list_inputs(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(FolioError::FileNotFound(dir.to_path_buf()));
    }
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.is_file())
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| EXCEL_EXTENSIONS.iter().any(|x| e.eq_ignore_ascii_case(x)))
        })
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| !n.starts_with("~$"))
        })
        .collect();
    files.sort();
    Ok(files)
}

fn month_from_stem(stem: &str) -> Option<u32> {
    let lower = stem.to_lowercase();
    lower
        .split(|c: char| !c.is_ascii_alphabetic())
        .filter(|t| t.len() >= 3)
        .find_map(|token| {
            MONTHS
                .iter()
                .find(|(name, _)| *name == token || name.get(..3) == Some(token))
                .map(|(_, n)| *n)
        })
}

fn year_token(s: &str) -> Option<i32> {
    s.split(|c: char| !c.is_ascii_digit())
        .filter(|t| t.len() == 4)
        .filter_map(|t| t.parse::<i32>().ok())
        .find(|y| (1990..=2100).contains(y))
}

/// Month-end date implied by a path like `.../2025/April.xlsx`: month from
/// the file name, year from the nearest year-named directory (or the file
/// name itself).
pub fn date_from_path(path: &Path) -> Option<NaiveDate> {
    let stem = path.file_stem()?.to_str()?;
    let month = month_from_stem(stem)?;
    let dir_year = path
        .parent()
        .into_iter()
        .flat_map(|p| p.components().rev())
        .filter_map(|c| c.as_os_str().to_str())
        .find_map(|c| (c.len() == 4).then(|| year_token(c)).flatten());
    let year = dir_year.or_else(|| year_token(stem))?;
    last_day_of_month(year, month)
}

fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let (ny, nm) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(ny, nm, 1)?.pred_opt()
}

/// Replace the report date with the path-derived one when the workbook's own
/// date came from the clock or names a different year. Returns whether the
/// metadata changed.
pub fn apply_date_correction(
    result: &mut ExtractionResult,
    resolved: &ResolvedDate,
    path: &Path,
) -> bool {
    if resolved.source == DateSource::Override {
        return false;
    }
    let Some(from_path) = date_from_path(path) else {
        return false;
    };
    let disagrees = NaiveDate::parse_from_str(&resolved.value, "%Y-%m-%d")
        .map_or(true, |d| d.year() != from_path.year());
    if !resolved.is_fallback() && !disagrees {
        return false;
    }
    let corrected = from_path.format("%Y-%m-%d").to_string();
    info!(
        "  Corrected report date {} -> {corrected} from {}",
        resolved.value,
        path.display()
    );
    result.metadata.report_date = Some(corrected);
    true
}

fn sanitize(stem: &str) -> String {
    stem.chars()
        .filter_map(|c| match c {
            c if c.is_ascii_alphanumeric() => Some(c.to_ascii_lowercase()),
            '-' | '_' => Some(c),
            c if c.is_whitespace() => None,
            _ => Some('_'),
        })
        .collect()
}

pub fn plan_outputs(files: &[PathBuf], output_dir: &Path, amc_key: &str) -> Vec<PathBuf> {
    let mut taken = HashSet::new();
    files
        .iter()
        .map(|f| {
            let base = match date_from_path(f) {
                Some(d) => d.format("%Y%m").to_string(),
                None => sanitize(&f.file_stem().map(|s| s.to_string_lossy()).unwrap_or_default()),
            };
            let mut name = format!("{amc_key}_equity_holdings_{base}.json");
            let mut n = 2;
            while !taken.insert(name.clone()) {
                name = format!("{amc_key}_equity_holdings_{base}_{n}.json");
                n += 1;
            }
            output_dir.join(name)
        })
        .collect()
}

fn process_file(
    path: &Path,
    output: &Path,
    kind: Option<AmcKind>,
    clock: &dyn Clock,
) -> Result<FileOutcome> {
    let mut extraction = extract_file(path, kind, None, clock)?;
    if extraction.report_date.is_fallback() && date_from_path(path).is_none() {
        warn!("  {}: report date fell back to the run date", path.display());
    }
    let corrected = apply_date_correction(&mut extraction.result, &extraction.report_date, path);
    let result = &extraction.result;
    result.validate_references()?;
    result.write_json(output)?;
    info!("  Written to {}", output.display());

    Ok(FileOutcome {
        file: file_label(path),
        status: "success",
        output: Some(output.display().to_string()),
        report_date: result.metadata.report_date.clone(),
        date_corrected: corrected,
        schemes: Some(result.metadata.schemes_with_equity),
        securities: Some(result.metadata.total_unique_securities),
        holdings: Some(result.metadata.total_holdings_records),
        error: None,
    })
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

/// Extract every spreadsheet in the input directory and write
/// `batch_summary.json` beside the outputs. Per-file failures are recorded
/// in the summary; only a missing or empty input directory is an error.
pub fn run_batch(opts: &BatchOptions, clock: &dyn Clock) -> Result<BatchSummary> {
    let files = list_inputs(opts.input_dir)?;
    if files.is_empty() {
        return Err(FolioError::Other(format!(
            "No Excel files found in {}",
            opts.input_dir.display()
        )));
    }
    std::fs::create_dir_all(opts.output_dir)?;

    let key = opts
        .kind
        .or_else(|| amc::detect(opts.input_dir, None))
        .map_or("amc", |k| k.key());
    let outputs = plan_outputs(&files, opts.output_dir, key);
    info!("Found {} Excel files to process", files.len());

    let mut results = Vec::with_capacity(files.len());
    for (idx, (file, output)) in files.iter().zip(&outputs).enumerate() {
        info!("[{}/{}] Processing: {}", idx + 1, files.len(), file_label(file));
        match process_file(file, output, opts.kind, clock) {
            Ok(outcome) => results.push(outcome),
            Err(e) => {
                error!("  {}: {e}", file_label(file));
                results.push(FileOutcome::failed(file_label(file), e.to_string()));
            }
        }
    }

    let success_count = results.iter().filter(|r| r.is_success()).count();
    let summary = BatchSummary {
        batch_date: clock.today().format("%Y-%m-%d").to_string(),
        input_directory: opts.input_dir.display().to_string(),
        files_processed: results.len(),
        success_count,
        error_count: results.len() - success_count,
        results,
    };
    let json = serde_json::to_string_pretty(&summary)?;
    std::fs::write(opts.output_dir.join(SUMMARY_FILE), format!("{json}\n"))?;
    info!(
        "Batch complete: {} files, {} succeeded, {} failed",
        summary.files_processed, summary.success_count, summary.error_count
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::sample_result;
    use crate::report_date::FixedClock;

    fn clock() -> FixedClock {
        FixedClock(NaiveDate::from_ymd_opt(2026, 2, 5).unwrap())
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_date_from_path() {
        assert_eq!(date_from_path(Path::new("raw/bajaj/2025/April.xlsx")), Some(ymd(2025, 4, 30)));
        assert_eq!(date_from_path(Path::new("raw/2024/february.xlsx")), Some(ymd(2024, 2, 29)));
        assert_eq!(date_from_path(Path::new("raw/2025/Dec.xlsx")), Some(ymd(2025, 12, 31)));
        assert_eq!(
            date_from_path(Path::new("raw/Portfolio_September_2025.xlsx")),
            Some(ymd(2025, 9, 30))
        );
        assert_eq!(date_from_path(Path::new("raw/2025/portfolio.xlsx")), None);
        assert_eq!(date_from_path(Path::new("raw/April.xlsx")), None);
    }

    #[test]
    fn test_directory_year_beats_file_name_year() {
        assert_eq!(
            date_from_path(Path::new("raw/2025/January_2026.xlsx")),
            Some(ymd(2025, 1, 31))
        );
    }

    #[test]
    fn test_correction_on_clock_fallback() {
        let mut r = sample_result();
        let resolved = ResolvedDate {
            value: "2026-02-05".into(),
            source: DateSource::Clock,
        };
        assert!(apply_date_correction(&mut r, &resolved, Path::new("x/2026/January.xlsx")));
        assert_eq!(r.metadata.report_date.as_deref(), Some("2026-01-31"));
    }

    #[test]
    fn test_correction_on_year_mismatch_only() {
        let path = Path::new("motilal/2025/March.xlsx");
        let mut r = sample_result();
        let wrong_year = ResolvedDate {
            value: "2026-03-31".into(),
            source: DateSource::FirstSheet,
        };
        assert!(apply_date_correction(&mut r, &wrong_year, path));
        assert_eq!(r.metadata.report_date.as_deref(), Some("2025-03-31"));

        let mut r = sample_result();
        let same_year = ResolvedDate {
            value: "2025-03-28".into(),
            source: DateSource::IndexSheet,
        };
        assert!(!apply_date_correction(&mut r, &same_year, path));
        assert_eq!(r.metadata.report_date.as_deref(), Some("2026-01-31"));
    }

    #[test]
    fn test_no_correction_without_path_date() {
        let mut r = sample_result();
        let resolved = ResolvedDate {
            value: "2026-02-05".into(),
            source: DateSource::Clock,
        };
        assert!(!apply_date_correction(&mut r, &resolved, Path::new("x/portfolio.xlsx")));
    }

    #[test]
    fn test_list_inputs_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.xlsx", "a.XLSX", "~$a.xlsx", "notes.txt", "c.xls"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }
        let files = list_inputs(dir.path()).unwrap();
        let names: Vec<_> = files.iter().map(|p| file_label(p)).collect();
        assert_eq!(names, vec!["a.XLSX", "b.xlsx", "c.xls"]);
    }

    #[test]
    fn test_plan_outputs_distinct() {
        let files = vec![
            PathBuf::from("in/2025/April.xlsx"),
            PathBuf::from("in/2025/Apr.xlsx"),
            PathBuf::from("in/2025/Fund Report.xlsx"),
        ];
        let out = plan_outputs(&files, Path::new("out"), "bajaj");
        assert_eq!(out[0], PathBuf::from("out/bajaj_equity_holdings_202504.json"));
        assert_eq!(out[1], PathBuf::from("out/bajaj_equity_holdings_202504_2.json"));
        assert_eq!(out[2], PathBuf::from("out/bajaj_equity_holdings_fundreport.json"));
    }

    #[test]
    fn test_run_batch_records_failures() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        std::fs::write(input.path().join("January.xlsx"), b"not a workbook").unwrap();
        let opts = BatchOptions {
            input_dir: input.path(),
            output_dir: output.path(),
            kind: Some(AmcKind::Axis),
        };
        let summary = run_batch(&opts, &clock()).unwrap();
        assert_eq!(summary.files_processed, 1);
        assert_eq!(summary.error_count, 1);
        assert!(output.path().join(SUMMARY_FILE).exists());
    }

    #[test]
    fn test_run_batch_empty_dir_is_error() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let opts = BatchOptions {
            input_dir: input.path(),
            output_dir: output.path(),
            kind: None,
        };
        assert!(run_batch(&opts, &clock()).is_err());
    }
}
