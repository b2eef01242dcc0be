use std::path::PathBuf;

use chrono::NaiveDate;
use colored::Colorize;

use crate::cli::parse_amc_opt;
use crate::error::{FolioError, Result};
use crate::models::default_output_path;
use crate::pipeline::extract_file;
use crate::report_date::SystemClock;
use crate::settings::{expand_path, load_settings};

pub(crate) fn validate_date(date: &str) -> Result<()> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map(|_| ())
        .map_err(|_| FolioError::InvalidDate(date.to_string()))
}

pub fn run(file: &str, amc: Option<&str>, output: Option<&str>, date: Option<&str>) -> Result<()> {
    let kind = parse_amc_opt(amc)?;
    if let Some(d) = date {
        validate_date(d)?;
    }
    let path = PathBuf::from(file);

    let extraction = extract_file(&path, kind, date, &SystemClock)?;
    let result = &extraction.result;
    result.validate_references()?;

    let out_path = match output {
        Some(o) => expand_path(o),
        None => default_output_path(
            &load_settings().output_dir(),
            extraction.kind.key(),
            &extraction.report_date.value,
        ),
    };
    result.write_json(&out_path)?;

    let m = &result.metadata;
    println!(
        "{}: {} funds with equity, {} securities, {} holdings",
        result.amc_master.amc_name.bold(),
        m.schemes_with_equity,
        m.total_unique_securities,
        m.total_holdings_records
    );
    if m.schemes_skipped > 0 || m.errors > 0 {
        println!(
            "{} skipped, {}",
            m.schemes_skipped,
            format!("{} errors", m.errors).red()
        );
    }
    if extraction.report_date.is_fallback() {
        println!(
            "{}",
            "Report date not found in the workbook; used today's date. Pass --date to correct it."
                .yellow()
        );
    }
    println!("Written to {}", out_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_date() {
        assert!(validate_date("2026-01-31").is_ok());
        assert!(matches!(validate_date("31-01-2026"), Err(FolioError::InvalidDate(_))));
        assert!(validate_date("2026-02-30").is_err());
    }
}
