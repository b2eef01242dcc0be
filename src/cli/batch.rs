use std::path::PathBuf;

use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::batch::{run_batch, BatchOptions, SUMMARY_FILE};
use crate::cli::parse_amc_opt;
use crate::error::{FolioError, Result};
use crate::report_date::SystemClock;
use crate::settings::{expand_path, load_settings};

pub fn run(input_dir: &str, amc: Option<&str>, output_dir: Option<&str>) -> Result<()> {
    let kind = parse_amc_opt(amc)?;
    let input = PathBuf::from(input_dir);
    let output = match output_dir {
        Some(d) => expand_path(d),
        None => {
            let base = load_settings().output_dir();
            match kind {
                Some(k) => base.join(k.key()),
                None => base,
            }
        }
    };

    let summary = run_batch(
        &BatchOptions {
            input_dir: &input,
            output_dir: &output,
            kind,
        },
        &SystemClock,
    )?;

    let mut table = Table::new();
    table.set_header(vec!["File", "Status", "Report Date", "Funds", "Holdings"]);
    for r in &summary.results {
        let status = if r.is_success() {
            "ok".green()
        } else {
            "error".red()
        };
        let date = match (&r.report_date, r.date_corrected) {
            (Some(d), true) => format!("{d} (from path)"),
            (Some(d), false) => d.clone(),
            (None, _) => String::new(),
        };
        table.add_row(vec![
            Cell::new(&r.file),
            Cell::new(status),
            Cell::new(date),
            Cell::new(r.schemes.map(|n| n.to_string()).unwrap_or_default()),
            Cell::new(r.holdings.map(|n| n.to_string()).unwrap_or_default()),
        ]);
    }
    println!("Batch\n{table}");
    println!(
        "{} files, {} succeeded, {} failed. Summary: {}",
        summary.files_processed,
        summary.success_count,
        summary.error_count,
        output.join(SUMMARY_FILE).display()
    );

    if summary.error_count > 0 {
        return Err(FolioError::Other(format!(
            "{} of {} files failed",
            summary.error_count, summary.files_processed
        )));
    }
    Ok(())
}
