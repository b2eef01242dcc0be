use std::path::Path;

use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::error::Result;
use crate::fmt::{lakhs, pct};
use crate::models::ExtractionResult;

pub fn run(file: &str) -> Result<()> {
    let doc = ExtractionResult::read_json(Path::new(file))?;
    let m = &doc.metadata;

    let mut table = Table::new();
    table.set_header(vec!["Scheme", "Name", "Holdings", "Value (lakhs)", "Equity % of NAV"]);
    for fund in &doc.fund_master {
        let rows: Vec<_> = doc
            .portfolio_holdings
            .iter()
            .filter(|h| h.scheme_short_code == fund.scheme_short_code)
            .collect();
        let value: f64 = rows.iter().filter_map(|h| h.market_value_lakhs).sum();
        let weight: f64 = rows.iter().filter_map(|h| h.pct_to_aum).sum();
        table.add_row(vec![
            Cell::new(&fund.scheme_short_code),
            Cell::new(&fund.scheme_name),
            Cell::new(fund.holdings_count),
            Cell::new(lakhs(Some(value))),
            Cell::new(pct(Some(weight))),
        ]);
    }

    println!(
        "{} ({})\nReport date: {}  Extracted: {}",
        doc.amc_master.amc_name.bold(),
        doc.amc_master.short_code,
        m.report_date.as_deref().unwrap_or("unknown"),
        m.extraction_date
    );
    println!("{table}");

    let skipped = format!("{} skipped", m.schemes_skipped);
    let errors = format!("{} errors", m.errors);
    println!(
        "{} schemes: {} with equity, {}, {}",
        m.total_schemes,
        m.schemes_with_equity.to_string().green(),
        if m.schemes_skipped > 0 { skipped.yellow() } else { skipped.normal() },
        if m.errors > 0 { errors.red().bold() } else { errors.normal() },
    );
    println!(
        "{} unique securities, {} holding records",
        m.total_unique_securities, m.total_holdings_records
    );
    if let Err(e) = doc.validate_references() {
        println!("{}", e.to_string().red());
    }
    Ok(())
}
