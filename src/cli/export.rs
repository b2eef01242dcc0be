use std::collections::HashMap;
use std::io::Write;
use std::path::Path;

use crate::error::Result;
use crate::models::ExtractionResult;
use crate::settings::expand_path;

const HEADER: &[&str] = &[
    "report_date",
    "scheme_short_code",
    "scheme_name",
    "isin",
    "security_name",
    "industry",
    "quantity",
    "market_value_lakhs",
    "pct_to_aum",
];

fn opt_num(v: Option<f64>) -> String {
    v.map(|n| n.to_string()).unwrap_or_default()
}

/// Holdings joined with fund and security names, one CSV row each.
pub fn write_holdings_csv<W: Write>(doc: &ExtractionResult, out: W) -> Result<usize> {
    let funds: HashMap<&str, &str> = doc
        .fund_master
        .iter()
        .map(|f| (f.scheme_short_code.as_str(), f.scheme_name.as_str()))
        .collect();
    let securities: HashMap<&str, &str> = doc
        .security_master
        .iter()
        .map(|s| (s.isin.as_str(), s.security_name.as_str()))
        .collect();
    let report_date = doc.metadata.report_date.clone().unwrap_or_default();

    let mut wtr = csv::Writer::from_writer(out);
    wtr.write_record(HEADER)?;
    for h in &doc.portfolio_holdings {
        let (quantity, value, pct) = (
            opt_num(h.quantity),
            opt_num(h.market_value_lakhs),
            opt_num(h.pct_to_aum),
        );
        wtr.write_record([
            report_date.as_str(),
            h.scheme_short_code.as_str(),
            funds.get(h.scheme_short_code.as_str()).copied().unwrap_or(""),
            h.isin.as_str(),
            securities.get(h.isin.as_str()).copied().unwrap_or(""),
            h.industry.as_deref().unwrap_or(""),
            quantity.as_str(),
            value.as_str(),
            pct.as_str(),
        ])?;
    }
    wtr.flush()?;
    Ok(doc.portfolio_holdings.len())
}

pub fn run(file: &str, output: Option<&str>) -> Result<()> {
    let doc = ExtractionResult::read_json(Path::new(file))?;
    match output {
        Some(o) => {
            let path = expand_path(o);
            let count = write_holdings_csv(&doc, std::fs::File::create(&path)?)?;
            println!("Exported {count} holdings to {}", path.display());
        }
        None => {
            write_holdings_csv(&doc, std::io::stdout().lock())?;
        }
    }
    Ok(())
}
