use std::collections::HashMap;
use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension, Transaction};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::error::{FolioError, Result};
use crate::models::{ExtractionResult, FundMaster, SecurityMaster};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadResult {
    pub funds: usize,
    pub securities: usize,
    pub holdings: usize,
    pub duplicate_file: bool,
}

fn compute_checksum(file_path: &Path) -> Result<String> {
    let data = std::fs::read(file_path)?;
    let mut hasher = Sha256::new();
    hasher.update(&data);
    Ok(hex::encode(hasher.finalize()))
}

fn get_or_insert_amc(tx: &Transaction, name: &str, short_code: &str) -> Result<i64> {
    let existing: Option<i64> = tx
        .query_row("SELECT id FROM amc_master WHERE amc_name = ?1", [name], |r| r.get(0))
        .optional()?;
    if let Some(id) = existing {
        return Ok(id);
    }
    tx.execute(
        "INSERT INTO amc_master (amc_name, short_code) VALUES (?1, ?2)",
        params![name, short_code],
    )?;
    info!("  Inserted AMC: {name}");
    Ok(tx.last_insert_rowid())
}

fn upsert_fund(tx: &Transaction, amc_id: i64, fund: &FundMaster) -> Result<i64> {
    tx.execute(
        "INSERT INTO fund_master (amc_id, scheme_short_code, scheme_code, scheme_name)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT (amc_id, scheme_short_code)
         DO UPDATE SET scheme_name = excluded.scheme_name, scheme_code = excluded.scheme_code",
        params![amc_id, fund.scheme_short_code, fund.scheme_code, fund.scheme_name],
    )?;
    let id = tx.query_row(
        "SELECT id FROM fund_master WHERE amc_id = ?1 AND scheme_short_code = ?2",
        params![amc_id, fund.scheme_short_code],
        |r| r.get(0),
    )?;
    Ok(id)
}

fn upsert_security(tx: &Transaction, sec: &SecurityMaster) -> Result<i64> {
    tx.execute(
        "INSERT INTO security_master (isin, security_name, current_sector, current_industry)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT (isin) DO UPDATE SET
            security_name = excluded.security_name,
            current_sector = excluded.current_sector,
            current_industry = excluded.current_industry",
        params![sec.isin, sec.security_name, sec.current_sector, sec.current_industry],
    )?;
    let id = tx.query_row(
        "SELECT id FROM security_master WHERE isin = ?1",
        [&sec.isin],
        |r| r.get(0),
    )?;
    Ok(id)
}

/// Write one document inside an open transaction. Holdings for the
/// document's funds on its report date are replaced, so reloading is safe.
fn load_result(tx: &Transaction, doc: &ExtractionResult) -> Result<(i64, LoadResult)> {
    let report_date = doc
        .metadata
        .report_date
        .as_deref()
        .ok_or_else(|| FolioError::InvalidDate("missing report_date".into()))?;

    let amc_id = get_or_insert_amc(tx, &doc.amc_master.amc_name, &doc.amc_master.short_code)?;

    let mut fund_ids: HashMap<&str, i64> = HashMap::new();
    for fund in &doc.fund_master {
        fund_ids.insert(&fund.scheme_short_code, upsert_fund(tx, amc_id, fund)?);
    }
    let mut security_ids: HashMap<&str, i64> = HashMap::new();
    for sec in &doc.security_master {
        security_ids.insert(&sec.isin, upsert_security(tx, sec)?);
    }
    debug!("  {} funds, {} securities upserted", fund_ids.len(), security_ids.len());

    for fund_id in fund_ids.values() {
        tx.execute(
            "DELETE FROM portfolio_holdings WHERE fund_id = ?1 AND report_date = ?2",
            params![fund_id, report_date],
        )?;
    }

    let mut inserted = 0;
    {
        let mut stmt = tx.prepare_cached(
            "INSERT INTO portfolio_holdings
             (fund_id, security_id, report_date, quantity, market_value_lakhs, pct_portfolio, sector_at_time)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )?;
        for h in &doc.portfolio_holdings {
            let (Some(fund_id), Some(security_id)) = (
                fund_ids.get(h.scheme_short_code.as_str()),
                security_ids.get(h.isin.as_str()),
            ) else {
                warn!("  Skipping holding {} in {}", h.isin, h.scheme_short_code);
                continue;
            };
            stmt.execute(params![
                fund_id,
                security_id,
                report_date,
                h.quantity,
                h.market_value_lakhs,
                h.pct_to_aum,
                h.industry,
            ])?;
            inserted += 1;
        }
    }

    Ok((
        amc_id,
        LoadResult {
            funds: fund_ids.len(),
            securities: security_ids.len(),
            holdings: inserted,
            duplicate_file: false,
        },
    ))
}

/// Load one JSON document. A file whose checksum was already loaded is
/// skipped; anything else commits in a single transaction or not at all.
pub fn load_file(conn: &mut Connection, path: &Path) -> Result<LoadResult> {
    let doc = ExtractionResult::read_json(path)?;
    doc.validate_references()?;

    let checksum = compute_checksum(path)?;
    {
        let mut stmt = conn.prepare("SELECT 1 FROM loads WHERE checksum = ?1")?;
        if stmt.exists([&checksum])? {
            return Ok(LoadResult {
                duplicate_file: true,
                ..LoadResult::default()
            });
        }
    }

    let tx = conn.transaction()?;
    let (amc_id, result) = load_result(&tx, &doc)?;
    tx.execute(
        "INSERT INTO loads (filename, amc_id, report_date, record_count, checksum)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            path.file_name().and_then(|n| n.to_str()).unwrap_or(""),
            amc_id,
            doc.metadata.report_date,
            result.holdings as i64,
            checksum,
        ],
    )?;
    tx.commit()?;
    Ok(result)
}
