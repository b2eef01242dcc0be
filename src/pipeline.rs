use std::collections::HashSet;
use std::path::Path;

use anyhow::{bail, Context};
use tracing::{debug, error, info};

use crate::amc::{self, AmcKind};
use crate::error::{FolioError, Result};
use crate::holdings::{extract_holdings, Holding};
use crate::models::{
    AmcMaster, ExtractionResult, FundMaster, Metadata, PortfolioHolding, SecurityMaster,
};
use crate::report_date::{resolve_report_date, Clock, ResolvedDate};
use crate::scheme_index::{parse_scheme_index, resolve_display_name, NameContext, SchemeIndex};
use crate::section::{locate_listed_equity, Section, SkipReason};
use crate::workbook::{Sheet, Workbook};

#[derive(Debug, Clone, Default)]
pub struct ExtractOptions {
    pub date_override: Option<String>,
    pub source_file: String,
}

#[derive(Debug, Clone)]
pub struct Extraction {
    pub kind: AmcKind,
    pub result: ExtractionResult,
    pub report_date: ResolvedDate,
}

enum SheetOutcome {
    Fund(FundMaster, Vec<Holding>),
    Skipped(SkipReason),
}

#[derive(Default)]
struct RunState {
    funds: Vec<FundMaster>,
    holdings: Vec<Holding>,
    total_schemes: usize,
    skipped: usize,
    errors: usize,
}

fn process_sheet(
    sheet: &Sheet,
    kind: AmcKind,
    index: &SchemeIndex,
) -> anyhow::Result<SheetOutcome> {
    if let Some(e) = &sheet.read_error {
        bail!("unreadable sheet: {e}");
    }
    let profile = kind.profile();
    let short_code = sheet.name.trim();

    let data_start = match locate_listed_equity(sheet, profile) {
        Section::Located { data_start } => data_start,
        Section::Skipped(reason) => return Ok(SheetOutcome::Skipped(reason)),
    };
    let holdings = extract_holdings(sheet, data_start, profile, short_code)
        .with_context(|| format!("extracting holdings from {short_code}"))?;
    if holdings.is_empty() {
        return Ok(SheetOutcome::Skipped(SkipReason::NoHoldings));
    }

    let entry = index.get(short_code);
    let ctx = NameContext {
        short_code,
        sheet,
        index,
        profile,
    };
    let fund = FundMaster {
        scheme_short_code: short_code.to_string(),
        scheme_name: resolve_display_name(&ctx),
        scheme_code: entry
            .and_then(|e| e.scheme_code.clone())
            .unwrap_or_else(|| short_code.to_string()),
        holdings_count: holdings.len(),
    };
    Ok(SheetOutcome::Fund(fund, holdings))
}

fn build_security_master(holdings: &[Holding], industry_as_sector: bool) -> Vec<SecurityMaster> {
    let mut seen = HashSet::new();
    holdings
        .iter()
        .filter(|h| seen.insert(h.isin.as_str()))
        .map(|h| SecurityMaster {
            isin: h.isin.clone(),
            security_name: h.security_name.clone(),
            current_industry: h.industry.clone(),
            current_sector: if industry_as_sector {
                h.industry.clone()
            } else {
                None
            },
        })
        .collect()
}

/// Extract one in-memory workbook. Sheet-level failures are counted in the
/// metadata, never returned.
pub fn run_extraction(
    workbook: &Workbook,
    kind: AmcKind,
    options: &ExtractOptions,
    clock: &dyn Clock,
) -> Extraction {
    let profile = kind.profile();
    let index = parse_scheme_index(workbook, profile);
    if index.is_empty() {
        debug!("No index entries; names come from fallbacks");
    }
    let report_date =
        resolve_report_date(workbook, profile, options.date_override.as_deref(), clock);
    info!("Report date: {}", report_date.value);

    let mut state = RunState::default();
    for sheet in &workbook.sheets {
        if kind.is_auxiliary_sheet(&sheet.name) {
            continue;
        }
        state.total_schemes += 1;
        match process_sheet(sheet, kind, &index) {
            Ok(SheetOutcome::Fund(fund, holdings)) => {
                info!("  {}: {} holdings", fund.scheme_short_code, holdings.len());
                state.funds.push(fund);
                state.holdings.extend(holdings);
            }
            Ok(SheetOutcome::Skipped(reason)) => {
                debug!("  {}: skipped ({reason})", sheet.name);
                state.skipped += 1;
            }
            Err(e) => {
                error!("  {}: {e:#}", sheet.name);
                state.errors += 1;
            }
        }
    }

    let security_master = build_security_master(&state.holdings, profile.industry_as_sector);
    let portfolio_holdings: Vec<PortfolioHolding> = state
        .holdings
        .into_iter()
        .map(|h| PortfolioHolding {
            scheme_short_code: h.scheme_short_code,
            isin: h.isin,
            quantity: h.quantity,
            market_value_lakhs: h.market_value,
            pct_to_aum: h.pct_to_nav,
            industry: h.industry,
        })
        .collect();

    let metadata = Metadata {
        source_file: options.source_file.clone(),
        report_date: Some(report_date.value.clone()),
        extraction_date: clock.today().format("%Y-%m-%d").to_string(),
        total_schemes: state.total_schemes,
        schemes_with_equity: state.funds.len(),
        schemes_skipped: state.skipped,
        errors: state.errors,
        total_unique_securities: security_master.len(),
        total_holdings_records: portfolio_holdings.len(),
    };
    info!(
        "{}: {} funds with equity, {} skipped, {} errors, {} securities, {} holdings",
        kind.name(),
        metadata.schemes_with_equity,
        metadata.schemes_skipped,
        metadata.errors,
        metadata.total_unique_securities,
        metadata.total_holdings_records
    );

    Extraction {
        kind,
        result: ExtractionResult {
            metadata,
            amc_master: AmcMaster {
                amc_name: kind.name().to_string(),
                short_code: kind.short_code().to_string(),
            },
            fund_master: state.funds,
            security_master,
            portfolio_holdings,
        },
        report_date,
    }
}

/// File name recorded as `source_file`, independent of where the run started.
fn source_name(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().to_string())
}

/// Open `path` and extract it. Without an explicit AMC the kind is detected
/// from the path or the workbook's header text.
pub fn extract_file(
    path: &Path,
    kind: Option<AmcKind>,
    date_override: Option<&str>,
    clock: &dyn Clock,
) -> Result<Extraction> {
    info!("Loading workbook: {}", path.display());
    let workbook = Workbook::open(path)?;
    info!("Total sheets: {}", workbook.sheets.len());
    debug!("Sheets: {:?}", workbook.sheet_names().collect::<Vec<_>>());

    let kind = match kind {
        Some(k) => k,
        None => amc::detect(path, Some(&workbook))
            .ok_or_else(|| FolioError::AmcNotDetected(path.to_path_buf()))?,
    };
    let options = ExtractOptions {
        date_override: date_override.map(str::to_string),
        source_file: source_name(path),
    };
    Ok(run_extraction(&workbook, kind, &options, clock))
}
