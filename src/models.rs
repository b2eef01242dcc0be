use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize, Serializer};

use crate::error::{FolioError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub source_file: String,
    pub report_date: Option<String>,
    pub extraction_date: String,
    pub total_schemes: usize,
    pub schemes_with_equity: usize,
    pub schemes_skipped: usize,
    pub errors: usize,
    pub total_unique_securities: usize,
    pub total_holdings_records: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmcMaster {
    pub amc_name: String,
    pub short_code: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundMaster {
    pub scheme_short_code: String,
    pub scheme_name: String,
    pub scheme_code: String,
    pub holdings_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityMaster {
    pub isin: String,
    pub security_name: String,
    pub current_industry: Option<String>,
    pub current_sector: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioHolding {
    pub scheme_short_code: String,
    pub isin: String,
    #[serde(serialize_with = "whole_number")]
    pub quantity: Option<f64>,
    pub market_value_lakhs: Option<f64>,
    pub pct_to_aum: Option<f64>,
    pub industry: Option<String>,
}

fn whole_number<S: Serializer>(value: &Option<f64>, s: S) -> std::result::Result<S::Ok, S::Error> {
    match value {
        Some(v) if v.fract() == 0.0 && v.abs() < 9.0e15 => s.serialize_some(&(*v as i64)),
        Some(v) => s.serialize_some(v),
        None => s.serialize_none(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub metadata: Metadata,
    pub amc_master: AmcMaster,
    pub fund_master: Vec<FundMaster>,
    pub security_master: Vec<SecurityMaster>,
    pub portfolio_holdings: Vec<PortfolioHolding>,
}

impl ExtractionResult {
    /// Every holding must point at a listed fund and a listed security.
    pub fn validate_references(&self) -> Result<()> {
        let funds: HashSet<&str> = self
            .fund_master
            .iter()
            .map(|f| f.scheme_short_code.as_str())
            .collect();
        let securities: HashSet<&str> = self.security_master.iter().map(|s| s.isin.as_str()).collect();

        for h in &self.portfolio_holdings {
            if !funds.contains(h.scheme_short_code.as_str()) {
                return Err(FolioError::BrokenReference(format!(
                    "holding {} references unknown scheme {}",
                    h.isin, h.scheme_short_code
                )));
            }
            if !securities.contains(h.isin.as_str()) {
                return Err(FolioError::BrokenReference(format!(
                    "holding in {} references unknown ISIN {}",
                    h.scheme_short_code, h.isin
                )));
            }
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write to a sibling temp file and rename it over `path`, so readers
    /// never see a half-written document.
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let json = self.to_json()?;
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        std::fs::write(&tmp, format!("{json}\n"))?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    pub fn read_json(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(FolioError::FileNotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// `YYYYMM` for a resolved report date. Unparseable overrides keep their
/// leading digits.
pub fn period_key(report_date: &str) -> String {
    match NaiveDate::parse_from_str(report_date.trim(), "%Y-%m-%d") {
        Ok(d) => d.format("%Y%m").to_string(),
        Err(_) => {
            let digits: String = report_date.chars().filter(char::is_ascii_digit).take(6).collect();
            if digits.is_empty() {
                "unknown".to_string()
            } else {
                digits
            }
        }
    }
}

pub fn default_output_path(dir: &Path, amc_key: &str, report_date: &str) -> PathBuf {
    dir.join(format!("{amc_key}_equity_holdings_{}.json", period_key(report_date)))
}
