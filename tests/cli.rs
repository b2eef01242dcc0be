use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn amcfolio(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("amcfolio").unwrap();
    cmd.env("HOME", home.path()).env_remove("RUST_LOG");
    cmd
}

const SAMPLE: &str = r#"{
  "metadata": {
    "source_file": "axis_jan.xlsx",
    "report_date": "2026-01-31",
    "extraction_date": "2026-02-03",
    "total_schemes": 2,
    "schemes_with_equity": 1,
    "schemes_skipped": 1,
    "errors": 0,
    "total_unique_securities": 1,
    "total_holdings_records": 1
  },
  "amc_master": { "amc_name": "Axis Mutual Fund", "short_code": "AXIS" },
  "fund_master": [
    { "scheme_short_code": "S1", "scheme_name": "Growth Fund", "scheme_code": "", "holdings_count": 1 }
  ],
  "security_master": [
    { "isin": "INE012A01020", "security_name": "ACC Limited", "current_industry": "Cement", "current_sector": "Cement" }
  ],
  "portfolio_holdings": [
    { "scheme_short_code": "S1", "isin": "INE012A01020", "quantity": 100, "market_value_lakhs": 50.5, "pct_to_aum": 2.3, "industry": "Cement" }
  ]
}
"#;

#[test]
fn amcs_lists_every_profile() {
    let home = TempDir::new().unwrap();
    amcfolio(&home)
        .arg("amcs")
        .assert()
        .success()
        .stdout(predicate::str::contains("axis"))
        .stdout(predicate::str::contains("motilal"));
}

#[test]
fn extract_missing_file_exits_nonzero() {
    let home = TempDir::new().unwrap();
    amcfolio(&home)
        .args(["extract", "does_not_exist.xlsx", "--amc", "axis"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Error: File not found"));
}

#[test]
fn extract_rejects_unknown_amc() {
    let home = TempDir::new().unwrap();
    amcfolio(&home)
        .args(["extract", "whatever.xlsx", "--amc", "acme"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown AMC: acme"));
}

#[test]
fn extract_rejects_malformed_date() {
    let home = TempDir::new().unwrap();
    amcfolio(&home)
        .args(["extract", "whatever.xlsx", "--amc", "axis", "--date", "31/01/2026"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid date"));
}

#[test]
fn export_writes_joined_csv() {
    let home = TempDir::new().unwrap();
    let json = home.path().join("axis.json");
    std::fs::write(&json, SAMPLE).unwrap();

    amcfolio(&home)
        .args(["export", json.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "2026-01-31,S1,Growth Fund,INE012A01020,ACC Limited,Cement,100,50.5,2.3",
        ));
}

#[test]
fn summary_prints_fund_table() {
    let home = TempDir::new().unwrap();
    let json = home.path().join("axis.json");
    std::fs::write(&json, SAMPLE).unwrap();

    amcfolio(&home)
        .args(["summary", json.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Axis Mutual Fund"))
        .stdout(predicate::str::contains("Growth Fund"));
}

#[test]
fn batch_on_missing_directory_fails() {
    let home = TempDir::new().unwrap();
    let missing = home.path().join("nope");
    amcfolio(&home)
        .args(["batch", missing.to_str().unwrap(), "--amc", "axis"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error:"));
}

#[test]
fn config_persists_under_home() {
    let home = TempDir::new().unwrap();
    amcfolio(&home)
        .args(["config", "--output-dir", "/tmp/folio-out"])
        .assert()
        .success()
        .stdout(predicate::str::contains("/tmp/folio-out"));
    assert!(home.path().join(".config/amcfolio/settings.json").exists());

    amcfolio(&home)
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("output_dir:    /tmp/folio-out"));
}
