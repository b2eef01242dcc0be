use std::path::Path;

use rusqlite::Connection;

use crate::error::Result;

pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS amc_master (
    id INTEGER PRIMARY KEY,
    amc_name TEXT NOT NULL UNIQUE,
    short_code TEXT NOT NULL,
    created_at TEXT DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS fund_master (
    id INTEGER PRIMARY KEY,
    amc_id INTEGER NOT NULL,
    scheme_short_code TEXT NOT NULL,
    scheme_code TEXT,
    scheme_name TEXT NOT NULL,
    is_active INTEGER DEFAULT 1,
    UNIQUE (amc_id, scheme_short_code),
    FOREIGN KEY (amc_id) REFERENCES amc_master(id)
);

CREATE TABLE IF NOT EXISTS security_master (
    id INTEGER PRIMARY KEY,
    isin TEXT NOT NULL UNIQUE,
    security_name TEXT NOT NULL,
    asset_class TEXT DEFAULT 'Equity',
    current_sector TEXT,
    current_industry TEXT
);

CREATE TABLE IF NOT EXISTS portfolio_holdings (
    id INTEGER PRIMARY KEY,
    fund_id INTEGER NOT NULL,
    security_id INTEGER NOT NULL,
    report_date TEXT NOT NULL,
    quantity REAL,
    market_value_lakhs REAL,
    pct_portfolio REAL,
    sector_at_time TEXT,
    FOREIGN KEY (fund_id) REFERENCES fund_master(id),
    FOREIGN KEY (security_id) REFERENCES security_master(id)
);

CREATE INDEX IF NOT EXISTS idx_holdings_fund_date
    ON portfolio_holdings (fund_id, report_date);

CREATE TABLE IF NOT EXISTS loads (
    id INTEGER PRIMARY KEY,
    filename TEXT NOT NULL,
    amc_id INTEGER NOT NULL,
    report_date TEXT,
    record_count INTEGER,
    checksum TEXT NOT NULL,
    load_date TEXT DEFAULT (datetime('now')),
    FOREIGN KEY (amc_id) REFERENCES amc_master(id)
);
";

pub fn get_connection(db_path: &Path) -> Result<Connection> {
    if let Some(dir) = db_path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    let conn = Connection::open(db_path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> (tempfile::TempDir, Connection) {
        let dir = tempfile::tempdir().unwrap();
        let conn = get_connection(&dir.path().join("test.db")).unwrap();
        init_db(&conn).unwrap();
        (dir, conn)
    }

    #[test]
    fn test_init_db_creates_tables() {
        let (_dir, conn) = test_db();
        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();
        for expected in &["amc_master", "fund_master", "security_master", "portfolio_holdings", "loads"] {
            assert!(tables.contains(&expected.to_string()), "missing table: {expected}");
        }
    }

    #[test]
    fn test_init_db_is_idempotent() {
        let (_dir, conn) = test_db();
        init_db(&conn).unwrap();
    }

    #[test]
    fn test_get_connection_creates_parent_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("amcfolio.db");
        get_connection(&path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_foreign_keys_enforced() {
        let (_dir, conn) = test_db();
        let err = conn.execute(
            "INSERT INTO fund_master (amc_id, scheme_short_code, scheme_name) VALUES (99, 'X', 'Y')",
            [],
        );
        assert!(err.is_err());
    }
}
