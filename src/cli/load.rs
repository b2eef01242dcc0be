use std::path::PathBuf;

use crate::db::{get_connection, init_db};
use crate::error::Result;
use crate::loader::load_file;
use crate::settings::{expand_path, load_settings};

pub fn run(files: &[String], database: Option<&str>) -> Result<()> {
    let db_path = match database {
        Some(p) => expand_path(p),
        None => load_settings().database_path(),
    };
    let mut conn = get_connection(&db_path)?;
    init_db(&conn)?;

    for file in files {
        let path = PathBuf::from(file);
        let result = load_file(&mut conn, &path)?;
        if result.duplicate_file {
            println!("{file}: already loaded (duplicate checksum).");
            continue;
        }
        println!(
            "{file}: {} funds, {} securities, {} holdings loaded",
            result.funds, result.securities, result.holdings
        );
    }
    println!("Database: {}", db_path.display());
    Ok(())
}
