use comfy_table::{Cell, Table};

use crate::amc::ALL_AMCS;
use crate::error::Result;

pub fn run() -> Result<()> {
    let mut table = Table::new();
    table.set_header(vec!["Key", "Short Code", "Name", "Index Sheet", "ISIN Prefix"]);
    for amc in ALL_AMCS {
        let profile = amc.profile();
        table.add_row(vec![
            Cell::new(amc.key()),
            Cell::new(amc.short_code()),
            Cell::new(amc.name()),
            Cell::new(if profile.index_sheets.is_empty() {
                "-".to_string()
            } else {
                profile.index_sheets.join(" / ")
            }),
            Cell::new(if profile.isin_prefixes.is_empty() {
                "any".to_string()
            } else {
                profile.isin_prefixes.join(", ")
            }),
        ]);
    }
    println!("Supported AMCs\n{table}");
    Ok(())
}
