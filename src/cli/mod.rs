pub mod amcs;
pub mod batch;
pub mod config;
pub mod export;
pub mod extract;
#[cfg(feature = "sqlite")]
pub mod load;
pub mod summary;

use clap::{Parser, Subcommand};

use crate::amc::{self, AmcKind};
use crate::error::{FolioError, Result};

/// Resolve an `--amc` value to a profile.
pub(crate) fn parse_amc_opt(key: Option<&str>) -> Result<Option<AmcKind>> {
    key.map(|k| amc::get_by_key(k).ok_or_else(|| FolioError::UnknownAmc(k.to_string())))
        .transpose()
}

#[derive(Parser)]
#[command(
    name = "amcfolio",
    version,
    about = "Normalize mutual-fund portfolio disclosure workbooks into JSON and SQLite."
)]
pub struct Cli {
    /// Log per-sheet and per-row detail
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Extract listed-equity holdings from one AMC workbook.
    Extract {
        /// Path to the AMC portfolio spreadsheet
        excel_file: String,
        /// AMC key or short code (detected from the path or sheet headers when omitted)
        #[arg(long)]
        amc: Option<String>,
        /// Output JSON path (default: <output_dir>/<amc>_equity_holdings_<YYYYMM>.json)
        #[arg(short, long)]
        output: Option<String>,
        /// Report date override: YYYY-MM-DD
        #[arg(short, long)]
        date: Option<String>,
    },
    /// Extract every workbook in a directory and write a batch summary.
    Batch {
        /// Directory containing .xlsx/.xlsm/.xls files
        input_dir: String,
        /// AMC key or short code (detected per file when omitted)
        #[arg(long)]
        amc: Option<String>,
        /// Output directory (default: settings output_dir)
        #[arg(short, long = "output-dir")]
        output_dir: Option<String>,
    },
    /// Load extraction JSON documents into the SQLite database.
    #[cfg(feature = "sqlite")]
    Load {
        /// One or more extraction JSON files
        #[arg(required = true)]
        files: Vec<String>,
        /// Database path (default: settings database_path)
        #[arg(long)]
        database: Option<String>,
    },
    /// List supported AMC profiles.
    Amcs,
    /// Show fund and metadata counts of an extraction JSON file.
    Summary {
        /// Extraction JSON file
        file: String,
    },
    /// Flatten holdings of an extraction JSON file to CSV.
    Export {
        /// Extraction JSON file
        file: String,
        /// CSV output path (default: stdout)
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Show or update settings.
    Config {
        /// Default output directory for JSON documents
        #[arg(long = "output-dir")]
        output_dir: Option<String>,
        /// Default SQLite database path
        #[arg(long)]
        database: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_extract_flags() {
        let cli = Cli::try_parse_from([
            "amcfolio", "extract", "jan.xlsx", "--amc", "axis", "-o", "out.json", "-d", "2026-01-31", "-v",
        ])
        .unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Extract { excel_file, amc, output, date } => {
                assert_eq!(excel_file, "jan.xlsx");
                assert_eq!(amc.as_deref(), Some("axis"));
                assert_eq!(output.as_deref(), Some("out.json"));
                assert_eq!(date.as_deref(), Some("2026-01-31"));
            }
            _ => panic!("expected extract"),
        }
    }

    #[test]
    fn test_parse_amc_opt() {
        assert_eq!(parse_amc_opt(Some("kotak")).unwrap(), Some(AmcKind::Kotak));
        assert_eq!(parse_amc_opt(None).unwrap(), None);
        assert!(matches!(parse_amc_opt(Some("hdfc")), Err(FolioError::UnknownAmc(_))));
    }
}
