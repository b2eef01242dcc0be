mod amc;
mod batch;
mod cells;
mod cli;
#[cfg(feature = "sqlite")]
mod db;
mod error;
mod fmt;
mod holdings;
#[cfg(feature = "sqlite")]
mod loader;
mod models;
mod pipeline;
mod report_date;
mod scheme_index;
mod section;
mod settings;
mod workbook;

use clap::Parser;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use cli::{Cli, Commands};

fn init_logging(verbose: bool) {
    let default = if verbose { "amcfolio=debug" } else { "amcfolio=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .finish();
    // Only fails if a subscriber is already installed.
    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Extract {
            excel_file,
            amc,
            output,
            date,
        } => cli::extract::run(&excel_file, amc.as_deref(), output.as_deref(), date.as_deref()),
        Commands::Batch {
            input_dir,
            amc,
            output_dir,
        } => cli::batch::run(&input_dir, amc.as_deref(), output_dir.as_deref()),
        #[cfg(feature = "sqlite")]
        Commands::Load { files, database } => cli::load::run(&files, database.as_deref()),
        Commands::Amcs => cli::amcs::run(),
        Commands::Summary { file } => cli::summary::run(&file),
        Commands::Export { file, output } => cli::export::run(&file, output.as_deref()),
        Commands::Config {
            output_dir,
            database,
        } => cli::config::run(output_dir, database),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
