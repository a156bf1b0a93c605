use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use table_etl::config::EtlConfig;
use table_etl::constants;
use table_etl::logging;
use table_etl::pipeline::load::open_database;
use table_etl::pipeline::{run_query, Pipeline};
use tracing::info;

#[derive(Parser)]
#[command(name = "table_etl")]
#[command(about = "Extract an HTML table, derive currency columns, load it to CSV and SQLite")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full ETL pipeline
    Run {
        /// TOML configuration file; overrides --profile
        #[arg(long)]
        config: Option<PathBuf>,
        /// Built-in profile. Available: largest_banks, countries_by_gdp
        #[arg(long, default_value = constants::LARGEST_BANKS_PROFILE)]
        profile: String,
        /// Document URL or local HTML file
        #[arg(long)]
        source: Option<String>,
        /// Exchange rate CSV URL or local file
        #[arg(long)]
        rates: Option<String>,
        /// Output CSV path
        #[arg(long)]
        csv: Option<PathBuf>,
        /// SQLite database file
        #[arg(long)]
        db: Option<String>,
        /// Table name in the database
        #[arg(long)]
        table: Option<String>,
        /// Progress log file
        #[arg(long)]
        log_file: Option<PathBuf>,
    },
    /// Run a query against an existing database
    Query {
        /// SQLite database file
        #[arg(long)]
        db: String,
        /// SQL to execute
        sql: String,
    },
    /// List the built-in profiles
    Profiles,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    logging::init_logging(Path::new(constants::DIAGNOSTIC_LOG_DIR));

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            profile,
            source,
            rates,
            csv,
            db,
            table,
            log_file,
        } => {
            let mut etl_config = match config {
                Some(path) => EtlConfig::load(&path)?,
                None => EtlConfig::profile(&profile)?,
            };
            if let Some(source) = source {
                etl_config.source_url = source;
            }
            if rates.is_some() {
                etl_config.rates_source = rates;
            }
            if let Some(csv) = csv {
                etl_config.csv_path = csv;
            }
            if let Some(db) = db {
                etl_config.database = db;
            }
            if let Some(table) = table {
                etl_config.table_name = table;
            }
            if let Some(log_file) = log_file {
                etl_config.log_file = log_file;
            }

            info!("Starting pipeline for table {}", etl_config.table_name);
            let mut pipeline = Pipeline::with_default_source(etl_config)?;
            let report = pipeline.run().await.context("ETL run aborted")?;

            println!("\n📊 Pipeline Results for {}:", report.table_name);
            println!("   Final stage: {}", report.stage);
            println!("   Fields: {}", report.fields.join(", "));
            println!("   Records loaded: {}", report.records);
            println!("   Rows dropped: {}", report.dropped.len());
            println!("   CSV file: {}", report.csv_path.display());
            println!("   Database: {}", report.database);
        }
        Commands::Query { db, sql } => {
            let conn = open_database(&db)?;
            let output = run_query(&sql, &conn).with_context(|| format!("query failed on {}", db))?;
            println!("{}", output);
        }
        Commands::Profiles => {
            for name in constants::get_supported_profiles() {
                let config = EtlConfig::profile(name)?;
                println!("{:<18} {} -> {}", name, config.source_url, config.table_name);
            }
        }
    }

    Ok(())
}
