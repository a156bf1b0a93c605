use crate::app::ports::DocumentSource;
use crate::config::EtlConfig;
use crate::error::{EtlError, Result};
use crate::infra::http_client::LocationSource;
use crate::logging::ProgressLog;
use crate::parser::{HtmlTableParser, TableParser};
use crate::pipeline::derive::derive_columns;
use crate::pipeline::extract::{all_rules, extract, schema_for};
use crate::pipeline::load::{open_database, write_csv, write_table_with_columns};
use crate::pipeline::query::{run_query, QueryOutput};
use crate::pipeline::rates::RateTable;
use crate::types::{DroppedRow, Extraction, RecordSet};
use std::fmt;
use std::path::PathBuf;
use tracing::{info, instrument, warn};

/// Pipeline states, visited strictly in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Init,
    Extracted,
    Transformed,
    CsvWritten,
    DbConnected,
    DbWritten,
    Queried,
    Done,
}

impl Stage {
    pub fn next(self) -> Option<Stage> {
        match self {
            Stage::Init => Some(Stage::Extracted),
            Stage::Extracted => Some(Stage::Transformed),
            Stage::Transformed => Some(Stage::CsvWritten),
            Stage::CsvWritten => Some(Stage::DbConnected),
            Stage::DbConnected => Some(Stage::DbWritten),
            Stage::DbWritten => Some(Stage::Queried),
            Stage::Queried => Some(Stage::Done),
            Stage::Done => None,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Init => "INIT",
            Stage::Extracted => "EXTRACTED",
            Stage::Transformed => "TRANSFORMED",
            Stage::CsvWritten => "CSV_WRITTEN",
            Stage::DbConnected => "DB_CONNECTED",
            Stage::DbWritten => "DB_WRITTEN",
            Stage::Queried => "QUERIED",
            Stage::Done => "DONE",
        };
        f.write_str(name)
    }
}

/// Result of a complete pipeline run
#[derive(Debug)]
pub struct PipelineReport {
    pub stage: Stage,
    pub fields: Vec<String>,
    pub records: usize,
    pub dropped: Vec<DroppedRow>,
    pub csv_path: PathBuf,
    pub database: String,
    pub table_name: String,
    pub queries: Vec<QueryOutput>,
}

/// Runs extract → transform → load → verify for one configuration.
pub struct Pipeline {
    config: EtlConfig,
    source: Box<dyn DocumentSource>,
    progress: ProgressLog,
    stage: Stage,
}

impl Pipeline {
    pub fn new(config: EtlConfig, source: Box<dyn DocumentSource>) -> Result<Self> {
        config.validate()?;
        let progress = ProgressLog::new(config.log_file.clone());
        Ok(Self {
            config,
            source,
            progress,
            stage: Stage::Init,
        })
    }

    /// Pipeline fetching over HTTP(S) or from the local filesystem.
    pub fn with_default_source(config: EtlConfig) -> Result<Self> {
        Self::new(config, Box::new(LocationSource::new()))
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn config(&self) -> &EtlConfig {
        &self.config
    }

    fn advance(&mut self, to: Stage) {
        debug_assert_eq!(self.stage.next(), Some(to), "stages run in order");
        info!("Stage {} -> {}", self.stage, to);
        self.stage = to;
    }

    /// Logs a fatal stage failure to the audit trail and hands the error back.
    fn failed(&self, what: &str, error: EtlError) -> EtlError {
        self.progress.log(&format!("{} failed: {}", what, error));
        error
    }

    /// Runs every stage once. Fatal errors are logged and returned; the
    /// pipeline cannot be resumed afterwards.
    #[instrument(skip(self), fields(table = %self.config.table_name))]
    pub async fn run(&mut self) -> Result<PipelineReport> {
        if self.stage != Stage::Init {
            return Err(EtlError::Config(format!(
                "pipeline already ran to {}",
                self.stage
            )));
        }

        self.progress.log("Preliminaries complete. Initiating ETL process.");

        let extraction = self.extract_stage().await.map_err(|e| self.failed("Data extraction", e))?;
        let Extraction { records, dropped } = extraction;
        self.advance(Stage::Extracted);
        self.progress.log("Data extraction complete. Initiating Transformation process.");

        let records = self.transform_stage(records).await.map_err(|e| self.failed("Data transformation", e))?;
        self.advance(Stage::Transformed);
        self.progress.log("Data transformation complete. Initiating Loading process.");

        write_csv(&records, &self.config.csv_path).map_err(|e| self.failed("CSV write", e))?;
        self.advance(Stage::CsvWritten);
        self.progress.log("Data saved to CSV file.");

        let mut conn = open_database(&self.config.database).map_err(|e| self.failed("SQL connection", e))?;
        self.advance(Stage::DbConnected);
        self.progress.log("SQL Connection initiated.");

        write_table_with_columns(&records, &mut conn, &self.config.table_name, &self.config.columns)
            .map_err(|e| self.failed("Database load", e))?;
        self.advance(Stage::DbWritten);
        self.progress.log("Data loaded to Database as a table, Executing queries.");

        let fields = records.schema().fields().to_vec();
        let record_count = records.len();
        drop(records);

        let mut outputs = Vec::new();
        for query in self.config.expanded_queries() {
            let output = run_query(&query, &conn).map_err(|e| self.failed("Query", e))?;
            println!("{}", output);
            self.progress.log(&format!("Query executed: {}", query));
            outputs.push(output);
        }
        self.advance(Stage::Queried);

        if let Err((_, e)) = conn.close() {
            warn!("Closing the database reported: {}", e);
        }
        self.advance(Stage::Done);
        self.progress.log("Process Complete");

        Ok(PipelineReport {
            stage: self.stage,
            fields,
            records: record_count,
            dropped,
            csv_path: self.config.csv_path.clone(),
            database: self.config.database.clone(),
            table_name: self.config.table_name.clone(),
            queries: outputs,
        })
    }

    async fn extract_stage(&self) -> Result<Extraction> {
        let html = self.source.fetch(&self.config.source_url).await?;
        let parser = HtmlTableParser::new(self.config.table.clone());

        let Some(raw) = parser.parse(&html)? else {
            self.progress.log(&format!(
                "No table matched {:?}; continuing with no records.",
                self.config.table
            ));
            return Ok(Extraction {
                records: RecordSet::new(schema_for(&self.config.columns)?),
                dropped: Vec::new(),
            });
        };

        let extraction = extract(&raw, &self.config.columns, all_rules(&self.config.rules))?;
        let failures = extraction.coercion_failures().count();
        if failures > 0 {
            self.progress.log(&format!("Dropped {} rows with unreadable cells.", failures));
        }
        if extraction.records.is_empty() {
            self.progress.log("Extraction produced no records.");
        }
        Ok(extraction)
    }

    async fn transform_stage(&self, records: RecordSet) -> Result<RecordSet> {
        let rates = match &self.config.rates_source {
            Some(location) => {
                let text = self.source.fetch(location).await?;
                let rates = RateTable::from_csv_str(&text)?;
                if rates.is_empty() {
                    self.progress.log("Exchange rate table is empty; rate columns pass through at 1.0.");
                }
                rates
            }
            None => {
                if self.config.uses_rates() {
                    self.progress.log("No exchange rate source configured; rate columns pass through at 1.0.");
                }
                RateTable::default()
            }
        };

        derive_columns(records, &self.config.derived, &rates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_order_is_linear() {
        let mut stage = Stage::Init;
        let mut seen = vec![stage];
        while let Some(next) = stage.next() {
            assert!(next > stage);
            seen.push(next);
            stage = next;
        }
        assert_eq!(seen.len(), 8);
        assert_eq!(stage, Stage::Done);
    }

    #[test]
    fn test_stage_names() {
        assert_eq!(Stage::CsvWritten.to_string(), "CSV_WRITTEN");
        assert_eq!(Stage::Done.to_string(), "DONE");
    }

    #[test]
    fn test_invalid_config_is_rejected_up_front() {
        let mut config = EtlConfig::largest_banks();
        config.columns.clear();
        assert!(Pipeline::with_default_source(config).is_err());
    }
}
