use crate::constants::*;
use crate::error::{EtlError, Result};
use crate::parser::TableSelector;
use crate::pipeline::derive::{DerivedColumn, Multiplier};
use crate::pipeline::extract::{ColumnSpec, RowRule};
use crate::types::FieldKind;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Everything one run needs, passed to the pipeline at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EtlConfig {
    /// Document holding the table.
    pub source_url: String,
    /// CSV with `Currency` and `Rate` columns; only needed by rate-based derivations.
    #[serde(default)]
    pub rates_source: Option<String>,
    pub csv_path: PathBuf,
    /// SQLite database file, or `:memory:`.
    pub database: String,
    pub table_name: String,
    pub log_file: PathBuf,
    pub table: TableSelector,
    pub columns: Vec<ColumnSpec>,
    #[serde(default)]
    pub rules: Vec<RowRule>,
    #[serde(default)]
    pub derived: Vec<DerivedColumn>,
    /// Verification queries; `{table}` expands to `table_name`.
    #[serde(default)]
    pub queries: Vec<String>,
}

impl EtlConfig {
    /// Largest banks by market capitalisation, with GBP, EUR and INR columns.
    pub fn largest_banks() -> Self {
        Self {
            source_url: BANKS_URL.to_string(),
            rates_source: Some(EXCHANGE_RATE_CSV_URL.to_string()),
            csv_path: PathBuf::from(BANKS_CSV_PATH),
            database: BANKS_DB_PATH.to_string(),
            table_name: BANKS_TABLE_NAME.to_string(),
            log_file: PathBuf::from(LOG_FILE),
            table: TableSelector::Class(BANKS_TABLE_CLASS.to_string()),
            columns: vec![
                ColumnSpec::text("Name", 1),
                ColumnSpec::number("MC_USD_Billion", 2),
            ],
            rules: vec![RowRule::MinCells { count: 3 }, RowRule::NonEmpty { cell: 1 }],
            derived: vec![
                DerivedColumn::rate("MC_GBP_Billion", "MC_USD_Billion", "GBP"),
                DerivedColumn::rate("MC_EUR_Billion", "MC_USD_Billion", "EUR"),
                DerivedColumn::rate("MC_INR_Billion", "MC_USD_Billion", "INR"),
            ],
            queries: vec![
                "SELECT * FROM {table}".to_string(),
                "SELECT AVG(MC_GBP_Billion) FROM {table}".to_string(),
                "SELECT Name FROM {table} LIMIT 5".to_string(),
            ],
        }
    }

    /// Countries by nominal GDP, converted from millions to billions of USD.
    ///
    /// Rows are kept when the country cell has text and the estimate is not the
    /// sentinel. Cells are captured as text only, so whether the country cell
    /// holds a link is not checked; footer rows on the live page are caught by
    /// the blank-cell and sentinel rules instead.
    pub fn countries_by_gdp() -> Self {
        Self {
            source_url: GDP_URL.to_string(),
            rates_source: None,
            csv_path: PathBuf::from(GDP_CSV_PATH),
            database: GDP_DB_PATH.to_string(),
            table_name: GDP_TABLE_NAME.to_string(),
            log_file: PathBuf::from(LOG_FILE),
            table: TableSelector::NthBody(GDP_TABLE_BODY_INDEX),
            columns: vec![
                ColumnSpec::text("Country", 0),
                ColumnSpec::number("GDP_USD_millions", 2),
            ],
            rules: vec![
                RowRule::MinCells { count: 3 },
                RowRule::NonEmpty { cell: 0 },
                RowRule::NotSentinel { cell: 2 },
            ],
            derived: vec![DerivedColumn::fixed("GDP_USD_billions", "GDP_USD_millions", 0.001)],
            queries: vec!["SELECT * FROM {table} WHERE GDP_USD_billions >= 100".to_string()],
        }
    }

    pub fn profile(name: &str) -> Result<Self> {
        match name {
            LARGEST_BANKS_PROFILE => Ok(Self::largest_banks()),
            COUNTRIES_BY_GDP_PROFILE => Ok(Self::countries_by_gdp()),
            other => Err(EtlError::Config(format!(
                "unknown profile '{}'; available: {}",
                other,
                get_supported_profiles().join(", ")
            ))),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            EtlError::Config(format!("Failed to read config file '{}': {}", path.display(), e))
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: EtlConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Output fields in order: extracted columns, then derived ones.
    pub fn fields(&self) -> Vec<&str> {
        self.columns
            .iter()
            .map(|c| c.name.as_str())
            .chain(self.derived.iter().map(|d| d.name.as_str()))
            .collect()
    }

    /// True when some derived column takes its multiplier from the rate table.
    pub fn uses_rates(&self) -> bool {
        self.derived
            .iter()
            .any(|d| matches!(d.multiplier, Multiplier::Rate(_)))
    }

    pub fn expanded_queries(&self) -> Vec<String> {
        self.queries
            .iter()
            .map(|q| q.replace(TABLE_PLACEHOLDER, &self.table_name))
            .collect()
    }

    pub fn validate(&self) -> Result<()> {
        if self.columns.is_empty() {
            return Err(EtlError::Config("at least one column must be declared".into()));
        }
        if self.table_name.trim().is_empty() {
            return Err(EtlError::Config("table_name must not be empty".into()));
        }
        if self.queries.iter().any(|q| q.trim().is_empty()) {
            return Err(EtlError::Config("queries must not be empty strings".into()));
        }

        let mut seen = HashSet::new();
        for field in self.fields() {
            if !seen.insert(field) {
                return Err(EtlError::Config(format!("field '{}' is declared twice", field)));
            }
        }

        for derived in &self.derived {
            let numeric_source = self
                .columns
                .iter()
                .any(|c| c.name == derived.source && c.kind == FieldKind::Number);
            if !numeric_source {
                return Err(EtlError::Config(format!(
                    "derived field '{}' needs '{}' to be an extracted number column",
                    derived.name, derived.source
                )));
            }
        }

        Ok(())
    }
}

impl Default for EtlConfig {
    fn default() -> Self {
        Self::largest_banks()
    }
}
