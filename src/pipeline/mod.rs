// ETL pipeline: extract, transform, load, verify

pub mod derive;
pub mod extract;
pub mod load;
pub mod normalize;
pub mod orchestrator;
pub mod query;
pub mod rates;

// Re-export key types and functions from each stage
pub use derive::{derive_column, derive_columns, DerivedColumn, Multiplier};
pub use extract::{extract, ColumnSpec, RowRule};
pub use load::{write_csv, write_table, write_table_with_columns};
pub use normalize::parse_numeric;
pub use orchestrator::{Pipeline, PipelineReport, Stage};
pub use query::{run_query, QueryOutput};
pub use rates::RateTable;
