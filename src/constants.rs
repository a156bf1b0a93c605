/// Defaults for the built-in pipeline profiles.
/// The `largest_banks` profile is the default run.

// Profile names (used in CLI)
pub const LARGEST_BANKS_PROFILE: &str = "largest_banks";
pub const COUNTRIES_BY_GDP_PROFILE: &str = "countries_by_gdp";

// Largest banks by market capitalisation
pub const BANKS_URL: &str =
    "https://web.archive.org/web/20230908091635/https://en.wikipedia.org/wiki/List_of_largest_banks";
pub const EXCHANGE_RATE_CSV_URL: &str = "https://cf-courses-data.s3.us.cloud-object-storage.appdomain.cloud/IBMSkillsNetwork-PY0221EN-Coursera/labs/v2/exchange_rate.csv";
pub const BANKS_TABLE_CLASS: &str = "wikitable";
pub const BANKS_CSV_PATH: &str = "./Largest_banks_data.csv";
pub const BANKS_DB_PATH: &str = "Banks.db";
pub const BANKS_TABLE_NAME: &str = "Largest_banks";

// Countries by nominal GDP
pub const GDP_URL: &str = "https://web.archive.org/web/20230902185326/https://en.wikipedia.org/wiki/List_of_countries_by_GDP_%28nominal%29";
pub const GDP_TABLE_BODY_INDEX: usize = 2;
pub const GDP_CSV_PATH: &str = "./Countries_by_GDP.csv";
pub const GDP_DB_PATH: &str = "World_Economies.db";
pub const GDP_TABLE_NAME: &str = "Countries_by_GDP";

pub const LOG_FILE: &str = "code_log.txt";

/// Directory for the rolling diagnostic log written by `tracing`.
pub const DIAGNOSTIC_LOG_DIR: &str = "logs";

/// Year-Monthname-Day-Hour-Minute-Second
pub const PROGRESS_TIMESTAMP_FORMAT: &str = "%Y-%b-%d-%H:%M:%S";

/// Cell text meaning "value intentionally absent".
pub const SENTINEL: &str = "—";

/// Placeholder substituted with the configured table name in verification queries.
pub const TABLE_PLACEHOLDER: &str = "{table}";

/// Multiplier used when a rate code has no entry in the rate table.
pub const PASS_THROUGH_RATE: f64 = 1.0;

/// Get all built-in profile names
pub fn get_supported_profiles() -> Vec<&'static str> {
    vec![LARGEST_BANKS_PROFILE, COUNTRIES_BY_GDP_PROFILE]
}
