// src/config/consts.rs

// Source pages
pub const WORLD_URL: &str = "https://www.worldometers.info/world-population/";
pub const COUNTRIES_URL: &str = "https://www.worldometers.info/world-population/population-by-country/";
pub const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

// Document store
pub const ELASTICSEARCH_HOST: &str = "http://localhost:9200";
pub const INDEX_NAME: &str = "population";
pub const STORE_TIMEOUT_SECS: u64 = 30;

// Fetch
pub const STATIC_TIMEOUT_SECS: u64 = 20;
pub const NAVIGATION_TIMEOUT_SECS: u64 = 120;
pub const READY_TIMEOUT_SECS: u64 = 60;
pub const READY_POLL_MS: u64 = 1_000;
pub const SETTLE_MS: u64 = 500;
pub const MIN_TABLE_ROWS: usize = 200;
pub const DIAGNOSTICS_DIR: &str = ".store/diagnostics";

// Retry
pub const FETCH_MAX_ATTEMPTS: u32 = 3;
pub const RETRY_BASE_MS: u64 = 2_000;
pub const RETRY_FACTOR: u32 = 2;
pub const RETRY_MAX_MS: u64 = 30_000;

// Schedule
pub const RUN_INTERVAL_SECS: u64 = 300;
pub const CRITICAL_RETRY_SECS: u64 = 5;

// Validation
pub const WORLD_POPULATION_FLOOR: i64 = 1_000_000_000;
pub const MIN_COUNTRIES: usize = 200;
pub const EXPECTED_COUNTRIES: usize = 233;
pub const MAX_RECORD_VIOLATIONS: usize = 5;
pub const MAX_ABS_YEARLY_CHANGE: f64 = 100.0;
pub const MED_AGE_RANGE: (f64, f64) = (5.0, 80.0);
pub const CRITICAL_COUNTRIES: &[&str] =
    &["China", "India", "USA", "Indonesia", "Pakistan", "Nigeria", "Brazil"];

// Canonical names for labels the country table uses
pub const DEFAULT_ALIASES: &[(&str, &str)] = &[
    ("United States", "USA"),
    ("Congo", "DR Congo"),
    ("Iran (Islamic Republic of)", "Iran"),
    ("Viet Nam", "Vietnam"),
    ("Czechia", "Czech Republic"),
    ("South Korea", "Republic of Korea"),
];

// Logging
pub const DEFAULT_LOG_FILTER: &str = "pop_scrape=info";
