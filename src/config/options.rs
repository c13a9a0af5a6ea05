// src/config/options.rs
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use super::consts::*;
use crate::core::retry::RetryPolicy;
use crate::error::ConfigError;

#[derive(Clone, Debug, PartialEq, Default)]
pub struct AppOptions {
    pub source: SourceOptions,
    pub fetch: FetchOptions,
    pub store: StoreOptions,
    pub validation: ValidationOptions,
    pub schedule: ScheduleOptions,
    pub alias_file: Option<PathBuf>,
    pub log_file: Option<PathBuf>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceOptions {
    pub world_url: String,
    pub countries_url: String,
    pub user_agent: String,
}

impl Default for SourceOptions {
    fn default() -> Self {
        Self {
            world_url: s!(WORLD_URL),
            countries_url: s!(COUNTRIES_URL),
            user_agent: s!(USER_AGENT),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FetchMode {
    Static,
    Browser,
}

impl FromStr for FetchMode {
    type Err = ConfigError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "static" | "http" => Ok(FetchMode::Static),
            "browser" | "dynamic" => Ok(FetchMode::Browser),
            other => Err(ConfigError::Invalid { key: "SCRAPE_MODE", value: s!(other) }),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchOptions {
    pub mode: FetchMode,
    pub retry: RetryPolicy,
    pub static_timeout: Duration,
    pub navigation_timeout: Duration,
    pub ready_timeout: Duration,
    pub ready_poll: Duration,
    pub settle: Duration,
    pub min_table_rows: usize,
    pub diagnostics_dir: PathBuf,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            mode: FetchMode::Static,
            retry: RetryPolicy {
                max_attempts: FETCH_MAX_ATTEMPTS,
                base_delay: Duration::from_millis(RETRY_BASE_MS),
                factor: RETRY_FACTOR,
                max_delay: Duration::from_millis(RETRY_MAX_MS),
            },
            static_timeout: Duration::from_secs(STATIC_TIMEOUT_SECS),
            navigation_timeout: Duration::from_secs(NAVIGATION_TIMEOUT_SECS),
            ready_timeout: Duration::from_secs(READY_TIMEOUT_SECS),
            ready_poll: Duration::from_millis(READY_POLL_MS),
            settle: Duration::from_millis(SETTLE_MS),
            min_table_rows: MIN_TABLE_ROWS,
            diagnostics_dir: PathBuf::from(DIAGNOSTICS_DIR),
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct StoreOptions {
    pub host: String,
    pub index: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub insecure_tls: bool,
    pub timeout: Duration,
}

// Hand-written so the password never reaches the logs.
impl std::fmt::Debug for StoreOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreOptions")
            .field("host", &self.host)
            .field("index", &self.index)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("insecure_tls", &self.insecure_tls)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            host: s!(ELASTICSEARCH_HOST),
            index: s!(INDEX_NAME),
            username: None,
            password: None,
            insecure_tls: false,
            timeout: Duration::from_secs(STORE_TIMEOUT_SECS),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ValidationOptions {
    pub world_population_floor: i64,
    pub min_countries: usize,
    pub expected_countries: usize,
    pub critical_countries: Vec<String>,
    pub missing_critical_is_error: bool,
    pub max_record_violations: usize,
    pub max_abs_yearly_change: f64,
    pub med_age_range: (f64, f64),
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            world_population_floor: WORLD_POPULATION_FLOOR,
            min_countries: MIN_COUNTRIES,
            expected_countries: EXPECTED_COUNTRIES,
            critical_countries: CRITICAL_COUNTRIES.iter().map(|c| s!(*c)).collect(),
            missing_critical_is_error: false,
            max_record_violations: MAX_RECORD_VIOLATIONS,
            max_abs_yearly_change: MAX_ABS_YEARLY_CHANGE,
            med_age_range: MED_AGE_RANGE,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScheduleOptions {
    pub interval: Duration,
    pub critical_retry: Duration,
}

impl Default for ScheduleOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(RUN_INTERVAL_SECS),
            critical_retry: Duration::from_secs(CRITICAL_RETRY_SECS),
        }
    }
}

impl AppOptions {
    /// Defaults overridden by the process environment (after `.env` is loaded).
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an explicit variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut opts = AppOptions::default();

        if let Some(v) = get("WORLD_URL") { opts.source.world_url = v; }
        if let Some(v) = get("COUNTRIES_URL") { opts.source.countries_url = v; }
        if let Some(v) = get("USER_AGENT") { opts.source.user_agent = v; }

        if let Some(v) = get("SCRAPE_MODE") { opts.fetch.mode = v.parse()?; }
        if let Some(v) = get("FETCH_MAX_ATTEMPTS") {
            opts.fetch.retry.max_attempts = parse_num("FETCH_MAX_ATTEMPTS", &v)?;
            if opts.fetch.retry.max_attempts == 0 {
                return Err(ConfigError::Invalid { key: "FETCH_MAX_ATTEMPTS", value: v });
            }
        }
        if let Some(v) = get("DIAGNOSTICS_DIR") { opts.fetch.diagnostics_dir = PathBuf::from(v); }

        if let Some(v) = get("ELASTICSEARCH_HOST") { opts.store.host = v; }
        if let Some(v) = get("INDEX_NAME") { opts.store.index = v; }
        opts.store.username = get("ELASTIC_USERNAME");
        opts.store.password = get("ELASTIC_PASSWORD");
        if let Some(v) = get("ELASTIC_INSECURE_TLS") {
            opts.store.insecure_tls = parse_bool("ELASTIC_INSECURE_TLS", &v)?;
        }

        if let Some(v) = get("SCRAPE_INTERVAL_SECS") {
            opts.schedule.interval = Duration::from_secs(parse_num("SCRAPE_INTERVAL_SECS", &v)?);
        }
        if let Some(v) = get("CRITICAL_RETRY_SECS") {
            opts.schedule.critical_retry = Duration::from_secs(parse_num("CRITICAL_RETRY_SECS", &v)?);
        }

        opts.alias_file = get("ALIAS_FILE").map(PathBuf::from);
        opts.log_file = get("LOG_FILE").map(PathBuf::from);

        if opts.store.username.is_some() != opts.store.password.is_some() {
            return Err(ConfigError::Missing(if opts.store.username.is_some() {
                "ELASTIC_PASSWORD"
            } else {
                "ELASTIC_USERNAME"
            }));
        }
        Ok(opts)
    }
}

fn parse_num<T: FromStr>(key: &'static str, v: &str) -> Result<T, ConfigError> {
    v.parse().map_err(|_| ConfigError::Invalid { key, value: s!(v) })
}

fn parse_bool(key: &'static str, v: &str) -> Result<bool, ConfigError> {
    match v.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid { key, value: s!(v) }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (s!(*k), s!(*v))).collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn defaults_without_env() {
        let opts = AppOptions::from_lookup(|_| None).unwrap();
        assert_eq!(opts, AppOptions::default());
        assert_eq!(opts.fetch.mode, FetchMode::Static);
        assert_eq!(opts.store.index, INDEX_NAME);
    }

    #[test]
    fn env_overrides() {
        let opts = AppOptions::from_lookup(lookup(&[
            ("ELASTICSEARCH_HOST", "https://es:9200"),
            ("INDEX_NAME", "pop_v2"),
            ("ELASTIC_USERNAME", "elastic"),
            ("ELASTIC_PASSWORD", "hunter2"),
            ("ELASTIC_INSECURE_TLS", "true"),
            ("SCRAPE_MODE", "browser"),
            ("SCRAPE_INTERVAL_SECS", "600"),
            ("FETCH_MAX_ATTEMPTS", "5"),
        ]))
        .unwrap();
        assert_eq!(opts.store.host, "https://es:9200");
        assert_eq!(opts.store.index, "pop_v2");
        assert!(opts.store.insecure_tls);
        assert_eq!(opts.fetch.mode, FetchMode::Browser);
        assert_eq!(opts.schedule.interval, Duration::from_secs(600));
        assert_eq!(opts.fetch.retry.max_attempts, 5);
        assert!(!format!("{:?}", opts.store).contains("hunter2"));
    }

    #[test]
    fn blank_values_are_ignored() {
        let opts = AppOptions::from_lookup(lookup(&[("INDEX_NAME", "  ")])).unwrap();
        assert_eq!(opts.store.index, INDEX_NAME);
    }

    #[test]
    fn invalid_values_rejected() {
        assert!(AppOptions::from_lookup(lookup(&[("SCRAPE_MODE", "carrier-pigeon")])).is_err());
        assert!(AppOptions::from_lookup(lookup(&[("SCRAPE_INTERVAL_SECS", "soon")])).is_err());
        assert!(AppOptions::from_lookup(lookup(&[("FETCH_MAX_ATTEMPTS", "0")])).is_err());
        assert!(matches!(
            AppOptions::from_lookup(lookup(&[("ELASTIC_USERNAME", "elastic")])),
            Err(ConfigError::Missing("ELASTIC_PASSWORD"))
        ));
    }
}
