use crate::core::constraints::DEFAULT_CHECK_ORDER;
use crate::core::{CompetitiveThresholds, GradeThresholds, NeighborhoodTuning};
use crate::models::{MatchWeights, NeighborhoodWeights};
use crate::services::cache::DEFAULT_TTL_HOURS;
use crate::services::scoring::DEFAULT_MAX_BATCH_SIZE;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;

/// Tolerance for weight sets that must sum to 1
const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Application configuration
///
/// Every section has defaults, so the service starts with no configuration
/// file at all (in-memory cache, seed-file records).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub store: StoreSettings,
    pub cache: CacheSettings,
    pub index: IndexSettings,
    pub scoring: ScoringSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            workers: None,
        }
    }
}

/// PostgreSQL connection; without a URL the service runs fully in memory
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    pub url: Option<String>,
    pub max_connections: Option<u32>,
    pub min_connections: Option<u32>,
    pub acquire_timeout_secs: Option<u64>,
    pub idle_timeout_secs: Option<u64>,
}

/// Listing/opportunity document API
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    /// Base URL of the document API; unset means records come from `seed_path`
    pub endpoint: Option<String>,
    pub api_key: String,
    pub timeout_secs: u64,
    pub listings_collection: String,
    pub opportunities_collection: String,
    pub broker_profiles_collection: String,
    /// JSON file with `listings`, `opportunities` and `brokers` arrays
    pub seed_path: Option<String>,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key: String::new(),
            timeout_secs: 30,
            listings_collection: "property_listings".to_string(),
            opportunities_collection: "opportunities".to_string(),
            broker_profiles_collection: "broker_profiles".to_string(),
            seed_path: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    Memory,
    Postgres,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub backend: CacheBackend,
    pub ttl_hours: i64,
    /// Entry bound for the in-memory backend
    pub max_entries: u64,
    /// Seconds between expiry sweeps; 0 disables the sweeper
    pub sweep_interval_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            backend: CacheBackend::Memory,
            ttl_hours: DEFAULT_TTL_HOURS,
            max_entries: 100_000,
            sweep_interval_secs: 3600,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IndexSettings {
    /// Seconds between index rebuilds; 0 disables the refresher
    pub refresh_interval_secs: u64,
    /// JSON array of government property records, used when no database is configured
    pub seed_path: Option<String>,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            refresh_interval_secs: 3600,
            seed_path: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScoringSettings {
    pub neighborhood_weights: NeighborhoodWeights,
    pub match_weights: MatchWeights,
    pub grades: GradeThresholds,
    pub tuning: NeighborhoodTuning,
    pub competitive: CompetitiveThresholds,
    /// Constraint check names, in evaluation order
    pub check_order: Vec<String>,
    pub max_batch_size: usize,
}

impl Default for ScoringSettings {
    fn default() -> Self {
        Self {
            neighborhood_weights: NeighborhoodWeights::default(),
            match_weights: MatchWeights::default(),
            grades: GradeThresholds::default(),
            tuning: NeighborhoodTuning::default(),
            competitive: CompetitiveThresholds::default(),
            check_order: DEFAULT_CHECK_ORDER.iter().map(|name| name.to_string()).collect(),
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }

fn environment() -> Environment {
    // e.g., FEDLEASE__SERVER__PORT -> server.port
    Environment::with_prefix("FEDLEASE")
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("scoring.check_order")
}

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the structs
    /// 2. Configuration files (config/default.toml, then config/local.toml)
    /// 3. Environment variables (prefixed with FEDLEASE__)
    pub fn load() -> Result<Self, ConfigError> {
        let mut settings = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(environment())
            .build()?;

        settings = substitute_env_vars(settings)?;

        let settings: Settings = settings.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings: Settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(environment())
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    /// Reject configurations the engines cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let scoring = &self.scoring;

        if (scoring.neighborhood_weights.total() - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(ConfigError::Message(format!(
                "neighborhood weights ({}) sum to {}, expected 1.0",
                scoring.neighborhood_weights.version,
                scoring.neighborhood_weights.total()
            )));
        }
        if (scoring.match_weights.total() - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(ConfigError::Message(format!(
                "match weights ({}) sum to {}, expected 1.0",
                scoring.match_weights.version,
                scoring.match_weights.total()
            )));
        }
        if !scoring.grades.is_consistent() {
            return Err(ConfigError::Message(format!(
                "grade thresholds ({}) must be strictly descending within [0, 100]",
                scoring.grades.version
            )));
        }
        if scoring.max_batch_size == 0 {
            return Err(ConfigError::Message("scoring.max_batch_size must be positive".into()));
        }
        if self.cache.ttl_hours <= 0 {
            return Err(ConfigError::Message("cache.ttl_hours must be positive".into()));
        }
        if self.cache.backend == CacheBackend::Postgres && self.database.url.is_none() {
            return Err(ConfigError::Message(
                "cache.backend = \"postgres\" requires database.url".into(),
            ));
        }

        Ok(())
    }
}

/// Apply well-known unprefixed environment variables
///
/// `DATABASE_URL` is honored alongside `FEDLEASE__DATABASE__URL`, as most
/// Postgres tooling sets it.
fn substitute_env_vars(settings: Config) -> Result<Config, ConfigError> {
    use std::env;

    let database_url = env::var("DATABASE_URL")
        .or_else(|_| env::var("FEDLEASE__DATABASE__URL"))
        .ok();
    let store_api_key = env::var("STORE_API_KEY").ok();

    let mut builder = Config::builder().add_source(settings);

    if let Some(url) = database_url {
        builder = builder.set_override("database.url", url)?;
    }
    if let Some(api_key) = store_api_key {
        builder = builder.set_override("store.api_key", api_key)?;
    }

    builder.build()
}
