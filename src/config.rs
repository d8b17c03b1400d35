use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info};
use validator::{Validate, ValidationError};

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const CONFIG_DIR: &str = "config";
const DEFAULT_STORE_BACKEND: &str = "in-memory";
const DEFAULT_DATA_DIR: &str = "data";
const DEFAULT_ESTIMATED_MINUTES: u32 = 45;
const DEFAULT_DASHBOARD_REFRESH_SECS: u64 = 30;
const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 256;

/// Persistent store configuration
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    /// "in-memory" or "file"
    #[serde(default = "default_store_backend")]
    #[validate(custom = "validate_store_backend")]
    pub backend: String,

    /// Directory holding one JSON file per collection (file backend only)
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_store_backend(),
            data_dir: default_data_dir(),
        }
    }
}

impl StoreConfig {
    pub fn is_file_backed(&self) -> bool {
        self.backend.eq_ignore_ascii_case("file")
    }
}

/// Assignment scheduling configuration
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct SchedulingConfig {
    /// Base cleaning estimate before room-type and specialization weighting
    #[serde(default = "default_estimated_minutes")]
    #[validate(range(min = 5, max = 480))]
    pub default_estimated_minutes: u32,
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            default_estimated_minutes: default_estimated_minutes(),
        }
    }
}

/// Application configuration
#[derive(Clone, Debug, Deserialize, Validate)]
pub struct AppConfig {
    /// Environment name (development, test, production)
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    #[validate(custom = "validate_log_level")]
    pub log_level: String,

    /// Emit logs as JSON
    #[serde(default)]
    pub log_json: bool,

    #[serde(default)]
    #[validate]
    pub store: StoreConfig,

    #[serde(default)]
    #[validate]
    pub scheduling: SchedulingConfig,

    /// Seconds between dashboard samples
    #[serde(default = "default_dashboard_refresh_secs")]
    #[validate(range(min = 1))]
    pub dashboard_refresh_secs: u64,

    #[serde(default = "default_event_channel_capacity")]
    #[validate(range(min = 1))]
    pub event_channel_capacity: usize,

    /// Write seed data into collections that do not exist yet
    #[serde(default = "default_true")]
    pub seed_on_empty: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            environment: default_environment(),
            log_level: default_log_level(),
            log_json: false,
            store: StoreConfig::default(),
            scheduling: SchedulingConfig::default(),
            dashboard_refresh_secs: default_dashboard_refresh_secs(),
            event_channel_capacity: default_event_channel_capacity(),
            seed_on_empty: true,
        }
    }
}

impl AppConfig {
    /// In-memory configuration with no seeding, used by tests and embedders
    /// that load their own data.
    pub fn in_memory() -> Self {
        Self {
            environment: "test".to_string(),
            seed_on_empty: false,
            ..Self::default()
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }

    pub fn dashboard_refresh_interval(&self) -> Duration {
        Duration::from_secs(self.dashboard_refresh_secs)
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("Configuration loading failed: {0}")]
    Load(#[from] ConfigError),

    #[error("Configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn default_environment() -> String {
    DEFAULT_ENV.to_string()
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_store_backend() -> String {
    DEFAULT_STORE_BACKEND.to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(DEFAULT_DATA_DIR)
}

fn default_estimated_minutes() -> u32 {
    DEFAULT_ESTIMATED_MINUTES
}

fn default_dashboard_refresh_secs() -> u64 {
    DEFAULT_DASHBOARD_REFRESH_SECS
}

fn default_event_channel_capacity() -> usize {
    DEFAULT_EVENT_CHANNEL_CAPACITY
}

fn default_true() -> bool {
    true
}

/// Validates log level values
fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if valid_levels.contains(&level.to_lowercase().as_str()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("log_level");
        err.message = Some("Must be one of: trace, debug, info, warn, error".into());
        Err(err)
    }
}

fn validate_store_backend(backend: &str) -> Result<(), ValidationError> {
    match backend.to_lowercase().as_str() {
        "in-memory" | "file" => Ok(()),
        _ => {
            let mut err = ValidationError::new("store_backend");
            err.message = Some("Must be one of: in-memory, file".into());
            Err(err)
        }
    }
}

/// Initializes tracing using the provided log level as the default filter.
/// `RUST_LOG` takes precedence when set.
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_directive = format!("housekeeping_core={}", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    let filter = EnvFilter::new(filter_directive);
    if json {
        let _ = fmt().with_env_filter(filter).json().try_init();
    } else {
        let _ = fmt().with_env_filter(filter).try_init();
    }
}

/// Loads application configuration
///
/// Layers configuration sources in this order:
/// 1. Built-in defaults
/// 2. Default config (config/default.toml)
/// 3. Environment-specific config (config/{env}.toml)
/// 4. Environment variables (APP__*)
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    load_config_from(Path::new(CONFIG_DIR))
}

/// Same as [`load_config`] with an explicit config directory.
pub fn load_config_from(config_dir: &Path) -> Result<AppConfig, AppConfigError> {
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    info!("Loading configuration for environment: {}", run_env);

    if !config_dir.exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            config_dir.display()
        );
    }

    let default_file = config_dir.join("default");
    let env_file = config_dir.join(&run_env);

    let config = Config::builder()
        .set_default("environment", run_env.as_str())?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .add_source(File::with_name(&default_file.to_string_lossy()).required(false))
        .add_source(File::with_name(&env_file.to_string_lossy()).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    let app_config: AppConfig = config.try_deserialize()?;

    app_config.validate().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    info!(
        environment = %app_config.environment,
        backend = %app_config.store.backend,
        "Configuration loaded successfully"
    );
    Ok(app_config)
}
