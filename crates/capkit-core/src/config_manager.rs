use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(String),

    #[error("Failed to read config: {0}")]
    ReadError(String),

    #[error("Failed to parse config: {0}")]
    ParseError(String),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Main configuration for the CapKit insights engine
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CapkitConfig {
    /// Document store layout and backend
    #[serde(default)]
    pub store: StoreConfig,

    /// Aggregation and scan tuning
    #[serde(default)]
    pub engine: EngineConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Collection names of the document store, plus the snapshot used by the
/// in-memory backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Identity records, one per user
    #[serde(default = "default_users_collection")]
    pub users_collection: String,

    /// Parent collection of per-user workspaces
    #[serde(default = "default_workspaces_collection")]
    pub workspaces_collection: String,

    /// Sub-collection holding one document per workspace module
    #[serde(default = "default_modules_subcollection")]
    pub modules_subcollection: String,

    /// Admin-curated metadata, keyed by user id
    #[serde(default = "default_admin_collection")]
    pub admin_collection: String,

    /// JSON snapshot loaded into the in-memory store
    #[serde(default)]
    pub snapshot_path: Option<PathBuf>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            users_collection: default_users_collection(),
            workspaces_collection: default_workspaces_collection(),
            modules_subcollection: default_modules_subcollection(),
            admin_collection: default_admin_collection(),
            snapshot_path: None,
        }
    }
}

/// Fan-out and sampling settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Maximum number of users processed concurrently
    #[serde(default = "default_max_concurrent_users")]
    pub max_concurrent_users: usize,

    /// Chance that an existing module is sampled during a scan (0.0 - 1.0)
    #[serde(default = "default_sample_probability")]
    pub sample_probability: f64,

    /// Upper bound on collected samples per scan
    #[serde(default = "default_max_samples")]
    pub max_samples: usize,

    /// Characters of serialized module content kept per sample
    #[serde(default = "default_sample_snippet_chars")]
    pub sample_snippet_chars: usize,

    /// Seed for reproducible sampling; random when unset
    #[serde(default)]
    pub sample_seed: Option<u64>,

    /// Deadline for a whole aggregation or scan (0 = no deadline)
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_concurrent_users: default_max_concurrent_users(),
            sample_probability: default_sample_probability(),
            max_samples: default_max_samples(),
            sample_snippet_chars: default_sample_snippet_chars(),
            sample_seed: None,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl EngineConfig {
    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_secs > 0).then(|| Duration::from_secs(self.request_timeout_secs))
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: "pretty", "json", "compact"
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

// Default value functions
fn default_users_collection() -> String {
    "users".to_string()
}
fn default_workspaces_collection() -> String {
    "workspaces".to_string()
}
fn default_modules_subcollection() -> String {
    "modules".to_string()
}
fn default_admin_collection() -> String {
    "startups".to_string()
}
fn default_max_concurrent_users() -> usize {
    16
}
fn default_sample_probability() -> f64 {
    0.2
}
fn default_max_samples() -> usize {
    5
}
fn default_sample_snippet_chars() -> usize {
    100
}
fn default_request_timeout_secs() -> u64 {
    60
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "pretty".to_string()
}

/// Configuration manager with layered sources
pub struct ConfigManager {
    config: CapkitConfig,
    config_path: Option<PathBuf>,
}

impl ConfigManager {
    /// Load configuration with the following precedence:
    /// 1. Environment variables (.env file)
    /// 2. Config file (.capkit.toml, then ~/.capkit/config.toml)
    /// 3. Sensible defaults
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_dotenv();
        let (config, config_path) = Self::load_config_file()?;
        Self::finish(config, config_path)
    }

    /// Load an explicit config file, still honouring environment overrides.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        Self::load_dotenv();
        let config = Self::read_toml_file(path)?;
        Self::finish(config, Some(path.to_path_buf()))
    }

    fn finish(config: CapkitConfig, config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let config = Self::apply_env_overrides(config);
        Self::validate_config(&config)?;

        info!("Configuration loaded");
        if let Some(ref path) = config_path {
            info!("   Config file: {}", path.display());
        } else {
            info!("   Config file: NONE (using defaults)");
        }
        info!(
            "   Fan-out limit: {} users",
            config.engine.max_concurrent_users
        );

        Ok(Self {
            config,
            config_path,
        })
    }

    /// Load .env file if it exists
    fn load_dotenv() {
        if Path::new(".env").exists() {
            if let Err(e) = dotenv::from_filename(".env") {
                warn!("Failed to load .env file: {}", e);
            }
            return;
        }

        if let Some(home) = dirs::home_dir() {
            let home_env = home.join(".capkit.env");
            if home_env.exists() {
                if let Err(e) = dotenv::from_path(&home_env) {
                    warn!("Failed to load .capkit.env: {}", e);
                }
            }
        }
    }

    /// Search order:
    /// 1. ./.capkit.toml (current directory)
    /// 2. ~/.capkit/config.toml (user config)
    /// 3. Use defaults
    fn load_config_file() -> Result<(CapkitConfig, Option<PathBuf>), ConfigError> {
        let local_config = Path::new(".capkit.toml");
        if local_config.exists() {
            let config = Self::read_toml_file(local_config)?;
            return Ok((config, Some(local_config.to_path_buf())));
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".capkit").join("config.toml");
            if user_config.exists() {
                let config = Self::read_toml_file(&user_config)?;
                return Ok((config, Some(user_config)));
            }
        }

        info!("No config file found, using defaults");
        Ok((CapkitConfig::default(), None))
    }

    fn read_toml_file(path: &Path) -> Result<CapkitConfig, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError(e.to_string()))?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    fn apply_env_overrides(mut config: CapkitConfig) -> CapkitConfig {
        if let Ok(path) = std::env::var("CAPKIT_SNAPSHOT") {
            config.store.snapshot_path = Some(PathBuf::from(path));
        }
        if let Ok(name) = std::env::var("CAPKIT_USERS_COLLECTION") {
            config.store.users_collection = name;
        }
        if let Ok(name) = std::env::var("CAPKIT_ADMIN_COLLECTION") {
            config.store.admin_collection = name;
        }
        if let Ok(limit) = std::env::var("CAPKIT_MAX_CONCURRENT_USERS") {
            if let Ok(n) = limit.parse() {
                config.engine.max_concurrent_users = n;
            }
        }
        if let Ok(probability) = std::env::var("CAPKIT_SAMPLE_PROBABILITY") {
            if let Ok(p) = probability.parse() {
                config.engine.sample_probability = p;
            }
        }
        if let Ok(seed) = std::env::var("CAPKIT_SAMPLE_SEED") {
            if let Ok(s) = seed.parse() {
                config.engine.sample_seed = Some(s);
            }
        }
        if let Ok(timeout) = std::env::var("CAPKIT_REQUEST_TIMEOUT_SECS") {
            if let Ok(secs) = timeout.parse() {
                config.engine.request_timeout_secs = secs;
            }
        }

        // Only a bare level is mirrored; directive lists are left to EnvFilter.
        if let Ok(level) = std::env::var("RUST_LOG") {
            let level = level.trim().to_lowercase();
            if matches!(level.as_str(), "trace" | "debug" | "info" | "warn" | "error") {
                config.logging.level = level;
            }
        }
        if let Ok(format) = std::env::var("CAPKIT_LOG_FORMAT") {
            config.logging.format = format;
        }

        config
    }

    pub fn validate_config(config: &CapkitConfig) -> Result<(), ConfigError> {
        if config.engine.max_concurrent_users == 0 {
            return Err(ConfigError::ValidationError(
                "max_concurrent_users must be at least 1".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&config.engine.sample_probability) {
            return Err(ConfigError::ValidationError(format!(
                "Invalid sample probability: {}. Must be between 0.0 and 1.0",
                config.engine.sample_probability
            )));
        }

        for (label, name) in [
            ("users_collection", &config.store.users_collection),
            ("workspaces_collection", &config.store.workspaces_collection),
            ("modules_subcollection", &config.store.modules_subcollection),
            ("admin_collection", &config.store.admin_collection),
        ] {
            if name.is_empty() || name.contains('/') {
                return Err(ConfigError::ValidationError(format!(
                    "Invalid {}: {:?}",
                    label, name
                )));
            }
        }

        match config.logging.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "Invalid log level: {}. Must be one of: trace, debug, info, warn, error",
                    other
                )))
            }
        }

        match config.logging.format.as_str() {
            "pretty" | "json" | "compact" => {}
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "Invalid log format: {}. Must be one of: pretty, json, compact",
                    other
                )))
            }
        }

        Ok(())
    }

    /// Get the loaded configuration
    pub fn config(&self) -> &CapkitConfig {
        &self.config
    }

    /// Get the path to the config file that was loaded, if any
    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    /// Create a default config file
    pub fn create_default_config(path: &Path) -> Result<(), ConfigError> {
        let config = CapkitConfig::default();
        let toml_str =
            toml::to_string_pretty(&config).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::ReadError(e.to_string()))?;
        }

        std::fs::write(path, toml_str).map_err(|e| ConfigError::ReadError(e.to_string()))?;

        Ok(())
    }
}
