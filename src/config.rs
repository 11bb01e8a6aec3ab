//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and `TRADEQUEST_*` environment overrides.
//! Secrets are only ever read from the environment.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::gamification::ComebackPolicy;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub gamification: GamificationConfig,

    #[serde(default)]
    pub credits: CreditsConfig,

    #[serde(default)]
    pub fx: FxConfig,

    #[serde(default)]
    pub payments: PaymentsConfig,

    #[serde(default)]
    pub jobs: JobsConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(skip)]
    pub secrets: SecretsConfig,
}

/// Database location
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_database_path")]
    pub database_path: String,
}

fn default_database_path() -> String {
    dirs::data_local_dir()
        .map(|p| p.join("tradequest").join("tradequest.db").to_string_lossy().to_string())
        .unwrap_or_else(|| "./tradequest_data/tradequest.db".to_string())
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

/// API server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub cors_origins: Vec<String>,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8090
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: vec![
                "http://localhost:5173".to_string(),
                "http://127.0.0.1:5173".to_string(),
            ],
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl ApiConfig {
    /// Socket address string to bind
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// XP, challenge and comeback tuning
#[derive(Debug, Clone, Deserialize)]
pub struct GamificationConfig {
    /// XP per logged trade
    #[serde(default = "default_trade_logged_xp")]
    pub trade_logged_xp: i64,

    /// Regular challenges seeded per user and day
    #[serde(default = "default_daily_challenge_count")]
    pub daily_challenge_count: usize,

    /// One in `mystery_odds` days also gets a mystery challenge
    #[serde(default = "default_mystery_odds")]
    pub mystery_odds: u32,

    #[serde(default)]
    pub comeback: ComebackPolicy,
}

fn default_trade_logged_xp() -> i64 {
    10
}

fn default_daily_challenge_count() -> usize {
    3
}

fn default_mystery_odds() -> u32 {
    7
}

impl Default for GamificationConfig {
    fn default() -> Self {
        Self {
            trade_logged_xp: default_trade_logged_xp(),
            daily_challenge_count: default_daily_challenge_count(),
            mystery_odds: default_mystery_odds(),
            comeback: ComebackPolicy::default(),
        }
    }
}

/// Upload credit settings
#[derive(Debug, Clone, Deserialize)]
pub struct CreditsConfig {
    /// Balance given to newly created users
    #[serde(default = "default_starting_credits")]
    pub starting_credits: i64,
}

fn default_starting_credits() -> i64 {
    10
}

impl Default for CreditsConfig {
    fn default() -> Self {
        Self {
            starting_credits: default_starting_credits(),
        }
    }
}

/// Exchange-rate provider and cache windows
#[derive(Debug, Clone, Deserialize)]
pub struct FxConfig {
    #[serde(default = "default_fx_url")]
    pub provider_url: String,

    #[serde(default = "default_fresh_secs")]
    pub fresh_secs: u64,

    #[serde(default = "default_stale_secs")]
    pub stale_secs: u64,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_fx_url() -> String {
    "https://api.exchangerate.host".to_string()
}

fn default_fresh_secs() -> u64 {
    15 * 60
}

fn default_stale_secs() -> u64 {
    60 * 60
}

impl Default for FxConfig {
    fn default() -> Self {
        Self {
            provider_url: default_fx_url(),
            fresh_secs: default_fresh_secs(),
            stale_secs: default_stale_secs(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Payment provider settings
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentsConfig {
    #[serde(default = "default_payments_url")]
    pub api_base: String,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_payments_url() -> String {
    "https://api.stripe.com".to_string()
}

impl Default for PaymentsConfig {
    fn default() -> Self {
        Self {
            api_base: default_payments_url(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Background job settings
#[derive(Debug, Clone, Deserialize)]
pub struct JobsConfig {
    #[serde(default = "default_jobs_enabled")]
    pub enabled: bool,

    /// How often the scheduler wakes up (seconds)
    #[serde(default = "default_tick_secs")]
    pub tick_secs: u64,

    #[serde(default = "default_daily_challenges_hours")]
    pub daily_challenges_interval_hours: u64,

    #[serde(default = "default_inactivity_scan_hours")]
    pub inactivity_scan_interval_hours: u64,

    #[serde(default = "default_inactivity_days")]
    pub inactivity_days: i64,

    #[serde(default = "default_cooldown_days")]
    pub notification_cooldown_days: i64,
}

fn default_jobs_enabled() -> bool {
    true
}

fn default_tick_secs() -> u64 {
    60
}

fn default_daily_challenges_hours() -> u64 {
    1
}

fn default_inactivity_scan_hours() -> u64 {
    24
}

fn default_inactivity_days() -> i64 {
    7
}

fn default_cooldown_days() -> i64 {
    7
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            enabled: default_jobs_enabled(),
            tick_secs: default_tick_secs(),
            daily_challenges_interval_hours: default_daily_challenges_hours(),
            inactivity_scan_interval_hours: default_inactivity_scan_hours(),
            inactivity_days: default_inactivity_days(),
            notification_cooldown_days: default_cooldown_days(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

/// Secrets, populated from the environment only
#[derive(Clone, Default)]
pub struct SecretsConfig {
    /// 64 hex chars (AES-256 key)
    pub encryption_key: Option<String>,
    pub service_role_key: Option<String>,
    pub payment_secret_key: Option<String>,
}

impl std::fmt::Debug for SecretsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let shown = |v: &Option<String>| if v.is_some() { "<set>" } else { "<unset>" };
        f.debug_struct("SecretsConfig")
            .field("encryption_key", &shown(&self.encryption_key))
            .field("service_role_key", &shown(&self.service_role_key))
            .field("payment_secret_key", &shown(&self.payment_secret_key))
            .finish()
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Self::parse(&content).map_err(|error| ConfigError::Parse {
            path: path.to_path_buf(),
            error,
        })
    }

    fn parse(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| e.to_string())
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("tradequest").join("config.toml")),
            Some(PathBuf::from("/etc/tradequest/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path_opt in config_paths.iter().flatten() {
            if path_opt.exists() {
                match Self::load_with_env(path_opt) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path_opt);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path_opt, e);
                    }
                }
            }
        }

        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(path) = var("TRADEQUEST_DATABASE_PATH") {
            self.storage.database_path = path;
        }

        if let Some(host) = var("TRADEQUEST_API_HOST") {
            self.api.host = host;
        }
        if let Some(port) = var("TRADEQUEST_API_PORT") {
            if let Ok(p) = port.parse() {
                self.api.port = p;
            }
        }
        if let Some(origins) = var("TRADEQUEST_CORS_ORIGINS") {
            self.api.cors_origins = origins
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect();
        }

        if let Some(url) = var("TRADEQUEST_FX_URL") {
            self.fx.provider_url = url;
        }
        if let Some(enabled) = var("TRADEQUEST_JOBS_ENABLED") {
            if let Ok(b) = enabled.parse() {
                self.jobs.enabled = b;
            }
        }

        if let Some(level) = var("TRADEQUEST_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = var("TRADEQUEST_LOG_FORMAT") {
            self.logging.format = format;
        }

        self.secrets.encryption_key = var("TRADEQUEST_ENCRYPTION_KEY").or(self.secrets.encryption_key.take());
        self.secrets.service_role_key =
            var("TRADEQUEST_SERVICE_ROLE_KEY").or(self.secrets.service_role_key.take());
        self.secrets.payment_secret_key =
            var("TRADEQUEST_PAYMENT_SECRET_KEY").or(self.secrets.payment_secret_key.take());
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# TradeQuest Configuration
#
# Environment variables override these settings:
# - TRADEQUEST_DATABASE_PATH
# - TRADEQUEST_API_HOST
# - TRADEQUEST_API_PORT
# - TRADEQUEST_CORS_ORIGINS (comma separated)
# - TRADEQUEST_FX_URL
# - TRADEQUEST_JOBS_ENABLED
# - TRADEQUEST_LOG_LEVEL
# - TRADEQUEST_LOG_FORMAT
#
# Secrets are read from the environment only:
# - TRADEQUEST_ENCRYPTION_KEY (64 hex chars, see `tradequest-cli gen-key`)
# - TRADEQUEST_SERVICE_ROLE_KEY
# - TRADEQUEST_PAYMENT_SECRET_KEY

[storage]
# SQLite database file
database_path = "~/.local/share/tradequest/tradequest.db"

[api]
host = "0.0.0.0"
port = 8090
cors_origins = ["http://localhost:5173", "http://127.0.0.1:5173"]
request_timeout_secs = 30

[gamification]
# XP per logged trade
trade_logged_xp = 10

# Regular challenges per user and day
daily_challenge_count = 3

# One day in N also gets a mystery challenge with double reward
mystery_odds = 7

[gamification.comeback]
threshold_days = 7
xp_per_day = 50
max_xp = 500

[credits]
# Upload credits for new users
starting_credits = 10

[fx]
provider_url = "https://api.exchangerate.host"
# Cached rates younger than this are served without a fetch
fresh_secs = 900
# Rates up to this age are served when the provider fails
stale_secs = 3600
request_timeout_secs = 30

[payments]
api_base = "https://api.stripe.com"
request_timeout_secs = 30

[jobs]
enabled = true
tick_secs = 60
daily_challenges_interval_hours = 1
inactivity_scan_interval_hours = 24
inactivity_days = 7
notification_cooldown_days = 7

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_generated_config_parses() {
        let config = Config::parse(&generate_default_config()).unwrap();
        assert_eq!(config.api.port, 8090);
        assert_eq!(config.gamification.daily_challenge_count, 3);
        assert_eq!(config.gamification.comeback, ComebackPolicy::default());
        assert_eq!(config.fx.fresh_secs, 900);
        assert_eq!(config.jobs.inactivity_days, 7);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.credits.starting_credits, 10);
        assert_eq!(config.gamification.trade_logged_xp, 10);
        assert!(config.secrets.encryption_key.is_none());
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("TRADEQUEST_API_PORT", "9999"),
            ("TRADEQUEST_CORS_ORIGINS", "https://a.example, https://b.example"),
            ("TRADEQUEST_SERVICE_ROLE_KEY", "service"),
            ("TRADEQUEST_JOBS_ENABLED", "false"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides(|k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(config.api.port, 9999);
        assert_eq!(config.api.cors_origins.len(), 2);
        assert_eq!(config.secrets.service_role_key.as_deref(), Some("service"));
        assert!(!config.jobs.enabled);
        assert!(!format!("{:?}", config.secrets).contains("service\""));
    }
}
