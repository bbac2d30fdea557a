use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub auth: AuthSettings,
    pub database: DatabaseSettings,
    pub cache: CacheSettings,
    pub directory: DirectorySettings,
    pub moderation: ModerationSettings,
    #[serde(default)]
    pub matching: MatchingSettings,
    #[serde(default)]
    pub realtime: RealtimeSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthSettings {
    pub jwt_secret: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: Option<u32>,
    pub min_connections: Option<u32>,
    pub acquire_timeout_secs: Option<u64>,
    pub idle_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheSettings {
    pub redis_url: String,
    pub ttl_secs: Option<u64>,
    pub l1_cache_size: Option<u64>,
}

/// Profile directory: external owner of profiles, preferences and trust
/// scores.
#[derive(Debug, Clone, Deserialize)]
pub struct DirectorySettings {
    pub base_url: String,
    pub api_key: String,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModerationSettings {
    pub base_url: String,
    pub api_key: String,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MatchingSettings {
    #[serde(default = "default_limit")]
    pub default_limit: u16,
    #[serde(default = "default_max_limit")]
    pub max_limit: u16,
    /// How many candidates to fetch per requested result before ranking.
    #[serde(default = "default_overfetch_factor")]
    pub overfetch_factor: u16,
    /// Window during which a pass suppresses a candidate.
    #[serde(default = "default_pass_suppression_hours")]
    pub pass_suppression_hours: u32,
    /// Retention for inert pass rows; operator-tunable, the suppression
    /// window only needs the most recent 24h.
    #[serde(default = "default_pass_retention_days")]
    pub pass_retention_days: u32,
}

impl Default for MatchingSettings {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            max_limit: default_max_limit(),
            overfetch_factor: default_overfetch_factor(),
            pass_suppression_hours: default_pass_suppression_hours(),
            pass_retention_days: default_pass_retention_days(),
        }
    }
}

fn default_limit() -> u16 { 20 }
fn default_max_limit() -> u16 { 50 }
fn default_overfetch_factor() -> u16 { 3 }
fn default_pass_suppression_hours() -> u32 { 24 }
fn default_pass_retention_days() -> u32 { 30 }

#[derive(Debug, Clone, Deserialize)]
pub struct RealtimeSettings {
    #[serde(default = "default_realtime_host")]
    pub host: String,
    #[serde(default = "default_realtime_port")]
    pub port: u16,
    #[serde(default = "default_heartbeat_interval_secs")]
    pub heartbeat_interval_secs: u64,
    #[serde(default = "default_heartbeat_timeout_secs")]
    pub heartbeat_timeout_secs: u64,
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
    #[serde(default = "default_max_message_length")]
    pub max_message_length: usize,
}

impl Default for RealtimeSettings {
    fn default() -> Self {
        Self {
            host: default_realtime_host(),
            port: default_realtime_port(),
            heartbeat_interval_secs: default_heartbeat_interval_secs(),
            heartbeat_timeout_secs: default_heartbeat_timeout_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
            max_message_length: default_max_message_length(),
        }
    }
}

fn default_realtime_host() -> String { "0.0.0.0".to_string() }
fn default_realtime_port() -> u16 { 8081 }
fn default_heartbeat_interval_secs() -> u64 { 30 }
fn default_heartbeat_timeout_secs() -> u64 { 90 }
fn default_sweep_interval_secs() -> u64 { 60 }
fn default_max_message_length() -> usize { 2000 }

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
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

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml)
    /// 3. Local overrides (config/local.toml)
    /// 4. Environment variables (prefixed with AMORA__)
    pub fn load() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g. AMORA__SERVER__PORT -> server.port
            .add_source(
                Environment::with_prefix("AMORA")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let settings = apply_env_overrides(settings)?;

        settings.try_deserialize()
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(
                Environment::with_prefix("AMORA")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }
}

/// Fold the plain DATABASE_URL / REDIS_URL variables in; deployments set
/// those rather than the prefixed forms.
fn apply_env_overrides(settings: Config) -> Result<Config, ConfigError> {
    use std::env;

    let mut builder = Config::builder().add_source(settings);

    if let Ok(database_url) = env::var("DATABASE_URL") {
        builder = builder.set_override("database.url", database_url)?;
    }
    if let Ok(redis_url) = env::var("REDIS_URL") {
        builder = builder.set_override("cache.redis_url", redis_url)?;
    }
    if let Ok(secret) = env::var("JWT_SECRET") {
        builder = builder.set_override("auth.jwt_secret", secret)?;
    }

    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matching_defaults() {
        let matching = MatchingSettings::default();
        assert_eq!(matching.default_limit, 20);
        assert_eq!(matching.max_limit, 50);
        assert_eq!(matching.overfetch_factor, 3);
        assert_eq!(matching.pass_suppression_hours, 24);
    }

    #[test]
    fn test_realtime_defaults() {
        let realtime = RealtimeSettings::default();
        assert_eq!(realtime.heartbeat_interval_secs, 30);
        assert_eq!(realtime.heartbeat_timeout_secs, 90);
        assert_eq!(realtime.sweep_interval_secs, 60);
    }

    #[test]
    fn test_default_logging() {
        let logging = LoggingSettings::default();
        assert_eq!(logging.level, "info");
        assert_eq!(logging.format, "json");
    }
}
