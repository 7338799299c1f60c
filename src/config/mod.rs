//! # Configuration Management Module
//!
//! Codyssey reads one TOML file shared by the API server, the admin CLI
//! commands and the terminal client.
//!
//! ## Configuration Structure
//!
//! - [`ServerConfig`] - HTTP bind address
//! - [`StorageConfig`] - Sled database and seed locations
//! - [`LoggingConfig`] - Log level and log files
//! - [`SecurityConfig`] - Sessions, password policy and Argon2 tuning
//! - [`ClientConfig`] - Where `codyssey play` finds the API
//! - [`GameConfig`] - Scene tuning (interaction radius, movement step)
//!
//! ## Usage
//!
//! ```rust,no_run
//! use codyssey::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     Config::create_default("config.toml").await?;
//!     let config = Config::load("config.toml").await?;
//!     println!("Listening on {}", config.server.bind);
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration File Format
//!
//! ```toml
//! [server]
//! bind = "127.0.0.1:8080"
//!
//! [storage]
//! data_dir = "./data"
//!
//! [game]
//! interaction_radius = 40.0
//! move_step = 16.0
//! ```

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::fs;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub security: SecurityConfig,
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub game: GameConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: String,
    /// Optional override for the sled database path; defaults to `<data_dir>/codyssey.db`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_path: Option<String>,
    /// Directory of JSON seed files used by `codyssey seed`.
    #[serde(default = "default_seed_dir")]
    pub seed_dir: String,
}

fn default_seed_dir() -> String {
    "./data/seeds".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: "./data".to_string(),
            db_path: None,
            seed_dir: default_seed_dir(),
        }
    }
}

impl StorageConfig {
    pub fn db_path(&self) -> PathBuf {
        match &self.db_path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(&self.data_dir).join("codyssey.db"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
    #[serde(default)]
    pub security_file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: Some("codyssey.log".to_string()),
            security_file: Some("codyssey-security.log".to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Argon2Config {
    #[serde(default)]
    pub memory_kib: Option<u32>,
    #[serde(default)]
    pub time_cost: Option<u32>,
    #[serde(default)]
    pub parallelism: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Session lifetime in hours.
    #[serde(default = "default_session_ttl_hours")]
    pub session_ttl_hours: u32,
    #[serde(default = "default_min_password_length")]
    pub min_password_length: usize,
    #[serde(default = "default_max_password_length")]
    pub max_password_length: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub argon2: Option<Argon2Config>,
}

fn default_session_ttl_hours() -> u32 {
    24
}

/// Longest session lifetime accepted: one year.
pub const MAX_SESSION_TTL_HOURS: u32 = 8760;

fn default_min_password_length() -> usize {
    8
}

fn default_max_password_length() -> usize {
    128
}

impl SecurityConfig {
    /// Session lifetime, capped at [`MAX_SESSION_TTL_HOURS`].
    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(i64::from(self.session_ttl_hours.min(MAX_SESSION_TTL_HOURS)))
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            session_ttl_hours: default_session_ttl_hours(),
            min_password_length: default_min_password_length(),
            max_password_length: default_max_password_length(),
            argon2: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    pub base_url: String,
    /// Per-request timeout in seconds.
    pub timeout_seconds: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080".to_string(),
            timeout_seconds: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameConfig {
    /// How close (in map units) the player must be to talk or use a door.
    pub interaction_radius: f32,
    /// Distance covered by one movement command.
    pub move_step: f32,
    /// Location a fresh scene opens in.
    pub start_location: u32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            interaction_radius: 40.0,
            move_step: 16.0,
            start_location: 1,
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))?;

        config.validate()?;
        Ok(config)
    }

    /// Create a default configuration file
    pub async fn create_default(path: &str) -> Result<()> {
        let config = Config::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.bind.parse::<std::net::SocketAddr>().is_err() {
            return Err(anyhow!("server.bind '{}' is not a socket address", self.server.bind));
        }
        if self.storage.data_dir.trim().is_empty() {
            return Err(anyhow!("storage.data_dir must not be empty"));
        }
        if self.security.session_ttl_hours == 0
            || self.security.session_ttl_hours > MAX_SESSION_TTL_HOURS
        {
            return Err(anyhow!(
                "security.session_ttl_hours must be between 1 and {}",
                MAX_SESSION_TTL_HOURS
            ));
        }
        if self.security.min_password_length < 4
            || self.security.min_password_length > self.security.max_password_length
        {
            return Err(anyhow!(
                "security password limits are inconsistent ({}..{})",
                self.security.min_password_length,
                self.security.max_password_length
            ));
        }
        if !self.client.base_url.starts_with("http://") && !self.client.base_url.starts_with("https://")
        {
            return Err(anyhow!("client.base_url must be an http(s) URL"));
        }
        if self.client.timeout_seconds == 0 {
            return Err(anyhow!("client.timeout_seconds must be at least 1"));
        }
        if !(self.game.interaction_radius > 0.0 && self.game.move_step > 0.0) {
            return Err(anyhow!("game.interaction_radius and game.move_step must be positive"));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            logging: LoggingConfig::default(),
            security: SecurityConfig::default(),
            client: ClientConfig::default(),
            game: GameConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validates() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.game.start_location, 1);
    }

    #[test]
    fn test_session_ttl_is_bounded() {
        let mut config = Config::default();
        config.security.session_ttl_hours = 0;
        assert!(config.validate().is_err());
        config.security.session_ttl_hours = MAX_SESSION_TTL_HOURS + 1;
        assert!(config.validate().is_err());
        config.security.session_ttl_hours = MAX_SESSION_TTL_HOURS;
        assert!(config.validate().is_ok());

        config.security.session_ttl_hours = u32::MAX;
        assert_eq!(
            config.security.session_ttl(),
            chrono::Duration::hours(i64::from(MAX_SESSION_TTL_HOURS))
        );
    }

    #[test]
    fn test_db_path_defaults_under_data_dir() {
        let storage = StorageConfig::default();
        assert_eq!(storage.db_path(), PathBuf::from("./data").join("codyssey.db"));

        let custom = StorageConfig {
            db_path: Some("/tmp/other.db".to_string()),
            ..StorageConfig::default()
        };
        assert_eq!(custom.db_path(), PathBuf::from("/tmp/other.db"));
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
[server]
bind = "0.0.0.0:9000"

[game]
interaction_radius = 25.0
move_step = 8.0
start_location = 2
"#,
        )
        .unwrap();
        assert_eq!(config.server.bind, "0.0.0.0:9000");
        assert_eq!(config.game.start_location, 2);
        assert_eq!(config.security.session_ttl_hours, 24);
        assert_eq!(config.storage.seed_dir, "./data/seeds");
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.server.bind = "not an address".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.security.min_password_length = 200;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.game.move_step = 0.0;
        assert!(config.validate().is_err());
    }

    #[tokio::test]
    async fn test_create_default_then_load() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        let path = path.to_str().unwrap();
        Config::create_default(path).await.unwrap();
        let loaded = Config::load(path).await.unwrap();
        assert_eq!(loaded.client.timeout_seconds, 10);
        assert_eq!(loaded.logging.level, "info");
    }
}
