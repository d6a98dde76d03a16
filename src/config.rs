use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::credentials::SessionCache;
use crate::pacing::{ConfiguredDelay, ConstantDelay, JitteredDelay, NoDelay};
use crate::scraper::{self, Credentials};

/// Environment variables consulted when a request carries no credentials.
pub const USERNAME_ENV: &str = "IGRAM_USERNAME";
pub const PASSWORD_ENV: &str = "IGRAM_PASSWORD";

/// Pause inserted before each outbound platform request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum DelayConfig {
    /// No pacing at all.
    None,
    /// The same pause before every request.
    Constant { seconds: f64 },
    /// A uniformly random pause within `[min_seconds, max_seconds]`.
    Jittered { min_seconds: f64, max_seconds: f64 },
}

impl Default for DelayConfig {
    fn default() -> Self {
        DelayConfig::None
    }
}

impl DelayConfig {
    pub fn strategy(&self) -> ConfiguredDelay {
        match *self {
            DelayConfig::None => ConfiguredDelay::None(NoDelay),
            DelayConfig::Constant { seconds } => {
                ConfiguredDelay::Constant(ConstantDelay(Duration::from_secs_f64(seconds.max(0.0))))
            }
            DelayConfig::Jittered {
                min_seconds,
                max_seconds,
            } => ConfiguredDelay::Jittered(JitteredDelay::new(
                Duration::from_secs_f64(min_seconds.max(0.0)),
                Duration::from_secs_f64(max_seconds.max(0.0)),
            )),
        }
    }
}

/// Default pause between a successful login and the first profile fetch.
fn default_post_login_pause() -> f64 {
    2.0
}

/// Scrape client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapeConfig {
    /// Platform site root. Overridden in tests to point at a mock server.
    pub base_url: String,

    /// Optional user-agent override for the impersonated client.
    pub user_agent: Option<String>,

    /// Where session blobs are cached. If relative, resolved from the data
    /// directory; if unset, the per-user cache directory is used.
    pub session_dir: Option<PathBuf>,

    /// Pacing strategy applied before every outbound request.
    pub delay: DelayConfig,

    /// Seconds to wait between login and the first fetch.
    #[serde(default = "default_post_login_pause")]
    pub post_login_pause_seconds: f64,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            base_url: scraper::endpoints::BASE_URL.to_string(),
            user_agent: None,
            session_dir: None,
            delay: DelayConfig::default(),
            post_login_pause_seconds: default_post_login_pause(),
        }
    }
}

impl ScrapeConfig {
    pub fn post_login_pause(&self) -> Duration {
        Duration::from_secs_f64(self.post_login_pause_seconds.max(0.0))
    }
}

/// Ingestion endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the ingestion endpoint binds to.
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path to data directory. If relative, resolved from config file location.
    /// If not specified, defaults to the config file's directory.
    pub data_dir: Option<PathBuf>,

    #[serde(default)]
    pub scrape: ScrapeConfig,

    #[serde(default)]
    pub server: ServerConfig,
}

impl Config {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Resolve the data directory path.
    pub fn resolve_data_dir(&self, config_dir: &Path) -> PathBuf {
        match &self.data_dir {
            Some(data_dir) if data_dir.is_absolute() => data_dir.clone(),
            Some(data_dir) => config_dir.join(data_dir),
            None => config_dir.to_path_buf(),
        }
    }
}

/// Loaded configuration with resolved paths.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// The resolved data directory path.
    pub data_dir: PathBuf,

    pub scrape: ScrapeConfig,

    pub server: ServerConfig,
}

/// Returns the default config file path.
///
/// Resolution order:
/// 1. `./igram.toml` if it exists in current directory
/// 2. `~/.local/share/igram/igram.toml` (XDG data directory)
pub fn default_config_path() -> PathBuf {
    let local_config = PathBuf::from("igram.toml");
    if local_config.exists() {
        return local_config;
    }

    if let Some(data_dir) = dirs::data_dir() {
        return data_dir.join("igram").join("igram.toml");
    }

    local_config
}

/// Login credentials from the environment, if both halves are present.
pub fn env_credentials() -> Option<Credentials> {
    let username = std::env::var(USERNAME_ENV).ok()?;
    let password = std::env::var(PASSWORD_ENV).ok()?;
    Some(Credentials::new(username, password))
}

impl ResolvedConfig {
    /// Load and resolve config from a file path.
    pub fn load(config_path: &Path) -> Result<Self> {
        let config_path = config_path
            .canonicalize()
            .with_context(|| format!("Config file not found: {}", config_path.display()))?;

        let config_dir = config_path
            .parent()
            .context("Config file has no parent directory")?;

        let config = Config::load(&config_path)?;
        let data_dir = config.resolve_data_dir(config_dir);

        Ok(Self {
            data_dir,
            scrape: config.scrape,
            server: config.server,
        })
    }

    /// Load config, creating a default if the file doesn't exist.
    pub fn load_or_default(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            Self::load(config_path)
        } else {
            let config_path = if config_path.is_relative() {
                std::env::current_dir()
                    .context("Failed to get current directory")?
                    .join(config_path)
            } else {
                config_path.to_path_buf()
            };

            let config_dir = config_path
                .parent()
                .context("Config path has no parent directory")?;

            Ok(Self {
                data_dir: config_dir.to_path_buf(),
                scrape: ScrapeConfig::default(),
                server: ServerConfig::default(),
            })
        }
    }

    /// Session cache at the configured location.
    pub fn session_cache(&self) -> Result<SessionCache> {
        match &self.scrape.session_dir {
            Some(dir) if dir.is_absolute() => SessionCache::with_path(dir),
            Some(dir) => SessionCache::with_path(self.data_dir.join(dir)),
            None => SessionCache::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_default_data_dir_is_config_dir() {
        let config = Config::default();
        let config_dir = Path::new("/home/user/scrapes");
        assert_eq!(
            config.resolve_data_dir(config_dir),
            PathBuf::from("/home/user/scrapes")
        );
    }

    #[test]
    fn test_relative_data_dir() {
        let config = Config {
            data_dir: Some(PathBuf::from("data")),
            ..Default::default()
        };
        let config_dir = Path::new("/home/user/scrapes");
        assert_eq!(
            config.resolve_data_dir(config_dir),
            PathBuf::from("/home/user/scrapes/data")
        );
    }

    #[test]
    fn test_load_empty_config_uses_defaults() -> Result<()> {
        let dir = TempDir::new()?;
        let config_path = dir.path().join("igram.toml");

        std::fs::File::create(&config_path)?;

        let config = Config::load(&config_path)?;
        assert_eq!(config.data_dir, None);
        assert_eq!(config.scrape.base_url, "https://www.instagram.com");
        assert_eq!(config.server.bind, "127.0.0.1:8080");
        assert!(matches!(config.scrape.delay, DelayConfig::None));
        Ok(())
    }

    #[test]
    fn test_load_scrape_config() -> Result<()> {
        let dir = TempDir::new()?;
        let config_path = dir.path().join("igram.toml");

        let mut file = std::fs::File::create(&config_path)?;
        writeln!(file, "[scrape]")?;
        writeln!(file, "base_url = \"http://127.0.0.1:9000\"")?;
        writeln!(file, "post_login_pause_seconds = 0.5")?;
        writeln!(file, "[scrape.delay]")?;
        writeln!(file, "mode = \"jittered\"")?;
        writeln!(file, "min_seconds = 1.0")?;
        writeln!(file, "max_seconds = 3.0")?;

        let config = Config::load(&config_path)?;
        assert_eq!(config.scrape.base_url, "http://127.0.0.1:9000");
        assert_eq!(
            config.scrape.post_login_pause(),
            Duration::from_millis(500)
        );
        assert!(matches!(
            config.scrape.delay,
            DelayConfig::Jittered { .. }
        ));
        Ok(())
    }

    #[test]
    fn test_load_constant_delay() -> Result<()> {
        let dir = TempDir::new()?;
        let config_path = dir.path().join("igram.toml");

        let mut file = std::fs::File::create(&config_path)?;
        writeln!(file, "[scrape.delay]")?;
        writeln!(file, "mode = \"constant\"")?;
        writeln!(file, "seconds = 1.5")?;

        let config = Config::load(&config_path)?;
        let strategy = config.scrape.delay.strategy();
        use crate::pacing::DelayStrategy;
        assert_eq!(strategy.next_delay(), Duration::from_millis(1500));
        Ok(())
    }

    #[test]
    fn test_load_server_config() -> Result<()> {
        let dir = TempDir::new()?;
        let config_path = dir.path().join("igram.toml");

        let mut file = std::fs::File::create(&config_path)?;
        writeln!(file, "[server]")?;
        writeln!(file, "bind = \"0.0.0.0:9999\"")?;

        let config = Config::load(&config_path)?;
        assert_eq!(config.server.bind, "0.0.0.0:9999");
        Ok(())
    }

    #[test]
    fn test_config_load_or_default_missing_file() -> Result<()> {
        let dir = TempDir::new()?;
        let config_path = dir.path().join("igram.toml");

        let resolved = ResolvedConfig::load_or_default(&config_path)?;
        assert_eq!(resolved.data_dir, dir.path());
        assert_eq!(resolved.scrape.base_url, "https://www.instagram.com");
        Ok(())
    }

    #[test]
    fn test_resolved_config_resolves_relative_data_dir() -> Result<()> {
        let dir = TempDir::new()?;
        let config_path = dir.path().join("igram.toml");

        let mut file = std::fs::File::create(&config_path)?;
        writeln!(file, "data_dir = \"./data\"")?;

        let resolved = ResolvedConfig::load(&config_path)?;
        assert_eq!(resolved.data_dir, dir.path().join("data"));
        Ok(())
    }

    #[test]
    fn test_session_cache_resolves_relative_to_data_dir() -> Result<()> {
        let dir = TempDir::new()?;
        let config_path = dir.path().join("igram.toml");

        let mut file = std::fs::File::create(&config_path)?;
        writeln!(file, "[scrape]")?;
        writeln!(file, "session_dir = \"sessions\"")?;

        let resolved = ResolvedConfig::load(&config_path)?;
        resolved.session_cache()?;
        assert!(dir.path().join("sessions").is_dir());
        Ok(())
    }
}
