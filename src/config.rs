use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::tokenizer::LinkTokens;

pub const DEFAULT_CONFIG_FILE: &str = "studio_config.json";

pub const ENV_WORD_INTERVAL_MS: &str = "STUDIO_WORD_INTERVAL_MS";
pub const ENV_SECTION_PAUSE_MS: &str = "STUDIO_SECTION_PAUSE_MS";
pub const ENV_BIND: &str = "STUDIO_BIND";
pub const ENV_LOG_DIR: &str = "STUDIO_LOG_DIR";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

/// How a section's word budget is chosen when its driver starts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum BudgetMode {
    /// Budget equals the section's real word count.
    #[default]
    Deterministic,
    /// Pseudo-random budget in `min..=max`, independent of content.
    Padded { min: usize, max: usize },
}

/// Delays between driver steps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    pub word_interval: Duration,
    pub section_pause: Duration,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RevealConfig {
    pub word_interval_ms: u64,
    pub section_pause_ms: u64,
    pub budget: BudgetMode,
    pub link_tokens: LinkTokens,
}

impl Default for RevealConfig {
    fn default() -> Self {
        Self {
            word_interval_ms: 80,
            section_pause_ms: 300,
            budget: BudgetMode::default(),
            link_tokens: LinkTokens::default(),
        }
    }
}

impl RevealConfig {
    pub fn timing(&self) -> Timing {
        Timing {
            word_interval: Duration::from_millis(self.word_interval_ms),
            section_pause: Duration::from_millis(self.section_pause_ms),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrerollConfig {
    pub enabled: bool,
    /// Multiplier applied to every pre-roll delay; 2.0 plays twice as fast.
    pub speed: f64,
}

impl Default for PrerollConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            speed: 1.0,
        }
    }
}

impl PrerollConfig {
    pub fn scale(&self, delay: Duration) -> Duration {
        if self.speed > 0.0 && self.speed.is_finite() {
            // Tiny speeds overflow Duration; keep the unscaled delay then
            Duration::try_from_secs_f64(delay.as_secs_f64() / self.speed).unwrap_or(delay)
        } else {
            delay
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub static_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
            static_dir: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub dir: PathBuf,
    pub file_name: String,
    pub filter: String,
    pub console: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("logs"),
            file_name: "studio.log".to_string(),
            filter: "info".to_string(),
            console: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub reveal: RevealConfig,
    pub preroll: PrerollConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Applies overrides from a key lookup, normally the process environment.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_WORD_INTERVAL_MS) {
            self.reveal.word_interval_ms = parse_millis(ENV_WORD_INTERVAL_MS, &value)?;
        }
        if let Some(value) = lookup(ENV_SECTION_PAUSE_MS) {
            self.reveal.section_pause_ms = parse_millis(ENV_SECTION_PAUSE_MS, &value)?;
        }
        if let Some(value) = lookup(ENV_BIND) {
            self.server.bind = value;
        }
        if let Some(value) = lookup(ENV_LOG_DIR) {
            self.logging.dir = PathBuf::from(value);
        }
        Ok(())
    }

    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        dotenv::dotenv().ok();
        self.apply_overrides(|key| std::env::var(key).ok())
    }
}

fn parse_millis(key: &str, value: &str) -> Result<u64, ConfigError> {
    value
        .trim()
        .parse::<u64>()
        .map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        })
}

pub struct ConfigManager {
    config_file: PathBuf,
    config: Mutex<AppConfig>,
}

impl ConfigManager {
    pub fn new(config_file: impl AsRef<Path>) -> Self {
        Self {
            config_file: config_file.as_ref().to_path_buf(),
            config: Mutex::new(AppConfig::default()),
        }
    }

    pub fn config_file(&self) -> &Path {
        &self.config_file
    }

    /// Loads the config file, writing the defaults when it does not exist yet.
    pub fn load_config(&self) -> Result<AppConfig, ConfigError> {
        if !self.config_file.exists() {
            let config = AppConfig::default();
            if let Err(e) = self.save_config(&config) {
                warn!(
                    "Could not write default config to {}: {}",
                    self.config_file.display(),
                    e
                );
            }
            return Ok(config);
        }

        let config_str = fs::read_to_string(&self.config_file)?;
        let config: AppConfig = serde_json::from_str(&config_str)?;
        info!("Loaded config from {}", self.config_file.display());

        *self.config.lock() = config.clone();
        Ok(config)
    }

    pub fn save_config(&self, config: &AppConfig) -> Result<(), ConfigError> {
        let config_str = serde_json::to_string_pretty(config)?;

        if let Some(parent) = self.config_file.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.config_file, config_str)?;

        *self.config.lock() = config.clone();
        Ok(())
    }

    pub fn get_config(&self) -> AppConfig {
        self.config.lock().clone()
    }
}
