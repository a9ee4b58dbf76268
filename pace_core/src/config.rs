//! Configuration file support for quitpace.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/quitpace/config.toml`.

use crate::{Error, Result, UserId};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub profile: ProfileConfig,

    #[serde(default)]
    pub alternatives: AlternativesConfig,

    #[serde(default)]
    pub notifications: NotificationsConfig,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

impl DataConfig {
    pub fn users_path(dir: &Path) -> PathBuf {
        dir.join("users.json")
    }

    pub fn events_path(dir: &Path) -> PathBuf {
        dir.join("events.jsonl")
    }

    pub fn session_path(dir: &Path) -> PathBuf {
        dir.join("session.json")
    }
}

/// Whose profile the CLI acts on by default
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProfileConfig {
    #[serde(default = "default_user_id")]
    pub user_id: i64,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            user_id: default_user_id(),
        }
    }
}

impl ProfileConfig {
    pub fn id(&self) -> UserId {
        UserId(self.user_id)
    }
}

/// Alternative tasks offered instead of an early cigarette
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AlternativesConfig {
    #[serde(default = "default_tasks")]
    pub tasks: Vec<String>,

    /// How long an offered task stays open
    #[serde(default = "default_expiry_minutes")]
    pub expiry_minutes: i64,

    /// How much later the allowed time moves when a task is done
    #[serde(default = "default_bonus_minutes")]
    pub bonus_minutes: i64,
}

impl Default for AlternativesConfig {
    fn default() -> Self {
        Self {
            tasks: default_tasks(),
            expiry_minutes: default_expiry_minutes(),
            bonus_minutes: default_bonus_minutes(),
        }
    }
}

/// Reports, pings and nudges
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NotificationsConfig {
    #[serde(default = "default_inactivity_hours")]
    pub inactivity_hours: i64,

    #[serde(default = "default_currency")]
    pub currency: String,

    #[serde(default = "default_delay_offer_chance")]
    pub delay_offer_chance: f64,
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            inactivity_hours: default_inactivity_hours(),
            currency: default_currency(),
            delay_offer_chance: default_delay_offer_chance(),
        }
    }
}

// Default value functions
fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(|| {
        std::env::var_os("HOME")
            .map(|home| PathBuf::from(home).join(".local/share"))
            .unwrap_or_else(|| PathBuf::from("."))
    });
    base.join("quitpace")
}

fn default_user_id() -> i64 {
    1
}

fn default_tasks() -> Vec<String> {
    vec![
        "10 push-ups".into(),
        "2 minutes of 4-7-8 breathing".into(),
    ]
}

fn default_expiry_minutes() -> i64 {
    2
}

fn default_bonus_minutes() -> i64 {
    3
}

fn default_inactivity_hours() -> i64 {
    12
}

fn default_currency() -> String {
    "zł".into()
}

fn default_delay_offer_chance() -> f64 {
    0.05
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        Self::load_or_default(&Self::default_config_path())
    }

    /// Load configuration from `config_path`, or defaults if there is no file
    pub fn load_or_default(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            Self::load_from(config_path)
        } else {
            tracing::info!(
                "No config file found at {:?}, using defaults",
                config_path
            );
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Reject values the engine cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.alternatives.tasks.is_empty() {
            return Err(Error::Config("alternatives.tasks must not be empty".into()));
        }
        if self.alternatives.expiry_minutes <= 0 || self.alternatives.bonus_minutes <= 0 {
            return Err(Error::Config(
                "alternative expiry and bonus minutes must be positive".into(),
            ));
        }
        if self.notifications.inactivity_hours <= 0 {
            return Err(Error::Config(
                "notifications.inactivity_hours must be positive".into(),
            ));
        }
        let chance = self.notifications.delay_offer_chance;
        if !(0.0..=1.0).contains(&chance) {
            return Err(Error::Config(format!(
                "notifications.delay_offer_chance must be within [0, 1], got {}",
                chance
            )));
        }
        Ok(())
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir().unwrap_or_else(|| {
            std::env::var_os("HOME")
                .map(|home| PathBuf::from(home).join(".config"))
                .unwrap_or_else(|| PathBuf::from("."))
        });
        base.join("quitpace").join("config.toml")
    }

    /// Render the configuration as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, self.to_toml()?)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }
}
