//! Configuration file support for Bloodbank.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/bloodbank/config.toml`.

use crate::eligibility::{
    EligibilityWindow, MAX_DONATION_INTERVAL_DAYS, MIN_DONATION_INTERVAL_DAYS,
};
use crate::{Error, Result, UserId};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub notifications: NotificationConfig,

    #[serde(default)]
    pub eligibility: EligibilityConfig,
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

/// Who hears about newly submitted requests
///
/// Every user with the admin role is notified, plus any ids listed in
/// `admin_recipients`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NotificationConfig {
    #[serde(default)]
    pub admin_recipients: Vec<UserId>,

    #[serde(default = "default_true")]
    pub notify_admins_on_submit: bool,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            admin_recipients: Vec::new(),
            notify_admins_on_submit: true,
        }
    }
}

/// Donation interval configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EligibilityConfig {
    #[serde(default = "default_min_interval_days")]
    pub min_interval_days: i64,
}

impl Default for EligibilityConfig {
    fn default() -> Self {
        Self {
            min_interval_days: default_min_interval_days(),
        }
    }
}

impl EligibilityConfig {
    pub fn window(&self) -> EligibilityWindow {
        EligibilityWindow::new(self.min_interval_days)
    }
}

// Default value functions
fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(|| home_dir_or_cwd().join(".local/share"));
    base.join("bloodbank")
}

fn home_dir_or_cwd() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
}

fn default_true() -> bool {
    true
}

fn default_min_interval_days() -> i64 {
    MIN_DONATION_INTERVAL_DAYS
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
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

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir().unwrap_or_else(|| home_dir_or_cwd().join(".config"));
        base.join("bloodbank").join("config.toml")
    }

    /// Reject settings the engine cannot honor
    pub fn validate(&self) -> Result<()> {
        let days = self.eligibility.min_interval_days;
        if !(1..=MAX_DONATION_INTERVAL_DAYS).contains(&days) {
            return Err(Error::Config(format!(
                "eligibility.min_interval_days must be between 1 and {}, got {}",
                MAX_DONATION_INTERVAL_DAYS, days
            )));
        }
        Ok(())
    }

    /// Save the current configuration to the default path
    pub fn save(&self) -> Result<()> {
        let config_path = Self::default_config_path();
        self.save_to(&config_path)
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.notifications.notify_admins_on_submit);
        assert!(config.notifications.admin_recipients.is_empty());
        assert_eq!(config.eligibility.min_interval_days, 56);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_roundtrip_through_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("nested/config.toml");

        let mut config = Config::default();
        config.notifications.admin_recipients.push(UserId::new());
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(
            loaded.notifications.admin_recipients,
            config.notifications.admin_recipients
        );
    }

    #[test]
    fn test_partial_config() {
        let toml_str = r#"
[notifications]
notify_admins_on_submit = false
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert!(!config.notifications.notify_admins_on_submit);
        assert_eq!(config.eligibility.min_interval_days, 56); // default
    }

    #[test]
    fn test_invalid_interval_rejected() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[eligibility]\nmin_interval_days = 0\n").unwrap();

        assert!(matches!(Config::load_from(&path), Err(Error::Config(_))));
    }

    #[test]
    fn test_oversized_interval_rejected() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[eligibility]\nmin_interval_days = 1000000000\n").unwrap();

        assert!(matches!(Config::load_from(&path), Err(Error::Config(_))));

        let mut config = Config::default();
        config.eligibility.min_interval_days = MAX_DONATION_INTERVAL_DAYS;
        assert!(config.validate().is_ok());
        config.eligibility.min_interval_days = MAX_DONATION_INTERVAL_DAYS + 1;
        assert!(config.validate().is_err());
    }
}
