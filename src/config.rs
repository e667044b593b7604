use std::{env, path::Path};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    ds::stock_price::DEFAULT_API_URL,
    error::{QbError, QbResult},
    utils::text::is_blank,
};

pub static ENV_BIND: &str = "BIND";
pub static ENV_SERVICE_KEY: &str = "SERVICE_KEY";
/// Older deployments export the key under this name.
pub static ENV_SERVICE_KEY_ALIAS: &str = "myKEY";

#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(ascii_case_insensitive, serialize_all = "lowercase")]
pub enum DisplayKind {
    #[default]
    Ssd1306,
    None,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(default)]
pub struct AppConfig {
    pub api_url: String,
    pub service_key: String,
    pub bind: String,
    pub display: DisplayKind,
    pub i2c_bus: String,
    pub display_address: u8,
    pub request_timeout_secs: u64,

    /// Cap the history from the search page too, instead of only on "previous".
    pub uniform_eviction: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            service_key: String::new(),
            bind: "0.0.0.0:5000".to_string(),
            display: DisplayKind::default(),
            i2c_bus: "/dev/i2c-1".to_string(),
            display_address: 0x3C,
            request_timeout_secs: 30,
            uniform_eviction: false,
        }
    }
}

impl AppConfig {
    /// Reads the config file (explicit path or the per-user default), then
    /// applies environment overrides.
    pub fn load(path: Option<&Path>) -> QbResult<Self> {
        let config: Self = if let Some(path) = path {
            confy::load_path(path)?
        } else {
            confy::load(env!("CARGO_PKG_NAME"), "config")?
        };

        Ok(config.with_env_overrides(|key| env::var(key).ok()))
    }

    pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        for name in [ENV_SERVICE_KEY, ENV_SERVICE_KEY_ALIAS] {
            if let Some(service_key) = lookup(name).filter(|s| !is_blank(s)) {
                debug!("Service key taken from ${name}");
                self.service_key = service_key.trim().to_string();
                break;
            }
        }

        if let Some(bind) = lookup(ENV_BIND).filter(|s| !is_blank(s)) {
            self.bind = bind.trim().to_string();
        }

        self
    }

    pub fn validate(&self) -> QbResult<()> {
        if is_blank(&self.service_key) {
            return Err(QbError::MissingConfig { key: "service_key" });
        }

        if self.request_timeout_secs == 0 {
            return Err(QbError::Invalid {
                code: "INVALID_TIMEOUT",
                message: "request_timeout_secs must be greater than 0".to_string(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn test_env_overrides() {
        let config = AppConfig::default().with_env_overrides(|key| match key {
            "SERVICE_KEY" => Some(" secret ".to_string()),
            "BIND" => Some("127.0.0.1:8080".to_string()),
            _ => None,
        });

        assert_eq!(config.service_key, "secret");
        assert_eq!(config.bind, "127.0.0.1:8080");
    }

    #[test]
    fn test_service_key_alias() {
        let config = AppConfig::default().with_env_overrides(|key| match key {
            "myKEY" => Some("legacy".to_string()),
            _ => None,
        });
        assert_eq!(config.service_key, "legacy");

        let config = AppConfig::default().with_env_overrides(|key| match key {
            "SERVICE_KEY" => Some("current".to_string()),
            "myKEY" => Some("legacy".to_string()),
            _ => None,
        });
        assert_eq!(config.service_key, "current");

        let config = AppConfig::default().with_env_overrides(|key| match key {
            "SERVICE_KEY" => Some(" ".to_string()),
            "myKEY" => Some("legacy".to_string()),
            _ => None,
        });
        assert_eq!(config.service_key, "legacy");
    }

    #[test]
    fn test_blank_env_keeps_file_value() {
        let config = AppConfig {
            service_key: "from-file".to_string(),
            ..Default::default()
        }
        .with_env_overrides(|_| Some("  ".to_string()));

        assert_eq!(config.service_key, "from-file");
        assert_eq!(config.bind, "0.0.0.0:5000");
    }

    #[test]
    fn test_validate() {
        assert!(matches!(
            AppConfig::default().validate(),
            Err(QbError::MissingConfig { key: "service_key" })
        ));

        let config = AppConfig {
            service_key: "secret".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_ok());

        let config = AppConfig {
            service_key: "secret".to_string(),
            request_timeout_secs: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_display_kind() {
        assert_eq!(DisplayKind::from_str("SSD1306").unwrap(), DisplayKind::Ssd1306);
        assert_eq!(DisplayKind::from_str("none").unwrap(), DisplayKind::None);
        assert_eq!(DisplayKind::None.to_string(), "none");
        assert!(DisplayKind::from_str("lcd").is_err());
    }
}
