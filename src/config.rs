//! Application configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `TELEGRAM_BOT_TOKEN` - Bot API token (`BOT_TOKEN` is accepted as a fallback)
//! - `ADMIN_PASSWORD` - Web admin console password, required while the web
//!   server is enabled
//!
//! ## Optional
//! - `DATABASE_URL` - Postgres connection string; the JSON file store is used
//!   when absent
//! - `JSON_STORE_PATH` - JSON store location (default: `tieshop_db.json`)
//! - `ADMIN_IDS` - Comma separated Telegram ids of admins (`ADMIN_ID` fallback)
//! - `PAYMENT_LINK` - Payment page shown at checkout (default: `https://kaspi.kz/pay`)
//! - `WEB_ENABLED` - Serve the storefront and admin console (default: true)
//! - `WEB_HOST` / `WEB_PORT` - Bind address (default: `0.0.0.0:5000`)
//! - `IMAGES_DIR` - Where tie photos are stored (default: `images`)
//! - `CATALOG_SEED_PATH` - Catalog JSON loaded when the catalog is empty
//! - `DEFAULT_LANGUAGE` - Language for admin-facing messages (default: `ru`)

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use secrecy::SecretString;
use thiserror::Error;

use crate::model::Language;

pub const DEFAULT_PAYMENT_LINK: &str = "https://kaspi.kz/pay";
pub const DEFAULT_JSON_STORE_PATH: &str = "tieshop_db.json";
pub const DEFAULT_IMAGES_DIR: &str = "images";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Telegram ids allowed to use admin features
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdminList(Vec<i64>);

impl AdminList {
    pub fn new(ids: impl IntoIterator<Item = i64>) -> Self {
        let mut ids: Vec<i64> = ids.into_iter().collect();
        ids.sort_unstable();
        ids.dedup();
        Self(ids)
    }

    /// Parse a comma or whitespace separated id list
    pub fn parse(raw: &str) -> Result<Self, String> {
        raw.split(|c: char| c == ',' || c.is_whitespace())
            .filter(|part| !part.is_empty())
            .map(|part| {
                part.parse::<i64>()
                    .map_err(|_| format!("'{part}' is not a Telegram id"))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Self::new)
    }

    pub fn contains(&self, telegram_id: i64) -> bool {
        self.0.binary_search(&telegram_id).is_ok()
    }

    pub fn iter(&self) -> impl Iterator<Item = i64> + '_ {
        self.0.iter().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

/// Which backend holds users, ties and orders
#[derive(Debug, Clone)]
pub enum StoreConfig {
    Postgres { database_url: SecretString },
    Json { path: PathBuf },
}

/// Web server settings
#[derive(Debug, Clone)]
pub struct WebConfig {
    pub host: IpAddr,
    pub port: u16,
    pub admin_password: SecretString,
}

impl WebConfig {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bot_token: SecretString,
    pub store: StoreConfig,
    pub admins: AdminList,
    pub payment_link: String,
    /// `None` when the web server is disabled
    pub web: Option<WebConfig>,
    pub images_dir: PathBuf,
    pub catalog_seed_path: Option<PathBuf>,
    pub default_language: Language,
}

impl AppConfig {
    /// Load `.env` if present, then read the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenv::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from any key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let bot_token = get("TELEGRAM_BOT_TOKEN")
            .or_else(|| get("BOT_TOKEN"))
            .map(SecretString::from)
            .ok_or_else(|| ConfigError::MissingEnvVar("TELEGRAM_BOT_TOKEN".to_string()))?;

        let store = match get("DATABASE_URL") {
            Some(url) => StoreConfig::Postgres {
                database_url: SecretString::from(url),
            },
            None => StoreConfig::Json {
                path: PathBuf::from(
                    get("JSON_STORE_PATH").unwrap_or_else(|| DEFAULT_JSON_STORE_PATH.to_string()),
                ),
            },
        };

        let admins = match get("ADMIN_IDS").or_else(|| get("ADMIN_ID")) {
            Some(raw) => AdminList::parse(&raw)
                .map_err(|e| ConfigError::InvalidEnvVar("ADMIN_IDS".to_string(), e))?,
            None => AdminList::default(),
        };

        let web_enabled = match get("WEB_ENABLED") {
            Some(raw) => parse_bool(&raw)
                .ok_or_else(|| ConfigError::InvalidEnvVar("WEB_ENABLED".to_string(), raw))?,
            None => true,
        };

        let web = if web_enabled {
            let host = get("WEB_HOST")
                .unwrap_or_else(|| "0.0.0.0".to_string())
                .parse::<IpAddr>()
                .map_err(|e| ConfigError::InvalidEnvVar("WEB_HOST".to_string(), e.to_string()))?;
            let port = get("WEB_PORT")
                .unwrap_or_else(|| "5000".to_string())
                .parse::<u16>()
                .map_err(|e| ConfigError::InvalidEnvVar("WEB_PORT".to_string(), e.to_string()))?;
            let admin_password = get("ADMIN_PASSWORD")
                .map(SecretString::from)
                .ok_or_else(|| ConfigError::MissingEnvVar("ADMIN_PASSWORD".to_string()))?;
            Some(WebConfig {
                host,
                port,
                admin_password,
            })
        } else {
            None
        };

        let default_language = match get("DEFAULT_LANGUAGE") {
            Some(code) => Language::from_code(&code)
                .ok_or_else(|| ConfigError::InvalidEnvVar("DEFAULT_LANGUAGE".to_string(), code))?,
            None => Language::default(),
        };

        Ok(Self {
            bot_token,
            store,
            admins,
            payment_link: get("PAYMENT_LINK").unwrap_or_else(|| DEFAULT_PAYMENT_LINK.to_string()),
            web,
            images_dir: PathBuf::from(
                get("IMAGES_DIR").unwrap_or_else(|| DEFAULT_IMAGES_DIR.to_string()),
            ),
            catalog_seed_path: get("CATALOG_SEED_PATH").map(PathBuf::from),
            default_language,
        })
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_use_json_store() {
        let config = AppConfig::from_lookup(lookup(&[
            ("TELEGRAM_BOT_TOKEN", "123:abc"),
            ("ADMIN_PASSWORD", "hunter2"),
        ]))
        .unwrap();
        assert!(matches!(config.store, StoreConfig::Json { ref path } if path == &PathBuf::from("tieshop_db.json")));
        assert_eq!(config.payment_link, DEFAULT_PAYMENT_LINK);
        assert_eq!(config.web.unwrap().socket_addr().port(), 5000);
        assert!(config.admins.is_empty());
    }

    #[test]
    fn test_web_requires_admin_password() {
        let result = AppConfig::from_lookup(lookup(&[("TELEGRAM_BOT_TOKEN", "123:abc")]));
        assert!(matches!(result, Err(ConfigError::MissingEnvVar(ref key)) if key == "ADMIN_PASSWORD"));

        let config = AppConfig::from_lookup(lookup(&[
            ("BOT_TOKEN", "123:abc"),
            ("WEB_ENABLED", "false"),
        ]))
        .unwrap();
        assert!(config.web.is_none());
    }

    #[test]
    fn test_admin_list_parsing() {
        let admins = AdminList::parse("42, 7 42").unwrap();
        assert_eq!(admins.len(), 2);
        assert!(admins.contains(7));
        assert!(!admins.contains(8));
        assert!(AdminList::parse("42,abc").is_err());
    }
}
