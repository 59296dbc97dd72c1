use std::{env, net::SocketAddr, path::PathBuf, str::FromStr};
use thiserror::Error;
use tracing::Level;

const DEFAULT_MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has an invalid value {value:?}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    Memory,
    Local,
}

impl FromStr for StorageKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "memory" => Ok(StorageKind::Memory),
            "local" => Ok(StorageKind::Local),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_key: String,
    // Accepted for deployment compatibility; no handler reads them.
    pub username: Option<String>,
    pub password: Option<String>,
    pub storage_type: StorageKind,
    pub storage_path: PathBuf,
    pub host: String,
    pub port: u16,
    pub max_upload_bytes: usize,
    pub log_level: Level,
}

impl AppConfig {
    /// Loads `.env` if present, then reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            api_key: lookup("API_KEY").ok_or(ConfigError::Missing("API_KEY"))?,
            username: lookup("USERNAME"),
            password: lookup("PASSWORD"),
            storage_type: parse_or(&lookup, "STORAGE_TYPE", StorageKind::Memory)?,
            storage_path: lookup("STORAGE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./uploads")),
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(&lookup, "PORT", 8080)?,
            max_upload_bytes: parse_or(&lookup, "MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
            log_level: parse_or(&lookup, "LOG_LEVEL", Level::INFO)?,
        })
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let raw = format!("{}:{}", self.host, self.port);
        raw.parse().map_err(|_| ConfigError::Invalid {
            name: "HOST",
            value: self.host.clone(),
        })
    }
}

fn parse_or<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_apply() {
        let config = load(&[("API_KEY", "k")]).unwrap();
        assert_eq!(config.api_key, "k");
        assert_eq!(config.storage_type, StorageKind::Memory);
        assert_eq!(config.storage_path, PathBuf::from("./uploads"));
        assert_eq!(config.port, 8080);
        assert_eq!(config.max_upload_bytes, DEFAULT_MAX_UPLOAD_BYTES);
        assert_eq!(config.log_level, Level::INFO);
        assert!(config.username.is_none() && config.password.is_none());
        assert_eq!(config.socket_addr().unwrap(), "0.0.0.0:8080".parse().unwrap());
    }

    #[test]
    fn api_key_is_required() {
        assert!(matches!(load(&[]), Err(ConfigError::Missing("API_KEY"))));
    }

    #[test]
    fn overrides_are_parsed() {
        let config = load(&[
            ("API_KEY", "k"),
            ("USERNAME", "admin"),
            ("STORAGE_TYPE", "local"),
            ("STORAGE_PATH", "/var/lib/files"),
            ("HOST", "127.0.0.1"),
            ("PORT", "9000"),
            ("LOG_LEVEL", "debug"),
        ])
        .unwrap();
        assert_eq!(config.storage_type, StorageKind::Local);
        assert_eq!(config.storage_path, PathBuf::from("/var/lib/files"));
        assert_eq!(config.username.as_deref(), Some("admin"));
        assert_eq!(config.log_level, Level::DEBUG);
        assert_eq!(config.socket_addr().unwrap(), "127.0.0.1:9000".parse().unwrap());
    }

    #[test]
    fn bad_values_are_rejected() {
        assert!(matches!(
            load(&[("API_KEY", "k"), ("PORT", "eighty")]),
            Err(ConfigError::Invalid { name: "PORT", .. })
        ));
        assert!(matches!(
            load(&[("API_KEY", "k"), ("STORAGE_TYPE", "s3")]),
            Err(ConfigError::Invalid { name: "STORAGE_TYPE", .. })
        ));
    }
}
