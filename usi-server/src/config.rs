//! Server configuration from environment variables.

use std::collections::BTreeMap;
use std::path::PathBuf;

use thiserror::Error;
use usi_client::PoolConfig;

/// Default listen address.
pub const DEFAULT_ADDR: &str = "0.0.0.0:8000";

pub const ENV_ADDR: &str = "USI_API_ADDR";
pub const ENV_ENGINE_PATH: &str = "USI_ENGINE_PATH";
pub const ENV_ENGINE_DIR: &str = "USI_ENGINE_DIR";
pub const ENV_POOL_SIZE: &str = "USI_POOL_SIZE";
pub const ENV_ENGINE_OPTIONS: &str = "USI_ENGINE_OPTIONS";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {name}: {value:?}")]
    InvalidValue { name: &'static str, value: String },
}

/// Listen address and engine pool settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub addr: String,
    pub pool: PoolConfig,
}

impl ServerConfig {
    /// Read the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let addr = lookup(ENV_ADDR).unwrap_or_else(|| DEFAULT_ADDR.to_string());
        let mut pool = PoolConfig::default();

        if let Some(path) = lookup(ENV_ENGINE_PATH) {
            pool.engine_path = PathBuf::from(path);
        }
        if let Some(dir) = lookup(ENV_ENGINE_DIR) {
            pool.working_dir = Some(PathBuf::from(dir));
        }
        if let Some(size) = lookup(ENV_POOL_SIZE) {
            pool.pool_size = size
                .trim()
                .parse()
                .ok()
                .filter(|n| *n > 0)
                .ok_or(ConfigError::InvalidValue {
                    name: ENV_POOL_SIZE,
                    value: size,
                })?;
        }
        if let Some(options) = lookup(ENV_ENGINE_OPTIONS) {
            pool.options = parse_options(&options)?;
        }

        Ok(Self { addr, pool })
    }
}

/// Parse `Name=Value,Name=Value` into an option map.
fn parse_options(raw: &str) -> Result<BTreeMap<String, String>, ConfigError> {
    let mut options = BTreeMap::new();
    for pair in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (name, value) = pair
            .split_once('=')
            .map(|(n, v)| (n.trim(), v.trim()))
            .filter(|(n, _)| !n.is_empty())
            .ok_or_else(|| ConfigError::InvalidValue {
                name: ENV_ENGINE_OPTIONS,
                value: pair.to_string(),
            })?;
        options.insert(name.to_string(), value.to_string());
    }
    Ok(options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ServerConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.addr, DEFAULT_ADDR);
        assert_eq!(config.pool.pool_size, 4);
        assert_eq!(config.pool.options.len(), 3);
    }

    #[test]
    fn test_overrides() {
        let config = ServerConfig::from_lookup(lookup_from(&[
            (ENV_ADDR, "127.0.0.1:9000"),
            (ENV_ENGINE_PATH, "/opt/engine/yane"),
            (ENV_ENGINE_DIR, "/opt/engine/eval"),
            (ENV_POOL_SIZE, "2"),
            (ENV_ENGINE_OPTIONS, "Threads=8, USI_Hash=1024"),
        ]))
        .unwrap();

        assert_eq!(config.addr, "127.0.0.1:9000");
        assert_eq!(config.pool.engine_path, PathBuf::from("/opt/engine/yane"));
        assert_eq!(config.pool.working_dir, Some(PathBuf::from("/opt/engine/eval")));
        assert_eq!(config.pool.pool_size, 2);
        assert_eq!(config.pool.options.get("Threads").map(String::as_str), Some("8"));
        assert_eq!(config.pool.options.get("USI_Hash").map(String::as_str), Some("1024"));
        assert!(!config.pool.options.contains_key("USI_Ponder"));
    }

    #[test]
    fn test_invalid_pool_size() {
        let err = ServerConfig::from_lookup(lookup_from(&[(ENV_POOL_SIZE, "0")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidValue {
                name: ENV_POOL_SIZE,
                value: "0".to_string()
            }
        );
        assert!(ServerConfig::from_lookup(lookup_from(&[(ENV_POOL_SIZE, "four")])).is_err());
    }

    #[test]
    fn test_invalid_options() {
        assert!(parse_options("Threads").is_err());
        assert!(parse_options("=4").is_err());
        assert_eq!(parse_options("").unwrap().len(), 0);
    }
}
