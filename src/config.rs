use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

use crate::api::dune::DuneClient;

const DEFAULT_CACHE_DIR: &str = "./data/cache";
const DEFAULT_CHART_PATH: &str = "correlation_graph.png";
const DEFAULT_ROW_LIMIT: u32 = 5;
const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;
const DEFAULT_MAX_POLLS: u32 = 120;

/// Runtime settings read from the environment (and `.env`)
#[derive(Debug, Clone)]
pub struct Config {
    pub dune_api_key: Option<String>,
    pub dune_api_url: String,
    pub cache_dir: PathBuf,
    pub cache_ttl: Option<Duration>,
    pub row_limit: u32,
    pub chart_path: PathBuf,
    pub poll_interval: Duration,
    pub max_polls: u32,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; blank values count as unset
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        Self {
            dune_api_key: get("DUNE_API_KEY"),
            dune_api_url: get("DUNE_API_URL").unwrap_or_else(|| DuneClient::DEFAULT_BASE_URL.to_string()),
            cache_dir: get("CACHE_DIR").unwrap_or_else(|| DEFAULT_CACHE_DIR.to_string()).into(),
            cache_ttl: get("CACHE_TTL_SECS")
                .and_then(|raw| parse_or_warn::<u64>("CACHE_TTL_SECS", &raw))
                .map(Duration::from_secs),
            row_limit: get("ROW_LIMIT")
                .and_then(|raw| parse_or_warn("ROW_LIMIT", &raw))
                .unwrap_or(DEFAULT_ROW_LIMIT),
            chart_path: get("CHART_PATH").unwrap_or_else(|| DEFAULT_CHART_PATH.to_string()).into(),
            poll_interval: Duration::from_millis(
                get("DUNE_POLL_INTERVAL_MS")
                    .and_then(|raw| parse_or_warn("DUNE_POLL_INTERVAL_MS", &raw))
                    .unwrap_or(DEFAULT_POLL_INTERVAL_MS),
            ),
            max_polls: get("DUNE_MAX_POLLS")
                .and_then(|raw| parse_or_warn("DUNE_MAX_POLLS", &raw))
                .unwrap_or(DEFAULT_MAX_POLLS),
        }
    }

    /// Client for the configured credential, if any
    pub fn dune_client(&self) -> Option<DuneClient> {
        self.dune_api_key.as_ref().map(|key| {
            DuneClient::with_base_url(key.clone(), self.dune_api_url.clone())
                .with_polling(self.poll_interval, self.max_polls)
        })
    }
}

fn parse_or_warn<T: FromStr>(key: &str, raw: &str) -> Option<T> {
    match raw.parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Ignoring invalid {}={:?}, using default", key, raw);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Config {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]);
        assert_eq!(config.dune_api_key, None);
        assert_eq!(config.dune_api_url, "https://api.dune.com/api/v1");
        assert_eq!(config.cache_dir, PathBuf::from("./data/cache"));
        assert_eq!(config.cache_ttl, None);
        assert_eq!(config.row_limit, 5);
        assert_eq!(config.max_polls, 120);
        assert!(config.dune_client().is_none());
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("DUNE_API_KEY", "abc"),
            ("CACHE_DIR", "/tmp/c"),
            ("CACHE_TTL_SECS", "600"),
            ("ROW_LIMIT", "25"),
            ("DUNE_POLL_INTERVAL_MS", "250"),
        ]);
        assert_eq!(config.dune_api_key.as_deref(), Some("abc"));
        assert_eq!(config.cache_dir, PathBuf::from("/tmp/c"));
        assert_eq!(config.cache_ttl, Some(Duration::from_secs(600)));
        assert_eq!(config.row_limit, 25);
        assert_eq!(config.poll_interval, Duration::from_millis(250));
        assert!(config.dune_client().is_some());
    }

    #[test]
    fn test_blank_and_invalid_values_fall_back() {
        let config = config_from(&[("DUNE_API_KEY", "   "), ("ROW_LIMIT", "many")]);
        assert_eq!(config.dune_api_key, None);
        assert_eq!(config.row_limit, 5);
    }
}
