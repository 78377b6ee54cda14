//! Configuration Module
//!
//! Client settings read from the environment.

use std::path::PathBuf;
use std::time::Duration;

use crate::storage::default_storage_dir;

pub const SUPABASE_URL_VAR: &str = "SUPABASE_URL";
pub const SUPABASE_ANON_KEY_VAR: &str = "SUPABASE_ANON_KEY";
pub const HTTP_TIMEOUT_VAR: &str = "INVOICER_HTTP_TIMEOUT_SECS";
pub const STORAGE_DIR_VAR: &str = "INVOICER_STORAGE_DIR";

const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Client configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the hosted service, without trailing slash
    pub supabase_url: String,
    pub anon_key: String,
    pub http_timeout: Duration,
    pub storage_dir: PathBuf,
}

impl Config {
    /// Build a configuration with defaults for everything but the service
    /// location and key
    pub fn new(supabase_url: &str, anon_key: &str) -> Result<Self, ConfigError> {
        let supabase_url = supabase_url.trim();
        if !(supabase_url.starts_with("http://") || supabase_url.starts_with("https://")) {
            return Err(ConfigError::InvalidUrl(supabase_url.to_string()));
        }
        if anon_key.trim().is_empty() {
            return Err(ConfigError::Missing(SUPABASE_ANON_KEY_VAR));
        }

        Ok(Self {
            supabase_url: supabase_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.trim().to_string(),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            storage_dir: default_storage_dir(),
        })
    }

    /// Load configuration from process environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let url = get(SUPABASE_URL_VAR).ok_or(ConfigError::Missing(SUPABASE_URL_VAR))?;
        let key = get(SUPABASE_ANON_KEY_VAR).ok_or(ConfigError::Missing(SUPABASE_ANON_KEY_VAR))?;
        let mut config = Self::new(&url, &key)?;

        if let Some(raw) = get(HTTP_TIMEOUT_VAR) {
            let secs = raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or_else(|| ConfigError::InvalidTimeout(raw.clone()))?;
            config.http_timeout = Duration::from_secs(secs);
        }

        if let Some(dir) = get(STORAGE_DIR_VAR) {
            config.storage_dir = PathBuf::from(dir);
        }

        Ok(config)
    }

    /// Use a different storage directory
    pub fn with_storage_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.storage_dir = dir.into();
        self
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing configuration value: {0}")]
    Missing(&'static str),

    #[error("Invalid service URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid HTTP timeout: {0}")]
    InvalidTimeout(String),

    #[error("HTTP client error: {0}")]
    HttpClient(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn loads_required_values_with_defaults() {
        let config = Config::from_lookup(lookup(&[
            (SUPABASE_URL_VAR, "https://project.supabase.co/"),
            (SUPABASE_ANON_KEY_VAR, "anon"),
        ]))
        .unwrap();

        assert_eq!(config.supabase_url, "https://project.supabase.co");
        assert_eq!(config.anon_key, "anon");
        assert_eq!(config.http_timeout, Duration::from_secs(30));
        assert_eq!(config.storage_dir, default_storage_dir());
    }

    #[test]
    fn reads_optional_overrides() {
        let config = Config::from_lookup(lookup(&[
            (SUPABASE_URL_VAR, "http://localhost:54321"),
            (SUPABASE_ANON_KEY_VAR, "anon"),
            (HTTP_TIMEOUT_VAR, "5"),
            (STORAGE_DIR_VAR, "/tmp/invoicer"),
        ]))
        .unwrap();

        assert_eq!(config.http_timeout, Duration::from_secs(5));
        assert_eq!(config.storage_dir, PathBuf::from("/tmp/invoicer"));
    }

    #[rstest]
    #[case(&[(SUPABASE_ANON_KEY_VAR, "anon")], SUPABASE_URL_VAR)]
    #[case(&[(SUPABASE_URL_VAR, "https://x.supabase.co")], SUPABASE_ANON_KEY_VAR)]
    #[case(&[(SUPABASE_URL_VAR, "https://x.supabase.co"), (SUPABASE_ANON_KEY_VAR, "  ")], SUPABASE_ANON_KEY_VAR)]
    fn missing_values_are_rejected(#[case] vars: &[(&str, &str)], #[case] expected: &str) {
        let err = Config::from_lookup(lookup(vars)).unwrap_err();
        assert!(matches!(err, ConfigError::Missing(name) if name == expected));
    }

    #[test]
    fn rejects_url_without_scheme() {
        let err = Config::new("project.supabase.co", "anon").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidUrl(_)));
    }

    #[rstest]
    #[case("0")]
    #[case("soon")]
    #[case("-3")]
    fn rejects_bad_timeouts(#[case] raw: &str) {
        let err = Config::from_lookup(lookup(&[
            (SUPABASE_URL_VAR, "https://x.supabase.co"),
            (SUPABASE_ANON_KEY_VAR, "anon"),
            (HTTP_TIMEOUT_VAR, raw),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidTimeout(_)));
    }
}
