//! Client configuration

use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_BACKEND_URL: &str = "http://10.0.2.2:8000";
pub const DEFAULT_ACCESS_TOKEN: &str = "local-demo-token";
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} must be a whole number of seconds, got {value:?}")]
    InvalidSeconds { name: &'static str, value: String },
    #[error("{name} must be a boolean, got {value:?}")]
    InvalidBool { name: &'static str, value: String },
    #[error("{name} must not be empty")]
    Empty { name: &'static str },
}

/// Settings for talking to the chat backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Backend root, without trailing slash
    pub base_url: String,
    /// Static bearer credential
    pub access_token: String,
    /// Applies to establishing the connection only; the event stream itself
    /// has no read deadline.
    pub connect_timeout: Duration,
    /// Start with voice capture on
    pub voice: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BACKEND_URL.to_string(),
            access_token: DEFAULT_ACCESS_TOKEN.to_string(),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            voice: false,
        }
    }
}

impl ClientConfig {
    /// Load from `HASSAI_*` environment variables
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a variable is set to an unusable value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load using an arbitrary variable lookup
    ///
    /// # Errors
    ///
    /// See [`ClientConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(url) = lookup("HASSAI_BACKEND_URL") {
            let url = url.trim().trim_end_matches('/');
            if url.is_empty() {
                return Err(ConfigError::Empty {
                    name: "HASSAI_BACKEND_URL",
                });
            }
            config.base_url = url.to_string();
        }

        if let Some(token) = lookup("HASSAI_BACKEND_TOKEN") {
            config.access_token = token;
        }

        if let Some(value) = lookup("HASSAI_CONNECT_TIMEOUT_SECS") {
            let secs = value.trim().parse::<u64>().map_err(|_| ConfigError::InvalidSeconds {
                name: "HASSAI_CONNECT_TIMEOUT_SECS",
                value: value.clone(),
            })?;
            config.connect_timeout = Duration::from_secs(secs);
        }

        if let Some(value) = lookup("HASSAI_VOICE") {
            config.voice = parse_bool(&value).ok_or(ConfigError::InvalidBool {
                name: "HASSAI_VOICE",
                value,
            })?;
        }

        Ok(config)
    }

    #[must_use]
    pub fn chat_url(&self) -> String {
        format!("{}/chat", self.base_url)
    }

    #[must_use]
    pub fn health_url(&self) -> String {
        format!("{}/health", self.base_url)
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name: &str| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ClientConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.chat_url(), "http://10.0.2.2:8000/chat");
        assert_eq!(config.access_token, "local-demo-token");
    }

    #[test]
    fn test_overrides_and_trailing_slash() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("HASSAI_BACKEND_URL", "https://assist.example.org/api/"),
            ("HASSAI_BACKEND_TOKEN", "s3cret"),
            ("HASSAI_CONNECT_TIMEOUT_SECS", "3"),
            ("HASSAI_VOICE", "Yes"),
        ]))
        .unwrap();
        assert_eq!(config.chat_url(), "https://assist.example.org/api/chat");
        assert_eq!(config.health_url(), "https://assist.example.org/api/health");
        assert_eq!(config.access_token, "s3cret");
        assert_eq!(config.connect_timeout, Duration::from_secs(3));
        assert!(config.voice);
    }

    #[test]
    fn test_invalid_values() {
        let err = ClientConfig::from_lookup(lookup(&[("HASSAI_CONNECT_TIMEOUT_SECS", "soon")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSeconds { .. }));

        let err = ClientConfig::from_lookup(lookup(&[("HASSAI_VOICE", "maybe")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidBool { .. }));

        let err = ClientConfig::from_lookup(lookup(&[("HASSAI_BACKEND_URL", " / ")])).unwrap_err();
        assert_eq!(err, ConfigError::Empty { name: "HASSAI_BACKEND_URL" });
    }
}
