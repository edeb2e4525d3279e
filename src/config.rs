use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use teloxide::types::ChatId;

use crate::forwarder::Defaults;

/// Errors that can occur when loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read the config file.
    ReadFile { path: PathBuf, source: std::io::Error },
    /// Failed to parse JSON.
    ParseJson { path: PathBuf, source: serde_json::Error },
    /// Validation error.
    Validation(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadFile { path, source } => {
                write!(f, "failed to read config file '{}': {}", path.display(), source)
            }
            Self::ParseJson { path, source } => {
                write!(f, "failed to parse config file '{}': {}", path.display(), source)
            }
            Self::Validation(msg) => write!(f, "config validation error: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ReadFile { source, .. } => Some(source),
            Self::ParseJson { source, .. } => Some(source),
            Self::Validation(_) => None,
        }
    }
}

#[derive(Deserialize)]
struct ConfigFile {
    telegram_bot_token: String,
    #[serde(default = "default_batch_size")]
    default_batch_size: u32,
    #[serde(default = "default_delay_seconds")]
    default_delay_seconds: u64,
    /// Channel copied from when a session has not set one.
    source_channel: Option<String>,
    /// Channel copied to when a session has not set one.
    target_channel: Option<String>,
    /// Chat that fetched messages are forwarded into before being read.
    /// Falls back to the chat that issued /forward.
    staging_chat_id: Option<i64>,
    log_chat_id: Option<i64>,
    /// Directory for log files. Defaults to current directory.
    data_dir: Option<String>,
}

fn default_batch_size() -> u32 {
    10
}

fn default_delay_seconds() -> u64 {
    5
}

pub struct Config {
    pub telegram_bot_token: String,
    pub default_batch_size: u32,
    pub default_delay_seconds: u64,
    pub source_channel: Option<String>,
    pub target_channel: Option<String>,
    pub staging_chat_id: Option<ChatId>,
    pub log_chat_id: Option<ChatId>,
    pub data_dir: PathBuf,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config_path = path.as_ref().to_path_buf();
        let content = std::fs::read_to_string(&config_path)
            .map_err(|e| ConfigError::ReadFile { path: config_path.clone(), source: e })?;
        let file: ConfigFile = serde_json::from_str(&content)
            .map_err(|e| ConfigError::ParseJson { path: config_path.clone(), source: e })?;

        if file.telegram_bot_token.is_empty() {
            return Err(ConfigError::Validation("telegram_bot_token is required".into()));
        }
        // Telegram tokens are formatted as {bot_id}:{secret} where bot_id is numeric
        let token_parts: Vec<&str> = file.telegram_bot_token.split(':').collect();
        if token_parts.len() != 2 || token_parts[0].parse::<u64>().is_err() || token_parts[1].is_empty() {
            return Err(ConfigError::Validation(
                "telegram_bot_token appears invalid (expected format: 123456789:ABCdefGHI...)".into(),
            ));
        }
        if file.default_batch_size == 0 {
            return Err(ConfigError::Validation("default_batch_size must be at least 1".into()));
        }

        Ok(Self {
            telegram_bot_token: file.telegram_bot_token,
            default_batch_size: file.default_batch_size,
            default_delay_seconds: file.default_delay_seconds,
            source_channel: non_empty(file.source_channel),
            target_channel: non_empty(file.target_channel),
            staging_chat_id: file.staging_chat_id.map(ChatId),
            log_chat_id: file.log_chat_id.map(ChatId),
            data_dir: file.data_dir.map(PathBuf::from).unwrap_or_else(|| PathBuf::from(".")),
        })
    }

    /// Values a session falls back to for anything it has not set.
    pub fn defaults(&self) -> Defaults {
        Defaults {
            batch_size: self.default_batch_size,
            delay_seconds: self.default_delay_seconds,
            source_channel: self.source_channel.clone(),
            target_channel: self.target_channel.clone(),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    fn assert_err<T>(result: Result<T, ConfigError>) -> ConfigError {
        match result {
            Ok(_) => panic!("expected error, got Ok"),
            Err(e) => e,
        }
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let file = write_config(r#"{
            "telegram_bot_token": "123456789:ABCdefGHIjklMNOpqrsTUVwxyz"
        }"#);
        let config = Config::load(file.path()).expect("should load valid config");
        assert_eq!(config.default_batch_size, 10);
        assert_eq!(config.default_delay_seconds, 5);
        assert!(config.source_channel.is_none());
        assert!(config.target_channel.is_none());
        assert!(config.staging_chat_id.is_none());
        assert_eq!(config.data_dir, PathBuf::from("."));
    }

    #[test]
    fn test_full_config() {
        let file = write_config(r#"{
            "telegram_bot_token": "123456789:ABCdef",
            "default_batch_size": 25,
            "default_delay_seconds": 0,
            "source_channel": "@news",
            "target_channel": "-1001234567890",
            "staging_chat_id": -42,
            "log_chat_id": 7,
            "data_dir": "/tmp/batchfwd"
        }"#);
        let config = Config::load(file.path()).unwrap();
        let defaults = config.defaults();
        assert_eq!(defaults.batch_size, 25);
        assert_eq!(defaults.delay_seconds, 0);
        assert_eq!(defaults.source_channel.as_deref(), Some("@news"));
        assert_eq!(defaults.target_channel.as_deref(), Some("-1001234567890"));
        assert_eq!(config.staging_chat_id, Some(ChatId(-42)));
        assert_eq!(config.log_chat_id, Some(ChatId(7)));
    }

    #[test]
    fn test_blank_channels_are_unset() {
        let file = write_config(r#"{
            "telegram_bot_token": "123456789:ABCdef",
            "source_channel": "  ",
            "target_channel": ""
        }"#);
        let config = Config::load(file.path()).unwrap();
        assert!(config.source_channel.is_none());
        assert!(config.target_channel.is_none());
    }

    #[test]
    fn test_empty_token() {
        let file = write_config(r#"{ "telegram_bot_token": "" }"#);
        let err = assert_err(Config::load(file.path()));
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("telegram_bot_token"));
    }

    #[test]
    fn test_invalid_token_format() {
        for token in ["no_colon", "notanumber:ABC", "123456789:"] {
            let file = write_config(&format!(r#"{{ "telegram_bot_token": "{token}" }}"#));
            let err = assert_err(Config::load(file.path()));
            assert!(matches!(err, ConfigError::Validation(_)), "token {token}");
        }
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let file = write_config(r#"{
            "telegram_bot_token": "123456789:ABCdef",
            "default_batch_size": 0
        }"#);
        let err = assert_err(Config::load(file.path()));
        assert!(err.to_string().contains("default_batch_size"));
    }

    #[test]
    fn test_negative_delay_rejected_by_parser() {
        let file = write_config(r#"{
            "telegram_bot_token": "123456789:ABCdef",
            "default_delay_seconds": -1
        }"#);
        let err = assert_err(Config::load(file.path()));
        assert!(matches!(err, ConfigError::ParseJson { .. }));
    }

    #[test]
    fn test_file_not_found() {
        let err = assert_err(Config::load("/nonexistent/path/config.json"));
        assert!(matches!(err, ConfigError::ReadFile { .. }));
    }

    #[test]
    fn test_invalid_json() {
        let file = write_config("{ invalid json }");
        let err = assert_err(Config::load(file.path()));
        assert!(matches!(err, ConfigError::ParseJson { .. }));
    }
}
