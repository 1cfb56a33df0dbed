//! Client configuration loaded from environment variables.
//!
//! Everything has a default so the client starts with zero configuration.

use std::path::PathBuf;

use whisper_shared::constants::MAX_STORED_MESSAGES;
use whisper_store::database::{default_data_dir, DEFAULT_DB_FILE};
use whisper_store::StoreConfig;

use crate::error::Result;

pub const DEFAULT_LOG_FILTER: &str = "whisper_client=debug,whisper_store=info,whisper_shared=info,warn";

#[derive(Clone)]
pub struct ClientConfig {
    /// Directory holding the database.
    /// Env: `WHISPER_DATA_DIR`
    /// Default: platform data directory (`directories::ProjectDirs`)
    pub data_dir: Option<PathBuf>,

    /// Env: `WHISPER_DB_FILE`
    /// Default: `whisper.db`
    pub db_file: String,

    /// SQLCipher key, only applied with the `sqlcipher` store feature.
    /// Env: `WHISPER_DB_KEY` (64 hex chars)
    /// Default: all-zeros (development only).
    pub db_key: [u8; 32],

    /// Fallback tracing filter when `RUST_LOG` is unset.
    /// Env: `WHISPER_LOG`
    pub log_filter: String,

    /// Env: `WHISPER_MAX_MESSAGES`
    /// Default: `1000`
    pub max_messages_per_conversation: usize,
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("data_dir", &self.data_dir)
            .field("db_file", &self.db_file)
            .field("db_key", &"<redacted>")
            .field("log_filter", &self.log_filter)
            .field("max_messages_per_conversation", &self.max_messages_per_conversation)
            .finish()
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            db_file: DEFAULT_DB_FILE.to_string(),
            db_key: [0u8; 32],
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            max_messages_per_conversation: MAX_STORED_MESSAGES,
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(dir) = lookup("WHISPER_DATA_DIR").filter(|d| !d.trim().is_empty()) {
            config.data_dir = Some(PathBuf::from(dir));
        }

        if let Some(file) = lookup("WHISPER_DB_FILE").filter(|f| !f.trim().is_empty()) {
            config.db_file = file;
        }

        if let Some(hex_key) = lookup("WHISPER_DB_KEY") {
            match parse_hex_key(&hex_key) {
                Ok(key) => config.db_key = key,
                Err(e) => {
                    tracing::warn!(error = %e, "Invalid WHISPER_DB_KEY, using default (dev-only)");
                }
            }
        }

        if let Some(filter) = lookup("WHISPER_LOG").filter(|f| !f.trim().is_empty()) {
            config.log_filter = filter;
        }

        if let Some(val) = lookup("WHISPER_MAX_MESSAGES") {
            match val.trim().parse::<usize>() {
                Ok(n) if n > 0 => config.max_messages_per_conversation = n,
                _ => {
                    tracing::warn!(value = %val, "Invalid WHISPER_MAX_MESSAGES, using default");
                }
            }
        }

        config
    }

    /// Full path of the database file.
    pub fn db_path(&self) -> Result<PathBuf> {
        let dir = match &self.data_dir {
            Some(dir) => dir.clone(),
            None => default_data_dir()?,
        };
        Ok(dir.join(&self.db_file))
    }

    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            max_messages_per_conversation: self.max_messages_per_conversation,
        }
    }
}

fn parse_hex_key(hex_key: &str) -> std::result::Result<[u8; 32], String> {
    let bytes = hex::decode(hex_key.trim()).map_err(|e| e.to_string())?;
    <[u8; 32]>::try_from(bytes.as_slice())
        .map_err(|_| format!("expected 32 bytes, got {}", bytes.len()))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(vars: &[(&str, &str)]) -> ClientConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ClientConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_default_config() {
        let config = config_from(&[]);
        assert_eq!(config.db_file, "whisper.db");
        assert_eq!(config.max_messages_per_conversation, 1000);
        assert_eq!(config.log_filter, DEFAULT_LOG_FILTER);
        assert!(config.data_dir.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("WHISPER_DATA_DIR", "/tmp/whisper"),
            ("WHISPER_DB_FILE", "test.db"),
            ("WHISPER_MAX_MESSAGES", "50"),
            ("WHISPER_DB_KEY", &"ab".repeat(32)),
        ]);
        assert_eq!(config.db_path().unwrap(), PathBuf::from("/tmp/whisper/test.db"));
        assert_eq!(config.max_messages_per_conversation, 50);
        assert_eq!(config.db_key, [0xab; 32]);
        assert_eq!(config.store_config().max_messages_per_conversation, 50);
    }

    #[test]
    fn test_bad_values_fall_back() {
        let config = config_from(&[("WHISPER_MAX_MESSAGES", "lots"), ("WHISPER_DB_KEY", "abcd")]);
        assert_eq!(config.max_messages_per_conversation, 1000);
        assert_eq!(config.db_key, [0u8; 32]);

        let config = config_from(&[("WHISPER_MAX_MESSAGES", "0")]);
        assert_eq!(config.max_messages_per_conversation, 1000);
    }

    #[test]
    fn test_debug_hides_key() {
        let config = config_from(&[("WHISPER_DB_KEY", &"ab".repeat(32))]);
        assert!(!format!("{config:?}").contains("abab"));
    }
}
