//! Environment-backed runtime configuration for `droplink-cli`.

use std::{
    env,
    error::Error,
    fmt,
    path::{Path, PathBuf},
};

const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:8787";
const DEFAULT_DATA_DIR: &str = "./.droplink-cli-store";
const DEVICE_ID_FILENAME: &str = "device-id";
const DEFAULT_POLL_INTERVAL_MS: u64 = 3_000;
const DEFAULT_MESSAGE_LIMIT: u32 = 50;

/// Runtime configuration used by the CLI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliConfig {
    /// Relay backend base URL.
    pub server_url: String,
    /// Directory holding the persisted device identity.
    pub data_dir: PathBuf,
    /// Periodic poll cadence.
    pub poll_interval_ms: u64,
    /// Fetch-window size per poll.
    pub message_limit: u32,
}

impl CliConfig {
    /// Parse configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(mut lookup: F) -> Result<Self, ConfigError>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let server_url = optional_trimmed_env("DROPLINK_SERVER_URL", &mut lookup)
            .unwrap_or_else(|| DEFAULT_SERVER_URL.to_owned());
        let data_dir = optional_trimmed_env("DROPLINK_DATA_DIR", &mut lookup)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));

        let poll_interval_ms = parse_optional_u64(
            "DROPLINK_POLL_INTERVAL_MS",
            DEFAULT_POLL_INTERVAL_MS,
            &mut lookup,
        )?;
        let message_limit =
            parse_optional_u32("DROPLINK_MESSAGE_LIMIT", DEFAULT_MESSAGE_LIMIT, &mut lookup)?;

        if poll_interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "DROPLINK_POLL_INTERVAL_MS",
                value: "0".to_owned(),
                reason: "must be at least 1".to_owned(),
            });
        }
        if message_limit == 0 {
            return Err(ConfigError::InvalidValue {
                key: "DROPLINK_MESSAGE_LIMIT",
                value: "0".to_owned(),
                reason: "must be at least 1".to_owned(),
            });
        }

        Ok(Self {
            server_url,
            data_dir,
            poll_interval_ms,
            message_limit,
        })
    }

    /// Location of the persisted device identity file.
    pub fn device_id_path(&self) -> PathBuf {
        self.data_dir.join(DEVICE_ID_FILENAME)
    }
}

/// Errors produced while parsing runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// An environment variable could not be parsed.
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidValue { key, value, reason } => {
                write!(f, "invalid {key}='{value}': {reason}")
            }
        }
    }
}

impl Error for ConfigError {}

fn optional_trimmed_env<F>(key: &'static str, lookup: &mut F) -> Option<String>
where
    F: FnMut(&str) -> Option<String>,
{
    lookup(key)
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

fn parse_optional_u64<F>(key: &'static str, default: u64, lookup: &mut F) -> Result<u64, ConfigError>
where
    F: FnMut(&str) -> Option<String>,
{
    let Some(value) = lookup(key) else {
        return Ok(default);
    };
    value
        .parse::<u64>()
        .map_err(|err| ConfigError::InvalidValue {
            key,
            value,
            reason: err.to_string(),
        })
}

fn parse_optional_u32<F>(key: &'static str, default: u32, lookup: &mut F) -> Result<u32, ConfigError>
where
    F: FnMut(&str) -> Option<String>,
{
    let Some(value) = lookup(key) else {
        return Ok(default);
    };
    value
        .parse::<u32>()
        .map_err(|err| ConfigError::InvalidValue {
            key,
            value,
            reason: err.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from_pairs(pairs: &[(&str, &str)]) -> Result<CliConfig, ConfigError> {
        let map = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect::<HashMap<_, _>>();
        CliConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_environment_is_empty() {
        let cfg = config_from_pairs(&[]).expect("empty env should parse");
        assert_eq!(cfg.server_url, DEFAULT_SERVER_URL);
        assert_eq!(cfg.data_dir, Path::new(DEFAULT_DATA_DIR));
        assert_eq!(cfg.poll_interval_ms, DEFAULT_POLL_INTERVAL_MS);
        assert_eq!(cfg.message_limit, DEFAULT_MESSAGE_LIMIT);
        assert_eq!(
            cfg.device_id_path(),
            Path::new(DEFAULT_DATA_DIR).join("device-id")
        );
    }

    #[test]
    fn overrides_are_honored_and_trimmed() {
        let cfg = config_from_pairs(&[
            ("DROPLINK_SERVER_URL", " https://relay.example.org "),
            ("DROPLINK_DATA_DIR", "/tmp/droplink"),
            ("DROPLINK_POLL_INTERVAL_MS", "500"),
            ("DROPLINK_MESSAGE_LIMIT", "100"),
        ])
        .expect("config should parse");

        assert_eq!(cfg.server_url, "https://relay.example.org");
        assert_eq!(cfg.data_dir, Path::new("/tmp/droplink"));
        assert_eq!(cfg.poll_interval_ms, 500);
        assert_eq!(cfg.message_limit, 100);
    }

    #[test]
    fn rejects_zero_and_unparseable_values() {
        let err = config_from_pairs(&[("DROPLINK_POLL_INTERVAL_MS", "0")])
            .expect_err("zero interval should fail");
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                key: "DROPLINK_POLL_INTERVAL_MS",
                ..
            }
        ));

        let err = config_from_pairs(&[("DROPLINK_MESSAGE_LIMIT", "many")])
            .expect_err("non-numeric limit should fail");
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                key: "DROPLINK_MESSAGE_LIMIT",
                ..
            }
        ));
    }
}
