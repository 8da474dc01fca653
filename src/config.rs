use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::{ensure, Context};
use serde::Deserialize;

use crate::consts::*;

/// Runtime settings, read from a JSON file with PascalCase keys. Every field
/// is optional; unknown keys are rejected.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase", default, deny_unknown_fields)]
pub struct Config {
    pub host: String,
    pub ss58_prefix: u16,
    pub batch_size: usize,
    /// Number of top-delegations queries in flight at once.
    pub fetch_concurrency: usize,
    /// Replaces the fetched collator list when set.
    pub collator_override: Option<Vec<String>>,
    /// Encode calls offline from known indices instead of the node's metadata.
    pub call_indices: Option<CallIndices>,
    pub dev: DevConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct CallIndices {
    pub pallet: u8,
    pub collators: u8,
    pub delegators: u8,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase", default, deny_unknown_fields)]
pub struct DevConfig {
    pub host: String,
    pub from: String,
    pub to: String,
    pub amount: u128,
    pub watch_secs: u64,
    pub token_decimals: u8,
    pub token_symbol: String,
    pub event_pallet: Option<String>,
    pub event_variant: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: WEB_SOCKET.to_string(),
            ss58_prefix: SS58_PREFIX,
            batch_size: DELEGATOR_BATCH_SIZE,
            fetch_concurrency: 1,
            collator_override: None,
            call_indices: None,
            dev: DevConfig::default(),
        }
    }
}

impl Default for DevConfig {
    fn default() -> Self {
        Self {
            host: DEV_WEB_SOCKET.to_string(),
            from: ALICE.to_string(),
            to: BOB.to_string(),
            amount: DEV_TRANSFER_AMOUNT,
            watch_secs: DEV_WATCH_SECS,
            token_decimals: TOKEN_DECIMALS,
            token_symbol: TOKEN_SYMBOL.to_string(),
            event_pallet: None,
            event_variant: None,
        }
    }
}

impl Config {
    /// Reads `path` when given, otherwise the default location if a file
    /// exists there, otherwise falls back to built-in defaults.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(CONFIG_PATH).exists() => Self::from_file(Path::new(CONFIG_PATH))?,
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &Path) -> anyhow::Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("failed to open config file {}", path.display()))?;
        let reader = BufReader::new(file);
        serde_json::from_reader(reader)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(self.batch_size > 0, "BatchSize must be at least 1");
        ensure!(self.fetch_concurrency > 0, "FetchConcurrency must be at least 1");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_yields_defaults() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config.host, WEB_SOCKET);
        assert_eq!(config.batch_size, 50);
        assert_eq!(config.fetch_concurrency, 1);
        assert_eq!(config.dev.host, DEV_WEB_SOCKET);
        assert_eq!(config.dev.from, "//Alice");
        assert!(config.call_indices.is_none());
        config.validate().unwrap();
    }

    #[test]
    fn pascal_case_fields_override_defaults() {
        let config: Config = serde_json::from_str(
            r#"{
                "Host": "ws://127.0.0.1:9944",
                "BatchSize": 10,
                "CollatorOverride": ["a", "b"],
                "CallIndices": { "Pallet": 88, "Collators": 40, "Delegators": 41 },
                "Dev": { "Amount": 5, "EventPallet": "Balances" }
            }"#,
        )
        .unwrap();
        assert_eq!(config.host, "ws://127.0.0.1:9944");
        assert_eq!(config.batch_size, 10);
        assert_eq!(config.collator_override, Some(vec!["a".to_string(), "b".to_string()]));
        assert_eq!(
            config.call_indices,
            Some(CallIndices { pallet: 88, collators: 40, delegators: 41 })
        );
        assert_eq!(config.dev.amount, 5);
        assert_eq!(config.dev.to, "//Bob");
        assert_eq!(config.dev.event_pallet.as_deref(), Some("Balances"));
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        let config: Config = serde_json::from_str(r#"{ "BatchSize": 0 }"#).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn misspelled_keys_are_rejected() {
        let err = serde_json::from_str::<Config>(r#"{ "Batchsize": 10 }"#).unwrap_err();
        assert!(err.to_string().contains("Batchsize"));
        assert!(serde_json::from_str::<Config>(r#"{ "Dev": { "Amout": 1 } }"#).is_err());
        assert!(serde_json::from_str::<Config>(
            r#"{ "CallIndices": { "Pallet": 1, "Collators": 2, "Delegators": 3, "Extra": 4 } }"#
        )
        .is_err());
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        assert!(Config::load(Some(Path::new("./does/not/exist.json"))).is_err());
    }
}
