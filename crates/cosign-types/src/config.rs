//! Configuration for cosign
//!
//! The configuration names the chains we sign on, the multisig keys we sign
//! for and the shared store the co-signers exchange files through. It is read
//! from TOML and every field can be overridden from `COSIGN_*` environment
//! variables (`__` separates nested tables).

use crate::address::{convert_prefix, AddressError};
use figment::providers::{Env, Format, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Name of the configuration file in the working directory
pub const LOCAL_CONFIG_FILE: &str = "config.toml";

/// Environment variable prefix for overrides
pub const ENV_PREFIX: &str = "COSIGN_";

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
    #[error("Home directory not found")]
    HomeDirectoryNotFound,
    #[error("chain {0} not found in config")]
    UnknownChain(String),
    #[error("key {0} not found in config")]
    UnknownKey(String),
    #[error(transparent)]
    Address(#[from] AddressError),
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Identity name used for signature artifacts
    #[serde(default)]
    pub user: String,
    /// Keyring backend passed to the chain binary
    #[serde(default, alias = "keyringbackend")]
    pub keyring_backend: String,
    /// Gas limit for generated transactions
    #[serde(default = "default_gas", alias = "defaultgas")]
    pub default_gas: u64,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub aws: AwsConfig,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    #[serde(default)]
    pub keys: Vec<SignerIdentity>,
    #[serde(default)]
    pub chains: Vec<ChainProfile>,
}

/// A chain we sign transactions on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainProfile {
    /// Chain name, also the first path component in the store
    pub name: String,
    /// Chain id used for signing
    pub id: String,
    /// Binary used for signing and broadcasting
    pub binary: String,
    /// Bech32 address prefix
    pub prefix: String,
    /// Default RPC node
    #[serde(default)]
    pub node: String,
    /// Fee denom
    #[serde(default)]
    pub denom: String,
}

impl ChainProfile {
    /// The key's multisig address rendered with this chain's prefix
    pub fn address_of(&self, key: &SignerIdentity) -> Result<String, AddressError> {
        convert_prefix(&key.address, &self.prefix)
    }

    /// `override_node` if non-empty, else the configured node, else `None`
    pub fn node_or(&self, override_node: Option<&str>) -> Option<String> {
        override_node
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .or_else(|| (!self.node.is_empty()).then(|| self.node.clone()))
    }
}

/// A multisig key shared by a group of co-signers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignerIdentity {
    /// Key name, also the second path component in the store
    pub name: String,
    /// Multisig account address (any bech32 prefix)
    pub address: String,
    /// Name of the multisig key in the local keyring, used to aggregate
    #[serde(default, alias = "localname")]
    pub local_name: String,
    /// Signatures required before broadcast
    #[serde(default = "default_threshold")]
    pub threshold: usize,
}

/// Which blob store backend to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    S3,
    Fs,
}

/// Store selection
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    /// Root directory for the `fs` backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

/// Credentials and location of the S3 bucket
#[derive(Clone, Serialize, Deserialize)]
pub struct AwsConfig {
    #[serde(default)]
    pub bucket: String,
    #[serde(default = "default_bucket_region", alias = "bucketregion")]
    pub bucket_region: String,
    #[serde(default, alias = "pub")]
    pub access_key_id: String,
    #[serde(default, alias = "priv")]
    pub secret_access_key: String,
}

impl Default for AwsConfig {
    fn default() -> Self {
        Self {
            bucket: String::new(),
            bucket_region: default_bucket_region(),
            access_key_id: String::new(),
            secret_access_key: String::new(),
        }
    }
}

impl fmt::Debug for AwsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AwsConfig")
            .field("bucket", &self.bucket)
            .field("bucket_region", &self.bucket_region)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .finish()
    }
}

/// Bounds on external waits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// Limit for one chain binary invocation
    #[serde(default = "default_subprocess_secs")]
    pub subprocess_secs: u64,
    /// Limit for a deleted object to disappear from the store
    #[serde(default = "default_delete_secs")]
    pub delete_secs: u64,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            subprocess_secs: default_subprocess_secs(),
            delete_secs: default_delete_secs(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl TimeoutConfig {
    pub fn subprocess(&self) -> Duration {
        Duration::from_secs(self.subprocess_secs)
    }

    pub fn delete(&self) -> Duration {
        Duration::from_secs(self.delete_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

fn default_gas() -> u64 {
    300_000
}

fn default_threshold() -> usize {
    2
}

fn default_bucket_region() -> String {
    "us-east-1".to_string()
}

fn default_subprocess_secs() -> u64 {
    120
}

fn default_delete_secs() -> u64 {
    60
}

fn default_poll_interval_ms() -> u64 {
    500
}

impl Default for Config {
    fn default() -> Self {
        Config {
            user: String::new(),
            keyring_backend: String::new(),
            default_gas: default_gas(),
            store: StoreConfig::default(),
            aws: AwsConfig::default(),
            timeouts: TimeoutConfig::default(),
            keys: Vec::new(),
            chains: Vec::new(),
        }
    }
}

impl Config {
    /// Pick the configuration file: explicit path, `./config.toml`, then `~/.cosign/config.toml`
    pub fn resolve_path(explicit: Option<&Path>) -> Result<PathBuf, ConfigError> {
        if let Some(path) = explicit {
            return Ok(path.to_path_buf());
        }
        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            return Ok(local);
        }
        Self::default_config_path()
    }

    /// Get the default configuration file path
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let home = dirs::home_dir().ok_or(ConfigError::HomeDirectoryNotFound)?;
        Ok(home.join(".cosign").join(LOCAL_CONFIG_FILE))
    }

    /// Load configuration from the resolved path, with environment overrides
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let path = Self::resolve_path(explicit)?;
        Self::load_from_file(&path)
    }

    /// Load configuration from a specific file, with environment overrides
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let config: Config = Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .map_err(|e| ConfigError::ParseError(format!("{}: {}", path.display(), e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a TOML string, without environment overrides
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config =
            toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Render as TOML with secrets redacted
    pub fn to_redacted_toml(&self) -> Result<String, ConfigError> {
        let mut shown = self.clone();
        if !shown.aws.secret_access_key.is_empty() {
            shown.aws.secret_access_key = "<redacted>".to_string();
        }
        toml::to_string_pretty(&shown)
            .map_err(|e| ConfigError::ParseError(format!("Failed to serialize config: {e}")))
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for chain in &self.chains {
            if !seen.insert(chain.name.as_str()) {
                return Err(ConfigError::InvalidValue(format!(
                    "chain {} is defined more than once",
                    chain.name
                )));
            }
            if chain.name.is_empty() || chain.name.contains('/') {
                return Err(ConfigError::InvalidValue(format!(
                    "chain name {:?} must be non-empty and must not contain '/'",
                    chain.name
                )));
            }
        }

        let mut seen = HashSet::new();
        for key in &self.keys {
            if !seen.insert(key.name.as_str()) {
                return Err(ConfigError::InvalidValue(format!(
                    "key {} is defined more than once",
                    key.name
                )));
            }
            if key.name.is_empty() || key.name.contains('/') {
                return Err(ConfigError::InvalidValue(format!(
                    "key name {:?} must be non-empty and must not contain '/'",
                    key.name
                )));
            }
            if key.threshold == 0 {
                return Err(ConfigError::InvalidValue(format!(
                    "key {} has a threshold of 0",
                    key.name
                )));
            }
        }

        match self.store.backend {
            StoreBackend::Fs if self.store.path.is_none() => Err(ConfigError::InvalidValue(
                "store.path is required for the fs backend".to_string(),
            )),
            StoreBackend::S3 if self.aws.bucket.is_empty() => Err(ConfigError::InvalidValue(
                "aws.bucket is required for the s3 backend".to_string(),
            )),
            _ => Ok(()),
        }
    }

    pub fn chain(&self, name: &str) -> Result<&ChainProfile, ConfigError> {
        self.chains
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| ConfigError::UnknownChain(name.to_string()))
    }

    pub fn key(&self, name: &str) -> Result<&SignerIdentity, ConfigError> {
        self.keys
            .iter()
            .find(|k| k.name == name)
            .ok_or_else(|| ConfigError::UnknownKey(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bech32::{Bech32, Hrp};

    fn sample_address() -> String {
        bech32::encode::<Bech32>(Hrp::parse("cosmos").unwrap(), &[1u8; 20]).unwrap()
    }

    fn sample_toml() -> String {
        format!(
            r#"
user = "alice"
keyring_backend = "test"

[store]
backend = "fs"
path = "/srv/cosign"

[[keys]]
name = "validator"
address = "{}"
local_name = "validator-multi"
threshold = 3

[[chains]]
name = "osmosis"
id = "osmosis-1"
binary = "osmosisd"
prefix = "osmo"
node = "https://rpc.osmosis.zone:443"
"#,
            sample_address()
        )
    }

    #[test]
    fn test_parse_and_lookup() {
        let config = Config::from_toml(&sample_toml()).unwrap();
        assert_eq!(config.user, "alice");
        assert_eq!(config.default_gas, 300_000);
        assert_eq!(config.store.backend, StoreBackend::Fs);
        assert_eq!(config.timeouts.delete(), Duration::from_secs(60));

        let key = config.key("validator").unwrap();
        assert_eq!(key.threshold, 3);
        let chain = config.chain("osmosis").unwrap();
        assert!(chain.address_of(key).unwrap().starts_with("osmo1"));

        assert!(matches!(
            config.chain("juno"),
            Err(ConfigError::UnknownChain(_))
        ));
        assert!(matches!(config.key("other"), Err(ConfigError::UnknownKey(_))));
    }

    #[test]
    fn test_legacy_field_names() {
        let config = Config::from_toml(
            r#"
keyringbackend = "os"

[aws]
bucket = "multisig"
bucketregion = "eu-west-1"
pub = "AKIA"
priv = "secret"

[[keys]]
name = "val"
address = "cosmos1xyz"
localname = "val-local"
"#,
        )
        .unwrap();
        assert_eq!(config.keyring_backend, "os");
        assert_eq!(config.aws.bucket_region, "eu-west-1");
        assert_eq!(config.aws.access_key_id, "AKIA");
        assert_eq!(config.keys[0].local_name, "val-local");
        assert_eq!(config.keys[0].threshold, 2);
    }

    #[test]
    fn test_validation() {
        assert!(matches!(
            Config::from_toml("[store]\nbackend = \"fs\"\n"),
            Err(ConfigError::InvalidValue(_))
        ));
        assert!(matches!(
            Config::from_toml(""),
            Err(ConfigError::InvalidValue(_))
        ));

        let dup = format!(
            "{}\n[[chains]]\nname = \"osmosis\"\nid = \"x\"\nbinary = \"b\"\nprefix = \"osmo\"\n",
            sample_toml()
        );
        assert!(Config::from_toml(&dup).is_err());

        let zero = sample_toml().replace("threshold = 3", "threshold = 0");
        assert!(Config::from_toml(&zero).is_err());
    }

    #[test]
    fn test_node_override() {
        let config = Config::from_toml(&sample_toml()).unwrap();
        let chain = config.chain("osmosis").unwrap();
        assert_eq!(
            chain.node_or(Some("http://localhost:26657")).as_deref(),
            Some("http://localhost:26657")
        );
        assert_eq!(
            chain.node_or(Some("")).as_deref(),
            Some("https://rpc.osmosis.zone:443")
        );

        let mut bare = chain.clone();
        bare.node.clear();
        assert_eq!(bare.node_or(None), None);
    }

    #[test]
    fn test_redacted_output() {
        let mut config = Config::from_toml(&sample_toml()).unwrap();
        config.aws.secret_access_key = "hunter2".to_string();
        let shown = config.to_redacted_toml().unwrap();
        assert!(!shown.contains("hunter2"));
        assert!(!format!("{:?}", config.aws).contains("hunter2"));
    }

    #[test]
    fn test_load_from_file_with_env_override() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("config.toml", &sample_toml())?;
            jail.set_env("COSIGN_USER", "bob");
            jail.set_env("COSIGN_TIMEOUTS__DELETE_SECS", "5");

            let config = Config::load_from_file(Path::new("config.toml"))
                .map_err(|e| e.to_string())?;
            assert_eq!(config.user, "bob");
            assert_eq!(config.timeouts.delete(), Duration::from_secs(5));
            assert_eq!(config.keyring_backend, "test");
            Ok(())
        });
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            Config::load_from_file(Path::new("/definitely/not/here.toml")),
            Err(ConfigError::FileNotFound(_))
        ));
    }
}
