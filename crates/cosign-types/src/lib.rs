//! Core types for cosign
//!
//! This crate provides the transaction path model, the signing metadata
//! exchanged through the store, address and coin helpers, and configuration.

pub mod address;
pub mod coin;
pub mod config;
pub mod metadata;
pub mod path;

pub use address::{convert_prefix, prefix_of, AddressError};
pub use coin::{Coin, CoinError};
pub use config::{
    AwsConfig, ChainProfile, Config, ConfigError, SignerIdentity, StoreBackend, StoreConfig,
    TimeoutConfig,
};
pub use metadata::SignMetadata;
pub use path::{
    PathError, Placement, TxFile, TxKey, TxPath, TxVersion, SIGNDATA_FILE, UNSIGNED_FILE,
};
