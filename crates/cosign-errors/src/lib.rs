//! Error handling types for the cosign transaction coordinators.
//!
//! Every failure a coordinator can report is one variant of [`Error`]. All of
//! them are terminal for the current invocation; nothing is retried
//! automatically and the operator re-runs the command.

use std::time::Duration;
use thiserror::Error;

/// Boxed underlying cause carried by transport and process errors
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Core error type for cosign operations
#[derive(Error, Debug)]
pub enum Error {
    /// Mutually exclusive inputs were requested together
    #[error("conflicting inputs: {0}")]
    InputConflict(String),

    /// Not enough information to proceed; nothing was written
    #[error("insufficient context: {0}")]
    InsufficientContext(String),

    /// A transaction already exists and no conflict policy was given
    #[error("transactions already exist under {prefix}; use --force to overwrite or --additional to queue another")]
    AlreadyExists { prefix: String },

    /// `force` or `additional` was requested against an empty namespace
    #[error("nothing published under {prefix}; --force and --additional need existing transactions")]
    NothingToModify { prefix: String },

    /// A required object of a version is absent
    #[error("version not found: {path} does not exist")]
    VersionNotFound { path: String },

    /// An older version is still pending
    #[error("version {pending} is still pending; version {requested} cannot be broadcast before it")]
    OutOfOrderBroadcast { requested: u64, pending: u64 },

    /// Fewer signature artifacts than the threshold
    #[error("insufficient signatures for broadcast: requires {required}, got {actual}")]
    InsufficientSignatures { required: usize, actual: usize },

    /// The submission output lacked a result code or hash
    #[error("unparsable broadcast result: {0}")]
    UnparsableResult(String),

    /// The blob store could not be reached or refused the request
    #[error("store unavailable while {context}")]
    StoreUnavailable {
        context: String,
        #[source]
        source: BoxError,
    },

    /// The external chain binary exited unsuccessfully or could not be started
    #[error("command failed: {command}\n{output}")]
    SubprocessFailed {
        command: String,
        output: String,
        #[source]
        source: Option<BoxError>,
    },

    /// A bounded wait elapsed
    #[error("timed out after {after:?} while {operation}")]
    Timeout { operation: String, after: Duration },

    /// A store key does not fit the `<chain>/<key>/<version>/<file>` scheme
    #[error("classification error: {0}")]
    Classification(String),

    /// The signing metadata of a version could not be decoded
    #[error("corrupt sign metadata at {path}: {reason}")]
    CorruptMetadata { path: String, reason: String },

    /// Some objects were removed and some were not
    #[error("partial cleanup of {prefix}: removed {removed:?}, remaining {remaining:?}")]
    PartialCleanup {
        prefix: String,
        removed: Vec<String>,
        remaining: Vec<String>,
        #[source]
        source: Box<Error>,
    },

    /// The transaction was submitted but its version could not be removed
    #[error("transaction {txhash} was submitted with code {code}, but cleanup of {prefix} failed: removed {removed:?}, remaining {remaining:?}; run delete to finish")]
    CleanupAfterBroadcast {
        code: u32,
        txhash: String,
        prefix: String,
        removed: Vec<String>,
        remaining: Vec<String>,
        #[source]
        source: Box<Error>,
    },

    /// Configuration is missing or invalid
    #[error("configuration error: {0}")]
    Config(String),

    /// Local I/O error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Wrap a transport failure from the blob store
    pub fn store(context: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Error::StoreUnavailable {
            context: context.into(),
            source: source.into(),
        }
    }

    /// Process exit code for this error
    pub fn code(&self) -> u32 {
        match self {
            Error::InputConflict(_) => codes::INPUT_CONFLICT,
            Error::InsufficientContext(_) => codes::OK,
            Error::AlreadyExists { .. } => codes::ALREADY_EXISTS,
            Error::NothingToModify { .. } => codes::NOTHING_TO_MODIFY,
            Error::VersionNotFound { .. } => codes::NOT_FOUND,
            Error::OutOfOrderBroadcast { .. } => codes::OUT_OF_ORDER,
            Error::InsufficientSignatures { .. } => codes::INSUFFICIENT_SIGNATURES,
            Error::UnparsableResult(_) => codes::UNPARSABLE_RESULT,
            Error::StoreUnavailable { .. } => codes::STORE_UNAVAILABLE,
            Error::SubprocessFailed { .. } => codes::SUBPROCESS_FAILED,
            Error::Timeout { .. } => codes::TIMEOUT,
            Error::Classification(_) | Error::CorruptMetadata { .. } => codes::INVALID_DATA,
            Error::PartialCleanup { .. } | Error::CleanupAfterBroadcast { .. } => {
                codes::PARTIAL_CLEANUP
            }
            Error::Config(_) => codes::CONFIG,
            Error::Io(_) => codes::INTERNAL,
        }
    }

    /// Advisory errors are reported without failing the process
    pub fn is_advisory(&self) -> bool {
        matches!(self, Error::InsufficientContext(_))
    }
}

/// Result type alias for cosign operations
pub type Result<T> = std::result::Result<T, Error>;

/// Exit codes reported by the cosign binary
pub mod codes {
    /// Success
    pub const OK: u32 = 0;
    /// Internal error
    pub const INTERNAL: u32 = 1;
    /// Configuration error
    pub const CONFIG: u32 = 2;
    /// Mutually exclusive inputs
    pub const INPUT_CONFLICT: u32 = 3;
    /// Transactions already exist
    pub const ALREADY_EXISTS: u32 = 4;
    /// Nothing to modify
    pub const NOTHING_TO_MODIFY: u32 = 5;
    /// Version or one of its objects not found
    pub const NOT_FOUND: u32 = 6;
    /// An older version is still pending
    pub const OUT_OF_ORDER: u32 = 7;
    /// Threshold not met
    pub const INSUFFICIENT_SIGNATURES: u32 = 8;
    /// Broadcast output could not be parsed
    pub const UNPARSABLE_RESULT: u32 = 9;
    /// Store transport failure
    pub const STORE_UNAVAILABLE: u32 = 10;
    /// Chain binary failure
    pub const SUBPROCESS_FAILED: u32 = 11;
    /// Bounded wait elapsed
    pub const TIMEOUT: u32 = 12;
    /// Stored data does not fit the layout
    pub const INVALID_DATA: u32 = 13;
    /// Cleanup stopped midway
    pub const PARTIAL_CLEANUP: u32 = 14;
}
