//! Transaction path model
//!
//! Every object in the store lives at `<chain>/<key>/<version>/<file>`. The
//! version is a plain base-10 integer starting at 0; the file is either one of
//! the two reserved names or the identity name of a signer.

use std::fmt;
use thiserror::Error;

/// Reserved file name of the unsigned payload
pub const UNSIGNED_FILE: &str = "unsigned";

/// Reserved file name of the signing metadata
pub const SIGNDATA_FILE: &str = "signdata";

/// Path classification errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("invalid path component {0:?}: must be non-empty and must not contain '/'")]
    InvalidComponent(String),

    #[error("{0} does not decompose into <chain>/<key>/<version>/<file>")]
    TooFewSegments(String),

    #[error("{0} is nested below a version directory")]
    Nested(String),

    #[error("version segment {segment:?} of {path} is not a canonical integer")]
    InvalidVersion { path: String, segment: String },

    #[error("{0:?} is a reserved file name and cannot name a signer")]
    Reserved(String),

    #[error("{path} is not under {prefix}")]
    OutsidePrefix { path: String, prefix: String },
}

fn check_component(s: &str) -> Result<(), PathError> {
    if s.is_empty() || s.contains('/') || s == "." || s == ".." {
        return Err(PathError::InvalidComponent(s.to_string()));
    }
    Ok(())
}

fn parse_version(path: &str, segment: &str) -> Result<u64, PathError> {
    let invalid = || PathError::InvalidVersion {
        path: path.to_string(),
        segment: segment.to_string(),
    };
    let index: u64 = segment.parse().map_err(|_| invalid())?;
    // "007" and "+7" would alias version 7
    if index.to_string() != segment {
        return Err(invalid());
    }
    Ok(index)
}

/// A file inside a version directory
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TxFile {
    /// The unsigned transaction payload
    Unsigned,
    /// The JSON-encoded [`crate::SignMetadata`]
    SignData,
    /// A signature artifact named after the signer's identity
    Signature(String),
}

impl TxFile {
    /// Classify a bare file name
    pub fn from_name(name: &str) -> Self {
        match name {
            UNSIGNED_FILE => TxFile::Unsigned,
            SIGNDATA_FILE => TxFile::SignData,
            other => TxFile::Signature(other.to_string()),
        }
    }

    /// Signature artifact for `signer`, rejecting reserved or malformed names
    pub fn signature(signer: &str) -> Result<Self, PathError> {
        check_component(signer)?;
        match TxFile::from_name(signer) {
            TxFile::Signature(name) => Ok(TxFile::Signature(name)),
            _ => Err(PathError::Reserved(signer.to_string())),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            TxFile::Unsigned => UNSIGNED_FILE,
            TxFile::SignData => SIGNDATA_FILE,
            TxFile::Signature(name) => name,
        }
    }

    pub fn is_signature(&self) -> bool {
        matches!(self, TxFile::Signature(_))
    }
}

impl fmt::Display for TxFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A `(chain, key)` namespace
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TxKey {
    chain: String,
    key: String,
}

/// Where an object below a [`TxKey`] prefix sits
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Placement {
    /// Key ends in `/`: an empty directory marker
    Marker,
    /// Directly under `<chain>/<key>/`, outside any version
    Loose,
    /// Inside the given version directory
    Version(u64),
}

impl TxKey {
    pub fn new(chain: impl Into<String>, key: impl Into<String>) -> Result<Self, PathError> {
        let (chain, key) = (chain.into(), key.into());
        check_component(&chain)?;
        check_component(&key)?;
        Ok(Self { chain, key })
    }

    pub fn chain(&self) -> &str {
        &self.chain
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// `<chain>/<key>/`, trailing slash included so `val` never matches `val2`
    pub fn prefix(&self) -> String {
        format!("{}/{}/", self.chain, self.key)
    }

    pub fn version(&self, index: u64) -> TxVersion {
        TxVersion {
            key: self.clone(),
            index,
        }
    }

    /// Classify an object key found under [`TxKey::prefix`]
    pub fn placement(&self, object_key: &str) -> Result<Placement, PathError> {
        let prefix = self.prefix();
        let rest = object_key
            .strip_prefix(&prefix)
            .ok_or_else(|| PathError::OutsidePrefix {
                path: object_key.to_string(),
                prefix: prefix.clone(),
            })?;

        if rest.is_empty() || rest.ends_with('/') {
            return Ok(Placement::Marker);
        }
        match rest.split_once('/') {
            None => Ok(Placement::Loose),
            Some((segment, _)) => parse_version(object_key, segment).map(Placement::Version),
        }
    }
}

impl fmt::Display for TxKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.chain, self.key)
    }
}

/// One transaction version: `(chain, key, index)`
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TxVersion {
    key: TxKey,
    index: u64,
}

impl TxVersion {
    pub fn key(&self) -> &TxKey {
        &self.key
    }

    pub fn index(&self) -> u64 {
        self.index
    }

    /// `<chain>/<key>/<version>/`, trailing slash included so `1` never matches `10`
    pub fn prefix(&self) -> String {
        format!("{}{}/", self.key.prefix(), self.index)
    }

    /// Full object path of `file` in this version
    pub fn path(&self, file: &TxFile) -> String {
        format!("{}{}", self.prefix(), file.name())
    }

    /// Parse an object key that must belong to this version
    pub fn file_of(&self, object_key: &str) -> Result<Option<TxFile>, PathError> {
        let prefix = self.prefix();
        if !object_key.starts_with(&prefix) {
            return Err(PathError::OutsidePrefix {
                path: object_key.to_string(),
                prefix,
            });
        }
        Ok(TxPath::parse(object_key)?.map(|p| p.file))
    }
}

impl fmt::Display for TxVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.key, self.index)
    }
}

/// A fully qualified object path
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TxPath {
    pub version: TxVersion,
    pub file: TxFile,
}

impl TxPath {
    pub fn new(version: TxVersion, file: TxFile) -> Self {
        Self { version, file }
    }

    /// Parse an object key. Directory markers (keys ending in `/`) yield `None`.
    pub fn parse(object_key: &str) -> Result<Option<Self>, PathError> {
        if object_key.ends_with('/') {
            return Ok(None);
        }

        let segments: Vec<&str> = object_key.split('/').collect();
        if segments.len() < 4 {
            return Err(PathError::TooFewSegments(object_key.to_string()));
        }
        if segments.len() > 4 {
            return Err(PathError::Nested(object_key.to_string()));
        }
        for segment in &segments {
            check_component(segment).map_err(|_| PathError::TooFewSegments(object_key.to_string()))?;
        }

        let key = TxKey::new(segments[0], segments[1])?;
        let index = parse_version(object_key, segments[2])?;
        Ok(Some(Self {
            version: key.version(index),
            file: TxFile::from_name(segments[3]),
        }))
    }
}

impl fmt::Display for TxPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.version.path(&self.file))
    }
}
