//! Error types for ip2cloud.

use std::fmt;

use thiserror::Error;

/// Region of a binary artifact where the data ran out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    /// The fixed 16-byte header
    Header,
    /// The `u16` length prefix of an owner name
    OwnerNameLength,
    /// The bytes of an owner name
    OwnerName,
    /// The fixed-size node records
    NodeArray,
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Section::Header => "header",
            Section::OwnerNameLength => "owner name length",
            Section::OwnerName => "owner name",
            Section::NodeArray => "node array",
        };
        f.write_str(name)
    }
}

/// Error type for ip2cloud operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid binary file magic bytes
    #[error("invalid magic bytes: expected IP2C header")]
    InvalidMagic,

    /// Unsupported binary format version
    #[error("unsupported format version: {0}")]
    UnsupportedVersion(u16),

    /// Artifact ended before a complete record could be read
    #[error("truncated artifact: {0}")]
    Truncated(Section),

    /// Owner name is not valid UTF-8
    #[error("owner name at index {0} is not valid UTF-8")]
    InvalidOwnerName(u16),

    /// Owner table lacks the reserved "no owner" entry
    #[error("owner table is empty")]
    EmptyOwnerTable,

    /// Node array lacks the root node
    #[error("node array is empty")]
    MissingRoot,

    /// A node references a child outside the node array
    #[error("node {node} references missing child {child}")]
    DanglingChild { node: u32, child: u32 },

    /// A node references an owner outside the owner table
    #[error("node {node} references unknown owner {owner}")]
    UnknownOwner { node: u32, owner: u16 },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Provider name cannot be used as a data file name
    #[error("invalid provider name: {0:?}")]
    InvalidProviderName(String),

    /// Provider has no data file
    #[error("provider not found: {0}")]
    ProviderNotFound(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type alias for ip2cloud operations.
pub type Result<T> = std::result::Result<T, Error>;
