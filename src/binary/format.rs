//! Binary format constants and records.
//!
//! All multi-byte integers are little-endian. Records are encoded and
//! decoded field by field, so the layout does not depend on host endianness.

use crate::error::Section;
use crate::{Error, Result};

/// Magic bytes for identifying ip2cloud trie artifacts.
pub const MAGIC: [u8; 4] = *b"IP2C";

/// Current format version.
pub const FORMAT_VERSION: u16 = 1;

/// Header size in bytes.
pub const HEADER_SIZE: usize = 16;

/// Size of one node record in bytes.
pub const NODE_RECORD_SIZE: usize = 12;

/// Size of the length prefix in front of each owner name.
pub const NAME_LEN_SIZE: usize = 2;

/// Artifact header (16 bytes).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrieHeader {
    /// Magic bytes: "IP2C"
    pub magic: [u8; 4],
    /// Format version (u16 LE)
    pub version: u16,
    /// Reserved, written as 0 and ignored on read
    pub _reserved1: u16,
    /// Number of node records after the owner table
    pub node_count: u32,
    /// Number of owner table entries, including the empty sentinel
    pub owner_count: u16,
    /// Reserved, written as 0
    pub _reserved2: u16,
}

impl TrieHeader {
    /// Create a header for the given table sizes.
    pub fn new(node_count: u32, owner_count: u16) -> Self {
        Self {
            magic: MAGIC,
            version: FORMAT_VERSION,
            _reserved1: 0,
            node_count,
            owner_count,
            _reserved2: 0,
        }
    }

    /// Encode the header into its on-disk form.
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut out = [0u8; HEADER_SIZE];
        out[0..4].copy_from_slice(&self.magic);
        out[4..6].copy_from_slice(&self.version.to_le_bytes());
        out[6..8].copy_from_slice(&self._reserved1.to_le_bytes());
        out[8..12].copy_from_slice(&self.node_count.to_le_bytes());
        out[12..14].copy_from_slice(&self.owner_count.to_le_bytes());
        out[14..16].copy_from_slice(&self._reserved2.to_le_bytes());
        out
    }

    /// Parse and validate a header from the start of `data`.
    ///
    /// Magic is checked before version so each failure is reported distinctly.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let Some(bytes) = data.get(..HEADER_SIZE) else {
            return Err(Error::Truncated(Section::Header));
        };
        let header = Self {
            magic: [bytes[0], bytes[1], bytes[2], bytes[3]],
            version: read_u16(bytes, 4),
            _reserved1: read_u16(bytes, 6),
            node_count: read_u32(bytes, 8),
            owner_count: read_u16(bytes, 12),
            _reserved2: read_u16(bytes, 14),
        };
        header.validate()?;
        Ok(header)
    }

    /// Validate the header magic and version.
    pub fn validate(&self) -> Result<()> {
        if self.magic != MAGIC {
            return Err(Error::InvalidMagic);
        }
        if self.version != FORMAT_VERSION {
            return Err(Error::UnsupportedVersion(self.version));
        }
        Ok(())
    }
}

/// Node record (12 bytes).
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NodeRecord {
    /// Arena index of the 0-bit child, 0 = absent
    pub child0: u32,
    /// Arena index of the 1-bit child, 0 = absent
    pub child1: u32,
    /// Owner table index, 0 = none
    pub owner: u16,
    /// Padding
    pub _padding: [u8; 2],
}

impl NodeRecord {
    /// Encode the record into its on-disk form.
    pub fn to_bytes(&self) -> [u8; NODE_RECORD_SIZE] {
        let mut out = [0u8; NODE_RECORD_SIZE];
        out[0..4].copy_from_slice(&self.child0.to_le_bytes());
        out[4..8].copy_from_slice(&self.child1.to_le_bytes());
        out[8..10].copy_from_slice(&self.owner.to_le_bytes());
        out
    }

    /// Decode a record from exactly `NODE_RECORD_SIZE` bytes.
    pub fn from_bytes(bytes: &[u8; NODE_RECORD_SIZE]) -> Self {
        Self {
            child0: read_u32(bytes, 0),
            child1: read_u32(bytes, 4),
            owner: read_u16(bytes, 8),
            _padding: [0; 2],
        }
    }
}

/// Total encoded size for the given owner names and node count.
pub fn encoded_len<'a>(owners: impl IntoIterator<Item = &'a str>, node_count: usize) -> usize {
    let names: usize = owners
        .into_iter()
        .map(|name| NAME_LEN_SIZE + name.len())
        .sum();
    HEADER_SIZE + names + NODE_RECORD_SIZE * node_count
}

pub(crate) fn read_u16(bytes: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([bytes[at], bytes[at + 1]])
}

pub(crate) fn read_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}
