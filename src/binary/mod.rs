//! Binary artifact format for compiled tries.
//!
//! The artifact is a fixed little-endian layout that can be loaded without
//! rebuilding the trie from CIDR text.
//!
//! # File Structure
//!
//! ```text
//! +------------------+
//! |     HEADER       |  16 bytes: "IP2C", version, node count, owner count
//! +------------------+
//! |   OWNER TABLE    |  owner_count x (u16 length + name bytes)
//! +------------------+
//! |    NODE ARRAY    |  node_count x 12-byte records
//! +------------------+
//! ```
//!
//! Encoding lives in `writer`, decoding and memory-mapped loading in `reader`,
//! both as inherent methods on [`Trie`](crate::Trie).

mod format;
mod reader;
mod writer;


pub use format::*;
