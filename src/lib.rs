//! ip2cloud - Classify IPv4 addresses against cloud provider ranges.
//!
//! This crate compiles named lists of CIDR blocks into a binary trie with
//! longest-prefix matching, and persists the compiled trie as a compact
//! artifact so repeated startups skip the build.
//!
//! # Features
//!
//! - **Longest-prefix match**: the most specific registered prefix wins
//! - **Compact artifact**: fixed little-endian layout, memory-mapped on load
//! - **Reproducible builds**: identical input yields byte-identical output
//! - **Concurrent lookups**: the compiled trie is immutable and `Sync`
//! - **Batch pipeline**: bounded worker pool for high-throughput streams
//!
//! # Quick Start
//!
//! ```
//! use ip2cloud::Trie;
//!
//! let trie = Trie::build([
//!     ("aws", vec!["3.0.0.0/9", "52.94.0.0/22"]),
//!     ("gcp", vec!["34.64.0.0/10"]),
//! ]);
//! assert_eq!(trie.lookup("3.5.1.1"), "aws");
//!
//! // Persist and reload
//! let bytes = trie.encode();
//! let loaded = Trie::decode(&bytes).unwrap();
//! assert_eq!(loaded.lookup("34.100.0.1"), "gcp");
//! assert_eq!(loaded.lookup("8.8.8.8"), "");
//! ```
//!
//! # Batch Lookups
//!
//! ```
//! use ip2cloud::{LookupPipeline, OwnerFilter, PipelineConfig, Trie};
//!
//! let trie = Trie::build([("aws", vec!["3.0.0.0/8"]), ("gcp", vec!["34.0.0.0/8"])]);
//! let pipeline = LookupPipeline::with_config(&trie, PipelineConfig::with_workers(4))
//!     .with_filter(OwnerFilter::parse("AWS"));
//!
//! let mut found = Vec::new();
//! pipeline.run_addrs(
//!     vec!["3.1.1.1".into(), "34.1.1.1".into(), "bogus".into()],
//!     |batch| found.extend(batch),
//! );
//! assert_eq!(found.len(), 1);
//! assert_eq!(found[0].owner, "aws");
//! ```

mod addr;
mod error;
mod trie;

pub mod binary;
pub mod pipeline;
pub mod report;
pub mod store;

// Re-export core types
pub use addr::{format_ipv4, parse_ipv4};
pub use error::{Error, Result, Section};
pub use trie::{BuildWarning, Trie, NO_OWNER};

// Re-export pipeline and output types
pub use pipeline::{LookupPipeline, Match, OwnerFilter, PipelineConfig, PipelineStats};
pub use report::GroupedReport;

// Re-export storage
pub use store::{ProviderInfo, Store};
