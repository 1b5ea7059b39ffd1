//! Binary trie over the IPv4 address space with longest-prefix matching.
//!
//! Nodes live in a single arena and refer to each other by index. Index 0 is
//! always the root; a child slot of `None` means "no branch". Because no node
//! can have the root as a child, the on-disk encoding of an absent child as
//! `0` never collides with a real reference.

use ahash::AHashMap;
use ipnet::IpNet;
use std::fmt;
use std::net::Ipv4Addr;
use std::num::NonZeroU32;

use crate::addr::parse_ipv4;

/// Arena index of the root node.
pub(crate) const ROOT: usize = 0;

/// Owner index reserved for "no owner".
pub const NO_OWNER: u16 = 0;

/// Initial arena capacity.
const INITIAL_CAPACITY: usize = 1 << 16;

/// One bit position in the trie.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Node {
    /// Children for bit value 0 and 1.
    pub(crate) children: [Option<NonZeroU32>; 2],
    /// Owner of the prefix ending exactly here (`NO_OWNER` if none).
    pub(crate) owner: u16,
}

/// Non-fatal problem found while building a trie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildWarning {
    /// The CIDR string could not be parsed.
    InvalidCidr { owner: String, cidr: String },
    /// The CIDR is IPv6, which this trie does not index.
    Ipv6Cidr { owner: String, cidr: String },
    /// The owner table already holds `u16::MAX` real owners.
    OwnerTableFull { owner: String },
    /// The owner name does not fit the `u16` length prefix.
    OwnerNameTooLong { owner: String },
    /// The owner name is empty, which is reserved for "no owner".
    EmptyOwnerName,
}

impl fmt::Display for BuildWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildWarning::InvalidCidr { owner, cidr } => {
                write!(f, "{}: invalid CIDR {}", owner, cidr)
            }
            BuildWarning::Ipv6Cidr { owner, cidr } => {
                write!(f, "{}: skipping IPv6 CIDR {}", owner, cidr)
            }
            BuildWarning::OwnerTableFull { owner } => {
                write!(f, "{}: owner table full, skipping", owner)
            }
            BuildWarning::OwnerNameTooLong { owner } => {
                write!(f, "{}: owner name too long, skipping", owner)
            }
            BuildWarning::EmptyOwnerName => write!(f, "empty owner name, skipping"),
        }
    }
}

/// Compiled IPv4 classification trie.
///
/// A `Trie` is immutable once built or decoded, so a shared reference can be
/// handed to any number of threads for concurrent lookups.
///
/// # Examples
/// ```
/// use ip2cloud::Trie;
///
/// let trie = Trie::build([
///     ("broad", vec!["10.0.0.0/8"]),
///     ("narrow", vec!["10.0.0.0/24"]),
/// ]);
/// assert_eq!(trie.lookup("10.0.0.5"), "narrow");
/// assert_eq!(trie.lookup("10.0.1.5"), "broad");
/// assert_eq!(trie.lookup("192.0.2.1"), "");
/// ```
#[derive(Debug, Clone)]
pub struct Trie {
    pub(crate) nodes: Vec<Node>,
    pub(crate) owners: Vec<String>,
    pub(crate) owner_index: AHashMap<String, u16>,
    pub(crate) warnings: Vec<BuildWarning>,
}

impl Trie {
    /// Create a trie holding only the root node and the sentinel owner.
    pub fn new() -> Self {
        let mut nodes = Vec::with_capacity(INITIAL_CAPACITY);
        nodes.push(Node::default());
        Self {
            nodes,
            owners: vec![String::new()],
            owner_index: AHashMap::new(),
            warnings: Vec::new(),
        }
    }

    /// Build a trie from an owner → CIDR list mapping.
    ///
    /// Owners are processed in lexicographic order, which fixes their table
    /// indices and makes the encoded artifact reproducible. When two owners
    /// register the identical prefix, the later owner in that order wins.
    /// Malformed and IPv6 CIDRs are recorded as [`BuildWarning`]s and skipped.
    pub fn build<I, K, V, C>(data: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: IntoIterator<Item = C>,
        C: AsRef<str>,
    {
        let mut entries: Vec<(K, V)> = data.into_iter().collect();
        entries.sort_by(|a, b| a.0.as_ref().cmp(b.0.as_ref()));

        let mut trie = Self::new();
        for (owner, cidrs) in entries {
            let owner = owner.as_ref();
            let idx = match trie.intern_owner(owner) {
                Ok(idx) => idx,
                Err(warning) => {
                    trie.warnings.push(warning);
                    continue;
                }
            };

            for cidr in cidrs {
                let cidr = cidr.as_ref();
                match cidr.parse::<IpNet>() {
                    Ok(IpNet::V4(net)) => {
                        trie.insert(u32::from(net.network()), net.prefix_len(), idx);
                    }
                    Ok(IpNet::V6(_)) => trie.warnings.push(BuildWarning::Ipv6Cidr {
                        owner: owner.to_string(),
                        cidr: cidr.to_string(),
                    }),
                    Err(_) => trie.warnings.push(BuildWarning::InvalidCidr {
                        owner: owner.to_string(),
                        cidr: cidr.to_string(),
                    }),
                }
            }
        }

        trie.nodes.shrink_to_fit();
        trie
    }

    fn intern_owner(&mut self, name: &str) -> Result<u16, BuildWarning> {
        if name.is_empty() {
            return Err(BuildWarning::EmptyOwnerName);
        }
        if let Some(&idx) = self.owner_index.get(name) {
            return Ok(idx);
        }
        if name.len() > usize::from(u16::MAX) {
            return Err(BuildWarning::OwnerNameTooLong {
                owner: name.to_string(),
            });
        }
        let idx = u16::try_from(self.owners.len()).map_err(|_| BuildWarning::OwnerTableFull {
            owner: name.to_string(),
        })?;
        self.owners.push(name.to_string());
        self.owner_index.insert(name.to_string(), idx);
        Ok(idx)
    }

    fn alloc(&mut self) -> NonZeroU32 {
        let id = self.nodes.len() as u32;
        self.nodes.push(Node::default());
        // The root occupies slot 0, so every allocated id is at least 1.
        NonZeroU32::new(id).unwrap_or(NonZeroU32::MIN)
    }

    /// Insert `prefix_len` leading bits of `network`, owned by `owner`.
    ///
    /// Overwrites any owner already recorded at that exact prefix.
    pub(crate) fn insert(&mut self, network: u32, prefix_len: u8, owner: u16) {
        let mut cur = ROOT;
        for i in 0..u32::from(prefix_len.min(32)) {
            let bit = ((network >> (31 - i)) & 1) as usize;
            let next = match self.nodes[cur].children[bit] {
                Some(child) => child,
                None => {
                    let child = self.alloc();
                    self.nodes[cur].children[bit] = Some(child);
                    child
                }
            };
            cur = next.get() as usize;
        }
        self.nodes[cur].owner = owner;
    }

    /// Look up a dotted-decimal address, returning the owner name or `""`.
    ///
    /// Input that is not a valid IPv4 address is a miss, not an error.
    pub fn lookup(&self, addr: &str) -> &str {
        match parse_ipv4(addr) {
            Some(ip) => self.lookup_u32(ip),
            None => "",
        }
    }

    /// Look up an address given as an [`Ipv4Addr`].
    pub fn lookup_ip(&self, addr: Ipv4Addr) -> &str {
        self.lookup_u32(u32::from(addr))
    }

    /// Look up a big-endian `u32` address.
    pub fn lookup_u32(&self, ip: u32) -> &str {
        self.owner_name(self.lookup_index(ip))
    }

    /// Longest-prefix match returning the owner table index.
    pub fn lookup_index(&self, ip: u32) -> u16 {
        let nodes = self.nodes.as_slice();
        let mut cur = ROOT;
        let mut best = nodes[cur].owner;

        for i in (0..32).rev() {
            let bit = ((ip >> i) & 1) as usize;
            let Some(child) = nodes[cur].children[bit] else {
                break;
            };
            cur = child.get() as usize;
            if nodes[cur].owner != NO_OWNER {
                best = nodes[cur].owner;
            }
        }
        best
    }

    /// Owner name for a table index; `""` for `NO_OWNER` or unknown indices.
    pub fn owner_name(&self, idx: u16) -> &str {
        self.owners.get(usize::from(idx)).map_or("", String::as_str)
    }

    /// Table index of an owner name.
    pub fn owner_index(&self, name: &str) -> Option<u16> {
        self.owner_index.get(name).copied()
    }

    /// Full owner table, including the empty sentinel at index 0.
    pub fn owners(&self) -> &[String] {
        &self.owners
    }

    /// Number of real owners (excluding the sentinel).
    pub fn owner_count(&self) -> usize {
        self.owners.len().saturating_sub(1)
    }

    /// Number of nodes in the arena, including the root.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Warnings collected during [`Trie::build`]. Always empty after decode.
    pub fn warnings(&self) -> &[BuildWarning] {
        &self.warnings
    }
}

impl Default for Trie {
    fn default() -> Self {
        Self::new()
    }
}
