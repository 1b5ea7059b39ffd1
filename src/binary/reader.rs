//! Trie artifact reader with memory-mapping support.

use ahash::AHashMap;
use memmap2::Mmap;
use std::fs::File;
use std::num::NonZeroU32;
use std::path::Path;

use super::format::*;
use crate::error::Section;
use crate::trie::{Node, Trie};
use crate::{Error, Result};

impl Trie {
    /// Decode a trie from an artifact produced by [`Trie::encode`].
    ///
    /// Every child and owner reference is bounds-checked, so a decoded trie
    /// can be queried without risk of panicking on corrupt input.
    pub fn decode(data: &[u8]) -> Result<Self> {
        let header = TrieHeader::parse(data)?;
        let mut pos = HEADER_SIZE;

        let owner_count = usize::from(header.owner_count);
        if owner_count == 0 {
            return Err(Error::EmptyOwnerTable);
        }

        let mut owners = Vec::with_capacity(owner_count);
        let mut owner_index = AHashMap::with_capacity(owner_count);
        for i in 0..header.owner_count {
            let len_bytes = data
                .get(pos..pos + NAME_LEN_SIZE)
                .ok_or(Error::Truncated(Section::OwnerNameLength))?;
            let name_len = usize::from(read_u16(len_bytes, 0));
            pos += NAME_LEN_SIZE;

            let name_bytes = data
                .get(pos..pos + name_len)
                .ok_or(Error::Truncated(Section::OwnerName))?;
            let name = std::str::from_utf8(name_bytes)
                .map_err(|_| Error::InvalidOwnerName(i))?
                .to_string();
            pos += name_len;

            if !name.is_empty() {
                owner_index.insert(name.clone(), i);
            }
            owners.push(name);
        }

        let node_count = header.node_count as usize;
        if node_count == 0 {
            return Err(Error::MissingRoot);
        }
        let node_bytes = node_count
            .checked_mul(NODE_RECORD_SIZE)
            .and_then(|len| data.get(pos..pos.checked_add(len)?))
            .ok_or(Error::Truncated(Section::NodeArray))?;

        let mut nodes = Vec::with_capacity(node_count);
        for (i, chunk) in node_bytes.chunks_exact(NODE_RECORD_SIZE).enumerate() {
            let mut raw = [0u8; NODE_RECORD_SIZE];
            raw.copy_from_slice(chunk);
            let record = NodeRecord::from_bytes(&raw);
            let node_id = i as u32;

            for child in [record.child0, record.child1] {
                if child as usize >= node_count {
                    return Err(Error::DanglingChild {
                        node: node_id,
                        child,
                    });
                }
            }
            if usize::from(record.owner) >= owner_count {
                return Err(Error::UnknownOwner {
                    node: node_id,
                    owner: record.owner,
                });
            }

            nodes.push(Node {
                children: [NonZeroU32::new(record.child0), NonZeroU32::new(record.child1)],
                owner: record.owner,
            });
        }

        Ok(Self {
            nodes,
            owners,
            owner_index,
            warnings: Vec::new(),
        })
    }

    /// Open an artifact file and decode it.
    ///
    /// The file is memory-mapped for the duration of the decode.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        // The mapping is only read while decoding and dropped before return.
        let mmap = unsafe { Mmap::map(&file)? };
        Self::decode(&mmap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_missing_file() {
        let result = Trie::open(Path::new("/nonexistent/ip2cloud.bin"));
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[test]
    fn test_decode_rejects_empty_buffer() {
        assert!(matches!(
            Trie::decode(&[]),
            Err(Error::Truncated(Section::Header))
        ));
    }
}
