//! Trie artifact writer.

use std::fs;
use std::io::Write;
use std::path::Path;

use super::format::*;
use crate::trie::Trie;
use crate::Result;

impl Trie {
    /// Encode the trie into its binary artifact form.
    ///
    /// The output is exactly `16 + Σ(2 + name_len) + 12 * node_count` bytes.
    pub fn encode(&self) -> Vec<u8> {
        let owners = self.owners.iter().map(String::as_str);
        let mut buffer = Vec::with_capacity(encoded_len(owners, self.nodes.len()));

        // Build guarantees both counts fit, so these conversions never truncate.
        let header = TrieHeader::new(self.nodes.len() as u32, self.owners.len() as u16);
        buffer.extend_from_slice(&header.to_bytes());

        for name in &self.owners {
            buffer.extend_from_slice(&(name.len() as u16).to_le_bytes());
            buffer.extend_from_slice(name.as_bytes());
        }

        for node in &self.nodes {
            let record = NodeRecord {
                child0: node.children[0].map_or(0, |c| c.get()),
                child1: node.children[1].map_or(0, |c| c.get()),
                owner: node.owner,
                _padding: [0; 2],
            };
            buffer.extend_from_slice(&record.to_bytes());
        }

        buffer
    }

    /// Write the encoded artifact to `writer`.
    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<()> {
        writer.write_all(&self.encode())?;
        writer.flush()?;
        Ok(())
    }

    /// Save the encoded artifact to `path`.
    ///
    /// Writes to a sibling temporary file first and renames it into place,
    /// so readers never observe a partially written artifact.
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut temp_name = path.as_os_str().to_owned();
        temp_name.push(".tmp");
        let temp_path = Path::new(&temp_name);

        let mut file = fs::File::create(temp_path)?;
        file.write_all(&self.encode())?;
        file.sync_all()?;
        drop(file);

        fs::rename(temp_path, path)?;
        Ok(())
    }
}
