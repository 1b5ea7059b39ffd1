//! Lookup output formats.

use serde::Serialize;
use std::collections::BTreeMap;
use std::io::{self, Write};

use crate::pipeline::Match;
use crate::Result;

/// Buffer size for streamed plain-text output.
pub const OUTPUT_BUFFER_SIZE: usize = 256 * 1024;

/// Write one `[owner] : addr` line per match.
pub fn write_plain<W: Write>(writer: &mut W, matches: &[Match]) -> io::Result<()> {
    for m in matches {
        writeln!(writer, "[{}] : {}", m.owner, m.addr)?;
    }
    Ok(())
}

/// Matches grouped by owner, for structured output.
///
/// Addresses keep the order in which their batches were drained.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct GroupedReport {
    groups: BTreeMap<String, Vec<String>>,
}

impl GroupedReport {
    /// Create an empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a batch of matches.
    pub fn extend(&mut self, matches: Vec<Match>) {
        for Match { addr, owner } in matches {
            self.groups.entry(owner).or_default().push(addr);
        }
    }

    /// Addresses recorded for `owner`.
    pub fn addrs(&self, owner: &str) -> Option<&[String]> {
        self.groups.get(owner).map(Vec::as_slice)
    }

    /// Owner → addresses, sorted by owner.
    pub fn groups(&self) -> &BTreeMap<String, Vec<String>> {
        &self.groups
    }

    /// Total number of addresses across all owners.
    pub fn len(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }

    /// Whether no matches were recorded.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Write the report as a JSON object indented by four spaces, followed by
    /// a newline.
    pub fn write_json<W: Write>(&self, mut writer: W) -> Result<()> {
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut writer, formatter);
        self.serialize(&mut serializer)?;
        writer.write_all(b"\n")?;
        Ok(())
    }
}
