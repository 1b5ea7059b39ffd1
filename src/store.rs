//! On-disk provider data and compiled artifact.
//!
//! A store is a base directory holding one text file per provider under
//! `data/` and the compiled trie artifact next to it:
//!
//! ```text
//! <base>/
//!   data/
//!     aws.txt        one CIDR per line
//!     gcp.txt
//!   ip2cloud.bin     compiled trie
//! ```
//!
//! The text files are authoritative; the artifact is always rebuilt from
//! them in full.

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::trie::Trie;
use crate::{Error, Result};

/// Environment variable overriding the base directory.
pub const HOME_ENV: &str = "IP2CLOUD_HOME";

/// Directory name under the user configuration directory.
const APP_DIR: &str = "ip2cloud";

/// Extension of provider data files.
const DATA_EXT: &str = "txt";

/// File name of the compiled artifact.
const ARTIFACT_NAME: &str = "ip2cloud.bin";

/// Provider summary returned by [`Store::list_providers`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderInfo {
    pub name: String,
    pub range_count: usize,
}

/// Provider data directory and artifact location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Store {
    /// Directory of `<provider>.txt` files
    pub data_dir: PathBuf,
    /// Path of the compiled artifact
    pub bin_path: PathBuf,
}

impl Store {
    /// Create a store rooted at `base`.
    pub fn new(base: impl AsRef<Path>) -> Self {
        let base = base.as_ref();
        Self {
            data_dir: base.join("data"),
            bin_path: base.join(ARTIFACT_NAME),
        }
    }

    /// Create a store at the default location.
    pub fn open_default() -> Result<Self> {
        Ok(Self::new(Self::default_base_dir()?))
    }

    /// Resolve the default base directory.
    ///
    /// Uses `IP2CLOUD_HOME` when set, otherwise `ip2cloud` under the
    /// platform's user configuration directory.
    pub fn default_base_dir() -> Result<PathBuf> {
        if let Some(home) = env::var_os(HOME_ENV).filter(|v| !v.is_empty()) {
            return Ok(PathBuf::from(home));
        }
        user_config_dir()
            .map(|dir| dir.join(APP_DIR))
            .ok_or_else(|| Error::Config("cannot determine user config directory".to_string()))
    }

    /// Create the data directory if needed.
    pub fn init(&self) -> Result<()> {
        fs::create_dir_all(&self.data_dir)?;
        Ok(())
    }

    fn provider_path(&self, provider: &str) -> Result<PathBuf> {
        validate_provider_name(provider)?;
        Ok(self.data_dir.join(format!("{}.{}", provider, DATA_EXT)))
    }

    /// Check whether a provider has a data file.
    pub fn provider_exists(&self, provider: &str) -> bool {
        self.provider_path(provider)
            .map(|path| path.is_file())
            .unwrap_or(false)
    }

    /// Read the CIDR lines of one provider.
    pub fn read_provider_ranges(&self, provider: &str) -> Result<Vec<String>> {
        let path = self.provider_path(provider)?;
        if !path.is_file() {
            return Err(Error::ProviderNotFound(provider.to_string()));
        }
        read_lines(&path)
    }

    /// Append CIDRs to a provider, creating its file if needed.
    pub fn add_ranges<S: AsRef<str>>(&self, provider: &str, cidrs: &[S]) -> Result<()> {
        let path = self.provider_path(provider)?;
        self.init()?;
        let file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)?;
        write_lines(file, cidrs)?;
        log::debug!("appended {} ranges to {:?}", cidrs.len(), path);
        Ok(())
    }

    /// Replace a provider's CIDRs.
    pub fn overwrite_ranges<S: AsRef<str>>(&self, provider: &str, cidrs: &[S]) -> Result<()> {
        let path = self.provider_path(provider)?;
        self.init()?;
        let file = fs::File::create(&path)?;
        write_lines(file, cidrs)?;
        log::debug!("wrote {} ranges to {:?}", cidrs.len(), path);
        Ok(())
    }

    /// Delete a provider's data file.
    pub fn remove_provider(&self, provider: &str) -> Result<()> {
        let path = self.provider_path(provider)?;
        match fs::remove_file(&path) {
            Ok(()) => {
                log::debug!("removed {:?}", path);
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(Error::ProviderNotFound(provider.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// List providers with their range counts, sorted by name.
    ///
    /// A missing data directory yields an empty list. Unreadable files are
    /// skipped.
    pub fn list_providers(&self) -> Result<Vec<ProviderInfo>> {
        let mut providers = Vec::new();
        for (name, path) in self.data_files()? {
            match read_lines(&path) {
                Ok(ranges) => providers.push(ProviderInfo {
                    name,
                    range_count: ranges.len(),
                }),
                Err(e) => log::warn!("skipping {:?}: {}", path, e),
            }
        }
        providers.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(providers)
    }

    /// Load every provider's CIDR lines.
    pub fn read_all(&self) -> Result<BTreeMap<String, Vec<String>>> {
        let mut data = BTreeMap::new();
        for (name, path) in self.data_files()? {
            let ranges = read_lines(&path)?;
            data.insert(name, ranges);
        }
        Ok(data)
    }

    /// Rebuild the trie from the data directory and save the artifact.
    pub fn build(&self) -> Result<Trie> {
        if !self.data_dir.is_dir() {
            return Err(Error::Config(format!(
                "data directory {:?} does not exist",
                self.data_dir
            )));
        }
        let data = self.read_all()?;
        let trie = Trie::build(&data);

        if let Some(parent) = self.bin_path.parent() {
            fs::create_dir_all(parent)?;
        }
        trie.save(&self.bin_path)?;

        log::info!(
            "Built trie: {} providers, {} nodes, {} warnings -> {:?}",
            trie.owner_count(),
            trie.node_count(),
            trie.warnings().len(),
            self.bin_path
        );
        Ok(trie)
    }

    /// Load the compiled artifact.
    pub fn load_trie(&self) -> Result<Trie> {
        let trie = Trie::open(&self.bin_path)?;
        log::debug!(
            "Loaded trie from {:?}: {} providers, {} nodes",
            self.bin_path,
            trie.owner_count(),
            trie.node_count()
        );
        Ok(trie)
    }

    /// Load the artifact, rebuilding it when missing or unreadable.
    ///
    /// Before rebuilding, `seed_dir` (if given) is copied into the data
    /// directory without replacing existing provider files.
    pub fn load_or_build(&self, seed_dir: Option<&Path>) -> Result<Trie> {
        match self.load_trie() {
            Ok(trie) => return Ok(trie),
            Err(Error::Io(e)) if e.kind() == io::ErrorKind::NotFound => {
                log::info!("No compiled trie at {:?}, building", self.bin_path);
            }
            Err(e) => {
                log::warn!("Failed to load {:?}, rebuilding: {}", self.bin_path, e);
            }
        }
        self.init()?;
        if let Some(dir) = seed_dir {
            self.seed_from_dir(dir, false)?;
        }
        self.build()
    }

    /// Copy every `*.txt` file from `dir` into the data directory.
    ///
    /// Returns the number of files copied.
    pub fn seed_from_dir(&self, dir: &Path, overwrite: bool) -> Result<usize> {
        self.init()?;
        let mut copied = 0;
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if !entry.file_type()?.is_file() || !has_data_ext(&path) {
                continue;
            }
            let dst = self.data_dir.join(entry.file_name());
            if !overwrite && dst.exists() {
                continue;
            }
            fs::copy(&path, &dst)?;
            copied += 1;
        }
        log::info!("Seeded {} provider files from {:?}", copied, dir);
        Ok(copied)
    }

    /// Provider data files as `(name, path)`; empty if the directory is missing.
    fn data_files(&self) -> Result<Vec<(String, PathBuf)>> {
        let entries = match fs::read_dir(&self.data_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry?;
            let path = entry.path();
            if !entry.file_type()?.is_file() || !has_data_ext(&path) {
                continue;
            }
            if let Some(name) = path.file_stem().and_then(|s| s.to_str()) {
                files.push((name.to_string(), path.clone()));
            }
        }
        Ok(files)
    }
}

/// Check that a provider name is usable as a data file stem.
pub fn validate_provider_name(name: &str) -> Result<()> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.trim() != name
        || name.contains(['/', '\\', '\0']);
    if invalid {
        return Err(Error::InvalidProviderName(name.to_string()));
    }
    Ok(())
}

/// Read trimmed, non-blank, non-comment lines.
fn read_lines(path: &Path) -> Result<Vec<String>> {
    let reader = BufReader::new(fs::File::open(path)?);
    let mut lines = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        lines.push(line.to_string());
    }
    Ok(lines)
}

fn write_lines<S: AsRef<str>>(file: fs::File, lines: &[S]) -> Result<()> {
    let mut writer = BufWriter::new(file);
    for line in lines {
        writer.write_all(line.as_ref().as_bytes())?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

fn has_data_ext(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some(DATA_EXT)
}

fn user_config_dir() -> Option<PathBuf> {
    let non_empty = |key: &str| env::var_os(key).filter(|v| !v.is_empty()).map(PathBuf::from);

    if cfg!(windows) {
        non_empty("APPDATA")
    } else if cfg!(target_os = "macos") {
        non_empty("HOME").map(|home| home.join("Library").join("Application Support"))
    } else {
        non_empty("XDG_CONFIG_HOME").or_else(|| non_empty("HOME").map(|home| home.join(".config")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_store() -> (TempDir, Store) {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path());
        (dir, store)
    }

    #[test]
    fn test_layout() {
        let store = Store::new("/base");
        assert_eq!(store.data_dir, PathBuf::from("/base/data"));
        assert_eq!(store.bin_path, PathBuf::from("/base/ip2cloud.bin"));
    }

    #[test]
    fn test_add_and_read() {
        let (_dir, store) = temp_store();
        store.add_ranges("aws", &["3.0.0.0/8"]).unwrap();
        store.add_ranges("aws", &["52.0.0.0/8", "54.0.0.0/8"]).unwrap();

        assert!(store.provider_exists("aws"));
        assert!(!store.provider_exists("gcp"));
        assert_eq!(
            store.read_provider_ranges("aws").unwrap(),
            vec!["3.0.0.0/8", "52.0.0.0/8", "54.0.0.0/8"]
        );
    }

    #[test]
    fn test_overwrite() {
        let (_dir, store) = temp_store();
        store.add_ranges("gcp", &["34.0.0.0/8", "35.0.0.0/8"]).unwrap();
        store.overwrite_ranges("gcp", &["8.8.8.0/24"]).unwrap();

        assert_eq!(store.read_provider_ranges("gcp").unwrap(), vec!["8.8.8.0/24"]);
    }

    #[test]
    fn test_read_skips_blank_and_comments() {
        let (_dir, store) = temp_store();
        store.init().unwrap();
        fs::write(
            store.data_dir.join("do.txt"),
            "# DigitalOcean\n\n  104.131.0.0/16  \n\t\n159.65.0.0/16\n",
        )
        .unwrap();

        assert_eq!(
            store.read_provider_ranges("do").unwrap(),
            vec!["104.131.0.0/16", "159.65.0.0/16"]
        );
    }

    #[test]
    fn test_remove() {
        let (_dir, store) = temp_store();
        store.add_ranges("tmp", &["10.0.0.0/8"]).unwrap();
        store.remove_provider("tmp").unwrap();

        assert!(!store.provider_exists("tmp"));
        assert!(matches!(
            store.remove_provider("tmp"),
            Err(Error::ProviderNotFound(_))
        ));
    }

    #[test]
    fn test_invalid_names() {
        let (_dir, store) = temp_store();
        for name in ["", ".", "..", "a/b", "..\\x", " aws"] {
            assert!(
                matches!(
                    store.add_ranges(name, &["10.0.0.0/8"]),
                    Err(Error::InvalidProviderName(_))
                ),
                "{:?} accepted",
                name
            );
        }
        assert!(validate_provider_name("my-cloud_2").is_ok());
    }

    #[test]
    fn test_list_providers() {
        let (_dir, store) = temp_store();
        assert!(store.list_providers().unwrap().is_empty());

        store.add_ranges("gcp", &["34.0.0.0/8"]).unwrap();
        store.add_ranges("aws", &["3.0.0.0/8", "52.0.0.0/8"]).unwrap();
        fs::write(store.data_dir.join("notes.md"), "ignored").unwrap();

        assert_eq!(
            store.list_providers().unwrap(),
            vec![
                ProviderInfo {
                    name: "aws".into(),
                    range_count: 2
                },
                ProviderInfo {
                    name: "gcp".into(),
                    range_count: 1
                },
            ]
        );
    }

    #[test]
    fn test_build_and_load() {
        let (_dir, store) = temp_store();
        store.add_ranges("aws", &["3.0.0.0/8", "bad"]).unwrap();
        store.add_ranges("gcp", &["34.0.0.0/8", "2600::/16"]).unwrap();

        let built = store.build().unwrap();
        assert_eq!(built.warnings().len(), 2);
        assert!(store.bin_path.is_file());

        let loaded = store.load_trie().unwrap();
        assert_eq!(loaded.lookup("3.3.3.3"), "aws");
        assert_eq!(loaded.lookup("34.1.1.1"), "gcp");
        assert_eq!(loaded.encode(), built.encode());
    }

    #[test]
    fn test_build_without_data_dir() {
        let (_dir, store) = temp_store();
        assert!(matches!(store.build(), Err(Error::Config(_))));
    }

    #[test]
    fn test_seed_from_dir() {
        let (_dir, store) = temp_store();
        let seed = tempfile::tempdir().unwrap();
        fs::write(seed.path().join("aws.txt"), "3.0.0.0/8\n").unwrap();
        fs::write(seed.path().join("gcp.txt"), "34.0.0.0/8\n").unwrap();
        fs::write(seed.path().join("README"), "not data").unwrap();

        store.add_ranges("aws", &["52.0.0.0/8"]).unwrap();
        assert_eq!(store.seed_from_dir(seed.path(), false).unwrap(), 1);
        assert_eq!(store.read_provider_ranges("aws").unwrap(), vec!["52.0.0.0/8"]);

        assert_eq!(store.seed_from_dir(seed.path(), true).unwrap(), 2);
        assert_eq!(store.read_provider_ranges("aws").unwrap(), vec!["3.0.0.0/8"]);
    }

    #[test]
    fn test_load_or_build() {
        let (_dir, store) = temp_store();
        let seed = tempfile::tempdir().unwrap();
        fs::write(seed.path().join("edge.txt"), "198.51.100.0/24\n").unwrap();

        let trie = store.load_or_build(Some(seed.path())).unwrap();
        assert_eq!(trie.lookup("198.51.100.1"), "edge");
        assert!(store.bin_path.is_file());

        // A corrupt artifact is rebuilt from the data directory.
        fs::write(&store.bin_path, b"garbage").unwrap();
        let trie = store.load_or_build(None).unwrap();
        assert_eq!(trie.lookup("198.51.100.1"), "edge");
        assert!(Trie::open(&store.bin_path).is_ok());
    }
}
