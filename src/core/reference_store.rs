//! Reference (golden fingerprint) storage
//!
//! Every `*.json` file in the reference directory is a reference record. Only
//! one of them is active per run, picked by the configured [`SelectionRule`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::SystemTime;
use tempfile::NamedTempFile;
use tracing::{debug, info, instrument, warn};

use crate::core::fingerprint::Fingerprint;
use crate::error::{FingerprintError, Result};

/// File extension that marks a reference record.
pub const RECORD_EXTENSION: &str = "json";

/// How the active reference is chosen when several records exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionRule {
    /// Lexicographically greatest file name. Only tracks recency when names
    /// embed a sortable timestamp.
    #[default]
    NameOrder,
    /// Most recently modified record; equal times fall back to name order.
    ModifiedTime,
}

impl fmt::Display for SelectionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NameOrder => f.write_str("name_order"),
            Self::ModifiedTime => f.write_str("modified_time"),
        }
    }
}

impl FromStr for SelectionRule {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "name_order" | "name" => Ok(Self::NameOrder),
            "modified_time" | "mtime" | "modified" => Ok(Self::ModifiedTime),
            other => Err(format!(
                "unknown selection rule '{other}' (expected name_order or modified_time)"
            )),
        }
    }
}

/// Reference records under a single directory.
#[derive(Debug, Clone)]
pub struct ReferenceStore {
    dir: PathBuf,
    selection: SelectionRule,
}

impl ReferenceStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            selection: SelectionRule::default(),
        }
    }

    pub fn with_selection(mut self, selection: SelectionRule) -> Self {
        self.selection = selection;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn selection(&self) -> SelectionRule {
        self.selection
    }

    /// Names of all reference records, sorted ascending.
    ///
    /// A missing directory has no records.
    pub fn record_names(&self) -> Result<Vec<String>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(FingerprintError::io(&self.dir, err)),
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|err| FingerprintError::io(&self.dir, err))?;
            let path = entry.path();
            let is_file = entry
                .file_type()
                .map_err(|err| FingerprintError::io(&path, err))?
                .is_file();
            if !is_file || !is_record_path(&path) {
                continue;
            }
            match entry.file_name().into_string() {
                Ok(name) => names.push(name),
                Err(raw) => warn!(name = ?raw, "Skipping reference record with non UTF-8 name"),
            }
        }

        names.sort();
        Ok(names)
    }

    /// Name of the active reference record, if any.
    pub fn latest_name(&self) -> Result<Option<String>> {
        let names = self.record_names()?;

        match self.selection {
            SelectionRule::NameOrder => Ok(names.into_iter().next_back()),
            SelectionRule::ModifiedTime => {
                let mut newest: Option<(SystemTime, String)> = None;
                for name in names {
                    let path = self.dir.join(&name);
                    let modified = fs::metadata(&path)
                        .and_then(|meta| meta.modified())
                        .map_err(|err| FingerprintError::io(&path, err))?;
                    // names arrive sorted, so `>=` lets the greater name win a tie
                    if newest.as_ref().map_or(true, |(time, _)| modified >= *time) {
                        newest = Some((modified, name));
                    }
                }
                Ok(newest.map(|(_, name)| name))
            }
        }
    }

    /// Load the active reference.
    ///
    /// # Returns
    /// `None` when no records exist, `ReferenceCorrupt` when the selected
    /// record cannot be decoded
    #[instrument(skip(self), fields(dir = %self.dir.display(), selection = %self.selection))]
    pub fn load_latest(&self) -> Result<Option<Fingerprint>> {
        let Some(name) = self.latest_name()? else {
            debug!("No reference records found");
            return Ok(None);
        };

        info!(record = %name, "Loading active reference");
        self.load(&name).map(Some)
    }

    /// Load a specific record by file name.
    pub fn load(&self, name: &str) -> Result<Fingerprint> {
        let path = self.record_path(name)?;
        let json = fs::read_to_string(&path).map_err(|err| FingerprintError::io(&path, err))?;
        Fingerprint::from_json(&json)
            .map_err(|source| FingerprintError::ReferenceCorrupt { path, source })
    }

    /// Write `fingerprint` as the record `name`, replacing any record of the
    /// same name.
    ///
    /// The record is written to a temporary sibling and persisted over the
    /// target, so a failed write leaves the previous record intact. The
    /// temporary file is removed when the write fails.
    ///
    /// # Returns
    /// The path of the written record
    #[instrument(skip(self, fingerprint), fields(dir = %self.dir.display()))]
    pub fn save(&self, fingerprint: &Fingerprint, name: &str) -> Result<PathBuf> {
        let path = self.record_path(name)?;
        let json = fingerprint.to_json()?;

        fs::create_dir_all(&self.dir).map_err(|err| FingerprintError::io(&self.dir, err))?;

        let mut staging =
            NamedTempFile::new_in(&self.dir).map_err(|err| FingerprintError::io(&self.dir, err))?;
        staging
            .write_all(json.as_bytes())
            .and_then(|()| staging.as_file().sync_all())
            .map_err(|err| FingerprintError::io(staging.path(), err))?;
        staging
            .persist(&path)
            .map_err(|err| FingerprintError::io(&path, err.error))?;

        info!(record = %path.display(), "Reference saved");
        Ok(path)
    }

    /// Remove every reference record.
    ///
    /// # Returns
    /// Number of records removed; `0` for an empty or missing directory
    #[instrument(skip(self), fields(dir = %self.dir.display()))]
    pub fn delete_all(&self) -> Result<usize> {
        let names = self.record_names()?;

        for name in &names {
            let path = self.dir.join(name);
            fs::remove_file(&path).map_err(|err| FingerprintError::io(&path, err))?;
            debug!(record = %name, "Reference deleted");
        }

        info!(count = names.len(), "All references deleted");
        Ok(names.len())
    }

    fn record_path(&self, name: &str) -> Result<PathBuf> {
        let candidate = Path::new(name);
        let is_plain_name = candidate.file_name().and_then(|n| n.to_str()) == Some(name);
        if !is_plain_name || !is_record_path(candidate) {
            return Err(FingerprintError::InvalidReferenceName(name.to_string()));
        }
        Ok(self.dir.join(name))
    }
}

fn is_record_path(path: &Path) -> bool {
    path.extension().and_then(|ext| ext.to_str()) == Some(RECORD_EXTENSION)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fingerprint::Barcode;
    use tempfile::TempDir;

    fn fingerprint(line: &str) -> Fingerprint {
        Fingerprint::new(vec![line.to_string()], vec![Barcode::new("CODE", (1, 2))])
    }

    #[test]
    fn test_missing_directory_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let store = ReferenceStore::new(temp_dir.path().join("absent"));

        assert!(store.load_latest().unwrap().is_none());
        assert_eq!(store.delete_all().unwrap(), 0);
    }

    #[test]
    fn test_save_creates_directory_and_round_trips() {
        let temp_dir = TempDir::new().unwrap();
        let store = ReferenceStore::new(temp_dir.path().join("references"));

        let path = store.save(&fingerprint("golden"), "reference.json").unwrap();
        assert!(path.exists());
        assert_eq!(store.load_latest().unwrap(), Some(fingerprint("golden")));
    }

    #[test]
    fn test_save_overwrites_same_name() {
        let temp_dir = TempDir::new().unwrap();
        let store = ReferenceStore::new(temp_dir.path());

        store.save(&fingerprint("first"), "reference.json").unwrap();
        store.save(&fingerprint("second"), "reference.json").unwrap();

        assert_eq!(store.record_names().unwrap(), ["reference.json"]);
        assert_eq!(store.load("reference.json").unwrap(), fingerprint("second"));
    }

    #[test]
    fn test_name_order_selects_greatest_name() {
        let temp_dir = TempDir::new().unwrap();
        let store = ReferenceStore::new(temp_dir.path());

        store.save(&fingerprint("2024"), "2024.json").unwrap();
        store.save(&fingerprint("2023"), "2023.json").unwrap();

        assert_eq!(store.latest_name().unwrap().as_deref(), Some("2024.json"));
        assert_eq!(store.load_latest().unwrap(), Some(fingerprint("2024")));
    }

    #[test]
    fn test_non_record_files_are_ignored() {
        let temp_dir = TempDir::new().unwrap();
        let store = ReferenceStore::new(temp_dir.path());

        store.save(&fingerprint("real"), "a.json").unwrap();
        fs::write(temp_dir.path().join("zzz.txt"), "not a record").unwrap();
        fs::create_dir(temp_dir.path().join("zzz.json")).unwrap();

        assert_eq!(store.record_names().unwrap(), ["a.json"]);
        assert_eq!(store.delete_all().unwrap(), 1);
        assert!(temp_dir.path().join("zzz.txt").exists());
    }

    #[test]
    fn test_corrupt_selected_record() {
        let temp_dir = TempDir::new().unwrap();
        let store = ReferenceStore::new(temp_dir.path());

        store.save(&fingerprint("ok"), "a.json").unwrap();
        fs::write(temp_dir.path().join("b.json"), "{ not json").unwrap();

        let err = store.load_latest().unwrap_err();
        assert!(matches!(err, FingerprintError::ReferenceCorrupt { .. }));
    }

    #[test]
    fn test_delete_all_counts_records() {
        let temp_dir = TempDir::new().unwrap();
        let store = ReferenceStore::new(temp_dir.path());

        store.save(&fingerprint("a"), "a.json").unwrap();
        store.save(&fingerprint("b"), "b.json").unwrap();

        assert_eq!(store.delete_all().unwrap(), 2);
        assert!(store.load_latest().unwrap().is_none());
        assert_eq!(store.delete_all().unwrap(), 0);
    }

    #[test]
    fn test_failed_save_leaves_no_staging_file() {
        let temp_dir = TempDir::new().unwrap();
        let store = ReferenceStore::new(temp_dir.path());
        // A directory in the record's place makes the final rename fail
        fs::create_dir(temp_dir.path().join("reference.json")).unwrap();

        let err = store.save(&fingerprint("x"), "reference.json").unwrap_err();
        assert!(matches!(err, FingerprintError::Io { .. }));

        let entries: Vec<_> = fs::read_dir(temp_dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(entries, ["reference.json"]);
        assert!(temp_dir.path().join("reference.json").is_dir());
    }

    #[test]
    fn test_rejects_unsafe_names() {
        let temp_dir = TempDir::new().unwrap();
        let store = ReferenceStore::new(temp_dir.path());

        for name in ["../escape.json", "nested/ref.json", "reference.txt", ""] {
            let err = store.save(&fingerprint("x"), name).unwrap_err();
            assert!(
                matches!(err, FingerprintError::InvalidReferenceName(_)),
                "{name:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_modified_time_selection() {
        let temp_dir = TempDir::new().unwrap();
        let store = ReferenceStore::new(temp_dir.path()).with_selection(SelectionRule::ModifiedTime);

        store.save(&fingerprint("newer"), "a.json").unwrap();
        store.save(&fingerprint("older"), "b.json").unwrap();

        let old = SystemTime::UNIX_EPOCH + std::time::Duration::from_secs(1_000_000);
        fs::File::options()
            .write(true)
            .open(temp_dir.path().join("b.json"))
            .unwrap()
            .set_modified(old)
            .unwrap();

        assert_eq!(store.latest_name().unwrap().as_deref(), Some("a.json"));
    }

    #[test]
    fn test_selection_rule_parsing() {
        assert_eq!("name_order".parse(), Ok(SelectionRule::NameOrder));
        assert_eq!("modified-time".parse(), Ok(SelectionRule::ModifiedTime));
        assert!("newest".parse::<SelectionRule>().is_err());
    }
}
