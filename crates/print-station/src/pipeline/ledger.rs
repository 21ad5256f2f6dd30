//! Durable per-team page accounting.
//!
//! The ledger is a single JSON object on disk, re-read on every operation
//! and rewritten as a whole on every mutation. Writes go to a temporary
//! sibling first and are renamed over the live file, so readers observe
//! either the old or the new complete state, never a torn one. All
//! mutations serialize on one mutex held across load + mutate + persist.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// File-backed mapping of team name to pages consumed.
#[derive(Debug)]
pub struct QuotaLedger {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl QuotaLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Pages consumed by `team`; 0 when the team has never printed.
    pub fn get(&self, team: &str) -> Result<u32, LedgerError> {
        Ok(self.load()?.get(team).copied().unwrap_or(0))
    }

    /// Pure read: would charging `pages` push `team` past `max_pages`?
    pub fn would_exceed(&self, team: &str, pages: u32, max_pages: u32) -> Result<bool, LedgerError> {
        Ok(self.get(team)? + pages > max_pages)
    }

    /// Atomically add `pages` to `team` and persist; returns the new total.
    pub fn commit(&self, team: &str, pages: u32) -> Result<u32, LedgerError> {
        let _guard = self.write_lock.lock().expect("ledger mutex poisoned");
        let mut entries = self.load()?;
        let total = entries.entry(team.to_string()).or_insert(0);
        *total += pages;
        let total = *total;
        self.persist(&entries)?;
        Ok(total)
    }

    /// Remove `team` from the ledger entirely (reads as 0 afterwards).
    pub fn reset(&self, team: &str) -> Result<(), LedgerError> {
        let _guard = self.write_lock.lock().expect("ledger mutex poisoned");
        let mut entries = self.load()?;
        if entries.remove(team).is_some() {
            self.persist(&entries)?;
        }
        Ok(())
    }

    /// Full mapping for the quota status surface.
    pub fn snapshot(&self) -> Result<BTreeMap<String, u32>, LedgerError> {
        self.load()
    }

    fn load(&self) -> Result<BTreeMap<String, u32>, LedgerError> {
        match fs::read(&self.path) {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(LedgerError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(err) => Err(LedgerError::Io(err)),
        }
    }

    fn persist(&self, entries: &BTreeMap<String, u32>) -> Result<(), LedgerError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(LedgerError::Io)?;
            }
        }

        let bytes = serde_json::to_vec_pretty(entries).map_err(LedgerError::Parse)?;
        let temp_path = self.temp_path();
        fs::write(&temp_path, bytes).map_err(LedgerError::Io)?;
        fs::rename(&temp_path, &self.path).map_err(LedgerError::Io)?;
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = OsString::from(self.path.as_os_str());
        name.push(".tmp");
        PathBuf::from(name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("quota ledger io failure: {0}")]
    Io(#[source] std::io::Error),
    #[error("quota ledger is not valid JSON: {0}")]
    Parse(#[source] serde_json::Error),
}
