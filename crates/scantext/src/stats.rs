//! Running statistics over all processing attempts.
//!
//! A single JSON snapshot file, updated by a locked read-modify-write so two
//! flows in the same process cannot lose each other's increments. Every
//! attempt is counted, including validation rejections: the pipeline, not
//! the caller's UI, is the attempt boundary.

use crate::error::{PipelineError, Result};
use crate::types::StatsSnapshot;
use chrono::Local;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// File-backed stats aggregator.
pub struct StatsStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl StatsStore {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .map_err(|e| PipelineError::storage_with_source("failed to create stats directory", e))?;
        }
        Ok(Self {
            path,
            write_lock: Mutex::new(()),
        })
    }

    /// Record one attempt and return the updated snapshot.
    ///
    /// Increments `total_processed`, exactly one of `total_success` /
    /// `total_failed`, adds the attempt's byte size, and stamps
    /// `last_processed`.
    pub fn record(&self, success: bool, byte_size: u64) -> Result<StatsSnapshot> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|e| PipelineError::LockPoisoned(format!("stats mutex poisoned: {}", e)))?;

        let mut snapshot = self.load_unlocked()?;
        snapshot.total_processed += 1;
        if success {
            snapshot.total_success += 1;
        } else {
            snapshot.total_failed += 1;
        }
        snapshot.total_size += byte_size;
        snapshot.last_processed = Some(Local::now().format("%Y-%m-%d %H:%M:%S").to_string());

        let json = serde_json::to_vec_pretty(&snapshot)?;
        fs::write(&self.path, json)
            .map_err(|e| PipelineError::storage_with_source("failed to write stats file", e))?;
        Ok(snapshot)
    }

    /// Read the current snapshot; zeroed counters if none exists yet.
    pub fn load(&self) -> Result<StatsSnapshot> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|e| PipelineError::LockPoisoned(format!("stats mutex poisoned: {}", e)))?;
        self.load_unlocked()
    }

    fn load_unlocked(&self) -> Result<StatsSnapshot> {
        if !self.path.exists() {
            return Ok(StatsSnapshot::default());
        }
        let content = fs::read(&self.path)
            .map_err(|e| PipelineError::storage_with_source("failed to read stats file", e))?;
        let snapshot = serde_json::from_slice(&content)?;
        Ok(snapshot)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_load_without_file_is_zeroed() {
        let dir = tempdir().unwrap();
        let stats = StatsStore::new(dir.path().join("stats.json")).unwrap();
        assert_eq!(stats.load().unwrap(), StatsSnapshot::default());
    }

    #[test]
    fn test_counters_sum_up() {
        let dir = tempdir().unwrap();
        let stats = StatsStore::new(dir.path().join("stats.json")).unwrap();

        for i in 0..7u64 {
            stats.record(i % 2 == 0, 100).unwrap();
        }

        let snapshot = stats.load().unwrap();
        assert_eq!(snapshot.total_processed, 7);
        assert_eq!(snapshot.total_success, 4);
        assert_eq!(snapshot.total_failed, 3);
        assert_eq!(snapshot.total_size, 700);
        assert!(snapshot.last_processed.is_some());
    }

    #[test]
    fn test_record_persists_across_instances() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("stats.json");

        StatsStore::new(&path).unwrap().record(true, 42).unwrap();
        let snapshot = StatsStore::new(&path).unwrap().load().unwrap();
        assert_eq!(snapshot.total_processed, 1);
        assert_eq!(snapshot.total_size, 42);
    }

    #[test]
    fn test_timestamp_format() {
        let dir = tempdir().unwrap();
        let stats = StatsStore::new(dir.path().join("stats.json")).unwrap();
        let snapshot = stats.record(true, 1).unwrap();
        let stamp = snapshot.last_processed.unwrap();
        // YYYY-mm-dd HH:MM:SS
        assert_eq!(stamp.len(), 19);
        assert_eq!(&stamp[4..5], "-");
        assert_eq!(&stamp[10..11], " ");
    }
}
