//! Append-only history of processed documents.
//!
//! Each record is a JSON file named by a timestamp-derived identifier plus a
//! random disambiguator, with an optional sibling media file (`.jpg` for
//! normalized rasters, `.pdf` stored verbatim) sharing the same identifier.
//! The disambiguator closes the same-second collision window that a plain
//! second-resolution id would leave open under concurrent appends.

use crate::error::{PipelineError, Result};
use crate::types::{DocumentKind, HistoryRecord};
use crate::{image, language_detection};
use chrono::Local;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Media to store alongside a history record.
#[derive(Debug, Clone, Copy)]
pub enum HistoryMedia<'a> {
    /// Raster bytes; stored as a normalized JPEG.
    Raster(&'a [u8]),
    /// PDF bytes; stored verbatim.
    Pdf(&'a [u8]),
}

impl<'a> HistoryMedia<'a> {
    /// Classify uploaded bytes into the right media form.
    pub fn from_bytes(bytes: &'a [u8]) -> Self {
        if DocumentKind::sniff(bytes).is_pdf() {
            HistoryMedia::Pdf(bytes)
        } else {
            HistoryMedia::Raster(bytes)
        }
    }
}

/// Input for one history append; the store assigns the identifier.
#[derive(Debug, Clone)]
pub struct NewHistoryRecord {
    pub text: String,
    /// Detected language code (`"en"` / `"ru"`).
    pub language_code: String,
    pub processing_time: String,
    pub translated_text: Option<String>,
    pub target_language: Option<String>,
}

/// Directory-backed append-only record store.
pub struct HistoryStore {
    history_dir: PathBuf,
    write_lock: Mutex<()>,
}

impl HistoryStore {
    pub fn new(history_dir: impl Into<PathBuf>) -> Result<Self> {
        let history_dir = history_dir.into();
        fs::create_dir_all(&history_dir)
            .map_err(|e| PipelineError::storage_with_source("failed to create history directory", e))?;
        Ok(Self {
            history_dir,
            write_lock: Mutex::new(()),
        })
    }

    /// New identifier: second-resolution local timestamp plus 8 hex chars of
    /// randomness. Lexicographic order matches creation order at second
    /// granularity.
    fn next_id() -> String {
        let stamp = Local::now().format("%Y%m%d-%H%M%S");
        let suffix = &uuid::Uuid::new_v4().simple().to_string()[..8];
        format!("{}-{}", stamp, suffix)
    }

    /// Append one record, storing media under the shared identifier.
    ///
    /// Raster media is normalized (flattened, recompressed) before storage;
    /// PDFs are stored verbatim. A media write failure is logged and leaves
    /// a text-only record, matching the best-effort media handling of the
    /// interactive flow; the JSON record write itself is never best-effort.
    pub fn append(&self, record: NewHistoryRecord, media: Option<HistoryMedia<'_>>) -> Result<HistoryRecord> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|e| PipelineError::LockPoisoned(format!("history mutex poisoned: {}", e)))?;

        let id = Self::next_id();

        let media_path = match media {
            Some(HistoryMedia::Raster(bytes)) => {
                let path = self.history_dir.join(format!("{}.jpg", id));
                match fs::write(&path, image::normalize(bytes)) {
                    Ok(()) => Some(path),
                    Err(e) => {
                        tracing::warn!("failed to store history media for {}: {}", id, e);
                        None
                    }
                }
            }
            Some(HistoryMedia::Pdf(bytes)) => {
                let path = self.history_dir.join(format!("{}.pdf", id));
                match fs::write(&path, bytes) {
                    Ok(()) => Some(path),
                    Err(e) => {
                        tracing::warn!("failed to store history media for {}: {}", id, e);
                        None
                    }
                }
            }
            None => None,
        };

        let stored = HistoryRecord {
            id: id.clone(),
            text: record.text,
            language: language_detection::display_name(&record.language_code).to_string(),
            processing_time: record.processing_time,
            translated_text: record.translated_text,
            target_language: record.target_language,
            media_path,
        };

        let json = serde_json::to_vec_pretty(&stored)?;
        fs::write(self.history_dir.join(format!("{}.json", id)), json)
            .map_err(|e| PipelineError::storage_with_source(format!("failed to write history record {}", id), e))?;

        Ok(stored)
    }

    /// All records, newest first. Unreadable individual records are logged
    /// and skipped so one corrupt file cannot hide the rest of the history.
    pub fn list_all(&self) -> Result<Vec<HistoryRecord>> {
        let read_dir = fs::read_dir(&self.history_dir)
            .map_err(|e| PipelineError::storage_with_source("failed to read history directory", e))?;

        let mut records = Vec::new();
        for entry in read_dir {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    tracing::debug!("error reading history entry: {}", e);
                    continue;
                }
            };
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }
            match self.load_record(&path) {
                Ok(record) => records.push(record),
                Err(e) => tracing::warn!("skipping unreadable history record {:?}: {}", path, e),
            }
        }

        records.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(records)
    }

    fn load_record(&self, path: &Path) -> Result<HistoryRecord> {
        let content =
            fs::read(path).map_err(|e| PipelineError::storage_with_source("failed to read history record", e))?;
        let mut record: HistoryRecord = serde_json::from_slice(&content)?;

        // Resolve the sibling media file on load; records written by older
        // deployments carry no media_path field.
        if record.media_path.is_none() {
            let jpg = self.history_dir.join(format!("{}.jpg", record.id));
            let pdf = self.history_dir.join(format!("{}.pdf", record.id));
            if jpg.exists() {
                record.media_path = Some(jpg);
            } else if pdf.exists() {
                record.media_path = Some(pdf);
            }
        }

        Ok(record)
    }

    pub fn history_dir(&self) -> &Path {
        &self.history_dir
    }
}
