//! Core data types shared across the pipeline.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Content kind of an uploaded document, classified by magic bytes.
///
/// Classification never trusts the filename: `sniff` looks at the leading
/// bytes only. Raster content that is neither JPEG nor PNG still classifies
/// as PNG and fails naturally at decode or recognition time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Jpeg,
    Png,
    Pdf,
}

impl DocumentKind {
    /// Classify raw bytes by their magic prefix.
    pub fn sniff(bytes: &[u8]) -> Self {
        if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            DocumentKind::Jpeg
        } else if bytes.starts_with(b"%PDF") {
            DocumentKind::Pdf
        } else {
            DocumentKind::Png
        }
    }

    /// MIME type used in the `data:` URI sent to the recognition service.
    pub fn mime(&self) -> &'static str {
        match self {
            DocumentKind::Jpeg => "image/jpeg",
            DocumentKind::Png => "image/png",
            DocumentKind::Pdf => "application/pdf",
        }
    }

    /// The recognition service's `filetype` form field value.
    pub fn service_filetype(&self) -> &'static str {
        match self {
            DocumentKind::Jpeg => "JPG",
            DocumentKind::Png => "PNG",
            DocumentKind::Pdf => "PDF",
        }
    }

    pub fn is_pdf(&self) -> bool {
        matches!(self, DocumentKind::Pdf)
    }
}

/// A cached recognition result, one JSON file per content digest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Recognized text.
    pub text: String,
    /// Detected language code (`"en"` or `"ru"`).
    pub detected_language: String,
    /// Human-readable processing duration, e.g. `"1.24s"`.
    pub processing_time: String,
}

/// One successfully processed document, persisted as `<id>.json` with an
/// optional sibling media file sharing the same id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryRecord {
    /// Timestamp-derived identifier with a random disambiguator suffix,
    /// e.g. `20260828-141502-3fa09b1c`. Lexicographic order is
    /// chronological order.
    pub id: String,
    pub text: String,
    /// Language label for display.
    pub language: String,
    pub processing_time: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub translated_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_language: Option<String>,
    /// Path of the stored media file (`.jpg` or `.pdf`), resolved on load.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_path: Option<PathBuf>,
}

/// Running counters over all processing attempts, persisted as one JSON file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub total_processed: u64,
    pub total_success: u64,
    pub total_failed: u64,
    /// Cumulative uploaded byte size across attempts.
    pub total_size: u64,
    /// `YYYY-mm-dd HH:MM:SS`, None until the first attempt.
    pub last_processed: Option<String>,
}

/// Outcome of one single-document processing flow.
#[derive(Debug, Clone)]
pub struct ProcessOutcome {
    pub text: String,
    pub detected_language: String,
    pub processing_time: String,
    /// True when the result was served from the cache with no network call.
    pub cache_hit: bool,
}

/// One input of a batch flow.
#[derive(Debug, Clone)]
pub struct BatchItem {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Per-item outcome of a batch flow. Items are never silently dropped: the
/// output vector is aligned with the input, and items skipped after an
/// admission denial or credential failure carry a distinguished status.
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    pub filename: String,
    pub status: BatchStatus,
}

#[derive(Debug, Clone)]
pub enum BatchStatus {
    Done(ProcessOutcome),
    Failed { error: String },
    /// Admission was denied; this and all remaining items were not processed.
    RateLimited,
    /// Skipped because an earlier item hit a batch-aborting error.
    Skipped { reason: String },
}

impl BatchStatus {
    pub fn is_done(&self) -> bool {
        matches!(self, BatchStatus::Done(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sniff_jpeg() {
        let bytes = [0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10];
        assert_eq!(DocumentKind::sniff(&bytes), DocumentKind::Jpeg);
    }

    #[test]
    fn test_sniff_pdf() {
        assert_eq!(DocumentKind::sniff(b"%PDF-1.7\n"), DocumentKind::Pdf);
        assert!(DocumentKind::sniff(b"%PDF-1.7\n").is_pdf());
    }

    #[test]
    fn test_sniff_png_and_unknown_default() {
        let png = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
        assert_eq!(DocumentKind::sniff(&png), DocumentKind::Png);
        assert_eq!(DocumentKind::sniff(b"garbage"), DocumentKind::Png);
        assert_eq!(DocumentKind::sniff(&[]), DocumentKind::Png);
    }

    #[test]
    fn test_service_filetype_labels() {
        assert_eq!(DocumentKind::Jpeg.service_filetype(), "JPG");
        assert_eq!(DocumentKind::Png.service_filetype(), "PNG");
        assert_eq!(DocumentKind::Pdf.service_filetype(), "PDF");
    }

    #[test]
    fn test_cache_entry_roundtrip() {
        let entry = CacheEntry {
            text: "Hello".to_string(),
            detected_language: "en".to_string(),
            processing_time: "0.42s".to_string(),
        };
        let json = serde_json::to_string(&entry).unwrap();
        let back: CacheEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back, entry);
    }

    #[test]
    fn test_history_record_omits_empty_optionals() {
        let record = HistoryRecord {
            id: "20260828-120000-abcd1234".to_string(),
            text: "text".to_string(),
            language: "en".to_string(),
            processing_time: "1.00s".to_string(),
            translated_text: None,
            target_language: None,
            media_path: None,
        };
        let json = serde_json::to_string(&record).unwrap();
        assert!(!json.contains("translated_text"));
        assert!(!json.contains("media_path"));
    }
}
