//! Pipeline configuration and credential state.

use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

/// Environment variable the API key is sourced from.
pub const API_KEY_ENV: &str = "OCR_API_KEY";

/// Main pipeline configuration.
///
/// Can be loaded from a TOML file or created programmatically; every field
/// has a default so a partial file is fine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Normalize rasters (downscale, flatten, recompress) before upload.
    #[serde(default = "default_true")]
    pub optimize: bool,

    /// Serve repeated uploads from the content-addressed cache.
    #[serde(default = "default_true")]
    pub use_cache: bool,

    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    #[serde(default = "default_history_dir")]
    pub history_dir: PathBuf,

    #[serde(default = "default_stats_path")]
    pub stats_path: PathBuf,

    /// Upload size ceiling in bytes.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: u64,

    /// Batch admissions allowed per window.
    #[serde(default = "default_batch_quota")]
    pub batch_quota: usize,

    /// Batch admission window length in seconds.
    #[serde(default = "default_batch_window_secs")]
    pub batch_window_secs: u64,

    #[serde(default)]
    pub recognition: RecognitionConfig,

    #[serde(default)]
    pub translation: TranslationConfig,
}

/// Recognition service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecognitionConfig {
    #[serde(default = "default_recognition_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_recognition_timeout_secs")]
    pub timeout_secs: u64,
}

/// Translation service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationConfig {
    #[serde(default = "default_translation_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_translation_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_true() -> bool {
    true
}
fn default_cache_dir() -> PathBuf {
    PathBuf::from("ocr_cache")
}
fn default_history_dir() -> PathBuf {
    PathBuf::from("history")
}
fn default_stats_path() -> PathBuf {
    PathBuf::from("stats.json")
}
fn default_max_upload_bytes() -> u64 {
    1024 * 1024
}
fn default_batch_quota() -> usize {
    crate::ratelimit::DEFAULT_QUOTA
}
fn default_batch_window_secs() -> u64 {
    60
}
fn default_recognition_endpoint() -> String {
    crate::ocr::DEFAULT_ENDPOINT.to_string()
}
fn default_recognition_timeout_secs() -> u64 {
    60
}
fn default_translation_endpoint() -> String {
    crate::translation::DEFAULT_ENDPOINT.to_string()
}
fn default_translation_timeout_secs() -> u64 {
    30
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            optimize: true,
            use_cache: true,
            cache_dir: default_cache_dir(),
            history_dir: default_history_dir(),
            stats_path: default_stats_path(),
            max_upload_bytes: default_max_upload_bytes(),
            batch_quota: default_batch_quota(),
            batch_window_secs: default_batch_window_secs(),
            recognition: RecognitionConfig::default(),
            translation: TranslationConfig::default(),
        }
    }
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            endpoint: default_recognition_endpoint(),
            timeout_secs: default_recognition_timeout_secs(),
        }
    }
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            endpoint: default_translation_endpoint(),
            timeout_secs: default_translation_timeout_secs(),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            PipelineError::Configuration(format!(
                "failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        toml::from_str(&content).map_err(|e| {
            PipelineError::Configuration(format!("invalid TOML in {}: {}", path.as_ref().display(), e))
        })
    }

    pub fn recognition_timeout(&self) -> Duration {
        Duration::from_secs(self.recognition.timeout_secs)
    }

    pub fn translation_timeout(&self) -> Duration {
        Duration::from_secs(self.translation.timeout_secs)
    }

    pub fn batch_window(&self) -> Duration {
        Duration::from_secs(self.batch_window_secs)
    }
}

/// Session-scoped API key holder.
///
/// The key is sourced once (environment or programmatic) and invalidated
/// when the service rejects it, so a dead key fails fast instead of burning
/// one rejected call per document.
pub struct ApiKeyState {
    key: Mutex<Option<String>>,
}

impl ApiKeyState {
    /// Start with the key from `OCR_API_KEY`, if set and non-empty.
    pub fn from_env() -> Self {
        let key = std::env::var(API_KEY_ENV).ok().filter(|k| !k.trim().is_empty());
        Self { key: Mutex::new(key) }
    }

    pub fn with_key(key: impl Into<String>) -> Self {
        Self {
            key: Mutex::new(Some(key.into())),
        }
    }

    /// Session without a credential; every recognition attempt fails with
    /// `Configuration` until a key is set.
    pub fn empty() -> Self {
        Self { key: Mutex::new(None) }
    }

    /// The current key, or `Configuration` when none is held.
    pub fn current(&self) -> Result<String> {
        let key = self
            .key
            .lock()
            .map_err(|e| PipelineError::LockPoisoned(format!("api key mutex poisoned: {}", e)))?;
        key.clone()
            .ok_or_else(|| PipelineError::Configuration("no API key configured".to_string()))
    }

    pub fn set(&self, key: impl Into<String>) -> Result<()> {
        let mut slot = self
            .key
            .lock()
            .map_err(|e| PipelineError::LockPoisoned(format!("api key mutex poisoned: {}", e)))?;
        *slot = Some(key.into());
        Ok(())
    }

    /// Drop the key after the service rejected it.
    pub fn invalidate(&self) -> Result<()> {
        let mut slot = self
            .key
            .lock()
            .map_err(|e| PipelineError::LockPoisoned(format!("api key mutex poisoned: {}", e)))?;
        if slot.take().is_some() {
            tracing::warn!("API key invalidated after rejection by the recognition service");
        }
        Ok(())
    }

    pub fn is_configured(&self) -> bool {
        self.key.lock().map(|k| k.is_some()).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert!(config.optimize);
        assert!(config.use_cache);
        assert_eq!(config.max_upload_bytes, 1024 * 1024);
        assert_eq!(config.batch_quota, 10);
        assert_eq!(config.batch_window(), Duration::from_secs(60));
        assert_eq!(config.recognition_timeout(), Duration::from_secs(60));
        assert_eq!(config.translation_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: PipelineConfig = toml::from_str(
            r#"
            optimize = false

            [recognition]
            timeout_secs = 10
            "#,
        )
        .unwrap();
        assert!(!config.optimize);
        assert!(config.use_cache);
        assert_eq!(config.recognition.timeout_secs, 10);
        assert_eq!(config.recognition.endpoint, crate::ocr::DEFAULT_ENDPOINT);
        assert_eq!(config.translation.timeout_secs, 30);
    }

    #[test]
    fn test_from_toml_file_missing_is_configuration_error() {
        let err = PipelineConfig::from_toml_file("/nonexistent/scantext.toml").unwrap_err();
        assert!(matches!(err, PipelineError::Configuration(_)));
    }

    #[test]
    fn test_api_key_lifecycle() {
        let state = ApiKeyState::with_key("k-123");
        assert!(state.is_configured());
        assert_eq!(state.current().unwrap(), "k-123");

        state.invalidate().unwrap();
        assert!(!state.is_configured());
        assert!(matches!(
            state.current().unwrap_err(),
            PipelineError::Configuration(_)
        ));

        state.set("k-456").unwrap();
        assert_eq!(state.current().unwrap(), "k-456");
    }

    #[test]
    fn test_empty_state_fails_fast() {
        let state = ApiKeyState::empty();
        assert!(matches!(
            state.current().unwrap_err(),
            PipelineError::Configuration(_)
        ));
    }
}
