//! Pipeline orchestration: single-document and batch processing flows.
//!
//! The pipeline composes the stores and service clients; everything
//! session-scoped (credential, admission window) lives in an explicit
//! [`SessionContext`] passed into each call, never in ambient state.

use crate::cache::{self, ResultCache};
use crate::core::config::{ApiKeyState, PipelineConfig};
use crate::error::{PipelineError, Result};
use crate::history::{HistoryMedia, HistoryStore, NewHistoryRecord};
use crate::language_detection;
use crate::ocr::{OcrSpaceClient, RecognitionBackend};
use crate::ratelimit::SlidingWindowLimiter;
use crate::stats::StatsStore;
use crate::translation::{GoogleTranslateClient, TranslationBackend, TranslationDirection};
use crate::types::{BatchItem, BatchOutcome, BatchStatus, CacheEntry, DocumentKind, HistoryRecord, ProcessOutcome};
use crate::image;
use std::sync::Arc;
use std::time::Instant;

/// Filename extensions accepted for upload.
const ALLOWED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "pdf"];

/// Per-session state: the credential and the batch admission window.
pub struct SessionContext {
    pub credentials: ApiKeyState,
    pub limiter: SlidingWindowLimiter,
}

impl SessionContext {
    /// Context with the credential sourced from the environment.
    pub fn new(config: &PipelineConfig) -> Self {
        Self::with_credentials(config, ApiKeyState::from_env())
    }

    pub fn with_credentials(config: &PipelineConfig, credentials: ApiKeyState) -> Self {
        Self {
            credentials,
            limiter: SlidingWindowLimiter::new(config.batch_quota, config.batch_window()),
        }
    }
}

/// Document processing pipeline.
pub struct Pipeline {
    config: PipelineConfig,
    cache: ResultCache,
    history: HistoryStore,
    stats: StatsStore,
    recognizer: Arc<dyn RecognitionBackend>,
    translator: Arc<dyn TranslationBackend>,
}

impl Pipeline {
    /// Pipeline with the real HTTP service clients.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        let recognizer = Arc::new(OcrSpaceClient::new(
            config.recognition.endpoint.clone(),
            config.recognition_timeout(),
        )?);
        let translator = Arc::new(GoogleTranslateClient::new(
            config.translation.endpoint.clone(),
            config.translation_timeout(),
        )?);
        Self::with_backends(config, recognizer, translator)
    }

    /// Pipeline over caller-supplied service backends.
    pub fn with_backends(
        config: PipelineConfig,
        recognizer: Arc<dyn RecognitionBackend>,
        translator: Arc<dyn TranslationBackend>,
    ) -> Result<Self> {
        let cache = ResultCache::new(&config.cache_dir)?;
        let history = HistoryStore::new(&config.history_dir)?;
        let stats = StatsStore::new(&config.stats_path)?;
        Ok(Self {
            config,
            cache,
            history,
            stats,
            recognizer,
            translator,
        })
    }

    /// Fresh session context for this pipeline's configuration.
    pub fn session(&self) -> SessionContext {
        SessionContext::new(&self.config)
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn stats(&self) -> &StatsStore {
        &self.stats
    }

    /// Process one document: validate, consult the cache, and on a miss
    /// normalize, recognize, detect the language, and fill the cache.
    ///
    /// Every attempt is recorded in stats, validation rejections included.
    /// A cache hit short-circuits with zero network calls and no credential
    /// requirement. On credential rejection the session key is invalidated.
    pub async fn process(
        &self,
        ctx: &SessionContext,
        bytes: &[u8],
        filename: Option<&str>,
    ) -> Result<ProcessOutcome> {
        let outcome = self.process_inner(ctx, bytes, filename).await;
        if let Err(e) = self.stats.record(outcome.is_ok(), bytes.len() as u64) {
            tracing::error!("failed to record processing stats: {}", e);
            if outcome.is_ok() {
                return Err(e);
            }
        }
        outcome
    }

    async fn process_inner(
        &self,
        ctx: &SessionContext,
        bytes: &[u8],
        filename: Option<&str>,
    ) -> Result<ProcessOutcome> {
        self.validate(bytes, filename)?;

        let start = Instant::now();
        let key = cache::cache_key(bytes);

        if self.config.use_cache
            && let Some(entry) = self.cache.get(&key)?
        {
            tracing::debug!("cache hit for {}", key);
            return Ok(ProcessOutcome {
                text: entry.text,
                detected_language: entry.detected_language,
                processing_time: entry.processing_time,
                cache_hit: true,
            });
        }

        // Fail fast before any network traffic when no credential is held.
        let api_key = ctx.credentials.current()?;

        let payload = if self.config.optimize {
            image::normalize(bytes)
        } else {
            bytes.to_vec()
        };
        let kind = DocumentKind::sniff(&payload);

        let text = match self.recognizer.recognize(&payload, kind, &api_key).await {
            Ok(text) => text,
            Err(e @ PipelineError::Auth(_)) => {
                ctx.credentials.invalidate()?;
                return Err(e);
            }
            Err(e) => return Err(e),
        };

        let language = language_detection::detect(&text);
        let outcome = ProcessOutcome {
            text,
            detected_language: language.code().to_string(),
            processing_time: format!("{:.2}s", start.elapsed().as_secs_f64()),
            cache_hit: false,
        };

        if self.config.use_cache {
            self.cache.put(
                &key,
                &CacheEntry {
                    text: outcome.text.clone(),
                    detected_language: outcome.detected_language.clone(),
                    processing_time: outcome.processing_time.clone(),
                },
            )?;
        }

        Ok(outcome)
    }

    /// Interactive flow: process, optionally translate, append to history.
    ///
    /// Translation direction is chosen from the recognized text's script.
    /// A translation failure is logged and leaves the record untranslated;
    /// the recognition result is not discarded over it.
    pub async fn process_and_record(
        &self,
        ctx: &SessionContext,
        bytes: &[u8],
        filename: Option<&str>,
        translate: bool,
    ) -> Result<(ProcessOutcome, HistoryRecord)> {
        let outcome = self.process(ctx, bytes, filename).await?;

        let mut translated_text = None;
        let mut target_language = None;
        if translate && !outcome.text.trim().is_empty() {
            let direction = TranslationDirection::for_text(&outcome.text);
            match self.translator.translate(&outcome.text, direction).await {
                Ok(text) => {
                    translated_text = Some(text);
                    target_language = Some(direction.target().to_string());
                }
                Err(e) => tracing::warn!("translation failed, recording without it: {}", e),
            }
        }

        let record = self.history.append(
            NewHistoryRecord {
                text: outcome.text.clone(),
                language_code: outcome.detected_language.clone(),
                processing_time: outcome.processing_time.clone(),
                translated_text,
                target_language,
            },
            Some(HistoryMedia::from_bytes(bytes)),
        )?;

        Ok((outcome, record))
    }

    /// Batch flow: sequential per-item processing under limiter admission.
    ///
    /// An admission denial marks the current and all remaining items
    /// `RateLimited` and stops. A credential failure aborts the remainder
    /// with `Skipped`. Validation, recognition, and transient failures are
    /// isolated per item. No auto-translation; the output is aligned with
    /// the input and never drops items.
    pub async fn process_batch(&self, ctx: &SessionContext, items: &[BatchItem]) -> Result<Vec<BatchOutcome>> {
        let mut outcomes = Vec::with_capacity(items.len());

        for (idx, item) in items.iter().enumerate() {
            if !ctx.limiter.try_admit()? {
                tracing::info!("batch admission denied at item {} of {}", idx + 1, items.len());
                for rest in &items[idx..] {
                    outcomes.push(BatchOutcome {
                        filename: rest.filename.clone(),
                        status: BatchStatus::RateLimited,
                    });
                }
                break;
            }

            match self.process(ctx, &item.bytes, Some(&item.filename)).await {
                Ok(outcome) => outcomes.push(BatchOutcome {
                    filename: item.filename.clone(),
                    status: BatchStatus::Done(outcome),
                }),
                Err(e) if e.aborts_batch() => {
                    let reason = format!("aborted after {}: {}", item.filename, e);
                    outcomes.push(BatchOutcome {
                        filename: item.filename.clone(),
                        status: BatchStatus::Failed { error: e.to_string() },
                    });
                    for rest in &items[idx + 1..] {
                        outcomes.push(BatchOutcome {
                            filename: rest.filename.clone(),
                            status: BatchStatus::Skipped { reason: reason.clone() },
                        });
                    }
                    break;
                }
                Err(e) => outcomes.push(BatchOutcome {
                    filename: item.filename.clone(),
                    status: BatchStatus::Failed { error: e.to_string() },
                }),
            }
        }

        Ok(outcomes)
    }

    /// Explicit translation follow-up for one recognized (and possibly
    /// user-edited) text; appends a history record with both texts.
    pub async fn translate_item(
        &self,
        text: &str,
        direction: TranslationDirection,
    ) -> Result<(String, HistoryRecord)> {
        let start = Instant::now();
        let translated = self.translator.translate(text, direction).await?;

        let language = language_detection::detect(text);
        let record = self.history.append(
            NewHistoryRecord {
                text: text.to_string(),
                language_code: language.code().to_string(),
                processing_time: format!("{:.2}s", start.elapsed().as_secs_f64()),
                translated_text: Some(translated.clone()),
                target_language: Some(direction.target().to_string()),
            },
            None,
        )?;

        Ok((translated, record))
    }

    /// Independent size and extension checks; either failure is `Validation`.
    fn validate(&self, bytes: &[u8], filename: Option<&str>) -> Result<()> {
        if bytes.len() as u64 > self.config.max_upload_bytes {
            return Err(PipelineError::validation(format!(
                "file is {} bytes, limit is {} bytes",
                bytes.len(),
                self.config.max_upload_bytes
            )));
        }

        if let Some(name) = filename {
            let extension = std::path::Path::new(name)
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e.to_ascii_lowercase());
            match extension {
                Some(ext) if ALLOWED_EXTENSIONS.contains(&ext.as_str()) => {}
                _ => {
                    return Err(PipelineError::validation(format!(
                        "unsupported file type for {:?}; allowed: png, jpg, jpeg, pdf",
                        name
                    )));
                }
            }
        }

        Ok(())
    }
}
