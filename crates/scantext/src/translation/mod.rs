//! Translation over the public Google Translate web endpoint.

use crate::error::{PipelineError, Result};
use crate::language_detection::{self, Language};
use async_trait::async_trait;
use std::time::Duration;

/// Default translation endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://translate.googleapis.com/translate_a/single";

/// Default client timeout for translation calls.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Supported translation directions. The direction a caller passes is
/// honored as given; use [`TranslationDirection::for_text`] to pick the
/// direction from the text's script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranslationDirection {
    RuToEn,
    EnToRu,
}

impl TranslationDirection {
    /// Direction implied by the text itself: Cyrillic-dominant text
    /// translates to English, anything else to Russian.
    pub fn for_text(text: &str) -> Self {
        match language_detection::detect(text) {
            Language::Russian => TranslationDirection::RuToEn,
            Language::English => TranslationDirection::EnToRu,
        }
    }

    pub fn source(&self) -> &'static str {
        match self {
            TranslationDirection::RuToEn => "ru",
            TranslationDirection::EnToRu => "en",
        }
    }

    pub fn target(&self) -> &'static str {
        match self {
            TranslationDirection::RuToEn => "en",
            TranslationDirection::EnToRu => "ru",
        }
    }
}

/// A text translation service.
#[async_trait]
pub trait TranslationBackend: Send + Sync {
    /// Translate text in the given direction.
    async fn translate(&self, text: &str, direction: TranslationDirection) -> Result<String>;
}

/// Client for the unauthenticated `translate_a/single` endpoint.
pub struct GoogleTranslateClient {
    client: reqwest::Client,
    endpoint: String,
}

impl GoogleTranslateClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(PipelineError::from)?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl TranslationBackend for GoogleTranslateClient {
    async fn translate(&self, text: &str, direction: TranslationDirection) -> Result<String> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("client", "gtx"),
                ("sl", direction.source()),
                ("tl", direction.target()),
                ("dt", "t"),
                ("q", text),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(PipelineError::translation(format!(
                "translation service returned HTTP {}",
                status.as_u16()
            )));
        }

        let body: serde_json::Value = response.json().await?;
        extract_translation(&body)
    }
}

/// The endpoint answers with a nested array; the translation is the
/// concatenation of the first element of each chunk under index 0.
fn extract_translation(body: &serde_json::Value) -> Result<String> {
    let chunks = body
        .get(0)
        .and_then(|v| v.as_array())
        .ok_or_else(|| PipelineError::translation("unexpected translation response shape"))?;

    let mut out = String::new();
    for chunk in chunks {
        if let Some(part) = chunk.get(0).and_then(|v| v.as_str()) {
            out.push_str(part);
        }
    }

    if out.is_empty() {
        return Err(PipelineError::translation("translation response contained no text"));
    }
    Ok(out)
}
