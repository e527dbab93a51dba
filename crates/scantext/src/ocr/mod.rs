//! Text recognition over the OCR.space HTTP API.
//!
//! The client is stateless with respect to credentials: the API key is an
//! argument to every call, and credential lifecycle (sourcing, invalidation
//! on rejection) belongs to the session context. Everything the service
//! needs travels in one form-encoded POST.

use crate::error::{PipelineError, Result};
use crate::types::DocumentKind;
use async_trait::async_trait;
use base64::Engine;
use serde::Deserialize;
use std::time::Duration;

/// Default OCR.space endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://api.ocr.space/parse/image";

/// Default client timeout for recognition calls.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Source-language hint sent to the recognition service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LanguageHint {
    /// Let the service detect the language (engine 2 supports this).
    #[default]
    Auto,
    English,
}

impl LanguageHint {
    fn service_code(&self) -> &'static str {
        match self {
            LanguageHint::Auto => "auto",
            LanguageHint::English => "eng",
        }
    }
}

/// A text recognition service.
#[async_trait]
pub trait RecognitionBackend: Send + Sync {
    /// Recognize text in one document. The returned text is trimmed.
    async fn recognize(&self, bytes: &[u8], kind: DocumentKind, api_key: &str) -> Result<String>;
}

/// OCR.space client.
pub struct OcrSpaceClient {
    client: reqwest::Client,
    endpoint: String,
    language: LanguageHint,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct OcrResponse {
    #[serde(default)]
    parsed_results: Vec<ParsedResult>,
    #[serde(default)]
    is_errored_on_processing: bool,
    #[serde(default)]
    error_message: Option<ErrorMessage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ParsedResult {
    #[serde(default)]
    parsed_text: String,
}

/// The service reports `ErrorMessage` as either a string or a list of
/// strings depending on the failure.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorMessage {
    One(String),
    Many(Vec<String>),
}

impl ErrorMessage {
    fn joined(&self) -> String {
        match self {
            ErrorMessage::One(s) => s.clone(),
            ErrorMessage::Many(parts) => parts.join("; "),
        }
    }
}

impl OcrSpaceClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(PipelineError::from)?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            language: LanguageHint::default(),
        })
    }

    pub fn with_language(mut self, language: LanguageHint) -> Self {
        self.language = language;
        self
    }
}

#[async_trait]
impl RecognitionBackend for OcrSpaceClient {
    async fn recognize(&self, bytes: &[u8], kind: DocumentKind, api_key: &str) -> Result<String> {
        let data_uri = format!(
            "data:{};base64,{}",
            kind.mime(),
            base64::engine::general_purpose::STANDARD.encode(bytes)
        );

        let form = [
            ("base64Image", data_uri.as_str()),
            ("language", self.language.service_code()),
            ("isOverlayRequired", "false"),
            ("OCREngine", "2"),
            ("filetype", kind.service_filetype()),
            ("detectOrientation", "true"),
            ("scale", "true"),
            ("isCreateSearchablePdf", "false"),
            ("isSearchablePdfHideTextLayer", "false"),
            ("isTable", "false"),
        ];

        let response = self
            .client
            .post(&self.endpoint)
            .header("apikey", api_key)
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(PipelineError::Auth(format!(
                "recognition service rejected the API key (HTTP {})",
                status.as_u16()
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PipelineError::transient(format!(
                "recognition service returned HTTP {}: {}",
                status.as_u16(),
                body
            )));
        }

        let parsed: OcrResponse = response.json().await?;

        if parsed.is_errored_on_processing {
            let message = parsed
                .error_message
                .as_ref()
                .map(ErrorMessage::joined)
                .unwrap_or_else(|| "unknown recognition failure".to_string());
            // Some plans report key rejection inside a 200 body.
            if message.contains("Unauthorized request") {
                return Err(PipelineError::Auth(message));
            }
            return Err(PipelineError::recognition(message));
        }

        let text = parsed
            .parsed_results
            .first()
            .map(|r| r.parsed_text.trim().to_string())
            .ok_or_else(|| PipelineError::recognition("response contained no parsed results"))?;

        Ok(text)
    }
}
