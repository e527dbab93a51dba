//! Scantext - document text recognition and translation pipeline.
//!
//! Scantext extracts text from uploaded images and PDFs through a remote
//! recognition service, optionally translates it, and records history and
//! statistics locally.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use scantext::{Pipeline, PipelineConfig};
//!
//! # async fn example() -> scantext::Result<()> {
//! let pipeline = Pipeline::new(PipelineConfig::default())?;
//! let ctx = pipeline.session();
//! let bytes = std::fs::read("scan.jpg")?;
//! let outcome = pipeline.process(&ctx, &bytes, Some("scan.jpg")).await?;
//! println!("{}", outcome.text);
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - **Core** (`core`): pipeline orchestration, session context, configuration
//! - **Cache** (`cache`): content-addressed recognition result cache
//! - **Clients** (`ocr`, `translation`): HTTP service contracts behind trait seams
//! - **Stores** (`history`, `stats`): JSON-file persistence
//! - **Support** (`image`, `language_detection`, `ratelimit`, `text`)

#![deny(unsafe_code)]

pub mod cache;
pub mod core;
pub mod error;
pub mod history;
pub mod image;
pub mod language_detection;
pub mod ocr;
pub mod ratelimit;
pub mod stats;
pub mod text;
pub mod translation;
pub mod types;

pub use crate::core::config::{ApiKeyState, PipelineConfig, RecognitionConfig, TranslationConfig};
pub use crate::core::pipeline::{Pipeline, SessionContext};
pub use error::{PipelineError, Result};
pub use types::*;

pub use cache::ResultCache;
pub use history::{HistoryMedia, HistoryStore, NewHistoryRecord};
pub use language_detection::Language;
pub use ocr::{OcrSpaceClient, RecognitionBackend};
pub use ratelimit::SlidingWindowLimiter;
pub use stats::StatsStore;
pub use translation::{GoogleTranslateClient, TranslationBackend, TranslationDirection};
