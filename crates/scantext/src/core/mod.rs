//! Pipeline orchestration and configuration.
//!
//! The primary entry point is [`pipeline::Pipeline`], which composes the
//! cache, stores, and service clients into the single-document and batch
//! processing flows. Session-scoped state (credential, admission window)
//! lives in [`pipeline::SessionContext`].

pub mod config;
pub mod pipeline;
