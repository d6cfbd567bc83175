#![deny(missing_docs)]

//! Core library for the PDF smart summarizer.

/// HTTP routing and REST handlers.
pub mod api;
/// Environment-driven configuration management.
pub mod config;
/// PDF text-layer extraction.
pub mod extraction;
/// Structured logging and tracing setup.
pub mod logging;
/// Model Context Protocol server implementation.
pub mod mcp;
/// Pipeline metrics helpers.
pub mod metrics;
/// OCR fallback for scanned documents.
pub mod ocr;
/// Document pipeline: validation, scan detection, chunking, summarization and rendering.
pub mod processing;
/// Structured-summary backends.
pub mod summarization;
