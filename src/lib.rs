//! # reqrag: retrieval-augmented requirement extraction
//!
//! Ingests project documents, retrieves the passages most relevant to a
//! query, and turns them into classified, validated and MoSCoW-prioritized
//! requirements with document, table and user-story outputs.
//!
//! ## Architecture
//!
//! - **[`config`]**: Configuration loading and validation
//! - **[`loader`]**: Directory scan and per-format text extraction (PDF, DOCX, OCR)
//! - **[`chunker`]**: Overlapping character windows
//! - **[`embedder`]**: Text embedding via ONNX Runtime, plus an offline hash embedder
//! - **[`retriever`]**: In-memory SQLite + sqlite-vec similarity search
//! - **[`synthesizer`]**: Candidate lines from retrieved context, optional LLM backends
//! - **[`classifier`]**, **[`validator`]**, **[`prioritizer`]**, **[`sectioner`]**: Requirement analysis stages
//! - **[`output`]**: DOCX, CSV and user-story writers
//! - **[`pipeline`]**: Run orchestration and reporting
//! - **[`server`]**: HTTP API (axum)

pub mod chunker;
pub mod classifier;
pub mod config;
pub mod embedder;
pub mod loader;
pub mod models;
pub mod output;
pub mod pipeline;
pub mod prioritizer;
pub mod retriever;
pub mod sectioner;
pub mod server;
pub mod synthesizer;
pub mod validator;
