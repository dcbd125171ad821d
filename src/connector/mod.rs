//! # Connector Layer
//!
//! External integrations implementing application interfaces:
//! - Storage (a single-file flat vector index on local disk, plain-text brief archive)
//! - Embedding generation (Gemini API, local ONNX models, deterministic mock)
//! - Brief generation (Gemini chat, canned mock)

pub mod adapter;

pub use adapter::*;
