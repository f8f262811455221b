//! # MultiSummarizer Core
//!
//! Retrieval logic for MultiSummarizer: word-window chunking, a dense
//! (embedding) index, a sparse (BM25) index, score fusion, and the
//! confidence gate that decides whether an answer is generated at all.
//!
//! This crate performs no network or filesystem I/O. Embedding and text
//! generation are reached through the [`embedding::Embedder`] and
//! [`generation::Generator`] traits; the application crate supplies the
//! concrete providers.
//!
//! ## Retrieval Pipeline
//!
//! ```text
//!              ┌─────────┐
//!  document ──▶│ Chunker │──┬──────────────┐
//!              └─────────┘  ▼              ▼
//!                      ┌─────────┐    ┌─────────┐
//!  query ─────────────▶│  Dense  │    │ Sparse  │◀── query
//!                      └────┬────┘    └────┬────┘
//!                           └─────┬────────┘
//!                                 ▼
//!                           ┌──────────┐   ┌──────┐
//!                           │  Fusion  │──▶│ Gate │──▶ prompt / "not found"
//!                           └──────────┘   └──────┘
//! ```

pub mod chunk;
pub mod dense;
pub mod embedding;
pub mod engine;
pub mod error;
pub mod fusion;
pub mod gate;
pub mod generation;
pub mod models;
pub mod sparse;

pub use engine::{DocumentIndex, RagEngine};
pub use error::{CoreError, Result};
pub use models::{Chunk, RetrievedChunk};
