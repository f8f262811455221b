//! # MultiSummarizer
//!
//! Ask questions of an uploaded document (PDF, text, or transcribed
//! audio/video) and get answers grounded only in that document.
//!
//! Retrieval, fusion and the confidence gate live in
//! [`multisummarizer_core`]; this crate supplies the providers, extraction,
//! prompt, HTTP API and CLI around it.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌──────────────────┐
//! │   Upload     │──▶│   Extract    │──▶│ RagEngine        │
//! │ HTTP / CLI   │   │ PDF/Text/STT │   │ chunk+dense+BM25 │
//! └──────────────┘   └──────────────┘   └────────┬─────────┘
//!                                                │ retrieve
//!                                                ▼
//!                     ┌──────────┐        ┌─────────────┐
//!                     │ Ollama   │◀───────│ Gate+Prompt │
//!                     │ generate │        └─────────────┘
//!                     └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! msum chunk lecture.pdf
//! msum search lecture.pdf "gradient descent" --top-k 3
//! msum ask lecture.pdf "What is gradient descent?"
//! msum serve
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`embedding`] | Embedding providers (local, Ollama, OpenAI, hashed) |
//! | [`generation`] | Text generation providers (Ollama) |
//! | [`extract`] | PDF / text / media text extraction |
//! | [`prompt`] | Grounded prompt construction |
//! | [`summarize`] | Ingest + gated summarization service |
//! | [`server`] | HTTP API |

pub mod config;
pub mod embedding;
pub mod extract;
pub mod generation;
pub mod prompt;
pub mod server;
pub mod summarize;
