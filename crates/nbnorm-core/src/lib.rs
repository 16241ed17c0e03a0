//! nbnorm core - strip volatile fields from Jupyter notebooks
//!
//! Execution counters, cell outputs, widget model ids and kernel metadata
//! change every time a notebook runs. Committing them makes every diff noisy.
//! This crate removes them with a deterministic rewrite.
//!
//! # Architecture
//!
//! ```text
//! CLI paths → discovery → processor → normalizer → canonical JSON
//!                             ↓
//!                      backup (optional) → rewrite in place
//! ```
//!
//! # Guarantees
//!
//! - **Idempotent**: a normalized notebook is left byte-for-byte untouched
//! - **Deterministic**: keys sorted, fixed indentation, trailing newline
//! - **Lossless elsewhere**: fields that are not volatile are kept as they are

pub mod discovery;
pub mod error;
pub mod normalizer;
pub mod processor;

pub use discovery::find_notebooks;
pub use error::{Error, Result};
pub use normalizer::{normalize_notebook, serialize_canonical, strip_widget_ids, NormalizeOptions};
pub use processor::{process_file, Outcome, ProcessOptions};
