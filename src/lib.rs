//! # promptpack
//!
//! Turns a directory of Markdown documents into ready-to-send chat request
//! payloads, one JSON file per document.
//!
//! ## Quick Start
//!
//! ```no_run
//! use promptpack::{Config, Pipeline};
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = Config::builder()
//!     .input_dir("./IN")
//!     .output_dir("./OUT")
//!     .build()?;
//!
//! Pipeline::new(config)?.run()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! The library follows a producer/consumer pipeline:
//! 1. **Extractor**: walks the input tree on its own thread and emits a
//!    [`Record`] per document
//! 2. **Transformer**: [`PromptTemplate`] wraps the record into a [`ChatRequest`]
//! 3. **Writer**: persists the serialized request as `<stem>.json`

#![warn(
    missing_docs,
    rust_2018_idioms,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery
)]
#![allow(clippy::module_name_repetitions)]

mod config;
mod error;
mod extractor;
mod payload;
mod pipeline;
mod record;
mod writer;

pub use config::{
    Config, ConfigBuilder, PromptSettings, DEFAULT_MODEL, DEFAULT_NUM_CTX, DEFAULT_SYSTEM_PROMPT,
    DEFAULT_TEMPERATURE,
};
pub use error::{Error, Result};
pub use extractor::{ExtractStats, Extractor, RecordSink, RecordSource};
pub use payload::{ChatMessage, ChatOptions, ChatRequest, PromptTemplate, DEFAULT_USER_TEMPLATE};
pub use pipeline::{Pipeline, PipelineStats};
pub use record::Record;
pub use writer::Writer;

/// Runs the complete pipeline with the given configuration.
///
/// # Errors
///
/// Returns an error if:
/// - Configuration is invalid
/// - The input directory doesn't exist or cannot be traversed
/// - A payload cannot be rendered or written
///
/// # Examples
///
/// ```no_run
/// use promptpack::{Config, run};
///
/// # fn main() -> anyhow::Result<()> {
/// let config = Config::builder().create_output_dir(true).build()?;
///
/// let stats = run(config)?;
/// println!("{} payloads written", stats.files_written);
/// # Ok(())
/// # }
/// ```
pub fn run(config: Config) -> Result<PipelineStats> {
    Pipeline::new(config)?.run()
}
