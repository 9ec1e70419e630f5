//! Log processing for composescope
//!
//! This crate provides the log consumer abstraction, the per-service stream
//! filter, and the backend contract used to retrieve a project's logs.

mod buffer;
mod consumer;
mod error;
mod filter;
mod service;
mod writer;

pub use buffer::LogBuffer;
pub use consumer::LogConsumer;
pub use error::{LogError, Result};
pub use filter::FilteredLogConsumer;
pub use service::{LogBackend, logs};
pub use writer::WriterConsumer;

// Re-export types used in our public API
pub use composescope_types::{LogEntry, LogOptions};
