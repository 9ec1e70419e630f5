//! Usage telemetry for composescope
//!
//! This crate reduces a command line to a command signature that carries no
//! user-supplied values, and dispatches it to an analytics endpoint without
//! ever blocking or failing the command that produced it.

mod classify;
mod client;
mod commands;
mod tracker;

pub use classify::{CommandClassifier, has_quiet_flag};
pub use client::{
    DEFAULT_ENDPOINT, DEFAULT_TIMEOUT, HttpTelemetryClient, NoopTelemetryClient, TelemetryClient,
};
pub use commands::CommandSet;
pub use tracker::{Tracker, is_invoked_as_cli_backend};

// Re-export types used in our public API
pub use composescope_types::{CommandRecord, Source, Status};
