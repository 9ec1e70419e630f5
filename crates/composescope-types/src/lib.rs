//! Shared types for composescope
//!
//! This crate contains data structures used across multiple composescope crates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Orchestrator Types
// ============================================================================

/// Orchestration context (kubeconfig context) information
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContextInfo {
    pub name: String,
    pub cluster: String,
    pub namespace: Option<String>,
    pub is_current: bool,
}

impl ContextInfo {
    pub fn new(name: String, cluster: String, namespace: Option<String>, is_current: bool) -> Self {
        Self {
            name,
            cluster,
            namespace,
            is_current,
        }
    }
}

// ============================================================================
// Telemetry Types
// ============================================================================

/// Where a tracked command was issued from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// Invoked by a user through the command line
    #[default]
    Cli,
    /// Invoked through the API
    Api,
}

/// Outcome of a tracked command
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Failure,
    Canceled,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
            Self::Canceled => "canceled",
        }
    }
}

/// One classified CLI invocation, as delivered to the analytics endpoint
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandRecord {
    /// Canonical command signature
    pub command: String,

    /// Name of the orchestration context the command ran against
    pub context: String,

    pub source: Source,

    pub status: Status,
}

impl CommandRecord {
    pub fn new(command: String, context: String, source: Source, status: Status) -> Self {
        Self {
            command,
            context,
            source,
            status,
        }
    }
}

// ============================================================================
// Log Types
// ============================================================================

/// A single log line attributed to the service that produced it
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogEntry {
    /// Originating service name
    pub service: String,

    /// Raw log line, without trailing newline
    pub line: String,

    /// Time the entry was received
    pub received_at: DateTime<Utc>,
}

impl LogEntry {
    /// Create a new log entry stamped with the current time
    pub fn new(service: impl Into<String>, line: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            line: line.into(),
            received_at: Utc::now(),
        }
    }
}

/// Options for a logs request
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LogOptions {
    /// Services to include (empty = all)
    pub services: Vec<String>,

    /// Keep the stream open and deliver new entries until cancelled
    pub follow: bool,

    /// Number of historical lines to fetch per container
    ///
    /// Read when the backend is built, not by the logs operation itself.
    pub tail: Option<i64>,

    /// Keep backend timestamps at the start of each line
    ///
    /// Read when the backend is built, like `tail`.
    pub timestamps: bool,
}

impl LogOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_services<I, S>(mut self, services: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.services = services.into_iter().map(Into::into).collect();
        self
    }

    pub fn follow(mut self, follow: bool) -> Self {
        self.follow = follow;
        self
    }

    pub fn tail(mut self, tail: Option<i64>) -> Self {
        self.tail = tail;
        self
    }

    pub fn timestamps(mut self, timestamps: bool) -> Self {
        self.timestamps = timestamps;
        self
    }
}
