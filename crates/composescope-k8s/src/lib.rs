//! Kubernetes backend for composescope
//!
//! This crate resolves kubeconfig contexts and streams the logs of compose
//! projects deployed to a cluster.

mod backend;
mod client;

pub use backend::{KubeLogBackend, PROJECT_LABEL, SERVICE_LABEL};
pub use client::KubeClient;

// Re-export types that are used in our public API
pub use composescope_types::ContextInfo;
