use std::sync::Arc;

use composescope_types::{CommandRecord, Source, Status};
use tracing::debug;

use crate::classify::CommandClassifier;
use crate::client::TelemetryClient;

/// Executable suffix of the internal backend process
const BACKEND_SUFFIX: &str = "-backend";

/// Whether the process was started as the internal backend rather than by a user
pub fn is_invoked_as_cli_backend(executable: &str) -> bool {
    executable.ends_with(BACKEND_SUFFIX)
}

/// Classifies finished invocations and hands them to a telemetry client
#[derive(Clone)]
pub struct Tracker {
    classifier: CommandClassifier,
    client: Arc<dyn TelemetryClient>,
    executable: String,
}

impl Tracker {
    /// Create a tracker for the current process
    pub fn new(classifier: CommandClassifier, client: Arc<dyn TelemetryClient>) -> Self {
        Self {
            classifier,
            client,
            executable: std::env::args_os()
                .next()
                .map(|arg| arg.to_string_lossy().into_owned())
                .unwrap_or_default(),
        }
    }

    /// Override the invocation name checked by the backend guard
    pub fn with_executable(mut self, executable: impl Into<String>) -> Self {
        self.executable = executable.into();
        self
    }

    /// Record one invocation; `args` excludes the executable name
    ///
    /// Never blocks on delivery and never fails.
    pub fn track<S: AsRef<str>>(&self, context: &str, args: &[S], status: Status) {
        if is_invoked_as_cli_backend(&self.executable) {
            return;
        }

        let command = self.classifier.classify(args);
        if command.is_empty() {
            debug!("invocation not classified, skipping usage record");
            return;
        }

        debug!(%command, status = status.as_str(), "sending usage record");
        self.client.send(CommandRecord::new(
            command,
            context.to_string(),
            Source::Cli,
            status,
        ));
    }
}

impl std::fmt::Debug for Tracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tracker")
            .field("classifier", &self.classifier)
            .field("executable", &self.executable)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::CommandSet;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingClient {
        sent: Mutex<Vec<CommandRecord>>,
    }

    impl TelemetryClient for RecordingClient {
        fn send(&self, record: CommandRecord) {
            self.sent.lock().push(record);
        }
    }

    fn tracker(executable: &str) -> (Tracker, Arc<RecordingClient>) {
        let client = Arc::new(RecordingClient::default());
        let tracker = Tracker::new(CommandClassifier::new(CommandSet::default()), client.clone())
            .with_executable(executable);
        (tracker, client)
    }

    #[test]
    fn test_backend_suffix() {
        assert!(is_invoked_as_cli_backend("/usr/local/bin/docker-backend"));
        assert!(is_invoked_as_cli_backend("-backend"));
        assert!(!is_invoked_as_cli_backend("/usr/local/bin/docker"));
        assert!(!is_invoked_as_cli_backend("docker-backend.exe"));
        assert!(!is_invoked_as_cli_backend("docker-Backend"));
    }

    #[test]
    fn test_track_sends_classified_command() {
        let (tracker, client) = tracker("/usr/bin/composescope");
        tracker.track("prod", &["compose", "up", "-d", "web"], Status::Success);

        let sent = client.sent.lock();
        assert_eq!(sent.len(), 1);
        assert_eq!(
            sent[0],
            CommandRecord::new(
                "compose up".to_string(),
                "prod".to_string(),
                Source::Cli,
                Status::Success
            )
        );
    }

    #[test]
    fn test_new_reads_current_executable() {
        // The test harness binary is not a backend process
        let client = Arc::new(RecordingClient::default());
        let tracker = Tracker::new(CommandClassifier::new(CommandSet::default()), client.clone());
        tracker.track("prod", &["compose", "ps"], Status::Success);
        assert_eq!(client.sent.lock().len(), 1);
    }

    #[test]
    fn test_track_skips_backend_process() {
        let (tracker, client) = tracker("/opt/bin/composescope-backend");
        tracker.track("prod", &["compose", "up"], Status::Success);
        tracker.track("prod", &["--help"], Status::Failure);
        assert!(client.sent.lock().is_empty());
    }

    #[test]
    fn test_track_skips_unclassified() {
        let (tracker, client) = tracker("composescope");
        tracker.track("prod", &["nginx", "/etc/passwd"], Status::Success);
        let empty: [&str; 0] = [];
        tracker.track("prod", &empty, Status::Success);
        assert!(client.sent.lock().is_empty());
    }

    #[test]
    fn test_track_carries_status() {
        let (tracker, client) = tracker("composescope");
        tracker.track("default", &["logs", "-f", "web"], Status::Canceled);
        let sent = client.sent.lock();
        assert_eq!(sent[0].command, "logs");
        assert_eq!(sent[0].status, Status::Canceled);
    }
}
