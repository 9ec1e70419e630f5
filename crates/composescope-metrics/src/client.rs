use std::time::Duration;

use composescope_types::CommandRecord;
use tokio_util::task::TaskTracker;
use tracing::debug;

/// Default analytics endpoint
pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:9119/usage";

/// Default upper bound for a single delivery attempt
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(500);

/// Accepts usage records for best-effort delivery
///
/// Implementations must not block the caller and must never report delivery
/// failures back to it.
pub trait TelemetryClient: Send + Sync {
    fn send(&self, record: CommandRecord);
}

/// Posts usage records as JSON from a detached task
#[derive(Clone, Debug)]
pub struct HttpTelemetryClient {
    http: reqwest::Client,
    endpoint: String,
    pending: TaskTracker,
}

impl HttpTelemetryClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                debug!(error = %e, "falling back to default http client");
                reqwest::Client::new()
            });

        Self {
            http,
            endpoint: endpoint.into(),
            pending: TaskTracker::new(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Give sends still in flight up to `limit` to finish before exit
    ///
    /// Returns whether everything finished in time.
    pub async fn wait_for_pending(&self, limit: Duration) -> bool {
        self.pending.close();
        tokio::time::timeout(limit, self.pending.wait()).await.is_ok()
    }
}

impl Default for HttpTelemetryClient {
    fn default() -> Self {
        Self::new(DEFAULT_ENDPOINT, DEFAULT_TIMEOUT)
    }
}

impl TelemetryClient for HttpTelemetryClient {
    fn send(&self, record: CommandRecord) {
        // Outside a runtime there is nothing to run the send on
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            debug!(command = %record.command, "no async runtime, dropping usage record");
            return;
        };

        let http = self.http.clone();
        let endpoint = self.endpoint.clone();

        // Nobody awaits the handle; runtime shutdown cancels a send still in flight
        self.pending.spawn_on(
            async move {
                if let Err(e) = post_record(&http, &endpoint, &record).await {
                    debug!(
                        error = %e,
                        command = %record.command,
                        "usage record not delivered"
                    );
                }
            },
            &runtime,
        );
    }
}

async fn post_record(
    http: &reqwest::Client,
    endpoint: &str,
    record: &CommandRecord,
) -> Result<(), reqwest::Error> {
    http.post(endpoint)
        .json(record)
        .send()
        .await?
        .error_for_status()?;
    Ok(())
}

/// Discards every record
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopTelemetryClient;

impl TelemetryClient for NoopTelemetryClient {
    fn send(&self, record: CommandRecord) {
        debug!(command = %record.command, "telemetry disabled, dropping usage record");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use composescope_types::{Source, Status};

    fn record() -> CommandRecord {
        CommandRecord::new("ps".into(), "default".into(), Source::Cli, Status::Success)
    }

    #[test]
    fn test_send_without_runtime_does_not_panic() {
        let client = HttpTelemetryClient::default();
        client.send(record());
    }

    #[tokio::test]
    async fn test_send_to_unreachable_endpoint_returns_immediately() {
        // Port 9 (discard) on loopback is not expected to run an HTTP server
        let client = HttpTelemetryClient::new("http://127.0.0.1:9/usage", Duration::from_millis(50));
        let started = std::time::Instant::now();
        client.send(record());
        assert!(started.elapsed() < Duration::from_millis(250));
    }

    #[tokio::test]
    async fn test_wait_for_pending_is_bounded() {
        let client = HttpTelemetryClient::new("http://127.0.0.1:9/usage", Duration::from_secs(5));
        client.send(record());
        let started = std::time::Instant::now();
        client.wait_for_pending(Duration::from_millis(100)).await;
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_wait_for_pending_with_nothing_sent() {
        let client = HttpTelemetryClient::default();
        assert!(client.wait_for_pending(Duration::from_millis(10)).await);
    }

    #[test]
    fn test_default_endpoint() {
        assert_eq!(HttpTelemetryClient::default().endpoint(), DEFAULT_ENDPOINT);
    }
}
