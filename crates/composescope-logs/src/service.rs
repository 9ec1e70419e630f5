use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use composescope_types::LogOptions;

use crate::consumer::LogConsumer;
use crate::error::Result;
use crate::filter::FilteredLogConsumer;

/// A source of multiplexed per-service logs for a project
#[async_trait]
pub trait LogBackend: Send + Sync {
    /// Deliver the project's log lines to `consumer`
    ///
    /// With `follow` set the call keeps delivering new lines until `cancel`
    /// fires. Cancellation is a normal return, not an error.
    async fn get_logs(
        &self,
        cancel: &CancellationToken,
        project: &str,
        consumer: &dyn LogConsumer,
        follow: bool,
    ) -> Result<()>;
}

/// Stream a project's logs into `consumer`, limited to `options.services`
///
/// The backend always produces the full stream; filtering happens at the
/// consumer boundary. Backend errors are returned unchanged.
pub async fn logs<B: LogBackend + ?Sized>(
    backend: &B,
    cancel: &CancellationToken,
    project: &str,
    consumer: &dyn LogConsumer,
    options: &LogOptions,
) -> Result<()> {
    if options.services.is_empty() {
        return backend
            .get_logs(cancel, project, consumer, options.follow)
            .await;
    }

    debug!(project, services = ?options.services, "filtering logs by service");
    let filtered = FilteredLogConsumer::new(consumer, options.services.iter().cloned());
    backend
        .get_logs(cancel, project, &filtered, options.follow)
        .await
}
