//! Log retrieval for compose projects running on Kubernetes

use async_trait::async_trait;
use futures::{AsyncBufReadExt, TryStreamExt};
use k8s_openapi::api::core::v1::Pod;
use kube::Api;
use kube::api::{ListParams, LogParams};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use composescope_logs::{LogBackend, LogConsumer, LogError};

/// Label carrying the compose project a pod belongs to
pub const PROJECT_LABEL: &str = "com.docker.compose.project";

/// Label carrying the compose service a pod runs
pub const SERVICE_LABEL: &str = "com.docker.compose.service";

/// Lines in flight between the pod streams and the consumer
const CHANNEL_CAPACITY: usize = 1024;

/// One container log stream to open
#[derive(Clone, Debug, PartialEq, Eq)]
struct StreamTarget {
    pod: String,
    container: Option<String>,
    service: String,
}

enum StreamEvent {
    Line { service: String, line: String },
    Failed(LogError),
}

/// Streams the logs of every container of a project in one namespace
#[derive(Clone)]
pub struct KubeLogBackend {
    client: kube::Client,
    namespace: String,
    tail_lines: Option<i64>,
    timestamps: bool,
}

impl KubeLogBackend {
    pub fn new(client: kube::Client, namespace: impl Into<String>) -> Self {
        Self {
            client,
            namespace: namespace.into(),
            tail_lines: None,
            timestamps: false,
        }
    }

    /// Number of historical lines to fetch per container
    pub fn with_tail_lines(mut self, tail_lines: Option<i64>) -> Self {
        self.tail_lines = tail_lines;
        self
    }

    /// Keep the API server's RFC 3339 timestamp at the start of each line
    pub fn with_timestamps(mut self, timestamps: bool) -> Self {
        self.timestamps = timestamps;
        self
    }

    async fn find_targets(
        &self,
        api: &Api<Pod>,
        project: &str,
    ) -> Result<Vec<StreamTarget>, LogError> {
        let selector = format!("{}={}", PROJECT_LABEL, project);
        let list = api
            .list(&ListParams::default().labels(&selector))
            .await
            .map_err(|e| {
                LogError::backend(
                    format!("failed to list pods for project {} in {}", project, self.namespace),
                    e,
                )
            })?;

        let targets = stream_targets(list.items);
        if targets.is_empty() {
            return Err(LogError::ProjectNotFound(project.to_string()));
        }
        Ok(targets)
    }

    fn log_params(&self, container: Option<String>, follow: bool) -> LogParams {
        LogParams {
            follow,
            container,
            tail_lines: self.tail_lines,
            timestamps: self.timestamps,
            ..Default::default()
        }
    }
}

#[async_trait]
impl LogBackend for KubeLogBackend {
    async fn get_logs(
        &self,
        cancel: &CancellationToken,
        project: &str,
        consumer: &dyn LogConsumer,
        follow: bool,
    ) -> Result<(), LogError> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), &self.namespace);
        // Listing can hang on an unresponsive API server
        let targets = tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            targets = self.find_targets(&api, project) => targets?,
        };
        debug!(project, streams = targets.len(), follow, "starting log streams");

        let (tx, mut rx) = mpsc::channel(CHANNEL_CAPACITY);
        let streams = cancel.child_token();
        let mut tasks = JoinSet::new();

        for target in targets {
            let params = self.log_params(target.container.clone(), follow);
            tasks.spawn(stream_container(
                api.clone(),
                target,
                params,
                tx.clone(),
                streams.clone(),
            ));
        }
        // The channel closes once every stream task has finished
        drop(tx);

        let result = deliver(cancel, &mut rx, consumer).await;

        streams.cancel();
        tasks.abort_all();
        result
    }
}

/// Drive `consumer` from the fan-in channel until the streams end or `cancel` fires
///
/// The consumer is called from this task only, in channel order.
async fn deliver(
    cancel: &CancellationToken,
    rx: &mut mpsc::Receiver<StreamEvent>,
    consumer: &dyn LogConsumer,
) -> Result<(), LogError> {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return Ok(()),

            event = rx.recv() => match event {
                Some(StreamEvent::Line { service, line }) => consumer.log(&service, &line),
                Some(StreamEvent::Failed(err)) => return Err(err),
                None => return Ok(()),
            },
        }
    }
}

/// Build one stream target per container of each pod
fn stream_targets(pods: Vec<Pod>) -> Vec<StreamTarget> {
    let mut targets = Vec::new();

    for pod in pods {
        let Some(pod_name) = pod.metadata.name else {
            continue;
        };
        let service = pod
            .metadata
            .labels
            .as_ref()
            .and_then(|labels| labels.get(SERVICE_LABEL).cloned())
            .unwrap_or_else(|| pod_name.clone());

        let containers: Vec<String> = pod
            .spec
            .map(|spec| spec.containers.into_iter().map(|c| c.name).collect())
            .unwrap_or_default();

        if containers.is_empty() {
            targets.push(StreamTarget {
                pod: pod_name,
                container: None,
                service,
            });
            continue;
        }

        for container in containers {
            targets.push(StreamTarget {
                pod: pod_name.clone(),
                container: Some(container),
                service: service.clone(),
            });
        }
    }

    targets
}

async fn stream_container(
    api: Api<Pod>,
    target: StreamTarget,
    params: LogParams,
    tx: mpsc::Sender<StreamEvent>,
    cancel: CancellationToken,
) {
    let stream = match api.log_stream(&target.pod, &params).await {
        Ok(stream) => stream,
        Err(e) => {
            let err = LogError::backend(format!("failed to open log stream for pod {}", target.pod), e);
            let _ = tx.send(StreamEvent::Failed(err)).await;
            return;
        }
    };

    let mut lines = stream.lines();

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,

            result = lines.try_next() => {
                match result {
                    Ok(Some(line)) => {
                        let event = StreamEvent::Line {
                            service: target.service.clone(),
                            line,
                        };
                        // Receiver gone, nobody left to deliver to
                        if tx.send(event).await.is_err() {
                            break;
                        }
                    }
                    Ok(None) => {
                        debug!(pod = %target.pod, container = ?target.container, "log stream ended");
                        break;
                    }
                    Err(e) => {
                        warn!(pod = %target.pod, error = %e, "log stream interrupted");
                        let err = LogError::backend(
                            format!("log stream for pod {} interrupted", target.pod),
                            e,
                        );
                        let _ = tx.send(StreamEvent::Failed(err)).await;
                        break;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::{Container, PodSpec};
    use composescope_logs::LogBuffer;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use std::collections::BTreeMap;
    use std::time::Duration;

    fn pod(name: &str, service: Option<&str>, containers: &[&str]) -> Pod {
        let mut labels = BTreeMap::new();
        labels.insert(PROJECT_LABEL.to_string(), "shop".to_string());
        if let Some(service) = service {
            labels.insert(SERVICE_LABEL.to_string(), service.to_string());
        }

        Pod {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                labels: Some(labels),
                ..Default::default()
            },
            spec: Some(PodSpec {
                containers: containers
                    .iter()
                    .map(|c| Container {
                        name: c.to_string(),
                        ..Default::default()
                    })
                    .collect(),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_targets_use_service_label() {
        let targets = stream_targets(vec![pod("web-7d9f-abcde", Some("web"), &["web"])]);
        assert_eq!(
            targets,
            vec![StreamTarget {
                pod: "web-7d9f-abcde".to_string(),
                container: Some("web".to_string()),
                service: "web".to_string(),
            }]
        );
    }

    #[test]
    fn test_targets_fall_back_to_pod_name() {
        let targets = stream_targets(vec![pod("worker-0", None, &["worker"])]);
        assert_eq!(targets[0].service, "worker-0");
    }

    #[test]
    fn test_one_target_per_container() {
        let targets = stream_targets(vec![
            pod("web-0", Some("web"), &["app", "proxy"]),
            pod("db-0", Some("db"), &[]),
        ]);
        let got: Vec<_> = targets
            .iter()
            .map(|t| (t.service.as_str(), t.container.as_deref()))
            .collect();
        assert_eq!(
            got,
            vec![("web", Some("app")), ("web", Some("proxy")), ("db", None)]
        );
    }

    #[test]
    fn test_unnamed_pods_are_skipped() {
        let mut unnamed = pod("x", Some("web"), &["web"]);
        unnamed.metadata.name = None;
        assert!(stream_targets(vec![unnamed]).is_empty());
    }

    fn line(service: &str, line: &str) -> StreamEvent {
        StreamEvent::Line {
            service: service.to_string(),
            line: line.to_string(),
        }
    }

    fn delivered(buffer: &LogBuffer) -> Vec<String> {
        buffer
            .all()
            .into_iter()
            .map(|e| format!("{}:{}", e.service, e.line))
            .collect()
    }

    #[tokio::test]
    async fn test_deliver_keeps_channel_order() {
        let (tx, mut rx) = mpsc::channel(8);
        tx.send(line("web", "1")).await.unwrap();
        tx.send(line("db", "2")).await.unwrap();
        tx.send(line("web", "3")).await.unwrap();
        drop(tx);

        let buffer = LogBuffer::new(16);
        deliver(&CancellationToken::new(), &mut rx, &buffer)
            .await
            .unwrap();
        assert_eq!(delivered(&buffer), vec!["web:1", "db:2", "web:3"]);
    }

    #[tokio::test]
    async fn test_deliver_stops_on_stream_failure() {
        let (tx, mut rx) = mpsc::channel(8);
        tx.send(line("web", "before")).await.unwrap();
        tx.send(StreamEvent::Failed(LogError::Backend {
            message: "log stream for pod web-0 interrupted".to_string(),
            source: None,
        }))
        .await
        .unwrap();
        tx.send(line("web", "after")).await.unwrap();

        let buffer = LogBuffer::new(16);
        let err = deliver(&CancellationToken::new(), &mut rx, &buffer)
            .await
            .unwrap_err();
        assert!(matches!(err, LogError::Backend { .. }));
        assert_eq!(delivered(&buffer), vec!["web:before"]);
    }

    #[tokio::test]
    async fn test_deliver_returns_ok_on_cancel() {
        // Sender kept alive so only the cancel can end the loop
        let (_tx, mut rx) = mpsc::channel::<StreamEvent>(8);
        let cancel = CancellationToken::new();
        let stopper = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            stopper.cancel();
        });

        let buffer = LogBuffer::new(16);
        let result = tokio::time::timeout(Duration::from_secs(2), deliver(&cancel, &mut rx, &buffer))
            .await
            .expect("cancel did not end delivery");
        assert!(result.is_ok());
        assert!(buffer.is_empty());
    }

    #[tokio::test]
    async fn test_deliver_returns_ok_when_streams_end() {
        let (tx, mut rx) = mpsc::channel::<StreamEvent>(8);
        drop(tx);
        let buffer = LogBuffer::new(16);
        assert!(
            deliver(&CancellationToken::new(), &mut rx, &buffer)
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn test_cancel_interrupts_pod_listing() {
        // An API server that accepts connections and never answers
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let config = kube::Config::new(format!("http://{}", addr).parse().unwrap());
        let client = kube::Client::try_from(config).unwrap();
        let backend = KubeLogBackend::new(client, "default");

        let cancel = CancellationToken::new();
        let stopper = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            stopper.cancel();
        });

        let buffer = LogBuffer::new(16);
        let result = tokio::time::timeout(
            Duration::from_secs(5),
            backend.get_logs(&cancel, "shop", &buffer, true),
        )
        .await
        .expect("cancel did not interrupt pod listing");
        assert!(result.is_ok());
        assert!(buffer.is_empty());
    }
}
