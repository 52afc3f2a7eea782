// src/publish/publisher.rs
use crate::health::ResultSnapshot;
use crate::metrics::MetricsCollector;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Wire shape shared by the publication sink and the `/results` endpoints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultsPayload {
    #[serde(default)]
    pub results: Option<ResultSnapshot>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("Result publication failed: {0}")]
    Request(#[from] reqwest::Error),
}

/// Pushes snapshots to an external results-consuming endpoint.
pub struct ResultPublisher {
    client: Client,
    endpoint: Url,
    metrics: Option<Arc<MetricsCollector>>,
}

impl ResultPublisher {
    pub fn new(endpoint: Url, timeout: Duration) -> Result<Self, PublishError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            endpoint,
            metrics: None,
        })
    }

    pub fn with_metrics(mut self, metrics: Option<Arc<MetricsCollector>>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Publish a snapshot; empty snapshots are skipped and failures are only logged.
    pub async fn publish(&self, results: &ResultSnapshot, error: Option<String>) {
        if results.is_empty() {
            return;
        }

        let payload = ResultsPayload {
            results: Some(results.clone()),
            error,
        };

        match self.try_publish(&payload).await {
            Ok(()) => debug!(endpoint = %self.endpoint, checks = results.len(), "results published"),
            Err(e) => {
                warn!(endpoint = %self.endpoint, error = %e, "Failed to publish results");
                if let Some(metrics) = &self.metrics {
                    metrics.record_publish_failure();
                }
            }
        }
    }

    async fn try_publish(&self, payload: &ResultsPayload) -> Result<(), PublishError> {
        self.client
            .post(self.endpoint.clone())
            .json(payload)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::HealthResult;
    use crate::metrics::MetricsRegistry;
    use mockito::Matcher;
    use serde_json::json;

    #[tokio::test]
    async fn test_publishes_results_payload() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/results")
            .match_body(Matcher::Json(json!({
                "results": {"login_check": {"healthy": true, "message": "ok"}},
                "error": null
            })))
            .with_status(200)
            .expect(1)
            .create_async()
            .await;

        let url = Url::parse(&format!("{}/results", server.url())).unwrap();
        let publisher = ResultPublisher::new(url, Duration::from_secs(2)).unwrap();

        let snapshot = ResultSnapshot::single("login_check", HealthResult::healthy("ok"));
        publisher.publish(&snapshot, None).await;

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_empty_snapshot_is_not_sent() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/results")
            .expect(0)
            .create_async()
            .await;

        let url = Url::parse(&format!("{}/results", server.url())).unwrap();
        let publisher = ResultPublisher::new(url, Duration::from_secs(2)).unwrap();
        publisher.publish(&ResultSnapshot::new(), None).await;

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_failure_is_counted_not_raised() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/results")
            .with_status(503)
            .create_async()
            .await;

        let registry = MetricsRegistry::new().unwrap();
        let metrics = registry.collector();
        let url = Url::parse(&format!("{}/results", server.url())).unwrap();
        let publisher = ResultPublisher::new(url, Duration::from_secs(2))
            .unwrap()
            .with_metrics(Some(metrics.clone()));

        let snapshot = ResultSnapshot::single("a", HealthResult::unhealthy("fail"));
        publisher.publish(&snapshot, None).await;

        assert_eq!(metrics.publish_failures_total.get(), 1);
    }
}
