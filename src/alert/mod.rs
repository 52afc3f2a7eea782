// src/alert/mod.rs
mod card;
mod webhook;

pub use card::{build_card, TextBlock, WebhookPayload};
pub use webhook::WebhookAlerter;

use crate::health::ResultSnapshot;
use crate::metrics::MetricsCollector;
use async_trait::async_trait;
use tracing::warn;

#[derive(Debug, thiserror::Error)]
pub enum AlertError {
    #[error("Alert delivery failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Alert sink rejected notification: {0}")]
    Rejected(String),
}

/// Destination for consolidated alert notifications.
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn send(&self, snapshot: &ResultSnapshot) -> Result<(), AlertError>;
}

/// Send one notification, logging delivery failures instead of returning them.
///
/// Returns whether the notification was delivered.
pub async fn dispatch(
    sink: &dyn AlertSink,
    snapshot: &ResultSnapshot,
    metrics: Option<&MetricsCollector>,
) -> bool {
    let delivered = match sink.send(snapshot).await {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, checks = snapshot.len(), "Failed to deliver alert");
            false
        }
    };

    if let Some(metrics) = metrics {
        metrics.record_alert(delivered);
    }

    delivered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::HealthResult;
    use crate::metrics::MetricsRegistry;

    struct RejectingSink;

    #[async_trait]
    impl AlertSink for RejectingSink {
        async fn send(&self, _snapshot: &ResultSnapshot) -> Result<(), AlertError> {
            Err(AlertError::Rejected("sink offline".into()))
        }
    }

    #[tokio::test]
    async fn test_dispatch_swallows_failure() {
        let registry = MetricsRegistry::new().unwrap();
        let metrics = registry.collector();
        let snapshot = ResultSnapshot::single("a", HealthResult::unhealthy("fail"));

        let delivered = dispatch(&RejectingSink, &snapshot, Some(&metrics)).await;

        assert!(!delivered);
        assert_eq!(metrics.alerts_total.with_label_values(&["failed"]).get(), 1);
    }
}
