// src/aggregate/aggregator.rs
use crate::alert::{self, AlertSink};
use crate::health::{run_probe, HealthCheck, ResultSnapshot};
use crate::metrics::MetricsCollector;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

/// Runs an ad-hoc batch of checks once and raises at most one alert.
#[derive(Clone, Default)]
pub struct Aggregator {
    alerts: Option<Arc<dyn AlertSink>>,
    metrics: Option<Arc<MetricsCollector>>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_alerts(mut self, alerts: Option<Arc<dyn AlertSink>>) -> Self {
        self.alerts = alerts;
        self
    }

    pub fn with_metrics(mut self, metrics: Option<Arc<MetricsCollector>>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Execute every check in order. A failing probe never stops the batch.
    ///
    /// When any entry is unhealthy the configured sink receives the whole
    /// snapshot in a single notification.
    pub async fn run(&self, checks: &[Arc<dyn HealthCheck>]) -> ResultSnapshot {
        let batch = Uuid::new_v4();
        let mut snapshot = ResultSnapshot::new();

        for check in checks {
            let started = Instant::now();
            let result = run_probe(check.clone()).await;

            if let Some(metrics) = &self.metrics {
                metrics.record_check(check.name(), result.healthy, started.elapsed());
            }
            if !result.healthy {
                warn!(%batch, check = %check.name(), message = %result.message, "check unhealthy");
            }

            snapshot.insert(check.name(), result);
        }

        let unhealthy = snapshot.iter().filter(|(_, r)| !r.healthy).count();
        info!(
            %batch,
            "Batch complete: {} healthy, {} unhealthy",
            snapshot.len() - unhealthy,
            unhealthy
        );

        if unhealthy > 0 {
            if let Some(sink) = &self.alerts {
                alert::dispatch(sink.as_ref(), &snapshot, self.metrics.as_deref()).await;
            }
        }

        snapshot
    }
}
