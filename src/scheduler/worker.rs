// src/scheduler/worker.rs
use crate::alert::{self, AlertSink};
use crate::health::{run_probe, HealthCheck, HealthResult, ResultSnapshot, ResultStore};
use crate::metrics::MetricsCollector;
use crate::publish::ResultPublisher;
use arc_swap::ArcSwapOption;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::time::{sleep, Duration, Instant};
use tracing::{debug, info, warn};

/// Collaborators shared by every worker of a scheduler.
#[derive(Clone, Default)]
pub(crate) struct WorkerContext {
    pub store: ResultStore,
    pub alerts: Option<Arc<dyn AlertSink>>,
    pub publisher: Option<Arc<ResultPublisher>>,
    pub metrics: Option<Arc<MetricsCollector>>,
}

/// Execution loop of one scheduled test.
pub(crate) struct Worker {
    pub name: String,
    pub check: Arc<dyn HealthCheck>,
    pub interval: Duration,
    pub active: Arc<AtomicBool>,
    pub last_result: Arc<ArcSwapOption<HealthResult>>,
    pub ctx: WorkerContext,
}

impl Worker {
    /// Runs cycles until `active` is observed false at the top of a cycle.
    ///
    /// A cycle already sleeping is not interrupted.
    pub async fn run(self) {
        info!(check = %self.name, interval = ?self.interval, "Scheduled test started");

        while self.active.load(Ordering::SeqCst) {
            let started = Instant::now();
            self.cycle(started).await;

            let wait = self.interval.saturating_sub(started.elapsed());
            debug!(check = %self.name, ?wait, "sleeping until next cycle");
            sleep(wait).await;
        }

        info!(check = %self.name, "Scheduled test stopped");
    }

    async fn cycle(&self, started: Instant) {
        let result = run_probe(self.check.clone()).await;

        if let Some(metrics) = &self.ctx.metrics {
            metrics.record_check(&self.name, result.healthy, started.elapsed());
        }

        self.last_result.store(Some(Arc::new(result.clone())));
        self.ctx.store.record(&self.name, result.clone());

        if let Some(publisher) = &self.ctx.publisher {
            publisher.publish(&self.ctx.store.snapshot(), None).await;
        }

        if result.healthy {
            debug!(check = %self.name, message = %result.message, "check healthy");
            return;
        }

        warn!(check = %self.name, message = %result.message, "check unhealthy");
        if let Some(sink) = &self.ctx.alerts {
            let snapshot = ResultSnapshot::single(self.name.as_str(), result);
            alert::dispatch(sink.as_ref(), &snapshot, self.ctx.metrics.as_deref()).await;
        }
    }
}
