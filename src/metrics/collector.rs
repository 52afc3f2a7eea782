// src/metrics/collector.rs
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, IntGaugeVec,
    Opts, Registry, TextEncoder,
};
use std::sync::Arc;
use std::time::Duration;
use anyhow::Result;

pub struct MetricsRegistry {
    registry: Registry,
    collector: Arc<MetricsCollector>,
}

impl MetricsRegistry {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();
        let collector = Arc::new(MetricsCollector::new(&registry)?);

        Ok(Self {
            registry,
            collector,
        })
    }

    pub fn collector(&self) -> Arc<MetricsCollector> {
        self.collector.clone()
    }

    /// Render every registered family in the Prometheus text format.
    pub fn gather(&self) -> Result<Vec<u8>> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(buffer)
    }
}

pub struct MetricsCollector {
    // Check metrics
    pub check_runs_total: IntCounterVec,
    pub check_duration_seconds: HistogramVec,
    pub check_healthy: IntGaugeVec,

    // Delivery metrics
    pub alerts_total: IntCounterVec,
    pub publish_failures_total: IntCounter,

    // Scheduler metrics
    pub active_tests: IntGauge,
    pub registered_tests: IntGauge,
}

impl MetricsCollector {
    pub fn new(registry: &Registry) -> Result<Self> {
        let check_runs_total = IntCounterVec::new(
            Opts::new("monitor_check_runs_total", "Total number of probe invocations"),
            &["check", "status"],
        )?;
        registry.register(Box::new(check_runs_total.clone()))?;

        let check_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "monitor_check_duration_seconds",
                "Probe duration in seconds",
            ),
            &["check"],
        )?;
        registry.register(Box::new(check_duration_seconds.clone()))?;

        let check_healthy = IntGaugeVec::new(
            Opts::new(
                "monitor_check_healthy",
                "Latest check outcome (1=healthy, 0=unhealthy)",
            ),
            &["check"],
        )?;
        registry.register(Box::new(check_healthy.clone()))?;

        let alerts_total = IntCounterVec::new(
            Opts::new("monitor_alerts_total", "Alert notifications by delivery outcome"),
            &["outcome"],
        )?;
        registry.register(Box::new(alerts_total.clone()))?;

        let publish_failures_total = IntCounter::new(
            "monitor_publish_failures_total",
            "Failed result publications",
        )?;
        registry.register(Box::new(publish_failures_total.clone()))?;

        let active_tests =
            IntGauge::new("monitor_active_tests", "Number of scheduled tests currently active")?;
        registry.register(Box::new(active_tests.clone()))?;

        let registered_tests =
            IntGauge::new("monitor_registered_tests", "Number of registered scheduled tests")?;
        registry.register(Box::new(registered_tests.clone()))?;

        Ok(Self {
            check_runs_total,
            check_duration_seconds,
            check_healthy,
            alerts_total,
            publish_failures_total,
            active_tests,
            registered_tests,
        })
    }

    pub fn record_check(&self, check: &str, healthy: bool, duration: Duration) {
        let status = if healthy { "healthy" } else { "unhealthy" };
        self.check_runs_total
            .with_label_values(&[check, status])
            .inc();

        self.check_duration_seconds
            .with_label_values(&[check])
            .observe(duration.as_secs_f64());

        self.check_healthy
            .with_label_values(&[check])
            .set(if healthy { 1 } else { 0 });
    }

    pub fn record_alert(&self, delivered: bool) {
        let outcome = if delivered { "sent" } else { "failed" };
        self.alerts_total.with_label_values(&[outcome]).inc();
    }

    pub fn record_publish_failure(&self) {
        self.publish_failures_total.inc();
    }

    pub fn update_test_counts(&self, active: usize, registered: usize) {
        self.active_tests.set(active as i64);
        self.registered_tests.set(registered as i64);
    }
}
