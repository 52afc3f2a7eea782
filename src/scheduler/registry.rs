// src/scheduler/registry.rs
use super::worker::{Worker, WorkerContext};
use crate::alert::AlertSink;
use crate::health::{HealthCheck, HealthResult, ResultStore};
use crate::metrics::MetricsCollector;
use crate::publish::ResultPublisher;
use arc_swap::{ArcSwap, ArcSwapOption};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Registry entry for one named check.
///
/// `active` and the interval mirror are readable without taking `state`,
/// which serializes every operation on this name.
struct ScheduledTest {
    active: Arc<AtomicBool>,
    display_name: ArcSwap<String>,
    interval_nanos: AtomicU64,
    last_result: Arc<ArcSwapOption<HealthResult>>,
    state: Mutex<TestState>,
}

struct TestState {
    check: Arc<dyn HealthCheck>,
    interval: Duration,
    worker: Option<JoinHandle<()>>,
    // Set once the entry has been removed from the registry.
    retired: bool,
}

impl ScheduledTest {
    fn new(check: Arc<dyn HealthCheck>, interval: Duration) -> Self {
        Self {
            active: Arc::new(AtomicBool::new(false)),
            display_name: ArcSwap::from_pointee(label(check.as_ref())),
            interval_nanos: AtomicU64::new(duration_nanos(interval)),
            last_result: Arc::new(ArcSwapOption::empty()),
            state: Mutex::new(TestState {
                check,
                interval,
                worker: None,
                retired: false,
            }),
        }
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    fn interval(&self) -> Duration {
        Duration::from_nanos(self.interval_nanos.load(Ordering::SeqCst))
    }

    fn set_interval(&self, state: &mut TestState, interval: Duration) {
        state.interval = interval;
        self.interval_nanos
            .store(duration_nanos(interval), Ordering::SeqCst);
    }
}

fn label(check: &dyn HealthCheck) -> String {
    check.display_name().unwrap_or(check.name()).to_string()
}

fn duration_nanos(d: Duration) -> u64 {
    u64::try_from(d.as_nanos()).unwrap_or(u64::MAX)
}

/// Read-only view of a registered test.
#[derive(Debug, Clone, Serialize)]
pub struct TestInfo {
    pub name: String,
    pub display_name: String,
    pub interval_secs: f64,
    pub running: bool,
    pub last_result: Option<HealthResult>,
    /// When the result store last recorded an outcome under this name.
    pub last_updated: Option<DateTime<Utc>>,
}

/// Owns one independent repeating task per registered check.
pub struct Scheduler {
    tests: DashMap<String, Arc<ScheduledTest>>,
    ctx: WorkerContext,
}

impl Scheduler {
    pub fn new(store: ResultStore) -> Self {
        Self {
            tests: DashMap::new(),
            ctx: WorkerContext {
                store,
                ..WorkerContext::default()
            },
        }
    }

    /// Sink invoked with a single-check snapshot for every unhealthy cycle.
    pub fn with_alerts(mut self, alerts: Option<Arc<dyn AlertSink>>) -> Self {
        self.ctx.alerts = alerts;
        self
    }

    pub fn with_publisher(mut self, publisher: Option<Arc<ResultPublisher>>) -> Self {
        self.ctx.publisher = publisher;
        self
    }

    pub fn with_metrics(mut self, metrics: Option<Arc<MetricsCollector>>) -> Self {
        self.ctx.metrics = metrics;
        self
    }

    pub fn store(&self) -> &ResultStore {
        &self.ctx.store
    }

    /// Insert or replace the test named `check.name()`.
    ///
    /// A running predecessor is stopped and its task joined before the
    /// replacement takes effect. The replacement starts out inactive.
    pub async fn register(&self, check: Arc<dyn HealthCheck>, interval: Duration) {
        let name = check.name().to_string();

        loop {
            let test = self
                .tests
                .entry(name.clone())
                .or_insert_with(|| Arc::new(ScheduledTest::new(check.clone(), interval)))
                .value()
                .clone();

            let mut state = test.state.lock().await;
            if state.retired {
                // Lost a race with `unregister`; the next entry() inserts afresh.
                continue;
            }

            Self::drain(&name, &test, &mut state).await;
            test.display_name.store(Arc::new(label(check.as_ref())));
            state.check = check;
            test.set_interval(&mut state, interval);
            test.last_result.store(None);
            break;
        }

        info!(check = %name, ?interval, "Registered scheduled test");
        self.update_metrics();
    }

    /// Remove a test, stopping and joining its task. Its stored result is dropped.
    pub async fn unregister(&self, name: &str) -> bool {
        let Some((_, test)) = self.tests.remove(name) else {
            return false;
        };

        let mut state = test.state.lock().await;
        state.retired = true;
        Self::drain(name, &test, &mut state).await;
        drop(state);

        self.ctx.store.remove(name);
        info!(check = %name, "Unregistered scheduled test");
        self.update_metrics();
        true
    }

    /// Begin the repeating loop. No-op when unknown or already active.
    pub async fn start(&self, name: &str) {
        let Some(test) = self.get(name) else {
            return;
        };

        let mut state = test.state.lock().await;
        if state.retired || test.is_active() {
            return;
        }

        // A previously stopped loop may still be finishing its last cycle.
        if let Some(handle) = state.worker.take() {
            Self::join(name, handle).await;
        }
        self.spawn_worker(name, &test, &mut state);
        drop(state);

        self.update_metrics();
    }

    /// Mark inactive; the in-flight cycle finishes but no further cycle starts.
    pub async fn stop(&self, name: &str) {
        let Some(test) = self.get(name) else {
            return;
        };

        let _state = test.state.lock().await;
        if test.active.swap(false, Ordering::SeqCst) {
            info!(check = %name, "Stopping scheduled test");
        }
        drop(_state);

        self.update_metrics();
    }

    /// Change the cadence. An active test is restarted at a clean cycle boundary.
    pub async fn set_interval(&self, name: &str, interval: Duration) {
        let Some(test) = self.get(name) else {
            return;
        };

        let mut state = test.state.lock().await;
        if state.retired {
            return;
        }

        test.set_interval(&mut state, interval);
        info!(check = %name, ?interval, "Updated interval");

        if test.is_active() {
            Self::drain(name, &test, &mut state).await;
            self.spawn_worker(name, &test, &mut state);
        }
    }

    pub async fn start_all(&self) {
        for name in self.names() {
            self.start(&name).await;
        }
    }

    pub async fn stop_all(&self) {
        for name in self.names() {
            self.stop(&name).await;
        }
    }

    /// Stop every test and wait until all of their tasks have terminated.
    pub async fn shutdown(&self) {
        for name in self.names() {
            if let Some(test) = self.get(&name) {
                let mut state = test.state.lock().await;
                Self::drain(&name, &test, &mut state).await;
            }
        }
        self.update_metrics();
    }

    pub fn is_any_running(&self) -> bool {
        self.tests.iter().any(|entry| entry.value().is_active())
    }

    /// Smallest interval among active tests, `None` when nothing is active.
    pub fn min_active_interval(&self) -> Option<Duration> {
        self.tests
            .iter()
            .filter(|entry| entry.value().is_active())
            .map(|entry| entry.value().interval())
            .min()
    }

    pub fn is_running(&self, name: &str) -> bool {
        self.get(name).map_or(false, |test| test.is_active())
    }

    pub fn interval(&self, name: &str) -> Option<Duration> {
        self.get(name).map(|test| test.interval())
    }

    pub fn last_result(&self, name: &str) -> Option<HealthResult> {
        self.get(name)
            .and_then(|test| test.last_result.load_full())
            .map(|result| (*result).clone())
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tests.iter().map(|entry| entry.key().clone()).collect();
        names.sort();
        names
    }

    pub fn tests(&self) -> Vec<TestInfo> {
        self.names()
            .into_iter()
            .filter_map(|name| {
                let test = self.get(&name)?;
                Some(TestInfo {
                    display_name: test.display_name.load().as_ref().clone(),
                    interval_secs: test.interval().as_secs_f64(),
                    running: test.is_active(),
                    last_result: test.last_result.load_full().map(|r| (*r).clone()),
                    last_updated: self.ctx.store.get(&name).map(|s| s.updated_at),
                    name,
                })
            })
            .collect()
    }

    fn get(&self, name: &str) -> Option<Arc<ScheduledTest>> {
        self.tests.get(name).map(|entry| entry.value().clone())
    }

    fn spawn_worker(&self, name: &str, test: &ScheduledTest, state: &mut TestState) {
        test.active.store(true, Ordering::SeqCst);

        let worker = Worker {
            name: name.to_string(),
            check: state.check.clone(),
            interval: state.interval,
            active: test.active.clone(),
            last_result: test.last_result.clone(),
            ctx: self.ctx.clone(),
        };
        state.worker = Some(tokio::spawn(worker.run()));
    }

    async fn drain(name: &str, test: &ScheduledTest, state: &mut TestState) {
        test.active.store(false, Ordering::SeqCst);
        if let Some(handle) = state.worker.take() {
            Self::join(name, handle).await;
        }
    }

    async fn join(name: &str, handle: JoinHandle<()>) {
        if let Err(e) = handle.await {
            error!(check = %name, error = %e, "Scheduled test task failed");
        }
    }

    fn update_metrics(&self) {
        if let Some(metrics) = &self.ctx.metrics {
            let active = self.tests.iter().filter(|e| e.value().is_active()).count();
            metrics.update_test_counts(active, self.tests.len());
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        // Let detached loops exit at their next cycle boundary.
        for entry in self.tests.iter() {
            entry.value().active.store(false, Ordering::SeqCst);
        }
    }
}
