// tests/common/mod.rs
#![allow(dead_code)]

use async_trait::async_trait;
use service_monitor::alert::{AlertError, AlertSink};
use service_monitor::health::{HealthCheck, HealthResult, ResultSnapshot};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

type Outcome = Box<dyn Fn(usize) -> anyhow::Result<HealthResult> + Send + Sync>;

/// Probe that counts invocations and tracks how many run at once.
pub struct CountingProbe {
    name: String,
    delay: Duration,
    outcome: Outcome,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl CountingProbe {
    pub fn healthy(name: &str) -> Self {
        Self::with_outcome(name, |_| Ok(HealthResult::healthy("ok")))
    }

    pub fn with_outcome<F>(name: &str, outcome: F) -> Self
    where
        F: Fn(usize) -> anyhow::Result<HealthResult> + Send + Sync + 'static,
    {
        Self {
            name: name.to_string(),
            delay: Duration::ZERO,
            outcome: Box::new(outcome),
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HealthCheck for CountingProbe {
    fn name(&self) -> &str {
        &self.name
    }

    async fn check(&self) -> anyhow::Result<HealthResult> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        (self.outcome)(call)
    }
}

/// Alert sink that keeps every snapshot it receives.
#[derive(Default)]
pub struct RecordingSink {
    sent: Mutex<Vec<ResultSnapshot>>,
    fail: bool,
}

impl RecordingSink {
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<ResultSnapshot> {
        self.sent.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl AlertSink for RecordingSink {
    async fn send(&self, snapshot: &ResultSnapshot) -> Result<(), AlertError> {
        self.sent.lock().unwrap().push(snapshot.clone());
        if self.fail {
            return Err(AlertError::Rejected("webhook unavailable".into()));
        }
        Ok(())
    }
}
