// ────────────────────────────────
// src/server/api.rs
// Thin control surface over the scheduler, aggregator and result store.
// ────────────────────────────────

use crate::aggregate::Aggregator;
use crate::alert::{AlertSink, WebhookAlerter};
use crate::config::interval_from_secs;
use crate::health::{HealthCheck, ResultSnapshot};
use crate::probes::ConfiguredCheck;
use crate::publish::{ResultPublisher, ResultsPayload};
use crate::scheduler::{Scheduler, TestInfo};
use hyper::header::CONTENT_TYPE;
use hyper::{Body, Method, Request, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::info;
use url::Url;

/// Poll cadence suggested to dashboards when nothing is scheduled.
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Not found")]
    NotFound,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<hyper::http::Error> for ApiError {
    fn from(err: hyper::http::Error) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<ApiError> for Response<Body> {
    fn from(err: ApiError) -> Self {
        let status = match err {
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = serde_json::json!({ "error": err.to_string() }).to_string();
        let mut response = Response::new(Body::from(body));
        *response.status_mut() = status;
        response
            .headers_mut()
            .insert(CONTENT_TYPE, hyper::header::HeaderValue::from_static("application/json"));
        response
    }
}

#[derive(Debug, Default, Deserialize)]
struct CheckRequest {
    #[serde(default)]
    webhook_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct StartRequest {
    #[serde(default)]
    interval_secs: Option<f64>,
}

#[derive(Debug, Serialize)]
struct Dashboard {
    scheduler_running: bool,
    poll_interval_ms: u64,
    results: ResultSnapshot,
    error: Option<String>,
    tests: Vec<TestInfo>,
}

pub struct MonitorApi {
    scheduler: Arc<Scheduler>,
    aggregator: Aggregator,
    checks: Vec<ConfiguredCheck>,
    publisher: Option<Arc<ResultPublisher>>,
    details_url: Option<Url>,
    alert_timeout: Duration,
    last_error: RwLock<Option<String>>,
}

impl MonitorApi {
    pub fn new(scheduler: Arc<Scheduler>, aggregator: Aggregator, checks: Vec<ConfiguredCheck>) -> Self {
        Self {
            scheduler,
            aggregator,
            checks,
            publisher: None,
            details_url: None,
            alert_timeout: Duration::from_secs(10),
            last_error: RwLock::new(None),
        }
    }

    pub fn with_publisher(mut self, publisher: Option<Arc<ResultPublisher>>) -> Self {
        self.publisher = publisher;
        self
    }

    /// Settings used for webhooks supplied per request on `POST /check`.
    pub fn with_alert_settings(mut self, details_url: Option<Url>, timeout: Duration) -> Self {
        self.details_url = details_url;
        self.alert_timeout = timeout;
        self
    }

    pub async fn handle(&self, req: Request<Body>) -> Result<Response<Body>, ApiError> {
        match (req.method(), req.uri().path()) {
            (&Method::GET, "/") => self.dashboard().await,
            (&Method::GET, "/results") => self.results().await,
            (&Method::POST, "/results") => self.receive_results(req).await,
            (&Method::POST, "/check") => self.run_checks(req).await,
            (&Method::POST, "/schedulers/start") => self.start_schedulers(req).await,
            (&Method::POST, "/schedulers/stop") => self.stop_schedulers().await,
            _ => Err(ApiError::NotFound),
        }
    }

    /// Run every configured check once, as the scheduler-independent path.
    pub async fn run_once(&self, alerts: Option<Arc<dyn AlertSink>>) -> ResultSnapshot {
        let aggregator = match alerts {
            Some(sink) => self.aggregator.clone().with_alerts(Some(sink)),
            None => self.aggregator.clone(),
        };

        let checks: Vec<Arc<dyn HealthCheck>> =
            self.checks.iter().map(|c| c.check.clone()).collect();
        let snapshot = aggregator.run(&checks).await;

        self.scheduler.store().merge(snapshot.clone());
        *self.last_error.write().await = None;

        if let Some(publisher) = &self.publisher {
            publisher.publish(&snapshot, None).await;
        }

        snapshot
    }

    async fn dashboard(&self) -> Result<Response<Body>, ApiError> {
        let poll_interval = self
            .scheduler
            .min_active_interval()
            .unwrap_or(DEFAULT_POLL_INTERVAL);

        let dashboard = Dashboard {
            scheduler_running: self.scheduler.is_any_running(),
            poll_interval_ms: u64::try_from(poll_interval.as_millis()).unwrap_or(u64::MAX),
            results: self.scheduler.store().snapshot(),
            error: self.last_error.read().await.clone(),
            tests: self.scheduler.tests(),
        };
        json_response(StatusCode::OK, &dashboard)
    }

    async fn results(&self) -> Result<Response<Body>, ApiError> {
        let payload = ResultsPayload {
            results: Some(self.scheduler.store().snapshot()),
            error: self.last_error.read().await.clone(),
        };
        json_response(StatusCode::OK, &payload)
    }

    async fn receive_results(&self, req: Request<Body>) -> Result<Response<Body>, ApiError> {
        let payload: ResultsPayload = read_json(req).await?;

        if let Some(results) = payload.results {
            self.scheduler.store().merge(results);
        }
        *self.last_error.write().await = payload.error;

        json_response(StatusCode::OK, &serde_json::json!({"status": "ok"}))
    }

    async fn run_checks(&self, req: Request<Body>) -> Result<Response<Body>, ApiError> {
        let request: CheckRequest = read_json(req).await?;

        let alerts: Option<Arc<dyn AlertSink>> = match request.webhook_url.filter(|u| !u.is_empty()) {
            Some(raw) => {
                let url = Url::parse(&raw)
                    .map_err(|e| ApiError::BadRequest(format!("invalid webhook_url: {e}")))?;
                let alerter = WebhookAlerter::new(url, self.alert_timeout)
                    .map_err(|e| ApiError::Internal(e.to_string()))?
                    .with_details_url(self.details_url.clone());
                Some(Arc::new(alerter) as Arc<dyn AlertSink>)
            }
            None => None,
        };

        let snapshot = self.run_once(alerts).await;
        json_response(StatusCode::OK, &snapshot)
    }

    async fn start_schedulers(&self, req: Request<Body>) -> Result<Response<Body>, ApiError> {
        let request: StartRequest = read_json(req).await?;

        let interval = request
            .interval_secs
            .map(interval_from_secs)
            .transpose()
            .map_err(|e| ApiError::BadRequest(format!("invalid interval_secs: {e}")))?;

        for configured in &self.checks {
            let interval = interval.unwrap_or(configured.interval);
            self.scheduler
                .register(configured.check.clone(), interval)
                .await;
            self.scheduler.start(configured.check.name()).await;
        }

        info!(checks = self.checks.len(), "Schedulers started");
        json_response(StatusCode::OK, &self.scheduler.tests())
    }

    async fn stop_schedulers(&self) -> Result<Response<Body>, ApiError> {
        self.scheduler.stop_all().await;
        info!("Schedulers stopped");
        json_response(StatusCode::OK, &self.scheduler.tests())
    }
}

fn json_response<T: Serialize>(status: StatusCode, value: &T) -> Result<Response<Body>, ApiError> {
    let body = serde_json::to_vec(value)?;
    let response = Response::builder()
        .status(status)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body))?;
    Ok(response)
}

/// Parse a JSON request body; an empty body yields `T::default()`.
async fn read_json<T: DeserializeOwned + Default>(req: Request<Body>) -> Result<T, ApiError> {
    let bytes = hyper::body::to_bytes(req.into_body())
        .await
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }

    serde_json::from_slice(&bytes).map_err(|e| ApiError::BadRequest(e.to_string()))
}
