// src/main.rs
use anyhow::Result;
use hyper::{Body, Request, Response, Server, StatusCode};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};

use service_monitor::{
    aggregate::Aggregator,
    alert::{AlertSink, WebhookAlerter},
    config::{self, Config},
    health::ResultStore,
    metrics::MetricsRegistry,
    probes,
    publish::ResultPublisher,
    scheduler::Scheduler,
    server::{MonitorApi, RequestHandler, ServerBuilder},
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("service_monitor=debug".parse()?)
                .add_directive("hyper=info".parse()?),
        )
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.yaml".to_string());

    info!("Loading configuration from: {}", config_path);
    let config = config::load_config(&config_path).await?;

    // Initialize metrics
    let metrics_registry = MetricsRegistry::new()?;
    let metrics = metrics_registry.collector();

    let alerts = build_alert_sink(&config)?;
    let publisher = match &config.publish.results_url {
        Some(url) => Some(Arc::new(
            ResultPublisher::new(url.clone(), config.publish.timeout())?
                .with_metrics(Some(metrics.clone())),
        )),
        None => None,
    };

    let store = ResultStore::new();
    let scheduler = Arc::new(
        Scheduler::new(store)
            .with_alerts(alerts.clone())
            .with_publisher(publisher.clone())
            .with_metrics(Some(metrics.clone())),
    );

    let checks = probes::from_config(&config.checks, config.scheduler.default_interval()?)?;
    if checks.is_empty() {
        warn!("No health checks configured");
    }
    for configured in &checks {
        scheduler
            .register(configured.check.clone(), configured.interval)
            .await;
    }
    if config.scheduler.autostart {
        scheduler.start_all().await;
    }

    let aggregator = Aggregator::new()
        .with_alerts(alerts)
        .with_metrics(Some(metrics.clone()));
    let api = Arc::new(
        MonitorApi::new(scheduler.clone(), aggregator, checks)
            .with_publisher(publisher)
            .with_alert_settings(config.alerts.details_url.clone(), config.alerts.timeout()),
    );

    if config.scheduler.run_on_startup {
        let api = api.clone();
        tokio::spawn(async move {
            let snapshot = api.run_once(None).await;
            info!(checks = snapshot.len(), "Initial checks complete");
        });
    }

    // Start metrics server if enabled
    if config.metrics.enabled {
        let metrics_addr: SocketAddr = ([0, 0, 0, 0], config.metrics.port).into();
        start_metrics_server(metrics_addr, metrics_registry, config.metrics.path.clone()).await?;
    }

    info!("Starting monitor API on {}", config.server.listen);
    ServerBuilder::new(config.server.listen)
        .with_handler(RequestHandler::new(api))
        .serve_with_shutdown(shutdown_signal())
        .await?;

    // Workers are only checked at cycle boundaries; bound the wait.
    scheduler.stop_all().await;
    if tokio::time::timeout(config.scheduler.shutdown_grace(), scheduler.shutdown())
        .await
        .is_err()
    {
        warn!("Scheduled tests still sleeping at shutdown; exiting without waiting");
    }

    info!("Shutdown complete");
    Ok(())
}

fn build_alert_sink(config: &Config) -> Result<Option<Arc<dyn AlertSink>>> {
    let Some(url) = &config.alerts.webhook_url else {
        info!("No webhook configured; alerts disabled");
        return Ok(None);
    };

    let alerter = WebhookAlerter::new(url.clone(), config.alerts.timeout())?
        .with_details_url(config.alerts.details_url.clone());
    Ok(Some(Arc::new(alerter) as Arc<dyn AlertSink>))
}

async fn start_metrics_server(
    addr: SocketAddr,
    registry: MetricsRegistry,
    path: String,
) -> Result<()> {
    let registry = Arc::new(registry);
    let metrics_path = Arc::new(path);
    let service_path = metrics_path.clone();

    let make_service = hyper::service::make_service_fn(move |_| {
        let registry = registry.clone();
        let path = service_path.clone();

        async move {
            Ok::<_, Infallible>(hyper::service::service_fn(move |req: Request<Body>| {
                let registry = registry.clone();
                let path = path.clone();

                async move {
                    if req.uri().path() != path.as_str() {
                        return Ok::<_, Infallible>(plain_response(StatusCode::NOT_FOUND, "Not Found"));
                    }

                    let response = match registry.gather() {
                        Ok(metrics) => {
                            let mut response = Response::new(Body::from(metrics));
                            response.headers_mut().insert(
                                hyper::header::CONTENT_TYPE,
                                hyper::header::HeaderValue::from_static("text/plain; version=0.0.4"),
                            );
                            response
                        }
                        Err(e) => {
                            error!("Failed to encode metrics: {}", e);
                            plain_response(StatusCode::INTERNAL_SERVER_ERROR, "metrics unavailable")
                        }
                    };
                    Ok::<_, Infallible>(response)
                }
            }))
        }
    });

    let server = Server::try_bind(&addr)?.serve(make_service);

    info!(
        "Metrics server listening on http://{}{}",
        addr,
        metrics_path.as_str()
    );

    tokio::spawn(async move {
        if let Err(e) = server.await {
            error!("Metrics server error: {}", e);
        }
    });

    Ok(())
}

fn plain_response(status: StatusCode, body: &'static str) -> Response<Body> {
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    response
}

// Graceful shutdown handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
