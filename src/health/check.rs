// src/health/check.rs
use super::HealthResult;
use async_trait::async_trait;
use std::any::Any;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

/// A named probe against an external service.
///
/// `name` is the identity used by the scheduler registry, the result store
/// and alert grouping. Returning `Err` is equivalent to an unhealthy result
/// carrying the error text.
#[async_trait]
pub trait HealthCheck: Send + Sync + 'static {
    fn name(&self) -> &str;

    /// Human-friendly label for scheduler listings; `name` is shown when unset.
    fn display_name(&self) -> Option<&str> {
        None
    }

    async fn check(&self) -> anyhow::Result<HealthResult>;
}

/// Adapts an async closure into a [`HealthCheck`].
pub struct FnCheck<F> {
    name: String,
    display_name: Option<String>,
    probe: F,
}

impl<F, Fut> FnCheck<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<HealthResult>> + Send + 'static,
{
    pub fn new(name: impl Into<String>, probe: F) -> Self {
        Self {
            name: name.into(),
            display_name: None,
            probe,
        }
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }
}

#[async_trait]
impl<F, Fut> HealthCheck for FnCheck<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<HealthResult>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    async fn check(&self) -> anyhow::Result<HealthResult> {
        (self.probe)().await
    }
}

/// Invoke a probe, converting errors and panics into an unhealthy result.
///
/// The probe runs on its own task so a panic stays contained in that task.
pub async fn run_probe(check: Arc<dyn HealthCheck>) -> HealthResult {
    let name = check.name().to_string();
    let outcome = tokio::spawn(async move { check.check().await }).await;

    match outcome {
        Ok(Ok(result)) => {
            debug!(check = %name, healthy = result.healthy, "probe finished");
            result
        }
        Ok(Err(e)) => {
            warn!(check = %name, error = %format!("{e:#}"), "probe failed");
            HealthResult::unhealthy(format!("{e:#}"))
        }
        Err(join_err) => {
            let message = if join_err.is_panic() {
                panic_message(join_err.into_panic())
            } else {
                join_err.to_string()
            };
            warn!(check = %name, error = %message, "probe aborted");
            HealthResult::unhealthy(message)
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "probe panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[tokio::test]
    async fn test_run_probe_passes_result_through() {
        let check = Arc::new(FnCheck::new("ok", || async {
            Ok(HealthResult::healthy("fine"))
        }));

        let result = run_probe(check).await;
        assert_eq!(result, HealthResult::healthy("fine"));
    }

    #[tokio::test]
    async fn test_run_probe_converts_error() {
        let check = Arc::new(FnCheck::new("explode", || async {
            Err::<HealthResult, _>(anyhow!("boom"))
        }));

        let result = run_probe(check).await;
        assert!(!result.healthy);
        assert!(result.message.contains("boom"));
    }

    #[tokio::test]
    async fn test_run_probe_contains_panic() {
        let check = Arc::new(FnCheck::new("panics", || async {
            if true {
                panic!("probe exploded");
            }
            Ok(HealthResult::healthy("unreachable"))
        }));

        let result = run_probe(check).await;
        assert!(!result.healthy);
        assert_eq!(result.message, "probe exploded");
    }

    #[test]
    fn test_display_name_defaults_to_none() {
        let check = FnCheck::new("login_check", || async {
            Ok(HealthResult::healthy("ok"))
        });
        assert_eq!(check.display_name(), None);

        let check = check.with_display_name("Login Check");
        assert_eq!(check.display_name(), Some("Login Check"));
        assert_eq!(check.name(), "login_check");
    }
}
