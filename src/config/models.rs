// src/config/models.rs
use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub metrics: MetricsConfig,
    pub alerts: AlertConfig,
    pub publish: PublishConfig,
    pub scheduler: SchedulerConfig,
    pub checks: ChecksConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([0, 0, 0, 0], 8080)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub port: u16,
    pub path: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: 9090,
            path: "/metrics".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    pub webhook_url: Option<Url>,
    /// Link to the results UI appended to every alert card.
    pub details_url: Option<Url>,
    pub timeout_secs: u64,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            details_url: None,
            timeout_secs: 10,
        }
    }
}

impl AlertConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PublishConfig {
    pub results_url: Option<Url>,
    pub timeout_secs: u64,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            results_url: None,
            timeout_secs: 2,
        }
    }
}

impl PublishConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub default_interval_secs: f64,
    /// Start every configured check as soon as the process is up.
    pub autostart: bool,
    /// Run one batch of all checks at startup.
    pub run_on_startup: bool,
    /// How long shutdown waits for workers to finish their current cycle.
    pub shutdown_grace_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            default_interval_secs: 60.0,
            autostart: false,
            run_on_startup: true,
            shutdown_grace_secs: 5,
        }
    }
}

impl SchedulerConfig {
    pub fn default_interval(&self) -> Result<Duration> {
        interval_from_secs(self.default_interval_secs)
            .context("scheduler.default_interval_secs")
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChecksConfig {
    pub login: Option<LoginCheckConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginCheckConfig {
    #[serde(default = "default_login_name")]
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    pub base_url: Url,
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub interval_secs: Option<f64>,
    #[serde(default = "default_probe_timeout")]
    pub timeout_secs: u64,
}

fn default_login_name() -> String {
    "login_check".to_string()
}

fn default_probe_timeout() -> u64 {
    10
}

impl LoginCheckConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn interval(&self, fallback: Duration) -> Result<Duration> {
        match self.interval_secs {
            Some(secs) => interval_from_secs(secs).context("checks.login.interval_secs"),
            None => Ok(fallback),
        }
    }
}

/// Converts a configured cadence, rejecting values that are not positive or
/// do not fit in a `Duration`.
pub fn interval_from_secs(secs: f64) -> Result<Duration> {
    if !(secs.is_finite() && secs > 0.0) {
        bail!("interval must be a positive number of seconds, got {secs}");
    }
    Duration::try_from_secs_f64(secs)
        .map_err(|e| anyhow!("interval of {secs}s is out of range: {e}"))
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        self.scheduler.default_interval()?;

        if self.alerts.timeout_secs == 0 {
            bail!("alerts.timeout_secs must be positive");
        }

        if self.publish.timeout_secs == 0 {
            bail!("publish.timeout_secs must be positive");
        }

        if self.metrics.enabled && !self.metrics.path.starts_with('/') {
            bail!("metrics.path must start with '/'");
        }

        if let Some(login) = &self.checks.login {
            if login.name.trim().is_empty() {
                bail!("checks.login.name must not be empty");
            }
            if login.username.is_empty() || login.password.is_empty() {
                bail!("checks.login requires username and password");
            }
            if let Some(secs) = login.interval_secs {
                interval_from_secs(secs).context("checks.login.interval_secs")?;
            }
            if login.timeout_secs == 0 {
                bail!("checks.login.timeout_secs must be positive");
            }
        }

        Ok(())
    }
}
