// src/probes/mod.rs
mod login;

pub use login::LoginProbe;

use crate::config::ChecksConfig;
use crate::health::HealthCheck;
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;

/// A check built from configuration together with its own cadence.
#[derive(Clone)]
pub struct ConfiguredCheck {
    pub check: Arc<dyn HealthCheck>,
    pub interval: Duration,
}

pub fn from_config(checks: &ChecksConfig, default_interval: Duration) -> Result<Vec<ConfiguredCheck>> {
    let mut configured = Vec::new();

    if let Some(login) = &checks.login {
        let probe = LoginProbe::new(
            login.name.clone(),
            &login.base_url,
            login.username.clone(),
            login.password.clone(),
            login.timeout(),
        )?
        .with_display_name(login.display_name.clone());

        configured.push(ConfiguredCheck {
            check: Arc::new(probe),
            interval: login.interval(default_interval)?,
        });
    }

    Ok(configured)
}
