// src/config/mod.rs
mod models;

pub use models::*;

use anyhow::{Context, Result};
use std::path::Path;
use url::Url;

/// Load configuration from a file (YAML or JSON), then apply environment overrides.
pub async fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let path = path.as_ref();
    let contents = tokio::fs::read_to_string(path)
        .await
        .context("Failed to read config file")?;

    let is_yaml = matches!(
        path.extension().and_then(|s| s.to_str()),
        Some("yaml") | Some("yml")
    );
    let mut config = parse_config(&contents, is_yaml)?;

    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;

    config.validate()?;
    Ok(config)
}

pub fn parse_config(contents: &str, is_yaml: bool) -> Result<Config> {
    let config = if is_yaml {
        serde_yaml::from_str(contents).context("Failed to parse YAML config")?
    } else {
        serde_json::from_str(contents).context("Failed to parse JSON config")?
    };
    Ok(config)
}

/// Deployment settings that are usually injected through the environment.
///
/// Empty values are ignored. A login check is created from the environment
/// only when base URL, username and password are all present.
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
    let url_var = |key: &str| -> Result<Option<Url>> {
        var(key)
            .map(|v| Url::parse(&v).with_context(|| format!("{key} is not a valid URL")))
            .transpose()
    };

    if let Some(url) = url_var("WEBHOOK_URL")? {
        config.alerts.webhook_url = Some(url);
    }
    if let Some(url) = url_var("UI_URL")? {
        config.alerts.details_url = Some(url);
    }
    if let Some(url) = url_var("RESULTS_URL")? {
        config.publish.results_url = Some(url);
    }

    let base_url = url_var("LOGIN_BASE_URL")?;
    let username = var("LOGIN_USERNAME");
    let password = var("LOGIN_PASSWORD");

    match config.checks.login.as_mut() {
        Some(login) => {
            if let Some(url) = base_url {
                login.base_url = url;
            }
            if let Some(username) = username {
                login.username = username;
            }
            if let Some(password) = password {
                login.password = password;
            }
        }
        None => {
            if let (Some(base_url), Some(username), Some(password)) = (base_url, username, password) {
                config.checks.login = Some(LoginCheckConfig {
                    name: "login_check".to_string(),
                    display_name: Some("Login Check".to_string()),
                    base_url,
                    username,
                    password,
                    interval_secs: None,
                    timeout_secs: 10,
                });
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::time::Duration;

    const YAML: &str = r#"
server:
  listen: "127.0.0.1:8000"
alerts:
  webhook_url: "http://example.com/webhook"
scheduler:
  default_interval_secs: 30
checks:
  login:
    base_url: "https://example.com"
    username: "user"
    password: "pass"
    interval_secs: 5
"#;

    #[test]
    fn test_parse_yaml_with_defaults() {
        let config = parse_config(YAML, true).unwrap();
        config.validate().unwrap();

        assert_eq!(config.server.listen.port(), 8000);
        assert_eq!(config.metrics.path, "/metrics");
        assert_eq!(config.publish.timeout_secs, 2);
        assert_eq!(config.scheduler.default_interval().unwrap(), Duration::from_secs(30));

        let login = config.checks.login.unwrap();
        assert_eq!(login.name, "login_check");
        assert_eq!(login.interval(Duration::from_secs(60)).unwrap(), Duration::from_secs(5));
    }

    #[test]
    fn test_parse_json() {
        let config = parse_config(r#"{"scheduler": {"autostart": true}}"#, false).unwrap();
        assert!(config.scheduler.autostart);
        assert!(config.checks.login.is_none());
    }

    #[test]
    fn test_validate_rejects_zero_interval() {
        let mut config = Config::default();
        config.scheduler.default_interval_secs = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_interval_too_large_for_duration() {
        let mut config = Config::default();
        config.scheduler.default_interval_secs = 1e20;
        assert!(config.validate().is_err());
        assert!(config.scheduler.default_interval().is_err());

        let mut config = parse_config(YAML, true).unwrap();
        if let Some(login) = config.checks.login.as_mut() {
            login.interval_secs = Some(1e20);
        }
        assert!(config.validate().is_err());
        let login = config.checks.login.unwrap();
        assert!(login.interval(Duration::from_secs(60)).is_err());
    }

    #[test]
    fn test_validate_rejects_empty_credentials() {
        let mut config = parse_config(YAML, true).unwrap();
        if let Some(login) = config.checks.login.as_mut() {
            login.password.clear();
        }
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_creates_login_check() {
        let env: HashMap<&str, &str> = [
            ("LOGIN_BASE_URL", "https://epim.example.com"),
            ("LOGIN_USERNAME", "monitor"),
            ("LOGIN_PASSWORD", "secret"),
            ("WEBHOOK_URL", ""),
            ("UI_URL", "http://localhost:5000"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        apply_env_overrides(&mut config, |k| env.get(k).map(|v| v.to_string())).unwrap();

        assert!(config.alerts.webhook_url.is_none());
        assert_eq!(
            config.alerts.details_url.as_ref().map(Url::as_str),
            Some("http://localhost:5000/")
        );
        let login = config.checks.login.unwrap();
        assert_eq!(login.username, "monitor");
        assert_eq!(login.base_url.as_str(), "https://epim.example.com/");
    }

    #[test]
    fn test_env_rejects_bad_url() {
        let mut config = Config::default();
        let result = apply_env_overrides(&mut config, |k| {
            (k == "WEBHOOK_URL").then(|| "not a url".to_string())
        });
        assert!(result.is_err());
    }
}
