// src/probes/login.rs
use crate::health::{HealthCheck, HealthResult};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{COOKIE, SET_COOKIE};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::debug;
use url::Url;

const SESSION_COOKIES: [&str; 2] = ["epimresttoken", "ewtoken"];

#[derive(Debug, Default, Deserialize)]
struct LoginResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    token: Option<TokenBody>,
}

#[derive(Debug, Deserialize)]
struct TokenBody {
    token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LogoutResponse {
    #[serde(default)]
    success: bool,
}

/// Logs in and back out of an enable-api deployment.
pub struct LoginProbe {
    name: String,
    display_name: Option<String>,
    login_url: Url,
    logout_url: Url,
    username: String,
    password: String,
    client: Client,
}

impl LoginProbe {
    pub fn new(
        name: impl Into<String>,
        base_url: &Url,
        username: impl Into<String>,
        password: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let base = base_url.as_str().trim_end_matches('/');
        let login_url = Url::parse(&format!("{base}/enable-api/login"))
            .context("Invalid login URL")?;
        let logout_url = Url::parse(&format!("{base}/enable-api/logout"))
            .context("Invalid logout URL")?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            name: name.into(),
            display_name: None,
            login_url,
            logout_url,
            username: username.into(),
            password: password.into(),
            client,
        })
    }

    pub fn with_display_name(mut self, display_name: Option<String>) -> Self {
        self.display_name = display_name;
        self
    }

    async fn login(&self) -> Result<(LoginResponse, Vec<String>)> {
        let response = self
            .client
            .post(self.login_url.clone())
            .json(&json!({"login": self.username, "password": self.password}))
            .send()
            .await?
            .error_for_status()?;

        let set_cookies: Vec<String> = response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .map(str::to_string)
            .collect();

        let body = response
            .json::<LoginResponse>()
            .await
            .context("Invalid login response")?;

        Ok((body, set_cookies))
    }

    async fn logout(&self, cookies: &[String]) -> Result<LogoutResponse> {
        let mut request = self
            .client
            .post(self.logout_url.clone())
            .json(&json!({"login": self.username}));
        if !cookies.is_empty() {
            request = request.header(COOKIE, cookies.join("; "));
        }

        let body = request
            .send()
            .await?
            .error_for_status()?
            .json::<LogoutResponse>()
            .await
            .context("Invalid logout response")?;

        Ok(body)
    }
}

/// Session cookies to replay on logout, taken from `Set-Cookie` headers or,
/// when the server sent none, from the token in the login body.
fn session_cookies(set_cookies: &[String], body: &LoginResponse) -> Vec<String> {
    if set_cookies.is_empty() {
        return body
            .token
            .as_ref()
            .and_then(|t| t.token.as_deref())
            .map(|token| vec![format!("epimresttoken={token}")])
            .unwrap_or_default();
    }

    let pairs: Vec<(&str, &str)> = set_cookies
        .iter()
        .filter_map(|header| header.split(';').next())
        .filter_map(|pair| pair.split_once('='))
        .map(|(k, v)| (k.trim(), v.trim()))
        .collect();

    SESSION_COOKIES
        .iter()
        .filter_map(|wanted| {
            pairs
                .iter()
                .rev()
                .find(|(name, _)| name == wanted)
                .map(|(name, value)| format!("{name}={value}"))
        })
        .collect()
}

#[async_trait]
impl HealthCheck for LoginProbe {
    fn name(&self) -> &str {
        &self.name
    }

    fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    async fn check(&self) -> Result<HealthResult> {
        let (body, set_cookies) = self.login().await?;

        if !body.success {
            let reason = body.error.as_deref().unwrap_or("Login failed");
            return Ok(HealthResult::unhealthy(format!("Login failed: {reason}")));
        }

        let cookies = session_cookies(&set_cookies, &body);
        debug!(check = %self.name, cookies = cookies.len(), "logged in");

        let logout = self.logout(&cookies).await?;
        if !logout.success {
            return Ok(HealthResult::unhealthy(
                "Logout failed or you are already logged out",
            ));
        }

        Ok(HealthResult::healthy("Login/logout successful"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::run_probe;
    use mockito::{Matcher, Server};
    use std::sync::Arc;

    fn probe(server: &Server) -> LoginProbe {
        let base = Url::parse(&format!("{}/", server.url())).unwrap();
        LoginProbe::new("login_check", &base, "user", "pass", Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_login_logout_success() {
        let mut server = Server::new_async().await;
        let login = server
            .mock("POST", "/enable-api/login")
            .match_body(Matcher::Json(json!({"login": "user", "password": "pass"})))
            .with_header("set-cookie", "epimresttoken=TOKEN; Path=/")
            .with_header("set-cookie", "ewtoken=EWTOKEN; Path=/")
            .with_body(r#"{"message": "enjoy your token", "success": true}"#)
            .expect(1)
            .create_async()
            .await;
        let logout = server
            .mock("POST", "/enable-api/logout")
            .match_header("cookie", "epimresttoken=TOKEN; ewtoken=EWTOKEN")
            .match_body(Matcher::Json(json!({"login": "user"})))
            .with_body(r#"{"message": "You are logged out", "success": true}"#)
            .expect(1)
            .create_async()
            .await;

        let result = probe(&server).check().await.unwrap();

        assert_eq!(result, HealthResult::healthy("Login/logout successful"));
        login.assert_async().await;
        logout.assert_async().await;
    }

    #[tokio::test]
    async fn test_logout_success_false() {
        let mut server = Server::new_async().await;
        let _login = server
            .mock("POST", "/enable-api/login")
            .with_header("set-cookie", "epimresttoken=TOKEN; Path=/")
            .with_body(r#"{"success": true}"#)
            .create_async()
            .await;
        let logout = server
            .mock("POST", "/enable-api/logout")
            .match_header("cookie", "epimresttoken=TOKEN")
            .with_body(r#"{"message": "already logged out?", "success": false}"#)
            .expect(1)
            .create_async()
            .await;

        let result = probe(&server).check().await.unwrap();

        assert_eq!(
            result,
            HealthResult::unhealthy("Logout failed or you are already logged out")
        );
        logout.assert_async().await;
    }

    #[tokio::test]
    async fn test_login_failure_skips_logout() {
        let mut server = Server::new_async().await;
        let _login = server
            .mock("POST", "/enable-api/login")
            .with_body(r#"{"error": "unauthorized please see enable-api logs", "success": false}"#)
            .create_async()
            .await;
        let logout = server
            .mock("POST", "/enable-api/logout")
            .expect(0)
            .create_async()
            .await;

        let result = probe(&server).check().await.unwrap();

        assert_eq!(
            result,
            HealthResult::unhealthy("Login failed: unauthorized please see enable-api logs")
        );
        logout.assert_async().await;
    }

    #[tokio::test]
    async fn test_logout_http_error_is_unhealthy() {
        let mut server = Server::new_async().await;
        let _login = server
            .mock("POST", "/enable-api/login")
            .with_header("set-cookie", "epimresttoken=TOKEN; Path=/")
            .with_header("set-cookie", "ewtoken=EWTOKEN; Path=/")
            .with_body(r#"{"success": true}"#)
            .create_async()
            .await;
        let logout = server
            .mock("POST", "/enable-api/logout")
            .match_header("cookie", "epimresttoken=TOKEN; ewtoken=EWTOKEN")
            .with_status(500)
            .expect(1)
            .create_async()
            .await;

        let result = run_probe(Arc::new(probe(&server))).await;

        assert!(!result.healthy);
        assert!(result.message.contains("500"));
        logout.assert_async().await;
    }

    #[tokio::test]
    async fn test_unreachable_server_is_unhealthy() {
        let base = Url::parse("http://127.0.0.1:1/").unwrap();
        let probe =
            LoginProbe::new("login_check", &base, "user", "pass", Duration::from_secs(2)).unwrap();

        let result = run_probe(Arc::new(probe)).await;
        assert!(!result.healthy);
        assert!(!result.message.is_empty());
    }

    #[test]
    fn test_token_from_body_when_no_cookie_headers() {
        let body: LoginResponse =
            serde_json::from_value(json!({"success": true, "token": {"token": "abc"}})).unwrap();
        assert_eq!(session_cookies(&[], &body), vec!["epimresttoken=abc".to_string()]);
    }

    #[test]
    fn test_unrelated_cookies_are_ignored() {
        let headers = vec![
            "JSESSIONID=zzz; Path=/".to_string(),
            "ewtoken=EW; HttpOnly".to_string(),
        ];
        let body = LoginResponse::default();
        assert_eq!(session_cookies(&headers, &body), vec!["ewtoken=EW".to_string()]);
    }
}
