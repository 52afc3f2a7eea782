// src/alert/webhook.rs
use super::card::build_card;
use super::{AlertError, AlertSink};
use crate::health::ResultSnapshot;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Posts an Adaptive Card summary to a single webhook URL.
pub struct WebhookAlerter {
    client: Client,
    webhook_url: Url,
    details_url: Option<Url>,
}

impl WebhookAlerter {
    pub fn new(webhook_url: Url, timeout: Duration) -> Result<Self, AlertError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            webhook_url,
            details_url: None,
        })
    }

    /// Link appended to every card so a human can inspect full results.
    pub fn with_details_url(mut self, details_url: Option<Url>) -> Self {
        self.details_url = details_url;
        self
    }

    pub fn webhook_url(&self) -> &Url {
        &self.webhook_url
    }
}

#[async_trait]
impl AlertSink for WebhookAlerter {
    async fn send(&self, snapshot: &ResultSnapshot) -> Result<(), AlertError> {
        let payload = build_card(snapshot, self.details_url.as_ref().map(Url::as_str));

        let response = self
            .client
            .post(self.webhook_url.clone())
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        // Drain the body so the request is fully completed.
        let body = response.text().await?;
        if !status.is_success() {
            return Err(AlertError::Rejected(format!("{status}: {}", body.trim())));
        }

        debug!(url = %self.webhook_url, checks = snapshot.len(), "alert delivered");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::HealthResult;
    use mockito::Matcher;
    use serde_json::json;

    #[tokio::test]
    async fn test_posts_card_as_json() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/hook")
            .match_header("content-type", "application/json")
            .match_body(Matcher::PartialJson(json!({
                "body": {"attachments": [{
                    "contentType": "application/vnd.microsoft.card.adaptive",
                    "content": {"type": "AdaptiveCard", "version": "1.3"}
                }]}
            })))
            .with_status(200)
            .expect(1)
            .create_async()
            .await;

        let url = Url::parse(&format!("{}/hook", server.url())).unwrap();
        let alerter = WebhookAlerter::new(url, Duration::from_secs(5))
            .unwrap()
            .with_details_url(Some(Url::parse("http://ui.local/").unwrap()));

        let snapshot = ResultSnapshot::single("login_check", HealthResult::unhealthy("boom"));
        alerter.send(&snapshot).await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_server_error_is_reported() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/hook")
            .with_status(500)
            .with_body("card schema invalid")
            .create_async()
            .await;

        let url = Url::parse(&format!("{}/hook", server.url())).unwrap();
        let alerter = WebhookAlerter::new(url, Duration::from_secs(5)).unwrap();

        let snapshot = ResultSnapshot::single("a", HealthResult::unhealthy("fail"));
        let err = alerter.send(&snapshot).await.unwrap_err();
        match err {
            AlertError::Rejected(reason) => {
                assert!(reason.contains("500"));
                assert!(reason.contains("card schema invalid"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
