use async_trait::async_trait;
use chrono::Local;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::{error, info};

use super::SenderError;
use crate::models::Alert;
use crate::notifications::email::{render_html, subject};
use crate::notifications::{AlertNotifier, DeliveryReport};

pub const DEFAULT_API_URL: &str = "https://api.resend.com/emails";
pub const DEFAULT_FROM: &str = "onboarding@resend.dev";
const SEND_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Serialize)]
struct EmailRequest<'a> {
    from: &'a str,
    to: &'a str,
    subject: String,
    html: String,
}

/// Sends the alert digest through the Resend HTTP API.
pub struct ResendSender {
    client: Client,
    api_url: String,
    api_key: Option<String>,
    to: Option<String>,
    from: String,
}

impl ResendSender {
    pub fn new(api_key: Option<String>, to: Option<String>, from: Option<String>, api_url: Option<String>) -> Self {
        Self {
            client: Client::new(),
            api_url: api_url.unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            api_key: api_key.filter(|k| !k.is_empty()),
            to: to.filter(|t| !t.is_empty()),
            from: from.unwrap_or_else(|| DEFAULT_FROM.to_string()),
        }
    }

    async fn deliver(&self, alerts: &[Alert]) -> Result<(), SenderError> {
        let to = self.to.as_deref().ok_or(SenderError::NotConfigured("Recipient address"))?;
        let api_key = self.api_key.as_deref().ok_or(SenderError::NotConfigured("Email API key"))?;

        let request = EmailRequest {
            from: &self.from,
            to,
            subject: subject(alerts),
            html: render_html(alerts, Local::now())?,
        };

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(api_key)
            .timeout(SEND_TIMEOUT)
            .json(&request)
            .send()
            .await?;
        let status = response.status();

        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            return Err(SenderError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }
}

#[async_trait]
impl AlertNotifier for ResendSender {
    async fn send(&self, alerts: &[Alert]) -> DeliveryReport {
        match self.deliver(alerts).await {
            Ok(()) => {
                info!(count = alerts.len(), "Alert email sent.");
                DeliveryReport::success()
            }
            Err(e) => {
                error!(error = %e, count = alerts.len(), "Failed to send alert email.");
                DeliveryReport::failure(e.to_string())
            }
        }
    }
}
