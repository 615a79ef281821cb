//! Hosting-provider inventory adapters.

pub mod mvps;
pub mod oneprovider;

use async_trait::async_trait;
use futures::future::join_all;
use reqwest::Response;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};

use crate::models::{Provider, Server};

pub use mvps::MvpsClient;
pub use oneprovider::OneProviderClient;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{provider} API returned status {status}: {body}")]
    Status { provider: Provider, status: u16, body: String },
    #[error("Unexpected {provider} response: {message}")]
    UnexpectedResponse { provider: Provider, message: String },
}

#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    fn provider(&self) -> Provider;

    async fn fetch_servers(&self) -> Result<Vec<Server>, ProviderError>;
}

/// All configured providers.
#[derive(Clone, Default)]
pub struct Inventory {
    adapters: Vec<Arc<dyn ProviderAdapter>>,
}

impl Inventory {
    pub fn new(adapters: Vec<Arc<dyn ProviderAdapter>>) -> Self {
        Self { adapters }
    }

    pub fn providers(&self) -> Vec<Provider> {
        self.adapters.iter().map(|a| a.provider()).collect()
    }

    /// Fetches every provider concurrently. A failing provider contributes
    /// no servers.
    pub async fn fetch_all_servers(&self) -> Vec<Server> {
        self.fetch_servers(None).await
    }

    /// Like [`Inventory::fetch_all_servers`], restricted to one provider when
    /// `only` is set. Results keep the adapter registration order.
    pub async fn fetch_servers(&self, only: Option<Provider>) -> Vec<Server> {
        let selected = self
            .adapters
            .iter()
            .filter(|adapter| only.map_or(true, |p| adapter.provider() == p));
        let results = join_all(selected.map(|adapter| async move {
            let provider = adapter.provider();
            match adapter.fetch_servers().await {
                Ok(servers) => {
                    info!(%provider, count = servers.len(), "Fetched provider inventory.");
                    servers
                }
                Err(e) => {
                    error!(%provider, error = %e, "Failed to fetch provider inventory.");
                    Vec::new()
                }
            }
        }))
        .await;
        results.into_iter().flatten().collect()
    }
}

pub(crate) async fn check_status(provider: Provider, response: Response) -> Result<Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Failed to read error body".to_string());
    Err(ProviderError::Status {
        provider,
        status: status.as_u16(),
        body,
    })
}

// Provider APIs send numbers either as JSON numbers or as strings.

pub(crate) fn loose_f64(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub(crate) fn loose_i64(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().map(|f| f.trunc() as i64))
        }
        _ => None,
    }
}

pub(crate) fn loose_u32(value: Option<&Value>) -> u32 {
    loose_i64(value)
        .and_then(|n| u32::try_from(n).ok())
        .unwrap_or(0)
}

/// Non-empty string or number rendered as text.
pub(crate) fn loose_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
