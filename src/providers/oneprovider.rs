use async_trait::async_trait;
use chrono::{Datelike, Local, NaiveDate};
use futures::future::join_all;
use reqwest::{Client, RequestBuilder};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use super::{check_status, loose_f64, loose_text, loose_u32, ProviderAdapter, ProviderError};
use crate::models::{Bandwidth, Provider, Server, ServerStatus, UNLIMITED_BANDWIDTH};

pub const DEFAULT_BASE_URL: &str = "https://api.oneprovider.com";
const LIST_TIMEOUT: Duration = Duration::from_secs(10);
const DETAIL_TIMEOUT: Duration = Duration::from_secs(8);

pub struct OneProviderClient {
    client: Client,
    base_url: String,
    api_key: String,
    client_key: String,
    /// IPs sold without a bandwidth cap.
    unlimited_ips: Vec<String>,
}

impl OneProviderClient {
    pub fn new(api_key: &str, client_key: &str, base_url: Option<&str>, unlimited_ips: Vec<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.unwrap_or(DEFAULT_BASE_URL).trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            client_key: client_key.to_string(),
            unlimited_ips,
        }
    }

    fn get(&self, path: &str, timeout: Duration) -> RequestBuilder {
        self.client
            .get(format!("{}{}", self.base_url, path))
            .header("Api-Key", &self.api_key)
            .header("Client-Key", &self.client_key)
            .header("X-Pretty-JSON", "1")
            .timeout(timeout)
    }

    async fn search_vm(&self, ip: &str) -> Result<Value, ProviderError> {
        let request = self.get("/vm/search", DETAIL_TIMEOUT).query(&[("ip", ip)]);
        let response = check_status(Provider::OneProvider, request.send().await?).await?;
        let body: Value = response.json().await?;
        body.get("response")
            .filter(|r| r.is_object())
            .cloned()
            .ok_or_else(|| ProviderError::UnexpectedResponse {
                provider: Provider::OneProvider,
                message: format!("vm search for {ip} returned no response object"),
            })
    }

    async fn server_with_details(&self, entry: Value, renewal: &str) -> Server {
        let Some(ip) = loose_text(entry.get("ip_addr")) else {
            debug!("OneProvider server without an IP, skipping VM lookup.");
            return fallback_server(&entry, renewal);
        };
        match self.search_vm(&ip).await {
            Ok(vm) => self.map_server(&entry, &vm, renewal),
            Err(e) => {
                warn!(ip = %ip, error = %e, "OneProvider VM lookup failed, using list entry.");
                fallback_server(&entry, renewal)
            }
        }
    }

    fn map_server(&self, entry: &Value, vm: &Value, renewal: &str) -> Server {
        let info = vm.get("server_info").unwrap_or(&Value::Null);
        let state = vm.get("server_state").unwrap_or(&Value::Null);
        let bandwidth = vm.get("server_bandwidth").unwrap_or(&Value::Null);
        let billing = vm.get("server_billing").unwrap_or(&Value::Null);

        let server_id = loose_text(entry.get("server_id")).unwrap_or_default();
        let ip = loose_text(entry.get("ip_addr"))
            .or_else(|| loose_text(info.get("ipaddress")))
            .unwrap_or_else(|| "N/A".to_string());

        let hourly = loose_f64(billing.get("recurring_amount"))
            .or_else(|| loose_f64(entry.get("recurring_amount")))
            .unwrap_or(0.0);

        let mut total = loose_f64(bandwidth.get("limit")).unwrap_or(0.0);
        if self.unlimited_ips.iter().any(|u| *u == ip) {
            debug!(ip = %ip, "Unlimited bandwidth server.");
            total = UNLIMITED_BANDWIDTH;
        }

        let status = match state.get("state").and_then(Value::as_str) {
            Some("online") => ServerStatus::Online,
            Some("offline") => ServerStatus::Offline,
            _ => ServerStatus::Maintenance,
        };

        let location = loose_text(entry.get("location")).unwrap_or_else(|| {
            format!(
                "{} - {}",
                loose_text(info.get("city")).unwrap_or_else(|| "Unknown".to_string()),
                loose_text(info.get("country")).unwrap_or_default()
            )
        });

        Server {
            id: format!("oneprovider-{server_id}"),
            name: loose_text(entry.get("hostname"))
                .or_else(|| loose_text(info.get("hostname")))
                .unwrap_or_else(|| format!("Server {server_id}")),
            ip,
            provider: Provider::OneProvider,
            status,
            cpu: loose_u32(info.get("cpus")),
            ram: loose_u32(info.get("ram_mb")),
            disk: loose_u32(info.get("space_gb")),
            disk_usage: loose_f64(info.get("disk_used_gb")).or_else(|| loose_f64(info.get("space_used_gb"))),
            bandwidth: Bandwidth {
                used: loose_f64(bandwidth.get("used")).unwrap_or(0.0),
                total,
            },
            price: monthly_price(hourly),
            currency: "USD".to_string(),
            location: Some(location),
            renewal_date: Some(renewal.to_string()),
            vpn_config: None,
        }
    }
}

#[async_trait]
impl ProviderAdapter for OneProviderClient {
    fn provider(&self) -> Provider {
        Provider::OneProvider
    }

    async fn fetch_servers(&self) -> Result<Vec<Server>, ProviderError> {
        let response = check_status(Provider::OneProvider, self.get("/server/list", LIST_TIMEOUT).send().await?).await?;
        let body: Value = response.json().await?;
        let entries = body
            .pointer("/response/servers")
            .or_else(|| body.get("servers"))
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        if entries.is_empty() {
            debug!("OneProvider reported no servers.");
            return Ok(Vec::new());
        }

        let renewal = next_renewal_date(Local::now().date_naive());
        let servers = join_all(
            entries
                .into_iter()
                .map(|entry| self.server_with_details(entry, &renewal)),
        )
        .await;
        Ok(servers)
    }
}

/// Billing is hourly; a month is counted as 30 days, rounded to cents.
fn monthly_price(hourly: f64) -> f64 {
    (hourly * 24.0 * 30.0 * 100.0).round() / 100.0
}

/// Servers renew monthly, on the first day of the next month.
fn next_renewal_date(today: NaiveDate) -> String {
    let (year, month) = if today.month() == 12 {
        (today.year() + 1, 1)
    } else {
        (today.year(), today.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)
        .map(|d| d.format("%d/%m/%Y").to_string())
        .unwrap_or_default()
}

fn fallback_server(entry: &Value, renewal: &str) -> Server {
    let server_id = loose_text(entry.get("server_id")).unwrap_or_default();
    let status = if entry.get("status").and_then(Value::as_str) == Some("Active") {
        ServerStatus::Online
    } else {
        ServerStatus::Offline
    };
    Server {
        id: format!("oneprovider-{server_id}"),
        name: loose_text(entry.get("hostname")).unwrap_or_else(|| format!("Server {server_id}")),
        ip: loose_text(entry.get("ip_addr")).unwrap_or_else(|| "N/A".to_string()),
        provider: Provider::OneProvider,
        status,
        cpu: 0,
        ram: 0,
        disk: 0,
        disk_usage: None,
        bandwidth: Bandwidth { used: 0.0, total: 0.0 },
        price: monthly_price(loose_f64(entry.get("recurring_amount")).unwrap_or(0.0)),
        currency: "USD".to_string(),
        location: Some(loose_text(entry.get("location")).unwrap_or_else(|| "Unknown".to_string())),
        renewal_date: Some(renewal.to_string()),
        vpn_config: None,
    }
}
