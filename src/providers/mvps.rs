use async_trait::async_trait;
use chrono::{DateTime, Local};
use futures::future::join_all;
use reqwest::{Client, RequestBuilder};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

use super::{check_status, loose_f64, loose_i64, loose_text, loose_u32, ProviderAdapter, ProviderError};
use crate::models::{Bandwidth, Provider, Server, ServerStatus};

pub const DEFAULT_BASE_URL: &str = "https://www.mvps.net/api";
const LIST_TIMEOUT: Duration = Duration::from_secs(10);
const DETAIL_TIMEOUT: Duration = Duration::from_secs(8);

type RawServer = Map<String, Value>;

pub struct MvpsClient {
    client: Client,
    base_url: String,
    api_key: String,
    api_user: String,
}

impl MvpsClient {
    pub fn new(api_key: &str, api_user: &str, base_url: Option<&str>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.unwrap_or(DEFAULT_BASE_URL).trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            api_user: api_user.to_string(),
        }
    }

    fn get(&self, path: &str, timeout: Duration) -> RequestBuilder {
        self.client
            .get(format!("{}{}", self.base_url, path))
            .header("X_API_KEY", &self.api_key)
            .header("X_API_USER", &self.api_user)
            .timeout(timeout)
    }

    async fn get_data(&self, path: &str, timeout: Duration) -> Result<Value, ProviderError> {
        let response = check_status(Provider::Mvps, self.get(path, timeout).send().await?).await?;
        let body: Value = response.json().await?;
        if body.get("status").and_then(Value::as_str) != Some("ok") {
            return Err(ProviderError::UnexpectedResponse {
                provider: Provider::Mvps,
                message: format!("status is not ok for {path}"),
            });
        }
        Ok(body.get("data").cloned().unwrap_or(Value::Null))
    }

    /// Package id to package description. Packages are optional.
    async fn fetch_packages(&self) -> HashMap<String, Value> {
        match self.get_data("/packages", LIST_TIMEOUT).await {
            Ok(Value::Array(packages)) => packages
                .into_iter()
                .filter_map(|pkg| loose_text(pkg.get("id")).map(|id| (id, pkg)))
                .collect(),
            Ok(_) => HashMap::new(),
            Err(e) => {
                warn!(error = %e, "MVPS packages unavailable, server specs will be empty.");
                HashMap::new()
            }
        }
    }

    async fn fetch_detail(&self, id: &str) -> Result<Option<RawServer>, ProviderError> {
        match self.get_data(&format!("/vps/{id}"), DETAIL_TIMEOUT).await {
            Ok(Value::Object(detail)) => Ok(Some(detail)),
            Ok(_) => Ok(None),
            Err(ProviderError::Http(e)) => Err(ProviderError::Http(e)),
            Err(e) => {
                debug!(server_id = id, error = %e, "MVPS detail rejected, using list entry.");
                Ok(None)
            }
        }
    }

    async fn server_with_details(&self, entry: RawServer, packages: &HashMap<String, Value>) -> Server {
        let id = loose_text(entry.get("id")).unwrap_or_default();
        match self.fetch_detail(&id).await {
            Ok(detail) => {
                let mut merged = entry;
                if let Some(detail) = detail {
                    merged.extend(detail);
                }
                map_server(&id, &merged, packages, false)
            }
            Err(e) => {
                warn!(server_id = %id, error = %e, "MVPS detail call failed, using list entry.");
                map_server(&id, &entry, packages, true)
            }
        }
    }
}

#[async_trait]
impl ProviderAdapter for MvpsClient {
    fn provider(&self) -> Provider {
        Provider::Mvps
    }

    async fn fetch_servers(&self) -> Result<Vec<Server>, ProviderError> {
        let entries: Vec<RawServer> = match self.get_data("/vps/", LIST_TIMEOUT).await? {
            Value::Array(items) => items
                .into_iter()
                .filter_map(|item| match item {
                    Value::Object(map) => Some(map),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        };
        if entries.is_empty() {
            debug!("MVPS reported no servers.");
            return Ok(Vec::new());
        }

        let packages = self.fetch_packages().await;
        let servers = join_all(
            entries
                .into_iter()
                .map(|entry| self.server_with_details(entry, &packages)),
        )
        .await;
        Ok(servers)
    }
}

fn country_name(code: &str) -> Option<&'static str> {
    Some(match code {
        "UK" => "United Kingdom",
        "IRL" => "Ireland",
        "GR" => "Greece",
        "SE" => "Sweden",
        "CY" => "Cyprus",
        "ES" => "Spain",
        "FR" => "France",
        "NL" => "Netherlands",
        "DE" => "Germany",
        _ => return None,
    })
}

/// Labels look like `FR-Paris`: country code, then city.
fn display_location(label: &str, fallback_location: Option<String>) -> String {
    let (code, city) = match label.split_once('-') {
        Some((code, city)) => (code.trim(), city.trim()),
        None => (label.trim(), ""),
    };
    let country = country_name(code).unwrap_or(code);
    if !city.is_empty() {
        return format!("{country} - {city}");
    }
    fallback_location
        .or_else(|| (!country.is_empty()).then(|| country.to_string()))
        .unwrap_or_else(|| "Unknown".to_string())
}

fn primary_ip(ips: Option<&Value>) -> String {
    match ips {
        Some(Value::Array(list)) => list
            .first()
            .and_then(|ip| loose_text(Some(ip)))
            .unwrap_or_else(|| "N/A".to_string()),
        Some(Value::String(ip)) => ip.clone(),
        _ => "N/A".to_string(),
    }
}

fn renewal_date(expiration: Option<&Value>) -> Option<String> {
    let secs = loose_i64(expiration).filter(|s| *s > 0)?;
    let at = DateTime::from_timestamp(secs, 0)?;
    Some(at.with_timezone(&Local).format("%d/%m/%Y").to_string())
}

fn map_status(raw: &RawServer, fallback: bool) -> ServerStatus {
    let status = raw.get("status").and_then(Value::as_str).unwrap_or_default();
    if status == "active" || status == "ok" {
        return ServerStatus::Online;
    }
    if fallback {
        return ServerStatus::Offline;
    }
    if raw.get("vm_status").and_then(Value::as_str) == Some("running") {
        ServerStatus::Online
    } else if status == "suspended" {
        ServerStatus::Maintenance
    } else {
        ServerStatus::Offline
    }
}

/// `fallback` marks a record built from the list entry alone after the
/// detail call failed.
fn map_server(id: &str, raw: &RawServer, packages: &HashMap<String, Value>, fallback: bool) -> Server {
    let package = loose_text(raw.get("package")).and_then(|p| packages.get(&p));
    let package_field = |name: &str| package.and_then(|p| p.get(name));

    let bandwidth_total = loose_f64(package_field("bandwidth")).unwrap_or(0.0) * 1024.0;
    let billing_term = loose_i64(raw.get("billing_term")).unwrap_or(1);
    let price = loose_f64(raw.get("price")).unwrap_or(0.0);
    let monthly_price = if billing_term > 0 { price / billing_term as f64 } else { price };

    let label = loose_text(raw.get("label"));
    let location_field = if fallback { None } else { loose_text(raw.get("location")) };

    Server {
        id: format!("mvps-{id}"),
        name: label.clone().unwrap_or_else(|| format!("MVPS Server {id}")),
        ip: primary_ip(raw.get("ips")),
        provider: Provider::Mvps,
        status: map_status(raw, fallback),
        cpu: loose_u32(package_field("cpu")),
        ram: loose_u32(package_field("ram")),
        disk: loose_u32(package_field("disk")),
        disk_usage: None,
        bandwidth: Bandwidth {
            used: loose_f64(raw.get("bandwidth_usage")).unwrap_or(0.0),
            total: bandwidth_total.max(0.0),
        },
        price: monthly_price,
        currency: "EUR".to_string(),
        location: Some(display_location(label.as_deref().unwrap_or_default(), location_field)),
        renewal_date: renewal_date(raw.get("expiration")),
        vpn_config: None,
    }
}
