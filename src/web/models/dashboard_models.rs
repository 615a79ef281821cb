use serde::{Deserialize, Serialize};

use crate::alerting::SyncSummary;
use crate::models::{Alert, Server, ServerStatus};
use crate::remote_config::{ConfigEntryView, Inconsistency};

#[derive(Debug, Default, Deserialize)]
pub struct ServersQuery {
    pub provider: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct MonthlyCost {
    #[serde(rename = "USD")]
    pub usd: f64,
    #[serde(rename = "EUR")]
    pub eur: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerSummary {
    pub total: usize,
    pub online: usize,
    pub monthly_cost: MonthlyCost,
}

impl ServerSummary {
    pub fn from_servers(servers: &[Server]) -> Self {
        let mut monthly_cost = MonthlyCost::default();
        for server in servers {
            match server.currency.as_str() {
                "USD" => monthly_cost.usd += server.price,
                "EUR" => monthly_cost.eur += server.price,
                _ => {}
            }
        }
        Self {
            total: servers.len(),
            online: servers.iter().filter(|s| s.status == ServerStatus::Online).count(),
            monthly_cost,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ServersResponse {
    pub success: bool,
    pub servers: Vec<Server>,
    pub summary: ServerSummary,
    pub inconsistencies: Vec<Inconsistency>,
    pub timestamp: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshConfigRequest {
    pub servers: Vec<Server>,
}

#[derive(Debug, Serialize)]
pub struct PlatformConfigView {
    pub ios: Vec<ConfigEntryView>,
    pub android: Vec<ConfigEntryView>,
}

#[derive(Debug, Serialize)]
pub struct ConfigResponse {
    pub success: bool,
    pub config: PlatformConfigView,
}

/// Fields are optional so that a missing one is reported as a 400 with a
/// readable message.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigUpdateRequest {
    pub server_ip: Option<String>,
    pub platform: Option<String>,
    pub status: Option<String>,
    pub ref_path: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatedEntry {
    pub server_ip: String,
    pub platform: String,
    pub status: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigUpdateResponse {
    pub success: bool,
    pub message: String,
    pub updated: UpdatedEntry,
    pub ref_path: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertsResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub alert_count: usize,
    pub alerts: Vec<Alert>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sync: Option<SyncSummary>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NotesPayload {
    pub notes: String,
}

#[derive(Debug, Serialize)]
pub struct NotesResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}
