use serde::{Deserialize, Serialize};

use super::server::Provider;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertType {
    Bandwidth,
    Renewal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Critical,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bandwidth_used: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bandwidth_total: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bandwidth_percent: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub renewal_date: Option<String>,
    /// For past-due renewals this holds the number of days overdue.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days_until_renewal: Option<i64>,
    /// Set on renewal alerts; true once the renewal date has passed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overdue: Option<bool>,
}

/// A triggered alert. Computed fresh on every evaluation, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    pub severity: Severity,
    pub server_id: String,
    pub server_name: String,
    pub provider: Provider,
    pub message: String,
    pub details: AlertDetails,
    pub timestamp: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandwidthThresholds {
    pub warning: f64,
    pub critical: f64,
}

/// Day bands for renewal reminders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenewalBands {
    pub early: i64,
    pub warning: i64,
    pub critical: i64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlertConfig {
    pub bandwidth: BandwidthThresholds,
    pub renewal: RenewalBands,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            bandwidth: BandwidthThresholds {
                warning: 75.0,
                critical: 95.0,
            },
            renewal: RenewalBands {
                early: 30,
                warning: 7,
                critical: 1,
            },
        }
    }
}
