//! Subject line and HTML body of the alert email.

use chrono::{DateTime, Local};
use serde::Serialize;
use tera::{Context, Tera};

use crate::alerting::rules::plural;
use crate::models::{Alert, AlertType, Severity};

const TEMPLATE: &str = include_str!("templates/alert_email.html.tera");

pub fn subject(alerts: &[Alert]) -> String {
    let urgent = alerts.iter().any(|a| a.severity == Severity::Critical);
    let count = alerts.len();
    format!(
        "{}Server alerts ({count} alert{})",
        if urgent { "URGENT - " } else { "" },
        plural(count as i64)
    )
}

#[derive(Serialize)]
struct BandwidthView {
    percent: String,
    fill_width: String,
    used: String,
    total: String,
}

#[derive(Serialize)]
struct RenewalView {
    summary: String,
    date: String,
}

#[derive(Serialize)]
struct AlertView<'a> {
    provider: &'static str,
    provider_label: &'static str,
    server_name: &'a str,
    message: &'a str,
    bandwidth: Option<BandwidthView>,
    renewal: Option<RenewalView>,
}

#[derive(Serialize)]
struct GroupView<'a> {
    title: &'static str,
    color: &'static str,
    is_warning: bool,
    alerts: Vec<AlertView<'a>>,
}

fn alert_view(alert: &Alert) -> AlertView<'_> {
    let details = &alert.details;
    let bandwidth = match (alert.alert_type, details.bandwidth_percent) {
        (AlertType::Bandwidth, Some(percent)) => Some(BandwidthView {
            percent: format!("{percent:.1}"),
            fill_width: format!("{:.1}", percent.min(100.0)),
            used: format!("{:.1}", details.bandwidth_used.unwrap_or_default()),
            total: format!("{}", details.bandwidth_total.unwrap_or_default()),
        }),
        _ => None,
    };
    let renewal = match (alert.alert_type, details.days_until_renewal) {
        (AlertType::Renewal, Some(days)) => {
            let date = details.renewal_date.clone().unwrap_or_default();
            let summary = if details.overdue.unwrap_or(false) {
                format!("Overdue by {days} day{}", plural(days))
            } else {
                format!("Renewal in {days} day{}", plural(days))
            };
            Some(RenewalView { summary, date })
        }
        _ => None,
    };
    AlertView {
        provider: alert.provider.as_str(),
        provider_label: alert.provider.display_name(),
        server_name: &alert.server_name,
        message: &alert.message,
        bandwidth,
        renewal,
    }
}

fn views_with_severity(alerts: &[Alert], severity: Severity) -> Vec<AlertView<'_>> {
    alerts
        .iter()
        .filter(|a| a.severity == severity)
        .map(alert_view)
        .collect()
}

/// Renders the email body: critical alerts first, then warnings.
pub fn render_html(alerts: &[Alert], now: DateTime<Local>) -> Result<String, tera::Error> {
    let critical = views_with_severity(alerts, Severity::Critical);
    let warning = views_with_severity(alerts, Severity::Warning);

    let mut context = Context::new();
    context.insert("critical", &critical);
    context.insert("generated_at", &now.format("%A %d %B %Y %H:%M").to_string());

    let mut groups = Vec::new();
    if !critical.is_empty() {
        groups.push(GroupView {
            title: "Critical alerts",
            color: "#dc2626",
            is_warning: false,
            alerts: critical,
        });
    }
    if !warning.is_empty() {
        groups.push(GroupView {
            title: "Warnings",
            color: "#f59e0b",
            is_warning: true,
            alerts: warning,
        });
    }
    context.insert("groups", &groups);

    Tera::one_off(TEMPLATE, &context, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AlertDetails, Provider};
    use chrono::TimeZone;

    fn alert(alert_type: AlertType, severity: Severity, details: AlertDetails) -> Alert {
        Alert {
            alert_type,
            severity,
            server_id: "mvps-1".into(),
            server_name: "FR-Paris <edge>".into(),
            provider: Provider::Mvps,
            message: "bandwidth message".into(),
            details,
            timestamp: "2025-03-01T10:00:00Z".into(),
        }
    }

    fn now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).unwrap()
    }

    #[test]
    fn subject_marks_urgent_batches() {
        let warning = alert(AlertType::Bandwidth, Severity::Warning, AlertDetails::default());
        let critical = alert(AlertType::Bandwidth, Severity::Critical, AlertDetails::default());
        assert_eq!(subject(&[warning.clone()]), "Server alerts (1 alert)");
        assert_eq!(subject(&[warning.clone(), warning.clone()]), "Server alerts (2 alerts)");
        assert_eq!(subject(&[warning, critical]), "URGENT - Server alerts (2 alerts)");
    }

    #[test]
    fn critical_alerts_come_first_and_bars_are_capped() {
        let over = alert(
            AlertType::Bandwidth,
            Severity::Critical,
            AlertDetails {
                bandwidth_used: Some(1100.0),
                bandwidth_total: Some(1000.0),
                bandwidth_percent: Some(110.0),
                ..Default::default()
            },
        );
        let renewal = alert(
            AlertType::Renewal,
            Severity::Warning,
            AlertDetails {
                renewal_date: Some("06/03/2025".into()),
                days_until_renewal: Some(5),
                overdue: Some(false),
                ..Default::default()
            },
        );
        let html = render_html(&[renewal, over], now()).unwrap();
        let critical_at = html.find("Critical alerts (1)").unwrap();
        let warning_at = html.find("Warnings (1)").unwrap();
        assert!(critical_at < warning_at);
        assert!(html.contains("width: 100.0%"));
        assert!(html.contains("110.0%"));
        assert!(html.contains("Renewal in 5 days"));
        assert!(html.contains("provider-mvps"));
        assert!(html.contains("FR-Paris &lt;edge&gt;"));
    }

    #[test]
    fn overdue_renewals_are_worded_as_overdue() {
        let overdue = alert(
            AlertType::Renewal,
            Severity::Critical,
            AlertDetails {
                renewal_date: Some("27/02/2025".into()),
                days_until_renewal: Some(2),
                overdue: Some(true),
                ..Default::default()
            },
        );
        let html = render_html(&[overdue], now()).unwrap();
        assert!(html.contains("Overdue by 2 days"));
        assert!(!html.contains("Warnings"));
    }

    #[test]
    fn renewal_wording_follows_the_alert_not_the_send_time() {
        // Evaluated on the renewal day, sent after midnight.
        let due_today = alert(
            AlertType::Renewal,
            Severity::Critical,
            AlertDetails {
                renewal_date: Some("28/02/2025".into()),
                days_until_renewal: Some(0),
                overdue: Some(false),
                ..Default::default()
            },
        );
        let html = render_html(&[due_today], now()).unwrap();
        assert!(html.contains("Renewal in 0 days"));
        assert!(!html.contains("Overdue"));
    }
}
