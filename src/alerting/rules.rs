use chrono::{DateTime, Local, NaiveDate, Utc};
use tracing::debug;

use crate::models::{Alert, AlertConfig, AlertDetails, AlertType, Server, Severity};

/// Where a renewal falls relative to today.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenewalBand {
    /// Carries the number of days overdue.
    Overdue(i64),
    /// Due within the critical band, today included.
    Imminent(i64),
    /// Within the warning band.
    Soon(i64),
    /// Within the early-reminder band.
    Early(i64),
}

impl RenewalBand {
    pub fn severity(&self) -> Severity {
        match self {
            RenewalBand::Overdue(_) | RenewalBand::Imminent(_) => Severity::Critical,
            RenewalBand::Soon(_) | RenewalBand::Early(_) => Severity::Warning,
        }
    }

    /// Value reported as `daysUntilRenewal`; overdue renewals report the
    /// absolute number of days.
    pub fn reported_days(&self) -> i64 {
        match *self {
            RenewalBand::Overdue(days)
            | RenewalBand::Imminent(days)
            | RenewalBand::Soon(days)
            | RenewalBand::Early(days) => days,
        }
    }

    fn message(&self) -> String {
        match *self {
            RenewalBand::Overdue(days) => {
                format!("URGENT: renewal overdue by {days} day{}!", plural(days))
            }
            RenewalBand::Imminent(0) => "URGENT: renewal due today!".to_string(),
            RenewalBand::Imminent(1) => "URGENT: renewal due tomorrow!".to_string(),
            RenewalBand::Imminent(days) => format!("URGENT: renewal in {days} days!"),
            RenewalBand::Soon(days) => format!("Renewal approaching: in {days} day{}", plural(days)),
            RenewalBand::Early(days) => {
                format!("Reminder: contract renews in {days} day{}", plural(days))
            }
        }
    }
}

/// Suffix for a counted noun: "1 day", "0 days", "3 days".
pub(crate) fn plural(count: i64) -> &'static str {
    if count == 1 { "" } else { "s" }
}

/// Maps a signed day count onto the configured bands. `None` means no alert.
pub fn classify_renewal(days_until_renewal: i64, config: &AlertConfig) -> Option<RenewalBand> {
    let bands = &config.renewal;
    if days_until_renewal < 0 {
        Some(RenewalBand::Overdue(days_until_renewal.abs()))
    } else if days_until_renewal <= bands.critical {
        Some(RenewalBand::Imminent(days_until_renewal))
    } else if days_until_renewal <= bands.warning {
        Some(RenewalBand::Soon(days_until_renewal))
    } else if days_until_renewal <= bands.early {
        Some(RenewalBand::Early(days_until_renewal))
    } else {
        None
    }
}

/// Accepts `DD/MM/YYYY` and `YYYY-MM-DD`.
pub fn parse_renewal_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.contains('/') {
        let mut parts = raw.split('/').map(|p| p.trim().parse::<u32>());
        let (day, month, year) = match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(Ok(d)), Some(Ok(m)), Some(Ok(y)), None) => (d, m, y),
            _ => return None,
        };
        NaiveDate::from_ymd_opt(i32::try_from(year).ok()?, month, day)
    } else if raw.contains('-') {
        NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
    } else {
        None
    }
}

/// Whole calendar days between `today` and `renewal`, negative once past.
pub fn days_until(renewal: NaiveDate, today: NaiveDate) -> i64 {
    renewal.signed_duration_since(today).num_days()
}

pub fn bandwidth_alert(server: &Server, config: &AlertConfig, timestamp: &str) -> Option<Alert> {
    let percent = server.bandwidth.usage_percent()?;
    let thresholds = &config.bandwidth;

    let (severity, label, threshold) = if percent >= thresholds.critical {
        (Severity::Critical, "CRITICAL", thresholds.critical)
    } else if percent >= thresholds.warning {
        (Severity::Warning, "WARNING", thresholds.warning)
    } else {
        return None;
    };

    Some(Alert {
        alert_type: AlertType::Bandwidth,
        severity,
        server_id: server.id.clone(),
        server_name: server.name.clone(),
        provider: server.provider,
        message: format!("{label}: bandwidth at {percent:.1}% (threshold: {threshold}%)"),
        details: AlertDetails {
            bandwidth_used: Some(server.bandwidth.used),
            bandwidth_total: Some(server.bandwidth.total),
            bandwidth_percent: Some(percent),
            ..AlertDetails::default()
        },
        timestamp: timestamp.to_string(),
    })
}

pub fn renewal_alert(
    server: &Server,
    config: &AlertConfig,
    today: NaiveDate,
    timestamp: &str,
) -> Option<Alert> {
    if !server.provider.tracks_renewals() {
        return None;
    }
    let raw_date = server.renewal_date.as_deref()?;
    let Some(renewal) = parse_renewal_date(raw_date) else {
        debug!(server_id = %server.id, renewal_date = %raw_date, "Unparseable renewal date, skipping renewal rule.");
        return None;
    };

    let band = classify_renewal(days_until(renewal, today), config)?;

    Some(Alert {
        alert_type: AlertType::Renewal,
        severity: band.severity(),
        server_id: server.id.clone(),
        server_name: server.name.clone(),
        provider: server.provider,
        message: band.message(),
        details: AlertDetails {
            renewal_date: Some(raw_date.to_string()),
            days_until_renewal: Some(band.reported_days()),
            overdue: Some(matches!(band, RenewalBand::Overdue(_))),
            ..AlertDetails::default()
        },
        timestamp: timestamp.to_string(),
    })
}

/// Evaluates every rule against every server.
///
/// Alerts come back in server order, bandwidth before renewal for each server.
pub fn evaluate_alerts(servers: &[Server], config: &AlertConfig, now: DateTime<Local>) -> Vec<Alert> {
    let today = now.date_naive();
    let timestamp = now.with_timezone(&Utc).to_rfc3339();

    servers
        .iter()
        .flat_map(|server| {
            let bandwidth = bandwidth_alert(server, config, &timestamp);
            let renewal = renewal_alert(server, config, today, &timestamp);
            bandwidth.into_iter().chain(renewal)
        })
        .collect()
}
