use chrono::{DateTime, Local};
use serde::Serialize;
use std::sync::Arc;
use tokio::time::{interval, Duration};
use tracing::{error, info};

use super::availability_sync::{sync_availability, SyncSummary};
use super::rules::evaluate_alerts;
use crate::models::{Alert, AlertConfig, Server};
use crate::notifications::{AlertNotifier, DeliveryReport};
use crate::providers::Inventory;
use crate::remote_config::MobileConfigService;

#[derive(Debug, thiserror::Error)]
pub enum EvaluationError {
    #[error("Alert delivery failed: {0}")]
    Delivery(String),
}

/// Result of one evaluation pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationOutcome {
    pub alerts: Vec<Alert>,
    /// `None` when there was nothing to send.
    pub delivery: Option<DeliveryReport>,
    /// `None` when the availability sync is disabled.
    pub sync: Option<SyncSummary>,
}

/// Fetch, evaluate, notify, then sync availability.
pub struct EvaluationService {
    inventory: Inventory,
    mobile_config: Option<Arc<MobileConfigService>>,
    notifier: Arc<dyn AlertNotifier>,
    config: AlertConfig,
    sync_availability: bool,
}

impl EvaluationService {
    pub fn new(
        inventory: Inventory,
        mobile_config: Option<Arc<MobileConfigService>>,
        notifier: Arc<dyn AlertNotifier>,
        sync_availability: bool,
    ) -> Self {
        Self {
            inventory,
            mobile_config,
            notifier,
            config: AlertConfig::default(),
            sync_availability,
        }
    }

    pub async fn evaluate(&self) -> EvaluationOutcome {
        let servers = self.inventory.fetch_all_servers().await;
        self.evaluate_servers(&servers, Local::now()).await
    }

    pub async fn evaluate_servers(&self, servers: &[Server], now: DateTime<Local>) -> EvaluationOutcome {
        let alerts = evaluate_alerts(servers, &self.config, now);
        info!(servers = servers.len(), alerts = alerts.len(), "Alert evaluation complete.");

        let delivery = if alerts.is_empty() {
            None
        } else {
            Some(self.notifier.send(&alerts).await)
        };

        let sync = match (&self.mobile_config, self.sync_availability) {
            (Some(service), true) => Some(sync_availability(service, servers, &self.config).await),
            _ => None,
        };

        EvaluationOutcome { alerts, delivery, sync }
    }

    pub async fn start_periodic_evaluation(self: Arc<Self>, period_seconds: u64) {
        info!(interval_seconds = period_seconds, "Alert evaluation service started.");
        let mut interval = interval(Duration::from_secs(period_seconds));
        loop {
            interval.tick().await;
            if let Err(e) = self.run_evaluation_cycle().await {
                error!(error = %e, "Error during alert evaluation cycle.");
            }
        }
    }

    async fn run_evaluation_cycle(&self) -> Result<(), EvaluationError> {
        let outcome = self.evaluate().await;
        match outcome.delivery {
            Some(DeliveryReport { success: false, error }) => Err(EvaluationError::Delivery(
                error.unwrap_or_else(|| "unknown error".to_string()),
            )),
            _ => Ok(()),
        }
    }
}
