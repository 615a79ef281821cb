pub mod email;
pub mod senders;

use async_trait::async_trait;
use serde::Serialize;

use crate::models::Alert;

pub use senders::resend::ResendSender;
pub use senders::SenderError;

/// Result of one delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryReport {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DeliveryReport {
    pub fn success() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}

/// Delivers a batch of alerts to the operators.
///
/// Failures are reported in the returned [`DeliveryReport`], never raised.
#[async_trait]
pub trait AlertNotifier: Send + Sync {
    async fn send(&self, alerts: &[Alert]) -> DeliveryReport;
}
