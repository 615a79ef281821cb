use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use std::sync::Arc;

use crate::alerting::EvaluationOutcome;
use crate::web::models::dashboard_models::AlertsResponse;
use crate::web::AppState;

pub fn create_alert_router() -> Router<Arc<AppState>> {
    Router::new().route("/", get(check_alerts))
}

/// Runs one evaluation pass and reports what was sent.
async fn check_alerts(State(app_state): State<Arc<AppState>>) -> (StatusCode, Json<AlertsResponse>) {
    let outcome = app_state.evaluation_service.evaluate().await;
    alerts_response(outcome)
}

fn alerts_response(outcome: EvaluationOutcome) -> (StatusCode, Json<AlertsResponse>) {
    let EvaluationOutcome { alerts, delivery, sync } = outcome;
    let alert_count = alerts.len();

    match delivery {
        None => (
            StatusCode::OK,
            Json(AlertsResponse {
                success: true,
                message: Some("No alerts".to_string()),
                error: None,
                alert_count: 0,
                alerts,
                sync,
            }),
        ),
        Some(report) if !report.success => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(AlertsResponse {
                success: false,
                message: None,
                error: Some(report.error.unwrap_or_else(|| "Email delivery failed".to_string())),
                alert_count,
                alerts,
                sync,
            }),
        ),
        Some(_) => (
            StatusCode::OK,
            Json(AlertsResponse {
                success: true,
                message: Some(format!(
                    "{alert_count} alert{} sent by email",
                    if alert_count == 1 { "" } else { "s" }
                )),
                error: None,
                alert_count,
                alerts,
                sync,
            }),
        ),
    }
}
