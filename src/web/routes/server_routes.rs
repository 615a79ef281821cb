use axum::{
    extract::{rejection::JsonRejection, Query, State},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use std::sync::Arc;

use crate::models::{Provider, Server};
use crate::remote_config::reconciliation::find_inconsistencies;
use crate::web::models::dashboard_models::{RefreshConfigRequest, ServerSummary, ServersQuery, ServersResponse};
use crate::web::{AppError, AppState};

pub fn create_server_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_servers))
        .route("/refresh-config", post(refresh_config))
}

fn parse_provider_filter(raw: Option<&str>) -> Result<Option<Provider>, AppError> {
    match raw.map(|p| p.trim().to_ascii_lowercase()).as_deref() {
        None | Some("") | Some("all") => Ok(None),
        Some("mvps") => Ok(Some(Provider::Mvps)),
        Some("oneprovider") => Ok(Some(Provider::OneProvider)),
        Some(other) => Err(AppError::InvalidInput(format!("Unknown provider: {other}"))),
    }
}

fn servers_response(servers: Vec<Server>) -> ServersResponse {
    ServersResponse {
        success: true,
        summary: ServerSummary::from_servers(&servers),
        inconsistencies: find_inconsistencies(&servers),
        servers,
        timestamp: Utc::now().to_rfc3339(),
    }
}

async fn list_servers(
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<ServersQuery>,
) -> Result<Json<ServersResponse>, AppError> {
    let provider = parse_provider_filter(query.provider.as_deref())?;
    let servers = app_state.inventory.fetch_servers(provider).await;
    let servers = match &app_state.mobile_config {
        Some(mobile_config) => mobile_config.enrich(servers).await,
        None => servers,
    };
    Ok(Json(servers_response(servers)))
}

/// Re-attaches the current mobile configuration to a server list the client
/// already holds, without polling the providers again.
async fn refresh_config(
    State(app_state): State<Arc<AppState>>,
    payload: Result<Json<RefreshConfigRequest>, JsonRejection>,
) -> Result<Json<ServersResponse>, AppError> {
    let Json(request) = payload.map_err(|rejection| AppError::InvalidInput(rejection.body_text()))?;
    let mobile_config = app_state
        .mobile_config
        .as_ref()
        .ok_or_else(|| AppError::ServiceUnavailable("Mobile config store is not configured.".to_string()))?;
    let servers = mobile_config.enrich(request.servers).await;
    Ok(Json(servers_response(servers)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_filter_parsing() {
        assert_eq!(parse_provider_filter(None).unwrap(), None);
        assert_eq!(parse_provider_filter(Some("all")).unwrap(), None);
        assert_eq!(parse_provider_filter(Some("MVPS")).unwrap(), Some(Provider::Mvps));
        assert_eq!(parse_provider_filter(Some("oneprovider")).unwrap(), Some(Provider::OneProvider));
        assert!(parse_provider_filter(Some("hetzner")).is_err());
    }
}
