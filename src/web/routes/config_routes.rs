use axum::{
    extract::{rejection::JsonRejection, State},
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;

use crate::models::{Platform, Tier};
use crate::remote_config::{MobileConfigService, UpdateOutcome};
use crate::web::models::dashboard_models::{
    ConfigResponse, ConfigUpdateRequest, ConfigUpdateResponse, PlatformConfigView, UpdatedEntry,
};
use crate::web::{AppError, AppState};

pub fn create_config_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(get_config))
        .route("/update", post(update_config))
}

fn mobile_config(app_state: &AppState) -> Result<&Arc<MobileConfigService>, AppError> {
    app_state
        .mobile_config
        .as_ref()
        .ok_or_else(|| AppError::ServiceUnavailable("Mobile config store is not configured.".to_string()))
}

async fn get_config(State(app_state): State<Arc<AppState>>) -> Result<Json<ConfigResponse>, AppError> {
    let snapshot = mobile_config(&app_state)?.load_snapshot().await;
    Ok(Json(ConfigResponse {
        success: true,
        config: PlatformConfigView {
            ios: snapshot.entries_view(Platform::Ios),
            android: snapshot.entries_view(Platform::Android),
        },
    }))
}

fn required(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

async fn update_config(
    State(app_state): State<Arc<AppState>>,
    payload: Result<Json<ConfigUpdateRequest>, JsonRejection>,
) -> Result<Json<ConfigUpdateResponse>, AppError> {
    let Json(request) = payload.map_err(|rejection| AppError::InvalidInput(rejection.body_text()))?;

    let (Some(server_ip), Some(platform_raw), Some(status_raw)) = (
        required(request.server_ip),
        required(request.platform),
        required(request.status),
    ) else {
        return Err(AppError::InvalidInput(
            "serverIp, platform and status are required.".to_string(),
        ));
    };
    let platform: Platform = platform_raw.parse().map_err(AppError::InvalidInput)?;
    let tier: Tier = status_raw.parse().map_err(AppError::InvalidInput)?;
    let ref_path = required(request.ref_path);

    let outcome = mobile_config(&app_state)?
        .update_entry(&server_ip, platform, ref_path.as_deref(), tier.flags())
        .await?;

    match outcome {
        UpdateOutcome::Updated { ref_path } => Ok(Json(ConfigUpdateResponse {
            success: true,
            message: format!("{platform} config updated"),
            updated: UpdatedEntry {
                server_ip,
                platform: platform.to_string(),
                status: status_raw,
            },
            ref_path,
        })),
        UpdateOutcome::NotFound => Err(AppError::NotFound(format!(
            "No {platform} config entry found for {server_ip}"
        ))),
    }
}
