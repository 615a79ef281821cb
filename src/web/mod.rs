use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, SameSite};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::alerting::EvaluationService;
use crate::providers::Inventory;
use crate::remote_config::MobileConfigService;
use crate::server::config::AuthConfig;
use crate::services::auth_service;
use crate::services::notes_service::NotesService;
use crate::web::{middleware::auth, models::LoginRequest, routes::*};

pub use error::AppError;

pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;

pub struct AppState {
    pub auth: AuthConfig,
    pub inventory: Inventory,
    /// `None` when no mobile-config database is configured.
    pub mobile_config: Option<Arc<MobileConfigService>>,
    pub evaluation_service: Arc<EvaluationService>,
    pub notes: NotesService,
}

async fn login_handler(
    State(app_state): State<Arc<AppState>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload.map_err(|rejection| AppError::InvalidInput(rejection.body_text()))?;
    let login_response = auth_service::login_user(&app_state.auth, &payload)?;

    let auth_cookie = Cookie::build(("token", login_response.token.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(true)
        .build();
    let cookie_value = auth_cookie
        .to_string()
        .parse::<HeaderValue>()
        .map_err(|e| AppError::InternalServerError(format!("Invalid session cookie: {e}")))?;

    let mut response = Json(login_response).into_response();
    response.headers_mut().insert(header::SET_COOKIE, cookie_value);

    Ok(response)
}

async fn health_check_handler() -> &'static str {
    "OK"
}

pub fn create_axum_router(app_state: AppState) -> Router {
    let app_state = Arc::new(app_state);
    let require_auth = || axum_middleware::from_fn_with_state(app_state.clone(), auth::auth);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(vec![Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(health_check_handler))
        .route("/api/auth/login", post(login_handler))
        .route("/api/auth/me", get(auth_service::me).route_layer(require_auth()))
        .nest(
            "/api/servers",
            server_routes::create_server_router().route_layer(require_auth()),
        )
        .nest(
            "/api/config",
            config_routes::create_config_router().route_layer(require_auth()),
        )
        .nest(
            "/api/alerts",
            alert_routes::create_alert_router().route_layer(require_auth()),
        )
        .nest(
            "/api/notes",
            note_routes::create_note_router().route_layer(require_auth()),
        )
        .with_state(app_state)
        .layer(cors)
}
