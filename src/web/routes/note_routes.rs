use axum::{
    extract::{rejection::JsonRejection, State},
    routing::get,
    Json, Router,
};
use std::sync::Arc;

use crate::web::models::dashboard_models::{NotesPayload, NotesResponse};
use crate::web::{AppError, AppState};

pub fn create_note_router() -> Router<Arc<AppState>> {
    Router::new().route("/", get(get_notes).post(save_notes))
}

async fn get_notes(State(app_state): State<Arc<AppState>>) -> Result<Json<NotesResponse>, AppError> {
    let notes = app_state.notes.read().await?;
    Ok(Json(NotesResponse {
        success: true,
        notes: Some(notes),
    }))
}

async fn save_notes(
    State(app_state): State<Arc<AppState>>,
    payload: Result<Json<NotesPayload>, JsonRejection>,
) -> Result<Json<NotesResponse>, AppError> {
    let Json(payload) = payload.map_err(|rejection| AppError::InvalidInput(rejection.body_text()))?;
    app_state.notes.write(&payload.notes).await?;
    Ok(Json(NotesResponse {
        success: true,
        notes: None,
    }))
}
