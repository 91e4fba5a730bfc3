use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};

use notebox_types::api::{Claims, NoteRequest, NoteView};

use crate::auth::AppState;
use crate::blocking;
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath};

/// GET /notes: the caller's live notes, most recently modified first.
pub async fn list_notes(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<NoteView>>, ApiError> {
    let notes = blocking(move || state.notes.list(&claims.username)).await?;
    Ok(Json(notes))
}

/// GET /notes/{id}
pub async fn get_note(
    State(state): State<AppState>,
    ApiPath(note_id): ApiPath<i64>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<NoteView>, ApiError> {
    let note = blocking(move || state.notes.get(&claims.username, note_id)).await?;
    Ok(Json(note))
}

/// POST /notes
pub async fn create_note(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<NoteRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let note = blocking(move || state.notes.create(&claims.username, &req.title, &req.content))
        .await?;
    Ok((StatusCode::CREATED, Json(note)))
}

/// PUT /notes/{id}
pub async fn update_note(
    State(state): State<AppState>,
    ApiPath(note_id): ApiPath<i64>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<NoteRequest>,
) -> Result<Json<NoteView>, ApiError> {
    let note = blocking(move || {
        state
            .notes
            .update(&claims.username, note_id, &req.title, &req.content)
    })
    .await?;
    Ok(Json(note))
}

/// DELETE /notes/{id}: soft delete; 204 on success.
pub async fn delete_note(
    State(state): State<AppState>,
    ApiPath(note_id): ApiPath<i64>,
    Extension(claims): Extension<Claims>,
) -> Result<StatusCode, ApiError> {
    blocking(move || state.notes.delete(&claims.username, note_id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
