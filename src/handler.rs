use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;
use tracing::debug;

use crate::{
    error::AppError,
    schema::{CreateNoteSchema, DeleteNoteSchema, UpdateNoteSchema, FIELDS_REQUIRED, ID_REQUIRED},
    AppState,
};

// Handler for the health checker route
pub async fn health_checker_handler() -> impl IntoResponse {
    const MESSAGE: &str = "Notes API is running";

    Json(json!({
        "status": "success",
        "message": MESSAGE
    }))
}

/// Unwraps a JSON body, reporting any rejection with the endpoint's message.
fn body<T>(payload: Result<Json<T>, JsonRejection>, message: &'static str) -> Result<T, AppError> {
    payload.map(|Json(body)| body).map_err(|rejection| {
        debug!(%rejection, "rejected request body");
        AppError::Validation(message)
    })
}

fn success(status: StatusCode, message: String) -> impl IntoResponse {
    (
        status,
        Json(json!({
            "status": "success",
            "message": message
        })),
    )
}

// Handler for getting all Notes with their owner's username
pub async fn get_all_notes(
    State(data): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    let notes = data.notes.list().await?;
    Ok((StatusCode::OK, Json(notes)))
}

// Handler for creating a new Note
pub async fn create_new_note(
    State(data): State<Arc<AppState>>,
    payload: Result<Json<CreateNoteSchema>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let new_note = body(payload, FIELDS_REQUIRED)?.validate()?;
    data.notes.create(new_note).await?;

    Ok(success(StatusCode::CREATED, "New note created".to_string()))
}

// Handler for updating a Note, identified by the id in the body
pub async fn update_note(
    State(data): State<Arc<AppState>>,
    payload: Result<Json<UpdateNoteSchema>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let changes = body(payload, FIELDS_REQUIRED)?.validate()?;
    let note = data.notes.update(changes).await?;

    Ok(success(StatusCode::OK, format!("{} updated", note.title)))
}

// Handler for deleting a Note, identified by the id in the body
pub async fn delete_note(
    State(data): State<Arc<AppState>>,
    payload: Result<Json<DeleteNoteSchema>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let id = body(payload, ID_REQUIRED)?.validate()?;
    let note = data.notes.delete(id).await?;

    Ok(success(
        StatusCode::OK,
        format!("Note {} with ID {} deleted", note.title, note.id),
    ))
}
