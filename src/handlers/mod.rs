use axum::Json;

use crate::{error::ApiError, models::MessageResponse};

pub mod auth;
pub mod book_reviews;
pub mod books;
pub mod users;

/// health
///
/// [Public Route] Liveness probe.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up", body = MessageResponse))
)]
pub async fn health() -> Json<MessageResponse> {
    Json(MessageResponse::new("OK"))
}

/// Rejects blank required text fields with a 400 naming the field.
pub(crate) fn require_non_empty(field: &str, value: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::BadRequest(format!("{} must not be empty", field)));
    }
    Ok(())
}

/// Same check for optional fields of a partial update: absent is fine, blank is not.
pub(crate) fn reject_blank(field: &str, value: Option<&str>) -> Result<(), ApiError> {
    match value {
        Some(v) => require_non_empty(field, v),
        None => Ok(()),
    }
}

pub(crate) fn validate_score(score: i32) -> Result<(), ApiError> {
    if !(1..=5).contains(&score) {
        return Err(ApiError::BadRequest("score must be between 1 and 5".to_string()));
    }
    Ok(())
}
