use axum::{Json, extract::State};

use super::{reject_blank, require_non_empty, validate_score};
use crate::{
    AppState,
    auth::{AdminUser, AuthUser},
    error::{ApiError, AppJson, IdPath},
    models::{BookReview, CreateBookReviewRequest, MessageResponse, UpdateBookReviewRequest},
    ownership::ensure_owner,
};

/// get_book_reviews
///
/// [Admin Route] Every review in the system, newest first.
#[utoipa::path(
    get,
    path = "/book_reviews",
    responses(
        (status = 200, description = "All reviews", body = [BookReview]),
        (status = 401, description = "Not an administrator", body = MessageResponse)
    )
)]
pub async fn get_book_reviews(
    _admin: AdminUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<BookReview>>, ApiError> {
    Ok(Json(state.repo.get_book_reviews().await?))
}

/// create_book_review
///
/// [Authenticated Route] Posts a review owned by the caller. The owner always
/// comes from the authenticated identity, never from the body.
#[utoipa::path(
    post,
    path = "/book_reviews",
    request_body = CreateBookReviewRequest,
    responses((status = 200, description = "Created", body = BookReview))
)]
pub async fn create_book_review(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateBookReviewRequest>,
) -> Result<Json<BookReview>, ApiError> {
    validate_score(payload.score)?;
    require_non_empty("review", &payload.review)?;

    Ok(Json(state.repo.create_book_review(user.id, payload).await?))
}

/// get_book_review
///
/// [Authenticated Route]
#[utoipa::path(
    get,
    path = "/book_reviews/{id}",
    params(("id" = i64, Path, description = "Review ID")),
    responses(
        (status = 200, description = "Found", body = BookReview),
        (status = 404, description = "Book review not found", body = MessageResponse)
    )
)]
pub async fn get_book_review(
    _auth: AuthUser,
    State(state): State<AppState>,
    IdPath(id): IdPath,
) -> Result<Json<BookReview>, ApiError> {
    Ok(Json(state.repo.get_book_review_by_id(id).await?))
}

/// update_book_review
///
/// [Authenticated Route] Owner-only. The review is loaded first so a missing
/// review is a 404 and someone else's review is `Forbidden`.
#[utoipa::path(
    put,
    path = "/book_reviews/{id}",
    params(("id" = i64, Path, description = "Review ID")),
    request_body = UpdateBookReviewRequest,
    responses(
        (status = 200, description = "Updated", body = BookReview),
        (status = 400, description = "Forbidden or invalid payload", body = MessageResponse)
    )
)]
pub async fn update_book_review(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    IdPath(id): IdPath,
    AppJson(payload): AppJson<UpdateBookReviewRequest>,
) -> Result<Json<BookReview>, ApiError> {
    let review = state.repo.get_book_review_by_id(id).await?;
    ensure_owner(&user, &review)?;

    if let Some(score) = payload.score {
        validate_score(score)?;
    }
    reject_blank("review", payload.review.as_deref())?;

    Ok(Json(state.repo.update_book_review(id, payload).await?))
}

/// delete_book_review
///
/// [Authenticated Route] Owner-only, same rules as update.
#[utoipa::path(
    delete,
    path = "/book_reviews/{id}",
    params(("id" = i64, Path, description = "Review ID")),
    responses(
        (status = 200, description = "Deleted", body = MessageResponse),
        (status = 400, description = "Forbidden", body = MessageResponse),
        (status = 404, description = "Book review not found", body = MessageResponse)
    )
)]
pub async fn delete_book_review(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    IdPath(id): IdPath,
) -> Result<Json<MessageResponse>, ApiError> {
    let review = state.repo.get_book_review_by_id(id).await?;
    ensure_owner(&user, &review)?;

    state.repo.delete_book_review(id).await?;
    Ok(Json(MessageResponse::new("Book review deleted successfully")))
}
