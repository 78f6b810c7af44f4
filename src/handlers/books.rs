use axum::{Json, extract::State};

use super::{reject_blank, require_non_empty};
use crate::{
    AppState,
    auth::{AdminUser, AuthUser},
    error::{ApiError, AppJson, IdPath},
    models::{Book, CreateBookRequest, MessageResponse, UpdateBookRequest},
};

/// get_books
///
/// [Admin Route] Full catalogue listing.
#[utoipa::path(
    get,
    path = "/books",
    responses(
        (status = 200, description = "All books", body = [Book]),
        (status = 401, description = "Not an administrator", body = MessageResponse)
    )
)]
pub async fn get_books(
    _admin: AdminUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<Book>>, ApiError> {
    Ok(Json(state.repo.get_books().await?))
}

/// create_book
///
/// [Admin Route] Adds a book to the catalogue.
#[utoipa::path(
    post,
    path = "/books",
    request_body = CreateBookRequest,
    responses((status = 200, description = "Created", body = Book))
)]
pub async fn create_book(
    _admin: AdminUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateBookRequest>,
) -> Result<Json<Book>, ApiError> {
    require_non_empty("title", &payload.title)?;
    require_non_empty("author", &payload.author)?;

    Ok(Json(state.repo.create_book(payload).await?))
}

/// get_book
///
/// [Authenticated Route] A single book by id.
#[utoipa::path(
    get,
    path = "/books/{id}",
    params(("id" = i64, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Found", body = Book),
        (status = 404, description = "Book not found", body = MessageResponse)
    )
)]
pub async fn get_book(
    _auth: AuthUser,
    State(state): State<AppState>,
    IdPath(id): IdPath,
) -> Result<Json<Book>, ApiError> {
    Ok(Json(state.repo.get_book_by_id(id).await?))
}

/// update_book
///
/// [Admin Route] Partial update; omitted fields are left unchanged.
#[utoipa::path(
    put,
    path = "/books/{id}",
    params(("id" = i64, Path, description = "Book ID")),
    request_body = UpdateBookRequest,
    responses((status = 200, description = "Updated", body = Book))
)]
pub async fn update_book(
    _admin: AdminUser,
    State(state): State<AppState>,
    IdPath(id): IdPath,
    AppJson(payload): AppJson<UpdateBookRequest>,
) -> Result<Json<Book>, ApiError> {
    reject_blank("title", payload.title.as_deref())?;
    reject_blank("author", payload.author.as_deref())?;

    Ok(Json(state.repo.update_book(id, payload).await?))
}

/// delete_book
///
/// [Admin Route]
#[utoipa::path(
    delete,
    path = "/books/{id}",
    params(("id" = i64, Path, description = "Book ID")),
    responses((status = 200, description = "Deleted", body = MessageResponse))
)]
pub async fn delete_book(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    IdPath(id): IdPath,
) -> Result<Json<MessageResponse>, ApiError> {
    state.repo.delete_book(id).await?;
    tracing::info!(admin_id = admin.id, book_id = id, "book deleted");
    Ok(Json(MessageResponse::new("Book deleted successfully")))
}
