use axum::{
    Json,
    extract::{Multipart, State, multipart::MultipartRejection},
};

use super::reject_blank;
use crate::{
    AppState,
    auth::{AdminUser, AuthUser},
    error::{ApiError, AppJson, IdPath},
    models::{
        MessageResponse, ProfileImageForm, UpdateProfileRequest, UpdateUserRequest, User,
    },
    ownership,
    storage::profile_image_key,
};

fn validate_user_changes(changes: &UpdateUserRequest) -> Result<(), ApiError> {
    reject_blank("firstName", changes.first_name.as_deref())?;
    reject_blank("lastName", changes.last_name.as_deref())?;
    reject_blank("email", changes.email.as_deref())
}

/// get_users
///
/// [Admin Route] Lists every registered user.
#[utoipa::path(
    get,
    path = "/users",
    responses(
        (status = 200, description = "All users", body = [User]),
        (status = 401, description = "Not an administrator", body = MessageResponse)
    )
)]
pub async fn get_users(
    _admin: AdminUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<User>>, ApiError> {
    Ok(Json(state.repo.get_users().await?))
}

/// get_profile
///
/// [Authenticated Route] The caller's own record, exactly as resolved by the
/// authentication gate.
#[utoipa::path(
    get,
    path = "/users/profile",
    responses((status = 200, description = "Profile", body = User))
)]
pub async fn get_profile(AuthUser(user): AuthUser) -> Json<User> {
    Json(user)
}

/// update_profile
///
/// [Authenticated Route] Edits the caller's own profile. The payload `id` must be
/// the caller's id; anything else is an ownership violation and nothing is written.
#[utoipa::path(
    put,
    path = "/users/profile",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Updated", body = User),
        (status = 400, description = "Forbidden or invalid payload", body = MessageResponse)
    )
)]
pub async fn update_profile(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<UpdateProfileRequest>,
) -> Result<Json<User>, ApiError> {
    ownership::check_owner(&user, payload.id)?;
    validate_user_changes(&payload.changes)?;

    let updated = state.repo.update_user(user.id, payload.changes).await?;
    Ok(Json(updated))
}

/// An `image` part read from a multipart body.
struct ImageUpload {
    filename: String,
    content_type: String,
    bytes: Vec<u8>,
}

/// Finds the `image` part; other parts are skipped.
async fn read_image_field(multipart: &mut Multipart) -> Result<ImageUpload, ApiError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("image") {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().unwrap_or_default().to_string();
        if !content_type.starts_with("image/") {
            return Err(ApiError::BadRequest(
                "image must have an image/* content type".to_string(),
            ));
        }

        let bytes = field.bytes().await?.to_vec();
        if bytes.is_empty() {
            return Err(ApiError::BadRequest("image must not be empty".to_string()));
        }

        return Ok(ImageUpload {
            filename,
            content_type,
            bytes,
        });
    }

    Err(ApiError::BadRequest("image field is required".to_string()))
}

/// upload_profile_image
///
/// [Authenticated Route] Uploads the caller's profile image from the `image`
/// part of a multipart form. The object key is written to the user only after
/// the upload succeeds; the updated user is returned.
#[utoipa::path(
    post,
    path = "/users/profile_image",
    request_body(content = ProfileImageForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Updated", body = User),
        (status = 400, description = "Missing or non-image file", body = MessageResponse)
    )
)]
pub async fn upload_profile_image(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<User>, ApiError> {
    let mut multipart = multipart?;
    let image = read_image_field(&mut multipart).await?;

    let key = profile_image_key(user.id, &image.filename);
    state
        .storage
        .put_object(&key, &image.content_type, image.bytes)
        .await?;

    let updated = state.repo.update_user_profile_image(user.id, &key).await?;
    tracing::info!(user_id = user.id, key = %key, "profile image updated");

    Ok(Json(updated))
}

/// get_user
///
/// [Authenticated Route] A single user by id.
#[utoipa::path(
    get,
    path = "/users/{id}",
    params(("id" = i64, Path, description = "User ID")),
    responses(
        (status = 200, description = "Found", body = User),
        (status = 404, description = "User not found", body = MessageResponse)
    )
)]
pub async fn get_user(
    _auth: AuthUser,
    State(state): State<AppState>,
    IdPath(id): IdPath,
) -> Result<Json<User>, ApiError> {
    Ok(Json(state.repo.get_user_by_id(id).await?))
}

/// update_user
///
/// [Admin Route] Partial update of any user.
#[utoipa::path(
    put,
    path = "/users/{id}",
    params(("id" = i64, Path, description = "User ID")),
    request_body = UpdateUserRequest,
    responses((status = 200, description = "Updated", body = User))
)]
pub async fn update_user(
    _admin: AdminUser,
    State(state): State<AppState>,
    IdPath(id): IdPath,
    AppJson(payload): AppJson<UpdateUserRequest>,
) -> Result<Json<User>, ApiError> {
    validate_user_changes(&payload)?;
    Ok(Json(state.repo.update_user(id, payload).await?))
}

/// delete_user
///
/// [Admin Route] Removes a user and, through the schema's cascades, their reviews.
#[utoipa::path(
    delete,
    path = "/users/{id}",
    params(("id" = i64, Path, description = "User ID")),
    responses(
        (status = 200, description = "Deleted", body = MessageResponse),
        (status = 404, description = "User not found", body = MessageResponse)
    )
)]
pub async fn delete_user(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    IdPath(id): IdPath,
) -> Result<Json<MessageResponse>, ApiError> {
    state.repo.delete_user(id).await?;
    tracing::info!(admin_id = admin.id, user_id = id, "user deleted");
    Ok(Json(MessageResponse::new("User deleted successfully")))
}
