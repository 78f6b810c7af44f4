use axum::{Json, extract::State};

use super::require_non_empty;
use crate::{
    AppState,
    error::{ApiError, AppJson},
    models::{AuthUserResponse, MessageResponse, NewUser, SignInRequest, SignUpRequest},
    password,
    repository::RepositoryError,
};

const DUPLICATE_EMAIL: &str = "User with same email already exists";

/// sign_up
///
/// [Public Route] Registers a user with the default `user` role and returns the
/// created record together with a one-hour access token. The password is hashed
/// before it reaches the repository and is never echoed back.
#[utoipa::path(
    post,
    path = "/auth/sign_up",
    request_body = SignUpRequest,
    responses(
        (status = 200, description = "Registered", body = AuthUserResponse),
        (status = 400, description = "Invalid payload or duplicate email", body = MessageResponse)
    )
)]
pub async fn sign_up(
    State(state): State<AppState>,
    AppJson(payload): AppJson<SignUpRequest>,
) -> Result<Json<AuthUserResponse>, ApiError> {
    require_non_empty("firstName", &payload.first_name)?;
    require_non_empty("lastName", &payload.last_name)?;
    require_non_empty("email", &payload.email)?;
    require_non_empty("password", &payload.password)?;

    match state.repo.get_user_by_email(&payload.email).await {
        Ok(_) => return Err(ApiError::BadRequest(DUPLICATE_EMAIL.to_string())),
        Err(RepositoryError::NotFound(_)) => {}
        Err(e) => return Err(e.into()),
    }

    let password = payload.password;
    let password_hash = tokio::task::spawn_blocking(move || password::hash_password(&password))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    let user = state
        .repo
        .create_user(NewUser {
            first_name: payload.first_name,
            last_name: payload.last_name,
            email: payload.email,
            password_hash,
        })
        .await
        .map_err(|e| match e {
            // Lost a race with a concurrent sign-up for the same address.
            RepositoryError::Conflict(_) => ApiError::BadRequest(DUPLICATE_EMAIL.to_string()),
            other => other.into(),
        })?;

    let access_token = state.tokens.issue(user.id)?;
    tracing::info!(user_id = user.id, "user signed up");

    Ok(Json(AuthUserResponse { user, access_token }))
}

/// sign_in
///
/// [Public Route] Exchanges email and password for an access token. An unknown
/// email and a wrong password produce the same 401.
#[utoipa::path(
    post,
    path = "/auth/sign_in",
    request_body = SignInRequest,
    responses(
        (status = 200, description = "Signed in", body = AuthUserResponse),
        (status = 401, description = "Invalid email or password", body = MessageResponse)
    )
)]
pub async fn sign_in(
    State(state): State<AppState>,
    AppJson(payload): AppJson<SignInRequest>,
) -> Result<Json<AuthUserResponse>, ApiError> {
    require_non_empty("email", &payload.email)?;
    require_non_empty("password", &payload.password)?;

    let user = match state.repo.get_user_by_email(&payload.email).await {
        Ok(user) => Some(user),
        Err(RepositoryError::NotFound(_)) => None,
        Err(e) => return Err(e.into()),
    };

    // Unknown emails still pay for one argon2 verification.
    let password = payload.password;
    let stored_hash = user.as_ref().map(|user| user.password_hash.clone());
    let matches = tokio::task::spawn_blocking(move || match stored_hash {
        Some(hash) => password::verify_password(&password, &hash),
        None => password::verify_against_dummy(&password),
    })
    .await
    .map_err(|e| ApiError::Internal(e.to_string()))?;

    let user = match user {
        Some(user) if matches => user,
        Some(user) => {
            tracing::debug!(user_id = user.id, "sign-in with wrong password");
            return Err(ApiError::InvalidCredentials);
        }
        None => return Err(ApiError::InvalidCredentials),
    };

    let access_token = state.tokens.issue(user.id)?;

    Ok(Json(AuthUserResponse { user, access_token }))
}
