use axum::{
    extract::{FromRef, FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};

use crate::{
    error::ApiError,
    models::User,
    repository::{Repository, RepositoryError, RepositoryState},
    token::TokenService,
};

/// AuthUser
///
/// The identity resolved by the authentication gate. The gate stores it in the
/// request extensions; handlers take it as an extractor argument and never look
/// at the raw `Authorization` header themselves.
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

/// AdminUser
///
/// An `AuthUser` whose role resolved to `admin`. Taking it as a handler argument
/// puts the route behind the authorization gate.
#[derive(Debug, Clone)]
pub struct AdminUser(pub User);

/// bearer_token
///
/// Splits `<scheme> <token>` on spaces and returns the second segment. The
/// scheme itself is not checked, it only has to be present.
pub fn bearer_token(header: Option<&str>) -> Option<&str> {
    let mut segments = header?.split(' ');
    let _scheme = segments.next().filter(|s| !s.is_empty())?;
    segments.next().filter(|t| !t.is_empty())
}

/// resolve_identity
///
/// Header → token → claims → user id → `User`. Every failure is
/// `Unauthorized`; the reason only reaches the logs.
pub async fn resolve_identity(
    header: Option<&str>,
    tokens: &TokenService,
    repo: &dyn Repository,
) -> Result<User, ApiError> {
    let token = bearer_token(header).ok_or_else(|| {
        tracing::debug!("missing or malformed authorization header");
        ApiError::Unauthorized
    })?;

    let claims = tokens.verify(token).map_err(|e| {
        tracing::debug!("token rejected: {}", e);
        ApiError::Unauthorized
    })?;

    let user_id = claims.user_id().ok_or_else(|| {
        tracing::debug!("token subject {:?} is not a user id", claims.sub);
        ApiError::Unauthorized
    })?;

    // A storage outage must look exactly like a bad token to the client.
    repo.get_user_by_id(user_id).await.map_err(|e| {
        match e {
            RepositoryError::NotFound(_) => tracing::debug!("token subject {} has no user", user_id),
            other => tracing::error!("user lookup failed during authentication: {}", other),
        }
        ApiError::Unauthorized
    })
}

/// authorize_admin
///
/// Resolves the user's role and allows only an exact `admin` match.
pub async fn authorize_admin(user: Option<&User>, repo: &dyn Repository) -> Result<(), ApiError> {
    let user = user.ok_or(ApiError::Unauthorized)?;

    let role = repo.get_role_by_id(user.role_id).await.map_err(|e| {
        tracing::error!("role lookup failed for user {}: {}", user.id, e);
        ApiError::Unauthorized
    })?;

    if !role.is_admin() {
        tracing::debug!("user {} with role {:?} denied admin route", user.id, role.name);
        return Err(ApiError::Unauthorized);
    }

    Ok(())
}

/// authenticate
///
/// Route layer for every protected group. Rejects with 401 before the handler
/// runs, or attaches the resolved `AuthUser` to this request only.
pub async fn authenticate(
    State(repo): State<RepositoryState>,
    State(tokens): State<TokenService>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    let user = resolve_identity(header, &tokens, repo.as_ref()).await?;

    request.extensions_mut().insert(AuthUser(user));
    Ok(next.run(request).await)
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    /// Unauthorized when the `authenticate` layer did not run for this route.
    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or(ApiError::Unauthorized)
    }
}

impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let repo = RepositoryState::from_ref(state);
        let user = parts.extensions.get::<AuthUser>().map(|auth| auth.0.clone());

        authorize_admin(user.as_ref(), repo.as_ref()).await?;

        user.map(AdminUser).ok_or(ApiError::Unauthorized)
    }
}
