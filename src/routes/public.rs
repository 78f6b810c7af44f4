use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Routes reachable without an `Authorization` header.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for load balancers.
        .route("/health", get(handlers::health))
        // POST /auth/sign_up
        // Creates a `user`-role account and returns it with an access token.
        .route("/auth/sign_up", post(handlers::auth::sign_up))
        // POST /auth/sign_in
        .route("/auth/sign_in", post(handlers::auth::sign_in))
}
