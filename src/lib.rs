use axum::{
    Router,
    extract::FromRef,
    http::HeaderName,
    middleware,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod ownership;
pub mod password;
pub mod repository;
pub mod storage;
pub mod token;

// Public and authenticated route groups.
pub mod routes;
use routes::{authenticated, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use error::ApiError;
pub use repository::{PostgresRepository, Repository, RepositoryState};
pub use storage::{MockStorageService, S3StorageClient, StorageState};
pub use token::TokenService;

/// ApiDoc
///
/// OpenAPI document for every handler carrying `#[utoipa::path]`, served at
/// `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health,
        handlers::auth::sign_up, handlers::auth::sign_in,
        handlers::users::get_users, handlers::users::get_profile, handlers::users::update_profile,
        handlers::users::upload_profile_image, handlers::users::get_user,
        handlers::users::update_user, handlers::users::delete_user,
        handlers::books::get_books, handlers::books::create_book, handlers::books::get_book,
        handlers::books::update_book, handlers::books::delete_book,
        handlers::book_reviews::get_book_reviews, handlers::book_reviews::create_book_review,
        handlers::book_reviews::get_book_review, handlers::book_reviews::update_book_review,
        handlers::book_reviews::delete_book_review,
    ),
    components(
        schemas(
            models::User, models::Role, models::Book, models::BookReview,
            models::SignUpRequest, models::SignInRequest, models::UpdateUserRequest,
            models::UpdateProfileRequest, models::CreateBookRequest, models::UpdateBookRequest,
            models::CreateBookReviewRequest, models::UpdateBookReviewRequest,
            models::ProfileImageForm, models::AuthUserResponse,
            models::MessageResponse,
        )
    ),
    tags(
        (name = "go-reads", description = "Book review API")
    )
)]
pub struct ApiDoc;

/// AppState
///
/// Immutable services shared by every request. Handlers take the whole state;
/// the gates pull only the pieces they need through `FromRef`.
#[derive(Clone)]
pub struct AppState {
    pub repo: RepositoryState,
    pub storage: StorageState,
    /// Built once from `APP_KEY` at startup.
    pub tokens: TokenService,
    pub config: AppConfig,
}

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for StorageState {
    fn from_ref(app_state: &AppState) -> StorageState {
        app_state.storage.clone()
    }
}

impl FromRef<AppState> for TokenService {
    fn from_ref(app_state: &AppState) -> TokenService {
        app_state.tokens.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// create_router
///
/// Public routes are merged as-is. The authenticated group gets the
/// `authenticate` route layer, so an unmatched path stays a 404 instead of a 401.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(
            authenticated::authenticated_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth::authenticate,
            )),
        )
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// Span per request, tagged with the generated `x-request-id` so every log
/// line of one request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
