use crate::{
    AppState,
    handlers::{book_reviews, books, users},
};
use axum::{
    Router,
    routing::{get, post},
};

/// Authenticated Router Module
///
/// Every route here expects the `authenticate` layer applied by
/// `create_router`. Handlers marked admin in their docs re-check the role
/// through the `AdminUser` extractor; owner-only handlers call into
/// `ownership` after loading the resource.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // --- Users ---
        // GET /users (admin)
        .route("/users", get(users::get_users))
        // GET/PUT /users/profile
        // The caller's own record. PUT requires the payload id to match the caller.
        .route(
            "/users/profile",
            get(users::get_profile).put(users::update_profile),
        )
        // POST /users/profile_image
        // Multipart upload of the caller's profile image.
        .route("/users/profile_image", post(users::upload_profile_image))
        // GET /users/{id} (any user), PUT/DELETE (admin)
        .route(
            "/users/{id}",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        // --- Books ---
        // GET/POST /books (admin)
        .route("/books", get(books::get_books).post(books::create_book))
        // GET /books/{id} (any user), PUT/DELETE (admin)
        .route(
            "/books/{id}",
            get(books::get_book)
                .put(books::update_book)
                .delete(books::delete_book),
        )
        // --- Book reviews ---
        // GET (admin) / POST (any user, owner taken from the token)
        .route(
            "/book_reviews",
            get(book_reviews::get_book_reviews).post(book_reviews::create_book_review),
        )
        // GET (any user), PUT/DELETE (owner only)
        .route(
            "/book_reviews/{id}",
            get(book_reviews::get_book_review)
                .put(book_reviews::update_book_review)
                .delete(book_reviews::delete_book_review),
        )
}
