use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;

// --- Core Application Schemas (Mapped to Database) ---

/// User
///
/// A registered reader, stored in the `users` table. The password hash is loaded
/// for sign-in verification but is never written into a response body.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct User {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    // Unique across all users.
    pub email: String,
    #[serde(skip_serializing, default)]
    #[ts(skip)]
    #[schema(ignore)]
    pub password_hash: String,
    // FK to roles.id.
    pub role_id: i64,
    // Object key of the uploaded profile image, if any.
    pub profile_image_url: Option<String>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// Role
///
/// Read-only reference data. The authorization gate treats the exact name
/// `"admin"` as the only privileged role.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Role {
    pub id: i64,
    pub name: String,
}

impl Role {
    pub const ADMIN: &'static str = "admin";
    pub const USER: &'static str = "user";

    pub fn is_admin(&self) -> bool {
        self.name == Self::ADMIN
    }
}

/// Book
///
/// Bibliographic record from the `books` table. Only administrators may mutate it.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub author: String,
    pub isbn: Option<String>,
    pub description: Option<String>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// BookReview
///
/// A user's review of a book. `user_id` is the owner: only that user may
/// update or delete the review.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct BookReview {
    pub id: i64,
    pub book_id: i64,
    pub user_id: i64,
    pub score: i32,
    pub review: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

// --- Request Payloads (Input Schemas) ---

/// SignUpRequest
///
/// Input payload for `POST /auth/sign_up`. The password is hashed before it
/// reaches the repository.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SignUpRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
}

/// SignInRequest
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

/// NewUser
///
/// Internal insert record handed to the repository after the password is hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password_hash: String,
}

/// UpdateUserRequest
///
/// Partial update payload for `PUT /users/{id}`. Absent fields keep their value.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UpdateUserRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// UpdateProfileRequest
///
/// Payload for `PUT /users/profile`. The caller names the profile it is editing
/// through `id`, which must be its own.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UpdateProfileRequest {
    pub id: i64,
    #[serde(flatten)]
    pub changes: UpdateUserRequest,
}

/// CreateBookRequest
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CreateBookRequest {
    pub title: String,
    pub author: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// UpdateBookRequest
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UpdateBookRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// CreateBookReviewRequest
///
/// Input payload for `POST /book_reviews`. The owner is never taken from the
/// body; the handler uses the authenticated user.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CreateBookReviewRequest {
    pub book_id: i64,
    pub score: i32,
    pub review: String,
}

/// UpdateBookReviewRequest
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UpdateBookReviewRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review: Option<String>,
}

/// ProfileImageForm
///
/// OpenAPI shape of the `multipart/form-data` body of `POST /users/profile_image`.
/// The handler reads the `image` part directly; this type is documentation only.
#[derive(ToSchema)]
pub struct ProfileImageForm {
    /// The image file. Its filename supplies the stored extension and its
    /// content type must be `image/*`.
    #[schema(value_type = String, format = Binary)]
    pub image: Vec<u8>,
}

// --- Response Payloads (Output Schemas) ---

/// AuthUserResponse
///
/// Returned by sign-up and sign-in: the user record plus a fresh access token.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct AuthUserResponse {
    pub user: User,
    pub access_token: String,
}

/// MessageResponse
///
/// Shared `{ "message": ... }` body used by confirmations and by every error.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, TS, Default, PartialEq)]
#[ts(export)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
