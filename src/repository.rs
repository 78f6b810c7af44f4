use crate::models::{
    Book, BookReview, CreateBookRequest, CreateBookReviewRequest, NewUser, Role,
    UpdateBookRequest, UpdateBookReviewRequest, UpdateUserRequest, User,
};
use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;

/// RepositoryError
///
/// Domain-level persistence failures. Handlers map these onto HTTP errors; the
/// authentication gates collapse all of them into `Unauthorized`.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Database(sqlx::Error),
}

impl RepositoryError {
    /// Maps a sqlx error for `entity`: missing rows become `NotFound`, unique
    /// violations become `Conflict`.
    fn from_sqlx(entity: &'static str, err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => RepositoryError::NotFound(entity),
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                RepositoryError::Conflict(format!("{} already exists", entity))
            }
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                RepositoryError::Conflict(format!("{} references a missing record", entity))
            }
            other => {
                tracing::error!("{} query error: {:?}", entity, other);
                RepositoryError::Database(other)
            }
        }
    }
}

pub type RepoResult<T> = Result<T, RepositoryError>;

/// Repository Trait
///
/// The persistence contract consumed by the gates and handlers. One production
/// implementation (`PostgresRepository`); tests substitute in-memory fakes.
///
/// **Send + Sync + async_trait** are required so `Arc<dyn Repository>` can live
/// in the shared application state.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users ---
    async fn get_users(&self) -> RepoResult<Vec<User>>;
    async fn get_user_by_id(&self, id: i64) -> RepoResult<User>;
    async fn get_user_by_email(&self, email: &str) -> RepoResult<User>;
    // New users are always created with the `user` role.
    async fn create_user(&self, user: NewUser) -> RepoResult<User>;
    async fn update_user(&self, id: i64, req: UpdateUserRequest) -> RepoResult<User>;
    async fn update_user_profile_image(&self, id: i64, key: &str) -> RepoResult<User>;
    async fn delete_user(&self, id: i64) -> RepoResult<()>;

    // --- Roles ---
    async fn get_role_by_id(&self, id: i64) -> RepoResult<Role>;

    // --- Books ---
    async fn get_books(&self) -> RepoResult<Vec<Book>>;
    async fn get_book_by_id(&self, id: i64) -> RepoResult<Book>;
    async fn create_book(&self, req: CreateBookRequest) -> RepoResult<Book>;
    async fn update_book(&self, id: i64, req: UpdateBookRequest) -> RepoResult<Book>;
    async fn delete_book(&self, id: i64) -> RepoResult<()>;

    // --- Book Reviews ---
    async fn get_book_reviews(&self) -> RepoResult<Vec<BookReview>>;
    async fn get_book_review_by_id(&self, id: i64) -> RepoResult<BookReview>;
    async fn create_book_review(
        &self,
        user_id: i64,
        req: CreateBookReviewRequest,
    ) -> RepoResult<BookReview>;
    async fn update_book_review(
        &self,
        id: i64,
        req: UpdateBookReviewRequest,
    ) -> RepoResult<BookReview>;
    async fn delete_book_review(&self, id: i64) -> RepoResult<()>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

/// PostgresRepository
///
/// The `Repository` implementation backed by PostgreSQL.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const USER_COLUMNS: &str =
    "id, first_name, last_name, email, password_hash, role_id, profile_image_url, created_at";
const BOOK_COLUMNS: &str = "id, title, author, isbn, description, created_at, updated_at";
const REVIEW_COLUMNS: &str = "id, book_id, user_id, score, review, created_at, updated_at";

/// Turns a DELETE result into `NotFound` when nothing was removed.
fn ensure_deleted(
    entity: &'static str,
    result: Result<sqlx::postgres::PgQueryResult, sqlx::Error>,
) -> RepoResult<()> {
    match result {
        Ok(res) if res.rows_affected() > 0 => Ok(()),
        Ok(_) => Err(RepositoryError::NotFound(entity)),
        Err(e) => Err(RepositoryError::from_sqlx(entity, e)),
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn get_users(&self) -> RepoResult<Vec<User>> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY id"))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepositoryError::from_sqlx("User", e))
    }

    async fn get_user_by_id(&self, id: i64) -> RepoResult<User> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| RepositoryError::from_sqlx("User", e))
    }

    async fn get_user_by_email(&self, email: &str) -> RepoResult<User> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
            .bind(email)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| RepositoryError::from_sqlx("User", e))
    }

    /// Resolves the `user` role inside the insert so sign-up never needs a
    /// separate role lookup.
    async fn create_user(&self, user: NewUser) -> RepoResult<User> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (first_name, last_name, email, password_hash, role_id)
            VALUES ($1, $2, $3, $4, (SELECT id FROM roles WHERE name = $5))
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(user.first_name)
        .bind(user.last_name)
        .bind(user.email)
        .bind(user.password_hash)
        .bind(Role::USER)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepositoryError::from_sqlx("User", e))
    }

    /// Partial update: `COALESCE` keeps the stored value for every `None` field.
    async fn update_user(&self, id: i64, req: UpdateUserRequest) -> RepoResult<User> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET first_name = COALESCE($2, first_name),
                last_name = COALESCE($3, last_name),
                email = COALESCE($4, email)
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(req.first_name)
        .bind(req.last_name)
        .bind(req.email)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepositoryError::from_sqlx("User", e))
    }

    async fn update_user_profile_image(&self, id: i64, key: &str) -> RepoResult<User> {
        sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET profile_image_url = $2 WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(key)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepositoryError::from_sqlx("User", e))
    }

    async fn delete_user(&self, id: i64) -> RepoResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await;
        ensure_deleted("User", result)
    }

    async fn get_role_by_id(&self, id: i64) -> RepoResult<Role> {
        sqlx::query_as::<_, Role>("SELECT id, name FROM roles WHERE id = $1")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| RepositoryError::from_sqlx("Role", e))
    }

    async fn get_books(&self) -> RepoResult<Vec<Book>> {
        sqlx::query_as::<_, Book>(&format!("SELECT {BOOK_COLUMNS} FROM books ORDER BY id"))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepositoryError::from_sqlx("Book", e))
    }

    async fn get_book_by_id(&self, id: i64) -> RepoResult<Book> {
        sqlx::query_as::<_, Book>(&format!("SELECT {BOOK_COLUMNS} FROM books WHERE id = $1"))
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| RepositoryError::from_sqlx("Book", e))
    }

    async fn create_book(&self, req: CreateBookRequest) -> RepoResult<Book> {
        sqlx::query_as::<_, Book>(&format!(
            r#"
            INSERT INTO books (title, author, isbn, description)
            VALUES ($1, $2, $3, $4)
            RETURNING {BOOK_COLUMNS}
            "#
        ))
        .bind(req.title)
        .bind(req.author)
        .bind(req.isbn)
        .bind(req.description)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepositoryError::from_sqlx("Book", e))
    }

    async fn update_book(&self, id: i64, req: UpdateBookRequest) -> RepoResult<Book> {
        sqlx::query_as::<_, Book>(&format!(
            r#"
            UPDATE books
            SET title = COALESCE($2, title),
                author = COALESCE($3, author),
                isbn = COALESCE($4, isbn),
                description = COALESCE($5, description),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {BOOK_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(req.title)
        .bind(req.author)
        .bind(req.isbn)
        .bind(req.description)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepositoryError::from_sqlx("Book", e))
    }

    async fn delete_book(&self, id: i64) -> RepoResult<()> {
        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await;
        ensure_deleted("Book", result)
    }

    async fn get_book_reviews(&self) -> RepoResult<Vec<BookReview>> {
        sqlx::query_as::<_, BookReview>(&format!(
            "SELECT {REVIEW_COLUMNS} FROM book_reviews ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::from_sqlx("Book review", e))
    }

    async fn get_book_review_by_id(&self, id: i64) -> RepoResult<BookReview> {
        sqlx::query_as::<_, BookReview>(&format!(
            "SELECT {REVIEW_COLUMNS} FROM book_reviews WHERE id = $1"
        ))
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepositoryError::from_sqlx("Book review", e))
    }

    async fn create_book_review(
        &self,
        user_id: i64,
        req: CreateBookReviewRequest,
    ) -> RepoResult<BookReview> {
        sqlx::query_as::<_, BookReview>(&format!(
            r#"
            INSERT INTO book_reviews (book_id, user_id, score, review)
            VALUES ($1, $2, $3, $4)
            RETURNING {REVIEW_COLUMNS}
            "#
        ))
        .bind(req.book_id)
        .bind(user_id)
        .bind(req.score)
        .bind(req.review)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepositoryError::from_sqlx("Book review", e))
    }

    async fn update_book_review(
        &self,
        id: i64,
        req: UpdateBookReviewRequest,
    ) -> RepoResult<BookReview> {
        sqlx::query_as::<_, BookReview>(&format!(
            r#"
            UPDATE book_reviews
            SET score = COALESCE($2, score),
                review = COALESCE($3, review),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {REVIEW_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(req.score)
        .bind(req.review)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepositoryError::from_sqlx("Book review", e))
    }

    async fn delete_book_review(&self, id: i64) -> RepoResult<()> {
        let result = sqlx::query("DELETE FROM book_reviews WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await;
        ensure_deleted("Book review", result)
    }
}
