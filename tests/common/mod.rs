//! Shared fixtures for the router-level tests: an in-memory `Repository`
//! that records mutations, and helpers for building state and requests.
#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use chrono::Utc;
use go_reads::{
    AppConfig, AppState, MockStorageService, TokenService, create_router,
    models::{
        Book, BookReview, CreateBookRequest, CreateBookReviewRequest, NewUser, Role,
        UpdateBookRequest, UpdateBookReviewRequest, UpdateUserRequest, User,
    },
    password,
    repository::{RepoResult, Repository, RepositoryError, RepositoryState},
    storage::StorageState,
};
use serde_json::Value;
use std::{
    collections::BTreeMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
};
use tower::ServiceExt;

pub const TEST_SECRET: &str = "integration-test-signing-secret";
pub const ADMIN_ROLE_ID: i64 = 1;
pub const USER_ROLE_ID: i64 = 2;
/// Named `"Admin"`: close to, but not, the privileged role name.
pub const CAPITALIZED_ADMIN_ROLE_ID: i64 = 3;
/// No row in the roles table.
pub const MISSING_ROLE_ID: i64 = 99;

pub const ADMIN_ID: i64 = 1;
pub const ALICE_ID: i64 = 2;
pub const BOB_ID: i64 = 3;
/// Holds `MISSING_ROLE_ID`.
pub const ORPHAN_ROLE_USER_ID: i64 = 4;
/// Holds `CAPITALIZED_ADMIN_ROLE_ID`.
pub const CAPITALIZED_ADMIN_USER_ID: i64 = 6;

pub const ALICE_PASSWORD: &str = "alice-password";

#[derive(Default)]
struct Tables {
    users: BTreeMap<i64, User>,
    roles: BTreeMap<i64, Role>,
    books: BTreeMap<i64, Book>,
    reviews: BTreeMap<i64, BookReview>,
    next_id: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// InMemoryRepository
///
/// Seeded with an admin (id 1), alice (id 2) and bob (id 3), one book (id 1)
/// and one review (id 5) owned by alice. Users 4 and 6 carry a dangling role
/// id and an `"Admin"` role respectively. Every mutating call is appended to
/// `calls` so tests can assert that a rejected request never reached storage.
pub struct InMemoryRepository {
    tables: Mutex<Tables>,
    pub calls: Mutex<Vec<String>>,
    /// When set, `get_user_by_id` fails like a dropped database connection.
    pub fail_user_lookup: AtomicBool,
}

fn user(id: i64, first_name: &str, email: &str, role_id: i64, password_hash: String) -> User {
    User {
        id,
        first_name: first_name.to_string(),
        last_name: "Reader".to_string(),
        email: email.to_string(),
        password_hash,
        role_id,
        profile_image_url: None,
        created_at: Utc::now(),
    }
}

impl InMemoryRepository {
    pub fn seeded() -> Self {
        let mut tables = Tables::default();

        tables.roles.insert(
            ADMIN_ROLE_ID,
            Role { id: ADMIN_ROLE_ID, name: Role::ADMIN.to_string() },
        );
        tables.roles.insert(
            USER_ROLE_ID,
            Role { id: USER_ROLE_ID, name: Role::USER.to_string() },
        );
        tables.roles.insert(
            CAPITALIZED_ADMIN_ROLE_ID,
            Role { id: CAPITALIZED_ADMIN_ROLE_ID, name: "Admin".to_string() },
        );

        let alice_hash = password::hash_password(ALICE_PASSWORD).expect("hash seed password");
        tables.users.insert(ADMIN_ID, user(ADMIN_ID, "Ada", "admin@example.com", ADMIN_ROLE_ID, String::new()));
        tables.users.insert(ALICE_ID, user(ALICE_ID, "Alice", "alice@example.com", USER_ROLE_ID, alice_hash));
        tables.users.insert(BOB_ID, user(BOB_ID, "Bob", "bob@example.com", USER_ROLE_ID, String::new()));
        tables.users.insert(
            ORPHAN_ROLE_USER_ID,
            user(ORPHAN_ROLE_USER_ID, "Olive", "olive@example.com", MISSING_ROLE_ID, String::new()),
        );
        tables.users.insert(
            CAPITALIZED_ADMIN_USER_ID,
            user(CAPITALIZED_ADMIN_USER_ID, "Cap", "cap@example.com", CAPITALIZED_ADMIN_ROLE_ID, String::new()),
        );

        let now = Utc::now();
        tables.books.insert(
            1,
            Book {
                id: 1,
                title: "Dune".to_string(),
                author: "Frank Herbert".to_string(),
                isbn: None,
                description: None,
                created_at: now,
                updated_at: now,
            },
        );
        tables.reviews.insert(
            5,
            BookReview {
                id: 5,
                book_id: 1,
                user_id: ALICE_ID,
                score: 4,
                review: "Great world building".to_string(),
                created_at: now,
                updated_at: now,
            },
        );
        tables.next_id = 100;

        Self {
            tables: Mutex::new(tables),
            calls: Mutex::new(Vec::new()),
            fail_user_lookup: AtomicBool::new(false),
        }
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn review(&self, id: i64) -> Option<BookReview> {
        self.tables.lock().unwrap().reviews.get(&id).cloned()
    }

    pub fn user(&self, id: i64) -> Option<User> {
        self.tables.lock().unwrap().users.get(&id).cloned()
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn get_users(&self) -> RepoResult<Vec<User>> {
        Ok(self.tables.lock().unwrap().users.values().cloned().collect())
    }

    async fn get_user_by_id(&self, id: i64) -> RepoResult<User> {
        if self.fail_user_lookup.load(Ordering::SeqCst) {
            return Err(RepositoryError::Database(sqlx::Error::PoolTimedOut));
        }
        self.user(id).ok_or(RepositoryError::NotFound("User"))
    }

    async fn get_user_by_email(&self, email: &str) -> RepoResult<User> {
        self.tables
            .lock()
            .unwrap()
            .users
            .values()
            .find(|u| u.email == email)
            .cloned()
            .ok_or(RepositoryError::NotFound("User"))
    }

    async fn create_user(&self, new_user: NewUser) -> RepoResult<User> {
        self.record(format!("create_user:{}", new_user.email));
        let mut tables = self.tables.lock().unwrap();
        if tables.users.values().any(|u| u.email == new_user.email) {
            return Err(RepositoryError::Conflict("User already exists".to_string()));
        }
        let id = tables.next_id();
        let created = User {
            id,
            first_name: new_user.first_name,
            last_name: new_user.last_name,
            email: new_user.email,
            password_hash: new_user.password_hash,
            role_id: USER_ROLE_ID,
            profile_image_url: None,
            created_at: Utc::now(),
        };
        tables.users.insert(id, created.clone());
        Ok(created)
    }

    async fn update_user(&self, id: i64, req: UpdateUserRequest) -> RepoResult<User> {
        self.record(format!("update_user:{}", id));
        let mut tables = self.tables.lock().unwrap();
        let user = tables.users.get_mut(&id).ok_or(RepositoryError::NotFound("User"))?;
        if let Some(v) = req.first_name {
            user.first_name = v;
        }
        if let Some(v) = req.last_name {
            user.last_name = v;
        }
        if let Some(v) = req.email {
            user.email = v;
        }
        Ok(user.clone())
    }

    async fn update_user_profile_image(&self, id: i64, key: &str) -> RepoResult<User> {
        self.record(format!("update_user_profile_image:{}", id));
        let mut tables = self.tables.lock().unwrap();
        let user = tables.users.get_mut(&id).ok_or(RepositoryError::NotFound("User"))?;
        user.profile_image_url = Some(key.to_string());
        Ok(user.clone())
    }

    async fn delete_user(&self, id: i64) -> RepoResult<()> {
        self.record(format!("delete_user:{}", id));
        let mut tables = self.tables.lock().unwrap();
        tables.users.remove(&id).ok_or(RepositoryError::NotFound("User"))?;
        tables.reviews.retain(|_, r| r.user_id != id);
        Ok(())
    }

    async fn get_role_by_id(&self, id: i64) -> RepoResult<Role> {
        self.tables
            .lock()
            .unwrap()
            .roles
            .get(&id)
            .cloned()
            .ok_or(RepositoryError::NotFound("Role"))
    }

    async fn get_books(&self) -> RepoResult<Vec<Book>> {
        Ok(self.tables.lock().unwrap().books.values().cloned().collect())
    }

    async fn get_book_by_id(&self, id: i64) -> RepoResult<Book> {
        self.tables
            .lock()
            .unwrap()
            .books
            .get(&id)
            .cloned()
            .ok_or(RepositoryError::NotFound("Book"))
    }

    async fn create_book(&self, req: CreateBookRequest) -> RepoResult<Book> {
        self.record("create_book");
        let mut tables = self.tables.lock().unwrap();
        let id = tables.next_id();
        let now = Utc::now();
        let book = Book {
            id,
            title: req.title,
            author: req.author,
            isbn: req.isbn,
            description: req.description,
            created_at: now,
            updated_at: now,
        };
        tables.books.insert(id, book.clone());
        Ok(book)
    }

    async fn update_book(&self, id: i64, req: UpdateBookRequest) -> RepoResult<Book> {
        self.record(format!("update_book:{}", id));
        let mut tables = self.tables.lock().unwrap();
        let book = tables.books.get_mut(&id).ok_or(RepositoryError::NotFound("Book"))?;
        if let Some(v) = req.title {
            book.title = v;
        }
        if let Some(v) = req.author {
            book.author = v;
        }
        if req.isbn.is_some() {
            book.isbn = req.isbn;
        }
        if req.description.is_some() {
            book.description = req.description;
        }
        book.updated_at = Utc::now();
        Ok(book.clone())
    }

    async fn delete_book(&self, id: i64) -> RepoResult<()> {
        self.record(format!("delete_book:{}", id));
        let mut tables = self.tables.lock().unwrap();
        tables.books.remove(&id).ok_or(RepositoryError::NotFound("Book"))?;
        tables.reviews.retain(|_, r| r.book_id != id);
        Ok(())
    }

    async fn get_book_reviews(&self) -> RepoResult<Vec<BookReview>> {
        Ok(self.tables.lock().unwrap().reviews.values().cloned().collect())
    }

    async fn get_book_review_by_id(&self, id: i64) -> RepoResult<BookReview> {
        self.review(id).ok_or(RepositoryError::NotFound("Book review"))
    }

    async fn create_book_review(
        &self,
        user_id: i64,
        req: CreateBookReviewRequest,
    ) -> RepoResult<BookReview> {
        self.record(format!("create_book_review:{}", user_id));
        let mut tables = self.tables.lock().unwrap();
        if !tables.books.contains_key(&req.book_id) {
            return Err(RepositoryError::Conflict(
                "Book review references a missing record".to_string(),
            ));
        }
        let id = tables.next_id();
        let now = Utc::now();
        let review = BookReview {
            id,
            book_id: req.book_id,
            user_id,
            score: req.score,
            review: req.review,
            created_at: now,
            updated_at: now,
        };
        tables.reviews.insert(id, review.clone());
        Ok(review)
    }

    async fn update_book_review(
        &self,
        id: i64,
        req: UpdateBookReviewRequest,
    ) -> RepoResult<BookReview> {
        self.record(format!("update_book_review:{}", id));
        let mut tables = self.tables.lock().unwrap();
        let review = tables
            .reviews
            .get_mut(&id)
            .ok_or(RepositoryError::NotFound("Book review"))?;
        if let Some(score) = req.score {
            review.score = score;
        }
        if let Some(text) = req.review {
            review.review = text;
        }
        review.updated_at = Utc::now();
        Ok(review.clone())
    }

    async fn delete_book_review(&self, id: i64) -> RepoResult<()> {
        self.record(format!("delete_book_review:{}", id));
        self.tables
            .lock()
            .unwrap()
            .reviews
            .remove(&id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound("Book review"))
    }
}

/// TestApp
///
/// A router over the seeded in-memory repository, plus handles to inspect it.
pub struct TestApp {
    pub router: Router,
    pub repo: Arc<InMemoryRepository>,
    pub tokens: TokenService,
    /// Shares its object log with the storage inside the router.
    pub storage: MockStorageService,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_storage(MockStorageService::new())
    }

    pub fn with_storage(storage: MockStorageService) -> Self {
        let repo = Arc::new(InMemoryRepository::seeded());
        let tokens = TokenService::new(TEST_SECRET).expect("token service");
        let state = AppState {
            repo: repo.clone() as RepositoryState,
            storage: Arc::new(storage.clone()) as StorageState,
            tokens: tokens.clone(),
            config: AppConfig::default(),
        };

        Self {
            router: create_router(state),
            repo,
            tokens,
            storage,
        }
    }

    pub fn bearer(&self, user_id: i64) -> String {
        format!("Bearer {}", self.tokens.issue(user_id).expect("issue token"))
    }

    /// Sends one request with an optional JSON body.
    pub async fn send(
        &self,
        method: &str,
        uri: &str,
        auth: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(auth) = auth {
            builder = builder.header(header::AUTHORIZATION, auth);
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        self.dispatch(request).await
    }

    /// Posts a `multipart/form-data` body with a single file part named
    /// `field` as `user_id`.
    pub async fn upload_as(
        &self,
        user_id: i64,
        uri: &str,
        field: &str,
        filename: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> (StatusCode, Value) {
        const BOUNDARY: &str = "go-reads-test-boundary";

        let mut body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(bytes);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::AUTHORIZATION, self.bearer(user_id))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap();

        self.dispatch(request).await
    }

    /// Runs one request through the router; the body is parsed as JSON
    /// (`Value::Null` when empty).
    async fn dispatch(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    pub async fn send_as(
        &self,
        user_id: i64,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let auth = self.bearer(user_id);
        self.send(method, uri, Some(&auth), body).await
    }
}
