use async_trait::async_trait;
use aws_sdk_s3 as s3;
use s3::primitives::ByteStream;
use std::sync::{Arc, Mutex};

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("upload failed: {0}")]
    Upload(String),

    #[error("object storage unavailable: {0}")]
    Unavailable(String),
}

/// StorageService
///
/// Object storage for profile images. The API uploads the bytes itself and
/// records the object key on the user only once the upload has succeeded.
#[async_trait]
pub trait StorageService: Send + Sync {
    /// Creates the configured bucket if it is missing. Used for local MinIO setups.
    async fn ensure_bucket_exists(&self);

    /// Stores `body` under `key` with the given content type.
    async fn put_object(
        &self,
        key: &str,
        content_type: &str,
        body: Vec<u8>,
    ) -> Result<(), StorageError>;
}

/// S3StorageClient
///
/// S3-compatible implementation (AWS, MinIO). Path-style addressing keeps
/// MinIO working without DNS bucket names.
#[derive(Clone)]
pub struct S3StorageClient {
    client: s3::Client,
    bucket_name: String,
}

impl S3StorageClient {
    pub fn new(endpoint: &str, region: &str, access_key: &str, secret_key: &str, bucket: &str) -> Self {
        let credentials =
            s3::config::Credentials::new(access_key, secret_key, None, None, "static");

        let config = s3::Config::builder()
            .credentials_provider(credentials)
            .endpoint_url(endpoint)
            .region(s3::config::Region::new(region.to_string()))
            .behavior_version_latest()
            .force_path_style(true)
            .build();

        Self {
            client: s3::Client::from_conf(config),
            bucket_name: bucket.to_string(),
        }
    }
}

#[async_trait]
impl StorageService for S3StorageClient {
    async fn ensure_bucket_exists(&self) {
        // CreateBucket fails harmlessly when the bucket is already there.
        if let Err(e) = self
            .client
            .create_bucket()
            .bucket(&self.bucket_name)
            .send()
            .await
        {
            tracing::debug!("create_bucket {}: {}", self.bucket_name, e);
        }
    }

    async fn put_object(
        &self,
        key: &str,
        content_type: &str,
        body: Vec<u8>,
    ) -> Result<(), StorageError> {
        let size = body.len();

        self.client
            .put_object()
            .bucket(&self.bucket_name)
            .key(sanitize_key(key))
            .content_type(content_type)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| StorageError::Upload(e.to_string()))?;

        tracing::debug!(key, size, "object stored");
        Ok(())
    }
}

/// Strips empty, `.` and `..` segments from an object key.
pub fn sanitize_key(key: &str) -> String {
    key.split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".." && *segment != ".")
        .collect::<Vec<_>>()
        .join("/")
}

/// profile_image_key
///
/// Object key for a user's profile image. The extension comes from the
/// uploaded filename (lower-cased, `bin` when there is none).
pub fn profile_image_key(user_id: i64, filename: &str) -> String {
    let extension = std::path::Path::new(filename)
        .extension()
        .and_then(std::ffi::OsStr::to_str)
        .filter(|ext| ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(str::to_ascii_lowercase)
        .unwrap_or_else(|| "bin".to_string());

    format!("profile/user/{}/profile_image.{}", user_id, extension)
}

/// An object accepted by `MockStorageService`.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredObject {
    pub key: String,
    pub content_type: String,
    pub size: usize,
}

/// MockStorageService
///
/// In-memory stand-in used by tests: keeps a log of stored objects, or fails on
/// demand. Clones share the same log.
#[derive(Clone, Default)]
pub struct MockStorageService {
    pub should_fail: bool,
    stored: Arc<Mutex<Vec<StoredObject>>>,
}

impl MockStorageService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    /// Objects stored so far, oldest first.
    pub fn stored(&self) -> Vec<StoredObject> {
        self.stored
            .lock()
            .map(|objects| objects.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl StorageService for MockStorageService {
    async fn ensure_bucket_exists(&self) {}

    async fn put_object(
        &self,
        key: &str,
        content_type: &str,
        body: Vec<u8>,
    ) -> Result<(), StorageError> {
        if self.should_fail {
            return Err(StorageError::Unavailable("mock failure requested".to_string()));
        }

        let object = StoredObject {
            key: sanitize_key(key),
            content_type: content_type.to_string(),
            size: body.len(),
        };
        self.stored
            .lock()
            .map_err(|e| StorageError::Unavailable(e.to_string()))?
            .push(object);
        Ok(())
    }
}

/// StorageState
///
/// The concrete type used to share the storage service across the application state.
pub type StorageState = Arc<dyn StorageService>;
