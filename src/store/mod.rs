//! Blob storage for offloaded payloads.
//!
//! [`BlobStore`] is the raw object-storage seam, implemented for S3 and in
//! memory. [`PayloadStore`] sits on top of it and speaks in payloads and
//! [`BlobPointer`]s: it picks keys, encodes text, and distinguishes a missing
//! object from an empty one.

use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures_util::future::BoxFuture;
use itertools::Itertools;
use snafu::ResultExt;
use tracing::{debug, info, instrument};

use crate::{
    error::{Error, InvalidUtf8Snafu, Result},
    pointer::BlobPointer,
};

pub mod memory;
pub mod s3;

/// Maximum number of keys removed by a single [`BlobStore::delete_objects`] call.
pub const DELETE_BATCH_SIZE: usize = 1000;

/// Summary of a stored object, as reported by a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobObject {
    pub key: String,
    pub last_modified: DateTime<Utc>,
}

/// Core trait for object storage backends.
pub trait BlobStore: Send + Sync + 'static {
    /// Writes `body` under `key`, replacing any existing object.
    fn put_object<'a>(
        &'a self,
        bucket: &'a str,
        key: &'a str,
        body: Bytes,
    ) -> BoxFuture<'a, eyre::Result<()>>;

    /// Reads the object stored under `key`. Fails if it does not exist.
    fn get_object<'a>(&'a self, bucket: &'a str, key: &'a str)
        -> BoxFuture<'a, eyre::Result<Bytes>>;

    /// Whether an object with exactly `key` exists, checked by listing the
    /// `key` prefix.
    fn object_exists<'a>(&'a self, bucket: &'a str, key: &'a str)
        -> BoxFuture<'a, eyre::Result<bool>>;

    fn delete_object<'a>(&'a self, bucket: &'a str, key: &'a str)
        -> BoxFuture<'a, eyre::Result<()>>;

    /// Lists every object in `bucket`.
    fn list_objects<'a>(&'a self, bucket: &'a str) -> BoxFuture<'a, eyre::Result<Vec<BlobObject>>>;

    /// Deletes up to [`DELETE_BATCH_SIZE`] objects, returning how many were removed.
    fn delete_objects<'a>(
        &'a self,
        bucket: &'a str,
        keys: Vec<String>,
    ) -> BoxFuture<'a, eyre::Result<usize>>;
}

/// Stores and retrieves message payloads in a fixed bucket.
#[derive(Clone)]
pub struct PayloadStore {
    backend: Arc<dyn BlobStore>,
    bucket: Option<String>,
}

impl std::fmt::Debug for PayloadStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PayloadStore")
            .field("backend", &"<BlobStore>")
            .field("bucket", &self.bucket)
            .finish()
    }
}

impl PayloadStore {
    pub fn new(backend: Arc<dyn BlobStore>, bucket: Option<String>) -> Self {
        Self { backend, bucket }
    }

    /// The configured bucket, if it is set and not blank.
    pub fn bucket(&self) -> Option<&str> {
        self.bucket
            .as_deref()
            .filter(|bucket| !bucket.trim().is_empty())
    }

    pub fn set_bucket(&mut self, bucket: Option<String>) {
        self.bucket = bucket;
    }

    /// Writes `body` under a fresh random key in the configured bucket.
    #[instrument(skip(self, body), fields(size = body.len()))]
    pub async fn store(&self, body: &str) -> Result<BlobPointer> {
        let bucket = self.bucket().ok_or(Error::MissingBucket)?;
        let key = uuid::Uuid::new_v4().to_string();

        self.backend
            .put_object(bucket, &key, Bytes::copy_from_slice(body.as_bytes()))
            .await
            .map_err(|e| Error::store("put", e))?;

        info!(bucket = %bucket, key = %key, "stored message payload");

        Ok(BlobPointer::new(bucket, key))
    }

    /// Reads the payload stored under `key`, or `None` if no object has
    /// exactly that key.
    #[instrument(skip(self))]
    pub async fn fetch(&self, bucket: &str, key: &str) -> Result<Option<String>> {
        let exists = self
            .backend
            .object_exists(bucket, key)
            .await
            .map_err(|e| Error::store("exists", e))?;

        if !exists {
            debug!("payload not found");
            return Ok(None);
        }

        let bytes = self
            .backend
            .get_object(bucket, key)
            .await
            .map_err(|e| Error::store("get", e))?;

        let text = String::from_utf8(bytes.to_vec()).context(InvalidUtf8Snafu { bucket, key })?;

        Ok(Some(text))
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, bucket: &str, key: &str) -> Result<()> {
        self.backend
            .delete_object(bucket, key)
            .await
            .map_err(|e| Error::store("delete", e))?;

        info!("deleted message payload");

        Ok(())
    }

    /// Deletes every payload in the configured bucket last modified before
    /// `older_than`. Returns the number of objects removed.
    #[instrument(skip(self))]
    pub async fn sweep(&self, older_than: DateTime<Utc>) -> Result<usize> {
        let bucket = self.bucket().ok_or(Error::MissingBucket)?;

        let objects = self
            .backend
            .list_objects(bucket)
            .await
            .map_err(|e| Error::store("list", e))?;

        let stale = objects
            .into_iter()
            .filter(|object| object.last_modified < older_than)
            .map(|object| object.key)
            .collect::<Vec<_>>();

        debug!(count = stale.len(), "found stale payloads");

        let batches = stale
            .into_iter()
            .chunks(DELETE_BATCH_SIZE)
            .into_iter()
            .map(|chunk| chunk.collect::<Vec<_>>())
            .collect::<Vec<_>>();

        let mut deleted = 0;
        for batch in batches {
            deleted += self
                .backend
                .delete_objects(bucket, batch)
                .await
                .map_err(|e| Error::store("delete batch", e))?;
        }

        info!(bucket = %bucket, deleted, "swept stale payloads");

        Ok(deleted)
    }
}
