//! In-memory implementation of the blob store.
//!
//! Primarily used for testing and local development.

use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures_util::future::BoxFuture;

use super::{BlobObject, BlobStore};

#[derive(Debug, Clone)]
struct StoredObject {
    body: Bytes,
    last_modified: DateTime<Utc>,
}

/// Thread-safe in-memory blob store, keyed by `(bucket, key)`.
#[derive(Clone)]
pub struct InMemoryBlobStore {
    objects: Arc<papaya::HashMap<(String, String), StoredObject>>,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self {
            objects: Arc::new(papaya::HashMap::new()),
        }
    }

    /// Inserts an object with an explicit modification time.
    pub fn insert_at(&self, bucket: &str, key: &str, body: Bytes, last_modified: DateTime<Utc>) {
        self.objects.pin().insert(
            (bucket.to_owned(), key.to_owned()),
            StoredObject {
                body,
                last_modified,
            },
        );
    }

    pub fn contains(&self, bucket: &str, key: &str) -> bool {
        self.objects
            .pin()
            .contains_key(&(bucket.to_owned(), key.to_owned()))
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryBlobStore {
    fn default() -> Self {
        Self::new()
    }
}

impl BlobStore for InMemoryBlobStore {
    fn put_object<'a>(
        &'a self,
        bucket: &'a str,
        key: &'a str,
        body: Bytes,
    ) -> BoxFuture<'a, eyre::Result<()>> {
        Box::pin(async move {
            self.insert_at(bucket, key, body, Utc::now());
            Ok(())
        })
    }

    fn get_object<'a>(
        &'a self,
        bucket: &'a str,
        key: &'a str,
    ) -> BoxFuture<'a, eyre::Result<Bytes>> {
        Box::pin(async move {
            self.objects
                .pin()
                .get(&(bucket.to_owned(), key.to_owned()))
                .map(|object| object.body.clone())
                .ok_or_else(|| eyre::eyre!("NoSuchKey: {bucket}/{key}"))
        })
    }

    fn object_exists<'a>(
        &'a self,
        bucket: &'a str,
        key: &'a str,
    ) -> BoxFuture<'a, eyre::Result<bool>> {
        Box::pin(async move { Ok(self.contains(bucket, key)) })
    }

    fn delete_object<'a>(
        &'a self,
        bucket: &'a str,
        key: &'a str,
    ) -> BoxFuture<'a, eyre::Result<()>> {
        Box::pin(async move {
            // Like S3, deleting a missing key succeeds.
            self.objects
                .pin()
                .remove(&(bucket.to_owned(), key.to_owned()));
            Ok(())
        })
    }

    fn list_objects<'a>(&'a self, bucket: &'a str) -> BoxFuture<'a, eyre::Result<Vec<BlobObject>>> {
        Box::pin(async move {
            let mut objects = self
                .objects
                .pin()
                .iter()
                .filter(|((b, _), _)| b == bucket)
                .map(|((_, key), object)| BlobObject {
                    key: key.clone(),
                    last_modified: object.last_modified,
                })
                .collect::<Vec<_>>();

            objects.sort_by(|a, b| a.key.cmp(&b.key));

            Ok(objects)
        })
    }

    fn delete_objects<'a>(
        &'a self,
        bucket: &'a str,
        keys: Vec<String>,
    ) -> BoxFuture<'a, eyre::Result<usize>> {
        Box::pin(async move {
            let objects = self.objects.pin();
            let deleted = keys
                .into_iter()
                .filter(|key| objects.remove(&(bucket.to_owned(), key.clone())).is_some())
                .count();
            Ok(deleted)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn buckets_are_isolated() {
        let store = InMemoryBlobStore::new();
        store
            .put_object("a", "key", Bytes::from_static(b"1"))
            .await
            .unwrap();

        assert!(store.object_exists("a", "key").await.unwrap());
        assert!(!store.object_exists("b", "key").await.unwrap());
        assert!(store.get_object("b", "key").await.is_err());
    }

    #[tokio::test]
    async fn delete_objects_counts_removed_keys() {
        let store = InMemoryBlobStore::new();
        store.put_object("a", "1", Bytes::new()).await.unwrap();
        store.put_object("a", "2", Bytes::new()).await.unwrap();

        let deleted = store
            .delete_objects("a", vec!["1".to_owned(), "3".to_owned()])
            .await
            .unwrap();
        assert_eq!(deleted, 1);
        assert_eq!(store.list_objects("a").await.unwrap().len(), 1);
    }
}
