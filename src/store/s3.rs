//! AWS S3 implementation of the blob store.

use aws_sdk_s3::{
    primitives::ByteStream,
    types::{Delete, ObjectIdentifier},
};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures_util::future::BoxFuture;
use tracing::debug;

use super::{BlobObject, BlobStore};

/// Blob store backed by an S3 (or S3-compatible) service.
#[derive(Clone)]
pub struct S3BlobStore {
    client: aws_sdk_s3::Client,
}

impl std::fmt::Debug for S3BlobStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3BlobStore")
            .field("client", &"<S3Client>")
            .finish()
    }
}

impl S3BlobStore {
    pub fn new(client: aws_sdk_s3::Client) -> Self {
        Self { client }
    }
}

impl BlobStore for S3BlobStore {
    fn put_object<'a>(
        &'a self,
        bucket: &'a str,
        key: &'a str,
        body: Bytes,
    ) -> BoxFuture<'a, eyre::Result<()>> {
        Box::pin(async move {
            debug!(bucket = %bucket, key = %key, size = body.len(), "uploading object to S3");

            self.client
                .put_object()
                .bucket(bucket)
                .key(key)
                .body(ByteStream::from(body))
                .send()
                .await?;

            Ok(())
        })
    }

    fn get_object<'a>(
        &'a self,
        bucket: &'a str,
        key: &'a str,
    ) -> BoxFuture<'a, eyre::Result<Bytes>> {
        Box::pin(async move {
            debug!(bucket = %bucket, key = %key, "downloading object from S3");

            let output = self
                .client
                .get_object()
                .bucket(bucket)
                .key(key)
                .send()
                .await?;

            Ok(output.body.collect().await?.into_bytes())
        })
    }

    fn object_exists<'a>(
        &'a self,
        bucket: &'a str,
        key: &'a str,
    ) -> BoxFuture<'a, eyre::Result<bool>> {
        Box::pin(async move {
            // The key itself sorts first among all keys it prefixes.
            let output = self
                .client
                .list_objects_v2()
                .bucket(bucket)
                .prefix(key)
                .max_keys(1)
                .send()
                .await?;

            Ok(output
                .contents()
                .first()
                .and_then(|object| object.key())
                .is_some_and(|found| found == key))
        })
    }

    fn delete_object<'a>(
        &'a self,
        bucket: &'a str,
        key: &'a str,
    ) -> BoxFuture<'a, eyre::Result<()>> {
        Box::pin(async move {
            self.client
                .delete_object()
                .bucket(bucket)
                .key(key)
                .send()
                .await?;

            Ok(())
        })
    }

    fn list_objects<'a>(&'a self, bucket: &'a str) -> BoxFuture<'a, eyre::Result<Vec<BlobObject>>> {
        Box::pin(async move {
            let mut pages = self
                .client
                .list_objects_v2()
                .bucket(bucket)
                .into_paginator()
                .send();

            let mut objects = Vec::new();
            while let Some(page) = pages.next().await {
                for object in page?.contents() {
                    let (Some(key), Some(modified)) = (object.key(), object.last_modified()) else {
                        continue;
                    };

                    let Some(last_modified) =
                        DateTime::<Utc>::from_timestamp(modified.secs(), modified.subsec_nanos())
                    else {
                        continue;
                    };

                    objects.push(BlobObject {
                        key: key.to_owned(),
                        last_modified,
                    });
                }
            }

            Ok(objects)
        })
    }

    fn delete_objects<'a>(
        &'a self,
        bucket: &'a str,
        keys: Vec<String>,
    ) -> BoxFuture<'a, eyre::Result<usize>> {
        Box::pin(async move {
            if keys.is_empty() {
                return Ok(0);
            }

            let objects = keys
                .into_iter()
                .map(|key| ObjectIdentifier::builder().key(key).build())
                .collect::<Result<Vec<_>, _>>()?;

            let delete = Delete::builder()
                .set_objects(Some(objects))
                .quiet(false)
                .build()?;

            let output = self
                .client
                .delete_objects()
                .bucket(bucket)
                .delete(delete)
                .send()
                .await?;

            if let Some(error) = output.errors().first() {
                return Err(eyre::eyre!(
                    "failed to delete {}: {}",
                    error.key().unwrap_or("<unknown>"),
                    error.message().unwrap_or("<no message>")
                ));
            }

            Ok(output.deleted().len())
        })
    }
}
