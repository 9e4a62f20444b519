//! The extended client.
//!
//! [`ExtendedClient`] wraps a [`Transport`] and a [`BlobStore`] and moves
//! message bodies larger than the configured threshold out to blob storage.
//! Publishing lives in [`crate::publish`], receiving and deleting in
//! [`crate::consume`].

use std::sync::Arc;

use tracing::instrument;

use crate::{
    config::{Config, DEFAULT_MESSAGE_SIZE_THRESHOLD},
    error::Result,
    store::{s3::S3BlobStore, BlobStore, PayloadStore},
    transport::{aws::AwsTransport, Transport},
};

pub struct ExtendedClient {
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) payloads: PayloadStore,
    pub(crate) message_size_threshold: usize,
    pub(crate) always_through_s3: bool,
}

impl std::fmt::Debug for ExtendedClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtendedClient")
            .field("transport", &"<Transport>")
            .field("payloads", &self.payloads)
            .field("message_size_threshold", &self.message_size_threshold)
            .field("always_through_s3", &self.always_through_s3)
            .finish()
    }
}

#[bon::bon]
impl ExtendedClient {
    #[builder]
    pub fn new(
        transport: Arc<dyn Transport>,
        blob_store: Arc<dyn BlobStore>,
        bucket_name: Option<String>,
        #[builder(default = DEFAULT_MESSAGE_SIZE_THRESHOLD)] message_size_threshold: usize,
        #[builder(default)] always_through_s3: bool,
    ) -> Self {
        Self {
            transport,
            payloads: PayloadStore::new(blob_store, bucket_name),
            message_size_threshold,
            always_through_s3,
        }
    }
}

impl ExtendedClient {
    /// Builds a client talking to SNS, SQS and S3 with the given configuration.
    #[instrument(skip(config))]
    pub async fn from_config(config: &Config) -> Self {
        let sdk_config = config.sdk_config().await;

        let transport = AwsTransport::new(
            aws_sdk_sns::Client::new(&sdk_config),
            aws_sdk_sqs::Client::new(&sdk_config),
        );
        let blob_store = S3BlobStore::new(aws_sdk_s3::Client::new(&sdk_config));

        Self::builder()
            .transport(Arc::new(transport))
            .blob_store(Arc::new(blob_store))
            .maybe_bucket_name(config.s3_bucket_name.clone())
            .message_size_threshold(config.message_size_threshold())
            .always_through_s3(config.always_through_s3)
            .build()
    }

    pub fn is_large_payload_support_enabled(&self) -> bool {
        true
    }

    pub fn message_size_threshold(&self) -> usize {
        self.message_size_threshold
    }

    /// Sets the size above which message bodies are stored in blob storage.
    pub fn set_message_size_threshold(&mut self, message_size_threshold: usize) {
        self.message_size_threshold = message_size_threshold;
    }

    pub fn always_through_s3(&self) -> bool {
        self.always_through_s3
    }

    /// Sets whether every message body is stored in blob storage regardless
    /// of its size.
    pub fn set_always_through_s3(&mut self, always_through_s3: bool) {
        self.always_through_s3 = always_through_s3;
    }

    pub fn bucket_name(&self) -> Option<&str> {
        self.payloads.bucket()
    }

    pub fn set_bucket_name(&mut self, bucket_name: Option<String>) {
        self.payloads.set_bucket(bucket_name);
    }

    pub fn payloads(&self) -> &PayloadStore {
        &self.payloads
    }

    /// Deletes payloads in the configured bucket older than `keep`.
    /// Returns the number of objects removed.
    pub async fn sweep_stale_payloads(&self, keep: chrono::Duration) -> Result<usize> {
        self.payloads.sweep(chrono::Utc::now() - keep).await
    }
}
