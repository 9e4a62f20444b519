//! Receiving and deleting, resolving offloaded payloads on the way.

use serde::Deserialize;
use snafu::ResultExt;
use tracing::{debug, instrument, warn};

use crate::{
    client::ExtendedClient,
    error::{Error, MalformedEnvelopeSnafu, Result},
    message::{
        Notification, NotificationAttribute, RawMessage, ReceivedBody, ResolvedMessage,
        RESERVED_ATTRIBUTE_NAME, S3_BUCKET_NAME_ATTRIBUTE, S3_KEY_ATTRIBUTE,
    },
    pointer::BlobPointer,
    receipt,
};

impl ExtendedClient {
    /// Receives up to `max_messages` from `queue`, waiting at most
    /// `wait_seconds` for any to arrive.
    ///
    /// Offloaded payloads are fetched back from blob storage and their
    /// receipt handles are extended with the blob location, so that
    /// [`ExtendedClient::delete`] can find the blob again. Returns an empty
    /// list when no messages are available.
    ///
    /// Bodies that are not SNS notifications are passed through as parsed
    /// JSON documents. A body that is not JSON at all, or an offloaded payload
    /// that cannot be resolved, fails the whole call. The other messages of
    /// that batch were already received and stay invisible on the queue until
    /// their visibility timeout expires.
    #[instrument(skip(self))]
    pub async fn receive(
        &self,
        queue: &str,
        max_messages: i32,
        wait_seconds: i32,
    ) -> Result<Vec<ResolvedMessage>> {
        let messages = self
            .transport
            .receive(queue, max_messages, wait_seconds)
            .await
            .map_err(|e| Error::transport("receive", e))?;

        debug!(count = messages.len(), "received messages");

        let mut resolved = Vec::with_capacity(messages.len());
        for message in messages {
            resolved.push(self.resolve(message).await?);
        }

        Ok(resolved)
    }

    async fn resolve(&self, message: RawMessage) -> Result<ResolvedMessage> {
        let RawMessage {
            message_id,
            mut receipt_handle,
            body,
            attributes,
        } = message;

        let document: serde_json::Value =
            serde_json::from_str(&body).context(MalformedEnvelopeSnafu)?;

        let offloaded = document
            .get("MessageAttributes")
            .and_then(|attributes| attributes.get(RESERVED_ATTRIBUTE_NAME))
            .is_some();

        let body = if offloaded {
            let notification: Notification =
                serde_json::from_value(document).context(MalformedEnvelopeSnafu)?;

            let (notification, pointer) = self.resolve_payload(notification).await?;
            receipt_handle = receipt::encode(&pointer.bucket, &pointer.key, &receipt_handle);

            ReceivedBody::Notification(notification)
        } else {
            match Notification::deserialize(&document) {
                Ok(notification) => ReceivedBody::Notification(notification),
                Err(_) => {
                    debug!("body is not a notification envelope, passing it through");
                    ReceivedBody::Document(document)
                }
            }
        };

        Ok(ResolvedMessage {
            message_id,
            receipt_handle,
            body,
            attributes,
        })
    }

    /// Swaps the pointer in `notification` for the stored payload.
    async fn resolve_payload(
        &self,
        mut notification: Notification,
    ) -> Result<(Notification, BlobPointer)> {
        let pointer = BlobPointer::parse(&notification.message)?;

        let payload = self
            .payloads
            .fetch(&pointer.bucket, &pointer.key)
            .await?
            .ok_or_else(|| Error::PayloadMissing {
                bucket: pointer.bucket.clone(),
                key: pointer.key.clone(),
            })?;

        debug!(bucket = %pointer.bucket, key = %pointer.key, size = payload.len(), "resolved offloaded payload");

        notification.message = payload;

        let visible = &mut notification.message_attributes;
        visible.remove(RESERVED_ATTRIBUTE_NAME);
        visible.insert(
            S3_BUCKET_NAME_ATTRIBUTE.to_owned(),
            NotificationAttribute::string(pointer.bucket.as_str()),
        );
        visible.insert(
            S3_KEY_ATTRIBUTE.to_owned(),
            NotificationAttribute::string(pointer.key.as_str()),
        );

        Ok((notification, pointer))
    }

    /// Deletes a received message from `queue`.
    ///
    /// For composite receipt handles the stored payload is deleted as well
    /// when `flush_blob` is set; failing to delete it is an error. A failure
    /// to delete the queue entry itself is logged and ignored, since the queue
    /// may already have dropped it.
    #[instrument(skip(self, receipt_handle))]
    pub async fn delete(&self, queue: &str, receipt_handle: &str, flush_blob: bool) -> Result<()> {
        let mut handle = receipt_handle;

        if receipt::is_composite(receipt_handle) {
            let bucket = receipt::decode_bucket(receipt_handle)?;
            let key = receipt::decode_key(receipt_handle)?;

            if flush_blob {
                self.payloads.delete(bucket, key).await?;
            }

            handle = receipt::strip_to_original(receipt_handle)?;
        }

        if let Err(e) = self.transport.delete(queue, handle).await {
            warn!(error = %e, "failed to delete queue entry, assuming it is already gone");
        }

        Ok(())
    }
}
