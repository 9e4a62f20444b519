//! Publishing with transparent payload offload.

use tracing::{debug, instrument};

use crate::{
    client::ExtendedClient,
    error::{Error, Result},
    message::{
        Attributes, MessageAttribute, MessageBody, MAX_ALLOWED_ATTRIBUTES, RESERVED_ATTRIBUTE_NAME,
    },
    pointer::BlobPointer,
    size,
    transport::Publication,
};

/// A message to publish through [`ExtendedClient::publish`].
#[derive(Debug, Clone, bon::Builder)]
pub struct PublishRequest {
    #[builder(into)]
    pub topic: String,
    #[builder(into)]
    pub body: Option<MessageBody>,
    #[builder(default)]
    pub attributes: Attributes,
    #[builder(into)]
    pub group_id: Option<String>,
    #[builder(into)]
    pub deduplication_id: Option<String>,
}

/// Outcome of a successful publish.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishOutput {
    /// Identifier assigned by the transport, if it reports one.
    pub message_id: Option<String>,
    /// Where the body was stored, if it was offloaded.
    pub pointer: Option<BlobPointer>,
    /// The attribute set that was actually sent.
    pub attributes: Attributes,
}

impl ExtendedClient {
    /// Publishes a message, storing its body in blob storage first when it
    /// is too large to travel inline (or when every body is offloaded).
    ///
    /// All validation happens before any network call. If storing the body
    /// fails, nothing is published.
    #[instrument(skip(self, request), fields(topic = %request.topic))]
    pub async fn publish(&self, request: PublishRequest) -> Result<PublishOutput> {
        let PublishRequest {
            topic,
            body,
            mut attributes,
            group_id,
            deduplication_id,
        } = request;

        let body = body.ok_or(Error::MissingBody)?.into_text();

        self.validate_attributes(&attributes)?;

        let total_size = size::measure(&body, &attributes);
        let offload = self.always_through_s3 || total_size > self.message_size_threshold;

        debug!(
            size = total_size,
            threshold = self.message_size_threshold,
            offload,
            "measured message"
        );

        let (message, pointer) = if offload {
            let pointer = self.payloads.store(&body).await?;

            attributes.insert(
                RESERVED_ATTRIBUTE_NAME.to_owned(),
                MessageAttribute::number(size::body_size(&body)),
            );

            (pointer.to_json(), Some(pointer))
        } else {
            (body, None)
        };

        let publication = Publication {
            topic,
            message,
            attributes: attributes.clone(),
            group_id,
            deduplication_id,
        };

        let message_id = self
            .transport
            .publish(publication)
            .await
            .map_err(|e| Error::transport("publish", e))?;

        Ok(PublishOutput {
            message_id,
            pointer,
            attributes,
        })
    }

    fn validate_attributes(&self, attributes: &Attributes) -> Result<()> {
        if attributes.contains_key(RESERVED_ATTRIBUTE_NAME) {
            return Err(Error::ReservedAttribute {
                name: RESERVED_ATTRIBUTE_NAME.to_owned(),
            });
        }

        if attributes.len() > MAX_ALLOWED_ATTRIBUTES {
            return Err(Error::TooManyAttributes {
                count: attributes.len(),
                max: MAX_ALLOWED_ATTRIBUTES,
            });
        }

        // Offloading moves only the body; oversized attributes cannot be helped.
        let attributes_size = size::attributes_size(attributes);
        if attributes_size > self.message_size_threshold {
            return Err(Error::AttributesTooLarge {
                size: attributes_size,
                threshold: self.message_size_threshold,
            });
        }

        Ok(())
    }
}
