//! AWS implementation of the transport: publish through SNS, consume through SQS.

use aws_sdk_sns::{primitives::Blob, types::MessageAttributeValue};
use aws_sdk_sqs::types::MessageSystemAttributeName;
use futures_util::future::BoxFuture;
use tracing::debug;

use super::{Publication, Transport};
use crate::message::{MessageAttribute, RawMessage};

pub struct AwsTransport {
    sns: aws_sdk_sns::Client,
    sqs: aws_sdk_sqs::Client,
}

impl std::fmt::Debug for AwsTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsTransport")
            .field("sns", &"<SnsClient>")
            .field("sqs", &"<SqsClient>")
            .finish()
    }
}

impl AwsTransport {
    pub fn new(sns: aws_sdk_sns::Client, sqs: aws_sdk_sqs::Client) -> Self {
        Self { sns, sqs }
    }
}

fn sns_attribute(attribute: &MessageAttribute) -> eyre::Result<MessageAttributeValue> {
    let builder = MessageAttributeValue::builder().data_type(attribute.data_type());

    let builder = match attribute {
        MessageAttribute::String { string_value } | MessageAttribute::Number { string_value } => {
            builder.string_value(string_value)
        }
        MessageAttribute::Binary { binary_value } => {
            builder.binary_value(Blob::new(binary_value.to_vec()))
        }
    };

    Ok(builder.build()?)
}

impl Transport for AwsTransport {
    fn publish(&self, publication: Publication) -> BoxFuture<'_, eyre::Result<Option<String>>> {
        Box::pin(async move {
            let mut request = self
                .sns
                .publish()
                .topic_arn(&publication.topic)
                .message(&publication.message);

            for (name, attribute) in &publication.attributes {
                request = request.message_attributes(name, sns_attribute(attribute)?);
            }

            if let Some(group_id) = &publication.group_id {
                request = request.message_group_id(group_id);
            }
            if let Some(deduplication_id) = &publication.deduplication_id {
                request = request.message_deduplication_id(deduplication_id);
            }

            let output = request.send().await?;

            debug!(topic = %publication.topic, message_id = ?output.message_id(), "published to SNS");

            Ok(output.message_id().map(str::to_owned))
        })
    }

    fn receive<'a>(
        &'a self,
        queue: &'a str,
        max_messages: i32,
        wait_seconds: i32,
    ) -> BoxFuture<'a, eyre::Result<Vec<RawMessage>>> {
        Box::pin(async move {
            let output = self
                .sqs
                .receive_message()
                .queue_url(queue)
                .message_system_attribute_names(MessageSystemAttributeName::All)
                .message_attribute_names("All")
                .max_number_of_messages(max_messages)
                .wait_time_seconds(wait_seconds)
                .send()
                .await?;

            output
                .messages
                .unwrap_or_default()
                .into_iter()
                .map(|message| {
                    let receipt_handle = message
                        .receipt_handle
                        .ok_or_else(|| eyre::eyre!("Received message without a receipt handle"))?;

                    let attributes = message
                        .attributes
                        .unwrap_or_default()
                        .into_iter()
                        .map(|(name, value)| (name.as_str().to_owned(), value))
                        .collect();

                    Ok(RawMessage {
                        message_id: message.message_id,
                        receipt_handle,
                        body: message.body.unwrap_or_default(),
                        attributes,
                    })
                })
                .collect()
        })
    }

    fn delete<'a>(
        &'a self,
        queue: &'a str,
        receipt_handle: &'a str,
    ) -> BoxFuture<'a, eyre::Result<()>> {
        Box::pin(async move {
            self.sqs
                .delete_message()
                .queue_url(queue)
                .receipt_handle(receipt_handle)
                .send()
                .await?;

            Ok(())
        })
    }
}
