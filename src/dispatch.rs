//! Named-event publishing on top of the extended client.

use std::sync::Arc;

use tracing::instrument;

use crate::{
    client::ExtendedClient,
    error::Result,
    message::{Attributes, MessageAttribute, MessageBody},
    publish::{PublishOutput, PublishRequest},
};

/// Attribute carrying the event name on dispatched events.
pub const EVENT_TYPE_ATTRIBUTE: &str = "event_type";

/// Publishes named events to a single topic through the extended client.
///
/// Use one dispatcher per topic, e.g. one for a standard topic and one for a
/// FIFO topic (which additionally needs a group id per event).
#[derive(Debug, Clone)]
pub struct EventDispatcher {
    client: Arc<ExtendedClient>,
    topic: String,
}

impl EventDispatcher {
    pub fn new(client: Arc<ExtendedClient>, topic: impl Into<String>) -> Self {
        Self {
            client,
            topic: topic.into(),
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    #[instrument(skip(self, data), fields(topic = %self.topic))]
    pub async fn dispatch(
        &self,
        event_type: &str,
        data: impl Into<MessageBody>,
        group_id: Option<String>,
        deduplication_id: Option<String>,
    ) -> Result<PublishOutput> {
        let mut attributes = Attributes::new();
        attributes.insert(
            EVENT_TYPE_ATTRIBUTE.to_owned(),
            MessageAttribute::string(event_type),
        );

        let request = PublishRequest::builder()
            .topic(self.topic.as_str())
            .body(data)
            .attributes(attributes)
            .maybe_group_id(group_id)
            .maybe_deduplication_id(deduplication_id)
            .build();

        self.client.publish(request).await
    }
}
