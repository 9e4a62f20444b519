//! In-memory implementation of the transport.
//!
//! Topics fan out to subscribed queues, wrapping each message in an SNS-style
//! notification envelope, the way SNS delivers into SQS. Received messages
//! stay in flight until deleted with their receipt handle. Primarily used for
//! testing and local development.

use std::{
    collections::{HashMap, VecDeque},
    sync::Arc,
};

use chrono::Utc;
use futures_util::future::BoxFuture;
use tokio::sync::Mutex;

use super::{Publication, Transport};
use crate::message::{NotificationAttribute, RawMessage};

#[derive(Debug, Clone)]
struct QueuedMessage {
    message_id: String,
    body: String,
    sent_at: i64,
}

#[derive(Debug, Default)]
struct State {
    subscriptions: HashMap<String, Vec<String>>,
    queues: HashMap<String, VecDeque<QueuedMessage>>,
    in_flight: HashMap<String, (String, QueuedMessage)>,
    published: Vec<Publication>,
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryTransport {
    state: Arc<Mutex<State>>,
}

impl InMemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delivers everything published to `topic` into `queue` from now on.
    pub async fn subscribe(&self, topic: impl Into<String>, queue: impl Into<String>) {
        self.state
            .lock()
            .await
            .subscriptions
            .entry(topic.into())
            .or_default()
            .push(queue.into());
    }

    /// Enqueues `body` directly, bypassing any topic.
    pub async fn send_raw(&self, queue: impl Into<String>, body: impl Into<String>) {
        let message = QueuedMessage {
            message_id: uuid::Uuid::new_v4().to_string(),
            body: body.into(),
            sent_at: Utc::now().timestamp_millis(),
        };

        self.state
            .lock()
            .await
            .queues
            .entry(queue.into())
            .or_default()
            .push_back(message);
    }

    /// Every publication accepted so far, oldest first.
    pub async fn published(&self) -> Vec<Publication> {
        self.state.lock().await.published.clone()
    }

    /// Number of messages waiting in `queue`, not counting in-flight ones.
    pub async fn queue_len(&self, queue: &str) -> usize {
        self.state
            .lock()
            .await
            .queues
            .get(queue)
            .map_or(0, VecDeque::len)
    }

    pub async fn in_flight_len(&self) -> usize {
        self.state.lock().await.in_flight.len()
    }
}

fn notification_envelope(message_id: &str, publication: &Publication) -> String {
    let attributes = publication
        .attributes
        .iter()
        .map(|(name, attribute)| (name.clone(), NotificationAttribute::from(attribute)))
        .collect::<HashMap<_, _>>();

    serde_json::json!({
        "Type": "Notification",
        "MessageId": message_id,
        "TopicArn": publication.topic,
        "Message": publication.message,
        "Timestamp": Utc::now().to_rfc3339(),
        "MessageAttributes": attributes,
    })
    .to_string()
}

impl Transport for InMemoryTransport {
    fn publish(&self, publication: Publication) -> BoxFuture<'_, eyre::Result<Option<String>>> {
        Box::pin(async move {
            let message_id = uuid::Uuid::new_v4().to_string();
            let body = notification_envelope(&message_id, &publication);

            let mut state = self.state.lock().await;

            let queues = state
                .subscriptions
                .get(&publication.topic)
                .cloned()
                .unwrap_or_default();

            for queue in queues {
                state
                    .queues
                    .entry(queue)
                    .or_default()
                    .push_back(QueuedMessage {
                        message_id: message_id.clone(),
                        body: body.clone(),
                        sent_at: Utc::now().timestamp_millis(),
                    });
            }

            state.published.push(publication);

            Ok(Some(message_id))
        })
    }

    fn receive<'a>(
        &'a self,
        queue: &'a str,
        max_messages: i32,
        _wait_seconds: i32,
    ) -> BoxFuture<'a, eyre::Result<Vec<RawMessage>>> {
        Box::pin(async move {
            if !(1..=10).contains(&max_messages) {
                return Err(eyre::eyre!(
                    "MaxNumberOfMessages must be between 1 and 10, got {max_messages}"
                ));
            }

            let mut state = self.state.lock().await;

            let mut taken = Vec::new();
            if let Some(waiting) = state.queues.get_mut(queue) {
                while taken.len() < max_messages as usize {
                    match waiting.pop_front() {
                        Some(message) => taken.push(message),
                        None => break,
                    }
                }
            }

            let mut received = Vec::with_capacity(taken.len());
            for message in taken {
                let receipt_handle = uuid::Uuid::new_v4().simple().to_string();

                received.push(RawMessage {
                    message_id: Some(message.message_id.clone()),
                    receipt_handle: receipt_handle.clone(),
                    body: message.body.clone(),
                    attributes: HashMap::from([(
                        "SentTimestamp".to_owned(),
                        message.sent_at.to_string(),
                    )]),
                });

                state
                    .in_flight
                    .insert(receipt_handle, (queue.to_owned(), message));
            }

            Ok(received)
        })
    }

    fn delete<'a>(
        &'a self,
        queue: &'a str,
        receipt_handle: &'a str,
    ) -> BoxFuture<'a, eyre::Result<()>> {
        Box::pin(async move {
            let mut state = self.state.lock().await;

            let owned = state
                .in_flight
                .get(receipt_handle)
                .is_some_and(|(owner, _)| owner == queue);

            if !owned {
                return Err(eyre::eyre!(
                    "ReceiptHandleIsInvalid: {receipt_handle} is not in flight on {queue}"
                ));
            }

            state.in_flight.remove(receipt_handle);
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{Attributes, MessageAttribute, Notification};

    fn publication(topic: &str, message: &str) -> Publication {
        let mut attributes = Attributes::new();
        attributes.insert("event_type".to_owned(), MessageAttribute::string("created"));

        Publication {
            topic: topic.to_owned(),
            message: message.to_owned(),
            attributes,
            group_id: None,
            deduplication_id: None,
        }
    }

    #[tokio::test]
    async fn publish_fans_out_as_notifications() {
        let transport = InMemoryTransport::new();
        transport.subscribe("topic", "a").await;
        transport.subscribe("topic", "b").await;

        transport.publish(publication("topic", "hi")).await.unwrap();

        assert_eq!(transport.queue_len("a").await, 1);
        assert_eq!(transport.queue_len("b").await, 1);

        let received = transport.receive("a", 10, 0).await.unwrap();
        let notification: Notification = serde_json::from_str(&received[0].body).unwrap();
        assert_eq!(notification.message, "hi");
        assert_eq!(notification.attribute("event_type"), Some("created"));
        assert_eq!(notification.extra["TopicArn"], "topic");
    }

    #[tokio::test]
    async fn delete_requires_in_flight_handle() {
        let transport = InMemoryTransport::new();
        transport.send_raw("q", "body").await;

        let received = transport.receive("q", 1, 0).await.unwrap();
        assert_eq!(transport.in_flight_len().await, 1);

        assert!(transport.delete("other", &received[0].receipt_handle).await.is_err());
        transport.delete("q", &received[0].receipt_handle).await.unwrap();
        assert!(transport.delete("q", &received[0].receipt_handle).await.is_err());
        assert_eq!(transport.in_flight_len().await, 0);
    }

    #[tokio::test]
    async fn receive_respects_batch_limits() {
        let transport = InMemoryTransport::new();
        for i in 0..3 {
            transport.send_raw("q", i.to_string()).await;
        }

        assert_eq!(transport.receive("q", 2, 0).await.unwrap().len(), 2);
        assert_eq!(transport.receive("q", 2, 0).await.unwrap().len(), 1);
        assert!(transport.receive("q", 2, 0).await.unwrap().is_empty());
        assert!(transport.receive("q", 11, 0).await.is_err());
    }
}
