//! Messaging transport.
//!
//! The extended client publishes to a topic and consumes from a queue
//! subscribed to it. [`Transport`] abstracts those three calls; the AWS
//! implementation publishes through SNS and consumes through SQS.

use futures_util::future::BoxFuture;

use crate::message::{Attributes, RawMessage};

pub mod aws;
pub mod memory;

/// A message ready to hand to the transport, after any offloading.
#[derive(Debug, Clone, PartialEq)]
pub struct Publication {
    pub topic: String,
    pub message: String,
    pub attributes: Attributes,
    /// Only sent when present; FIFO topics require it, standard topics reject it.
    pub group_id: Option<String>,
    pub deduplication_id: Option<String>,
}

/// Core trait for the underlying publish/receive/delete transport.
pub trait Transport: Send + Sync + 'static {
    /// Publishes a message, returning the transport-assigned message id if any.
    fn publish(&self, publication: Publication) -> BoxFuture<'_, eyre::Result<Option<String>>>;

    /// Receives up to `max_messages` from `queue`, long-polling for at most
    /// `wait_seconds`. All system and message attributes are requested.
    fn receive<'a>(
        &'a self,
        queue: &'a str,
        max_messages: i32,
        wait_seconds: i32,
    ) -> BoxFuture<'a, eyre::Result<Vec<RawMessage>>>;

    /// Deletes the queue entry identified by `receipt_handle`.
    fn delete<'a>(&'a self, queue: &'a str, receipt_handle: &'a str)
        -> BoxFuture<'a, eyre::Result<()>>;
}
