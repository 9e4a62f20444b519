//! Queue worker.
//!
//! A [`Worker`] long-polls one queue through the extended client, hands each
//! message to an [`EventProcessor`], and deletes it once processed. It runs
//! inside the caller's task until a shutdown future resolves or its time
//! budget runs out.

use std::{collections::BTreeMap, future::Future, sync::Arc, time::Duration};

use futures_util::future::BoxFuture;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::{
    client::ExtendedClient,
    dispatch::EVENT_TYPE_ATTRIBUTE,
    error::{Error, Result},
    message::{NotificationAttribute, ResolvedMessage},
};

/// A received message as seen by an [`EventProcessor`].
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub message_id: Option<String>,
    /// Value of the `event_type` attribute, if present.
    pub event_type: Option<String>,
    /// The message parsed as JSON, or the raw text if it is not JSON. For
    /// bodies that are not notifications, the whole body document.
    pub data: serde_json::Value,
    pub attributes: BTreeMap<String, NotificationAttribute>,
}

impl From<&ResolvedMessage> for Event {
    fn from(message: &ResolvedMessage) -> Self {
        let attributes = message.message_attributes();

        Self {
            message_id: message.message_id.clone(),
            event_type: attributes
                .get(EVENT_TYPE_ATTRIBUTE)
                .map(|attribute| attribute.value.clone()),
            data: message.data(),
            attributes: attributes.clone(),
        }
    }
}

/// Handles events pulled off a queue by a [`Worker`].
pub trait EventProcessor: Send + Sync {
    fn process<'a>(&'a self, event: &'a Event) -> BoxFuture<'a, eyre::Result<()>>;
}

#[derive(Debug, Clone, bon::Builder)]
pub struct WorkerOptions {
    #[builder(into)]
    pub queue_url: String,
    /// Messages per receive call, between 1 and 10.
    #[builder(default = 10)]
    pub max_messages: i32,
    #[builder(default = 10)]
    pub wait_seconds: i32,
    /// Pause after a receive that returned nothing.
    #[builder(default = Duration::from_millis(200))]
    pub idle_sleep: Duration,
    /// Pause after a receive that returned messages.
    #[builder(default = Duration::from_millis(1))]
    pub busy_sleep: Duration,
    /// Stop polling once this much time has passed.
    #[builder(default = Duration::from_secs(100))]
    pub exit_after: Duration,
    /// Delete offloaded payloads along with their messages.
    #[builder(default)]
    pub flush_blobs: bool,
}

pub struct Worker<P> {
    client: Arc<ExtendedClient>,
    processor: P,
    options: WorkerOptions,
}

impl<P: EventProcessor> Worker<P> {
    pub fn new(client: Arc<ExtendedClient>, processor: P, options: WorkerOptions) -> Result<Self> {
        if !(1..=10).contains(&options.max_messages) {
            return Err(Error::invalid_parameter(format!(
                "max_messages must be between 1 and 10, got {}",
                options.max_messages
            )));
        }

        Ok(Self {
            client,
            processor,
            options,
        })
    }

    /// Polls until `shutdown` resolves or `exit_after` elapses, returning the
    /// number of messages processed.
    ///
    /// A processor failure stops the worker; the failed message is left on
    /// the queue for redelivery.
    #[instrument(skip(self, shutdown), fields(queue = %self.options.queue_url))]
    pub async fn run(&self, shutdown: impl Future<Output = ()>) -> Result<usize> {
        let WorkerOptions {
            queue_url,
            max_messages,
            wait_seconds,
            idle_sleep,
            busy_sleep,
            exit_after,
            flush_blobs,
        } = &self.options;

        let started = Instant::now();
        let mut shutdown = std::pin::pin!(shutdown);
        let mut processed = 0;

        loop {
            if started.elapsed() > *exit_after {
                info!(?exit_after, processed, "exiting after time budget");
                break;
            }

            let messages = self
                .client
                .receive(queue_url, *max_messages, *wait_seconds)
                .await?;

            let pause = if messages.is_empty() {
                *idle_sleep
            } else {
                *busy_sleep
            };

            for message in &messages {
                let event = Event::from(message);

                self.processor
                    .process(&event)
                    .await
                    .map_err(|source| Error::Processor {
                        message_id: message.message_id.clone().unwrap_or_default(),
                        source,
                    })?;

                self.client
                    .delete(queue_url, &message.receipt_handle, *flush_blobs)
                    .await?;

                processed += 1;
                debug!(message_id = ?message.message_id, event_type = ?event.event_type, "processed message");
            }

            tokio::select! {
                _ = &mut shutdown => {
                    info!(processed, "shutdown requested");
                    break;
                }
                _ = tokio::time::sleep(pause) => {}
            }
        }

        Ok(processed)
    }
}

/// Resolves on Ctrl-C, or on SIGTERM on unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("received shutdown signal");
}
