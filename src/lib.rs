//! Transparent offloading of large SNS/SQS message payloads to S3.
//!
//! [`ExtendedClient`] publishes to a topic and receives from a subscribed
//! queue. Bodies above the size threshold are written to a bucket and
//! replaced by a small pointer document; receiving resolves the pointer back
//! into the original body and extends the receipt handle so the blob can be
//! cleaned up when the message is deleted.

use tracing::level_filters::LevelFilter;
use tracing_subscriber::{util::SubscriberInitExt, EnvFilter, FmtSubscriber};

pub mod client;
pub mod config;
pub mod consume;
pub mod dispatch;
pub mod error;
pub mod message;
pub mod pointer;
pub mod publish;
pub mod receipt;
pub mod size;
pub mod store;
pub mod transport;
pub mod worker;

pub use client::ExtendedClient;
pub use config::Config;
pub use dispatch::EventDispatcher;
pub use error::{Error, Result};
pub use message::{MessageAttribute, MessageBody, ReceivedBody, ResolvedMessage};
pub use pointer::BlobPointer;
pub use publish::{PublishOutput, PublishRequest};
pub use worker::{Event, EventProcessor, Worker, WorkerOptions};

/// Installs the global tracing subscriber, filtered by `SPILLWAY_LOG`.
///
/// Debug builds log in a human-readable format, release builds log JSON.
pub fn init_tracing() -> eyre::Result<()> {
    #[cfg(debug_assertions)]
    FmtSubscriber::builder()
        .pretty()
        .with_env_filter(
            EnvFilter::builder()
                .with_env_var("SPILLWAY_LOG")
                .with_default_directive(LevelFilter::INFO.into())
                .from_env()?,
        )
        .finish()
        .try_init()?;

    #[cfg(not(debug_assertions))]
    FmtSubscriber::builder()
        .json()
        .with_env_filter(
            EnvFilter::builder()
                .with_env_var("SPILLWAY_LOG")
                .with_default_directive(LevelFilter::INFO.into())
                .from_env()?,
        )
        .finish()
        .try_init()?;

    Ok(())
}
