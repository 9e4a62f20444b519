//! Environment-driven configuration and AWS SDK setup.

use aws_config::{BehaviorVersion, Region};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::debug;

/// Default payload size above which message bodies are offloaded: 256 KiB.
pub const DEFAULT_MESSAGE_SIZE_THRESHOLD: usize = 262_144;

/// Client configuration, loaded from `SPILLWAY_`-prefixed environment variables.
#[derive(Debug, Deserialize)]
pub struct Config {
    pub aws_access_key_id: Option<String>,
    pub aws_secret_access_key: Option<SecretString>,
    pub aws_region: Option<String>,
    /// Endpoint override for local development (e.g. LocalStack).
    pub aws_endpoint_url: Option<String>,

    pub s3_bucket_name: Option<String>,
    pub sns_topic_arn: Option<String>,
    pub sns_topic_fifo_arn: Option<String>,

    pub message_size_threshold: Option<usize>,
    #[serde(default)]
    pub always_through_s3: bool,
}

impl Config {
    pub fn load() -> crate::error::Result<Self> {
        Ok(envy::prefixed("SPILLWAY_").from_env::<Self>()?)
    }

    pub fn message_size_threshold(&self) -> usize {
        self.message_size_threshold
            .unwrap_or(DEFAULT_MESSAGE_SIZE_THRESHOLD)
    }

    /// Builds the shared AWS SDK configuration.
    ///
    /// Static credentials are used when both the access key id and the secret
    /// are set; otherwise the SDK's default provider chain applies.
    pub async fn sdk_config(&self) -> aws_config::SdkConfig {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());

        if let Some(region) = &self.aws_region {
            loader = loader.region(Region::new(region.clone()));
        }

        if let Some(endpoint) = &self.aws_endpoint_url {
            debug!(endpoint = %endpoint, "using custom AWS endpoint");
            loader = loader.endpoint_url(endpoint);
        }

        if let (Some(access_key_id), Some(secret_access_key)) =
            (&self.aws_access_key_id, &self.aws_secret_access_key)
        {
            let credentials = aws_sdk_sqs::config::Credentials::new(
                access_key_id,
                secret_access_key.expose_secret(),
                None,
                None,
                "Static",
            );
            loader = loader.credentials_provider(credentials);
        }

        loader.load().await
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            aws_access_key_id: None,
            aws_secret_access_key: None,
            aws_region: None,
            aws_endpoint_url: None,
            s3_bucket_name: None,
            sns_topic_arn: None,
            sns_topic_fifo_arn: None,
            message_size_threshold: None,
            always_through_s3: false,
        }
    }
}
