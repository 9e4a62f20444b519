//! Error type shared by every client operation.

use snafu::Snafu;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("Message body is required"))]
    MissingBody,

    #[snafu(display("Message attribute name {name} is reserved for use by the extended client"))]
    ReservedAttribute { name: String },

    #[snafu(display(
        "Number of message attributes [{count}] exceeds the maximum allowed for large-payload messages [{max}]"
    ))]
    TooManyAttributes { count: usize, max: usize },

    #[snafu(display(
        "Total size of message attributes is {size} bytes which is larger than the threshold of {threshold} bytes"
    ))]
    AttributesTooLarge { size: usize, threshold: usize },

    #[snafu(display("S3 bucket name cannot be blank"))]
    MissingBucket,

    #[snafu(display("Malformed notification envelope"))]
    MalformedEnvelope { source: serde_json::Error },

    #[snafu(display("Malformed payload pointer"))]
    MalformedPointer { source: serde_json::Error },

    #[snafu(display("Payload pointer is missing required key {key}"))]
    MissingPointerKey { key: &'static str },

    #[snafu(display("Receipt handle marker {marker} not found"))]
    MarkerNotFound { marker: &'static str },

    #[snafu(display("Stored payload {bucket}/{key} is not valid UTF-8"))]
    InvalidUtf8 {
        bucket: String,
        key: String,
        source: std::string::FromUtf8Error,
    },

    #[snafu(display("Stored payload {bucket}/{key} not found"))]
    PayloadMissing { bucket: String, key: String },

    #[snafu(display("Blob store {operation} failed"))]
    Store {
        operation: &'static str,
        #[snafu(source(false))]
        source: eyre::Report,
    },

    #[snafu(display("Transport {operation} failed"))]
    Transport {
        operation: &'static str,
        #[snafu(source(false))]
        source: eyre::Report,
    },

    #[snafu(display("Event processor failed on message {message_id}"))]
    Processor {
        message_id: String,
        #[snafu(source(false))]
        source: eyre::Report,
    },

    #[snafu(display("Invalid parameter: {message}"))]
    InvalidParameter { message: String },

    #[snafu(display("Error loading configuration"))]
    Config { source: envy::Error },
}

impl From<envy::Error> for Error {
    fn from(source: envy::Error) -> Self {
        Self::Config { source }
    }
}

impl Error {
    pub fn store(operation: &'static str, source: impl Into<eyre::Report>) -> Self {
        Self::Store {
            operation,
            source: source.into(),
        }
    }

    pub fn transport(operation: &'static str, source: impl Into<eyre::Report>) -> Self {
        Self::Transport {
            operation,
            source: source.into(),
        }
    }

    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            message: message.into(),
        }
    }

    /// Whether the error was raised before any network call was made.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::MissingBody
                | Self::ReservedAttribute { .. }
                | Self::TooManyAttributes { .. }
                | Self::AttributesTooLarge { .. }
                | Self::MissingBucket
                | Self::InvalidParameter { .. }
        )
    }

    /// Whether the error came from decoding a received message or handle.
    pub fn is_decode(&self) -> bool {
        matches!(
            self,
            Self::MalformedEnvelope { .. }
                | Self::MalformedPointer { .. }
                | Self::MissingPointerKey { .. }
                | Self::MarkerNotFound { .. }
                | Self::InvalidUtf8 { .. }
        )
    }
}
