use serde::{Deserialize, Serialize};
use snafu::ResultExt;

use crate::error::{Error, MalformedPointerSnafu, Result};

/// Location of an offloaded payload. Serialized as the message body that
/// travels in place of the payload: `{"s3BucketName": ..., "s3Key": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobPointer {
    #[serde(rename = "s3BucketName")]
    pub bucket: String,
    #[serde(rename = "s3Key")]
    pub key: String,
}

impl BlobPointer {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::json!({
            "s3BucketName": self.bucket,
            "s3Key": self.key,
        })
        .to_string()
    }

    /// Parses a pointer document, reporting which required key is missing.
    pub fn parse(document: &str) -> Result<Self> {
        let value: serde_json::Value =
            serde_json::from_str(document).context(MalformedPointerSnafu)?;

        let field = |key: &'static str| -> Result<String> {
            value
                .get(key)
                .and_then(|v| v.as_str())
                .map(str::to_owned)
                .ok_or(Error::MissingPointerKey { key })
        };

        Ok(Self {
            bucket: field("s3BucketName")?,
            key: field("s3Key")?,
        })
    }
}
