//! Composite receipt handles.
//!
//! When a received message was resolved from blob storage, its receipt handle
//! is rewritten to carry the blob location in front of the queue's own
//! handle:
//!
//! ```text
//! -..s3BucketName..-<bucket>-..s3BucketName..--..s3Key..-<key>-..s3Key..-<original handle>
//! ```
//!
//! Deleting with such a handle lets the client find the blob again, and the
//! original handle is recovered byte for byte before it goes back to the queue.

use crate::error::{Error, Result};

pub const S3_BUCKET_NAME_MARKER: &str = "-..s3BucketName..-";
pub const S3_KEY_MARKER: &str = "-..s3Key..-";

/// Embeds a blob location in front of `original`.
pub fn encode(bucket: &str, key: &str, original: &str) -> String {
    let mut handle = String::with_capacity(
        2 * S3_BUCKET_NAME_MARKER.len()
            + 2 * S3_KEY_MARKER.len()
            + bucket.len()
            + key.len()
            + original.len(),
    );

    handle.push_str(S3_BUCKET_NAME_MARKER);
    handle.push_str(bucket);
    handle.push_str(S3_BUCKET_NAME_MARKER);
    handle.push_str(S3_KEY_MARKER);
    handle.push_str(key);
    handle.push_str(S3_KEY_MARKER);
    handle.push_str(original);
    handle
}

/// True iff both markers occur in `handle`.
pub fn is_composite(handle: &str) -> bool {
    handle.contains(S3_BUCKET_NAME_MARKER) && handle.contains(S3_KEY_MARKER)
}

pub fn decode_bucket(handle: &str) -> Result<&str> {
    between_markers(handle, S3_BUCKET_NAME_MARKER)
}

pub fn decode_key(handle: &str) -> Result<&str> {
    between_markers(handle, S3_KEY_MARKER)
}

/// Recovers the handle originally issued by the queue.
pub fn strip_to_original(handle: &str) -> Result<&str> {
    let last = handle
        .rfind(S3_KEY_MARKER)
        .ok_or(Error::MarkerNotFound {
            marker: S3_KEY_MARKER,
        })?;

    Ok(&handle[last + S3_KEY_MARKER.len()..])
}

/// Text between the first occurrence of `marker` and the last occurrence
/// after it.
fn between_markers<'a>(handle: &'a str, marker: &'static str) -> Result<&'a str> {
    let not_found = || Error::MarkerNotFound { marker };

    let start = handle.find(marker).ok_or_else(not_found)? + marker.len();
    let end = start + handle[start..].rfind(marker).ok_or_else(not_found)?;

    Ok(&handle[start..end])
}
