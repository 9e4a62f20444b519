//! Message types shared by the publisher and the consumer.
//!
//! Outgoing messages carry a [`MessageBody`] and a set of typed
//! [`MessageAttribute`]s. Messages coming back off a queue are usually SNS
//! notification envelopes ([`Notification`]) whose attributes use SNS's
//! `{"Type", "Value"}` shape ([`NotificationAttribute`]). Any other JSON body
//! is kept as a plain [`ReceivedBody::Document`].

use std::collections::{BTreeMap, HashMap};

use base64::Engine;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Attribute name marking a message body as a pointer into blob storage.
pub const RESERVED_ATTRIBUTE_NAME: &str = "SQSLargePayloadSize";

/// SQS allows 10 message attributes; one is kept free for the reserved attribute.
pub const MAX_ALLOWED_ATTRIBUTES: usize = 10 - 1;

/// Attribute names under which the blob location is exposed on resolved messages.
pub const S3_BUCKET_NAME_ATTRIBUTE: &str = "s3_bucket_name";
pub const S3_KEY_ATTRIBUTE: &str = "s3_key";

/// Named message attributes, ordered by name.
pub type Attributes = BTreeMap<String, MessageAttribute>;

/// A typed message attribute, tagged by its SQS/SNS `DataType`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", tag = "DataType")]
pub enum MessageAttribute {
    #[serde(rename_all = "PascalCase")]
    String { string_value: String },
    #[serde(rename_all = "PascalCase")]
    Number { string_value: String },
    /// Binary value. May hold raw bytes or bytes that are already base64 text.
    #[serde(rename_all = "PascalCase")]
    Binary { binary_value: Bytes },
}

impl MessageAttribute {
    pub fn string(value: impl Into<String>) -> Self {
        Self::String {
            string_value: value.into(),
        }
    }

    pub fn number(value: impl ToString) -> Self {
        Self::Number {
            string_value: value.to_string(),
        }
    }

    pub fn binary(value: impl Into<Bytes>) -> Self {
        Self::Binary {
            binary_value: value.into(),
        }
    }

    pub fn data_type(&self) -> &'static str {
        match self {
            Self::String { .. } => "String",
            Self::Number { .. } => "Number",
            Self::Binary { .. } => "Binary",
        }
    }

    pub fn string_value(&self) -> Option<&str> {
        match self {
            Self::String { string_value } | Self::Number { string_value } => Some(string_value),
            Self::Binary { .. } => None,
        }
    }

    pub fn binary_value(&self) -> Option<&Bytes> {
        match self {
            Self::Binary { binary_value } => Some(binary_value),
            _ => None,
        }
    }
}

/// The body of an outgoing message.
///
/// Structured values are serialized to compact JSON text (`{"a":1}`, no
/// spaces after separators) before they are measured or sent. A bare JSON
/// string is sent as-is, without quotes.
#[derive(Debug, Clone, PartialEq)]
pub enum MessageBody {
    Text(String),
    Json(serde_json::Value),
}

impl MessageBody {
    pub fn into_text(self) -> String {
        match self {
            Self::Text(text) | Self::Json(serde_json::Value::String(text)) => text,
            Self::Json(value) => value.to_string(),
        }
    }
}

impl From<String> for MessageBody {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for MessageBody {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

impl From<serde_json::Value> for MessageBody {
    fn from(value: serde_json::Value) -> Self {
        Self::Json(value)
    }
}

/// A message attribute as it appears inside an SNS notification envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationAttribute {
    #[serde(rename = "Type")]
    pub data_type: String,
    #[serde(rename = "Value")]
    pub value: String,
}

impl NotificationAttribute {
    pub fn string(value: impl Into<String>) -> Self {
        Self {
            data_type: "String".to_owned(),
            value: value.into(),
        }
    }
}

impl From<&MessageAttribute> for NotificationAttribute {
    fn from(attribute: &MessageAttribute) -> Self {
        let value = match attribute {
            MessageAttribute::String { string_value } | MessageAttribute::Number { string_value } => {
                string_value.clone()
            }
            MessageAttribute::Binary { binary_value } => {
                base64::engine::general_purpose::STANDARD.encode(binary_value)
            }
        };

        Self {
            data_type: attribute.data_type().to_owned(),
            value,
        }
    }
}

/// An SNS notification as delivered into a subscribed SQS queue.
///
/// Only `Message` and `MessageAttributes` are interpreted; every other field
/// of the envelope is carried through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    #[serde(rename = "Message")]
    pub message: String,

    #[serde(rename = "MessageAttributes", default)]
    pub message_attributes: BTreeMap<String, NotificationAttribute>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Notification {
    /// The message parsed as JSON, or the raw text if it is not JSON.
    pub fn data(&self) -> serde_json::Value {
        serde_json::from_str(&self.message)
            .unwrap_or_else(|_| serde_json::Value::String(self.message.clone()))
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.message_attributes
            .get(name)
            .map(|attribute| attribute.value.as_str())
    }
}

/// A message as returned by the underlying queue, before any resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct RawMessage {
    pub message_id: Option<String>,
    pub receipt_handle: String,
    pub body: String,
    /// System attributes reported by the queue (`SentTimestamp`, ...).
    pub attributes: HashMap<String, String>,
}

/// The parsed body of a received message.
#[derive(Debug, Clone, PartialEq)]
pub enum ReceivedBody {
    /// An SNS notification envelope, with any offloaded payload resolved.
    Notification(Notification),
    /// Any other JSON document, e.g. from raw message delivery or a direct
    /// queue send. Passed through as parsed.
    Document(serde_json::Value),
}

static NO_ATTRIBUTES: BTreeMap<String, NotificationAttribute> = BTreeMap::new();

/// A received message with any offloaded payload resolved back into place.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedMessage {
    pub message_id: Option<String>,
    /// Receipt handle to pass to [`ExtendedClient::delete`](crate::ExtendedClient::delete).
    /// Composite when the payload came from blob storage.
    pub receipt_handle: String,
    pub body: ReceivedBody,
    pub attributes: HashMap<String, String>,
}

impl ResolvedMessage {
    pub fn notification(&self) -> Option<&Notification> {
        match &self.body {
            ReceivedBody::Notification(notification) => Some(notification),
            ReceivedBody::Document(_) => None,
        }
    }

    /// The notification's `Message`, if the body is a notification.
    pub fn message(&self) -> Option<&str> {
        self.notification()
            .map(|notification| notification.message.as_str())
    }

    /// Notification attributes; empty for plain documents.
    pub fn message_attributes(&self) -> &BTreeMap<String, NotificationAttribute> {
        self.notification()
            .map_or(&NO_ATTRIBUTES, |notification| &notification.message_attributes)
    }

    /// The notification's message parsed as JSON (falling back to its text),
    /// or the document itself.
    pub fn data(&self) -> serde_json::Value {
        match &self.body {
            ReceivedBody::Notification(notification) => notification.data(),
            ReceivedBody::Document(document) => document.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attribute_serde_is_tagged_by_data_type() {
        let attribute = MessageAttribute::number(42);
        let json = serde_json::to_value(&attribute).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "DataType": "Number", "StringValue": "42" })
        );

        let parsed: MessageAttribute =
            serde_json::from_value(serde_json::json!({ "DataType": "String", "StringValue": "x" }))
                .unwrap();
        assert_eq!(parsed, MessageAttribute::string("x"));
    }

    #[test]
    fn json_string_body_is_sent_unquoted() {
        let body = MessageBody::from(serde_json::json!("plain"));
        assert_eq!(body.into_text(), "plain");

        let body = MessageBody::from(serde_json::json!({ "a": 1 }));
        assert_eq!(body.into_text(), r#"{"a":1}"#);
    }

    #[test]
    fn notification_keeps_unknown_fields() {
        let raw = r#"{
            "Type": "Notification",
            "MessageId": "abc",
            "Message": "hello",
            "MessageAttributes": { "event_type": { "Type": "String", "Value": "created" } }
        }"#;

        let notification: Notification = serde_json::from_str(raw).unwrap();
        assert_eq!(notification.message, "hello");
        assert_eq!(notification.attribute("event_type"), Some("created"));
        assert_eq!(notification.extra["Type"], "Notification");

        let back = serde_json::to_value(&notification).unwrap();
        assert_eq!(back["MessageId"], "abc");
    }

    #[test]
    fn notification_data_falls_back_to_text() {
        let notification = Notification {
            message: "not json".to_owned(),
            message_attributes: BTreeMap::new(),
            extra: serde_json::Map::new(),
        };
        assert_eq!(notification.data(), serde_json::json!("not json"));
    }

    #[test]
    fn binary_attribute_is_base64_in_notifications() {
        let attribute = MessageAttribute::binary(&b"\x00\x01"[..]);
        let converted = NotificationAttribute::from(&attribute);
        assert_eq!(converted.data_type, "Binary");
        assert_eq!(converted.value, "AAE=");
    }

    fn received(body: ReceivedBody) -> ResolvedMessage {
        ResolvedMessage {
            message_id: None,
            receipt_handle: "handle".to_owned(),
            body,
            attributes: HashMap::new(),
        }
    }

    #[test]
    fn document_body_has_no_message_or_attributes() {
        let message = received(ReceivedBody::Document(serde_json::json!({ "order_id": 42 })));

        assert!(message.notification().is_none());
        assert_eq!(message.message(), None);
        assert!(message.message_attributes().is_empty());
        assert_eq!(message.data(), serde_json::json!({ "order_id": 42 }));
    }

    #[test]
    fn notification_body_exposes_message() {
        let notification: Notification =
            serde_json::from_str(r#"{"Message": "[1, 2]", "MessageAttributes": {"k": {"Type": "String", "Value": "v"}}}"#)
                .unwrap();
        let message = received(ReceivedBody::Notification(notification));

        assert_eq!(message.message(), Some("[1, 2]"));
        assert_eq!(message.message_attributes()["k"].value, "v");
        assert_eq!(message.data(), serde_json::json!([1, 2]));
    }
}
