//! Byte-size accounting for message bodies and attributes.
//!
//! Sizes are measured the way the messaging service counts them against its
//! payload limit: UTF-8 bytes for text, base64 text for binary values.

use base64::Engine;

use crate::message::{Attributes, MessageAttribute};

/// Size of `body` in bytes, UTF-8 encoded.
pub fn body_size(body: &str) -> usize {
    body.len()
}

/// Combined size of all attribute names, data types and values.
pub fn attributes_size(attributes: &Attributes) -> usize {
    attributes
        .iter()
        .map(|(name, attribute)| name.len() + attribute_size(attribute))
        .sum()
}

/// Total size of a message: body plus attributes.
pub fn measure(body: &str, attributes: &Attributes) -> usize {
    body_size(body) + attributes_size(attributes)
}

fn attribute_size(attribute: &MessageAttribute) -> usize {
    let value_size = match attribute {
        MessageAttribute::String { string_value } | MessageAttribute::Number { string_value } => {
            string_value.len()
        }
        MessageAttribute::Binary { binary_value } => binary_size(binary_value),
    };

    attribute.data_type().len() + value_size
}

/// Binary values travel base64-encoded. Values that already are base64 text
/// count as-is; anything else counts at its encoded length.
fn binary_size(value: &[u8]) -> usize {
    if is_base64(value) {
        value.len()
    } else {
        base64::encoded_len(value.len(), true).unwrap_or(usize::MAX)
    }
}

/// Whether `value` is canonical base64 text, i.e. it survives a decode and
/// re-encode unchanged.
///
/// This is an approximation: ordinary text such as `"abcd"` is also valid
/// base64 and will be treated as already encoded.
pub fn is_base64(value: &[u8]) -> bool {
    let engine = &base64::engine::general_purpose::STANDARD;

    let Ok(text) = std::str::from_utf8(value) else {
        return false;
    };

    match engine.decode(text) {
        Ok(decoded) => engine.encode(decoded) == text,
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_size_counts_utf8_bytes() {
        assert_eq!(body_size("hello world"), 11);
        assert_eq!(body_size("é"), 2);
        assert_eq!(body_size(""), 0);
    }

    #[test]
    fn string_attribute_counts_name_type_and_value() {
        let mut attributes = Attributes::new();
        attributes.insert("event_type".to_owned(), MessageAttribute::string("created"));

        // "event_type" + "String" + "created"
        assert_eq!(attributes_size(&attributes), 10 + 6 + 7);
    }

    #[test]
    fn number_attribute_counts_text_value() {
        let mut attributes = Attributes::new();
        attributes.insert("n".to_owned(), MessageAttribute::number(12345));
        assert_eq!(attributes_size(&attributes), 1 + 6 + 5);
    }

    #[test]
    fn base64_binary_counts_literal_length() {
        let mut attributes = Attributes::new();
        attributes.insert("b".to_owned(), MessageAttribute::binary(&b"aGVsbG8="[..]));
        assert_eq!(attributes_size(&attributes), 1 + 6 + 8);
    }

    #[test]
    fn raw_binary_counts_encoded_length() {
        let mut attributes = Attributes::new();
        attributes.insert("b".to_owned(), MessageAttribute::binary(&b"\xff\x00\x01"[..]));
        // three raw bytes encode to four base64 characters
        assert_eq!(attributes_size(&attributes), 1 + 6 + 4);
    }

    #[test]
    fn is_base64_detection() {
        assert!(is_base64(b"aGVsbG8="));
        assert!(!is_base64(b"hello world"));
        assert!(!is_base64(b"\xff\xfe"));
        // plain text that happens to be valid base64
        assert!(is_base64(b"abcd"));
    }

    #[test]
    fn measure_adds_body_and_attributes() {
        let mut attributes = Attributes::new();
        attributes.insert("k".to_owned(), MessageAttribute::string("v"));
        assert_eq!(measure("hello", &attributes), 5 + 1 + 6 + 1);
        assert_eq!(measure("hello", &Attributes::new()), 5);
    }
}
