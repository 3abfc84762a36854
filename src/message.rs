//! Decoded message model handed to the analysis engine.
//!
//! The raw RFC 5322 decoder lives outside this crate; it produces a
//! [`ParsedMessage`] (directly, or as JSON for the CLI) and the engine only
//! ever reads it.

use base64::prelude::*;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;

/// A header field may occur once or several times.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HeaderValue {
    Single(String),
    Multiple(Vec<String>),
}

impl HeaderValue {
    /// First occurrence of the field, if any.
    pub fn first(&self) -> Option<&str> {
        match self {
            HeaderValue::Single(value) => Some(value.as_str()),
            HeaderValue::Multiple(values) => values.first().map(String::as_str),
        }
    }

    pub fn occurrences(&self) -> usize {
        match self {
            HeaderValue::Single(_) => 1,
            HeaderValue::Multiple(values) => values.len(),
        }
    }

    pub fn values(&self) -> Vec<&str> {
        match self {
            HeaderValue::Single(value) => vec![value.as_str()],
            HeaderValue::Multiple(values) => values.iter().map(String::as_str).collect(),
        }
    }
}

impl From<&str> for HeaderValue {
    fn from(value: &str) -> Self {
        HeaderValue::Single(value.to_string())
    }
}

/// Body parts split by content kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BodyParts {
    #[serde(rename = "text/plain", alias = "plain", default)]
    pub plain: Vec<String>,
    #[serde(rename = "text/html", alias = "html", default)]
    pub html: Vec<String>,
}

/// Either a single raw text body or decoded parts keyed by content kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageBody {
    Raw(String),
    Parts(BodyParts),
}

impl Default for MessageBody {
    fn default() -> Self {
        MessageBody::Parts(BodyParts::default())
    }
}

/// Body resolved once into the text that rules scan plus any markup for anchors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BodyText {
    pub text: String,
    pub html: String,
}

impl MessageBody {
    pub fn resolve(&self) -> BodyText {
        match self {
            MessageBody::Raw(text) => BodyText {
                text: text.clone(),
                html: String::new(),
            },
            MessageBody::Parts(parts) => {
                let html = parts.html.join("\n");
                let text = if parts.plain.iter().all(|block| block.trim().is_empty()) {
                    html.clone()
                } else {
                    parts.plain.join("\n")
                };
                BodyText { text, html }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default = "default_content_type")]
    pub content_type: String,
    #[serde(with = "base64_payload", default)]
    pub payload: Vec<u8>,
}

fn default_content_type() -> String {
    "application/octet-stream".to_string()
}

impl Attachment {
    pub fn new(filename: Option<&str>, content_type: &str, payload: Vec<u8>) -> Self {
        Self {
            filename: filename.map(str::to_string),
            content_type: content_type.to_string(),
            payload,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedMessage {
    #[serde(default)]
    /// Keyed by field name as the decoder wrote it; sorted so case variants
    /// of one field are always visited in the same order.
    pub headers: BTreeMap<String, HeaderValue>,
    #[serde(default, alias = "bodies")]
    pub body: MessageBody,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

impl ParsedMessage {
    /// Every occurrence of a field across all keys that match `name`
    /// case-insensitively, in key order.
    pub fn header_values(&self, name: &str) -> Vec<&str> {
        self.headers
            .iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case(name))
            .flat_map(|(_, v)| v.values())
            .collect()
    }

    /// Case-insensitive header lookup, merging `From` and `FROM` style keys
    pub fn header(&self, name: &str) -> Option<HeaderValue> {
        let mut values = self.header_values(name);
        match values.len() {
            0 => None,
            1 => Some(HeaderValue::Single(values.remove(0).to_string())),
            _ => Some(HeaderValue::Multiple(
                values.into_iter().map(str::to_string).collect(),
            )),
        }
    }

    /// First occurrence of a header's value
    pub fn header_str(&self, name: &str) -> Option<&str> {
        self.header_values(name).into_iter().next()
    }

    pub fn has_header(&self, name: &str) -> bool {
        self.headers.keys().any(|k| k.eq_ignore_ascii_case(name))
    }
}

mod base64_payload {
    use super::*;

    pub fn serialize<S: Serializer>(payload: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&BASE64_STANDARD.encode(payload))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
        BASE64_STANDARD
            .decode(compact.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}
