mod codec;

pub use codec::*;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::Utf8Error;

/// Application-level message: one JSON document carried in a single text frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Message(Value);

impl Message {
    pub fn new(value: Value) -> Self {
        Self(value)
    }
    /// Builds the `{"message": <text>}` shape.
    pub fn text(text: impl Into<String>) -> Self {
        Self(serde_json::json!({ "message": text.into() }))
    }
    /// Interprets a frame payload as UTF-8 and parses it as JSON.
    pub fn from_payload(payload: &[u8]) -> Result<Self, MessageError> {
        let text = std::str::from_utf8(payload)?;
        Ok(Self(serde_json::from_str(text)?))
    }
    pub fn to_payload(&self) -> Result<Vec<u8>, MessageError> {
        Ok(serde_json::to_vec(&self.0)?)
    }
    /// The `message` field if the document has the `{"message": <text>}` shape.
    pub fn as_text(&self) -> Option<&str> {
        self.0.get("message").and_then(Value::as_str)
    }
    pub fn value(&self) -> &Value {
        &self.0
    }
    pub fn into_value(self) -> Value {
        self.0
    }
}

impl From<Value> for Message {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum MessageError {
    #[error("payload is not valid utf-8: {0}")]
    Utf8(#[from] Utf8Error),
    #[error("payload is not valid json: {0}")]
    Json(#[from] serde_json::Error),
}
