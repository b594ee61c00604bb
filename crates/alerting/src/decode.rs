//! Validated Decoding of Alert Payloads

use crate::record::AlertRecord;
use serde_json::Value;
use thiserror::Error;

/// Errors while decoding an alert payload
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Payload was empty or whitespace
    #[error("Empty alert payload")]
    Empty,

    /// Payload is not valid JSON
    #[error("Invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// Payload is JSON but not an object
    #[error("Alert payload must be a JSON object, got {0}")]
    NotAnObject(&'static str),

    /// A known field has the wrong type
    #[error("Invalid alert record: {0}")]
    InvalidRecord(serde_json::Error),
}

impl AlertRecord {
    /// Decode an alert from the text of an event payload
    pub fn decode(payload: &str) -> Result<Self, DecodeError> {
        if payload.trim().is_empty() {
            return Err(DecodeError::Empty);
        }
        let value: Value = serde_json::from_str(payload)?;
        Self::from_value(value)
    }

    /// Decode an alert from an already-parsed JSON value
    pub fn from_value(value: Value) -> Result<Self, DecodeError> {
        if !value.is_object() {
            return Err(DecodeError::NotAnObject(kind(&value)));
        }
        serde_json::from_value(value).map_err(DecodeError::InvalidRecord)
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
