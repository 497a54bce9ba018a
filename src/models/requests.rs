//! Request DTOs for the key-value API
//!
//! Defines the structure of incoming HTTP request bodies.

use serde::Deserialize;

use crate::error::KvError;

const MALFORMED_BODY: &str = "Missing value in request body or invalid JSON format";

/// Request body for POST and PUT on `/kv/{key}`
///
/// The key in the path is authoritative; a `key` field in the body is
/// accepted and ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct KvRequest {
    /// Key echoed by clients
    #[serde(default)]
    pub key: Option<String>,
    /// The value to store
    #[serde(default)]
    pub value: Option<String>,
}

impl KvRequest {
    /// Parses a raw JSON body.
    ///
    /// Any body that is not a JSON object with string fields is malformed.
    pub fn parse(body: &[u8]) -> Result<Self, KvError> {
        serde_json::from_slice(body).map_err(|_| KvError::InvalidRequest(MALFORMED_BODY.to_string()))
    }

    /// Extracts the value, rejecting a missing or empty one.
    pub fn into_value(self) -> Result<String, KvError> {
        match self.value {
            Some(value) if !value.is_empty() => Ok(value),
            _ => Err(KvError::InvalidRequest(MALFORMED_BODY.to_string())),
        }
    }
}
