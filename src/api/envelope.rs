//! The JSON wrapper every API response arrives in.

use serde::Deserialize;
use serde_json::Value;

use super::error::ApiError;

/// `{ "ygData": ..., "ygPerms": ..., "ygError": ... }`
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope {
    #[serde(rename = "ygData")]
    pub data: Option<Value>,
    #[serde(rename = "ygPerms")]
    pub permissions: Option<Value>,
    #[serde(rename = "ygError")]
    pub error: Option<Value>,
}

impl Envelope {
    /// Parses a 200 body. A body that is not JSON is treated as truncated.
    pub fn parse(uri: &str, body: &[u8]) -> Result<Self, ApiError> {
        serde_json::from_slice(body).map_err(|source| ApiError::Decode {
            uri: uri.to_string(),
            source,
        })
    }

    /// Unwraps the data payload.
    pub fn into_data(self, uri: &str) -> Result<Value, ApiError> {
        match self.data {
            Some(data) => Ok(data),
            None => {
                let reason = match self.error {
                    Some(detail) => format!("no data payload, error detail: {detail}"),
                    None => "no data payload".to_string(),
                };
                Err(ApiError::malformed(uri, reason))
            }
        }
    }
}
