//! Request body decoding
//!
//! Bodies are decoded as JSON objects and merged field-by-field onto a base
//! entity: omitted fields keep their prior values, present fields overwrite.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, error};

use crate::error::ApiError;

/// Record fields owned by the store, never taken from a request body
pub const PROTECTED_FIELDS: &[&str] = &["id", "created_at", "updated_at", "deleted_at"];

fn invalid_payload() -> ApiError {
    ApiError::BadRequest("Invalid request payload".to_string())
}

/// Decode a body into a typed request
pub fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|e| {
        debug!("Failed to decode request body: {}", e);
        invalid_payload()
    })
}

/// Decode a body that must be a JSON object
pub fn decode_object(body: &[u8]) -> Result<Map<String, Value>, ApiError> {
    match decode::<Value>(body)? {
        Value::Object(fields) => Ok(fields),
        other => {
            debug!("Expected a JSON object, got {}", other);
            Err(invalid_payload())
        }
    }
}

/// Overlay request fields onto `base`, skipping protected and `derived` fields
pub fn merge_into<T>(base: &T, patch: Map<String, Value>, derived: &[&str]) -> Result<T, ApiError>
where
    T: Serialize + DeserializeOwned,
{
    let mut value = serde_json::to_value(base).map_err(|e| {
        error!("Failed to encode entity for merge: {}", e);
        ApiError::Internal("Failed to process request".to_string())
    })?;

    let Value::Object(fields) = &mut value else {
        error!("Entity did not encode as a JSON object");
        return Err(ApiError::Internal("Failed to process request".to_string()));
    };

    for (key, field) in patch {
        if PROTECTED_FIELDS.contains(&key.as_str()) || derived.contains(&key.as_str()) {
            continue;
        }
        fields.insert(key, field);
    }

    serde_json::from_value(value).map_err(|e| {
        debug!("Failed to apply request body: {}", e);
        invalid_payload()
    })
}
