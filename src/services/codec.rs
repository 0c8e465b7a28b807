//! Payload codec for the remote tier.
//!
//! Values cross the network as JSON text. JSON can only rebuild plain data,
//! never arbitrary objects, so a poisoned remote entry cannot do more than
//! fail to decode.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::domain::errors::CacheResult;

/// Encode a value for the remote tier.
pub fn encode<V: Serialize>(value: &V) -> CacheResult<String> {
    Ok(serde_json::to_string(value)?)
}

/// Decode a remote payload.
pub fn decode<V: DeserializeOwned>(payload: &str) -> CacheResult<V> {
    Ok(serde_json::from_str(payload)?)
}
