//! Payload framing for cache entries.
//!
//! Payloads are serialized to JSON and compressed with the LZ4 block format.
//! A block carries no frame header, so decompression needs the exact
//! uncompressed length; it travels next to the bytes as `uncompressed_len`.

use bytes::Bytes;
use serde::{de::DeserializeOwned, Serialize};

use crate::cache::CacheError;

/// Largest expansion an LZ4 block can encode per input byte.
const MAX_BLOCK_RATIO: usize = 255;

/// A compressed payload and the sidecar length needed to inflate it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressedEntry {
    pub uncompressed_len: usize,
    pub data: Bytes,
}

/// Serialize and compress a payload.
pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<CompressedEntry, CacheError> {
    let raw = serde_json::to_vec(value)
        .map_err(|e| CacheError::Encode(format!("Serialization failed: {}", e)))?;

    Ok(CompressedEntry {
        uncompressed_len: raw.len(),
        data: Bytes::from(lz4_flex::block::compress(&raw)),
    })
}

/// Decompress and deserialize a payload.
///
/// The sidecar length is checked against what the block could possibly
/// inflate to before anything is allocated.
pub fn decode<T: DeserializeOwned>(entry: &CompressedEntry) -> Result<T, CacheError> {
    let max_len = entry.data.len().saturating_mul(MAX_BLOCK_RATIO).saturating_add(16);
    if entry.uncompressed_len > max_len {
        return Err(CacheError::Decode(format!(
            "Length {} exceeds the {} bytes a {} byte block can hold",
            entry.uncompressed_len,
            max_len,
            entry.data.len()
        )));
    }

    let raw = lz4_flex::block::decompress(&entry.data, entry.uncompressed_len)
        .map_err(|e| CacheError::Decode(format!("Decompression failed: {}", e)))?;

    if raw.len() != entry.uncompressed_len {
        return Err(CacheError::Decode(format!(
            "Length mismatch: expected {} bytes, got {}",
            entry.uncompressed_len,
            raw.len()
        )));
    }

    serde_json::from_slice(&raw)
        .map_err(|e| CacheError::Decode(format!("Deserialization failed: {}", e)))
}
