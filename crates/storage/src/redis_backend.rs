//! Redis-backed cache store.
//!
//! Each entry is a hash holding the compressed payload and its uncompressed
//! length, written in one atomic pipeline together with the key's expiry.

use async_trait::async_trait;
use bytes::Bytes;
use redis::{aio::MultiplexedConnection, Client};
use std::time::Duration;
use tracing::instrument;

use crate::cache::{CacheBackend, CacheError};
use crate::codec::CompressedEntry;

const FIELD_LENGTH: &str = "compressLength";
const FIELD_PAYLOAD: &str = "payload";

/// Redis cache client.
pub struct RedisBackend {
    conn: MultiplexedConnection,
}

impl RedisBackend {
    /// Connect to Redis.
    pub async fn connect(redis_url: &str) -> Result<Self, CacheError> {
        let client = Client::open(redis_url)
            .map_err(|e| CacheError::Backend(format!("Redis connection failed: {}", e)))?;

        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| CacheError::Backend(format!("Redis connection failed: {}", e)))?;

        Ok(Self { conn })
    }

    /// Round-trip a PING, used by the health endpoint.
    pub async fn ping(&self) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| CacheError::Backend(format!("Ping failed: {}", e)))?;
        Ok(())
    }
}

/// Parse the stored length field. Anything but a decimal integer is corrupt data.
fn parse_length(key: &str, raw: &[u8]) -> Result<usize, CacheError> {
    std::str::from_utf8(raw)
        .ok()
        .and_then(|text| text.trim().parse::<usize>().ok())
        .ok_or_else(|| {
            CacheError::Decode(format!(
                "Entry {} has a non-numeric {} field: {:?}",
                key,
                FIELD_LENGTH,
                String::from_utf8_lossy(raw)
            ))
        })
}

#[async_trait]
impl CacheBackend for RedisBackend {
    #[instrument(skip(self, entry), fields(bytes = entry.data.len()))]
    async fn put_entry(&self, key: &str, entry: CompressedEntry, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        // EXPIRE 0 would delete the key right away.
        let ttl_secs = ttl.as_secs().max(1);

        let _: () = redis::pipe()
            .atomic()
            .cmd("DEL")
            .arg(key)
            .ignore()
            .cmd("HSET")
            .arg(key)
            .arg(FIELD_LENGTH)
            .arg(entry.uncompressed_len as u64)
            .arg(FIELD_PAYLOAD)
            .arg(entry.data.as_ref())
            .ignore()
            .cmd("EXPIRE")
            .arg(key)
            .arg(ttl_secs)
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(|e| CacheError::Backend(format!("Cache set failed: {}", e)))?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_entry(&self, key: &str) -> Result<Option<CompressedEntry>, CacheError> {
        let mut conn = self.conn.clone();

        let (length, payload): (Option<Vec<u8>>, Option<Vec<u8>>) = redis::cmd("HMGET")
            .arg(key)
            .arg(FIELD_LENGTH)
            .arg(FIELD_PAYLOAD)
            .query_async(&mut conn)
            .await
            .map_err(|e| CacheError::Backend(format!("Cache get failed: {}", e)))?;

        match (length, payload) {
            (None, None) => Ok(None),
            (Some(length), Some(payload)) => Ok(Some(CompressedEntry {
                uncompressed_len: parse_length(key, &length)?,
                data: Bytes::from(payload),
            })),
            _ => Err(CacheError::Decode(format!(
                "Entry {} is missing its payload or length field",
                key
            ))),
        }
    }
}
