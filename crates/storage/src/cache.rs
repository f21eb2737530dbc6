//! Session-scoped result cache.
//!
//! Every intermediate result (filtered station table, measure options,
//! slider spec, export progress...) is stored under a key made of a
//! [`CacheNamespace`] and a [`SessionId`]. Writes overwrite, reads return
//! `Ok(None)` for keys that were never written (or expired), and corrupt
//! entries surface as [`CacheError::Decode`].

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use station_common::{ExplorerError, SessionId};

use crate::codec::{self, CompressedEntry};

/// Default time-to-live for session entries.
pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 3600);

/// Errors from the cache layer. A missing key is not an error.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache backend error: {0}")]
    Backend(String),

    #[error("Cache encode error: {0}")]
    Encode(String),

    #[error("Cache decode error: {0}")]
    Decode(String),
}

impl From<CacheError> for ExplorerError {
    fn from(err: CacheError) -> Self {
        ExplorerError::CacheError(err.to_string())
    }
}

/// The artifacts stored per session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheNamespace {
    /// Filtered station table shown on the map.
    StationMap,
    MeasureOptions,
    MeasureValue,
    SliderValue,
    MapCenter,
    /// Last fully exported year.
    DownloadYear,
    /// Status of the latest export.
    Download,
}

impl CacheNamespace {
    pub const ALL: [CacheNamespace; 7] = [
        CacheNamespace::StationMap,
        CacheNamespace::MeasureOptions,
        CacheNamespace::MeasureValue,
        CacheNamespace::SliderValue,
        CacheNamespace::MapCenter,
        CacheNamespace::DownloadYear,
        CacheNamespace::Download,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CacheNamespace::StationMap => "mapbox",
            CacheNamespace::MeasureOptions => "measureOptions",
            CacheNamespace::MeasureValue => "measureValue",
            CacheNamespace::SliderValue => "sliderValue",
            CacheNamespace::MapCenter => "mapCenter",
            CacheNamespace::DownloadYear => "downloadYear",
            CacheNamespace::Download => "download",
        }
    }
}

impl std::fmt::Display for CacheNamespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cache key for one (namespace, session) pair.
///
/// Rendered as `{namespace}Cache{session}`. Session ids are fixed-width
/// UUIDs and namespaces a closed set, so a rendered key maps back to exactly
/// one pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub namespace: CacheNamespace,
    pub session: SessionId,
}

impl CacheKey {
    pub fn new(namespace: CacheNamespace, session: SessionId) -> Self {
        Self { namespace, session }
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}Cache{}", self.namespace, self.session)
    }
}

/// Key/value protocol implemented by cache stores.
///
/// Implementations must allow a read from one task while another task
/// commits a write; each write is independently visible once it returns.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Store an entry, replacing any previous value.
    async fn put_entry(&self, key: &str, entry: CompressedEntry, ttl: Duration) -> Result<(), CacheError>;

    /// Fetch an entry, `None` if absent or expired.
    async fn get_entry(&self, key: &str) -> Result<Option<CompressedEntry>, CacheError>;
}

/// Typed session cache over a backend.
pub struct SessionCache {
    backend: Arc<dyn CacheBackend>,
    ttl: Duration,
}

impl Clone for SessionCache {
    fn clone(&self) -> Self {
        Self {
            backend: self.backend.clone(),
            ttl: self.ttl,
        }
    }
}

impl SessionCache {
    pub fn new(backend: Arc<dyn CacheBackend>) -> Self {
        Self {
            backend,
            ttl: DEFAULT_TTL,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Store a payload for a session. Last writer wins.
    pub async fn put<T: Serialize + ?Sized + Sync>(
        &self,
        namespace: CacheNamespace,
        session: SessionId,
        value: &T,
    ) -> Result<(), CacheError> {
        let key = CacheKey::new(namespace, session).to_string();
        let entry = codec::encode(value)?;

        debug!(
            key = %key,
            raw_bytes = entry.uncompressed_len,
            stored_bytes = entry.data.len(),
            "Cache put"
        );

        self.backend.put_entry(&key, entry, self.ttl).await
    }

    /// Read a payload. `Ok(None)` when the key was never written.
    pub async fn get<T: DeserializeOwned>(
        &self,
        namespace: CacheNamespace,
        session: SessionId,
    ) -> Result<Option<T>, CacheError> {
        let key = CacheKey::new(namespace, session).to_string();

        match self.backend.get_entry(&key).await? {
            Some(entry) => codec::decode(&entry).map(Some),
            None => {
                debug!(key = %key, "Cache miss");
                Ok(None)
            }
        }
    }

    /// Read a payload, resolving absence and any failure to `None`.
    ///
    /// Failures are logged; callers only ever see "no cached value".
    pub async fn get_lenient<T: DeserializeOwned>(
        &self,
        namespace: CacheNamespace,
        session: SessionId,
    ) -> Option<T> {
        match self.get(namespace, session).await {
            Ok(value) => value,
            Err(e) => {
                warn!(
                    namespace = %namespace,
                    session = %session,
                    error = %e,
                    "Cached value unavailable"
                );
                None
            }
        }
    }

    /// Read a payload, falling back to `T::default()` when absent or unreadable.
    pub async fn get_or_default<T: DeserializeOwned + Default>(
        &self,
        namespace: CacheNamespace,
        session: SessionId,
    ) -> T {
        self.get_lenient(namespace, session).await.unwrap_or_default()
    }
}
