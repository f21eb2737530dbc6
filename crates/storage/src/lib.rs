//! Storage abstractions for the station explorer services.
//!
//! Provides unified interfaces for:
//! - The session-scoped result cache (Redis or in-process)
//! - Object storage (MinIO/S3) for export output

pub mod cache;
pub mod codec;
pub mod memory_backend;
pub mod object_store;
pub mod redis_backend;

pub use self::object_store::{ObjectStorage, ObjectStorageConfig, StoragePath};
pub use ::object_store::MultipartId;
pub use cache::{CacheBackend, CacheError, CacheKey, CacheNamespace, SessionCache, DEFAULT_TTL};
pub use codec::CompressedEntry;
pub use memory_backend::MemoryBackend;
pub use redis_backend::RedisBackend;
