//! Application state and shared resources.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use export_pipeline::{
    ExportPipeline, ExportRegistry, GhcnHttpStore, ProgressReporter, SinkDescriptor,
    YearPartitionedStore,
};
use station_catalog::Catalog;
use station_common::{SessionId, YearWindow};
use storage::{
    CacheBackend, MemoryBackend, ObjectStorage, ObjectStorageConfig, RedisBackend, SessionCache,
    StoragePath,
};

use crate::config::{CacheBackendKind, ExplorerConfig, ExportSinkKind};
use crate::metrics::MetricsCollector;

/// Shared application state.
pub struct AppState {
    pub catalog: Catalog,
    pub cache: SessionCache,
    pub pipeline: ExportPipeline,
    pub reporter: ProgressReporter,
    pub registry: ExportRegistry,
    pub storage: Option<Arc<ObjectStorage>>,
    pub export_sink: ExportSinkKind,
    pub export_dir: PathBuf,
    pub metrics: Arc<MetricsCollector>,
}

impl AppState {
    /// Connect every backend named by `config` and load the catalog.
    pub async fn new(config: &ExplorerConfig) -> Result<Self> {
        let catalog = Catalog::load(&config.inventory)
            .await
            .with_context(|| format!("Failed to load inventory from {}", config.inventory))?;
        info!(
            records = catalog.len(),
            stations = catalog.station_count(),
            "Station inventory loaded"
        );

        let backend: Arc<dyn CacheBackend> = match config.cache_backend {
            CacheBackendKind::Redis => {
                let redis = RedisBackend::connect(&config.redis_url).await?;
                redis.ping().await?;
                info!(url = %config.redis_url, "Connected to Redis");
                Arc::new(redis)
            }
            CacheBackendKind::Memory => Arc::new(MemoryBackend::new(config.memory_capacity)),
        };

        let store = GhcnHttpStore::new(config.partition_url.clone())?.with_chunk_rows(config.chunk_rows);

        let storage = match config.export_sink {
            ExportSinkKind::Object => {
                let storage_config = ObjectStorageConfig::from_env();
                info!(bucket = %storage_config.bucket, endpoint = %storage_config.endpoint, "Using object storage for exports");
                Some(Arc::new(ObjectStorage::new(&storage_config)?))
            }
            ExportSinkKind::File => None,
        };

        Ok(Self::from_parts(config, catalog, backend, Arc::new(store), storage))
    }

    /// Assemble state from already constructed parts.
    pub fn from_parts(
        config: &ExplorerConfig,
        catalog: Catalog,
        backend: Arc<dyn CacheBackend>,
        store: Arc<dyn YearPartitionedStore>,
        storage: Option<Arc<ObjectStorage>>,
    ) -> Self {
        let cache = SessionCache::new(backend).with_ttl(config.cache_ttl);
        let export_sink = if storage.is_some() {
            ExportSinkKind::Object
        } else {
            ExportSinkKind::File
        };

        Self {
            catalog,
            pipeline: ExportPipeline::new(store, cache.clone()),
            reporter: ProgressReporter::new(cache.clone()),
            cache,
            registry: ExportRegistry::new(),
            storage,
            export_sink,
            export_dir: config.export_dir.clone(),
            metrics: Arc::new(MetricsCollector::new()),
        }
    }

    /// Default destination of an export started now.
    pub fn export_destination(&self, session: SessionId, years: YearWindow) -> SinkDescriptor {
        let stamp = chrono::Utc::now().format("%Y%m%dT%H%M%S").to_string();
        match self.export_sink {
            ExportSinkKind::Object => SinkDescriptor::Object {
                key: StoragePath::export_object(&session, years.begin, years.end, &stamp),
            },
            ExportSinkKind::File => SinkDescriptor::File {
                path: self
                    .export_dir
                    .join(session.to_string())
                    .join(format!("{}-{}_{}.csv", years.begin, years.end, stamp)),
            },
        }
    }
}
