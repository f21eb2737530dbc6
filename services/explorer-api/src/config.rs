//! Service configuration.
//!
//! Values come from, in increasing priority: built-in defaults, an optional
//! YAML file, environment variables (also read from `.env`) and command-line
//! flags.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use serde::Deserialize;

use export_pipeline::remote::DEFAULT_CHUNK_ROWS;
use export_pipeline::DEFAULT_PARTITION_URL;
use station_catalog::DEFAULT_INVENTORY_URL;
use storage::memory_backend::DEFAULT_CAPACITY;
use storage::DEFAULT_TTL;

#[derive(Parser, Debug, Default)]
#[command(name = "explorer-api")]
#[command(about = "GHCN station explorer and observation export service")]
pub struct Args {
    /// Listen address
    #[arg(short, long, env = "LISTEN_ADDR")]
    pub listen: Option<String>,

    /// Log level
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Number of tokio worker threads (default: number of CPU cores)
    #[arg(long, env = "TOKIO_WORKER_THREADS")]
    pub worker_threads: Option<usize>,

    /// YAML configuration file
    #[arg(long, env = "EXPLORER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Inventory source: a local path or an http(s) URL
    #[arg(long, env = "INVENTORY_SOURCE")]
    pub inventory: Option<String>,

    /// Base URL of the yearly observation partitions
    #[arg(long, env = "PARTITION_URL")]
    pub partition_url: Option<String>,

    /// Cache backend
    #[arg(long, env = "CACHE_BACKEND", value_enum)]
    pub cache_backend: Option<CacheBackendKind>,

    /// Redis URL for the session cache
    #[arg(long, env = "REDIS_URL")]
    pub redis_url: Option<String>,

    /// Session cache entry lifetime in seconds
    #[arg(long, env = "CACHE_TTL_SECS")]
    pub cache_ttl_secs: Option<u64>,

    /// Export destination kind
    #[arg(long, env = "EXPORT_SINK", value_enum)]
    pub export_sink: Option<ExportSinkKind>,

    /// Directory for file exports
    #[arg(long, env = "EXPORT_DIR")]
    pub export_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackendKind {
    Redis,
    Memory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportSinkKind {
    File,
    Object,
}

/// Contents of the YAML file. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub listen: Option<String>,
    pub inventory: Option<String>,
    pub partition_url: Option<String>,
    pub cache: CacheSection,
    pub export: ExportSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CacheSection {
    pub backend: Option<CacheBackendKind>,
    pub redis_url: Option<String>,
    pub ttl_secs: Option<u64>,
    pub memory_capacity: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ExportSection {
    pub sink: Option<ExportSinkKind>,
    pub dir: Option<PathBuf>,
    pub chunk_rows: Option<usize>,
}

impl FileConfig {
    pub fn from_yaml(text: &str) -> Result<Self> {
        serde_yaml::from_str(text).context("Invalid configuration file")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_yaml(&text)
    }
}

/// Resolved service configuration.
#[derive(Debug, Clone)]
pub struct ExplorerConfig {
    pub listen: String,
    pub inventory: String,
    pub partition_url: String,
    pub cache_backend: CacheBackendKind,
    pub redis_url: String,
    pub cache_ttl: Duration,
    pub memory_capacity: usize,
    pub export_sink: ExportSinkKind,
    pub export_dir: PathBuf,
    pub chunk_rows: usize,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:8080".to_string(),
            inventory: DEFAULT_INVENTORY_URL.to_string(),
            partition_url: DEFAULT_PARTITION_URL.to_string(),
            cache_backend: CacheBackendKind::Redis,
            redis_url: "redis://redis:6379".to_string(),
            cache_ttl: DEFAULT_TTL,
            memory_capacity: DEFAULT_CAPACITY,
            export_sink: ExportSinkKind::File,
            export_dir: PathBuf::from("/data/exports"),
            chunk_rows: DEFAULT_CHUNK_ROWS,
        }
    }
}

impl ExplorerConfig {
    /// Load the YAML file named by `args` (if any) and apply `args` on top.
    pub fn from_args(args: &Args) -> Result<Self> {
        let file = match &args.config {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };
        Ok(Self::resolve(args, file))
    }

    /// Merge flags over file values over defaults.
    pub fn resolve(args: &Args, file: FileConfig) -> Self {
        let defaults = Self::default();

        Self {
            listen: args.listen.clone().or(file.listen).unwrap_or(defaults.listen),
            inventory: args.inventory.clone().or(file.inventory).unwrap_or(defaults.inventory),
            partition_url: args
                .partition_url
                .clone()
                .or(file.partition_url)
                .unwrap_or(defaults.partition_url),
            cache_backend: args
                .cache_backend
                .or(file.cache.backend)
                .unwrap_or(defaults.cache_backend),
            redis_url: args
                .redis_url
                .clone()
                .or(file.cache.redis_url)
                .unwrap_or(defaults.redis_url),
            cache_ttl: args
                .cache_ttl_secs
                .or(file.cache.ttl_secs)
                .map(Duration::from_secs)
                .unwrap_or(defaults.cache_ttl),
            memory_capacity: file.cache.memory_capacity.unwrap_or(defaults.memory_capacity),
            export_sink: args
                .export_sink
                .or(file.export.sink)
                .unwrap_or(defaults.export_sink),
            export_dir: args
                .export_dir
                .clone()
                .or(file.export.dir)
                .unwrap_or(defaults.export_dir),
            chunk_rows: file.export.chunk_rows.unwrap_or(defaults.chunk_rows),
        }
    }
}
