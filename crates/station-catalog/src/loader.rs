//! Loading the station inventory.
//!
//! The inventory is read once at startup from a local file or an HTTP(S)
//! URL and shared read-only by every request afterwards.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use station_common::{ExplorerError, ExplorerResult, InventoryRecord, YearWindow};
use tracing::{info, instrument};

use crate::query;

/// Public GHCN-Daily inventory.
pub const DEFAULT_INVENTORY_URL: &str = "https://noaa-ghcn-pds.s3.amazonaws.com/ghcnd-inventory.txt";

/// Immutable, shared station inventory.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    records: Arc<Vec<InventoryRecord>>,
}

impl Catalog {
    pub fn new(records: Vec<InventoryRecord>) -> Self {
        Self {
            records: Arc::new(records),
        }
    }

    /// Parse inventory text. Blank lines are skipped, any other malformed
    /// line fails the whole load with its line number.
    pub fn parse(text: &str) -> ExplorerResult<Self> {
        let records = text
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(idx, line)| InventoryRecord::parse_line(line, idx + 1))
            .collect::<ExplorerResult<Vec<_>>>()?;
        Ok(Self::new(records))
    }

    /// Load from a local path or an `http://`/`https://` URL.
    #[instrument]
    pub async fn load(source: &str) -> ExplorerResult<Self> {
        let text = if source.starts_with("http://") || source.starts_with("https://") {
            fetch_text(source).await?
        } else {
            read_text(Path::new(source)).await?
        };

        let catalog = Self::parse(&text)?;
        info!(
            records = catalog.len(),
            stations = catalog.station_count(),
            "Loaded station inventory"
        );
        Ok(catalog)
    }

    pub fn records(&self) -> &[InventoryRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn station_count(&self) -> usize {
        query::distinct_stations(self.records.iter()).len()
    }

    /// Absolute year bounds of the catalog.
    pub fn year_bounds(&self) -> Option<YearWindow> {
        query::year_bounds(&self.records)
    }
}

async fn read_text(path: &Path) -> ExplorerResult<String> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ExplorerError::CatalogRead(format!("{}: {}", path.display(), e)))
}

async fn fetch_text(url: &str) -> ExplorerResult<String> {
    let client = Client::builder()
        .timeout(Duration::from_secs(300))
        .connect_timeout(Duration::from_secs(30))
        .build()
        .map_err(|e| ExplorerError::CatalogRead(format!("Failed to create HTTP client: {}", e)))?;

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| ExplorerError::CatalogRead(format!("{}: {}", url, e)))?;

    if !response.status().is_success() {
        return Err(ExplorerError::CatalogRead(format!(
            "{}: HTTP {}",
            url,
            response.status()
        )));
    }

    response
        .text()
        .await
        .map_err(|e| ExplorerError::CatalogRead(format!("{}: {}", url, e)))
}
