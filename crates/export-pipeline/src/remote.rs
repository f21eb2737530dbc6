//! Year-partitioned observation store.
//!
//! GHCN-Daily publishes one headerless CSV per year, `csv/{year}.csv`:
//!
//! ```text
//! ID,YEAR_MONTH_DAY,ELEMENT,DATA_VALUE,M_FLAG,Q_FLAG,S_FLAG,OBS_TIME
//! USW00003947,20010101,TMAX,33,,,W,2400
//! ```
//!
//! Stores answer a query for one year with a stream of bounded chunks that
//! only contain rows matching the station/element predicate.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use reqwest::{Client, StatusCode};
use tokio::io::AsyncBufReadExt;
use tokio_util::io::StreamReader;
use tracing::{debug, instrument};

use crate::error::ExportError;

/// Public GHCN-Daily yearly partitions.
pub const DEFAULT_PARTITION_URL: &str = "https://noaa-ghcn-pds.s3.amazonaws.com/csv";

/// Rows per chunk handed to the sink.
pub const DEFAULT_CHUNK_ROWS: usize = 10_000;

/// Column names of a partition, also the export file header.
pub const CSV_COLUMNS: [&str; 8] = [
    "ID",
    "YEAR_MONTH_DAY",
    "ELEMENT",
    "DATA_VALUE",
    "M_FLAG",
    "Q_FLAG",
    "S_FLAG",
    "OBS_TIME",
];

/// One daily observation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservationRow {
    pub id: String,
    /// `YYYYMMDD`
    pub date: String,
    pub element: String,
    pub value: i32,
    pub m_flag: String,
    pub q_flag: String,
    pub s_flag: String,
    pub obs_time: String,
}

impl ObservationRow {
    /// Parse one partition line.
    pub fn parse(line: &str) -> Result<Self, String> {
        let fields: Vec<&str> = line.trim_end_matches('\r').split(',').collect();
        if fields.len() != CSV_COLUMNS.len() {
            return Err(format!(
                "expected {} fields, found {}",
                CSV_COLUMNS.len(),
                fields.len()
            ));
        }

        let value = fields[3]
            .trim()
            .parse::<i32>()
            .map_err(|e| format!("bad DATA_VALUE '{}': {}", fields[3], e))?;

        Ok(Self {
            id: fields[0].to_string(),
            date: fields[1].to_string(),
            element: fields[2].to_string(),
            value,
            m_flag: fields[4].to_string(),
            q_flag: fields[5].to_string(),
            s_flag: fields[6].to_string(),
            obs_time: fields[7].to_string(),
        })
    }

    /// Append the row as one CSV line.
    pub fn write_csv(&self, out: &mut String) {
        out.push_str(&self.id);
        out.push(',');
        out.push_str(&self.date);
        out.push(',');
        out.push_str(&self.element);
        out.push(',');
        out.push_str(&self.value.to_string());
        out.push(',');
        out.push_str(&self.m_flag);
        out.push(',');
        out.push_str(&self.q_flag);
        out.push(',');
        out.push_str(&self.s_flag);
        out.push(',');
        out.push_str(&self.obs_time);
        out.push('\n');
    }
}

/// Header line of an export file.
pub fn csv_header() -> String {
    let mut header = CSV_COLUMNS.join(",");
    header.push('\n');
    header
}

/// Row predicate: station id in `stations` and element in `measures`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowFilter {
    pub stations: BTreeSet<String>,
    pub measures: BTreeSet<String>,
}

impl RowFilter {
    pub fn new(stations: BTreeSet<String>, measures: BTreeSet<String>) -> Self {
        Self { stations, measures }
    }

    pub fn matches(&self, id: &str, element: &str) -> bool {
        self.stations.contains(id) && self.measures.contains(element)
    }

    /// Check the predicate on a raw line without parsing the whole row.
    fn matches_line(&self, line: &str) -> bool {
        let mut fields = line.splitn(4, ',');
        match (fields.next(), fields.next(), fields.next()) {
            (Some(id), Some(_date), Some(element)) => self.matches(id, element),
            _ => false,
        }
    }

    /// Parse a line if it passes the predicate.
    fn decode(&self, year: i32, line_no: usize, line: &str) -> Result<Option<ObservationRow>, ExportError> {
        if line.is_empty() || !self.matches_line(line) {
            return Ok(None);
        }
        ObservationRow::parse(line)
            .map(Some)
            .map_err(|e| ExportError::remote(year, format!("line {}: {}", line_no, e)))
    }
}

pub type RowChunk = Vec<ObservationRow>;

/// Stream of matching rows for one year, in partition order.
pub type RowChunkStream = BoxStream<'static, Result<RowChunk, ExportError>>;

/// A store holding one observation partition per year.
#[async_trait]
pub trait YearPartitionedStore: Send + Sync {
    /// Query one year's partition. Only rows matching `filter` are returned.
    async fn query_year(&self, year: i32, filter: Arc<RowFilter>) -> Result<RowChunkStream, ExportError>;
}

/// GHCN partitions over HTTP.
///
/// The body is streamed and filtered line by line while it downloads, so
/// unmatched rows are dropped before they reach the pipeline and memory is
/// bounded by one chunk.
pub struct GhcnHttpStore {
    client: Client,
    base_url: String,
    chunk_rows: usize,
}

impl GhcnHttpStore {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ExportError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .pool_max_idle_per_host(4)
            .tcp_nodelay(true)
            .build()
            .map_err(|e| ExportError::remote(0, format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            chunk_rows: DEFAULT_CHUNK_ROWS,
        })
    }

    pub fn with_chunk_rows(mut self, chunk_rows: usize) -> Self {
        self.chunk_rows = chunk_rows.max(1);
        self
    }

    pub fn partition_url(&self, year: i32) -> String {
        format!("{}/{}.csv", self.base_url, year)
    }
}

#[async_trait]
impl YearPartitionedStore for GhcnHttpStore {
    #[instrument(skip(self, filter), fields(stations = filter.stations.len(), measures = filter.measures.len()))]
    async fn query_year(&self, year: i32, filter: Arc<RowFilter>) -> Result<RowChunkStream, ExportError> {
        let url = self.partition_url(year);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ExportError::remote(year, format!("{}: {}", url, e)))?;

        match response.status() {
            status if status.is_success() => {}
            StatusCode::NOT_FOUND => {
                return Err(ExportError::remote(year, format!("partition not found: {}", url)));
            }
            status => {
                return Err(ExportError::remote(year, format!("{}: HTTP {}", url, status)));
            }
        }

        debug!(url = %url, "Streaming partition");

        let body = response
            .bytes_stream()
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e));
        let lines = StreamReader::new(Box::pin(body)).lines();
        let chunk_rows = self.chunk_rows;

        let chunks = stream::try_unfold((lines, 0usize), move |(mut lines, mut line_no)| {
            let filter = filter.clone();
            async move {
                let mut chunk = Vec::new();
                while chunk.len() < chunk_rows {
                    let next = lines
                        .next_line()
                        .await
                        .map_err(|e| ExportError::remote(year, e.to_string()))?;
                    let Some(line) = next else { break };
                    line_no += 1;
                    if let Some(row) = filter.decode(year, line_no, &line)? {
                        chunk.push(row);
                    }
                }

                if chunk.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some((chunk, (lines, line_no))))
                }
            }
        });

        Ok(chunks.boxed())
    }
}

/// In-process partitions, for tests and local runs.
#[derive(Default)]
pub struct MemoryYearStore {
    partitions: HashMap<i32, String>,
    fail_on: HashSet<i32>,
    chunk_rows: usize,
    delay: Option<Duration>,
    queried: Mutex<Vec<i32>>,
}

impl MemoryYearStore {
    pub fn new() -> Self {
        Self {
            chunk_rows: DEFAULT_CHUNK_ROWS,
            ..Default::default()
        }
    }

    /// Add the CSV text of one year.
    pub fn with_partition(mut self, year: i32, csv: impl Into<String>) -> Self {
        self.partitions.insert(year, csv.into());
        self
    }

    /// Make every query for `year` fail with a remote query error.
    pub fn fail_on(mut self, year: i32) -> Self {
        self.fail_on.insert(year);
        self
    }

    pub fn with_chunk_rows(mut self, chunk_rows: usize) -> Self {
        self.chunk_rows = chunk_rows.max(1);
        self
    }

    /// Sleep before answering each query.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Years queried so far, in call order.
    pub fn queried_years(&self) -> Vec<i32> {
        self.queried
            .lock()
            .map(|years| years.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }
}

#[async_trait]
impl YearPartitionedStore for MemoryYearStore {
    async fn query_year(&self, year: i32, filter: Arc<RowFilter>) -> Result<RowChunkStream, ExportError> {
        match self.queried.lock() {
            Ok(mut years) => years.push(year),
            Err(poisoned) => poisoned.into_inner().push(year),
        }

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if self.fail_on.contains(&year) {
            return Err(ExportError::remote(year, "injected failure"));
        }

        let text = self
            .partitions
            .get(&year)
            .ok_or_else(|| ExportError::remote(year, format!("partition not found: {}", year)))?;

        let mut rows = Vec::new();
        for (idx, line) in text.lines().enumerate() {
            if let Some(row) = filter.decode(year, idx + 1, line)? {
                rows.push(row);
            }
        }

        let chunk_rows = self.chunk_rows.max(1);
        let chunks: Vec<Result<RowChunk, ExportError>> =
            rows.chunks(chunk_rows).map(|c| Ok(c.to_vec())).collect();

        Ok(stream::iter(chunks).boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter(stations: &[&str], measures: &[&str]) -> Arc<RowFilter> {
        Arc::new(RowFilter::new(
            stations.iter().map(|s| s.to_string()).collect(),
            measures.iter().map(|s| s.to_string()).collect(),
        ))
    }

    #[test]
    fn test_parse_row_with_empty_flags() {
        let row = ObservationRow::parse("USW00003947,20010101,TMAX,-33,,,W,").unwrap();
        assert_eq!(row.value, -33);
        assert_eq!(row.m_flag, "");
        assert_eq!(row.s_flag, "W");
        assert_eq!(row.obs_time, "");

        let mut out = String::new();
        row.write_csv(&mut out);
        assert_eq!(out, "USW00003947,20010101,TMAX,-33,,,W,\n");
    }

    #[test]
    fn test_parse_row_rejects_short_line() {
        assert!(ObservationRow::parse("USW00003947,20010101,TMAX").is_err());
        assert!(ObservationRow::parse("A,20010101,TMAX,x,,,,").is_err());
    }

    #[test]
    fn test_filter_skips_before_parsing() {
        let f = filter(&["A"], &["PRCP"]);
        // Unmatched lines are dropped even when malformed.
        assert_eq!(f.decode(2001, 1, "B,20010101,PRCP,oops").unwrap(), None);
        assert!(f.decode(2001, 2, "A,20010101,PRCP,5,,,W,0700").unwrap().is_some());
        assert!(f.decode(2001, 3, "A,20010101,TMAX,5,,,W,0700").unwrap().is_none());
        assert!(f.decode(2001, 4, "A,20010101,PRCP,oops,,,W,0700").is_err());
    }

    #[test]
    fn test_partition_url() {
        let store = GhcnHttpStore::new("https://example.com/csv/").unwrap();
        assert_eq!(store.partition_url(2001), "https://example.com/csv/2001.csv");
    }

    #[tokio::test]
    async fn test_memory_store_chunks() {
        let csv = "A,20010101,PRCP,1,,,W,\nB,20010101,PRCP,2,,,W,\nA,20010102,PRCP,3,,,W,\nA,20010103,PRCP,4,,,W,\n";
        let store = MemoryYearStore::new()
            .with_partition(2001, csv)
            .with_chunk_rows(2);

        let chunks: Vec<RowChunk> = store
            .query_year(2001, filter(&["A"], &["PRCP"]))
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].len(), 2);
        assert_eq!(chunks[1][0].value, 4);
        assert_eq!(store.queried_years(), vec![2001]);
    }

    #[tokio::test]
    async fn test_memory_store_missing_and_failing() {
        let store = MemoryYearStore::new().fail_on(2002);
        let f = filter(&["A"], &["PRCP"]);

        match store.query_year(2002, f.clone()).await {
            Err(ExportError::RemoteQuery { year, .. }) => assert_eq!(year, 2002),
            _ => panic!("expected remote query error"),
        }
        assert!(store.query_year(1999, f).await.is_err());
        assert_eq!(store.queried_years(), vec![2002, 1999]);
    }
}
