//! Year-by-year export of matching observations.
//!
//! For each year of the window, ascending: query the partition, append the
//! matching rows to the sink chunk by chunk, flush, and only then record the
//! year as the session's progress marker. A failure stops the export; the
//! failed year and every later year never get a marker. Starting an export
//! resets the marker to the year before the window.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use station_common::{ExportStatus, SessionId, YearWindow};
use storage::{CacheNamespace, SessionCache};
use tracing::{debug, error, info, instrument, warn};

use crate::error::ExportError;
use crate::remote::{RowFilter, YearPartitionedStore};
use crate::sink::{ExportSink, SinkDescriptor};

/// One export request. Stations and measures are already resolved by the
/// caller from the session's filters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportJob {
    pub session: SessionId,
    pub stations: BTreeSet<String>,
    pub measures: BTreeSet<String>,
    pub years: YearWindow,
    pub destination: SinkDescriptor,
}

impl ExportJob {
    /// Reject an inverted window before anything is queried.
    pub fn validate(&self) -> Result<(), ExportError> {
        if self.years.is_ordered() {
            Ok(())
        } else {
            Err(ExportError::InvalidRange {
                begin: self.years.begin,
                end: self.years.end,
            })
        }
    }

    fn row_filter(&self) -> RowFilter {
        RowFilter::new(self.stations.clone(), self.measures.clone())
    }
}

/// Totals of a finished export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExportSummary {
    /// Data rows written, header excluded.
    pub records: u64,
    /// Data bytes written, header excluded.
    pub bytes: u64,
    /// Years fully written.
    pub years: usize,
}

/// Runs exports against a year-partitioned store.
#[derive(Clone)]
pub struct ExportPipeline {
    store: Arc<dyn YearPartitionedStore>,
    cache: SessionCache,
}

impl ExportPipeline {
    pub fn new(store: Arc<dyn YearPartitionedStore>, cache: SessionCache) -> Self {
        Self { store, cache }
    }

    /// Run one export to completion.
    ///
    /// The status entry moves from `Running` to `Completed` or `Failed`.
    /// On failure the sink is aborted and the typed error returned.
    #[instrument(skip(self, job, sink), fields(session = %job.session, years = %job.years))]
    pub async fn run(&self, job: &ExportJob, sink: &mut dyn ExportSink) -> Result<ExportSummary, ExportError> {
        job.validate()?;

        // An earlier export's marker must not read as progress of this one.
        self.write_marker(job.session, job.years.begin.saturating_sub(1)).await;
        self.write_status(
            job.session,
            &ExportStatus::Running {
                year_begin: job.years.begin,
                year_end: job.years.end,
                started_at: Utc::now(),
            },
        )
        .await;

        match self.export_years(job, sink).await {
            Ok(summary) => {
                info!(
                    records = summary.records,
                    bytes = summary.bytes,
                    years = summary.years,
                    destination = %sink.destination(),
                    "Export completed"
                );
                self.write_status(
                    job.session,
                    &ExportStatus::Completed {
                        records: summary.records,
                        bytes: summary.bytes,
                        years: summary.years,
                        destination: sink.destination(),
                        finished_at: Utc::now(),
                    },
                )
                .await;
                Ok(summary)
            }
            Err(e) => {
                error!(error = %e, kind = e.kind(), "Export failed");
                sink.abort().await;
                self.write_status(
                    job.session,
                    &ExportStatus::Failed {
                        year: e.year(),
                        kind: e.kind().to_string(),
                        message: e.to_string(),
                        finished_at: Utc::now(),
                    },
                )
                .await;
                Err(e)
            }
        }
    }

    async fn export_years(&self, job: &ExportJob, sink: &mut dyn ExportSink) -> Result<ExportSummary, ExportError> {
        let filter = Arc::new(job.row_filter());
        let mut summary = ExportSummary::default();

        for year in job.years.years() {
            let (records, bytes) = self.export_year(year, filter.clone(), sink).await?;

            sink.flush().await.map_err(|e| ExportError::sink(Some(year), e))?;

            summary.records += records;
            summary.bytes += bytes;
            summary.years += 1;

            debug!(year, records, "Year written");
            self.write_marker(job.session, year).await;
        }

        sink.finish().await.map_err(|e| ExportError::sink(None, e))?;
        Ok(summary)
    }

    async fn export_year(
        &self,
        year: i32,
        filter: Arc<RowFilter>,
        sink: &mut dyn ExportSink,
    ) -> Result<(u64, u64), ExportError> {
        let mut chunks = self.store.query_year(year, filter).await?;
        let mut records = 0u64;
        let mut bytes = 0u64;
        let mut buf = String::new();

        while let Some(chunk) = chunks.next().await {
            let chunk = chunk?;
            buf.clear();
            for row in &chunk {
                row.write_csv(&mut buf);
            }

            sink.append(buf.as_bytes())
                .await
                .map_err(|e| ExportError::sink(Some(year), e))?;

            records += chunk.len() as u64;
            bytes += buf.len() as u64;
        }

        Ok((records, bytes))
    }

    /// Marker writes never fail the export: the data is already written.
    async fn write_marker(&self, session: SessionId, year: i32) {
        if let Err(e) = self.cache.put(CacheNamespace::DownloadYear, session, &year).await {
            warn!(session = %session, year, error = %e, "Failed to write progress marker");
        }
    }

    async fn write_status(&self, session: SessionId, status: &ExportStatus) {
        if let Err(e) = self.cache.put(CacheNamespace::Download, session, status).await {
            warn!(session = %session, error = %e, "Failed to write export status");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::MemoryYearStore;
    use crate::sink::MemorySink;
    use storage::MemoryBackend;

    fn job(begin: i32, end: i32) -> ExportJob {
        ExportJob {
            session: SessionId::new(),
            stations: ["A".to_string()].into_iter().collect(),
            measures: ["PRCP".to_string()].into_iter().collect(),
            years: YearWindow::new(begin, end),
            destination: SinkDescriptor::Object { key: "k".into() },
        }
    }

    #[tokio::test]
    async fn test_single_year() {
        let store = MemoryYearStore::new().with_partition(2001, "A,20010101,PRCP,5,,,W,\nA,20010101,TMAX,9,,,W,\n");
        let cache = SessionCache::new(Arc::new(MemoryBackend::default()));
        let pipeline = ExportPipeline::new(Arc::new(store), cache.clone());

        let job = job(2001, 2001);
        let sink = MemorySink::new();
        let summary = pipeline.run(&job, &mut sink.clone()).await.unwrap();

        assert_eq!(summary.records, 1);
        assert_eq!(summary.years, 1);
        assert!(sink.is_finished());
        assert!(sink.contents_string().ends_with("A,20010101,PRCP,5,,,W,\n"));

        let marker: Option<i32> = cache.get(CacheNamespace::DownloadYear, job.session).await.unwrap();
        assert_eq!(marker, Some(2001));
    }

    #[tokio::test]
    async fn test_sink_failure_is_typed() {
        let store = MemoryYearStore::new()
            .with_partition(2001, "A,20010101,PRCP,5,,,W,\n")
            .with_partition(2002, "A,20020101,PRCP,6,,,W,\n");
        let cache = SessionCache::new(Arc::new(MemoryBackend::default()));
        let pipeline = ExportPipeline::new(Arc::new(store), cache.clone());

        let job = job(2001, 2002);
        let err = pipeline
            .run(&job, &mut MemorySink::failing_after(1))
            .await
            .unwrap_err();

        assert!(matches!(err, ExportError::SinkWrite { year: Some(2002), .. }));
        let marker: Option<i32> = cache.get(CacheNamespace::DownloadYear, job.session).await.unwrap();
        assert_eq!(marker, Some(2001));

        let status: Option<ExportStatus> = cache.get(CacheNamespace::Download, job.session).await.unwrap();
        match status {
            Some(ExportStatus::Failed { year, kind, .. }) => {
                assert_eq!(year, Some(2002));
                assert_eq!(kind, "sink_write");
            }
            other => panic!("unexpected status {:?}", other),
        }
    }
}
