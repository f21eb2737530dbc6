//! Export of GHCN daily observations, one yearly partition at a time.
//!
//! - [`remote`]: year-partitioned stores answering filtered queries
//! - [`sink`]: append-only export destinations
//! - [`pipeline`]: the export loop and its progress markers
//! - [`progress`]: progress as read back from the session cache
//! - [`registry`]: one export per session

pub mod error;
pub mod pipeline;
pub mod progress;
pub mod registry;
pub mod remote;
pub mod sink;

pub use error::ExportError;
pub use pipeline::{ExportJob, ExportPipeline, ExportSummary};
pub use progress::{ProgressReport, ProgressReporter};
pub use registry::{ExportRegistry, ExportSlot};
pub use remote::{
    GhcnHttpStore, MemoryYearStore, ObservationRow, RowChunk, RowChunkStream, RowFilter,
    YearPartitionedStore, DEFAULT_PARTITION_URL,
};
pub use sink::{open_sink, ExportSink, FileSink, MemorySink, ObjectSink, SinkDescriptor};
