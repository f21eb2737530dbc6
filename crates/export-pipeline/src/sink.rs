//! Export destinations.
//!
//! A sink is append-only: bytes land in the order they are appended, within
//! a year and across years. Every sink starts with the CSV header.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::fs::{self, File};
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};
use storage::{MultipartId, ObjectStorage};
use tracing::{debug, warn};

use crate::error::ExportError;
use crate::remote::csv_header;

/// Where an export is written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SinkDescriptor {
    /// Local file, created or truncated.
    File { path: PathBuf },
    /// Object in the export bucket.
    Object { key: String },
}

/// Append-only byte sink.
#[async_trait]
pub trait ExportSink: Send {
    /// Append bytes after everything written so far.
    async fn append(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Push buffered bytes to the destination.
    async fn flush(&mut self) -> io::Result<()>;

    /// Complete the output. No appends may follow.
    async fn finish(&mut self) -> io::Result<()>;

    /// Give up on the output after a failure.
    async fn abort(&mut self) {}

    /// Human-readable destination, stored in the export status.
    fn destination(&self) -> String;
}

/// Open the sink described by `descriptor`. Object sinks need `storage`.
pub async fn open_sink(
    descriptor: &SinkDescriptor,
    storage: Option<Arc<ObjectStorage>>,
) -> Result<Box<dyn ExportSink>, ExportError> {
    match descriptor {
        SinkDescriptor::File { path } => {
            let sink = FileSink::create(path).await.map_err(|e| ExportError::sink(None, e))?;
            Ok(Box::new(sink))
        }
        SinkDescriptor::Object { key } => {
            let storage = storage.ok_or_else(|| {
                ExportError::sink(None, "object storage is not configured")
            })?;
            Ok(Box::new(ObjectSink::open(storage, key).await?))
        }
    }
}

/// Local CSV file.
pub struct FileSink {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl FileSink {
    pub async fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let file = File::create(&path).await?;
        let mut writer = BufWriter::new(file);
        writer.write_all(csv_header().as_bytes()).await?;

        debug!(path = %path.display(), "Opened file sink");
        Ok(Self { path, writer })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ExportSink for FileSink {
    async fn append(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.writer.write_all(bytes).await
    }

    async fn flush(&mut self) -> io::Result<()> {
        self.writer.flush().await
    }

    async fn finish(&mut self) -> io::Result<()> {
        self.writer.flush().await?;
        self.writer.get_ref().sync_all().await
    }

    fn destination(&self) -> String {
        self.path.display().to_string()
    }
}

/// Object written through a multipart upload.
///
/// The object only becomes visible once [`finish`](ExportSink::finish)
/// completes the upload.
pub struct ObjectSink {
    storage: Arc<ObjectStorage>,
    key: String,
    upload_id: MultipartId,
    writer: Box<dyn AsyncWrite + Unpin + Send>,
}

impl ObjectSink {
    pub async fn open(storage: Arc<ObjectStorage>, key: impl Into<String>) -> Result<Self, ExportError> {
        let key = key.into();
        let (upload_id, mut writer) = storage
            .open_writer(&key)
            .await
            .map_err(|e| ExportError::sink(None, e))?;

        writer
            .write_all(csv_header().as_bytes())
            .await
            .map_err(|e| ExportError::sink(None, e))?;

        debug!(bucket = storage.bucket(), key = %key, "Opened object sink");
        Ok(Self {
            storage,
            key,
            upload_id,
            writer,
        })
    }
}

#[async_trait]
impl ExportSink for ObjectSink {
    async fn append(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.writer.write_all(bytes).await
    }

    async fn flush(&mut self) -> io::Result<()> {
        self.writer.flush().await
    }

    async fn finish(&mut self) -> io::Result<()> {
        self.writer.shutdown().await
    }

    async fn abort(&mut self) {
        if let Err(e) = self.storage.abort_writer(&self.key, &self.upload_id).await {
            warn!(key = %self.key, error = %e, "Failed to abort upload");
        }
    }

    fn destination(&self) -> String {
        format!("s3://{}/{}", self.storage.bucket(), self.key)
    }
}

/// In-memory sink. Clones share the same buffer.
#[derive(Clone, Default)]
pub struct MemorySink {
    buffer: Arc<Mutex<Vec<u8>>>,
    appends: Arc<Mutex<usize>>,
    fail_after: Option<usize>,
    finished: Arc<Mutex<bool>>,
}

impl MemorySink {
    pub fn new() -> Self {
        let sink = Self::default();
        sink.with_buffer(|buf| buf.extend_from_slice(csv_header().as_bytes()));
        sink
    }

    /// A sink whose appends fail once `appends` calls have succeeded.
    pub fn failing_after(appends: usize) -> Self {
        Self {
            fail_after: Some(appends),
            ..Self::new()
        }
    }

    /// Everything written so far, header included.
    pub fn contents(&self) -> Vec<u8> {
        self.with_buffer(|buf| buf.clone())
    }

    pub fn contents_string(&self) -> String {
        String::from_utf8_lossy(&self.contents()).into_owned()
    }

    pub fn is_finished(&self) -> bool {
        *lock(&self.finished)
    }

    fn with_buffer<R>(&self, f: impl FnOnce(&mut Vec<u8>) -> R) -> R {
        let mut buffer = lock(&self.buffer);
        f(&mut *buffer)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl ExportSink for MemorySink {
    async fn append(&mut self, bytes: &[u8]) -> io::Result<()> {
        let mut appends = lock(&self.appends);
        if self.fail_after.is_some_and(|limit| *appends >= limit) {
            return Err(io::Error::new(io::ErrorKind::Other, "sink closed"));
        }
        *appends += 1;
        drop(appends);

        self.with_buffer(|buf| buf.extend_from_slice(bytes));
        Ok(())
    }

    async fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }

    async fn finish(&mut self) -> io::Result<()> {
        *lock(&self.finished) = true;
        Ok(())
    }

    fn destination(&self) -> String {
        "memory".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use object_store::memory::InMemory;

    #[tokio::test]
    async fn test_file_sink_appends_after_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/export.csv");

        let mut sink = FileSink::create(&path).await.unwrap();
        sink.append(b"A,20010101,PRCP,1,,,W,\n").await.unwrap();
        sink.flush().await.unwrap();
        sink.append(b"A,20020101,PRCP,2,,,W,\n").await.unwrap();
        sink.finish().await.unwrap();

        let body = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = body.lines().collect();
        assert_eq!(lines[0], "ID,YEAR_MONTH_DAY,ELEMENT,DATA_VALUE,M_FLAG,Q_FLAG,S_FLAG,OBS_TIME");
        assert_eq!(lines[1], "A,20010101,PRCP,1,,,W,");
        assert_eq!(lines[2], "A,20020101,PRCP,2,,,W,");
    }

    #[tokio::test]
    async fn test_object_sink_visible_after_finish() {
        let storage = Arc::new(ObjectStorage::from_store(Arc::new(InMemory::new()), "exports"));
        let mut sink = ObjectSink::open(storage.clone(), "s/2001-2001/x.csv").await.unwrap();
        sink.append(b"A,20010101,PRCP,1,,,W,\n").await.unwrap();
        sink.flush().await.unwrap();
        sink.finish().await.unwrap();

        assert_eq!(sink.destination(), "s3://exports/s/2001-2001/x.csv");
        let body = storage.get("s/2001-2001/x.csv").await.unwrap();
        assert!(body.ends_with(b"A,20010101,PRCP,1,,,W,\n"));
    }

    #[tokio::test]
    async fn test_memory_sink_failure_injection() {
        let sink = MemorySink::failing_after(1);
        let mut writer = sink.clone();
        writer.append(b"one\n").await.unwrap();
        assert!(writer.append(b"two\n").await.is_err());
        assert!(sink.contents_string().ends_with("one\n"));
    }

    #[tokio::test]
    async fn test_open_object_sink_without_storage() {
        let descriptor = SinkDescriptor::Object { key: "k".into() };
        match open_sink(&descriptor, None).await {
            Err(ExportError::SinkWrite { year: None, .. }) => {}
            _ => panic!("expected sink error"),
        }
    }
}
