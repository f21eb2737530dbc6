//! Behavior of the typed session cache over the in-process backend.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use chrono::Utc;
use station_common::{
    ExportStatus, MapCenter, MarkStyle, MeasureOption, SessionId, SliderMark, SliderSpec,
    StationPoint,
};
use storage::{CacheError, CacheKey, CacheNamespace, CompressedEntry, MemoryBackend, SessionCache};

fn cache() -> (Arc<MemoryBackend>, SessionCache) {
    let backend = Arc::new(MemoryBackend::default());
    let cache = SessionCache::new(backend.clone());
    (backend, cache)
}

// ============================================================================
// Round trips for every payload family
// ============================================================================

#[tokio::test]
async fn test_roundtrip_table() {
    let (_, cache) = cache();
    let session = SessionId::new();
    let table = vec![
        StationPoint {
            station: "USW00013988".into(),
            latitude: 39.1219,
            longitude: -94.5969,
        },
        StationPoint {
            station: "USC00234358".into(),
            latitude: 38.9,
            longitude: -92.3,
        },
    ];

    cache.put(CacheNamespace::StationMap, session, &table).await.unwrap();
    let back: Option<Vec<StationPoint>> = cache.get(CacheNamespace::StationMap, session).await.unwrap();
    assert_eq!(back, Some(table));
}

#[tokio::test]
async fn test_roundtrip_list_of_records() {
    let (_, cache) = cache();
    let session = SessionId::new();
    let options = vec![
        MeasureOption { label: "PRCP".into(), value: "PRCP".into() },
        MeasureOption { label: "TMAX".into(), value: "TMAX".into() },
    ];

    cache.put(CacheNamespace::MeasureOptions, session, &options).await.unwrap();
    let back: Vec<MeasureOption> = cache.get_or_default(CacheNamespace::MeasureOptions, session).await;
    assert_eq!(back, options);
}

#[tokio::test]
async fn test_roundtrip_scalar() {
    let (_, cache) = cache();
    let session = SessionId::new();

    cache.put(CacheNamespace::DownloadYear, session, &2005_i32).await.unwrap();
    let back: Option<i32> = cache.get(CacheNamespace::DownloadYear, session).await.unwrap();
    assert_eq!(back, Some(2005));
}

#[tokio::test]
async fn test_roundtrip_mixed_dict() {
    let (_, cache) = cache();
    let session = SessionId::new();
    let mut marks = BTreeMap::new();
    marks.insert(
        1763,
        SliderMark {
            label: "1763".into(),
            style: MarkStyle { color: "#EBEBEB".into() },
        },
    );
    let slider = SliderSpec {
        min: 1763,
        max: 2024,
        value: [1900, 2000],
        marks,
    };
    let center = MapCenter::default();
    let status = ExportStatus::Completed {
        records: 1234,
        bytes: 56789,
        years: 3,
        destination: "exports/x.csv".into(),
        finished_at: Utc::now(),
    };

    cache.put(CacheNamespace::SliderValue, session, &slider).await.unwrap();
    cache.put(CacheNamespace::MapCenter, session, &center).await.unwrap();
    cache.put(CacheNamespace::Download, session, &status).await.unwrap();

    assert_eq!(cache.get(CacheNamespace::SliderValue, session).await.unwrap(), Some(slider));
    assert_eq!(cache.get(CacheNamespace::MapCenter, session).await.unwrap(), Some(center));
    assert_eq!(cache.get(CacheNamespace::Download, session).await.unwrap(), Some(status));
}

// ============================================================================
// Isolation and overwrite
// ============================================================================

#[tokio::test]
async fn test_sessions_are_isolated() {
    let (_, cache) = cache();
    let a = SessionId::new();
    let b = SessionId::new();

    cache.put(CacheNamespace::MeasureValue, a, &vec!["PRCP"]).await.unwrap();
    cache.put(CacheNamespace::MeasureValue, b, &vec!["TMAX", "TMIN"]).await.unwrap();

    let got_a: Vec<String> = cache.get_or_default(CacheNamespace::MeasureValue, a).await;
    let got_b: Vec<String> = cache.get_or_default(CacheNamespace::MeasureValue, b).await;
    assert_eq!(got_a, vec!["PRCP"]);
    assert_eq!(got_b, vec!["TMAX", "TMIN"]);
}

#[tokio::test]
async fn test_namespaces_are_isolated() {
    let (_, cache) = cache();
    let session = SessionId::new();

    cache.put(CacheNamespace::DownloadYear, session, &2001_i32).await.unwrap();
    let other: Option<i32> = cache.get(CacheNamespace::MapCenter, session).await.unwrap();
    assert_eq!(other, None);
}

#[tokio::test]
async fn test_last_writer_wins() {
    let (_, cache) = cache();
    let session = SessionId::new();

    for year in [2001, 2002, 2003] {
        cache.put(CacheNamespace::DownloadYear, session, &year).await.unwrap();
    }
    let back: Option<i32> = cache.get(CacheNamespace::DownloadYear, session).await.unwrap();
    assert_eq!(back, Some(2003));
}

// ============================================================================
// Absence and corruption
// ============================================================================

#[tokio::test]
async fn test_absent_is_not_an_error() {
    let (_, cache) = cache();
    let back: Result<Option<i32>, CacheError> =
        cache.get(CacheNamespace::DownloadYear, SessionId::new()).await;
    assert!(matches!(back, Ok(None)));
}

#[tokio::test]
async fn test_corrupt_entry_is_decode_error_and_defaults() {
    let (backend, cache) = cache();
    let session = SessionId::new();
    let key = CacheKey::new(CacheNamespace::MeasureValue, session).to_string();
    backend
        .insert_raw(
            &key,
            CompressedEntry {
                uncompressed_len: 4096,
                data: Bytes::from_static(b"\xf0garbage"),
            },
        )
        .await;

    let err = cache.get::<Vec<String>>(CacheNamespace::MeasureValue, session).await;
    assert!(matches!(err, Err(CacheError::Decode(_))));

    let fallback: Vec<String> = cache.get_or_default(CacheNamespace::MeasureValue, session).await;
    assert!(fallback.is_empty());
}

#[tokio::test]
async fn test_oversized_length_is_decode_error() {
    let (backend, cache) = cache();
    let session = SessionId::new();
    let key = CacheKey::new(CacheNamespace::SliderValue, session).to_string();
    backend
        .insert_raw(
            &key,
            CompressedEntry {
                uncompressed_len: 1 << 45,
                data: Bytes::from_static(b"\x10\x31"),
            },
        )
        .await;

    let err = cache.get::<SliderSpec>(CacheNamespace::SliderValue, session).await;
    assert!(matches!(err, Err(CacheError::Decode(_))));
    assert_eq!(cache.get_lenient::<SliderSpec>(CacheNamespace::SliderValue, session).await, None);
}

#[tokio::test]
async fn test_entries_expire_with_ttl() {
    let backend = Arc::new(MemoryBackend::default());
    let cache = SessionCache::new(backend).with_ttl(Duration::from_millis(10));
    let session = SessionId::new();

    cache.put(CacheNamespace::DownloadYear, session, &2001_i32).await.unwrap();
    tokio::time::sleep(Duration::from_millis(30)).await;
    let back: Option<i32> = cache.get(CacheNamespace::DownloadYear, session).await.unwrap();
    assert_eq!(back, None);
}

// ============================================================================
// Concurrent reader and writer
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_reader_sees_monotonic_writes() {
    let (_, cache) = cache();
    let session = SessionId::new();

    let writer = {
        let cache = cache.clone();
        tokio::spawn(async move {
            for year in 1990..2010 {
                cache.put(CacheNamespace::DownloadYear, session, &year).await.unwrap();
                tokio::task::yield_now().await;
            }
        })
    };

    let mut last = i32::MIN;
    while !writer.is_finished() {
        if let Some(year) = cache.get::<i32>(CacheNamespace::DownloadYear, session).await.unwrap() {
            assert!(year >= last);
            last = year;
        }
        tokio::task::yield_now().await;
    }
    writer.await.unwrap();

    let final_year: Option<i32> = cache.get(CacheNamespace::DownloadYear, session).await.unwrap();
    assert_eq!(final_year, Some(2009));
}
