//! Typed payloads stored in the session cache.
//!
//! Every cached value has one of these shapes, so the writer and every
//! reader agree on it at compile time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::viewport::MapState;

/// Color used for slider mark labels.
pub const SLIDER_MARK_COLOR: &str = "#EBEBEB";

/// Map center used before the user has moved the map (Kansas City).
pub const DEFAULT_CENTER_LON: f64 = -94.676392;
pub const DEFAULT_CENTER_LAT: f64 = 39.106667;
pub const DEFAULT_ZOOM: f64 = 3.0;

/// A selectable measure option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeasureOption {
    pub label: String,
    pub value: String,
}

/// Style of a slider mark label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkStyle {
    pub color: String,
}

/// One labelled mark on the year slider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SliderMark {
    pub label: String,
    pub style: MarkStyle,
}

/// Year slider bounds, current value and marks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SliderSpec {
    pub min: i32,
    pub max: i32,
    pub value: [i32; 2],
    pub marks: BTreeMap<i32, SliderMark>,
}

/// Map center and zoom.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapCenter {
    pub lon: f64,
    pub lat: f64,
    pub zoom: f64,
}

impl Default for MapCenter {
    fn default() -> Self {
        Self {
            lon: DEFAULT_CENTER_LON,
            lat: DEFAULT_CENTER_LAT,
            zoom: DEFAULT_ZOOM,
        }
    }
}

impl MapCenter {
    /// Center to store for a map state. `None` while a drag mode is active,
    /// since the center is not meaningful mid-gesture.
    pub fn from_map_state(map: Option<&MapState>) -> Option<Self> {
        match map {
            Some(map) if map.dragmode.is_some() => None,
            Some(map) if !map.is_initial() => match (map.center, map.zoom) {
                (Some(center), Some(zoom)) => Some(Self {
                    lon: center.lon,
                    lat: center.lat,
                    zoom,
                }),
                _ => Some(Self::default()),
            },
            _ => Some(Self::default()),
        }
    }
}

/// Lifecycle of the latest export for a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ExportStatus {
    Running {
        year_begin: i32,
        year_end: i32,
        started_at: DateTime<Utc>,
    },
    Completed {
        records: u64,
        bytes: u64,
        years: usize,
        destination: String,
        finished_at: DateTime<Utc>,
    },
    Failed {
        year: Option<i32>,
        kind: String,
        message: String,
        finished_at: DateTime<Utc>,
    },
}

impl ExportStatus {
    pub fn is_running(&self) -> bool {
        matches!(self, ExportStatus::Running { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::viewport::LonLat;

    #[test]
    fn test_map_center_defaults() {
        assert_eq!(MapCenter::from_map_state(None), Some(MapCenter::default()));

        let autosize = MapState {
            autosize: Some(true),
            ..Default::default()
        };
        assert_eq!(MapCenter::from_map_state(Some(&autosize)), Some(MapCenter::default()));
    }

    #[test]
    fn test_map_center_follows_map() {
        let map = MapState {
            center: Some(LonLat { lon: -77.07, lat: 38.92 }),
            zoom: Some(6.0),
            ..Default::default()
        };
        let center = MapCenter::from_map_state(Some(&map)).unwrap();
        assert_eq!(center.lon, -77.07);
        assert_eq!(center.zoom, 6.0);
    }

    #[test]
    fn test_map_center_skipped_while_dragging() {
        let map = MapState {
            dragmode: Some("lasso".into()),
            ..Default::default()
        };
        assert_eq!(MapCenter::from_map_state(Some(&map)), None);
    }

    #[test]
    fn test_export_status_tagging() {
        let status = ExportStatus::Failed {
            year: Some(2002),
            kind: "remote_query".into(),
            message: "timeout".into(),
            finished_at: Utc::now(),
        };
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["state"], "failed");
        assert_eq!(json["year"], 2002);
    }
}
