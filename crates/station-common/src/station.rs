//! Station inventory records.
//!
//! The GHCN-Daily inventory lists one line per (station, element) pair:
//!
//! ```text
//! ACW00011604  17.1167  -61.7833 TMAX 1949 1949
//! ```
//!
//! Fields are separated by runs of spaces: station id, latitude, longitude,
//! element (measure) code, first year and last year of record.

use serde::{Deserialize, Serialize};

use crate::error::{ExplorerError, ExplorerResult};

/// Anything with a station id and a position, so spatial filters can run on
/// both the full inventory and the cached station table.
pub trait Located {
    fn station(&self) -> &str;
    fn latitude(&self) -> f64;
    fn longitude(&self) -> f64;
}

/// One inventory line. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryRecord {
    pub station: String,
    pub latitude: f64,
    pub longitude: f64,
    pub measure: String,
    pub begin_year: i32,
    pub end_year: i32,
}

impl InventoryRecord {
    pub fn new(
        station: impl Into<String>,
        latitude: f64,
        longitude: f64,
        measure: impl Into<String>,
        begin_year: i32,
        end_year: i32,
    ) -> Self {
        Self {
            station: station.into(),
            latitude,
            longitude,
            measure: measure.into(),
            begin_year,
            end_year,
        }
    }

    /// Parse one inventory line. `line_no` is 1-based and only used for errors.
    pub fn parse_line(line: &str, line_no: usize) -> ExplorerResult<Self> {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != 6 {
            return Err(ExplorerError::CatalogParse {
                line: line_no,
                message: format!("expected 6 fields, found {}", fields.len()),
            });
        }

        let bad = |name: &str, value: &str| ExplorerError::CatalogParse {
            line: line_no,
            message: format!("invalid {} '{}'", name, value),
        };

        Ok(Self {
            station: fields[0].to_string(),
            latitude: fields[1].parse().map_err(|_| bad("latitude", fields[1]))?,
            longitude: fields[2].parse().map_err(|_| bad("longitude", fields[2]))?,
            measure: fields[3].to_string(),
            begin_year: fields[4].parse().map_err(|_| bad("begin year", fields[4]))?,
            end_year: fields[5].parse().map_err(|_| bad("end year", fields[5]))?,
        })
    }
}

impl Located for InventoryRecord {
    fn station(&self) -> &str {
        &self.station
    }

    fn latitude(&self) -> f64 {
        self.latitude
    }

    fn longitude(&self) -> f64 {
        self.longitude
    }
}

impl<T: Located + ?Sized> Located for &T {
    fn station(&self) -> &str {
        (**self).station()
    }

    fn latitude(&self) -> f64 {
        (**self).latitude()
    }

    fn longitude(&self) -> f64 {
        (**self).longitude()
    }
}

/// A station position as shown on the map (one row per station).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationPoint {
    pub station: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl From<&InventoryRecord> for StationPoint {
    fn from(record: &InventoryRecord) -> Self {
        Self {
            station: record.station.clone(),
            latitude: record.latitude,
            longitude: record.longitude,
        }
    }
}

impl Located for StationPoint {
    fn station(&self) -> &str {
        &self.station
    }

    fn latitude(&self) -> f64 {
        self.latitude
    }

    fn longitude(&self) -> f64 {
        self.longitude
    }
}
