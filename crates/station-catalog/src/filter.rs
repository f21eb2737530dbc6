//! Geo/time filters over station records.
//!
//! All filters are pure and keep the input order. The viewport filter only
//! looks at station id and position, the year filter only at the record's
//! year span, so applying them in either order gives the same result.

use std::collections::HashSet;

use station_common::{InventoryRecord, Located, Viewport, YearRangeMode, YearWindow};

/// Keep the records allowed by a viewport.
///
/// `Initial` and `Pan` keep everything, `Selection` keeps the listed
/// stations, `BoundingBox` keeps records inside the box (edges inclusive).
pub fn filter_by_viewport<'a, T, I>(records: I, viewport: &Viewport) -> Vec<&'a T>
where
    T: Located + 'a,
    I: IntoIterator<Item = &'a T>,
{
    match viewport {
        Viewport::Initial | Viewport::Pan => records.into_iter().collect(),
        Viewport::Selection(stations) => {
            let selected: HashSet<&str> = stations.iter().map(String::as_str).collect();
            records
                .into_iter()
                .filter(|r| selected.contains(r.station()))
                .collect()
        }
        Viewport::BoundingBox(bbox) => records
            .into_iter()
            .filter(|r| bbox.contains_point(r.longitude(), r.latitude()))
            .collect(),
    }
}

/// Keep the records whose year span matches the window under `mode`.
///
/// With no window (no selection made yet) every record is kept.
pub fn filter_by_year_range<'a, I>(
    records: I,
    window: Option<&YearWindow>,
    mode: YearRangeMode,
) -> Vec<&'a InventoryRecord>
where
    I: IntoIterator<Item = &'a InventoryRecord>,
{
    match window {
        None => records.into_iter().collect(),
        Some(window) => records
            .into_iter()
            .filter(|r| mode.matches(r.begin_year, r.end_year, window))
            .collect(),
    }
}

/// Keep the records whose measure code is one of `measures`.
pub fn filter_by_measures<'a, I, S>(records: I, measures: &[S]) -> Vec<&'a InventoryRecord>
where
    I: IntoIterator<Item = &'a InventoryRecord>,
    S: AsRef<str>,
{
    records
        .into_iter()
        .filter(|r| measures.iter().any(|m| m.as_ref() == r.measure))
        .collect()
}

/// Apply the year filter, then the viewport filter.
pub fn filter_records<'a, I>(
    records: I,
    viewport: &Viewport,
    window: Option<&YearWindow>,
    mode: YearRangeMode,
) -> Vec<&'a InventoryRecord>
where
    I: IntoIterator<Item = &'a InventoryRecord>,
{
    let by_year = filter_by_year_range(records, window, mode);
    filter_by_viewport(by_year.into_iter(), viewport)
}
