//! Catalog queries: which stations, measures and years match.

use std::collections::{BTreeMap, HashSet};

use station_common::payload::SLIDER_MARK_COLOR;
use station_common::{
    InventoryRecord, MarkStyle, MeasureOption, SliderMark, SliderSpec, StationPoint, YearWindow,
};

/// Measures offered by the "core" preset.
pub const CORE_MEASURES: [&str; 5] = ["PRCP", "SNOW", "SNWD", "TMAX", "TMIN"];

/// Spacing of labelled slider marks, in years.
pub const SLIDER_MARK_STEP: usize = 20;

/// Unique station ids in the filtered records.
pub fn distinct_stations<'a, I>(records: I) -> HashSet<String>
where
    I: IntoIterator<Item = &'a InventoryRecord>,
{
    records.into_iter().map(|r| r.station.clone()).collect()
}

/// Unique measure codes in first-seen order.
pub fn distinct_measures<'a, I>(records: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a InventoryRecord>,
{
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter(|r| seen.insert(r.measure.as_str()))
        .map(|r| r.measure.clone())
        .collect()
}

/// Minimum begin year and maximum end year over the whole catalog.
///
/// These are the absolute slider bounds and do not depend on any filter.
/// `None` when the catalog is empty.
pub fn year_bounds(catalog: &[InventoryRecord]) -> Option<YearWindow> {
    year_bounds_of_filtered(catalog)
}

/// Minimum begin year and maximum end year over a filtered subset.
///
/// `None` is the "no data" sentinel: callers keep their current selection
/// instead of collapsing the range.
pub fn year_bounds_of_filtered<'a, I>(records: I) -> Option<YearWindow>
where
    I: IntoIterator<Item = &'a InventoryRecord>,
{
    records.into_iter().fold(None, |acc, r| {
        Some(match acc {
            None => YearWindow::new(r.begin_year, r.end_year),
            Some(w) => YearWindow::new(w.begin.min(r.begin_year), w.end.max(r.end_year)),
        })
    })
}

/// One map row per station, keeping the first record seen for each.
pub fn station_points<'a, I>(records: I) -> Vec<StationPoint>
where
    I: IntoIterator<Item = &'a InventoryRecord>,
{
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter(|r| seen.insert(r.station.as_str()))
        .map(StationPoint::from)
        .collect()
}

/// Selectable options for a list of measure codes.
pub fn measure_options(measures: &[String]) -> Vec<MeasureOption> {
    measures
        .iter()
        .map(|m| MeasureOption {
            label: m.clone(),
            value: m.clone(),
        })
        .collect()
}

/// Measure selection presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeasurePreset {
    /// Every measure in the catalog.
    All,
    /// The five core GHCN elements.
    Core,
    /// Nothing selected.
    Clear,
}

/// Expand a preset into a measure list.
pub fn measure_preset(preset: MeasurePreset, catalog: &[InventoryRecord]) -> Vec<String> {
    match preset {
        MeasurePreset::All => distinct_measures(catalog),
        MeasurePreset::Core => CORE_MEASURES.iter().map(|m| m.to_string()).collect(),
        MeasurePreset::Clear => Vec::new(),
    }
}

/// Build the year slider spec: absolute bounds, current value, and a mark
/// every [`SLIDER_MARK_STEP`] years from `min` plus one at `max`.
pub fn slider_spec(bounds: YearWindow, value: YearWindow) -> SliderSpec {
    let mark = |year: i32| SliderMark {
        label: year.to_string(),
        style: MarkStyle {
            color: SLIDER_MARK_COLOR.to_string(),
        },
    };

    let mut marks: BTreeMap<i32, SliderMark> = (bounds.begin..bounds.end)
        .step_by(SLIDER_MARK_STEP)
        .map(|year| (year, mark(year)))
        .collect();
    marks.insert(bounds.end, mark(bounds.end));

    SliderSpec {
        min: bounds.begin,
        max: bounds.end,
        value: [value.begin, value.end],
        marks,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records() -> Vec<InventoryRecord> {
        vec![
            InventoryRecord::new("A", 39.0, -94.0, "TMAX", 1940, 1970),
            InventoryRecord::new("A", 39.0, -94.0, "PRCP", 1945, 2000),
            InventoryRecord::new("B", 45.0, -120.0, "TMAX", 1955, 1958),
            InventoryRecord::new("C", 30.0, -90.0, "SNOW", 1890, 1960),
        ]
    }

    #[test]
    fn test_distinct_stations() {
        let recs = records();
        let stations = distinct_stations(&recs);
        assert_eq!(stations.len(), 3);
        assert!(stations.contains("C"));
    }

    #[test]
    fn test_distinct_measures_first_seen_order() {
        let recs = records();
        assert_eq!(distinct_measures(&recs), vec!["TMAX", "PRCP", "SNOW"]);
    }

    #[test]
    fn test_year_bounds() {
        let recs = records();
        assert_eq!(year_bounds(&recs), Some(YearWindow::new(1890, 2000)));
        assert_eq!(
            year_bounds_of_filtered(recs.iter().filter(|r| r.station == "A")),
            Some(YearWindow::new(1940, 2000))
        );
    }

    #[test]
    fn test_year_bounds_empty_is_no_data() {
        assert_eq!(year_bounds(&[]), None);
        assert_eq!(year_bounds_of_filtered(std::iter::empty()), None);
    }

    #[test]
    fn test_station_points_keep_first() {
        let recs = records();
        let points = station_points(&recs);
        let ids: Vec<&str> = points.iter().map(|p| p.station.as_str()).collect();
        assert_eq!(ids, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_presets() {
        let recs = records();
        assert_eq!(measure_preset(MeasurePreset::All, &recs), vec!["TMAX", "PRCP", "SNOW"]);
        assert_eq!(measure_preset(MeasurePreset::Core, &recs).len(), 5);
        assert!(measure_preset(MeasurePreset::Clear, &recs).is_empty());
    }

    #[test]
    fn test_slider_marks() {
        let spec = slider_spec(YearWindow::new(1763, 1830), YearWindow::new(1800, 1810));
        let years: Vec<i32> = spec.marks.keys().copied().collect();
        assert_eq!(years, vec![1763, 1783, 1803, 1823, 1830]);
        assert_eq!(spec.value, [1800, 1810]);
        assert_eq!(spec.marks[&1830].style.color, "#EBEBEB");
    }
}
