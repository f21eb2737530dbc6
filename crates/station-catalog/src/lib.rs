//! GHCN station inventory: loading, geo/time filters and catalog queries.

pub mod filter;
pub mod loader;
pub mod query;

pub use filter::{filter_by_measures, filter_by_viewport, filter_by_year_range, filter_records};
pub use loader::{Catalog, DEFAULT_INVENTORY_URL};
pub use query::{
    distinct_measures, distinct_stations, measure_options, measure_preset, slider_spec,
    station_points, year_bounds, year_bounds_of_filtered, MeasurePreset, CORE_MEASURES,
};
