//! Common types and utilities shared across the station explorer crates.

pub mod bbox;
pub mod error;
pub mod payload;
pub mod session;
pub mod station;
pub mod viewport;
pub mod years;

pub use bbox::BoundingBox;
pub use error::{ExplorerError, ExplorerResult};
pub use payload::{ExportStatus, MapCenter, MarkStyle, MeasureOption, SliderMark, SliderSpec};
pub use session::SessionId;
pub use station::{InventoryRecord, Located, StationPoint};
pub use viewport::{LonLat, MapState, Viewport};
pub use years::{FixFilter, YearRangeMode, YearWindow};
