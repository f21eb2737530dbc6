//! Map viewport state and its resolution into a spatial restriction.

use serde::{Deserialize, Serialize};

use crate::bbox::BoundingBox;

/// Drag mode reported by the map while the user pans.
pub const DRAGMODE_PAN: &str = "pan";
/// Drag mode reported while a lasso selection is drawn.
pub const DRAGMODE_LASSO: &str = "lasso";

/// A longitude/latitude pair as reported by the map.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LonLat {
    pub lon: f64,
    pub lat: f64,
}

/// Derived view geometry: the four corners of the visible area.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DerivedView {
    #[serde(default)]
    pub coordinates: Vec<[f64; 2]>,
}

/// Raw map interaction state, in the shape the map component emits it.
///
/// An empty state or one carrying only `autosize` is the initial load.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MapState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dragmode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub autosize: Option<bool>,
    #[serde(rename = "mapbox.center", default, skip_serializing_if = "Option::is_none")]
    pub center: Option<LonLat>,
    #[serde(rename = "mapbox.zoom", default, skip_serializing_if = "Option::is_none")]
    pub zoom: Option<f64>,
    #[serde(rename = "mapbox._derived", default, skip_serializing_if = "Option::is_none")]
    pub derived: Option<DerivedView>,
}

impl MapState {
    /// True before the user has interacted with the map.
    pub fn is_initial(&self) -> bool {
        self.dragmode.is_none() && self.center.is_none() && self.zoom.is_none() && self.derived.is_none()
    }

    pub fn is_dragmode(&self, mode: &str) -> bool {
        self.dragmode.as_deref() == Some(mode)
    }
}

/// Spatial restriction applied to station records.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Viewport {
    /// No viewport reported yet. No restriction.
    #[default]
    Initial,
    /// The user only panned. No restriction.
    Pan,
    /// Stations explicitly picked with a lasso or box.
    Selection(Vec<String>),
    /// The visible map area.
    BoundingBox(BoundingBox),
}

impl Viewport {
    /// Resolve the map state and optional selection into a viewport.
    ///
    /// Rules, in order: a pan is unrestricted; any other drag mode with a
    /// selection keeps the selected stations; with no drag mode the visible
    /// corners form a bounding box; everything else (initial load, a lasso
    /// with nothing selected yet, missing corners) is unrestricted.
    pub fn from_map_state(map: Option<&MapState>, selected: Option<&[String]>) -> Self {
        let Some(map) = map else {
            return Viewport::Initial;
        };

        if map.is_dragmode(DRAGMODE_PAN) {
            return Viewport::Pan;
        }

        if map.dragmode.is_some() {
            return match selected {
                Some(stations) => Viewport::Selection(stations.to_vec()),
                None => Viewport::Initial,
            };
        }

        if map.is_initial() {
            return Viewport::Initial;
        }

        map.derived
            .as_ref()
            .and_then(|derived| BoundingBox::from_corners(&derived.coordinates).ok())
            .map(Viewport::BoundingBox)
            .unwrap_or(Viewport::Initial)
    }

    /// True when the viewport places no restriction on records.
    pub fn is_unrestricted(&self) -> bool {
        matches!(self, Viewport::Initial | Viewport::Pan)
    }
}
