//! Year windows and the temporal comparison modes used by the filters.

use serde::{Deserialize, Serialize};

/// How a record's `[begin_year, end_year]` span is compared with a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum YearRangeMode {
    /// The record's span covers the whole window.
    #[default]
    #[serde(rename = "in")]
    Inside,
    /// The record's span lies within the window.
    #[serde(rename = "out")]
    Outside,
    /// The record's span equals the window.
    #[serde(rename = "exact")]
    ExactMatch,
}

impl YearRangeMode {
    /// Check a record span against a window under this mode.
    pub fn matches(&self, begin_year: i32, end_year: i32, window: &YearWindow) -> bool {
        match self {
            YearRangeMode::Inside => begin_year <= window.begin && end_year >= window.end,
            YearRangeMode::Outside => begin_year >= window.begin && end_year <= window.end,
            YearRangeMode::ExactMatch => begin_year == window.begin && end_year == window.end,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            YearRangeMode::Inside => "in",
            YearRangeMode::Outside => "out",
            YearRangeMode::ExactMatch => "exact",
        }
    }
}

/// A requested inclusive year window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct YearWindow {
    pub begin: i32,
    pub end: i32,
}

impl YearWindow {
    pub fn new(begin: i32, end: i32) -> Self {
        Self { begin, end }
    }

    /// Build a window from a slider value. Only a value with both bounds set
    /// is a window; anything else means no selection was made yet.
    pub fn from_slider(value: [Option<i32>; 2]) -> Option<Self> {
        match value {
            [Some(begin), Some(end)] => Some(Self { begin, end }),
            _ => None,
        }
    }

    /// True when `begin <= end`.
    pub fn is_ordered(&self) -> bool {
        self.begin <= self.end
    }

    /// Number of distinct years, zero for an inverted window.
    pub fn year_count(&self) -> usize {
        if self.is_ordered() {
            (self.end - self.begin + 1) as usize
        } else {
            0
        }
    }

    /// Iterate the years in ascending order.
    pub fn years(&self) -> std::ops::RangeInclusive<i32> {
        self.begin..=self.end
    }
}

impl std::fmt::Display for YearWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} - {}", self.begin, self.end)
    }
}

/// Lock applied by the user so that a control is not recomputed when the
/// other controls change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FixFilter {
    #[default]
    None,
    #[serde(alias = "Mapbox")]
    Map,
    Measures,
    Time,
}
