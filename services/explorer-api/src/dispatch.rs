//! Trigger dispatch.
//!
//! Every user interaction arrives as a named [`TriggerSource`] plus the
//! current control values ([`InputBundle`]). The dispatch table maps the
//! trigger to the handlers that depend on it; each handler recomputes one
//! session artifact from the catalog and writes it to the session cache, or
//! reports [`HandlerOutcome::NoUpdate`] when a lock rule says the artifact
//! must stay as it is.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use station_catalog::{
    distinct_measures, filter_by_measures, filter_by_viewport, filter_by_year_range, filter_records,
    measure_options, measure_preset, slider_spec, station_points, year_bounds_of_filtered, Catalog,
    MeasurePreset,
};
use station_common::viewport::DRAGMODE_LASSO;
use station_common::{
    ExplorerError, ExplorerResult, FixFilter, MapCenter, MapState, MeasureOption, SessionId,
    SliderSpec, StationPoint, Viewport, YearRangeMode, YearWindow,
};
use storage::{CacheNamespace, SessionCache};

/// The interaction that caused a dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerSource {
    /// A new session was created.
    Session,
    YearSlider,
    Measures,
    DateRangeMode,
    FixFilter,
    MapRelayout,
    MapSelection,
    MeasureAll,
    MeasureCore,
    MeasureClear,
}

impl TriggerSource {
    pub const ALL: [TriggerSource; 10] = [
        TriggerSource::Session,
        TriggerSource::YearSlider,
        TriggerSource::Measures,
        TriggerSource::DateRangeMode,
        TriggerSource::FixFilter,
        TriggerSource::MapRelayout,
        TriggerSource::MapSelection,
        TriggerSource::MeasureAll,
        TriggerSource::MeasureCore,
        TriggerSource::MeasureClear,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerSource::Session => "session",
            TriggerSource::YearSlider => "year_slider",
            TriggerSource::Measures => "measures",
            TriggerSource::DateRangeMode => "date_range_mode",
            TriggerSource::FixFilter => "fix_filter",
            TriggerSource::MapRelayout => "map_relayout",
            TriggerSource::MapSelection => "map_selection",
            TriggerSource::MeasureAll => "measure_all",
            TriggerSource::MeasureCore => "measure_core",
            TriggerSource::MeasureClear => "measure_clear",
        }
    }
}

impl fmt::Display for TriggerSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TriggerSource {
    type Err = ExplorerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TriggerSource::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ExplorerError::UnknownTrigger(s.to_string()))
    }
}

/// A session artifact and the handler that recomputes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandlerKind {
    StationMap,
    MeasureOptions,
    MeasureValue,
    YearSlider,
    MapCenter,
}

impl HandlerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            HandlerKind::StationMap => "station_map",
            HandlerKind::MeasureOptions => "measure_options",
            HandlerKind::MeasureValue => "measure_value",
            HandlerKind::YearSlider => "year_slider",
            HandlerKind::MapCenter => "map_center",
        }
    }
}

use TriggerSource as T;

/// Which triggers each handler listens to.
const DISPATCH_TABLE: [(HandlerKind, &[TriggerSource]); 5] = [
    (
        HandlerKind::StationMap,
        &[T::Session, T::YearSlider, T::Measures, T::DateRangeMode, T::FixFilter],
    ),
    (
        HandlerKind::MeasureOptions,
        &[
            T::Session,
            T::YearSlider,
            T::MapRelayout,
            T::MapSelection,
            T::FixFilter,
            T::DateRangeMode,
        ],
    ),
    (
        HandlerKind::MeasureValue,
        &[T::Session, T::MeasureAll, T::MeasureCore, T::MeasureClear],
    ),
    (
        HandlerKind::YearSlider,
        &[T::Session, T::MapRelayout, T::MapSelection, T::Measures, T::FixFilter],
    ),
    (HandlerKind::MapCenter, &[T::MapRelayout]),
];

/// Handlers to run for a trigger, in table order.
pub fn handlers_for(trigger: TriggerSource) -> Vec<HandlerKind> {
    DISPATCH_TABLE
        .iter()
        .filter(|(_, triggers)| triggers.contains(&trigger))
        .map(|(handler, _)| *handler)
        .collect()
}

/// Current values of every control, sent with each trigger.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InputBundle {
    /// Year slider value. Only a value with both ends set is a selection.
    pub year_range: [Option<i32>; 2],
    pub measures: Vec<String>,
    pub mode: YearRangeMode,
    pub fix_filter: FixFilter,
    /// Latest map relayout state.
    pub map: Option<MapState>,
    /// Stations picked with a lasso or box, if any.
    pub selection: Option<Vec<String>>,
}

impl InputBundle {
    pub fn window(&self) -> Option<YearWindow> {
        YearWindow::from_slider(self.year_range)
    }

    pub fn viewport(&self) -> Viewport {
        Viewport::from_map_state(self.map.as_ref(), self.selection.as_deref())
    }

    fn is_lasso(&self) -> bool {
        self.map.as_ref().is_some_and(|m| m.is_dragmode(DRAGMODE_LASSO))
    }
}

/// Result of one handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandlerOutcome {
    Computed,
    NoUpdate,
}

/// Outcome of every handler a trigger reached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchReport {
    pub session: SessionId,
    pub trigger: TriggerSource,
    pub outcomes: BTreeMap<HandlerKind, HandlerOutcome>,
}

// === Handler computations ===
//
// Each returns `None` when the artifact must not change.

/// Stations matching the selected measures and year window, one row each.
/// The viewport is not applied here.
pub fn compute_station_map(catalog: &Catalog, trigger: TriggerSource, input: &InputBundle) -> Option<Vec<StationPoint>> {
    if input.is_lasso()
        && trigger == TriggerSource::YearSlider
        && matches!(input.fix_filter, FixFilter::Map | FixFilter::Measures)
    {
        return None;
    }

    let window = input.window();
    let by_measure = filter_by_measures(catalog.records(), input.measures.as_slice());
    let records = filter_by_year_range(by_measure, window.as_ref(), input.mode);
    Some(station_points(records))
}

/// Measures available within the year window and viewport.
pub fn compute_measure_options(catalog: &Catalog, input: &InputBundle) -> Option<Vec<MeasureOption>> {
    if input.fix_filter == FixFilter::Measures {
        return None;
    }

    let window = input.window();
    let records = filter_records(catalog.records(), &input.viewport(), window.as_ref(), input.mode);
    Some(measure_options(&distinct_measures(records)))
}

/// Selected measures. A new session starts with every measure selected.
pub fn compute_measure_value(catalog: &Catalog, trigger: TriggerSource) -> Option<Vec<String>> {
    let preset = match trigger {
        TriggerSource::Session | TriggerSource::MeasureAll => MeasurePreset::All,
        TriggerSource::MeasureCore => MeasurePreset::Core,
        TriggerSource::MeasureClear => MeasurePreset::Clear,
        _ => return None,
    };
    Some(measure_preset(preset, catalog.records()))
}

/// Year slider bounds and value.
///
/// Bounds always span the whole catalog. A new session selects the full
/// range; otherwise the value follows the years of the stations in view,
/// keeping the current value when nothing is in view.
pub fn compute_year_slider(catalog: &Catalog, trigger: TriggerSource, input: &InputBundle) -> Option<SliderSpec> {
    let bounds = catalog.year_bounds()?;

    if trigger == TriggerSource::Session {
        return Some(slider_spec(bounds, bounds));
    }
    if input.fix_filter == FixFilter::Time {
        return None;
    }
    if input.is_lasso() && input.selection.is_none() {
        return None;
    }

    let in_view = filter_by_viewport(catalog.records(), &input.viewport());
    let value = year_bounds_of_filtered(in_view)
        .or_else(|| input.window())
        .unwrap_or(bounds);
    Some(slider_spec(bounds, value))
}

/// Map center and zoom, skipped while a drag mode is active.
pub fn compute_map_center(input: &InputBundle) -> Option<MapCenter> {
    MapCenter::from_map_state(input.map.as_ref())
}

/// Runs the handlers of a trigger against the catalog and a session cache.
pub struct Dispatcher<'a> {
    catalog: &'a Catalog,
    cache: &'a SessionCache,
}

impl<'a> Dispatcher<'a> {
    pub fn new(catalog: &'a Catalog, cache: &'a SessionCache) -> Self {
        Self { catalog, cache }
    }

    /// Run every handler listening to `trigger`.
    #[instrument(skip(self, input), fields(session = %session, trigger = %trigger))]
    pub async fn dispatch(
        &self,
        session: SessionId,
        trigger: TriggerSource,
        input: &InputBundle,
    ) -> ExplorerResult<DispatchReport> {
        let mut outcomes = BTreeMap::new();

        for handler in handlers_for(trigger) {
            let outcome = self.run(handler, session, trigger, input).await?;
            debug!(handler = handler.as_str(), outcome = ?outcome, "Handler finished");
            outcomes.insert(handler, outcome);
        }

        Ok(DispatchReport {
            session,
            trigger,
            outcomes,
        })
    }

    async fn run(
        &self,
        handler: HandlerKind,
        session: SessionId,
        trigger: TriggerSource,
        input: &InputBundle,
    ) -> ExplorerResult<HandlerOutcome> {
        match handler {
            HandlerKind::StationMap => {
                let value = compute_station_map(self.catalog, trigger, input);
                self.store(CacheNamespace::StationMap, session, value).await
            }
            HandlerKind::MeasureOptions => {
                let value = compute_measure_options(self.catalog, input);
                self.store(CacheNamespace::MeasureOptions, session, value).await
            }
            HandlerKind::MeasureValue => {
                let value = compute_measure_value(self.catalog, trigger);
                self.store(CacheNamespace::MeasureValue, session, value).await
            }
            HandlerKind::YearSlider => {
                let value = compute_year_slider(self.catalog, trigger, input);
                self.store(CacheNamespace::SliderValue, session, value).await
            }
            HandlerKind::MapCenter => {
                let value = compute_map_center(input);
                self.store(CacheNamespace::MapCenter, session, value).await
            }
        }
    }

    async fn store<V: Serialize + Sync>(
        &self,
        namespace: CacheNamespace,
        session: SessionId,
        value: Option<V>,
    ) -> ExplorerResult<HandlerOutcome> {
        match value {
            Some(value) => {
                self.cache.put(namespace, session, &value).await?;
                Ok(HandlerOutcome::Computed)
            }
            None => Ok(HandlerOutcome::NoUpdate),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use station_common::viewport::DerivedView;
    use test_utils::{corners, SAMPLE_INVENTORY, SAMPLE_STATION_COUNT, SAMPLE_YEAR_BOUNDS};

    fn catalog() -> Catalog {
        Catalog::parse(SAMPLE_INVENTORY).unwrap()
    }

    fn lasso(selection: Option<Vec<String>>, fix_filter: FixFilter) -> InputBundle {
        InputBundle {
            fix_filter,
            map: Some(MapState {
                dragmode: Some(DRAGMODE_LASSO.to_string()),
                ..Default::default()
            }),
            selection,
            ..Default::default()
        }
    }

    fn midwest() -> InputBundle {
        InputBundle {
            map: Some(MapState {
                zoom: Some(5.0),
                derived: Some(DerivedView {
                    coordinates: corners::MIDWEST.to_vec(),
                }),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_trigger_names_round_trip() {
        for trigger in TriggerSource::ALL {
            assert_eq!(trigger.as_str().parse::<TriggerSource>().unwrap(), trigger);
        }
        assert!(matches!(
            "mapbox".parse::<TriggerSource>(),
            Err(ExplorerError::UnknownTrigger(name)) if name == "mapbox"
        ));
    }

    #[test]
    fn test_dispatch_table_routing() {
        use HandlerKind::*;

        assert_eq!(
            handlers_for(T::Session),
            vec![StationMap, MeasureOptions, MeasureValue, YearSlider]
        );
        assert_eq!(handlers_for(T::YearSlider), vec![StationMap, MeasureOptions]);
        assert_eq!(handlers_for(T::Measures), vec![StationMap, YearSlider]);
        assert_eq!(handlers_for(T::DateRangeMode), vec![StationMap, MeasureOptions]);
        assert_eq!(handlers_for(T::FixFilter), vec![StationMap, MeasureOptions, YearSlider]);
        assert_eq!(handlers_for(T::MapRelayout), vec![MeasureOptions, YearSlider, MapCenter]);
        assert_eq!(handlers_for(T::MapSelection), vec![MeasureOptions, YearSlider]);
        for preset in [T::MeasureAll, T::MeasureCore, T::MeasureClear] {
            assert_eq!(handlers_for(preset), vec![MeasureValue]);
        }
    }

    #[test]
    fn test_station_map_lock_during_lasso() {
        let catalog = catalog();
        let input = lasso(Some(vec!["USW00003947".into()]), FixFilter::Map);
        assert!(compute_station_map(&catalog, T::YearSlider, &input).is_none());
        assert!(compute_station_map(&catalog, T::Measures, &input).is_some());

        let unlocked = lasso(Some(vec!["USW00003947".into()]), FixFilter::Time);
        assert!(compute_station_map(&catalog, T::YearSlider, &unlocked).is_some());
    }

    #[test]
    fn test_station_map_ignores_viewport() {
        let catalog = catalog();
        let mut input = midwest();
        input.measures = measure_preset(MeasurePreset::All, catalog.records());

        let points = compute_station_map(&catalog, T::Measures, &input).unwrap();
        assert_eq!(points.len(), SAMPLE_STATION_COUNT);

        input.measures.clear();
        assert!(compute_station_map(&catalog, T::Measures, &input).unwrap().is_empty());
    }

    #[test]
    fn test_measure_options_lock() {
        let catalog = catalog();
        let mut input = midwest();
        assert!(compute_measure_options(&catalog, &input).is_some());

        input.fix_filter = FixFilter::Measures;
        assert!(compute_measure_options(&catalog, &input).is_none());
    }

    #[test]
    fn test_measure_value_presets() {
        let catalog = catalog();
        let all = compute_measure_value(&catalog, T::Session).unwrap();
        assert_eq!(all, compute_measure_value(&catalog, T::MeasureAll).unwrap());
        assert_eq!(
            compute_measure_value(&catalog, T::MeasureCore).unwrap(),
            vec!["PRCP", "SNOW", "SNWD", "TMAX", "TMIN"]
        );
        assert!(compute_measure_value(&catalog, T::MeasureClear).unwrap().is_empty());
        assert!(compute_measure_value(&catalog, T::Measures).is_none());
    }

    #[test]
    fn test_year_slider_rules() {
        let catalog = catalog();
        let (min, max) = SAMPLE_YEAR_BOUNDS;

        let initial = compute_year_slider(&catalog, T::Session, &InputBundle::default()).unwrap();
        assert_eq!((initial.min, initial.max), (min, max));
        assert_eq!(initial.value, [min, max]);

        let locked = InputBundle {
            fix_filter: FixFilter::Time,
            ..Default::default()
        };
        assert!(compute_year_slider(&catalog, T::MapRelayout, &locked).is_none());
        assert!(compute_year_slider(&catalog, T::MapRelayout, &lasso(None, FixFilter::None)).is_none());

        let in_view = compute_year_slider(&catalog, T::MapRelayout, &midwest()).unwrap();
        assert_eq!((in_view.min, in_view.max), (min, max));
        assert!(in_view.value[0] >= min && in_view.value[1] <= max);
    }

    #[test]
    fn test_year_slider_keeps_value_when_view_empty() {
        let catalog = catalog();
        let mut input = lasso(Some(vec!["NOPE0000000".into()]), FixFilter::None);
        input.year_range = [Some(1990), Some(2000)];

        let spec = compute_year_slider(&catalog, T::MapSelection, &input).unwrap();
        assert_eq!(spec.value, [1990, 2000]);
    }

    #[test]
    fn test_map_center_skipped_while_dragging() {
        assert!(compute_map_center(&lasso(None, FixFilter::None)).is_none());
        assert!(compute_map_center(&InputBundle::default()).is_some());
    }

    #[tokio::test]
    async fn test_dispatch_writes_session_artifacts() {
        use std::sync::Arc;
        use storage::MemoryBackend;

        let catalog = catalog();
        let cache = SessionCache::new(Arc::new(MemoryBackend::default()));
        let session = SessionId::new();

        let report = Dispatcher::new(&catalog, &cache)
            .dispatch(session, T::Session, &InputBundle::default())
            .await
            .unwrap();
        assert_eq!(report.outcomes.len(), 4);
        assert!(report.outcomes.values().all(|o| *o == HandlerOutcome::Computed));

        let slider: Option<SliderSpec> = cache.get(CacheNamespace::SliderValue, session).await.unwrap();
        assert!(slider.is_some());

        // No measures selected in the bundle, so the map is empty.
        let stations: Option<Vec<StationPoint>> = cache.get(CacheNamespace::StationMap, session).await.unwrap();
        assert_eq!(stations, Some(Vec::new()));

        let center: Option<MapCenter> = cache.get(CacheNamespace::MapCenter, session).await.unwrap();
        assert!(center.is_none());
    }
}
