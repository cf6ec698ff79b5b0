//! Features: extractors that produce output columns.
//!
//! A game implements `Feature` for each statistic it wants. The trait only
//! describes the computation; `FeatureInstance` wraps it with everything
//! the registry needs (identity, filtering, caching, provenance).

use chrono::{DateTime, Utc};
use log::warn;
use serde_json::Value;

use crate::core::{Event, ExtractionMode, FeatureData, FeatureValue};

use super::extractor::{version_in_range, wants_event};
use super::filter::CountFilter;
use super::params::ExtractorParameters;

/// A feature computation.
///
/// Implementors accumulate whatever private state they need from events
/// (and, for second-order features, from other features' results) and
/// produce one value per output column in `compute`.
///
/// ## Column Contract
///
/// `compute` must return exactly `1 + subfeatures().len()` values, the
/// base column first, then one per subfeature in order.
pub trait Feature: Send {
    /// Event names this feature needs, or [`ALL_EVENTS`](super::ALL_EVENTS).
    fn event_dependencies(&self, mode: ExtractionMode) -> Vec<String>;

    /// Names of first-order features this feature consumes.
    ///
    /// A non-empty list makes this a second-order feature.
    fn feature_dependencies(&self, _mode: ExtractionMode) -> Vec<String> {
        Vec::new()
    }

    /// Accumulate an accepted event.
    fn update_from_event(&mut self, event: &Event);

    /// Accumulate a first-order feature result.
    fn update_from_feature_data(&mut self, _data: &FeatureData) {}

    /// Compute the current values from accumulated state.
    fn compute(&self) -> Vec<FeatureValue>;

    /// Names of extra columns after the base column.
    fn subfeatures(&self) -> Vec<String> {
        Vec::new()
    }

    /// Suffix appended to the base column only.
    fn base_suffix(&self) -> &str {
        ""
    }

    /// Oldest log version the feature understands.
    fn min_version(&self) -> Option<&str> {
        None
    }

    /// Newest log version the feature understands.
    fn max_version(&self) -> Option<&str> {
        None
    }

    /// Extraction modes the feature supports.
    fn available_modes(&self) -> &'static [ExtractionMode] {
        ExtractionMode::FEATURE_MODES
    }

    /// Bumped whenever the output of the feature changes meaning.
    fn feature_version(&self) -> u32 {
        1
    }
}

#[derive(Clone, Debug, Default)]
struct Provenance {
    start_timestamp: Option<DateTime<Utc>>,
    last_session: Option<String>,
    last_index: Option<u64>,
    last_timestamp: Option<DateTime<Utc>>,
    app_version: Option<String>,
    app_branch: Option<String>,
}

/// One registered feature: a computation bound to a single count bucket.
pub struct FeatureInstance {
    params: ExtractorParameters,
    feature_type: String,
    filter: CountFilter,
    feature: Box<dyn Feature>,
    event_deps: Vec<String>,
    feature_deps: Vec<String>,
    columns: Vec<String>,
    up_to_date: bool,
    latest_values: Vec<FeatureValue>,
    provenance: Provenance,
}

impl FeatureInstance {
    /// Wrap a feature computation.
    ///
    /// Dependencies and column names are captured once here and stay fixed
    /// for the lifetime of the instance.
    pub fn new(
        params: ExtractorParameters,
        feature_type: impl Into<String>,
        filter: CountFilter,
        feature: Box<dyn Feature>,
    ) -> Self {
        let event_deps = feature.event_dependencies(params.mode);
        let feature_deps = feature.feature_dependencies(params.mode);
        let columns = std::iter::once(format!("{}{}", params.name, feature.base_suffix()))
            .chain(
                feature
                    .subfeatures()
                    .into_iter()
                    .map(|sub| format!("{}-{}", params.name, sub)),
            )
            .collect::<Vec<_>>();
        let latest_values = vec![Value::Null; columns.len()];

        Self {
            params,
            feature_type: feature_type.into(),
            filter,
            feature,
            event_deps,
            feature_deps,
            columns,
            up_to_date: false,
            latest_values,
            provenance: Provenance::default(),
        }
    }

    #[must_use]
    pub fn params(&self) -> &ExtractorParameters {
        &self.params
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.params.name
    }

    #[must_use]
    pub fn feature_type(&self) -> &str {
        &self.feature_type
    }

    #[must_use]
    pub fn count_index(&self) -> Option<u32> {
        self.params.count_index
    }

    #[must_use]
    pub fn count_filter(&self) -> &CountFilter {
        &self.filter
    }

    #[must_use]
    pub fn event_dependencies(&self) -> &[String] {
        &self.event_deps
    }

    #[must_use]
    pub fn feature_dependencies(&self) -> &[String] {
        &self.feature_deps
    }

    /// True when the instance consumes other features' output.
    #[must_use]
    pub fn is_second_order(&self) -> bool {
        !self.feature_deps.is_empty()
    }

    #[must_use]
    pub fn available_modes(&self) -> &'static [ExtractionMode] {
        self.feature.available_modes()
    }

    /// Output column names: base column, then `name-subfeature` columns.
    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.columns
    }

    /// Offer an event to the instance.
    ///
    /// Irrelevant events (wrong name, version or count bucket) are ignored.
    /// Returns whether the event was accepted.
    pub fn extract_from_event(&mut self, event: &Event) -> bool {
        if self.provenance.start_timestamp.is_none() {
            self.provenance.start_timestamp = Some(event.timestamp);
        }
        if !self.accepts(event) {
            return false;
        }

        self.feature.update_from_event(event);
        self.up_to_date = false;

        let prov = &mut self.provenance;
        prov.last_session = Some(event.session_id.clone());
        prov.last_index = event.event_sequence_index;
        prov.last_timestamp = Some(event.timestamp);
        if event.app_version.is_some() {
            prov.app_version = event.app_version.clone();
            prov.app_branch = event.app_branch.clone();
        }
        true
    }

    /// Offer a first-order result to the instance.
    ///
    /// Only results named in the instance's feature dependencies are
    /// accepted.
    pub fn extract_from_feature_data(&mut self, data: &FeatureData) -> bool {
        if !self.feature_deps.iter().any(|dep| *dep == data.name) {
            return false;
        }
        self.feature.update_from_feature_data(data);
        self.up_to_date = false;
        true
    }

    /// Current values, recomputed only if new input arrived since the last
    /// read.
    pub fn feature_values(&mut self) -> &[FeatureValue] {
        if !self.up_to_date {
            let mut values = self.feature.compute();
            if values.len() != self.columns.len() {
                warn!(
                    "Feature {} computed {} values for {} columns",
                    self.params.name,
                    values.len(),
                    self.columns.len()
                );
                values.resize(self.columns.len(), Value::Null);
            }
            self.latest_values = values;
            self.up_to_date = true;
        }
        &self.latest_values
    }

    /// Package the current values with provenance.
    pub fn to_feature_data(
        &mut self,
        player_id: Option<&str>,
        session_id: Option<&str>,
    ) -> FeatureData {
        let values = self.feature_values().to_vec();
        let prov = &self.provenance;
        FeatureData {
            name: self.params.name.clone(),
            feature_type: self.feature_type.clone(),
            count_index: self.reported_count_index(),
            mode: self.params.mode,
            columns: self.columns.clone(),
            values,
            player_id: player_id.map(str::to_string),
            session_id: session_id.map(str::to_string),
            feature_version: self.feature.feature_version(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            app_version: prov.app_version.clone(),
            app_branch: prov.app_branch.clone(),
            last_session: prov.last_session.clone(),
            last_index: prov.last_index,
            last_timestamp: prov.last_timestamp,
            start_timestamp: prov.start_timestamp,
        }
    }

    // Session aggregates report bucket 0.
    fn reported_count_index(&self) -> Option<u32> {
        match (self.params.count_index, self.params.mode) {
            (None, ExtractionMode::Session) => Some(0),
            (index, _) => index,
        }
    }

    fn accepts(&self, event: &Event) -> bool {
        version_in_range(
            event.log_version.as_deref(),
            self.feature.min_version(),
            self.feature.max_version(),
        ) && wants_event(&self.event_deps, &event.event_name)
            && self.filter.accepts(event, self.params.count_index)
    }
}

impl std::fmt::Debug for FeatureInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeatureInstance")
            .field("name", &self.params.name)
            .field("feature_type", &self.feature_type)
            .field("count_index", &self.params.count_index)
            .field("filter", &self.filter)
            .field("event_deps", &self.event_deps)
            .field("feature_deps", &self.feature_deps)
            .field("up_to_date", &self.up_to_date)
            .finish()
    }
}

impl std::fmt::Display for FeatureInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} : {}", self.params.name, self.params.description)
    }
}
