//! Feature extraction for one unit.

use log::debug;
use rustc_hash::FxHashSet;
use serde_json::json;

use crate::core::{render_value, Event, ExtractionMode, FeatureData, FeatureValue};
use crate::error::Result;
use crate::loader::{ExtractorLoader, LoadReport};
use crate::registry::{ExtractorRegistry, FeatureOrder, FeatureRegistry};

/// Owns a loader and a feature registry for one extraction unit.
///
/// The unit is a session, a player or the population, depending on the
/// loader's mode. Rows start with identifying columns:
///
/// | Mode | Columns |
/// |---|---|
/// | Session | `PlayerID`, `SessionID` |
/// | Player | `PlayerID`, `SessionCount` |
/// | Population | `PlayerCount`, `SessionCount` |
#[derive(Debug)]
pub struct FeatureProcessor {
    loader: ExtractorLoader,
    registry: FeatureRegistry,
    report: LoadReport,
    player_id: Option<String>,
    session_id: Option<String>,
    sessions: FxHashSet<String>,
    players: FxHashSet<String>,
}

impl FeatureProcessor {
    /// Load the unit's features.
    pub fn new(loader: ExtractorLoader, player_id: Option<&str>, session_id: Option<&str>) -> Result<Self> {
        let mut registry = FeatureRegistry::new(loader.mode());
        let report = loader.load_to_feature_registry(&mut registry)?;
        Ok(Self {
            loader,
            registry,
            report,
            player_id: player_id.map(str::to_string),
            session_id: session_id.map(str::to_string),
            sessions: FxHashSet::default(),
            players: FxHashSet::default(),
        })
    }

    #[must_use]
    pub fn mode(&self) -> ExtractionMode {
        self.registry.mode()
    }

    /// What the loader registered and skipped.
    #[must_use]
    pub fn load_report(&self) -> &LoadReport {
        &self.report
    }

    #[must_use]
    pub fn registry(&self) -> &FeatureRegistry {
        &self.registry
    }

    pub fn process_event(&mut self, event: &Event) -> Result<()> {
        self.sessions.insert(event.session_id.clone());
        if let Some(user) = &event.user_id {
            self.players.insert(user.clone());
        }
        self.registry.extract_from_event(event)?;
        Ok(())
    }

    /// Feed a first-order result, from this unit or another one.
    pub fn process_feature_data(&mut self, data: &FeatureData) -> Result<()> {
        self.registry.extract_from_feature_data(data)?;
        Ok(())
    }

    /// Header: identifying columns, then every feature column.
    #[must_use]
    pub fn extractor_names(&self) -> Vec<String> {
        let ids: [&str; 2] = match self.mode() {
            ExtractionMode::Session => ["PlayerID", "SessionID"],
            ExtractionMode::Population => ["PlayerCount", "SessionCount"],
            _ => ["PlayerID", "SessionCount"],
        };
        ids.iter()
            .map(|id| id.to_string())
            .chain(self.registry.extractor_names())
            .collect()
    }

    /// Results of one order for this unit.
    pub fn feature_data(&mut self, order: FeatureOrder) -> Vec<FeatureData> {
        let (player, session) = (self.player_id.clone(), self.session_id.clone());
        self.registry
            .get_feature_data(order, player.as_deref(), session.as_deref())
    }

    /// Close the unit and produce its row.
    ///
    /// Pushes the unit's own first-order results into its second-order
    /// features, then reads every value.
    pub fn finalize(&mut self) -> Result<Vec<FeatureValue>> {
        for data in self.feature_data(FeatureOrder::FirstOrder) {
            self.registry.extract_from_feature_data(&data)?;
        }
        self.registry.finalize(FeatureOrder::SecondOrder);

        let mut row = self.id_values();
        row.extend(self.registry.get_feature_values());
        Ok(row)
    }

    /// `finalize`, rendered as text.
    pub fn finalize_strings(&mut self) -> Result<Vec<String>> {
        Ok(self.finalize()?.iter().map(render_value).collect())
    }

    /// Start over for another unit of the same mode.
    ///
    /// Instances are rebuilt from the schema with a fresh shared scope.
    pub fn reset(&mut self, player_id: Option<&str>, session_id: Option<&str>) -> Result<()> {
        debug!(
            "Resetting {} FeatureProcessor for player {:?}, session {:?}",
            self.mode(),
            player_id,
            session_id
        );
        self.registry.clear();
        self.loader = self.loader.for_new_unit();
        self.report = self.loader.load_to_feature_registry(&mut self.registry)?;
        self.player_id = player_id.map(str::to_string);
        self.session_id = session_id.map(str::to_string);
        self.sessions.clear();
        self.players.clear();
        Ok(())
    }

    fn id_values(&self) -> Vec<FeatureValue> {
        let text = |id: &Option<String>| id.as_deref().map_or(FeatureValue::Null, |s| json!(s));
        match self.mode() {
            ExtractionMode::Session => vec![text(&self.player_id), text(&self.session_id)],
            ExtractionMode::Population => vec![json!(self.players.len()), json!(self.sessions.len())],
            _ => vec![text(&self.player_id), json!(self.sessions.len())],
        }
    }
}
