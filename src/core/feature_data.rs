//! Finalized feature results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::mode::ExtractionMode;

/// One output value of a feature column. `Value::Null` stands for "no value".
pub type FeatureValue = Value;

/// Render a feature value for text output.
///
/// Nulls render as `None`, strings verbatim, everything else as JSON.
#[must_use]
pub fn render_value(value: &FeatureValue) -> String {
    match value {
        Value::Null => "None".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Result record produced by one feature instance when it is read out.
///
/// Carries every output column of the instance, in declaration order,
/// plus the provenance needed by output writers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeatureData {
    /// Instance name (after per-count prefixing), or the column name for
    /// a record produced by `split_columns`.
    pub name: String,

    /// Catalog type the instance was built from.
    pub feature_type: String,

    /// Count index, `None` for aggregates.
    pub count_index: Option<u32>,

    /// Mode of the registry that produced the record.
    pub mode: ExtractionMode,

    /// Column names, same length and order as `values`.
    pub columns: Vec<String>,

    /// Column values.
    pub values: Vec<FeatureValue>,

    /// Player context (`None` means all players).
    pub player_id: Option<String>,

    /// Session context (`None` means all sessions).
    pub session_id: Option<String>,

    /// Version of the feature computation.
    pub feature_version: u32,

    /// Version of this crate.
    pub engine_version: String,

    /// Client version seen on the latest accepted event.
    pub app_version: Option<String>,

    /// Client branch seen on the latest accepted event.
    pub app_branch: Option<String>,

    /// Session of the latest accepted event.
    pub last_session: Option<String>,

    /// Sequence index of the latest accepted event.
    pub last_index: Option<u64>,

    /// Timestamp of the latest accepted event.
    pub last_timestamp: Option<DateTime<Utc>>,

    /// Timestamp of the first event delivered to the instance.
    pub start_timestamp: Option<DateTime<Utc>>,
}

impl FeatureData {
    /// Iterate `(column, value)` pairs.
    pub fn column_pairs(&self) -> impl Iterator<Item = (&str, &FeatureValue)> {
        self.columns.iter().map(String::as_str).zip(self.values.iter())
    }

    /// The first (base) column value, or null.
    #[must_use]
    pub fn value(&self) -> &FeatureValue {
        self.values.first().unwrap_or(&Value::Null)
    }

    /// One single-column record per column, each named after its column.
    ///
    /// Second-order features subscribe to column names, so a subfeature
    /// such as `SessionDuration-EventCount` travels as its own record.
    pub fn split_columns(&self) -> impl Iterator<Item = FeatureData> + '_ {
        self.column_pairs().map(move |(column, value)| FeatureData {
            name: column.to_string(),
            columns: vec![column.to_string()],
            values: vec![value.clone()],
            ..self.clone()
        })
    }

    /// Value of a named column.
    #[must_use]
    pub fn column(&self, column: &str) -> Option<&FeatureValue> {
        self.column_pairs()
            .find(|(name, _)| *name == column)
            .map(|(_, value)| value)
    }
}

impl std::fmt::Display for FeatureData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let values: Vec<String> = self.values.iter().map(render_value).collect();
        write!(
            f,
            "Name: {}\tCount index: {}\nValues: [{}]\nMode: {}\tPlayer: {}\tSession: {}",
            self.name,
            self.count_index.map_or_else(|| "*".to_string(), |i| i.to_string()),
            values.join(", "),
            self.mode,
            self.player_id.as_deref().unwrap_or("*"),
            self.session_id.as_deref().unwrap_or("*"),
        )
    }
}
