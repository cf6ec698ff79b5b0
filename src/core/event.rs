//! Logged gameplay events.
//!
//! An `Event` is one action recorded by a game client. The core routes
//! events purely by `event_name`; the payload maps are opaque to it and
//! only interpreted by individual extractors.
//!
//! Payloads use persistent maps so that detectors can copy context into
//! synthetic events, and processors can queue events, without deep copies.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use log::error;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Open key/value payload carried by an event.
pub type Payload = im::OrdMap<String, Value>;

/// Where an event came from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventSource {
    /// Logged by the game client.
    #[default]
    Game,
    /// Synthesized by a detector during extraction.
    Generated,
}

/// A single logged gameplay event.
///
/// Events are immutable once built. Processors expect them in
/// non-decreasing `(timestamp, event_sequence_index)` order per session
/// and never re-sort.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Game that produced the event.
    pub app_id: String,

    /// Session the event belongs to.
    pub session_id: String,

    /// Player, when known.
    pub user_id: Option<String>,

    /// Build of the game client.
    pub app_version: Option<String>,

    /// Branch of the game client.
    pub app_branch: Option<String>,

    /// Logging schema version (dotted, e.g. `"3.1"`).
    pub log_version: Option<String>,

    /// When the event happened.
    pub timestamp: DateTime<Utc>,

    /// Per-session ordinal, tiebreak for identical timestamps.
    pub event_sequence_index: Option<u64>,

    /// Routing key.
    pub event_name: String,

    /// Logged or synthesized.
    pub event_source: EventSource,

    /// Event-specific payload.
    pub event_data: Payload,

    /// Context of the game at event time.
    pub game_state: Payload,

    /// Player-level data attached by the client.
    pub user_data: Payload,
}

impl Event {
    /// Create an event with empty payloads.
    pub fn new(
        session_id: impl Into<String>,
        event_name: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            app_id: String::new(),
            session_id: session_id.into(),
            user_id: None,
            app_version: None,
            app_branch: None,
            log_version: None,
            timestamp,
            event_sequence_index: None,
            event_name: event_name.into(),
            event_source: EventSource::Game,
            event_data: Payload::new(),
            game_state: Payload::new(),
            user_data: Payload::new(),
        }
    }

    /// Set the app id (builder pattern).
    #[must_use]
    pub fn with_app(mut self, app_id: impl Into<String>) -> Self {
        self.app_id = app_id.into();
        self
    }

    /// Set the player (builder pattern).
    #[must_use]
    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Set the client version and branch (builder pattern).
    #[must_use]
    pub fn with_app_version(mut self, version: impl Into<String>, branch: Option<String>) -> Self {
        self.app_version = Some(version.into());
        self.app_branch = branch;
        self
    }

    /// Set the logging version (builder pattern).
    #[must_use]
    pub fn with_log_version(mut self, version: impl Into<String>) -> Self {
        self.log_version = Some(version.into());
        self
    }

    /// Set the sequence index (builder pattern).
    #[must_use]
    pub fn with_index(mut self, index: u64) -> Self {
        self.event_sequence_index = Some(index);
        self
    }

    /// Mark the event as detector output (builder pattern).
    #[must_use]
    pub fn generated(mut self) -> Self {
        self.event_source = EventSource::Generated;
        self
    }

    /// Add an event data field (builder pattern).
    #[must_use]
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.event_data.insert(key.into(), value.into());
        self
    }

    /// Add a game state field (builder pattern).
    #[must_use]
    pub fn with_state(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.game_state.insert(key.into(), value.into());
        self
    }

    /// Build a detector event named `event_name` that carries this event's
    /// session, player, version and game-state context.
    ///
    /// The result is marked [`EventSource::Generated`] and starts with an
    /// empty event data payload.
    #[must_use]
    pub fn synthesize(&self, event_name: impl Into<String>) -> Event {
        Event {
            event_name: event_name.into(),
            event_source: EventSource::Generated,
            event_data: Payload::new(),
            ..self.clone()
        }
    }

    /// Look up an event data field.
    #[must_use]
    pub fn data(&self, key: &str) -> Option<&Value> {
        self.event_data.get(key)
    }

    /// Look up a game state field.
    #[must_use]
    pub fn state(&self, key: &str) -> Option<&Value> {
        self.game_state.get(key)
    }

    /// Look up a field in game state first, then event data.
    #[must_use]
    pub fn context_value(&self, key: &str) -> Option<&Value> {
        self.state(key).or_else(|| self.data(key))
    }

    /// Ordering key used by the delivery contract.
    #[must_use]
    pub fn order_key(&self) -> (DateTime<Utc>, u64) {
        (self.timestamp, self.event_sequence_index.unwrap_or(0))
    }

    /// Three-way compare of dotted version strings.
    ///
    /// Segments compare numerically; when one version is a prefix of the
    /// other, the shorter one is older. A version that does not parse is
    /// logged and sorts after a valid one.
    #[must_use]
    pub fn compare_versions(a: &str, b: &str) -> Ordering {
        match (parse_version(a), parse_version(b)) {
            (Some(a_parts), Some(b_parts)) => a_parts.cmp(&b_parts),
            (None, None) => {
                error!("Got invalid values of {a} & {b} for versions a & b!");
                Ordering::Equal
            }
            (None, Some(_)) => {
                error!("Got invalid value of {a} for version a!");
                Ordering::Greater
            }
            (Some(_), None) => {
                error!("Got invalid value of {b} for version b!");
                Ordering::Less
            }
        }
    }
}

fn parse_version(version: &str) -> Option<Vec<u64>> {
    version
        .split('.')
        .map(|part| part.trim().parse::<u64>().ok())
        .collect()
}
