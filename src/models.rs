//! Domain records shared between the sequencer and the session store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which kind of guided session a record describes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SessionKind {
    Breathing,
    Meditation,
}

impl SessionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionKind::Breathing => "breathing",
            SessionKind::Meditation => "meditation",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "breathing" => Some(SessionKind::Breathing),
            "meditation" => Some(SessionKind::Meditation),
            _ => None,
        }
    }
}

/// Five-point mood check-in captured before and after a session.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Mood {
    Drained,
    Tense,
    Steady,
    Rested,
    Bright,
}

impl Mood {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mood::Drained => "drained",
            Mood::Tense => "tense",
            Mood::Steady => "steady",
            Mood::Rested => "rested",
            Mood::Bright => "bright",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "drained" => Some(Mood::Drained),
            "tense" => Some(Mood::Tense),
            "steady" => Some(Mood::Steady),
            "rested" => Some(Mood::Rested),
            "bright" => Some(Mood::Bright),
            _ => None,
        }
    }
}

/// A completed session as persisted by the store. Cancelled sessions are
/// never recorded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub id: String,
    pub user_id: String,
    pub kind: SessionKind,
    pub exercise_id: String,
    pub started_at: DateTime<Utc>,
    pub duration_seconds: u64,
    pub cycles_completed: u32,
    pub mood_before: Option<Mood>,
    pub mood_after: Option<Mood>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_round_trips_through_storage_tag() {
        for kind in [SessionKind::Breathing, SessionKind::Meditation] {
            assert_eq!(SessionKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(SessionKind::parse("yoga"), None);
    }

    #[test]
    fn mood_round_trips_through_storage_tag() {
        for mood in [
            Mood::Drained,
            Mood::Tense,
            Mood::Steady,
            Mood::Rested,
            Mood::Bright,
        ] {
            assert_eq!(Mood::parse(mood.as_str()), Some(mood));
        }
        assert_eq!(Mood::parse(""), None);
    }
}
