use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

pub type TribeName = String;
pub type MapName = String;

/// Canonical timestamp representation used by every stage of the pipeline.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One structured tribe log line: `[MM-DD HH:MM:SS][Map] message`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    #[serde(with = "canonical_time")]
    pub timestamp: NaiveDateTime,
    pub map: MapName,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    /// A structure owned by the tribe was destroyed
    StructureDestroyed,
    /// A tribe member was killed
    MemberKilled,
    /// A tamed creature was killed
    CreatureKilled,
}

impl EventType {
    /// Wire label, as consumed by the notification side
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StructureDestroyed => "STRUCTURE_DESTROYED",
            Self::MemberKilled => "MEMBER_KILLED",
            Self::CreatureKilled => "CREATURE_KILLED",
        }
    }
}

/// Classified and disambiguated alert, built from exactly one `LogEntry`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertEvent {
    pub event_type: EventType,
    #[serde(with = "canonical_time")]
    pub timestamp: NaiveDateTime,
    pub map: MapName,
    /// Structure name, member name or creature (with type in parentheses)
    pub victim: String,
    pub perpetrator: String,
    pub perpetrator_tribe: TribeName,
}

mod canonical_time {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    use super::TIMESTAMP_FORMAT;

    pub fn serialize<S>(timestamp: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&timestamp.format(TIMESTAMP_FORMAT).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(raw.trim(), TIMESTAMP_FORMAT).map_err(serde::de::Error::custom)
    }
}
