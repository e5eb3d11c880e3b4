//! Event resolution: classifies a `LogEntry` and disambiguates who did what to whom.

use std::fmt;

use chrono::{Duration, NaiveDateTime};
use lazy_static::lazy_static;
use log::{debug, info, warn};
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::grammar::{self, GroupShape};
use super::model::{AlertEvent, EventType, LogEntry};

const DESTROYED_MARKER: &str = "destroyed your";
const KILLED_MARKER: &str = "was killed by";
const MEMBER_MARKER: &str = "Tribemember";
const OWNED_MARKER: &str = "Your";
const NAME_DELIMITER: &str = " - ";

lazy_static! {
    static ref LEVEL_REGEX: Regex = Regex::new(r" - Lvl \d+").expect("Invalid level regex");
}

/// Resolver configuration, fixed for the lifetime of the resolver.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Events caused by this tribe are suppressed (case-insensitive)
    #[serde(default)]
    pub ignored_tribe: Option<String>,
    /// Clock correction applied to every emitted timestamp
    #[serde(default)]
    pub timestamp_offset_hours: i32,
}

/// Why a candidate event could not be turned into an alert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnresolvedActor {
    /// Killer phrase has no `" - "` separating name and level annotation
    MissingDelimiter { phrase: String },
    /// Annotation after the level did not have one or two groups
    GroupCount { phrase: String, shape: String },
    EmptyName { phrase: String },
    EmptyTribe { phrase: String },
    EmptyVictim { phrase: String },
    /// `destroyed your` without a quoted structure name
    MissingStructure,
    /// Markers present but the victim/killer spans could not be cut out
    MissingSpan { event_type: EventType },
}

impl fmt::Display for UnresolvedActor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingDelimiter { phrase } => {
                write!(f, "no name/level delimiter in killer text: {phrase}")
            }
            Self::GroupCount { phrase, shape } => {
                write!(f, "unexpected format in killer text ({shape}): {phrase}")
            }
            Self::EmptyName { phrase } => write!(f, "empty killer name: {phrase}"),
            Self::EmptyTribe { phrase } => write!(f, "empty tribe name: {phrase}"),
            Self::EmptyVictim { phrase } => write!(f, "empty victim: {phrase}"),
            Self::MissingStructure => write!(f, "no quoted structure name"),
            Self::MissingSpan { event_type } => {
                write!(f, "could not cut victim/killer out of {} message", event_type.as_str())
            }
        }
    }
}

/// Outcome of the timestamp correction step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampAdjustment {
    /// No offset configured
    Unchanged,
    Applied,
    /// Offset would leave the representable range; original timestamp kept
    Failed,
}

/// Full outcome of resolving one entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Alert {
        event: AlertEvent,
        adjustment: TimestampAdjustment,
    },
    /// Message is not one of the recognized event shapes
    NotAnEvent,
    Unresolved(UnresolvedActor),
    SuppressedByFilter { tribe: String },
}

impl Resolution {
    pub fn into_alert(self) -> Option<AlertEvent> {
        match self {
            Self::Alert { event, .. } => Some(event),
            _ => None,
        }
    }
}

/// Resolved attacker identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Perpetrator {
    pub name: String,
    pub tribe: String,
}

/// Resolve a killer phrase such as `PlayerOne - Lvl 100 (Rex)(TribeName)`.
pub fn resolve_killer(phrase: &str) -> Result<Perpetrator, UnresolvedActor> {
    let segments: Vec<&str> = phrase.split(NAME_DELIMITER).collect();
    let (first, after_level) = match segments.as_slice() {
        [first, .., last] => (*first, *last),
        _ => {
            return Err(UnresolvedActor::MissingDelimiter {
                phrase: phrase.to_string(),
            })
        }
    };

    let name = strip_quotes(first);
    if name.is_empty() {
        return Err(UnresolvedActor::EmptyName {
            phrase: phrase.to_string(),
        });
    }

    let (name, tribe) = match GroupShape::classify(after_level) {
        GroupShape::TribeOnly { tribe } => (name.to_string(), tribe),
        GroupShape::CreatureAndTribe { creature, tribe } => (format!("{name} ({creature})"), tribe),
        other => {
            return Err(UnresolvedActor::GroupCount {
                phrase: phrase.to_string(),
                shape: other.describe(),
            })
        }
    };

    if tribe.is_empty() {
        return Err(UnresolvedActor::EmptyTribe {
            phrase: phrase.to_string(),
        });
    }

    Ok(Perpetrator {
        name,
        tribe: tribe.to_string(),
    })
}

/// Normalize a victim phrase: drop level annotations and quotes, keep creature type.
pub fn resolve_victim(phrase: &str) -> String {
    let victim = LEVEL_REGEX.replace_all(phrase, "");

    let tokens = grammar::tokenize(&victim);
    let creature = grammar::groups(&tokens)
        .into_iter()
        .find(|group| !group.is_empty());
    if let Some(creature) = creature {
        let base = victim.split('(').next().unwrap_or_default();
        return format!("{} ({creature})", strip_quotes(base));
    }

    if let Some(member) = victim.trim_start().strip_prefix("Tribemember ") {
        return member
            .split(NAME_DELIMITER)
            .next()
            .unwrap_or_default()
            .trim()
            .to_string();
    }

    strip_quotes(&victim).to_string()
}

fn strip_quotes(text: &str) -> &str {
    text.trim().trim_matches('\'').trim()
}

/// Text strictly between `start` and the first following `end`.
fn between<'a>(text: &'a str, start: &str, end: &str) -> Option<&'a str> {
    let from = text.find(start)? + start.len();
    let len = text[from..].find(end)?;
    Some(&text[from..from + len])
}

/// Killer phrase: after `was killed by ` up to the closing `!`.
fn killer_span(message: &str) -> Option<&str> {
    between(message, "was killed by ", "!")
}

/// Structure name quoted directly after the marker: ` 'Metal Wall'`.
fn structure_name(after_marker: &str) -> Option<&str> {
    let rest = after_marker.strip_prefix(" '")?;
    let span = &rest[..rest.find('\'')?];
    (!span.is_empty()).then_some(span)
}

/// Event candidate cut out of a message, before actor resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Candidate<'a> {
    event_type: EventType,
    killer: &'a str,
    victim: String,
}

/// Classify a message. First match wins: structure, member, creature.
fn classify(message: &str) -> Option<Result<Candidate<'_>, UnresolvedActor>> {
    if let Some(idx) = message.find(DESTROYED_MARKER) {
        let killer = message[..idx].trim();
        let candidate = structure_name(&message[idx + DESTROYED_MARKER.len()..])
            .map(|structure| Candidate {
                event_type: EventType::StructureDestroyed,
                killer,
                victim: structure.to_string(),
            })
            .ok_or(UnresolvedActor::MissingStructure);
        return Some(candidate);
    }

    if !message.contains(KILLED_MARKER) {
        return None;
    }

    let (event_type, victim_start) = if message.contains(MEMBER_MARKER) {
        (EventType::MemberKilled, "Tribemember ")
    } else if message.contains(OWNED_MARKER) {
        (EventType::CreatureKilled, "Your ")
    } else {
        return None;
    };

    let spans = between(message, victim_start, " was killed by")
        .zip(killer_span(message));
    let candidate = match spans {
        Some((victim, killer)) => {
            let victim = resolve_victim(victim);
            if victim.is_empty() {
                Err(UnresolvedActor::EmptyVictim {
                    phrase: message.to_string(),
                })
            } else {
                Ok(Candidate {
                    event_type,
                    killer,
                    victim,
                })
            }
        }
        None => Err(UnresolvedActor::MissingSpan { event_type }),
    };
    Some(candidate)
}

/// Turns log entries into alerts according to a fixed `ResolverConfig`.
#[derive(Debug, Clone)]
pub struct EventResolver {
    ignored_tribe: Option<String>,
    offset: Duration,
}

impl EventResolver {
    pub fn new(config: ResolverConfig) -> Self {
        let ignored_tribe = config
            .ignored_tribe
            .map(|tribe| tribe.trim().to_lowercase())
            .filter(|tribe| !tribe.is_empty());

        Self {
            ignored_tribe,
            offset: Duration::hours(i64::from(config.timestamp_offset_hours)),
        }
    }

    /// Whether events by `tribe` are suppressed.
    pub fn is_ignored(&self, tribe: &str) -> bool {
        self.ignored_tribe
            .as_deref()
            .is_some_and(|ignored| !tribe.is_empty() && tribe.to_lowercase() == ignored)
    }

    /// Resolve an entry into an alert, if it is one.
    pub fn resolve(&self, entry: &LogEntry) -> Option<AlertEvent> {
        self.resolve_detailed(entry).into_alert()
    }

    /// Resolve an entry, reporting why no alert was produced.
    pub fn resolve_detailed(&self, entry: &LogEntry) -> Resolution {
        let candidate = match classify(&entry.message) {
            None => {
                debug!("Not an alert event: {}", entry.message);
                return Resolution::NotAnEvent;
            }
            Some(Err(reason)) => {
                warn!("Dropping log line ({reason}): {}", entry.message);
                return Resolution::Unresolved(reason);
            }
            Some(Ok(candidate)) => candidate,
        };

        let perpetrator = match resolve_killer(candidate.killer) {
            Ok(perpetrator) => perpetrator,
            Err(reason) => {
                warn!("Dropping log line ({reason}): {}", entry.message);
                return Resolution::Unresolved(reason);
            }
        };

        if self.is_ignored(&perpetrator.tribe) {
            info!("Ignoring log from ignored tribe: {}", perpetrator.tribe);
            return Resolution::SuppressedByFilter {
                tribe: perpetrator.tribe,
            };
        }

        let (timestamp, adjustment) = self.adjust_timestamp(entry.timestamp);

        Resolution::Alert {
            event: AlertEvent {
                event_type: candidate.event_type,
                timestamp,
                map: entry.map.clone(),
                victim: candidate.victim,
                perpetrator: perpetrator.name,
                perpetrator_tribe: perpetrator.tribe,
            },
            adjustment,
        }
    }

    fn adjust_timestamp(&self, timestamp: NaiveDateTime) -> (NaiveDateTime, TimestampAdjustment) {
        if self.offset == Duration::zero() {
            return (timestamp, TimestampAdjustment::Unchanged);
        }

        match timestamp.checked_add_signed(self.offset) {
            Some(adjusted) => (adjusted, TimestampAdjustment::Applied),
            None => {
                warn!(
                    "Could not apply {}h offset to {}, keeping original timestamp",
                    self.offset.num_hours(),
                    timestamp
                );
                (timestamp, TimestampAdjustment::Failed)
            }
        }
    }
}
