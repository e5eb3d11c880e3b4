//! Line extraction for tribe log text.
//!
//! Turns one raw line of the shape `[MM-DD HH:MM:SS][Map] message` into a
//! `LogEntry`. The source lines carry no year, so the extractor is built with
//! the year it should assume.

use std::fmt;

use chrono::{Datelike, Local, NaiveDate};
use lazy_static::lazy_static;
use regex::Regex;

use super::model::LogEntry;

lazy_static! {
    // Pattern: [12-25 9:04:33][TheIsland] Tribemember Bob - Lvl 50 was killed by ...
    static ref LINE_REGEX: Regex = Regex::new(
        r"^\[\s*(\d{1,2})-(\d{1,2})\s+(\d{1,2}):(\d{1,2}):(\d{1,2})\s*\]\[([^\]]*)\](.*)$"
    )
    .expect("Invalid log line regex");
}

/// Why a raw line did not produce a `LogEntry`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MalformedLine {
    /// Line is not `[stamp][map] message`
    Shape,
    /// Bracket shape matched but the stamp is not a real date/time in the assumed year
    InvalidStamp(String),
    MissingMap,
    MissingMessage,
}

impl fmt::Display for MalformedLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shape => write!(f, "line does not match [MM-DD HH:MM:SS][Map] message"),
            Self::InvalidStamp(stamp) => write!(f, "invalid timestamp '{stamp}'"),
            Self::MissingMap => write!(f, "empty map name"),
            Self::MissingMessage => write!(f, "empty message"),
        }
    }
}

/// Extractor for single tribe log lines.
#[derive(Debug, Clone)]
pub struct LineExtractor {
    assumed_year: i32,
}

impl LineExtractor {
    pub fn new(assumed_year: i32) -> Self {
        Self { assumed_year }
    }

    /// Extractor assuming the local calendar year at construction time.
    pub fn current_year() -> Self {
        Self::new(Local::now().year())
    }

    pub fn assumed_year(&self) -> i32 {
        self.assumed_year
    }

    /// Extract a single line.
    pub fn extract(&self, line: &str) -> Result<LogEntry, MalformedLine> {
        // Strip BOM and trim whitespace
        let line = line.trim().trim_start_matches('\u{feff}');
        let caps = LINE_REGEX.captures(line).ok_or(MalformedLine::Shape)?;

        let field = |idx: usize| caps.get(idx).map_or("", |m| m.as_str());
        let number = |idx: usize| field(idx).parse::<u32>().ok();

        let stamp = || {
            format!(
                "{}-{} {}:{}:{}",
                field(1),
                field(2),
                field(3),
                field(4),
                field(5)
            )
        };

        let timestamp = match (number(1), number(2), number(3), number(4), number(5)) {
            (Some(month), Some(day), Some(hour), Some(minute), Some(second)) => {
                NaiveDate::from_ymd_opt(self.assumed_year, month, day)
                    .and_then(|date| date.and_hms_opt(hour, minute, second))
            }
            _ => None,
        }
        .ok_or_else(|| MalformedLine::InvalidStamp(stamp()))?;

        let map = field(6).trim();
        if map.is_empty() {
            return Err(MalformedLine::MissingMap);
        }

        let message = field(7).trim();
        if message.is_empty() {
            return Err(MalformedLine::MissingMessage);
        }

        Ok(LogEntry {
            timestamp,
            map: map.to_string(),
            message: message.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::TIMESTAMP_FORMAT;

    fn stamp(entry: &LogEntry) -> String {
        entry.timestamp.format(TIMESTAMP_FORMAT).to_string()
    }

    #[test]
    fn test_extract_basic_line() {
        let extractor = LineExtractor::new(2024);
        let entry = extractor
            .extract("[03-07 14:05:09][TheIsland] Your Rex - Lvl 150 (Rex) was killed!")
            .expect("Should extract");

        assert_eq!(stamp(&entry), "2024-03-07 14:05:09");
        assert_eq!(entry.map, "TheIsland");
        assert_eq!(entry.message, "Your Rex - Lvl 150 (Rex) was killed!");
    }

    #[test]
    fn test_extract_pads_single_digit_components() {
        let extractor = LineExtractor::new(2024);
        let entry = extractor
            .extract("[3-7 4:5:9][Ragnarok] something happened")
            .expect("Should extract lenient stamp");
        assert_eq!(stamp(&entry), "2024-03-07 04:05:09");
    }

    #[test]
    fn test_extract_trims_map_and_message_once() {
        let extractor = LineExtractor::new(2024);
        let entry = extractor
            .extract("  [12-31 23:59:59][  The Center ]    PlayerOne destroyed your 'Metal Wall'   ")
            .expect("Should extract");
        assert_eq!(entry.map, "The Center");
        assert_eq!(entry.message, "PlayerOne destroyed your 'Metal Wall'");
    }

    #[test]
    fn test_extract_preserves_inner_message_spacing() {
        let extractor = LineExtractor::new(2024);
        let entry = extractor
            .extract("[01-02 03:04:05][Map] Tribemember  Bob  was killed by X - Lvl 1 (T)!")
            .unwrap();
        assert_eq!(entry.message, "Tribemember  Bob  was killed by X - Lvl 1 (T)!");
    }

    #[test]
    fn test_extract_with_bom() {
        let extractor = LineExtractor::new(2024);
        let entry = extractor
            .extract("\u{feff}[01-02 03:04:05][Aberration] message")
            .expect("Should parse with BOM");
        assert_eq!(entry.map, "Aberration");
    }

    #[test]
    fn test_extract_uses_injected_year() {
        let line = "[02-29 10:00:00][Map] leap day";
        assert!(LineExtractor::new(2024).extract(line).is_ok());
        assert_eq!(
            LineExtractor::new(2023).extract(line),
            Err(MalformedLine::InvalidStamp("02-29 10:00:00".to_string()))
        );
    }

    #[test]
    fn test_extract_year_boundary() {
        // A December line processed in January lands in the assumed (new) year.
        let entry = LineExtractor::new(2025)
            .extract("[12-31 23:59:59][Map] late line")
            .unwrap();
        assert_eq!(stamp(&entry), "2025-12-31 23:59:59");
    }

    #[test]
    fn test_extract_rejects_bad_shapes() {
        let extractor = LineExtractor::new(2024);
        for line in [
            "",
            "no brackets at all",
            "[03-07 14:05:09] missing map",
            "[TheIsland][03-07 14:05:09] swapped",
            "[2024-03-07 14:05:09][Map] year present",
            "[03-07 14:05][Map] no seconds",
            "[03/07 14:05:09][Map] wrong separator",
            "prefix [03-07 14:05:09][Map] not leading",
        ] {
            assert_eq!(extractor.extract(line), Err(MalformedLine::Shape), "line: {line}");
        }
    }

    #[test]
    fn test_extract_rejects_impossible_stamps() {
        let extractor = LineExtractor::new(2024);
        for line in [
            "[13-01 10:00:00][Map] month",
            "[02-30 10:00:00][Map] day",
            "[00-10 10:00:00][Map] zero month",
            "[01-10 24:00:00][Map] hour",
            "[01-10 10:60:00][Map] minute",
        ] {
            assert!(
                matches!(extractor.extract(line), Err(MalformedLine::InvalidStamp(_))),
                "line: {line}"
            );
        }
    }

    #[test]
    fn test_extract_rejects_empty_parts() {
        let extractor = LineExtractor::new(2024);
        assert_eq!(
            extractor.extract("[01-10 10:00:00][  ] message"),
            Err(MalformedLine::MissingMap)
        );
        assert_eq!(
            extractor.extract("[01-10 10:00:00][Map]   "),
            Err(MalformedLine::MissingMessage)
        );
    }
}
