//! Batch splitting: raw chat message body in, extracted entries and rejected lines out.

use log::{info, warn};

use super::extract::{LineExtractor, MalformedLine};
use super::model::LogEntry;

/// A raw line the extractor rejected, kept for reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedLine {
    pub line: String,
    pub reason: MalformedLine,
}

#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    pub entries: Vec<LogEntry>,
    pub failed: Vec<FailedLine>,
}

impl BatchOutcome {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.failed.is_empty()
    }
}

/// A line that only opens or closes a markdown block: ```` ``` ```` or ```` ```md ````.
fn is_fence_line(line: &str) -> bool {
    line.trim()
        .strip_prefix("```")
        .is_some_and(|tag| tag.chars().all(|c| c.is_ascii_alphanumeric()))
}

/// Remove markdown code fences (```` ``` ```` or ```` ```md ````) that wrap pasted log blocks.
pub fn strip_code_fences(content: &str) -> String {
    content
        .lines()
        .filter(|line| !is_fence_line(line))
        .map(|line| line.replace("```", ""))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Split a raw batch into lines and extract each one independently.
pub fn split_batch(extractor: &LineExtractor, content: &str) -> BatchOutcome {
    let cleaned = strip_code_fences(content);
    extract_lines(extractor, cleaned.lines())
}

/// Extract lines that are already split. Fence-only lines are skipped; every
/// other line reaches the extractor as is.
pub fn extract_lines<I, S>(extractor: &LineExtractor, lines: I) -> BatchOutcome
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut outcome = BatchOutcome::default();

    for line in lines {
        let line = line.as_ref().trim();
        if line.is_empty() || is_fence_line(line) {
            continue;
        }
        match extractor.extract(line) {
            Ok(entry) => outcome.entries.push(entry),
            Err(reason) => outcome.failed.push(FailedLine {
                line: line.to_string(),
                reason,
            }),
        }
    }

    if !outcome.is_empty() {
        info!("Successfully extracted {} log lines", outcome.entries.len());
    }
    if !outcome.failed.is_empty() {
        warn!("Failed to extract {} log lines", outcome.failed.len());
        for failed in &outcome.failed {
            warn!("Failed line ({}): {}", failed.reason, failed.line);
        }
    }

    outcome
}
