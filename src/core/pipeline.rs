use log::info;

use super::batch::{self, FailedLine};
use super::extract::LineExtractor;
use super::model::{AlertEvent, LogEntry};
use super::resolve::{EventResolver, Resolution, TimestampAdjustment};
use super::sink::{AlertSink, Delivery};

/// Per-outcome counts for entries that did not become alerts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DropCounts {
    pub not_an_event: usize,
    pub unresolved: usize,
    pub suppressed: usize,
    /// Alerts emitted with their original timestamp because the offset could not be applied
    pub timestamp_adjust_failed: usize,
}

/// Result of one pipeline pass over a batch.
#[derive(Debug, Clone, Default)]
pub struct PipelineReport {
    pub entries_parsed: usize,
    pub failed_lines: Vec<FailedLine>,
    pub alerts: Vec<AlertEvent>,
    pub drops: DropCounts,
}

impl PipelineReport {
    pub fn lines_failed(&self) -> usize {
        self.failed_lines.len()
    }
}

/// Pipeline output together with the outcome of handing it to a sink.
#[derive(Debug, Clone)]
pub struct Forwarded {
    pub report: PipelineReport,
    pub delivery: Delivery,
}

/// Extractor plus resolver. Immutable once built; safe to share across threads.
#[derive(Debug, Clone)]
pub struct Pipeline {
    extractor: LineExtractor,
    resolver: EventResolver,
}

impl Pipeline {
    pub fn new(extractor: LineExtractor, resolver: EventResolver) -> Self {
        Self {
            extractor,
            resolver,
        }
    }

    pub fn extractor(&self) -> &LineExtractor {
        &self.extractor
    }

    /// Run a raw text batch through extraction and resolution.
    pub fn process_batch(&self, content: &str) -> PipelineReport {
        let outcome = batch::split_batch(&self.extractor, content);
        let mut report = self.process_entries(&outcome.entries);
        report.failed_lines = outcome.failed;
        report
    }

    /// Run raw lines (already split) through extraction and resolution.
    pub fn process_lines<S: AsRef<str>>(&self, lines: &[S]) -> PipelineReport {
        let outcome = batch::extract_lines(&self.extractor, lines);
        let mut report = self.process_entries(&outcome.entries);
        report.failed_lines = outcome.failed;
        report
    }

    /// Resolve already-extracted entries.
    pub fn process_entries(&self, entries: &[LogEntry]) -> PipelineReport {
        let mut report = PipelineReport {
            entries_parsed: entries.len(),
            ..PipelineReport::default()
        };

        for entry in entries {
            match self.resolver.resolve_detailed(entry) {
                Resolution::Alert { event, adjustment } => {
                    if adjustment == TimestampAdjustment::Failed {
                        report.drops.timestamp_adjust_failed += 1;
                    }
                    info!(
                        "Processed alert: {} by {} ({}) on {}",
                        event.event_type.as_str(),
                        event.perpetrator,
                        event.perpetrator_tribe,
                        event.map
                    );
                    report.alerts.push(event);
                }
                Resolution::NotAnEvent => report.drops.not_an_event += 1,
                Resolution::Unresolved(_) => report.drops.unresolved += 1,
                Resolution::SuppressedByFilter { .. } => report.drops.suppressed += 1,
            }
        }

        report
    }

    /// Process a batch and hand the alerts to `sink`. The report survives a failed delivery.
    pub fn forward(&self, content: &str, sink: &mut dyn AlertSink) -> Forwarded {
        let report = self.process_batch(content);
        let delivery = if report.alerts.is_empty() {
            Delivery::skipped()
        } else {
            sink.deliver(&report.alerts)
        };
        Forwarded { report, delivery }
    }
}
