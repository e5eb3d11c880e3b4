//! Delivery side of the pipeline.
//!
//! Rendering alerts into chat messages happens elsewhere; a sink only has to accept
//! `AlertEvent` records and say whether they got through.

use std::io::Write;

use log::{info, warn};

use super::model::AlertEvent;

/// Outcome of one delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub delivered: bool,
    pub reason: Option<String>,
}

impl Delivery {
    pub fn ok() -> Self {
        Self {
            delivered: true,
            reason: None,
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            delivered: false,
            reason: Some(reason.into()),
        }
    }

    /// Nothing to deliver
    pub fn skipped() -> Self {
        Self {
            delivered: false,
            reason: Some("no alerts to deliver".to_string()),
        }
    }
}

/// Receiver of resolved alerts. Delivery is best effort.
pub trait AlertSink {
    fn deliver(&mut self, alerts: &[AlertEvent]) -> Delivery;
}

/// Writes each alert as one JSON object per line.
pub struct JsonLinesSink<W: Write> {
    writer: W,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_all(&mut self, alerts: &[AlertEvent]) -> std::io::Result<()> {
        for alert in alerts {
            serde_json::to_writer(&mut self.writer, alert)?;
            self.writer.write_all(b"\n")?;
        }
        self.writer.flush()
    }
}

impl<W: Write> AlertSink for JsonLinesSink<W> {
    fn deliver(&mut self, alerts: &[AlertEvent]) -> Delivery {
        if alerts.is_empty() {
            return Delivery::skipped();
        }

        match self.write_all(alerts) {
            Ok(()) => {
                info!("Delivered {} alerts", alerts.len());
                Delivery::ok()
            }
            Err(e) => {
                warn!("Error writing alerts: {}", e);
                Delivery::failed(e.to_string())
            }
        }
    }
}

/// Keeps delivered alerts in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub alerts: Vec<AlertEvent>,
}

impl AlertSink for MemorySink {
    fn deliver(&mut self, alerts: &[AlertEvent]) -> Delivery {
        if alerts.is_empty() {
            return Delivery::skipped();
        }
        self.alerts.extend_from_slice(alerts);
        Delivery::ok()
    }
}
