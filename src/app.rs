use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use tracing_subscriber::filter::EnvFilter;

use crate::core::{
    config::{ConfigManager, Settings},
    extract::LineExtractor,
    log_io,
    pipeline::{Pipeline, PipelineReport},
    resolve::EventResolver,
    sink::{AlertSink, JsonLinesSink},
    tracker::TrackedChatlog,
};

const USAGE: &str = "Usage: tribe-watcher [--config <dir>] [--ignored-tribe <name>] \
[--offset-hours <n>] [--year <yyyy>] [--input <file> | --follow <file>]";

/// Command line options; anything given here overrides settings.json.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliOptions {
    pub config_dir: Option<PathBuf>,
    pub ignored_tribe: Option<String>,
    pub offset_hours: Option<i32>,
    pub year: Option<i32>,
    pub input: Option<PathBuf>,
    pub follow: Option<PathBuf>,
}

impl CliOptions {
    pub fn parse(args: impl IntoIterator<Item = String>) -> Result<Self, String> {
        let mut options = Self::default();
        let mut args = args.into_iter();

        while let Some(flag) = args.next() {
            let mut value = || args.next().ok_or_else(|| format!("{flag} needs a value"));
            match flag.as_str() {
                "--config" => options.config_dir = Some(PathBuf::from(value()?)),
                "--ignored-tribe" => options.ignored_tribe = Some(value()?),
                "--offset-hours" => {
                    let raw = value()?;
                    options.offset_hours =
                        Some(raw.parse().map_err(|_| format!("invalid offset: {raw}"))?);
                }
                "--year" => {
                    let raw = value()?;
                    options.year = Some(raw.parse().map_err(|_| format!("invalid year: {raw}"))?);
                }
                "--input" => options.input = Some(PathBuf::from(value()?)),
                "--follow" => options.follow = Some(PathBuf::from(value()?)),
                other => return Err(format!("unknown argument: {other}")),
            }
        }

        if options.input.is_some() && options.follow.is_some() {
            return Err("--input and --follow are mutually exclusive".to_string());
        }
        Ok(options)
    }

    /// Apply command line overrides on top of persisted settings.
    pub fn apply(&self, mut settings: Settings) -> Settings {
        if let Some(tribe) = &self.ignored_tribe {
            settings.ignored_tribe = Some(tribe.clone());
        }
        if let Some(offset) = self.offset_hours {
            settings.timestamp_offset_hours = offset;
        }
        if let Some(year) = self.year {
            settings.assumed_year = Some(year);
        }
        settings
    }
}

/// Initialize logging to stderr; stdout carries the alerts.
fn init_logging() {
    let filter = EnvFilter::builder()
        .with_default_directive(tracing::Level::INFO.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(io::stderr)
        .init();
}

pub fn build_pipeline(settings: &Settings) -> Pipeline {
    let extractor = match settings.assumed_year {
        Some(year) => LineExtractor::new(year),
        None => LineExtractor::current_year(),
    };
    Pipeline::new(extractor, EventResolver::new(settings.resolver_config()))
}

fn log_report(report: &PipelineReport) {
    log::info!(
        "Batch done: {} entries, {} failed lines, {} alerts ({} not events, {} unresolved, {} ignored)",
        report.entries_parsed,
        report.lines_failed(),
        report.alerts.len(),
        report.drops.not_an_event,
        report.drops.unresolved,
        report.drops.suppressed
    );
    if report.drops.timestamp_adjust_failed > 0 {
        log::warn!(
            "{} alerts kept their original timestamp",
            report.drops.timestamp_adjust_failed
        );
    }
}

fn run_once(pipeline: &Pipeline, input: Option<&PathBuf>) -> io::Result<ExitCode> {
    let content = match input {
        Some(path) => log_io::read_batch_file(path)?,
        None => log_io::read_batch(io::stdin())?,
    };

    let mut sink = JsonLinesSink::new(io::stdout());
    let forwarded = pipeline.forward(&content, &mut sink);
    log_report(&forwarded.report);

    if !forwarded.report.alerts.is_empty() && !forwarded.delivery.delivered {
        log::error!(
            "Alert delivery failed: {}",
            forwarded.delivery.reason.unwrap_or_default()
        );
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

async fn follow(mut tracker: TrackedChatlog, poll_interval: Duration, sink: &mut dyn AlertSink) {
    log::info!("Following {:?}", tracker.path());
    let mut interval = tokio::time::interval(poll_interval);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                log::info!("Shutting down");
                break;
            }
            _ = interval.tick() => {
                match tracker.read_new_batch() {
                    Ok(Some(report)) => {
                        log_report(&report);
                        if !report.alerts.is_empty() {
                            let delivery = sink.deliver(&report.alerts);
                            if !delivery.delivered {
                                // Best effort; the next batch still goes out
                                log::warn!(
                                    "Dropped {} alerts: {}",
                                    report.alerts.len(),
                                    delivery.reason.unwrap_or_default()
                                );
                            }
                        }
                    }
                    Ok(None) => {}
                    Err(e) => log::warn!("Error reading {:?}: {}", tracker.path(), e),
                }
            }
        }
    }
}

fn run_follow(pipeline: Pipeline, path: &Path, poll_interval: Duration) -> io::Result<ExitCode> {
    let tracker = TrackedChatlog::new(path, pipeline)?;
    let runtime = tokio::runtime::Runtime::new()?;
    let mut sink = JsonLinesSink::new(io::stdout());
    runtime.block_on(follow(tracker, poll_interval, &mut sink));
    Ok(ExitCode::SUCCESS)
}

pub fn run() -> ExitCode {
    init_logging();

    let options = match CliOptions::parse(std::env::args().skip(1)) {
        Ok(options) => options,
        Err(e) => {
            log::error!("{e}");
            log::error!("{USAGE}");
            return ExitCode::from(2);
        }
    };

    let config_dir = options.config_dir.clone().unwrap_or_else(|| PathBuf::from("."));
    let config_manager = ConfigManager::new(config_dir);
    let settings = options.apply(config_manager.load());
    let pipeline = build_pipeline(&settings);
    log::info!(
        "Assuming year {}, ignored tribe: {:?}, offset {}h",
        pipeline.extractor().assumed_year(),
        settings.ignored_tribe,
        settings.timestamp_offset_hours
    );

    let result = match &options.follow {
        Some(path) => run_follow(
            pipeline,
            path,
            Duration::from_millis(settings.poll_interval_ms.max(10)),
        ),
        None => run_once(&pipeline, options.input.as_ref()),
    };

    result.unwrap_or_else(|e| {
        log::error!("{e}");
        ExitCode::FAILURE
    })
}
