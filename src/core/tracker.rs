use std::io;
use std::path::{Path, PathBuf};

use super::log_io;
use super::pipeline::{Pipeline, PipelineReport};

/// A captured tribe-log file being followed; every poll forms one batch.
pub struct TrackedChatlog {
    tailer: log_io::LogTailer,
    pipeline: Pipeline,
    path: PathBuf,
}

impl TrackedChatlog {
    pub fn new(path: impl AsRef<Path>, pipeline: Pipeline) -> io::Result<Self> {
        let pathbuf = path.as_ref().to_path_buf();
        let tailer = log_io::LogTailer::open(&pathbuf)?;
        Ok(Self {
            tailer,
            pipeline,
            path: pathbuf,
        })
    }

    /// Read lines appended since the last poll and run them through the pipeline.
    /// Returns `None` when nothing new was written.
    pub fn read_new_batch(&mut self) -> io::Result<Option<PipelineReport>> {
        let lines = self.tailer.read_new_lines()?;
        if lines.is_empty() {
            return Ok(None);
        }
        Ok(Some(self.pipeline.process_lines(&lines)))
    }

    /// Rewind to the start of the file (for full replay).
    pub fn rewind(&mut self) -> io::Result<()> {
        self.tailer.rewind()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
