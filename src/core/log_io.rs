use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// Incremental reader over a growing chat-log capture file.
pub struct LogTailer {
    file: File,
    position: u64,
    path: PathBuf,
}

impl LogTailer {
    /// Open `path` positioned at its current end; only lines written later are read.
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path_ref = path.as_ref();
        let file = File::open(path_ref)?;
        let metadata = file.metadata()?;
        let position = metadata.len();
        Ok(Self {
            file,
            position,
            path: path_ref.to_path_buf(),
        })
    }

    /// Read complete lines appended since the last call.
    ///
    /// A trailing line without a newline is left for the next poll so a
    /// half-written line is never split in two.
    pub fn read_new_lines(&mut self) -> io::Result<Vec<String>> {
        let mut lines = Vec::new();

        // File was truncated or replaced; start over
        if self.file.metadata()?.len() < self.position {
            self.position = 0;
        }

        self.file.seek(SeekFrom::Start(self.position))?;
        let mut reader = BufReader::new(&self.file);
        let mut buffer = Vec::new();

        loop {
            buffer.clear();
            let bytes_read = reader.read_until(b'\n', &mut buffer)?;
            if bytes_read == 0 || buffer.last() != Some(&b'\n') {
                break;
            }
            self.position += bytes_read as u64;
            // Invalid UTF-8 is replaced; the position always moves past the line
            let line = String::from_utf8_lossy(&buffer);
            lines.push(line.trim_end_matches(&['\r', '\n'][..]).to_string());
        }

        Ok(lines)
    }

    pub fn rewind(&mut self) -> io::Result<()> {
        self.position = 0;
        self.file.seek(SeekFrom::Start(0))?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Read a whole batch from any reader (stdin, a file).
///
/// Bytes that are not valid UTF-8 are replaced rather than failing the whole batch.
pub fn read_batch(reader: impl Read) -> io::Result<String> {
    let mut content = Vec::new();
    BufReader::new(reader).read_to_end(&mut content)?;
    Ok(String::from_utf8_lossy(&content).into_owned())
}

pub fn read_batch_file(path: impl AsRef<Path>) -> io::Result<String> {
    read_batch(File::open(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::OpenOptions;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_tailer_reads_only_new_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tribelog.txt");
        let mut file = File::create(&path).unwrap();
        writeln!(file, "[01-01 00:00:00][Map] already there").unwrap();

        let mut tailer = LogTailer::open(&path).unwrap();
        assert!(tailer.read_new_lines().unwrap().is_empty());

        writeln!(file, "[01-01 00:00:01][Map] first").unwrap();
        write!(file, "[01-01 00:00:02][Map] second\r\n").unwrap();
        file.sync_all().unwrap();

        let lines = tailer.read_new_lines().unwrap();
        assert_eq!(
            lines,
            vec!["[01-01 00:00:01][Map] first", "[01-01 00:00:02][Map] second"]
        );
        assert!(tailer.read_new_lines().unwrap().is_empty());
    }

    #[test]
    fn test_tailer_waits_for_complete_line() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tribelog.txt");
        let mut file = File::create(&path).unwrap();
        let mut tailer = LogTailer::open(&path).unwrap();

        write!(file, "[01-01 00:00:01][Map] par").unwrap();
        file.sync_all().unwrap();
        assert!(tailer.read_new_lines().unwrap().is_empty());

        writeln!(file, "tial").unwrap();
        file.sync_all().unwrap();
        assert_eq!(tailer.read_new_lines().unwrap(), vec!["[01-01 00:00:01][Map] partial"]);
    }

    #[test]
    fn test_tailer_rewind_and_truncate() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tribelog.txt");
        let mut file = File::create(&path).unwrap();
        writeln!(file, "one").unwrap();
        writeln!(file, "two").unwrap();
        file.sync_all().unwrap();

        let mut tailer = LogTailer::open(&path).unwrap();
        tailer.rewind().unwrap();
        assert_eq!(tailer.read_new_lines().unwrap(), vec!["one", "two"]);

        // Truncate and write a shorter file
        let mut file = OpenOptions::new().write(true).truncate(true).open(&path).unwrap();
        writeln!(file, "x").unwrap();
        file.sync_all().unwrap();
        assert_eq!(tailer.read_new_lines().unwrap(), vec!["x"]);
        assert_eq!(tailer.path(), path.as_path());
    }

    #[test]
    fn test_read_batch_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("batch.txt");
        std::fs::write(&path, "a\nb\n").unwrap();
        assert_eq!(read_batch_file(&path).unwrap(), "a\nb\n");
        assert_eq!(read_batch("c".as_bytes()).unwrap(), "c");
    }

    #[test]
    fn test_read_batch_keeps_lines_around_invalid_utf8() {
        let raw: &[u8] = b"[01-01 00:00:00][Map] good\n[01-01 00:00:01][Map] bad \xff\xfe\n[01-01 00:00:02][Map] also good\n";
        let content = read_batch(raw).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "[01-01 00:00:00][Map] good");
        assert!(lines[1].contains('\u{FFFD}'));
        assert_eq!(lines[2], "[01-01 00:00:02][Map] also good");
    }

    #[test]
    fn test_tailer_survives_invalid_utf8() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tribelog.txt");
        let mut file = File::create(&path).unwrap();
        let mut tailer = LogTailer::open(&path).unwrap();

        file.write_all(b"[01-01 00:00:01][Map] before\n").unwrap();
        file.write_all(b"[01-01 00:00:02][Map] broken \xff\xfe\n").unwrap();
        file.write_all(b"[01-01 00:00:03][Map] after\n").unwrap();
        file.sync_all().unwrap();

        let lines = tailer.read_new_lines().unwrap();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "[01-01 00:00:01][Map] before");
        assert!(lines[1].starts_with("[01-01 00:00:02][Map] broken "));
        assert_eq!(lines[2], "[01-01 00:00:03][Map] after");

        // Position moved past the bad bytes; later writes still come through
        assert!(tailer.read_new_lines().unwrap().is_empty());
        writeln!(file, "[01-01 00:00:04][Map] later").unwrap();
        file.sync_all().unwrap();
        assert_eq!(tailer.read_new_lines().unwrap(), vec!["[01-01 00:00:04][Map] later"]);
    }
}
