// SPDX-License-Identifier: Apache-2.0
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// A size-capped, append-only file writer. When a write would push the
/// file past `max_bytes`, the oldest bytes are truncated (not the whole
/// file dropped) and a marker line records that truncation happened,
/// per §6.5: "oldest bytes truncated, never silently lost without a
/// marker line".
pub struct RotatingFileWriter {
    path: PathBuf,
    max_bytes: u64,
    file: File,
}

impl RotatingFileWriter {
    pub fn open(path: impl Into<PathBuf>, max_bytes: u64) -> io::Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&path)?;
        Ok(Self {
            path,
            max_bytes,
            file,
        })
    }

    fn current_len(&self) -> io::Result<u64> {
        Ok(self.file.metadata()?.len())
    }

    /// Drops the oldest bytes so that appending `incoming_len` more bytes
    /// keeps the file at or under `max_bytes`, inserting a truncation
    /// marker at the new start of file.
    fn truncate_oldest(&mut self, incoming_len: u64) -> io::Result<()> {
        let marker = b"...[log truncated: oldest entries dropped]\n";
        let budget = self.max_bytes.saturating_sub(marker.len() as u64);
        let keep = budget.saturating_sub(incoming_len.min(budget));

        let mut contents = Vec::new();
        {
            let mut read_handle = File::open(&self.path)?;
            read_handle.read_to_end(&mut contents)?;
        }
        let start = contents.len().saturating_sub(keep as usize);
        let tail = &contents[start..];

        let mut rewritten = Vec::with_capacity(marker.len() + tail.len());
        rewritten.extend_from_slice(marker);
        rewritten.extend_from_slice(tail);

        let mut write_handle = OpenOptions::new().write(true).truncate(true).open(&self.path)?;
        write_handle.write_all(&rewritten)?;
        write_handle.flush()?;

        self.file = OpenOptions::new().read(true).append(true).open(&self.path)?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Write for RotatingFileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let current = self.current_len()?;
        if current + buf.len() as u64 > self.max_bytes {
            self.truncate_oldest(buf.len() as u64)?;
        }
        self.file.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::BufRead;

    fn read_lines(path: &Path) -> Vec<String> {
        let file = File::open(path).unwrap();
        io::BufReader::new(file)
            .lines()
            .map(|l| l.unwrap())
            .collect()
    }

    #[test]
    fn appends_without_rotation_when_under_cap() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.txt");
        let mut writer = RotatingFileWriter::open(&path, 1024).unwrap();
        writer.write_all(b"line one\n").unwrap();
        writer.write_all(b"line two\n").unwrap();
        writer.flush().unwrap();

        let lines = read_lines(&path);
        assert_eq!(lines, vec!["line one", "line two"]);
    }

    #[test]
    fn truncates_oldest_bytes_with_marker_when_over_cap() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.txt");
        let mut writer = RotatingFileWriter::open(&path, 80).unwrap();
        for i in 0..20 {
            writer.write_all(format!("entry-{i:03}\n").as_bytes()).unwrap();
        }
        writer.flush().unwrap();

        let size = std::fs::metadata(&path).unwrap().len();
        assert!(size <= 80, "file grew past cap: {size}");

        let lines = read_lines(&path);
        assert!(lines[0].starts_with("...[log truncated"));
        assert!(lines.last().unwrap().starts_with("entry-019"));
    }

    #[test]
    fn creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/sub/log.txt");
        let mut writer = RotatingFileWriter::open(&path, 1024).unwrap();
        writer.write_all(b"hello\n").unwrap();
        writer.flush().unwrap();
        assert!(path.is_file());
    }
}
