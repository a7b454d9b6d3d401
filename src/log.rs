//! Append-only execution log with bounded tailing.
//!
//! Lines are written with an append-mode handle, never by rewriting the file,
//! so concurrent appenders cannot lose each other's lines through a stale
//! read. Tailing scans backward from end-of-file in fixed-size chunks and
//! stops as soon as enough lines are collected, so memory stays proportional
//! to the requested tail size rather than the file size.

use crate::clock::{Clock, SystemClock};
use crate::error::{Result, StoreError};
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::trace;

/// Read window for the backward tail scan.
const TAIL_CHUNK: usize = 8 * 1024;

/// Bytes to read for the window ending at `pos`.
///
/// The min is taken in u64: casting `pos` first would wrap on 32-bit
/// targets once the file passes 4 GiB, and at an exact multiple of 2^32
/// the wrapped value is zero, stalling the scan.
fn scan_window(pos: u64) -> usize {
    (TAIL_CHUNK as u64).min(pos) as usize
}

/// An append-only text file of timestamped lines.
///
/// Each line has the shape `[<YYYY-MM-DD HH:MM:SS>] - <message>`. Lines are
/// created only by [`append`](Self::append) and never mutated or individually
/// deleted; deleting the file as a whole is an external operation, and a
/// missing file simply means the log has never been written.
pub struct AppendLog {
    path: PathBuf,
    clock: Arc<dyn Clock>,
}

impl AppendLog {
    /// Create a log over the given path, timestamped by the system clock.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_clock(path, Arc::new(SystemClock))
    }

    /// Create a log with an injected clock (tests pin the timestamp).
    pub fn with_clock(path: impl Into<PathBuf>, clock: Arc<dyn Clock>) -> Self {
        Self {
            path: path.into(),
            clock,
        }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one timestamped line.
    ///
    /// Creates the file and its parent directory if absent. The formatted
    /// line goes out in a single write on an append-mode handle; for lines
    /// below the OS's atomic-append threshold, concurrent appenders
    /// interleave without tearing. Larger lines assume a single writer at a
    /// time.
    pub fn append(&self, message: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(StoreError::LogIo)?;
            }
        }

        let line = format!("[{}] - {}\n", self.clock.now(), message);

        let mut file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.path)
            .map_err(StoreError::LogIo)?;
        file.write_all(line.as_bytes()).map_err(StoreError::LogIo)
    }

    /// Return the last `n` non-blank lines, oldest of the window first.
    ///
    /// Fewer than `n` lines in the file returns all of them; a missing file
    /// returns an empty vector. Blank lines count toward neither the result
    /// nor `n`.
    ///
    /// The file is read backward from EOF in fixed-size windows,
    /// stitching the partial line at each window boundary onto the previous
    /// window, until `n` lines are collected or the start of the file is
    /// reached.
    pub fn tail(&self, n: usize) -> Result<Vec<String>> {
        if n == 0 {
            return Ok(Vec::new());
        }

        let mut file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::LogIo(e)),
        };
        let len = file.metadata().map_err(StoreError::LogIo)?.len();

        // Collected newest-first, reversed at the end.
        let mut collected: Vec<String> = Vec::with_capacity(n);
        // Head fragment of the current window, continued in the next
        // (earlier) window.
        let mut carry: Vec<u8> = Vec::new();
        let mut pos = len;

        while pos > 0 && collected.len() < n {
            let take = scan_window(pos);
            pos -= take as u64;

            file.seek(SeekFrom::Start(pos)).map_err(StoreError::LogIo)?;
            let mut buf = vec![0u8; take];
            file.read_exact(&mut buf).map_err(StoreError::LogIo)?;
            buf.extend_from_slice(&carry);

            let segments: Vec<&[u8]> = buf.split(|&b| b == b'\n').collect();

            // Unless this window starts at offset 0, the first segment may
            // continue into the previous window; it carries over instead of
            // being emitted.
            let first_complete = if pos > 0 { 1 } else { 0 };
            for segment in segments[first_complete..].iter().rev() {
                if collected.len() == n {
                    break;
                }
                let line = String::from_utf8_lossy(segment);
                let line = line.trim_end_matches('\r');
                if line.trim().is_empty() {
                    continue;
                }
                collected.push(line.to_string());
            }

            carry = if pos > 0 { segments[0].to_vec() } else { Vec::new() };
            trace!(pos, lines = collected.len(), "tail scan window");
        }

        collected.reverse();
        Ok(collected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use tempfile::TempDir;

    fn fixed_log(path: impl Into<PathBuf>) -> AppendLog {
        AppendLog::with_clock(path, Arc::new(FixedClock("2024-01-01 12:00:00".into())))
    }

    #[test]
    fn test_append_line_format() {
        let dir = TempDir::new().unwrap();
        let log = fixed_log(dir.path().join("app.log"));

        log.append("Inicio del programa").unwrap();

        let content = fs::read_to_string(log.path()).unwrap();
        assert_eq!(content, "[2024-01-01 12:00:00] - Inicio del programa\n");
    }

    #[test]
    fn test_append_creates_parent_dir() {
        let dir = TempDir::new().unwrap();
        let log = fixed_log(dir.path().join("logs").join("app.log"));

        log.append("first").unwrap();
        log.append("second").unwrap();

        let content = fs::read_to_string(log.path()).unwrap();
        assert_eq!(content.lines().count(), 2);
    }

    #[test]
    fn test_tail_window_in_order() {
        let dir = TempDir::new().unwrap();
        let log = fixed_log(dir.path().join("app.log"));

        log.append("a").unwrap();
        log.append("b").unwrap();
        log.append("c").unwrap();

        let lines = log.tail(2).unwrap();
        assert_eq!(
            lines,
            ["[2024-01-01 12:00:00] - b", "[2024-01-01 12:00:00] - c"]
        );
    }

    #[test]
    fn test_tail_more_than_available() {
        let dir = TempDir::new().unwrap();
        let log = fixed_log(dir.path().join("app.log"));

        log.append("a").unwrap();
        log.append("b").unwrap();

        assert_eq!(log.tail(5).unwrap().len(), 2);
    }

    #[test]
    fn test_tail_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let log = fixed_log(dir.path().join("never-written.log"));

        assert_eq!(log.tail(3).unwrap(), Vec::<String>::new());
    }

    #[test]
    fn test_tail_zero() {
        let dir = TempDir::new().unwrap();
        let log = fixed_log(dir.path().join("app.log"));
        log.append("a").unwrap();

        assert!(log.tail(0).unwrap().is_empty());
    }

    #[test]
    fn test_tail_skips_blank_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.log");
        fs::write(&path, "one\n\ntwo\n   \nthree\n\n").unwrap();
        let log = fixed_log(&path);

        assert_eq!(log.tail(2).unwrap(), ["two", "three"]);
        assert_eq!(log.tail(10).unwrap(), ["one", "two", "three"]);
    }

    #[test]
    fn test_tail_handles_crlf() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.log");
        fs::write(&path, "one\r\ntwo\r\n").unwrap();
        let log = fixed_log(&path);

        assert_eq!(log.tail(2).unwrap(), ["one", "two"]);
    }

    #[test]
    fn test_tail_across_chunk_boundaries() {
        let dir = TempDir::new().unwrap();
        let log = fixed_log(dir.path().join("app.log"));

        // Well past one 8 KiB scan window
        for i in 0..2000 {
            log.append(&format!("entry number {i:05}")).unwrap();
        }

        let lines = log.tail(3).unwrap();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].ends_with("entry number 01997"));
        assert!(lines[2].ends_with("entry number 01999"));

        // A window larger than one chunk
        let lines = log.tail(700).unwrap();
        assert_eq!(lines.len(), 700);
        assert!(lines[0].ends_with("entry number 01300"));
        assert!(lines[699].ends_with("entry number 01999"));
    }

    #[test]
    fn test_tail_line_longer_than_chunk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.log");
        let long = "x".repeat(TAIL_CHUNK * 2 + 17);
        fs::write(&path, format!("first\n{long}\nlast\n")).unwrap();
        let log = fixed_log(&path);

        let lines = log.tail(3).unwrap();
        assert_eq!(lines[0], "first");
        assert_eq!(lines[1], long);
        assert_eq!(lines[2], "last");
    }

    #[test]
    fn test_scan_window_never_stalls() {
        assert_eq!(scan_window(0), 0);
        assert_eq!(scan_window(100), 100);
        assert_eq!(scan_window(TAIL_CHUNK as u64), TAIL_CHUNK);
        // Offsets past 4 GiB, including the exact 2^32 boundary, must still
        // yield a full window on every target width
        assert_eq!(scan_window(1u64 << 32), TAIL_CHUNK);
        assert_eq!(scan_window((1u64 << 32) + 17), TAIL_CHUNK);
        assert_eq!(scan_window(u64::MAX), TAIL_CHUNK);
    }

    #[test]
    fn test_tail_no_trailing_newline() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.log");
        fs::write(&path, "one\ntwo").unwrap();
        let log = fixed_log(&path);

        assert_eq!(log.tail(5).unwrap(), ["one", "two"]);
    }
}
