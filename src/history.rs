//! Version-control history lookups.
//!
//! When a document does not declare `meta.dateCreated`, extraction asks the
//! [`History`] for the file's commit timestamps and uses the first commit.
//!
//! The production implementation, [`GitHistory`], runs
//!
//! ```text
//! git log --follow --format="%H %at" -- <file>
//! ```
//!
//! in the file's directory. Output is newest-first, so the last line is the
//! commit that created the file and the first line is the latest edit. Each
//! call is bounded by a timeout; a hung `git` process is killed and reported
//! rather than stalling the whole batch.
//!
//! A file with no history (not yet committed, or outside a repository) is an
//! error, never a silent default: a wrong date corrupts feed ordering.

use chrono::{DateTime, Utc};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("IO error running git for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("git log failed for {path}: {stderr}")]
    Git { path: PathBuf, stderr: String },
    #[error("No git history found for file: {0}")]
    Untracked(PathBuf),
    #[error("git log timed out after {timeout:?} for {path}")]
    Timeout { path: PathBuf, timeout: Duration },
    #[error("Unparseable git log line `{line}` for {path}")]
    Parse { path: PathBuf, line: String },
}

/// Creation and last-edit timestamps of a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileTimestamps {
    pub created: DateTime<Utc>,
    /// Not part of the published front matter; logged only.
    pub last_edited: DateTime<Utc>,
}

/// Source of per-file commit timestamps.
///
/// `Sync` so one instance can be shared across rayon workers.
pub trait History: Sync {
    fn timestamps(&self, path: &Path) -> Result<FileTimestamps, HistoryError>;
}

/// [`History`] backed by the `git` executable.
#[derive(Debug, Clone)]
pub struct GitHistory {
    timeout: Duration,
}

const POLL_INTERVAL: Duration = Duration::from_millis(10);

impl GitHistory {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    fn run_git_log(&self, path: &Path) -> Result<String, HistoryError> {
        let io_err = |source| HistoryError::Io {
            path: path.to_path_buf(),
            source,
        };
        let dir = path.parent().unwrap_or(Path::new("."));
        let file = path.file_name().map(Path::new).unwrap_or(path);

        let mut child = Command::new("git")
            .args(["log", "--follow", "--format=%H %at", "--"])
            .arg(file)
            .current_dir(dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(io_err)?;

        // Drain both pipes on their own threads so a chatty child cannot
        // block on a full pipe while we poll for exit.
        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        let deadline = Instant::now() + self.timeout;
        let status = loop {
            if let Some(status) = child.try_wait().map_err(io_err)? {
                break status;
            }
            if Instant::now() >= deadline {
                let _ = child.kill();
                let _ = child.wait();
                return Err(HistoryError::Timeout {
                    path: path.to_path_buf(),
                    timeout: self.timeout,
                });
            }
            thread::sleep(POLL_INTERVAL);
        };

        let stdout = collect(stdout);
        if !status.success() {
            return Err(HistoryError::Git {
                path: path.to_path_buf(),
                stderr: collect(stderr).trim().to_string(),
            });
        }
        Ok(stdout)
    }
}

fn drain<R: Read + Send + 'static>(mut reader: R) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = String::new();
        let _ = reader.read_to_string(&mut buf);
        buf
    })
}

fn collect(handle: Option<thread::JoinHandle<String>>) -> String {
    handle.and_then(|h| h.join().ok()).unwrap_or_default()
}

impl History for GitHistory {
    fn timestamps(&self, path: &Path) -> Result<FileTimestamps, HistoryError> {
        let output = self.run_git_log(path)?;
        let stamps = parse_log(path, &output)?;
        tracing::debug!(
            path = %path.display(),
            created = %stamps.created,
            last_edited = %stamps.last_edited,
            "git history"
        );
        Ok(stamps)
    }
}

/// Parse `git log --format="%H %at"` output (newest commit first).
pub fn parse_log(path: &Path, output: &str) -> Result<FileTimestamps, HistoryError> {
    let lines: Vec<&str> = output
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    let (Some(newest), Some(oldest)) = (lines.first(), lines.last()) else {
        return Err(HistoryError::Untracked(path.to_path_buf()));
    };
    Ok(FileTimestamps {
        created: parse_line(path, oldest)?,
        last_edited: parse_line(path, newest)?,
    })
}

fn parse_line(path: &Path, line: &str) -> Result<DateTime<Utc>, HistoryError> {
    let parse_err = || HistoryError::Parse {
        path: path.to_path_buf(),
        line: line.to_string(),
    };
    let secs: i64 = line
        .split_whitespace()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .ok_or_else(parse_err)?;
    DateTime::from_timestamp(secs, 0).ok_or_else(parse_err)
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Mock history that answers from a table and records every lookup.
    /// Uses Mutex (not RefCell) so it is Sync and works with rayon.
    #[derive(Default)]
    pub struct MockHistory {
        pub created: HashMap<String, DateTime<Utc>>,
        pub lookups: Mutex<Vec<PathBuf>>,
    }

    impl MockHistory {
        pub fn new() -> Self {
            Self::default()
        }

        /// Answer for any path whose file name is `file_name`.
        pub fn with(mut self, file_name: &str, created: DateTime<Utc>) -> Self {
            self.created.insert(file_name.to_string(), created);
            self
        }

        pub fn get_lookups(&self) -> Vec<PathBuf> {
            self.lookups.lock().unwrap().clone()
        }
    }

    impl History for MockHistory {
        fn timestamps(&self, path: &Path) -> Result<FileTimestamps, HistoryError> {
            self.lookups.lock().unwrap().push(path.to_path_buf());
            let name = path.file_name().unwrap().to_string_lossy().to_string();
            self.created
                .get(&name)
                .map(|&created| FileTimestamps {
                    created,
                    last_edited: created,
                })
                .ok_or_else(|| HistoryError::Untracked(path.to_path_buf()))
        }
    }

    fn ts(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    #[test]
    fn parse_log_uses_last_line_as_created() {
        let out = "abc123 1700000300\ndef456 1700000200\n0a1b2c 1700000100\n";
        let stamps = parse_log(Path::new("a.mdx"), out).unwrap();
        assert_eq!(stamps.created, ts(1_700_000_100));
        assert_eq!(stamps.last_edited, ts(1_700_000_300));
    }

    #[test]
    fn parse_log_single_commit() {
        let stamps = parse_log(Path::new("a.mdx"), "abc 1669593600\n").unwrap();
        assert_eq!(stamps.created, stamps.last_edited);
        assert_eq!(
            crate::frontmatter::format_date(&stamps.created),
            "2022-11-28T00:00:00.000Z"
        );
    }

    #[test]
    fn parse_log_empty_is_untracked() {
        assert!(matches!(
            parse_log(Path::new("a.mdx"), "\n  \n"),
            Err(HistoryError::Untracked(_))
        ));
    }

    #[test]
    fn parse_log_garbage_is_parse_error() {
        assert!(matches!(
            parse_log(Path::new("a.mdx"), "abc notanumber\n"),
            Err(HistoryError::Parse { .. })
        ));
    }

    #[test]
    fn mock_records_lookups() {
        let history = MockHistory::new().with("a.mdx", ts(10));
        assert_eq!(
            history.timestamps(Path::new("/x/a.mdx")).unwrap().created,
            ts(10)
        );
        assert!(history.timestamps(Path::new("/x/b.mdx")).is_err());
        assert_eq!(history.get_lookups().len(), 2);
    }

    #[test]
    fn git_history_reports_failure_outside_repository() {
        // Either git is missing (Io), the temp dir is not a repository (Git),
        // or it sits inside one and the file is untracked (Untracked).
        let tmp = tempfile::TempDir::new().unwrap();
        let file = tmp.path().join("a.mdx");
        std::fs::write(&file, "---\n---\n").unwrap();
        let result = GitHistory::new(Duration::from_secs(10)).timestamps(&file);
        assert!(matches!(
            result,
            Err(HistoryError::Io { .. } | HistoryError::Git { .. } | HistoryError::Untracked(_))
        ));
    }
}
