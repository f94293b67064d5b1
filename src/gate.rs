//! Incremental build gate.
//!
//! Decides whether a stage needs to run by comparing modification times:
//! the newest source document against the oldest file the stage produced
//! last time. Any doubt means "run".
//!
//! | Situation | Runs? |
//! |---|---|
//! | output directory missing | yes |
//! | last run left a failure marker | yes |
//! | no source documents | no |
//! | output directory has no `.mjs`/`.json` files | yes |
//! | document count differs from output count | yes |
//! | newest source newer than oldest output | yes |
//! | otherwise | no |
//! | any I/O error while checking | yes |
//!
//! This is purely an optimisation: every stage rewrites its whole subtree, so
//! running when not needed is always safe. `config.toml` in the content root
//! counts as a source, since it changes what the stages emit.
//!
//! ## Failure marker
//!
//! A stage that ends with failures still writes the documents that worked.
//! [`record_outcome`] leaves a `.failed` file listing the problems next to
//! those outputs, and the gate keeps running the stage until a clean run
//! removes it. A skipped stage therefore always means the last run succeeded.
//!
//! ## Deleted sources
//!
//! Deleting a document makes no file newer, so timestamps alone miss it. The
//! gate also compares the number of source documents with the number of
//! per-document outputs (`<category>/<id>.json` or `.mjs`).

use crate::config::{CONFIG_FILE, PipelineConfig};
use crate::layout::MODULE_REGISTRY;
use chrono::{DateTime, Utc};
use std::fmt;
use std::fs;
use std::io;
use std::path::Path;
use std::time::SystemTime;
use walkdir::WalkDir;

/// Extensions of files a stage writes that take part in the comparison.
pub const OUTPUT_EXTENSIONS: &[&str] = &["mjs", "json"];

/// Left in a stage's output directory by a run that had failures.
pub const FAILURE_MARKER: &str = ".failed";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateReason {
    Forced,
    MissingOutput,
    PreviousRunFailed,
    NoSources,
    NoOutputFiles,
    DocumentCountChanged {
        sources: usize,
        outputs: usize,
    },
    SourcesNewer {
        newest_source: DateTime<Utc>,
        oldest_output: DateTime<Utc>,
    },
    UpToDate,
    CheckFailed(String),
}

impl fmt::Display for GateReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GateReason::Forced => f.write_str("Forced rebuild"),
            GateReason::MissingOutput => f.write_str("Output directory does not exist"),
            GateReason::NoSources => f.write_str("No source files found"),
            GateReason::PreviousRunFailed => f.write_str("Previous run had failures"),
            GateReason::NoOutputFiles => f.write_str("No output files found"),
            GateReason::DocumentCountChanged { sources, outputs } => write!(
                f,
                "Source and output document counts differ ({sources} != {outputs})"
            ),
            GateReason::SourcesNewer {
                newest_source,
                oldest_output,
            } => write!(
                f,
                "Source files newer than output ({} > {})",
                crate::frontmatter::format_date(newest_source),
                crate::frontmatter::format_date(oldest_output)
            ),
            GateReason::UpToDate => f.write_str("Output files are up to date"),
            GateReason::CheckFailed(e) => write!(f, "Error checking files: {e}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateDecision {
    pub reason: GateReason,
    /// Source documents seen while deciding.
    pub source_count: usize,
}

impl GateDecision {
    pub fn forced() -> Self {
        Self {
            reason: GateReason::Forced,
            source_count: 0,
        }
    }

    pub fn needs_regen(&self) -> bool {
        !matches!(self.reason, GateReason::NoSources | GateReason::UpToDate)
    }
}

/// Decide whether the stage writing into `output_dir` must run.
pub fn needs_regeneration(source_dir: &Path, output_dir: &Path, config: &PipelineConfig) -> GateDecision {
    let decision = decide(source_dir, output_dir, config).unwrap_or_else(|e| GateDecision {
        reason: GateReason::CheckFailed(e.to_string()),
        source_count: 0,
    });
    tracing::debug!(
        output = %output_dir.display(),
        run = decision.needs_regen(),
        reason = %decision.reason,
        "gate decision"
    );
    decision
}

fn decide(
    source_dir: &Path,
    output_dir: &Path,
    config: &PipelineConfig,
) -> io::Result<GateDecision> {
    if !output_dir.exists() {
        return Ok(GateDecision {
            reason: GateReason::MissingOutput,
            source_count: 0,
        });
    }
    if output_dir.join(FAILURE_MARKER).exists() {
        return Ok(GateDecision {
            reason: GateReason::PreviousRunFailed,
            source_count: 0,
        });
    }

    let sources = collect_mtimes(source_dir, |ext| config.is_content_extension(ext))?;
    let source_count = sources.len();
    let Some(mut newest_source) = sources.into_iter().max() else {
        return Ok(GateDecision {
            reason: GateReason::NoSources,
            source_count,
        });
    };
    if let Ok(modified) = source_dir.join(CONFIG_FILE).metadata().and_then(|m| m.modified()) {
        newest_source = newest_source.max(modified);
    }

    let outputs = collect_mtimes(output_dir, |ext| OUTPUT_EXTENSIONS.contains(&ext))?;
    let Some(oldest_output) = outputs.into_iter().min() else {
        return Ok(GateDecision {
            reason: GateReason::NoOutputFiles,
            source_count,
        });
    };

    let outputs = count_document_outputs(output_dir)?;
    if outputs != source_count {
        return Ok(GateDecision {
            reason: GateReason::DocumentCountChanged {
                sources: source_count,
                outputs,
            },
            source_count,
        });
    }

    let reason = if newest_source > oldest_output {
        GateReason::SourcesNewer {
            newest_source: newest_source.into(),
            oldest_output: oldest_output.into(),
        }
    } else {
        GateReason::UpToDate
    };
    Ok(GateDecision {
        reason,
        source_count,
    })
}

/// Per-document outputs: `<category>/<id>.<ext>` two levels below `dir`.
fn count_document_outputs(dir: &Path) -> io::Result<usize> {
    let mut count = 0;
    for entry in WalkDir::new(dir).min_depth(2).max_depth(2) {
        let entry = entry?;
        let is_output = entry.file_type().is_file()
            && entry.file_name() != MODULE_REGISTRY
            && entry
                .path()
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| OUTPUT_EXTENSIONS.contains(&e));
        if is_output {
            count += 1;
        }
    }
    Ok(count)
}

/// Record how a run of the stage writing `output_dir` ended.
///
/// Non-empty `problems` are written to the failure marker, one per line; an
/// empty list removes any marker left by an earlier run.
pub fn record_outcome(output_dir: &Path, problems: &[String]) -> io::Result<()> {
    let marker = output_dir.join(FAILURE_MARKER);
    if problems.is_empty() {
        return match fs::remove_file(&marker) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        };
    }
    fs::create_dir_all(output_dir)?;
    let mut text = problems.join("\n");
    text.push('\n');
    fs::write(&marker, text)
}

/// Modification times of every file below `dir` whose extension passes `keep`.
fn collect_mtimes(dir: &Path, keep: impl Fn(&str) -> bool) -> io::Result<Vec<SystemTime>> {
    let mut times = Vec::new();
    for entry in WalkDir::new(dir) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let wanted = entry
            .path()
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(&keep);
        if wanted {
            times.push(entry.metadata()?.modified()?);
        }
    }
    Ok(times)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;
    use std::fs::File;
    use std::time::Duration;
    use tempfile::TempDir;

    fn set_mtime(path: &Path, time: SystemTime) {
        File::options()
            .write(true)
            .open(path)
            .unwrap()
            .set_modified(time)
            .unwrap();
    }

    fn ago(secs: u64) -> SystemTime {
        SystemTime::now() - Duration::from_secs(secs)
    }

    fn check(content: &TempDir, out: &TempDir) -> GateDecision {
        needs_regeneration(
            content.path(),
            &out.path().join("frontmatter"),
            &PipelineConfig::default(),
        )
    }

    #[test]
    fn missing_output_runs() {
        let content = TempDir::new().unwrap();
        write_file(content.path(), "posts/a.mdx", "x");
        let out = TempDir::new().unwrap();
        let decision = check(&content, &out);
        assert_eq!(decision.reason, GateReason::MissingOutput);
        assert!(decision.needs_regen());
    }

    #[test]
    fn no_sources_skips() {
        let content = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        write_file(out.path(), "frontmatter/posts/a.json", "{}");
        let decision = check(&content, &out);
        assert_eq!(decision.reason, GateReason::NoSources);
        assert!(!decision.needs_regen());
    }

    #[test]
    fn empty_output_runs() {
        let content = TempDir::new().unwrap();
        write_file(content.path(), "posts/a.mdx", "x");
        let out = TempDir::new().unwrap();
        write_file(out.path(), "frontmatter/posts/index.js", "");
        let decision = check(&content, &out);
        assert_eq!(decision.reason, GateReason::NoOutputFiles);
        assert_eq!(decision.source_count, 1);
    }

    #[test]
    fn output_newer_than_sources_skips() {
        let content = TempDir::new().unwrap();
        let src = write_file(content.path(), "posts/a.mdx", "x");
        set_mtime(&src, ago(3600));
        let out = TempDir::new().unwrap();
        let json = write_file(out.path(), "frontmatter/posts/a.json", "{}");
        set_mtime(&json, ago(60));

        let decision = check(&content, &out);
        assert_eq!(decision.reason, GateReason::UpToDate);
        assert!(!decision.needs_regen());
    }

    #[test]
    fn touched_source_runs() {
        let content = TempDir::new().unwrap();
        let src = write_file(content.path(), "posts/a.mdx", "x");
        set_mtime(&src, ago(3600));
        let out = TempDir::new().unwrap();
        let json = write_file(out.path(), "frontmatter/posts/a.json", "{}");
        set_mtime(&json, ago(600));

        set_mtime(&src, ago(10));
        let decision = check(&content, &out);
        assert!(matches!(decision.reason, GateReason::SourcesNewer { .. }));
        assert!(decision.reason.to_string().starts_with("Source files newer than output ("));
    }

    #[test]
    fn oldest_output_decides() {
        let content = TempDir::new().unwrap();
        let src = write_file(content.path(), "posts/a.mdx", "x");
        set_mtime(&src, ago(600));
        let out = TempDir::new().unwrap();
        let fresh = write_file(out.path(), "frontmatter/posts/a.json", "{}");
        set_mtime(&fresh, ago(10));
        let stale = write_file(out.path(), "frontmatter/tags.json", "{}");
        set_mtime(&stale, ago(3600));

        assert!(check(&content, &out).needs_regen());
    }

    #[test]
    fn config_change_counts_as_source() {
        let content = TempDir::new().unwrap();
        let src = write_file(content.path(), "posts/a.mdx", "x");
        set_mtime(&src, ago(3600));
        let config = write_file(content.path(), CONFIG_FILE, "");
        set_mtime(&config, ago(10));
        let out = TempDir::new().unwrap();
        let json = write_file(out.path(), "frontmatter/posts/a.json", "{}");
        set_mtime(&json, ago(600));

        assert!(check(&content, &out).needs_regen());
    }

    #[test]
    fn unreadable_source_dir_runs() {
        let out = TempDir::new().unwrap();
        write_file(out.path(), "frontmatter/posts/a.json", "{}");
        let decision = needs_regeneration(
            &out.path().join("missing"),
            &out.path().join("frontmatter"),
            &PipelineConfig::default(),
        );
        assert!(matches!(decision.reason, GateReason::CheckFailed(_)));
        assert!(decision.needs_regen());
    }

    #[test]
    fn failure_marker_forces_rerun_until_clean() {
        let content = TempDir::new().unwrap();
        let src = write_file(content.path(), "posts/a.mdx", "x");
        set_mtime(&src, ago(3600));
        let out = TempDir::new().unwrap();
        let json = write_file(out.path(), "frontmatter/posts/a.json", "{}");
        set_mtime(&json, ago(60));
        let dir = out.path().join("frontmatter");

        record_outcome(&dir, &["posts/b.mdx: meta.title: Required".to_string()]).unwrap();
        assert_eq!(
            fs::read_to_string(dir.join(FAILURE_MARKER)).unwrap(),
            "posts/b.mdx: meta.title: Required\n"
        );
        let decision = check(&content, &out);
        assert_eq!(decision.reason, GateReason::PreviousRunFailed);
        assert!(decision.needs_regen());

        record_outcome(&dir, &[]).unwrap();
        assert!(!dir.join(FAILURE_MARKER).exists());
        assert_eq!(check(&content, &out).reason, GateReason::UpToDate);
    }

    #[test]
    fn clean_outcome_without_marker_is_a_no_op() {
        let out = TempDir::new().unwrap();
        record_outcome(out.path(), &[]).unwrap();
        assert!(!out.path().join(FAILURE_MARKER).exists());
    }

    #[test]
    fn deleted_source_runs() {
        let content = TempDir::new().unwrap();
        let src = write_file(content.path(), "posts/a.mdx", "x");
        set_mtime(&src, ago(3600));
        let out = TempDir::new().unwrap();
        for rel in ["frontmatter/posts/a.json", "frontmatter/posts/gone.json", "frontmatter/tags.json"] {
            let path = write_file(out.path(), rel, "{}");
            set_mtime(&path, ago(60));
        }

        let decision = check(&content, &out);
        assert_eq!(
            decision.reason,
            GateReason::DocumentCountChanged {
                sources: 1,
                outputs: 2
            }
        );
        assert!(decision.needs_regen());
        assert_eq!(
            decision.reason.to_string(),
            "Source and output document counts differ (1 != 2)"
        );
    }

    #[test]
    fn registries_and_barrels_are_not_counted() {
        let content = TempDir::new().unwrap();
        let src = write_file(content.path(), "posts/a.mdx", "x");
        set_mtime(&src, ago(3600));
        let out = TempDir::new().unwrap();
        for rel in ["mdx/posts/a.mjs", "mdx/posts/index.mjs"] {
            let path = write_file(out.path(), rel, "");
            set_mtime(&path, ago(60));
        }
        let decision = needs_regeneration(
            content.path(),
            &out.path().join("mdx"),
            &PipelineConfig::default(),
        );
        assert_eq!(decision.reason, GateReason::UpToDate);
    }

    #[test]
    fn forced_always_runs() {
        assert!(GateDecision::forced().needs_regen());
    }
}
