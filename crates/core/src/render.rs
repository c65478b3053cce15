//! Typesetting engine invocation.
//!
//! Each invocation gets its own working directory, named by its [`RunId`], under the scratch
//! directory:
//!
//! ```text
//! <scratch_dir>/
//!   20260111T143522.045Z-550e8400e29b41d4a716446655440000/
//!     chart.tex      # page description
//!     chart.log      # written by the engine
//!     chart.pdf      # written by the engine, moved to the output directory on success
//! ```
//!
//! Concurrent invocations never share a directory, so no locking is needed. An invocation
//! succeeds only if the engine exits with status 0 *and* the artifact exists. On success the
//! artifact is moved to the output directory; on failure the working directory is kept and the
//! engine's stdout, stderr and log tail are returned in a [`RenderError`].

use crate::compose::PageDescription;
use crate::config::{CoreConfig, EngineConfig, ScratchRetention};
use crate::constants::{ARTIFACT_EXTENSION, LOG_EXTENSION, SOURCE_EXTENSION, SOURCE_STEM};
use crate::error::{RenderError, RenderFailure};
use crate::{ChartError, ChartResult};
use chrono::{DateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use wardchart_ids::RunId;
use wardchart_types::NonEmptyText;

/// A finished chart document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Artifact {
    pub path: PathBuf,
    pub size_bytes: u64,
    pub run_id: RunId,
}

impl Artifact {
    pub fn generated_at(&self) -> DateTime<Utc> {
        self.run_id.timestamp()
    }
}

#[derive(Clone, Debug)]
pub struct RenderInvoker {
    engine: EngineConfig,
    scratch_dir: PathBuf,
    output_dir: PathBuf,
    retention: ScratchRetention,
    log_tail_lines: usize,
}

impl RenderInvoker {
    pub fn new(cfg: &CoreConfig) -> Self {
        Self {
            engine: cfg.engine().clone(),
            scratch_dir: cfg.scratch_dir().to_path_buf(),
            output_dir: cfg.output_dir().to_path_buf(),
            retention: cfg.retention(),
            log_tail_lines: cfg.log_tail_lines(),
        }
    }

    /// Typesets `page` and moves the result to `<output_dir>/<artifact_stem>.pdf`.
    ///
    /// # Arguments
    ///
    /// * `page` - The composed page description; consumed by this call
    /// * `run_id` - Unique identifier of this invocation
    /// * `artifact_stem` - File name, without extension, for the finished artifact
    ///
    /// # Errors
    ///
    /// Returns `ChartError::Render` if the engine fails or produces no artifact, and a
    /// resource error (`DirCreation`, `FileWrite`, `ArtifactMove`, `FileRead`) if the
    /// filesystem work around the engine fails.
    pub fn invoke(
        &self,
        page: PageDescription,
        run_id: &RunId,
        artifact_stem: &NonEmptyText,
    ) -> ChartResult<Artifact> {
        let workdir = self.create_workdir(run_id)?;
        let source = workdir.join(format!("{}.{}", SOURCE_STEM, SOURCE_EXTENSION));
        fs::write(&source, page.into_string()).map_err(|source_err| ChartError::FileWrite {
            path: source.clone(),
            source: source_err,
        })?;

        let produced = self.run_engine(&source, &workdir)?;

        fs::create_dir_all(&self.output_dir).map_err(|source| ChartError::DirCreation {
            path: self.output_dir.clone(),
            source,
        })?;
        let destination = self
            .output_dir
            .join(format!("{}.{}", artifact_stem, ARTIFACT_EXTENSION));
        move_file(&produced, &destination).map_err(|source| ChartError::ArtifactMove {
            artifact: produced.clone(),
            destination: destination.clone(),
            source,
        })?;

        let size_bytes = fs::metadata(&destination)
            .map_err(|source| ChartError::FileRead {
                path: destination.clone(),
                source,
            })?
            .len();

        self.apply_retention(&workdir);

        tracing::info!(
            run_id = %run_id,
            artifact = %destination.display(),
            size_bytes,
            "chart rendered"
        );

        Ok(Artifact {
            path: destination,
            size_bytes,
            run_id: run_id.clone(),
        })
    }

    fn create_workdir(&self, run_id: &RunId) -> ChartResult<PathBuf> {
        fs::create_dir_all(&self.scratch_dir).map_err(|source| ChartError::DirCreation {
            path: self.scratch_dir.clone(),
            source,
        })?;

        let workdir = self.scratch_dir.join(run_id.to_string());
        fs::create_dir(&workdir).map_err(|source| ChartError::DirCreation {
            path: workdir.clone(),
            source,
        })?;

        // The engine runs inside the workdir, so every path handed to it must be absolute.
        workdir
            .canonicalize()
            .map_err(|source| ChartError::DirCreation {
                path: workdir.clone(),
                source,
            })
    }

    /// Runs the engine and returns the path of the artifact it produced.
    fn run_engine(&self, source: &Path, workdir: &Path) -> ChartResult<PathBuf> {
        let artifact = workdir.join(format!("{}.{}", SOURCE_STEM, ARTIFACT_EXTENSION));

        tracing::debug!(
            engine = %self.engine.program(),
            workdir = %workdir.display(),
            "invoking typesetting engine"
        );

        let output = Command::new(self.engine.program())
            .args(self.engine.resolve_args(source, workdir))
            .current_dir(workdir)
            .stdin(Stdio::null())
            .output();

        let (failure, stdout, stderr) = match output {
            Err(e) => (RenderFailure::Spawn(e.to_string()), String::new(), String::new()),
            Ok(output) => {
                let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
                let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
                if !output.status.success() {
                    (RenderFailure::EngineExit(output.status.code()), stdout, stderr)
                } else if !artifact.is_file() {
                    (RenderFailure::MissingArtifact(artifact.clone()), stdout, stderr)
                } else {
                    return Ok(artifact);
                }
            }
        };

        let log_tail = read_log_tail(
            &workdir.join(format!("{}.{}", SOURCE_STEM, LOG_EXTENSION)),
            self.log_tail_lines,
        );

        tracing::error!(
            engine = %self.engine.program(),
            workdir = %workdir.display(),
            "{}",
            failure
        );

        Err(RenderError {
            failure,
            stdout,
            stderr,
            log_tail,
            workdir: workdir.to_path_buf(),
        }
        .into())
    }

    fn apply_retention(&self, workdir: &Path) {
        let keep = match self.retention {
            ScratchRetention::KeepAll => true,
            ScratchRetention::KeepWithLog => workdir
                .join(format!("{}.{}", SOURCE_STEM, LOG_EXTENSION))
                .is_file(),
            ScratchRetention::Discard => false,
        };
        if keep {
            return;
        }

        if let Err(e) = fs::remove_dir_all(workdir) {
            tracing::warn!(
                workdir = %workdir.display(),
                "failed to remove scratch directory: {}",
                e
            );
        }
    }
}

/// Last `lines` lines of the engine log, if it exists.
///
/// Engine logs are not guaranteed to be UTF-8, so invalid bytes are replaced.
fn read_log_tail(path: &Path, lines: usize) -> Option<String> {
    if lines == 0 {
        return None;
    }
    let bytes = fs::read(path).ok()?;
    let text = String::from_utf8_lossy(&bytes);
    let all: Vec<&str> = text.lines().collect();
    let start = all.len().saturating_sub(lines);
    Some(all[start..].join("\n"))
}

/// Renames `from` to `to`, falling back to copy-and-delete across filesystems.
fn move_file(from: &Path, to: &Path) -> std::io::Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(_) => {
            fs::copy(from, to)?;
            fs::remove_file(from)
        }
    }
}
