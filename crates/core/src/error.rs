use std::path::PathBuf;

/// Why an engine invocation was judged to have failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderFailure {
    /// The engine could not be started at all.
    Spawn(String),
    /// The engine exited with a non-zero status (`None` when terminated by a signal).
    EngineExit(Option<i32>),
    /// The engine exited successfully but the expected artifact is absent.
    MissingArtifact(PathBuf),
}

impl std::fmt::Display for RenderFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RenderFailure::Spawn(reason) => write!(f, "engine could not be started: {}", reason),
            RenderFailure::EngineExit(Some(code)) => write!(f, "engine exited with status {}", code),
            RenderFailure::EngineExit(None) => write!(f, "engine was terminated by a signal"),
            RenderFailure::MissingArtifact(path) => {
                write!(f, "engine produced no artifact at {}", path.display())
            }
        }
    }
}

/// Diagnostics captured from a failed engine invocation.
///
/// Typesetting failures are rarely explained by the exit status alone, so the engine's own
/// output and log travel with the error.
#[derive(Debug, Clone, thiserror::Error)]
#[error("render failed: {failure}")]
pub struct RenderError {
    pub failure: RenderFailure,
    pub stdout: String,
    pub stderr: String,
    /// Last lines of the engine log, when the engine wrote one.
    pub log_tail: Option<String>,
    /// Working directory retained for inspection.
    pub workdir: PathBuf,
}

#[derive(Debug, thiserror::Error)]
pub enum ChartError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("composition error: {0}")]
    Composition(String),
    #[error(transparent)]
    Render(Box<RenderError>),

    #[error("no logo available (default logo missing at {path})", path = path.display())]
    MissingLogo { path: PathBuf },
    #[error(
        "logo path {path} contains characters that cannot appear in the page description",
        path = path.display()
    )]
    UnsafeLogoPath { path: PathBuf },
    #[error("logo store error: {0}")]
    Logo(#[from] wardchart_files::FilesError),
    #[error("failed to create directory {path}: {source}", path = path.display())]
    DirCreation {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write {path}: {source}", path = path.display())]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read {path}: {source}", path = path.display())]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(
        "failed to move artifact {artifact} to {destination}: {source}",
        artifact = artifact.display(),
        destination = destination.display()
    )]
    ArtifactMove {
        artifact: PathBuf,
        destination: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse settings {path}: {source}", path = path.display())]
    Settings {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl From<RenderError> for ChartError {
    fn from(err: RenderError) -> Self {
        ChartError::Render(Box::new(err))
    }
}

pub type ChartResult<T> = std::result::Result<T, ChartError>;
