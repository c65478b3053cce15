//! Core runtime configuration.
//!
//! This module defines configuration that should be resolved once at process startup and then
//! passed into core services. Core code never reads process-wide environment variables while a
//! chart is being generated, so concurrent renders and test harnesses see consistent values.

use crate::constants::{
    DEFAULT_ENGINE, DEFAULT_LOGO_PATH, DEFAULT_LOGO_STORE_DIR, DEFAULT_LOG_TAIL_LINES,
    DEFAULT_SETTINGS_PATH, SOURCE_PLACEHOLDER, WORKDIR_PLACEHOLDER,
};
use crate::{ChartError, ChartResult};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use wardchart_types::NonEmptyText;

/// What happens to an invocation's scratch directory after a successful render.
///
/// Failed renders always keep their scratch directory so the engine log can be inspected.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ScratchRetention {
    /// Remove the scratch directory once the artifact has been moved out.
    #[default]
    Discard,
    /// Keep the scratch directory only when the engine left a log behind.
    KeepWithLog,
    /// Always keep the scratch directory.
    KeepAll,
}

impl FromStr for ScratchRetention {
    type Err = ChartError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "discard" => Ok(ScratchRetention::Discard),
            "keep-with-log" => Ok(ScratchRetention::KeepWithLog),
            "keep-all" => Ok(ScratchRetention::KeepAll),
            other => Err(ChartError::InvalidInput(format!(
                "unknown scratch retention policy '{}' (expected discard, keep-with-log or keep-all)",
                other
            ))),
        }
    }
}

/// Parse the scratch retention policy from an optional string value.
///
/// If `value` is `None` or empty/whitespace, returns the default policy.
pub fn scratch_retention_from_env_value(value: Option<String>) -> ChartResult<ScratchRetention> {
    let value = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());
    let parsed = value.map(|v| v.parse::<ScratchRetention>()).transpose()?;

    Ok(parsed.unwrap_or_default())
}

/// How to invoke the external typesetting engine.
///
/// Arguments may contain [`SOURCE_PLACEHOLDER`] and [`WORKDIR_PLACEHOLDER`], which are replaced
/// per invocation. The engine always runs with the working directory as its current directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    program: NonEmptyText,
    args: Vec<String>,
}

impl EngineConfig {
    pub fn new(program: NonEmptyText, args: Vec<String>) -> Self {
        Self { program, args }
    }

    /// The default `pdflatex` invocation: non-interactive, stop at the first error, write every
    /// output into the working directory.
    pub fn pdflatex() -> Self {
        Self::with_default_args(
            NonEmptyText::new(DEFAULT_ENGINE).expect("default engine name is non-empty"),
        )
    }

    /// Uses `program` with the standard LaTeX-style argument list.
    pub fn with_default_args(program: NonEmptyText) -> Self {
        Self {
            program,
            args: vec![
                "-interaction=nonstopmode".into(),
                "-halt-on-error".into(),
                format!("-output-directory={}", WORKDIR_PLACEHOLDER),
                SOURCE_PLACEHOLDER.into(),
            ],
        }
    }

    /// Parses a whitespace-separated command line.
    ///
    /// A bare program name gets the standard argument list; anything more is taken verbatim.
    ///
    /// # Errors
    ///
    /// Returns `ChartError::InvalidInput` if `command_line` is blank.
    pub fn from_command_line(command_line: &str) -> ChartResult<Self> {
        let mut parts = command_line.split_whitespace();
        let program = parts
            .next()
            .and_then(|p| NonEmptyText::new(p).ok())
            .ok_or_else(|| ChartError::InvalidInput("engine command cannot be empty".into()))?;
        let args: Vec<String> = parts.map(str::to_string).collect();

        if args.is_empty() {
            Ok(Self::with_default_args(program))
        } else {
            Ok(Self { program, args })
        }
    }

    pub fn program(&self) -> &NonEmptyText {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Substitutes the per-invocation placeholders.
    pub fn resolve_args(&self, source: &Path, workdir: &Path) -> Vec<OsString> {
        let source = source.to_string_lossy();
        let workdir = workdir.to_string_lossy();
        self.args
            .iter()
            .map(|arg| {
                OsString::from(
                    arg.replace(SOURCE_PLACEHOLDER, &source)
                        .replace(WORKDIR_PLACEHOLDER, &workdir),
                )
            })
            .collect()
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::pdflatex()
    }
}

/// Presentation constants for the treatment and parameter tables.
///
/// Widths are in centimetres; wrap widths are in characters.
#[derive(Clone, Debug, PartialEq)]
pub struct LayoutConfig {
    pub table_width_cm: f32,
    pub day_column_cm: f32,
    pub optional_column_cm: f32,
    pub min_content_cm: f32,
    pub label_wrap_chars: usize,
    pub value_wrap_chars: usize,
    pub label_cell_cm: f32,
    pub value_cell_cm: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            table_width_cm: 12.0,
            day_column_cm: 1.0,
            optional_column_cm: 2.0,
            min_content_cm: 3.0,
            label_wrap_chars: 9,
            value_wrap_chars: 18,
            label_cell_cm: 1.8,
            value_cell_cm: 2.5,
        }
    }
}

impl LayoutConfig {
    /// Checks that every width is usable.
    ///
    /// # Errors
    ///
    /// Returns `ChartError::InvalidInput` if a wrap width is zero or a length is not positive.
    pub fn validate(&self) -> ChartResult<()> {
        if self.label_wrap_chars == 0 || self.value_wrap_chars == 0 {
            return Err(ChartError::InvalidInput(
                "wrap widths must be at least one character".into(),
            ));
        }

        let lengths = [
            ("table_width_cm", self.table_width_cm),
            ("day_column_cm", self.day_column_cm),
            ("optional_column_cm", self.optional_column_cm),
            ("min_content_cm", self.min_content_cm),
            ("label_cell_cm", self.label_cell_cm),
            ("value_cell_cm", self.value_cell_cm),
        ];
        for (name, value) in lengths {
            if !(value.is_finite() && value > 0.0) {
                return Err(ChartError::InvalidInput(format!(
                    "{} must be a positive length, got {}",
                    name, value
                )));
            }
        }

        Ok(())
    }
}

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    scratch_dir: PathBuf,
    output_dir: PathBuf,
    default_logo_path: PathBuf,
    logo_store_dir: PathBuf,
    settings_path: PathBuf,
    engine: EngineConfig,
    retention: ScratchRetention,
    log_tail_lines: usize,
    layout: LayoutConfig,
}

impl CoreConfig {
    /// Create a new `CoreConfig` with default engine, logo, settings and layout.
    pub fn new(scratch_dir: PathBuf, output_dir: PathBuf) -> Self {
        Self {
            scratch_dir,
            output_dir,
            default_logo_path: PathBuf::from(DEFAULT_LOGO_PATH),
            logo_store_dir: PathBuf::from(DEFAULT_LOGO_STORE_DIR),
            settings_path: PathBuf::from(DEFAULT_SETTINGS_PATH),
            engine: EngineConfig::default(),
            retention: ScratchRetention::default(),
            log_tail_lines: DEFAULT_LOG_TAIL_LINES,
            layout: LayoutConfig::default(),
        }
    }

    pub fn with_default_logo(mut self, path: PathBuf) -> Self {
        self.default_logo_path = path;
        self
    }

    pub fn with_logo_store_dir(mut self, path: PathBuf) -> Self {
        self.logo_store_dir = path;
        self
    }

    pub fn with_settings_path(mut self, path: PathBuf) -> Self {
        self.settings_path = path;
        self
    }

    pub fn with_engine(mut self, engine: EngineConfig) -> Self {
        self.engine = engine;
        self
    }

    pub fn with_retention(mut self, retention: ScratchRetention) -> Self {
        self.retention = retention;
        self
    }

    pub fn with_log_tail_lines(mut self, lines: usize) -> Self {
        self.log_tail_lines = lines;
        self
    }

    /// Replaces the layout after validating it.
    ///
    /// # Errors
    ///
    /// Returns `ChartError::InvalidInput` if the layout fails [`LayoutConfig::validate`].
    pub fn with_layout(mut self, layout: LayoutConfig) -> ChartResult<Self> {
        layout.validate()?;
        self.layout = layout;
        Ok(self)
    }

    pub fn scratch_dir(&self) -> &Path {
        &self.scratch_dir
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn default_logo_path(&self) -> &Path {
        &self.default_logo_path
    }

    pub fn logo_store_dir(&self) -> &Path {
        &self.logo_store_dir
    }

    pub fn settings_path(&self) -> &Path {
        &self.settings_path
    }

    pub fn engine(&self) -> &EngineConfig {
        &self.engine
    }

    pub fn retention(&self) -> ScratchRetention {
        self.retention
    }

    pub fn log_tail_lines(&self) -> usize {
        self.log_tail_lines
    }

    pub fn layout(&self) -> &LayoutConfig {
        &self.layout
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retention_parses_variants() {
        assert_eq!(
            "discard".parse::<ScratchRetention>().unwrap(),
            ScratchRetention::Discard
        );
        assert_eq!(
            "Keep_With_Log".parse::<ScratchRetention>().unwrap(),
            ScratchRetention::KeepWithLog
        );
        assert_eq!(
            " keep-all ".parse::<ScratchRetention>().unwrap(),
            ScratchRetention::KeepAll
        );
        assert!("sometimes".parse::<ScratchRetention>().is_err());
    }

    #[test]
    fn test_retention_from_env_value_defaults() {
        assert_eq!(
            scratch_retention_from_env_value(None).unwrap(),
            ScratchRetention::Discard
        );
        assert_eq!(
            scratch_retention_from_env_value(Some("   ".into())).unwrap(),
            ScratchRetention::Discard
        );
        assert_eq!(
            scratch_retention_from_env_value(Some("keep-with-log".into())).unwrap(),
            ScratchRetention::KeepWithLog
        );
    }

    #[test]
    fn test_engine_bare_program_gets_default_args() {
        let engine = EngineConfig::from_command_line("lualatex").unwrap();
        assert_eq!(engine.program().as_str(), "lualatex");
        assert_eq!(engine.args(), EngineConfig::pdflatex().args());
    }

    #[test]
    fn test_engine_explicit_args_are_verbatim() {
        let engine = EngineConfig::from_command_line("tectonic --outdir {workdir} {source}").unwrap();
        assert_eq!(engine.program().as_str(), "tectonic");
        assert_eq!(engine.args(), ["--outdir", "{workdir}", "{source}"]);
    }

    #[test]
    fn test_engine_rejects_blank_command() {
        let err = EngineConfig::from_command_line("   ").expect_err("blank command");
        assert!(matches!(err, ChartError::InvalidInput(msg) if msg.contains("cannot be empty")));
    }

    #[test]
    fn test_engine_resolves_placeholders() {
        let engine = EngineConfig::pdflatex();
        let args = engine.resolve_args(Path::new("/tmp/run/chart.tex"), Path::new("/tmp/run"));
        assert_eq!(
            args,
            vec![
                OsString::from("-interaction=nonstopmode"),
                OsString::from("-halt-on-error"),
                OsString::from("-output-directory=/tmp/run"),
                OsString::from("/tmp/run/chart.tex"),
            ]
        );
    }

    #[test]
    fn test_layout_rejects_zero_wrap() {
        let layout = LayoutConfig {
            label_wrap_chars: 0,
            ..LayoutConfig::default()
        };
        assert!(matches!(
            layout.validate(),
            Err(ChartError::InvalidInput(msg)) if msg.contains("wrap widths")
        ));
    }

    #[test]
    fn test_layout_rejects_negative_width() {
        let layout = LayoutConfig {
            day_column_cm: -1.0,
            ..LayoutConfig::default()
        };
        assert!(matches!(
            layout.validate(),
            Err(ChartError::InvalidInput(msg)) if msg.contains("day_column_cm")
        ));
    }

    #[test]
    fn test_core_config_builder() {
        let cfg = CoreConfig::new("s".into(), "o".into())
            .with_retention(ScratchRetention::KeepAll)
            .with_log_tail_lines(5)
            .with_layout(LayoutConfig::default())
            .unwrap();
        assert_eq!(cfg.scratch_dir(), Path::new("s"));
        assert_eq!(cfg.output_dir(), Path::new("o"));
        assert_eq!(cfg.retention(), ScratchRetention::KeepAll);
        assert_eq!(cfg.log_tail_lines(), 5);
        assert_eq!(cfg.default_logo_path(), Path::new(DEFAULT_LOGO_PATH));
    }
}
