//! Constants used throughout the wardchart core crate.
//!
//! Path names, record keys and presentation defaults live here so that the reader, shaper and
//! renderers agree on them.

/// Default directory for per-invocation scratch work.
pub const DEFAULT_SCRATCH_DIR: &str = "scratch";

/// Default directory for finished chart artifacts.
pub const DEFAULT_OUTPUT_DIR: &str = "GENERATED_PDFS";

/// Default bundled logo shipped with the application.
pub const DEFAULT_LOGO_PATH: &str = "RESOURCES/default_logo.png";

/// Default directory for uploaded site logos.
pub const DEFAULT_LOGO_STORE_DIR: &str = "RESOURCES/logo";

/// Default settings file.
pub const DEFAULT_SETTINGS_PATH: &str = "RESOURCES/settings.json";

/// Default typesetting engine executable.
pub const DEFAULT_ENGINE: &str = "pdflatex";

/// Placeholder replaced by the scratch source path in engine arguments.
pub const SOURCE_PLACEHOLDER: &str = "{source}";

/// Placeholder replaced by the per-invocation working directory in engine arguments.
pub const WORKDIR_PLACEHOLDER: &str = "{workdir}";

/// File stem of the page description written for each invocation.
pub const SOURCE_STEM: &str = "chart";

/// Extension of the page description.
pub const SOURCE_EXTENSION: &str = "tex";

/// Extension of the artifact the engine produces.
pub const ARTIFACT_EXTENSION: &str = "pdf";

/// Extension of the engine's own log file.
pub const LOG_EXTENSION: &str = "log";

/// Number of log lines attached to a render error by default.
pub const DEFAULT_LOG_TAIL_LINES: usize = 40;

/// Default base font size in points.
pub const DEFAULT_FONT_SIZE: u32 = 9;

/// Default chart heading when no settings file exists.
pub const DEFAULT_HEADING: &str = "Treatment Chart";

/// Label that selects the emphasised parameter row.
pub const DATE_LABEL: &str = "date";

// Record keys. Capitalised patient keys are authoritative; lowercase keys are accepted as a
// fallback for records written by older forms.
pub const KEY_NAME: &str = "Name";
pub const KEY_AGE_YEARS: &str = "Age_year";
pub const KEY_AGE_MONTHS: &str = "Age_month";
pub const KEY_SEX: &str = "Sex";
pub const KEY_BED: &str = "bed_number";
pub const KEY_BED_ALIAS: &str = "Bed_Number";
pub const KEY_UHID: &str = "uhid";
pub const KEY_DIAGNOSIS: &str = "Diagnosis";
pub const KEY_CONSULTANTS: &str = "Consultants";
pub const KEY_JUNIOR_RESIDENTS: &str = "JR";
pub const KEY_SENIOR_RESIDENTS: &str = "SR";
pub const KEY_ENTRY_GROUPS: &str = "each_entry_layout";
pub const KEY_ENTRY_GROUPS_ALIAS: &str = "entries";
pub const KEY_PARAMETER_ROWS: &str = "each_table_row_layout";
pub const KEY_PARAMETER_ROWS_ALIAS: &str = "parameters";
pub const KEY_GROUP_TITLE: &str = "title";
pub const KEY_GROUP_COLUMNS: &str = "columns";
pub const KEY_GROUP_SUBTITLES: &str = "subtitles";
pub const KEY_ROW_CONTENT: &str = "content";
pub const KEY_PARAMETER_LABEL: &str = "row_header_name";
pub const KEY_PARAMETER_DESCRIPTION: &str = "row_header_description";
