//! # Wardchart Core
//!
//! Layout engine for printable ward treatment charts.
//!
//! A treatment record (patient fields, entry groups of treatment rows, and label/value
//! parameter rows) is laid out into a single-page LaTeX description and handed to an external
//! typesetting engine:
//!
//! - [`normalize`]: strips literal backslash sequences from every string in the record
//! - [`sanitize`]: escapes clinician text for embedding in the page description
//! - [`record`] / [`shaper`]: best-effort record reading, column inference and table shaping
//! - [`table`] / [`parameters`]: treatment and parameter table fragments
//! - [`compose`]: the full page with header, patient block, body and signature annotations
//! - [`render`]: the engine subprocess, per-run scratch directories and artifact placement
//! - [`chart`]: the [`ChartService`] pipeline tying these together
//!
//! **No front-end concerns**: argument parsing, environment handling and subscriber setup
//! belong in the `wardchart` binary.

pub mod chart;
pub mod compose;
pub mod config;
pub mod constants;
pub mod error;
pub mod filename;
pub mod normalize;
pub mod parameters;
pub mod record;
pub mod render;
pub mod sanitize;
pub mod settings;
pub mod shaper;
pub mod table;

pub use chart::{ChartCheck, ChartPreview, ChartService, GeneratedChart};
pub use compose::{LogoSource, PageComposer, PageDescription, PageFragment};
pub use config::{
    scratch_retention_from_env_value, CoreConfig, EngineConfig, LayoutConfig, ScratchRetention,
};
pub use error::{ChartError, ChartResult, RenderError, RenderFailure};
pub use normalize::{normalize_record, NormalizedRecord};
pub use parameters::ParameterTableRenderer;
pub use record::{Column, ShapingWarning, TreatmentRecord};
pub use render::{Artifact, RenderInvoker};
pub use sanitize::{SafeText, Sanitizer};
pub use settings::{ChartSettings, SettingsStore};
pub use shaper::{PatientFields, RecordShaper, ShapedChart, TableDescriptor};
pub use table::TableRenderer;

pub use wardchart_ids::RunId;
pub use wardchart_types::NonEmptyText;
