//! The chart generation pipeline.
//!
//! ```text
//! record JSON ─ normalize ─ read ─ shape ─┬─ TableRenderer ──────────┐
//!                                         └─ ParameterTableRenderer ─┴─ PageComposer ─ RenderInvoker
//! ```
//!
//! One call is one synchronous pipeline run. Services share nothing mutable between calls
//! except the run id generator, so a single [`ChartService`] can serve concurrent requests.

use crate::compose::{LogoSource, PageComposer, PageDescription, PageFragment};
use crate::config::CoreConfig;
use crate::filename::artifact_stem;
use crate::normalize::normalize_record;
use crate::parameters::ParameterTableRenderer;
use crate::record::{ShapingWarning, TreatmentRecord};
use crate::render::{Artifact, RenderInvoker};
use crate::sanitize::Sanitizer;
use crate::settings::SettingsStore;
use crate::shaper::{RecordShaper, ShapedChart};
use crate::table::TableRenderer;
use crate::ChartResult;
use serde_json::Value;
use std::sync::Arc;
use wardchart_ids::RunIdGenerator;

/// A rendered chart and the warnings raised while reading its record.
#[derive(Clone, Debug)]
pub struct GeneratedChart {
    pub artifact: Artifact,
    pub warnings: Vec<ShapingWarning>,
}

/// A composed page description that was not sent to the engine.
#[derive(Clone, Debug)]
pub struct ChartPreview {
    pub page: PageDescription,
    pub warnings: Vec<ShapingWarning>,
}

/// The shaped form of a record, for validation without rendering.
#[derive(Clone, Debug)]
pub struct ChartCheck {
    pub chart: ShapedChart,
    pub warnings: Vec<ShapingWarning>,
}

/// Record read and shaped, ready for rendering.
struct Prepared {
    record: TreatmentRecord,
    chart: ShapedChart,
    warnings: Vec<ShapingWarning>,
}

pub struct ChartService {
    shaper: RecordShaper,
    tables: TableRenderer,
    parameters: ParameterTableRenderer,
    composer: PageComposer,
    invoker: RenderInvoker,
    settings: SettingsStore,
    run_ids: RunIdGenerator,
}

impl ChartService {
    /// Creates a new instance of `ChartService`.
    ///
    /// # Arguments
    ///
    /// * `cfg` - Core configuration resolved at startup
    pub fn new(cfg: Arc<CoreConfig>) -> Self {
        let sanitizer = Sanitizer::latex();
        let layout = cfg.layout().clone();

        Self {
            shaper: RecordShaper::new(sanitizer.clone()),
            tables: TableRenderer::new(layout.clone()),
            parameters: ParameterTableRenderer::new(sanitizer.clone(), layout),
            composer: PageComposer::new(
                sanitizer,
                LogoSource::new(
                    cfg.logo_store_dir().to_path_buf(),
                    cfg.default_logo_path().to_path_buf(),
                ),
            ),
            invoker: RenderInvoker::new(&cfg),
            settings: SettingsStore::new(cfg.settings_path().to_path_buf()),
            run_ids: RunIdGenerator::new(),
        }
    }

    /// Generates a chart document from a record.
    ///
    /// # Arguments
    ///
    /// * `record` - The raw treatment record JSON
    ///
    /// # Returns
    ///
    /// The artifact in the output directory, named `<name>_<uhid>_<run id>.pdf`, together with
    /// any shaping warnings.
    ///
    /// # Errors
    ///
    /// Returns `ChartError::Composition` for a non-string heading or subheading,
    /// `ChartError::Render` if the engine fails, and a resource error if settings, logo,
    /// scratch or output files cannot be handled.
    pub fn generate(&self, record: Value) -> ChartResult<GeneratedChart> {
        let Prepared {
            record,
            chart,
            warnings,
        } = self.prepare(record);
        let page = self.compose(&chart)?;

        let run_id = self.run_ids.next_id();
        let stem = artifact_stem(&record.name, &record.uhid, &run_id);

        let artifact = self.invoker.invoke(page, &run_id, &stem)?;
        Ok(GeneratedChart { artifact, warnings })
    }

    /// Composes the page description without running the engine.
    ///
    /// # Errors
    ///
    /// As [`ChartService::generate`], minus engine and output failures.
    pub fn preview(&self, record: Value) -> ChartResult<ChartPreview> {
        let Prepared {
            chart, warnings, ..
        } = self.prepare(record);
        let page = self.compose(&chart)?;
        Ok(ChartPreview { page, warnings })
    }

    /// Reads and shapes a record without rendering it. Never fails.
    pub fn check(&self, record: Value) -> ChartCheck {
        let Prepared {
            chart, warnings, ..
        } = self.prepare(record);
        ChartCheck { chart, warnings }
    }

    fn prepare(&self, record: Value) -> Prepared {
        let normalized = normalize_record(record);
        let (record, warnings) = TreatmentRecord::from_json(&normalized);
        let chart = self.shaper.shape(&record);

        tracing::debug!(
            tables = chart.tables.len(),
            parameter_rows = chart.parameters.len(),
            warnings = warnings.len(),
            "record shaped"
        );

        Prepared {
            record,
            chart,
            warnings,
        }
    }

    fn compose(&self, chart: &ShapedChart) -> ChartResult<PageDescription> {
        let settings = self.settings.load()?;
        let fragments: Vec<PageFragment> = chart
            .tables
            .iter()
            .filter_map(|table| self.tables.render(table))
            .collect();
        let parameters = self.parameters.render(&chart.parameters);

        let site_composer;
        let composer = match settings.logo_path {
            Some(logo) => {
                site_composer = self.composer.with_default_logo(logo);
                &site_composer
            }
            None => &self.composer,
        };

        composer.compose(
            &settings.heading,
            &settings.subheading,
            &chart.patient,
            &fragments,
            &parameters,
            settings.font_size,
        )
    }
}
