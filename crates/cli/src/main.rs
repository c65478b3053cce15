use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use wardchart_core::constants::{
    DEFAULT_LOGO_PATH, DEFAULT_LOGO_STORE_DIR, DEFAULT_OUTPUT_DIR, DEFAULT_SCRATCH_DIR,
    DEFAULT_SETTINGS_PATH,
};
use wardchart_core::{
    scratch_retention_from_env_value, ChartError, ChartService, CoreConfig, EngineConfig,
    ShapingWarning,
};
use wardchart_files::LogoStore;

#[derive(Parser)]
#[command(name = "wardchart")]
#[command(about = "Ward treatment chart renderer")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a treatment record to a chart document
    Render {
        /// Path to the record JSON
        record: PathBuf,
    },
    /// Print the page description without running the typesetting engine
    Preview {
        /// Path to the record JSON
        record: PathBuf,
        /// Write the page description to this file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Read and shape a record, reporting anything that would be skipped
    Check {
        /// Path to the record JSON
        record: PathBuf,
    },
    /// Upload a PNG or JPEG image as the site logo
    UploadLogo {
        /// Path to the image
        image: PathBuf,
    },
}

/// Entry point for the wardchart command-line tool
///
/// # Environment Variables
/// - `WARDCHART_SCRATCH_DIR`: Per-run working directories (default: "scratch")
/// - `WARDCHART_OUTPUT_DIR`: Finished charts (default: "GENERATED_PDFS")
/// - `WARDCHART_DEFAULT_LOGO`: Bundled fallback logo (default: "RESOURCES/default_logo.png")
/// - `WARDCHART_LOGO_DIR`: Uploaded logo store (default: "RESOURCES/logo")
/// - `WARDCHART_SETTINGS`: Heading/subheading/font size JSON (default: "RESOURCES/settings.json")
/// - `WARDCHART_ENGINE`: Engine command line, `{source}` and `{workdir}` are substituted
///   (default: "pdflatex")
/// - `WARDCHART_RETENTION`: `discard`, `keep-with-log` or `keep-all` (default: "discard")
fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("wardchart=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let cfg = Arc::new(config_from_lookup(|key| std::env::var(key).ok())?);
    tracing::debug!(
        scratch_dir = %cfg.scratch_dir().display(),
        output_dir = %cfg.output_dir().display(),
        engine = %cfg.engine().program(),
        "configuration resolved"
    );

    match cli.command {
        Commands::Render { record } => {
            let service = ChartService::new(cfg);
            match service.generate(read_record(&record)?) {
                Ok(generated) => {
                    print_warnings(&generated.warnings);
                    println!(
                        "{} ({} bytes, generated {})",
                        generated.artifact.path.display(),
                        generated.artifact.size_bytes,
                        generated.artifact.generated_at().to_rfc3339()
                    );
                }
                Err(ChartError::Render(render)) => {
                    eprintln!("{}", render);
                    eprintln!("working directory: {}", render.workdir.display());
                    if !render.stdout.trim().is_empty() {
                        eprintln!("--- engine stdout ---\n{}", render.stdout.trim_end());
                    }
                    if !render.stderr.trim().is_empty() {
                        eprintln!("--- engine stderr ---\n{}", render.stderr.trim_end());
                    }
                    if let Some(tail) = &render.log_tail {
                        eprintln!("--- engine log (tail) ---\n{}", tail);
                    }
                    anyhow::bail!("chart was not rendered");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Commands::Preview { record, output } => {
            let service = ChartService::new(cfg);
            let preview = service.preview(read_record(&record)?)?;
            print_warnings(&preview.warnings);
            match output {
                Some(path) => {
                    std::fs::write(&path, preview.page.as_str())
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    println!("{}", path.display());
                }
                None => print!("{}", preview.page),
            }
        }
        Commands::Check { record } => {
            let service = ChartService::new(cfg);
            let check = service.check(read_record(&record)?);
            for table in &check.chart.tables {
                let columns: Vec<&str> = table.columns.iter().map(|c| c.key()).collect();
                println!(
                    "table '{}': {} row(s), columns [{}]",
                    table.title,
                    table.rows.len(),
                    columns.join(", ")
                );
            }
            println!("parameter rows: {}", check.chart.parameters.len());
            print_warnings(&check.warnings);
            if check.warnings.is_empty() {
                println!("no problems found");
            }
        }
        Commands::UploadLogo { image } => {
            let store = LogoStore::new(cfg.logo_store_dir())?;
            let metadata = store.upload(&image)?;
            println!("{}", serde_json::to_string_pretty(&metadata)?);
        }
    }

    Ok(())
}

/// Builds the core configuration from a variable lookup.
fn config_from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<CoreConfig> {
    let path = |key: &str, default: &str| {
        lookup(key)
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(default))
    };

    let mut cfg = CoreConfig::new(
        path("WARDCHART_SCRATCH_DIR", DEFAULT_SCRATCH_DIR),
        path("WARDCHART_OUTPUT_DIR", DEFAULT_OUTPUT_DIR),
    )
    .with_default_logo(path("WARDCHART_DEFAULT_LOGO", DEFAULT_LOGO_PATH))
    .with_logo_store_dir(path("WARDCHART_LOGO_DIR", DEFAULT_LOGO_STORE_DIR))
    .with_settings_path(path("WARDCHART_SETTINGS", DEFAULT_SETTINGS_PATH))
    .with_retention(scratch_retention_from_env_value(lookup("WARDCHART_RETENTION"))?);

    if let Some(engine) = lookup("WARDCHART_ENGINE").filter(|v| !v.trim().is_empty()) {
        cfg = cfg.with_engine(EngineConfig::from_command_line(&engine)?);
    }

    Ok(cfg)
}

fn read_record(path: &Path) -> anyhow::Result<serde_json::Value> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read record {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("record {} is not valid JSON", path.display()))
}

fn print_warnings(warnings: &[ShapingWarning]) {
    for warning in warnings {
        eprintln!("warning: {}", warning);
    }
}
