use std::path::PathBuf;

use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use tracing::info;
use trailsheet::config::ExpectedTabs;
use trailsheet::config::TraceConfig;
use trailsheet::logging::init_logging;
use trailsheet::logging::DEFAULT_LOG_LEVEL;

#[derive(Parser)]
#[command(about = "Map hiking progress from a tracing workbook onto trail geometry.")]
struct Args {
    /// Tracing workbook (.xls or .xlsx).
    #[arg(long)]
    workbook: PathBuf,

    /// JSON object mapping expected tab names to guidebook section labels.
    #[arg(long)]
    tabs: PathBuf,

    /// GeoJSON trail geometry with `Trail_ID` / `Alt_ID` properties.
    #[arg(long)]
    geometry: PathBuf,

    /// Peaks CSV (`Peak,Elevation,LAT,LNG`).
    #[arg(long)]
    peaks: Option<PathBuf>,

    /// Where to write the GeoJSON layers (default: stdout).
    #[arg(long)]
    output: Option<PathBuf>,

    /// Log level used when RUST_LOG is not set.
    #[arg(long, default_value = DEFAULT_LOG_LEVEL)]
    log_level: String,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level);

    let expected_tabs = ExpectedTabs::from_json_path(&args.tabs)
        .with_context(|| format!("Failed to read expected tabs from '{}'", args.tabs.display()))?;
    let config = TraceConfig {
        workbook: args.workbook,
        expected_tabs,
        geometry: args.geometry,
        peaks: args.peaks,
    };

    let outcome = trailsheet::trace_workbook(&config).with_context(|| {
        let peaks = config.peaks.as_ref().map(|path| format!(", peaks '{}'", path.display())).unwrap_or_default();
        format!(
            "Failed to trace workbook '{}' (geometry '{}'{peaks})",
            config.workbook.display(),
            config.geometry.display()
        )
    })?;
    info!(edition = %outcome.edition, "workbook edition");

    let layers = outcome.layers(&config.expected_tabs);
    match &args.output {
        Some(path) => {
            layers
                .write_to(path)
                .with_context(|| format!("Failed to write layers to '{}'", path.display()))?;
            info!(path = %path.display(), features = layers.features.len(), "wrote map layers");
        }
        None => println!("{}", layers.to_json()?),
    }

    // Layers on stdout keep it pure GeoJSON; the report then goes to stderr.
    if let Some(report) = outcome.report() {
        match args.output {
            Some(_) => println!("{report}"),
            None => eprintln!("{report}"),
        }
    }
    Ok(())
}
