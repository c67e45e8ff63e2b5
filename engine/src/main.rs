use std::{path::PathBuf, time::Duration};

use chrono::Utc;
use clap::{Parser, ValueEnum};
use route_buddy::{
    export::saved_project_payload,
    import::import_file,
    view::{format_grid, format_route, format_statistics, render_table},
    DistanceMatrixEngine, EngineConfig, ExportFormat, LocationStore, Result,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum FormatArg {
    Csv,
    Json,
    Xlsx,
    All,
}

impl FormatArg {
    fn formats(self) -> Vec<ExportFormat> {
        match self {
            Self::Csv => vec![ExportFormat::Csv],
            Self::Json => vec![ExportFormat::Json],
            Self::Xlsx => vec![ExportFormat::Workbook],
            Self::All => ExportFormat::ALL.to_vec(),
        }
    }
}

/// Compute a distance matrix between imported locations and export it.
#[derive(Debug, Parser)]
#[command(name = "route-buddy", version)]
struct Cli {
    /// Locations file (.csv, .json, .xlsx or .xls)
    #[arg(short, long)]
    input: PathBuf,

    /// Export format
    #[arg(short, long, value_enum, default_value_t = FormatArg::Csv)]
    format: FormatArg,

    /// Directory receiving the exported files
    #[arg(short, long, default_value = ".")]
    out_dir: PathBuf,

    /// Seed for the road factor generator
    #[arg(long)]
    seed: Option<u64>,

    /// Simulated routing latency in milliseconds
    #[arg(long)]
    latency_ms: Option<u64>,

    /// Lower bound (inclusive) of the road factor
    #[arg(long)]
    road_factor_min: Option<f64>,

    /// Upper bound (exclusive) of the road factor
    #[arg(long)]
    road_factor_max: Option<f64>,

    /// Also write the saved project file
    #[arg(long)]
    save_project: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "route_buddy=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = EngineConfig::from_env()?;
    if let Some(seed) = cli.seed {
        config = config.with_seed(seed);
    }
    if let Some(latency_ms) = cli.latency_ms {
        config = config.with_latency(Duration::from_millis(latency_ms));
    }
    if cli.road_factor_min.is_some() || cli.road_factor_max.is_some() {
        let min = cli.road_factor_min.unwrap_or(config.road_factor_min);
        let max = cli.road_factor_max.unwrap_or(config.road_factor_max);
        config = config.with_road_factor(min, max);
    }
    let mut engine = DistanceMatrixEngine::from_config(&config)?;

    let report = import_file(&cli.input)?;
    if report.failure_count() > 0 {
        tracing::warn!(
            skipped = report.failure_count(),
            "some rows were ignored during import"
        );
    }

    let mut store = LocationStore::new();
    store.extend(report.locations)?;
    tracing::info!(locations = store.len(), "calculating distances");
    let matrix = store.compute_distances(&mut engine).await?.clone();

    println!("{}", format_grid(&render_table(store.locations(), &matrix)?));
    if let Some(stats) = store.statistics()? {
        println!();
        for line in format_statistics(store.locations(), &stats) {
            println!("{line}");
        }
    }
    println!();
    for line in format_route(store.locations()) {
        println!("{line}");
    }

    let now = Utc::now();
    let exporter = store.exporter()?;
    for format in cli.format.formats() {
        exporter.export(format, now)?.write_to(&cli.out_dir)?;
    }
    if cli.save_project {
        saved_project_payload(store.locations(), store.matrix(), now)?.write_to(&cli.out_dir)?;
    }

    Ok(())
}
