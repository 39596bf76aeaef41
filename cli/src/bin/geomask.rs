use clap::{Parser, Subcommand};
use cli::{CapabilitiesSummary, ConvertJob, load_config, schema_document};
use color_eyre::eyre::Result;
use geomask::GeoConverter;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{self, EnvFilter};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert model detections into a GeoJSON FeatureCollection
    Convert {
        /// Path to the detection JSON (prompts, masks, boxes, scores)
        #[arg(short, long)]
        detections: PathBuf,
        /// Path to the request file (image size, map bounds, colors) as JSON or TOML
        #[arg(short, long)]
        request: PathBuf,
        /// Path to the converter configuration as JSON or TOML
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Drop detections scoring below this confidence
        #[arg(long)]
        confidence: Option<f64>,
        /// Write GeoJSON here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Convert detections in parallel
        #[arg(long)]
        parallel: bool,
    },
    /// Show the geometry strategies this build resolves to
    Capabilities {
        /// Path to the converter configuration as JSON or TOML
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Print the JSON schema of the configuration and request files
    Schema,
}

fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Convert {
            detections,
            request,
            config,
            confidence,
            output,
            parallel,
        } => {
            let job = ConvertJob {
                detections,
                request,
                config,
                confidence,
                parallel,
            };
            convert(&job, output.as_deref())?;
        }
        Commands::Capabilities { config } => {
            let converter = GeoConverter::new(load_config(config.as_deref())?)?;
            print!("{}", CapabilitiesSummary::from_converter(&converter).to_toml()?);
        }
        Commands::Schema => {
            println!("{}", serde_json::to_string_pretty(&schema_document()?)?);
        }
    }

    Ok(())
}

fn convert(job: &ConvertJob, output: Option<&Path>) -> Result<()> {
    info!("Converting detections from {:?}", job.detections);
    let (collection, report) = job.run()?;

    for event in &report.events {
        warn!(
            "Prompt #{} detection #{}: {:?}",
            event.prompt_index, event.detection_index, event.degradation
        );
    }

    match output {
        Some(path) => {
            collection.save_geojson(path)?;
            info!("✅ Wrote {} features to {:?}", collection.len(), path);
        }
        None => println!("{}", collection.to_geojson_string_pretty()?),
    }

    Ok(())
}
