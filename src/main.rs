use clap::Parser;
use geovox::{
    config::GeovoxConfig,
    orchestrator::{GenerationOrchestrator, SurfaceHook},
    progress::TracingProgress,
    projection::{ProjectionFrame, Region},
    stages::build_stages,
    world::MemoryWorld,
};
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to geovox.toml configuration file
    #[arg(short, long, default_value = "./geovox.toml")]
    config: String,

    /// Input payload (coords.json); overrides the configured one
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Sidecar store directory; overrides the configured one
    #[arg(short, long)]
    store_dir: Option<PathBuf>,

    /// Read features from the payload only, without a sidecar store
    #[arg(long)]
    no_store: bool,

    /// Override log level (trace|debug|info|warn|error)
    #[arg(short, long)]
    log_level: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,
}

/// Player repositioning belongs to the host; the CLI only reports it.
struct LogSurfaceHook;

impl SurfaceHook for LogSurfaceHook {
    fn terrain_ready(&mut self, _frame: &ProjectionFrame, region: Region) {
        info!(
            "Terrain reshaped over x {}..={} z {}..={}",
            region.min_x, region.max_x, region.min_z, region.max_z
        );
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let mut config = GeovoxConfig::load_or_default(&args.config);

    let log_level = args
        .log_level
        .clone()
        .unwrap_or_else(|| config.logging.level.clone());
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level));
    if args.json_logs {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    info!("Starting geovox v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration loaded from: {}", args.config);

    if let Some(input) = args.input {
        config.generation.input = input;
    }
    if let Some(dir) = args.store_dir {
        config.generation.store_dir = Some(dir);
    }
    if args.no_store {
        config.generation.store_dir = None;
    }

    let stages = build_stages(&config.stages.enabled, &config.terrain.surface_material);
    if stages.is_empty() {
        warn!("No stages enabled, nothing will be placed");
    }
    let mut orchestrator = GenerationOrchestrator::new(config.orchestrator_options(), stages)
        .with_surface_hook(Box::new(LogSurfaceHook));
    info!("Stages: {}", orchestrator.stage_names().join(", "));

    let mut world = MemoryWorld::new(config.vertical_range());
    let report = orchestrator.run_file(&config.generation.input, &mut world, &mut TracingProgress);
    info!(
        "World holds {} blocks after {} writes",
        world.block_count(),
        world.write_count()
    );
    println!("{}", serde_json::to_string_pretty(&report)?);

    match report.error {
        Some(message) => Err(message.into()),
        None => Ok(()),
    }
}
