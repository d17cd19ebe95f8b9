mod runner;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use algpool_core::infrastructure_in_memory::ConfiguredFactory;
use algpool_core::{AlgResourcePool, Manifest, PoolError};
use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "algpool",
    about = "Algorithm resource pool: unroll sequencers, clone units, reserve resources",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a pool from a manifest and print its control flow
    Graph {
        /// JSON manifest with the pool options and unit definitions
        #[arg(short, long, env = "ALGPOOL_CONFIG")]
        config: PathBuf,
    },

    /// Run synthetic events through the pool on concurrent workers
    Run {
        #[arg(short, long, env = "ALGPOOL_CONFIG")]
        config: PathBuf,

        /// Number of events to process
        #[arg(short, long, default_value = "100")]
        events: usize,

        /// Number of worker threads
        #[arg(short, long, default_value = "4")]
        workers: usize,
    },

    /// Print version information
    Version,
}

/// Builds and initializes a pool. With `strict` unset, units that failed to
/// set up are reported and the rest of the pool is kept.
fn load_pool(path: &Path, strict: bool) -> Result<AlgResourcePool> {
    let input = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read manifest {}", path.display()))?;
    let manifest = Manifest::from_json(&input)
        .with_context(|| format!("invalid manifest {}", path.display()))?;

    let factory = Arc::new(ConfiguredFactory::new(manifest.units));
    let mut pool = AlgResourcePool::new(manifest.pool, factory);
    match pool.initialize() {
        Ok(()) => Ok(pool),
        Err(PoolError::Initialization(failures)) if !strict => {
            for failure in &failures {
                tracing::warn!("{}", failure);
            }
            Ok(pool)
        }
        Err(e) => Err(e).context("pool initialization failed"),
    }
}

fn print_graph(pool: &AlgResourcePool) {
    println!("Control flow:");
    print!("{}", pool.graph().dump_control_flow());

    println!("\nFlat algorithm list:");
    for unit in pool.flat_algorithm_list() {
        let allowed = pool
            .instance_counts(unit.name())
            .map_or(0, |counts| counts.allowed);
        println!("  o {} (instances: {})", unit.type_name_ref(), allowed);
    }

    let resources = pool.resources().resource_names();
    if !resources.is_empty() {
        println!("\nResources: {}", resources.join(", "));
    }
}

async fn run_events(path: &Path, events: usize, workers: usize) -> Result<()> {
    if workers == 0 {
        bail!("at least one worker is required");
    }
    let mut pool = load_pool(path, true)?;
    pool.start()?;
    pool.begin_run()?;

    tracing::info!(events, workers, "Processing events");
    let pool = Arc::new(pool);
    let stats = runner::run(Arc::clone(&pool), events, workers).await?;

    let mut pool = Arc::try_unwrap(pool).map_err(|_| anyhow!("pool still shared after the run"))?;
    pool.end_run()?;
    pool.stop()?;
    pool.finalize()?;

    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Graph { config } => {
            let pool = load_pool(&config, false)?;
            print_graph(&pool);
        }
        Commands::Run {
            config,
            events,
            workers,
        } => {
            run_events(&config, events, workers).await?;
        }
        Commands::Version => {
            println!("algpool {}", env!("CARGO_PKG_VERSION"));
            println!("Algorithm resource pool for concurrent event processing");
        }
    }
    Ok(())
}
