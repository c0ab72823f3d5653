//! Entry point for the geocube application.
//! Handles CLI parsing, parameter loading and array discovery, then builds the grid,
//! aggregates the cube and prints its summary.

use clap::Parser;
use geocube::config::CubeParams;
use geocube::data_source::{load_all, JsonArraySource};
use geocube::metadata::{print_summary, summarize_cube};
use geocube::model::Crs;
use geocube::parallel::get_parallel_info;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

mod cli;

use cli::Args;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command-line arguments
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let start = Instant::now();
    tracing::info!("geocube starting");

    let mut params = CubeParams::from_path(&args.params)?;
    if let Some(integration) = args.integration {
        params.integration = integration;
    }
    if let Some(aggregates) = args.aggregates {
        params.aggregates = aggregates;
    }
    if args.target_epsg.is_some() {
        params.target_epsg = args.target_epsg;
    }
    if args.threads.is_some() {
        params.threads = args.threads;
    }
    tracing::debug!(?params, "run parameters");

    // Reject bad parameters before touching any data
    let pipeline = params.pipeline()?;
    pipeline.parallel.setup_global_pool()?;
    get_parallel_info().log();

    let source = JsonArraySource::new(&args.arrays)
        .with_default_reference(args.assume_epsg.map(Crs::from_epsg));
    let arrays = load_all(&source).await?;

    let cube = pipeline.run(&arrays)?;
    print_summary(&summarize_cube(&cube));

    tracing::info!(
        elapsed = %format!("{:.2}s", start.elapsed().as_secs_f64()),
        "geocube finished"
    );
    Ok(())
}
