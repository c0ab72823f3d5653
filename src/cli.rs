//! Defines command-line interface options using `clap` for the geocube application.

use clap::Parser;
use std::path::PathBuf;

/// Build a regular space/time cube from standardized sample arrays
#[derive(Parser, Debug)]
#[command(
    version,
    name = "geocube",
    about = "Aggregates irregular geospatial sample arrays onto a common grid"
)]
pub struct Args {
    /// Path to the JSON run parameters
    #[arg(short, long)]
    pub params: PathBuf,

    /// Directory holding `<name>.array.json` sample arrays
    #[arg(short, long)]
    pub arrays: PathBuf,

    /// Override the integration mode, one of spatiotemporal, spatial, temporal
    #[arg(long)]
    pub integration: Option<String>,

    /// Override the aggregates, comma separated, e.g. mean,sum,count
    #[arg(long, value_delimiter = ',')]
    pub aggregates: Option<Vec<String>>,

    /// Override the target coordinate reference with an EPSG code
    #[arg(long)]
    pub target_epsg: Option<u32>,

    /// EPSG code assumed for arrays that carry no coordinate reference
    #[arg(long)]
    pub assume_epsg: Option<u32>,

    /// Enable verbose output.
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Override the number of reduction threads. Defaults to number of CPU cores.
    #[arg(short = 't', long)]
    pub threads: Option<usize>,
}
