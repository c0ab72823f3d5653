//! Run parameters
//!
//! [`CubeParams`] is the raw, JSON-decoded parameter set of a cube run. Every string
//! in it is checked once in [`CubeParams::pipeline`], which turns it into a typed
//! [`Pipeline`]. Nothing downstream ever matches on a mode or aggregate string.

use crate::aggregate::{Accumulation, Aggregator};
use crate::binning::OutOfRangePolicy;
use crate::errors::{GeoCubeError, Result};
use crate::grid::{GridBuilder, IntegrationMode, ReferenceSelection, DEFAULT_BUFFER_EDGE};
use crate::model::{Crs, Cube, Grid, SampleArray};
use crate::parallel::ParallelConfig;
use crate::precision::Precision;
use crate::statistics::Aggregate;
use serde::{Deserialize, Serialize};
use std::path::Path;

fn default_buffer_edge() -> Option<f64> {
    Some(DEFAULT_BUFFER_EDGE)
}

fn default_out_of_range() -> String {
    OutOfRangePolicy::default().as_str().to_string()
}

fn default_accumulation() -> String {
    Accumulation::default().as_str().to_string()
}

fn default_reference_selection() -> String {
    "lexical".to_string()
}

/// Parameters of one cube run as they appear in a parameter file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CubeParams {
    /// `spatiotemporal`, `spatial` or `temporal`
    pub integration: String,
    /// Spatial bin size in units of the coordinate reference
    pub resolution: f64,
    /// Time step code, e.g. `D` or `6h`
    pub precision: String,
    /// Reductions to compute, in output order
    pub aggregates: Vec<String>,
    #[serde(default)]
    pub target_epsg: Option<u32>,
    /// Missing means the default buffer, an explicit `null` disables buffering
    #[serde(default = "default_buffer_edge")]
    pub buffer_edge: Option<f64>,
    #[serde(default = "default_out_of_range")]
    pub out_of_range: String,
    #[serde(default = "default_accumulation")]
    pub accumulation: String,
    #[serde(default = "default_reference_selection")]
    pub reference_selection: String,
    /// Reduction threads, missing means one per core
    #[serde(default)]
    pub threads: Option<usize>,
}

impl CubeParams {
    /// # Errors
    ///
    /// Returns `JsonError` for malformed input.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// # Errors
    ///
    /// Returns `IoError` if the file cannot be read, `JsonError` if it cannot be decoded.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Validate every parameter and build the typed pipeline
    ///
    /// # Errors
    ///
    /// `UnsupportedMode`, `UnsupportedAggregate`, `InvalidPrecision` or
    /// `InvalidParameter` naming the first offending value.
    pub fn pipeline(&self) -> Result<Pipeline> {
        let mode: IntegrationMode = self.integration.parse()?;
        let precision: Precision = self.precision.parse()?;
        let aggregates = Aggregate::parse_all(&self.aggregates)?;
        if aggregates.is_empty() {
            return Err(GeoCubeError::InvalidParameter {
                message: "at least one aggregate is required".to_string(),
            });
        }
        let out_of_range: OutOfRangePolicy = self.out_of_range.parse()?;
        let accumulation: Accumulation = self.accumulation.parse()?;
        let selection: ReferenceSelection = self.reference_selection.parse()?;
        let parallel = ParallelConfig::new(self.threads);
        parallel.validate()?;

        let grid_builder = GridBuilder::new(mode, self.resolution, precision)?
            .with_target_reference(self.target_epsg.map(Crs::from_epsg))
            .with_buffer_edge(self.buffer_edge)?
            .with_reference_selection(selection);

        let aggregator = Aggregator::new(aggregates)
            .with_out_of_range(out_of_range)
            .with_accumulation(accumulation);

        Ok(Pipeline {
            grid_builder,
            aggregator,
            parallel,
        })
    }
}

/// Validated grid construction plus aggregation
#[derive(Debug, Clone, PartialEq)]
pub struct Pipeline {
    pub grid_builder: GridBuilder,
    pub aggregator: Aggregator,
    /// Pool the binary installs before running, [`Pipeline::run`] itself uses
    /// whatever global pool is current
    pub parallel: ParallelConfig,
}

impl Pipeline {
    /// # Errors
    ///
    /// See [`GridBuilder::build`].
    pub fn build_grid(&self, arrays: &[SampleArray]) -> Result<Grid> {
        self.grid_builder.build(arrays)
    }

    /// Build the grid for `arrays` and aggregate them onto it
    ///
    /// # Errors
    ///
    /// Propagates grid construction and aggregation errors.
    pub fn run(&self, arrays: &[SampleArray]) -> Result<Cube> {
        let grid = self.build_grid(arrays)?;
        self.aggregator.aggregate(arrays, &grid)
    }
}
