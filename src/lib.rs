//! geocube: regular space/time cubes from irregular sample arrays
//!
//! geocube takes a collection of independently sourced geospatial and temporal
//! sample arrays, each with its own coordinates, variables and coordinate reference,
//! and produces one regular cube: a common grid whose cells hold aggregate statistics
//! of the input variables.
//!
//! ## Pipeline
//!
//! - [`grid::GridBuilder`] reconciles the extents of all arrays into target axes
//! - [`binning::CoordinateBinner`] snaps each array's coordinates to grid bins
//! - [`aggregate::Aggregator`] groups binned records and reduces every variable
//! - [`merge::merge`] unions arrays when reconciliation rather than binning is wanted
//!
//! ## Module Organization
//!
//! - [`model`]: axes, sample arrays, grids and cubes
//! - [`precision`]: calendar steps of the time axis
//! - [`statistics`]: the aggregate registry and parallel group reduction
//! - [`config`]: run parameters and the typed pipeline
//! - [`data_source`]: the loader contract and JSON interchange files
//! - [`metadata`]: cube summaries
//! - [`parallel`]: parallel processing configuration
//! - [`errors`]: centralized error handling
//!
//! ## Usage Example
//! ```rust
//! use geocube::prelude::*;
//!
//! let axes = Axes::spatial(vec![0.5, 1.5], vec![0.4, 1.6]);
//! let a = SampleArray::new("a", axes, Some(Crs::from_epsg(4326)))?
//!     .with_values("v", vec![1.0, 2.0, 3.0, 4.0])?;
//!
//! let grid = GridBuilder::new(IntegrationMode::Spatial, 1.0, "D".parse()?)?
//!     .with_buffer_edge(Some(0.0))?
//!     .build(&[a.clone()])?;
//! assert_eq!(grid.x(), Some(&[0.0, 1.0][..]));
//! assert_eq!(grid.y(), Some(&[0.0, 1.0][..]));
//!
//! let cube = Aggregator::from_names(&["sum"])?.aggregate(&[a], &grid)?;
//! assert_eq!(cube.value("v_sum", &[0, 1]), Some(2.0));
//! # Ok::<(), geocube::GeoCubeError>(())
//! ```

// Core modules
pub mod aggregate;
pub mod binning;
pub mod config;
pub mod data_source;
pub mod errors;
pub mod grid;
pub mod merge;
pub mod metadata;
pub mod model;
pub mod parallel;
pub mod precision;
pub mod statistics;

pub use aggregate::{aggregate, Accumulation, Aggregator, CubeAccumulator};
pub use binning::{bin_coordinates, CoordinateBinner, OutOfRangePolicy};
pub use errors::{GeoCubeError, Result};
pub use grid::{build_grid, GridBuilder, IntegrationMode, ReferenceSelection};
pub use merge::{merge, MergedDataset};
pub use model::{Axes, BinnedArray, Crs, Cube, Dim, Grid, SampleArray};

// High-level convenience API
pub mod prelude {
    //! Commonly used imports for convenience
    pub use crate::aggregate::{Accumulation, Aggregator};
    pub use crate::binning::{CoordinateBinner, OutOfRangePolicy};
    pub use crate::config::{CubeParams, Pipeline};
    pub use crate::errors::{GeoCubeError, Result};
    pub use crate::grid::{GridBuilder, IntegrationMode, ReferenceSelection};
    pub use crate::merge::merge;
    pub use crate::model::{Axes, Crs, Cube, Dim, Grid, SampleArray};
    pub use crate::precision::Precision;
    pub use crate::statistics::Aggregate;
}
