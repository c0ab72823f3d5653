//! Binning sample arrays into a cube of per-cell statistics
//!
//! [`Aggregator`] bins every array against the grid, groups its records by the
//! grid axes it shares with the grid and reduces every data variable with every
//! requested [`Aggregate`]. Results land in the cube as `{variable}_{aggregate}`.
//!
//! Arrays are processed strictly in input order, aggregates in request order. How
//! a later array's result combines with an earlier one at the same cell is decided
//! by the [`Accumulation`] strategy of the [`CubeAccumulator`].

use crate::binning::{CoordinateBinner, OutOfRangePolicy};
use crate::errors::{GeoCubeError, Result};
use crate::model::{Cube, Dim, Grid, SampleArray};
use crate::statistics::{group_samples, reduce_groups, Aggregate, BinGroup};
use ndarray::IxDyn;
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Combination of values written to the same cube cell by different arrays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Accumulation {
    /// The last array written wins at every cell it covers
    #[default]
    Overwrite,
    /// Samples of all arrays are pooled per cell and reduced once at the end
    ReduceMerge,
}

impl Accumulation {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Overwrite => "overwrite",
            Self::ReduceMerge => "reduce_merge",
        }
    }
}

impl FromStr for Accumulation {
    type Err = GeoCubeError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "overwrite" => Ok(Self::Overwrite),
            "reduce_merge" => Ok(Self::ReduceMerge),
            other => Err(GeoCubeError::InvalidParameter {
                message: format!("unknown accumulation strategy '{other}'"),
            }),
        }
    }
}

impl fmt::Display for Accumulation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Full grid indices covered by a group key
///
/// Grid axes missing from `grouping` are broadcast: every index along them is covered.
fn broadcast_cells(grid: &Grid, grouping: &[Dim], key: &[usize]) -> Vec<Vec<usize>> {
    let dims = grid.dims();
    let shape = grid.shape();

    let mut base = vec![0; dims.len()];
    for (dim, &bin) in grouping.iter().zip(key) {
        if let Some(pos) = dims.iter().position(|d| d == dim) {
            base[pos] = bin;
        }
    }

    let free: Vec<usize> = (0..dims.len())
        .filter(|&i| !grouping.contains(&dims[i]))
        .collect();
    let free_shape: Vec<usize> = free.iter().map(|&i| shape[i]).collect();

    ndarray::indices(IxDyn(&free_shape))
        .into_iter()
        .map(|free_index| {
            let mut cell = base.clone();
            for (j, &i) in free.iter().enumerate() {
                cell[i] = free_index[j];
            }
            cell
        })
        .collect()
}

/// The cube under construction plus the strategy combining contributions
#[derive(Debug, Clone)]
pub struct CubeAccumulator {
    strategy: Accumulation,
    cube: Cube,
    pending: BTreeMap<String, (Aggregate, BTreeMap<Vec<usize>, Vec<f64>>)>,
}

impl CubeAccumulator {
    #[must_use]
    pub fn new(grid: &Grid, strategy: Accumulation) -> Self {
        Self {
            strategy,
            cube: Cube::from_grid(grid),
            pending: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn strategy(&self) -> Accumulation {
        self.strategy
    }

    /// Contribute the groups of one variable of one array under `name`
    pub fn push(&mut self, name: &str, aggregate: Aggregate, grouping: &[Dim], groups: &[BinGroup]) {
        match self.strategy {
            Accumulation::Overwrite => {
                let reduced = reduce_groups(groups, aggregate);
                let (grid, block) = self.cube.grid_and_block_mut(name);
                for (key, value) in reduced {
                    for cell in broadcast_cells(grid, grouping, &key) {
                        block[IxDyn(&cell)] = value;
                    }
                }
            }
            Accumulation::ReduceMerge => {
                let grid = self.cube.grid();
                let (_, cells) = self
                    .pending
                    .entry(name.to_string())
                    .or_insert_with(|| (aggregate, BTreeMap::new()));
                for group in groups {
                    for cell in broadcast_cells(grid, grouping, &group.key) {
                        cells.entry(cell).or_default().extend_from_slice(&group.samples);
                    }
                }
            }
        }
    }

    /// Reduce pooled samples and return the finished cube
    #[must_use]
    pub fn finish(mut self) -> Cube {
        for (name, (aggregate, cells)) in std::mem::take(&mut self.pending) {
            let reducer = aggregate.reducer();
            let reduced: Vec<(Vec<usize>, f64)> = cells
                .into_par_iter()
                .map(|(cell, samples)| {
                    let value = reducer(&samples);
                    (cell, value)
                })
                .collect();

            let block = self.cube.block_mut(&name);
            for (cell, value) in reduced {
                block[IxDyn(&cell)] = value;
            }
        }
        self.cube
    }
}

/// Aggregates sample arrays onto a grid
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregator {
    aggregates: Vec<Aggregate>,
    binner: CoordinateBinner,
    accumulation: Accumulation,
}

impl Aggregator {
    /// Aggregator with clamping out-of-range policy and overwrite accumulation
    #[must_use]
    pub fn new(aggregates: Vec<Aggregate>) -> Self {
        Self {
            aggregates,
            binner: CoordinateBinner::default(),
            accumulation: Accumulation::default(),
        }
    }

    /// # Errors
    ///
    /// Returns `UnsupportedAggregate` for the first unknown identifier.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self> {
        Ok(Self::new(Aggregate::parse_all(names)?))
    }

    #[must_use]
    pub fn with_out_of_range(mut self, policy: OutOfRangePolicy) -> Self {
        self.binner = CoordinateBinner::new(policy);
        self
    }

    #[must_use]
    pub fn with_accumulation(mut self, accumulation: Accumulation) -> Self {
        self.accumulation = accumulation;
        self
    }

    #[must_use]
    pub fn aggregates(&self) -> &[Aggregate] {
        &self.aggregates
    }

    #[must_use]
    pub fn accumulation(&self) -> Accumulation {
        self.accumulation
    }

    #[must_use]
    pub fn out_of_range(&self) -> OutOfRangePolicy {
        self.binner.policy()
    }

    /// Populate a copy of `grid` with the aggregates of all `arrays`
    ///
    /// Arrays that share no axis with the grid are skipped with a warning.
    ///
    /// # Errors
    ///
    /// Propagates binning errors (see [`CoordinateBinner::bin`]).
    pub fn aggregate(&self, arrays: &[SampleArray], grid: &Grid) -> Result<Cube> {
        let mut accumulator = CubeAccumulator::new(grid, self.accumulation);
        let grid_dims = grid.dims();

        for array in arrays {
            let binned = self.binner.bin(array, grid)?;
            let grouping: Vec<Dim> = grid_dims
                .iter()
                .copied()
                .filter(|d| binned.array().has(*d))
                .collect();

            if grouping.is_empty() {
                tracing::warn!(
                    array = %array.name(),
                    "array shares no axis with the grid, skipped"
                );
                continue;
            }

            let groups: Vec<(&String, Vec<BinGroup>)> = binned
                .array()
                .variables()
                .iter()
                .map(|(var, block)| (var, group_samples(&binned, block, &grouping)))
                .collect();

            for &aggregate in &self.aggregates {
                for (var, var_groups) in &groups {
                    let name = format!("{var}_{aggregate}");
                    accumulator.push(&name, aggregate, &grouping, var_groups);
                }
            }

            tracing::debug!(
                array = %array.name(),
                axes = ?grouping,
                variables = groups.len(),
                "aggregated array"
            );
        }

        let cube = accumulator.finish();
        tracing::info!(
            arrays = arrays.len(),
            variables = cube.variables().len(),
            strategy = %self.accumulation,
            "cube populated"
        );
        Ok(cube)
    }
}

/// Aggregate `arrays` onto `grid` with default binning and accumulation
///
/// All aggregate names are validated before anything is written.
///
/// # Errors
///
/// Returns `UnsupportedAggregate` for an unknown name, or any binning error.
pub fn aggregate<S: AsRef<str>>(
    arrays: &[SampleArray],
    grid: &Grid,
    aggregate_names: &[S],
) -> Result<Cube> {
    Aggregator::from_names(aggregate_names)?.aggregate(arrays, grid)
}
