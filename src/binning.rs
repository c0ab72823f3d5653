//! Snapping native coordinates onto grid bins
//!
//! A coordinate falls into the bin whose lower edge is the last grid value that is
//! less than or equal to it. Values at or beyond the last edge land in the last bin.
//! Values below the first edge have no bin; [`OutOfRangePolicy`] decides what
//! happens to them.

use crate::errors::{GeoCubeError, Result};
use crate::model::{BinnedArray, Dim, Grid, SampleArray};
use ndarray::Axis;
use std::fmt;
use std::str::FromStr;

/// Treatment of coordinates below the first grid edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OutOfRangePolicy {
    /// Index `-1` wraps around to the last bin. Reproduces the historical aliasing
    /// defect and exists only for compatibility checks.
    Legacy,
    /// Place the value in the first bin
    #[default]
    Clamp,
    /// Remove the coordinate and its data slice
    Drop,
}

impl OutOfRangePolicy {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Legacy => "legacy",
            Self::Clamp => "clamp",
            Self::Drop => "drop",
        }
    }

    fn place(self, found: Option<usize>, axis_len: usize) -> Option<usize> {
        match (found, self) {
            (Some(index), _) => Some(index),
            (None, Self::Legacy) => axis_len.checked_sub(1),
            (None, Self::Clamp) => (axis_len > 0).then_some(0),
            (None, Self::Drop) => None,
        }
    }
}

impl FromStr for OutOfRangePolicy {
    type Err = GeoCubeError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "legacy" => Ok(Self::Legacy),
            "clamp" => Ok(Self::Clamp),
            "drop" => Ok(Self::Drop),
            other => Err(GeoCubeError::InvalidParameter {
                message: format!("unknown out-of-range policy '{other}'"),
            }),
        }
    }
}

impl fmt::Display for OutOfRangePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Index of the last edge `<= value`, `None` if `value` lies below all edges
///
/// `edges` must be strictly increasing.
pub fn lower_edge_index<T: PartialOrd>(edges: &[T], value: &T) -> Option<usize> {
    edges.partition_point(|edge| edge <= value).checked_sub(1)
}

fn locate<T: PartialOrd>(edges: &[T], coords: &[T]) -> Vec<Option<usize>> {
    coords.iter().map(|c| lower_edge_index(edges, c)).collect()
}

/// Maps sample arrays onto the bins of a grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CoordinateBinner {
    policy: OutOfRangePolicy,
}

impl CoordinateBinner {
    #[must_use]
    pub const fn new(policy: OutOfRangePolicy) -> Self {
        Self { policy }
    }

    #[must_use]
    pub const fn policy(&self) -> OutOfRangePolicy {
        self.policy
    }

    /// Replace the coordinates of `array` with the lower edges of their grid bins
    ///
    /// Only axes present in both the grid and the array are binned, in the order
    /// `time`, `y`, `x`. Data values are never modified; under
    /// [`OutOfRangePolicy::Drop`] slices of out-of-range coordinates are removed.
    ///
    /// # Errors
    ///
    /// Returns `EmptyAxis` if the grid axis has no values but the array has
    /// coordinates on it and the policy must place every coordinate.
    pub fn bin(&self, array: &SampleArray, grid: &Grid) -> Result<BinnedArray> {
        let mut axes = array.axes().clone();
        let mut variables = array.variables().clone();
        let mut bins: [Option<Vec<usize>>; 3] = [None, None, None];

        for dim in Dim::ALL {
            let found = match dim {
                Dim::Time => match (grid.time(), array.axes().time.as_deref()) {
                    (Some(edges), Some(coords)) => locate(edges, coords),
                    _ => continue,
                },
                Dim::Y | Dim::X => match (grid.axes().numeric(dim), array.axes().numeric(dim)) {
                    (Some(edges), Some(coords)) => locate(edges, coords),
                    _ => continue,
                },
            };

            let axis_len = grid.axes().len(dim).unwrap_or(0);
            if axis_len == 0 && !found.is_empty() && self.policy != OutOfRangePolicy::Drop {
                return Err(GeoCubeError::EmptyAxis {
                    axis: dim.to_string(),
                });
            }

            let below = found.iter().filter(|f| f.is_none()).count();
            if below > 0 {
                tracing::debug!(
                    array = %array.name(),
                    axis = %dim,
                    count = below,
                    policy = %self.policy,
                    "coordinates below the first grid edge"
                );
            }

            let (positions, indices): (Vec<usize>, Vec<usize>) = found
                .into_iter()
                .enumerate()
                .filter_map(|(pos, f)| self.policy.place(f, axis_len).map(|bin| (pos, bin)))
                .unzip();

            if positions.len() < array.axes().len(dim).unwrap_or(0) {
                if let Some(data_axis) = axes.position(dim) {
                    for block in variables.values_mut() {
                        *block = block.select(Axis(data_axis), &positions);
                    }
                }
            }

            match dim {
                Dim::Time => {
                    axes.time = grid
                        .time()
                        .map(|edges| indices.iter().map(|&i| edges[i]).collect());
                }
                Dim::Y => {
                    axes.y = grid.y().map(|edges| indices.iter().map(|&i| edges[i]).collect());
                }
                Dim::X => {
                    axes.x = grid.x().map(|edges| indices.iter().map(|&i| edges[i]).collect());
                }
            }
            bins[dim.slot()] = Some(indices);
        }

        Ok(BinnedArray::new(array.replace_axes(axes, variables), bins))
    }
}

/// Bin `array` against `grid` with the default (clamping) policy
///
/// # Errors
///
/// See [`CoordinateBinner::bin`].
pub fn bin_coordinates(array: &SampleArray, grid: &Grid) -> Result<BinnedArray> {
    CoordinateBinner::default().bin(array, grid)
}
