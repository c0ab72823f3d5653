//! Core data model: axes, sample arrays, grids and cubes
//!
//! Every array in geocube is addressed by at most three coordinate axes, always
//! stored in the canonical order `time`, `y`, `x`. Data blocks are `ndarray::ArrayD<f64>`
//! whose axes follow the same order restricted to the axes that are present.

use crate::errors::{GeoCubeError, Result};
use chrono::NaiveDateTime;
use ndarray::{ArrayD, IxDyn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// One of the three axes a grid can span
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Dim {
    Time,
    Y,
    X,
}

impl Dim {
    /// All axes in canonical order
    pub const ALL: [Dim; 3] = [Dim::Time, Dim::Y, Dim::X];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Time => "time",
            Self::Y => "y",
            Self::X => "x",
        }
    }

    pub(crate) const fn slot(self) -> usize {
        match self {
            Self::Time => 0,
            Self::Y => 1,
            Self::X => 2,
        }
    }
}

impl fmt::Display for Dim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coordinate reference identifier, e.g. `EPSG:4326`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Crs(String);

impl Crs {
    /// Wrap an identifier, normalizing case and surrounding whitespace
    pub fn new(identifier: impl AsRef<str>) -> Self {
        Self(identifier.as_ref().trim().to_uppercase())
    }

    pub fn from_epsg(code: u32) -> Self {
        Self(format!("EPSG:{code}"))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// EPSG code if the identifier is of the form `EPSG:<code>`
    #[must_use]
    pub fn epsg(&self) -> Option<u32> {
        self.0.strip_prefix("EPSG:").and_then(|c| c.parse().ok())
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Coordinate values of up to three axes
///
/// Spatial axes hold plain numbers in the units of the array's coordinate reference,
/// the time axis holds naive timestamps.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Axes {
    pub time: Option<Vec<NaiveDateTime>>,
    pub y: Option<Vec<f64>>,
    pub x: Option<Vec<f64>>,
}

impl Axes {
    /// Axes with only `y` and `x`
    pub fn spatial(y: Vec<f64>, x: Vec<f64>) -> Self {
        Self {
            time: None,
            y: Some(y),
            x: Some(x),
        }
    }

    /// Axes with only `time`
    pub fn temporal(time: Vec<NaiveDateTime>) -> Self {
        Self {
            time: Some(time),
            y: None,
            x: None,
        }
    }

    /// Axes with `time`, `y` and `x`
    pub fn spatiotemporal(time: Vec<NaiveDateTime>, y: Vec<f64>, x: Vec<f64>) -> Self {
        Self {
            time: Some(time),
            y: Some(y),
            x: Some(x),
        }
    }

    #[must_use]
    pub fn has(&self, dim: Dim) -> bool {
        self.len(dim).is_some()
    }

    /// Length of an axis, `None` if the axis is absent
    #[must_use]
    pub fn len(&self, dim: Dim) -> Option<usize> {
        match dim {
            Dim::Time => self.time.as_ref().map(Vec::len),
            Dim::Y => self.y.as_ref().map(Vec::len),
            Dim::X => self.x.as_ref().map(Vec::len),
        }
    }

    /// Present axes in canonical order
    #[must_use]
    pub fn dims(&self) -> Vec<Dim> {
        Dim::ALL.into_iter().filter(|d| self.has(*d)).collect()
    }

    /// Shape of a data block addressed by these axes
    #[must_use]
    pub fn shape(&self) -> Vec<usize> {
        Dim::ALL.iter().filter_map(|d| self.len(*d)).collect()
    }

    /// Position of an axis inside a data block, `None` if absent
    #[must_use]
    pub fn position(&self, dim: Dim) -> Option<usize> {
        self.dims().iter().position(|d| *d == dim)
    }

    /// Numeric values of a spatial axis
    #[must_use]
    pub fn numeric(&self, dim: Dim) -> Option<&[f64]> {
        match dim {
            Dim::Y => self.y.as_deref(),
            Dim::X => self.x.as_deref(),
            Dim::Time => None,
        }
    }

    /// Human readable coordinate value at `index` along `dim`
    #[must_use]
    pub fn label(&self, dim: Dim, index: usize) -> String {
        let label = match dim {
            Dim::Time => self
                .time
                .as_ref()
                .and_then(|t| t.get(index))
                .map(|t| t.format("%Y-%m-%dT%H:%M:%S").to_string()),
            Dim::Y | Dim::X => self
                .numeric(dim)
                .and_then(|v| v.get(index))
                .map(f64::to_string),
        };
        label.unwrap_or_else(|| "?".to_string())
    }

    fn check_strictly_increasing(&self) -> std::result::Result<(), Dim> {
        if let Some(t) = &self.time {
            if !is_strictly_increasing(t) {
                return Err(Dim::Time);
            }
        }
        for dim in [Dim::Y, Dim::X] {
            if let Some(v) = self.numeric(dim) {
                if !is_strictly_increasing(v) {
                    return Err(dim);
                }
            }
        }
        Ok(())
    }
}

pub(crate) fn is_strictly_increasing<T: PartialOrd>(values: &[T]) -> bool {
    values.windows(2).all(|w| w[0] < w[1])
}

/// One input dataset standardized to `time`/`y`/`x` coordinates
///
/// Coordinates need not be sorted or regular. Every data variable has exactly the
/// shape given by [`Axes::shape`].
#[derive(Debug, Clone, PartialEq)]
pub struct SampleArray {
    name: String,
    axes: Axes,
    variables: BTreeMap<String, ArrayD<f64>>,
    crs: Option<Crs>,
    attributes: BTreeMap<String, String>,
}

impl SampleArray {
    /// Create an array without data variables
    ///
    /// # Errors
    ///
    /// Returns `InvalidArray` if a spatial coordinate is not finite.
    pub fn new(name: impl Into<String>, axes: Axes, crs: Option<Crs>) -> Result<Self> {
        let name = name.into();
        for dim in [Dim::Y, Dim::X] {
            if let Some(values) = axes.numeric(dim) {
                if values.iter().any(|v| !v.is_finite()) {
                    return Err(GeoCubeError::InvalidArray {
                        name,
                        message: format!("non-finite coordinate on axis '{dim}'"),
                    });
                }
            }
        }

        Ok(Self {
            name,
            axes,
            variables: BTreeMap::new(),
            crs,
            attributes: BTreeMap::new(),
        })
    }

    /// Attach a data variable
    ///
    /// # Errors
    ///
    /// Returns `InvalidArray` if the block shape does not match the coordinate axes.
    pub fn with_variable(mut self, name: impl Into<String>, data: ArrayD<f64>) -> Result<Self> {
        let var = name.into();
        let expected = self.axes.shape();
        if data.shape() != expected.as_slice() {
            return Err(GeoCubeError::InvalidArray {
                name: self.name,
                message: format!(
                    "variable '{var}' has shape {:?}, axes require {:?}",
                    data.shape(),
                    expected
                ),
            });
        }
        self.variables.insert(var, data);
        Ok(self)
    }

    /// Attach a data variable from row-major values
    ///
    /// # Errors
    ///
    /// Returns an error if the number of values does not match the axes.
    pub fn with_values(self, name: impl Into<String>, values: Vec<f64>) -> Result<Self> {
        let data = ArrayD::from_shape_vec(IxDyn(&self.axes.shape()), values)?;
        self.with_variable(name, data)
    }

    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn axes(&self) -> &Axes {
        &self.axes
    }

    #[must_use]
    pub fn dims(&self) -> Vec<Dim> {
        self.axes.dims()
    }

    #[must_use]
    pub fn has(&self, dim: Dim) -> bool {
        self.axes.has(dim)
    }

    #[must_use]
    pub fn crs(&self) -> Option<&Crs> {
        self.crs.as_ref()
    }

    #[must_use]
    pub fn variables(&self) -> &BTreeMap<String, ArrayD<f64>> {
        &self.variables
    }

    #[must_use]
    pub fn variable(&self, name: &str) -> Option<&ArrayD<f64>> {
        self.variables.get(name)
    }

    #[must_use]
    pub fn attributes(&self) -> &BTreeMap<String, String> {
        &self.attributes
    }

    pub(crate) fn replace_axes(
        &self,
        axes: Axes,
        variables: BTreeMap<String, ArrayD<f64>>,
    ) -> SampleArray {
        SampleArray {
            name: self.name.clone(),
            axes,
            variables,
            crs: self.crs.clone(),
            attributes: self.attributes.clone(),
        }
    }
}

/// A sample array whose coordinates were snapped to grid bins
///
/// The coordinate values are grid axis values, so several entries may repeat.
/// The bin index of every coordinate is kept alongside for grouping.
#[derive(Debug, Clone, PartialEq)]
pub struct BinnedArray {
    array: SampleArray,
    bins: [Option<Vec<usize>>; 3],
}

impl BinnedArray {
    pub(crate) fn new(array: SampleArray, bins: [Option<Vec<usize>>; 3]) -> Self {
        Self { array, bins }
    }

    #[must_use]
    pub fn array(&self) -> &SampleArray {
        &self.array
    }

    #[must_use]
    pub fn into_array(self) -> SampleArray {
        self.array
    }

    #[must_use]
    pub fn dims(&self) -> Vec<Dim> {
        self.array.dims()
    }

    /// Grid bin index of every coordinate along `dim`
    ///
    /// `None` if the axis was not binned, either because the grid or the array lacks it.
    #[must_use]
    pub fn bin_indices(&self, dim: Dim) -> Option<&[usize]> {
        self.bins[dim.slot()].as_deref()
    }
}

/// Regular target grid: coordinate axes plus an optional coordinate reference
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    axes: Axes,
    crs: Option<Crs>,
}

impl Grid {
    /// # Errors
    ///
    /// Returns `InvalidParameter` if any axis is not strictly increasing.
    pub fn new(axes: Axes, crs: Option<Crs>) -> Result<Self> {
        axes.check_strictly_increasing()
            .map_err(|dim| GeoCubeError::InvalidParameter {
                message: format!("grid axis '{dim}' is not strictly increasing"),
            })?;
        Ok(Self { axes, crs })
    }

    #[must_use]
    pub fn axes(&self) -> &Axes {
        &self.axes
    }

    #[must_use]
    pub fn crs(&self) -> Option<&Crs> {
        self.crs.as_ref()
    }

    #[must_use]
    pub fn dims(&self) -> Vec<Dim> {
        self.axes.dims()
    }

    #[must_use]
    pub fn shape(&self) -> Vec<usize> {
        self.axes.shape()
    }

    #[must_use]
    pub fn time(&self) -> Option<&[NaiveDateTime]> {
        self.axes.time.as_deref()
    }

    #[must_use]
    pub fn y(&self) -> Option<&[f64]> {
        self.axes.y.as_deref()
    }

    #[must_use]
    pub fn x(&self) -> Option<&[f64]> {
        self.axes.x.as_deref()
    }
}

/// Grid populated with aggregated variables named `{variable}_{aggregate}`
///
/// Every variable spans all grid axes. Cells no input contributed to are NaN.
#[derive(Debug, Clone, PartialEq)]
pub struct Cube {
    grid: Grid,
    variables: BTreeMap<String, ArrayD<f64>>,
}

impl Cube {
    /// Empty cube on a copy of `grid`
    #[must_use]
    pub fn from_grid(grid: &Grid) -> Self {
        Self {
            grid: grid.clone(),
            variables: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    #[must_use]
    pub fn crs(&self) -> Option<&Crs> {
        self.grid.crs()
    }

    #[must_use]
    pub fn dims(&self) -> Vec<Dim> {
        self.grid.dims()
    }

    #[must_use]
    pub fn shape(&self) -> Vec<usize> {
        self.grid.shape()
    }

    #[must_use]
    pub fn variables(&self) -> &BTreeMap<String, ArrayD<f64>> {
        &self.variables
    }

    #[must_use]
    pub fn variable(&self, name: &str) -> Option<&ArrayD<f64>> {
        self.variables.get(name)
    }

    pub fn variable_names(&self) -> impl Iterator<Item = &str> {
        self.variables.keys().map(String::as_str)
    }

    /// Value of a variable at a full grid index (`time`, `y`, `x` order)
    #[must_use]
    pub fn value(&self, name: &str, index: &[usize]) -> Option<f64> {
        self.variables
            .get(name)
            .and_then(|v| v.get(IxDyn(index)))
            .copied()
    }

    /// Block for `name`, created NaN-filled on first use
    pub(crate) fn block_mut(&mut self, name: &str) -> &mut ArrayD<f64> {
        self.grid_and_block_mut(name).1
    }

    /// The grid alongside the mutable block for `name`
    pub(crate) fn grid_and_block_mut(&mut self, name: &str) -> (&Grid, &mut ArrayD<f64>) {
        let shape = self.grid.shape();
        let block = self
            .variables
            .entry(name.to_string())
            .or_insert_with(|| ArrayD::from_elem(IxDyn(&shape), f64::NAN));
        (&self.grid, block)
    }
}
