//! Target grid construction
//!
//! [`GridBuilder`] reconciles the extents of all input arrays into one regular grid.
//! Spatial axes are half-open arithmetic sequences over the (optionally buffered)
//! bounding box with at least one bin each. The time axis steps a [`Precision`] from
//! the earliest to the latest timestamp inclusively.

use crate::errors::{GeoCubeError, Result};
use crate::model::{Axes, Crs, Dim, Grid, SampleArray};
use crate::precision::Precision;
use chrono::NaiveDateTime;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Default outward buffer of the spatial extent, as a fraction of the resolution
pub const DEFAULT_BUFFER_EDGE: f64 = 0.01;

/// Which axes the grid spans
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntegrationMode {
    Spatiotemporal,
    Spatial,
    Temporal,
}

impl IntegrationMode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Spatiotemporal => "spatiotemporal",
            Self::Spatial => "spatial",
            Self::Temporal => "temporal",
        }
    }

    #[must_use]
    pub const fn is_spatial(self) -> bool {
        matches!(self, Self::Spatiotemporal | Self::Spatial)
    }

    #[must_use]
    pub const fn is_temporal(self) -> bool {
        matches!(self, Self::Spatiotemporal | Self::Temporal)
    }
}

impl FromStr for IntegrationMode {
    type Err = GeoCubeError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "spatiotemporal" => Ok(Self::Spatiotemporal),
            "spatial" => Ok(Self::Spatial),
            "temporal" => Ok(Self::Temporal),
            other => Err(GeoCubeError::UnsupportedMode {
                mode: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for IntegrationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the grid's coordinate reference is chosen when none is given explicitly
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ReferenceSelection {
    /// First reference found scanning the arrays in input order
    FirstFound,
    /// Lexically smallest distinct reference, independent of input order
    #[default]
    Lexical,
}

impl FromStr for ReferenceSelection {
    type Err = GeoCubeError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "first_found" => Ok(Self::FirstFound),
            "lexical" => Ok(Self::Lexical),
            other => Err(GeoCubeError::InvalidParameter {
                message: format!("unknown reference selection '{other}'"),
            }),
        }
    }
}

/// An input array left out of an extent computation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedArray {
    /// Position in the input sequence
    pub index: usize,
    pub name: String,
    pub axis: Dim,
}

/// Arrays exposing an axis, and the ones that do not
#[derive(Debug)]
pub struct AxisFilter<'a> {
    pub kept: Vec<&'a SampleArray>,
    pub skipped: Vec<SkippedArray>,
}

impl<'a> AxisFilter<'a> {
    /// Split `arrays` by whether they expose `axis`
    pub fn new(arrays: &'a [SampleArray], axis: Dim) -> Self {
        let mut kept = Vec::new();
        let mut skipped = Vec::new();
        for (index, array) in arrays.iter().enumerate() {
            if array.has(axis) {
                kept.push(array);
            } else {
                skipped.push(SkippedArray {
                    index,
                    name: array.name().to_string(),
                    axis,
                });
            }
        }
        Self { kept, skipped }
    }

    fn report(&self) {
        for skip in &self.skipped {
            tracing::warn!(
                array = %skip.name,
                index = skip.index,
                axis = %skip.axis,
                "array has no such axis, left out of the extent"
            );
        }
    }
}

/// Inclusive min/max of a spatial axis across arrays
fn numeric_extent(filter: &AxisFilter<'_>, axis: Dim) -> Result<(f64, f64)> {
    let values = filter
        .kept
        .iter()
        .filter_map(|a| a.axes().numeric(axis))
        .flatten()
        .copied();
    let extent = values.fold(None, |acc: Option<(f64, f64)>, v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    });

    extent.ok_or_else(|| GeoCubeError::MissingAxis {
        axis: "x/y".to_string(),
    })
}

fn temporal_extent(filter: &AxisFilter<'_>) -> Result<(NaiveDateTime, NaiveDateTime)> {
    let mut values = filter
        .kept
        .iter()
        .filter_map(|a| a.axes().time.as_ref())
        .flatten()
        .copied();
    let first = values.next().ok_or_else(|| GeoCubeError::MissingAxis {
        axis: "time".to_string(),
    })?;

    Ok(values.fold((first, first), |(lo, hi), t| (lo.min(t), hi.max(t))))
}

/// Expand `[min, max]` by `buffer_edge * resolution` and round to whole units
///
/// Rounding happens after buffering and ties go to the even integer, so a buffer
/// smaller than half a unit can be rounded away entirely. A bound is never rounded
/// inside the raw extent: if nearest rounding would cut off samples, the buffered
/// bound is rounded outward instead.
#[must_use]
pub fn buffered_extent(min: f64, max: f64, resolution: f64, buffer_edge: Option<f64>) -> (f64, f64) {
    let Some(edge) = buffer_edge else {
        return (min, max);
    };

    let pad = edge * resolution;
    let mut lo = (min - pad).round_ties_even();
    if lo > min {
        lo = (min - pad).floor();
    }
    let mut hi = (max + pad).round_ties_even();
    if hi < max {
        hi = (max + pad).ceil();
    }
    (lo, hi)
}

/// Half-open arithmetic sequence `start, start + step, ...` below `stop`
///
/// Has `ceil((stop - start) / step)` values, or none if `stop <= start`.
#[must_use]
pub fn arange(start: f64, stop: f64, step: f64) -> Vec<f64> {
    let span = (stop - start) / step;
    if !span.is_finite() || span <= 0.0 {
        return Vec::new();
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let len = span.ceil() as usize;
    (0..len).map(|i| start + i as f64 * step).collect()
}

/// Axis values for a rounded extent, never empty
///
/// A degenerate extent (`stop <= start`, e.g. all samples on one row) still gets
/// one bin starting at `start`, so every observed coordinate has an enclosing bin.
fn spatial_axis(start: f64, stop: f64, step: f64) -> Vec<f64> {
    let values = arange(start, stop, step);
    if values.is_empty() {
        vec![start]
    } else {
        values
    }
}

/// Builds the common target grid for a set of sample arrays
#[derive(Debug, Clone, PartialEq)]
pub struct GridBuilder {
    mode: IntegrationMode,
    resolution: f64,
    precision: Precision,
    target_reference: Option<Crs>,
    buffer_edge: Option<f64>,
    reference_selection: ReferenceSelection,
}

impl GridBuilder {
    /// Builder with the default buffer edge and lexical reference selection
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` if `resolution` is not a positive finite number.
    pub fn new(mode: IntegrationMode, resolution: f64, precision: Precision) -> Result<Self> {
        if !(resolution.is_finite() && resolution > 0.0) {
            return Err(GeoCubeError::InvalidParameter {
                message: format!("resolution must be positive, got {resolution}"),
            });
        }

        Ok(Self {
            mode,
            resolution,
            precision,
            target_reference: None,
            buffer_edge: Some(DEFAULT_BUFFER_EDGE),
            reference_selection: ReferenceSelection::default(),
        })
    }

    #[must_use]
    pub fn with_target_reference(mut self, reference: Option<Crs>) -> Self {
        self.target_reference = reference;
        self
    }

    /// Set the outward buffer, `None` disables buffering and rounding
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` for a negative or non-finite buffer.
    pub fn with_buffer_edge(mut self, buffer_edge: Option<f64>) -> Result<Self> {
        if let Some(edge) = buffer_edge {
            if !(edge.is_finite() && edge >= 0.0) {
                return Err(GeoCubeError::InvalidParameter {
                    message: format!("buffer_edge must be a non-negative fraction, got {edge}"),
                });
            }
        }
        self.buffer_edge = buffer_edge;
        Ok(self)
    }

    #[must_use]
    pub fn with_reference_selection(mut self, selection: ReferenceSelection) -> Self {
        self.reference_selection = selection;
        self
    }

    #[must_use]
    pub fn mode(&self) -> IntegrationMode {
        self.mode
    }

    #[must_use]
    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    #[must_use]
    pub fn precision(&self) -> Precision {
        self.precision
    }

    /// Build an empty grid spanning all `arrays`
    ///
    /// # Errors
    ///
    /// - `MissingAxis` if no array exposes a required axis (also for empty input)
    /// - `MissingReference` if a spatial grid has no reference to attach
    pub fn build(&self, arrays: &[SampleArray]) -> Result<Grid> {
        self.build_with_report(arrays).map(|(grid, _)| grid)
    }

    /// Like [`GridBuilder::build`], also returning the arrays left out of each extent
    ///
    /// An array lacking several grid axes is listed once per missing axis.
    ///
    /// # Errors
    ///
    /// See [`GridBuilder::build`].
    pub fn build_with_report(&self, arrays: &[SampleArray]) -> Result<(Grid, Vec<SkippedArray>)> {
        let mut axes = Axes::default();
        let mut skipped = Vec::new();

        if self.mode.is_spatial() {
            let x_filter = AxisFilter::new(arrays, Dim::X);
            let y_filter = AxisFilter::new(arrays, Dim::Y);
            x_filter.report();
            y_filter.report();

            let (minx, maxx) = numeric_extent(&x_filter, Dim::X)?;
            let (miny, maxy) = numeric_extent(&y_filter, Dim::Y)?;
            let (minx, maxx) = buffered_extent(minx, maxx, self.resolution, self.buffer_edge);
            let (miny, maxy) = buffered_extent(miny, maxy, self.resolution, self.buffer_edge);

            axes.x = Some(spatial_axis(minx, maxx, self.resolution));
            axes.y = Some(spatial_axis(miny, maxy, self.resolution));
            skipped.extend(x_filter.skipped);
            skipped.extend(y_filter.skipped);
        }

        if self.mode.is_temporal() {
            let filter = AxisFilter::new(arrays, Dim::Time);
            filter.report();

            let (mint, maxt) = temporal_extent(&filter)?;
            axes.time = Some(self.precision.date_range(mint, maxt));
            skipped.extend(filter.skipped);
        }

        let crs = if self.mode.is_spatial() {
            Some(self.select_reference(arrays)?)
        } else {
            None
        };

        tracing::info!(
            mode = %self.mode,
            shape = ?axes.shape(),
            crs = ?crs.as_ref().map(Crs::as_str),
            skipped = skipped.len(),
            "built target grid"
        );

        Ok((Grid::new(axes, crs)?, skipped))
    }

    fn select_reference(&self, arrays: &[SampleArray]) -> Result<Crs> {
        let distinct: BTreeSet<&Crs> = arrays.iter().filter_map(SampleArray::crs).collect();
        if distinct.len() > 1 {
            tracing::warn!(
                references = ?distinct.iter().map(|c| c.as_str()).collect::<Vec<_>>(),
                "input arrays use different coordinate references"
            );
        }

        if let Some(target) = &self.target_reference {
            return Ok(target.clone());
        }

        let chosen = match self.reference_selection {
            ReferenceSelection::FirstFound => arrays.iter().find_map(SampleArray::crs),
            ReferenceSelection::Lexical => distinct.into_iter().next(),
        };
        chosen.cloned().ok_or(GeoCubeError::MissingReference)
    }
}

/// Build a grid with the given parameters
///
/// Convenience wrapper around [`GridBuilder`] parsing `mode` and `precision` at the
/// boundary.
///
/// # Errors
///
/// Returns `UnsupportedMode` for an unknown mode string, `InvalidPrecision` for an
/// unparseable precision code, plus everything [`GridBuilder::build`] returns.
pub fn build_grid(
    arrays: &[SampleArray],
    mode: &str,
    resolution: f64,
    precision: &str,
    target_reference: Option<Crs>,
    buffer_edge: Option<f64>,
) -> Result<Grid> {
    let mode: IntegrationMode = mode.parse()?;
    let precision: Precision = precision.parse()?;
    GridBuilder::new(mode, resolution, precision)?
        .with_target_reference(target_reference)
        .with_buffer_edge(buffer_edge)?
        .build(arrays)
}
