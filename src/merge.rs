//! Union of sample arrays without statistical binning
//!
//! [`merge`] outer-joins the coordinates of all arrays. Cells that no array covers
//! stay NaN. Two arrays may only overlap where they agree exactly; any disagreement
//! on a non-missing value is an error. Attributes that differ between arrays are
//! dropped.

use crate::errors::{GeoCubeError, Result};
use crate::model::{Axes, Crs, Dim, SampleArray};
use chrono::NaiveDateTime;
use ndarray::{ArrayD, IxDyn};
use std::collections::{BTreeMap, BTreeSet};

/// A variable of a merged dataset on its own subset of axes
#[derive(Debug, Clone, PartialEq)]
pub struct MergedVariable {
    pub dims: Vec<Dim>,
    pub data: ArrayD<f64>,
}

/// Result of [`merge`]
#[derive(Debug, Clone, PartialEq)]
pub struct MergedDataset {
    axes: Axes,
    variables: BTreeMap<String, MergedVariable>,
    crs: Option<Crs>,
    attributes: BTreeMap<String, String>,
}

impl MergedDataset {
    /// Union coordinates, sorted ascending
    #[must_use]
    pub fn axes(&self) -> &Axes {
        &self.axes
    }

    #[must_use]
    pub fn variables(&self) -> &BTreeMap<String, MergedVariable> {
        &self.variables
    }

    #[must_use]
    pub fn variable(&self, name: &str) -> Option<&MergedVariable> {
        self.variables.get(name)
    }

    /// The shared coordinate reference, `None` if inputs disagree or carry none
    #[must_use]
    pub fn crs(&self) -> Option<&Crs> {
        self.crs.as_ref()
    }

    #[must_use]
    pub fn attributes(&self) -> &BTreeMap<String, String> {
        &self.attributes
    }
}

fn sorted_union(values: impl Iterator<Item = f64>) -> Vec<f64> {
    let mut all: Vec<f64> = values.collect();
    all.sort_by(f64::total_cmp);
    all.dedup();
    all
}

fn has_duplicates<T: PartialOrd + Copy>(values: &[T]) -> bool {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    sorted.windows(2).any(|w| w[0] == w[1])
}

/// Position of every source coordinate inside the union axis
fn union_positions(union: &Axes, source: &Axes, dim: Dim) -> Vec<usize> {
    match dim {
        Dim::Time => {
            let target = union.time.as_deref().unwrap_or(&[]);
            source
                .time
                .as_deref()
                .unwrap_or(&[])
                .iter()
                .map(|t| target.partition_point(|u| u < t))
                .collect()
        }
        Dim::Y | Dim::X => {
            let target = union.numeric(dim).unwrap_or(&[]);
            source
                .numeric(dim)
                .unwrap_or(&[])
                .iter()
                .map(|v| target.partition_point(|u| u < v))
                .collect()
        }
    }
}

fn union_axes(arrays: &[SampleArray]) -> Result<Axes> {
    for array in arrays {
        let axes = array.axes();
        let duplicated = axes.time.as_deref().is_some_and(has_duplicates)
            || axes.y.as_deref().is_some_and(has_duplicates)
            || axes.x.as_deref().is_some_and(has_duplicates);
        if duplicated {
            return Err(GeoCubeError::InvalidArray {
                name: array.name().to_string(),
                message: "duplicate coordinate values cannot be joined".to_string(),
            });
        }
    }

    let mut union = Axes::default();
    if arrays.iter().any(|a| a.has(Dim::Time)) {
        let times: BTreeSet<NaiveDateTime> = arrays
            .iter()
            .filter_map(|a| a.axes().time.as_ref())
            .flatten()
            .copied()
            .collect();
        union.time = Some(times.into_iter().collect());
    }
    if arrays.iter().any(|a| a.has(Dim::Y)) {
        union.y = Some(sorted_union(
            arrays.iter().filter_map(|a| a.axes().y.as_ref()).flatten().copied(),
        ));
    }
    if arrays.iter().any(|a| a.has(Dim::X)) {
        union.x = Some(sorted_union(
            arrays.iter().filter_map(|a| a.axes().x.as_ref()).flatten().copied(),
        ));
    }
    Ok(union)
}

fn merged_attributes(arrays: &[SampleArray]) -> BTreeMap<String, String> {
    let mut merged: BTreeMap<String, String> = BTreeMap::new();
    let mut conflicting: BTreeSet<String> = BTreeSet::new();
    for array in arrays {
        for (key, value) in array.attributes() {
            match merged.get(key) {
                Some(existing) if existing != value => {
                    conflicting.insert(key.clone());
                }
                Some(_) => {}
                None => {
                    merged.insert(key.clone(), value.clone());
                }
            }
        }
    }
    merged.retain(|key, _| !conflicting.contains(key));
    merged
}

/// Outer-join `arrays` into one dataset
///
/// Disagreeing coordinate references only produce a warning; reprojecting the
/// inputs beforehand is the caller's job.
///
/// # Errors
///
/// - `ValueConflict` if two arrays hold different values for the same variable and coordinate
/// - `DimensionMismatch` if a variable name is used on different axis sets
/// - `InvalidArray` if an array repeats a coordinate value
pub fn merge(arrays: &[SampleArray]) -> Result<MergedDataset> {
    let references: BTreeSet<Option<&Crs>> = arrays.iter().map(SampleArray::crs).collect();
    if references.len() > 1 {
        tracing::warn!(
            references = ?references.iter().map(|c| c.map(Crs::as_str)).collect::<Vec<_>>(),
            "merged arrays use different coordinate references, values may be misaligned"
        );
    }
    let crs = match references.len() {
        1 => references.into_iter().next().flatten().cloned(),
        _ => None,
    };

    let axes = union_axes(arrays)?;
    let mut variables: BTreeMap<String, MergedVariable> = BTreeMap::new();

    for array in arrays {
        let dims = array.dims();
        let positions: Vec<Vec<usize>> = dims
            .iter()
            .map(|d| union_positions(&axes, array.axes(), *d))
            .collect();
        let shape: Vec<usize> = dims.iter().filter_map(|d| axes.len(*d)).collect();

        for (name, block) in array.variables() {
            let merged = variables
                .entry(name.clone())
                .or_insert_with(|| MergedVariable {
                    dims: dims.clone(),
                    data: ArrayD::from_elem(IxDyn(&shape), f64::NAN),
                });
            if merged.dims != dims {
                return Err(GeoCubeError::DimensionMismatch {
                    variable: name.clone(),
                });
            }

            for (index, &value) in block.indexed_iter() {
                if value.is_nan() {
                    continue;
                }
                let target: Vec<usize> = (0..dims.len()).map(|i| positions[i][index[i]]).collect();
                let cell = &mut merged.data[IxDyn(&target)];
                if cell.is_nan() {
                    *cell = value;
                } else if *cell != value {
                    let coordinate = dims
                        .iter()
                        .zip(&target)
                        .map(|(d, &i)| format!("{d}={}", axes.label(*d, i)))
                        .collect::<Vec<_>>()
                        .join(", ");
                    return Err(GeoCubeError::ValueConflict {
                        variable: name.clone(),
                        coordinate,
                    });
                }
            }
        }
    }

    tracing::debug!(
        arrays = arrays.len(),
        variables = variables.len(),
        shape = ?axes.shape(),
        "merged arrays"
    );

    Ok(MergedDataset {
        axes,
        variables,
        crs,
        attributes: merged_attributes(arrays),
    })
}
