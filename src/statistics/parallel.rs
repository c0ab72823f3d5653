//! Grouping binned records and reducing the groups in parallel

use super::operations::Aggregate;
use crate::model::{BinnedArray, Dim};
use ndarray::ArrayD;
use rayon::prelude::*;
use std::collections::BTreeMap;

/// Samples sharing one bin key
#[derive(Debug, Clone, PartialEq)]
pub struct BinGroup {
    /// Grid bin index per grouping axis, in canonical axis order
    pub key: Vec<usize>,
    /// Sample values in record (row-major) order
    pub samples: Vec<f64>,
}

/// Group every record of `block` by its bin indices along `grouping`
///
/// `block` must be a data variable of `binned`. Axes of the array that are not in
/// `grouping` are folded into the groups. Groups are returned ordered by key.
#[must_use]
pub fn group_samples(binned: &BinnedArray, block: &ArrayD<f64>, grouping: &[Dim]) -> Vec<BinGroup> {
    let axes = binned.array().axes();
    let lookups: Vec<(usize, &[usize])> = grouping
        .iter()
        .filter_map(|dim| Some((axes.position(*dim)?, binned.bin_indices(*dim)?)))
        .collect();

    let mut groups: BTreeMap<Vec<usize>, Vec<f64>> = BTreeMap::new();
    for (index, &value) in block.indexed_iter() {
        let key: Vec<usize> = lookups.iter().map(|(pos, bins)| bins[index[*pos]]).collect();
        groups.entry(key).or_default().push(value);
    }

    groups
        .into_iter()
        .map(|(key, samples)| BinGroup { key, samples })
        .collect()
}

/// Reduce each group with `aggregate`, preserving group order
#[must_use]
pub fn reduce_groups(groups: &[BinGroup], aggregate: Aggregate) -> Vec<(Vec<usize>, f64)> {
    let reducer = aggregate.reducer();
    groups
        .par_iter()
        .map(|group| (group.key.clone(), reducer(&group.samples)))
        .collect()
}
