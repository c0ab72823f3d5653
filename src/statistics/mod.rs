//! Named reductions and parallel group reduction
//!
//! This module provides the registry of statistics that can summarize the samples
//! falling into one grid bin, and the parallel machinery that applies them.
//!
//! # Organization
//!
//! - [`operations`]: the [`Aggregate`] registry and its pure reduction functions
//! - [`parallel`]: reducing many bin groups at once with Rayon

pub mod operations;
pub mod parallel;

pub use operations::{registry, Aggregate, Reducer};
pub use parallel::{group_samples, reduce_groups, BinGroup};
