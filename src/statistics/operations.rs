//! Core statistical operations
//!
//! Every aggregate maps to a pure function over the samples of one bin. NaN samples
//! are treated as missing and skipped by all of them.

use crate::errors::{GeoCubeError, Result};
use std::fmt;
use std::str::FromStr;

/// A reduction over the samples of one bin
pub type Reducer = fn(&[f64]) -> f64;

/// Supported aggregates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Aggregate {
    /// Arithmetic mean
    Mean,
    /// Sum of values, 0 for an empty bin
    Sum,
    /// Minimum value
    Min,
    /// Maximum value
    Max,
    /// Number of valid samples
    Count,
    /// Sample standard deviation (one delta degree of freedom)
    Std,
    /// Sample variance (one delta degree of freedom)
    Var,
    Median,
    /// Product of values, 1 for an empty bin
    Prod,
    /// First valid sample in record order
    First,
    /// Last valid sample in record order
    Last,
}

const REGISTRY: &[(&str, Aggregate)] = &[
    ("mean", Aggregate::Mean),
    ("sum", Aggregate::Sum),
    ("min", Aggregate::Min),
    ("max", Aggregate::Max),
    ("count", Aggregate::Count),
    ("std", Aggregate::Std),
    ("var", Aggregate::Var),
    ("median", Aggregate::Median),
    ("prod", Aggregate::Prod),
    ("first", Aggregate::First),
    ("last", Aggregate::Last),
];

/// Identifier and aggregate of every registered reduction
#[must_use]
pub fn registry() -> &'static [(&'static str, Aggregate)] {
    REGISTRY
}

impl Aggregate {
    /// Identifier used in output variable names
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mean => "mean",
            Self::Sum => "sum",
            Self::Min => "min",
            Self::Max => "max",
            Self::Count => "count",
            Self::Std => "std",
            Self::Var => "var",
            Self::Median => "median",
            Self::Prod => "prod",
            Self::First => "first",
            Self::Last => "last",
        }
    }

    #[must_use]
    pub fn reducer(self) -> Reducer {
        match self {
            Self::Mean => mean,
            Self::Sum => sum,
            Self::Min => min,
            Self::Max => max,
            Self::Count => count,
            Self::Std => std_dev,
            Self::Var => var,
            Self::Median => median,
            Self::Prod => prod,
            Self::First => first,
            Self::Last => last,
        }
    }

    #[must_use]
    pub fn reduce(self, samples: &[f64]) -> f64 {
        (self.reducer())(samples)
    }

    /// Parse a list of identifiers, failing on the first unknown one
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedAggregate` naming the offending identifier.
    pub fn parse_all<S: AsRef<str>>(names: &[S]) -> Result<Vec<Self>> {
        names.iter().map(|n| n.as_ref().parse()).collect()
    }
}

impl FromStr for Aggregate {
    type Err = GeoCubeError;

    fn from_str(s: &str) -> Result<Self> {
        REGISTRY
            .iter()
            .find(|(name, _)| *name == s)
            .map(|(_, aggregate)| *aggregate)
            .ok_or_else(|| GeoCubeError::UnsupportedAggregate {
                name: s.to_string(),
            })
    }
}

impl fmt::Display for Aggregate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn valid(samples: &[f64]) -> impl Iterator<Item = f64> + '_ {
    samples.iter().copied().filter(|v| !v.is_nan())
}

fn sum(samples: &[f64]) -> f64 {
    valid(samples).sum()
}

fn prod(samples: &[f64]) -> f64 {
    valid(samples).product()
}

fn count(samples: &[f64]) -> f64 {
    valid(samples).count() as f64
}

fn mean(samples: &[f64]) -> f64 {
    let (total, n) = valid(samples).fold((0.0_f64, 0_usize), |(s, n), v| (s + v, n + 1));
    if n == 0 {
        f64::NAN
    } else {
        total / n as f64
    }
}

fn min(samples: &[f64]) -> f64 {
    valid(samples).reduce(f64::min).unwrap_or(f64::NAN)
}

fn max(samples: &[f64]) -> f64 {
    valid(samples).reduce(f64::max).unwrap_or(f64::NAN)
}

fn var(samples: &[f64]) -> f64 {
    let n = valid(samples).count();
    if n < 2 {
        return f64::NAN;
    }
    let center = mean(samples);
    let squares: f64 = valid(samples).map(|v| (v - center).powi(2)).sum();
    squares / (n - 1) as f64
}

fn std_dev(samples: &[f64]) -> f64 {
    var(samples).sqrt()
}

fn median(samples: &[f64]) -> f64 {
    let mut sorted: Vec<f64> = valid(samples).collect();
    if sorted.is_empty() {
        return f64::NAN;
    }
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

fn first(samples: &[f64]) -> f64 {
    valid(samples).next().unwrap_or(f64::NAN)
}

fn last(samples: &[f64]) -> f64 {
    valid(samples).last().unwrap_or(f64::NAN)
}
