//! Loading sample arrays
//!
//! Decoding raster formats and reprojecting is done upstream. This module only
//! defines the narrow contract the cube pipeline consumes ([`ArraySource`]) and a
//! JSON interchange implementation for arrays that were already standardized to
//! `time`/`y`/`x` coordinates.

use crate::errors::{GeoCubeError, Result};
use crate::model::{Axes, Crs, SampleArray};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::pin::Pin;

/// File suffix of interchange files read by [`JsonArraySource`]
pub const ARRAY_FILE_SUFFIX: &str = ".array.json";

/// Parse a timestamp in RFC 3339, `YYYY-MM-DDTHH:MM:SS` or `YYYY-MM-DD` form
///
/// Offsets are converted to UTC and dropped.
///
/// # Errors
///
/// Returns `Generic` if none of the formats match.
pub fn parse_timestamp(s: &str) -> Result<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.naive_utc());
    }
    if let Ok(ndt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(ndt);
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(date.and_hms_opt(0, 0, 0).unwrap_or_default());
    }
    Err(GeoCubeError::Generic(format!("Invalid timestamp '{s}'")))
}

/// JSON form of a [`SampleArray`]
///
/// Variable values are row-major over the present axes in `time`, `y`, `x` order;
/// `null` entries become NaN.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayRecord {
    pub name: String,
    #[serde(default)]
    pub crs: Option<String>,
    #[serde(default)]
    pub time: Option<Vec<String>>,
    #[serde(default)]
    pub y: Option<Vec<f64>>,
    #[serde(default)]
    pub x: Option<Vec<f64>>,
    pub variables: BTreeMap<String, Vec<Option<f64>>>,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

impl TryFrom<ArrayRecord> for SampleArray {
    type Error = GeoCubeError;

    fn try_from(record: ArrayRecord) -> Result<Self> {
        let time = record
            .time
            .map(|values| values.iter().map(|t| parse_timestamp(t)).collect::<Result<Vec<_>>>())
            .transpose()?;
        let axes = Axes {
            time,
            y: record.y,
            x: record.x,
        };

        let mut array = SampleArray::new(record.name, axes, record.crs.map(Crs::new))?;
        for (name, values) in record.variables {
            let values = values.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect();
            array = array.with_values(name, values)?;
        }
        for (key, value) in record.attributes {
            array = array.with_attribute(key, value);
        }
        Ok(array)
    }
}

/// Where the pipeline gets its sample arrays from
#[async_trait]
pub trait ArraySource {
    /// Names of all arrays, in the order they should be aggregated
    async fn list_arrays(&self) -> Result<Vec<String>>;

    /// Load one array by name
    async fn load_array(&self, name: &str) -> Result<SampleArray>;
}

/// Load every array of `source`, skipping the ones that fail
///
/// # Errors
///
/// Only fails if the arrays cannot be listed.
pub async fn load_all<S: ArraySource + Sync + ?Sized>(source: &S) -> Result<Vec<SampleArray>> {
    let names = source.list_arrays().await?;
    let loaded = futures::future::join_all(names.iter().map(|n| source.load_array(n))).await;

    let mut arrays = Vec::with_capacity(names.len());
    for (name, result) in names.iter().zip(loaded) {
        match result {
            Ok(array) => arrays.push(array),
            Err(e) => tracing::warn!(array = %name, error = %e, "failed to load array, skipped"),
        }
    }

    tracing::info!(
        discovered = names.len(),
        loaded = arrays.len(),
        "loaded sample arrays"
    );
    Ok(arrays)
}

/// Stream the arrays of `source` one at a time, stopping at the first error
pub fn stream_arrays<'a, S: ArraySource + Sync + ?Sized>(
    source: &'a S,
) -> Pin<Box<dyn Stream<Item = Result<SampleArray>> + Send + 'a>> {
    Box::pin(async_stream::try_stream! {
        let names = source.list_arrays().await?;
        for name in names {
            let array = source.load_array(&name).await?;
            yield array;
        }
    })
}

/// Reads `<name>.array.json` interchange files from one directory
#[derive(Debug, Clone)]
pub struct JsonArraySource {
    root: PathBuf,
    default_reference: Option<Crs>,
}

impl JsonArraySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            default_reference: None,
        }
    }

    /// Reference assigned to arrays that carry none
    #[must_use]
    pub fn with_default_reference(mut self, reference: Option<Crs>) -> Self {
        self.default_reference = reference;
        self
    }
}

#[async_trait]
impl ArraySource for JsonArraySource {
    async fn list_arrays(&self) -> Result<Vec<String>> {
        let mut entries = tokio::fs::read_dir(&self.root).await?;
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let file_name = entry.file_name();
            if let Some(name) = file_name.to_str().and_then(|n| n.strip_suffix(ARRAY_FILE_SUFFIX)) {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    async fn load_array(&self, name: &str) -> Result<SampleArray> {
        let path = self.root.join(format!("{name}{ARRAY_FILE_SUFFIX}"));
        let text = tokio::fs::read_to_string(&path).await?;
        let mut record: ArrayRecord = serde_json::from_str(&text)?;

        if record.crs.is_none() {
            tracing::warn!(
                array = %name,
                "array has no coordinate reference, this might lead to unexpected results"
            );
            record.crs = self.default_reference.as_ref().map(|c| c.as_str().to_string());
        }

        SampleArray::try_from(record)
    }
}
