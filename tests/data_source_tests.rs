//! Loading sample arrays from interchange files and custom sources

use async_trait::async_trait;
use futures::TryStreamExt;
use geocube::{
    data_source::{
        load_all, parse_timestamp, stream_arrays, ArrayRecord, ArraySource, JsonArraySource,
    },
    errors::{GeoCubeError, Result},
    model::{Axes, Crs, Dim, SampleArray},
};
use std::fs;
use tempfile::tempdir;

const STATION: &str = r#"{
    "name": "station",
    "crs": "epsg:4326",
    "time": ["2024-01-01", "2024-01-01T06:00:00", "2024-01-01T12:00:00Z"],
    "variables": {"t2m": [271.5, null, 273.0]},
    "attributes": {"units": "K"}
}"#;

const TILE: &str = r#"{
    "name": "tile",
    "y": [10.0, 20.0],
    "x": [1.0, 2.0, 3.0],
    "variables": {"ndvi": [0.1, 0.2, 0.3, 0.4, 0.5, 0.6]}
}"#;

#[test]
fn test_parse_timestamp_formats() {
    let midnight = parse_timestamp("2024-03-01").unwrap();
    assert_eq!(midnight.to_string(), "2024-03-01 00:00:00");
    let naive = parse_timestamp("2024-03-01T06:30:00").unwrap();
    assert_eq!(naive.to_string(), "2024-03-01 06:30:00");
    let offset = parse_timestamp("2024-03-01T06:30:00+02:00").unwrap();
    assert_eq!(offset.to_string(), "2024-03-01 04:30:00");
    assert!(parse_timestamp("yesterday").is_err());
}

#[test]
fn test_record_conversion() {
    let record: ArrayRecord = serde_json::from_str(STATION).unwrap();
    let array = SampleArray::try_from(record).unwrap();

    assert_eq!(array.name(), "station");
    assert_eq!(array.dims(), vec![Dim::Time]);
    assert_eq!(array.crs(), Some(&Crs::from_epsg(4326)));
    assert_eq!(array.attributes().get("units").map(String::as_str), Some("K"));

    let t2m = array.variable("t2m").unwrap();
    assert_eq!(t2m[[0]], 271.5);
    assert!(t2m[[1]].is_nan(), "null becomes a missing value");
    assert_eq!(t2m[[2]], 273.0);

    let mut bad: ArrayRecord = serde_json::from_str(TILE).unwrap();
    bad.variables.insert("short".to_string(), vec![Some(1.0)]);
    assert!(matches!(
        SampleArray::try_from(bad),
        Err(GeoCubeError::ArrayError(_))
    ));
}

#[tokio::test]
async fn test_json_source_lists_and_loads() {
    let dir = tempdir().expect("Failed to create temp dir");
    fs::write(dir.path().join("tile.array.json"), TILE).unwrap();
    fs::write(dir.path().join("station.array.json"), STATION).unwrap();
    fs::write(dir.path().join("notes.txt"), "not an array").unwrap();

    let source = JsonArraySource::new(dir.path()).with_default_reference(Some(Crs::from_epsg(3035)));
    assert_eq!(source.list_arrays().await.unwrap(), vec!["station", "tile"]);

    let tile = source.load_array("tile").await.unwrap();
    assert_eq!(tile.axes().shape(), vec![2, 3]);
    // No reference in the file, the default is assigned
    assert_eq!(tile.crs(), Some(&Crs::from_epsg(3035)));

    let station = source.load_array("station").await.unwrap();
    assert_eq!(station.crs(), Some(&Crs::from_epsg(4326)));

    let plain = JsonArraySource::new(dir.path());
    assert_eq!(plain.load_array("tile").await.unwrap().crs(), None);
    assert!(matches!(
        plain.load_array("missing").await,
        Err(GeoCubeError::IoError(_))
    ));
}

#[tokio::test]
async fn test_load_all_skips_broken_arrays() {
    let dir = tempdir().expect("Failed to create temp dir");
    fs::write(dir.path().join("a.array.json"), TILE).unwrap();
    fs::write(dir.path().join("b.array.json"), "{ truncated").unwrap();
    fs::write(dir.path().join("c.array.json"), STATION).unwrap();

    let source = JsonArraySource::new(dir.path());
    let arrays = load_all(&source).await.unwrap();
    let names: Vec<&str> = arrays.iter().map(SampleArray::name).collect();
    assert_eq!(names, vec!["tile", "station"]);

    let streamed: Result<Vec<SampleArray>> = stream_arrays(&source).try_collect().await;
    assert!(matches!(streamed, Err(GeoCubeError::JsonError(_))));
}

#[tokio::test]
async fn test_load_all_fails_on_missing_directory() {
    let source = JsonArraySource::new("/nonexistent/geocube/arrays");
    assert!(matches!(load_all(&source).await, Err(GeoCubeError::IoError(_))));
}

struct InMemory {
    arrays: Vec<SampleArray>,
}

#[async_trait]
impl ArraySource for InMemory {
    async fn list_arrays(&self) -> Result<Vec<String>> {
        Ok(self.arrays.iter().map(|a| a.name().to_string()).collect())
    }

    async fn load_array(&self, name: &str) -> Result<SampleArray> {
        self.arrays
            .iter()
            .find(|a| a.name() == name)
            .cloned()
            .ok_or_else(|| GeoCubeError::Generic(format!("unknown array '{name}'")))
    }
}

#[tokio::test]
async fn test_custom_source_keeps_listing_order() {
    let make = |name: &str| {
        SampleArray::new(name, Axes::spatial(vec![0.0], vec![0.0]), None)
            .and_then(|a| a.with_values("v", vec![1.0]))
            .unwrap()
    };
    let source = InMemory {
        arrays: vec![make("zulu"), make("alpha"), make("mike")],
    };

    let loaded = load_all(&source).await.unwrap();
    let names: Vec<&str> = loaded.iter().map(SampleArray::name).collect();
    assert_eq!(names, vec!["zulu", "alpha", "mike"]);

    let streamed: Vec<SampleArray> = stream_arrays(&source).try_collect().await.unwrap();
    assert_eq!(streamed, loaded);
}
