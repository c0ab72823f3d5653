//! Centralized error handling for geocube
//!
//! Grid construction, binning, aggregation and merging all report failures through
//! [`GeoCubeError`]. Coordinate-reference disagreement between inputs is not an error:
//! it is logged as a warning and processing continues.

use std::fmt;

/// Main error type for geocube operations
#[derive(Debug)]
pub enum GeoCubeError {
    /// No input array exposes the coordinate axis a grid needs
    MissingAxis { axis: String },

    /// Integration mode string is not one of `spatiotemporal`, `spatial`, `temporal`
    UnsupportedMode { mode: String },

    /// Aggregate name is not a registered reduction
    UnsupportedAggregate { name: String },

    /// Precision code could not be parsed into a calendar step
    InvalidPrecision { code: String },

    /// A numeric or structural run parameter is out of range
    InvalidParameter { message: String },

    /// A spatial grid was requested but no coordinate reference is known
    MissingReference,

    /// A sample array is internally inconsistent
    InvalidArray { name: String, message: String },

    /// Coordinates cannot be placed because the grid axis has no bins
    EmptyAxis { axis: String },

    /// Two merged arrays disagree on a value at the same coordinate
    ValueConflict { variable: String, coordinate: String },

    /// The same variable name appears on different axis sets during a merge
    DimensionMismatch { variable: String },

    /// Thread pool configuration error
    ThreadPoolError(String),

    /// I/O operation errors
    IoError(std::io::Error),

    /// Parameter or interchange file decoding errors
    JsonError(serde_json::Error),

    /// Array shape or dimension error
    ArrayError(ndarray::ShapeError),

    /// Generic error for everything else
    Generic(String),
}

impl fmt::Display for GeoCubeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeoCubeError::MissingAxis { axis } => {
                write!(f, "No {} coordinates found in any of the input arrays", axis)
            }
            GeoCubeError::UnsupportedMode { mode } => {
                write!(f, "Integration type '{}' not supported", mode)
            }
            GeoCubeError::UnsupportedAggregate { name } => {
                write!(f, "Aggregate '{}' is not a supported reduction", name)
            }
            GeoCubeError::InvalidPrecision { code } => {
                write!(f, "Invalid precision code '{}'", code)
            }
            GeoCubeError::InvalidParameter { message } => write!(f, "Invalid parameter: {}", message),
            GeoCubeError::MissingReference => write!(
                f,
                "No coordinate reference given and none of the input arrays carries one"
            ),
            GeoCubeError::InvalidArray { name, message } => {
                write!(f, "Invalid sample array '{}': {}", name, message)
            }
            GeoCubeError::EmptyAxis { axis } => {
                write!(f, "Grid axis '{}' is empty, coordinates cannot be binned", axis)
            }
            GeoCubeError::ValueConflict { variable, coordinate } => write!(
                f,
                "Conflicting values for variable '{}' at {}",
                variable, coordinate
            ),
            GeoCubeError::DimensionMismatch { variable } => write!(
                f,
                "Variable '{}' is defined on different axes in the merged arrays",
                variable
            ),
            GeoCubeError::ThreadPoolError(msg) => write!(f, "Thread pool error: {}", msg),
            GeoCubeError::IoError(e) => write!(f, "I/O error: {}", e),
            GeoCubeError::JsonError(e) => write!(f, "JSON error: {}", e),
            GeoCubeError::ArrayError(e) => write!(f, "Array error: {}", e),
            GeoCubeError::Generic(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for GeoCubeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GeoCubeError::IoError(e) => Some(e),
            GeoCubeError::JsonError(e) => Some(e),
            GeoCubeError::ArrayError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for GeoCubeError {
    fn from(error: std::io::Error) -> Self {
        GeoCubeError::IoError(error)
    }
}

impl From<serde_json::Error> for GeoCubeError {
    fn from(error: serde_json::Error) -> Self {
        GeoCubeError::JsonError(error)
    }
}

impl From<ndarray::ShapeError> for GeoCubeError {
    fn from(error: ndarray::ShapeError) -> Self {
        GeoCubeError::ArrayError(error)
    }
}

impl From<String> for GeoCubeError {
    fn from(error: String) -> Self {
        GeoCubeError::Generic(error)
    }
}

impl From<&str> for GeoCubeError {
    fn from(error: &str) -> Self {
        GeoCubeError::Generic(error.to_string())
    }
}

/// Result type alias for geocube operations
pub type Result<T> = std::result::Result<T, GeoCubeError>;
