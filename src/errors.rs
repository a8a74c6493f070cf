//! Error types for pixel drilling
//!
//! Geometry and read failures are recorded per point/item by the drill
//! loop. Configuration and contract errors are returned to the caller.

use std::error::Error;
use std::fmt;
use std::io;

use crate::tiff::errors::TiffError;

/// Boxed error returned by user statistic functions
pub type BoxedError = Box<dyn Error + Send + Sync>;

/// Errors raised while drilling
#[derive(Debug)]
pub enum DrillError {
    /// Coordinate transform could not be built or applied
    Reprojection(String),
    /// Raster open or windowed read failed
    Read(String),
    /// A standard statistic was asked to process a multi-band array
    UnsupportedBandCount {
        asset_id: String,
        bands: usize,
    },
    /// Invalid combination of caller inputs
    Configuration(String),
    /// A statistic was requested twice for the same item without a reset
    StatAlreadyComputed {
        item_id: String,
        stat_name: String,
    },
    /// A user statistic function returned an error
    UserStat {
        stat_name: String,
        source: BoxedError,
    },
    /// Catalogue search failed
    Catalog(String),
    /// I/O error
    Io(io::Error),
    /// Error from the GeoTIFF backend
    Tiff(TiffError),
}

impl fmt::Display for DrillError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DrillError::Reprojection(msg) => write!(f, "Reprojection error: {}", msg),
            DrillError::Read(msg) => write!(f, "Read error: {}", msg),
            DrillError::UnsupportedBandCount { asset_id, bands } => write!(
                f,
                "Standard statistics need single-band arrays, asset '{}' has {} bands",
                asset_id, bands
            ),
            DrillError::Configuration(msg) => write!(f, "Configuration error: {}", msg),
            DrillError::StatAlreadyComputed { item_id, stat_name } => write!(
                f,
                "Statistic '{}' already computed for item '{}', reset the point first",
                stat_name, item_id
            ),
            DrillError::UserStat { stat_name, source } => {
                write!(f, "User statistic '{}' failed: {}", stat_name, source)
            }
            DrillError::Catalog(msg) => write!(f, "Catalogue search error: {}", msg),
            DrillError::Io(e) => write!(f, "I/O error: {}", e),
            DrillError::Tiff(e) => write!(f, "{}", e),
        }
    }
}

impl Error for DrillError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            DrillError::UserStat { source, .. } => Some(source.as_ref()),
            DrillError::Io(e) => Some(e),
            DrillError::Tiff(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for DrillError {
    fn from(error: io::Error) -> Self {
        DrillError::Io(error)
    }
}

impl From<TiffError> for DrillError {
    fn from(error: TiffError) -> Self {
        DrillError::Tiff(error)
    }
}

impl From<reqwest::Error> for DrillError {
    fn from(error: reqwest::Error) -> Self {
        DrillError::Catalog(error.to_string())
    }
}

impl From<serde_json::Error> for DrillError {
    fn from(error: serde_json::Error) -> Self {
        DrillError::Catalog(format!("invalid JSON: {}", error))
    }
}

impl DrillError {
    /// True for errors that are recorded per point/item instead of aborting a run
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            DrillError::Reprojection(_) | DrillError::Read(_) | DrillError::Io(_) | DrillError::Tiff(_)
        )
    }
}

/// Result type for drilling operations
pub type DrillResult<T> = Result<T, DrillError>;
