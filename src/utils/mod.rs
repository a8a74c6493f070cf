//! Utility modules shared across the crate
//!
//! Logging setup, progress reporting and GDAL metadata parsing.

pub mod logger;
pub mod progress;
pub(crate) mod xml_utils;
