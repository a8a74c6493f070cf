//! Pixel drilling at survey points
//!
//! Reads the pixels around located, timestamped survey points from GeoTIFF
//! images and STAC catalogue items, and computes per-point statistics.

pub mod io;
pub mod tiff;
pub mod utils;
pub mod compression;
pub mod extractor;
pub mod coordinate;
pub mod raster;
pub mod errors;
pub mod item;
pub mod point;
pub mod stats;
pub mod stac;
pub mod drill;
pub mod config;
pub mod commands;
pub mod api;

pub use crate::api::PixDrill;

pub use config::DrillConfig;
pub use coordinate::{AmbiguousBufferPolicy, BufferUnit, CoordinateSystem, CoordinateSystemFactory};
pub use drill::{drill, CatalogRequest, DrillRequest, IgnoreValue, ItemDriller};
pub use errors::{BoxedError, DrillError, DrillResult};
pub use extractor::{ArrayInfo, MaskedArray, RoiShape};
pub use item::{CatalogItem, ImageItem, Item};
pub use point::{parse_time, SurveyPoint};
pub use stats::{PointStats, StatValue, StdStat, UserStat};
