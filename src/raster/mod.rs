//! Raster datasets
//!
//! The drill loop reads pixels through the `RasterDataset` trait and opens
//! images through a `RasterOpener`, so that GeoTIFF files, remote assets
//! and in-memory rasters are interchangeable.

mod geotiff;
mod memory;

use ndarray::Array2;

use crate::coordinate::{BoundingBox, CoordinateSystem, GeoTransform};
use crate::errors::DrillResult;
use crate::extractor::Region;

pub use geotiff::{GeoTiffDataset, GeoTiffOpener};
pub use memory::{MemoryOpener, MemoryRaster};

/// Metadata of an opened raster
#[derive(Debug, Clone, PartialEq)]
pub struct RasterInfo {
    pub width: u32,
    pub height: u32,
    pub band_count: usize,
    pub geotransform: GeoTransform,
    pub crs: CoordinateSystem,
    /// No-data value per band
    pub nodata: Vec<Option<f64>>,
    /// Band descriptions, empty where unset
    pub band_names: Vec<String>,
    /// Sample type name, e.g. `uint16` or `float32`
    pub data_type: String,
}

impl RasterInfo {
    /// World extent of the raster in its own coordinate system
    pub fn extent(&self) -> BoundingBox {
        self.geotransform.extent(self.width, self.height)
    }

    /// No-data value of a band
    pub fn band_nodata(&self, band: usize) -> Option<f64> {
        self.nodata.get(band).copied().flatten()
    }
}

/// An opened raster that supports windowed reads
pub trait RasterDataset: Send {
    /// Metadata of the raster
    fn info(&self) -> &RasterInfo;

    /// Reads one band over a pixel window
    ///
    /// # Arguments
    /// * `band` - Zero-based band index
    /// * `region` - Window inside the raster
    ///
    /// # Returns
    /// A rows x columns array of sample values
    fn read_window(&mut self, band: usize, region: Region) -> DrillResult<Array2<f64>>;
}

/// Opens rasters by path or URL
pub trait RasterOpener: Send + Sync {
    fn open(&self, href: &str) -> DrillResult<Box<dyn RasterDataset>>;
}
