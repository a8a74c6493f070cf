//! In-memory rasters
//!
//! Useful for drilling arrays already held by the caller and for tests.

use std::collections::HashMap;

use ndarray::{s, Array2};

use super::{RasterDataset, RasterInfo, RasterOpener};
use crate::coordinate::{CoordinateSystem, GeoTransform};
use crate::errors::{DrillError, DrillResult};
use crate::extractor::Region;

/// A georeferenced stack of bands held in memory
#[derive(Debug, Clone)]
pub struct MemoryRaster {
    info: RasterInfo,
    bands: Vec<Array2<f64>>,
}

impl MemoryRaster {
    /// Builds a raster from bands of equal shape
    pub fn new(bands: Vec<Array2<f64>>, geotransform: GeoTransform, crs: CoordinateSystem) -> DrillResult<Self> {
        let (rows, cols) = bands
            .first()
            .map(|b| b.dim())
            .ok_or_else(|| DrillError::Configuration("a raster needs at least one band".to_string()))?;
        if bands.iter().any(|b| b.dim() != (rows, cols)) {
            return Err(DrillError::Configuration("raster bands differ in shape".to_string()));
        }

        let band_count = bands.len();
        let info = RasterInfo {
            width: cols as u32,
            height: rows as u32,
            band_count,
            geotransform,
            crs,
            nodata: vec![None; band_count],
            band_names: vec![String::new(); band_count],
            data_type: "float64".to_string(),
        };
        Ok(MemoryRaster { info, bands })
    }

    /// Sets the same no-data value on every band
    pub fn with_nodata(mut self, nodata: f64) -> Self {
        self.info.nodata = vec![Some(nodata); self.info.band_count];
        self
    }

    /// Sets band descriptions
    pub fn with_band_names(mut self, names: &[&str]) -> Self {
        for (slot, name) in self.info.band_names.iter_mut().zip(names) {
            *slot = name.to_string();
        }
        self
    }
}

impl RasterDataset for MemoryRaster {
    fn info(&self) -> &RasterInfo {
        &self.info
    }

    fn read_window(&mut self, band: usize, region: Region) -> DrillResult<Array2<f64>> {
        let data = self
            .bands
            .get(band)
            .ok_or_else(|| DrillError::Read(format!("band {} of {}", band + 1, self.info.band_count)))?;
        if region.end_x() > self.info.width || region.end_y() > self.info.height {
            return Err(DrillError::Read(format!(
                "window {:?} exceeds raster {}x{}",
                region, self.info.width, self.info.height
            )));
        }

        let (x0, y0) = (region.x as usize, region.y as usize);
        Ok(data
            .slice(s![y0..y0 + region.height as usize, x0..x0 + region.width as usize])
            .to_owned())
    }
}

/// Serves registered in-memory rasters by name
#[derive(Debug, Clone, Default)]
pub struct MemoryOpener {
    rasters: HashMap<String, MemoryRaster>,
}

impl MemoryOpener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a raster under an href
    pub fn insert(&mut self, href: &str, raster: MemoryRaster) {
        self.rasters.insert(href.to_string(), raster);
    }

    /// Builder form of `insert`
    pub fn with(mut self, href: &str, raster: MemoryRaster) -> Self {
        self.insert(href, raster);
        self
    }
}

impl RasterOpener for MemoryOpener {
    fn open(&self, href: &str) -> DrillResult<Box<dyn RasterDataset>> {
        self.rasters
            .get(href)
            .cloned()
            .map(|r| Box::new(r) as Box<dyn RasterDataset>)
            .ok_or_else(|| DrillError::Read(format!("{}: no such raster", href)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn raster() -> MemoryRaster {
        let gt = GeoTransform::north_up(0.0, 30.0, 10.0, 10.0).unwrap();
        MemoryRaster::new(vec![array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0], [7.0, 8.0, 9.0]]], gt, CoordinateSystem::UTM(55, false)).unwrap()
    }

    #[test]
    fn test_read_window() {
        let mut r = raster();
        let window = r.read_window(0, Region::new(1, 1, 2, 2)).unwrap();
        assert_eq!(window, array![[5.0, 6.0], [8.0, 9.0]]);
        assert!(r.read_window(0, Region::new(2, 2, 2, 2)).is_err());
        assert!(r.read_window(1, Region::new(0, 0, 1, 1)).is_err());
    }

    #[test]
    fn test_opener_unknown_href() {
        let opener = MemoryOpener::new().with("a.tif", raster());
        assert!(opener.open("a.tif").is_ok());
        assert!(matches!(opener.open("b.tif"), Err(DrillError::Read(_))));
    }

    #[test]
    fn test_mismatched_bands_rejected() {
        let gt = GeoTransform::north_up(0.0, 0.0, 1.0, 1.0).unwrap();
        let result = MemoryRaster::new(vec![array![[1.0]], array![[1.0, 2.0]]], gt, CoordinateSystem::WGS84);
        assert!(result.is_err());
    }
}
