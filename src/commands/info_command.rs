//! Raster inspection command
//!
//! Prints the size, bands, coordinate system, geotransform and no-data
//! values of an image, as seen by the drill loop.

use clap::ArgMatches;
use log::info;

use super::command_traits::Command;
use crate::errors::{DrillError, DrillResult};
use crate::raster::{GeoTiffOpener, RasterInfo, RasterOpener};

/// Command for describing a raster
pub struct InfoCommand {
    input_file: String,
}

impl InfoCommand {
    pub fn new(args: &ArgMatches) -> DrillResult<Self> {
        let input_file = args
            .get_one::<String>("info")
            .ok_or_else(|| DrillError::Configuration("Missing image to inspect".to_string()))?
            .clone();
        Ok(InfoCommand { input_file })
    }
}

/// Human-readable summary of a raster
pub fn describe(href: &str, info: &RasterInfo) -> String {
    let extent = info.extent();
    let mut out = format!("Raster: {}\n", href);
    out.push_str(&format!("  Size: {} x {} pixels, {} band(s) of {}\n", info.width, info.height, info.band_count, info.data_type));
    out.push_str(&format!("  Coordinate system: {}\n", info.crs));
    out.push_str(&format!("  Geotransform: {:?}\n", info.geotransform.coefficients()));
    out.push_str(&format!(
        "  Extent: ({}, {}) - ({}, {})\n",
        extent.min_x, extent.min_y, extent.max_x, extent.max_y
    ));
    for band in 0..info.band_count {
        let name = info.band_names.get(band).filter(|n| !n.is_empty()).map(String::as_str).unwrap_or("-");
        match info.band_nodata(band) {
            Some(nodata) => out.push_str(&format!("  Band {}: {} (no-data {})\n", band + 1, name, nodata)),
            None => out.push_str(&format!("  Band {}: {}\n", band + 1, name)),
        }
    }
    out
}

impl Command for InfoCommand {
    fn execute(&self) -> DrillResult<()> {
        let dataset = GeoTiffOpener.open(&self.input_file)?;
        info!("Inspecting {}", self.input_file);
        print!("{}", describe(&self.input_file, dataset.info()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinate::{CoordinateSystem, GeoTransform};
    use crate::raster::{MemoryRaster, RasterDataset};
    use ndarray::Array2;

    #[test]
    fn test_describe() {
        let gt = GeoTransform::north_up(0.0, 20.0, 10.0, 10.0).unwrap();
        let raster = MemoryRaster::new(vec![Array2::zeros((2, 3))], gt, CoordinateSystem::WGS84)
            .unwrap()
            .with_nodata(-1.0)
            .with_band_names(&["red"]);
        let text = describe("mem", raster.info());
        assert!(text.contains("3 x 2 pixels"));
        assert!(text.contains("Band 1: red (no-data -1)"));
    }
}
