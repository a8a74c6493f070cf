//! Region-of-interest reads
//!
//! Converts a point's footprint into a pixel window, reads every band of
//! the window, masks no-data pixels and, for circular regions, the pixels
//! lying wholly outside the circle.

use std::fmt;
use std::str::FromStr;

use log::{debug, trace};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use super::array::{ArrayInfo, MaskedArray};
use super::region::Region;
use crate::coordinate::Footprint;
use crate::errors::{DrillError, DrillResult};
use crate::raster::{RasterDataset, RasterInfo};

/// Shape of a region of interest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RoiShape {
    /// Buffer is half the side of the square
    #[default]
    Square,
    /// Buffer is the radius of the circle
    Circle,
}

impl FromStr for RoiShape {
    type Err = DrillError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "square" => Ok(RoiShape::Square),
            "circle" => Ok(RoiShape::Circle),
            other => Err(DrillError::Configuration(format!("Unknown ROI shape: {}", other))),
        }
    }
}

impl fmt::Display for RoiShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoiShape::Square => write!(f, "square"),
            RoiShape::Circle => write!(f, "circle"),
        }
    }
}

/// Pixel window covering a footprint, clipped to the raster
///
/// Any pixel touched by the footprint is included. A zero buffer selects
/// the single pixel containing the point.
///
/// # Returns
/// The window, or `None` if the footprint lies outside the raster
pub fn pixel_window(info: &RasterInfo, footprint: &Footprint) -> Option<Region> {
    let (cx, cy) = footprint.centre;
    if footprint.is_point() {
        let (col, row) = info.geotransform.wld2pix(cx, cy);
        return Region::containing_pixel(col, row, info.width, info.height);
    }

    let bbox = footprint.bbox();
    let ul = info.geotransform.wld2pix(bbox.min_x, bbox.max_y);
    let lr = info.geotransform.wld2pix(bbox.max_x, bbox.min_y);
    Region::from_pixel_bounds(ul, lr, info.width, info.height)
}

/// Reads the pixels of a region of interest
///
/// # Arguments
/// * `dataset` - Opened raster
/// * `asset_id` - Name recorded in the result
/// * `footprint` - Point footprint in the raster's coordinate system
/// * `shape` - Shape of the region of interest
/// * `ignore_value` - No-data override; `None` uses each band's no-data value
///
/// # Returns
/// The masked band x row x column array and its position, or a read error
/// if the footprint lies outside the raster
pub fn read_roi(
    dataset: &mut dyn RasterDataset,
    asset_id: &str,
    footprint: &Footprint,
    shape: RoiShape,
    ignore_value: Option<f64>,
) -> DrillResult<ArrayInfo> {
    let info = dataset.info().clone();
    let region = pixel_window(&info, footprint).ok_or_else(|| {
        DrillError::Read(format!(
            "region of interest at ({}, {}) lies outside '{}'",
            footprint.centre.0, footprint.centre.1, asset_id
        ))
    })?;
    trace!("Reading window {:?} of '{}'", region, asset_id);

    let bands = (0..info.band_count)
        .map(|band| dataset.read_window(band, region))
        .collect::<DrillResult<Vec<Array2<f64>>>>()?;
    let mut data = MaskedArray::from_bands(bands)
        .ok_or_else(|| DrillError::Read(format!("'{}' returned bands of differing shapes", asset_id)))?;

    let (ulx, uly) = info.geotransform.pix2wld(region.x as f64, region.y as f64);
    let (lrx, lry) = info.geotransform.pix2wld(region.end_x() as f64, region.end_y() as f64);
    let (x_res, y_res) = info.geotransform.resolution();

    mask_nodata(&mut data, &info, ignore_value);

    let mut array_info = ArrayInfo {
        asset_id: asset_id.to_string(),
        data,
        xoff: region.x,
        yoff: region.y,
        win_xsize: region.width,
        win_ysize: region.height,
        ulx,
        uly,
        lrx,
        lry,
        x_res,
        y_res,
    };

    if shape == RoiShape::Circle && array_info.data.data().len() > 4 {
        mask_outside_circle(&mut array_info, footprint);
    }
    debug!(
        "Read {:?} pixels of '{}' at offset ({}, {})",
        array_info.data.shape(),
        asset_id,
        region.x,
        region.y
    );
    Ok(array_info)
}

/// Masks no-data per band: the override first, then the band's own value
fn mask_nodata(data: &mut MaskedArray, info: &RasterInfo, ignore_value: Option<f64>) {
    for band in 0..data.band_count() {
        if let Some(value) = ignore_value.or_else(|| info.band_nodata(band)) {
            data.mask_band_value(band, value);
        }
    }
}

/// Masks pixels whose four corners all lie outside the circle
fn mask_outside_circle(array_info: &mut ArrayInfo, footprint: &Footprint) {
    let (cx, cy) = footprint.centre;
    let radius_sq = footprint.buffer * footprint.buffer;
    let outside = |row: u32, col: u32| {
        let x = array_info.ulx + col as f64 * array_info.x_res;
        let y = array_info.uly - row as f64 * array_info.y_res;
        (x - cx).powi(2) + (y - cy).powi(2) > radius_sq
    };

    let mut masked = Vec::new();
    for row in 0..array_info.win_ysize {
        for col in 0..array_info.win_xsize {
            if outside(row, col) && outside(row, col + 1) && outside(row + 1, col) && outside(row + 1, col + 1) {
                masked.push((row as usize, col as usize));
            }
        }
    }
    trace!("Circle masks {} pixels of '{}'", masked.len(), array_info.asset_id);
    for (row, col) in masked {
        array_info.data.mask_pixel(row, col);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinate::{CoordinateSystem, GeoTransform};
    use crate::raster::MemoryRaster;
    use ndarray::Array2;

    fn footprint(x: f64, y: f64, buffer: f64) -> Footprint {
        Footprint { crs: CoordinateSystem::UTM(55, false), centre: (x, y), buffer }
    }

    fn raster(nodata: Option<f64>) -> MemoryRaster {
        // 10 x 10 pixels of 10 m, origin (0, 100); value = row * 10 + col
        let band = Array2::from_shape_fn((10, 10), |(r, c)| (r * 10 + c) as f64);
        let gt = GeoTransform::north_up(0.0, 100.0, 10.0, 10.0).unwrap();
        let r = MemoryRaster::new(vec![band], gt, CoordinateSystem::UTM(55, false)).unwrap();
        match nodata {
            Some(v) => r.with_nodata(v),
            None => r,
        }
    }

    #[test]
    fn test_window_inside_image() {
        let mut r = raster(None);
        let info = read_roi(&mut r, "b1", &footprint(50.0, 50.0, 15.0), RoiShape::Square, None).unwrap();
        assert_eq!(info.data.shape(), (1, 4, 4));
        assert_eq!((info.xoff, info.yoff), (3, 3));
        assert_eq!((info.ulx, info.uly, info.lrx, info.lry), (30.0, 70.0, 70.0, 30.0));
        assert_eq!((info.x_res, info.y_res), (10.0, 10.0));
        assert_eq!(info.data.count_valid(), 16);
    }

    #[test]
    fn test_window_clipped_at_edge() {
        let mut r = raster(None);
        let info = read_roi(&mut r, "b1", &footprint(5.0, 95.0, 15.0), RoiShape::Square, None).unwrap();
        assert_eq!(info.data.shape(), (1, 2, 2));
        assert_eq!((info.xoff, info.yoff), (0, 0));
    }

    #[test]
    fn test_outside_image_is_read_error() {
        let mut r = raster(None);
        let result = read_roi(&mut r, "b1", &footprint(500.0, 500.0, 15.0), RoiShape::Square, None);
        assert!(matches!(result, Err(DrillError::Read(_))));
    }

    #[test]
    fn test_zero_buffer_single_pixel() {
        let mut r = raster(None);
        let info = read_roi(&mut r, "b1", &footprint(25.0, 75.0, 0.0), RoiShape::Circle, None).unwrap();
        assert_eq!(info.data.shape(), (1, 1, 1));
        assert_eq!(info.data.valid_values(0), vec![22.0]);
    }

    #[test]
    fn test_nodata_from_image_and_override() {
        let mut r = raster(Some(44.0));
        let fp = footprint(45.0, 55.0, 10.0);
        let info = read_roi(&mut r, "b1", &fp, RoiShape::Square, None).unwrap();
        assert_eq!(info.data.shape(), (1, 3, 3));
        assert_eq!(info.data.valid_values(0), vec![33.0, 34.0, 35.0, 43.0, 45.0, 53.0, 54.0, 55.0]);

        let info = read_roi(&mut r, "b1", &fp, RoiShape::Square, Some(45.0)).unwrap();
        assert_eq!(info.data.count_masked(), 1);
        assert!(info.data.valid_values(0).contains(&44.0));
    }

    #[test]
    fn test_circle_masks_corners() {
        let mut r = raster(None);
        let info = read_roi(&mut r, "b1", &footprint(50.0, 50.0, 25.0), RoiShape::Circle, None).unwrap();
        assert_eq!(info.data.shape(), (1, 6, 6));
        // Only the four corner pixels lie wholly outside a 25 m radius
        assert_eq!(info.data.count_masked(), 4);
        let mask = info.data.mask();
        assert!(mask[[0, 0, 0]] && mask[[0, 0, 5]] && mask[[0, 5, 0]] && mask[[0, 5, 5]]);
        assert!(!mask[[0, 0, 1]]);
    }

    #[test]
    fn test_shape_parsing() {
        assert_eq!("Circle".parse::<RoiShape>().unwrap(), RoiShape::Circle);
        assert!("hexagon".parse::<RoiShape>().is_err());
    }
}
