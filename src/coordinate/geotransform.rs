//! Affine mapping between pixel and world coordinates
//!
//! Coefficients follow the GDAL ordering:
//! `[origin_x, pixel_width, row_rotation, origin_y, column_rotation, pixel_height]`.

use super::bbox::BoundingBox;
use crate::errors::{DrillError, DrillResult};

/// Six-coefficient affine transform
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform {
    coefficients: [f64; 6],
    inverse: [f64; 6],
}

impl GeoTransform {
    /// Builds a transform, failing if it cannot be inverted
    pub fn new(coefficients: [f64; 6]) -> DrillResult<Self> {
        let [_, a, b, _, d, e] = coefficients;
        let det = a * e - b * d;
        if det == 0.0 || !det.is_finite() {
            return Err(DrillError::Read(format!("Geotransform {:?} is not invertible", coefficients)));
        }

        let (x0, y0) = (coefficients[0], coefficients[3]);
        let inv_a = e / det;
        let inv_b = -b / det;
        let inv_d = -d / det;
        let inv_e = a / det;
        let inverse = [
            -(inv_a * x0 + inv_b * y0),
            inv_a,
            inv_b,
            -(inv_d * x0 + inv_e * y0),
            inv_d,
            inv_e,
        ];
        Ok(GeoTransform { coefficients, inverse })
    }

    /// North-up transform from an origin and pixel size
    pub fn north_up(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> DrillResult<Self> {
        Self::new([origin_x, pixel_width, 0.0, origin_y, 0.0, -pixel_height.abs()])
    }

    /// Raw coefficients
    pub fn coefficients(&self) -> [f64; 6] {
        self.coefficients
    }

    /// World coordinates of a pixel position (corner convention)
    pub fn pix2wld(&self, col: f64, row: f64) -> (f64, f64) {
        apply(&self.coefficients, col, row)
    }

    /// Fractional pixel position of a world coordinate
    pub fn wld2pix(&self, x: f64, y: f64) -> (f64, f64) {
        let c = &self.coefficients;
        if c[2] == 0.0 && c[4] == 0.0 {
            return ((x - c[0]) / c[1], (y - c[3]) / c[5]);
        }
        apply(&self.inverse, x, y)
    }

    /// Pixel width and (positive) pixel height in world units
    pub fn resolution(&self) -> (f64, f64) {
        (self.coefficients[1].abs(), self.coefficients[5].abs())
    }

    /// World extent of an image of the given size
    pub fn extent(&self, width: u32, height: u32) -> BoundingBox {
        let corners = [
            self.pix2wld(0.0, 0.0),
            self.pix2wld(width as f64, 0.0),
            self.pix2wld(0.0, height as f64),
            self.pix2wld(width as f64, height as f64),
        ];
        BoundingBox::enclosing(&corners)
    }
}

fn apply(c: &[f64; 6], u: f64, v: f64) -> (f64, f64) {
    (c[0] + u * c[1] + v * c[2], c[3] + u * c[4] + v * c[5])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_north_up() {
        let gt = GeoTransform::north_up(1000.0, 2000.0, 10.0, 10.0).unwrap();
        assert_eq!(gt.pix2wld(3.0, 4.0), (1030.0, 1960.0));
        let (col, row) = gt.wld2pix(1030.0, 1960.0);
        assert!((col - 3.0).abs() < 1e-9 && (row - 4.0).abs() < 1e-9);
        assert_eq!(gt.resolution(), (10.0, 10.0));
    }

    #[test]
    fn test_extent() {
        let gt = GeoTransform::north_up(0.0, 100.0, 2.0, 5.0).unwrap();
        let bbox = gt.extent(10, 20);
        assert_eq!((bbox.min_x, bbox.min_y, bbox.max_x, bbox.max_y), (0.0, 0.0, 20.0, 100.0));
    }

    #[test]
    fn test_singular_transform_rejected() {
        assert!(GeoTransform::new([0.0, 0.0, 0.0, 0.0, 0.0, 0.0]).is_err());
    }
}
