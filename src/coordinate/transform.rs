//! Coordinate transformation between EPSG-coded systems
//!
//! Built on `proj4rs`, which works in radians for geographic systems; the
//! transformer converts to and from degrees at its boundary.

use log::trace;
use proj4rs::proj::Proj;

use super::crs::CoordinateSystem;
use crate::errors::{DrillError, DrillResult};

/// Forward point transform from one coordinate system to another
pub struct CoordinateTransformer {
    source: CoordinateSystem,
    target: CoordinateSystem,
    projections: Option<(Proj, Proj)>,
    source_geographic: bool,
    target_geographic: bool,
}

impl CoordinateTransformer {
    /// Builds a transform between two systems
    ///
    /// # Arguments
    /// * `source` - System of the input coordinates
    /// * `target` - System of the output coordinates
    ///
    /// # Returns
    /// The transformer, or a reprojection error if either system has no
    /// usable definition
    pub fn new(source: CoordinateSystem, target: CoordinateSystem) -> DrillResult<Self> {
        let source_geographic = source.is_geographic()?;
        let target_geographic = target.is_geographic()?;

        let projections = if source == target {
            None
        } else {
            let src = Proj::from_proj_string(source.proj_string()?)
                .map_err(|e| DrillError::Reprojection(format!("Invalid projection {}: {:?}", source, e)))?;
            let dst = Proj::from_proj_string(target.proj_string()?)
                .map_err(|e| DrillError::Reprojection(format!("Invalid projection {}: {:?}", target, e)))?;
            Some((src, dst))
        };

        Ok(CoordinateTransformer {
            source,
            target,
            projections,
            source_geographic,
            target_geographic,
        })
    }

    /// System of the input coordinates
    pub fn source(&self) -> CoordinateSystem {
        self.source
    }

    /// System of the output coordinates
    pub fn target(&self) -> CoordinateSystem {
        self.target
    }

    /// Transforms one point, x first (longitude first for geographic systems)
    pub fn transform(&self, x: f64, y: f64) -> DrillResult<(f64, f64)> {
        let (src, dst) = match &self.projections {
            None => return Ok((x, y)),
            Some(pair) => pair,
        };

        let mut point = if self.source_geographic {
            (x.to_radians(), y.to_radians(), 0.0)
        } else {
            (x, y, 0.0)
        };
        proj4rs::transform::transform(src, dst, &mut point).map_err(|e| {
            DrillError::Reprojection(format!(
                "Transform of ({}, {}) from {} to {} failed: {:?}",
                x, y, self.source, self.target, e
            ))
        })?;

        let (out_x, out_y) = if self.target_geographic {
            (point.0.to_degrees(), point.1.to_degrees())
        } else {
            (point.0, point.1)
        };

        if !out_x.is_finite() || !out_y.is_finite() {
            return Err(DrillError::Reprojection(format!(
                "({}, {}) is outside the valid domain of {} to {}",
                x, y, self.source, self.target
            )));
        }
        trace!("Transformed ({}, {}) to ({}, {})", x, y, out_x, out_y);
        Ok((out_x, out_y))
    }

    /// Distance along x in the target system covered by `distance` along x
    /// in the source system, measured at (x, y)
    pub fn transform_distance(&self, x: f64, y: f64, distance: f64) -> DrillResult<f64> {
        let (tx, _) = self.transform(x, y)?;
        let (txn, _) = self.transform(x + distance, y)?;
        Ok(txn - tx)
    }
}

/// Transforms a point between two EPSG codes in one call
pub fn transform_point(source: CoordinateSystem, target: CoordinateSystem, x: f64, y: f64) -> DrillResult<(f64, f64)> {
    CoordinateTransformer::new(source, target)?.transform(x, y)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity() {
        let t = CoordinateTransformer::new(CoordinateSystem::WGS84, CoordinateSystem::WGS84).unwrap();
        assert_eq!(t.transform(10.0, 51.5).unwrap(), (10.0, 51.5));
    }

    #[test]
    fn test_wgs84_to_utm_and_back() {
        let to_utm = CoordinateTransformer::new(CoordinateSystem::WGS84, CoordinateSystem::UTM(33, true)).unwrap();
        let (x, y) = to_utm.transform(15.0, 52.0).unwrap();
        assert!((x - 500_000.0).abs() < 1.0, "easting {}", x);
        assert!(y > 5_700_000.0 && y < 5_800_000.0, "northing {}", y);

        let back = CoordinateTransformer::new(CoordinateSystem::UTM(33, true), CoordinateSystem::WGS84).unwrap();
        let (lon, lat) = back.transform(x, y).unwrap();
        assert!((lon - 15.0).abs() < 1e-6);
        assert!((lat - 52.0).abs() < 1e-6);
    }

    #[test]
    fn test_web_mercator_origin() {
        let (x, y) = transform_point(CoordinateSystem::WGS84, CoordinateSystem::WebMercator, 0.0, 0.0).unwrap();
        assert!(x.abs() < 1e-6 && y.abs() < 1e-6);
    }

    #[test]
    fn test_transform_distance_degrees_to_metres() {
        let t = CoordinateTransformer::new(CoordinateSystem::WGS84, CoordinateSystem::UTM(33, true)).unwrap();
        let metres = t.transform_distance(15.0, 0.0, 0.001).unwrap();
        // One thousandth of a degree at the equator, scaled by the UTM factor
        assert!(metres > 105.0 && metres < 115.0, "{}", metres);
    }
}
