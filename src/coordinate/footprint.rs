//! Region-of-interest footprints in an image's coordinate system
//!
//! A point's buffer is declared in metres or degrees. Before it can window a
//! read it must be expressed in the units of the image's coordinate system.
//! When the point and image systems disagree the buffer is carried across by
//! transforming a point offset by the buffer along x. Two cases have no
//! unit-bearing system to measure in (metres between geographic systems,
//! degrees between projected systems); these follow an
//! `AmbiguousBufferPolicy`.

use std::fmt;
use std::str::FromStr;

use log::debug;
use serde::{Deserialize, Serialize};

use super::bbox::BoundingBox;
use super::crs::{CoordinateSystem, CoordinateSystemFactory};
use super::transform::CoordinateTransformer;
use crate::errors::{DrillError, DrillResult};

/// Metres per degree of arc on the WGS 84 equator
pub const METRES_PER_DEGREE: f64 = 111_320.0;

/// Unit of a point's buffer distance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BufferUnit {
    #[default]
    Metres,
    Degrees,
}

impl FromStr for BufferUnit {
    type Err = DrillError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "m" | "metre" | "metres" | "meter" | "meters" => Ok(BufferUnit::Metres),
            "deg" | "degree" | "degrees" => Ok(BufferUnit::Degrees),
            other => Err(DrillError::Configuration(format!("Unknown buffer unit: {}", other))),
        }
    }
}

impl fmt::Display for BufferUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BufferUnit::Metres => write!(f, "metres"),
            BufferUnit::Degrees => write!(f, "degrees"),
        }
    }
}

/// Convention for buffers whose unit matches neither system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AmbiguousBufferPolicy {
    /// Metres are measured in the UTM zone containing the point; degrees
    /// are measured in EPSG:4326 at the point's WGS 84 location
    #[default]
    LocalProjection,
    /// 111 320 metres per degree of longitude, scaled by cos(latitude)
    SphericalScale,
}

impl FromStr for AmbiguousBufferPolicy {
    type Err = DrillError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "local_projection" | "local" => Ok(AmbiguousBufferPolicy::LocalProjection),
            "spherical_scale" | "spherical" => Ok(AmbiguousBufferPolicy::SphericalScale),
            other => Err(DrillError::Configuration(format!("Unknown buffer policy: {}", other))),
        }
    }
}

/// A point location with its buffer, as needed to build a footprint
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BufferedPoint {
    pub x: f64,
    pub y: f64,
    pub crs: CoordinateSystem,
    /// Longitude in WGS 84
    pub lon: f64,
    /// Latitude in WGS 84
    pub lat: f64,
    pub buffer: f64,
    pub unit: BufferUnit,
}

/// Expresses a point's buffer in the units of `image_crs`
///
/// # Arguments
/// * `point` - Location and buffer of the survey point
/// * `image_crs` - Coordinate system of the image to be read
/// * `policy` - Convention for the two ambiguous cases
///
/// # Returns
/// The buffer distance in image units
pub fn resolve_buffer(
    point: &BufferedPoint,
    image_crs: CoordinateSystem,
    policy: AmbiguousBufferPolicy,
) -> DrillResult<f64> {
    let image_geographic = image_crs.is_geographic()?;
    let point_geographic = point.crs.is_geographic()?;

    let buffer = match (point.unit, image_geographic, point_geographic) {
        (BufferUnit::Metres, true, false) | (BufferUnit::Degrees, false, true) => {
            CoordinateTransformer::new(point.crs, image_crs)?.transform_distance(point.x, point.y, point.buffer)?
        }
        (BufferUnit::Metres, true, true) => match policy {
            AmbiguousBufferPolicy::LocalProjection => {
                let utm = CoordinateSystemFactory::utm_for_location(point.lon, point.lat);
                let (px, py) = CoordinateTransformer::new(point.crs, utm)?.transform(point.x, point.y)?;
                CoordinateTransformer::new(utm, image_crs)?.transform_distance(px, py, point.buffer)?
            }
            AmbiguousBufferPolicy::SphericalScale => {
                point.buffer / (METRES_PER_DEGREE * point.lat.to_radians().cos())
            }
        },
        (BufferUnit::Degrees, false, false) => match policy {
            AmbiguousBufferPolicy::LocalProjection => {
                CoordinateTransformer::new(CoordinateSystem::WGS84, image_crs)?
                    .transform_distance(point.lon, point.lat, point.buffer)?
            }
            AmbiguousBufferPolicy::SphericalScale => {
                point.buffer * METRES_PER_DEGREE * point.lat.to_radians().cos()
            }
        },
        _ => point.buffer,
    };

    if !buffer.is_finite() {
        return Err(DrillError::Reprojection(format!(
            "Buffer of {} {} cannot be expressed in {}",
            point.buffer, point.unit, image_crs
        )));
    }
    Ok(buffer.abs())
}

/// A point's region of interest in an image's coordinate system
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Footprint {
    /// Coordinate system of the footprint
    pub crs: CoordinateSystem,
    /// Point location in `crs`
    pub centre: (f64, f64),
    /// Buffer in `crs` units; half the side of the box, or the circle radius
    pub buffer: f64,
}

impl Footprint {
    /// Builds the footprint of a point in an image's coordinate system
    pub fn new(point: &BufferedPoint, image_crs: CoordinateSystem, policy: AmbiguousBufferPolicy) -> DrillResult<Self> {
        let centre = CoordinateTransformer::new(point.crs, image_crs)?.transform(point.x, point.y)?;
        let buffer = if point.buffer > 0.0 {
            resolve_buffer(point, image_crs, policy)?
        } else {
            0.0
        };
        debug!("Footprint in {}: centre ({}, {}), buffer {}", image_crs, centre.0, centre.1, buffer);
        Ok(Footprint { crs: image_crs, centre, buffer })
    }

    /// Box enclosing the region of interest
    pub fn bbox(&self) -> BoundingBox {
        BoundingBox::around(self.centre.0, self.centre.1, self.buffer)
    }

    /// True if the footprint reduces to a single location
    pub fn is_point(&self) -> bool {
        self.buffer <= 0.0
    }
}
