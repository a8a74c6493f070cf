//! Coordinate handling for geospatial data
//!
//! This module provides coordinate systems, point transforms, the affine
//! pixel/world mapping of images, and the footprint of a point's region of
//! interest in an image's coordinate system.

mod bbox;
mod crs;
mod footprint;
mod geotransform;
mod transform;

// Re-export key types
pub use self::bbox::BoundingBox;
pub use self::crs::{CoordinateSystem, CoordinateSystemFactory, WGS84_EPSG};
pub use self::footprint::{
    resolve_buffer, AmbiguousBufferPolicy, BufferUnit, BufferedPoint, Footprint, METRES_PER_DEGREE,
};
pub use self::geotransform::GeoTransform;
pub use self::transform::{transform_point, CoordinateTransformer};
