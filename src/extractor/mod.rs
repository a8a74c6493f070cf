//! Pixel extraction from raster images
//!
//! Windowed block decoding for GeoTIFF strips and tiles, masked arrays, and
//! the region-of-interest read that turns a point footprint into an
//! `ArrayInfo`.

mod array;
mod block_reader;
mod region;
mod roi;
mod samples;

pub use array::{ArrayInfo, MaskedArray};
pub use block_reader::{BlockLayout, BlockReader};
pub use region::Region;
pub use roi::{pixel_window, read_roi, RoiShape};
pub use samples::{undo_predictor, SampleType};
