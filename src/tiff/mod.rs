//! GeoTIFF parsing module
//!
//! Header, IFD and GeoKey parsing for TIFF and BigTIFF files.

pub mod errors;
pub mod ifd;
pub(crate) mod types;
pub mod reader;
#[cfg(test)]
mod tests;
pub(crate) mod constants;
pub mod geo_key_parser;

pub use crate::io::byte_order::{ByteOrder, ByteOrderHandler};
pub use errors::{TiffError, TiffResult};
pub use geo_key_parser::{GeoInfo, GeoKeyEntry, GeoKeyParser};
pub use ifd::{IFDEntry, IFD};
pub use reader::TiffReader;
pub use types::TIFF;
