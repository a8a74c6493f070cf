//! Block decoders for TIFF strips and tiles
//!
//! `CompressionFactory` picks a decoder from an IFD's Compression tag.

mod deflate;
mod factory;
mod handler;
mod uncompressed;
mod zstd;

pub use factory::CompressionFactory;
pub use handler::CompressionHandler;
