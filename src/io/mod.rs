//! I/O utilities for raster sources
//!
//! Byte order strategies, the seekable reader abstraction and the remote
//! range reader used for catalogue assets.

pub mod seekable;
pub mod byte_order;
pub mod http_reader;

pub use seekable::{is_remote, open_source, SeekableReader};
