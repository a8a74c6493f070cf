//! Deflate blocks (codes 8 and 32946), zlib-wrapped as GDAL writes them

use std::io::Read;

use flate2::read::ZlibDecoder;

use super::handler::CompressionHandler;
use crate::tiff::errors::{TiffError, TiffResult};

pub struct DeflateHandler;

impl CompressionHandler for DeflateHandler {
    fn decompress(&self, data: &[u8], expected_len: usize) -> TiffResult<Vec<u8>> {
        let mut decoded = Vec::with_capacity(expected_len);
        ZlibDecoder::new(data)
            .read_to_end(&mut decoded)
            .map_err(|e| TiffError::GenericError(format!("corrupt deflate block: {}", e)))?;
        Ok(decoded)
    }

    fn name(&self) -> &'static str {
        "deflate"
    }
}
