//! Blocks stored without compression (code 1)

use super::handler::CompressionHandler;
use crate::tiff::errors::TiffResult;

pub struct UncompressedHandler;

impl CompressionHandler for UncompressedHandler {
    fn decompress(&self, data: &[u8], _expected_len: usize) -> TiffResult<Vec<u8>> {
        Ok(data.to_vec())
    }

    fn name(&self) -> &'static str {
        "none"
    }
}
