//! Zstandard blocks (code 14)

use log::trace;

use super::handler::CompressionHandler;
use crate::tiff::errors::{TiffError, TiffResult};

pub struct ZstdHandler;

impl CompressionHandler for ZstdHandler {
    fn decompress(&self, data: &[u8], expected_len: usize) -> TiffResult<Vec<u8>> {
        let mut decoded = Vec::with_capacity(expected_len);
        if data.is_empty() {
            return Ok(decoded);
        }
        zstd::stream::copy_decode(data, &mut decoded)
            .map_err(|e| TiffError::GenericError(format!("corrupt zstd block: {}", e)))?;
        trace!("zstd block {} -> {} bytes", data.len(), decoded.len());
        Ok(decoded)
    }

    fn name(&self) -> &'static str {
        "zstd"
    }
}
