//! Decoder trait for compressed strips and tiles

use crate::tiff::errors::TiffResult;

/// Decodes blocks stored with one TIFF compression scheme
pub trait CompressionHandler: Send + Sync {
    /// Decodes one strip or tile
    ///
    /// `expected_len` is the decoded size implied by the block geometry and
    /// is used to size the output buffer; the result may still be shorter.
    fn decompress(&self, data: &[u8], expected_len: usize) -> TiffResult<Vec<u8>>;

    /// Name used in log messages
    fn name(&self) -> &'static str;
}
