//! Selection of a block decoder from the Compression tag

use super::deflate::DeflateHandler;
use super::handler::CompressionHandler;
use super::uncompressed::UncompressedHandler;
use super::zstd::ZstdHandler;
use crate::tiff::constants::compression;
use crate::tiff::errors::{TiffError, TiffResult};

pub struct CompressionFactory;

impl CompressionFactory {
    /// Decoder for a Compression tag value
    ///
    /// LZW, JPEG and the other codes GDAL can write are rejected with
    /// `UnsupportedCompression`.
    pub fn create_handler(code: u64) -> TiffResult<Box<dyn CompressionHandler>> {
        match u16::try_from(code) {
            Ok(compression::NONE) => Ok(Box::new(UncompressedHandler)),
            Ok(compression::DEFLATE | compression::OLD_DEFLATE) => Ok(Box::new(DeflateHandler)),
            Ok(compression::ZSTD) => Ok(Box::new(ZstdHandler)),
            _ => Err(TiffError::UnsupportedCompression(code)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn samples() -> Vec<u8> {
        (0..255u8).cycle().take(4096).collect()
    }

    #[test]
    fn test_known_codes() {
        assert_eq!(CompressionFactory::create_handler(1).unwrap().name(), "none");
        assert_eq!(CompressionFactory::create_handler(8).unwrap().name(), "deflate");
        assert_eq!(CompressionFactory::create_handler(32946).unwrap().name(), "deflate");
        assert_eq!(CompressionFactory::create_handler(14).unwrap().name(), "zstd");
    }

    #[test]
    fn test_lzw_is_unsupported() {
        assert!(matches!(
            CompressionFactory::create_handler(5),
            Err(TiffError::UnsupportedCompression(5))
        ));
    }

    #[test]
    fn test_deflate_block() {
        let mut encoder = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(&samples()).unwrap();
        let block = encoder.finish().unwrap();

        let handler = CompressionFactory::create_handler(8).unwrap();
        assert_eq!(handler.decompress(&block, 4096).unwrap(), samples());
        assert!(handler.decompress(&block[..10], 4096).is_err());
    }

    #[test]
    fn test_zstd_block() {
        let block = zstd::encode_all(samples().as_slice(), 3).unwrap();
        let handler = CompressionFactory::create_handler(14).unwrap();
        assert_eq!(handler.decompress(&block, 4096).unwrap(), samples());
        assert!(handler.decompress(&[], 4096).unwrap().is_empty());
    }
}
