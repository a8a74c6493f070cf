//! Seekable reader trait and source dispatch
//!
//! Local paths are read through a buffered file handle, `http(s)://` hrefs
//! through HTTP range requests.

use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};

use log::debug;

use crate::io::http_reader::HttpRangeReader;
use crate::tiff::errors::{TiffError, TiffResult};

/// Trait for readers that can both read and seek
pub trait SeekableReader: Read + Seek + Send + Sync {}

impl<T: Read + Seek + Send + Sync> SeekableReader for T {}

/// Reads `len` bytes at `offset`, refusing ranges past the end of the stream
///
/// Lengths come from tag counts and block byte counts in the file, so they
/// are checked before the buffer is allocated. Streams of unknown size are
/// read without the check.
pub fn read_bytes_at(reader: &mut dyn SeekableReader, offset: u64, len: u64) -> TiffResult<Vec<u8>> {
    let end = offset.checked_add(len).ok_or_else(|| {
        TiffError::GenericError(format!("byte range at {} of length {} overflows", offset, len))
    })?;
    match reader.seek(SeekFrom::End(0)) {
        Ok(size) if end > size => {
            return Err(TiffError::GenericError(format!(
                "byte range {}..{} lies past the end of the stream ({} bytes)",
                offset, end, size
            )))
        }
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::Unsupported => {}
        Err(e) => return Err(e.into()),
    }
    let len = usize::try_from(len)
        .map_err(|_| TiffError::GenericError(format!("byte length {} too large", len)))?;

    let mut buffer = vec![0u8; len];
    reader.seek(SeekFrom::Start(offset))?;
    reader.read_exact(&mut buffer)?;
    Ok(buffer)
}

/// Prefix GDAL uses for remote files; accepted and stripped
const VSICURL_PREFIX: &str = "/vsicurl/";

/// True if the href points at a remote resource
pub fn is_remote(href: &str) -> bool {
    let href = href.strip_prefix(VSICURL_PREFIX).unwrap_or(href);
    href.starts_with("http://") || href.starts_with("https://")
}

/// Opens a path or URL as a seekable byte source
pub fn open_source(href: &str) -> TiffResult<Box<dyn SeekableReader>> {
    let href = href.strip_prefix(VSICURL_PREFIX).unwrap_or(href);
    if is_remote(href) {
        debug!("Opening remote source {}", href);
        Ok(Box::new(HttpRangeReader::new(href)?))
    } else {
        debug!("Opening local source {}", href);
        let file = File::open(href)?;
        Ok(Box::new(BufReader::with_capacity(256 * 1024, file)))
    }
}
