//! HTTP range reader for remote GeoTIFF assets
//!
//! Exposes a remote file as `Read + Seek` by fetching fixed-size blocks
//! with `Range` requests. Recently fetched blocks are kept in a small cache
//! so that IFD parsing and neighbouring tile reads do not refetch.

use std::collections::HashMap;
use std::io::{self, Read, Seek, SeekFrom};
use std::time::Duration;

use log::{debug, trace};
use reqwest::blocking::Client;
use reqwest::header::{CONTENT_LENGTH, RANGE};
use reqwest::StatusCode;

use crate::tiff::errors::{TiffError, TiffResult};

/// Size of one fetched block
const BLOCK_SIZE: u64 = 64 * 1024;

/// Number of blocks kept before the cache is flushed
const MAX_CACHED_BLOCKS: usize = 64;

/// Remote file accessed through HTTP range requests
pub struct HttpRangeReader {
    url: String,
    size: Option<u64>,
    position: u64,
    client: Client,
    blocks: HashMap<u64, Vec<u8>>,
}

impl HttpRangeReader {
    /// Connects to `url` and asks for its size with a HEAD request
    pub fn new(url: &str) -> TiffResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| TiffError::GenericError(format!("HTTP client error: {}", e)))?;

        let response = client
            .head(url)
            .send()
            .map_err(|e| TiffError::IoError(io::Error::new(io::ErrorKind::Other, e)))?;

        if !response.status().is_success() {
            return Err(TiffError::IoError(io::Error::new(
                io::ErrorKind::NotFound,
                format!("HEAD {} returned {}", url, response.status()),
            )));
        }

        let size = response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|s| *s > 0);
        debug!("Remote source {} has size {:?}", url, size);

        Ok(HttpRangeReader {
            url: url.to_string(),
            size,
            position: 0,
            client,
            blocks: HashMap::new(),
        })
    }

    /// URL this reader fetches from
    pub fn url(&self) -> &str {
        &self.url
    }

    fn fetch_block(&mut self, index: u64) -> io::Result<&[u8]> {
        if !self.blocks.contains_key(&index) {
            if self.blocks.len() >= MAX_CACHED_BLOCKS {
                self.blocks.clear();
            }

            let start = index * BLOCK_SIZE;
            let mut end = start + BLOCK_SIZE - 1;
            if let Some(size) = self.size {
                end = end.min(size.saturating_sub(1));
            }
            trace!("GET {} bytes={}-{}", self.url, start, end);

            let response = self
                .client
                .get(&self.url)
                .header(RANGE, format!("bytes={}-{}", start, end))
                .send()
                .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;

            let status = response.status();
            if status == StatusCode::RANGE_NOT_SATISFIABLE {
                self.blocks.insert(index, Vec::new());
            } else if !status.is_success() {
                return Err(io::Error::new(
                    io::ErrorKind::Other,
                    format!("GET {} returned {}", self.url, status),
                ));
            } else {
                let body = response
                    .bytes()
                    .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;

                // Servers that ignore Range send the whole file
                let block = if status == StatusCode::OK && body.len() as u64 > BLOCK_SIZE {
                    let from = (start as usize).min(body.len());
                    let to = ((end + 1) as usize).min(body.len());
                    body[from..to].to_vec()
                } else {
                    body.to_vec()
                };
                self.blocks.insert(index, block);
            }
        }

        Ok(self.blocks.get(&index).map(Vec::as_slice).unwrap_or(&[]))
    }
}

impl Read for HttpRangeReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        if let Some(size) = self.size {
            if self.position >= size {
                return Ok(0);
            }
        }

        let index = self.position / BLOCK_SIZE;
        let within = (self.position % BLOCK_SIZE) as usize;
        let block = self.fetch_block(index)?;
        if within >= block.len() {
            return Ok(0);
        }

        let n = buf.len().min(block.len() - within);
        buf[..n].copy_from_slice(&block[within..within + n]);
        self.position += n as u64;
        Ok(n)
    }
}

impl Seek for HttpRangeReader {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(offset) => offset as i128,
            SeekFrom::Current(delta) => self.position as i128 + delta as i128,
            SeekFrom::End(delta) => match self.size {
                Some(size) => size as i128 + delta as i128,
                None => {
                    return Err(io::Error::new(
                        io::ErrorKind::Unsupported,
                        "remote size unknown",
                    ))
                }
            },
        };

        if target < 0 {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "seek before start"));
        }
        self.position = target as u64;
        Ok(self.position)
    }
}
