//! Windowed reads from stripped and tiled TIFF images
//!
//! Strips are treated as tiles spanning the full image width, so one code
//! path serves both layouts. Decoded blocks are cached so that windows for
//! neighbouring points and for successive bands do not decompress the same
//! block twice.

use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, trace, warn};
use ndarray::Array2;

use crate::compression::{CompressionFactory, CompressionHandler};
use crate::io::byte_order::ByteOrderHandler;
use crate::io::seekable::{read_bytes_at, SeekableReader};
use crate::tiff::constants::{planar_config, sample_format, tags};
use crate::tiff::errors::{TiffError, TiffResult};
use crate::tiff::ifd::IFD;
use crate::tiff::reader::TiffReader;

use super::region::Region;
use super::samples::{self, SampleType};

/// Decoded blocks kept before the cache is flushed
const MAX_CACHED_BLOCKS: usize = 32;

/// Largest decoded block accepted (1 GiB)
const MAX_BLOCK_BYTES: usize = 1 << 30;

/// Arrangement of strips or tiles in an image
#[derive(Debug, Clone)]
pub struct BlockLayout {
    pub image_width: u32,
    pub image_height: u32,
    pub block_width: u32,
    pub block_height: u32,
    pub blocks_across: u32,
    pub blocks_down: u32,
    pub samples_per_pixel: usize,
    /// Bands stored as separate planes (PlanarConfiguration = 2)
    pub planar: bool,
    pub offsets: Vec<u64>,
    pub byte_counts: Vec<u64>,
}

impl BlockLayout {
    /// Reads the block layout of an IFD
    pub fn from_ifd(reader: &mut dyn SeekableReader, tiff_reader: &TiffReader, ifd: &IFD) -> TiffResult<Self> {
        let (width, height) = ifd.get_dimensions().ok_or(TiffError::MissingDimensions)?;
        let (image_width, image_height) = match (u32::try_from(width), u32::try_from(height)) {
            (Ok(w), Ok(h)) => (w, h),
            _ => return Err(TiffError::GenericError(format!("Image size {}x{} out of range", width, height))),
        };
        let samples_per_pixel = ifd.get_samples_per_pixel() as usize;
        let planar = ifd.get_tag_value(tags::PLANAR_CONFIGURATION)
            .map(|v| v == planar_config::PLANAR as u64)
            .unwrap_or(false);

        let (block_width, block_height, offsets, byte_counts) = if ifd.is_tiled() {
            let tile_width = ifd.get_tag_value(tags::TILE_WIDTH).unwrap_or(256) as u32;
            let tile_height = ifd.get_tag_value(tags::TILE_LENGTH).unwrap_or(256) as u32;
            (
                tile_width,
                tile_height,
                tiff_reader.read_tag_values(reader, ifd, tags::TILE_OFFSETS)?,
                tiff_reader.read_tag_values(reader, ifd, tags::TILE_BYTE_COUNTS)?,
            )
        } else {
            let rows_per_strip = ifd.get_tag_value(tags::ROWS_PER_STRIP)
                .map(|r| r.min(height) as u32)
                .unwrap_or(image_height);
            (
                image_width,
                rows_per_strip.max(1),
                tiff_reader.read_tag_values(reader, ifd, tags::STRIP_OFFSETS)?,
                tiff_reader.read_tag_values(reader, ifd, tags::STRIP_BYTE_COUNTS)?,
            )
        };

        if block_width == 0 || block_height == 0 {
            return Err(TiffError::GenericError("Zero-sized strips or tiles".to_string()));
        }

        let layout = BlockLayout {
            image_width,
            image_height,
            block_width,
            block_height,
            blocks_across: image_width.div_ceil(block_width),
            blocks_down: image_height.div_ceil(block_height),
            samples_per_pixel,
            planar,
            offsets,
            byte_counts,
        };
        debug!("Block layout: {}x{} blocks of {}x{}, planar={}",
               layout.blocks_across, layout.blocks_down, block_width, block_height, planar);
        Ok(layout)
    }

    /// Samples per pixel inside one decoded block
    pub fn block_samples(&self) -> usize {
        if self.planar { 1 } else { self.samples_per_pixel }
    }

    /// Index into the offset table of the block at (bx, by) holding `band`
    pub fn block_index(&self, bx: u32, by: u32, band: usize) -> usize {
        let within_plane = by as usize * self.blocks_across as usize + bx as usize;
        if self.planar {
            band * (self.blocks_across as usize * self.blocks_down as usize) + within_plane
        } else {
            within_plane
        }
    }

    /// Rows actually stored in block row `by` (the last strip may be short)
    fn rows_in_block(&self, by: u32, tiled: bool) -> u32 {
        if tiled {
            self.block_height
        } else {
            self.block_height.min(self.image_height - by * self.block_height)
        }
    }
}

/// Decodes windows of one image band by band
pub struct BlockReader {
    layout: BlockLayout,
    sample: SampleType,
    predictor: u64,
    tiled: bool,
    compression: Box<dyn CompressionHandler>,
    cache: HashMap<usize, Arc<Vec<u8>>>,
}

impl BlockReader {
    /// Prepares a reader for the image described by `ifd`
    pub fn new(reader: &mut dyn SeekableReader, tiff_reader: &TiffReader, ifd: &IFD) -> TiffResult<Self> {
        let layout = BlockLayout::from_ifd(reader, tiff_reader, ifd)?;

        let bits = if ifd.has_tag(tags::BITS_PER_SAMPLE) {
            tiff_reader.read_tag_values(reader, ifd, tags::BITS_PER_SAMPLE)?
        } else {
            vec![1]
        };
        let formats = if ifd.has_tag(tags::SAMPLE_FORMAT) {
            tiff_reader.read_tag_values(reader, ifd, tags::SAMPLE_FORMAT)?
        } else {
            vec![sample_format::UNSIGNED as u64]
        };
        let (first_bits, first_format) = match (bits.first().copied(), formats.first().copied()) {
            (Some(b), Some(f)) => (b, f),
            _ => {
                return Err(TiffError::UnsupportedSampleLayout(
                    "BitsPerSample or SampleFormat has no values".to_string(),
                ))
            }
        };
        if bits.iter().any(|b| *b != first_bits) || formats.iter().any(|f| *f != first_format) {
            return Err(TiffError::UnsupportedSampleLayout("mixed sample types across bands".to_string()));
        }
        let sample = SampleType::new(first_bits as u16, first_format as u16)?;

        let compression = CompressionFactory::create_handler(
            ifd.get_tag_value(tags::COMPRESSION).unwrap_or(1),
        )?;
        debug!("Using compression: {}, sample type {}", compression.name(), sample.name());

        Ok(BlockReader {
            layout,
            sample,
            predictor: ifd.get_tag_value(tags::PREDICTOR).unwrap_or(1),
            tiled: ifd.is_tiled(),
            compression,
            cache: HashMap::new(),
        })
    }

    /// Layout of the image being read
    pub fn layout(&self) -> &BlockLayout {
        &self.layout
    }

    /// Sample layout of the image being read
    pub fn sample_type(&self) -> SampleType {
        self.sample
    }

    /// Reads one band over a pixel window
    ///
    /// # Arguments
    /// * `source` - Stream holding the image
    /// * `handler` - Byte order of the file
    /// * `band` - Zero-based band index
    /// * `region` - Window to read; must lie inside the image
    ///
    /// # Returns
    /// A rows x columns array of sample values
    pub fn read_window(
        &mut self,
        source: &mut dyn SeekableReader,
        handler: &dyn ByteOrderHandler,
        band: usize,
        region: Region,
    ) -> TiffResult<Array2<f64>> {
        if band >= self.layout.samples_per_pixel {
            return Err(TiffError::OutOfBounds(format!(
                "band {} of {}", band + 1, self.layout.samples_per_pixel
            )));
        }
        if region.end_x() > self.layout.image_width || region.end_y() > self.layout.image_height {
            return Err(TiffError::OutOfBounds(format!(
                "window {:?} exceeds image {}x{}", region, self.layout.image_width, self.layout.image_height
            )));
        }

        let mut out = Array2::<f64>::zeros((region.height as usize, region.width as usize));
        if region.is_empty() {
            return Ok(out);
        }

        let (bw, bh) = (self.layout.block_width, self.layout.block_height);
        let bytes = self.sample.bytes();
        let block_samples = self.layout.block_samples();
        let band_in_block = if self.layout.planar { 0 } else { band };

        for by in region.y / bh..=(region.end_y() - 1) / bh {
            for bx in region.x / bw..=(region.end_x() - 1) / bw {
                let block = self.block(source, handler, bx, by, band)?;

                let x0 = region.x.max(bx * bw);
                let x1 = region.end_x().min((bx + 1) * bw);
                let y0 = region.y.max(by * bh);
                let y1 = region.end_y().min((by + 1) * bh);

                for y in y0..y1 {
                    for x in x0..x1 {
                        let sample_index = ((y - by * bh) as usize * bw as usize + (x - bx * bw) as usize)
                            * block_samples + band_in_block;
                        let start = sample_index * bytes;
                        let value = match block.get(start..start + bytes) {
                            Some(raw) => self.sample.decode(handler, raw),
                            None => 0.0,
                        };
                        out[[(y - region.y) as usize, (x - region.x) as usize]] = value;
                    }
                }
            }
        }

        Ok(out)
    }

    fn block(
        &mut self,
        source: &mut dyn SeekableReader,
        handler: &dyn ByteOrderHandler,
        bx: u32,
        by: u32,
        band: usize,
    ) -> TiffResult<Arc<Vec<u8>>> {
        let index = self.layout.block_index(bx, by, band);
        if let Some(block) = self.cache.get(&index) {
            return Ok(Arc::clone(block));
        }

        let (offset, byte_count) = match (self.layout.offsets.get(index), self.layout.byte_counts.get(index)) {
            (Some(o), Some(c)) => (*o, *c),
            _ => {
                return Err(TiffError::OutOfBounds(format!(
                    "block index {} (table has {})", index, self.layout.offsets.len()
                )))
            }
        };

        let rows = self.layout.rows_in_block(by, self.tiled) as usize;
        let row_samples = self.layout.block_width as usize * self.layout.block_samples();
        let expected = rows
            .checked_mul(row_samples)
            .and_then(|n| n.checked_mul(self.sample.bytes()))
            .filter(|n| *n <= MAX_BLOCK_BYTES)
            .ok_or_else(|| TiffError::GenericError(format!(
                "block of {} rows x {} samples is too large", rows, row_samples
            )))?;

        let mut data = if byte_count == 0 {
            trace!("Sparse block {} filled with zeros", index);
            vec![0u8; expected]
        } else {
            trace!("Reading block ({},{}) at offset {} with {} bytes", bx, by, offset, byte_count);
            let compressed = read_bytes_at(source, offset, byte_count)?;
            self.compression.decompress(&compressed, expected)?
        };

        if data.len() < expected {
            warn!("Block {} decoded to {} bytes, expected {}; padding", index, data.len(), expected);
            data.resize(expected, 0);
        }

        samples::undo_predictor(
            &mut data,
            self.predictor,
            self.sample,
            row_samples,
            self.layout.block_samples(),
            handler,
        )?;

        if self.cache.len() >= MAX_CACHED_BLOCKS {
            self.cache.clear();
        }
        let block = Arc::new(data);
        self.cache.insert(index, Arc::clone(&block));
        Ok(block)
    }
}
