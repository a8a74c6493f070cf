//! Sample decoding for decompressed strips and tiles
//!
//! Converts raw sample bytes to `f64` according to BitsPerSample and
//! SampleFormat, and undoes the TIFF predictors.

use crate::io::byte_order::ByteOrderHandler;
use crate::tiff::constants::{predictor, sample_format};
use crate::tiff::errors::{TiffError, TiffResult};

/// Numeric layout of one sample
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleType {
    /// Bits per sample: 8, 16, 32 or 64
    pub bits: u16,
    /// TIFF SampleFormat: unsigned, signed or IEEE float
    pub format: u16,
}

impl SampleType {
    /// Validates a BitsPerSample/SampleFormat pair
    pub fn new(bits: u16, format: u16) -> TiffResult<Self> {
        let supported = match format {
            sample_format::UNSIGNED | sample_format::SIGNED => matches!(bits, 8 | 16 | 32 | 64),
            sample_format::IEEEFP => matches!(bits, 32 | 64),
            _ => false,
        };

        if !supported {
            return Err(TiffError::UnsupportedSampleLayout(format!(
                "{} bits with sample format {}",
                bits, format
            )));
        }
        Ok(SampleType { bits, format })
    }

    /// Bytes per sample
    pub fn bytes(&self) -> usize {
        self.bits as usize / 8
    }

    /// Short data type name, as used in band metadata
    pub fn name(&self) -> &'static str {
        match (self.format, self.bits) {
            (sample_format::UNSIGNED, 8) => "uint8",
            (sample_format::UNSIGNED, 16) => "uint16",
            (sample_format::UNSIGNED, 32) => "uint32",
            (sample_format::UNSIGNED, 64) => "uint64",
            (sample_format::SIGNED, 8) => "int8",
            (sample_format::SIGNED, 16) => "int16",
            (sample_format::SIGNED, 32) => "int32",
            (sample_format::SIGNED, 64) => "int64",
            (sample_format::IEEEFP, 32) => "float32",
            _ => "float64",
        }
    }

    /// Decodes the sample starting at `bytes[0]`
    pub fn decode(&self, handler: &dyn ByteOrderHandler, bytes: &[u8]) -> f64 {
        match (self.format, self.bits) {
            (sample_format::UNSIGNED, 8) => bytes[0] as f64,
            (sample_format::SIGNED, 8) => bytes[0] as i8 as f64,
            (sample_format::UNSIGNED, 16) => handler.u16_from(bytes) as f64,
            (sample_format::SIGNED, 16) => handler.u16_from(bytes) as i16 as f64,
            (sample_format::UNSIGNED, 32) => handler.u32_from(bytes) as f64,
            (sample_format::SIGNED, 32) => handler.u32_from(bytes) as i32 as f64,
            (sample_format::UNSIGNED, 64) => handler.u64_from(bytes) as f64,
            (sample_format::SIGNED, 64) => handler.u64_from(bytes) as i64 as f64,
            (sample_format::IEEEFP, 32) => f32::from_bits(handler.u32_from(bytes)) as f64,
            _ => f64::from_bits(handler.u64_from(bytes)),
        }
    }
}

/// Undoes a predictor in place on one decompressed block
///
/// # Arguments
/// * `data` - Decompressed block bytes
/// * `predictor_code` - TIFF Predictor tag value
/// * `sample` - Sample layout
/// * `row_samples` - Samples per block row (block width x samples per pixel in the block)
/// * `stride` - Samples per pixel in the block
/// * `handler` - Byte order of the file
pub fn undo_predictor(
    data: &mut [u8],
    predictor_code: u64,
    sample: SampleType,
    row_samples: usize,
    stride: usize,
    handler: &dyn ByteOrderHandler,
) -> TiffResult<()> {
    match u16::try_from(predictor_code) {
        Ok(predictor::NONE) => Ok(()),
        Ok(predictor::HORIZONTAL_DIFFERENCING) => {
            horizontal(data, sample.bytes(), row_samples, stride, handler);
            Ok(())
        }
        Ok(predictor::FLOATING_POINT) if sample.format == sample_format::IEEEFP => {
            floating_point(data, sample.bytes(), row_samples, stride, handler);
            Ok(())
        }
        _ => Err(TiffError::UnsupportedPredictor(predictor_code)),
    }
}

fn horizontal(data: &mut [u8], width: usize, row_samples: usize, stride: usize, handler: &dyn ByteOrderHandler) {
    let row_bytes = row_samples * width;
    if row_bytes == 0 {
        return;
    }

    for row in data.chunks_exact_mut(row_bytes) {
        for i in stride..row_samples {
            let (cur, prev) = (i * width, (i - stride) * width);
            match width {
                1 => row[cur] = row[cur].wrapping_add(row[prev]),
                2 => {
                    let v = handler.u16_from(&row[cur..]).wrapping_add(handler.u16_from(&row[prev..]));
                    handler.put_u16(&mut row[cur..], v);
                }
                4 => {
                    let v = handler.u32_from(&row[cur..]).wrapping_add(handler.u32_from(&row[prev..]));
                    handler.put_u32(&mut row[cur..], v);
                }
                _ => {
                    let v = handler.u64_from(&row[cur..]).wrapping_add(handler.u64_from(&row[prev..]));
                    handler.put_u64(&mut row[cur..], v);
                }
            }
        }
    }
}

fn floating_point(data: &mut [u8], width: usize, row_samples: usize, stride: usize, handler: &dyn ByteOrderHandler) {
    let row_bytes = row_samples * width;
    if row_bytes == 0 {
        return;
    }

    let mut planes = vec![0u8; row_bytes];
    for row in data.chunks_exact_mut(row_bytes) {
        for i in stride..row_bytes {
            row[i] = row[i].wrapping_add(row[i - stride]);
        }

        // Byte planes hold the most significant byte first
        planes.copy_from_slice(row);
        for s in 0..row_samples {
            let mut be = [0u8; 8];
            for b in 0..width {
                be[b] = planes[b * row_samples + s];
            }
            let out = &mut row[s * width..];
            if width == 4 {
                handler.put_u32(out, u32::from_be_bytes([be[0], be[1], be[2], be[3]]));
            } else {
                handler.put_u64(out, u64::from_be_bytes(be));
            }
        }
    }
}
