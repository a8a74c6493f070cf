//! Byte order handling for TIFF files
//!
//! Strategy objects for reading header/tag values from a stream and for
//! decoding sample buffers once a strip or tile has been decompressed.

use byteorder::{BigEndian, LittleEndian, ReadBytesExt};
use std::io::Result;
use std::marker::PhantomData;

use crate::io::seekable::SeekableReader;
use crate::tiff::errors::{TiffError, TiffResult};

/// Byte order declared in the TIFF header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    /// Little-endian byte order (II)
    LittleEndian,
    /// Big-endian byte order (MM)
    BigEndian,
}

impl ByteOrder {
    /// Detects the byte order from the first two header bytes
    pub fn detect(reader: &mut dyn SeekableReader) -> TiffResult<Self> {
        let marker = reader.read_u16::<LittleEndian>()?;
        match marker {
            0x4949 => Ok(ByteOrder::LittleEndian), // "II"
            0x4D4D => Ok(ByteOrder::BigEndian),    // "MM"
            _ => Err(TiffError::InvalidByteOrder(marker)),
        }
    }

    /// Returns a string representation of this byte order
    pub fn name(&self) -> &'static str {
        match self {
            ByteOrder::LittleEndian => "Little Endian (II)",
            ByteOrder::BigEndian => "Big Endian (MM)",
        }
    }

    /// Creates the handler for this byte order
    pub fn create_handler(&self) -> Box<dyn ByteOrderHandler> {
        match self {
            ByteOrder::LittleEndian => Box::new(EndianHandler::<LittleEndian>::new()),
            ByteOrder::BigEndian => Box::new(EndianHandler::<BigEndian>::new()),
        }
    }
}

/// Reads multi-byte values in a fixed byte order
pub trait ByteOrderHandler: Send + Sync {
    /// Read a u16 value
    fn read_u16(&self, reader: &mut dyn SeekableReader) -> Result<u16>;

    /// Read a u32 value
    fn read_u32(&self, reader: &mut dyn SeekableReader) -> Result<u32>;

    /// Read a u64 value
    fn read_u64(&self, reader: &mut dyn SeekableReader) -> Result<u64>;

    /// Read an f32 value
    fn read_f32(&self, reader: &mut dyn SeekableReader) -> Result<f32>;

    /// Read an f64 value
    fn read_f64(&self, reader: &mut dyn SeekableReader) -> Result<f64>;

    /// Decode a u16 from the start of `bytes`
    fn u16_from(&self, bytes: &[u8]) -> u16;

    /// Decode a u32 from the start of `bytes`
    fn u32_from(&self, bytes: &[u8]) -> u32;

    /// Decode a u64 from the start of `bytes`
    fn u64_from(&self, bytes: &[u8]) -> u64;

    /// Writes `value` back into `bytes` as a u16 (used by the predictor)
    fn put_u16(&self, bytes: &mut [u8], value: u16);

    /// Writes `value` back into `bytes` as a u32 (used by the predictor)
    fn put_u32(&self, bytes: &mut [u8], value: u32);

    /// Writes `value` back into `bytes` as a u64 (used by the predictor)
    fn put_u64(&self, bytes: &mut [u8], value: u64);
}

/// Handler parameterised over a `byteorder` endianness
pub struct EndianHandler<E> {
    _order: PhantomData<E>,
}

impl<E> EndianHandler<E> {
    pub fn new() -> Self {
        EndianHandler { _order: PhantomData }
    }
}

impl<E> Default for EndianHandler<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: byteorder::ByteOrder + Send + Sync> ByteOrderHandler for EndianHandler<E> {
    fn read_u16(&self, reader: &mut dyn SeekableReader) -> Result<u16> {
        reader.read_u16::<E>()
    }

    fn read_u32(&self, reader: &mut dyn SeekableReader) -> Result<u32> {
        reader.read_u32::<E>()
    }

    fn read_u64(&self, reader: &mut dyn SeekableReader) -> Result<u64> {
        reader.read_u64::<E>()
    }

    fn read_f32(&self, reader: &mut dyn SeekableReader) -> Result<f32> {
        reader.read_f32::<E>()
    }

    fn read_f64(&self, reader: &mut dyn SeekableReader) -> Result<f64> {
        reader.read_f64::<E>()
    }

    fn u16_from(&self, bytes: &[u8]) -> u16 {
        E::read_u16(bytes)
    }

    fn u32_from(&self, bytes: &[u8]) -> u32 {
        E::read_u32(bytes)
    }

    fn u64_from(&self, bytes: &[u8]) -> u64 {
        E::read_u64(bytes)
    }

    fn put_u16(&self, bytes: &mut [u8], value: u16) {
        E::write_u16(bytes, value)
    }

    fn put_u32(&self, bytes: &mut [u8], value: u32) {
        E::write_u32(bytes, value)
    }

    fn put_u64(&self, bytes: &mut [u8], value: u64) {
        E::write_u64(bytes, value)
    }
}
