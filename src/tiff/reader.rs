//! TIFF file reader implementation
//!
//! Parses the header and IFD chain of a TIFF or BigTIFF stream and decodes
//! tag value arrays. Pixel data is read separately by the window reader in
//! `extractor`.

use log::{debug, warn};
use std::io::{Read, Seek, SeekFrom};

use crate::io::byte_order::{ByteOrder, ByteOrderHandler};
use crate::io::seekable::{read_bytes_at, SeekableReader};
use crate::tiff::constants::{field_types, header};
use crate::tiff::errors::{TiffError, TiffResult};
use crate::tiff::ifd::{IFDEntry, IFD};
use crate::tiff::types::TIFF;

/// Upper bound on IFDs followed before giving up on a chain
const MAX_IFDS: usize = 100;

/// Reader for TIFF and BigTIFF files
pub struct TiffReader {
    byte_order: ByteOrder,
    handler: Box<dyn ByteOrderHandler>,
    is_big_tiff: bool,
}

impl TiffReader {
    /// Reads the header and every IFD from `reader`
    ///
    /// # Arguments
    /// * `reader` - Any struct implementing the SeekableReader trait
    ///
    /// # Returns
    /// The reader (holding the byte order for later tag reads) and the parsed structure
    pub fn read(reader: &mut dyn SeekableReader) -> TiffResult<(TiffReader, TIFF)> {
        reader.seek(SeekFrom::Start(0))?;
        let byte_order = ByteOrder::detect(reader)?;
        debug!("Detected byte order: {}", byte_order.name());

        let handler = byte_order.create_handler();
        let version = handler.read_u16(reader)?;
        let is_big_tiff = match version {
            header::BIG_TIFF_VERSION => {
                let offset_size = handler.read_u16(reader)?;
                let zeros = handler.read_u16(reader)?;
                if offset_size != header::BIGTIFF_OFFSET_SIZE || zeros != 0 {
                    return Err(TiffError::InvalidBigTIFFHeader);
                }
                true
            }
            header::TIFF_VERSION => false,
            _ => return Err(TiffError::UnsupportedVersion(version)),
        };
        debug!("Format: {}", if is_big_tiff { "BigTIFF" } else { "TIFF" });

        let tiff_reader = TiffReader { byte_order, handler, is_big_tiff };
        let first_offset = tiff_reader.read_offset(reader)?;

        let file_size = stream_size(reader)?;
        if first_offset < 8 || first_offset >= file_size {
            return Err(TiffError::GenericError(format!(
                "Invalid IFD offset: {} (file size: {})",
                first_offset, file_size
            )));
        }

        let mut tiff = TIFF::new(is_big_tiff, byte_order);
        tiff.ifds = tiff_reader.read_ifd_chain(reader, first_offset, file_size)?;
        debug!("Read {} IFDs", tiff.ifds.len());

        Ok((tiff_reader, tiff))
    }

    /// Byte order handler of the file
    pub fn handler(&self) -> &dyn ByteOrderHandler {
        self.handler.as_ref()
    }

    /// Byte order of the file
    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    /// Returns whether the current file is a BigTIFF
    pub fn is_big_tiff(&self) -> bool {
        self.is_big_tiff
    }

    fn read_offset(&self, reader: &mut dyn SeekableReader) -> TiffResult<u64> {
        if self.is_big_tiff {
            Ok(self.handler.read_u64(reader)?)
        } else {
            Ok(self.handler.read_u32(reader)? as u64)
        }
    }

    fn read_ifd_chain(&self, reader: &mut dyn SeekableReader, first_offset: u64, file_size: u64) -> TiffResult<Vec<IFD>> {
        let mut ifds = Vec::new();
        let mut offset = first_offset;

        while offset != 0 && ifds.len() < MAX_IFDS {
            if offset >= file_size {
                warn!("IFD offset {} exceeds file size {}, stopping IFD chain", offset, file_size);
                break;
            }

            let ifd = self.read_ifd(reader, offset, ifds.len())?;
            let next = match self.read_offset(reader) {
                Ok(next) => next,
                Err(e) => {
                    warn!("Error reading next IFD offset: {}", e);
                    0
                }
            };
            ifds.push(ifd);

            if next != 0 && (next < 8 || next >= file_size) {
                warn!("Invalid next IFD offset: {}, stopping IFD chain", next);
                break;
            }
            offset = next;
        }

        Ok(ifds)
    }

    /// Reads one IFD, leaving the stream positioned at its next-IFD offset
    pub fn read_ifd(&self, reader: &mut dyn SeekableReader, offset: u64, number: usize) -> TiffResult<IFD> {
        reader.seek(SeekFrom::Start(offset))?;

        let entry_count = if self.is_big_tiff {
            self.handler.read_u64(reader)?
        } else {
            self.handler.read_u16(reader)? as u64
        };

        let mut ifd = IFD::new(number, offset);
        for _ in 0..entry_count {
            ifd.add_entry(self.read_ifd_entry(reader)?);
        }

        debug!("Read IFD #{} with {} entries", number, ifd.entries.len());
        Ok(ifd)
    }

    fn read_ifd_entry(&self, reader: &mut dyn SeekableReader) -> TiffResult<IFDEntry> {
        let tag = self.handler.read_u16(reader)?;
        let field_type = self.handler.read_u16(reader)?;
        let count = if self.is_big_tiff {
            self.handler.read_u64(reader)?
        } else {
            self.handler.read_u32(reader)? as u64
        };

        let field_len = if self.is_big_tiff { 8 } else { 4 };
        let mut inline = [0u8; 8];
        reader.read_exact(&mut inline[..field_len])?;

        let mut entry = IFDEntry::new(tag, field_type, count, 0);
        entry.inline = inline;
        entry.value_offset = if entry.is_value_inline(self.is_big_tiff) && count == 1 {
            match field_type {
                field_types::BYTE | field_types::SBYTE | field_types::UNDEFINED => inline[0] as u64,
                field_types::SHORT | field_types::SSHORT => self.handler.u16_from(&inline) as u64,
                field_types::LONG | field_types::SLONG | field_types::FLOAT => self.handler.u32_from(&inline) as u64,
                _ => self.handler.u64_from(&inline),
            }
        } else if self.is_big_tiff {
            self.handler.u64_from(&inline)
        } else {
            self.handler.u32_from(&inline) as u64
        };

        Ok(entry)
    }

    /// Raw bytes of a tag's values, whether inline or at an offset
    fn read_tag_bytes(&self, reader: &mut dyn SeekableReader, entry: &IFDEntry) -> TiffResult<Vec<u8>> {
        let len = entry.byte_len();
        if entry.is_value_inline(self.is_big_tiff) {
            return Ok(entry.inline[..len as usize].to_vec());
        }
        read_bytes_at(reader, entry.value_offset, len)
    }

    /// Reads a tag's values as unsigned integers
    ///
    /// # Arguments
    /// * `reader` - The seekable reader to use
    /// * `ifd` - The IFD containing the tag
    /// * `tag` - The tag number to read
    ///
    /// # Returns
    /// One u64 per value
    pub fn read_tag_values(&self, reader: &mut dyn SeekableReader, ifd: &IFD, tag: u16) -> TiffResult<Vec<u64>> {
        let entry = ifd.get_entry(tag).ok_or(TiffError::TagNotFound(tag))?;
        let bytes = self.read_tag_bytes(reader, entry)?;
        let size = field_types::size_of(entry.field_type);

        bytes
            .chunks_exact(size)
            .map(|chunk| match entry.field_type {
                field_types::BYTE | field_types::UNDEFINED => Ok(chunk[0] as u64),
                field_types::SHORT => Ok(self.handler.u16_from(chunk) as u64),
                field_types::LONG => Ok(self.handler.u32_from(chunk) as u64),
                field_types::LONG8 | field_types::IFD8 => Ok(self.handler.u64_from(chunk)),
                other => Err(TiffError::UnsupportedFieldType(other)),
            })
            .collect()
    }

    /// Reads a tag's values as floating point numbers
    ///
    /// Integer field types are widened, DOUBLE and FLOAT are decoded as IEEE values.
    pub fn read_tag_f64_values(&self, reader: &mut dyn SeekableReader, ifd: &IFD, tag: u16) -> TiffResult<Vec<f64>> {
        let entry = ifd.get_entry(tag).ok_or(TiffError::TagNotFound(tag))?;
        let bytes = self.read_tag_bytes(reader, entry)?;
        let size = field_types::size_of(entry.field_type);

        bytes
            .chunks_exact(size)
            .map(|chunk| match entry.field_type {
                field_types::DOUBLE => Ok(f64::from_bits(self.handler.u64_from(chunk))),
                field_types::FLOAT => Ok(f32::from_bits(self.handler.u32_from(chunk)) as f64),
                field_types::BYTE => Ok(chunk[0] as f64),
                field_types::SHORT => Ok(self.handler.u16_from(chunk) as f64),
                field_types::LONG => Ok(self.handler.u32_from(chunk) as f64),
                other => Err(TiffError::UnsupportedFieldType(other)),
            })
            .collect()
    }

    /// Reads an ASCII tag, trimming the trailing NUL
    pub fn read_tag_ascii(&self, reader: &mut dyn SeekableReader, ifd: &IFD, tag: u16) -> TiffResult<String> {
        let entry = ifd.get_entry(tag).ok_or(TiffError::TagNotFound(tag))?;
        let mut bytes = self.read_tag_bytes(reader, entry)?;
        while bytes.last() == Some(&0) {
            bytes.pop();
        }

        String::from_utf8(bytes)
            .map_err(|e| TiffError::GenericError(format!("Invalid UTF-8 string: {}", e)))
    }
}

/// Size of the stream, or u64::MAX when it cannot be determined
fn stream_size(reader: &mut dyn SeekableReader) -> TiffResult<u64> {
    let current = reader.stream_position()?;
    let size = match reader.seek(SeekFrom::End(0)) {
        Ok(size) => size,
        Err(e) => {
            warn!("Could not determine stream size: {}", e);
            u64::MAX
        }
    };
    reader.seek(SeekFrom::Start(current))?;
    Ok(size)
}
