//! Image File Directory (IFD) structures
//!
//! An IFD holds the tag entries describing one image in a TIFF file. Only
//! the first full-resolution IFD is drilled; overviews and masks are
//! skipped by the reader.

use std::collections::HashMap;
use std::fmt;

use log::trace;

use crate::tiff::constants::{field_types, tags};

/// Image File Directory
#[derive(Debug, Clone)]
pub struct IFD {
    /// Entries in file order
    pub entries: Vec<IFDEntry>,
    /// IFD number (0-based)
    pub number: usize,
    /// Offset to this IFD in the file
    pub offset: u64,
    tag_map: HashMap<u16, usize>,
}

/// One tag entry of an IFD
///
/// `value_offset` is the decoded value when a single value fits inline,
/// otherwise the file offset of the value array. `inline` keeps the raw
/// bytes of the value field so inline arrays can be decoded later.
#[derive(Debug, Clone)]
pub struct IFDEntry {
    /// TIFF tag identifier
    pub tag: u16,
    /// Field type
    pub field_type: u16,
    /// Number of values
    pub count: u64,
    /// Value or offset to values
    pub value_offset: u64,
    /// Raw bytes of the value field, in file byte order
    pub inline: [u8; 8],
}

impl IFDEntry {
    /// Creates a new IFD entry
    pub fn new(tag: u16, field_type: u16, count: u64, value_offset: u64) -> Self {
        IFDEntry {
            tag,
            field_type,
            count,
            value_offset,
            inline: [0; 8],
        }
    }

    /// Total size in bytes of this entry's values
    pub fn byte_len(&self) -> u64 {
        (field_types::size_of(self.field_type) as u64).saturating_mul(self.count)
    }

    /// True if the values are stored in the entry itself
    pub fn is_value_inline(&self, is_big_tiff: bool) -> bool {
        let inline_size = if is_big_tiff { 8 } else { 4 };
        let is_inline = self.byte_len() <= inline_size;

        trace!("Tag {} ({}) value storage: {} bytes, inline={}",
               self.tag, tags::name(self.tag), self.byte_len(), is_inline);

        is_inline
    }
}

impl IFD {
    /// Creates an empty IFD
    pub fn new(number: usize, offset: u64) -> Self {
        IFD {
            entries: Vec::new(),
            number,
            offset,
            tag_map: HashMap::new(),
        }
    }

    /// Adds an entry and indexes it by tag
    pub fn add_entry(&mut self, entry: IFDEntry) {
        trace!("IFD #{}: tag {} ({}) type={} count={} value={}",
               self.number, entry.tag, tags::name(entry.tag),
               entry.field_type, entry.count, entry.value_offset);

        self.tag_map.insert(entry.tag, self.entries.len());
        self.entries.push(entry);
    }

    /// Value (or offset) field of a tag
    pub fn get_tag_value(&self, tag: u16) -> Option<u64> {
        self.get_entry(tag).map(|entry| entry.value_offset)
    }

    /// Checks if this IFD has a specific tag
    pub fn has_tag(&self, tag: u16) -> bool {
        self.tag_map.contains_key(&tag)
    }

    /// Full entry for a tag
    pub fn get_entry(&self, tag: u16) -> Option<&IFDEntry> {
        self.tag_map.get(&tag).map(|&i| &self.entries[i])
    }

    /// Width and height of the image
    pub fn get_dimensions(&self) -> Option<(u64, u64)> {
        let width = self.get_tag_value(tags::IMAGE_WIDTH)?;
        let height = self.get_tag_value(tags::IMAGE_LENGTH)?;
        Some((width, height))
    }

    /// Number of samples (bands) per pixel, default 1
    pub fn get_samples_per_pixel(&self) -> u64 {
        self.get_tag_value(tags::SAMPLES_PER_PIXEL).unwrap_or(1)
    }

    /// True if the image data is organised in tiles rather than strips
    pub fn is_tiled(&self) -> bool {
        self.has_tag(tags::TILE_OFFSETS)
    }

    /// True for overview or mask subfiles
    pub fn is_subfile(&self) -> bool {
        self.get_tag_value(tags::NEW_SUBFILE_TYPE)
            .map(|t| t & 0b101 != 0)
            .unwrap_or(false)
    }
}

impl fmt::Display for IFD {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "IFD #{} (offset: {})", self.number, self.offset)?;
        if let Some((width, height)) = self.get_dimensions() {
            writeln!(f, "  Dimensions: {}x{}", width, height)?;
        }
        writeln!(f, "  Samples per pixel: {}", self.get_samples_per_pixel())?;
        for entry in &self.entries {
            writeln!(f, "    {} ({}): {}", entry.tag, tags::name(entry.tag), entry.value_offset)?;
        }
        Ok(())
    }
}
