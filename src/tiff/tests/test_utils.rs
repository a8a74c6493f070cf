//! Builders for small in-memory GeoTIFFs used by the reader tests

use std::collections::BTreeMap;
use std::io::{Cursor, Write};

use byteorder::{BigEndian, ByteOrder, LittleEndian, WriteBytesExt};
use flate2::write::ZlibEncoder;
use flate2::Compression;

enum TagValue {
    Short(Vec<u16>),
    Long(Vec<u32>),
    Double(Vec<f64>),
    Ascii(String),
}

impl TagValue {
    fn field_type(&self) -> u16 {
        match self {
            TagValue::Short(_) => 3,
            TagValue::Long(_) => 4,
            TagValue::Double(_) => 12,
            TagValue::Ascii(_) => 2,
        }
    }

    fn count(&self) -> u32 {
        match self {
            TagValue::Short(v) => v.len() as u32,
            TagValue::Long(v) => v.len() as u32,
            TagValue::Double(v) => v.len() as u32,
            TagValue::Ascii(s) => s.len() as u32 + 1,
        }
    }

    fn bytes<E: ByteOrder>(&self) -> Vec<u8> {
        let mut out = Vec::new();
        match self {
            TagValue::Short(v) => v.iter().for_each(|x| out.write_u16::<E>(*x).unwrap()),
            TagValue::Long(v) => v.iter().for_each(|x| out.write_u32::<E>(*x).unwrap()),
            TagValue::Double(v) => v.iter().for_each(|x| out.write_f64::<E>(*x).unwrap()),
            TagValue::Ascii(s) => {
                out.extend_from_slice(s.as_bytes());
                out.push(0);
            }
        }
        out
    }
}

/// Description of a uint16 GeoTIFF to encode
#[derive(Debug, Clone)]
pub struct TestGeoTiff {
    pub width: u32,
    pub height: u32,
    pub bands: u16,
    /// Pixel-interleaved samples in row-major order
    pub samples: Vec<u16>,
    /// Square tile size; strips are written when `None`
    pub tile_size: Option<u32>,
    pub rows_per_strip: u32,
    pub deflate: bool,
    pub big_endian: bool,
    pub epsg: u16,
    pub geographic: bool,
    pub origin: (f64, f64),
    pub pixel_size: f64,
    pub nodata: Option<String>,
    pub metadata: Option<String>,
}

impl TestGeoTiff {
    /// Single-band UTM 55S image of 10 m pixels whose sample at
    /// (row, col) is `row * width + col`
    pub fn sequential(width: u32, height: u32) -> Self {
        TestGeoTiff {
            width,
            height,
            bands: 1,
            samples: (0..width * height).map(|v| v as u16).collect(),
            tile_size: None,
            rows_per_strip: 2,
            deflate: false,
            big_endian: false,
            epsg: 32755,
            geographic: false,
            origin: (500_000.0, 6_000_200.0),
            pixel_size: 10.0,
            nodata: None,
            metadata: None,
        }
    }

    /// Adds bands; band `b` holds the first band's value plus `1000 * b`
    pub fn with_bands(mut self, bands: u16) -> Self {
        let pixels = (self.width * self.height) as usize;
        let first: Vec<u16> = (0..pixels).map(|p| self.samples[p * self.bands as usize]).collect();
        self.samples = first
            .iter()
            .flat_map(|v| (0..bands).map(move |b| v + 1000 * b))
            .collect();
        self.bands = bands;
        self
    }

    pub fn tiled(mut self, tile_size: u32) -> Self {
        self.tile_size = Some(tile_size);
        self
    }

    pub fn deflated(mut self) -> Self {
        self.deflate = true;
        self
    }

    pub fn big_endian(mut self) -> Self {
        self.big_endian = true;
        self
    }

    pub fn with_nodata(mut self, nodata: &str) -> Self {
        self.nodata = Some(nodata.to_string());
        self
    }

    pub fn with_metadata(mut self, xml: &str) -> Self {
        self.metadata = Some(xml.to_string());
        self
    }

    /// Encodes the image as a classic TIFF
    pub fn encode(&self) -> Vec<u8> {
        if self.big_endian {
            self.encode_with::<BigEndian>()
        } else {
            self.encode_with::<LittleEndian>()
        }
    }

    /// Encoded image wrapped in a cursor
    pub fn cursor(&self) -> Cursor<Vec<u8>> {
        Cursor::new(self.encode())
    }

    fn sample(&self, row: u32, col: u32, band: u16) -> u16 {
        let pixel = (row * self.width + col) as usize;
        self.samples[pixel * self.bands as usize + band as usize]
    }

    fn block_bytes<E: ByteOrder>(&self, rows: std::ops::Range<u32>, cols: std::ops::Range<u32>) -> Vec<u8> {
        let mut raw = Vec::new();
        for row in rows {
            for col in cols.clone() {
                for band in 0..self.bands {
                    let value = if row < self.height && col < self.width { self.sample(row, col, band) } else { 0 };
                    raw.write_u16::<E>(value).unwrap();
                }
            }
        }
        if self.deflate {
            let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(&raw).unwrap();
            encoder.finish().unwrap()
        } else {
            raw
        }
    }

    fn blocks<E: ByteOrder>(&self) -> Vec<Vec<u8>> {
        match self.tile_size {
            Some(tile) => {
                let across = (self.width + tile - 1) / tile;
                let down = (self.height + tile - 1) / tile;
                (0..down)
                    .flat_map(|ty| (0..across).map(move |tx| (tx, ty)))
                    .map(|(tx, ty)| self.block_bytes::<E>(ty * tile..(ty + 1) * tile, tx * tile..(tx + 1) * tile))
                    .collect()
            }
            None => {
                let rows = self.rows_per_strip;
                let strips = (self.height + rows - 1) / rows;
                (0..strips)
                    .map(|s| self.block_bytes::<E>(s * rows..((s + 1) * rows).min(self.height), 0..self.width))
                    .collect()
            }
        }
    }

    fn encode_with<E: ByteOrder>(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(if self.big_endian { b"MM" } else { b"II" });
        buf.write_u16::<E>(42).unwrap();
        buf.write_u32::<E>(0).unwrap();

        let mut offsets = Vec::new();
        let mut counts = Vec::new();
        for block in self.blocks::<E>() {
            offsets.push(buf.len() as u32);
            counts.push(block.len() as u32);
            buf.extend_from_slice(&block);
        }

        let mut tags = BTreeMap::new();
        tags.insert(256, TagValue::Long(vec![self.width]));
        tags.insert(257, TagValue::Long(vec![self.height]));
        tags.insert(258, TagValue::Short(vec![16; self.bands as usize]));
        tags.insert(259, TagValue::Short(vec![if self.deflate { 8 } else { 1 }]));
        tags.insert(262, TagValue::Short(vec![1]));
        tags.insert(277, TagValue::Short(vec![self.bands]));
        tags.insert(339, TagValue::Short(vec![1; self.bands as usize]));
        match self.tile_size {
            Some(tile) => {
                tags.insert(322, TagValue::Long(vec![tile]));
                tags.insert(323, TagValue::Long(vec![tile]));
                tags.insert(324, TagValue::Long(offsets));
                tags.insert(325, TagValue::Long(counts));
            }
            None => {
                tags.insert(273, TagValue::Long(offsets));
                tags.insert(278, TagValue::Long(vec![self.rows_per_strip]));
                tags.insert(279, TagValue::Long(counts));
            }
        }
        tags.insert(33550, TagValue::Double(vec![self.pixel_size, self.pixel_size, 0.0]));
        tags.insert(33922, TagValue::Double(vec![0.0, 0.0, 0.0, self.origin.0, self.origin.1, 0.0]));
        let (model, key) = if self.geographic { (2, 2048) } else { (1, 3072) };
        tags.insert(34735, TagValue::Short(vec![1, 1, 0, 2, 1024, 0, 1, model, key, 0, 1, self.epsg]));
        if let Some(xml) = &self.metadata {
            tags.insert(42112, TagValue::Ascii(xml.clone()));
        }
        if let Some(nodata) = &self.nodata {
            tags.insert(42113, TagValue::Ascii(nodata.clone()));
        }

        // Values longer than the 4-byte field go after the pixel data
        let mut fields = Vec::new();
        for (tag, value) in &tags {
            let bytes = value.bytes::<E>();
            let field = if bytes.len() > 4 {
                if buf.len() % 2 == 1 {
                    buf.push(0);
                }
                let mut field = Vec::new();
                field.write_u32::<E>(buf.len() as u32).unwrap();
                buf.extend_from_slice(&bytes);
                field
            } else {
                let mut field = bytes;
                field.resize(4, 0);
                field
            };
            fields.push((*tag, value.field_type(), value.count(), field));
        }

        if buf.len() % 2 == 1 {
            buf.push(0);
        }
        let ifd_offset = buf.len() as u32;
        buf.write_u16::<E>(fields.len() as u16).unwrap();
        for (tag, field_type, count, field) in fields {
            buf.write_u16::<E>(tag).unwrap();
            buf.write_u16::<E>(field_type).unwrap();
            buf.write_u32::<E>(count).unwrap();
            buf.extend_from_slice(&field);
        }
        buf.write_u32::<E>(0).unwrap();

        E::write_u32(&mut buf[4..8], ifd_offset);
        buf
    }
}
