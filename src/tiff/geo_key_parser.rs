//! GeoTIFF metadata and GeoKey parsing
//!
//! Extracts the coordinate reference system, affine geotransform, GDAL
//! no-data value and GDAL metadata XML from an IFD.

use log::{debug, warn};

use crate::io::seekable::SeekableReader;
use crate::tiff::constants::{geo_keys, model_type, tags, USER_DEFINED};
use crate::tiff::errors::{TiffError, TiffResult};
use crate::tiff::ifd::IFD;
use crate::tiff::reader::TiffReader;

/// One entry of the GeoKey directory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeoKeyEntry {
    pub key_id: u16,
    pub tiff_tag_location: u16,
    pub count: u16,
    pub value_offset: u16,
}

/// Georeferencing information of one image
#[derive(Debug, Clone, Default)]
pub struct GeoInfo {
    /// EPSG code of the image CRS, when declared
    pub epsg: Option<u32>,
    /// GTModelTypeGeoKey value
    pub model_type: Option<u16>,
    /// ModelPixelScale (x, y, z)
    pub pixel_scale: Option<[f64; 3]>,
    /// First ModelTiepoint (i, j, k, x, y, z)
    pub tie_point: Option<[f64; 6]>,
    /// ModelTransformation matrix, row-major 4x4
    pub transformation: Option<[f64; 16]>,
    /// GDAL no-data value
    pub nodata: Option<f64>,
    /// GDAL metadata XML
    pub gdal_metadata: Option<String>,
}

impl GeoInfo {
    /// GDAL-style geotransform `[origin_x, px_w, row_rot, origin_y, col_rot, px_h]`
    pub fn geotransform(&self) -> Option<[f64; 6]> {
        if let Some(m) = self.transformation {
            return Some([m[3], m[0], m[1], m[7], m[4], m[5]]);
        }

        let scale = self.pixel_scale?;
        let tie = self.tie_point?;
        if scale[0] == 0.0 || scale[1] == 0.0 {
            return None;
        }

        let origin_x = tie[3] - tie[0] * scale[0];
        let origin_y = tie[4] + tie[1] * scale[1];
        Some([origin_x, scale[0], 0.0, origin_y, 0.0, -scale[1]])
    }

    /// True if the model type key declares a geographic CRS
    pub fn is_geographic_model(&self) -> bool {
        self.model_type == Some(model_type::GEOGRAPHIC)
    }
}

/// Parser for GeoTIFF geographic metadata
pub struct GeoKeyParser;

impl GeoKeyParser {
    /// Parses the GeoKey directory of an IFD
    ///
    /// # Returns
    /// The key entries, or an empty vector when the IFD has no directory
    pub fn parse_geo_key_directory(
        reader: &mut dyn SeekableReader,
        tiff_reader: &TiffReader,
        ifd: &IFD,
    ) -> TiffResult<Vec<GeoKeyEntry>> {
        if !ifd.has_tag(tags::GEO_KEY_DIRECTORY_TAG) {
            return Ok(Vec::new());
        }

        let values = tiff_reader.read_tag_values(reader, ifd, tags::GEO_KEY_DIRECTORY_TAG)?;
        if values.len() < 4 {
            return Err(TiffError::GenericError("Invalid GeoKey directory header".to_string()));
        }

        let num_keys = values[3] as usize;
        debug!("GeoKey directory: version={}, revision={}.{}, keys={}",
               values[0], values[1], values[2], num_keys);

        let entries = values[4..]
            .chunks_exact(4)
            .take(num_keys)
            .map(|k| GeoKeyEntry {
                key_id: k[0] as u16,
                tiff_tag_location: k[1] as u16,
                count: k[2] as u16,
                value_offset: k[3] as u16,
            })
            .collect();

        Ok(entries)
    }

    /// Extracts georeferencing from an IFD
    ///
    /// # Arguments
    /// * `reader` - Stream the IFD was read from
    /// * `tiff_reader` - Reader holding the file's byte order
    /// * `ifd` - The IFD to interpret
    ///
    /// # Returns
    /// Structure with whatever georeferencing the file declares
    pub fn extract_geo_info(
        reader: &mut dyn SeekableReader,
        tiff_reader: &TiffReader,
        ifd: &IFD,
    ) -> TiffResult<GeoInfo> {
        let mut info = GeoInfo::default();
        let mut projected = None;
        let mut geographic = None;

        for key in Self::parse_geo_key_directory(reader, tiff_reader, ifd)? {
            if key.tiff_tag_location != 0 {
                continue;
            }
            match key.key_id {
                geo_keys::MODEL_TYPE => info.model_type = Some(key.value_offset),
                geo_keys::PROJECTED_CS_TYPE => projected = Some(key.value_offset),
                geo_keys::GEOGRAPHIC_TYPE => geographic = Some(key.value_offset),
                _ => {}
            }
        }

        let valid = |code: Option<u16>| code.filter(|c| *c != 0 && *c != USER_DEFINED);
        info.epsg = match info.model_type {
            Some(model_type::GEOGRAPHIC) => valid(geographic).or(valid(projected)),
            _ => valid(projected).or(valid(geographic)),
        }
        .map(u32::from);

        if ifd.has_tag(tags::MODEL_PIXEL_SCALE_TAG) {
            let scale = tiff_reader.read_tag_f64_values(reader, ifd, tags::MODEL_PIXEL_SCALE_TAG)?;
            if scale.len() >= 2 {
                info.pixel_scale = Some([scale[0], scale[1], scale.get(2).copied().unwrap_or(0.0)]);
            }
        }

        if ifd.has_tag(tags::MODEL_TIEPOINT_TAG) {
            let tie = tiff_reader.read_tag_f64_values(reader, ifd, tags::MODEL_TIEPOINT_TAG)?;
            if tie.len() >= 6 {
                info.tie_point = Some([tie[0], tie[1], tie[2], tie[3], tie[4], tie[5]]);
            }
        }

        if ifd.has_tag(tags::MODEL_TRANSFORMATION_TAG) {
            let matrix = tiff_reader.read_tag_f64_values(reader, ifd, tags::MODEL_TRANSFORMATION_TAG)?;
            if let Ok(m) = <[f64; 16]>::try_from(matrix.as_slice()) {
                info.transformation = Some(m);
            }
        }

        if ifd.has_tag(tags::GDAL_NODATA) {
            let text = tiff_reader.read_tag_ascii(reader, ifd, tags::GDAL_NODATA)?;
            match text.trim().parse::<f64>() {
                Ok(value) => info.nodata = Some(value),
                Err(_) => warn!("Ignoring unparsable GDAL_NODATA value '{}'", text),
            }
        }

        if ifd.has_tag(tags::GDAL_METADATA) {
            info.gdal_metadata = Some(tiff_reader.read_tag_ascii(reader, ifd, tags::GDAL_METADATA)?);
        }

        debug!("GeoInfo: epsg={:?}, geotransform={:?}, nodata={:?}",
               info.epsg, info.geotransform(), info.nodata);
        Ok(info)
    }
}
