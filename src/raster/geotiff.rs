//! GeoTIFF-backed raster datasets

use log::{debug, warn};
use ndarray::Array2;

use super::{RasterDataset, RasterInfo, RasterOpener};
use crate::coordinate::{CoordinateSystemFactory, GeoTransform, WGS84_EPSG};
use crate::errors::{DrillError, DrillResult};
use crate::extractor::{BlockReader, Region};
use crate::io::{open_source, SeekableReader};
use crate::tiff::errors::{TiffError, TiffResult};
use crate::tiff::{GeoKeyParser, TiffReader};
use crate::utils::xml_utils;

/// A GeoTIFF opened for windowed reads
pub struct GeoTiffDataset {
    source: Box<dyn SeekableReader>,
    tiff_reader: TiffReader,
    block_reader: BlockReader,
    info: RasterInfo,
    name: String,
}

impl GeoTiffDataset {
    /// Opens a local path or `http(s)://` URL
    pub fn open(href: &str) -> DrillResult<Self> {
        let source = open_source(href).map_err(|e| read_error(href, e))?;
        Self::from_reader(source, href)
    }

    /// Reads the structure of a GeoTIFF from an open stream
    ///
    /// # Arguments
    /// * `source` - Stream positioned anywhere; it is rewound
    /// * `name` - Name used in log and error messages
    pub fn from_reader(mut source: Box<dyn SeekableReader>, name: &str) -> DrillResult<Self> {
        let (tiff_reader, tiff) = TiffReader::read(source.as_mut()).map_err(|e| read_error(name, e))?;
        let ifd = tiff
            .main_ifd()
            .ok_or_else(|| DrillError::Read(format!("{}: no image in file", name)))?
            .clone();

        let block_reader = BlockReader::new(source.as_mut(), &tiff_reader, &ifd).map_err(|e| read_error(name, e))?;
        let geo = GeoKeyParser::extract_geo_info(source.as_mut(), &tiff_reader, &ifd)
            .map_err(|e| read_error(name, e))?;

        let geotransform = geo
            .geotransform()
            .ok_or_else(|| read_error(name, TiffError::MissingGeoreference))?;
        let epsg = match geo.epsg {
            Some(code) => code,
            None if geo.is_geographic_model() => {
                warn!("{}: geographic image without a datum code, assuming EPSG:{}", name, WGS84_EPSG);
                WGS84_EPSG
            }
            None => return Err(read_error(name, TiffError::MissingGeoreference)),
        };

        let layout = block_reader.layout();
        let band_count = layout.samples_per_pixel;
        let band_names = geo
            .gdal_metadata
            .as_deref()
            .map(|xml| xml_utils::band_descriptions(xml, band_count))
            .unwrap_or_else(|| vec![String::new(); band_count]);

        let info = RasterInfo {
            width: layout.image_width,
            height: layout.image_height,
            band_count,
            geotransform: GeoTransform::new(geotransform)?,
            crs: CoordinateSystemFactory::from_epsg(epsg)?,
            nodata: vec![geo.nodata; band_count],
            band_names,
            data_type: block_reader.sample_type().name().to_string(),
        };
        debug!("Opened {}: {}x{}x{} {} in {}", name, info.width, info.height, band_count, info.data_type, info.crs);

        Ok(GeoTiffDataset {
            source,
            tiff_reader,
            block_reader,
            info,
            name: name.to_string(),
        })
    }

    fn read(&mut self, band: usize, region: Region) -> TiffResult<Array2<f64>> {
        self.block_reader
            .read_window(self.source.as_mut(), self.tiff_reader.handler(), band, region)
    }
}

impl RasterDataset for GeoTiffDataset {
    fn info(&self) -> &RasterInfo {
        &self.info
    }

    fn read_window(&mut self, band: usize, region: Region) -> DrillResult<Array2<f64>> {
        self.read(band, region).map_err(|e| read_error(&self.name, e))
    }
}

/// Opens GeoTIFF files and remote GeoTIFF assets
#[derive(Debug, Clone, Copy, Default)]
pub struct GeoTiffOpener;

impl RasterOpener for GeoTiffOpener {
    fn open(&self, href: &str) -> DrillResult<Box<dyn RasterDataset>> {
        Ok(Box::new(GeoTiffDataset::open(href)?))
    }
}

fn read_error(name: &str, error: TiffError) -> DrillError {
    DrillError::Read(format!("{}: {}", name, error))
}
