//! Masked pixel arrays and their positional metadata
//!
//! A `MaskedArray` is a band x row x column block of samples with a
//! parallel mask; `true` in the mask marks a pixel excluded from
//! statistics (no-data, or outside a circular region of interest).

use ndarray::{Array2, Array3, ArrayView2, Axis};

/// Band x row x column samples with a validity mask
#[derive(Debug, Clone, PartialEq)]
pub struct MaskedArray {
    data: Array3<f64>,
    mask: Array3<bool>,
}

impl MaskedArray {
    /// Wraps samples with every pixel valid
    pub fn new(data: Array3<f64>) -> Self {
        let mask = Array3::from_elem(data.raw_dim(), false);
        MaskedArray { data, mask }
    }

    /// Wraps samples with an explicit mask of the same shape
    pub fn with_mask(data: Array3<f64>, mask: Array3<bool>) -> Option<Self> {
        if data.shape() != mask.shape() {
            return None;
        }
        Some(MaskedArray { data, mask })
    }

    /// Stacks single-band windows into one array
    ///
    /// Returns `None` if the bands do not share a shape.
    pub fn from_bands(bands: Vec<Array2<f64>>) -> Option<Self> {
        let views: Vec<ArrayView2<f64>> = bands.iter().map(|b| b.view()).collect();
        ndarray::stack(Axis(0), &views).ok().map(MaskedArray::new)
    }

    /// Shape as (bands, rows, columns)
    pub fn shape(&self) -> (usize, usize, usize) {
        self.data.dim()
    }

    /// Number of bands
    pub fn band_count(&self) -> usize {
        self.data.len_of(Axis(0))
    }

    /// True if the array holds no pixels
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Raw samples, masked pixels included
    pub fn data(&self) -> &Array3<f64> {
        &self.data
    }

    /// Mask, `true` where a pixel is excluded
    pub fn mask(&self) -> &Array3<bool> {
        &self.mask
    }

    /// Masks every sample equal to `value` (NaN matches NaN)
    pub fn mask_value(&mut self, value: f64) {
        for band in 0..self.band_count() {
            self.mask_band_value(band, value);
        }
    }

    /// Masks the samples of one band equal to `value`
    pub fn mask_band_value(&mut self, band: usize, value: f64) {
        let matches = |v: f64| if value.is_nan() { v.is_nan() } else { v == value };
        ndarray::Zip::from(self.mask.index_axis_mut(Axis(0), band))
            .and(self.data.index_axis(Axis(0), band))
            .for_each(|m, &v| {
                if matches(v) {
                    *m = true;
                }
            });
    }

    /// Masks a pixel in every band
    pub fn mask_pixel(&mut self, row: usize, col: usize) {
        for band in 0..self.band_count() {
            self.mask[[band, row, col]] = true;
        }
    }

    /// Valid samples of one band in row-major order
    pub fn valid_values(&self, band: usize) -> Vec<f64> {
        self.data
            .index_axis(Axis(0), band)
            .iter()
            .zip(self.mask.index_axis(Axis(0), band).iter())
            .filter(|(_, &masked)| !masked)
            .map(|(&v, _)| v)
            .collect()
    }

    /// Number of unmasked samples
    pub fn count_valid(&self) -> usize {
        self.mask.iter().filter(|m| !**m).count()
    }

    /// Number of masked samples
    pub fn count_masked(&self) -> usize {
        self.mask.iter().filter(|m| **m).count()
    }

    /// Samples with masked pixels replaced by `fill`
    pub fn filled(&self, fill: f64) -> Array3<f64> {
        let mut out = self.data.clone();
        ndarray::Zip::from(&mut out)
            .and(&self.mask)
            .for_each(|v, &m| {
                if m {
                    *v = fill;
                }
            });
        out
    }
}

/// Pixels read for one asset at one point, with their position
///
/// Offsets and sizes are in pixels of the source image; the extent is the
/// world-coordinate rectangle covered by the window, in the image CRS.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayInfo {
    pub asset_id: String,
    pub data: MaskedArray,
    pub xoff: u32,
    pub yoff: u32,
    pub win_xsize: u32,
    pub win_ysize: u32,
    pub ulx: f64,
    pub uly: f64,
    pub lrx: f64,
    pub lry: f64,
    pub x_res: f64,
    pub y_res: f64,
}

impl ArrayInfo {
    /// True if no pixels were read
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
