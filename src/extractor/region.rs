//! Pixel window definition
//!
//! A `Region` is a rectangle in pixel space: (0,0) is the top-left corner
//! of the image, x grows to the right and y grows downwards.

/// Rectangular pixel window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    /// X-coordinate of the top-left corner (column offset)
    pub x: u32,
    /// Y-coordinate of the top-left corner (row offset)
    pub y: u32,
    /// Width of the region in pixels
    pub width: u32,
    /// Height of the region in pixels
    pub height: u32,
}

impl Region {
    /// Create a new region
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Region { x, y, width, height }
    }

    /// Column immediately right of the region
    pub fn end_x(&self) -> u32 {
        self.x + self.width
    }

    /// Row immediately below the region
    pub fn end_y(&self) -> u32 {
        self.y + self.height
    }

    /// True if the region covers no pixels
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Number of pixels covered
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Builds a region from fractional pixel bounds, clipped to an image
    ///
    /// The upper-left corner is floored and the lower-right corner is ceiled
    /// before clipping, so any pixel touched by the bounds is included.
    ///
    /// # Arguments
    /// * `ul` - Upper-left (column, row) in pixel space
    /// * `lr` - Lower-right (column, row) in pixel space
    /// * `image_width` - Number of columns in the image
    /// * `image_height` - Number of rows in the image
    ///
    /// # Returns
    /// The clipped region, or `None` if nothing of it lies inside the image
    pub fn from_pixel_bounds(ul: (f64, f64), lr: (f64, f64), image_width: u32, image_height: u32) -> Option<Self> {
        let (col_min, col_max) = (ul.0.min(lr.0), ul.0.max(lr.0));
        let (row_min, row_max) = (ul.1.min(lr.1), ul.1.max(lr.1));
        if !(col_min.is_finite() && col_max.is_finite() && row_min.is_finite() && row_max.is_finite()) {
            return None;
        }

        let x0 = (col_min.floor() as i64).max(0);
        let y0 = (row_min.floor() as i64).max(0);
        let x1 = (col_max.ceil() as i64).min(image_width as i64);
        let y1 = (row_max.ceil() as i64).min(image_height as i64);

        if x1 - x0 <= 0 || y1 - y0 <= 0 {
            return None;
        }

        Some(Region::new(x0 as u32, y0 as u32, (x1 - x0) as u32, (y1 - y0) as u32))
    }

    /// Single-pixel region containing a fractional pixel position
    pub fn containing_pixel(col: f64, row: f64, image_width: u32, image_height: u32) -> Option<Self> {
        let (c, r) = (col.floor(), row.floor());
        if !c.is_finite() || !r.is_finite() || c < 0.0 || r < 0.0
            || c >= image_width as f64 || r >= image_height as f64 {
            return None;
        }
        Some(Region::new(c as u32, r as u32, 1, 1))
    }
}
