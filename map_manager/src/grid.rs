//! # Occupancy grid
//!
//! The raster half of a stored map. Cell values follow the common occupancy
//! convention: 0 is free, 100 is fully occupied, 255 is unknown.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::path::Path;

use image::{DynamicImage, GrayImage, Luma};
use thiserror::Error;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Cell value for free space.
pub const OCC_FREE: u8 = 0;

/// Cell value for fully occupied space.
pub const OCC_OCCUPIED: u8 = 100;

/// Cell value for unobserved space.
pub const OCC_UNKNOWN: u8 = 255;

/// Maximum edge length of a generated thumbnail in pixels.
pub const THUMBNAIL_MAX_PX: u32 = 400;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A row-major occupancy raster.
///
/// Cell `(x, y)` lives at index `y * width + x`, with `(0, 0)` at the grid
/// origin corner.
#[derive(Debug, Clone, PartialEq)]
pub struct OccupancyGrid {
    width: usize,
    height: usize,
    cells: Vec<u8>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum GridError {
    #[error("Cell data length {0} does not match grid dimentions {1}x{2}")]
    DataLengthMismatch(usize, usize, usize),

    #[error("Cell ({0}, {1}) is outside the grid")]
    CellOutsideGrid(usize, usize),

    #[error("Image error: {0}")]
    ImageError(#[from] image::ImageError),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl OccupancyGrid {
    /// Create a new grid with all cells set to [`OCC_UNKNOWN`].
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![OCC_UNKNOWN; width * height],
        }
    }

    /// Create a grid from existing row-major cell data.
    pub fn from_cells(width: usize, height: usize, cells: Vec<u8>) -> Result<Self, GridError> {
        if cells.len() != width * height {
            return Err(GridError::DataLengthMismatch(cells.len(), width, height));
        }

        Ok(Self {
            width,
            height,
            cells,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn cells(&self) -> &[u8] {
        &self.cells
    }

    /// Get the value of a cell, or `None` if it's outside the grid.
    pub fn get(&self, x: usize, y: usize) -> Option<u8> {
        if x >= self.width || y >= self.height {
            return None;
        }

        Some(self.cells[y * self.width + x])
    }

    /// Set the value of a cell.
    pub fn set(&mut self, x: usize, y: usize, value: u8) -> Result<(), GridError> {
        if x >= self.width || y >= self.height {
            return Err(GridError::CellOutsideGrid(x, y));
        }

        self.cells[y * self.width + x] = value;

        Ok(())
    }

    /// Convert the grid into a grayscale image.
    ///
    /// Values are carried across unchanged, so occupied cells render dark and
    /// unknown cells white.
    pub fn to_image(&self) -> GrayImage {
        let mut img = GrayImage::new(self.width as u32, self.height as u32);

        for (x, y, px) in img.enumerate_pixels_mut() {
            *px = Luma([self.cells[y as usize * self.width + x as usize]]);
        }

        img
    }

    /// Build a grid from a grayscale image, one cell per pixel.
    pub fn from_image(img: &GrayImage) -> Self {
        let width = img.width() as usize;
        let height = img.height() as usize;

        let mut cells = vec![OCC_UNKNOWN; width * height];
        for (x, y, px) in img.enumerate_pixels() {
            cells[y as usize * width + x as usize] = px.0[0];
        }

        Self {
            width,
            height,
            cells,
        }
    }

    /// Save the grid as a PNG at the given path.
    pub fn save_png<P: AsRef<Path>>(&self, path: P) -> Result<(), GridError> {
        self.to_image().save(path)?;
        Ok(())
    }

    /// Load a grid from a PNG (or any other supported image format).
    pub fn load_png<P: AsRef<Path>>(path: P) -> Result<Self, GridError> {
        let img = image::open(path)?.to_luma8();
        Ok(Self::from_image(&img))
    }

    /// Produce a thumbnail of the grid no larger than
    /// [`THUMBNAIL_MAX_PX`] on either edge, preserving aspect ratio. Grids
    /// already within the limit are returned at full size.
    pub fn thumbnail(&self) -> GrayImage {
        let img = DynamicImage::ImageLuma8(self.to_image());
        img.thumbnail(THUMBNAIL_MAX_PX, THUMBNAIL_MAX_PX).to_luma8()
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_unknown() {
        let grid = OccupancyGrid::new(4, 3);

        assert_eq!(grid.width(), 4);
        assert_eq!(grid.height(), 3);
        assert!(grid.cells().iter().all(|&c| c == OCC_UNKNOWN));
    }

    #[test]
    fn test_get_set() {
        let mut grid = OccupancyGrid::new(4, 3);

        grid.set(2, 1, OCC_OCCUPIED).unwrap();

        assert_eq!(grid.get(2, 1), Some(OCC_OCCUPIED));
        assert_eq!(grid.get(0, 0), Some(OCC_UNKNOWN));
        assert_eq!(grid.get(4, 0), None);
        assert!(grid.set(0, 3, OCC_FREE).is_err());
    }

    #[test]
    fn test_from_cells_length_check() {
        assert!(OccupancyGrid::from_cells(2, 2, vec![0; 3]).is_err());
        assert!(OccupancyGrid::from_cells(2, 2, vec![0; 4]).is_ok());
    }

    #[test]
    fn test_image_round_trip() {
        let mut grid = OccupancyGrid::new(8, 8);
        grid.set(3, 4, OCC_OCCUPIED).unwrap();
        grid.set(0, 0, OCC_FREE).unwrap();

        let restored = OccupancyGrid::from_image(&grid.to_image());

        assert_eq!(grid, restored);
    }

    #[test]
    fn test_thumbnail_limits() {
        let grid = OccupancyGrid::new(1000, 500);
        let thumb = grid.thumbnail();

        assert!(thumb.width() <= THUMBNAIL_MAX_PX);
        assert!(thumb.height() <= THUMBNAIL_MAX_PX);
        // Aspect ratio preserved
        assert_eq!(thumb.width(), 2 * thumb.height());
    }
}
