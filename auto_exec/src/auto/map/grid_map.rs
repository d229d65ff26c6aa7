//! # Grid Map
//!
//! [`GridMap`] is a layered 2D map over a regular grid of square cells. Cell
//! (0, 0) sits at the map's origin corner, with x cells increasing along the
//! +x axis and y cells along +y, matching the raster convention used by the
//! map store.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{collections::HashMap, hash::Hash};

use nalgebra::Vector2;
use ndarray::{s, Array2, Array3, ArrayView2};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A grid-based map containing many layers of information.
#[derive(Clone, Debug)]
pub struct GridMap<T, L>
where
    T: Clone,
    L: Hash + Eq,
{
    /// The size of each (square) grid cell in meters
    cell_size_m: f64,

    /// The number of cells in each axis of the map
    num_cells: Vector2<usize>,

    /// Position of the map's origin corner (corner of cell (0, 0))
    origin_position_m: Vector2<f64>,

    /// A map between layer name and index into the map data array
    layer_map: HashMap<L, usize>,

    /// Raw map data, a 3D array with dimension order layer, x cell, y cell
    data: Array3<T>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum GridMapError {
    #[error("Requested position or cell outside map bounds")]
    OutsideMap,

    #[error("Attempted to access unknown layer")]
    UnknownLayer,

    #[error("Map created with no layers, there must be at least one")]
    NoLayers,

    #[error("Map created with a non-positive cell size")]
    InvalidCellSize,

    #[error("Provided array shape doesn't match the expected shape")]
    IncompatibleShape,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl<T, L> GridMap<T, L>
where
    T: Clone,
    L: Hash + Eq + Clone,
{
    /// Create a new GridMap with the given cell size, number of cells, origin corner position,
    /// layers, and initial empty value.
    pub fn new(
        cell_size_m: f64,
        num_cells: Vector2<usize>,
        origin_position_m: Vector2<f64>,
        layers: &[L],
        empty_value: T,
    ) -> Result<Self, GridMapError> {
        // Create layer map
        let mut layer_map = HashMap::new();

        for (i, layer) in layers.iter().enumerate() {
            layer_map.insert(layer.clone(), i);
        }

        if layer_map.is_empty() {
            return Err(GridMapError::NoLayers);
        }

        if cell_size_m <= 0.0 {
            return Err(GridMapError::InvalidCellSize);
        }

        Ok(Self {
            cell_size_m,
            num_cells,
            origin_position_m,
            layer_map,
            data: Array3::from_elem((layers.len(), num_cells.x, num_cells.y), empty_value),
        })
    }

    pub fn cell_size_m(&self) -> f64 {
        self.cell_size_m
    }

    pub fn num_cells(&self) -> Vector2<usize> {
        self.num_cells
    }

    fn layer_index(&self, layer: &L) -> Result<usize, GridMapError> {
        match self.layer_map.get(layer) {
            Some(l) => Ok(*l),
            None => Err(GridMapError::UnknownLayer),
        }
    }

    pub fn position_in_map(&self, position_m: &Vector2<f64>) -> bool {
        let rel = position_m - self.origin_position_m;

        rel.x >= 0.0
            && rel.y >= 0.0
            && rel.x <= self.cell_size_m * (self.num_cells.x as f64)
            && rel.y <= self.cell_size_m * (self.num_cells.y as f64)
    }

    pub fn cell_in_map(&self, cell: &Vector2<usize>) -> bool {
        cell.x < self.num_cells.x && cell.y < self.num_cells.y
    }

    /// Get the cell containing the given position.
    pub fn position_to_cell(
        &self,
        position_m: &Vector2<f64>,
    ) -> Result<Vector2<usize>, GridMapError> {
        if !self.position_in_map(position_m) {
            return Err(GridMapError::OutsideMap);
        }

        let rel = (position_m - self.origin_position_m) / self.cell_size_m;
        let cell = Vector2::new(rel.x.floor() as usize, rel.y.floor() as usize);

        // Positions exactly on the far edge floor to num_cells, clamp them to the last cell
        let cell = Vector2::new(
            cell.x.min(self.num_cells.x - 1),
            cell.y.min(self.num_cells.y - 1),
        );

        Ok(cell)
    }

    /// Get the position of the centre of the given cell.
    pub fn cell_position(&self, cell: &Vector2<usize>) -> Result<Vector2<f64>, GridMapError> {
        if !self.cell_in_map(cell) {
            return Err(GridMapError::OutsideMap);
        }

        Ok(self.origin_position_m
            + Vector2::new(
                (cell.x as f64 + 0.5) * self.cell_size_m,
                (cell.y as f64 + 0.5) * self.cell_size_m,
            ))
    }

    pub fn get(&self, layer: &L, cell: &Vector2<usize>) -> Result<T, GridMapError> {
        let layer_idx = self.layer_index(layer)?;

        if !self.cell_in_map(cell) {
            return Err(GridMapError::OutsideMap);
        }

        Ok(self.data[[layer_idx, cell.x, cell.y]].clone())
    }

    pub fn get_mut(&mut self, layer: &L, cell: &Vector2<usize>) -> Result<&mut T, GridMapError> {
        let layer_idx = self.layer_index(layer)?;

        if !self.cell_in_map(cell) {
            return Err(GridMapError::OutsideMap);
        }

        Ok(&mut self.data[[layer_idx, cell.x, cell.y]])
    }

    pub fn get_position(&self, layer: &L, position_m: &Vector2<f64>) -> Result<T, GridMapError> {
        let cell = self.position_to_cell(position_m)?;
        self.get(layer, &cell)
    }

    pub fn set(&mut self, layer: &L, cell: &Vector2<usize>, value: T) -> Result<(), GridMapError> {
        *self.get_mut(layer, cell)? = value;
        Ok(())
    }

    pub fn set_layer(&mut self, layer: &L, data: Array2<T>) -> Result<(), GridMapError> {
        let layer_idx = self.layer_index(layer)?;

        if data.shape() != [self.num_cells.x, self.num_cells.y] {
            return Err(GridMapError::IncompatibleShape);
        }

        self.data.slice_mut(s![layer_idx, .., ..]).assign(&data);

        Ok(())
    }

    pub fn get_layer(&self, layer: &L) -> Result<ArrayView2<T>, GridMapError> {
        let layer_idx = self.layer_index(layer)?;

        Ok(self.data.slice(s![layer_idx, .., ..]))
    }

    /// Apply the given function to every cell of the given layer.
    ///
    /// The function is given the cell index, the cell's centre position, and the current value.
    pub fn map_layer<F: Fn(Vector2<usize>, Vector2<f64>, T) -> T>(
        &mut self,
        layer: &L,
        f: F,
    ) -> Result<(), GridMapError> {
        let layer_idx = self.layer_index(layer)?;

        let cell_size_m = self.cell_size_m;
        let origin = self.origin_position_m;

        for (idx, t) in self
            .data
            .slice_mut(s![layer_idx, .., ..])
            .indexed_iter_mut()
        {
            let cell = Vector2::new(idx.0, idx.1);
            let pos = origin
                + Vector2::new(
                    (cell.x as f64 + 0.5) * cell_size_m,
                    (cell.y as f64 + 0.5) * cell_size_m,
                );

            *t = f(cell, pos, t.clone());
        }

        Ok(())
    }

    /// Get all cells crossed by the straight line between the two positions, using a supercover
    /// grid traversal.
    ///
    /// Both endpoints must be inside the map.
    pub fn line_cells(
        &self,
        from_m: &Vector2<f64>,
        to_m: &Vector2<f64>,
    ) -> Result<Vec<Vector2<usize>>, GridMapError> {
        let start = self.position_to_cell(from_m)?;
        let end = self.position_to_cell(to_m)?;

        let mut cells = Vec::new();

        let mut x = start.x as isize;
        let mut y = start.y as isize;
        let end_x = end.x as isize;
        let end_y = end.y as isize;

        let dx = (end_x - x).abs();
        let dy = (end_y - y).abs();
        let step_x: isize = if end_x > x { 1 } else { -1 };
        let step_y: isize = if end_y > y { 1 } else { -1 };

        let mut err = dx - dy;

        loop {
            cells.push(Vector2::new(x as usize, y as usize));

            if x == end_x && y == end_y {
                break;
            }

            let e2 = 2 * err;

            // Step one axis at a time so the traversal never skips diagonally over a cell corner
            if e2 > -dy {
                err -= dy;
                x += step_x;
            } else if e2 < dx {
                err += dx;
                y += step_y;
            }
        }

        Ok(cells)
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    fn test_map() -> GridMap<Option<f64>, i32> {
        GridMap::new(
            1.0,
            Vector2::new(20, 30),
            Vector2::new(0.0, 0.0),
            &[0, 1],
            None,
        )
        .unwrap()
    }

    #[test]
    fn test_grid_map() -> Result<(), GridMapError> {
        let map = test_map();

        // Test out of bounds detection
        assert!(map.position_in_map(&Vector2::new(10.0, 15.0)));
        assert!(map.position_in_map(&Vector2::new(0.0, 0.0)));
        assert!(map.position_in_map(&Vector2::new(20.0, 30.0)));
        assert!(!map.position_in_map(&Vector2::new(-0.1, 15.0)));
        assert!(!map.position_in_map(&Vector2::new(20.1, 30.0)));

        // Test position->cell
        assert_eq!(
            map.position_to_cell(&Vector2::new(0.0, 0.0))?,
            Vector2::new(0, 0)
        );
        assert_eq!(
            map.position_to_cell(&Vector2::new(10.5, 10.5))?,
            Vector2::new(10, 10)
        );
        // Far edge clamps to the last cell
        assert_eq!(
            map.position_to_cell(&Vector2::new(20.0, 30.0))?,
            Vector2::new(19, 29)
        );

        // Test cell->position
        assert_eq!(
            map.cell_position(&Vector2::new(0, 0))?,
            Vector2::new(0.5, 0.5)
        );
        assert_eq!(
            map.cell_position(&Vector2::new(10, 20))?,
            Vector2::new(10.5, 20.5)
        );

        Ok(())
    }

    #[test]
    fn test_get_set() -> Result<(), GridMapError> {
        let mut map = test_map();

        map.set(&0, &Vector2::new(3, 4), Some(1.5))?;

        assert_eq!(map.get(&0, &Vector2::new(3, 4))?, Some(1.5));
        assert_eq!(map.get(&1, &Vector2::new(3, 4))?, None);
        assert!(map.get(&2, &Vector2::new(3, 4)).is_err());
        assert!(map.get(&0, &Vector2::new(20, 0)).is_err());

        Ok(())
    }

    #[test]
    fn test_line_cells() -> Result<(), GridMapError> {
        let map = test_map();

        // Straight horizontal line
        let cells = map.line_cells(&Vector2::new(0.5, 0.5), &Vector2::new(4.5, 0.5))?;
        assert_eq!(cells.len(), 5);
        assert_eq!(cells[0], Vector2::new(0, 0));
        assert_eq!(cells[4], Vector2::new(4, 0));

        // Diagonal line visits intermediate cells
        let cells = map.line_cells(&Vector2::new(0.5, 0.5), &Vector2::new(3.5, 3.5))?;
        assert_eq!(cells.first(), Some(&Vector2::new(0, 0)));
        assert_eq!(cells.last(), Some(&Vector2::new(3, 3)));
        assert!(cells.len() >= 4);

        // Endpoints outside the map are rejected
        assert!(map
            .line_cells(&Vector2::new(-1.0, 0.0), &Vector2::new(1.0, 1.0))
            .is_err());

        Ok(())
    }
}
