//! # Cost Map
//!
//! The cost map is built from a stored map's occupancy grid and zone
//! annotations. Occupied cells and keep-out zones are unsafe, slow-down zones
//! carry a fixed extra cost, and unsafe cells are inflated by the platform's
//! safety radius so paths keep their distance from obstacles.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::ops::{Deref, DerefMut};

use log::debug;
use map_manager::{grid::OCC_UNKNOWN, MapDoc, OccupancyGrid, ZoneType};
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

use crate::auto::path::Path;

use super::{GridMap, GridMapError};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Cost Map
#[derive(Clone, Debug)]
pub struct CostMap {
    map: GridMap<CostMapData, CostMapLayer>,

    params: CostMapParams,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostMapParams {
    /// Occupancy value (0 - 100) at and above which a cell is unsafe.
    pub occ_unsafe_threshold: u8,

    /// The factor applied to sub-threshold occupancy when converting to cost.
    pub occ_cost_factor: f64,

    /// Radius around an unsafe cell which is also marked unsafe, in meters.
    pub inflation_radius_m: f64,

    /// The cost added to cells inside a slow-down zone.
    pub slow_down_zone_cost: f64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Possible layers in a [`CostMap`]
#[derive(PartialEq, Eq, Clone, Copy, Hash, Debug, Serialize, Deserialize)]
pub enum CostMapLayer {
    Total,
    Occupancy,
    Zones,
}

/// Possible values of the cost map
#[derive(PartialEq, Clone, Copy, Debug, Serialize, Deserialize)]
pub enum CostMapData {
    /// This cell is empty (has not been surveyed - do not plan path)
    None,

    /// This cell cannot be traversed as it is unsafe
    Unsafe,

    /// General cost associated with a surveyed safe cell. Values are between 0 and 1 (inclusive).
    /// 0 represents the lowest cost, and 1 the highest. Any values above 1 would be converted to
    /// Unsafe.
    Cost(f64),
}

/// Errors that can arise from processing cost maps.
#[derive(Debug, thiserror::Error)]
pub enum CostMapError {
    #[error("Error in underlying GridMap: {0}")]
    GridMapError(#[from] GridMapError),

    #[error(
        "Cannot build the cost map, the occupancy grid is {0}x{1} but the map document says {2}x{3}"
    )]
    ShapeMismatch(usize, usize, usize, usize),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for CostMapData {
    fn default() -> Self {
        Self::None
    }
}

impl CostMap {
    /// Calculate the cost map from the given map document and occupancy grid.
    pub fn from_map(
        params: CostMapParams,
        doc: &MapDoc,
        grid: &OccupancyGrid,
    ) -> Result<Self, CostMapError> {
        if grid.width() != doc.width || grid.height() != doc.height {
            return Err(CostMapError::ShapeMismatch(
                grid.width(),
                grid.height(),
                doc.width,
                doc.height,
            ));
        }

        let map = GridMap::new(
            doc.resolution_m,
            Vector2::new(doc.width, doc.height),
            Vector2::new(doc.origin.position.x, doc.origin.position.y),
            &[
                CostMapLayer::Total,
                CostMapLayer::Occupancy,
                CostMapLayer::Zones,
            ],
            CostMapData::None,
        )?;

        let mut cost_map = Self { map, params };

        cost_map.calculate_occupancy(grid)?;
        cost_map.inflate_unsafe()?;
        cost_map.apply_zones(doc)?;
        cost_map.calculate_total()?;

        debug!(
            "Cost map calculated from map '{}' ({}x{} cells at {} m)",
            doc.name, doc.width, doc.height, doc.resolution_m
        );

        Ok(cost_map)
    }

    /// Convert the occupancy grid into the occupancy cost layer.
    fn calculate_occupancy(&mut self, grid: &OccupancyGrid) -> Result<(), CostMapError> {
        let unsafe_threshold = self.params.occ_unsafe_threshold;
        let cost_factor = self.params.occ_cost_factor;

        self.map.map_layer(&CostMapLayer::Occupancy, |cell, _, _| {
            // The unwrap is safe as the layers were built with the grid's dimensions
            let occ = grid.get(cell.x, cell.y).unwrap();

            if occ == OCC_UNKNOWN {
                CostMapData::None
            } else if occ >= unsafe_threshold {
                CostMapData::Unsafe
            } else {
                let cost = (occ as f64 / 100.0) * cost_factor;
                if cost >= 1.0 {
                    CostMapData::Unsafe
                } else {
                    CostMapData::Cost(cost)
                }
            }
        })?;

        Ok(())
    }

    /// Mark every cell within the inflation radius of an unsafe occupancy cell as unsafe.
    fn inflate_unsafe(&mut self) -> Result<(), CostMapError> {
        let inflation_cells =
            (self.params.inflation_radius_m / self.map.cell_size_m()).ceil() as isize;

        if inflation_cells == 0 {
            return Ok(());
        }

        let num_cells = self.map.num_cells();

        // Collect the unsafe cells first so inflation doesn't cascade
        let mut unsafe_cells = Vec::new();
        for x in 0..num_cells.x {
            for y in 0..num_cells.y {
                let cell = Vector2::new(x, y);
                if self.map.get(&CostMapLayer::Occupancy, &cell)? == CostMapData::Unsafe {
                    unsafe_cells.push(cell);
                }
            }
        }

        for cell in unsafe_cells {
            for dx in -inflation_cells..=inflation_cells {
                for dy in -inflation_cells..=inflation_cells {
                    // Keep the inflated area circular
                    if dx * dx + dy * dy > inflation_cells * inflation_cells {
                        continue;
                    }

                    let x = cell.x as isize + dx;
                    let y = cell.y as isize + dy;
                    if x < 0 || y < 0 {
                        continue;
                    }

                    let neighbour = Vector2::new(x as usize, y as usize);
                    if self.map.cell_in_map(&neighbour) {
                        self.map
                            .set(&CostMapLayer::Occupancy, &neighbour, CostMapData::Unsafe)?;
                    }
                }
            }
        }

        Ok(())
    }

    /// Apply the map's zone polygons to the zone cost layer.
    fn apply_zones(&mut self, doc: &MapDoc) -> Result<(), CostMapError> {
        let default_zone = doc.default_zone;
        let slow_down_cost = self.params.slow_down_zone_cost;
        let zones = doc.zones.clone();

        self.map.map_layer(&CostMapLayer::Zones, |_, pos, _| {
            // The innermost zone containing this cell wins, falling back to the map's default
            let zone_type = zones
                .iter()
                .rev()
                .find(|z| z.contains(pos.x, pos.y))
                .map(|z| z.zone_type)
                .unwrap_or(default_zone);

            match zone_type {
                ZoneType::Open => CostMapData::Cost(0.0),
                ZoneType::KeepOut => CostMapData::Unsafe,
                ZoneType::SlowDown => {
                    if slow_down_cost >= 1.0 {
                        CostMapData::Unsafe
                    } else {
                        CostMapData::Cost(slow_down_cost)
                    }
                }
            }
        })?;

        Ok(())
    }

    /// Computes the total cost of all layers in the map, and stores it in the
    /// `CostMapLayer::Total` layer.
    fn calculate_total(&mut self) -> Result<(), CostMapError> {
        let num_cells = self.map.num_cells();

        for x in 0..num_cells.x {
            for y in 0..num_cells.y {
                let cell = Vector2::new(x, y);

                let mut total = CostMapData::Cost(0.0);
                total.add(&self.map.get(&CostMapLayer::Occupancy, &cell)?);
                total.add(&self.map.get(&CostMapLayer::Zones, &cell)?);

                self.map.set(&CostMapLayer::Total, &cell, total)?;
            }
        }

        Ok(())
    }

    /// Compute the cost of the given path through the map.
    ///
    /// If at any point the path crosses an unsafe cell `CostMapData::Unsafe` will be returned. If
    /// it ever crosses an unpopulated cell `CostMapData::None` will be returned.
    ///
    /// Costs calculated for a path are not bounded to 1.0, as they are the sum of the costs of
    /// all crossed cells.
    pub fn get_path_cost(&self, path: &Path) -> Result<CostMapData, GridMapError> {
        let mut cost = CostMapData::Cost(0.0);

        // Add all cells by traversing each segment
        for target in 1..path.points_m.len() {
            for cell in self
                .map
                .line_cells(&path.points_m[target - 1], &path.points_m[target])?
            {
                cost.add_without_max(&self.map.get(&CostMapLayer::Total, &cell)?);
            }
        }

        Ok(cost)
    }

    /// Compute the cost of the straight line between the two positions.
    pub fn get_cost_between_points(
        &self,
        from_m: Vector2<f64>,
        to_m: Vector2<f64>,
    ) -> Result<CostMapData, GridMapError> {
        let mut cost = CostMapData::Cost(0.0);

        for cell in self.map.line_cells(&from_m, &to_m)? {
            cost.add_without_max(&self.map.get(&CostMapLayer::Total, &cell)?);
        }

        Ok(cost)
    }
}

impl Deref for CostMap {
    type Target = GridMap<CostMapData, CostMapLayer>;

    fn deref(&self) -> &Self::Target {
        &self.map
    }
}

impl DerefMut for CostMap {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.map
    }
}

impl CostMapData {
    /// Adds other to self, mutating self.
    ///
    /// Follows these rules:
    ///  - If either self or other is `None`, self becomes `None`.
    ///  - If either self or other is `Unsafe`, self becomes `Unsafe`.
    ///  - If both self and other have a `Cost`, add the costs together. If the cost is greater
    ///    than 1, self becomes `Unsafe`.
    pub fn add(&mut self, other: &CostMapData) {
        use CostMapData::*;

        *self = match (*self, other) {
            (None, _) => None,
            (_, None) => None,
            (Unsafe, _) => Unsafe,
            (_, Unsafe) => Unsafe,
            (Cost(s), Cost(o)) => {
                let sum = s + o;
                if sum >= 1.0 {
                    Unsafe
                } else {
                    Cost(sum)
                }
            }
        }
    }

    /// Adds other to self, mutating self.
    ///
    /// Follows these rules:
    ///  - If either self or other is `None`, self becomes `None`.
    ///  - If either self or other is `Unsafe`, self becomes `Unsafe`.
    ///  - If both self and other have a `Cost`, add the costs together without saturating to
    ///    `Unsafe`.
    pub fn add_without_max(&mut self, other: &CostMapData) {
        use CostMapData::*;

        *self = match (*self, other) {
            (None, _) => None,
            (_, None) => None,
            (Unsafe, _) => Unsafe,
            (_, Unsafe) => Unsafe,
            (Cost(s), Cost(o)) => Cost(s + o),
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use map_manager::{Point, Zone};

    use super::*;

    fn test_params() -> CostMapParams {
        CostMapParams {
            occ_unsafe_threshold: 90,
            occ_cost_factor: 0.5,
            inflation_radius_m: 0.0,
            slow_down_zone_cost: 0.3,
        }
    }

    fn test_doc() -> MapDoc {
        MapDoc::new("test", 1.0, 10, 10)
    }

    fn free_grid() -> OccupancyGrid {
        OccupancyGrid::from_cells(10, 10, vec![0; 100]).unwrap()
    }

    #[test]
    fn test_cost_map_data_add() {
        let mut cost = CostMapData::Cost(0.5);
        cost.add(&CostMapData::Cost(0.3));
        assert_eq!(cost, CostMapData::Cost(0.8));

        // Saturates to unsafe at 1
        cost.add(&CostMapData::Cost(0.3));
        assert_eq!(cost, CostMapData::Unsafe);

        // Unsafe dominates cost
        let mut cost = CostMapData::Unsafe;
        cost.add(&CostMapData::Cost(0.1));
        assert_eq!(cost, CostMapData::Unsafe);

        // None absorbs everything, even unsafe
        let mut cost = CostMapData::Unsafe;
        cost.add(&CostMapData::None);
        assert_eq!(cost, CostMapData::None);
    }

    #[test]
    fn test_occupancy_conversion() {
        let mut grid = free_grid();
        grid.set(2, 2, 95).unwrap();
        grid.set(3, 3, 40).unwrap();
        grid.set(4, 4, 255).unwrap();

        let cost_map = CostMap::from_map(test_params(), &test_doc(), &grid).unwrap();

        assert_eq!(
            cost_map.get(&CostMapLayer::Occupancy, &Vector2::new(2, 2)).unwrap(),
            CostMapData::Unsafe
        );
        assert_eq!(
            cost_map.get(&CostMapLayer::Occupancy, &Vector2::new(3, 3)).unwrap(),
            CostMapData::Cost(0.2)
        );
        assert_eq!(
            cost_map.get(&CostMapLayer::Occupancy, &Vector2::new(4, 4)).unwrap(),
            CostMapData::None
        );
        assert_eq!(
            cost_map.get(&CostMapLayer::Total, &Vector2::new(4, 4)).unwrap(),
            CostMapData::None
        );
    }

    #[test]
    fn test_inflation() {
        let mut grid = free_grid();
        grid.set(5, 5, 100).unwrap();

        let mut params = test_params();
        params.inflation_radius_m = 1.0;

        let cost_map = CostMap::from_map(params, &test_doc(), &grid).unwrap();

        // Direct neighbours of the obstacle are now unsafe too
        assert_eq!(
            cost_map.get(&CostMapLayer::Occupancy, &Vector2::new(4, 5)).unwrap(),
            CostMapData::Unsafe
        );
        assert_eq!(
            cost_map.get(&CostMapLayer::Occupancy, &Vector2::new(5, 6)).unwrap(),
            CostMapData::Unsafe
        );
        // Cells outside the radius are untouched
        assert_eq!(
            cost_map.get(&CostMapLayer::Occupancy, &Vector2::new(2, 5)).unwrap(),
            CostMapData::Cost(0.0)
        );
    }

    #[test]
    fn test_zones() {
        let mut doc = test_doc();
        doc.zones.push(Zone {
            name: "keep_out".into(),
            zone_type: ZoneType::KeepOut,
            polygon: vec![
                Point { x: 0.0, y: 0.0, z: 0.0 },
                Point { x: 3.0, y: 0.0, z: 0.0 },
                Point { x: 3.0, y: 3.0, z: 0.0 },
                Point { x: 0.0, y: 3.0, z: 0.0 },
            ],
        });
        doc.zones.push(Zone {
            name: "slow".into(),
            zone_type: ZoneType::SlowDown,
            polygon: vec![
                Point { x: 6.0, y: 6.0, z: 0.0 },
                Point { x: 9.0, y: 6.0, z: 0.0 },
                Point { x: 9.0, y: 9.0, z: 0.0 },
                Point { x: 6.0, y: 9.0, z: 0.0 },
            ],
        });

        let cost_map = CostMap::from_map(test_params(), &doc, &free_grid()).unwrap();

        assert_eq!(
            cost_map.get(&CostMapLayer::Total, &Vector2::new(1, 1)).unwrap(),
            CostMapData::Unsafe
        );
        assert_eq!(
            cost_map.get(&CostMapLayer::Total, &Vector2::new(7, 7)).unwrap(),
            CostMapData::Cost(0.3)
        );
        assert_eq!(
            cost_map.get(&CostMapLayer::Total, &Vector2::new(4, 4)).unwrap(),
            CostMapData::Cost(0.0)
        );
    }

    #[test]
    fn test_path_cost_unsafe() {
        let mut grid = free_grid();
        for y in 0..10 {
            grid.set(5, y, 100).unwrap();
        }

        let cost_map = CostMap::from_map(test_params(), &test_doc(), &grid).unwrap();

        // A path crossing the wall of obstacles is unsafe
        let path = Path {
            points_m: vec![Vector2::new(1.5, 5.5), Vector2::new(8.5, 5.5)],
        };
        assert_eq!(cost_map.get_path_cost(&path).unwrap(), CostMapData::Unsafe);

        // A path staying on the near side is fine
        let path = Path {
            points_m: vec![Vector2::new(1.5, 1.5), Vector2::new(3.5, 8.5)],
        };
        assert!(matches!(
            cost_map.get_path_cost(&path).unwrap(),
            CostMapData::Cost(_)
        ));
    }
}
