//! # Map store
//!
//! Filesystem backed persistence for map documents and their occupancy
//! grids. Each map lives in its own directory under the store root:
//!
//! ```text
//! <root>/<map_name>/
//!     map.json    - the serialised MapDoc
//!     grid.png    - the occupancy grid
//!     thumb.png   - a downscaled preview of the grid
//! ```

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use thiserror::Error;

use crate::documents::{DocumentError, MapDoc};
use crate::grid::{GridError, OccupancyGrid};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

const DOC_FILE_NAME: &str = "map.json";
const GRID_FILE_NAME: &str = "grid.png";
const THUMB_FILE_NAME: &str = "thumb.png";

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A directory of stored maps, keyed by map name.
pub struct MapStore {
    root: PathBuf,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("No map named '{0}' in the store")]
    NoSuchMap(String),

    #[error("A map named '{0}' already exists in the store")]
    MapAlreadyExists(String),

    #[error("Map document failed validation: {0}")]
    InvalidDocument(#[from] DocumentError),

    #[error("Grid size {0}x{1} does not match the document's {2}x{3}")]
    GridSizeMismatch(usize, usize, usize, usize),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Could not (de)serialise the map document: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("Grid error: {0}")]
    GridError(#[from] GridError),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl MapStore {
    /// Open a store at the given root directory, creating it if needed.
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self, StoreError> {
        let root = root.as_ref().to_path_buf();

        fs::create_dir_all(&root)?;

        Ok(Self { root })
    }

    /// List the names of all maps in the store.
    pub fn list(&self) -> Result<Vec<String>, StoreError> {
        let mut names = Vec::new();

        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;

            // Only directories containing a document count as maps
            if entry.path().join(DOC_FILE_NAME).is_file() {
                if let Some(name) = entry.file_name().to_str() {
                    names.push(name.to_owned());
                }
            }
        }

        names.sort();

        Ok(names)
    }

    /// Check whether a map with the given name exists.
    pub fn exists(&self, name: &str) -> bool {
        self.map_dir(name).join(DOC_FILE_NAME).is_file()
    }

    /// Load a map's document and occupancy grid.
    pub fn get(&self, name: &str) -> Result<(MapDoc, OccupancyGrid), StoreError> {
        if !self.exists(name) {
            return Err(StoreError::NoSuchMap(name.to_owned()));
        }

        let dir = self.map_dir(name);

        let doc_json = fs::read_to_string(dir.join(DOC_FILE_NAME))?;
        let doc: MapDoc = serde_json::from_str(&doc_json)?;

        let grid = OccupancyGrid::load_png(dir.join(GRID_FILE_NAME))?;

        Ok((doc, grid))
    }

    /// Insert a new map into the store.
    ///
    /// Validates the document, checks the grid matches the document's
    /// dimentions, and writes the document, grid and thumbnail. Fails if a
    /// map with the same name already exists, use [`MapStore::update`] to
    /// overwrite.
    pub fn insert(&self, doc: &mut MapDoc, grid: &OccupancyGrid) -> Result<(), StoreError> {
        if self.exists(&doc.name) {
            return Err(StoreError::MapAlreadyExists(doc.name.clone()));
        }

        self.write(doc, grid)
    }

    /// Write a map into the store, overwriting any existing map with the
    /// same name.
    pub fn update(&self, doc: &mut MapDoc, grid: &OccupancyGrid) -> Result<(), StoreError> {
        self.write(doc, grid)
    }

    /// Delete a map from the store.
    pub fn delete(&self, name: &str) -> Result<(), StoreError> {
        if !self.exists(name) {
            return Err(StoreError::NoSuchMap(name.to_owned()));
        }

        fs::remove_dir_all(self.map_dir(name))?;

        debug!("Deleted map '{}' from the store", name);

        Ok(())
    }

    fn map_dir(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    fn write(&self, doc: &mut MapDoc, grid: &OccupancyGrid) -> Result<(), StoreError> {
        doc.validate()?;

        if grid.width() != doc.width || grid.height() != doc.height {
            return Err(StoreError::GridSizeMismatch(
                grid.width(),
                grid.height(),
                doc.width,
                doc.height,
            ));
        }

        doc.prepare_for_save();

        let dir = self.map_dir(&doc.name);
        fs::create_dir_all(&dir)?;

        grid.save_png(dir.join(GRID_FILE_NAME))?;
        grid.thumbnail()
            .save(dir.join(THUMB_FILE_NAME))
            .map_err(GridError::ImageError)?;

        // The document goes last since its presence is what makes the map visible to
        // `list` and `exists`, a map interrupted mid-write is never listed
        let doc_json = serde_json::to_string_pretty(doc)?;
        fs::write(dir.join(DOC_FILE_NAME), doc_json)?;

        debug!("Wrote map '{}' to the store", doc.name);

        Ok(())
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::OCC_OCCUPIED;

    fn temp_store(tag: &str) -> MapStore {
        let dir = std::env::temp_dir().join(format!(
            "map_store_test_{}_{}",
            tag,
            std::process::id()
        ));

        // Start from a clean directory in case of a previous failed run
        let _ = fs::remove_dir_all(&dir);

        MapStore::open(dir).unwrap()
    }

    fn test_map(name: &str) -> (MapDoc, OccupancyGrid) {
        let doc = MapDoc::new(name, 0.1, 16, 16);

        let mut grid = OccupancyGrid::new(16, 16);
        grid.set(3, 3, OCC_OCCUPIED).unwrap();

        (doc, grid)
    }

    #[test]
    fn test_insert_get_round_trip() {
        let store = temp_store("round_trip");
        let (mut doc, grid) = test_map("alpha");

        store.insert(&mut doc, &grid).unwrap();

        let (loaded_doc, loaded_grid) = store.get("alpha").unwrap();
        assert_eq!(loaded_doc.name, "alpha");
        assert_eq!(loaded_grid, grid);
    }

    #[test]
    fn test_insert_duplicate_rejected() {
        let store = temp_store("duplicate");
        let (mut doc, grid) = test_map("beta");

        store.insert(&mut doc, &grid).unwrap();

        assert!(matches!(
            store.insert(&mut doc, &grid),
            Err(StoreError::MapAlreadyExists(_))
        ));

        // But update is allowed
        store.update(&mut doc, &grid).unwrap();
    }

    #[test]
    fn test_grid_size_mismatch_rejected() {
        let store = temp_store("mismatch");
        let (mut doc, _) = test_map("gamma");
        let wrong_grid = OccupancyGrid::new(8, 8);

        assert!(matches!(
            store.insert(&mut doc, &wrong_grid),
            Err(StoreError::GridSizeMismatch(_, _, _, _))
        ));
    }

    #[test]
    fn test_list_and_delete() {
        let store = temp_store("list_delete");

        let (mut doc_a, grid_a) = test_map("aaa");
        let (mut doc_b, grid_b) = test_map("bbb");
        store.insert(&mut doc_a, &grid_a).unwrap();
        store.insert(&mut doc_b, &grid_b).unwrap();

        assert_eq!(store.list().unwrap(), vec!["aaa", "bbb"]);

        store.delete("aaa").unwrap();
        assert!(!store.exists("aaa"));
        assert_eq!(store.list().unwrap(), vec!["bbb"]);

        assert!(matches!(
            store.delete("aaa"),
            Err(StoreError::NoSuchMap(_))
        ));
    }
}
