//! Map generation tool.
//!
//! Generates a random occupancy map using Perlin noise and inserts it into a map store, along
//! with a set of demonstration zones, nodes and routes. Useful for exercising the drive manager
//! without a real mapping pipeline.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

// External
use color_eyre::{eyre::WrapErr, Report};
use noise::{NoiseFn, Perlin, Seedable};
use std::path::PathBuf;
use structopt::StructOpt;

// Internal
use map_manager::{MapDoc, MapStore, Node, OccupancyGrid, Point, Route, Zone, ZoneType};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Noise values above this threshold become occupied cells.
const OCCUPIED_THRESHOLD: f64 = 0.55;

/// Noise values above this threshold (but below occupied) become unknown cells.
const UNKNOWN_THRESHOLD: f64 = 0.50;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Generate a random occupancy map and insert it into a map store.
#[derive(Debug, StructOpt)]
#[structopt(name = "map_gen")]
struct Opt {
    /// Root directory of the map store.
    #[structopt(parse(from_os_str))]
    store_root: PathBuf,

    /// Name of the map to create.
    map_name: String,

    /// Width of the map in cells.
    #[structopt(long, default_value = "200")]
    width: usize,

    /// Height of the map in cells.
    #[structopt(long, default_value = "200")]
    height: usize,

    /// Size of one cell in meters.
    #[structopt(long, default_value = "0.1")]
    resolution_m: f64,

    /// Scale of the noise field, larger values give smaller features.
    #[structopt(long, default_value = "0.05")]
    noise_scale: f64,

    /// Seed for the noise generator.
    #[structopt(long, default_value = "0")]
    seed: u32,

    /// Overwrite the map if it already exists in the store.
    #[structopt(long)]
    overwrite: bool,
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn main() -> Result<(), Report> {
    color_eyre::install()?;

    let opt = Opt::from_args();

    let store = MapStore::open(&opt.store_root).wrap_err("Failed to open the map store")?;

    // ---- GRID GENERATION ----

    let perlin = Perlin::new().set_seed(opt.seed);

    let mut cells = Vec::with_capacity(opt.width * opt.height);

    for y in 0..opt.height {
        for x in 0..opt.width {
            let value = perlin.get([x as f64 * opt.noise_scale, y as f64 * opt.noise_scale]);

            // Map from [-1, 1] into [0, 1] before thresholding
            let value = 0.5 * (value + 1.0);

            if value > OCCUPIED_THRESHOLD {
                cells.push(100u8);
            } else if value > UNKNOWN_THRESHOLD {
                cells.push(255u8);
            } else {
                cells.push(0u8);
            }
        }
    }

    let grid = OccupancyGrid::from_cells(opt.width, opt.height, cells)
        .wrap_err("Failed to build the occupancy grid")?;

    // ---- DOCUMENT GENERATION ----

    let mut doc = MapDoc::new(&opt.map_name, opt.resolution_m, opt.width, opt.height);
    doc.description = format!("Randomly generated map (seed {})", opt.seed);
    doc.default_zone = ZoneType::Open;

    // Metric extent of the map, used to place the demonstration annotations
    let extent_x_m = opt.width as f64 * opt.resolution_m;
    let extent_y_m = opt.height as f64 * opt.resolution_m;

    doc.zones = vec![
        Zone {
            name: "keep_out_corner".into(),
            zone_type: ZoneType::KeepOut,
            polygon: rect(0.0, 0.0, 0.2 * extent_x_m, 0.2 * extent_y_m),
        },
        Zone {
            name: "slow_down_centre".into(),
            zone_type: ZoneType::SlowDown,
            polygon: rect(
                0.4 * extent_x_m,
                0.4 * extent_y_m,
                0.6 * extent_x_m,
                0.6 * extent_y_m,
            ),
        },
    ];

    doc.nodes = vec![
        node("start", 0.3 * extent_x_m, 0.3 * extent_y_m),
        node("mid", 0.5 * extent_x_m, 0.7 * extent_y_m),
        node("end", 0.8 * extent_x_m, 0.8 * extent_y_m),
    ];

    doc.routes = vec![Route {
        name: "survey".into(),
        nodes: vec!["start".into(), "mid".into(), "end".into()],
    }];

    doc.validate().wrap_err("Generated map is invalid")?;

    // ---- STORE ----

    if store.exists(&opt.map_name) && opt.overwrite {
        store
            .update(&mut doc, &grid)
            .wrap_err("Failed to update the map")?;
        println!("Updated map \"{}\" in {:?}", opt.map_name, opt.store_root);
    } else {
        store
            .insert(&mut doc, &grid)
            .wrap_err("Failed to insert the map")?;
        println!("Inserted map \"{}\" into {:?}", opt.map_name, opt.store_root);
    }

    Ok(())
}

/// Build an axis aligned rectangle polygon from its min and max corners.
fn rect(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Vec<Point> {
    vec![
        point(min_x, min_y),
        point(max_x, min_y),
        point(max_x, max_y),
        point(min_x, max_y),
    ]
}

fn point(x: f64, y: f64) -> Point {
    Point { x, y, z: 0.0 }
}

fn node(id: &str, x: f64, y: f64) -> Node {
    Node { id: id.into(), x, y }
}
