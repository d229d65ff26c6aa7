//! # Map documents
//!
//! The document model for a stored map: geometry primitives, annotations and
//! the top level [`MapDoc`].

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use chrono::{DateTime, Utc};
use nalgebra::{Quaternion as NaQuaternion, UnitQuaternion};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A point in the map frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// An orientation in the map frame.
///
/// Always normalised when stored through [`MapDoc::prepare_for_save`], so a
/// document read back from the store contains unit quaternions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quaternion {
    pub w: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// A pose (position and orientation) in the map frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Pose {
    pub position: Point,
    pub orientation: Quaternion,
}

/// A named pose annotation, for example a docking point or charging station.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Marker {
    pub name: String,

    pub marker_type: i32,

    pub pose: Pose,
}

/// A typed polygon annotation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Zone {
    pub name: String,

    pub zone_type: ZoneType,

    /// The polygon's vertices. The polygon is implicitly closed between the
    /// last and first vertex.
    pub polygon: Vec<Point>,
}

/// A vertex of the waypoint graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: String,

    pub x: f64,
    pub y: f64,
}

/// A named sequence of waypoint nodes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Route {
    pub name: String,

    /// Ids of the nodes making up the route, in traversal order. Every id
    /// must exist in the owning map's node list.
    pub nodes: Vec<String>,
}

/// The top level map document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapDoc {
    /// Unique name of the map, doubles as its store key.
    pub name: String,

    pub description: String,

    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,

    /// Size of one occupancy grid cell in meters.
    pub resolution_m: f64,

    /// Number of occupancy grid cells in the x axis.
    pub width: usize,

    /// Number of occupancy grid cells in the y axis.
    pub height: usize,

    /// Pose of the grid's (0, 0) cell corner in the map frame.
    pub origin: Pose,

    /// The zone type assumed outside all zone polygons.
    pub default_zone: ZoneType,

    pub markers: Vec<Marker>,
    pub zones: Vec<Zone>,
    pub nodes: Vec<Node>,
    pub routes: Vec<Route>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Behavioural classification of a zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ZoneType {
    /// Free navigation.
    Open,

    /// The platform must not plan paths through this zone.
    KeepOut,

    /// Navigation is allowed but incurs extra cost.
    SlowDown,
}

/// Errors raised when validating a map document.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Route '{0}' references node '{1}' which does not exist in the map")]
    DanglingNodeId(String, String),

    #[error("Zone '{0}' has fewer than 3 polygon vertices")]
    DegenerateZone(String),

    #[error("Map has zero size ({0}x{1} cells)")]
    ZeroSize(usize, usize),

    #[error("Map resolution must be positive, got {0}")]
    NonPositiveResolution(f64),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for Quaternion {
    fn default() -> Self {
        Self {
            w: 1.0,
            x: 0.0,
            y: 0.0,
            z: 0.0,
        }
    }
}

impl Quaternion {
    /// Return the normalised version of this quaternion.
    pub fn normalised(&self) -> Self {
        let q = UnitQuaternion::from_quaternion(NaQuaternion::new(
            self.w, self.x, self.y, self.z,
        ));

        Self {
            w: q.w,
            x: q.i,
            y: q.j,
            z: q.k,
        }
    }

    /// Get the rotation about the Z axis (yaw) in radians.
    pub fn yaw(&self) -> f64 {
        let q = UnitQuaternion::from_quaternion(NaQuaternion::new(
            self.w, self.x, self.y, self.z,
        ));
        q.euler_angles().2
    }
}

impl Zone {
    /// Test if the given position is inside the zone's polygon.
    ///
    /// Uses the even-odd ray casting rule. Points exactly on an edge may fall
    /// on either side.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        let poly = &self.polygon;
        if poly.len() < 3 {
            return false;
        }

        let mut inside = false;
        let mut j = poly.len() - 1;

        for i in 0..poly.len() {
            let (xi, yi) = (poly[i].x, poly[i].y);
            let (xj, yj) = (poly[j].x, poly[j].y);

            if ((yi > y) != (yj > y)) && (x < (xj - xi) * (y - yi) / (yj - yi) + xi) {
                inside = !inside;
            }

            j = i;
        }

        inside
    }
}

impl MapDoc {
    /// Create a new empty map document with the given grid geometry.
    pub fn new(name: &str, resolution_m: f64, width: usize, height: usize) -> Self {
        let now = Utc::now();

        Self {
            name: name.into(),
            description: String::new(),
            created: now,
            modified: now,
            resolution_m,
            width,
            height,
            origin: Pose::default(),
            default_zone: ZoneType::Open,
            markers: Vec::new(),
            zones: Vec::new(),
            nodes: Vec::new(),
            routes: Vec::new(),
        }
    }

    /// Validate the document's internal consistency.
    pub fn validate(&self) -> Result<(), DocumentError> {
        if self.width == 0 || self.height == 0 {
            return Err(DocumentError::ZeroSize(self.width, self.height));
        }

        if self.resolution_m <= 0.0 {
            return Err(DocumentError::NonPositiveResolution(self.resolution_m));
        }

        for zone in &self.zones {
            if zone.polygon.len() < 3 {
                return Err(DocumentError::DegenerateZone(zone.name.clone()));
            }
        }

        // Every node id referenced by a route must exist
        for route in &self.routes {
            for node_id in &route.nodes {
                if !self.nodes.iter().any(|n| &n.id == node_id) {
                    return Err(DocumentError::DanglingNodeId(
                        route.name.clone(),
                        node_id.clone(),
                    ));
                }
            }
        }

        Ok(())
    }

    /// Refresh the modified stamp and normalise all quaternions, as done
    /// before every save.
    pub fn prepare_for_save(&mut self) {
        self.modified = Utc::now();

        self.origin.orientation = self.origin.orientation.normalised();
        for marker in &mut self.markers {
            marker.pose.orientation = marker.pose.orientation.normalised();
        }
    }

    /// Look up a node by id.
    pub fn get_node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Look up a route by name.
    pub fn get_route(&self, name: &str) -> Option<&Route> {
        self.routes.iter().find(|r| r.name == name)
    }

    /// Resolve a named route into the metric point sequence of its nodes.
    ///
    /// Returns `None` if the route doesn't exist or references a node that
    /// doesn't exist.
    pub fn resolve_route(&self, name: &str) -> Option<Vec<(f64, f64)>> {
        let route = self.get_route(name)?;

        route
            .nodes
            .iter()
            .map(|id| self.get_node(id).map(|n| (n.x, n.y)))
            .collect()
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn test_map() -> MapDoc {
        let mut map = MapDoc::new("test", 0.1, 100, 100);

        map.nodes = vec![
            Node {
                id: "a".into(),
                x: 0.0,
                y: 0.0,
            },
            Node {
                id: "b".into(),
                x: 5.0,
                y: 0.0,
            },
        ];
        map.routes = vec![Route {
            name: "ab".into(),
            nodes: vec!["a".into(), "b".into()],
        }];

        map
    }

    #[test]
    fn test_quaternion_normalised() {
        let q = Quaternion {
            w: 2.0,
            x: 0.0,
            y: 0.0,
            z: 0.0,
        };
        let n = q.normalised();

        assert!((n.w - 1.0).abs() < 1e-12);
        assert!(n.x.abs() < 1e-12);
    }

    #[test]
    fn test_zone_contains() {
        let zone = Zone {
            name: "square".into(),
            zone_type: ZoneType::KeepOut,
            polygon: vec![
                Point {
                    x: 0.0,
                    y: 0.0,
                    z: 0.0,
                },
                Point {
                    x: 2.0,
                    y: 0.0,
                    z: 0.0,
                },
                Point {
                    x: 2.0,
                    y: 2.0,
                    z: 0.0,
                },
                Point {
                    x: 0.0,
                    y: 2.0,
                    z: 0.0,
                },
            ],
        };

        assert!(zone.contains(1.0, 1.0));
        assert!(!zone.contains(3.0, 1.0));
        assert!(!zone.contains(-0.1, -0.1));
    }

    #[test]
    fn test_route_resolution() {
        let map = test_map();

        let points = map.resolve_route("ab").unwrap();
        assert_eq!(points.len(), 2);
        assert!((points[1].0 - 5.0).abs() < f64::EPSILON);

        assert!(map.resolve_route("nope").is_none());
    }

    #[test]
    fn test_validate_dangling_node() {
        let mut map = test_map();
        map.routes[0].nodes.push("ghost".into());

        assert!(matches!(
            map.validate(),
            Err(DocumentError::DanglingNodeId(_, _))
        ));
    }

    #[test]
    fn test_validate_degenerate_zone() {
        let mut map = test_map();
        map.zones.push(Zone {
            name: "line".into(),
            zone_type: ZoneType::SlowDown,
            polygon: vec![
                Point::default(),
                Point {
                    x: 1.0,
                    y: 0.0,
                    z: 0.0,
                },
            ],
        });

        assert!(matches!(
            map.validate(),
            Err(DocumentError::DegenerateZone(_))
        ));
    }
}
