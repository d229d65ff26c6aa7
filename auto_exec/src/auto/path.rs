//! # Path
//!
//! This module defines the path type used by the autonomy system, and the
//! conversions into it from telecommanded path specifications and stored map
//! routes.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use map_manager::MapDoc;
use nalgebra::Vector2;
use nav_if::tc::drive::PathSpec;
use serde::{Deserialize, Serialize};

use super::loc::Pose;

// ------------------------------------------------------------------------------------------------
// DATA STRUCTURES
// ------------------------------------------------------------------------------------------------

/// A path defining the desired trajectory of the platform.
#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct Path {
    pub points_m: Vec<Vector2<f64>>,
}

/// A segment between two path points.
///
/// Segments are defined backwards, from the target point to the one before
/// it, so the first segment of a path targets point index 1.
#[derive(Default, Serialize, Deserialize)]
pub struct PathSegment {
    /// The target of the segment
    pub target_m: Vector2<f64>,

    /// The start point of the segment
    pub start_m: Vector2<f64>,

    /// The length of the segment
    pub length_m: f64,

    /// The heading (angle to the +ve x axis) of the segment
    pub heading_rad: f64,

    /// Unit vector pointing in the direction of the segment
    pub direction: Vector2<f64>,
}

/// A sequence of reduced (curv only) Ackermann manouvres which describes a path.
///
/// The first element is the curvature in 1/meters, the second the distance in meters.
#[derive(Clone, Serialize, Deserialize)]
pub struct AckSequence {
    seq: Vec<(f64, f64)>,
    point_sep_m: f64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum PathError {
    #[error("The PathSpec is invalid")]
    InvalidPathSpec,

    #[error("Attempted to create a path from an empty sequence")]
    EmptySequence,

    #[error("No route named '{0}' in the map")]
    UnknownRoute(String),

    #[error("Route '{0}' has fewer than 2 waypoints")]
    DegenerateRoute(String),
}

// ------------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// ------------------------------------------------------------------------------------------------

impl Path {
    /// Create a new empty path
    pub fn new_empty() -> Self {
        Path {
            points_m: Vec::new(),
        }
    }

    /// Produces a direct path between the two position vectors, with each point in the path having
    /// at most the given separation.
    pub fn direct(from: Vector2<f64>, to: Vector2<f64>, point_sep_m: f64) -> Self {
        let dist_m = (to - from).norm();

        // Two points is enough if they're already within the separation
        if dist_m <= point_sep_m {
            return Path {
                points_m: vec![from, to],
            };
        }

        // Number of whole separation-length steps which fit in the distance. Flooring keeps every
        // step at most the separation, the remainder is covered by finishing on the target.
        let num_steps = (dist_m / point_sep_m).floor() as usize;
        let step = (to - from) * (point_sep_m / dist_m);

        let mut points_m: Vec<Vector2<f64>> =
            (0..num_steps).map(|i| from + step * (i as f64)).collect();
        points_m.push(to);

        Path { points_m }
    }

    /// Convert a telecommanded [`PathSpec`] into a new path.
    ///
    /// Ackermann sequences are expanded from the given pose, routes are resolved against the
    /// loaded map and sampled at the given separation.
    pub fn from_spec(
        spec: &PathSpec,
        pose: &Pose,
        map: &MapDoc,
        route_point_sep_m: f64,
    ) -> Result<Self, PathError> {
        match spec {
            PathSpec::AckSeq { .. } => AckSequence::from_spec(spec)?.into_path(pose),
            PathSpec::Route { name } => Self::from_route(map, name, route_point_sep_m),
        }
    }

    /// Build a path along the named route of the given map.
    pub fn from_route(
        map: &MapDoc,
        route_name: &str,
        point_sep_m: f64,
    ) -> Result<Self, PathError> {
        let waypoints = map
            .resolve_route(route_name)
            .ok_or_else(|| PathError::UnknownRoute(route_name.to_owned()))?;

        if waypoints.len() < 2 {
            return Err(PathError::DegenerateRoute(route_name.to_owned()));
        }

        // Chain direct paths between successive waypoints, dropping the duplicated joint points
        let mut path = Path::new_empty();
        for pair in waypoints.windows(2) {
            let leg = Path::direct(
                Vector2::new(pair[0].0, pair[0].1),
                Vector2::new(pair[1].0, pair[1].1),
                point_sep_m,
            );

            let skip = if path.is_empty() { 0 } else { 1 };
            path.points_m.extend(leg.points_m.into_iter().skip(skip));
        }

        Ok(path)
    }

    /// Returns the path segment connecting the target point and the previous
    /// point.
    ///
    /// If no segment exists (the target is the first point in the sequence or
    /// is beyond the end of the sequence) then `None` will be returned
    pub fn get_segment_to_target(&self, target_index: usize) -> Option<PathSegment> {
        if self.points_m.len() < 2 {
            return None;
        }

        if target_index == 0 || target_index >= self.points_m.len() {
            return None;
        }

        let start_m = self.points_m[target_index - 1];
        let target_m = self.points_m[target_index];

        let delta = target_m - start_m;
        let length_m = delta.norm();

        Some(PathSegment {
            target_m,
            start_m,
            length_m,
            heading_rad: delta.y.atan2(delta.x),
            direction: delta / length_m,
        })
    }

    /// Return the length of the path in meters.
    ///
    /// If the path is empty (not enough points) then `None` is returned.
    pub fn get_length(&self) -> Option<f64> {
        if self.points_m.len() < 2 {
            return None;
        }

        Some(
            self.points_m
                .windows(2)
                .map(|w| (w[1] - w[0]).norm())
                .sum(),
        )
    }

    /// Get the number of points in the path
    pub fn get_num_points(&self) -> usize {
        self.points_m.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points_m.is_empty()
    }
}

impl AckSequence {
    /// Convert this sequence into a standard [`Path`].
    pub fn into_path(self, start_pose: &Pose) -> Result<Path, PathError> {
        if self.seq.is_empty() {
            return Err(PathError::EmptySequence);
        }

        let mut points_m: Vec<Vector2<f64>> = Vec::new();

        // Each arc starts where the previous one ended, with the heading of the last segment. The
        // very first starts from the commanded pose.
        let mut arc_start = start_pose.position2();
        let mut head_rad = start_pose.get_heading();

        for (curv_m, dist_m) in self.seq {
            // Sample the arc every point_sep_m along its length, always including both endpoints
            let num_steps = (dist_m / self.point_sep_m).ceil() as usize;

            for i in 0..=num_steps {
                let s_m = (i as f64 * self.point_sep_m).min(dist_m);

                // An arc of curvature k traversed for a distance s ends at
                //     x0 + (sin(h + ks) - sin(h)) / k
                //     y0 - (cos(h + ks) - cos(h)) / k
                // which degenerates to a straight line as k tends to zero.
                let point = if curv_m.abs() <= f64::EPSILON {
                    arc_start + Vector2::new(s_m * head_rad.cos(), s_m * head_rad.sin())
                } else {
                    let swept_rad = head_rad + curv_m * s_m;
                    arc_start
                        + Vector2::new(
                            (swept_rad.sin() - head_rad.sin()) / curv_m,
                            -(swept_rad.cos() - head_rad.cos()) / curv_m,
                        )
                };

                // Points closer than half the separation to the previous one are dropped, which
                // removes the duplicates where one arc ends and the next begins
                let keep = match points_m.last() {
                    Some(last) => (point - last).norm() >= 0.5 * self.point_sep_m,
                    None => true,
                };

                if keep {
                    points_m.push(point);
                }
            }

            // Next arc continues from the end of this one
            head_rad += curv_m * dist_m;
            arc_start = match points_m.last() {
                Some(p) => *p,
                None => arc_start,
            };
        }

        Ok(Path { points_m })
    }

    /// Build a sequence of (curvature, distance) pairs from the raw spec.
    pub fn from_spec(path_spec: &PathSpec) -> Result<Self, PathError> {
        match path_spec {
            PathSpec::AckSeq { seq, separation_m } => {
                if seq.len() % 2 != 0 || seq.is_empty() {
                    Err(PathError::InvalidPathSpec)
                } else {
                    Ok(Self {
                        seq: seq.chunks(2).map(|p| (p[0], p[1])).collect(),
                        point_sep_m: *separation_m,
                    })
                }
            }
            _ => Err(PathError::InvalidPathSpec),
        }
    }

    /// Build a single arc sequence directly.
    pub fn single_arc(curv_m: f64, dist_m: f64, point_sep_m: f64) -> Self {
        Self {
            seq: vec![(curv_m, dist_m)],
            point_sep_m,
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use map_manager::{Node, Route};
    use std::f64::consts::PI;

    use super::*;

    #[test]
    fn test_direct_path() {
        let path = Path::direct(Vector2::new(0.0, 0.0), Vector2::new(1.0, 0.0), 0.1);

        assert!(path.get_num_points() >= 10);
        assert_eq!(*path.points_m.last().unwrap(), Vector2::new(1.0, 0.0));

        // All segments are no longer than the separation (with a little float slack)
        for i in 1..path.get_num_points() {
            assert!(path.get_segment_to_target(i).unwrap().length_m <= 0.1 + 1e-9);
        }
    }

    #[test]
    fn test_ack_seq() {
        let ack_seq = AckSequence {
            seq: vec![(1.0, 1.57), (0.5, 2.0), (0.0, 1.0)],
            point_sep_m: 0.05,
        };

        let path = ack_seq
            .into_path(&Pose::from_heading(0.0, 0.0, PI))
            .unwrap();

        assert!(path.get_num_points() > 2);

        // Total length roughly matches the sum of the arc distances
        let length = path.get_length().unwrap();
        assert!((length - 4.57).abs() < 0.2);
    }

    #[test]
    fn test_straight_ack_seq() {
        let ack_seq = AckSequence::single_arc(0.0, 2.0, 0.1);

        let path = ack_seq.into_path(&Pose::from_heading(0.0, 0.0, 0.0)).unwrap();

        // Path is along +x
        let last = path.points_m.last().unwrap();
        assert!((last.x - 2.0).abs() < 0.11);
        assert!(last.y.abs() < 1e-9);
    }

    #[test]
    fn test_route_path() {
        let mut map = MapDoc::new("test", 0.1, 100, 100);
        map.nodes = vec![
            Node {
                id: "a".into(),
                x: 0.0,
                y: 0.0,
            },
            Node {
                id: "b".into(),
                x: 2.0,
                y: 0.0,
            },
            Node {
                id: "c".into(),
                x: 2.0,
                y: 2.0,
            },
        ];
        map.routes = vec![Route {
            name: "tour".into(),
            nodes: vec!["a".into(), "b".into(), "c".into()],
        }];

        let path = Path::from_route(&map, "tour", 0.5).unwrap();

        assert_eq!(path.points_m[0], Vector2::new(0.0, 0.0));
        assert_eq!(*path.points_m.last().unwrap(), Vector2::new(2.0, 2.0));
        assert!((path.get_length().unwrap() - 4.0).abs() < 1e-9);

        assert!(matches!(
            Path::from_route(&map, "nope", 0.5),
            Err(PathError::UnknownRoute(_))
        ));
    }
}
