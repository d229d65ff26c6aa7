//! Plans minimum cost paths through a [`CostMap`], using an A* algorithm over fans of short
//! Ackermann arcs.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::collections::{BinaryHeap, HashMap};

use log::{info, warn};
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

use crate::auto::{
    map::{CostMap, CostMapData},
    path::{AckSequence, Path, PathError},
};

use super::{NavError, NavPose};

// -----------------------------------------------------------------------------------------------
// STRUCTS
// -----------------------------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct PathPlanner {
    params: PathPlannerParams,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PathPlannerParams {
    /// Candidate arc curvatures for each fan, in 1/meters.
    pub test_curvs_m: Vec<f64>,

    /// Candidate offsets from the current heading for each fan, in radians.
    pub test_heads_rad: Vec<f64>,

    /// Separation between consecutive points of a candidate path.
    pub path_point_separation_m: f64,

    /// Heuristic weight on the estimated remaining cost to the target.
    pub heuristic_remaining_cost_weight: f64,

    /// Heuristic weight on the alignment error to the target.
    pub heuristic_alignment_cost_weight: f64,

    /// A path ending within this distance of the target counts as arrived.
    pub target_tolerance_m: f64,

    /// Upper bound on the length of a single path leg
    pub max_path_length_m: f64,

    /// Lower bound on the length of a single path leg
    pub min_path_length_m: f64,

    /// Maximum number of nodes to explore before giving up and returning the best fit.
    pub max_num_nodes: usize,
}

#[derive(Debug, Serialize, Clone)]
pub struct PathPlannerReport {
    pub num_tested_paths: usize,

    pub target: NavPose,

    pub result: Option<Vec<Path>>,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct PathCost {
    pub raw_cost: f64,
    pub heuristic: f64,
}

/// An A* node
#[derive(Debug, Clone, Serialize)]
pub struct Node {
    pub id: usize,
    pub parent_id: usize,

    /// The number of parent paths this node has
    pub depth: usize,

    pub path: Path,

    pub cost: PathCost,
}

// -----------------------------------------------------------------------------------------------
// IMPLS
// -----------------------------------------------------------------------------------------------

impl PathPlanner {
    pub fn new(params: PathPlannerParams) -> Self {
        Self { params }
    }

    /// Plans a minimum cost path towards the target position using at most `num_paths` legs.
    ///
    /// The leg length is derived from the straight-line distance to the target, so this suits
    /// targets the platform can drive more or less straight at. For cluttered maps
    /// [`PathPlanner::plan_indirect`] places no limit on the number of legs.
    pub fn plan_direct(
        &self,
        cost_map: &CostMap,
        start_pose: &NavPose,
        target_pose: &NavPose,
        num_paths: usize,
    ) -> Result<Vec<Path>, NavError> {
        let total_dist_m = (target_pose.position_m - start_pose.position_m).norm();

        let path_length_m = total_dist_m / (num_paths as f64);

        self.plan(
            cost_map,
            start_pose,
            target_pose,
            path_length_m,
            Some(num_paths),
        )
    }

    /// Plans a minimum cost path towards the target position, producing a variable number of
    /// paths of the given length.
    pub fn plan_indirect(
        &self,
        cost_map: &CostMap,
        start_pose: &NavPose,
        target_pose: &NavPose,
        path_length_m: f64,
    ) -> Result<Vec<Path>, NavError> {
        self.plan(cost_map, start_pose, target_pose, path_length_m, None)
    }

    /// Internal planning function, independent of direct/indirect route.
    fn plan(
        &self,
        cost_map: &CostMap,
        start_pose: &NavPose,
        target_pose: &NavPose,
        path_length_m: f64,
        num_paths: Option<usize>,
    ) -> Result<Vec<Path>, NavError> {
        // Refuse to plan from or to a position off the map
        if !cost_map.position_in_map(&start_pose.position_m) {
            return Err(NavError::PointOutsideMap(
                "planner start pose".into(),
                start_pose.position_m,
            ));
        }
        if !cost_map.position_in_map(&target_pose.position_m) {
            return Err(NavError::PointOutsideMap(
                "planner target pose".into(),
                target_pose.position_m,
            ));
        }

        // The report is filled in as the search runs and saved at the end
        let mut report = PathPlannerReport {
            num_tested_paths: 0,
            target: *target_pose,
            result: None,
        };

        // Open set ordered by total cost, and the closed set of expanded nodes. Node ids start
        // at 1, id 0 is the virtual start node which never enters the heap.
        let mut heap = BinaryHeap::new();
        let mut visited: HashMap<usize, Node> = HashMap::new();
        let mut num_nodes = 1;

        // Set to the id of the node that reached the target, if any
        let mut target_node_id: Option<usize> = None;

        let path_length_m =
            path_length_m.clamp(self.params.min_path_length_m, self.params.max_path_length_m);

        // Seed the heap with the fan leaving the start pose
        for (path, cost) in
            self.traversable_fan(cost_map, start_pose, target_pose, path_length_m, None)?
        {
            heap.push(Node {
                id: num_nodes,
                parent_id: 0,
                depth: 0,
                path,
                cost,
            });

            report.num_tested_paths += 1;
            num_nodes += 1;
        }

        // Main loop
        while target_node_id.is_none() {
            // Stop expanding once the node budget is spent, the best fit will be returned
            if num_nodes > self.params.max_num_nodes {
                warn!(
                    "Planner node budget ({}) spent before reaching the target",
                    self.params.max_num_nodes
                );
                break;
            }

            // An empty heap means every candidate has been exhausted
            let min_node = match heap.pop() {
                Some(n) => n,
                None => break,
            };

            // A node ending within tolerance of the target finishes the search. It goes into
            // visited so the walk-back below can find it.
            let dist_to_target = (min_node.path.points_m[min_node.path.get_num_points() - 1]
                - target_pose.position_m)
                .norm();

            if dist_to_target <= self.params.target_tolerance_m {
                target_node_id = Some(min_node.id);
                visited.insert(min_node.id, min_node);
                break;
            }

            // Extend the node with a new fan, unless a leg limit is set and this node is already
            // at the last leg.
            let extend_path = num_paths.map(|n| min_node.depth < n - 1).unwrap_or(true);

            if extend_path {
                let path_end_pose =
                    NavPose::from_path_last_point(&min_node.path).ok_or(NavError::EmptyPath)?;

                for (path, cost) in self.traversable_fan(
                    cost_map,
                    &path_end_pose,
                    target_pose,
                    path_length_m,
                    Some(&min_node.cost),
                )? {
                    heap.push(Node {
                        id: num_nodes,
                        parent_id: min_node.id,
                        depth: min_node.depth + 1,
                        path,
                        cost,
                    });

                    report.num_tested_paths += 1;
                    num_nodes += 1;
                }
            }

            // The expanded node joins the closed set
            visited.insert(min_node.id, min_node);
        }

        // Work backwards from the best node to get the paths. If the target was reached that
        // node is the best one, otherwise it's the visited node with the lowest total cost.
        let mut best_node = match target_node_id {
            Some(id) => visited
                .get(&id)
                .expect("Target node must be in the visited map"),
            None => match visited.values().min_by(|a, b| {
                a.cost
                    .total()
                    .partial_cmp(&b.cost.total())
                    .expect("Unexpected NaN path cost")
            }) {
                Some(n) => n,
                None => return Err(NavError::NoPathToTarget),
            },
        };

        let mut paths = vec![best_node.path.clone()];

        while best_node.parent_id != 0 {
            best_node = match visited.get(&best_node.parent_id) {
                Some(n) => n,
                None => unreachable!("Parent node missing from the visited map"),
            };

            paths.push(best_node.path.clone());
        }

        // The walk-back produced target-to-start order
        paths.reverse();

        report.result = Some(paths.clone());
        util::session::save_with_timestamp("path_planner/report.json", report);

        if target_node_id.is_none() {
            warn!("Target not reached within tolerance, returning the best fit");
            Err(NavError::BestPathNotAtTarget(paths))
        } else {
            info!("Planner reached the target");
            Ok(paths)
        }
    }

    /// Build the fan from `from_pose` and cost each path, dropping untraversable ones.
    fn traversable_fan(
        &self,
        cost_map: &CostMap,
        from_pose: &NavPose,
        target_pose: &NavPose,
        path_length_m: f64,
        parent_cost: Option<&PathCost>,
    ) -> Result<Vec<(Path, PathCost)>, NavError> {
        let mut candidates = Vec::new();

        for path in self
            .get_path_fan(from_pose, path_length_m)
            .map_err(NavError::CouldNotBuildFan)?
        {
            if let Some(cost) = self.get_path_cost(cost_map, &path, target_pose, parent_cost) {
                candidates.push((path, cost));
            }
        }

        Ok(candidates)
    }

    /// Build the fan of candidate paths leaving the given pose, one single-arc path per
    /// (heading offset, curvature) pair in the params.
    fn get_path_fan(
        &self,
        start_pose: &NavPose,
        path_length_m: f64,
    ) -> Result<Vec<Path>, PathError> {
        let mut fan =
            Vec::with_capacity(self.params.test_heads_rad.len() * self.params.test_curvs_m.len());

        for &head_rad in &self.params.test_heads_rad {
            let pose =
                NavPose::new(start_pose.position_m, start_pose.heading_rad + head_rad).to_pose();

            for &curv_m in &self.params.test_curvs_m {
                let seq = AckSequence::single_arc(
                    curv_m,
                    path_length_m,
                    self.params.path_point_separation_m,
                );

                fan.push(seq.into_path(&pose)?);
            }
        }

        Ok(fan)
    }

    /// Cost the given path towards the target pose, `None` if it isn't traversable.
    fn get_path_cost(
        &self,
        cost_map: &CostMap,
        path: &Path,
        target_pose: &NavPose,
        parent_cost: Option<&PathCost>,
    ) -> Option<PathCost> {
        // Anything other than a concrete cost means the path is untraversable
        let mut raw_cost = match cost_map.get_path_cost(path) {
            Ok(CostMapData::Cost(c)) => c,
            _ => return None,
        };

        let last_pose = NavPose::from_path_last_point(path)?;

        if !cost_map.position_in_map(&last_pose.position_m) {
            return None;
        }

        let heuristic = self.get_heuristic(
            cost_map,
            &path.points_m[0],
            &last_pose,
            target_pose,
            raw_cost / path.get_length()?,
        );

        // Raw costs accumulate down the tree
        if let Some(parent) = parent_cost {
            raw_cost += parent.raw_cost;
        }

        Some(PathCost {
            raw_cost,
            heuristic,
        })
    }

    /// Calculates the heuristic for a path ending at `end_pose`, aiming to move from
    /// `start_position` to `target_pose`.
    ///
    /// The base of the heuristic is the cost of a straight line from the path end to the target.
    /// When that line crosses untraversable terrain it is estimated instead as the given average
    /// cost per meter times the remaining distance. The base is then scaled by a weighted sum of
    /// one (the remaining cost term) and the alignment error, which maps the cosine between the
    /// end-to-target and start-to-target directions onto 0 (aligned) to 2 (anti-aligned). Scaling
    /// rather than adding keeps the two terms at the same order of magnitude.
    fn get_heuristic(
        &self,
        cost_map: &CostMap,
        start_position: &Vector2<f64>,
        end_pose: &NavPose,
        target_pose: &NavPose,
        avg_cost_per_m: f64,
    ) -> f64 {
        let dist_to_target_m = (target_pose.position_m - end_pose.position_m).norm();

        let remaining_path_cost = match cost_map
            .get_cost_between_points(end_pose.position_m, target_pose.position_m)
        {
            Ok(CostMapData::Cost(c)) => c,
            _ => avg_cost_per_m * dist_to_target_m,
        };

        let target_vec: Vector2<f64> = target_pose.position_m - *start_position;
        let last_vec: Vector2<f64> = target_pose.position_m - end_pose.position_m;

        let alignment_cost =
            1.0 - (last_vec.dot(&target_vec) / (target_vec.norm() * last_vec.norm()));

        remaining_path_cost
            * (self.params.heuristic_remaining_cost_weight
                + self.params.heuristic_alignment_cost_weight * alignment_cost)
    }
}

impl PathCost {
    pub fn total(&self) -> f64 {
        self.raw_cost + self.heuristic
    }
}

impl PartialEq for PathCost {
    fn eq(&self, other: &Self) -> bool {
        self.total().eq(&other.total())
    }
}

impl Eq for PathCost {}

impl Ord for PathCost {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.partial_cmp(other).expect("Unexpected NaN path cost")
    }
}

impl PartialOrd for PathCost {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        // Reversed so that BinaryHeap, a max-heap, pops the lowest total cost first
        other.total().partial_cmp(&self.total())
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Node {}

impl Ord for Node {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.cost.cmp(&other.cost)
    }
}

impl PartialOrd for Node {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        self.cost.partial_cmp(&other.cost)
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use map_manager::{MapDoc, OccupancyGrid};

    use crate::auto::map::CostMapParams;

    use super::*;

    fn test_planner() -> PathPlanner {
        PathPlanner::new(PathPlannerParams {
            test_curvs_m: vec![-0.5, -0.25, 0.0, 0.25, 0.5],
            test_heads_rad: vec![-0.4, 0.0, 0.4],
            path_point_separation_m: 0.1,
            heuristic_remaining_cost_weight: 1.0,
            heuristic_alignment_cost_weight: 0.5,
            target_tolerance_m: 0.5,
            max_path_length_m: 3.0,
            min_path_length_m: 1.0,
            max_num_nodes: 5000,
        })
    }

    fn open_cost_map(obstacle_column: Option<usize>) -> CostMap {
        let doc = MapDoc::new("planner_test", 0.25, 80, 80);

        let mut cells = vec![0u8; 80 * 80];
        if let Some(col) = obstacle_column {
            // A wall with a gap near the top edge
            for y in 0..70 {
                cells[y * 80 + col] = 100;
            }
        }
        let grid = OccupancyGrid::from_cells(80, 80, cells).unwrap();

        CostMap::from_map(
            CostMapParams {
                occ_unsafe_threshold: 90,
                occ_cost_factor: 0.5,
                inflation_radius_m: 0.0,
                slow_down_zone_cost: 0.3,
            },
            &doc,
            &grid,
        )
        .unwrap()
    }

    #[test]
    fn test_plan_open_map() {
        let planner = test_planner();
        let cost_map = open_cost_map(None);

        let start = NavPose::new(Vector2::new(3.0, 10.0), 0.0);
        let target = NavPose::new(Vector2::new(15.0, 10.0), 0.0);

        let paths = planner.plan_indirect(&cost_map, &start, &target, 2.0).unwrap();

        assert!(!paths.is_empty());

        // The final path ends within tolerance of the target
        let end = paths.last().unwrap().points_m.last().unwrap();
        assert!((end - target.position_m).norm() <= 0.5 + 1e-9);
    }

    #[test]
    fn test_plan_direct_limits_num_paths() {
        let planner = test_planner();
        let cost_map = open_cost_map(None);

        let start = NavPose::new(Vector2::new(3.0, 10.0), 0.0);
        let target = NavPose::new(Vector2::new(9.0, 10.0), 0.0);

        let paths = planner.plan_direct(&cost_map, &start, &target, 3).unwrap();

        assert!(!paths.is_empty());
        assert!(paths.len() <= 3);

        let end = paths.last().unwrap().points_m.last().unwrap();
        assert!((end - target.position_m).norm() <= 0.5 + 1e-9);
    }

    #[test]
    fn test_plan_start_outside_map() {
        let planner = test_planner();
        let cost_map = open_cost_map(None);

        let start = NavPose::new(Vector2::new(-5.0, 10.0), 0.0);
        let target = NavPose::new(Vector2::new(15.0, 10.0), 0.0);

        assert!(matches!(
            planner.plan_indirect(&cost_map, &start, &target, 2.0),
            Err(NavError::PointOutsideMap(_, _))
        ));
    }

    #[test]
    fn test_plan_blocked_map() {
        let planner = test_planner();

        // Fully occupied map, no candidate path is traversable
        let doc = MapDoc::new("blocked_test", 0.25, 80, 80);
        let grid = OccupancyGrid::from_cells(80, 80, vec![100u8; 80 * 80]).unwrap();
        let cost_map = CostMap::from_map(
            CostMapParams {
                occ_unsafe_threshold: 90,
                occ_cost_factor: 0.5,
                inflation_radius_m: 0.0,
                slow_down_zone_cost: 0.3,
            },
            &doc,
            &grid,
        )
        .unwrap();

        let start = NavPose::new(Vector2::new(5.0, 5.0), 0.0);
        let target = NavPose::new(Vector2::new(15.0, 5.0), 0.0);

        assert!(matches!(
            planner.plan_indirect(&cost_map, &start, &target, 2.0),
            Err(NavError::NoPathToTarget)
        ));
    }

    #[test]
    fn test_plan_avoids_wall() {
        let planner = test_planner();
        let cost_map = open_cost_map(Some(40));

        let start = NavPose::new(Vector2::new(5.0, 5.0), 0.0);
        let target = NavPose::new(Vector2::new(15.0, 5.0), 0.0);

        // Either the target is reached around the wall or a best fit is returned, but every
        // returned path must be traversable
        let paths = match planner.plan_indirect(&cost_map, &start, &target, 2.0) {
            Ok(p) => p,
            Err(NavError::BestPathNotAtTarget(p)) => p,
            Err(e) => panic!("Unexpected planner error: {}", e),
        };

        for path in &paths {
            assert!(matches!(
                cost_map.get_path_cost(path).unwrap(),
                CostMapData::Cost(_)
            ));
        }
    }
}
