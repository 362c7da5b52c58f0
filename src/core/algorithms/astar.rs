//! A* search over the triangle adjacency of a navigation mesh.
//!
//! Search nodes are [`PolypointState`]s: a waypoint in a triangle, reached from
//! a predecessor state. Moving into a neighbouring triangle places the waypoint
//! at the midpoint of the crossed portal, or at the goal point itself when the
//! neighbour is the goal triangle. Costs are Euclidean lengths between
//! consecutive waypoints and the heuristic is the straight-line distance to the
//! goal, which never overestimates on an unweighted planar mesh.
//!
//! States live in an arena indexed by position and refer to their predecessor
//! by index. The arena is dropped once the winning chain has been copied out.
//!
//! # Examples
//!
//! ```rust
//! use navmesh::core::algorithms::astar::{PathPlanner, PlannerOptions};
//! use navmesh::core::navmesh::{NavMesh, NavMeshOptions};
//! use navmesh::core::tile::TileGrid;
//! use navmesh::geometry::point::Point;
//!
//! let grid = TileGrid::parse("#######\n#.....#\n#.###.#\n#.....#\n#######", 40).unwrap();
//! let nav = NavMesh::build_enclosing(&grid, NavMeshOptions::default()).unwrap();
//!
//! let planner = PathPlanner::new(nav.graph(), PlannerOptions::default());
//! let corridor = planner.search(Point::new(60.0, 60.0), Point::new(220.0, 140.0)).unwrap();
//! assert_eq!(corridor.polypoints.first().unwrap().point, Point::new(60.0, 60.0));
//! assert_eq!(corridor.polypoints.last().unwrap().point, Point::new(220.0, 140.0));
//! ```

#![forbid(unsafe_code)]

use crate::core::collections::{FastHashMap, FastHashSet};
use crate::core::edge::EdgeKey;
use crate::core::navmesh::NavMeshGraph;
use crate::core::path::PathError;
use crate::core::triangle::TriangleKey;
use crate::geometry::point::Point;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Default distance kept between path corners and walls, in world units.
///
/// Half of the default tile size.
pub const DEFAULT_CLEARANCE: f64 = 20.0;

// =============================================================================
// OPTIONS
// =============================================================================

/// Options for path queries.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlannerOptions {
    /// Distance by which smoothed path corners are pushed away from walls.
    pub clearance: f64,
    /// Maximum number of triangles expanded before giving up. `None` means
    /// unbounded.
    pub max_expansions: Option<usize>,
}

impl Default for PlannerOptions {
    fn default() -> Self {
        Self {
            clearance: DEFAULT_CLEARANCE,
            max_expansions: None,
        }
    }
}

impl PlannerOptions {
    /// Sets the corner clearance.
    #[must_use]
    pub const fn with_clearance(mut self, clearance: f64) -> Self {
        self.clearance = clearance;
        self
    }

    /// Sets the expansion budget.
    #[must_use]
    pub const fn with_max_expansions(mut self, max_expansions: Option<usize>) -> Self {
        self.max_expansions = max_expansions;
        self
    }
}

// =============================================================================
// SEARCH STATE
// =============================================================================

/// A waypoint and the triangle it was reached in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Polypoint {
    /// Exact start or goal point, or the midpoint of the crossed portal.
    pub point: Point,
    /// Triangle the waypoint belongs to.
    pub triangle: TriangleKey,
    /// Portal crossed to enter `triangle`; `None` for the start.
    pub portal: Option<EdgeKey>,
}

/// A node of the search tree.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PolypointState {
    /// The waypoint.
    pub polypoint: Polypoint,
    /// Arena index of the predecessor.
    pub parent: Option<usize>,
    /// Path length from the start.
    pub g: f64,
    /// Straight-line distance to the goal.
    pub h: f64,
}

impl PolypointState {
    /// Estimated total length through this state.
    #[inline]
    #[must_use]
    pub fn f(&self) -> f64 {
        self.g + self.h
    }
}

/// Open-set entry; the heap pops the lowest `f`, then the lowest `h`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct OpenEntry {
    f: OrderedFloat<f64>,
    h: OrderedFloat<f64>,
    index: usize,
}

impl Ord for OpenEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .f
            .cmp(&self.f)
            .then_with(|| other.h.cmp(&self.h))
            .then_with(|| other.index.cmp(&self.index))
    }
}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Result of a successful search.
#[derive(Clone, Debug, PartialEq)]
pub struct Corridor {
    /// Waypoints from start to goal.
    pub polypoints: Vec<Polypoint>,
    /// Length of the waypoint polyline.
    pub cost: f64,
    /// Number of triangles expanded.
    pub expanded: usize,
}

impl Corridor {
    /// Triangle keys from start to goal.
    pub fn triangles(&self) -> impl Iterator<Item = TriangleKey> + '_ {
        self.polypoints.iter().map(|polypoint| polypoint.triangle)
    }
}

// =============================================================================
// PLANNER
// =============================================================================

/// A* planner over a [`NavMeshGraph`].
#[derive(Clone, Copy, Debug)]
pub struct PathPlanner<'a> {
    graph: NavMeshGraph<'a>,
    options: PlannerOptions,
}

impl<'a> PathPlanner<'a> {
    /// Creates a planner.
    #[must_use]
    pub const fn new(graph: NavMeshGraph<'a>, options: PlannerOptions) -> Self {
        Self { graph, options }
    }

    /// The searched graph.
    #[must_use]
    pub const fn graph(&self) -> NavMeshGraph<'a> {
        self.graph
    }

    /// The query options.
    #[must_use]
    pub const fn options(&self) -> PlannerOptions {
        self.options
    }

    /// Finds the cheapest waypoint chain from `start` to `goal`.
    ///
    /// # Errors
    ///
    /// - [`PathError::PointOutsideMesh`] if either point is in no triangle
    /// - [`PathError::NoPathFound`] if the open set empties first
    /// - [`PathError::SearchBudgetExceeded`] if the expansion budget runs out
    pub fn search(&self, start: Point, goal: Point) -> Result<Corridor, PathError> {
        // A point on a shared edge or vertex lies in several faces; all of them
        // are sources (or targets), so a point against a wall still reaches
        // the traversable side.
        let start_keys = self.graph.triangles_containing(&start);
        if start_keys.is_empty() {
            tracing::debug!(%start, "A* failed: start outside mesh");
            return Err(PathError::PointOutsideMesh { point: start });
        }
        let goal_keys = self.graph.triangles_containing(&goal);
        if goal_keys.is_empty() {
            tracing::debug!(%goal, "A* failed: goal outside mesh");
            return Err(PathError::PointOutsideMesh { point: goal });
        }

        let root = |triangle: TriangleKey| PolypointState {
            polypoint: Polypoint {
                point: start,
                triangle,
                portal: None,
            },
            parent: None,
            g: 0.0,
            h: start.distance(&goal),
        };

        if let Some(&shared) = start_keys.iter().find(|key| goal_keys.contains(key)) {
            let arena = [
                root(shared),
                PolypointState {
                    polypoint: Polypoint {
                        point: goal,
                        triangle: shared,
                        portal: None,
                    },
                    parent: Some(0),
                    g: start.distance(&goal),
                    h: 0.0,
                },
            ];
            return Ok(reconstruct(&arena, 1, 0));
        }

        let mut arena: Vec<PolypointState> = start_keys.iter().map(|&key| root(key)).collect();
        let mut open = BinaryHeap::new();
        let mut best_g: FastHashMap<TriangleKey, f64> = FastHashMap::default();
        let mut closed: FastHashSet<TriangleKey> = FastHashSet::default();
        for (index, state) in arena.iter().enumerate() {
            open.push(OpenEntry {
                f: OrderedFloat(state.f()),
                h: OrderedFloat(state.h),
                index,
            });
            best_g.insert(state.polypoint.triangle, 0.0);
        }
        let mut expanded = 0;

        while let Some(entry) = open.pop() {
            let state = arena[entry.index];
            let key = state.polypoint.triangle;
            if goal_keys.contains(&key) {
                tracing::trace!(expanded, cost = state.g, "A* reached goal triangle");
                return Ok(reconstruct(&arena, entry.index, expanded));
            }
            if !closed.insert(key) {
                continue;
            }
            if let Some(limit) = self.options.max_expansions.filter(|&limit| expanded >= limit) {
                tracing::debug!(limit, open = open.len(), "A* failed: expansion budget exhausted");
                return Err(PathError::SearchBudgetExceeded { limit });
            }
            expanded += 1;

            for (portal, neighbor) in self.graph.neighbors(key) {
                if closed.contains(&neighbor) {
                    continue;
                }
                let point = if goal_keys.contains(&neighbor) {
                    goal
                } else {
                    portal.midpoint()
                };
                let g = state.g + state.polypoint.point.distance(&point);
                if best_g.get(&neighbor).is_some_and(|&best| best <= g) {
                    continue;
                }
                best_g.insert(neighbor, g);

                let h = point.distance(&goal);
                arena.push(PolypointState {
                    polypoint: Polypoint {
                        point,
                        triangle: neighbor,
                        portal: Some(portal),
                    },
                    parent: Some(entry.index),
                    g,
                    h,
                });
                open.push(OpenEntry {
                    f: OrderedFloat(g + h),
                    h: OrderedFloat(h),
                    index: arena.len() - 1,
                });
            }
        }

        tracing::debug!(%start, %goal, expanded, "A* failed: open set exhausted");
        Err(PathError::NoPathFound { expanded })
    }
}

/// Walks parent indices from `goal_index` back to the root.
fn reconstruct(arena: &[PolypointState], goal_index: usize, expanded: usize) -> Corridor {
    let mut polypoints = Vec::new();
    let mut cursor = Some(goal_index);
    while let Some(index) = cursor {
        polypoints.push(arena[index].polypoint);
        cursor = arena[index].parent;
    }
    polypoints.reverse();
    Corridor {
        polypoints,
        cost: arena[goal_index].g,
        expanded,
    }
}

// =============================================================================
// TESTS
// =============================================================================
