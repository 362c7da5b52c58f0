//! Path queries: search, smoothing and resampling.
//!
//! [`find_path`] runs the A* planner over a [`NavMeshGraph`] and smooths the
//! resulting corridor with the funnel algorithm. Failures that callers are
//! expected to handle as "no path" are grouped by [`PathError::is_no_path`].

#![forbid(unsafe_code)]

use crate::core::algorithms::astar::{PathPlanner, PlannerOptions};
use crate::core::algorithms::funnel::FunnelSmoother;
use crate::core::navmesh::NavMeshGraph;
use crate::geometry::point::Point;
use thiserror::Error;

/// Default spacing used by [`points_along_path`], one default tile.
pub const DEFAULT_GRANULARITY: f64 = 40.0;

/// Errors returned by path queries.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum PathError {
    /// The start or goal point is not inside any triangle.
    #[error("point {point} is outside the navigation mesh")]
    PointOutsideMesh {
        /// The offending point.
        point: Point,
    },
    /// The search exhausted every reachable triangle.
    #[error("no path found after expanding {expanded} triangles")]
    NoPathFound {
        /// Number of triangles expanded.
        expanded: usize,
    },
    /// The expansion budget ran out before reaching the goal.
    #[error("search budget of {limit} expansions exceeded")]
    SearchBudgetExceeded {
        /// The configured budget.
        limit: usize,
    },
    /// Two consecutive corridor triangles do not share a side.
    #[error("corridor is broken at triangle {index}")]
    BrokenCorridor {
        /// Position of the offending triangle in the corridor.
        index: usize,
    },
}

impl PathError {
    /// Returns `true` for the recoverable outcomes that mean "no path": an end
    /// point outside the mesh, an exhausted search or an exhausted budget.
    #[must_use]
    pub const fn is_no_path(&self) -> bool {
        matches!(
            self,
            Self::PointOutsideMesh { .. }
                | Self::NoPathFound { .. }
                | Self::SearchBudgetExceeded { .. }
        )
    }
}

/// Finds a smoothed path from `start` to `goal`.
///
/// The returned path starts at `start` and ends at `goal`.
///
/// # Errors
///
/// Any [`PathError`]; see [`PathError::is_no_path`].
///
/// # Examples
///
/// ```rust
/// use navmesh::core::algorithms::astar::PlannerOptions;
/// use navmesh::core::navmesh::{NavMesh, NavMeshOptions};
/// use navmesh::core::path::find_path;
/// use navmesh::core::tile::TileGrid;
/// use navmesh::geometry::point::Point;
///
/// let grid = TileGrid::parse("#######\n#.....#\n#.###.#\n#.....#\n#######", 40).unwrap();
/// let nav = NavMesh::build_enclosing(&grid, NavMeshOptions::default()).unwrap();
///
/// let path = find_path(
///     nav.graph(),
///     Point::new(60.0, 60.0),
///     Point::new(220.0, 140.0),
///     &PlannerOptions::default(),
/// )
/// .unwrap();
/// assert_eq!(path.first(), Some(&Point::new(60.0, 60.0)));
/// assert_eq!(path.last(), Some(&Point::new(220.0, 140.0)));
/// ```
pub fn find_path(
    graph: NavMeshGraph<'_>,
    start: Point,
    goal: Point,
    options: &PlannerOptions,
) -> Result<Vec<Point>, PathError> {
    let corridor = PathPlanner::new(graph, *options).search(start, goal)?;
    let path =
        FunnelSmoother::new(options.clearance).smooth_polypoints(graph, &corridor.polypoints)?;
    tracing::debug!(
        %start,
        %goal,
        expanded = corridor.expanded,
        triangles = corridor.polypoints.len(),
        corners = path.len().saturating_sub(2),
        "found path"
    );
    Ok(path)
}

/// Resamples `path` with points roughly `granularity` apart.
///
/// Each segment contributes its start point followed by evenly spaced points,
/// one per whole `granularity` of its length; the final point is appended
/// last. Paths with fewer than two points, or a non-positive granularity, are
/// returned unchanged.
///
/// # Examples
///
/// ```rust
/// use navmesh::core::path::points_along_path;
/// use navmesh::geometry::point::Point;
///
/// let path = [Point::new(0.0, 0.0), Point::new(100.0, 0.0)];
/// let points = points_along_path(&path, 40.0);
/// assert_eq!(
///     points,
///     vec![Point::new(0.0, 0.0), Point::new(50.0, 0.0), Point::new(100.0, 0.0)]
/// );
/// ```
#[must_use]
pub fn points_along_path(path: &[Point], granularity: f64) -> Vec<Point> {
    if path.len() < 2 || granularity.is_nan() || granularity <= 0.0 {
        return path.to_vec();
    }
    let mut out = Vec::new();
    for pair in path.windows(2) {
        let (from, to) = (pair[0], pair[1]);
        let increments = (from.distance(&to) / granularity).floor();
        out.push(from);
        #[allow(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            reason = "floor of a finite non-negative ratio"
        )]
        let steps = increments as usize;
        for step in 1..steps {
            #[allow(clippy::cast_precision_loss, reason = "step counts are small")]
            let t = step as f64 / increments;
            out.push(Point::new(
                (to.x() - from.x()).mul_add(t, from.x()),
                (to.y() - from.y()).mul_add(t, from.y()),
            ));
        }
    }
    if let Some(&last) = path.last() {
        out.push(last);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::navmesh::{NavMesh, NavMeshOptions};
    use crate::core::tile::TileGrid;
    use approx::assert_relative_eq;

    fn p(x: f64, y: f64) -> Point {
        Point::new(x, y)
    }

    #[test]
    fn no_path_family() {
        assert!(PathError::PointOutsideMesh { point: p(0.0, 0.0) }.is_no_path());
        assert!(PathError::NoPathFound { expanded: 3 }.is_no_path());
        assert!(PathError::SearchBudgetExceeded { limit: 3 }.is_no_path());
        assert!(!PathError::BrokenCorridor { index: 1 }.is_no_path());
        assert_eq!(
            PathError::NoPathFound { expanded: 3 }.to_string(),
            "no path found after expanding 3 triangles"
        );
    }

    #[test]
    fn resampling_spacing() {
        let path = [p(0.0, 0.0), p(120.0, 0.0), p(120.0, 30.0)];
        let points = points_along_path(&path, 40.0);
        assert_eq!(
            points,
            vec![p(0.0, 0.0), p(40.0, 0.0), p(80.0, 0.0), p(120.0, 0.0), p(120.0, 30.0)]
        );
        assert_eq!(points_along_path(&path[..1], 40.0), vec![p(0.0, 0.0)]);
        assert_eq!(points_along_path(&path, 0.0), path.to_vec());
    }

    #[test]
    fn path_around_block_stays_in_mesh() {
        let grid = TileGrid::parse(
            "\
#######
#.....#
#.###.#
#.....#
#######",
            40,
        )
        .unwrap();
        let nav = NavMesh::build_enclosing(&grid, NavMeshOptions::default()).unwrap();
        let options = PlannerOptions::default().with_clearance(5.0);
        let path = find_path(nav.graph(), p(60.0, 100.0), p(220.0, 100.0), &options).unwrap();
        assert_eq!(path[0], p(60.0, 100.0));
        assert_eq!(path[path.len() - 1], p(220.0, 100.0));
        assert!(path.len() >= 4, "{path:?}");
        for point in &path {
            assert!(nav.graph().triangle_containing(point, None).is_some(), "{point}");
            let tile = grid.tile_at(point).unwrap();
            assert!(grid.is_traversable(tile.0, tile.1), "{point} in wall");
        }
        let length: f64 = path.windows(2).map(|w| w[0].distance(&w[1])).sum();
        assert!(length > 160.0);
        let nearest = path[1]
            .distance(&p(80.0, 80.0))
            .min(path[1].distance(&p(80.0, 120.0)));
        assert_relative_eq!(nearest, 5.0, epsilon = 1e-9);
    }

    #[test]
    fn agent_against_a_wall_finds_a_path() {
        let grid = TileGrid::parse("#######\n#.....#\n#.###.#\n#.....#\n#######", 40).unwrap();
        let nav = NavMesh::build_enclosing(&grid, NavMeshOptions::default()).unwrap();
        let options = PlannerOptions::default().with_clearance(0.0);
        for start in [p(140.0, 120.0), p(200.0, 100.0), p(160.0, 120.0)] {
            let path = find_path(nav.graph(), start, p(60.0, 60.0), &options).unwrap();
            assert_eq!(path[0], start);
            assert_eq!(path[path.len() - 1], p(60.0, 60.0));
        }
    }
}
