//! Funnel (string-pulling) path smoothing.
//!
//! The triangles of a search corridor are turned into a sequence of
//! [`Portal`]s, each seen from the direction of travel with a left and a right
//! endpoint. [`string_pull`] sweeps a funnel from an apex through the portals:
//! a side narrows while its new endpoint stays inside the funnel, and when it
//! would cross the opposite side that side's endpoint becomes the next corner
//! of the path and the sweep restarts from it. The result is the shortest
//! polyline through the portals.
//!
//! [`get_clearance_point`] then pushes every interior corner away from the wall
//! it wraps around, along the bisector of the incoming and outgoing legs.
//!
//! # References
//! - D. Demyen, M. Buro (2006) - "Efficient Triangulation-Based Pathfinding"
//! - M. Mononen (2010) - "Simple Stupid Funnel Algorithm"

#![forbid(unsafe_code)]

use crate::core::algorithms::astar::Polypoint;
use crate::core::navmesh::NavMeshGraph;
use crate::core::path::PathError;
use crate::core::triangle::Triangle;
use crate::geometry::point::Point;
use crate::geometry::predicates::{Orientation, orientation};

/// A segment the path must cross, seen from the direction of travel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Portal {
    /// Left endpoint.
    pub left: Point,
    /// Right endpoint.
    pub right: Point,
}

impl Portal {
    /// Degenerate portal at a single point, used for the path ends.
    #[inline]
    #[must_use]
    pub const fn point(p: Point) -> Self {
        Self { left: p, right: p }
    }

    /// Portal across the side shared by `from` and `to`.
    ///
    /// Returns `None` if the triangles do not share a side.
    #[must_use]
    pub fn between(from: &Triangle, to: &Triangle) -> Option<Self> {
        let edge = from.shared_edge(to)?;
        let apex = from.opposite_vertex(edge)?;
        let (a, b) = edge.endpoints();
        Some(if orientation(&apex, &a, &b) == Orientation::POSITIVE {
            Self { left: b, right: a }
        } else {
            Self { left: a, right: b }
        })
    }
}

/// Builds the portal sequence of a triangle corridor from `start` to `goal`.
///
/// Consecutive copies of the same triangle contribute no portal.
///
/// # Errors
///
/// Returns [`PathError::BrokenCorridor`] if two consecutive triangles share no
/// side; `index` is the position of the second one.
pub fn corridor_portals(
    start: Point,
    goal: Point,
    corridor: &[Triangle],
) -> Result<Vec<Portal>, PathError> {
    let mut portals = Vec::with_capacity(corridor.len() + 1);
    portals.push(Portal::point(start));
    for (index, pair) in corridor.windows(2).enumerate() {
        if pair[0] == pair[1] {
            continue;
        }
        let portal = Portal::between(&pair[0], &pair[1])
            .ok_or(PathError::BrokenCorridor { index: index + 1 })?;
        portals.push(portal);
    }
    portals.push(Portal::point(goal));
    Ok(portals)
}

/// Shortest polyline through `portals`.
///
/// The first and last portals are expected to be the degenerate start and goal
/// portals. Consecutive duplicate corners are collapsed.
#[must_use]
pub fn string_pull(portals: &[Portal]) -> Vec<Point> {
    let Some(first) = portals.first() else {
        return Vec::new();
    };

    let mut apex = first.left;
    let (mut left, mut right) = (first.left, first.right);
    let (mut apex_index, mut left_index, mut right_index) = (0, 0, 0);
    let mut path = vec![apex];

    let mut i = 1;
    while i < portals.len() {
        let Portal {
            left: next_left,
            right: next_right,
        } = portals[i];

        // Right side.
        if orientation(&apex, &right, &next_right) != Orientation::NEGATIVE {
            if apex == right || orientation(&apex, &left, &next_right) == Orientation::NEGATIVE {
                right = next_right;
                right_index = i;
            } else {
                apex = left;
                apex_index = left_index;
                push_corner(&mut path, apex);
                (left, right) = (apex, apex);
                (left_index, right_index) = (apex_index, apex_index);
                i = apex_index + 1;
                continue;
            }
        }

        // Left side.
        if orientation(&apex, &left, &next_left) != Orientation::POSITIVE {
            if apex == left || orientation(&apex, &right, &next_left) == Orientation::POSITIVE {
                left = next_left;
                left_index = i;
            } else {
                apex = right;
                apex_index = right_index;
                push_corner(&mut path, apex);
                (left, right) = (apex, apex);
                (left_index, right_index) = (apex_index, apex_index);
                i = apex_index + 1;
                continue;
            }
        }

        i += 1;
    }

    if let Some(last) = portals.last() {
        push_corner(&mut path, last.left);
    }
    path
}

fn push_corner(path: &mut Vec<Point>, corner: Point) {
    if path.last() != Some(&corner) {
        path.push(corner);
    }
}

/// Moves `corner` by `clearance` away from the wall it wraps around.
///
/// The offset runs along the bisector of the directions towards `prev` and
/// `next`, pointing away from both. A corner whose legs are opposite (or of
/// zero length) is returned unchanged.
///
/// # Examples
///
/// ```rust
/// use approx::assert_relative_eq;
/// use navmesh::core::algorithms::funnel::get_clearance_point;
/// use navmesh::geometry::point::Point;
///
/// let moved = get_clearance_point(
///     Point::new(0.0, 0.0),
///     Point::new(0.0, -1.0),
///     Point::new(-1.0, 0.0),
///     2.0f64.sqrt(),
/// );
/// assert_relative_eq!(moved.x(), 1.0, epsilon = 1e-12);
/// assert_relative_eq!(moved.y(), 1.0, epsilon = 1e-12);
/// ```
#[must_use]
pub fn get_clearance_point(corner: Point, prev: Point, next: Point, clearance: f64) -> Point {
    let (ix, iy) = unit(corner, prev);
    let (ox, oy) = unit(corner, next);
    let (bx, by) = (-(ix + ox), -(iy + oy));
    let norm = bx.hypot(by);
    if norm <= f64::EPSILON {
        return corner;
    }
    corner.offset(bx / norm * clearance, by / norm * clearance)
}

fn unit(from: Point, to: Point) -> (f64, f64) {
    let (dx, dy) = (to.x() - from.x(), to.y() - from.y());
    let len = dx.hypot(dy);
    if len == 0.0 {
        (0.0, 0.0)
    } else {
        (dx / len, dy / len)
    }
}

// =============================================================================
// SMOOTHER
// =============================================================================

/// Turns a triangle corridor into a smoothed point path.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FunnelSmoother {
    clearance: f64,
}

impl FunnelSmoother {
    /// Creates a smoother that keeps corners `clearance` away from walls.
    #[must_use]
    pub const fn new(clearance: f64) -> Self {
        Self { clearance }
    }

    /// The corner clearance.
    #[must_use]
    pub const fn clearance(&self) -> f64 {
        self.clearance
    }

    /// Smooths the corridor `corridor` from `start` to `goal`.
    ///
    /// Corridors of at most two triangles produce `[start, goal]`.
    ///
    /// # Errors
    ///
    /// Returns [`PathError::BrokenCorridor`] if two consecutive triangles share
    /// no side.
    pub fn smooth(
        &self,
        start: Point,
        goal: Point,
        corridor: &[Triangle],
    ) -> Result<Vec<Point>, PathError> {
        if corridor.len() <= 2 {
            let mut path = vec![start];
            push_corner(&mut path, goal);
            return Ok(path);
        }
        let portals = corridor_portals(start, goal, corridor)?;
        let pulled = string_pull(&portals);
        tracing::trace!(
            portals = portals.len(),
            corners = pulled.len().saturating_sub(2),
            "pulled corridor"
        );
        Ok(self.apply_clearance(&pulled))
    }

    /// Smooths a waypoint chain produced by the planner.
    ///
    /// # Errors
    ///
    /// - [`PathError::BrokenCorridor`] if a waypoint's triangle is missing from
    ///   the mesh or does not touch its predecessor
    pub fn smooth_polypoints(
        &self,
        graph: NavMeshGraph<'_>,
        polypoints: &[Polypoint],
    ) -> Result<Vec<Point>, PathError> {
        let (Some(first), Some(last)) = (polypoints.first(), polypoints.last()) else {
            return Ok(Vec::new());
        };
        let corridor = polypoints
            .iter()
            .enumerate()
            .map(|(index, polypoint)| {
                graph
                    .triangle(polypoint.triangle)
                    .copied()
                    .ok_or(PathError::BrokenCorridor { index })
            })
            .collect::<Result<Vec<_>, _>>()?;
        self.smooth(first.point, last.point, &corridor)
    }

    /// Offsets every interior corner of `path` by the clearance.
    ///
    /// Offsets are computed from the unmodified neighbours.
    #[must_use]
    pub fn apply_clearance(&self, path: &[Point]) -> Vec<Point> {
        if self.clearance == 0.0 || path.len() < 3 {
            return path.to_vec();
        }
        let mut out = Vec::with_capacity(path.len());
        out.push(path[0]);
        out.extend(
            path.windows(3)
                .map(|w| get_clearance_point(w[1], w[0], w[2], self.clearance)),
        );
        out.push(path[path.len() - 1]);
        out
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn p(x: f64, y: f64) -> Point {
        Point::new(x, y)
    }

    fn tri(a: (f64, f64), b: (f64, f64), c: (f64, f64)) -> Triangle {
        Triangle::new(a.into(), b.into(), c.into()).unwrap()
    }

    #[test]
    fn portal_sides_follow_travel_direction() {
        // Travel from the lower triangle into the upper one, in +y.
        let from = tri((0.0, 0.0), (10.0, 0.0), (5.0, -10.0));
        let to = tri((0.0, 0.0), (10.0, 0.0), (5.0, 10.0));
        let portal = Portal::between(&from, &to).unwrap();
        // With +y up, facing +y puts smaller x on the left.
        assert_eq!(portal, Portal { left: p(0.0, 0.0), right: p(10.0, 0.0) });
        let back = Portal::between(&to, &from).unwrap();
        assert_eq!(back, Portal { left: p(10.0, 0.0), right: p(0.0, 0.0) });
        assert!(Portal::between(&from, &tri((50.0, 50.0), (60.0, 50.0), (55.0, 60.0))).is_none());
    }

    #[test]
    fn straight_corridor_has_no_corners() {
        let corridor = [
            tri((0.0, 0.0), (10.0, 0.0), (0.0, 10.0)),
            tri((10.0, 0.0), (10.0, 10.0), (0.0, 10.0)),
            tri((10.0, 0.0), (20.0, 0.0), (10.0, 10.0)),
        ];
        let portals = corridor_portals(p(2.0, 2.0), p(15.0, 2.0), &corridor).unwrap();
        assert_eq!(portals.len(), 4);
        assert_eq!(string_pull(&portals), vec![p(2.0, 2.0), p(15.0, 2.0)]);
    }

    #[test]
    fn corner_is_kept_and_pushed_out() {
        // An L-shaped strip bending around (10, 10).
        let corridor = [
            tri((0.0, 0.0), (10.0, 0.0), (0.0, 10.0)),
            tri((10.0, 0.0), (10.0, 10.0), (0.0, 10.0)),
            tri((0.0, 10.0), (10.0, 10.0), (0.0, 20.0)),
            tri((10.0, 10.0), (10.0, 20.0), (0.0, 20.0)),
            tri((10.0, 10.0), (20.0, 10.0), (10.0, 20.0)),
        ];
        let start = p(8.0, 1.0);
        let goal = p(18.0, 12.0);
        let pulled = string_pull(&corridor_portals(start, goal, &corridor).unwrap());
        assert_eq!(pulled.len(), 3, "{pulled:?}");
        assert_eq!(pulled[1], p(10.0, 10.0));

        let smoothed = FunnelSmoother::new(1.0).smooth(start, goal, &corridor).unwrap();
        assert_eq!(smoothed.first(), Some(&start));
        assert_eq!(smoothed.last(), Some(&goal));
        assert_relative_eq!(smoothed[1].distance(&p(10.0, 10.0)), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn short_corridors_are_direct() {
        let a = tri((0.0, 0.0), (10.0, 0.0), (0.0, 10.0));
        let b = tri((10.0, 0.0), (10.0, 10.0), (0.0, 10.0));
        let smoother = FunnelSmoother::new(5.0);
        assert_eq!(
            smoother.smooth(p(1.0, 1.0), p(2.0, 2.0), &[a]).unwrap(),
            vec![p(1.0, 1.0), p(2.0, 2.0)]
        );
        assert_eq!(smoother.smooth(p(1.0, 1.0), p(9.0, 9.0), &[a, b]).unwrap(), vec![p(1.0, 1.0), p(9.0, 9.0)]);
        assert_eq!(smoother.smooth(p(1.0, 1.0), p(1.0, 1.0), &[a]).unwrap(), vec![p(1.0, 1.0)]);
    }

    #[test]
    fn broken_corridor_is_reported() {
        let a = tri((0.0, 0.0), (10.0, 0.0), (0.0, 10.0));
        let b = tri((10.0, 0.0), (10.0, 10.0), (0.0, 10.0));
        let far = tri((50.0, 50.0), (60.0, 50.0), (55.0, 60.0));
        assert_eq!(
            corridor_portals(p(1.0, 1.0), p(55.0, 55.0), &[a, b, far]),
            Err(PathError::BrokenCorridor { index: 2 })
        );
    }

    #[test]
    fn clearance_with_degenerate_legs() {
        let corner = p(5.0, 5.0);
        assert_eq!(get_clearance_point(corner, p(0.0, 5.0), p(10.0, 5.0), 3.0), corner);
        assert_eq!(get_clearance_point(corner, corner, corner, 3.0), corner);
        let smoother = FunnelSmoother::new(0.0);
        let path = vec![p(0.0, 0.0), p(5.0, 5.0), p(10.0, 0.0)];
        assert_eq!(smoother.apply_clearance(&path), path);
    }

    #[test]
    fn empty_input() {
        assert!(string_pull(&[]).is_empty());
        assert_eq!(string_pull(&[Portal::point(p(1.0, 2.0))]), vec![p(1.0, 2.0)]);
    }
}
