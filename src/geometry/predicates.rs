//! Geometric predicates for planar triangulation.
//!
//! Every combinatorial decision the mesh makes (which side of an edge a vertex
//! lies on, whether an edge must be flipped) goes through [`orientation`] or
//! [`incircle`]. Both evaluate the determinant in `f64` first and accept the
//! sign when it exceeds a forward error bound (the "stage A" bounds from
//! Shewchuk's adaptive predicates). When the filter is inconclusive and all
//! inputs are integral, the determinant is recomputed exactly in `i128`.
//!
//! Mesh vertices are always integral (tile coordinates times an integral tile
//! size), so predicates on mesh vertices are exact. Query points (path start and
//! goal) may be fractional; for them the filtered floating-point sign is used.

#![forbid(unsafe_code)]

use crate::geometry::point::Point;

/// Relative error bound for the orientation determinant.
const ORIENTATION_ERROR_BOUND: f64 = 3.330_669_073_875_471_6e-16;

/// Relative error bound for the incircle determinant.
const INCIRCLE_ERROR_BOUND: f64 = 1.110_223_024_625_157_7e-15;

/// Largest magnitude for which the `i128` fallback cannot overflow.
const EXACT_COORDINATE_LIMIT: f64 = 16_777_216.0; // 2^24

/// Represents the orientation of an ordered point triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    /// Clockwise turn (negative determinant).
    NEGATIVE,
    /// The points are collinear.
    DEGENERATE,
    /// Counter-clockwise turn (positive determinant).
    POSITIVE,
}

impl std::fmt::Display for Orientation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NEGATIVE => write!(f, "NEGATIVE"),
            Self::DEGENERATE => write!(f, "DEGENERATE"),
            Self::POSITIVE => write!(f, "POSITIVE"),
        }
    }
}

/// Represents the position of a point relative to a circumcircle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InCircle {
    /// The point is outside the circumcircle
    OUTSIDE,
    /// The point is exactly on the circumcircle
    BOUNDARY,
    /// The point is strictly inside the circumcircle
    INSIDE,
}

impl std::fmt::Display for InCircle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OUTSIDE => write!(f, "OUTSIDE"),
            Self::BOUNDARY => write!(f, "BOUNDARY"),
            Self::INSIDE => write!(f, "INSIDE"),
        }
    }
}

#[inline]
#[allow(
    clippy::cast_possible_truncation,
    reason = "values are integral and bounded by 2^24"
)]
fn exact_coordinates(points: &[&Point]) -> Option<Vec<(i128, i128)>> {
    points
        .iter()
        .map(|p| {
            let fits = |v: f64| v.fract() == 0.0 && v.abs() <= EXACT_COORDINATE_LIMIT;
            (p.is_finite() && fits(p.x()) && fits(p.y()))
                .then(|| (p.x() as i128, p.y() as i128))
        })
        .collect()
}

/// Orientation of the triple `(a, b, c)`.
///
/// Returns [`Orientation::POSITIVE`] when `c` lies to the left of the directed
/// line `a -> b` in a y-up frame (a counter-clockwise turn), which is the same
/// as lying to the right of it on screen where y grows downward.
///
/// # Examples
///
/// ```rust
/// use navmesh::geometry::point::Point;
/// use navmesh::geometry::predicates::{Orientation, orientation};
///
/// let a = Point::new(0.0, 0.0);
/// let b = Point::new(40.0, 0.0);
/// assert_eq!(orientation(&a, &b, &Point::new(0.0, 40.0)), Orientation::POSITIVE);
/// assert_eq!(orientation(&a, &b, &Point::new(0.0, -40.0)), Orientation::NEGATIVE);
/// assert_eq!(orientation(&a, &b, &Point::new(80.0, 0.0)), Orientation::DEGENERATE);
/// ```
#[must_use]
pub fn orientation(a: &Point, b: &Point, c: &Point) -> Orientation {
    let det_left = (a.x() - c.x()) * (b.y() - c.y());
    let det_right = (a.y() - c.y()) * (b.x() - c.x());
    let det = det_left - det_right;
    let bound = ORIENTATION_ERROR_BOUND * (det_left.abs() + det_right.abs());

    if det > bound {
        return Orientation::POSITIVE;
    }
    if -det > bound {
        return Orientation::NEGATIVE;
    }

    let sign = exact_coordinates(&[a, b, c]).map_or_else(
        || if det > 0.0 { 1 } else if det < 0.0 { -1 } else { 0 },
        |exact| {
            let [(ax, ay), (bx, by), (cx, cy)] = [exact[0], exact[1], exact[2]];
            ((ax - cx) * (by - cy) - (ay - cy) * (bx - cx)).signum()
        },
    );
    match sign {
        1 => Orientation::POSITIVE,
        -1 => Orientation::NEGATIVE,
        _ => Orientation::DEGENERATE,
    }
}

/// Position of `d` relative to the circle through `a`, `b`, `c`.
///
/// The triple may be given in either winding; it is normalized internally. A
/// collinear triple has no finite circumcircle and reports every point as
/// [`InCircle::OUTSIDE`].
///
/// # Examples
///
/// ```rust
/// use navmesh::geometry::point::Point;
/// use navmesh::geometry::predicates::{InCircle, incircle};
///
/// let a = Point::new(0.0, 0.0);
/// let b = Point::new(40.0, 0.0);
/// let c = Point::new(0.0, 40.0);
/// assert_eq!(incircle(&a, &b, &c, &Point::new(10.0, 10.0)), InCircle::INSIDE);
/// assert_eq!(incircle(&a, &b, &c, &Point::new(40.0, 40.0)), InCircle::BOUNDARY);
/// assert_eq!(incircle(&c, &b, &a, &Point::new(90.0, 90.0)), InCircle::OUTSIDE);
/// ```
#[must_use]
pub fn incircle(a: &Point, b: &Point, c: &Point, d: &Point) -> InCircle {
    let (a, b) = match orientation(a, b, c) {
        Orientation::POSITIVE => (a, b),
        Orientation::NEGATIVE => (b, a),
        Orientation::DEGENERATE => return InCircle::OUTSIDE,
    };

    let (adx, ady) = (a.x() - d.x(), a.y() - d.y());
    let (bdx, bdy) = (b.x() - d.x(), b.y() - d.y());
    let (cdx, cdy) = (c.x() - d.x(), c.y() - d.y());

    let bdxcdy = bdx * cdy;
    let cdxbdy = cdx * bdy;
    let alift = adx.mul_add(adx, ady * ady);

    let cdxady = cdx * ady;
    let adxcdy = adx * cdy;
    let blift = bdx.mul_add(bdx, bdy * bdy);

    let adxbdy = adx * bdy;
    let bdxady = bdx * ady;
    let clift = cdx.mul_add(cdx, cdy * cdy);

    let det = alift * (bdxcdy - cdxbdy) + blift * (cdxady - adxcdy) + clift * (adxbdy - bdxady);
    let permanent = (bdxcdy.abs() + cdxbdy.abs()) * alift
        + (cdxady.abs() + adxcdy.abs()) * blift
        + (adxbdy.abs() + bdxady.abs()) * clift;
    let bound = INCIRCLE_ERROR_BOUND * permanent;

    if det > bound {
        return InCircle::INSIDE;
    }
    if -det > bound {
        return InCircle::OUTSIDE;
    }

    let sign = exact_coordinates(&[a, b, c, d]).map_or_else(
        || if det > 0.0 { 1 } else if det < 0.0 { -1 } else { 0 },
        |exact| {
            let (dx, dy) = exact[3];
            let [(adx, ady), (bdx, bdy), (cdx, cdy)] = [
                (exact[0].0 - dx, exact[0].1 - dy),
                (exact[1].0 - dx, exact[1].1 - dy),
                (exact[2].0 - dx, exact[2].1 - dy),
            ];
            let alift = adx * adx + ady * ady;
            let blift = bdx * bdx + bdy * bdy;
            let clift = cdx * cdx + cdy * cdy;
            (alift * (bdx * cdy - cdx * bdy) + blift * (cdx * ady - adx * cdy)
                + clift * (adx * bdy - bdx * ady))
                .signum()
        },
    );
    match sign {
        1 => InCircle::INSIDE,
        -1 => InCircle::OUTSIDE,
        _ => InCircle::BOUNDARY,
    }
}

/// Returns `true` if the three points lie on one line.
///
/// Uses cross-multiplied slopes around the middle point `p2` so no division is
/// performed; a vertical pair only matches another vertical pair.
///
/// # Examples
///
/// ```rust
/// use navmesh::geometry::point::Point;
/// use navmesh::geometry::predicates::three_points_in_line;
///
/// let p = |x, y| Point::new(x, y);
/// assert!(three_points_in_line(&p(0.0, 0.0), &p(40.0, 40.0), &p(80.0, 80.0)));
/// assert!(three_points_in_line(&p(40.0, 0.0), &p(40.0, 40.0), &p(40.0, 120.0)));
/// assert!(!three_points_in_line(&p(40.0, 0.0), &p(40.0, 40.0), &p(80.0, 40.0)));
/// ```
#[must_use]
pub fn three_points_in_line(p1: &Point, p2: &Point, p3: &Point) -> bool {
    let x1 = p2.x() - p1.x();
    let x2 = p2.x() - p3.x();
    let y1 = p2.y() - p1.y();
    let y2 = p2.y() - p3.y();
    if x1 == 0.0 || x2 == 0.0 {
        return x1 == x2;
    }
    y1 * x2 == y2 * x1
}

/// Returns `true` if `p` lies on the closed segment from `a` to `b`.
///
/// # Examples
///
/// ```rust
/// use navmesh::geometry::point::Point;
/// use navmesh::geometry::predicates::point_on_segment;
///
/// let a = Point::new(0.0, 0.0);
/// let b = Point::new(80.0, 40.0);
/// assert!(point_on_segment(&a, &b, &Point::new(40.0, 20.0)));
/// assert!(point_on_segment(&a, &b, &b));
/// assert!(!point_on_segment(&a, &b, &Point::new(120.0, 60.0)));
/// ```
#[must_use]
pub fn point_on_segment(a: &Point, b: &Point, p: &Point) -> bool {
    p == a || p == b || strictly_between(a, b, p)
}

/// Returns `true` if `p` lies on the open segment between `a` and `b`.
#[must_use]
pub fn strictly_between(a: &Point, b: &Point, p: &Point) -> bool {
    if p == a || p == b || orientation(a, b, p) != Orientation::DEGENERATE {
        return false;
    }
    let towards_b = (p.x() - a.x()) * (b.x() - a.x()) + (p.y() - a.y()) * (b.y() - a.y());
    let towards_a = (p.x() - b.x()) * (a.x() - b.x()) + (p.y() - b.y()) * (a.y() - b.y());
    towards_b > 0.0 && towards_a > 0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: f64, y: f64) -> Point {
        Point::new(x, y)
    }

    #[test]
    fn orientation_is_antisymmetric() {
        let (a, b, c) = (p(71.0, 45.0), p(95.0, 130.0), p(218.0, 108.0));
        let forward = orientation(&a, &b, &c);
        let backward = orientation(&a, &c, &b);
        assert_ne!(forward, Orientation::DEGENERATE);
        assert_ne!(forward, backward);
        assert_eq!(orientation(&b, &c, &a), forward);
    }

    #[test]
    fn orientation_detects_exact_collinearity_far_from_origin() {
        let a = p(-9999.0, -100.0);
        let b = p(9999.0, 9_900.0);
        let mid = p(0.0, 4_900.0);
        assert_eq!(orientation(&a, &b, &mid), Orientation::DEGENERATE);
        assert_eq!(orientation(&a, &b, &p(0.0, 4_901.0)), Orientation::POSITIVE);
    }

    #[test]
    fn incircle_cocircular_large_coordinates_is_boundary() {
        // All four points are 5000 away from (5000, 5000).
        let a = p(8000.0, 9000.0);
        let b = p(2000.0, 9000.0);
        let c = p(9000.0, 2000.0);
        let d = p(0.0, 5000.0);
        assert_eq!(incircle(&a, &b, &c, &d), InCircle::BOUNDARY);
        assert_eq!(incircle(&a, &c, &b, &d), InCircle::BOUNDARY);
        assert_eq!(incircle(&a, &b, &c, &p(1.0, 5000.0)), InCircle::INSIDE);
        assert_eq!(incircle(&a, &b, &c, &p(-1.0, 5000.0)), InCircle::OUTSIDE);
    }

    #[test]
    fn incircle_with_dummy_scale_vertices() {
        let a = p(-9999.0, -100.0);
        let b = p(9999.0, -100.0);
        let c = p(0.0, 9999.0);
        assert_eq!(incircle(&a, &b, &c, &p(40.0, 40.0)), InCircle::INSIDE);
        assert_eq!(incircle(&a, &b, &c, &p(0.0, -20_000.0)), InCircle::OUTSIDE);
    }

    #[test]
    fn incircle_collinear_triple_is_outside() {
        let a = p(0.0, 0.0);
        let b = p(40.0, 0.0);
        let c = p(80.0, 0.0);
        assert_eq!(incircle(&a, &b, &c, &p(40.0, 1.0)), InCircle::OUTSIDE);
    }

    #[test]
    fn three_points_in_line_vertical_special_case() {
        assert!(three_points_in_line(&p(0.0, 0.0), &p(0.0, 40.0), &p(0.0, 80.0)));
        assert!(!three_points_in_line(&p(0.0, 0.0), &p(0.0, 40.0), &p(40.0, 80.0)));
        assert!(!three_points_in_line(&p(40.0, 0.0), &p(0.0, 40.0), &p(0.0, 80.0)));
        assert!(three_points_in_line(&p(0.0, 0.0), &p(40.0, 0.0), &p(120.0, 0.0)));
    }

    #[test]
    fn strictly_between_excludes_endpoints() {
        let a = p(0.0, 0.0);
        let b = p(120.0, 120.0);
        assert!(strictly_between(&a, &b, &p(40.0, 40.0)));
        assert!(!strictly_between(&a, &b, &a));
        assert!(!strictly_between(&a, &b, &p(160.0, 160.0)));
        assert!(!strictly_between(&a, &b, &p(40.0, 41.0)));
    }
}
