//! Canonical undirected edge identifiers.
//!
//! Edges are not stored explicitly by the mesh; they are inferred from triangle
//! corners. `EdgeKey` gives every edge a stable, comparable identity that:
//!
//! - identifies an edge purely by its two endpoint [`Point`]s
//! - canonicalizes endpoint ordering so `(a, b)` and `(b, a)` map to the same edge
//! - is `Copy`/`Hash`/`Ord` for fast use in sets and maps
//!
//! ## Determinism
//!
//! Unlike slotmap keys, points have a value order, so sorting a collection of
//! `EdgeKey`s yields the same order in every process.

use crate::geometry::point::Point;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical identifier for an undirected edge.
///
/// # Examples
///
/// ```rust
/// use navmesh::core::edge::EdgeKey;
/// use navmesh::geometry::point::Point;
///
/// let a = Point::new(40.0, 0.0);
/// let b = Point::new(0.0, 40.0);
/// let edge = EdgeKey::new(a, b);
/// assert_eq!(edge, EdgeKey::new(b, a));
/// assert_eq!(edge.endpoints(), (b, a));
/// ```
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EdgeKey {
    v0: Point,
    v1: Point,
}

impl EdgeKey {
    /// Creates a new canonical edge key with `v0 <= v1`.
    #[must_use]
    pub fn new(a: Point, b: Point) -> Self {
        if a <= b {
            Self { v0: a, v1: b }
        } else {
            Self { v0: b, v1: a }
        }
    }

    /// Returns the first (canonical) endpoint.
    #[inline]
    #[must_use]
    pub const fn v0(self) -> Point {
        self.v0
    }

    /// Returns the second (canonical) endpoint.
    #[inline]
    #[must_use]
    pub const fn v1(self) -> Point {
        self.v1
    }

    /// Returns both endpoints in canonical order.
    #[inline]
    #[must_use]
    pub const fn endpoints(self) -> (Point, Point) {
        (self.v0, self.v1)
    }

    /// Returns `true` if `p` is one of the endpoints.
    #[inline]
    #[must_use]
    pub fn contains(self, p: &Point) -> bool {
        self.v0 == *p || self.v1 == *p
    }

    /// Returns the endpoint opposite `p`, or `None` if `p` is not an endpoint.
    #[must_use]
    pub fn other(self, p: &Point) -> Option<Point> {
        if self.v0 == *p {
            Some(self.v1)
        } else if self.v1 == *p {
            Some(self.v0)
        } else {
            None
        }
    }

    /// Midpoint of the edge, the waypoint used when a path crosses it.
    #[inline]
    #[must_use]
    pub fn midpoint(self) -> Point {
        self.v0.midpoint(&self.v1)
    }

    /// Euclidean length of the edge.
    #[inline]
    #[must_use]
    pub fn length(self) -> f64 {
        self.v0.distance(&self.v1)
    }
}

impl From<(Point, Point)> for EdgeKey {
    fn from((a, b): (Point, Point)) -> Self {
        Self::new(a, b)
    }
}

impl fmt::Display for EdgeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.v0, self.v1)
    }
}
