//! Triangular faces of the navigation mesh.
//!
//! A [`Triangle`] is a value: three [`Point`]s stored counter-clockwise (in a y-up
//! frame) and rotated so the smallest vertex comes first. Two triangles built
//! from the same corners in any order therefore compare equal and hash
//! identically, and every directed edge `(v[i], v[i + 1])` has the interior on
//! its positive side.
//!
//! The mesh addresses stored faces through [`TriangleKey`]s; the value is what
//! path planning and smoothing carry around, so they also work on hand-built
//! triangle chains.

#![forbid(unsafe_code)]

use crate::core::edge::EdgeKey;
use crate::geometry::point::Point;
use crate::geometry::predicates::{InCircle, Orientation, incircle, orientation};
use serde::{Deserialize, Serialize};
use slotmap::new_key_type;
use std::fmt;
use thiserror::Error;

new_key_type! {
    /// Key type for accessing triangles in the mesh's storage map.
    ///
    /// Keys are generational: once a triangle is removed its key never
    /// resolves again.
    pub struct TriangleKey;
}

/// Errors that can occur when constructing a triangle.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TriangleError {
    /// The three corners are collinear or repeated.
    #[error("Degenerate triangle ({a}, {b}, {c}): corners are collinear or repeated")]
    Degenerate {
        /// First corner as supplied.
        a: Point,
        /// Second corner as supplied.
        b: Point,
        /// Third corner as supplied.
        c: Point,
    },
}

/// Position of a point relative to a closed triangle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrianglePosition {
    /// Strictly inside.
    Inside,
    /// On the relative interior of the given edge.
    OnEdge(EdgeKey),
    /// Exactly at the given corner.
    OnVertex(Point),
    /// Outside the closed triangle.
    Outside,
}

impl TrianglePosition {
    /// Returns `true` unless the point is outside.
    #[inline]
    #[must_use]
    pub const fn is_contained(self) -> bool {
        !matches!(self, Self::Outside)
    }
}

/// A non-degenerate triangle with canonical vertex order.
///
/// # Examples
///
/// ```rust
/// use navmesh::core::triangle::Triangle;
/// use navmesh::geometry::point::Point;
///
/// let a = Point::new(0.0, 0.0);
/// let b = Point::new(40.0, 0.0);
/// let c = Point::new(0.0, 40.0);
/// let t1 = Triangle::new(a, b, c).unwrap();
/// let t2 = Triangle::new(c, b, a).unwrap();
/// assert_eq!(t1, t2);
/// assert!(Triangle::new(a, b, Point::new(80.0, 0.0)).is_err());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "[Point; 3]", into = "[Point; 3]")]
pub struct Triangle {
    vertices: [Point; 3],
}

impl Triangle {
    /// Creates a triangle from three corners in any order.
    ///
    /// # Errors
    ///
    /// Returns [`TriangleError::Degenerate`] if the corners are collinear or
    /// not distinct.
    pub fn new(a: Point, b: Point, c: Point) -> Result<Self, TriangleError> {
        let mut vertices = match orientation(&a, &b, &c) {
            Orientation::POSITIVE => [a, b, c],
            Orientation::NEGATIVE => [a, c, b],
            Orientation::DEGENERATE => return Err(TriangleError::Degenerate { a, b, c }),
        };
        let first = (0..3)
            .min_by(|&i, &j| vertices[i].cmp(&vertices[j]))
            .unwrap_or(0);
        vertices.rotate_left(first);
        Ok(Self { vertices })
    }

    /// Returns an integral triangle strictly enclosing the rectangle
    /// `[min, max]`.
    ///
    /// The triangle is equilateral with a circumradius of four times the
    /// rectangle's half-diagonal, which leaves a wide margin so incremental
    /// insertion never sees a vertex near the bounding edges.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use navmesh::core::triangle::{Triangle, TrianglePosition};
    /// use navmesh::geometry::point::Point;
    ///
    /// let min = Point::new(0.0, 0.0);
    /// let max = Point::new(400.0, 200.0);
    /// let dummy = Triangle::enclosing(min, max);
    /// for corner in [min, max, Point::new(0.0, 200.0), Point::new(400.0, 0.0)] {
    ///     assert_eq!(dummy.position(&corner), TrianglePosition::Inside);
    /// }
    /// ```
    #[must_use]
    pub fn enclosing(min: Point, max: Point) -> Self {
        let center = min.midpoint(&max);
        let half_diagonal = (min.distance(&max) * 0.5).max(1.0);
        let radius = 4.0f64.mul_add(half_diagonal, 2.0);
        let half_width = radius * 3.0f64.sqrt() * 0.5;

        let top = Point::new(center.x().round(), (center.y() - radius).floor());
        let left = Point::new(
            (center.x() - half_width).floor(),
            radius.mul_add(0.5, center.y()).ceil(),
        );
        let right = Point::new(
            (center.x() + half_width).ceil(),
            radius.mul_add(0.5, center.y()).ceil(),
        );
        Self::canonical([top, left, right])
    }

    /// Builds a triangle from corners already known to be non-degenerate.
    fn canonical(corners: [Point; 3]) -> Self {
        let [a, b, c] = corners;
        Self::new(a, b, c).unwrap_or(Self { vertices: corners })
    }

    /// The three corners in canonical counter-clockwise order.
    #[inline]
    #[must_use]
    pub const fn vertices(&self) -> [Point; 3] {
        self.vertices
    }

    /// Returns `true` if `p` is a corner of this triangle.
    #[inline]
    #[must_use]
    pub fn has_vertex(&self, p: &Point) -> bool {
        self.vertices.contains(p)
    }

    /// Index of corner `p`, if present.
    #[inline]
    #[must_use]
    pub fn vertex_index(&self, p: &Point) -> Option<usize> {
        self.vertices.iter().position(|v| v == p)
    }

    /// The three undirected edges, edge `i` being opposite corner `i`.
    #[must_use]
    pub fn edges(&self) -> [EdgeKey; 3] {
        let [a, b, c] = self.vertices;
        [EdgeKey::new(b, c), EdgeKey::new(c, a), EdgeKey::new(a, b)]
    }

    /// Returns `true` if `edge` is one of the three sides.
    #[must_use]
    pub fn has_edge(&self, edge: EdgeKey) -> bool {
        self.has_vertex(&edge.v0()) && self.has_vertex(&edge.v1())
    }

    /// The corner not on `edge`, or `None` if `edge` is not a side.
    #[must_use]
    pub fn opposite_vertex(&self, edge: EdgeKey) -> Option<Point> {
        if !self.has_edge(edge) {
            return None;
        }
        self.vertices.into_iter().find(|v| !edge.contains(v))
    }

    /// The side shared with `other`, if the two triangles are edge-adjacent.
    #[must_use]
    pub fn shared_edge(&self, other: &Self) -> Option<EdgeKey> {
        if self == other {
            return None;
        }
        self.edges().into_iter().find(|e| other.has_edge(*e))
    }

    /// Classifies `p` against the closed triangle.
    #[must_use]
    pub fn position(&self, p: &Point) -> TrianglePosition {
        if let Some(i) = self.vertex_index(p) {
            return TrianglePosition::OnVertex(self.vertices[i]);
        }
        let mut on_edge = None;
        for i in 0..3 {
            let a = &self.vertices[i];
            let b = &self.vertices[(i + 1) % 3];
            match orientation(a, b, p) {
                Orientation::NEGATIVE => return TrianglePosition::Outside,
                Orientation::DEGENERATE => on_edge = Some(EdgeKey::new(*a, *b)),
                Orientation::POSITIVE => {}
            }
        }
        on_edge.map_or(TrianglePosition::Inside, TrianglePosition::OnEdge)
    }

    /// Returns `true` if `p` lies in the closed triangle.
    #[inline]
    #[must_use]
    pub fn contains_point(&self, p: &Point) -> bool {
        self.position(p).is_contained()
    }

    /// Position of `p` relative to this triangle's circumcircle.
    #[inline]
    #[must_use]
    pub fn circumcircle_position(&self, p: &Point) -> InCircle {
        let [a, b, c] = &self.vertices;
        incircle(a, b, c, p)
    }

    /// Centroid of the three corners.
    #[must_use]
    pub fn centroid(&self) -> Point {
        let [a, b, c] = &self.vertices;
        Point::new((a.x() + b.x() + c.x()) / 3.0, (a.y() + b.y() + c.y()) / 3.0)
    }

    /// Unsigned area.
    #[must_use]
    pub fn area(&self) -> f64 {
        let [a, b, c] = &self.vertices;
        ((b.x() - a.x()) * (c.y() - a.y()) - (b.y() - a.y()) * (c.x() - a.x())).abs() * 0.5
    }
}

impl TryFrom<[Point; 3]> for Triangle {
    type Error = TriangleError;

    fn try_from([a, b, c]: [Point; 3]) -> Result<Self, Self::Error> {
        Self::new(a, b, c)
    }
}

impl From<Triangle> for [Point; 3] {
    fn from(t: Triangle) -> Self {
        t.vertices
    }
}

impl fmt::Display for Triangle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c] = &self.vertices;
        write!(f, "[{a}, {b}, {c}]")
    }
}
