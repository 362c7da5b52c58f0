//! Planar points with value semantics.
//!
//! # Equality and Hashing
//!
//! Points are used as keys throughout the crate (graph adjacency, triangle
//! incidence, edge maps), so they implement [`Eq`], [`Hash`] and [`Ord`] by
//! value. Coordinates are compared through [`OrderedFloat`], and `-0.0` is folded
//! into `0.0` on construction, so two points built from the same grid arithmetic
//! always compare equal and hash identically.
//!
//! No tolerance is applied: `Point::new(1.0, 2.0)` and
//! `Point::new(1.0 + 1e-12, 2.0)` are different points. Mesh vertices are
//! produced from integral tile coordinates scaled by an integral tile size, so
//! exact comparison is reliable for them. Callers feeding computed coordinates
//! into a mesh should canonicalize them first with [`Point::snapped`].

#![forbid(unsafe_code)]

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// An immutable 2D coordinate.
///
/// # Examples
///
/// ```rust
/// use navmesh::geometry::point::Point;
///
/// let p = Point::new(40.0, 80.0);
/// assert_eq!(p.x(), 40.0);
/// assert_eq!(p.y(), 80.0);
/// assert_eq!(p, Point::from((40.0, 80.0)));
/// ```
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Point {
    x: f64,
    y: f64,
}

impl Point {
    /// Creates a point, folding negative zero into positive zero.
    #[inline]
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        // -0.0 + 0.0 == +0.0, every other value is unchanged.
        Self {
            x: x + 0.0,
            y: y + 0.0,
        }
    }

    /// The x coordinate.
    #[inline]
    #[must_use]
    pub const fn x(&self) -> f64 {
        self.x
    }

    /// The y coordinate (grows downward in screen space).
    #[inline]
    #[must_use]
    pub const fn y(&self) -> f64 {
        self.y
    }

    /// Euclidean distance to `other`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use navmesh::geometry::point::Point;
    ///
    /// let a = Point::new(0.0, 0.0);
    /// let b = Point::new(3.0, 4.0);
    /// assert_eq!(a.distance(&b), 5.0);
    /// ```
    #[inline]
    #[must_use]
    pub fn distance(&self, other: &Self) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }

    /// Squared Euclidean distance to `other`.
    #[inline]
    #[must_use]
    pub fn distance_squared(&self, other: &Self) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        dx.mul_add(dx, dy * dy)
    }

    /// The point halfway between `self` and `other`.
    #[inline]
    #[must_use]
    pub fn midpoint(&self, other: &Self) -> Self {
        Self::new((self.x + other.x) * 0.5, (self.y + other.y) * 0.5)
    }

    /// Returns this point moved by `(dx, dy)`.
    #[inline]
    #[must_use]
    pub fn offset(&self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    /// Rounds both coordinates to the nearest multiple of `quantum`.
    ///
    /// A non-positive or non-finite `quantum` returns the point unchanged.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use navmesh::geometry::point::Point;
    ///
    /// let p = Point::new(39.999_999_7, -0.000_000_2);
    /// assert_eq!(p.snapped(1.0), Point::new(40.0, 0.0));
    /// ```
    #[must_use]
    pub fn snapped(&self, quantum: f64) -> Self {
        if !(quantum.is_finite() && quantum > 0.0) {
            return *self;
        }
        Self::new(
            (self.x / quantum).round() * quantum,
            (self.y / quantum).round() * quantum,
        )
    }

    /// Returns `true` if both coordinates are finite.
    #[inline]
    #[must_use]
    pub const fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Returns `true` if both coordinates are whole numbers.
    #[inline]
    #[must_use]
    pub fn is_integral(&self) -> bool {
        self.is_finite() && self.x.fract() == 0.0 && self.y.fract() == 0.0
    }
}

impl PartialEq for Point {
    fn eq(&self, other: &Self) -> bool {
        OrderedFloat(self.x) == OrderedFloat(other.x)
            && OrderedFloat(self.y) == OrderedFloat(other.y)
    }
}

impl Eq for Point {}

impl Hash for Point {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        OrderedFloat(self.x).hash(state);
        OrderedFloat(self.y).hash(state);
    }
}

impl PartialOrd for Point {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Lexicographic order: by x, then by y.
impl Ord for Point {
    fn cmp(&self, other: &Self) -> Ordering {
        OrderedFloat(self.x)
            .cmp(&OrderedFloat(other.x))
            .then_with(|| OrderedFloat(self.y).cmp(&OrderedFloat(other.y)))
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

impl From<(f64, f64)> for Point {
    #[inline]
    fn from((x, y): (f64, f64)) -> Self {
        Self::new(x, y)
    }
}

impl From<[f64; 2]> for Point {
    #[inline]
    fn from([x, y]: [f64; 2]) -> Self {
        Self::new(x, y)
    }
}

impl From<Point> for [f64; 2] {
    #[inline]
    fn from(p: Point) -> Self {
        [p.x, p.y]
    }
}
