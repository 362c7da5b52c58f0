//! Undirected planar graph of points and straight edges.
//!
//! `PlanarGraph` is the common substrate of the pipeline: the boundary builder
//! emits one, the merge pass reduces it, and the triangulation keeps its own
//! copy of every triangle vertex and side. Adjacency is kept in ordered maps so
//! iteration order depends only on the coordinates, never on hashing or on the
//! order in which edges were added.

#![forbid(unsafe_code)]

use crate::core::edge::EdgeKey;
use crate::geometry::point::Point;
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

/// Errors reported by [`PlanarGraph`].
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PlanarGraphError {
    /// An edge endpoint has not been added as a vertex.
    #[error("Vertex {vertex} is not in the graph")]
    MissingVertex {
        /// The missing endpoint.
        vertex: Point,
    },
}

/// An undirected graph with symmetric adjacency.
///
/// # Examples
///
/// ```rust
/// use navmesh::core::planar_graph::PlanarGraph;
/// use navmesh::geometry::point::Point;
///
/// let a = Point::new(0.0, 0.0);
/// let b = Point::new(40.0, 0.0);
/// let mut graph = PlanarGraph::new();
/// assert!(graph.add_vertex(a));
/// assert!(!graph.add_vertex(a));
/// graph.add_vertex(b);
/// graph.add_edge(a, b).unwrap();
/// assert!(graph.neighbors(&b).any(|n| n == a));
/// assert!(graph.add_edge(a, Point::new(1.0, 1.0)).is_err());
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PlanarGraph {
    adjacency: BTreeMap<Point, BTreeSet<Point>>,
}

impl PlanarGraph {
    /// Creates an empty graph.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            adjacency: BTreeMap::new(),
        }
    }

    /// Inserts `p`; returns `false` if it was already present.
    pub fn add_vertex(&mut self, p: Point) -> bool {
        if self.adjacency.contains_key(&p) {
            return false;
        }
        self.adjacency.insert(p, BTreeSet::new());
        true
    }

    /// Removes `p` and every incident edge; returns `false` if absent.
    pub fn remove_vertex(&mut self, p: &Point) -> bool {
        let Some(neighbors) = self.adjacency.remove(p) else {
            return false;
        };
        for n in &neighbors {
            if let Some(back) = self.adjacency.get_mut(n) {
                back.remove(p);
            }
        }
        true
    }

    /// Inserts the undirected edge `a - b`.
    ///
    /// Returns `Ok(false)` if the edge already existed. A loop (`a == b`) is
    /// ignored and also returns `Ok(false)`.
    ///
    /// # Errors
    ///
    /// Returns [`PlanarGraphError::MissingVertex`] if either endpoint is not a
    /// vertex of the graph.
    pub fn add_edge(&mut self, a: Point, b: Point) -> Result<bool, PlanarGraphError> {
        for vertex in [a, b] {
            if !self.adjacency.contains_key(&vertex) {
                return Err(PlanarGraphError::MissingVertex { vertex });
            }
        }
        if a == b {
            return Ok(false);
        }
        let inserted = self.adjacency.entry(a).or_default().insert(b);
        self.adjacency.entry(b).or_default().insert(a);
        Ok(inserted)
    }

    /// Removes the edge `a - b`; returns `false` if it was not present.
    pub fn remove_edge(&mut self, a: &Point, b: &Point) -> bool {
        let removed = self.adjacency.get_mut(a).is_some_and(|n| n.remove(b));
        if let Some(n) = self.adjacency.get_mut(b) {
            n.remove(a);
        }
        removed
    }

    /// Neighbours of `p` in ascending order (empty if `p` is absent).
    pub fn neighbors(&self, p: &Point) -> impl Iterator<Item = Point> + '_ {
        self.adjacency.get(p).into_iter().flatten().copied()
    }

    /// Number of edges incident to `p`.
    #[must_use]
    pub fn degree(&self, p: &Point) -> usize {
        self.adjacency.get(p).map_or(0, BTreeSet::len)
    }

    /// Returns `true` if `p` is a vertex.
    #[must_use]
    pub fn contains_vertex(&self, p: &Point) -> bool {
        self.adjacency.contains_key(p)
    }

    /// Returns `true` if the edge `a - b` is present.
    #[must_use]
    pub fn contains_edge(&self, a: &Point, b: &Point) -> bool {
        self.adjacency.get(a).is_some_and(|n| n.contains(b))
    }

    /// Vertices in ascending order.
    pub fn vertices(&self) -> impl Iterator<Item = Point> + '_ {
        self.adjacency.keys().copied()
    }

    /// Every edge exactly once, in ascending canonical order.
    pub fn edges(&self) -> impl Iterator<Item = EdgeKey> + '_ {
        self.adjacency.iter().flat_map(|(a, neighbors)| {
            neighbors
                .range(a..)
                .filter(move |b| *b != a)
                .map(move |b| EdgeKey::new(*a, *b))
        })
    }

    /// Number of vertices.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.adjacency.len()
    }

    /// Number of undirected edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.adjacency.values().map(BTreeSet::len).sum::<usize>() / 2
    }

    /// Returns `true` if the graph has no vertices.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.adjacency.is_empty()
    }

    /// Drops every vertex with no incident edge; returns how many were removed.
    pub fn remove_isolated_vertices(&mut self) -> usize {
        let before = self.adjacency.len();
        self.adjacency.retain(|_, neighbors| !neighbors.is_empty());
        before - self.adjacency.len()
    }
}
