//! Incremental constrained Delaunay triangulation.
//!
//! [`ConstrainedDelaunayMesh`] owns the triangle faces of the navigation mesh
//! together with the incidence maps needed to update them locally:
//!
//! - a [`PlanarGraph`] of every triangle vertex and side
//! - per vertex, the triangles that have it as a corner
//! - per undirected edge, the one or two triangles on either side
//! - the set of constrained edges, which are never flipped
//!
//! # Lifecycle
//!
//! A mesh moves through [`MeshState`] in one direction only:
//!
//! ```text
//! Empty --seed--> Seeded --add_vertex--> Populated --add_constraint_edge--> Constrained
//!                                            \______________finalize_____________/ --> Finalized
//! ```
//!
//! Vertices may still be added after constraints (the mesh stays
//! `Constrained`), and a finalized mesh is read-only.
//!
//! # Examples
//!
//! ```rust
//! use navmesh::core::triangle::Triangle;
//! use navmesh::core::triangulation::{ConstrainedDelaunayMesh, MeshState};
//! use navmesh::geometry::point::Point;
//!
//! let dummy = Triangle::new(
//!     Point::new(-9999.0, -100.0),
//!     Point::new(9999.0, -100.0),
//!     Point::new(0.0, 9999.0),
//! )
//! .unwrap();
//!
//! let mut mesh = ConstrainedDelaunayMesh::new();
//! mesh.seed(dummy).unwrap();
//! for (x, y) in [(0.0, 0.0), (120.0, 0.0), (120.0, 80.0), (0.0, 80.0), (40.0, 40.0)] {
//!     mesh.add_vertex(Point::new(x, y)).unwrap();
//! }
//! mesh.add_constraint_edge(Point::new(0.0, 0.0), Point::new(120.0, 80.0)).unwrap();
//! mesh.finalize().unwrap();
//!
//! assert_eq!(mesh.state(), MeshState::Finalized);
//! assert!(mesh.validate().is_ok());
//! assert_eq!(mesh.find_containing_triangles(&Point::new(100.0, 20.0)).len(), 1);
//! ```

#![forbid(unsafe_code)]

use crate::core::algorithms::constrained_insertion::insert_constraint;
use crate::core::algorithms::flips::{DelaunayRepairStats, is_locally_delaunay, legalize_around};
use crate::core::algorithms::locate::{LocateResult, find_containing_triangles, locate};
use crate::core::collections::{
    EdgeFaceBuffer, FastHashMap, SmallBuffer, StorageMap, VERTEX_DEGREE_BUFFER_SIZE,
    VertexFaceBuffer,
};
use crate::core::edge::EdgeKey;
use crate::core::planar_graph::{PlanarGraph, PlanarGraphError};
use crate::core::triangle::{Triangle, TriangleError, TriangleKey};
use crate::geometry::point::Point;
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

// =============================================================================
// STATE AND ERRORS
// =============================================================================

/// Lifecycle stage of a [`ConstrainedDelaunayMesh`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MeshState {
    /// No faces.
    #[default]
    Empty,
    /// The bounding dummy triangle is the only face.
    Seeded,
    /// At least one vertex has been inserted.
    Populated,
    /// At least one constraint has been enforced.
    Constrained,
    /// Construction is over; the mesh is read-only.
    Finalized,
}

impl fmt::Display for MeshState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Empty => "empty",
            Self::Seeded => "seeded",
            Self::Populated => "populated",
            Self::Constrained => "constrained",
            Self::Finalized => "finalized",
        };
        f.write_str(name)
    }
}

/// Violations of the mesh's geometric or lifecycle invariants.
///
/// These indicate malformed input or a logic error; the mesh must not be used
/// for further construction once one is returned from a mutating operation.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum MeshError {
    /// The operation is not allowed in the current lifecycle stage.
    #[error("Cannot {operation} a {state} mesh")]
    InvalidState {
        /// What was attempted.
        operation: &'static str,
        /// Stage the mesh was in.
        state: MeshState,
    },

    /// A face would have collinear or repeated corners.
    #[error(transparent)]
    DegenerateTriangle(#[from] TriangleError),

    /// A vertex lies outside every face (for example outside the dummy).
    #[error("Vertex {vertex} is not enclosed by any triangle")]
    VertexNotEnclosed {
        /// The vertex being inserted.
        vertex: Point,
    },

    /// The vertex is already part of the mesh.
    #[error("Vertex {vertex} is already in the mesh")]
    DuplicateVertex {
        /// The repeated vertex.
        vertex: Point,
    },

    /// A point lies in an unexpected number of faces.
    #[error("Point {point} lies in {count} triangles")]
    DegenerateContainment {
        /// The query point.
        point: Point,
        /// Number of faces containing it.
        count: usize,
    },

    /// A constraint endpoint or removal target is not a mesh vertex.
    #[error("Vertex {vertex} is not in the mesh")]
    MissingVertex {
        /// The missing vertex.
        vertex: Point,
    },

    /// A new constraint would cross an existing one.
    #[error("Constraint {constraint} crosses constrained edge {crossed}")]
    ConstraintCrossing {
        /// The constraint being inserted.
        constraint: EdgeKey,
        /// The existing constraint in the way.
        crossed: EdgeKey,
    },

    /// The faces crossed by a constraint could not be re-triangulated.
    #[error("Cannot insert constraint {constraint}: {message}")]
    ConstraintInsertionFailed {
        /// The constraint being inserted.
        constraint: EdgeKey,
        /// What went wrong.
        message: String,
    },

    /// A triangle key no longer resolves.
    #[error("Triangle {key:?} is not in the mesh")]
    MissingTriangle {
        /// The stale key.
        key: TriangleKey,
    },

    /// An edge cannot be flipped.
    #[error("Cannot flip edge {edge}: {message}")]
    InvalidFlip {
        /// The edge.
        edge: EdgeKey,
        /// Why the flip was refused.
        message: &'static str,
    },

    /// An edge is not shared by one or two faces.
    #[error("Edge {edge} is shared by {count} triangles")]
    NonManifoldEdge {
        /// The edge.
        edge: EdgeKey,
        /// Number of incident faces.
        count: usize,
    },

    /// An unconstrained edge fails the empty circumcircle test.
    #[error("Edge {edge} is not locally Delaunay: {vertex} is inside the circumcircle of {triangle}")]
    DelaunayViolation {
        /// The offending edge.
        edge: EdgeKey,
        /// Face whose circumcircle is violated.
        triangle: Triangle,
        /// Vertex inside it.
        vertex: Point,
    },

    /// A constrained edge is not a side of any face.
    #[error("Constraint {constraint} is missing from the triangulation")]
    MissingConstraint {
        /// The missing constraint.
        constraint: EdgeKey,
    },

    /// Bookkeeping on the underlying graph failed.
    #[error(transparent)]
    Graph(#[from] PlanarGraphError),
}

// =============================================================================
// MESH
// =============================================================================

/// A constrained Delaunay triangulation built by incremental insertion.
#[derive(Clone, Debug, Default)]
pub struct ConstrainedDelaunayMesh {
    graph: PlanarGraph,
    triangles: StorageMap<TriangleKey, Triangle>,
    vertex_faces: FastHashMap<Point, VertexFaceBuffer<TriangleKey>>,
    edge_faces: FastHashMap<EdgeKey, EdgeFaceBuffer<TriangleKey>>,
    constraints: BTreeSet<EdgeKey>,
    dummy: Option<Triangle>,
    state: MeshState,
    hint: Option<TriangleKey>,
}

impl ConstrainedDelaunayMesh {
    /// Creates an empty mesh.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------

    /// Current lifecycle stage.
    #[must_use]
    pub const fn state(&self) -> MeshState {
        self.state
    }

    fn require(&self, operation: &'static str, allowed: &[MeshState]) -> Result<(), MeshError> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(MeshError::InvalidState {
                operation,
                state: self.state,
            })
        }
    }

    /// Inserts the bounding dummy triangle.
    ///
    /// Every vertex inserted later must lie strictly inside it.
    ///
    /// # Errors
    ///
    /// Returns [`MeshError::InvalidState`] unless the mesh is empty.
    pub fn seed(&mut self, dummy: Triangle) -> Result<TriangleKey, MeshError> {
        self.require("seed", &[MeshState::Empty])?;
        let key = self.insert_triangle(dummy)?;
        self.dummy = Some(dummy);
        self.hint = Some(key);
        self.state = MeshState::Seeded;
        tracing::debug!(%dummy, "seeded mesh with dummy triangle");
        Ok(key)
    }

    /// Inserts `vertex` and restores the Delaunay property by edge flips.
    ///
    /// The vertex must lie strictly inside one face or on an edge shared by two
    /// faces. Inserting on a constrained edge splits the constraint in two.
    ///
    /// # Errors
    ///
    /// - [`MeshError::InvalidState`] before seeding or after finalizing
    /// - [`MeshError::DuplicateVertex`] if the vertex is already present
    /// - [`MeshError::VertexNotEnclosed`] if no face contains it
    /// - [`MeshError::DegenerateContainment`] if it lies on a boundary edge
    pub fn add_vertex(&mut self, vertex: Point) -> Result<DelaunayRepairStats, MeshError> {
        self.require(
            "add a vertex to",
            &[MeshState::Seeded, MeshState::Populated, MeshState::Constrained],
        )?;
        if self.graph.contains_vertex(&vertex) {
            return Err(MeshError::DuplicateVertex { vertex });
        }

        let new_edges: SmallBuffer<EdgeKey, 4> = match locate(self, &vertex, self.hint) {
            LocateResult::Outside => return Err(MeshError::VertexNotEnclosed { vertex }),
            LocateResult::OnVertex(_) => return Err(MeshError::DuplicateVertex { vertex }),
            LocateResult::Inside(key) => self.split_triangle(key, vertex)?,
            LocateResult::OnEdge(edge) => self.split_edge(edge, vertex)?,
        };

        let stats = legalize_around(self, vertex, new_edges)?;
        self.hint = self.vertex_faces.get(&vertex).and_then(|faces| faces.first().copied());
        if self.state == MeshState::Seeded {
            self.state = MeshState::Populated;
        }
        tracing::trace!(%vertex, flips = stats.flips_performed, "inserted vertex");
        Ok(stats)
    }

    /// One-to-three split of the face `key` at `vertex`.
    fn split_triangle(
        &mut self,
        key: TriangleKey,
        vertex: Point,
    ) -> Result<SmallBuffer<EdgeKey, 4>, MeshError> {
        let [a, b, c] = self.triangle_checked(key)?.vertices();
        for (p, q) in [(a, b), (b, c), (c, a)] {
            Triangle::new(p, q, vertex)?;
        }
        self.remove_triangle(key);
        let mut outer = SmallBuffer::new();
        for (p, q) in [(a, b), (b, c), (c, a)] {
            self.insert_triangle(Triangle::new(p, q, vertex)?)?;
            outer.push(EdgeKey::new(p, q));
        }
        Ok(outer)
    }

    /// Two-to-four split of the faces sharing `edge` at `vertex`.
    fn split_edge(
        &mut self,
        edge: EdgeKey,
        vertex: Point,
    ) -> Result<SmallBuffer<EdgeKey, 4>, MeshError> {
        let faces = self.faces_of_edge(edge).to_vec();
        if faces.len() != 2 {
            return Err(MeshError::DegenerateContainment {
                point: vertex,
                count: faces.len(),
            });
        }
        let (a, b) = edge.endpoints();
        let mut opposite = SmallBuffer::<Point, 2>::new();
        for &key in &faces {
            let apex = self
                .triangle_checked(key)?
                .opposite_vertex(edge)
                .ok_or(MeshError::NonManifoldEdge { edge, count: faces.len() })?;
            Triangle::new(a, apex, vertex)?;
            Triangle::new(apex, b, vertex)?;
            opposite.push(apex);
        }

        for key in faces {
            self.remove_triangle(key);
        }
        let mut outer = SmallBuffer::new();
        for apex in opposite {
            self.insert_triangle(Triangle::new(a, apex, vertex)?)?;
            self.insert_triangle(Triangle::new(apex, b, vertex)?)?;
            outer.push(EdgeKey::new(a, apex));
            outer.push(EdgeKey::new(apex, b));
        }

        if self.constraints.remove(&edge) {
            tracing::debug!(%edge, %vertex, "split constrained edge at inserted vertex");
            self.constraints.insert(EdgeKey::new(a, vertex));
            self.constraints.insert(EdgeKey::new(vertex, b));
        }
        Ok(outer)
    }

    /// Forces the segment `a - b` to appear as a union of mesh edges.
    ///
    /// Existing edges are simply marked. Otherwise the faces crossed by the
    /// segment are removed and both sides are re-triangulated. A segment that
    /// passes exactly through other vertices is enforced piecewise. Constrained
    /// edges are never flipped afterwards.
    ///
    /// # Errors
    ///
    /// - [`MeshError::InvalidState`] unless populated or constrained
    /// - [`MeshError::MissingVertex`] if an endpoint is not a vertex
    /// - [`MeshError::ConstraintCrossing`] if an existing constraint is in the way
    /// - [`MeshError::ConstraintInsertionFailed`] if no crossing face sequence exists
    pub fn add_constraint_edge(&mut self, a: Point, b: Point) -> Result<(), MeshError> {
        self.require(
            "add a constraint to",
            &[MeshState::Populated, MeshState::Constrained],
        )?;
        insert_constraint(self, a, b)?;
        self.state = MeshState::Constrained;
        Ok(())
    }

    /// Removes `vertex` and every face that has it as a corner.
    ///
    /// Constraints ending at the vertex are dropped. Returns the number of
    /// removed faces. The hole left behind is not re-triangulated.
    ///
    /// # Errors
    ///
    /// Returns [`MeshError::MissingVertex`] if the vertex is absent.
    pub fn remove_vertex_and_triangles(&mut self, vertex: &Point) -> Result<usize, MeshError> {
        if !self.graph.contains_vertex(vertex) {
            return Err(MeshError::MissingVertex { vertex: *vertex });
        }
        let faces = self.faces_at_vertex(vertex).to_vec();
        for &key in &faces {
            self.remove_triangle(key);
        }
        self.graph.remove_vertex(vertex);
        self.vertex_faces.remove(vertex);
        self.constraints.retain(|edge| !edge.contains(vertex));
        if self.hint.is_some_and(|key| !self.triangles.contains_key(key)) {
            self.hint = self.triangles.keys().next();
        }
        Ok(faces.len())
    }

    /// Removes the dummy vertices and their faces, and makes the mesh
    /// read-only.
    ///
    /// # Errors
    ///
    /// Returns [`MeshError::InvalidState`] if the mesh is empty or already
    /// finalized.
    pub fn finalize(&mut self) -> Result<(), MeshError> {
        self.require(
            "finalize",
            &[MeshState::Seeded, MeshState::Populated, MeshState::Constrained],
        )?;
        if let Some(dummy) = self.dummy {
            let removed: usize = dummy
                .vertices()
                .iter()
                .map(|v| self.remove_vertex_and_triangles(v))
                .sum::<Result<usize, _>>()?;
            tracing::debug!(removed, remaining = self.triangles.len(), "removed dummy triangles");
        }
        self.state = MeshState::Finalized;
        Ok(())
    }

    /// Marks construction as complete while keeping the dummy faces.
    ///
    /// # Errors
    ///
    /// Returns [`MeshError::InvalidState`] if the mesh is empty or already
    /// finalized.
    pub fn seal(&mut self) -> Result<(), MeshError> {
        self.require(
            "seal",
            &[MeshState::Seeded, MeshState::Populated, MeshState::Constrained],
        )?;
        self.state = MeshState::Finalized;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    /// All faces whose closed region contains `p`, in key order.
    ///
    /// One face for an interior point, two on a shared edge, every incident
    /// face at a vertex, none outside the mesh.
    #[must_use]
    pub fn find_containing_triangles(
        &self,
        p: &Point,
    ) -> SmallBuffer<TriangleKey, VERTEX_DEGREE_BUFFER_SIZE> {
        find_containing_triangles(self, p, self.hint)
    }

    /// Locates `p` starting the walk at `hint`.
    #[must_use]
    pub fn locate(&self, p: &Point, hint: Option<TriangleKey>) -> LocateResult {
        locate(self, p, hint.or(self.hint))
    }

    /// The bounding dummy triangle, if the mesh was seeded.
    #[must_use]
    pub const fn dummy(&self) -> Option<&Triangle> {
        self.dummy.as_ref()
    }

    /// Returns `true` if `p` is a corner of the dummy triangle.
    #[must_use]
    pub fn is_dummy_vertex(&self, p: &Point) -> bool {
        self.dummy.is_some_and(|d| d.has_vertex(p))
    }

    /// Graph of all face corners and sides.
    #[must_use]
    pub const fn graph(&self) -> &PlanarGraph {
        &self.graph
    }

    /// Face for `key`, if still present.
    #[must_use]
    pub fn triangle(&self, key: TriangleKey) -> Option<&Triangle> {
        self.triangles.get(key)
    }

    pub(crate) fn triangle_checked(&self, key: TriangleKey) -> Result<Triangle, MeshError> {
        self.triangles
            .get(key)
            .copied()
            .ok_or(MeshError::MissingTriangle { key })
    }

    /// Key of the stored face equal to `triangle`.
    #[must_use]
    pub fn triangle_key(&self, triangle: &Triangle) -> Option<TriangleKey> {
        let first = triangle.vertices()[0];
        self.faces_at_vertex(&first)
            .iter()
            .copied()
            .find(|&key| self.triangles.get(key) == Some(triangle))
    }

    /// All faces with their keys, in storage order.
    pub fn triangles(&self) -> impl Iterator<Item = (TriangleKey, &Triangle)> {
        self.triangles.iter()
    }

    /// Number of faces.
    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Number of vertices, dummy corners included until finalization.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.graph.vertex_count()
    }

    /// Vertices in ascending order.
    pub fn vertices(&self) -> impl Iterator<Item = Point> + '_ {
        self.graph.vertices()
    }

    /// Faces on either side of `edge` (empty if it is not a side).
    #[must_use]
    pub fn faces_of_edge(&self, edge: EdgeKey) -> &[TriangleKey] {
        self.edge_faces.get(&edge).map_or(&[], |faces| faces.as_slice())
    }

    /// Faces with `vertex` as a corner.
    #[must_use]
    pub fn faces_at_vertex(&self, vertex: &Point) -> &[TriangleKey] {
        self.vertex_faces.get(vertex).map_or(&[], |faces| faces.as_slice())
    }

    /// The face across `edge` from `key`.
    #[must_use]
    pub fn neighbor_across(&self, key: TriangleKey, edge: EdgeKey) -> Option<TriangleKey> {
        let faces = self.faces_of_edge(edge);
        if !faces.contains(&key) {
            return None;
        }
        faces.iter().copied().find(|&other| other != key)
    }

    /// Returns `true` if `edge` is a side of some face.
    #[must_use]
    pub fn has_edge(&self, edge: EdgeKey) -> bool {
        self.edge_faces.contains_key(&edge)
    }

    /// Returns `true` if `edge` is constrained.
    #[must_use]
    pub fn is_constrained(&self, edge: EdgeKey) -> bool {
        self.constraints.contains(&edge)
    }

    /// Constrained edges in ascending order.
    pub fn constraints(&self) -> impl Iterator<Item = EdgeKey> + '_ {
        self.constraints.iter().copied()
    }

    /// All face sides with their incident faces, in unspecified order.
    pub fn edges(&self) -> impl Iterator<Item = (EdgeKey, &[TriangleKey])> {
        self.edge_faces.iter().map(|(edge, faces)| (*edge, faces.as_slice()))
    }

    // -------------------------------------------------------------------------
    // Validation
    // -------------------------------------------------------------------------

    /// Checks that every side has one or two faces.
    ///
    /// # Errors
    ///
    /// Returns [`MeshError::NonManifoldEdge`] for the first bad edge.
    pub fn validate_topology(&self) -> Result<(), MeshError> {
        match self.edges().find(|(_, faces)| !(1..=2).contains(&faces.len())) {
            Some((edge, faces)) => Err(MeshError::NonManifoldEdge {
                edge,
                count: faces.len(),
            }),
            None => Ok(()),
        }
    }

    /// Checks the empty circumcircle property on every unconstrained interior
    /// edge. Local Delaunayhood of all such edges implies the mesh is a
    /// constrained Delaunay triangulation.
    ///
    /// # Errors
    ///
    /// Returns [`MeshError::DelaunayViolation`] for the first bad edge.
    pub fn validate_delaunay(&self) -> Result<(), MeshError> {
        let mut edges: Vec<EdgeKey> = self.edge_faces.keys().copied().collect();
        edges.sort_unstable();
        for edge in edges {
            if self.is_constrained(edge) {
                continue;
            }
            is_locally_delaunay(self, edge)?;
        }
        Ok(())
    }

    /// Checks that every constraint is a side of some face.
    ///
    /// # Errors
    ///
    /// Returns [`MeshError::MissingConstraint`] for the first missing one.
    pub fn validate_constraints(&self) -> Result<(), MeshError> {
        match self.constraints().find(|edge| !self.has_edge(*edge)) {
            Some(constraint) => Err(MeshError::MissingConstraint { constraint }),
            None => Ok(()),
        }
    }

    /// Runs every validator.
    ///
    /// # Errors
    ///
    /// Returns the first violation found.
    pub fn validate(&self) -> Result<(), MeshError> {
        self.validate_topology()?;
        self.validate_constraints()?;
        self.validate_delaunay()
    }

    // -------------------------------------------------------------------------
    // Primitive mutation (used by the algorithms)
    // -------------------------------------------------------------------------

    /// Stores `triangle` and registers its corners and sides.
    pub(crate) fn insert_triangle(&mut self, triangle: Triangle) -> Result<TriangleKey, MeshError> {
        let key = self.triangles.insert(triangle);
        for v in triangle.vertices() {
            self.graph.add_vertex(v);
            self.vertex_faces.entry(v).or_default().push(key);
        }
        for edge in triangle.edges() {
            let (a, b) = edge.endpoints();
            self.graph.add_edge(a, b)?;
            let faces = self.edge_faces.entry(edge).or_default();
            faces.push(key);
            if faces.len() > 2 {
                return Err(MeshError::NonManifoldEdge {
                    edge,
                    count: faces.len(),
                });
            }
        }
        Ok(key)
    }

    /// Removes the face `key` and its registrations. Sides left without faces
    /// are removed from the graph; corners stay.
    pub(crate) fn remove_triangle(&mut self, key: TriangleKey) -> Option<Triangle> {
        let triangle = self.triangles.remove(key)?;
        for v in triangle.vertices() {
            if let Some(faces) = self.vertex_faces.get_mut(&v) {
                faces.retain(|k| *k != key);
            }
        }
        for edge in triangle.edges() {
            let now_empty = self.edge_faces.get_mut(&edge).is_some_and(|faces| {
                faces.retain(|k| *k != key);
                faces.is_empty()
            });
            if now_empty {
                self.edge_faces.remove(&edge);
                self.graph.remove_edge(&edge.v0(), &edge.v1());
            }
        }
        if self.hint == Some(key) {
            self.hint = None;
        }
        Some(triangle)
    }

    pub(crate) fn mark_constrained(&mut self, edge: EdgeKey) {
        self.constraints.insert(edge);
    }
}
