//! Navigation mesh construction and the triangle-adjacency view used for path
//! search.
//!
//! [`NavMesh`] owns one static-geometry snapshot: the tile grid it was built
//! from, the unmerged and merged boundary graphs, and the constrained Delaunay
//! mesh. When the level geometry changes the whole mesh is rebuilt; there is no
//! incremental repair. [`NavMeshGraph`] is a cheap, copyable, read-only view
//! over the finished mesh that path queries borrow.
//!
//! # Examples
//!
//! ```rust
//! use navmesh::core::navmesh::{NavMesh, NavMeshOptions};
//! use navmesh::core::tile::TileGrid;
//! use navmesh::geometry::point::Point;
//!
//! let grid = TileGrid::parse("#####\n#...#\n#...#\n#####", 40).unwrap();
//! let nav = NavMesh::build_enclosing(&grid, NavMeshOptions::default()).unwrap();
//!
//! let graph = nav.graph();
//! let key = graph.triangle_containing(&Point::new(60.0, 60.0), None).unwrap();
//! assert!(graph.portals_of(key).len() <= 3);
//! ```

#![forbid(unsafe_code)]

use crate::core::boundary::BoundaryGraphBuilder;
use crate::core::collections::{SmallBuffer, VERTEX_DEGREE_BUFFER_SIZE};
use crate::core::edge::EdgeKey;
use crate::core::planar_graph::{PlanarGraph, PlanarGraphError};
use crate::core::tile::TileGrid;
use crate::core::triangle::{Triangle, TriangleKey, TrianglePosition};
use crate::core::triangulation::{ConstrainedDelaunayMesh, MeshError};
use crate::geometry::point::Point;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use thiserror::Error;

// =============================================================================
// OPTIONS AND ERRORS
// =============================================================================

/// Order in which boundary vertices and constraint edges are inserted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum InsertionOrder {
    /// Ascending point order, then ascending edge order. Fully deterministic.
    #[default]
    Input,
    /// A seeded shuffle of the vertices and of the edges.
    ///
    /// The triangle set may differ from [`InsertionOrder::Input`], the vertex
    /// and constraint sets do not.
    Shuffled {
        /// Shuffle seed.
        seed: u64,
    },
}

/// Options controlling [`NavMesh::build`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavMeshOptions {
    /// Vertex and constraint insertion order.
    pub insertion_order: InsertionOrder,
    /// Remove the dummy vertices and their faces after construction.
    pub remove_dummy: bool,
    /// Run the full validator on the finished mesh.
    pub validate: bool,
}

impl Default for NavMeshOptions {
    fn default() -> Self {
        Self {
            insertion_order: InsertionOrder::Input,
            remove_dummy: true,
            validate: false,
        }
    }
}

impl NavMeshOptions {
    /// Sets the insertion order.
    #[must_use]
    pub const fn with_insertion_order(mut self, insertion_order: InsertionOrder) -> Self {
        self.insertion_order = insertion_order;
        self
    }

    /// Sets whether the dummy triangle is stripped.
    #[must_use]
    pub const fn with_remove_dummy(mut self, remove_dummy: bool) -> Self {
        self.remove_dummy = remove_dummy;
        self
    }

    /// Sets whether the finished mesh is validated.
    #[must_use]
    pub const fn with_validation(mut self, validate: bool) -> Self {
        self.validate = validate;
        self
    }
}

/// Errors raised while building a [`NavMesh`].
#[derive(Clone, Debug, Error, PartialEq)]
pub enum NavMeshError {
    /// The triangulation rejected an operation.
    #[error(transparent)]
    Mesh(#[from] MeshError),
    /// The boundary graph could not be built.
    #[error(transparent)]
    Boundary(#[from] PlanarGraphError),
    /// A boundary vertex is not strictly inside the dummy triangle.
    #[error("dummy triangle {dummy} does not enclose boundary vertex {vertex}")]
    DummyDoesNotEnclose {
        /// The seed triangle.
        dummy: Triangle,
        /// First vertex found outside it.
        vertex: Point,
    },
}

// =============================================================================
// OWNING MESH
// =============================================================================

/// A navigation mesh built from one tile grid snapshot.
#[derive(Clone, Debug)]
pub struct NavMesh {
    grid: TileGrid,
    unmerged: PlanarGraph,
    boundary: PlanarGraph,
    mesh: ConstrainedDelaunayMesh,
    dummy: Triangle,
    options: NavMeshOptions,
}

impl NavMesh {
    /// Builds the mesh of `grid` seeded with `dummy`.
    ///
    /// # Errors
    ///
    /// - [`NavMeshError::DummyDoesNotEnclose`] if a boundary vertex is on or
    ///   outside `dummy`
    /// - [`NavMeshError::Mesh`] if triangulation or validation fails
    pub fn build(
        grid: &TileGrid,
        dummy: Triangle,
        options: NavMeshOptions,
    ) -> Result<Self, NavMeshError> {
        let builder = BoundaryGraphBuilder::new(grid);
        let unmerged = builder.build_unmerged()?;
        let boundary = BoundaryGraphBuilder::merge_collinear(unmerged.clone())?;
        let mesh = triangulate(&boundary, dummy, options)?;
        tracing::debug!(
            width = grid.width(),
            height = grid.height(),
            unmerged_edges = unmerged.edge_count(),
            vertices = boundary.vertex_count(),
            constraints = boundary.edge_count(),
            triangles = mesh.triangle_count(),
            "built navigation mesh"
        );
        Ok(Self {
            grid: grid.clone(),
            unmerged,
            boundary,
            mesh,
            dummy,
            options,
        })
    }

    /// Builds the mesh with a dummy triangle computed from the grid extent.
    ///
    /// # Errors
    ///
    /// Same as [`NavMesh::build`].
    pub fn build_enclosing(grid: &TileGrid, options: NavMeshOptions) -> Result<Self, NavMeshError> {
        Self::build(grid, enclosing_dummy(grid), options)
    }

    /// Read-only adjacency view for path queries.
    #[must_use]
    pub const fn graph(&self) -> NavMeshGraph<'_> {
        NavMeshGraph::new(&self.mesh)
    }

    /// The underlying triangulation.
    #[must_use]
    pub const fn mesh(&self) -> &ConstrainedDelaunayMesh {
        &self.mesh
    }

    /// The merged boundary graph whose edges are the mesh constraints.
    #[must_use]
    pub const fn boundary(&self) -> &PlanarGraph {
        &self.boundary
    }

    /// The boundary graph before collinear merging, one segment per tile side.
    #[must_use]
    pub const fn unmerged_boundary(&self) -> &PlanarGraph {
        &self.unmerged
    }

    /// The grid snapshot the mesh was built from.
    #[must_use]
    pub const fn grid(&self) -> &TileGrid {
        &self.grid
    }

    /// The seed triangle.
    #[must_use]
    pub const fn dummy(&self) -> Triangle {
        self.dummy
    }

    /// Options used for the build.
    #[must_use]
    pub const fn options(&self) -> NavMeshOptions {
        self.options
    }

    /// Returns `true` if `grid` differs from the snapshot in traversability.
    #[must_use]
    pub fn is_stale(&self, grid: &TileGrid) -> bool {
        !self.grid.same_geometry(grid)
    }

    /// Discards the mesh and builds a new one from `grid` if it is stale.
    ///
    /// Returns whether a rebuild happened. The dummy is recomputed when the
    /// grid size changed. On error the old mesh is kept.
    ///
    /// # Errors
    ///
    /// Same as [`NavMesh::build`].
    pub fn rebuild(&mut self, grid: &TileGrid) -> Result<bool, NavMeshError> {
        if !self.is_stale(grid) {
            self.grid = grid.clone();
            return Ok(false);
        }
        let dummy = if (grid.width(), grid.height()) == (self.grid.width(), self.grid.height()) {
            self.dummy
        } else {
            enclosing_dummy(grid)
        };
        *self = Self::build(grid, dummy, self.options)?;
        Ok(true)
    }
}

/// Builds a navigation mesh from `grid`.
///
/// # Errors
///
/// Same as [`NavMesh::build`].
pub fn build_nav_mesh(
    grid: &TileGrid,
    dummy: Triangle,
    remove_dummy: bool,
) -> Result<NavMesh, NavMeshError> {
    NavMesh::build(
        grid,
        dummy,
        NavMeshOptions::default().with_remove_dummy(remove_dummy),
    )
}

fn enclosing_dummy(grid: &TileGrid) -> Triangle {
    let max = grid.tile_origin(grid.width(), grid.height());
    Triangle::enclosing(Point::new(0.0, 0.0), max)
}

fn triangulate(
    boundary: &PlanarGraph,
    dummy: Triangle,
    options: NavMeshOptions,
) -> Result<ConstrainedDelaunayMesh, NavMeshError> {
    if let Some(vertex) = boundary
        .vertices()
        .find(|v| dummy.position(v) != TrianglePosition::Inside)
    {
        return Err(NavMeshError::DummyDoesNotEnclose { dummy, vertex });
    }

    let mut vertices: Vec<Point> = boundary.vertices().collect();
    let mut edges: Vec<EdgeKey> = boundary.edges().collect();
    if let InsertionOrder::Shuffled { seed } = options.insertion_order {
        let mut rng = StdRng::seed_from_u64(seed);
        vertices.shuffle(&mut rng);
        edges.shuffle(&mut rng);
    }

    let mut mesh = ConstrainedDelaunayMesh::new();
    mesh.seed(dummy)?;
    let mut flips = 0;
    for vertex in vertices {
        flips += mesh.add_vertex(vertex)?.flips_performed;
    }
    tracing::debug!(
        vertices = mesh.vertex_count(),
        triangles = mesh.triangle_count(),
        flips,
        "inserted boundary vertices"
    );
    for edge in edges {
        let (a, b) = edge.endpoints();
        mesh.add_constraint_edge(a, b)?;
    }

    if options.remove_dummy {
        mesh.finalize()?;
    } else {
        mesh.seal()?;
    }
    if options.validate {
        mesh.validate()?;
    }
    Ok(mesh)
}

// =============================================================================
// ADJACENCY VIEW
// =============================================================================

/// Read-only triangle adjacency over a finished mesh.
///
/// Constrained edges separate traversable from blocked space and are never
/// portals.
#[derive(Clone, Copy, Debug)]
pub struct NavMeshGraph<'a> {
    mesh: &'a ConstrainedDelaunayMesh,
}

impl<'a> NavMeshGraph<'a> {
    /// Wraps `mesh`.
    #[must_use]
    pub const fn new(mesh: &'a ConstrainedDelaunayMesh) -> Self {
        Self { mesh }
    }

    /// The underlying triangulation.
    #[must_use]
    pub const fn mesh(&self) -> &'a ConstrainedDelaunayMesh {
        self.mesh
    }

    /// Every face containing `point`, best connected first.
    ///
    /// Faces with more portals come first and ties keep key order, so a point
    /// on a wall lists the traversable side before the blocked one.
    #[must_use]
    pub fn triangles_containing(
        &self,
        point: &Point,
    ) -> SmallBuffer<TriangleKey, VERTEX_DEGREE_BUFFER_SIZE> {
        let mut candidates = self.mesh.find_containing_triangles(point);
        candidates.sort_by_key(|&key| Reverse(self.portals_of(key).len()));
        candidates
    }

    /// The face containing `point`.
    ///
    /// On a shared edge or vertex several faces qualify: `prefer` wins if it is
    /// one of them, otherwise the first of [`Self::triangles_containing`].
    #[must_use]
    pub fn triangle_containing(
        &self,
        point: &Point,
        prefer: Option<TriangleKey>,
    ) -> Option<TriangleKey> {
        let candidates = self.triangles_containing(point);
        if let Some(key) = prefer.filter(|key| candidates.contains(key)) {
            return Some(key);
        }
        candidates.first().copied()
    }

    /// Face by key.
    #[must_use]
    pub fn triangle(&self, key: TriangleKey) -> Option<&'a Triangle> {
        self.mesh.triangle(key)
    }

    /// Sides of `key` shared with a neighbouring face and not constrained.
    #[must_use]
    pub fn portals_of(&self, key: TriangleKey) -> SmallBuffer<EdgeKey, 3> {
        self.mesh
            .triangle(key)
            .map(|triangle| {
                triangle
                    .edges()
                    .into_iter()
                    .filter(|&edge| self.is_portal(edge))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// The face across `portal` from `key`, if `portal` is a portal of `key`.
    #[must_use]
    pub fn neighbor_across(&self, key: TriangleKey, portal: EdgeKey) -> Option<TriangleKey> {
        if self.mesh.is_constrained(portal) {
            return None;
        }
        self.mesh.neighbor_across(key, portal)
    }

    /// Neighbouring faces reachable through a portal, with that portal.
    #[must_use]
    pub fn neighbors(&self, key: TriangleKey) -> SmallBuffer<(EdgeKey, TriangleKey), 3> {
        self.portals_of(key)
            .into_iter()
            .filter_map(|portal| {
                self.neighbor_across(key, portal)
                    .map(|neighbor| (portal, neighbor))
            })
            .collect()
    }

    fn is_portal(&self, edge: EdgeKey) -> bool {
        self.mesh.faces_of_edge(edge).len() == 2 && !self.mesh.is_constrained(edge)
    }
}

impl<'a> From<&'a NavMesh> for NavMeshGraph<'a> {
    fn from(nav: &'a NavMesh) -> Self {
        nav.graph()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::tile::TileKind;

    fn p(x: f64, y: f64) -> Point {
        Point::new(x, y)
    }

    const ROOM: &str = "\
#######
#.....#
#.###.#
#.....#
#######";

    fn room() -> TileGrid {
        TileGrid::parse(ROOM, 40).unwrap()
    }

    #[test]
    fn options_builders_and_serde() {
        let options = NavMeshOptions::default()
            .with_insertion_order(InsertionOrder::Shuffled { seed: 7 })
            .with_remove_dummy(false)
            .with_validation(true);
        assert!(!options.remove_dummy);
        assert!(options.validate);
        let json = serde_json::to_string(&options).unwrap();
        let back: NavMeshOptions = serde_json::from_str(&json).unwrap();
        assert_eq!(back, options);
    }

    #[test]
    fn build_keeps_constraints_and_boundary() {
        let grid = room();
        let nav = NavMesh::build_enclosing(&grid, NavMeshOptions::default().with_validation(true))
            .unwrap();
        for edge in nav.boundary().edges() {
            assert!(nav.mesh().is_constrained(edge), "{edge} not constrained");
            assert!(nav.mesh().has_edge(edge), "{edge} missing");
        }
        assert!(nav.unmerged_boundary().edge_count() > nav.boundary().edge_count());
        assert!(nav.mesh().dummy().is_some());
        for v in nav.dummy().vertices() {
            assert!(!nav.mesh().graph().contains_vertex(&v));
        }
    }

    #[test]
    fn dummy_must_enclose_boundary() {
        let grid = room();
        let small = Triangle::new(p(0.0, 0.0), p(100.0, 0.0), p(0.0, 100.0)).unwrap();
        let result = NavMesh::build(&grid, small, NavMeshOptions::default());
        assert!(matches!(result, Err(NavMeshError::DummyDoesNotEnclose { .. })));
    }

    #[test]
    fn keeping_the_dummy_leaves_it_in_the_mesh() {
        let grid = room();
        let dummy = Triangle::enclosing(p(0.0, 0.0), p(280.0, 200.0));
        let nav = build_nav_mesh(&grid, dummy, false).unwrap();
        for v in dummy.vertices() {
            assert!(nav.mesh().graph().contains_vertex(&v));
        }
        assert!(nav.graph().triangle_containing(&dummy.centroid(), None).is_some());
    }

    #[test]
    fn walls_are_not_portals() {
        let grid = room();
        let nav = NavMesh::build_enclosing(&grid, NavMeshOptions::default()).unwrap();
        let graph = nav.graph();
        for (key, _) in nav.mesh().triangles() {
            for portal in graph.portals_of(key) {
                assert!(!nav.mesh().is_constrained(portal));
                let neighbor = graph.neighbor_across(key, portal).unwrap();
                assert!(graph.portals_of(neighbor).contains(&portal));
            }
        }
        for edge in nav.boundary().edges() {
            for &key in nav.mesh().faces_of_edge(edge) {
                assert_eq!(graph.neighbor_across(key, edge), None);
            }
        }
    }

    #[test]
    fn containing_triangle_prefers_hint() {
        let grid = room();
        let nav = NavMesh::build_enclosing(&grid, NavMeshOptions::default()).unwrap();
        let graph = nav.graph();
        let (edge, faces) = nav
            .mesh()
            .edges()
            .find(|(edge, faces)| faces.len() == 2 && !nav.mesh().is_constrained(*edge))
            .unwrap();
        let mid = edge.midpoint();
        let best = faces
            .iter()
            .copied()
            .max_by_key(|&key| (graph.portals_of(key).len(), Reverse(key)));
        assert_eq!(graph.triangle_containing(&mid, None), best);
        assert_eq!(graph.triangle_containing(&mid, Some(faces[1])), Some(faces[1]));
        assert_eq!(graph.triangle_containing(&p(-500.0, -500.0), None), None);
    }

    #[test]
    fn wall_edge_candidates_list_the_floor_side_first() {
        let nav = NavMesh::build_enclosing(&room(), NavMeshOptions::default()).unwrap();
        let graph = nav.graph();
        // Bottom side of the central block.
        let candidates = graph.triangles_containing(&p(140.0, 120.0));
        assert_eq!(candidates.len(), 2);
        let portals: Vec<usize> = candidates.iter().map(|&k| graph.portals_of(k).len()).collect();
        assert!(portals[0] >= portals[1], "{portals:?}");
        assert_eq!(graph.triangle_containing(&p(140.0, 120.0), None), Some(candidates[0]));
        assert_eq!(
            graph.triangle_containing(&p(140.0, 120.0), Some(candidates[1])),
            Some(candidates[1])
        );
    }

    #[test]
    fn shuffled_order_keeps_vertices_and_constraints() {
        let grid = room();
        let ordered = NavMesh::build_enclosing(&grid, NavMeshOptions::default()).unwrap();
        let shuffled = NavMesh::build_enclosing(
            &grid,
            NavMeshOptions::default().with_insertion_order(InsertionOrder::Shuffled { seed: 42 }),
        )
        .unwrap();
        let mut a: Vec<_> = ordered.mesh().vertices().collect();
        let mut b: Vec<_> = shuffled.mesh().vertices().collect();
        a.sort();
        b.sort();
        assert_eq!(a, b);
        assert!(ordered.mesh().constraints().eq(shuffled.mesh().constraints()));
        shuffled.mesh().validate().unwrap();
    }

    #[test]
    fn rebuild_only_when_geometry_changes() {
        let mut grid = room();
        let mut nav = NavMesh::build_enclosing(&grid, NavMeshOptions::default()).unwrap();
        assert!(!nav.rebuild(&grid).unwrap());

        grid.set_kind(3, 2, TileKind::Floor);
        assert!(nav.is_stale(&grid));
        assert!(nav.rebuild(&grid).unwrap());
        assert!(!nav.is_stale(&grid));
        assert!(nav.graph().triangle_containing(&p(140.0, 100.0), None).is_some());
    }

    #[test]
    fn all_wall_grid_has_no_faces() {
        let grid = TileGrid::parse("###\n###", 40).unwrap();
        let nav = NavMesh::build_enclosing(&grid, NavMeshOptions::default()).unwrap();
        assert!(nav.boundary().is_empty());
        assert_eq!(nav.mesh().triangle_count(), 0);
    }
}
