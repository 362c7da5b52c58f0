//! # navmesh
//!
//! Navigation meshes for 2D tile worlds, built on an incremental constrained
//! Delaunay triangulation.
//!
//! # Pipeline
//!
//! 1. A [`TileGrid`](core::tile::TileGrid) snapshot classifies every tile
//!    through a closed set of [`TileKind`](core::tile::TileKind)s.
//! 2. [`BoundaryGraphBuilder`](core::boundary::BoundaryGraphBuilder) traces the
//!    frontier of traversable space as unit wall segments, then merges
//!    collinear chains.
//! 3. [`ConstrainedDelaunayMesh`](core::triangulation::ConstrainedDelaunayMesh)
//!    triangulates the boundary vertices inside a dummy triangle and enforces
//!    every boundary edge as a constraint.
//! 4. [`NavMeshGraph`](core::navmesh::NavMeshGraph) exposes the triangle
//!    adjacency; walls are never portals.
//! 5. [`PathPlanner`](core::algorithms::astar::PathPlanner) runs A* over
//!    triangles and [`FunnelSmoother`](core::algorithms::funnel::FunnelSmoother)
//!    pulls the corridor taut, keeping corners clear of walls.
//!
//! # Basic Usage
//!
//! ```rust
//! use navmesh::prelude::*;
//!
//! let grid = TileGrid::parse(
//!     "########\n#......#\n#.####.#\n#......#\n########",
//!     40,
//! )
//! .unwrap();
//!
//! let nav = NavMesh::build_enclosing(&grid, NavMeshOptions::default()).unwrap();
//! assert!(nav.mesh().validate().is_ok());
//!
//! let start = grid.tile_center(1, 1);
//! let goal = grid.tile_center(6, 3);
//! let path = find_path(nav.graph(), start, goal, &PlannerOptions::default()).unwrap();
//! assert_eq!(path.first(), Some(&start));
//! assert_eq!(path.last(), Some(&goal));
//!
//! let waypoints = points_along_path(&path, DEFAULT_GRANULARITY);
//! assert!(waypoints.len() >= path.len());
//! ```
//!
//! # Numerical robustness
//!
//! Mesh vertices are tile corners, so they are integral. Orientation and
//! in-circle tests use a floating-point filter and fall back to exact integer
//! arithmetic when the filter cannot decide, which makes every triangulation
//! decision exact for such inputs.

// Forbid unsafe code throughout the entire crate
#![forbid(unsafe_code)]

/// Mesh data structures, construction and path queries.
pub mod core {
    /// Triangulation and path-search algorithms.
    pub mod algorithms {
        /// A* search over triangles
        pub mod astar;
        /// Constraint edge enforcement
        pub mod constrained_insertion;
        /// Edge flips and Delaunay legalization
        pub mod flips;
        /// Funnel path smoothing
        pub mod funnel;
        /// Point location (triangle walking)
        pub mod locate;
    }
    pub mod boundary;
    /// Collection aliases used throughout the crate
    pub mod collections;
    pub mod edge;
    pub mod navmesh;
    pub mod path;
    pub mod planar_graph;
    pub mod tile;
    pub mod triangle;
    pub mod triangulation;
}

/// Points and geometric predicates.
pub mod geometry {
    pub mod point;
    pub mod predicates;
    pub use point::*;
    pub use predicates::*;
}

/// A prelude module that re-exports commonly used types.
pub mod prelude {
    pub use crate::core::algorithms::astar::{
        Corridor, DEFAULT_CLEARANCE, PathPlanner, PlannerOptions, Polypoint, PolypointState,
    };
    pub use crate::core::algorithms::funnel::{
        FunnelSmoother, Portal, get_clearance_point, string_pull,
    };
    pub use crate::core::algorithms::locate::LocateResult;
    pub use crate::core::boundary::BoundaryGraphBuilder;
    pub use crate::core::edge::EdgeKey;
    pub use crate::core::navmesh::{
        InsertionOrder, NavMesh, NavMeshError, NavMeshGraph, NavMeshOptions, build_nav_mesh,
    };
    pub use crate::core::path::{DEFAULT_GRANULARITY, PathError, find_path, points_along_path};
    pub use crate::core::planar_graph::{PlanarGraph, PlanarGraphError};
    pub use crate::core::tile::{
        AngledWallOrientation, DEFAULT_PIXELS_PER_TILE, GateState, MutableTile, TileGrid,
        TileGridError, TileKind, TileProperties,
    };
    pub use crate::core::triangle::{Triangle, TriangleError, TriangleKey, TrianglePosition};
    pub use crate::core::triangulation::{ConstrainedDelaunayMesh, MeshError, MeshState};

    // Collection aliases
    pub use crate::core::collections::{
        FastHashMap, FastHashSet, SmallBuffer, fast_hash_map_with_capacity,
        fast_hash_set_with_capacity,
    };

    pub use crate::geometry::point::Point;
    pub use crate::geometry::predicates::{InCircle, Orientation, incircle, orientation};
}

/// The function `is_normal` checks that structs implement `auto` traits.
/// Traits are checked at compile time, so this function is only used for
/// testing.
#[must_use]
pub const fn is_normal<T: Sized + Send + Sync + Unpin>() -> bool {
    true
}

// =============================================================================
// TESTS
// =============================================================================
