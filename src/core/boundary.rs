//! Extraction of the traversability frontier from a tile grid.
//!
//! [`BoundaryGraphBuilder::build_unmerged`] walks every tile on the frontier of
//! traversable space and emits one unit segment per walled side (or one
//! diagonal for an angled wall). [`BoundaryGraphBuilder::merge_collinear`] then
//! fuses chains of collinear segments, so a straight corridor wall becomes a
//! single edge. The merged graph seeds the triangulation: its vertices are the
//! mesh vertices and its edges become constraints.
//!
//! Angled walls are solid on one triangular half. A neighbouring angled wall
//! counts as open on the side its open half faces, and an angled wall tile
//! takes part in the frontier only when a traversable tile touches one of its
//! open sides.

#![forbid(unsafe_code)]

use crate::core::planar_graph::{PlanarGraph, PlanarGraphError};
use crate::core::tile::{AngledWallOrientation, TileGrid};
use crate::geometry::point::Point;
use crate::geometry::predicates::{strictly_between, three_points_in_line};

/// Builds boundary graphs from a [`TileGrid`].
///
/// # Examples
///
/// ```rust
/// use navmesh::core::boundary::BoundaryGraphBuilder;
/// use navmesh::core::tile::TileGrid;
///
/// let grid = TileGrid::parse("######\n#....#\n#....#\n######", 40).unwrap();
/// let builder = BoundaryGraphBuilder::new(&grid);
/// let unmerged = builder.build_unmerged().unwrap();
/// assert_eq!(unmerged.edge_count(), 12);
/// let merged = BoundaryGraphBuilder::merge_collinear(unmerged).unwrap();
/// assert_eq!((merged.vertex_count(), merged.edge_count()), (4, 4));
/// ```
#[derive(Clone, Copy, Debug)]
pub struct BoundaryGraphBuilder<'a> {
    grid: &'a TileGrid,
}

impl<'a> BoundaryGraphBuilder<'a> {
    /// Creates a builder over `grid`.
    #[must_use]
    pub const fn new(grid: &'a TileGrid) -> Self {
        Self { grid }
    }

    // =========================================================================
    // NEIGHBOUR RULES
    // =========================================================================

    fn wall_on_left(&self, x: usize, y: usize) -> bool {
        if x == 0 {
            return true;
        }
        match self.grid.kind(x - 1, y) {
            Some(kind) if kind.angled_wall().is_some_and(|o| o.faces_right()) => false,
            Some(kind) => !kind.is_traversable(),
            None => true,
        }
    }

    fn wall_on_right(&self, x: usize, y: usize) -> bool {
        match self.grid.kind(x + 1, y) {
            Some(kind) if kind.angled_wall().is_some_and(|o| o.faces_left()) => false,
            Some(kind) => !kind.is_traversable(),
            None => true,
        }
    }

    fn wall_on_top(&self, x: usize, y: usize) -> bool {
        if y == 0 {
            return true;
        }
        match self.grid.kind(x, y - 1) {
            Some(kind) if kind.angled_wall().is_some_and(|o| o.faces_down()) => false,
            Some(kind) => !kind.is_traversable(),
            None => true,
        }
    }

    fn wall_on_bottom(&self, x: usize, y: usize) -> bool {
        match self.grid.kind(x, y + 1) {
            Some(kind) if kind.angled_wall().is_some_and(|o| o.faces_up()) => false,
            Some(kind) => !kind.is_traversable(),
            None => true,
        }
    }

    /// An angled wall is on the frontier if a traversable tile touches one of
    /// its open sides.
    fn angled_wall_on_frontier(&self, x: usize, y: usize) -> bool {
        let Some(o) = self.grid.angled_wall(x, y) else {
            return false;
        };
        (o.faces_up() && y > 0 && self.grid.is_traversable(x, y - 1))
            || (o.faces_down() && self.grid.is_traversable(x, y + 1))
            || (o.faces_left() && x > 0 && self.grid.is_traversable(x - 1, y))
            || (o.faces_right() && self.grid.is_traversable(x + 1, y))
    }

    /// Tiles on the frontier of traversable space, in column-major order.
    ///
    /// These are traversable tiles with a wall or the grid edge on some side,
    /// plus angled walls whose open half touches traversable space.
    #[must_use]
    pub fn edge_tiles(&self) -> Vec<(usize, usize)> {
        self.grid
            .iter()
            .filter(|&(x, y, kind)| {
                if kind.angled_wall().is_some() {
                    self.angled_wall_on_frontier(x, y)
                } else {
                    kind.is_traversable()
                        && (self.wall_on_left(x, y)
                            || self.wall_on_right(x, y)
                            || self.wall_on_top(x, y)
                            || self.wall_on_bottom(x, y))
                }
            })
            .map(|(x, y, _)| (x, y))
            .collect()
    }

    // =========================================================================
    // GRAPH CONSTRUCTION
    // =========================================================================

    /// Unit-length boundary segments along the frontier.
    ///
    /// # Errors
    ///
    /// Propagates [`PlanarGraphError`] from edge insertion; endpoints are always
    /// added first, so this only fails on an internal logic error.
    pub fn build_unmerged(&self) -> Result<PlanarGraph, PlanarGraphError> {
        let mut graph = PlanarGraph::new();
        let mut segment = |a: Point, b: Point| -> Result<(), PlanarGraphError> {
            graph.add_vertex(a);
            graph.add_vertex(b);
            graph.add_edge(a, b).map(|_| ())
        };

        let edge_tiles = self.edge_tiles();
        for &(x, y) in &edge_tiles {
            let top_left = self.grid.tile_origin(x, y);
            let top_right = self.grid.tile_origin(x + 1, y);
            let bottom_left = self.grid.tile_origin(x, y + 1);
            let bottom_right = self.grid.tile_origin(x + 1, y + 1);
            let angled = self.grid.angled_wall(x, y);

            match angled {
                Some(o) if o.descending_diagonal() => segment(top_left, bottom_right)?,
                Some(_) => segment(bottom_left, top_right)?,
                None => {}
            }

            // Sides of an angled wall are walled only where its open half reaches.
            let open = |faces: fn(AngledWallOrientation) -> bool| angled.is_none_or(faces);
            if self.wall_on_left(x, y) && open(AngledWallOrientation::faces_left) {
                segment(top_left, bottom_left)?;
            }
            if self.wall_on_right(x, y) && open(AngledWallOrientation::faces_right) {
                segment(top_right, bottom_right)?;
            }
            if self.wall_on_top(x, y) && open(AngledWallOrientation::faces_up) {
                segment(top_left, top_right)?;
            }
            if self.wall_on_bottom(x, y) && open(AngledWallOrientation::faces_down) {
                segment(bottom_left, bottom_right)?;
            }
        }

        tracing::debug!(
            edge_tiles = edge_tiles.len(),
            vertices = graph.vertex_count(),
            edges = graph.edge_count(),
            "built unmerged boundary graph"
        );
        Ok(graph)
    }

    /// Fuses chains of collinear segments into single edges.
    ///
    /// A vertex is removed when it has exactly two neighbours that lie on one
    /// line through it, on opposite sides. Junction vertices are kept, so merged
    /// edges never pass through another boundary vertex. Repeats until no vertex
    /// qualifies, then drops the vertices left without edges.
    ///
    /// # Errors
    ///
    /// Propagates [`PlanarGraphError`] from edge insertion.
    pub fn merge_collinear(mut graph: PlanarGraph) -> Result<PlanarGraph, PlanarGraphError> {
        let mut merged = 0_usize;
        loop {
            let candidates: Vec<(Point, Point, Point)> = graph
                .vertices()
                .filter(|v| graph.degree(v) == 2)
                .filter_map(|v| {
                    let mut neighbors = graph.neighbors(&v);
                    let (a, b) = (neighbors.next()?, neighbors.next()?);
                    (three_points_in_line(&a, &v, &b) && strictly_between(&a, &b, &v))
                        .then_some((a, v, b))
                })
                .collect();

            let mut changed = false;
            for (a, v, b) in candidates {
                // An earlier merge in this pass may have rewired the vertex.
                if !(graph.contains_edge(&a, &v) && graph.contains_edge(&v, &b)) {
                    continue;
                }
                graph.remove_edge(&v, &a);
                graph.remove_edge(&v, &b);
                graph.add_edge(a, b)?;
                merged += 1;
                changed = true;
            }
            if !changed {
                break;
            }
        }
        let dropped = graph.remove_isolated_vertices();

        tracing::debug!(
            merged,
            dropped,
            vertices = graph.vertex_count(),
            edges = graph.edge_count(),
            "merged collinear boundary segments"
        );
        Ok(graph)
    }

    /// Unmerged extraction followed by the collinear merge.
    ///
    /// # Errors
    ///
    /// Propagates [`PlanarGraphError`].
    pub fn build(&self) -> Result<PlanarGraph, PlanarGraphError> {
        Self::merge_collinear(self.build_unmerged()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: f64, y: f64) -> Point {
        Point::new(x, y)
    }

    fn grid(text: &str) -> TileGrid {
        TileGrid::parse(text, 40).unwrap()
    }

    #[test]
    fn edge_tiles_skip_interior() {
        let rows = [
            "00000000000",
            "01001111110",
            "01101001110",
            "01101001110",
            "01101111110",
            "00000000000",
        ];
        let text = rows.join("\n").replace('0', "#").replace('1', ".");
        let g = grid(&text);
        let tiles = BoundaryGraphBuilder::new(&g).edge_tiles();

        let traversable = g.iter().filter(|(_, _, k)| k.is_traversable()).count();
        assert_eq!(tiles.len(), traversable - 2);
        assert!(!tiles.contains(&(8, 2)));
        assert!(!tiles.contains(&(8, 3)));
        assert!(tiles.contains(&(9, 2)));
    }

    #[test]
    fn single_tile_is_a_square() {
        let g = grid("###\n#.#\n###");
        let merged = BoundaryGraphBuilder::new(&g).build().unwrap();
        let vertices: Vec<_> = merged.vertices().collect();
        assert_eq!(
            vertices,
            vec![p(40.0, 40.0), p(40.0, 80.0), p(80.0, 40.0), p(80.0, 80.0)]
        );
        assert_eq!(merged.edge_count(), 4);
        assert!(!merged.contains_edge(&p(40.0, 40.0), &p(80.0, 80.0)));
    }

    #[test]
    fn grid_edge_counts_as_wall() {
        let g = grid("..");
        let merged = BoundaryGraphBuilder::new(&g).build().unwrap();
        assert_eq!(merged.vertex_count(), 4);
        assert!(merged.contains_edge(&p(0.0, 0.0), &p(80.0, 0.0)));
        assert!(merged.contains_edge(&p(0.0, 40.0), &p(80.0, 40.0)));
        assert!(merged.contains_edge(&p(80.0, 0.0), &p(80.0, 40.0)));
    }

    #[test]
    fn angled_wall_contributes_its_diagonal() {
        let g = grid("####\n#.1#\n####");
        let builder = BoundaryGraphBuilder::new(&g);
        assert_eq!(builder.edge_tiles(), vec![(1, 1), (2, 1)]);

        let unmerged = builder.build_unmerged().unwrap();
        assert!(unmerged.contains_edge(&p(80.0, 40.0), &p(120.0, 80.0)));
        assert!(unmerged.contains_edge(&p(80.0, 80.0), &p(120.0, 80.0)));
        assert!(!unmerged.contains_edge(&p(80.0, 40.0), &p(80.0, 80.0)));

        let merged = BoundaryGraphBuilder::merge_collinear(unmerged).unwrap();
        let vertices: Vec<_> = merged.vertices().collect();
        assert_eq!(
            vertices,
            vec![p(40.0, 40.0), p(40.0, 80.0), p(80.0, 40.0), p(120.0, 80.0)]
        );
        assert!(merged.contains_edge(&p(40.0, 80.0), &p(120.0, 80.0)));
    }

    #[test]
    fn enclosed_angled_wall_is_not_frontier() {
        let g = grid("####\n#.9#\n####");
        let builder = BoundaryGraphBuilder::new(&g);
        assert_eq!(builder.edge_tiles(), vec![(1, 1)]);
        let merged = builder.build().unwrap();
        assert_eq!((merged.vertex_count(), merged.edge_count()), (4, 4));
    }

    #[test]
    fn diagonal_contact_keeps_junction() {
        let g = grid("####\n#.##\n##.#\n####");
        let merged = BoundaryGraphBuilder::new(&g).build().unwrap();
        assert_eq!(merged.degree(&p(80.0, 80.0)), 4);
        assert_eq!(merged.vertex_count(), 7);
        assert_eq!(merged.edge_count(), 8);
    }

    #[test]
    fn staircase_diagonals_merge() {
        let g = grid("#####\n#.1##\n#..1#\n#####");
        let merged = BoundaryGraphBuilder::new(&g).build().unwrap();
        assert!(merged.contains_edge(&p(80.0, 40.0), &p(160.0, 120.0)));
        assert!(!merged.contains_vertex(&p(120.0, 80.0)));
    }
}
