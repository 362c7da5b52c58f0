//! Property-based tests over random tile grids.
//!
//! This module uses proptest to verify:
//! - Constrained Delaunay legality and constraint preservation after a build
//! - Containment totality for points strictly inside floor tiles
//! - Build determinism and insertion-order independence of the vertex set
//! - Funnel idempotence on planned paths

use navmesh::core::algorithms::funnel::{Portal, string_pull};
use navmesh::geometry::predicates::point_on_segment;
use navmesh::prelude::*;
use proptest::prelude::*;

// =============================================================================
// TEST CONFIGURATION
// =============================================================================

const WIDTH: usize = 7;
const HEIGHT: usize = 6;

/// Interior tile symbols; walls and floor only.
fn plain_tile() -> impl Strategy<Value = char> {
    prop_oneof![3 => Just('.'), 1 => Just('#')]
}

/// Interior tile symbols including the four angled walls.
fn any_tile() -> impl Strategy<Value = char> {
    prop_oneof![
        8 => Just('.'),
        3 => Just('#'),
        1 => Just('9'),
        1 => Just('3'),
        1 => Just('1'),
        1 => Just('7'),
    ]
}

/// A walled grid with random interior tiles.
fn grid_from(interior: &[char]) -> TileGrid {
    let mut text = String::new();
    for y in 0..HEIGHT + 2 {
        for x in 0..WIDTH + 2 {
            let border = x == 0 || y == 0 || x == WIDTH + 1 || y == HEIGHT + 1;
            text.push(if border {
                '#'
            } else {
                interior[(y - 1) * WIDTH + (x - 1)]
            });
        }
        text.push('\n');
    }
    TileGrid::parse(text.trim_end(), DEFAULT_PIXELS_PER_TILE).unwrap()
}

fn plain_grid() -> impl Strategy<Value = TileGrid> {
    prop::collection::vec(plain_tile(), WIDTH * HEIGHT).prop_map(|tiles| grid_from(&tiles))
}

fn angled_grid() -> impl Strategy<Value = TileGrid> {
    prop::collection::vec(any_tile(), WIDTH * HEIGHT).prop_map(|tiles| grid_from(&tiles))
}

fn floor_tiles(grid: &TileGrid) -> Vec<(usize, usize)> {
    grid.iter()
        .filter(|(_, _, kind)| kind.is_traversable())
        .map(|(x, y, _)| (x, y))
        .collect()
}

// =============================================================================
// PROPERTIES
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    /// Property: a finished mesh is constrained Delaunay and keeps every wall
    #[test]
    fn prop_build_is_valid(grid in plain_grid()) {
        let nav = NavMesh::build_enclosing(&grid, NavMeshOptions::default()).unwrap();
        prop_assert!(nav.mesh().validate().is_ok());
        for edge in nav.boundary().edges() {
            prop_assert!(nav.mesh().is_constrained(edge), "{} not constrained", edge);
        }
    }

    /// Property: angled walls never break construction
    #[test]
    fn prop_angled_build_is_valid(grid in angled_grid()) {
        let nav = NavMesh::build_enclosing(&grid, NavMeshOptions::default()).unwrap();
        prop_assert!(nav.mesh().validate().is_ok(), "{}", grid);
        prop_assert_eq!(nav.mesh().constraints().count(), nav.boundary().edge_count());
    }

    /// Property: a point strictly inside a floor tile and off every mesh edge
    /// lies in exactly one triangle
    #[test]
    fn prop_containment_totality(
        grid in plain_grid(),
        pick in any::<prop::sample::Index>(),
        dx in -19.0..19.0_f64,
        dy in -19.0..19.0_f64,
    ) {
        let floor = floor_tiles(&grid);
        prop_assume!(!floor.is_empty());
        let nav = NavMesh::build_enclosing(&grid, NavMeshOptions::default()).unwrap();

        let (x, y) = floor[pick.index(floor.len())];
        let point = grid.tile_center(x, y).offset(dx, dy);
        let on_edge = nav
            .mesh()
            .edges()
            .any(|(edge, _)| point_on_segment(&edge.v0(), &edge.v1(), &point));
        let count = nav.mesh().find_containing_triangles(&point).len();
        if on_edge {
            prop_assert!(count >= 2);
        } else {
            prop_assert_eq!(count, 1);
        }
    }

    /// Property: building twice yields the same triangles, and shuffled
    /// insertion keeps the vertices and constraints
    #[test]
    fn prop_round_trip(grid in plain_grid(), seed in any::<u64>()) {
        let first = NavMesh::build_enclosing(&grid, NavMeshOptions::default()).unwrap();
        let second = NavMesh::build_enclosing(&grid, NavMeshOptions::default()).unwrap();
        let mut a: Vec<Triangle> = first.mesh().triangles().map(|(_, t)| *t).collect();
        let mut b: Vec<Triangle> = second.mesh().triangles().map(|(_, t)| *t).collect();
        a.sort();
        b.sort();
        prop_assert_eq!(a, b);

        let shuffled = NavMesh::build_enclosing(
            &grid,
            NavMeshOptions::default().with_insertion_order(InsertionOrder::Shuffled { seed }),
        )
        .unwrap();
        let mut va: Vec<Point> = first.mesh().vertices().collect();
        let mut vb: Vec<Point> = shuffled.mesh().vertices().collect();
        va.sort();
        vb.sort();
        prop_assert_eq!(va, vb);
        prop_assert!(first.mesh().constraints().eq(shuffled.mesh().constraints()));
        prop_assert!(shuffled.mesh().validate().is_ok());
    }

    /// Property: re-pulling a planned path through its own points changes nothing
    #[test]
    fn prop_funnel_idempotent(
        grid in plain_grid(),
        from in any::<prop::sample::Index>(),
        to in any::<prop::sample::Index>(),
    ) {
        let floor = floor_tiles(&grid);
        prop_assume!(!floor.is_empty());
        let nav = NavMesh::build_enclosing(&grid, NavMeshOptions::default()).unwrap();
        let (sx, sy) = floor[from.index(floor.len())];
        let (gx, gy) = floor[to.index(floor.len())];
        let options = PlannerOptions::default().with_clearance(0.0);

        match find_path(nav.graph(), grid.tile_center(sx, sy), grid.tile_center(gx, gy), &options) {
            Ok(path) => {
                let portals: Vec<Portal> = path.iter().copied().map(Portal::point).collect();
                prop_assert_eq!(string_pull(&portals), path);
            }
            Err(err) => prop_assert!(err.is_no_path(), "{}", err),
        }
    }
}
