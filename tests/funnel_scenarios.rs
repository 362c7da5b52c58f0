//! Funnel smoothing over fixed triangle corridors.
//!
//! The corridors are hand-built triangle strips in screen coordinates (y grows
//! downwards), independent of any mesh construction.

#![forbid(unsafe_code)]

use approx::assert_relative_eq;
use navmesh::core::algorithms::funnel::{
    FunnelSmoother, Portal, corridor_portals, get_clearance_point, string_pull,
};
use navmesh::core::triangle::Triangle;
use navmesh::geometry::point::Point;

fn init_tracing() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

fn p(x: f64, y: f64) -> Point {
    Point::new(x, y)
}

fn tri(a: (f64, f64), b: (f64, f64), c: (f64, f64)) -> Triangle {
    Triangle::new(a.into(), b.into(), c.into()).unwrap()
}

// =============================================================================
// CORRIDORS
// =============================================================================

/// A zig-zag strip where consecutive triangles share two of their points.
fn zig_zag() -> Vec<Triangle> {
    let strip = [
        (35.0, 75.0),
        (107.0, 57.0),
        (39.0, 132.0),
        (95.0, 130.0),
        (84.0, 180.0),
        (157.0, 115.0),
        (147.0, 195.0),
        (218.0, 108.0),
        (226.0, 166.0),
        (286.0, 53.0),
        (279.0, 188.0),
    ];
    let mut corridor = vec![tri((56.0, 28.0), strip[0], strip[1])];
    corridor.extend(strip.windows(3).map(|w| tri(w[0], w[1], w[2])));
    corridor.push(tri(strip[9], strip[10], (403.0, 118.0)));
    corridor
}

/// A corridor bending around a building footprint.
fn building() -> Vec<Triangle> {
    vec![
        tri((760.0, 560.0), (840.0, 600.0), (800.0, 480.0)),
        tri((800.0, 480.0), (960.0, 640.0), (840.0, 600.0)),
        tri((840.0, 600.0), (960.0, 640.0), (960.0, 680.0)),
        tri((840.0, 600.0), (960.0, 680.0), (960.0, 720.0)),
        tri((1000.0, 720.0), (960.0, 680.0), (960.0, 720.0)),
        tri((1120.0, 960.0), (960.0, 720.0), (1000.0, 720.0)),
        tri((1120.0, 960.0), (960.0, 720.0), (1040.0, 1040.0)),
        tri((920.0, 720.0), (1040.0, 1040.0), (960.0, 720.0)),
        tri((920.0, 720.0), (1040.0, 1040.0), (880.0, 1080.0)),
        tri((920.0, 720.0), (880.0, 1080.0), (760.0, 760.0)),
    ]
}

fn pull(start: Point, goal: Point, corridor: &[Triangle]) -> Vec<Point> {
    string_pull(&corridor_portals(start, goal, corridor).unwrap())
}

fn repull(path: &[Point]) -> Vec<Point> {
    let portals: Vec<Portal> = path.iter().copied().map(Portal::point).collect();
    string_pull(&portals)
}

// =============================================================================
// STRING PULLING
// =============================================================================

#[test]
fn zig_zag_skips_non_corner_portals() {
    init_tracing();
    let path = pull(p(71.0, 45.0), p(293.0, 65.0), &zig_zag());
    assert_eq!(
        path,
        vec![p(71.0, 45.0), p(95.0, 130.0), p(218.0, 108.0), p(293.0, 65.0)]
    );
}

#[test]
fn zig_zag_to_lower_goal() {
    init_tracing();
    let path = pull(p(71.0, 45.0), p(293.0, 201.0), &zig_zag());
    assert_eq!(
        path,
        vec![
            p(71.0, 45.0),
            p(95.0, 130.0),
            p(226.0, 166.0),
            p(279.0, 188.0),
            p(293.0, 201.0),
        ]
    );
}

#[test]
fn building_corridor_turns_at_two_corners() {
    init_tracing();
    let corridor = building();
    let path = pull(p(696.0, 569.0), p(880.0, 880.0), &corridor);
    assert_eq!(
        path,
        vec![p(696.0, 569.0), p(840.0, 600.0), p(960.0, 720.0), p(880.0, 880.0)]
    );
    // Both corners are vertices of the corridor.
    assert!(corridor[1].has_vertex(&path[1]));
    assert!(corridor[3].has_vertex(&path[2]));
}

#[test]
fn two_triangles_go_straight() {
    init_tracing();
    let corridor = building();
    let start = p(696.0, 569.0);
    let goal = p(900.0, 600.0);
    let smoothed = FunnelSmoother::new(0.0)
        .smooth(start, goal, &corridor[..2])
        .unwrap();
    assert_eq!(smoothed, vec![start, goal]);
    assert_eq!(pull(start, goal, &corridor[..2]), vec![start, goal]);
}

#[test]
fn pulled_paths_are_fixed_points() {
    init_tracing();
    for (start, goal, corridor) in [
        (p(71.0, 45.0), p(293.0, 65.0), zig_zag()),
        (p(71.0, 45.0), p(293.0, 201.0), zig_zag()),
        (p(696.0, 569.0), p(880.0, 880.0), building()),
    ] {
        let path = pull(start, goal, &corridor);
        assert_eq!(repull(&path), path);
    }
}

#[test]
fn smoother_without_clearance_matches_string_pull() {
    init_tracing();
    let corridor = zig_zag();
    let (start, goal) = (p(71.0, 45.0), p(293.0, 65.0));
    let smoothed = FunnelSmoother::new(0.0).smooth(start, goal, &corridor).unwrap();
    assert_eq!(smoothed, pull(start, goal, &corridor));
}

// =============================================================================
// CLEARANCE
// =============================================================================

#[test]
fn clearance_points_mirror_by_quadrant() {
    let corner = p(0.0, 0.0);
    let clearance = 2.0_f64.sqrt();
    let cases = [
        ((0.0, -1.0), (-1.0, 0.0), (1.0, 1.0)),
        ((0.0, -1.0), (1.0, 0.0), (-1.0, 1.0)),
        ((0.0, 1.0), (1.0, 0.0), (-1.0, -1.0)),
        ((0.0, 1.0), (-1.0, 0.0), (1.0, -1.0)),
    ];
    for (prev, next, expected) in cases {
        let moved = get_clearance_point(corner, prev.into(), next.into(), clearance);
        assert_relative_eq!(moved.x(), expected.0, epsilon = 1e-12);
        assert_relative_eq!(moved.y(), expected.1, epsilon = 1e-12);
        // Swapping the legs does not change the bisector.
        let swapped = get_clearance_point(corner, next.into(), prev.into(), clearance);
        assert_relative_eq!(swapped.x(), expected.0, epsilon = 1e-12);
        assert_relative_eq!(swapped.y(), expected.1, epsilon = 1e-12);
    }
}

#[test]
fn smoothed_corners_keep_their_distance() {
    let corridor = building();
    let (start, goal) = (p(696.0, 569.0), p(880.0, 880.0));
    let pulled = pull(start, goal, &corridor);
    let smoothed = FunnelSmoother::new(12.0).smooth(start, goal, &corridor).unwrap();
    assert_eq!(smoothed.len(), pulled.len());
    assert_eq!(smoothed[0], start);
    assert_eq!(smoothed[smoothed.len() - 1], goal);
    for (moved, corner) in smoothed[1..smoothed.len() - 1].iter().zip(&pulled[1..]) {
        assert_relative_eq!(moved.distance(corner), 12.0, epsilon = 1e-9);
    }
}
