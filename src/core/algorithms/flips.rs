//! Edge flips and Delaunay legalization.
//!
//! A flip replaces the two faces sharing an edge `a - b` (apexes `c` and `d`)
//! with the two faces sharing the opposite diagonal `c - d`. After a vertex `v`
//! is inserted, [`legalize_around`] flips every unconstrained edge opposite `v`
//! whose far apex lies strictly inside the circumcircle of the face containing
//! `v`, then re-examines the two edges that became opposite `v`. Each flip
//! strictly lowers the sum of circumcircle "lifts", so the process terminates;
//! co-circular ties are never flipped.
//!
//! # References
//! - C. L. Lawson (1977) - "Software for C¹ surface interpolation"
//! - L. P. Chew (1989) - "Constrained Delaunay triangulations"

use crate::core::edge::EdgeKey;
use crate::core::triangle::{Triangle, TriangleKey};
use crate::core::triangulation::{ConstrainedDelaunayMesh, MeshError};
use crate::geometry::point::Point;
use crate::geometry::predicates::{InCircle, Orientation, orientation};

/// Counters reported by a legalization pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DelaunayRepairStats {
    /// Number of edges examined.
    pub edges_checked: usize,
    /// Number of flips performed.
    pub flips_performed: usize,
    /// Largest work stack observed.
    pub max_stack_len: usize,
}

/// Flips `edge`, returning the keys of the two new faces.
///
/// # Errors
///
/// Returns [`MeshError::InvalidFlip`] if the edge is constrained, lies on the
/// mesh boundary, or its two faces do not form a strictly convex quadrilateral.
pub fn flip_edge(
    mesh: &mut ConstrainedDelaunayMesh,
    edge: EdgeKey,
) -> Result<[TriangleKey; 2], MeshError> {
    if mesh.is_constrained(edge) {
        return Err(MeshError::InvalidFlip {
            edge,
            message: "edge is constrained",
        });
    }
    let &[k1, k2] = mesh.faces_of_edge(edge) else {
        return Err(MeshError::InvalidFlip {
            edge,
            message: "edge is not shared by two triangles",
        });
    };
    let (a, b) = edge.endpoints();
    let c = apex(mesh, k1, edge)?;
    let d = apex(mesh, k2, edge)?;

    let side_a = orientation(&c, &d, &a);
    let side_b = orientation(&c, &d, &b);
    if side_a == Orientation::DEGENERATE || side_b == Orientation::DEGENERATE || side_a == side_b {
        return Err(MeshError::InvalidFlip {
            edge,
            message: "quadrilateral is not strictly convex",
        });
    }

    let first = Triangle::new(c, d, a)?;
    let second = Triangle::new(c, d, b)?;
    mesh.remove_triangle(k1);
    mesh.remove_triangle(k2);
    Ok([mesh.insert_triangle(first)?, mesh.insert_triangle(second)?])
}

fn apex(
    mesh: &ConstrainedDelaunayMesh,
    key: TriangleKey,
    edge: EdgeKey,
) -> Result<Point, MeshError> {
    mesh.triangle_checked(key)?
        .opposite_vertex(edge)
        .ok_or(MeshError::InvalidFlip {
            edge,
            message: "triangle does not have the edge as a side",
        })
}

/// Checks the empty circumcircle property across one edge.
///
/// Boundary edges (one face) are trivially legal.
///
/// # Errors
///
/// Returns [`MeshError::DelaunayViolation`] if the apex of either face lies
/// strictly inside the circumcircle of the other.
pub fn is_locally_delaunay(
    mesh: &ConstrainedDelaunayMesh,
    edge: EdgeKey,
) -> Result<(), MeshError> {
    let &[k1, k2] = mesh.faces_of_edge(edge) else {
        return Ok(());
    };
    let t1 = mesh.triangle_checked(k1)?;
    let t2 = mesh.triangle_checked(k2)?;
    for (triangle, other) in [(t1, k2), (t2, k1)] {
        let vertex = apex(mesh, other, edge)?;
        if triangle.circumcircle_position(&vertex) == InCircle::INSIDE {
            return Err(MeshError::DelaunayViolation {
                edge,
                triangle,
                vertex,
            });
        }
    }
    Ok(())
}

/// Restores the Delaunay property after `vertex` was inserted.
///
/// `seeds` are the edges opposite `vertex` in the faces created by the
/// insertion. Constrained edges and boundary edges are never flipped.
///
/// # Errors
///
/// Propagates [`MeshError`] from [`flip_edge`]; with a vertex freshly inserted
/// into a valid mesh every flip is legal, so an error indicates corruption.
pub fn legalize_around(
    mesh: &mut ConstrainedDelaunayMesh,
    vertex: Point,
    seeds: impl IntoIterator<Item = EdgeKey>,
) -> Result<DelaunayRepairStats, MeshError> {
    let mut stats = DelaunayRepairStats::default();
    let mut stack: Vec<EdgeKey> = seeds.into_iter().collect();

    while let Some(edge) = stack.pop() {
        stats.edges_checked += 1;
        if mesh.is_constrained(edge) {
            continue;
        }
        let &[k1, k2] = mesh.faces_of_edge(edge) else {
            continue;
        };
        let (near, far) = match (mesh.triangle(k1), mesh.triangle(k2)) {
            (Some(t), _) if t.has_vertex(&vertex) => (*t, k2),
            (_, Some(t)) if t.has_vertex(&vertex) => (*t, k1),
            _ => continue,
        };
        let opposite = apex(mesh, far, edge)?;
        if near.circumcircle_position(&opposite) != InCircle::INSIDE {
            continue;
        }

        flip_edge(mesh, edge)?;
        stats.flips_performed += 1;
        let (a, b) = edge.endpoints();
        stack.push(EdgeKey::new(a, opposite));
        stack.push(EdgeKey::new(opposite, b));
        stats.max_stack_len = stats.max_stack_len.max(stack.len());
    }
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: f64, y: f64) -> Point {
        Point::new(x, y)
    }

    fn quad() -> ConstrainedDelaunayMesh {
        let mut mesh = ConstrainedDelaunayMesh::new();
        mesh.seed(Triangle::enclosing(p(0.0, 0.0), p(200.0, 200.0))).unwrap();
        for v in [p(0.0, 0.0), p(200.0, 0.0), p(100.0, 30.0), p(100.0, -30.0)] {
            mesh.add_vertex(v).unwrap();
        }
        mesh
    }

    #[test]
    fn delaunay_diagonal_is_chosen() {
        let mesh = quad();
        assert!(mesh.has_edge(EdgeKey::new(p(100.0, 30.0), p(100.0, -30.0))));
        assert!(!mesh.has_edge(EdgeKey::new(p(0.0, 0.0), p(200.0, 0.0))));
        mesh.validate_delaunay().unwrap();
    }

    #[test]
    fn forced_flip_breaks_delaunay_and_flips_back() {
        let mut mesh = quad();
        let diagonal = EdgeKey::new(p(100.0, 30.0), p(100.0, -30.0));
        let count = mesh.triangle_count();
        flip_edge(&mut mesh, diagonal).unwrap();
        assert_eq!(mesh.triangle_count(), count);
        let other = EdgeKey::new(p(0.0, 0.0), p(200.0, 0.0));
        assert!(mesh.has_edge(other));
        assert!(matches!(
            is_locally_delaunay(&mesh, other),
            Err(MeshError::DelaunayViolation { .. })
        ));
        flip_edge(&mut mesh, other).unwrap();
        mesh.validate().unwrap();
    }

    #[test]
    fn constrained_and_boundary_edges_are_not_flipped() {
        let mut mesh = quad();
        let dummy_side = mesh.dummy().unwrap().edges()[0];
        assert!(matches!(
            flip_edge(&mut mesh, dummy_side),
            Err(MeshError::InvalidFlip { .. })
        ));
        mesh.add_constraint_edge(p(0.0, 0.0), p(200.0, 0.0)).unwrap();
        let constraint = EdgeKey::new(p(0.0, 0.0), p(200.0, 0.0));
        assert!(matches!(
            flip_edge(&mut mesh, constraint),
            Err(MeshError::InvalidFlip { message: "edge is constrained", .. })
        ));
        mesh.validate().unwrap();
    }
}
