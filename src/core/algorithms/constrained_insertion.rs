//! Enforcement of constraint edges.
//!
//! To make the segment `a - b` an edge of the mesh, the faces whose interiors
//! it crosses are collected by walking from `a` towards `b`. The vertices of
//! those faces split into a chain on the left of the segment and a chain on the
//! right. The faces are removed and each side is re-triangulated on its own:
//! [`triangulate_pseudo_polygon`] picks the chain vertex whose circle through
//! the base edge is empty of the other chain vertices, recurses on the two
//! sub-polygons, and closes the triangle. The result is constrained Delaunay
//! with `a - b` as an edge.
//!
//! If the segment runs exactly through an existing vertex, the constraint is
//! enforced as two pieces meeting at that vertex.
//!
//! # References
//! - A. Anglada (1997) - "An improved incremental algorithm for constructing
//!   restricted Delaunay triangulations"

use crate::core::edge::EdgeKey;
use crate::core::triangle::{Triangle, TriangleKey};
use crate::core::triangulation::{ConstrainedDelaunayMesh, MeshError};
use crate::geometry::point::Point;
use crate::geometry::predicates::{InCircle, Orientation, incircle, orientation, strictly_between};

/// Marks or carves the edge `a - b`, splitting it at collinear vertices.
///
/// Returns the number of mesh edges that now make up the constraint.
///
/// # Errors
///
/// - [`MeshError::MissingVertex`] if an endpoint is not a mesh vertex
/// - [`MeshError::ConstraintCrossing`] if an existing constraint is in the way
/// - [`MeshError::ConstraintInsertionFailed`] if the segment leaves the mesh
pub fn insert_constraint(
    mesh: &mut ConstrainedDelaunayMesh,
    a: Point,
    b: Point,
) -> Result<usize, MeshError> {
    for vertex in [a, b] {
        if !mesh.graph().contains_vertex(&vertex) {
            return Err(MeshError::MissingVertex { vertex });
        }
    }

    let mut pieces = 0;
    let mut from = a;
    // Every piece ends at a distinct vertex strictly closer to `b`.
    for _ in 0..mesh.vertex_count() {
        if from == b {
            break;
        }
        let edge = EdgeKey::new(from, b);
        if mesh.has_edge(edge) {
            mesh.mark_constrained(edge);
            return Ok(pieces + 1);
        }

        let collinear = mesh
            .graph()
            .neighbors(&from)
            .filter(|n| strictly_between(&from, &b, n))
            .min_by(|x, y| from.distance_squared(x).total_cmp(&from.distance_squared(y)));
        let reached = match collinear {
            Some(next) => {
                mesh.mark_constrained(EdgeKey::new(from, next));
                next
            }
            None => carve(mesh, from, b)?,
        };
        if reached != b {
            tracing::debug!(
                constraint = %EdgeKey::new(a, b),
                at = %reached,
                "constraint passes through a vertex, splitting"
            );
        }
        pieces += 1;
        from = reached;
    }
    if from == b {
        Ok(pieces)
    } else {
        Err(MeshError::ConstraintInsertionFailed {
            constraint: EdgeKey::new(a, b),
            message: format!("stopped at {from} after {pieces} pieces"),
        })
    }
}

/// Removes the faces crossed by `a - b` up to the first vertex on the segment,
/// re-triangulates both sides and constrains the new edge. Returns the vertex
/// the new edge ends at (`b`, or a vertex lying exactly on the segment).
fn carve(mesh: &mut ConstrainedDelaunayMesh, a: Point, b: Point) -> Result<Point, MeshError> {
    let constraint = EdgeKey::new(a, b);
    let failed = |message: &str| MeshError::ConstraintInsertionFailed {
        constraint,
        message: message.to_owned(),
    };

    // The face at `a` whose interior the segment enters: with corners (a, p, q)
    // counter-clockwise, `b` is left of a->p and right of a->q.
    let (start, mut right, mut left) = mesh
        .faces_at_vertex(&a)
        .iter()
        .copied()
        .find_map(|key| {
            let t = mesh.triangle(key)?;
            let i = t.vertex_index(&a)?;
            let [p, q] = [t.vertices()[(i + 1) % 3], t.vertices()[(i + 2) % 3]];
            (orientation(&a, &p, &b) == Orientation::POSITIVE
                && orientation(&a, &q, &b) == Orientation::NEGATIVE)
                .then_some((key, p, q))
        })
        .ok_or_else(|| failed("segment leaves the mesh at its first endpoint"))?;

    let mut crossed: Vec<TriangleKey> = vec![start];
    let mut right_chain = vec![right];
    let mut left_chain = vec![left];
    let mut current = start;
    let end = loop {
        let portal = EdgeKey::new(right, left);
        if mesh.is_constrained(portal) {
            return Err(MeshError::ConstraintCrossing {
                constraint,
                crossed: portal,
            });
        }
        let next = mesh
            .neighbor_across(current, portal)
            .ok_or_else(|| failed("segment leaves the mesh"))?;
        let far = mesh
            .triangle_checked(next)?
            .opposite_vertex(portal)
            .ok_or_else(|| failed("inconsistent edge incidence"))?;
        crossed.push(next);
        current = next;

        if far == b {
            break b;
        }
        match orientation(&a, &b, &far) {
            Orientation::DEGENERATE => break far,
            Orientation::POSITIVE => {
                left_chain.push(far);
                left = far;
            }
            Orientation::NEGATIVE => {
                right_chain.push(far);
                right = far;
            }
        }
        if crossed.len() > mesh.triangle_count() {
            return Err(failed("walk did not reach the far endpoint"));
        }
    };

    for key in crossed {
        mesh.remove_triangle(key);
    }
    right_chain.reverse();
    triangulate_pseudo_polygon(mesh, a, end, &left_chain)?;
    triangulate_pseudo_polygon(mesh, end, a, &right_chain)?;
    mesh.mark_constrained(EdgeKey::new(a, end));
    Ok(end)
}

/// Triangulates the polygon bounded by the base edge `a - b` and the chain
/// `polygon`, which lies strictly on one side of the base and runs from the
/// `a` end to the `b` end.
///
/// # Errors
///
/// Returns [`MeshError`] if a resulting face would be degenerate.
pub fn triangulate_pseudo_polygon(
    mesh: &mut ConstrainedDelaunayMesh,
    a: Point,
    b: Point,
    polygon: &[Point],
) -> Result<(), MeshError> {
    let Some(first) = polygon.first() else {
        return Ok(());
    };
    let mut c = 0;
    let mut apex = *first;
    for (i, candidate) in polygon.iter().enumerate().skip(1) {
        if incircle(&a, &b, &apex, candidate) == InCircle::INSIDE {
            c = i;
            apex = *candidate;
        }
    }
    triangulate_pseudo_polygon(mesh, a, apex, &polygon[..c])?;
    triangulate_pseudo_polygon(mesh, apex, b, &polygon[c + 1..])?;
    mesh.insert_triangle(Triangle::new(a, b, apex)?)?;
    Ok(())
}
