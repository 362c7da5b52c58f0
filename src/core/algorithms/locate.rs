//! Point location in the navigation mesh.
//!
//! Implements the visibility walk: starting from a hint face, repeatedly cross
//! an edge that has the query point strictly on its outer side until no such
//! edge remains. The walk runs in expected O(√n) steps on a Delaunay mesh.
//!
//! Constrained meshes and meshes with holes (after the dummy triangle is
//! stripped) can make the walk hit an outer boundary or revisit a face. In that
//! case the query falls back to an exhaustive scan, so the answer never depends
//! on the hint.
//!
//! # References
//!
//! - O. Devillers, S. Pion, and M. Teillaud, "Walking in a Triangulation",
//!   International Journal of Foundations of Computer Science, 2001.

use crate::core::collections::{FastHashSet, SmallBuffer, VERTEX_DEGREE_BUFFER_SIZE};
use crate::core::edge::EdgeKey;
use crate::core::triangle::{TriangleKey, TrianglePosition};
use crate::core::triangulation::ConstrainedDelaunayMesh;
use crate::geometry::point::Point;
use crate::geometry::predicates::{Orientation, orientation};

/// Result of a point location query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocateResult {
    /// Point is strictly inside the face
    Inside(TriangleKey),
    /// Point is on the relative interior of an edge
    OnEdge(EdgeKey),
    /// Point coincides with a mesh vertex
    OnVertex(Point),
    /// Point is not covered by any face
    Outside,
}

/// Locates `point`, starting the walk at `hint` when it is still a live face.
///
/// # Examples
///
/// ```rust
/// use navmesh::core::algorithms::locate::{LocateResult, locate};
/// use navmesh::core::triangle::Triangle;
/// use navmesh::core::triangulation::ConstrainedDelaunayMesh;
/// use navmesh::geometry::point::Point;
///
/// let mut mesh = ConstrainedDelaunayMesh::new();
/// let dummy = Triangle::enclosing(Point::new(0.0, 0.0), Point::new(80.0, 80.0));
/// mesh.seed(dummy).unwrap();
/// mesh.add_vertex(Point::new(40.0, 40.0)).unwrap();
///
/// assert!(matches!(locate(&mesh, &Point::new(10.0, 40.0), None), LocateResult::Inside(_)));
/// assert_eq!(
///     locate(&mesh, &Point::new(40.0, 40.0), None),
///     LocateResult::OnVertex(Point::new(40.0, 40.0))
/// );
/// assert_eq!(locate(&mesh, &Point::new(1e6, 1e6), None), LocateResult::Outside);
/// ```
#[must_use]
pub fn locate(
    mesh: &ConstrainedDelaunayMesh,
    point: &Point,
    hint: Option<TriangleKey>,
) -> LocateResult {
    let start = match hint {
        Some(key) if mesh.triangle(key).is_some() => Some(key),
        _ => mesh.triangles().next().map(|(key, _)| key),
    };
    let Some(mut current) = start else {
        return LocateResult::Outside;
    };

    let mut visited = FastHashSet::default();
    for step in 0..=mesh.triangle_count() {
        if !visited.insert(current) {
            break;
        }
        let Some(triangle) = mesh.triangle(current) else {
            break;
        };
        let vertices = triangle.vertices();

        // Rotating the first tested edge keeps the walk from orbiting a vertex.
        let exit = (0..3).map(|j| (j + step) % 3).find_map(|i| {
            let (a, b) = (vertices[i], vertices[(i + 1) % 3]);
            (orientation(&a, &b, point) == Orientation::NEGATIVE).then(|| EdgeKey::new(a, b))
        });

        match exit {
            None => return classify(mesh, current, point),
            Some(edge) => match mesh.neighbor_across(current, edge) {
                Some(next) => current = next,
                None => break,
            },
        }
    }

    tracing::trace!(%point, "walk did not converge, scanning all faces");
    locate_exhaustive(mesh, point)
}

fn classify(mesh: &ConstrainedDelaunayMesh, key: TriangleKey, point: &Point) -> LocateResult {
    match mesh.triangle(key).map(|t| t.position(point)) {
        Some(TrianglePosition::Inside) => LocateResult::Inside(key),
        Some(TrianglePosition::OnEdge(edge)) => LocateResult::OnEdge(edge),
        Some(TrianglePosition::OnVertex(vertex)) => LocateResult::OnVertex(vertex),
        Some(TrianglePosition::Outside) | None => LocateResult::Outside,
    }
}

/// Locates `point` by testing every face in storage order.
#[must_use]
pub fn locate_exhaustive(mesh: &ConstrainedDelaunayMesh, point: &Point) -> LocateResult {
    mesh.triangles()
        .find(|(_, triangle)| triangle.contains_point(point))
        .map_or(LocateResult::Outside, |(key, _)| classify(mesh, key, point))
}

/// Every face whose closed region contains `point`, sorted by key.
///
/// The cardinality is 1 for an interior point, 2 on an interior edge (1 on a
/// boundary edge), the vertex degree at a vertex and 0 outside.
#[must_use]
pub fn find_containing_triangles(
    mesh: &ConstrainedDelaunayMesh,
    point: &Point,
    hint: Option<TriangleKey>,
) -> SmallBuffer<TriangleKey, VERTEX_DEGREE_BUFFER_SIZE> {
    let located = locate(mesh, point, hint);
    let mut found: SmallBuffer<TriangleKey, VERTEX_DEGREE_BUFFER_SIZE> = match located {
        LocateResult::Inside(key) => std::iter::once(key).collect(),
        LocateResult::OnEdge(edge) => mesh.faces_of_edge(edge).iter().copied().collect(),
        LocateResult::OnVertex(vertex) => mesh.faces_at_vertex(&vertex).iter().copied().collect(),
        LocateResult::Outside => SmallBuffer::new(),
    };
    found.sort_unstable();
    found
}
