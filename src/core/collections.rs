//! Collection aliases used by the mesh and the planner.
//!
//! Hash maps and sets use [`rustc_hash`] because every key is an internal,
//! trusted value (points, edge keys, slotmap keys). Small inline buffers come from
//! [`smallvec`] and triangle storage from [`slotmap`].

use rustc_hash::{FxBuildHasher, FxHashMap, FxHashSet};
use smallvec::SmallVec;
use slotmap::SlotMap;

// =============================================================================
// STORAGE BACKEND
// =============================================================================

/// Storage for triangles, addressed by generational keys.
///
/// Keys of removed triangles are never reused for a different triangle, so a
/// stale [`TriangleKey`](crate::core::triangle::TriangleKey) is detected instead
/// of silently aliasing a new face.
pub type StorageMap<K, V> = SlotMap<K, V>;

// =============================================================================
// CORE OPTIMIZED TYPES
// =============================================================================

/// `HashMap` with the Fx hasher.
///
/// ⚠️ **Not DoS-resistant**: use only with trusted, internal keys.
///
/// # Examples
///
/// ```rust
/// use navmesh::core::collections::FastHashMap;
/// use navmesh::geometry::point::Point;
///
/// let mut map: FastHashMap<Point, usize> = FastHashMap::default();
/// map.insert(Point::new(40.0, 40.0), 3);
/// assert_eq!(map.get(&Point::new(40.0, 40.0)), Some(&3));
/// ```
pub type FastHashMap<K, V> = FxHashMap<K, V>;

/// `HashSet` with the Fx hasher.
pub type FastHashSet<T> = FxHashSet<T>;

/// Inline vector that spills to the heap past `N` elements.
///
/// # Size Guidelines
///
/// - **N=2**: triangles sharing an edge
/// - **N=3**: edges or vertices of one triangle
/// - **N=8**: triangles around a vertex
pub type SmallBuffer<T, const N: usize> = SmallVec<[T; N]>;

/// Typical number of triangles incident to a mesh vertex.
pub const VERTEX_DEGREE_BUFFER_SIZE: usize = 8;

/// Triangles on either side of an edge.
pub type EdgeFaceBuffer<K> = SmallBuffer<K, 2>;

/// Triangles incident to a vertex.
pub type VertexFaceBuffer<K> = SmallBuffer<K, VERTEX_DEGREE_BUFFER_SIZE>;

// =============================================================================
// UTILITY FUNCTIONS
// =============================================================================

/// Creates a [`FastHashMap`] with pre-allocated capacity.
#[inline]
#[must_use]
pub fn fast_hash_map_with_capacity<K, V>(capacity: usize) -> FastHashMap<K, V> {
    FastHashMap::with_capacity_and_hasher(capacity, FxBuildHasher)
}

/// Creates a [`FastHashSet`] with pre-allocated capacity.
#[inline]
#[must_use]
pub fn fast_hash_set_with_capacity<T>(capacity: usize) -> FastHashSet<T> {
    FastHashSet::with_capacity_and_hasher(capacity, FxBuildHasher)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_buffer_spills_past_inline_capacity() {
        let mut faces: EdgeFaceBuffer<u32> = EdgeFaceBuffer::new();
        faces.push(1);
        faces.push(2);
        assert!(!faces.spilled());
        faces.push(3);
        assert!(faces.spilled());
        assert_eq!(faces.as_slice(), &[1, 2, 3]);
    }

    #[test]
    fn preallocated_collections_start_empty() {
        let map = fast_hash_map_with_capacity::<u32, u32>(64);
        let set = fast_hash_set_with_capacity::<u32>(64);
        assert!(map.is_empty() && map.capacity() >= 64);
        assert!(set.is_empty() && set.capacity() >= 64);
    }
}
