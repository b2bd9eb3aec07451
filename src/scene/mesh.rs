//! Materialized mesh data attached to scene nodes.
//!
//! These types hold export-ready geometry: coordinate conversion, quad
//! merging and influence compaction have already happened by the time a
//! [`PolygonMesh`] exists. Writers consume them as-is.

use crate::scene::NodeHandle;
use glam::{Mat4, Vec2, Vec3, Vec4};

/// A polygon mesh in the target coordinate convention.
///
/// Per-vertex attribute arrays are either empty (absent) or exactly
/// `points.len()` long. Polygons are stored as a flat index stream plus a
/// per-polygon vertex count and material id.
#[derive(Debug, Clone, Default)]
pub struct PolygonMesh {
    /// Control points.
    pub points: Vec<Vec3>,
    /// Per-vertex normals, or empty.
    pub normals: Vec<Vec3>,
    /// Per-vertex tangents (bitangent sign in W), or empty.
    pub tangents: Vec<Vec4>,
    /// Per-vertex texture coordinates, or empty.
    pub uv: Vec<Vec2>,
    /// Per-vertex RGBA colors, or empty.
    pub colors: Vec<Vec4>,
    /// Flat polygon vertex index stream.
    pub polygon_indices: Vec<u32>,
    /// Vertex count of each polygon.
    pub polygon_counts: Vec<u32>,
    /// Material id of each polygon. Negative means "default material".
    pub polygon_materials: Vec<i32>,
    /// Skin deformer, when the mesh is skinned.
    pub skin: Option<SkinDeformer>,
    /// Blend-shape channels, in creation order.
    pub blend_channels: Vec<BlendShapeChannel>,
}

impl PolygonMesh {
    /// Create an empty mesh.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one polygon from an index iterator.
    pub fn add_polygon<I>(&mut self, material: i32, indices: I)
    where
        I: IntoIterator<Item = u32>,
    {
        let before = self.polygon_indices.len();
        self.polygon_indices.extend(indices);
        self.polygon_counts
            .push((self.polygon_indices.len() - before) as u32);
        self.polygon_materials.push(material);
    }

    /// Number of polygons.
    pub fn polygon_count(&self) -> usize {
        self.polygon_counts.len()
    }

    /// Number of control points.
    pub fn vertex_count(&self) -> usize {
        self.points.len()
    }

    /// Iterate polygons as (material, vertex index slice).
    pub fn polygons(&self) -> impl Iterator<Item = (i32, &[u32])> {
        let mut offset = 0;
        self.polygon_counts.iter().enumerate().map(move |(pi, &count)| {
            let slice = &self.polygon_indices[offset..offset + count as usize];
            offset += count as usize;
            (self.polygon_materials[pi], slice)
        })
    }
}

/// Cluster-based skin deformer: one cluster per live bone.
#[derive(Debug, Clone, Default)]
pub struct SkinDeformer {
    /// Clusters, in bone-list order. Bones whose handle went stale are
    /// absent.
    pub clusters: Vec<SkinCluster>,
}

/// One bone's influence over a mesh.
#[derive(Debug, Clone)]
pub struct SkinCluster {
    /// The bone node.
    pub bone: NodeHandle,
    /// Bind-pose matrix, already in the target convention.
    pub bindpose: Mat4,
    /// Influenced vertex indices, ascending.
    pub vertex_indices: Vec<u32>,
    /// Influence weight per entry of `vertex_indices`.
    pub vertex_weights: Vec<f64>,
}

/// A named blend-shape channel holding one or more weighted frames.
#[derive(Debug, Clone)]
pub struct BlendShapeChannel {
    /// Channel name, unique within the mesh.
    pub name: String,
    /// Frames in append order.
    pub frames: Vec<BlendShapeFrame>,
}

/// One target shape of a blend-shape channel, stored as absolute geometry.
#[derive(Debug, Clone)]
pub struct BlendShapeFrame {
    /// Frame weight on the 0–100 scale.
    pub weight: f32,
    /// Absolute control points (base plus converted delta).
    pub points: Vec<Vec3>,
    /// Absolute normals, renormalized after delta addition. Empty when the
    /// base mesh has no normals.
    pub normals: Vec<Vec3>,
    /// Absolute tangents, XYZ renormalized, W carried from the base. Empty
    /// when the base mesh has no tangents.
    pub tangents: Vec<Vec4>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_polygon_streams() {
        let mut mesh = PolygonMesh::new();
        mesh.add_polygon(-1, [0u32, 1, 2].into_iter());
        mesh.add_polygon(2, [2u32, 1, 3, 4].into_iter());

        assert_eq!(mesh.polygon_count(), 2);
        assert_eq!(mesh.polygon_indices, vec![0, 1, 2, 2, 1, 3, 4]);
        assert_eq!(mesh.polygon_counts, vec![3, 4]);
        assert_eq!(mesh.polygon_materials, vec![-1, 2]);
    }

    #[test]
    fn test_polygons_iterator() {
        let mut mesh = PolygonMesh::new();
        mesh.add_polygon(0, [0u32, 1, 2].into_iter());
        mesh.add_polygon(1, [3u32, 4, 5, 6].into_iter());

        let polys: Vec<(i32, Vec<u32>)> = mesh
            .polygons()
            .map(|(m, s)| (m, s.to_vec()))
            .collect();
        assert_eq!(polys, vec![(0, vec![0, 1, 2]), (1, vec![3, 4, 5, 6])]);
    }
}
