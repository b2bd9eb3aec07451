//! Deferred mesh authoring.
//!
//! Authoring calls only copy caller data into per-node build state and
//! queue a finalize action; no geometry work happens until export. That
//! keeps every authoring call O(copy), lets skin and blend-shape data
//! arrive before or after submesh data, and confines the expensive passes
//! (coordinate conversion, quad merging, influence compaction) to the
//! single export task.
//!
//! Finalize actions name their target by index into the owning build
//! state, so sibling containers growing after an action is queued can
//! never invalidate it.

use crate::coord;
use crate::quadify::quadify_triangles;
use crate::scene::{BlendShapeChannel, BlendShapeFrame, NodeHandle, PolygonMesh, Scene, SkinCluster, SkinDeformer};
use crate::skin::influences_for_bone;
use crate::types::{BoneWeights4, ExportOptions, Topology};
use glam::{Mat4, Vec2, Vec3, Vec4};
use log::{debug, warn};
use std::collections::HashMap;

/// Borrowed vertex attribute arrays for `add_mesh`.
///
/// `points` is required; the rest are optional and, when given, must match
/// its length. Data is copied out during the call — nothing is borrowed
/// past it.
#[derive(Debug, Clone, Copy, Default)]
pub struct MeshAttributes<'a> {
    /// Vertex positions. Required, non-empty.
    pub points: Option<&'a [Vec3]>,
    /// Vertex normals.
    pub normals: Option<&'a [Vec3]>,
    /// Vertex tangents, bitangent sign in W.
    pub tangents: Option<&'a [Vec4]>,
    /// Texture coordinates.
    pub uv: Option<&'a [Vec2]>,
    /// RGBA vertex colors.
    pub colors: Option<&'a [Vec4]>,
}

/// Borrowed delta arrays for one blend-shape frame. Absent arrays mean
/// "equal to the base mesh".
#[derive(Debug, Clone, Copy, Default)]
pub struct BlendShapeDeltas<'a> {
    /// Position deltas.
    pub points: Option<&'a [Vec3]>,
    /// Normal deltas.
    pub normals: Option<&'a [Vec3]>,
    /// Tangent XYZ deltas.
    pub tangents: Option<&'a [Vec3]>,
}

/// One deferred unit of finalize work, replayed in append order.
#[derive(Debug, Clone, Copy)]
enum FinalizeAction {
    /// Materialize base vertex attributes. Always queued first, by
    /// construction: only `add_mesh` creates the state.
    BaseAttributes,
    /// Emit polygons for `submeshes[i]`.
    Submesh(usize),
    /// Build the skin deformer from the buffered skin data.
    Skin,
    /// Materialize one frame of one blend-shape channel.
    BlendShapeFrame { channel: usize, frame: usize },
}

#[derive(Debug, Clone)]
struct SubmeshData {
    topology: Topology,
    indices: Vec<u32>,
    material: i32,
}

#[derive(Debug, Clone)]
struct SkinData {
    weights: Vec<BoneWeights4>,
    bones: Vec<NodeHandle>,
    bindposes: Vec<Mat4>,
}

#[derive(Debug, Clone)]
struct BlendFrameData {
    weight: f32,
    delta_points: Vec<Vec3>,
    delta_normals: Vec<Vec3>,
    delta_tangents: Vec<Vec3>,
}

#[derive(Debug, Clone)]
struct BlendChannelData {
    name: String,
    frames: Vec<BlendFrameData>,
}

/// Buffered authoring data for one node's mesh.
#[derive(Debug, Clone)]
struct MeshBuildState {
    points: Vec<Vec3>,
    normals: Vec<Vec3>,
    tangents: Vec<Vec4>,
    uv: Vec<Vec2>,
    colors: Vec<Vec4>,
    submeshes: Vec<SubmeshData>,
    skin: Option<SkinData>,
    blend_channels: Vec<BlendChannelData>,
    actions: Vec<FinalizeAction>,
}

/// The set of pending mesh builds, keyed by node.
///
/// Owned by the context; consumed whole by [`MeshBuildSet::finalize_into`]
/// at export time.
#[derive(Debug, Default)]
pub struct MeshBuildSet {
    states: HashMap<NodeHandle, MeshBuildState>,
}

/// Copy `src` if it matches the expected vertex count, else drop it.
fn copy_matching<T: Copy>(src: Option<&[T]>, expected: usize, what: &str) -> Vec<T> {
    match src {
        Some(data) if data.len() == expected => data.to_vec(),
        Some(data) => {
            warn!(
                "dropping {}: {} entries for {} vertices",
                what,
                data.len(),
                expected
            );
            Vec::new()
        }
        None => Vec::new(),
    }
}

impl MeshBuildSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether any build state is pending.
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Start (or restart) a mesh build for `node`.
    ///
    /// Returns `false` without creating any state when `points` is absent
    /// or empty, or the node handle is stale — authoring errors are
    /// non-fatal by contract.
    pub fn add_mesh(&mut self, scene: &Scene, node: NodeHandle, attrs: &MeshAttributes) -> bool {
        if !scene.contains(node) {
            debug!("add_mesh: stale node handle, ignoring");
            return false;
        }
        let Some(points) = attrs.points.filter(|p| !p.is_empty()) else {
            debug!("add_mesh: no points, ignoring");
            return false;
        };

        let num_vertices = points.len();
        let state = MeshBuildState {
            points: points.to_vec(),
            normals: copy_matching(attrs.normals, num_vertices, "normals"),
            tangents: copy_matching(attrs.tangents, num_vertices, "tangents"),
            uv: copy_matching(attrs.uv, num_vertices, "uv"),
            colors: copy_matching(attrs.colors, num_vertices, "colors"),
            submeshes: Vec::new(),
            skin: None,
            blend_channels: Vec::new(),
            actions: vec![FinalizeAction::BaseAttributes],
        };
        self.states.insert(node, state);
        true
    }

    /// Queue a submesh for a node with a pending mesh build.
    pub fn add_submesh(
        &mut self,
        node: NodeHandle,
        topology: Topology,
        indices: &[u32],
        material: i32,
    ) -> bool {
        let Some(state) = self.states.get_mut(&node) else {
            debug!("add_submesh: no mesh build for node, ignoring");
            return false;
        };
        state.submeshes.push(SubmeshData {
            topology,
            indices: indices.to_vec(),
            material,
        });
        state
            .actions
            .push(FinalizeAction::Submesh(state.submeshes.len() - 1));
        true
    }

    /// Queue skin data for a node with a pending mesh build.
    ///
    /// No-op when the bone list is empty, the bind-pose list disagrees with
    /// it, or the weight table does not cover every vertex.
    pub fn add_skin(
        &mut self,
        node: NodeHandle,
        weights: &[BoneWeights4],
        bones: &[NodeHandle],
        bindposes: &[Mat4],
    ) -> bool {
        let Some(state) = self.states.get_mut(&node) else {
            debug!("add_skin: no mesh build for node, ignoring");
            return false;
        };
        if bones.is_empty() {
            debug!("add_skin: empty bone list, ignoring");
            return false;
        }
        if bones.len() != bindposes.len() {
            warn!(
                "add_skin: {} bones but {} bind poses, ignoring",
                bones.len(),
                bindposes.len()
            );
            return false;
        }
        if weights.len() < state.points.len() {
            warn!(
                "add_skin: {} weight entries for {} vertices, ignoring",
                weights.len(),
                state.points.len()
            );
            return false;
        }
        state.skin = Some(SkinData {
            weights: weights[..state.points.len()].to_vec(),
            bones: bones.to_vec(),
            bindposes: bindposes.to_vec(),
        });
        state.actions.push(FinalizeAction::Skin);
        true
    }

    /// Queue one blend-shape frame. A repeated `name` appends a frame to
    /// the existing channel instead of creating a duplicate.
    pub fn add_blend_shape_frame(
        &mut self,
        node: NodeHandle,
        name: &str,
        weight: f32,
        deltas: &BlendShapeDeltas,
    ) -> bool {
        let Some(state) = self.states.get_mut(&node) else {
            debug!("add_blend_shape_frame: no mesh build for node, ignoring");
            return false;
        };
        let num_vertices = state.points.len();

        let channel = match state.blend_channels.iter().position(|c| c.name == name) {
            Some(i) => i,
            None => {
                state.blend_channels.push(BlendChannelData {
                    name: name.to_string(),
                    frames: Vec::new(),
                });
                state.blend_channels.len() - 1
            }
        };

        let frame_data = BlendFrameData {
            weight,
            delta_points: copy_matching(deltas.points, num_vertices, "blend-shape point deltas"),
            delta_normals: copy_matching(deltas.normals, num_vertices, "blend-shape normal deltas"),
            delta_tangents: copy_matching(
                deltas.tangents,
                num_vertices,
                "blend-shape tangent deltas",
            ),
        };
        let frames = &mut state.blend_channels[channel].frames;
        frames.push(frame_data);
        state.actions.push(FinalizeAction::BlendShapeFrame {
            channel,
            frame: frames.len() - 1,
        });
        true
    }

    /// Run every pending finalize action and attach the materialized
    /// meshes to their nodes. Consumes the set; a build state is
    /// single-shot.
    ///
    /// Per-node order is arbitrary; within a node, actions replay in
    /// append order, so base attributes are converted before any submesh,
    /// skin, or blend-shape frame reads them.
    pub fn finalize_into(self, scene: &mut Scene, options: &ExportOptions) {
        for (handle, mut state) in self.states {
            if !scene.contains(handle) {
                debug!("finalize: node vanished, dropping its mesh build");
                continue;
            }

            let mut mesh = PolygonMesh::new();
            let actions = std::mem::take(&mut state.actions);
            for action in actions {
                match action {
                    FinalizeAction::BaseAttributes => {
                        finalize_base_attributes(&mut state, &mut mesh, options)
                    }
                    FinalizeAction::Submesh(i) => finalize_submesh(&state, i, &mut mesh, options),
                    FinalizeAction::Skin => finalize_skin(&state, scene, &mut mesh, options),
                    FinalizeAction::BlendShapeFrame { channel, frame } => {
                        finalize_blend_frame(&state, channel, frame, &mut mesh, options)
                    }
                }
            }

            if let Some(node) = scene.node_mut(handle) {
                node.mesh = Some(mesh);
            }
        }
    }
}

/// Convert the buffered attributes in place, then copy them to the mesh.
/// Later actions (blend-shape frames) read the converted base from the
/// state.
fn finalize_base_attributes(
    state: &mut MeshBuildState,
    mesh: &mut PolygonMesh,
    options: &ExportOptions,
) {
    for p in &mut state.points {
        *p = coord::convert_point(*p, options);
    }
    for n in &mut state.normals {
        *n = coord::convert_normal(*n, options);
    }
    for t in &mut state.tangents {
        *t = coord::convert_tangent(*t, options);
    }

    mesh.points = state.points.clone();
    mesh.normals = state.normals.clone();
    mesh.tangents = state.tangents.clone();
    mesh.uv = state.uv.clone();
    mesh.colors = state.colors.clone();
}

/// Emit one submesh's polygons, quad-merging triangle topology when
/// enabled. Other topologies group at fixed arity; trailing indices short
/// of a full primitive are dropped.
fn finalize_submesh(
    state: &MeshBuildState,
    index: usize,
    mesh: &mut PolygonMesh,
    options: &ExportOptions,
) {
    let sm = &state.submeshes[index];

    if sm.topology == Topology::Triangles && options.quadify {
        let (qindices, qcounts) = quadify_triangles(
            &state.points,
            &sm.indices,
            options.quadify_threshold_angle,
        );
        let mut offset = 0;
        for &count in &qcounts {
            let poly = &qindices[offset..offset + count as usize];
            emit_polygon(mesh, sm.material, poly, options.flip_faces);
            offset += count as usize;
        }
    } else {
        let arity = sm.topology.vertices_per_primitive();
        for poly in sm.indices.chunks_exact(arity) {
            emit_polygon(mesh, sm.material, poly, options.flip_faces);
        }
    }
}

fn emit_polygon(mesh: &mut PolygonMesh, material: i32, poly: &[u32], flip_faces: bool) {
    if flip_faces {
        mesh.add_polygon(material, poly.iter().rev().copied());
    } else {
        mesh.add_polygon(material, poly.iter().copied());
    }
}

/// Build the cluster set from the buffered skin data. Bones whose handle
/// has gone stale are skipped, not fatal.
fn finalize_skin(
    state: &MeshBuildState,
    scene: &Scene,
    mesh: &mut PolygonMesh,
    options: &ExportOptions,
) {
    let Some(skin) = &state.skin else {
        return;
    };

    let mut deformer = SkinDeformer::default();
    for (bi, &bone) in skin.bones.iter().enumerate() {
        if !scene.contains(bone) {
            warn!("skipping skin cluster for stale bone {}", bi);
            continue;
        }
        let (vertex_indices, vertex_weights) = influences_for_bone(&skin.weights, bi);
        deformer.clusters.push(SkinCluster {
            bone,
            bindpose: coord::convert_bindpose(skin.bindposes[bi], options),
            vertex_indices,
            vertex_weights,
        });
    }
    mesh.skin = Some(deformer);
}

/// Materialize one blend-shape frame against the already-converted base
/// attributes. Normals and tangents renormalize after delta addition; the
/// tangent W component passes through from the base.
fn finalize_blend_frame(
    state: &MeshBuildState,
    channel: usize,
    frame: usize,
    mesh: &mut PolygonMesh,
    options: &ExportOptions,
) {
    let channel_data = &state.blend_channels[channel];
    let frame_data = &channel_data.frames[frame];
    let num_vertices = state.points.len();

    let points = if frame_data.delta_points.is_empty() {
        state.points.clone()
    } else {
        (0..num_vertices)
            .map(|vi| {
                let delta = frame_data.delta_points[vi] * options.scale_factor;
                state.points[vi] + coord::convert_normal(delta, options)
            })
            .collect()
    };

    let normals = if state.normals.is_empty() {
        Vec::new()
    } else if frame_data.delta_normals.is_empty() {
        state.normals.clone()
    } else {
        (0..num_vertices)
            .map(|vi| {
                let delta = coord::convert_normal(frame_data.delta_normals[vi], options);
                (state.normals[vi] + delta).normalize_or_zero()
            })
            .collect()
    };

    let tangents = if state.tangents.is_empty() {
        Vec::new()
    } else if frame_data.delta_tangents.is_empty() {
        state.tangents.clone()
    } else {
        (0..num_vertices)
            .map(|vi| {
                let delta = coord::convert_normal(frame_data.delta_tangents[vi], options);
                let base = state.tangents[vi];
                let xyz = (base.truncate() + delta).normalize_or_zero();
                xyz.extend(base.w)
            })
            .collect()
    };

    let materialized = BlendShapeFrame {
        weight: frame_data.weight,
        points,
        normals,
        tangents,
    };

    match mesh
        .blend_channels
        .iter_mut()
        .find(|c| c.name == channel_data.name)
    {
        Some(existing) => existing.frames.push(materialized),
        None => mesh.blend_channels.push(BlendShapeChannel {
            name: channel_data.name.clone(),
            frames: vec![materialized],
        }),
    }
}
