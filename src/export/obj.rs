//! Wavefront OBJ export.
//!
//! OBJ is a simple, widely-supported text-based 3D format. Every mesh node
//! becomes one `o` object with its world transform baked into the vertex
//! data, since OBJ has no node hierarchy. Skins and blend shapes have no
//! OBJ representation and are skipped.

use crate::scene::{NodeHandle, Scene};
use glam::Mat4;
use std::fmt::Write;

/// Render a scene to OBJ text.
pub fn render(scene: &Scene) -> String {
    let meshes: Vec<NodeHandle> = scene
        .nodes()
        .filter(|(_, node)| node.mesh.is_some())
        .map(|(handle, _)| handle)
        .collect();

    let total_verts: usize = meshes
        .iter()
        .map(|&h| scene.node(h).unwrap().mesh.as_ref().unwrap().vertex_count())
        .sum();

    // Pre-size: ~60 bytes per vertex line (v/vt/vn) x 3 plus face lines.
    let mut obj = String::with_capacity(256 + total_verts * 180);

    writeln!(obj, "# {} OBJ export", scene.name).unwrap();
    writeln!(obj, "# Objects: {}", meshes.len()).unwrap();
    writeln!(obj, "# Vertices: {}", total_verts).unwrap();
    writeln!(obj).unwrap();

    // OBJ indices are global across objects, and the v/vt/vn pools advance
    // independently because not every mesh carries every attribute.
    let mut v_offset: usize = 1;
    let mut vt_offset: usize = 1;
    let mut vn_offset: usize = 1;

    for handle in meshes {
        let node = scene.node(handle).unwrap();
        let mesh = node.mesh.as_ref().unwrap();
        let world = global_transform(scene, handle);

        writeln!(obj, "o {}", node.name).unwrap();

        let has_colors = !mesh.colors.is_empty();
        for (i, p) in mesh.points.iter().enumerate() {
            let p = world.transform_point3(*p);
            if has_colors {
                let c = mesh.colors[i];
                writeln!(obj, "v {} {} {} {} {} {}", p.x, p.y, p.z, c.x, c.y, c.z).unwrap();
            } else {
                writeln!(obj, "v {} {} {}", p.x, p.y, p.z).unwrap();
            }
        }
        for t in &mesh.uv {
            writeln!(obj, "vt {} {}", t.x, t.y).unwrap();
        }
        for n in &mesh.normals {
            let n = world.transform_vector3(*n).normalize_or_zero();
            writeln!(obj, "vn {} {} {}", n.x, n.y, n.z).unwrap();
        }

        let has_uv = !mesh.uv.is_empty();
        let has_normals = !mesh.normals.is_empty();
        let mut current_material = None;
        for (material, poly) in mesh.polygons() {
            if current_material != Some(material) {
                writeln!(obj, "usemtl material_{}", material.max(0)).unwrap();
                current_material = Some(material);
            }
            obj.push('f');
            for &idx in poly {
                let idx = idx as usize;
                match (has_uv, has_normals) {
                    (false, false) => write!(obj, " {}", v_offset + idx).unwrap(),
                    (true, false) => {
                        write!(obj, " {}/{}", v_offset + idx, vt_offset + idx).unwrap()
                    }
                    (false, true) => {
                        write!(obj, " {}//{}", v_offset + idx, vn_offset + idx).unwrap()
                    }
                    (true, true) => write!(
                        obj,
                        " {}/{}/{}",
                        v_offset + idx,
                        vt_offset + idx,
                        vn_offset + idx
                    )
                    .unwrap(),
                }
            }
            obj.push('\n');
        }
        writeln!(obj).unwrap();

        v_offset += mesh.points.len();
        vt_offset += mesh.uv.len();
        vn_offset += mesh.normals.len();
    }

    obj
}

/// World transform of a node, composed root-down from local TRS.
fn global_transform(scene: &Scene, handle: NodeHandle) -> Mat4 {
    let node = match scene.node(handle) {
        Some(n) => n,
        None => return Mat4::IDENTITY,
    };
    let local = Mat4::from_scale_rotation_translation(node.scale, node.rotation, node.translation);
    match scene.parent(handle) {
        Some(parent) => global_transform(scene, parent) * local,
        None => local,
    }
}
