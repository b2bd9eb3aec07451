//! Export context: the authoring API surface and the background write task.
//!
//! One context owns at most one scene and at most one in-flight export.
//! Authoring calls are synchronous and cheap (pure data copy); `write_async`
//! moves the scene and all pending mesh builds into a single background
//! thread, which finalizes the geometry and hands the materialized scene to
//! the format writer. Ownership moves with the task, so the foreground
//! thread cannot race it by construction.

use crate::builder::{BlendShapeDeltas, MeshAttributes, MeshBuildSet};
use crate::coord;
use crate::error::{ExportError, Result};
use crate::export;
use crate::scene::{NodeHandle, Scene};
use crate::types::{BoneWeights4, ExportOptions, Format, Topology};
use glam::{Mat4, Quat, Vec3};
use log::{debug, info, warn};
use std::path::PathBuf;
use std::thread::JoinHandle;

/// Builds scenes and writes them out. See the crate docs for a walkthrough.
///
/// Options are frozen at construction. Dropping a context joins any
/// outstanding export task first.
#[derive(Debug)]
pub struct ExportContext {
    options: ExportOptions,
    scene: Option<Scene>,
    builds: MeshBuildSet,
    epoch: u32,
    task: Option<JoinHandle<Result<()>>>,
}

impl ExportContext {
    /// Create a context with the given options.
    pub fn new(options: ExportOptions) -> Self {
        Self {
            options,
            scene: None,
            builds: MeshBuildSet::new(),
            epoch: 0,
            task: None,
        }
    }

    /// The context's frozen options.
    pub fn options(&self) -> &ExportOptions {
        &self.options
    }

    /// Create a fresh scene, discarding any previous one along with its
    /// pending mesh builds. Waits for an outstanding export to finish
    /// first. Node handles into the previous scene become stale.
    pub fn create_scene(&mut self, name: &str) -> bool {
        if let Err(e) = self.wait() {
            warn!("previous export failed: {}", e);
        }
        self.epoch += 1;
        self.scene = Some(Scene::new(name, self.options.system_unit, self.epoch));
        self.builds = MeshBuildSet::new();
        true
    }

    /// Handle to the current scene's root node.
    pub fn root_node(&self) -> Option<NodeHandle> {
        self.scene.as_ref().map(|s| s.root())
    }

    /// Find a node by exact name (first match in creation order).
    pub fn find_node_by_name(&self, name: &str) -> Option<NodeHandle> {
        self.scene.as_ref()?.find_node_by_name(name)
    }

    /// Create a node under `parent` (the root when `None`). `None` without
    /// a scene or with a stale parent handle.
    pub fn create_node(&mut self, parent: Option<NodeHandle>, name: &str) -> Option<NodeHandle> {
        self.scene.as_mut()?.create_node(parent, name)
    }

    /// Set a node's local transform. Stored raw; coordinate conversion
    /// happens at export time so the frozen options apply uniformly.
    pub fn set_trs(&mut self, node: NodeHandle, t: Vec3, r: Quat, s: Vec3) -> bool {
        let Some(scene) = self.scene.as_mut() else {
            return false;
        };
        let Some(n) = scene.node_mut(node) else {
            debug!("set_trs: stale node handle, ignoring");
            return false;
        };
        n.translation = t;
        n.rotation = r;
        n.scale = s;
        true
    }

    /// Attach base mesh attributes to a node. See
    /// [`MeshAttributes`] for the contract; no-op without points.
    pub fn add_mesh(&mut self, node: NodeHandle, attrs: &MeshAttributes) -> bool {
        let Some(scene) = self.scene.as_ref() else {
            return false;
        };
        self.builds.add_mesh(scene, node, attrs)
    }

    /// Queue a submesh (index buffer + topology + material) for a node
    /// with an attached mesh.
    pub fn add_mesh_submesh(
        &mut self,
        node: NodeHandle,
        topology: Topology,
        indices: &[u32],
        material: i32,
    ) -> bool {
        if self.scene.is_none() {
            return false;
        }
        self.builds.add_submesh(node, topology, indices, material)
    }

    /// Queue skin data for a node with an attached mesh. `weights` must
    /// cover every vertex; `bones` and `bindposes` must have equal length.
    pub fn add_mesh_skin(
        &mut self,
        node: NodeHandle,
        weights: &[BoneWeights4],
        bones: &[NodeHandle],
        bindposes: &[Mat4],
    ) -> bool {
        if self.scene.is_none() {
            return false;
        }
        self.builds.add_skin(node, weights, bones, bindposes)
    }

    /// Queue one blend-shape frame. Reusing a name appends a frame to that
    /// channel.
    pub fn add_mesh_blend_shape(
        &mut self,
        node: NodeHandle,
        name: &str,
        weight: f32,
        deltas: &BlendShapeDeltas,
    ) -> bool {
        if self.scene.is_none() {
            return false;
        }
        self.builds.add_blend_shape_frame(node, name, weight, deltas)
    }

    /// Start the background export. Returns `false` (leaving the scene
    /// untouched) when there is no scene, another export is still running,
    /// or the format has no writer.
    ///
    /// The scene and all pending mesh builds move into the task; the
    /// context is ready for `create_scene` again once it finishes.
    pub fn write_async(&mut self, path: impl Into<PathBuf>, format: Format) -> bool {
        if let Some(task) = &self.task {
            if !task.is_finished() {
                warn!("write_async: export already in progress, rejecting");
                return false;
            }
            // Finished but unjoined; collect it before starting the next.
            if let Err(e) = self.wait() {
                warn!("previous export failed: {}", e);
            }
        }
        if !format.is_writable() {
            warn!("write_async: no writer for {:?}, rejecting", format);
            return false;
        }
        let Some(mut scene) = self.scene.take() else {
            warn!("write_async: no scene, rejecting");
            return false;
        };

        let builds = std::mem::take(&mut self.builds);
        let options = self.options;
        let path = path.into();
        info!("exporting scene '{}' to {:?}", scene.name, path);

        self.task = Some(std::thread::spawn(move || {
            builds.finalize_into(&mut scene, &options);
            for node in scene.nodes_mut() {
                node.translation = coord::convert_point(node.translation, &options);
                node.rotation = coord::convert_rotation(node.rotation, &options);
            }
            export::write_scene(&scene, &path, format)?;
            info!("export of '{}' finished", scene.name);
            Ok(())
        }));
        true
    }

    /// Whether no export is currently running.
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, |t| t.is_finished())
    }

    /// Block until the outstanding export (if any) completes and return
    /// its result. `Ok(())` when nothing was running.
    pub fn wait(&mut self) -> Result<()> {
        match self.task.take() {
            Some(task) => task.join().map_err(|_| ExportError::TaskPanicked)?,
            None => Ok(()),
        }
    }
}

impl Drop for ExportContext {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            let _ = task.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn square_points() -> Vec<Vec3> {
        vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 1.0),
            Vec3::new(0.0, 0.0, 1.0),
        ]
    }

    fn context_with_square(name: &str) -> (ExportContext, NodeHandle) {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut ctx = ExportContext::new(ExportOptions::default());
        assert!(ctx.create_scene(name));
        let node = ctx.create_node(None, "Square").unwrap();
        let points = square_points();
        assert!(ctx.add_mesh(
            node,
            &MeshAttributes {
                points: Some(&points),
                ..Default::default()
            }
        ));
        assert!(ctx.add_mesh_submesh(node, Topology::Triangles, &[0, 1, 2, 0, 2, 3], -1));
        (ctx, node)
    }

    #[test]
    fn test_write_without_scene_rejected() {
        let mut ctx = ExportContext::new(ExportOptions::default());
        assert!(!ctx.write_async("/tmp/never-written.fbx", Format::FbxAscii));
        assert!(ctx.is_finished());
    }

    #[test]
    fn test_authoring_without_scene_fails() {
        let mut ctx = ExportContext::new(ExportOptions::default());
        assert!(ctx.root_node().is_none());
        assert!(ctx.create_node(None, "A").is_none());
        assert!(ctx.find_node_by_name("A").is_none());
    }

    #[test]
    fn test_unwritable_format_rejected() {
        let (mut ctx, _) = context_with_square("Encrypted");
        assert!(!ctx.write_async("/tmp/never-written.fbx", Format::FbxEncrypted));
        // The scene survives a rejected write.
        assert!(ctx.root_node().is_some());
    }

    #[test]
    fn test_node_authoring() {
        let mut ctx = ExportContext::new(ExportOptions::default());
        ctx.create_scene("Nodes");
        let parent = ctx.create_node(None, "Parent").unwrap();
        let child = ctx.create_node(Some(parent), "Child").unwrap();
        assert_eq!(ctx.find_node_by_name("Child"), Some(child));
        assert!(ctx.set_trs(
            parent,
            Vec3::new(0.0, 1.0, 2.0),
            Quat::IDENTITY,
            Vec3::ONE
        ));
    }

    #[test]
    fn test_handles_stale_after_recreate() {
        let mut ctx = ExportContext::new(ExportOptions::default());
        ctx.create_scene("First");
        let node = ctx.create_node(None, "A").unwrap();
        ctx.create_scene("Second");
        assert!(!ctx.set_trs(node, Vec3::ZERO, Quat::IDENTITY, Vec3::ONE));
        assert!(ctx.find_node_by_name("A").is_none());
    }

    #[test]
    fn test_write_ascii_and_wait() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("square.fbx");
        let (mut ctx, _) = context_with_square("Square");

        assert!(ctx.write_async(&path, Format::FbxAscii));
        ctx.wait().unwrap();
        assert!(ctx.is_finished());

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("FBXVersion"));
        assert!(content.contains("Square"));
    }

    #[test]
    fn test_write_obj() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("square.obj");
        let (mut ctx, _) = context_with_square("Square");

        assert!(ctx.write_async(&path, Format::Obj));
        ctx.wait().unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("o Square"));
        assert!(content.contains("v "));
        assert!(content.contains("f "));
    }

    #[test]
    fn test_write_binary_magic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("square.fbx");
        let (mut ctx, _) = context_with_square("Square");

        assert!(ctx.write_async(&path, Format::FbxBinary));
        ctx.wait().unwrap();
        let bytes = fs::read(&path).unwrap();
        assert!(bytes.starts_with(b"Kaydara FBX Binary  \x00"));
    }

    #[test]
    fn test_second_write_rejected_or_serialized() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first.fbx");
        let second = dir.path().join("second.fbx");
        let (mut ctx, _) = context_with_square("Square");

        assert!(ctx.write_async(&first, Format::FbxAscii));
        // The scene moved into the task, so a back-to-back write has
        // nothing to export and is rejected; the running task is
        // untouched.
        assert!(!ctx.write_async(&second, Format::FbxAscii));
        ctx.wait().unwrap();
        assert!(first.exists());
        assert!(!second.exists());
    }

    #[test]
    fn test_write_invalid_path_errors() {
        let (mut ctx, _) = context_with_square("Square");
        assert!(ctx.write_async("/nonexistent-dir/out.fbx", Format::FbxAscii));
        assert!(ctx.wait().is_err());
    }

    #[test]
    fn test_create_scene_after_write_cycles() {
        let dir = tempfile::tempdir().unwrap();
        let (mut ctx, _) = context_with_square("First");
        assert!(ctx.write_async(dir.path().join("first.fbx"), Format::FbxAscii));

        // create_scene waits for the export, then starts a clean cycle.
        assert!(ctx.create_scene("Second"));
        assert!(ctx.root_node().is_some());
        let node = ctx.create_node(None, "Empty").unwrap();
        assert!(ctx.set_trs(node, Vec3::ONE, Quat::IDENTITY, Vec3::ONE));
        assert!(ctx.write_async(dir.path().join("second.fbx"), Format::FbxAscii));
        ctx.wait().unwrap();
        assert!(dir.path().join("first.fbx").exists());
        assert!(dir.path().join("second.fbx").exists());
    }

    #[test]
    fn test_drop_joins_outstanding_task() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dropped.fbx");
        {
            let (mut ctx, _) = context_with_square("Dropped");
            assert!(ctx.write_async(&path, Format::FbxAscii));
            // ctx dropped here with the task possibly still running.
        }
        assert!(path.exists());
    }

    #[test]
    fn test_flipped_export_trs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flipped.fbx");
        let mut ctx = ExportContext::new(ExportOptions {
            flip_handedness: true,
            scale_factor: 2.0,
            ..Default::default()
        });
        ctx.create_scene("Flipped");
        let node = ctx.create_node(None, "N").unwrap();
        ctx.set_trs(node, Vec3::new(1.0, 2.0, 3.0), Quat::IDENTITY, Vec3::ONE);
        assert!(ctx.write_async(&path, Format::FbxAscii));
        ctx.wait().unwrap();
        let content = fs::read_to_string(&path).unwrap();
        // Position scaled by 2 and X negated.
        assert!(content.contains("-2"));
    }
}
