//! # FBX Exporter
//!
//! A Rust library for assembling 3D scene graphs in memory and writing
//! them out as FBX (ASCII or binary) or Wavefront OBJ files.
//!
//! ## Overview
//!
//! Callers build a scene incrementally: create nodes, set their local
//! transforms, and author mesh data (points, submeshes, skin weights,
//! blend-shape frames). Authoring is deferred — expensive work such as
//! triangle-to-quad merging, per-bone influence compaction, and the
//! handedness/unit conversion runs once, on a background thread, when the
//! scene is written out.
//!
//! When enabled in [`ExportOptions`], handedness conversion (X-axis
//! mirroring) and uniform scaling are applied during that same pass, so
//! authored data is never touched until export.
//!
//! ## Quick Start
//!
//! ```ignore
//! use fbx_exporter::{ExportContext, ExportOptions, Format, MeshAttributes, Topology};
//! use glam::Vec3;
//!
//! let mut ctx = ExportContext::new(ExportOptions::default());
//! ctx.create_scene("MyScene");
//!
//! // Author a single quad.
//! let node = ctx.create_node(None, "Quad").unwrap();
//! let points = vec![
//!     Vec3::new(0.0, 0.0, 0.0),
//!     Vec3::new(1.0, 0.0, 0.0),
//!     Vec3::new(1.0, 0.0, 1.0),
//!     Vec3::new(0.0, 0.0, 1.0),
//! ];
//! ctx.add_mesh(node, &MeshAttributes { points: Some(&points), ..Default::default() });
//! ctx.add_mesh_submesh(node, Topology::Triangles, &[0, 1, 2, 0, 2, 3], -1);
//!
//! // Kick off the export and wait for it.
//! ctx.write_async("quad.fbx", Format::FbxBinary);
//! ctx.wait()?;
//! ```

pub mod builder;
pub mod context;
pub mod coord;
pub mod error;
pub mod export;
pub mod quadify;
pub mod scene;
pub mod skin;
pub mod types;

// Re-export main types for convenience
pub use builder::{BlendShapeDeltas, MeshAttributes, MeshBuildSet};
pub use context::ExportContext;
pub use error::{ExportError, Result};
pub use export::write_scene;
pub use quadify::quadify_triangles;
pub use scene::{Node, NodeHandle, PolygonMesh, Scene, ROOT_NODE_NAME};
pub use types::{BoneWeights4, ExportOptions, Format, SystemUnit, Topology};
