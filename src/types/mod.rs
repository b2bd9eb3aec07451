//! Shared value types: topologies, units, formats, options, and bone weights.

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Primitive topology of a submesh index buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topology {
    Points,
    Lines,
    Triangles,
    Quads,
}

impl Topology {
    /// Number of indices that make up one primitive.
    pub fn vertices_per_primitive(self) -> usize {
        match self {
            Topology::Points => 1,
            Topology::Lines => 2,
            Topology::Triangles => 3,
            Topology::Quads => 4,
        }
    }
}

/// Unit of measure recorded in the exported file's global settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemUnit {
    Millimeter,
    Centimeter,
    Decimeter,
    Meter,
    Kilometer,
}

impl SystemUnit {
    /// FBX `UnitScaleFactor`, expressed in centimeters per unit.
    pub fn unit_scale_factor(self) -> f64 {
        match self {
            SystemUnit::Millimeter => 0.1,
            SystemUnit::Centimeter => 1.0,
            SystemUnit::Decimeter => 10.0,
            SystemUnit::Meter => 100.0,
            SystemUnit::Kilometer => 100_000.0,
        }
    }
}

/// Output file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Format {
    FbxBinary,
    FbxAscii,
    FbxEncrypted,
    Obj,
}

impl Format {
    /// Conventional file extension for this format.
    pub fn extension(self) -> &'static str {
        match self {
            Format::FbxBinary | Format::FbxAscii | Format::FbxEncrypted => "fbx",
            Format::Obj => "obj",
        }
    }

    /// Whether the crate carries a writer for this format.
    ///
    /// Encrypted FBX can only be produced by the official SDK, so it maps
    /// to no capability here.
    pub fn is_writable(self) -> bool {
        !matches!(self, Format::FbxEncrypted)
    }
}

/// Export options, frozen for the lifetime of an
/// [`ExportContext`](crate::ExportContext).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportOptions {
    /// Negate the X axis convention on positions, normals, tangents,
    /// rotations and bind poses, converting between left- and right-handed
    /// coordinate systems.
    pub flip_handedness: bool,
    /// Reverse each polygon's vertex order at emission time.
    pub flip_faces: bool,
    /// Merge adjacent triangle pairs into quads on export.
    pub quadify: bool,
    /// Maximum worst-corner deviation from 90° (degrees) a merged quad may
    /// have. Candidates at or above this are left as triangles.
    pub quadify_threshold_angle: f32,
    /// Uniform scale applied to positions and bind-pose translations.
    pub scale_factor: f32,
    /// Unit of measure recorded in the output file.
    pub system_unit: SystemUnit,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            flip_handedness: false,
            flip_faces: false,
            quadify: true,
            quadify_threshold_angle: 40.0,
            scale_factor: 1.0,
            system_unit: SystemUnit::Meter,
        }
    }
}

impl ExportOptions {
    /// Parse options from a JSON document. Missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Fixed four-slot bone influence record for one vertex.
///
/// Slot `i` binds the vertex to bone `indices[i]` with weight `weights[i]`.
/// Unused slots carry [`BoneWeights4::UNUSED`] or a zero weight.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoneWeights4 {
    /// Influence weights, one per slot.
    pub weights: [f32; 4],
    /// Bone indices into the skin's bone list, one per slot.
    pub indices: [i32; 4],
}

impl BoneWeights4 {
    /// Sentinel bone index marking an unused slot.
    pub const UNUSED: i32 = -1;

    /// A record binding the vertex fully to a single bone.
    pub fn single(bone: i32) -> Self {
        Self {
            weights: [1.0, 0.0, 0.0, 0.0],
            indices: [bone, Self::UNUSED, Self::UNUSED, Self::UNUSED],
        }
    }
}

impl Default for BoneWeights4 {
    fn default() -> Self {
        Self {
            weights: [0.0; 4],
            indices: [Self::UNUSED; 4],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topology_arity() {
        assert_eq!(Topology::Points.vertices_per_primitive(), 1);
        assert_eq!(Topology::Lines.vertices_per_primitive(), 2);
        assert_eq!(Topology::Triangles.vertices_per_primitive(), 3);
        assert_eq!(Topology::Quads.vertices_per_primitive(), 4);
    }

    #[test]
    fn test_default_options() {
        let opt = ExportOptions::default();
        assert!(opt.quadify);
        assert!(!opt.flip_handedness);
        assert!(!opt.flip_faces);
        assert_eq!(opt.quadify_threshold_angle, 40.0);
        assert_eq!(opt.scale_factor, 1.0);
        assert_eq!(opt.system_unit, SystemUnit::Meter);
    }

    #[test]
    fn test_options_from_json_partial() {
        let opt = ExportOptions::from_json(
            r#"{ "flip_handedness": true, "scale_factor": 0.01, "system_unit": "centimeter" }"#,
        )
        .unwrap();
        assert!(opt.flip_handedness);
        assert_eq!(opt.scale_factor, 0.01);
        assert_eq!(opt.system_unit, SystemUnit::Centimeter);
        // Unspecified fields keep their defaults
        assert!(opt.quadify);
        assert_eq!(opt.quadify_threshold_angle, 40.0);
    }

    #[test]
    fn test_options_from_json_invalid() {
        assert!(ExportOptions::from_json("not json").is_err());
    }

    #[test]
    fn test_format_capability() {
        assert!(Format::FbxBinary.is_writable());
        assert!(Format::FbxAscii.is_writable());
        assert!(Format::Obj.is_writable());
        assert!(!Format::FbxEncrypted.is_writable());
        assert_eq!(Format::Obj.extension(), "obj");
        assert_eq!(Format::FbxAscii.extension(), "fbx");
    }

    #[test]
    fn test_unit_scale_factor() {
        assert_eq!(SystemUnit::Centimeter.unit_scale_factor(), 1.0);
        assert_eq!(SystemUnit::Meter.unit_scale_factor(), 100.0);
    }
}
