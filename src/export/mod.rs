//! File writers for materialized scenes.
//!
//! Format capabilities are a closed mapping: each [`Format`] either has a
//! writer here or is rejected up front with
//! [`ExportError::UnsupportedFormat`]. There is no runtime writer registry.

pub mod document;
pub mod fbx_ascii;
pub mod fbx_binary;
pub mod obj;

use crate::error::{ExportError, Result};
use crate::scene::Scene;
use crate::types::Format;
use log::info;
use std::fs;
use std::path::Path;

/// Write a materialized scene to `path` in the given format.
pub fn write_scene(scene: &Scene, path: &Path, format: Format) -> Result<()> {
    info!(
        "writing scene '{}' ({} nodes) to {} as {:?}",
        scene.name,
        scene.node_count(),
        path.display(),
        format
    );
    match format {
        Format::FbxAscii => {
            let doc = document::build_document(scene);
            fs::write(path, fbx_ascii::render(&doc))?;
        }
        Format::FbxBinary => {
            let doc = document::build_document(scene);
            fs::write(path, fbx_binary::render(&doc))?;
        }
        Format::Obj => {
            fs::write(path, obj::render(scene))?;
        }
        Format::FbxEncrypted => return Err(ExportError::UnsupportedFormat(format)),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SystemUnit;

    #[test]
    fn test_encrypted_format_rejected() {
        let scene = Scene::new("S", SystemUnit::Meter, 1);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.fbx");
        let err = write_scene(&scene, &path, Format::FbxEncrypted).unwrap_err();
        assert!(matches!(err, ExportError::UnsupportedFormat(Format::FbxEncrypted)));
        assert!(!path.exists());
    }

    #[test]
    fn test_ascii_and_binary_share_document() {
        let scene = Scene::new("Shared", SystemUnit::Centimeter, 1);
        let dir = tempfile::tempdir().unwrap();
        let ascii = dir.path().join("a.fbx");
        let binary = dir.path().join("b.fbx");
        write_scene(&scene, &ascii, Format::FbxAscii).unwrap();
        write_scene(&scene, &binary, Format::FbxBinary).unwrap();

        let text = fs::read_to_string(&ascii).unwrap();
        assert!(text.contains("FBXVersion: 7400"));
        let bytes = fs::read(&binary).unwrap();
        assert!(bytes.starts_with(b"Kaydara FBX Binary  \x00"));
    }
}
