//! FBX binary rendering.
//!
//! Renders the record tree from [`super::document`] into the binary form of
//! FBX 7.4: the Kaydara magic, a little-endian version word, then nested
//! length-prefixed node records. Arrays are written uncompressed
//! (encoding 0), trading file size for a dependency-free writer.

use super::document::{FbxNode, FbxProperty};

const MAGIC: &[u8] = b"Kaydara FBX Binary  \x00\x1a\x00";
const VERSION: u32 = 7400;

/// Size of the all-zero record that terminates a child list. FBX 7.4 uses
/// 32-bit offsets, so the sentinel is 13 bytes.
const SENTINEL_LEN: usize = 13;

/// Render a document tree to binary FBX bytes.
pub fn render(root: &FbxNode) -> Vec<u8> {
    let mut out = Vec::with_capacity(4096);
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&VERSION.to_le_bytes());
    for child in &root.children {
        write_record(&mut out, child);
    }
    // Top-level list terminator.
    out.extend_from_slice(&[0u8; SENTINEL_LEN]);
    out
}

fn write_record(out: &mut Vec<u8>, node: &FbxNode) {
    let header = out.len();
    // end_offset, num_properties, property_list_len: patched once known.
    out.extend_from_slice(&[0u8; 12]);
    out.push(node.name.len() as u8);
    out.extend_from_slice(node.name.as_bytes());

    let props_start = out.len();
    for prop in &node.properties {
        write_property(out, prop);
    }
    let props_len = (out.len() - props_start) as u32;

    if !node.children.is_empty() {
        for child in &node.children {
            write_record(out, child);
        }
        out.extend_from_slice(&[0u8; SENTINEL_LEN]);
    }

    let end_offset = out.len() as u32;
    out[header..header + 4].copy_from_slice(&end_offset.to_le_bytes());
    out[header + 4..header + 8].copy_from_slice(&(node.properties.len() as u32).to_le_bytes());
    out[header + 8..header + 12].copy_from_slice(&props_len.to_le_bytes());
}

fn write_property(out: &mut Vec<u8>, prop: &FbxProperty) {
    match prop {
        FbxProperty::I32(v) => {
            out.push(b'I');
            out.extend_from_slice(&v.to_le_bytes());
        }
        FbxProperty::I64(v) => {
            out.push(b'L');
            out.extend_from_slice(&v.to_le_bytes());
        }
        FbxProperty::F64(v) => {
            out.push(b'D');
            out.extend_from_slice(&v.to_le_bytes());
        }
        FbxProperty::Str(v) => {
            out.push(b'S');
            out.extend_from_slice(&(v.len() as u32).to_le_bytes());
            out.extend_from_slice(v.as_bytes());
        }
        FbxProperty::I32Array(values) => {
            out.push(b'i');
            write_array_header(out, values.len(), values.len() * 4);
            for v in values {
                out.extend_from_slice(&v.to_le_bytes());
            }
        }
        FbxProperty::F64Array(values) => {
            out.push(b'd');
            write_array_header(out, values.len(), values.len() * 8);
            for v in values {
                out.extend_from_slice(&v.to_le_bytes());
            }
        }
    }
}

fn write_array_header(out: &mut Vec<u8>, len: usize, byte_len: usize) {
    out.extend_from_slice(&(len as u32).to_le_bytes());
    // Encoding 0: raw, no deflate.
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&(byte_len as u32).to_le_bytes());
}
