//! FBX ASCII rendering.
//!
//! Renders the record tree from [`super::document`] into the text form of
//! FBX 7.4. Array-valued records use the `*N { a: ... }` layout; everything
//! else is `Name: prop, prop {`.

use super::document::{FbxNode, FbxProperty};
use std::fmt::Write;

/// Render a document tree to ASCII FBX text.
pub fn render(root: &FbxNode) -> String {
    let mut out = String::with_capacity(4096);
    writeln!(out, "; FBX 7.4.0 project file").unwrap();
    writeln!(out, "; ----------------------------------------------------").unwrap();
    writeln!(out).unwrap();
    for child in &root.children {
        write_record(&mut out, child, 0);
    }
    out
}

fn indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push('\t');
    }
}

fn write_record(out: &mut String, node: &FbxNode, depth: usize) {
    indent(out, depth);
    write!(out, "{}:", node.name).unwrap();

    // An array property is always the record's only property and renders
    // with a length header and an `a:` line.
    if let [FbxProperty::I32Array(_) | FbxProperty::F64Array(_)] = node.properties.as_slice() {
        write_array(out, &node.properties[0], depth);
        return;
    }

    for (i, prop) in node.properties.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push(' ');
        write_scalar(out, prop);
    }

    if node.children.is_empty() {
        out.push('\n');
    } else {
        writeln!(out, " {{").unwrap();
        for child in &node.children {
            write_record(out, child, depth + 1);
        }
        indent(out, depth);
        writeln!(out, "}}").unwrap();
    }
}

fn write_scalar(out: &mut String, prop: &FbxProperty) {
    match prop {
        FbxProperty::I32(v) => write!(out, "{}", v).unwrap(),
        FbxProperty::I64(v) => write!(out, "{}", v).unwrap(),
        FbxProperty::F64(v) => write!(out, "{}", v).unwrap(),
        FbxProperty::Str(v) => write!(out, "\"{}\"", v.replace('"', "'")).unwrap(),
        FbxProperty::I32Array(_) | FbxProperty::F64Array(_) => {
            unreachable!("arrays render through write_array")
        }
    }
}

fn write_array(out: &mut String, prop: &FbxProperty, depth: usize) {
    let len = match prop {
        FbxProperty::I32Array(v) => v.len(),
        FbxProperty::F64Array(v) => v.len(),
        _ => unreachable!(),
    };
    writeln!(out, " *{} {{", len).unwrap();
    indent(out, depth + 1);
    out.push_str("a: ");
    match prop {
        FbxProperty::I32Array(values) => {
            for (i, v) in values.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write!(out, "{}", v).unwrap();
            }
        }
        FbxProperty::F64Array(values) => {
            for (i, v) in values.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write!(out, "{}", v).unwrap();
            }
        }
        _ => unreachable!(),
    }
    out.push('\n');
    indent(out, depth);
    writeln!(out, "}}").unwrap();
}
