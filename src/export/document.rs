//! FBX document model.
//!
//! FBX files, ASCII and binary alike, are a tree of named records, each
//! carrying a property list. [`build_document`] lowers a materialized
//! [`Scene`] into that record tree (FBX 7.4 layout: header, global
//! settings, definitions, objects, connections); the `fbx_ascii` and
//! `fbx_binary` modules render the same tree into their respective
//! encodings.

use crate::coord;
use crate::scene::{Node, PolygonMesh, Scene};
use glam::Mat4;

/// A single record property.
#[derive(Debug, Clone)]
pub enum FbxProperty {
    I32(i32),
    I64(i64),
    F64(f64),
    Str(String),
    I32Array(Vec<i32>),
    F64Array(Vec<f64>),
}

impl From<i32> for FbxProperty {
    fn from(v: i32) -> Self {
        FbxProperty::I32(v)
    }
}
impl From<i64> for FbxProperty {
    fn from(v: i64) -> Self {
        FbxProperty::I64(v)
    }
}
impl From<f64> for FbxProperty {
    fn from(v: f64) -> Self {
        FbxProperty::F64(v)
    }
}
impl From<&str> for FbxProperty {
    fn from(v: &str) -> Self {
        FbxProperty::Str(v.to_string())
    }
}
impl From<String> for FbxProperty {
    fn from(v: String) -> Self {
        FbxProperty::Str(v)
    }
}
impl From<Vec<i32>> for FbxProperty {
    fn from(v: Vec<i32>) -> Self {
        FbxProperty::I32Array(v)
    }
}
impl From<Vec<f64>> for FbxProperty {
    fn from(v: Vec<f64>) -> Self {
        FbxProperty::F64Array(v)
    }
}

/// A named record with properties and child records.
#[derive(Debug, Clone, Default)]
pub struct FbxNode {
    pub name: String,
    pub properties: Vec<FbxProperty>,
    pub children: Vec<FbxNode>,
}

impl FbxNode {
    /// An empty record.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// A childless record with properties.
    pub fn leaf(name: &str, properties: Vec<FbxProperty>) -> Self {
        Self {
            name: name.to_string(),
            properties,
            children: Vec::new(),
        }
    }

    /// Append a child record, returning `self` for chaining.
    pub fn with(mut self, child: FbxNode) -> Self {
        self.children.push(child);
        self
    }

    /// Append a child record.
    pub fn add(&mut self, child: FbxNode) {
        self.children.push(child);
    }
}

/// A `Properties70` `P` entry.
fn p70(name: &str, type1: &str, type2: &str, flags: &str, values: Vec<FbxProperty>) -> FbxNode {
    let mut properties: Vec<FbxProperty> =
        vec![name.into(), type1.into(), type2.into(), flags.into()];
    properties.extend(values);
    FbxNode::leaf("P", properties)
}

/// Sequential object id allocator. Id 0 is reserved for the scene root
/// model.
struct IdGen {
    next: i64,
}

impl IdGen {
    fn new() -> Self {
        Self { next: 1_000_000 }
    }

    fn next(&mut self) -> i64 {
        let id = self.next;
        self.next += 1;
        id
    }
}

fn flatten_vec3(data: &[glam::Vec3]) -> Vec<f64> {
    data.iter()
        .flat_map(|v| [v.x as f64, v.y as f64, v.z as f64])
        .collect()
}

fn flatten_mat4(m: &Mat4) -> Vec<f64> {
    m.to_cols_array().iter().map(|&v| v as f64).collect()
}

/// FBX polygon index encoding: the last index of each polygon is bitwise
/// negated to mark the polygon boundary.
fn polygon_vertex_index(mesh: &PolygonMesh) -> Vec<i32> {
    let mut out = Vec::with_capacity(mesh.polygon_indices.len());
    for (_, poly) in mesh.polygons() {
        for (i, &v) in poly.iter().enumerate() {
            if i + 1 == poly.len() {
                out.push(!(v as i32));
            } else {
                out.push(v as i32);
            }
        }
    }
    out
}

fn layer_element(kind: &str, version: i32, mapping: &str) -> FbxNode {
    FbxNode::leaf(kind, vec![0.into()])
        .with(FbxNode::leaf("Version", vec![version.into()]))
        .with(FbxNode::leaf("Name", vec!["".into()]))
        .with(FbxNode::leaf("MappingInformationType", vec![mapping.into()]))
        .with(FbxNode::leaf(
            "ReferenceInformationType",
            vec!["Direct".into()],
        ))
}

fn geometry_record(id: i64, name: &str, mesh: &PolygonMesh) -> FbxNode {
    let mut geo = FbxNode::leaf(
        "Geometry",
        vec![id.into(), format!("Geometry::{}", name).into(), "Mesh".into()],
    );
    geo.add(FbxNode::leaf(
        "Vertices",
        vec![flatten_vec3(&mesh.points).into()],
    ));
    geo.add(FbxNode::leaf(
        "PolygonVertexIndex",
        vec![polygon_vertex_index(mesh).into()],
    ));
    geo.add(FbxNode::leaf("GeometryVersion", vec![124.into()]));

    let mut layer = FbxNode::leaf("Layer", vec![0.into()]);
    layer.add(FbxNode::leaf("Version", vec![100.into()]));
    let mut layer_ref = |layer: &mut FbxNode, kind: &str| {
        layer.add(
            FbxNode::new("LayerElement")
                .with(FbxNode::leaf("Type", vec![kind.into()]))
                .with(FbxNode::leaf("TypedIndex", vec![0.into()])),
        );
    };

    if !mesh.normals.is_empty() {
        let element = layer_element("LayerElementNormal", 101, "ByVertice").with(FbxNode::leaf(
            "Normals",
            vec![flatten_vec3(&mesh.normals).into()],
        ));
        geo.add(element);
        layer_ref(&mut layer, "LayerElementNormal");
    }
    if !mesh.tangents.is_empty() {
        let xyz: Vec<f64> = mesh
            .tangents
            .iter()
            .flat_map(|t| [t.x as f64, t.y as f64, t.z as f64])
            .collect();
        let w: Vec<f64> = mesh.tangents.iter().map(|t| t.w as f64).collect();
        let element = layer_element("LayerElementTangent", 102, "ByVertice")
            .with(FbxNode::leaf("Tangents", vec![xyz.into()]))
            .with(FbxNode::leaf("TangentsW", vec![w.into()]));
        geo.add(element);
        layer_ref(&mut layer, "LayerElementTangent");
    }
    if !mesh.uv.is_empty() {
        let uv: Vec<f64> = mesh
            .uv
            .iter()
            .flat_map(|t| [t.x as f64, t.y as f64])
            .collect();
        let element =
            layer_element("LayerElementUV", 101, "ByVertice").with(FbxNode::leaf("UV", vec![uv.into()]));
        geo.add(element);
        layer_ref(&mut layer, "LayerElementUV");
    }
    if !mesh.colors.is_empty() {
        let colors: Vec<f64> = mesh
            .colors
            .iter()
            .flat_map(|c| [c.x as f64, c.y as f64, c.z as f64, c.w as f64])
            .collect();
        let element = layer_element("LayerElementColor", 101, "ByVertice")
            .with(FbxNode::leaf("Colors", vec![colors.into()]));
        geo.add(element);
        layer_ref(&mut layer, "LayerElementColor");
    }
    if !mesh.polygon_materials.is_empty() {
        // Negative ids mean "default material"; they map to slot 0.
        let materials: Vec<i32> = mesh.polygon_materials.iter().map(|&m| m.max(0)).collect();
        let element = FbxNode::leaf("LayerElementMaterial", vec![0.into()])
            .with(FbxNode::leaf("Version", vec![101.into()]))
            .with(FbxNode::leaf("Name", vec!["".into()]))
            .with(FbxNode::leaf(
                "MappingInformationType",
                vec!["ByPolygon".into()],
            ))
            .with(FbxNode::leaf(
                "ReferenceInformationType",
                vec!["IndexToDirect".into()],
            ))
            .with(FbxNode::leaf("Materials", vec![materials.into()]));
        geo.add(element);
        layer_ref(&mut layer, "LayerElementMaterial");
    }
    geo.add(layer);
    geo
}

fn model_record(id: i64, node: &Node) -> FbxNode {
    let class = if node.mesh.is_some() { "Mesh" } else { "Null" };
    let euler = coord::euler_zxy_degrees(node.rotation);

    let mut props = FbxNode::new("Properties70");
    props.add(p70(
        "Lcl Translation",
        "Lcl Translation",
        "",
        "A",
        vec![
            (node.translation.x as f64).into(),
            (node.translation.y as f64).into(),
            (node.translation.z as f64).into(),
        ],
    ));
    props.add(p70(
        "Lcl Rotation",
        "Lcl Rotation",
        "",
        "A",
        vec![
            (euler.x as f64).into(),
            (euler.y as f64).into(),
            (euler.z as f64).into(),
        ],
    ));
    props.add(p70(
        "Lcl Scaling",
        "Lcl Scaling",
        "",
        "A",
        vec![
            (node.scale.x as f64).into(),
            (node.scale.y as f64).into(),
            (node.scale.z as f64).into(),
        ],
    ));
    // 4 = ZXY, the rotation order Lcl Rotation is expressed in.
    props.add(p70("RotationOrder", "enum", "", "", vec![4.into()]));

    FbxNode::leaf(
        "Model",
        vec![
            id.into(),
            format!("Model::{}", node.name).into(),
            class.into(),
        ],
    )
    .with(FbxNode::leaf("Version", vec![232.into()]))
    .with(props)
}

fn connection(child: i64, parent: i64) -> FbxNode {
    FbxNode::leaf("C", vec!["OO".into(), child.into(), parent.into()])
}

/// Lower a materialized scene into the FBX 7.4 record tree. The returned
/// node is a virtual root; its children are the file's top-level records.
pub fn build_document(scene: &Scene) -> FbxNode {
    let mut ids = IdGen::new();
    let mut objects = FbxNode::new("Objects");
    let mut connections = FbxNode::new("Connections");

    // Model ids, indexed like the scene arena. The root model is id 0 and
    // is implicit in FBX, so it gets no record of its own.
    let model_ids: Vec<i64> = scene
        .nodes()
        .map(|(_, node)| if node.is_root() { 0 } else { ids.next() })
        .collect();

    let mut geometry_count = 0;
    let mut deformer_count = 0;

    for (index, (handle, node)) in scene.nodes().enumerate() {
        if node.is_root() {
            continue;
        }
        let model_id = model_ids[index];
        objects.add(model_record(model_id, node));
        let parent_id = scene
            .parent(handle)
            .map_or(0, |p| model_ids[p.index as usize]);
        connections.add(connection(model_id, parent_id));

        let Some(mesh) = &node.mesh else {
            continue;
        };
        let geometry_id = ids.next();
        geometry_count += 1;
        objects.add(geometry_record(geometry_id, &node.name, mesh));
        connections.add(connection(geometry_id, model_id));

        if let Some(skin) = &mesh.skin {
            let skin_id = ids.next();
            deformer_count += 1;
            objects.add(
                FbxNode::leaf(
                    "Deformer",
                    vec![skin_id.into(), "Deformer::".into(), "Skin".into()],
                )
                .with(FbxNode::leaf("Version", vec![101.into()])),
            );
            connections.add(connection(skin_id, geometry_id));

            for cluster in &skin.clusters {
                let cluster_id = ids.next();
                deformer_count += 1;
                let record = FbxNode::leaf(
                    "SubDeformer",
                    vec![cluster_id.into(), "SubDeformer::".into(), "Cluster".into()],
                )
                .with(FbxNode::leaf("Version", vec![100.into()]))
                .with(FbxNode::leaf(
                    "Indexes",
                    vec![cluster
                        .vertex_indices
                        .iter()
                        .map(|&i| i as i32)
                        .collect::<Vec<i32>>()
                        .into()],
                ))
                .with(FbxNode::leaf(
                    "Weights",
                    vec![cluster.vertex_weights.clone().into()],
                ))
                .with(FbxNode::leaf(
                    "Transform",
                    vec![flatten_mat4(&cluster.bindpose).into()],
                ));
                objects.add(record);
                connections.add(connection(cluster_id, skin_id));
                // The bone model drives the cluster.
                connections.add(connection(model_ids[cluster.bone.index as usize], cluster_id));
            }
        }

        if !mesh.blend_channels.is_empty() {
            let blendshape_id = ids.next();
            deformer_count += 1;
            objects.add(
                FbxNode::leaf(
                    "Deformer",
                    vec![
                        blendshape_id.into(),
                        "Deformer::".into(),
                        "BlendShape".into(),
                    ],
                )
                .with(FbxNode::leaf("Version", vec![100.into()])),
            );
            connections.add(connection(blendshape_id, geometry_id));

            for channel in &mesh.blend_channels {
                let channel_id = ids.next();
                deformer_count += 1;
                let full_weights: Vec<f64> =
                    channel.frames.iter().map(|f| f.weight as f64).collect();
                objects.add(
                    FbxNode::leaf(
                        "Deformer",
                        vec![
                            channel_id.into(),
                            format!("SubDeformer::{}", channel.name).into(),
                            "BlendShapeChannel".into(),
                        ],
                    )
                    .with(FbxNode::leaf("Version", vec![100.into()]))
                    .with(FbxNode::leaf("DeformPercent", vec![0.0f64.into()]))
                    .with(FbxNode::leaf("FullWeights", vec![full_weights.into()])),
                );
                connections.add(connection(channel_id, blendshape_id));

                for (fi, frame) in channel.frames.iter().enumerate() {
                    let shape_id = ids.next();
                    geometry_count += 1;
                    // Shapes store deltas against the base geometry.
                    let deltas: Vec<f64> = mesh
                        .points
                        .iter()
                        .zip(&frame.points)
                        .flat_map(|(base, p)| {
                            let d = *p - *base;
                            [d.x as f64, d.y as f64, d.z as f64]
                        })
                        .collect();
                    let indexes: Vec<i32> = (0..mesh.points.len() as i32).collect();
                    let mut shape = FbxNode::leaf(
                        "Geometry",
                        vec![
                            shape_id.into(),
                            format!("Geometry::{}.{}", channel.name, fi).into(),
                            "Shape".into(),
                        ],
                    )
                    .with(FbxNode::leaf("Version", vec![100.into()]))
                    .with(FbxNode::leaf("Indexes", vec![indexes.into()]))
                    .with(FbxNode::leaf("Vertices", vec![deltas.into()]));
                    if !frame.normals.is_empty() {
                        shape.add(FbxNode::leaf(
                            "Normals",
                            vec![flatten_vec3(&frame.normals).into()],
                        ));
                    }
                    objects.add(shape);
                    connections.add(connection(shape_id, channel_id));
                }
            }
        }
    }

    let header = FbxNode::new("FBXHeaderExtension")
        .with(FbxNode::leaf("FBXHeaderVersion", vec![1003.into()]))
        .with(FbxNode::leaf("FBXVersion", vec![7400.into()]))
        .with(FbxNode::leaf(
            "Creator",
            vec![format!("fbx-exporter {}", env!("CARGO_PKG_VERSION")).into()],
        ));

    let global_settings = FbxNode::new("GlobalSettings")
        .with(FbxNode::leaf("Version", vec![1000.into()]))
        .with(FbxNode::new("Properties70").with(p70(
            "UnitScaleFactor",
            "double",
            "Number",
            "",
            vec![scene.system_unit.unit_scale_factor().into()],
        )));

    let model_count = scene.node_count() as i32 - 1;
    let definitions = FbxNode::new("Definitions")
        .with(FbxNode::leaf("Version", vec![100.into()]))
        .with(FbxNode::leaf(
            "Count",
            vec![(model_count + geometry_count + deformer_count).into()],
        ))
        .with(
            FbxNode::leaf("ObjectType", vec!["Model".into()])
                .with(FbxNode::leaf("Count", vec![model_count.into()])),
        )
        .with(
            FbxNode::leaf("ObjectType", vec!["Geometry".into()])
                .with(FbxNode::leaf("Count", vec![geometry_count.into()])),
        )
        .with(
            FbxNode::leaf("ObjectType", vec!["Deformer".into()])
                .with(FbxNode::leaf("Count", vec![deformer_count.into()])),
        );

    let documents = FbxNode::new("Documents")
        .with(FbxNode::leaf("Count", vec![1.into()]))
        .with(
            FbxNode::leaf(
                "Document",
                vec![
                    ids.next().into(),
                    scene.name.clone().into(),
                    "Scene".into(),
                ],
            )
            .with(FbxNode::leaf("RootNode", vec![0i64.into()])),
        );

    FbxNode::new("")
        .with(header)
        .with(global_settings)
        .with(documents)
        .with(definitions)
        .with(objects)
        .with(connections)
}
