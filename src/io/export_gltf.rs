// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! glTF 2.0 and GLB exporter
//!
//! glTF is defined in metres, so positions are scaled from the program unit.
//! One glTF mesh and node per scene root.

use super::export::{exportable_nodes, ExportArtifact, GltfStorage, OUTPUT_STEM};
use super::FileExportFormat;
use crate::errors::ExportError;
use crate::scene::SceneGraph;
use base64::Engine as _;
use serde_json::json;

const GLB_MAGIC: u32 = 0x46546C67; // "glTF"
const CHUNK_JSON: u32 = 0x4E4F534A;
const CHUNK_BIN: u32 = 0x004E4942;

const FLOAT: u32 = 5126;
const UNSIGNED_INT: u32 = 5125;
const ARRAY_BUFFER: u32 = 34962;
const ELEMENT_ARRAY_BUFFER: u32 = 34963;

/// `.gltf` with either a sibling `.bin` or an inlined buffer
pub(super) fn export(scene: &SceneGraph, storage: GltfStorage) -> Result<Vec<ExportArtifact>, ExportError> {
    let buffer = build_buffer(scene);
    let bin_name = format!("{}.bin", OUTPUT_STEM);
    let uri = match storage {
        GltfStorage::Standard => bin_name.clone(),
        GltfStorage::Embedded => format!(
            "data:application/octet-stream;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(&buffer.data)
        ),
    };

    let document = buffer.document(Some(uri));
    let json = serde_json::to_vec_pretty(&document).map_err(|err| ExportError::io(FileExportFormat::Gltf.label(), err))?;

    let mut artifacts = vec![ExportArtifact::new(format!("{}.gltf", OUTPUT_STEM), json)];
    if storage == GltfStorage::Standard {
        artifacts.push(ExportArtifact::new(bin_name, buffer.data));
    }
    Ok(artifacts)
}

/// Binary container: header, padded JSON chunk, padded BIN chunk
pub(super) fn export_glb(scene: &SceneGraph) -> Result<Vec<ExportArtifact>, ExportError> {
    let buffer = build_buffer(scene);
    let document = buffer.document(None);
    let json_string = serde_json::to_string(&document).map_err(|err| ExportError::io(FileExportFormat::Glb.label(), err))?;

    let json_length = align_to_multiple_of_four(json_string.len());
    let bin_length = align_to_multiple_of_four(buffer.data.len());
    let total_length = 12 + 8 + json_length + 8 + bin_length;

    let mut out = Vec::with_capacity(total_length);
    out.extend_from_slice(&GLB_MAGIC.to_le_bytes());
    out.extend_from_slice(&2u32.to_le_bytes());
    out.extend_from_slice(&(total_length as u32).to_le_bytes());

    out.extend_from_slice(&(json_length as u32).to_le_bytes());
    out.extend_from_slice(&CHUNK_JSON.to_le_bytes());
    out.extend_from_slice(json_string.as_bytes());
    out.resize(out.len() + json_length - json_string.len(), b' ');

    out.extend_from_slice(&(bin_length as u32).to_le_bytes());
    out.extend_from_slice(&CHUNK_BIN.to_le_bytes());
    out.extend_from_slice(&buffer.data);
    out.resize(out.len() + bin_length - buffer.data.len(), 0);

    Ok(vec![ExportArtifact::new(format!("{}.glb", OUTPUT_STEM), out)])
}

struct Buffer {
    data: Vec<u8>,
    meshes: Vec<serde_json::Value>,
    accessors: Vec<serde_json::Value>,
    views: Vec<serde_json::Value>,
}

impl Buffer {
    fn push_view(&mut self, bytes: &[u8], target: u32) -> usize {
        let offset = self.data.len();
        self.data.extend_from_slice(bytes);
        self.views.push(json!({
            "buffer": 0,
            "byteOffset": offset,
            "byteLength": bytes.len(),
            "target": target
        }));
        self.views.len() - 1
    }

    fn document(&self, uri: Option<String>) -> serde_json::Value {
        let mut buffer = json!({ "byteLength": self.data.len() });
        if let (Some(uri), Some(object)) = (uri, buffer.as_object_mut()) {
            object.insert("uri".into(), json!(uri));
        }
        let nodes: Vec<serde_json::Value> = (0..self.meshes.len()).map(|i| json!({ "mesh": i })).collect();
        json!({
            "asset": {
                "generator": "kcl-engine",
                "version": "2.0"
            },
            "scene": 0,
            "scenes": [{ "nodes": (0..nodes.len()).collect::<Vec<_>>() }],
            "nodes": nodes,
            "meshes": self.meshes,
            "accessors": self.accessors,
            "bufferViews": self.views,
            "buffers": [buffer]
        })
    }
}

fn build_buffer(scene: &SceneGraph) -> Buffer {
    let scale = scene.unit().to_metres();
    let mut buffer = Buffer {
        data: Vec::new(),
        meshes: Vec::new(),
        accessors: Vec::new(),
        views: Vec::new(),
    };

    for node in exportable_nodes(scene) {
        let mesh = &node.body.mesh;
        if mesh.is_empty() {
            continue;
        }

        let mut min = [f32::MAX; 3];
        let mut max = [f32::MIN; 3];
        let mut positions = Vec::with_capacity(mesh.vertex_count() * 12);
        let mut normals = Vec::with_capacity(mesh.vertex_count() * 12);
        for vertex in &mesh.vertices {
            let p = vertex.position * scale;
            for (axis, value) in [p.x, p.y, p.z].into_iter().enumerate() {
                let value = value as f32;
                min[axis] = min[axis].min(value);
                max[axis] = max[axis].max(value);
                positions.extend_from_slice(&value.to_le_bytes());
            }
            for value in [vertex.normal.x, vertex.normal.y, vertex.normal.z] {
                normals.extend_from_slice(&(value as f32).to_le_bytes());
            }
        }
        let indices: Vec<u8> = mesh
            .triangles
            .iter()
            .flat_map(|t| t.indices)
            .flat_map(|i| (i as u32).to_le_bytes())
            .collect();

        let position_view = buffer.push_view(&positions, ARRAY_BUFFER);
        let normal_view = buffer.push_view(&normals, ARRAY_BUFFER);
        let index_view = buffer.push_view(&indices, ELEMENT_ARRAY_BUFFER);

        let first = buffer.accessors.len();
        buffer.accessors.push(json!({
            "bufferView": position_view,
            "componentType": FLOAT,
            "count": mesh.vertex_count(),
            "type": "VEC3",
            "min": min,
            "max": max
        }));
        buffer.accessors.push(json!({
            "bufferView": normal_view,
            "componentType": FLOAT,
            "count": mesh.vertex_count(),
            "type": "VEC3"
        }));
        buffer.accessors.push(json!({
            "bufferView": index_view,
            "componentType": UNSIGNED_INT,
            "count": mesh.triangle_count() * 3,
            "type": "SCALAR"
        }));

        buffer.meshes.push(json!({
            "name": format!("node_{}", node.id.0),
            "primitives": [{
                "attributes": { "POSITION": first, "NORMAL": first + 1 },
                "indices": first + 2,
                "mode": 4
            }]
        }));
    }

    buffer
}

fn align_to_multiple_of_four(n: usize) -> usize {
    (n + 3) & !3
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::SourceRange;
    use crate::geometry::{Body, Primitive};
    use crate::scene::Construction;
    use crate::units::UnitLength;
    use approx::assert_relative_eq;
    use nalgebra::Vector3;

    fn cube_scene() -> SceneGraph {
        let mut scene = SceneGraph::new(UnitLength::Mm);
        scene.add(
            Construction::Profile { sketch: 0 },
            Body::solid(
                Primitive::Cuboid {
                    size: Vector3::new(10.0, 10.0, 10.0),
                }
                .to_mesh(),
            ),
            SourceRange::default(),
        );
        scene
    }

    #[test]
    fn test_standard_writes_separate_buffer() {
        let artifacts = export(&cube_scene(), GltfStorage::Standard).unwrap();
        let names: Vec<&str> = artifacts.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["output.gltf", "output.bin"]);

        let document: serde_json::Value = serde_json::from_slice(&artifacts[0].contents).unwrap();
        assert_eq!(document["buffers"][0]["uri"], "output.bin");
        assert_eq!(
            document["buffers"][0]["byteLength"].as_u64(),
            Some(artifacts[1].contents.len() as u64)
        );
        assert_eq!(document["accessors"][2]["count"], 36);
        // Millimetres become metres
        assert_relative_eq!(document["accessors"][0]["max"][0].as_f64().unwrap(), 0.01, epsilon = 1e-6);
    }

    #[test]
    fn test_embedded_buffer_decodes() {
        let artifacts = export(&cube_scene(), GltfStorage::Embedded).unwrap();
        assert_eq!(artifacts.len(), 1);
        let document: serde_json::Value = serde_json::from_slice(&artifacts[0].contents).unwrap();
        let uri = document["buffers"][0]["uri"].as_str().unwrap();
        let encoded = uri.strip_prefix("data:application/octet-stream;base64,").unwrap();
        let decoded = base64::engine::general_purpose::STANDARD.decode(encoded).unwrap();
        assert_eq!(decoded.len() as u64, document["buffers"][0]["byteLength"].as_u64().unwrap());
    }

    #[test]
    fn test_glb_layout() {
        let artifacts = export_glb(&cube_scene()).unwrap();
        let bytes = &artifacts[0].contents;
        assert_eq!(&bytes[0..4], b"glTF");
        assert_eq!(u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]) as usize, bytes.len());
        assert_eq!(bytes.len() % 4, 0);
        assert_eq!(&bytes[16..20], b"JSON");
    }
}
