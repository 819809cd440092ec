// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Export dispatch shared by every file format

use super::{export_3mf, export_gltf, export_obj, export_ply, export_step, export_stl};
use crate::errors::ExportError;
use crate::geometry::{weld_positions, GeometryKind, HalfEdgeMesh, Mesh};
use crate::scene::{SceneGraph, SceneNode};
use chrono::{DateTime, Utc};
use nalgebra::Point3;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileExportFormat {
    Step,
    Stl,
    Obj,
    Ply,
    Gltf,
    Glb,
    #[serde(rename = "3mf")]
    ThreeMf,
}

impl FileExportFormat {
    pub const ALL: [FileExportFormat; 7] = [
        FileExportFormat::Step,
        FileExportFormat::Stl,
        FileExportFormat::Obj,
        FileExportFormat::Ply,
        FileExportFormat::Gltf,
        FileExportFormat::Glb,
        FileExportFormat::ThreeMf,
    ];

    pub fn extension(self) -> &'static str {
        match self {
            FileExportFormat::Step => "step",
            FileExportFormat::Stl => "stl",
            FileExportFormat::Obj => "obj",
            FileExportFormat::Ply => "ply",
            FileExportFormat::Gltf => "gltf",
            FileExportFormat::Glb => "glb",
            FileExportFormat::ThreeMf => "3mf",
        }
    }

    /// Name used in error messages
    pub fn label(self) -> &'static str {
        match self {
            FileExportFormat::Step => "STEP",
            FileExportFormat::Stl => "STL",
            FileExportFormat::Obj => "OBJ",
            FileExportFormat::Ply => "PLY",
            FileExportFormat::Gltf => "glTF",
            FileExportFormat::Glb => "GLB",
            FileExportFormat::ThreeMf => "3MF",
        }
    }

    /// Body kinds the format can carry
    fn supports(self, kind: GeometryKind) -> bool {
        match self {
            FileExportFormat::Step | FileExportFormat::Obj => true,
            FileExportFormat::Ply | FileExportFormat::Gltf | FileExportFormat::Glb => {
                kind != GeometryKind::Curve
            }
            FileExportFormat::Stl | FileExportFormat::ThreeMf => kind == GeometryKind::Solid,
        }
    }
}

impl fmt::Display for FileExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for FileExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "step" | "stp" => Ok(FileExportFormat::Step),
            "stl" => Ok(FileExportFormat::Stl),
            "obj" => Ok(FileExportFormat::Obj),
            "ply" => Ok(FileExportFormat::Ply),
            "gltf" => Ok(FileExportFormat::Gltf),
            "glb" => Ok(FileExportFormat::Glb),
            "3mf" => Ok(FileExportFormat::ThreeMf),
            other => Err(ExportError::UnsupportedFormat(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StlStorage {
    #[default]
    Binary,
    Ascii,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GltfStorage {
    /// `.gltf` plus a separate `.bin` buffer
    Standard,
    /// Buffer inlined as a base64 data URI
    #[default]
    Embedded,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportOptions {
    pub stl_storage: StlStorage,
    pub gltf_storage: GltfStorage,
    /// Written into the STEP header instead of the current time
    pub timestamp: DateTime<Utc>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            stl_storage: StlStorage::default(),
            gltf_storage: GltfStorage::default(),
            timestamp: DateTime::<Utc>::UNIX_EPOCH,
        }
    }
}

/// One named output file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportArtifact {
    pub name: String,
    pub contents: Vec<u8>,
}

impl ExportArtifact {
    pub fn new(name: impl Into<String>, contents: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            contents,
        }
    }
}

/// Base name of every artifact
pub(super) const OUTPUT_STEM: &str = "output";

/// Serialise the scene roots in `format`
pub fn export(
    scene: &SceneGraph,
    format: FileExportFormat,
    options: &ExportOptions,
) -> Result<Vec<ExportArtifact>, ExportError> {
    if scene.is_empty() {
        return Err(ExportError::EmptyScene);
    }
    for node in exportable_nodes(scene) {
        if !format.supports(node.kind()) {
            return Err(ExportError::unsupported(
                format.label(),
                format!("{} geometry (node {})", node.kind().name(), node.id),
            ));
        }
    }

    let artifacts = match format {
        FileExportFormat::Step => export_step::export(scene, options)?,
        FileExportFormat::Stl => export_stl::export(scene, options.stl_storage)?,
        FileExportFormat::Obj => export_obj::export(scene)?,
        FileExportFormat::Ply => export_ply::export(scene)?,
        FileExportFormat::Gltf => export_gltf::export(scene, options.gltf_storage)?,
        FileExportFormat::Glb => export_gltf::export_glb(scene)?,
        FileExportFormat::ThreeMf => export_3mf::export(scene)?,
    };

    log::debug!(
        format = format.extension(),
        artifacts = artifacts.len(),
        bytes = artifacts.iter().map(|a| a.contents.len()).sum::<usize>();
        "exported scene"
    );
    Ok(artifacts)
}

/// Roots that carry any geometry
pub(super) fn exportable_nodes(scene: &SceneGraph) -> impl Iterator<Item = &SceneNode> {
    scene.roots().filter(|node| !node.body.is_empty())
}

/// Fail when an edge is shared by more than two faces after welding
pub(super) fn ensure_manifold(
    mesh: &Mesh,
    format: FileExportFormat,
    node: &SceneNode,
) -> Result<HalfEdgeMesh, ExportError> {
    let topology = HalfEdgeMesh::from_mesh(mesh);
    let bad = topology.non_manifold_edge_count();
    if bad > 0 {
        return Err(ExportError::unsupported(
            format.label(),
            format!("{} non-manifold edge(s) in node {}", bad, node.id),
        ));
    }
    Ok(topology)
}

/// Welded positions and triangle indices into them
pub(super) fn indexed(mesh: &Mesh) -> (Vec<Point3<f64>>, Vec<[usize; 3]>) {
    let (positions, remap) = weld_positions(mesh.vertices.iter().map(|v| &v.position), 1e-9);
    let triangles = mesh
        .triangles
        .iter()
        .map(|t| t.indices.map(|i| remap[i]))
        .collect();
    (positions, triangles)
}

pub(super) fn write_err(format: FileExportFormat) -> impl Fn(std::io::Error) -> ExportError {
    move |err| ExportError::io(format.label(), err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_names() {
        for format in FileExportFormat::ALL {
            assert_eq!(format.extension().parse::<FileExportFormat>().unwrap(), format);
        }
        assert_eq!("STP".parse::<FileExportFormat>().unwrap(), FileExportFormat::Step);
        assert_eq!(
            "fbx".parse::<FileExportFormat>(),
            Err(ExportError::UnsupportedFormat("fbx".into()))
        );
        assert_eq!(
            serde_json::to_string(&FileExportFormat::ThreeMf).unwrap(),
            "\"3mf\""
        );
    }

    #[test]
    fn test_options_default_to_epoch() {
        let options = ExportOptions::default();
        assert_eq!(options.timestamp.timestamp(), 0);
        assert_eq!(options.stl_storage, StlStorage::Binary);
    }

    #[test]
    fn test_kind_support() {
        assert!(FileExportFormat::Obj.supports(GeometryKind::Curve));
        assert!(!FileExportFormat::Stl.supports(GeometryKind::Surface));
        assert!(FileExportFormat::Glb.supports(GeometryKind::Surface));
        assert!(!FileExportFormat::ThreeMf.supports(GeometryKind::Curve));
    }
}
