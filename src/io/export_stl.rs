// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! STL exporter, binary or ASCII

use super::export::{ensure_manifold, exportable_nodes, write_err, ExportArtifact, StlStorage, OUTPUT_STEM};
use super::FileExportFormat;
use crate::errors::ExportError;
use crate::geometry::Mesh;
use crate::scene::SceneGraph;
use std::io::{Cursor, Write};

const FORMAT: FileExportFormat = FileExportFormat::Stl;

/// Every root solid in one STL, coordinates in the program unit
pub(super) fn export(scene: &SceneGraph, storage: StlStorage) -> Result<Vec<ExportArtifact>, ExportError> {
    let mut mesh = Mesh::new();
    for node in exportable_nodes(scene) {
        ensure_manifold(&node.body.mesh, FORMAT, node)?;
        mesh.merge(&node.body.mesh);
    }

    let contents = match storage {
        StlStorage::Binary => write_binary(&mesh)?,
        StlStorage::Ascii => write_ascii(&mesh)?,
    };
    Ok(vec![ExportArtifact::new(format!("{}.stl", OUTPUT_STEM), contents)])
}

fn write_binary(mesh: &Mesh) -> Result<Vec<u8>, ExportError> {
    use stl_io::{Normal, Triangle as StlTriangle, Vertex as StlVertex};

    let triangles: Vec<StlTriangle> = (0..mesh.triangle_count())
        .map(|index| {
            let [v0, v1, v2] = mesh.triangle_points(index);
            let normal = mesh.face_normal(index);
            StlTriangle {
                normal: Normal::new([normal.x as f32, normal.y as f32, normal.z as f32]),
                vertices: [
                    StlVertex::new([v0.x as f32, v0.y as f32, v0.z as f32]),
                    StlVertex::new([v1.x as f32, v1.y as f32, v1.z as f32]),
                    StlVertex::new([v2.x as f32, v2.y as f32, v2.z as f32]),
                ],
            }
        })
        .collect();

    let mut out = Cursor::new(Vec::new());
    stl_io::write_stl(&mut out, triangles.iter()).map_err(write_err(FORMAT))?;
    Ok(out.into_inner())
}

fn write_ascii(mesh: &Mesh) -> Result<Vec<u8>, ExportError> {
    let mut out = Vec::new();
    write_ascii_to(&mut out, mesh).map_err(write_err(FORMAT))?;
    Ok(out)
}

fn write_ascii_to(out: &mut impl Write, mesh: &Mesh) -> std::io::Result<()> {
    writeln!(out, "solid {}", OUTPUT_STEM)?;

    for index in 0..mesh.triangle_count() {
        let normal = mesh.face_normal(index);
        writeln!(out, "  facet normal {} {} {}", normal.x, normal.y, normal.z)?;
        writeln!(out, "    outer loop")?;
        for v in mesh.triangle_points(index) {
            writeln!(out, "      vertex {} {} {}", v.x, v.y, v.z)?;
        }
        writeln!(out, "    endloop")?;
        writeln!(out, "  endfacet")?;
    }

    writeln!(out, "endsolid {}", OUTPUT_STEM)?;
    Ok(())
}
