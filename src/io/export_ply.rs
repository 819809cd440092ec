// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! ASCII PLY exporter

use super::export::{exportable_nodes, indexed, write_err, ExportArtifact, OUTPUT_STEM};
use super::FileExportFormat;
use crate::errors::ExportError;
use crate::geometry::Mesh;
use crate::scene::SceneGraph;
use std::io::Write;

pub(super) fn export(scene: &SceneGraph) -> Result<Vec<ExportArtifact>, ExportError> {
    let mut mesh = Mesh::new();
    for node in exportable_nodes(scene) {
        mesh.merge(&node.body.mesh);
    }

    let mut out = Vec::new();
    write_ply(&mut out, &mesh, &scene.unit().to_string()).map_err(write_err(FileExportFormat::Ply))?;
    Ok(vec![ExportArtifact::new(format!("{}.ply", OUTPUT_STEM), out)])
}

fn write_ply(out: &mut impl Write, mesh: &Mesh, unit: &str) -> std::io::Result<()> {
    let (positions, triangles) = indexed(mesh);

    writeln!(out, "ply")?;
    writeln!(out, "format ascii 1.0")?;
    writeln!(out, "comment generated by kcl-engine")?;
    writeln!(out, "comment units {}", unit)?;
    writeln!(out, "element vertex {}", positions.len())?;
    writeln!(out, "property double x")?;
    writeln!(out, "property double y")?;
    writeln!(out, "property double z")?;
    writeln!(out, "element face {}", triangles.len())?;
    writeln!(out, "property list uchar int vertex_indices")?;
    writeln!(out, "end_header")?;

    for p in &positions {
        writeln!(out, "{} {} {}", p.x, p.y, p.z)?;
    }
    for [a, b, c] in &triangles {
        writeln!(out, "3 {} {} {}", a, b, c)?;
    }
    Ok(())
}
