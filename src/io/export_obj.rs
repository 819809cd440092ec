// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Wavefront OBJ exporter

use super::export::{exportable_nodes, indexed, write_err, ExportArtifact, OUTPUT_STEM};
use super::FileExportFormat;
use crate::errors::ExportError;
use crate::scene::SceneGraph;
use std::io::Write;

/// One `o` group per root. Faces for meshes, `l` elements for polylines.
pub(super) fn export(scene: &SceneGraph) -> Result<Vec<ExportArtifact>, ExportError> {
    let mut out = Vec::new();
    write_obj(&mut out, scene).map_err(write_err(FileExportFormat::Obj))?;
    Ok(vec![ExportArtifact::new(format!("{}.obj", OUTPUT_STEM), out)])
}

fn write_obj(out: &mut impl Write, scene: &SceneGraph) -> std::io::Result<()> {
    writeln!(out, "# kcl-engine OBJ export")?;
    writeln!(out, "# units: {}", scene.unit())?;

    // OBJ indices are 1-based and global to the file
    let mut base = 1;
    for node in exportable_nodes(scene) {
        writeln!(out, "o node_{}", node.id.0)?;

        let (positions, triangles) = indexed(&node.body.mesh);
        for p in &positions {
            writeln!(out, "v {} {} {}", p.x, p.y, p.z)?;
        }
        for [a, b, c] in &triangles {
            writeln!(out, "f {} {} {}", base + a, base + b, base + c)?;
        }
        base += positions.len();

        for curve in &node.body.curves {
            if curve.points.len() < 2 {
                continue;
            }
            for p in &curve.points {
                writeln!(out, "v {} {} {}", p.x, p.y, p.z)?;
            }
            let mut indices: Vec<String> = (0..curve.points.len()).map(|i| (base + i).to_string()).collect();
            if curve.closed {
                indices.push(base.to_string());
            }
            writeln!(out, "l {}", indices.join(" "))?;
            base += curve.points.len();
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::SourceRange;
    use crate::geometry::{Body, Polyline, Primitive};
    use crate::scene::Construction;
    use crate::units::UnitLength;
    use nalgebra::{Point3, Vector3};

    #[test]
    fn test_solid_and_curve() {
        let mut scene = SceneGraph::new(UnitLength::In);
        scene.add(
            Construction::Profile { sketch: 0 },
            Body::solid(
                Primitive::Cuboid {
                    size: Vector3::new(1.0, 1.0, 1.0),
                }
                .to_mesh(),
            ),
            SourceRange::default(),
        );
        scene.add(
            Construction::Profile { sketch: 1 },
            Body::curve(Polyline {
                points: vec![Point3::origin(), Point3::new(1.0, 0.0, 0.0), Point3::new(1.0, 1.0, 0.0)],
                closed: false,
            }),
            SourceRange::default(),
        );

        let artifacts = export(&scene).unwrap();
        assert_eq!(artifacts[0].name, "output.obj");
        let text = String::from_utf8(artifacts[0].contents.clone()).unwrap();
        assert!(text.contains("# units: in"));
        assert_eq!(text.lines().filter(|l| l.starts_with("v ")).count(), 8 + 3);
        assert_eq!(text.lines().filter(|l| l.starts_with("f ")).count(), 12);
        assert!(text.contains("\nl 9 10 11\n"));
    }
}
