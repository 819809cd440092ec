// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! STEP AP214 exporter writing a faceted boundary representation
//!
//! Coplanar edge-connected triangles are merged into one planar face whose
//! bounds are the region's boundary loops. Closed solids become
//! `MANIFOLD_SOLID_BREP`, open meshes `SHELL_BASED_SURFACE_MODEL` and curves
//! `POLYLINE`s in a `GEOMETRIC_CURVE_SET`.

use super::export::{ensure_manifold, exportable_nodes, ExportArtifact, ExportOptions, OUTPUT_STEM};
use super::FileExportFormat;
use crate::errors::ExportError;
use crate::geometry::{GeometryKind, HalfEdgeMesh, Polyline};
use crate::scene::SceneGraph;
use crate::units::UnitLength;
use nalgebra::{Point3, Vector3};

const SCHEMA: &str = "AUTOMOTIVE_DESIGN { 1 0 10303 214 1 1 1 1 }";

pub(super) fn export(scene: &SceneGraph, options: &ExportOptions) -> Result<Vec<ExportArtifact>, ExportError> {
    let mut step = StepWriter::default();
    let mut items = Vec::new();

    for node in exportable_nodes(scene) {
        let name = format!("node_{}", node.id.0);
        match node.kind() {
            GeometryKind::Curve => {
                let curves: Vec<usize> = node.body.curves.iter().map(|c| step.polyline(c)).collect();
                items.push(step.add(format!("GEOMETRIC_CURVE_SET('{}',({}))", name, refs(&curves))));
            }
            kind => {
                let topology = ensure_manifold(&node.body.mesh, FileExportFormat::Step, node)?;
                let faces = step.faces(&topology);
                if kind == GeometryKind::Solid && topology.is_closed() {
                    let shell = step.add(format!("CLOSED_SHELL('',({}))", refs(&faces)));
                    items.push(step.add(format!("MANIFOLD_SOLID_BREP('{}',#{})", name, shell)));
                } else {
                    let shell = step.add(format!("OPEN_SHELL('',({}))", refs(&faces)));
                    items.push(step.add(format!("SHELL_BASED_SURFACE_MODEL('{}',(#{}))", name, shell)));
                }
            }
        }
    }

    let context = step.context(scene.unit());
    let origin = step.placement(&Point3::origin(), &Vector3::z(), &Vector3::x());
    items.insert(0, origin);
    let representation = step.add(format!(
        "SHAPE_REPRESENTATION('{}',({}),#{})",
        OUTPUT_STEM,
        refs(&items),
        context
    ));
    step.product(representation);

    let timestamp = options.timestamp.format("%Y-%m-%dT%H:%M:%S").to_string();
    let contents = step.finish(&timestamp);
    Ok(vec![ExportArtifact::new(format!("{}.step", OUTPUT_STEM), contents.into_bytes())])
}

#[derive(Default)]
struct StepWriter {
    entities: Vec<String>,
}

impl StepWriter {
    /// Append an entity and return its instance number
    fn add(&mut self, entity: impl Into<String>) -> usize {
        self.entities.push(entity.into());
        self.entities.len()
    }

    fn point(&mut self, p: &Point3<f64>) -> usize {
        self.add(format!("CARTESIAN_POINT('',({},{},{}))", real(p.x), real(p.y), real(p.z)))
    }

    fn direction(&mut self, d: &Vector3<f64>) -> usize {
        self.add(format!("DIRECTION('',({},{},{}))", real(d.x), real(d.y), real(d.z)))
    }

    fn placement(&mut self, origin: &Point3<f64>, axis: &Vector3<f64>, reference: &Vector3<f64>) -> usize {
        let location = self.point(origin);
        self.placement_at(location, axis, reference)
    }

    fn placement_at(&mut self, location: usize, axis: &Vector3<f64>, reference: &Vector3<f64>) -> usize {
        let axis = self.direction(axis);
        let reference = self.direction(reference);
        self.add(format!("AXIS2_PLACEMENT_3D('',#{},#{},#{})", location, axis, reference))
    }

    /// One `FACE_SURFACE` per planar region
    fn faces(&mut self, topology: &HalfEdgeMesh) -> Vec<usize> {
        let mut point_ids: Vec<Option<usize>> = vec![None; topology.vertex_count()];
        let mut faces = Vec::new();

        for region in topology.planar_regions() {
            let loops = topology.region_loops(&region);
            let Some(first) = loops.first().and_then(|l| l.first()).copied() else {
                continue;
            };

            let mut bounds = Vec::with_capacity(loops.len());
            for (index, cycle) in loops.iter().enumerate() {
                let points: Vec<usize> = cycle
                    .iter()
                    .map(|&v| match point_ids[v] {
                        Some(id) => id,
                        None => {
                            let id = self.point(&topology.vertices[v]);
                            point_ids[v] = Some(id);
                            id
                        }
                    })
                    .collect();
                let poly = self.add(format!("POLY_LOOP('',({}))", refs(&points)));
                let bound = if index == 0 { "FACE_OUTER_BOUND" } else { "FACE_BOUND" };
                bounds.push(self.add(format!("{}('',#{},.T.)", bound, poly)));
            }

            let location = point_ids[first].unwrap_or_else(|| self.point(&topology.vertices[first]));
            let placement = self.placement_at(location, &region.normal, &perpendicular(&region.normal));
            let plane = self.add(format!("PLANE('',#{})", placement));
            faces.push(self.add(format!("FACE_SURFACE('',({}),#{},.T.)", refs(&bounds), plane)));
        }

        faces
    }

    fn polyline(&mut self, curve: &Polyline) -> usize {
        let mut points: Vec<usize> = curve.points.iter().map(|p| self.point(p)).collect();
        if curve.closed {
            if let Some(&first) = points.first() {
                points.push(first);
            }
        }
        self.add(format!("POLYLINE('',({}))", refs(&points)))
    }

    /// Geometric context carrying the length, angle and solid angle units
    fn context(&mut self, unit: UnitLength) -> usize {
        let length = self.length_unit(unit);
        let angle = self.add("(NAMED_UNIT(*)PLANE_ANGLE_UNIT()SI_UNIT($,.RADIAN.))");
        let solid_angle = self.add("(NAMED_UNIT(*)SI_UNIT($,.STERADIAN.)SOLID_ANGLE_UNIT())");
        let uncertainty = self.add(format!(
            "UNCERTAINTY_MEASURE_WITH_UNIT(LENGTH_MEASURE(1.E-07),#{},'distance_accuracy_value','confusion accuracy')",
            length
        ));
        self.add(format!(
            "(GEOMETRIC_REPRESENTATION_CONTEXT(3)GLOBAL_UNCERTAINTY_ASSIGNED_CONTEXT((#{}))\
             GLOBAL_UNIT_ASSIGNED_CONTEXT((#{},#{},#{}))REPRESENTATION_CONTEXT('',''))",
            uncertainty, length, angle, solid_angle
        ))
    }

    /// SI units directly, imperial units as conversions from millimetres
    fn length_unit(&mut self, unit: UnitLength) -> usize {
        let prefix = match unit {
            UnitLength::Mm => Some(".MILLI."),
            UnitLength::Cm => Some(".CENTI."),
            UnitLength::M => Some("$"),
            UnitLength::In | UnitLength::Ft | UnitLength::Yd => None,
        };
        if let Some(prefix) = prefix {
            return self.add(format!("(LENGTH_UNIT()NAMED_UNIT(*)SI_UNIT({},.METRE.))", prefix));
        }

        let name = match unit {
            UnitLength::In => "INCH",
            UnitLength::Ft => "FOOT",
            _ => "YARD",
        };
        let millimetre = self.add("(LENGTH_UNIT()NAMED_UNIT(*)SI_UNIT(.MILLI.,.METRE.))");
        let factor = UnitLength::convert_to(unit, 1.0, UnitLength::Mm);
        let measure = self.add(format!(
            "LENGTH_MEASURE_WITH_UNIT(LENGTH_MEASURE({}),#{})",
            real(factor),
            millimetre
        ));
        let exponents = self.add("DIMENSIONAL_EXPONENTS(1.,0.,0.,0.,0.,0.,0.)");
        self.add(format!(
            "(CONVERSION_BASED_UNIT('{}',#{})LENGTH_UNIT()NAMED_UNIT(#{}))",
            name, measure, exponents
        ))
    }

    /// Product structure that ties the shape representation to a part
    fn product(&mut self, representation: usize) {
        let application = self.add("APPLICATION_CONTEXT('automotive design')");
        self.add(format!(
            "APPLICATION_PROTOCOL_DEFINITION('international standard','automotive_design',2000,#{})",
            application
        ));
        let product_context = self.add(format!("PRODUCT_CONTEXT('',#{},'mechanical')", application));
        let product = self.add(format!(
            "PRODUCT('{0}','{0}','',(#{1}))",
            OUTPUT_STEM, product_context
        ));
        let formation = self.add(format!("PRODUCT_DEFINITION_FORMATION('','',#{})", product));
        let definition_context = self.add(format!(
            "PRODUCT_DEFINITION_CONTEXT('part definition',#{},'design')",
            application
        ));
        let definition = self.add(format!(
            "PRODUCT_DEFINITION('design','',#{},#{})",
            formation, definition_context
        ));
        let shape = self.add(format!("PRODUCT_DEFINITION_SHAPE('','',#{})", definition));
        self.add(format!("SHAPE_DEFINITION_REPRESENTATION(#{},#{})", shape, representation));
    }

    fn finish(self, timestamp: &str) -> String {
        let mut output = String::new();
        output.push_str("ISO-10303-21;\n");
        output.push_str("HEADER;\n");
        output.push_str("FILE_DESCRIPTION(('kcl-engine export'),'2;1');\n");
        output.push_str(&format!(
            "FILE_NAME('{}.step','{}',(''),(''),'kcl-engine','kcl-engine','');\n",
            OUTPUT_STEM, timestamp
        ));
        output.push_str(&format!("FILE_SCHEMA(('{}'));\n", SCHEMA));
        output.push_str("ENDSEC;\n");
        output.push_str("DATA;\n");
        for (index, entity) in self.entities.iter().enumerate() {
            output.push_str(&format!("#{}={};\n", index + 1, entity));
        }
        output.push_str("ENDSEC;\n");
        output.push_str("END-ISO-10303-21;\n");
        output
    }
}

fn refs(ids: &[usize]) -> String {
    ids.iter().map(|id| format!("#{}", id)).collect::<Vec<_>>().join(",")
}

/// STEP reals always carry a decimal point
fn real(value: f64) -> String {
    if value == 0.0 {
        return "0.".to_string();
    }
    let mut text = value.to_string();
    if !text.contains('.') {
        text.push('.');
    }
    text
}

fn perpendicular(normal: &Vector3<f64>) -> Vector3<f64> {
    let helper = if normal.x.abs() < 0.9 { Vector3::x() } else { Vector3::y() };
    (helper - normal * normal.dot(&helper)).normalize()
}
