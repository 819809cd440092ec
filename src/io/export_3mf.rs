// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! 3MF (3D Manufacturing Format) exporter

use super::export::{exportable_nodes, indexed, ExportArtifact, OUTPUT_STEM};
use super::FileExportFormat;
use crate::errors::ExportError;
use crate::scene::SceneGraph;
use crate::units::UnitLength;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::Writer;
use std::io::{Cursor, Write as IoWrite};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

const FORMAT: FileExportFormat = FileExportFormat::ThreeMf;

fn err(e: impl std::fmt::Display) -> ExportError {
    ExportError::io(FORMAT.label(), e)
}

/// 3MF unit attribute and the factor applied to coordinates. 3MF has no
/// yard, so yards are written as feet.
fn model_unit(unit: UnitLength) -> (&'static str, f64) {
    match unit {
        UnitLength::Mm => ("millimeter", 1.0),
        UnitLength::Cm => ("centimeter", 1.0),
        UnitLength::M => ("meter", 1.0),
        UnitLength::In => ("inch", 1.0),
        UnitLength::Ft => ("foot", 1.0),
        UnitLength::Yd => ("foot", UnitLength::Yd.convert_to(1.0, UnitLength::Ft)),
    }
}

pub(super) fn export(scene: &SceneGraph) -> Result<Vec<ExportArtifact>, ExportError> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));

    // Fixed DOS epoch keeps the archive byte-identical between runs
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(zip::DateTime::default());

    let model_xml = generate_3dmodel_xml(scene)?;
    zip.start_file("3D/3dmodel.model", options.clone()).map_err(err)?;
    zip.write_all(&model_xml).map_err(err)?;

    zip.start_file("[Content_Types].xml", options.clone()).map_err(err)?;
    zip.write_all(CONTENT_TYPES.as_bytes()).map_err(err)?;

    zip.start_file("_rels/.rels", options).map_err(err)?;
    zip.write_all(RELS.as_bytes()).map_err(err)?;

    let contents = zip.finish().map_err(err)?.into_inner();
    Ok(vec![ExportArtifact::new(format!("{}.3mf", OUTPUT_STEM), contents)])
}

fn generate_3dmodel_xml(scene: &SceneGraph) -> Result<Vec<u8>, ExportError> {
    let (unit, scale) = model_unit(scene.unit());
    let mut writer = Writer::new(Cursor::new(Vec::new()));

    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(err)?;

    let mut model = BytesStart::new("model");
    model.push_attribute(("unit", unit));
    model.push_attribute(("xml:lang", "en-US"));
    model.push_attribute(("xmlns", "http://schemas.microsoft.com/3dmanufacturing/core/2015/02"));
    writer.write_event(Event::Start(model)).map_err(err)?;
    writer.write_event(Event::Start(BytesStart::new("resources"))).map_err(err)?;

    let mut object_ids = Vec::new();
    for node in exportable_nodes(scene) {
        let id = (object_ids.len() + 1).to_string();
        let mut object = BytesStart::new("object");
        object.push_attribute(("id", id.as_str()));
        object.push_attribute(("type", "model"));
        writer.write_event(Event::Start(object)).map_err(err)?;
        writer.write_event(Event::Start(BytesStart::new("mesh"))).map_err(err)?;

        let (positions, triangles) = indexed(&node.body.mesh);
        writer.write_event(Event::Start(BytesStart::new("vertices"))).map_err(err)?;
        for p in &positions {
            let p = *p * scale;
            let mut v = BytesStart::new("vertex");
            v.push_attribute(("x", p.x.to_string().as_str()));
            v.push_attribute(("y", p.y.to_string().as_str()));
            v.push_attribute(("z", p.z.to_string().as_str()));
            writer.write_event(Event::Empty(v)).map_err(err)?;
        }
        writer.write_event(Event::End(BytesEnd::new("vertices"))).map_err(err)?;

        writer.write_event(Event::Start(BytesStart::new("triangles"))).map_err(err)?;
        for [a, b, c] in &triangles {
            let mut t = BytesStart::new("triangle");
            t.push_attribute(("v1", a.to_string().as_str()));
            t.push_attribute(("v2", b.to_string().as_str()));
            t.push_attribute(("v3", c.to_string().as_str()));
            writer.write_event(Event::Empty(t)).map_err(err)?;
        }
        writer.write_event(Event::End(BytesEnd::new("triangles"))).map_err(err)?;

        writer.write_event(Event::End(BytesEnd::new("mesh"))).map_err(err)?;
        writer.write_event(Event::End(BytesEnd::new("object"))).map_err(err)?;
        object_ids.push(id);
    }
    writer.write_event(Event::End(BytesEnd::new("resources"))).map_err(err)?;

    writer.write_event(Event::Start(BytesStart::new("build"))).map_err(err)?;
    for id in &object_ids {
        let mut item = BytesStart::new("item");
        item.push_attribute(("objectid", id.as_str()));
        writer.write_event(Event::Empty(item)).map_err(err)?;
    }
    writer.write_event(Event::End(BytesEnd::new("build"))).map_err(err)?;
    writer.write_event(Event::End(BytesEnd::new("model"))).map_err(err)?;

    Ok(writer.into_inner().into_inner())
}

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
  <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
  <Default Extension="model" ContentType="application/vnd.ms-package.3dmanufacturing-3dmodel+xml"/>
</Types>"#;

const RELS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Target="/3D/3dmodel.model" Id="rel0" Type="http://schemas.microsoft.com/3dmanufacturing/2013/01/3dmodel"/>
</Relationships>"#;
