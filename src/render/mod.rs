// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Snapshot renderer
//!
//! Rasterises the roots of a scene graph from a fixed camera and encodes the
//! result as PNG or JPEG.

mod camera;
mod rasterizer;

pub use camera::Camera;
pub use rasterizer::{Framebuffer, ScreenTriangle};

use crate::errors::RenderError;
use crate::geometry::{GeometryKind, HalfEdgeMesh};
use crate::scene::SceneGraph;
use image::{DynamicImage, RgbImage};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Cursor;
use std::str::FromStr;

pub const DEFAULT_WIDTH: u32 = 1024;
pub const DEFAULT_HEIGHT: u32 = 768;

/// Dihedral angle above which an edge is highlighted
const FEATURE_EDGE_DEGREES: f64 = 30.0;
const AMBIENT: f64 = 0.25;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Png,
    Jpeg,
}

impl ImageFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpeg",
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ImageFormat {
    type Err = RenderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "png" => Ok(ImageFormat::Png),
            "jpeg" | "jpg" => Ok(ImageFormat::Jpeg),
            other => Err(RenderError::UnsupportedEncoding(other.to_string())),
        }
    }
}

impl From<ImageFormat> for image::ImageFormat {
    fn from(format: ImageFormat) -> Self {
        match format {
            ImageFormat::Png => image::ImageFormat::Png,
            ImageFormat::Jpeg => image::ImageFormat::Jpeg,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    pub width: u32,
    pub height: u32,
    pub fov_degrees: f64,
    pub highlight_edges: bool,
    pub background: [u8; 3],
    /// Base colour of shaded faces
    pub color: [u8; 3],
    /// Colour of curves, profile boundaries and highlighted edges
    pub line_color: [u8; 3],
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            fov_degrees: 45.0,
            highlight_edges: false,
            background: [15, 18, 26],
            color: [205, 189, 180],
            line_color: [236, 240, 248],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedImage {
    pub width: u32,
    pub height: u32,
    pub format: ImageFormat,
    pub bytes: Vec<u8>,
}

/// Render the scene roots and encode them as `format`
pub fn render(
    scene: &SceneGraph,
    format: ImageFormat,
    options: &RenderOptions,
) -> Result<RenderedImage, RenderError> {
    if scene.is_empty() {
        return Err(RenderError::EmptyScene);
    }
    if options.width == 0 || options.height == 0 {
        return Err(RenderError::Encode(format!(
            "image size {}x{} has no pixels",
            options.width, options.height
        )));
    }

    let (width, height) = (options.width, options.height);
    let bbox = scene.bounding_box();
    let camera = Camera::fit(&bbox, options.fov_degrees, width as f64 / height as f64);
    let view = camera.view_direction();

    let mut triangles = Vec::with_capacity(scene.triangle_count());
    let mut lines = Vec::new();
    for node in scene.roots() {
        let mesh = &node.body.mesh;
        for index in 0..mesh.triangle_count() {
            let projected: Option<Vec<_>> = mesh
                .triangle_points(index)
                .iter()
                .map(|p| camera.project(p, width, height))
                .collect();
            let Some(projected) = projected else {
                continue;
            };
            let intensity = AMBIENT + (1.0 - AMBIENT) * mesh.face_normal(index).dot(&view).abs();
            triangles.push(ScreenTriangle {
                points: [projected[0], projected[1], projected[2]],
                color: shade(options.color, intensity),
            });
        }

        for curve in &node.body.curves {
            lines.extend(curve.segments());
        }
        if options.highlight_edges && node.kind() == GeometryKind::Solid {
            lines.extend(HalfEdgeMesh::from_mesh(mesh).feature_edges(FEATURE_EDGE_DEGREES));
        }
    }

    let mut framebuffer = Framebuffer::new(width, height, options.background);
    framebuffer.fill_triangles(&triangles);
    for (a, b) in &lines {
        if let (Some(a), Some(b)) = (camera.project(a, width, height), camera.project(b, width, height)) {
            framebuffer.draw_line(a, b, options.line_color);
        }
    }

    let raster = RgbImage::from_raw(width, height, framebuffer.into_rgb())
        .ok_or_else(|| RenderError::Encode("framebuffer does not match the image size".into()))?;
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(raster)
        .write_to(&mut Cursor::new(&mut bytes), format.into())
        .map_err(|err| RenderError::Encode(err.to_string()))?;

    log::debug!(
        format = format.extension(),
        triangles = triangles.len(),
        lines = lines.len(),
        bytes = bytes.len();
        "rendered snapshot"
    );

    Ok(RenderedImage {
        width,
        height,
        format,
        bytes,
    })
}

fn shade(color: [u8; 3], intensity: f64) -> [u8; 3] {
    color.map(|c| (c as f64 * intensity).round().clamp(0.0, 255.0) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::SourceRange;
    use crate::geometry::{Body, Polyline, Primitive};
    use crate::scene::Construction;
    use crate::units::UnitLength;
    use nalgebra::{Point3, Vector3};

    fn cube_scene() -> SceneGraph {
        let primitive = Primitive::Cuboid {
            size: Vector3::new(10.0, 10.0, 10.0),
        };
        let mut scene = SceneGraph::new(UnitLength::Mm);
        scene.add(
            Construction::Primitive { primitive },
            Body::solid(primitive.to_mesh()),
            SourceRange::default(),
        );
        scene
    }

    fn small() -> RenderOptions {
        RenderOptions {
            width: 64,
            height: 48,
            ..RenderOptions::default()
        }
    }

    #[test]
    fn test_png_snapshot_decodes() {
        let image = render(&cube_scene(), ImageFormat::Png, &small()).unwrap();
        let decoded = image::load_from_memory_with_format(&image.bytes, image::ImageFormat::Png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (64, 48));

        let rgb = decoded.to_rgb8();
        assert_ne!(rgb.get_pixel(32, 24).0, [15, 18, 26]);
        assert_eq!(rgb.get_pixel(0, 0).0, [15, 18, 26]);
    }

    #[test]
    fn test_jpeg_snapshot_decodes() {
        let image = render(&cube_scene(), ImageFormat::Jpeg, &small()).unwrap();
        assert!(image::load_from_memory_with_format(&image.bytes, image::ImageFormat::Jpeg).is_ok());
    }

    #[test]
    fn test_rendering_is_deterministic() {
        let options = RenderOptions {
            highlight_edges: true,
            ..small()
        };
        let first = render(&cube_scene(), ImageFormat::Png, &options).unwrap();
        let second = render(&cube_scene(), ImageFormat::Png, &options).unwrap();
        assert_eq!(first.bytes, second.bytes);
    }

    #[test]
    fn test_curves_only_scene_renders() {
        let mut scene = SceneGraph::new(UnitLength::Mm);
        scene.add(
            Construction::Profile { sketch: 0 },
            Body::curve(Polyline {
                points: vec![Point3::origin(), Point3::new(10.0, 0.0, 0.0)],
                closed: false,
            }),
            SourceRange::default(),
        );
        assert!(render(&scene, ImageFormat::Png, &small()).is_ok());
    }

    #[test]
    fn test_empty_scene_and_bad_sizes() {
        let empty = SceneGraph::new(UnitLength::Mm);
        assert_eq!(
            render(&empty, ImageFormat::Png, &small()),
            Err(RenderError::EmptyScene)
        );
        let zero = RenderOptions {
            width: 0,
            ..small()
        };
        assert!(matches!(
            render(&cube_scene(), ImageFormat::Png, &zero),
            Err(RenderError::Encode(_))
        ));
    }

    #[test]
    fn test_format_names() {
        assert_eq!("JPG".parse::<ImageFormat>().unwrap(), ImageFormat::Jpeg);
        assert_eq!(
            "gif".parse::<ImageFormat>(),
            Err(RenderError::UnsupportedEncoding("gif".into()))
        );
    }
}
