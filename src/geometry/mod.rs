// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Geometry module - mesh representation and operations

mod analytics;
mod bbox;
mod body;
mod boolean;
mod csg;
mod halfedge;
mod mesh;
pub mod mesh_utils;
mod primitives;
mod profile;
mod sweep;
mod triangulate;

pub use analytics::{analyze, GeometryStats};
pub use bbox::BoundingBox;
pub use body::{Body, GeometryKind, Polyline};
pub use boolean::perform_boolean_operation;
pub use csg::BooleanOp;
pub use halfedge::{Edge, HalfEdge, HalfEdgeMesh, PlanarRegion};
pub use mesh::{weld_positions, Mesh, Triangle, Vertex};
pub use primitives::Primitive;
pub use profile::{contains_point, Plane, Profile};
pub use sweep::{extrude, revolve, RevolveAxis};
pub use triangulate::{orient, signed_area, triangulate};

use thiserror::Error;

/// Degenerate input to a geometry operation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeometryError {
    #[error("profile needs at least three distinct points")]
    TooFewPoints,

    #[error("profile encloses no area")]
    ZeroArea,

    #[error("profile intersects itself")]
    SelfIntersecting,

    #[error("hole is not inside its profile")]
    HoleOutside,

    #[error("profile is not closed")]
    OpenProfile,

    #[error("profile crosses the revolve axis")]
    CrossesAxis,

    #[error("unknown revolve axis '{0}', expected 'X' or 'Y'")]
    UnknownAxis(String),

    #[error("revolve angle must be non-zero and at most 360 degrees")]
    RevolveAngle,

    #[error("extrusion distance must be non-zero")]
    ZeroDistance,

    #[error("{0} must be positive")]
    NonPositive(&'static str),

    #[error("scale factors must be non-zero")]
    ZeroScale,

    #[error("{0} produced an empty result")]
    EmptyBoolean(&'static str),

    #[error("could not triangulate profile")]
    Triangulation,
}
