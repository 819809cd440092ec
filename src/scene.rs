// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Scene graph produced by evaluation
//!
//! Nodes live in one arena and refer to their operands by id. Operands are
//! always created before the node that consumes them, so the graph is a DAG
//! in creation order.

use crate::ast::SourceRange;
use crate::geometry::{Body, BooleanOp, BoundingBox, GeometryKind, Primitive, RevolveAxis};
use crate::units::UnitLength;
use nalgebra::{Matrix4, Vector3};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct SceneNodeId(pub u32);

impl SceneNodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for SceneNodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// How a node's body was built
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Construction {
    Primitive {
        primitive: Primitive,
    },
    Extrusion {
        sketch: u64,
        distance: f64,
    },
    Revolution {
        sketch: u64,
        axis: RevolveAxis,
        angle: f64,
    },
    /// A sketch left standing on its own
    Profile {
        sketch: u64,
    },
    Boolean {
        op: BooleanOp,
        operands: Vec<SceneNodeId>,
    },
    Transform {
        operand: SceneNodeId,
        matrix: Matrix4<f64>,
    },
    Pattern {
        operand: SceneNodeId,
        count: u32,
        step: Vector3<f64>,
    },
}

impl Construction {
    pub fn operands(&self) -> Vec<SceneNodeId> {
        match self {
            Construction::Boolean { operands, .. } => operands.clone(),
            Construction::Transform { operand, .. } | Construction::Pattern { operand, .. } => {
                vec![*operand]
            }
            _ => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneNode {
    pub id: SceneNodeId,
    pub construction: Construction,
    pub unit: UnitLength,
    pub body: Body,
    pub source_range: SourceRange,
}

impl SceneNode {
    pub fn kind(&self) -> GeometryKind {
        self.body.kind
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneGraph {
    unit: UnitLength,
    nodes: Vec<SceneNode>,
    #[serde(skip)]
    consumed: Vec<bool>,
}

impl SceneGraph {
    pub fn new(unit: UnitLength) -> Self {
        Self {
            unit,
            nodes: Vec::new(),
            consumed: Vec::new(),
        }
    }

    pub fn unit(&self) -> UnitLength {
        self.unit
    }

    /// Append a node. Its operands stop being roots.
    pub fn add(&mut self, construction: Construction, body: Body, source_range: SourceRange) -> SceneNodeId {
        for operand in construction.operands() {
            if let Some(flag) = self.consumed.get_mut(operand.index()) {
                *flag = true;
            }
        }
        let id = SceneNodeId(self.nodes.len() as u32);
        self.nodes.push(SceneNode {
            id,
            construction,
            unit: self.unit,
            body,
            source_range,
        });
        self.consumed.push(false);
        id
    }

    pub fn node(&self, id: SceneNodeId) -> Option<&SceneNode> {
        self.nodes.get(id.index())
    }

    pub fn nodes(&self) -> &[SceneNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_consumed(&self, id: SceneNodeId) -> bool {
        self.consumed.get(id.index()).copied().unwrap_or(false)
    }

    /// Nodes nothing else consumed, in creation order
    pub fn roots(&self) -> impl Iterator<Item = &SceneNode> {
        self.nodes
            .iter()
            .zip(&self.consumed)
            .filter(|(_, consumed)| !**consumed)
            .map(|(node, _)| node)
    }

    /// No root carries any geometry
    pub fn is_empty(&self) -> bool {
        self.roots().all(|node| node.body.is_empty())
    }

    pub fn bounding_box(&self) -> BoundingBox {
        self.roots()
            .map(|node| node.body.bounding_box())
            .fold(BoundingBox::empty(), |acc, bbox| acc.union(&bbox))
    }

    pub fn triangle_count(&self) -> usize {
        self.roots().map(|node| node.body.mesh.triangle_count()).sum()
    }
}
