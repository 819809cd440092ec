// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Runtime values and program memory

use super::node::FunctionLiteral;
use crate::geometry::{GeometryKind, Plane};
use crate::scene::SceneNodeId;
use crate::stdlib::Builtin;
use crate::units::NumericType;
use nalgebra::Point2;
use serde::Serialize;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Number {
    pub value: f64,
    pub ty: NumericType,
}

impl Number {
    pub fn new(value: f64, ty: NumericType) -> Self {
        Self { value, ty }
    }

    pub fn unitless(value: f64) -> Self {
        Self::new(value, NumericType::Unitless)
    }

    pub fn length(value: f64) -> Self {
        Self::new(value, NumericType::Length)
    }

    pub fn angle(degrees: f64) -> Self {
        Self::new(degrees, NumericType::Angle)
    }
}

/// A path being drawn on a plane. Points are plane coordinates in the
/// program unit.
#[derive(Debug, Clone, PartialEq)]
pub struct Sketch {
    pub id: u64,
    pub plane: Plane,
    pub path: Vec<Point2<f64>>,
    pub closed: bool,
    pub holes: Vec<Vec<Point2<f64>>>,
}

impl Sketch {
    pub fn current(&self) -> Option<Point2<f64>> {
        self.path.last().copied()
    }
}

/// Handle to a scene node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GeometryRef {
    pub node: SceneNodeId,
    pub kind: GeometryKind,
}

/// User function together with the frame it was defined in
pub struct Closure<'a> {
    pub name: Option<String>,
    pub function: &'a FunctionLiteral,
    pub env: Rc<Frame<'a>>,
}

impl std::fmt::Debug for Closure<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Closure")
            .field("name", &self.name)
            .field("params", &self.function.params.len())
            .finish()
    }
}

#[derive(Debug, Clone)]
pub enum Value<'a> {
    None,
    Bool(bool),
    Number(Number),
    String(String),
    Array(Vec<Value<'a>>),
    Object(BTreeMap<String, Value<'a>>),
    Function(Rc<Closure<'a>>),
    Builtin(Builtin),
    Plane(Plane),
    Sketch(Rc<Sketch>),
    Geometry(GeometryRef),
}

impl<'a> Value<'a> {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "none",
            Value::Bool(_) => "boolean",
            Value::Number(n) => n.ty.name(),
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::Function(_) | Value::Builtin(_) => "function",
            Value::Plane(_) => "plane",
            Value::Sketch(_) => "sketch",
            Value::Geometry(g) => g.kind.name(),
        }
    }

    /// Structural equality; `None` when the operands cannot be compared
    pub fn equals(&self, other: &Value<'a>) -> Option<bool> {
        match (self, other) {
            (Value::None, Value::None) => Some(true),
            (Value::Bool(a), Value::Bool(b)) => Some(a == b),
            (Value::Number(a), Value::Number(b)) => {
                a.ty.additive(b.ty).map(|_| a.value == b.value)
            }
            (Value::String(a), Value::String(b)) => Some(a == b),
            (Value::Array(a), Value::Array(b)) => {
                if a.len() != b.len() {
                    return Some(false);
                }
                let mut all = true;
                for (x, y) in a.iter().zip(b) {
                    all &= x.equals(y)?;
                }
                Some(all)
            }
            (Value::Object(a), Value::Object(b)) => {
                if a.len() != b.len() || a.keys().ne(b.keys()) {
                    return Some(false);
                }
                let mut all = true;
                for (x, y) in a.values().zip(b.values()) {
                    all &= x.equals(y)?;
                }
                Some(all)
            }
            (Value::Plane(a), Value::Plane(b)) => Some(a == b),
            (Value::Sketch(a), Value::Sketch(b)) => Some(a == b),
            (Value::Geometry(a), Value::Geometry(b)) => Some(a == b),
            (Value::Builtin(a), Value::Builtin(b)) => Some(a == b),
            (Value::Function(a), Value::Function(b)) => Some(Rc::ptr_eq(a, b)),
            _ => Option::None,
        }
    }

    pub fn to_memory(&self) -> MemoryItem {
        match self {
            Value::None => MemoryItem::None,
            Value::Bool(value) => MemoryItem::Bool { value: *value },
            Value::Number(n) => MemoryItem::Number {
                value: n.value,
                ty: n.ty,
            },
            Value::String(value) => MemoryItem::String {
                value: value.clone(),
            },
            Value::Array(items) => MemoryItem::Array {
                value: items.iter().map(Value::to_memory).collect(),
            },
            Value::Object(map) => MemoryItem::Object {
                value: map.iter().map(|(k, v)| (k.clone(), v.to_memory())).collect(),
            },
            Value::Function(closure) => MemoryItem::Function {
                name: closure.name.clone(),
                params: closure.function.params.iter().map(|p| p.name.clone()).collect(),
            },
            Value::Builtin(builtin) => MemoryItem::Function {
                name: Some(builtin.name().to_string()),
                params: Vec::new(),
            },
            Value::Plane(plane) => MemoryItem::Plane { plane: *plane },
            Value::Sketch(sketch) => MemoryItem::Sketch {
                id: sketch.id,
                plane: sketch.plane,
                path: sketch.path.iter().map(|p| [p.x, p.y]).collect(),
                closed: sketch.closed,
            },
            Value::Geometry(g) => MemoryItem::Geometry {
                node: g.node,
                kind: g.kind,
            },
        }
    }
}

/// Serialisable snapshot of a runtime value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum MemoryItem {
    None,
    Bool {
        value: bool,
    },
    Number {
        value: f64,
        ty: NumericType,
    },
    String {
        value: String,
    },
    Array {
        value: Vec<MemoryItem>,
    },
    Object {
        value: BTreeMap<String, MemoryItem>,
    },
    Function {
        name: Option<String>,
        params: Vec<String>,
    },
    Plane {
        plane: Plane,
    },
    Sketch {
        id: u64,
        plane: Plane,
        path: Vec<[f64; 2]>,
        closed: bool,
    },
    Geometry {
        node: SceneNodeId,
        kind: GeometryKind,
    },
}

impl MemoryItem {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            MemoryItem::Number { value, .. } => Some(*value),
            _ => None,
        }
    }
}

/// Top-level bindings left after a program ran
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProgramMemory {
    bindings: BTreeMap<String, MemoryItem>,
}

impl ProgramMemory {
    pub fn insert(&mut self, name: impl Into<String>, item: MemoryItem) {
        self.bindings.insert(name.into(), item);
    }

    pub fn get(&self, name: &str) -> Option<&MemoryItem> {
        self.bindings.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &MemoryItem)> {
        self.bindings.iter()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// Slots of one function activation (or of the program itself)
#[derive(Debug)]
pub struct Frame<'a> {
    slots: RefCell<Vec<Option<Value<'a>>>>,
    parent: Option<Rc<Frame<'a>>>,
}

impl<'a> Frame<'a> {
    pub fn new(size: usize, parent: Option<Rc<Frame<'a>>>) -> Rc<Self> {
        Rc::new(Self {
            slots: RefCell::new(vec![None; size]),
            parent,
        })
    }

    pub fn get(&self, hops: usize, slot: usize) -> Option<Value<'a>> {
        let mut frame = self;
        for _ in 0..hops {
            frame = frame.parent.as_deref()?;
        }
        frame.slots.borrow().get(slot).cloned().flatten()
    }

    pub fn set(&self, slot: usize, value: Value<'a>) {
        let mut slots = self.slots.borrow_mut();
        if slot >= slots.len() {
            slots.resize(slot + 1, None);
        }
        slots[slot] = Some(value);
    }

    /// Drop every value, breaking closure reference cycles
    pub fn clear(&self) {
        self.slots.borrow_mut().clear();
    }
}
