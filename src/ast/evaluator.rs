// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Tree-walking evaluator
//!
//! Runs a resolved program in source order. Geometry builtins append nodes to
//! the scene graph as they run; the values the program sees are handles to
//! those nodes.

use super::node::{
    BinaryOp, Body, Expr, ExprKind, FunctionLiteral, Identifier, IfExpr, Item, ItemKind,
    NumberLiteral, Program, SourceRange, UnaryOp,
};
use super::resolver::{resolve, Binding, Resolution};
use super::value::{Closure, Frame, GeometryRef, Number, ProgramMemory, Sketch, Value};
use crate::errors::EvalError;
use crate::geometry::{Body as GeometryBody, Mesh, Polyline, Profile};
use crate::scene::{Construction, SceneGraph};
use crate::stdlib::{self, Builtin};
use crate::units::{NumericSuffix, NumericType, UnitLength};
use ahash::AHashSet;
use std::collections::BTreeMap;
use std::rc::Rc;

/// Longest array a `[a..b]` range may produce
const MAX_RANGE_LEN: usize = 1_000_000;

/// Stack left before a user function call moves to a fresh segment
const STACK_RED_ZONE: usize = 256 * 1024;
/// Size of each segment allocated for deep user recursion
const STACK_GROWTH: usize = 2 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvalOptions {
    /// Unit unsuffixed lengths are read in and every length is converted to
    pub unit: UnitLength,
    /// Facets per full turn for circles, arcs and revolutions
    pub segments: u32,
    pub max_call_depth: usize,
}

impl Default for EvalOptions {
    fn default() -> Self {
        Self {
            unit: UnitLength::Mm,
            segments: 48,
            max_call_depth: 64,
        }
    }
}

impl EvalOptions {
    pub fn with_unit(unit: UnitLength) -> Self {
        Self {
            unit,
            ..Self::default()
        }
    }
}

/// Everything a successful run leaves behind
#[derive(Debug, Clone)]
pub struct ExecutionOutcome {
    pub scene: SceneGraph,
    pub memory: ProgramMemory,
}

/// Resolve and run `program`
pub fn evaluate(program: &Program, options: &EvalOptions) -> Result<ExecutionOutcome, EvalError> {
    let resolution = resolve(program)?;
    let mut evaluator = Evaluator::new(&resolution, *options);
    let outcome = evaluator.run(program)?;
    log::debug!(
        nodes = outcome.scene.len(),
        triangles = outcome.scene.triangle_count(),
        bindings = outcome.memory.len();
        "evaluated program"
    );
    Ok(outcome)
}

/// Non-local exit out of a function body
enum Unwind<'a> {
    Error(EvalError),
    Return(Value<'a>),
}

impl From<EvalError> for Unwind<'_> {
    fn from(err: EvalError) -> Self {
        Unwind::Error(err)
    }
}

impl Unwind<'_> {
    fn into_error(self, range: SourceRange) -> EvalError {
        match self {
            Unwind::Error(err) => err,
            Unwind::Return(_) => EvalError::semantic("return outside of a function", range),
        }
    }
}

type Flow<'a, T> = Result<T, Unwind<'a>>;

pub struct Evaluator<'a> {
    resolution: &'a Resolution,
    options: EvalOptions,
    scene: SceneGraph,
    /// Values bound to `%`, innermost pipe last
    pipe_values: Vec<Value<'a>>,
    call_depth: usize,
    /// Frames captured by closures. Cleared on drop so closures stored in
    /// their own defining frame do not leak.
    closure_frames: Vec<Rc<Frame<'a>>>,
    captured: AHashSet<usize>,
    next_sketch_id: u64,
    consumed_sketches: AHashSet<u64>,
}

impl Drop for Evaluator<'_> {
    fn drop(&mut self) {
        for frame in &self.closure_frames {
            frame.clear();
        }
    }
}

impl<'a> Evaluator<'a> {
    fn new(resolution: &'a Resolution, options: EvalOptions) -> Self {
        Self {
            resolution,
            options,
            scene: SceneGraph::new(options.unit),
            pipe_values: Vec::new(),
            call_depth: 0,
            closure_frames: Vec::new(),
            captured: AHashSet::new(),
            next_sketch_id: 0,
            consumed_sketches: AHashSet::new(),
        }
    }

    pub(crate) fn unit(&self) -> UnitLength {
        self.options.unit
    }

    pub(crate) fn segments(&self) -> u32 {
        self.options.segments
    }

    pub(crate) fn scene(&self) -> &SceneGraph {
        &self.scene
    }

    /// Record a new scene node and hand back its handle
    pub(crate) fn add_node(
        &mut self,
        construction: Construction,
        body: GeometryBody,
        range: SourceRange,
    ) -> GeometryRef {
        let kind = body.kind;
        let node = self.scene.add(construction, body, range);
        GeometryRef { node, kind }
    }

    pub(crate) fn new_sketch_id(&mut self) -> u64 {
        let id = self.next_sketch_id;
        self.next_sketch_id += 1;
        id
    }

    /// The sketch became part of a solid and is no longer a standalone profile
    pub(crate) fn consume_sketch(&mut self, id: u64) {
        self.consumed_sketches.insert(id);
    }

    /// Call a user function or builtin with evaluated arguments
    pub(crate) fn call_value(
        &mut self,
        function: &Value<'a>,
        args: Vec<Value<'a>>,
        range: SourceRange,
    ) -> Result<Value<'a>, EvalError> {
        match function {
            Value::Builtin(builtin) => stdlib::call(self, *builtin, args, range),
            Value::Function(closure) => self.call_closure(closure.clone(), args, range),
            other => Err(EvalError::semantic(
                format!("a {} is not callable", other.type_name()),
                range,
            )),
        }
    }

    fn run(&mut self, program: &'a Program) -> Result<ExecutionOutcome, EvalError> {
        let frame = Frame::new(self.resolution.program_frame_size(), None);
        let mut memory = ProgramMemory::default();
        let mut sketches: Vec<(Rc<Sketch>, SourceRange)> = Vec::new();

        for item in program.code_items() {
            let value = self
                .exec_item(item, &frame)
                .map_err(|unwind| unwind.into_error(item.range))?;
            match &item.kind {
                ItemKind::Declaration(decl) => memory.insert(decl.name.name.clone(), value.to_memory()),
                ItemKind::Function(func) => memory.insert(func.name.name.clone(), value.to_memory()),
                _ => {}
            }
            if let Value::Sketch(sketch) = value {
                // Later stages of a sketch replace earlier ones in place
                match sketches.iter().position(|(s, _)| s.id == sketch.id) {
                    Some(i) => sketches[i] = (sketch, item.range),
                    None => sketches.push((sketch, item.range)),
                }
            }
        }

        for (sketch, range) in sketches {
            if !self.consumed_sketches.contains(&sketch.id) {
                self.emit_profile(&sketch, range)?;
            }
        }

        let scene = std::mem::replace(&mut self.scene, SceneGraph::new(self.options.unit));
        Ok(ExecutionOutcome { scene, memory })
    }

    /// Turn a sketch nobody extruded into a surface or curve node
    fn emit_profile(&mut self, sketch: &Sketch, range: SourceRange) -> Result<(), EvalError> {
        let plane = sketch.plane;
        let world = |points: &[nalgebra::Point2<f64>]| -> Vec<nalgebra::Point3<f64>> {
            points.iter().map(|p| plane.to_world(p)).collect()
        };

        let body = if sketch.closed {
            let profile = Profile::new(&sketch.path, &sketch.holes)
                .map_err(|e| EvalError::geometry(e.to_string(), range))?;
            let triangles = profile
                .triangulate()
                .map_err(|e| EvalError::geometry(e.to_string(), range))?;
            let points = world(&profile.points());
            let mut mesh = Mesh::with_capacity(triangles.len() * 3, triangles.len());
            for [a, b, c] in triangles {
                mesh.push_facet(points[a], points[b], points[c]);
            }
            let mut body = GeometryBody::surface(
                mesh,
                Polyline {
                    points: world(profile.outer()),
                    closed: true,
                },
            );
            body.curves.extend(profile.holes().iter().map(|hole| Polyline {
                points: world(hole),
                closed: true,
            }));
            body
        } else {
            GeometryBody::curve(Polyline {
                points: world(&sketch.path),
                closed: false,
            })
        };

        self.add_node(Construction::Profile { sketch: sketch.id }, body, range);
        Ok(())
    }

    fn exec_body(&mut self, body: &'a Body, frame: &Rc<Frame<'a>>) -> Flow<'a, Value<'a>> {
        let mut last = Value::None;
        for item in body.code_items() {
            let value = self.exec_item(item, frame)?;
            last = match item.kind {
                ItemKind::Expression(_) => value,
                _ => Value::None,
            };
        }
        Ok(last)
    }

    /// Run one item and return the value it produced
    fn exec_item(&mut self, item: &'a Item, frame: &Rc<Frame<'a>>) -> Flow<'a, Value<'a>> {
        match &item.kind {
            ItemKind::Declaration(decl) => {
                let value = match &decl.value.kind {
                    ExprKind::Function(function) => {
                        self.make_closure(Some(&decl.name.name), function, frame)
                    }
                    _ => self.eval_expr(&decl.value, frame)?,
                };
                self.bind(&decl.name, value.clone(), frame);
                Ok(value)
            }
            ItemKind::Function(func) => {
                let value = self.make_closure(Some(&func.name.name), &func.function, frame);
                self.bind(&func.name, value.clone(), frame);
                Ok(value)
            }
            ItemKind::Return(expr) => {
                let value = self.eval_expr(expr, frame)?;
                Err(Unwind::Return(value))
            }
            ItemKind::Expression(expr) => self.eval_expr(expr, frame),
            ItemKind::Comment(_) => Ok(Value::None),
        }
    }

    fn bind(&self, name: &Identifier, value: Value<'a>, frame: &Rc<Frame<'a>>) {
        if let Some(slot) = self.resolution.slot(name) {
            frame.set(slot, value);
        }
    }

    fn make_closure(
        &mut self,
        name: Option<&str>,
        function: &'a FunctionLiteral,
        frame: &Rc<Frame<'a>>,
    ) -> Value<'a> {
        if self.captured.insert(Rc::as_ptr(frame) as usize) {
            self.closure_frames.push(frame.clone());
        }
        Value::Function(Rc::new(Closure {
            name: name.map(str::to_string),
            function,
            env: frame.clone(),
        }))
    }

    fn call_closure(
        &mut self,
        closure: Rc<Closure<'a>>,
        args: Vec<Value<'a>>,
        range: SourceRange,
    ) -> Result<Value<'a>, EvalError> {
        let function = closure.function;
        if args.len() != function.params.len() {
            let name = closure.name.as_deref().unwrap_or("function");
            return Err(EvalError::semantic(
                format!(
                    "'{}' expects {} argument{} but got {}",
                    name,
                    function.params.len(),
                    if function.params.len() == 1 { "" } else { "s" },
                    args.len()
                ),
                range,
            ));
        }
        if self.call_depth >= self.options.max_call_depth {
            return Err(EvalError::RecursionLimit {
                limit: self.options.max_call_depth,
                range,
            });
        }

        let frame = Frame::new(self.resolution.frame_size(function), Some(closure.env.clone()));
        for (param, value) in function.params.iter().zip(args) {
            self.bind(param, value, &frame);
        }

        self.call_depth += 1;
        let result = stacker::maybe_grow(STACK_RED_ZONE, STACK_GROWTH, || {
            self.exec_body(&function.body, &frame)
        });
        self.call_depth -= 1;

        match result {
            Ok(_) => Ok(Value::None),
            Err(Unwind::Return(value)) => Ok(value),
            Err(Unwind::Error(err)) => Err(err),
        }
    }

    fn eval_expr(&mut self, expr: &'a Expr, frame: &Rc<Frame<'a>>) -> Flow<'a, Value<'a>> {
        let range = expr.range;
        match &expr.kind {
            ExprKind::Number(literal) => Ok(Value::Number(self.literal(literal))),
            ExprKind::String(literal) => Ok(Value::String(literal.value.clone())),
            ExprKind::Bool(value) => Ok(Value::Bool(*value)),
            ExprKind::Identifier(ident) => Ok(self.lookup(ident, frame)?),
            ExprKind::PipeSubstitution => match self.pipe_values.last() {
                Some(value) => Ok(value.clone()),
                None => Err(EvalError::semantic("'%' used outside of a pipe", range).into()),
            },
            ExprKind::Array(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(self.eval_expr(item, frame)?);
                }
                Ok(Value::Array(values))
            }
            ExprKind::Range { start, end } => {
                let start = self.eval_number(start, frame)?;
                let end = self.eval_number(end, frame)?;
                Ok(make_range(start, end, range)?)
            }
            ExprKind::Object(props) => {
                let mut map = BTreeMap::new();
                for prop in props {
                    let value = self.eval_expr(&prop.value, frame)?;
                    map.insert(prop.key.name.clone(), value);
                }
                Ok(Value::Object(map))
            }
            ExprKind::Unary { op, operand } => {
                let value = self.eval_expr(operand, frame)?;
                Ok(unary(*op, value, range)?)
            }
            ExprKind::Binary { op, left, right } => self.eval_binary(*op, left, right, range, frame),
            ExprKind::Pipe(steps) => self.eval_pipe(steps, frame),
            ExprKind::Call { callee, args } => self.eval_call(callee, args, None, range, frame),
            ExprKind::Member { object, property } => match self.eval_expr(object, frame)? {
                Value::Object(mut map) => map.remove(&property.name).ok_or_else(|| {
                    EvalError::semantic(format!("object has no property '{}'", property.name), range)
                        .into()
                }),
                other => Err(EvalError::semantic(
                    format!("cannot read property '{}' of a {}", property.name, other.type_name()),
                    range,
                )
                .into()),
            },
            ExprKind::Index { object, index } => {
                let object = self.eval_expr(object, frame)?;
                let index = self.eval_expr(index, frame)?;
                Ok(index_value(object, index, range)?)
            }
            ExprKind::If(if_expr) => self.eval_if(if_expr, frame),
            ExprKind::Function(function) => Ok(self.make_closure(None, function, frame)),
        }
    }

    fn eval_number(&mut self, expr: &'a Expr, frame: &Rc<Frame<'a>>) -> Flow<'a, Number> {
        match self.eval_expr(expr, frame)? {
            Value::Number(n) => Ok(n),
            other => Err(EvalError::semantic(
                format!("expected a number, found a {}", other.type_name()),
                expr.range,
            )
            .into()),
        }
    }

    /// Convert a literal into the program unit, angles into degrees
    fn literal(&self, literal: &NumberLiteral) -> Number {
        match literal.suffix {
            None => Number::unitless(literal.value),
            Some(NumericSuffix::Length(unit)) => {
                Number::length(unit.convert_to(literal.value, self.options.unit))
            }
            Some(NumericSuffix::Angle(unit)) => Number::angle(unit.to_degrees(literal.value)),
        }
    }

    fn lookup(&self, ident: &Identifier, frame: &Rc<Frame<'a>>) -> Result<Value<'a>, EvalError> {
        let unresolved = || EvalError::UnresolvedBinding {
            name: ident.name.clone(),
            range: ident.range,
        };
        match self.resolution.binding(ident) {
            Some(Binding::Local { hops, slot }) => frame.get(hops, slot).ok_or_else(unresolved),
            Some(Binding::Builtin(Builtin::Pi)) => Ok(Value::Number(Number::unitless(std::f64::consts::PI))),
            Some(Binding::Builtin(builtin)) => Ok(Value::Builtin(builtin)),
            None => Err(unresolved()),
        }
    }

    fn eval_if(&mut self, if_expr: &'a IfExpr, frame: &Rc<Frame<'a>>) -> Flow<'a, Value<'a>> {
        if self.eval_condition(&if_expr.condition, frame)? {
            return self.exec_body(&if_expr.then_body, frame);
        }
        for (condition, body) in &if_expr.else_ifs {
            if self.eval_condition(condition, frame)? {
                return self.exec_body(body, frame);
            }
        }
        match &if_expr.else_body {
            Some(body) => self.exec_body(body, frame),
            None => Ok(Value::None),
        }
    }

    fn eval_condition(&mut self, expr: &'a Expr, frame: &Rc<Frame<'a>>) -> Flow<'a, bool> {
        match self.eval_expr(expr, frame)? {
            Value::Bool(value) => Ok(value),
            other => Err(EvalError::semantic(
                format!("condition must be a boolean, found a {}", other.type_name()),
                expr.range,
            )
            .into()),
        }
    }

    fn eval_binary(
        &mut self,
        op: BinaryOp,
        left: &'a Expr,
        right: &'a Expr,
        range: SourceRange,
        frame: &Rc<Frame<'a>>,
    ) -> Flow<'a, Value<'a>> {
        if matches!(op, BinaryOp::And | BinaryOp::Or) {
            let lhs = self.eval_condition(left, frame)?;
            // Short-circuit
            if (op == BinaryOp::And) != lhs {
                return Ok(Value::Bool(lhs));
            }
            return Ok(Value::Bool(self.eval_condition(right, frame)?));
        }

        let lhs = self.eval_expr(left, frame)?;
        let rhs = self.eval_expr(right, frame)?;
        Ok(binary(op, lhs, rhs, range)?)
    }

    fn eval_pipe(&mut self, steps: &'a [Expr], frame: &Rc<Frame<'a>>) -> Flow<'a, Value<'a>> {
        let Some((first, rest)) = steps.split_first() else {
            return Ok(Value::None);
        };
        let mut value = self.eval_expr(first, frame)?;
        for step in rest {
            self.pipe_values.push(value);
            let result = self.eval_pipe_step(step, frame);
            self.pipe_values.pop();
            value = result?;
        }
        Ok(value)
    }

    fn eval_pipe_step(&mut self, step: &'a Expr, frame: &Rc<Frame<'a>>) -> Flow<'a, Value<'a>> {
        if let ExprKind::Call { callee, args } = &step.kind {
            if !step.mentions_substitution() {
                let piped = self.pipe_values.last().cloned();
                return self.eval_call(callee, args, piped, step.range, frame);
            }
        }
        self.eval_expr(step, frame)
    }

    fn eval_call(
        &mut self,
        callee: &'a Expr,
        args: &'a [Expr],
        piped: Option<Value<'a>>,
        range: SourceRange,
        frame: &Rc<Frame<'a>>,
    ) -> Flow<'a, Value<'a>> {
        let function = self.eval_expr(callee, frame)?;
        let mut values = Vec::with_capacity(args.len() + 1);
        for arg in args {
            values.push(self.eval_expr(arg, frame)?);
        }
        values.extend(piped);
        Ok(self.call_value(&function, values, range)?)
    }
}

fn make_range<'a>(start: Number, end: Number, range: SourceRange) -> Result<Value<'a>, EvalError> {
    let ty = start.ty.additive(end.ty).ok_or_else(|| {
        EvalError::unit_mismatch(
            format!("range from a {} to a {}", start.ty.name(), end.ty.name()),
            range,
        )
    })?;
    if start.value.fract() != 0.0 || end.value.fract() != 0.0 {
        return Err(EvalError::semantic("range bounds must be integers", range));
    }
    if end.value < start.value {
        return Err(EvalError::semantic(
            format!("range end {} is before its start {}", end.value, start.value),
            range,
        ));
    }
    let len = end.value - start.value + 1.0;
    if len > MAX_RANGE_LEN as f64 {
        return Err(EvalError::semantic(
            format!("range of {} elements exceeds the limit of {}", len, MAX_RANGE_LEN),
            range,
        ));
    }
    Ok(Value::Array(
        (0..len as usize)
            .map(|i| Value::Number(Number::new(start.value + i as f64, ty)))
            .collect(),
    ))
}

fn unary<'a>(op: UnaryOp, value: Value<'a>, range: SourceRange) -> Result<Value<'a>, EvalError> {
    match (op, value) {
        (UnaryOp::Neg, Value::Number(n)) => Ok(Value::Number(Number::new(-n.value, n.ty))),
        (UnaryOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
        (op, other) => Err(EvalError::semantic(
            format!("cannot apply '{}' to a {}", op.symbol(), other.type_name()),
            range,
        )),
    }
}

fn binary<'a>(op: BinaryOp, lhs: Value<'a>, rhs: Value<'a>, range: SourceRange) -> Result<Value<'a>, EvalError> {
    let mismatch = |a: NumericType, b: NumericType| {
        EvalError::unit_mismatch(
            format!("cannot apply '{}' to a {} and a {}", op.symbol(), a.name(), b.name()),
            range,
        )
    };

    let (a, b) = match (&lhs, &rhs) {
        (Value::Number(a), Value::Number(b)) => (*a, *b),
        (Value::String(a), Value::String(b)) => {
            return match op {
                BinaryOp::Add => Ok(Value::String(format!("{}{}", a, b))),
                BinaryOp::Eq => Ok(Value::Bool(a == b)),
                BinaryOp::NotEq => Ok(Value::Bool(a != b)),
                BinaryOp::Lt => Ok(Value::Bool(a < b)),
                BinaryOp::LtEq => Ok(Value::Bool(a <= b)),
                BinaryOp::Gt => Ok(Value::Bool(a > b)),
                BinaryOp::GtEq => Ok(Value::Bool(a >= b)),
                _ => Err(EvalError::semantic(
                    format!("cannot apply '{}' to strings", op.symbol()),
                    range,
                )),
            };
        }
        _ => {
            return match op {
                BinaryOp::Eq => Ok(Value::Bool(lhs.equals(&rhs).unwrap_or(false))),
                BinaryOp::NotEq => Ok(Value::Bool(!lhs.equals(&rhs).unwrap_or(false))),
                _ => Err(EvalError::semantic(
                    format!(
                        "cannot apply '{}' to a {} and a {}",
                        op.symbol(),
                        lhs.type_name(),
                        rhs.type_name()
                    ),
                    range,
                )),
            };
        }
    };

    let additive = || a.ty.additive(b.ty).ok_or_else(|| mismatch(a.ty, b.ty));
    let multiplicative = || a.ty.multiplicative(b.ty).ok_or_else(|| mismatch(a.ty, b.ty));

    let result = match op {
        BinaryOp::Eq => {
            additive()?;
            return Ok(Value::Bool(a.value == b.value));
        }
        BinaryOp::NotEq => {
            additive()?;
            return Ok(Value::Bool(a.value != b.value));
        }
        BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq => {
            additive()?;
            let outcome = match op {
                BinaryOp::Lt => a.value < b.value,
                BinaryOp::LtEq => a.value <= b.value,
                BinaryOp::Gt => a.value > b.value,
                _ => a.value >= b.value,
            };
            return Ok(Value::Bool(outcome));
        }
        BinaryOp::Add => Number::new(a.value + b.value, additive()?),
        BinaryOp::Sub => Number::new(a.value - b.value, additive()?),
        BinaryOp::Mul => Number::new(a.value * b.value, multiplicative()?),
        BinaryOp::Div | BinaryOp::Mod => {
            let ty = multiplicative()?;
            if b.value == 0.0 {
                let what = if op == BinaryOp::Div { "division" } else { "modulo" };
                return Err(EvalError::semantic(format!("{} by zero", what), range));
            }
            let value = if op == BinaryOp::Div {
                a.value / b.value
            } else {
                a.value % b.value
            };
            Number::new(value, ty)
        }
        BinaryOp::Pow => {
            if b.ty != NumericType::Unitless {
                return Err(mismatch(a.ty, b.ty));
            }
            let ty = if b.value == 1.0 { a.ty } else { NumericType::Unitless };
            Number::new(a.value.powf(b.value), ty)
        }
        BinaryOp::And | BinaryOp::Or => {
            return Err(EvalError::semantic(
                format!("'{}' needs booleans", op.symbol()),
                range,
            ))
        }
    };

    if !result.value.is_finite() {
        return Err(EvalError::semantic(
            format!("'{}' produced a non-finite number", op.symbol()),
            range,
        ));
    }
    Ok(Value::Number(result))
}

fn index_value<'a>(object: Value<'a>, index: Value<'a>, range: SourceRange) -> Result<Value<'a>, EvalError> {
    match (object, index) {
        (Value::Array(mut items), Value::Number(n)) => {
            if n.ty != NumericType::Unitless || n.value.fract() != 0.0 || n.value < 0.0 {
                return Err(EvalError::semantic(
                    format!("array index must be a non-negative integer, found {}", n.value),
                    range,
                ));
            }
            let i = n.value as usize;
            if i >= items.len() {
                return Err(EvalError::semantic(
                    format!("index {} is out of bounds for an array of length {}", i, items.len()),
                    range,
                ));
            }
            Ok(items.swap_remove(i))
        }
        (Value::Object(mut map), Value::String(key)) => map
            .remove(&key)
            .ok_or_else(|| EvalError::semantic(format!("object has no property '{}'", key), range)),
        (object, index) => Err(EvalError::semantic(
            format!("cannot index a {} with a {}", object.type_name(), index.type_name()),
            range,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::MemoryItem;
    use crate::geometry::GeometryKind;
    use crate::io::parse;
    use approx::assert_relative_eq;

    fn run_with(source: &str, options: EvalOptions) -> Result<ExecutionOutcome, EvalError> {
        let program = parse(source).unwrap();
        evaluate(&program, &options)
    }

    fn run(source: &str) -> Result<ExecutionOutcome, EvalError> {
        run_with(source, EvalOptions::default())
    }

    fn number(outcome: &ExecutionOutcome, name: &str) -> f64 {
        outcome
            .memory
            .get(name)
            .and_then(MemoryItem::as_number)
            .unwrap_or_else(|| panic!("'{}' is not a number", name))
    }

    #[test]
    fn test_arithmetic_and_precedence() {
        let outcome = run("a = 1 + 2 * 3\nb = (1 + 2) * 3\nc = 2 ^ 3 ^ 2\nd = -2 ^ 2\ne = 7 % 4").unwrap();
        assert_eq!(number(&outcome, "a"), 7.0);
        assert_eq!(number(&outcome, "b"), 9.0);
        assert_eq!(number(&outcome, "c"), 512.0);
        assert_eq!(number(&outcome, "d"), -4.0);
        assert_eq!(number(&outcome, "e"), 3.0);
    }

    #[test]
    fn test_length_literals_convert_to_program_unit() {
        let outcome = run("a = 1in\nb = 2cm + 5\nc = 90deg").unwrap();
        assert_relative_eq!(number(&outcome, "a"), 25.4);
        assert_relative_eq!(number(&outcome, "b"), 25.0);
        assert_eq!(
            outcome.memory.get("a"),
            Some(&MemoryItem::Number {
                value: 25.4,
                ty: NumericType::Length
            })
        );

        let inches = run_with("a = 1ft", EvalOptions::with_unit(UnitLength::In)).unwrap();
        assert_relative_eq!(number(&inches, "a"), 12.0);
    }

    #[test]
    fn test_unit_mismatch() {
        assert!(matches!(run("a = 1mm + 1deg"), Err(EvalError::UnitMismatch { .. })));
        assert!(matches!(run("a = 1mm < 1deg"), Err(EvalError::UnitMismatch { .. })));
        let outcome = run("a = 2mm * 3mm\nb = 10mm / 2").unwrap();
        assert_eq!(
            outcome.memory.get("a"),
            Some(&MemoryItem::Number {
                value: 6.0,
                ty: NumericType::Unitless
            })
        );
        assert_eq!(
            outcome.memory.get("b"),
            Some(&MemoryItem::Number {
                value: 5.0,
                ty: NumericType::Length
            })
        );
    }

    #[test]
    fn test_division_by_zero() {
        assert!(matches!(run("a = 1 / 0"), Err(EvalError::Semantic { .. })));
    }

    #[test]
    fn test_strings_and_booleans() {
        let outcome = run("s = 'a' + \"b\"\nt = true && !false\nu = false && 1 / 0 == 1").unwrap();
        assert_eq!(
            outcome.memory.get("s"),
            Some(&MemoryItem::String { value: "ab".into() })
        );
        assert_eq!(outcome.memory.get("t"), Some(&MemoryItem::Bool { value: true }));
        assert_eq!(outcome.memory.get("u"), Some(&MemoryItem::Bool { value: false }));
        assert!(matches!(run("a = 1 && true"), Err(EvalError::Semantic { .. })));
    }

    #[test]
    fn test_functions_closures_and_recursion() {
        let source = "\
fn fact(n) {
  return if n <= 1 { 1 } else { n * fact(n - 1) }
}
k = 3
fn addK(x) {
  return x + k
}
a = fact(5)
b = addK(4)
c = (fn(x) { return x * 2 })(21)";
        let outcome = run(source).unwrap();
        assert_eq!(number(&outcome, "a"), 120.0);
        assert_eq!(number(&outcome, "b"), 7.0);
        assert_eq!(number(&outcome, "c"), 42.0);
        assert!(matches!(
            outcome.memory.get("fact"),
            Some(MemoryItem::Function { name: Some(name), .. }) if name == "fact"
        ));
    }

    #[test]
    fn test_function_without_return_yields_none() {
        let outcome = run("fn f() {\n  x = 1\n}\na = f()").unwrap();
        assert_eq!(outcome.memory.get("a"), Some(&MemoryItem::None));
    }

    #[test]
    fn test_arity_and_recursion_limit() {
        assert!(matches!(
            run("fn f(a, b) {\n  return a\n}\nx = f(1)"),
            Err(EvalError::Semantic { .. })
        ));
        let options = EvalOptions {
            max_call_depth: 16,
            ..EvalOptions::default()
        };
        let err = run_with("fn f(n) {\n  return f(n + 1)\n}\nx = f(0)", options).unwrap_err();
        assert!(matches!(err, EvalError::RecursionLimit { limit: 16, .. }));
    }

    #[test]
    fn test_pipes_append_or_substitute() {
        let source = "\
fn sub(a, b) {
  return a - b
}
x = 10 |> sub(%, 3)
y = 10 |> sub(3)
z = 2 |> sub(%, 1) |> sub(10, %)";
        let outcome = run(source).unwrap();
        assert_eq!(number(&outcome, "x"), 7.0);
        assert_eq!(number(&outcome, "y"), -7.0);
        assert_eq!(number(&outcome, "z"), 9.0);
    }

    #[test]
    fn test_if_blocks_yield_last_expression() {
        let source = "a = if false { 1 } else if true { 2 } else { 3 }\nb = if false { 1 }\nc = if true {\n  t = 4\n  t + 1\n} else {\n  0\n}";
        let outcome = run(source).unwrap();
        assert_eq!(number(&outcome, "a"), 2.0);
        assert_eq!(outcome.memory.get("b"), Some(&MemoryItem::None));
        assert_eq!(number(&outcome, "c"), 5.0);
        assert!(matches!(run("a = if 1 { 2 }"), Err(EvalError::Semantic { .. })));
    }

    #[test]
    fn test_return_inside_if_leaves_function() {
        let outcome = run("fn sign(x) {\n  if x < 0 {\n    return -1\n  }\n  return 1\n}\na = sign(-5)\nb = sign(5)").unwrap();
        assert_eq!(number(&outcome, "a"), -1.0);
        assert_eq!(number(&outcome, "b"), 1.0);
    }

    #[test]
    fn test_arrays_objects_and_ranges() {
        let outcome = run("r = [1..4]\no = { w: 2, h: [5, 6] }\na = r[3]\nb = o.h[1]\nc = o['w']").unwrap();
        assert_eq!(number(&outcome, "a"), 4.0);
        assert_eq!(number(&outcome, "b"), 6.0);
        assert_eq!(number(&outcome, "c"), 2.0);
        assert!(matches!(run("r = [3..1]"), Err(EvalError::Semantic { .. })));
        assert!(matches!(run("r = [1, 2]\na = r[2]"), Err(EvalError::Semantic { .. })));
        assert!(matches!(run("o = { a: 1 }\nb = o.z"), Err(EvalError::Semantic { .. })));
    }

    #[test]
    fn test_cube_creates_a_root_node() {
        let outcome = run("c = cube(10)").unwrap();
        assert_eq!(outcome.scene.len(), 1);
        assert_eq!(outcome.scene.triangle_count(), 12);
        assert!(matches!(
            outcome.memory.get("c"),
            Some(MemoryItem::Geometry {
                kind: GeometryKind::Solid,
                ..
            })
        ));
    }

    #[test]
    fn test_unused_sketches_become_profiles() {
        let source = "\
square = startSketchOn('XY')
  |> startProfileAt([0, 0], %)
  |> line([4, 0], %)
  |> line([0, 4], %)
  |> line([-4, 0], %)
  |> close(%)
path = startSketchOn('XZ')
  |> startProfileAt([0, 0], %)
  |> line([1, 1], %)";
        let outcome = run(source).unwrap();
        let kinds: Vec<GeometryKind> = outcome.scene.roots().map(|n| n.kind()).collect();
        assert_eq!(kinds, vec![GeometryKind::Surface, GeometryKind::Curve]);
        assert_eq!(outcome.scene.triangle_count(), 2);
    }

    #[test]
    fn test_extruded_sketch_is_not_a_profile() {
        let source = "\
part = startSketchOn('XY')
  |> startProfileAt([0, 0], %)
  |> line([4, 0], %)
  |> line([0, 4], %)
  |> close(%)
  |> extrude(2, %)";
        let outcome = run(source).unwrap();
        let kinds: Vec<GeometryKind> = outcome.scene.roots().map(|n| n.kind()).collect();
        assert_eq!(kinds, vec![GeometryKind::Solid]);
    }

    #[test]
    fn test_evaluation_is_deterministic() {
        let source = "a = cube(2)\nb = translate([1, 1, 1], cube(2))\nc = union(a, b)";
        let first = serde_json::to_string(&run(source).unwrap().scene).unwrap();
        let second = serde_json::to_string(&run(source).unwrap().scene).unwrap();
        assert_eq!(first, second);
    }
}
