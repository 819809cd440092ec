// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Abstract Syntax Tree module
//!
//! Node definitions, static name resolution and the evaluator that turns a
//! program into a scene graph.

mod evaluator;
mod node;
mod resolver;
mod value;

pub use evaluator::{evaluate, EvalOptions, Evaluator, ExecutionOutcome};
pub use node::{
    binding_of, Assoc, BinaryOp, Body, Comment, CommentStyle, DeclKeyword, Declaration, Expr,
    ExprKind, FunctionDeclaration, FunctionLiteral, Identifier, IfExpr, Item, ItemKind, NodeId,
    NumberLiteral, ObjectProperty, Program, PropertyName, SourceRange, StringLiteral, UnaryOp,
    PRECEDENCE_TABLE,
};
pub use resolver::{resolve, resolve_lenient, Binding, Resolution, Symbol, SymbolKind};
pub use value::{Closure, Frame, GeometryRef, MemoryItem, Number, ProgramMemory, Sketch, Value};
