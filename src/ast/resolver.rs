// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Static name resolution
//!
//! Walks the AST once with an explicit scope stack and maps every identifier
//! use to either a slot in an enclosing function frame or a builtin. The
//! evaluator never looks names up by string.

use super::node::{Body, Expr, ExprKind, FunctionLiteral, Identifier, ItemKind, NodeId, Program, SourceRange};
use crate::errors::EvalError;
use crate::stdlib::Builtin;
use ahash::AHashMap;

/// Where an identifier's value lives at run time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    /// Slot `slot` of the frame `hops` function levels up from the current one
    Local { hops: usize, slot: usize },
    Builtin(Builtin),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Variable,
    Function,
    Parameter,
}

/// A declared name and how often it was referenced
#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    pub id: NodeId,
    pub name: String,
    pub kind: SymbolKind,
    pub range: SourceRange,
    /// Declared directly in the program body
    pub top_level: bool,
    pub references: usize,
}

#[derive(Debug, Default)]
pub struct Resolution {
    references: AHashMap<NodeId, Binding>,
    slots: AHashMap<NodeId, usize>,
    frame_sizes: AHashMap<NodeId, usize>,
    program_frame_size: usize,
    symbols: Vec<Symbol>,
    errors: Vec<EvalError>,
}

impl Resolution {
    /// Binding of an identifier use
    pub fn binding(&self, ident: &Identifier) -> Option<Binding> {
        self.references.get(&ident.id).copied()
    }

    /// Slot assigned to a declared name or parameter
    pub fn slot(&self, ident: &Identifier) -> Option<usize> {
        self.slots.get(&ident.id).copied()
    }

    pub fn frame_size(&self, function: &FunctionLiteral) -> usize {
        self.frame_sizes.get(&function.id).copied().unwrap_or(0)
    }

    pub fn program_frame_size(&self) -> usize {
        self.program_frame_size
    }

    /// Declarations in source order
    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    /// Problems found in lenient mode
    pub fn errors(&self) -> &[EvalError] {
        &self.errors
    }
}

/// Resolve every name, failing on the first unresolved or duplicate binding
pub fn resolve(program: &Program) -> Result<Resolution, EvalError> {
    let mut resolver = Resolver::new(true);
    resolver.resolve_program(program);
    match resolver.resolution.errors.first() {
        Some(err) => Err(err.clone()),
        None => Ok(resolver.resolution),
    }
}

/// Resolve every name, collecting problems instead of failing
pub fn resolve_lenient(program: &Program) -> Resolution {
    let mut resolver = Resolver::new(false);
    resolver.resolve_program(program);
    resolver.resolution
}

struct Scope {
    names: AHashMap<String, (usize, usize)>,
    frame: usize,
}

struct Resolver {
    scopes: Vec<Scope>,
    /// Next free slot per open function frame
    frames: Vec<usize>,
    resolution: Resolution,
    strict: bool,
}

impl Resolver {
    fn new(strict: bool) -> Self {
        Self {
            scopes: Vec::new(),
            frames: Vec::new(),
            resolution: Resolution::default(),
            strict,
        }
    }

    fn failed(&self) -> bool {
        self.strict && !self.resolution.errors.is_empty()
    }

    fn resolve_program(&mut self, program: &Program) {
        self.frames.push(0);
        self.push_scope();
        self.resolve_items(&program.body);
        self.scopes.pop();
        self.resolution.program_frame_size = self.frames.pop().unwrap_or(0);
    }

    fn push_scope(&mut self) {
        let frame = self.frames.len() - 1;
        self.scopes.push(Scope {
            names: AHashMap::new(),
            frame,
        });
    }

    fn declare(&mut self, ident: &Identifier, kind: SymbolKind) {
        let top_level = self.scopes.len() == 1;
        let Some(scope) = self.scopes.last_mut() else {
            return;
        };
        if scope.names.contains_key(&ident.name) {
            self.resolution.errors.push(EvalError::DuplicateBinding {
                name: ident.name.clone(),
                range: ident.range,
            });
            return;
        }

        let next = &mut self.frames[scope.frame];
        let slot = *next;
        *next += 1;
        let symbol = self.resolution.symbols.len();
        scope.names.insert(ident.name.clone(), (slot, symbol));
        self.resolution.slots.insert(ident.id, slot);
        self.resolution.symbols.push(Symbol {
            id: ident.id,
            name: ident.name.clone(),
            kind,
            range: ident.range,
            top_level,
            references: 0,
        });
    }

    fn reference(&mut self, ident: &Identifier) {
        let current_frame = self.frames.len() - 1;
        for scope in self.scopes.iter().rev() {
            if let Some(&(slot, symbol)) = scope.names.get(&ident.name) {
                let hops = current_frame - scope.frame;
                self.resolution.references.insert(ident.id, Binding::Local { hops, slot });
                self.resolution.symbols[symbol].references += 1;
                return;
            }
        }
        match Builtin::lookup(&ident.name) {
            Some(builtin) => {
                self.resolution.references.insert(ident.id, Binding::Builtin(builtin));
            }
            None => self.resolution.errors.push(EvalError::UnresolvedBinding {
                name: ident.name.clone(),
                range: ident.range,
            }),
        }
    }

    fn resolve_items(&mut self, body: &Body) {
        for item in &body.items {
            if self.failed() {
                return;
            }
            match &item.kind {
                ItemKind::Declaration(decl) => {
                    self.resolve_expr(&decl.value);
                    self.declare(&decl.name, SymbolKind::Variable);
                }
                ItemKind::Function(func) => {
                    // Declared first so the body can recurse
                    self.declare(&func.name, SymbolKind::Function);
                    self.resolve_function(&func.function);
                }
                ItemKind::Return(value) | ItemKind::Expression(value) => self.resolve_expr(value),
                ItemKind::Comment(_) => {}
            }
        }
    }

    fn resolve_block(&mut self, body: &Body) {
        self.push_scope();
        self.resolve_items(body);
        self.scopes.pop();
    }

    fn resolve_function(&mut self, function: &FunctionLiteral) {
        self.frames.push(0);
        self.push_scope();
        for param in &function.params {
            self.declare(param, SymbolKind::Parameter);
        }
        self.resolve_items(&function.body);
        self.scopes.pop();
        let size = self.frames.pop().unwrap_or(0);
        self.resolution.frame_sizes.insert(function.id, size);
    }

    fn resolve_expr(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::Number(_) | ExprKind::String(_) | ExprKind::Bool(_) | ExprKind::PipeSubstitution => {}
            ExprKind::Identifier(ident) => self.reference(ident),
            ExprKind::Array(items) | ExprKind::Pipe(items) => {
                for item in items {
                    self.resolve_expr(item);
                }
            }
            ExprKind::Range { start, end } => {
                self.resolve_expr(start);
                self.resolve_expr(end);
            }
            ExprKind::Object(props) => {
                for prop in props {
                    self.resolve_expr(&prop.value);
                }
            }
            ExprKind::Unary { operand, .. } => self.resolve_expr(operand),
            ExprKind::Binary { left, right, .. } => {
                self.resolve_expr(left);
                self.resolve_expr(right);
            }
            ExprKind::Call { callee, args } => {
                self.resolve_expr(callee);
                for arg in args {
                    self.resolve_expr(arg);
                }
            }
            ExprKind::Member { object, .. } => self.resolve_expr(object),
            ExprKind::Index { object, index } => {
                self.resolve_expr(object);
                self.resolve_expr(index);
            }
            ExprKind::If(if_expr) => {
                self.resolve_expr(&if_expr.condition);
                self.resolve_block(&if_expr.then_body);
                for (condition, body) in &if_expr.else_ifs {
                    self.resolve_expr(condition);
                    self.resolve_block(body);
                }
                if let Some(body) = &if_expr.else_body {
                    self.resolve_block(body);
                }
            }
            ExprKind::Function(function) => self.resolve_function(function),
        }
    }
}
