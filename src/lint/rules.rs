// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! The fixed rule set

use super::diagnostic::{Finding, Severity};
use crate::ast::{
    BinaryOp, Body, Expr, ExprKind, FunctionLiteral, ItemKind, Program, Resolution, SourceRange,
    SymbolKind, UnaryOp,
};
use crate::units::{NumericSuffix, NumericType};

pub const Z0001: Finding = Finding {
    code: "Z0001",
    title: "Identifiers must be lowerCamelCase",
    description: "Variable, function and parameter names are written in lowerCamelCase, optionally prefixed with '_'.",
};

pub const Z0002: Finding = Finding {
    code: "Z0002",
    title: "Unused binding",
    description: "A local variable, parameter or function is declared but never used.",
};

pub const Z0003: Finding = Finding {
    code: "Z0003",
    title: "Unreachable code",
    description: "Statements after a return can never run.",
};

pub const Z0004: Finding = Finding {
    code: "Z0004",
    title: "Unit mismatch",
    description: "A length and an angle are added, subtracted or compared.",
};

pub const Z0005: Finding = Finding {
    code: "Z0005",
    title: "Deprecated syntax",
    description: "'let' and 'const' declarations and 'fn name = () => {}' functions are deprecated.",
};

pub const E0001: Finding = Finding {
    code: "E0001",
    title: "Syntax error",
    description: "The source could not be parsed.",
};

/// What a rule sees
pub struct LintContext<'a> {
    pub program: &'a Program,
    pub resolution: &'a Resolution,
}

pub struct Rule {
    pub finding: Finding,
    pub severity: Severity,
    check: fn(&LintContext<'_>) -> Vec<(String, SourceRange)>,
}

impl Rule {
    /// Violations as (message, range), ordered by position
    pub fn check(&self, cx: &LintContext<'_>) -> Vec<(String, SourceRange)> {
        let mut hits = (self.check)(cx);
        hits.sort_by_key(|(_, range)| (range.start, range.end));
        hits
    }
}

/// Every rule in the order diagnostics are reported
pub const RULES: &[Rule] = &[
    Rule {
        finding: Z0001,
        severity: Severity::Warning,
        check: camel_case,
    },
    Rule {
        finding: Z0002,
        severity: Severity::Warning,
        check: unused_bindings,
    },
    Rule {
        finding: Z0003,
        severity: Severity::Warning,
        check: unreachable_code,
    },
    Rule {
        finding: Z0004,
        severity: Severity::Error,
        check: literal_unit_mismatch,
    },
    Rule {
        finding: Z0005,
        severity: Severity::Warning,
        check: deprecated_syntax,
    },
];

fn is_lower_camel_case(name: &str) -> bool {
    let name = name.strip_prefix('_').unwrap_or(name);
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_lowercase()) && chars.all(|c| c.is_ascii_alphanumeric())
}

fn camel_case(cx: &LintContext<'_>) -> Vec<(String, SourceRange)> {
    cx.resolution
        .symbols()
        .iter()
        .filter(|symbol| !is_lower_camel_case(&symbol.name))
        .map(|symbol| {
            (
                format!("'{}' is not lowerCamelCase", symbol.name),
                symbol.range,
            )
        })
        .collect()
}

fn unused_bindings(cx: &LintContext<'_>) -> Vec<(String, SourceRange)> {
    cx.resolution
        .symbols()
        .iter()
        // Top-level variables are the program's outputs
        .filter(|symbol| !(symbol.top_level && symbol.kind == SymbolKind::Variable))
        .filter(|symbol| symbol.references == 0 && !symbol.name.starts_with('_'))
        .map(|symbol| {
            let what = match symbol.kind {
                SymbolKind::Variable => "variable",
                SymbolKind::Function => "function",
                SymbolKind::Parameter => "parameter",
            };
            (format!("{} '{}' is never used", what, symbol.name), symbol.range)
        })
        .collect()
}

fn unreachable_code(cx: &LintContext<'_>) -> Vec<(String, SourceRange)> {
    struct Unreachable(Vec<(String, SourceRange)>);

    impl Visitor for Unreachable {
        fn body(&mut self, body: &Body) {
            let mut returned = false;
            for item in body.code_items() {
                if returned {
                    self.0.push(("this statement follows a return".into(), item.range));
                }
                returned |= matches!(item.kind, ItemKind::Return(_));
            }
        }
    }

    let mut visitor = Unreachable(Vec::new());
    walk_body(&cx.program.body, &mut visitor);
    visitor.0
}

/// Dimension of a suffixed literal, looking through negation
fn literal_type(expr: &Expr) -> Option<NumericType> {
    match &expr.kind {
        ExprKind::Number(literal) => literal.suffix.map(NumericSuffix::numeric_type),
        ExprKind::Unary {
            op: UnaryOp::Neg,
            operand,
        } => literal_type(operand),
        _ => None,
    }
}

fn literal_unit_mismatch(cx: &LintContext<'_>) -> Vec<(String, SourceRange)> {
    struct Mismatch(Vec<(String, SourceRange)>);

    impl Visitor for Mismatch {
        fn expr(&mut self, expr: &Expr) {
            let ExprKind::Binary { op, left, right } = &expr.kind else {
                return;
            };
            let checked = matches!(
                op,
                BinaryOp::Add
                    | BinaryOp::Sub
                    | BinaryOp::Eq
                    | BinaryOp::NotEq
                    | BinaryOp::Lt
                    | BinaryOp::LtEq
                    | BinaryOp::Gt
                    | BinaryOp::GtEq
            );
            if !checked {
                return;
            }
            if let (Some(a), Some(b)) = (literal_type(left), literal_type(right)) {
                if a != b {
                    self.0.push((
                        format!("'{}' between a {} and a {}", op.symbol(), a.name(), b.name()),
                        expr.range,
                    ));
                }
            }
        }
    }

    let mut visitor = Mismatch(Vec::new());
    walk_body(&cx.program.body, &mut visitor);
    visitor.0
}

fn deprecated_syntax(cx: &LintContext<'_>) -> Vec<(String, SourceRange)> {
    struct Deprecated(Vec<(String, SourceRange)>);

    impl Visitor for Deprecated {
        fn body(&mut self, body: &Body) {
            for item in &body.items {
                match &item.kind {
                    ItemKind::Declaration(decl) => {
                        if let Some(keyword) = decl.keyword.as_str() {
                            self.0.push((
                                format!("'{}' is deprecated, write '{} = ...'", keyword, decl.name.name),
                                item.range,
                            ));
                        }
                    }
                    ItemKind::Function(func) if func.legacy_syntax => {
                        self.0.push((
                            format!("write 'fn {}(...) {{ ... }}' instead", func.name.name),
                            item.range,
                        ));
                    }
                    _ => {}
                }
            }
        }
    }

    let mut visitor = Deprecated(Vec::new());
    walk_body(&cx.program.body, &mut visitor);
    visitor.0
}

/// Callbacks for a pre-order walk over the AST
pub trait Visitor {
    fn body(&mut self, _body: &Body) {}
    fn expr(&mut self, _expr: &Expr) {}
}

pub fn walk_body(body: &Body, visitor: &mut impl Visitor) {
    visitor.body(body);
    for item in &body.items {
        match &item.kind {
            ItemKind::Declaration(decl) => walk_expr(&decl.value, visitor),
            ItemKind::Function(func) => walk_function(&func.function, visitor),
            ItemKind::Return(expr) | ItemKind::Expression(expr) => walk_expr(expr, visitor),
            ItemKind::Comment(_) => {}
        }
    }
}

fn walk_function(function: &FunctionLiteral, visitor: &mut impl Visitor) {
    walk_body(&function.body, visitor);
}

pub fn walk_expr(expr: &Expr, visitor: &mut impl Visitor) {
    visitor.expr(expr);
    match &expr.kind {
        ExprKind::Number(_)
        | ExprKind::String(_)
        | ExprKind::Bool(_)
        | ExprKind::Identifier(_)
        | ExprKind::PipeSubstitution => {}
        ExprKind::Array(items) | ExprKind::Pipe(items) => {
            for item in items {
                walk_expr(item, visitor);
            }
        }
        ExprKind::Range { start, end } => {
            walk_expr(start, visitor);
            walk_expr(end, visitor);
        }
        ExprKind::Object(props) => {
            for prop in props {
                walk_expr(&prop.value, visitor);
            }
        }
        ExprKind::Unary { operand, .. } => walk_expr(operand, visitor),
        ExprKind::Binary { left, right, .. } => {
            walk_expr(left, visitor);
            walk_expr(right, visitor);
        }
        ExprKind::Call { callee, args } => {
            walk_expr(callee, visitor);
            for arg in args {
                walk_expr(arg, visitor);
            }
        }
        ExprKind::Member { object, .. } => walk_expr(object, visitor),
        ExprKind::Index { object, index } => {
            walk_expr(object, visitor);
            walk_expr(index, visitor);
        }
        ExprKind::If(if_expr) => {
            walk_expr(&if_expr.condition, visitor);
            walk_body(&if_expr.then_body, visitor);
            for (condition, body) in &if_expr.else_ifs {
                walk_expr(condition, visitor);
                walk_body(body, visitor);
            }
            if let Some(body) = &if_expr.else_body {
                walk_body(body, visitor);
            }
        }
        ExprKind::Function(function) => walk_function(function, visitor),
    }
}
