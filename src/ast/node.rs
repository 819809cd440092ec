// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! AST node definitions

use crate::units::NumericSuffix;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Parser-assigned identity of identifiers, declarations and function literals
pub type NodeId = u32;

/// Byte offsets into the source text, `start <= end`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SourceRange {
    pub start: usize,
    pub end: usize,
}

impl SourceRange {
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Smallest range covering both
    pub fn merge(self, other: SourceRange) -> SourceRange {
        SourceRange::new(self.start.min(other.start), self.end.max(other.end))
    }

    pub fn contains(&self, other: &SourceRange) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// 1-based line and column of the range start
    pub fn line_col(&self, source: &str) -> (usize, usize) {
        let offset = self.start.min(source.len());
        let before = &source.as_bytes()[..offset];
        let line = before.iter().filter(|&&b| b == b'\n').count() + 1;
        let line_start = before
            .iter()
            .rposition(|&b| b == b'\n')
            .map(|i| i + 1)
            .unwrap_or(0);
        (line, offset - line_start + 1)
    }
}

impl fmt::Display for SourceRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// A parsed program
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub body: Body,
}

impl Program {
    pub fn range(&self) -> SourceRange {
        self.body.range
    }

    /// Items that carry code, skipping comments
    pub fn code_items(&self) -> impl Iterator<Item = &Item> {
        self.body.code_items()
    }
}

/// Ordered sequence of items with its own lexical scope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Body {
    pub items: Vec<Item>,
    pub range: SourceRange,
}

impl Body {
    pub fn code_items(&self) -> impl Iterator<Item = &Item> {
        self.items
            .iter()
            .filter(|item| !matches!(item.kind, ItemKind::Comment(_)))
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub kind: ItemKind,
    pub range: SourceRange,
    /// Source had an empty line between this item and the previous one
    pub blank_line_before: bool,
    /// Comment that followed the item on the same line
    pub trailing_comment: Option<Comment>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ItemKind {
    Declaration(Declaration),
    Function(FunctionDeclaration),
    Return(Expr),
    Expression(Expr),
    Comment(Comment),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub text: String,
    pub style: CommentStyle,
    pub range: SourceRange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CommentStyle {
    Line,
    Block,
}

/// Keyword that introduced a declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DeclKeyword {
    None,
    Let,
    Const,
}

impl DeclKeyword {
    pub fn as_str(self) -> Option<&'static str> {
        match self {
            DeclKeyword::None => None,
            DeclKeyword::Let => Some("let"),
            DeclKeyword::Const => Some("const"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Declaration {
    pub keyword: DeclKeyword,
    pub name: Identifier,
    pub value: Expr,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDeclaration {
    pub name: Identifier,
    pub function: FunctionLiteral,
    /// Written as `fn name = (params) => { ... }`
    pub legacy_syntax: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionLiteral {
    pub id: NodeId,
    pub params: Vec<Identifier>,
    pub body: Body,
    pub range: SourceRange,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identifier {
    pub id: NodeId,
    pub name: String,
    pub range: SourceRange,
}

/// Object key or member name; never a binding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyName {
    pub name: String,
    pub range: SourceRange,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expr {
    pub kind: ExprKind,
    pub range: SourceRange,
}

impl Expr {
    pub fn new(kind: ExprKind, range: SourceRange) -> Self {
        Self { kind, range }
    }

    /// Binding power used by the formatter to decide on parentheses
    pub fn precedence(&self) -> u8 {
        match &self.kind {
            ExprKind::Pipe(_) => BinaryOp::PIPE_PRECEDENCE,
            ExprKind::Binary { op, .. } => op.precedence(),
            ExprKind::Unary { .. } => UnaryOp::PRECEDENCE,
            _ => u8::MAX,
        }
    }

    /// Whether `%` appears in this expression outside nested pipes
    pub fn mentions_substitution(&self) -> bool {
        match &self.kind {
            ExprKind::PipeSubstitution => true,
            ExprKind::Number(_)
            | ExprKind::String(_)
            | ExprKind::Bool(_)
            | ExprKind::Identifier(_)
            | ExprKind::Pipe(_)
            | ExprKind::Function(_) => false,
            ExprKind::Array(items) => items.iter().any(Expr::mentions_substitution),
            ExprKind::Range { start, end } => {
                start.mentions_substitution() || end.mentions_substitution()
            }
            ExprKind::Object(props) => props.iter().any(|p| p.value.mentions_substitution()),
            ExprKind::Unary { operand, .. } => operand.mentions_substitution(),
            ExprKind::Binary { left, right, .. } => {
                left.mentions_substitution() || right.mentions_substitution()
            }
            ExprKind::Call { callee, args } => {
                callee.mentions_substitution() || args.iter().any(Expr::mentions_substitution)
            }
            ExprKind::Member { object, .. } => object.mentions_substitution(),
            ExprKind::Index { object, index } => {
                object.mentions_substitution() || index.mentions_substitution()
            }
            ExprKind::If(if_expr) => if_expr.condition.mentions_substitution()
                || if_expr.else_ifs.iter().any(|(cond, _)| cond.mentions_substitution()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum ExprKind {
    Number(NumberLiteral),
    String(StringLiteral),
    Bool(bool),
    Identifier(Identifier),
    PipeSubstitution,
    Array(Vec<Expr>),
    Range { start: Box<Expr>, end: Box<Expr> },
    Object(Vec<ObjectProperty>),
    Unary { op: UnaryOp, operand: Box<Expr> },
    Binary { op: BinaryOp, left: Box<Expr>, right: Box<Expr> },
    /// `a |> f(%) |> g(%)`; always at least two steps
    Pipe(Vec<Expr>),
    Call { callee: Box<Expr>, args: Vec<Expr> },
    Member { object: Box<Expr>, property: PropertyName },
    Index { object: Box<Expr>, index: Box<Expr> },
    If(Box<IfExpr>),
    Function(FunctionLiteral),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumberLiteral {
    /// Text as written, suffix included
    pub raw: String,
    pub value: f64,
    pub suffix: Option<NumericSuffix>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StringLiteral {
    /// Text as written, quotes included
    pub raw: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectProperty {
    pub key: PropertyName,
    pub value: Expr,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IfExpr {
    pub condition: Expr,
    pub then_body: Body,
    pub else_ifs: Vec<(Expr, Body)>,
    pub else_body: Option<Body>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UnaryOp {
    Neg,
    Not,
}

impl UnaryOp {
    pub const PRECEDENCE: u8 = 8;

    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Not => "!",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
}

/// Associativity of an infix operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assoc {
    Left,
    Right,
}

/// Infix operators from lowest to highest precedence
pub const PRECEDENCE_TABLE: &[(&str, u8, Assoc)] = &[
    ("|>", 1, Assoc::Left),
    ("||", 2, Assoc::Left),
    ("&&", 3, Assoc::Left),
    ("==", 4, Assoc::Left),
    ("!=", 4, Assoc::Left),
    ("<", 5, Assoc::Left),
    ("<=", 5, Assoc::Left),
    (">", 5, Assoc::Left),
    (">=", 5, Assoc::Left),
    ("+", 6, Assoc::Left),
    ("-", 6, Assoc::Left),
    ("*", 7, Assoc::Left),
    ("/", 7, Assoc::Left),
    ("%", 7, Assoc::Left),
    ("^", 9, Assoc::Right),
];

impl BinaryOp {
    pub const PIPE_PRECEDENCE: u8 = 1;

    pub fn from_symbol(symbol: &str) -> Option<Self> {
        let op = match symbol {
            "||" => BinaryOp::Or,
            "&&" => BinaryOp::And,
            "==" => BinaryOp::Eq,
            "!=" => BinaryOp::NotEq,
            "<" => BinaryOp::Lt,
            "<=" => BinaryOp::LtEq,
            ">" => BinaryOp::Gt,
            ">=" => BinaryOp::GtEq,
            "+" => BinaryOp::Add,
            "-" => BinaryOp::Sub,
            "*" => BinaryOp::Mul,
            "/" => BinaryOp::Div,
            "%" => BinaryOp::Mod,
            "^" => BinaryOp::Pow,
            _ => return None,
        };
        Some(op)
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Or => "||",
            BinaryOp::And => "&&",
            BinaryOp::Eq => "==",
            BinaryOp::NotEq => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::LtEq => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::GtEq => ">=",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Pow => "^",
        }
    }

    pub fn precedence(self) -> u8 {
        binding_of(self.symbol()).map(|(p, _)| p).unwrap_or(0)
    }

    pub fn assoc(self) -> Assoc {
        binding_of(self.symbol())
            .map(|(_, a)| a)
            .unwrap_or(Assoc::Left)
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::NotEq | BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq
        )
    }
}

/// Precedence and associativity of an infix symbol
pub fn binding_of(symbol: &str) -> Option<(u8, Assoc)> {
    PRECEDENCE_TABLE
        .iter()
        .find(|(s, _, _)| *s == symbol)
        .map(|&(_, p, a)| (p, a))
}
