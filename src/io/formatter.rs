// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Canonical source formatter

use super::parser::parse;
use crate::ast::{
    Assoc, Body, CommentStyle, Expr, ExprKind, FunctionLiteral, Item, ItemKind, Program, UnaryOp,
};
use crate::errors::FormatError;

const INDENT: &str = "  ";

/// Parse `source` and print it back in canonical layout
pub fn format(source: &str) -> Result<String, FormatError> {
    let program = parse(source)?;
    Ok(format_program(&program))
}

/// Print a parsed program in canonical layout
pub fn format_program(program: &Program) -> String {
    let mut printer = Printer::default();
    printer.items(&program.body.items, 0);
    printer.out
}

#[derive(Default)]
struct Printer {
    out: String,
}

impl Printer {
    fn indent(&mut self, level: usize) {
        for _ in 0..level {
            self.out.push_str(INDENT);
        }
    }

    fn items(&mut self, items: &[Item], level: usize) {
        for (index, item) in items.iter().enumerate() {
            if index > 0 && item.blank_line_before {
                self.out.push('\n');
            }
            self.indent(level);
            self.item(item, level, index > 0);
            if let Some(comment) = &item.trailing_comment {
                self.out.push(' ');
                self.out.push_str(comment_text(&comment.text, comment.style));
            }
            self.out.push('\n');
        }
    }

    fn item(&mut self, item: &Item, level: usize, follows_item: bool) {
        match &item.kind {
            ItemKind::Comment(comment) => {
                self.out.push_str(comment_text(&comment.text, comment.style));
            }
            ItemKind::Declaration(decl) => {
                if let Some(keyword) = decl.keyword.as_str() {
                    self.out.push_str(keyword);
                    self.out.push(' ');
                }
                self.out.push_str(&decl.name.name);
                self.out.push_str(" = ");
                let value = expr(&decl.value, level);
                self.out.push_str(&value);
            }
            ItemKind::Function(func) => {
                self.out.push_str("fn ");
                self.out.push_str(&func.name.name);
                if func.legacy_syntax {
                    self.out.push_str(" = ");
                    self.out.push_str(&params(&func.function));
                    self.out.push_str(" => ");
                } else {
                    self.out.push_str(&params(&func.function));
                    self.out.push(' ');
                }
                let body = block(&func.function.body, level);
                self.out.push_str(&body);
            }
            ItemKind::Return(value) => {
                self.out.push_str("return ");
                let value = expr(value, level);
                self.out.push_str(&value);
            }
            ItemKind::Expression(value) => {
                let value = expr(value, level);
                // A leading `-` would continue the previous item as a subtraction
                if follows_item && value.starts_with('-') {
                    self.out.push('(');
                    self.out.push_str(&value);
                    self.out.push(')');
                } else {
                    self.out.push_str(&value);
                }
            }
        }
    }
}

fn comment_text(text: &str, style: CommentStyle) -> &str {
    match style {
        CommentStyle::Line => text.trim_end(),
        CommentStyle::Block => text,
    }
}

fn params(function: &FunctionLiteral) -> String {
    let names: Vec<&str> = function.params.iter().map(|p| p.name.as_str()).collect();
    format!("({})", names.join(", "))
}

fn block(body: &Body, level: usize) -> String {
    if body.items.is_empty() {
        return "{}".to_string();
    }
    let mut printer = Printer::default();
    printer.out.push_str("{\n");
    printer.items(&body.items, level + 1);
    printer.indent(level);
    printer.out.push('}');
    printer.out
}

fn list(items: &[Expr], level: usize) -> String {
    items
        .iter()
        .map(|e| expr(e, level))
        .collect::<Vec<_>>()
        .join(", ")
}

fn parenthesized(e: &Expr, level: usize, needed: bool) -> String {
    let text = expr(e, level);
    if needed {
        format!("({})", text)
    } else {
        text
    }
}

/// Print an expression whose continuation lines sit at `level`
fn expr(e: &Expr, level: usize) -> String {
    match &e.kind {
        ExprKind::Number(n) => n.raw.clone(),
        ExprKind::String(s) => s.raw.clone(),
        ExprKind::Bool(b) => b.to_string(),
        ExprKind::Identifier(ident) => ident.name.clone(),
        ExprKind::PipeSubstitution => "%".to_string(),
        ExprKind::Array(items) => format!("[{}]", list(items, level)),
        ExprKind::Range { start, end } => {
            format!("[{}..{}]", expr(start, level), expr(end, level))
        }
        ExprKind::Object(props) if props.is_empty() => "{}".to_string(),
        ExprKind::Object(props) => {
            let fields: Vec<String> = props
                .iter()
                .map(|p| format!("{}: {}", p.key.name, expr(&p.value, level)))
                .collect();
            format!("{{ {} }}", fields.join(", "))
        }
        ExprKind::Unary { op, operand } => {
            let needs = operand.precedence() < UnaryOp::PRECEDENCE;
            format!("{}{}", op.symbol(), parenthesized(operand, level, needs))
        }
        ExprKind::Binary { op, left, right } => {
            let precedence = op.precedence();
            let left_needs = left.precedence() < precedence
                || (left.precedence() == precedence && op.assoc() == Assoc::Right);
            let right_needs = right.precedence() < precedence
                || (right.precedence() == precedence && op.assoc() == Assoc::Left);
            format!(
                "{} {} {}",
                parenthesized(left, level, left_needs),
                op.symbol(),
                parenthesized(right, level, right_needs)
            )
        }
        ExprKind::Pipe(steps) => {
            let mut text = String::new();
            for (index, step) in steps.iter().enumerate() {
                if index == 0 {
                    text.push_str(&expr(step, level));
                    continue;
                }
                text.push('\n');
                text.push_str(&INDENT.repeat(level + 1));
                text.push_str("|> ");
                let nested = matches!(step.kind, ExprKind::Pipe(_));
                text.push_str(&parenthesized(step, level + 1, nested));
            }
            text
        }
        ExprKind::Call { callee, args } => {
            let needs = callee.precedence() < u8::MAX;
            format!(
                "{}({})",
                parenthesized(callee, level, needs),
                list(args, level)
            )
        }
        ExprKind::Member { object, property } => {
            let needs = object.precedence() < u8::MAX;
            format!("{}.{}", parenthesized(object, level, needs), property.name)
        }
        ExprKind::Index { object, index } => {
            let needs = object.precedence() < u8::MAX;
            format!(
                "{}[{}]",
                parenthesized(object, level, needs),
                expr(index, level)
            )
        }
        ExprKind::If(if_expr) => {
            let mut text = format!(
                "if {} {}",
                expr(&if_expr.condition, level),
                block(&if_expr.then_body, level)
            );
            for (condition, body) in &if_expr.else_ifs {
                text.push_str(&format!(
                    " else if {} {}",
                    expr(condition, level),
                    block(body, level)
                ));
            }
            if let Some(body) = &if_expr.else_body {
                text.push_str(" else ");
                text.push_str(&block(body, level));
            }
            text
        }
        ExprKind::Function(function) => {
            format!("fn{} {}", params(function), block(&function.body, level))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_formats(input: &str, expected: &str) {
        let once = format(input).unwrap();
        assert_eq!(once, expected);
        assert_eq!(format(&once).unwrap(), once, "not idempotent");
    }

    #[test]
    fn test_spacing_and_newline() {
        assert_formats("x=1+2*  3", "x = 1 + 2 * 3\n");
        assert_formats("y = [1,2 ,3]\n\n\n\nz = {a:1,b:'s'}", "y = [1, 2, 3]\n\nz = { a: 1, b: 's' }\n");
        assert_formats("", "");
    }

    #[test]
    fn test_minimal_parentheses() {
        assert_formats("x = ((1 + 2)) * 3", "x = (1 + 2) * 3\n");
        assert_formats("x = 1 - (2 - 3)", "x = 1 - (2 - 3)\n");
        assert_formats("x = (1 - 2) - 3", "x = 1 - 2 - 3\n");
        assert_formats("x = (2 ^ 3) ^ 2", "x = (2 ^ 3) ^ 2\n");
        assert_formats("x = -(a + b)", "x = -(a + b)\n");
        assert_formats("x = (-2) ^ 2", "x = (-2) ^ 2\n");
    }

    #[test]
    fn test_pipes_break_lines() {
        let input = "part = startSketchOn('XY') |> startProfileAt([0,0], %) |> line([10, 0], %) |> close(%)";
        let expected = "part = startSketchOn('XY')\n  |> startProfileAt([0, 0], %)\n  |> line([10, 0], %)\n  |> close(%)\n";
        assert_formats(input, expected);
    }

    #[test]
    fn test_functions_and_blocks() {
        let input = "fn  add(a,b){return a+b}\nfn noop() {}\nv = if add(1,2)>2 { 'big' } else { 'small' }";
        let expected = "fn add(a, b) {\n  return a + b\n}\nfn noop() {}\nv = if add(1, 2) > 2 {\n  'big'\n} else {\n  'small'\n}\n";
        assert_formats(input, expected);
    }

    #[test]
    fn test_legacy_syntax_is_preserved() {
        assert_formats(
            "let w = 1\nfn f = (a) => { return a }",
            "let w = 1\nfn f = (a) => {\n  return a\n}\n",
        );
    }

    #[test]
    fn test_comments() {
        assert_formats(
            "// top   \nx = 1   // after\n\n\n/* block */ y = f(/* inside */ 2)\n",
            "// top\nx = 1 // after\n\n/* block */\n/* inside */\ny = f(2)\n",
        );
    }

    #[test]
    fn test_nested_pipe_in_function() {
        let input = "fn square(s) {\nreturn startSketchOn('XY') |> startProfileAt([0, 0], %) |> xLine(s, %)\n}";
        let expected = "fn square(s) {\n  return startSketchOn('XY')\n    |> startProfileAt([0, 0], %)\n    |> xLine(s, %)\n}\n";
        assert_formats(input, expected);
    }

    #[test]
    fn test_parse_errors_surface() {
        assert!(matches!(format("x = (1"), Err(FormatError::Parse(_))));
    }
}
