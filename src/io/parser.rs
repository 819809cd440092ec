// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! KCL parser
//!
//! Statements are parsed by recursive descent and expressions with a Pratt
//! loop driven by [`PRECEDENCE_TABLE`]. The first error aborts the parse.
//! Comments survive as statement-level items so the formatter can re-emit them.

use super::token::{tokenize, Token, TokenKind};
use crate::ast::{
    binding_of, Assoc, BinaryOp, Body, Comment, CommentStyle, DeclKeyword, Declaration, Expr,
    ExprKind, FunctionDeclaration, FunctionLiteral, Identifier, IfExpr, Item, ItemKind, NodeId,
    NumberLiteral, ObjectProperty, Program, PropertyName, SourceRange, StringLiteral, UnaryOp,
};
use crate::errors::ParseError;
use crate::units::NumericSuffix;

/// Deepest expression nesting accepted before giving up
const MAX_NESTING: usize = 96;

/// Suffixes in the order they are stripped from number literals
const SUFFIXES: &[&str] = &["deg", "rad", "mm", "cm", "in", "ft", "yd", "m"];

/// Parse source text into a program
pub fn parse(source: &str) -> Result<Program, ParseError> {
    let tokens = tokenize(source)?;
    parse_tokens(source, &tokens)
}

/// Parse an already tokenized source
pub fn parse_tokens(source: &str, tokens: &[Token]) -> Result<Program, ParseError> {
    let mut parser = Parser::new(source, tokens);
    let program = parser.parse_program()?;
    log::debug!(items = program.body.items.len(), nodes = parser.next_id; "Parsed program");
    Ok(program)
}

struct Parser<'a> {
    source: &'a str,
    code: Vec<&'a Token>,
    comments: Vec<&'a Token>,
    pos: usize,
    next_comment: usize,
    next_id: NodeId,
    pipe_depth: usize,
    fn_depth: usize,
    nesting: usize,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str, tokens: &'a [Token]) -> Self {
        Self {
            source,
            code: tokens.iter().filter(|t| !t.kind.is_trivia()).collect(),
            comments: tokens.iter().filter(|t| t.kind.is_comment()).collect(),
            pos: 0,
            next_comment: 0,
            next_id: 0,
            pipe_depth: 0,
            fn_depth: 0,
            nesting: 0,
        }
    }

    fn parse_program(&mut self) -> Result<Program, ParseError> {
        let items = self.parse_items(0, false)?;
        Ok(Program {
            body: Body {
                items,
                range: SourceRange::new(0, self.source.len()),
            },
        })
    }

    // Token cursor

    fn peek(&self) -> Option<&'a Token> {
        self.code.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<&'a Token> {
        self.code.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<&'a Token> {
        let token = self.peek();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn prev_end(&self) -> usize {
        if self.pos == 0 {
            0
        } else {
            self.code[self.pos - 1].range.end
        }
    }

    fn eof_range(&self) -> SourceRange {
        SourceRange::new(self.source.len(), self.source.len())
    }

    fn error_here(&self, expected: &str) -> ParseError {
        match self.peek() {
            Some(token) => ParseError::new(
                format!("{}, found '{}'", expected, token.value),
                token.range,
            ),
            None => ParseError::new(format!("{}, found end of input", expected), self.eof_range()),
        }
    }

    fn expect(&mut self, kind: TokenKind, value: &str) -> Result<&'a Token, ParseError> {
        match self.peek() {
            Some(token) if token.is(kind, value) => {
                self.pos += 1;
                Ok(token)
            }
            _ => Err(self.error_here(&format!("expected '{}'", value))),
        }
    }

    fn eat(&mut self, kind: TokenKind, value: &str) -> bool {
        if self.peek().is_some_and(|t| t.is(kind, value)) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn fresh_id(&mut self) -> NodeId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    // Comments and layout

    fn blank_between(&self, from: usize, to: usize) -> bool {
        from < to && self.source[from..to].matches('\n').count() >= 2
    }

    fn take_comment_before(&mut self, limit: usize) -> Option<Comment> {
        let token = self.comments.get(self.next_comment).copied()?;
        if token.range.start >= limit {
            return None;
        }
        self.next_comment += 1;
        Some(comment_from(token))
    }

    fn comment_item(comment: Comment, blank_line_before: bool) -> Item {
        Item {
            range: comment.range,
            kind: ItemKind::Comment(comment),
            blank_line_before,
            trailing_comment: None,
        }
    }

    /// Items up to end of input or, inside a block, up to the closing brace
    fn parse_items(&mut self, body_start: usize, in_block: bool) -> Result<Vec<Item>, ParseError> {
        let mut items: Vec<Item> = Vec::new();
        let mut last_end = body_start;

        loop {
            let next = self.peek();
            let boundary = next.map(|t| t.range.start).unwrap_or(self.source.len());

            while let Some(comment) = self.take_comment_before(boundary) {
                let blank = !items.is_empty() && self.blank_between(last_end, comment.range.start);
                last_end = comment.range.end;
                items.push(Self::comment_item(comment, blank));
            }

            match next {
                None if in_block => return Err(self.error_here("expected '}'")),
                None => break,
                Some(token) if token.is_brace("}") => {
                    if in_block {
                        break;
                    }
                    return Err(ParseError::new("unexpected '}'", token.range));
                }
                Some(_) => {}
            }

            let start = boundary;
            let blank = !items.is_empty() && self.blank_between(last_end, start);
            let kind = self.parse_item()?;
            let range = SourceRange::new(start, self.prev_end());

            // Comments written inside the statement move in front of it
            let mut item_blank = blank;
            while let Some(comment) = self.take_comment_before(range.end) {
                items.push(Self::comment_item(comment, item_blank));
                item_blank = false;
            }

            let mut item = Item {
                kind,
                range,
                blank_line_before: item_blank,
                trailing_comment: None,
            };
            last_end = range.end;

            let next_code_start = self.peek().map(|t| t.range.start).unwrap_or(usize::MAX);
            if let Some(token) = self.comments.get(self.next_comment).copied() {
                let same_line = !self.source[range.end..token.range.start].contains('\n');
                if same_line && token.range.start < next_code_start {
                    self.next_comment += 1;
                    last_end = token.range.end;
                    item.trailing_comment = Some(comment_from(token));
                }
            }
            items.push(item);
        }

        Ok(items)
    }

    fn parse_block(&mut self) -> Result<Body, ParseError> {
        let open = self.expect(TokenKind::Brace, "{")?;
        let items = self.parse_items(open.range.end, true)?;
        let close = self.expect(TokenKind::Brace, "}")?;
        Ok(Body {
            items,
            range: SourceRange::new(open.range.start, close.range.end),
        })
    }

    // Statements

    fn parse_item(&mut self) -> Result<ItemKind, ParseError> {
        let Some(token) = self.peek() else {
            return Err(self.error_here("expected a statement"));
        };

        if token.is_keyword("fn") && self.peek_at(1).is_some_and(|t| t.kind == TokenKind::Word) {
            return self.parse_function_declaration();
        }

        if token.is_keyword("let") || token.is_keyword("const") {
            self.advance();
            let keyword = if token.value == "let" {
                DeclKeyword::Let
            } else {
                DeclKeyword::Const
            };
            return self.parse_declaration(keyword);
        }

        if token.is_keyword("return") {
            if self.fn_depth == 0 {
                return Err(ParseError::new(
                    "'return' is only allowed inside a function body",
                    token.range,
                ));
            }
            self.advance();
            return Ok(ItemKind::Return(self.parse_expr(0)?));
        }

        if token.kind == TokenKind::Word && self.peek_at(1).is_some_and(|t| t.is_operator("=")) {
            return self.parse_declaration(DeclKeyword::None);
        }

        Ok(ItemKind::Expression(self.parse_expr(0)?))
    }

    fn parse_identifier(&mut self) -> Result<Identifier, ParseError> {
        match self.peek() {
            Some(token) if token.kind == TokenKind::Word => {
                self.pos += 1;
                Ok(Identifier {
                    id: self.fresh_id(),
                    name: token.value.clone(),
                    range: token.range,
                })
            }
            _ => Err(self.error_here("expected a name")),
        }
    }

    fn parse_declaration(&mut self, keyword: DeclKeyword) -> Result<ItemKind, ParseError> {
        let name = self.parse_identifier()?;
        self.expect(TokenKind::Operator, "=")?;
        let value = self.parse_expr(0)?;
        Ok(ItemKind::Declaration(Declaration {
            keyword,
            name,
            value,
        }))
    }

    fn parse_function_declaration(&mut self) -> Result<ItemKind, ParseError> {
        let fn_token = self.expect(TokenKind::Keyword, "fn")?;
        let name = self.parse_identifier()?;
        let legacy_syntax = self.eat(TokenKind::Operator, "=");
        let function = self.parse_function_rest(fn_token.range.start, legacy_syntax)?;
        Ok(ItemKind::Function(FunctionDeclaration {
            name,
            function,
            legacy_syntax,
        }))
    }

    /// Parameters and body, starting at the opening parenthesis
    fn parse_function_rest(&mut self, start: usize, legacy: bool) -> Result<FunctionLiteral, ParseError> {
        let id = self.fresh_id();
        self.expect(TokenKind::Brace, "(")?;
        let mut params = Vec::new();
        while !self.eat(TokenKind::Brace, ")") {
            params.push(self.parse_identifier()?);
            if !self.eat(TokenKind::Operator, ",") {
                self.expect(TokenKind::Brace, ")")?;
                break;
            }
        }
        if legacy {
            self.expect(TokenKind::Operator, "=>")?;
        }

        let saved_pipe_depth = std::mem::replace(&mut self.pipe_depth, 0);
        self.fn_depth += 1;
        let body = self.parse_block();
        self.fn_depth -= 1;
        self.pipe_depth = saved_pipe_depth;
        let body = body?;

        Ok(FunctionLiteral {
            id,
            params,
            range: SourceRange::new(start, body.range.end),
            body,
        })
    }

    // Expressions

    fn parse_expr(&mut self, min_bp: u8) -> Result<Expr, ParseError> {
        self.nesting += 1;
        if self.nesting > MAX_NESTING {
            return Err(self.error_here("expression is nested too deeply"));
        }

        let mut lhs = self.parse_unary()?;
        while let Some(token) = self.peek() {
            if token.kind != TokenKind::Operator {
                break;
            }
            let Some((precedence, assoc)) = binding_of(&token.value) else {
                break;
            };
            let (left_bp, right_bp) = match assoc {
                Assoc::Left => (precedence * 2, precedence * 2 + 1),
                Assoc::Right => (precedence * 2 + 1, precedence * 2),
            };
            if left_bp < min_bp {
                break;
            }
            self.advance();

            if token.value == "|>" {
                self.pipe_depth += 1;
                let step = self.parse_expr(right_bp);
                self.pipe_depth -= 1;
                let step = step?;
                let range = lhs.range.merge(step.range);
                lhs = match lhs.kind {
                    ExprKind::Pipe(mut steps) => {
                        steps.push(step);
                        Expr::new(ExprKind::Pipe(steps), range)
                    }
                    _ => Expr::new(ExprKind::Pipe(vec![lhs, step]), range),
                };
            } else {
                let op = BinaryOp::from_symbol(&token.value)
                    .ok_or_else(|| ParseError::new("unknown operator", token.range))?;
                let rhs = self.parse_expr(right_bp)?;
                let range = lhs.range.merge(rhs.range);
                lhs = Expr::new(
                    ExprKind::Binary {
                        op,
                        left: Box::new(lhs),
                        right: Box::new(rhs),
                    },
                    range,
                );
            }
        }

        self.nesting -= 1;
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        let op = match self.peek() {
            Some(token) if token.is_operator("-") => Some((UnaryOp::Neg, token.range)),
            Some(token) if token.is_operator("!") => Some((UnaryOp::Not, token.range)),
            _ => None,
        };

        match op {
            Some((op, range)) => {
                self.advance();
                let operand = self.parse_expr(UnaryOp::PRECEDENCE * 2)?;
                let range = range.merge(operand.range);
                Ok(Expr::new(
                    ExprKind::Unary {
                        op,
                        operand: Box::new(operand),
                    },
                    range,
                ))
            }
            None => {
                let primary = self.parse_primary()?;
                self.parse_postfix(primary)
            }
        }
    }

    /// Calls, indexing and member access bind only to an adjacent token
    fn parse_postfix(&mut self, mut expr: Expr) -> Result<Expr, ParseError> {
        while let Some(token) = self.peek() {
            if token.range.start != self.prev_end() {
                break;
            }

            if token.is_brace("(") {
                self.advance();
                let args = self.parse_list(")")?;
                let range = SourceRange::new(expr.range.start, self.prev_end());
                expr = Expr::new(
                    ExprKind::Call {
                        callee: Box::new(expr),
                        args,
                    },
                    range,
                );
            } else if token.is_brace("[") {
                self.advance();
                let index = self.parse_expr(0)?;
                self.expect(TokenKind::Brace, "]")?;
                let range = SourceRange::new(expr.range.start, self.prev_end());
                expr = Expr::new(
                    ExprKind::Index {
                        object: Box::new(expr),
                        index: Box::new(index),
                    },
                    range,
                );
            } else if token.is_operator(".") {
                self.advance();
                let property = match self.peek() {
                    Some(name) if name.kind == TokenKind::Word => {
                        self.advance();
                        PropertyName {
                            name: name.value.clone(),
                            range: name.range,
                        }
                    }
                    _ => return Err(self.error_here("expected a property name after '.'")),
                };
                let range = SourceRange::new(expr.range.start, property.range.end);
                expr = Expr::new(
                    ExprKind::Member {
                        object: Box::new(expr),
                        property,
                    },
                    range,
                );
            } else {
                break;
            }
        }
        Ok(expr)
    }

    /// Comma separated expressions up to `close`; the opener is already consumed
    fn parse_list(&mut self, close: &str) -> Result<Vec<Expr>, ParseError> {
        let mut items = Vec::new();
        while !self.eat(TokenKind::Brace, close) {
            items.push(self.parse_expr(0)?);
            if !self.eat(TokenKind::Operator, ",") {
                self.expect(TokenKind::Brace, close)?;
                break;
            }
        }
        Ok(items)
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let Some(token) = self.peek() else {
            return Err(self.error_here("expected an expression"));
        };

        match token.kind {
            TokenKind::Number => {
                self.advance();
                Ok(Expr::new(ExprKind::Number(parse_number(token)?), token.range))
            }
            TokenKind::String => {
                self.advance();
                Ok(Expr::new(ExprKind::String(parse_string(token)?), token.range))
            }
            TokenKind::Word => {
                let ident = self.parse_identifier()?;
                let range = ident.range;
                Ok(Expr::new(ExprKind::Identifier(ident), range))
            }
            TokenKind::Keyword => match token.value.as_str() {
                "true" | "false" => {
                    self.advance();
                    Ok(Expr::new(ExprKind::Bool(token.value == "true"), token.range))
                }
                "fn" => {
                    self.advance();
                    let function = self.parse_function_rest(token.range.start, false)?;
                    let range = function.range;
                    Ok(Expr::new(ExprKind::Function(function), range))
                }
                "if" => self.parse_if(),
                _ => Err(ParseError::new(
                    format!("unexpected keyword '{}'", token.value),
                    token.range,
                )),
            },
            TokenKind::Operator if token.value == "%" => {
                if self.pipe_depth == 0 {
                    return Err(ParseError::new(
                        "'%' can only be used on the right-hand side of '|>'",
                        token.range,
                    ));
                }
                self.advance();
                Ok(Expr::new(ExprKind::PipeSubstitution, token.range))
            }
            TokenKind::Brace => match token.value.as_str() {
                "(" => {
                    self.advance();
                    let inner = self.parse_expr(0)?;
                    let close = self.expect(TokenKind::Brace, ")")?;
                    Ok(Expr::new(
                        inner.kind,
                        SourceRange::new(token.range.start, close.range.end),
                    ))
                }
                "[" => self.parse_array(),
                "{" => self.parse_object(),
                _ => Err(self.error_here("expected an expression")),
            },
            _ => Err(self.error_here("expected an expression")),
        }
    }

    fn parse_array(&mut self) -> Result<Expr, ParseError> {
        let open = self.expect(TokenKind::Brace, "[")?;
        if self.eat(TokenKind::Brace, "]") {
            return Ok(Expr::new(
                ExprKind::Array(Vec::new()),
                SourceRange::new(open.range.start, self.prev_end()),
            ));
        }

        let first = self.parse_expr(0)?;
        if self.eat(TokenKind::Operator, "..") {
            let end = self.parse_expr(0)?;
            self.expect(TokenKind::Brace, "]")?;
            return Ok(Expr::new(
                ExprKind::Range {
                    start: Box::new(first),
                    end: Box::new(end),
                },
                SourceRange::new(open.range.start, self.prev_end()),
            ));
        }

        let mut items = vec![first];
        if self.eat(TokenKind::Operator, ",") {
            items.extend(self.parse_list("]")?);
        } else {
            self.expect(TokenKind::Brace, "]")?;
        }
        Ok(Expr::new(
            ExprKind::Array(items),
            SourceRange::new(open.range.start, self.prev_end()),
        ))
    }

    fn parse_object(&mut self) -> Result<Expr, ParseError> {
        let open = self.expect(TokenKind::Brace, "{")?;
        let mut properties = Vec::new();
        while !self.eat(TokenKind::Brace, "}") {
            let key = match self.peek() {
                Some(token) if token.kind == TokenKind::Word => {
                    self.advance();
                    PropertyName {
                        name: token.value.clone(),
                        range: token.range,
                    }
                }
                _ => return Err(self.error_here("expected a property name")),
            };
            self.expect(TokenKind::Operator, ":")?;
            let value = self.parse_expr(0)?;
            properties.push(ObjectProperty { key, value });
            if !self.eat(TokenKind::Operator, ",") {
                self.expect(TokenKind::Brace, "}")?;
                break;
            }
        }
        Ok(Expr::new(
            ExprKind::Object(properties),
            SourceRange::new(open.range.start, self.prev_end()),
        ))
    }

    fn parse_if(&mut self) -> Result<Expr, ParseError> {
        let start = self.expect(TokenKind::Keyword, "if")?.range.start;
        let condition = self.parse_expr(0)?;
        let then_body = self.parse_block()?;
        let mut else_ifs = Vec::new();
        let mut else_body = None;

        while self.eat(TokenKind::Keyword, "else") {
            if self.eat(TokenKind::Keyword, "if") {
                let cond = self.parse_expr(0)?;
                let body = self.parse_block()?;
                else_ifs.push((cond, body));
            } else {
                else_body = Some(self.parse_block()?);
                break;
            }
        }

        Ok(Expr::new(
            ExprKind::If(Box::new(IfExpr {
                condition,
                then_body,
                else_ifs,
                else_body,
            })),
            SourceRange::new(start, self.prev_end()),
        ))
    }
}

fn comment_from(token: &Token) -> Comment {
    Comment {
        text: token.value.clone(),
        style: if token.kind == TokenKind::BlockComment {
            CommentStyle::Block
        } else {
            CommentStyle::Line
        },
        range: token.range,
    }
}

fn parse_number(token: &Token) -> Result<NumberLiteral, ParseError> {
    let raw = token.value.as_str();
    let (digits, suffix) = SUFFIXES
        .iter()
        .find_map(|s| {
            let digits = raw.strip_suffix(s)?;
            let last = digits.chars().last()?;
            (last.is_ascii_digit() || last == '.').then(|| (digits, NumericSuffix::parse(s)))
        })
        .unwrap_or((raw, None));

    let value: f64 = digits
        .parse()
        .map_err(|_| ParseError::new(format!("invalid number '{}'", raw), token.range))?;
    if !value.is_finite() {
        return Err(ParseError::new(format!("number '{}' is out of range", raw), token.range));
    }
    Ok(NumberLiteral {
        raw: raw.to_string(),
        value,
        suffix,
    })
}

fn parse_string(token: &Token) -> Result<StringLiteral, ParseError> {
    let raw = token.value.as_str();
    let inner = &raw[1..raw.len() - 1];
    let mut value = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            value.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => value.push('\n'),
            Some('t') => value.push('\t'),
            Some(c @ ('\\' | '\'' | '"')) => value.push(c),
            Some(other) => {
                return Err(ParseError::new(
                    format!("unknown escape sequence '\\{}'", other),
                    token.range,
                ))
            }
            None => return Err(ParseError::new("dangling escape", token.range)),
        }
    }
    Ok(StringLiteral {
        raw: raw.to_string(),
        value,
    })
}
