// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Lexer built on pest

use crate::ast::SourceRange;
use crate::errors::ParseError;
use pest::Parser;
use pest_derive::Parser;
use serde::{Deserialize, Serialize};

#[derive(Parser)]
#[grammar = "io/kcl.pest"]
struct KclLexer;

pub const KEYWORDS: &[&str] = &["fn", "return", "if", "else", "true", "false", "let", "const"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TokenKind {
    Number,
    String,
    Word,
    Keyword,
    Operator,
    Brace,
    Whitespace,
    LineComment,
    BlockComment,
}

impl TokenKind {
    /// Tokens the parser skips over
    pub fn is_trivia(self) -> bool {
        matches!(
            self,
            TokenKind::Whitespace | TokenKind::LineComment | TokenKind::BlockComment
        )
    }

    pub fn is_comment(self) -> bool {
        matches!(self, TokenKind::LineComment | TokenKind::BlockComment)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub kind: TokenKind,
    pub value: String,
    pub range: SourceRange,
}

impl Token {
    pub fn is(&self, kind: TokenKind, value: &str) -> bool {
        self.kind == kind && self.value == value
    }

    pub fn is_operator(&self, value: &str) -> bool {
        self.is(TokenKind::Operator, value)
    }

    pub fn is_brace(&self, value: &str) -> bool {
        self.is(TokenKind::Brace, value)
    }

    pub fn is_keyword(&self, value: &str) -> bool {
        self.is(TokenKind::Keyword, value)
    }
}

/// Split source text into tokens, trivia included
pub fn tokenize(source: &str) -> Result<Vec<Token>, ParseError> {
    let pairs = KclLexer::parse(Rule::tokens, source).map_err(|err| {
        let start = match err.location {
            pest::error::InputLocation::Pos(pos) => pos,
            pest::error::InputLocation::Span((start, _)) => start,
        };
        let range = SourceRange::new(start, next_char_boundary(source, start));
        let found = source[start..].chars().next();
        let message = match found {
            Some('"') | Some('\'') => "unterminated string literal".to_string(),
            Some(c) => format!("unexpected character '{}'", c),
            None => "unexpected end of input".to_string(),
        };
        ParseError::new(message, range)
    })?;

    let mut tokens = Vec::new();
    for pair in pairs {
        let kind = match pair.as_rule() {
            Rule::whitespace => TokenKind::Whitespace,
            Rule::line_comment => TokenKind::LineComment,
            Rule::block_comment => TokenKind::BlockComment,
            Rule::number => TokenKind::Number,
            Rule::string => TokenKind::String,
            Rule::word if KEYWORDS.contains(&pair.as_str()) => TokenKind::Keyword,
            Rule::word => TokenKind::Word,
            Rule::operator => TokenKind::Operator,
            Rule::brace => TokenKind::Brace,
            _ => continue,
        };
        let span = pair.as_span();
        tokens.push(Token {
            kind,
            value: pair.as_str().to_string(),
            range: SourceRange::new(span.start(), span.end()),
        });
    }

    log::trace!(count = tokens.len(); "Tokenized source");
    Ok(tokens)
}

fn next_char_boundary(source: &str, start: usize) -> usize {
    source[start..]
        .chars()
        .next()
        .map(|c| start + c.len_utf8())
        .unwrap_or(start)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<(TokenKind, String)> {
        tokenize(source)
            .unwrap()
            .into_iter()
            .filter(|t| !t.kind.is_trivia())
            .map(|t| (t.kind, t.value))
            .collect()
    }

    #[test]
    fn test_numbers_with_suffixes() {
        let tokens = kinds("10mm 2.5in 90deg 1e3 .5 10m");
        let values: Vec<&str> = tokens.iter().map(|(_, v)| v.as_str()).collect();
        assert_eq!(values, vec!["10mm", "2.5in", "90deg", "1e3", ".5", "10m"]);
        assert!(tokens.iter().all(|(k, _)| *k == TokenKind::Number));
    }

    #[test]
    fn test_range_does_not_lex_as_decimal() {
        let values: Vec<String> = kinds("[1..5]").into_iter().map(|(_, v)| v).collect();
        assert_eq!(values, vec!["[", "1", "..", "5", "]"]);
    }

    #[test]
    fn test_suffix_requires_word_boundary() {
        let tokens = kinds("10min");
        assert_eq!(tokens[0], (TokenKind::Number, "10".to_string()));
        assert_eq!(tokens[1], (TokenKind::Word, "min".to_string()));
    }

    #[test]
    fn test_keywords_and_comments() {
        let tokens = tokenize("fn f() { return 1 } // done").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Keyword);
        assert_eq!(tokens.last().map(|t| t.kind), Some(TokenKind::LineComment));
    }

    #[test]
    fn test_pipe_operator() {
        let tokens = kinds("a |> f(%)");
        assert!(tokens.contains(&(TokenKind::Operator, "|>".to_string())));
        assert!(tokens.contains(&(TokenKind::Operator, "%".to_string())));
    }

    #[test]
    fn test_unexpected_character() {
        let err = tokenize("x = 1 # 2").unwrap_err();
        assert_eq!(err.range, SourceRange::new(6, 7));
        assert!(err.message.contains('#'));
    }

    #[test]
    fn test_tokens_cover_source() {
        let source = "x = [1, 2] /* c */\n";
        let tokens = tokenize(source).unwrap();
        let rebuilt: String = tokens.iter().map(|t| t.value.as_str()).collect();
        assert_eq!(rebuilt, source);
    }
}
