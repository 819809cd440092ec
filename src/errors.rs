// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Error types for every stage of the pipeline

use crate::ast::SourceRange;
use thiserror::Error;

/// Malformed source text. Points at the first offending token.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("syntax error at {range}: {message}")]
pub struct ParseError {
    pub message: String,
    pub range: SourceRange,
}

impl ParseError {
    pub fn new(message: impl Into<String>, range: SourceRange) -> Self {
        Self {
            message: message.into(),
            range,
        }
    }
}

/// Failure while resolving or evaluating a parsed program
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("cannot find '{name}' at {range}")]
    UnresolvedBinding { name: String, range: SourceRange },

    #[error("'{name}' is already declared in this scope at {range}")]
    DuplicateBinding { name: String, range: SourceRange },

    #[error("invalid geometry at {range}: {message}")]
    InvalidGeometry { message: String, range: SourceRange },

    #[error("unit mismatch at {range}: {message}")]
    UnitMismatch { message: String, range: SourceRange },

    #[error("{message} at {range}")]
    Semantic { message: String, range: SourceRange },

    #[error("call depth exceeded the limit of {limit} at {range}")]
    RecursionLimit { limit: usize, range: SourceRange },

    #[error("assertion failed at {range}: {message}")]
    AssertionFailed { message: String, range: SourceRange },
}

impl EvalError {
    pub fn semantic(message: impl Into<String>, range: SourceRange) -> Self {
        EvalError::Semantic {
            message: message.into(),
            range,
        }
    }

    pub fn geometry(message: impl Into<String>, range: SourceRange) -> Self {
        EvalError::InvalidGeometry {
            message: message.into(),
            range,
        }
    }

    pub fn unit_mismatch(message: impl Into<String>, range: SourceRange) -> Self {
        EvalError::UnitMismatch {
            message: message.into(),
            range,
        }
    }

    pub fn range(&self) -> SourceRange {
        match self {
            EvalError::UnresolvedBinding { range, .. }
            | EvalError::DuplicateBinding { range, .. }
            | EvalError::InvalidGeometry { range, .. }
            | EvalError::UnitMismatch { range, .. }
            | EvalError::Semantic { range, .. }
            | EvalError::RecursionLimit { range, .. }
            | EvalError::AssertionFailed { range, .. } => *range,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RenderError {
    #[error("the scene contains no visible geometry")]
    EmptyScene,

    #[error("unsupported image encoding '{0}'")]
    UnsupportedEncoding(String),

    #[error("failed to encode image: {0}")]
    Encode(String),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExportError {
    #[error("the scene contains no exportable geometry")]
    EmptyScene,

    #[error("{format} cannot represent {reason}")]
    UnsupportedGeometry { format: String, reason: String },

    #[error("unsupported export format '{0}'")]
    UnsupportedFormat(String),

    #[error("failed to write {format} data: {message}")]
    Io { format: String, message: String },
}

impl ExportError {
    pub fn unsupported(format: impl Into<String>, reason: impl Into<String>) -> Self {
        ExportError::UnsupportedGeometry {
            format: format.into(),
            reason: reason.into(),
        }
    }

    pub fn io(format: impl Into<String>, err: impl std::fmt::Display) -> Self {
        ExportError::Io {
            format: format.into(),
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormatError {
    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Error of a full pipeline call, tagged with the stage that failed
#[derive(Debug, Clone, PartialEq, Error)]
pub enum KclError {
    #[error("parse: {0}")]
    Parse(#[from] ParseError),

    #[error("evaluation: {0}")]
    Eval(#[from] EvalError),

    #[error("render: {0}")]
    Render(#[from] RenderError),

    #[error("export: {0}")]
    Export(#[from] ExportError),
}

impl KclError {
    pub fn stage(&self) -> &'static str {
        match self {
            KclError::Parse(_) => "parse",
            KclError::Eval(_) => "evaluation",
            KclError::Render(_) => "render",
            KclError::Export(_) => "export",
        }
    }

    /// Source location of the failure, when the stage works on source text
    pub fn source_range(&self) -> Option<SourceRange> {
        match self {
            KclError::Parse(err) => Some(err.range),
            KclError::Eval(err) => Some(err.range()),
            KclError::Render(_) | KclError::Export(_) => None,
        }
    }
}
