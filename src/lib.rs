// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! KCL Engine
//!
//! Parses, formats, lints and evaluates a parametric modeling language, then
//! renders the resulting scene to PNG/JPEG or exports it to STEP, STL, OBJ,
//! PLY, glTF/GLB and 3MF. Every call works on in-memory text and bytes.

pub mod ast;
pub mod cache;
pub mod engine;
pub mod errors;
pub mod geometry;
pub mod io;
pub mod lint;
pub mod render;
pub mod scene;
pub mod settings;
pub mod stdlib;
pub mod units;
pub mod utils;

pub use ast::{ExecutionOutcome, Program, SourceRange};
pub use cache::{CacheStats, ProgramCache};
pub use engine::Engine;
pub use errors::{EvalError, ExportError, FormatError, KclError, ParseError, RenderError};
pub use io::{ExportArtifact, ExportOptions, FileExportFormat, Token, TokenKind};
pub use lint::{Diagnostic, Finding, Severity};
pub use render::{ImageFormat, RenderOptions, RenderedImage};
pub use scene::SceneGraph;
pub use settings::EngineSettings;
pub use units::UnitLength;

/// Split `source` into tokens, trivia included
pub fn tokenize(source: &str) -> Result<Vec<Token>, ParseError> {
    io::tokenize(source)
}

pub fn parse(source: &str) -> Result<Program, ParseError> {
    io::parse(source)
}

/// Evaluate `source` with lengths in `unit`, discarding the result
pub fn execute(source: &str, unit: UnitLength) -> Result<(), KclError> {
    Engine::with_units(unit).execute(source)
}

/// Evaluate `source` and render it with the default camera and raster
pub fn execute_and_snapshot(source: &str, unit: UnitLength, format: ImageFormat) -> Result<Vec<u8>, KclError> {
    Engine::with_units(unit).execute_and_snapshot(source, format)
}

pub fn execute_and_export(
    source: &str,
    unit: UnitLength,
    format: FileExportFormat,
) -> Result<Vec<ExportArtifact>, KclError> {
    Engine::with_units(unit).execute_and_export(source, format)
}

/// Canonical layout of `source`
pub fn format(source: &str) -> Result<String, FormatError> {
    io::format(source)
}

pub fn lint(source: &str) -> Vec<Diagnostic> {
    lint::lint(source)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_cube() {
        assert!(execute("cube(10)", UnitLength::Mm).is_ok());
    }

    #[test]
    fn test_syntax_error_range_is_in_bounds() {
        let source = "x = [1, 2";
        let err = parse(source).unwrap_err();
        assert!(err.range.start <= err.range.end);
        assert!(err.range.end <= source.len());
    }
}
