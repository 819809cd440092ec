// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! I/O module - lexing, parsing, formatting and exporting

mod export;
mod export_3mf;
mod export_gltf;
mod export_obj;
mod export_ply;
mod export_step;
mod export_stl;
mod formatter;
mod parser;
mod token;

pub use export::{export, ExportArtifact, ExportOptions, FileExportFormat, GltfStorage, StlStorage};
pub use formatter::{format, format_program};
pub use parser::parse;
pub use token::{tokenize, Token, TokenKind, KEYWORDS};
