// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Static checks over a parsed program
//!
//! Linting never fails: a source that does not parse yields a single
//! `E0001` diagnostic.

mod diagnostic;
mod rules;

pub use diagnostic::{Diagnostic, Finding, Severity};
pub use rules::{walk_body, walk_expr, LintContext, Rule, Visitor, E0001, RULES, Z0001, Z0002, Z0003, Z0004, Z0005};

use crate::ast::{resolve_lenient, Program};
use crate::io::parse;

/// Run every rule over `source`
pub fn lint(source: &str) -> Vec<Diagnostic> {
    lint_with(source, &[])
}

/// Run every rule whose code is not in `disabled`
pub fn lint_with(source: &str, disabled: &[String]) -> Vec<Diagnostic> {
    match parse(source) {
        Ok(program) => lint_program(&program, disabled),
        Err(err) => vec![Diagnostic {
            severity: Severity::Error,
            finding: E0001,
            description: err.message,
            range: Some(err.range),
        }],
    }
}

pub fn lint_program(program: &Program, disabled: &[String]) -> Vec<Diagnostic> {
    let resolution = resolve_lenient(program);
    let cx = LintContext {
        program,
        resolution: &resolution,
    };

    let diagnostics: Vec<Diagnostic> = RULES
        .iter()
        .filter(|rule| !disabled.iter().any(|code| code.eq_ignore_ascii_case(rule.finding.code)))
        .flat_map(|rule| {
            rule.check(&cx).into_iter().map(|(description, range)| Diagnostic {
                severity: rule.severity,
                finding: rule.finding,
                description,
                range: Some(range),
            })
        })
        .collect();

    log::debug!(diagnostics = diagnostics.len(); "linted program");
    diagnostics
}
