// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Linter behaviour through the public API

use anyhow::Result;
use kcl_engine::lint::RULES;
use kcl_engine::{lint, Engine, EngineSettings, Severity};

const CLEAN: &str = "\
plateWidth = 40
holeRadius = 3

fn plate(w, r) {
  outline = startSketchOn('XY')
    |> startProfileAt([0, 0], %)
    |> xLine(w, %)
    |> yLine(w, %)
    |> xLine(-w, %)
    |> close(%)
  inner = startSketchOn('XY')
    |> circle([w / 2, w / 2], r, %)
  return hole(inner, outline)
    |> extrude(5, %)
}

part = plate(plateWidth, holeRadius)
";

#[test]
fn test_clean_file_has_no_diagnostics() -> Result<()> {
    assert!(lint(CLEAN).is_empty(), "{:?}", lint(CLEAN));
    // and it still runs
    Engine::default().execute(CLEAN)?;
    Ok(())
}

#[test]
fn test_known_violations() {
    let source = "\
const Plate_width = 40
fn helper(unused) {
  return 1
  extra = 2
}
angle = 10mm - 45deg
";
    let codes: Vec<&str> = lint(source).iter().map(|d| d.finding.code).collect();
    assert_eq!(
        codes,
        vec!["Z0001", "Z0002", "Z0002", "Z0002", "Z0003", "Z0004", "Z0005"]
    );

    let errors: Vec<&str> = lint(source)
        .iter()
        .filter(|d| d.severity == Severity::Error)
        .map(|d| d.finding.code)
        .collect();
    assert_eq!(errors, vec!["Z0004"]);
}

#[test]
fn test_diagnostics_point_at_source() {
    let source = "x = 1\nbad_name = 2\n";
    let diagnostics = lint(source);
    assert_eq!(diagnostics.len(), 1);
    let range = diagnostics[0].range.expect("range");
    assert_eq!(&source[range.start..range.end], "bad_name");
    assert!(diagnostics[0].to_string().starts_with("warning Z0001:"));
}

#[test]
fn test_unparsable_source_yields_e0001() {
    let diagnostics = lint("fn (");
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].finding.code, "E0001");
    assert_eq!(diagnostics[0].severity, Severity::Error);
}

#[test]
fn test_settings_disable_rules() -> Result<()> {
    let settings = EngineSettings::from_toml_str("[lint]\ndisabled = [\"Z0001\", \"Z0005\"]\n")?;
    assert!(Engine::new(settings).lint("let Bad_name = 1\n").is_empty());
    Ok(())
}

#[test]
fn test_findings_are_documented() {
    for rule in RULES {
        assert!(!rule.finding.title.is_empty());
        assert!(!rule.finding.description.is_empty());
    }
    let json = serde_json::to_value(lint("let x = 1\n")).unwrap_or_default();
    assert_eq!(json[0]["severity"], "warning");
    assert_eq!(json[0]["finding"]["code"], "Z0005");
}
