// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! End-to-end pipeline tests

use anyhow::Result;
use approx::assert_relative_eq;
use kcl_engine::{
    execute, execute_and_snapshot, parse, tokenize, Engine, EvalError, ImageFormat, KclError, ProgramCache,
    RenderError, TokenKind, UnitLength,
};
use rayon::prelude::*;
use std::sync::Arc;

const BRACKET: &str = "\
// L-shaped bracket with a mounting hole
thickness = 4
width = 30

fn lProfile(w, t) {
  return startSketchOn('XZ')
    |> startProfileAt([0, 0], %)
    |> xLine(w, %)
    |> yLine(t, %)
    |> xLine(t - w, %)
    |> yLine(w - t, %)
    |> xLine(-t, %)
    |> close(%)
}

bracket = lProfile(width, thickness)
  |> extrude(20, %)
";

#[test]
fn test_execute_bracket() -> Result<()> {
    execute(BRACKET, UnitLength::Mm)?;
    let outcome = Engine::default().run(BRACKET)?;
    assert_eq!(outcome.scene.roots().count(), 1);
    assert_eq!(outcome.memory.get("width").and_then(|m| m.as_number()), Some(30.0));
    Ok(())
}

#[test]
fn test_snapshot_decodes_as_requested_format() -> Result<()> {
    let png = execute_and_snapshot("cube(10)", UnitLength::Mm, ImageFormat::Png)?;
    let image = image::load_from_memory_with_format(&png, image::ImageFormat::Png)?;
    assert_eq!((image.width(), image.height()), (1024, 768));

    let jpeg = execute_and_snapshot(BRACKET, UnitLength::Mm, ImageFormat::Jpeg)?;
    assert_eq!(image::guess_format(&jpeg)?, image::ImageFormat::Jpeg);
    Ok(())
}

#[test]
fn test_empty_program_has_nothing_to_render() {
    let result = execute_and_snapshot("x = 1\n", UnitLength::Mm, ImageFormat::Png);
    assert!(matches!(result, Err(KclError::Render(RenderError::EmptyScene))));
}

#[test]
fn test_syntax_errors_point_into_source() {
    for source in ["x = (1 + ", "fn f( {", "y = [1, 2,, 3]", "z = 'unterminated"] {
        match execute(source, UnitLength::Mm) {
            Err(KclError::Parse(err)) => {
                assert!(err.range.start <= err.range.end, "{}", source);
                assert!(err.range.end <= source.len(), "{}", source);
            }
            other => panic!("expected a parse error for {:?}, got {:?}", source, other),
        }
    }
}

#[test]
fn test_evaluation_errors_carry_ranges() {
    let source = "a = 1\nb = missing + a\n";
    let err = execute(source, UnitLength::Mm).unwrap_err();
    assert_eq!(err.stage(), "evaluation");
    let KclError::Eval(EvalError::UnresolvedBinding { name, range }) = err else {
        panic!("expected an unresolved binding");
    };
    assert_eq!(name, "missing");
    assert_eq!(&source[range.start..range.end], "missing");
}

#[test]
fn test_units_scale_lengths() -> Result<()> {
    let inches = Engine::with_units(UnitLength::In).run("cube(1)")?;
    let size = inches.scene.bounding_box().size();
    assert_relative_eq!(size.x, 1.0, epsilon = 1e-9);

    let mm = Engine::default().run("cube(1in)")?;
    let size = mm.scene.bounding_box().size();
    assert_relative_eq!(size.z, 25.4, epsilon = 1e-9);
    assert_eq!(mm.scene.unit(), UnitLength::Mm);
    Ok(())
}

#[test]
fn test_evaluation_is_deterministic() -> Result<()> {
    let engine = Engine::with_units(UnitLength::Cm);
    let first = serde_json::to_string(&engine.run(BRACKET)?.scene)?;
    let second = serde_json::to_string(&engine.run(BRACKET)?.scene)?;
    assert_eq!(first, second);
    Ok(())
}

#[test]
fn test_concurrent_runs_share_a_cache() -> Result<()> {
    let cache = Arc::new(ProgramCache::new());
    let engine = Engine::default().with_cache(Arc::clone(&cache));
    let sources: Vec<String> = (0..32).map(|i| format!("cube({})", i % 4 + 1)).collect();

    let volumes: Vec<f64> = sources
        .par_iter()
        .map(|source| -> Result<f64> {
            let outcome = engine.run(source)?;
            let root = outcome.scene.roots().next().map(|node| node.body.mesh.signed_volume());
            Ok(root.unwrap_or_default())
        })
        .collect::<Result<_>>()?;

    for (i, volume) in volumes.iter().enumerate() {
        let side = (i % 4 + 1) as f64;
        assert_relative_eq!(*volume, side * side * side, epsilon = 1e-9);
    }
    assert_eq!(cache.len(), 4);
    let stats = cache.stats();
    assert_eq!(stats.hits + stats.misses, 32);
    Ok(())
}

#[test]
fn test_tokenize_and_parse() -> Result<()> {
    let tokens = tokenize("x = 10mm // ten\n")?;
    let kinds: Vec<TokenKind> = tokens.iter().map(|t| t.kind).collect();
    assert_eq!(
        kinds,
        vec![
            TokenKind::Word,
            TokenKind::Whitespace,
            TokenKind::Operator,
            TokenKind::Whitespace,
            TokenKind::Number,
            TokenKind::Whitespace,
            TokenKind::LineComment,
            TokenKind::Whitespace,
        ]
    );

    let program = parse(BRACKET)?;
    let json = serde_json::to_value(&program)?;
    assert!(json.get("body").is_some());
    Ok(())
}

#[test]
fn test_deep_recursion_is_safe_on_small_thread_stacks() -> Result<()> {
    let mut settings = kcl_engine::EngineSettings::default();
    settings.evaluation.max_call_depth = kcl_engine::settings::MAX_CALL_DEPTH_LIMIT;
    let engine = Engine::new(settings);
    let program = |n: usize| {
        format!(
            "fn f(n) {{\n  return if n <= 0 {{ 0 }} else {{ 1 + f(n - 1) }}\n}}\nx = f({})\n",
            n
        )
    };

    let worker = std::thread::Builder::new()
        .stack_size(2 * 1024 * 1024)
        .spawn(move || {
            let deepest = engine.run(&program(255)).map(|outcome| outcome.memory.get("x").cloned());
            let too_deep = engine.run(&program(400)).map(|_| ());
            (deepest, too_deep)
        })?;
    let (deepest, too_deep) = worker.join().map_err(|_| anyhow::anyhow!("evaluation thread panicked"))?;

    assert!(matches!(
        deepest?,
        Some(kcl_engine::ast::MemoryItem::Number { value, .. }) if value == 255.0
    ));
    assert!(matches!(
        too_deep,
        Err(KclError::Eval(EvalError::RecursionLimit { limit: 256, .. }))
    ));
    Ok(())
}
