// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Formatter properties over generated programs

use anyhow::{Context, Result};
use kcl_engine::{format, parse, Engine};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const BINARY_OPS: &[&str] = &["+", "-", "*", "/", "^", "<", ">=", "==", "!=", "&&", "||"];
const NUMBERS: &[&str] = &["0", "1", "2.5", "10mm", "3in", "90deg", ".5", "1e3"];
const FUNCTIONS: &[&str] = &["min", "max", "sqrt", "abs"];

/// Random but syntactically valid source with messy spacing
struct ProgramGenerator {
    rng: StdRng,
    names: Vec<String>,
}

impl ProgramGenerator {
    fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            names: Vec::new(),
        }
    }

    fn space(&mut self) -> &'static str {
        ["", " ", "  "][self.rng.gen_range(0..3)]
    }

    fn atom(&mut self) -> String {
        match self.rng.gen_range(0..4) {
            0 if !self.names.is_empty() => {
                let index = self.rng.gen_range(0..self.names.len());
                self.names[index].clone()
            }
            1 => "'text'".to_string(),
            2 => ["true", "false"][self.rng.gen_range(0..2)].to_string(),
            _ => NUMBERS[self.rng.gen_range(0..NUMBERS.len())].to_string(),
        }
    }

    fn expr(&mut self, depth: u32) -> String {
        if depth == 0 {
            return self.atom();
        }
        match self.rng.gen_range(0..7) {
            0 | 1 => {
                let op = BINARY_OPS[self.rng.gen_range(0..BINARY_OPS.len())];
                let (left, right) = (self.expr(depth - 1), self.expr(depth - 1));
                let (a, b) = (self.space(), self.space());
                format!("{}{}{}{}{}", left, a, op, b, right)
            }
            2 => format!("({})", self.expr(depth - 1)),
            3 => format!("-{}", self.atom()),
            4 => {
                let count = self.rng.gen_range(0..4);
                let items: Vec<String> = (0..count).map(|_| self.expr(depth - 1)).collect();
                format!("[{}]", items.join(","))
            }
            5 => {
                let callee = FUNCTIONS[self.rng.gen_range(0..FUNCTIONS.len())];
                let (a, b) = (self.expr(depth - 1), self.expr(depth - 1));
                format!("{}({},{}{})", callee, a, self.space(), b)
            }
            _ => format!("{{a:{},b: {}}}", self.expr(depth - 1), self.atom()),
        }
    }

    fn item(&mut self) -> String {
        match self.rng.gen_range(0..7) {
            0 => "// note".to_string(),
            1 => {
                let name = format!("helper{}", self.names.len());
                let body = self.expr(2);
                self.names.push(name.clone());
                format!("fn {}(p){{\nreturn {}+p\n}}", name, body)
            }
            2 => {
                let name = format!("piped{}", self.names.len());
                let value = self.expr(1);
                format!("{} = {} |> min(%, 1) |> max(2,%)", name, value)
            }
            3 => {
                let operand = self.expr(1);
                format!("({}-{}){}", self.space(), operand, self.space())
            }
            _ => {
                let name = format!("v{}", self.names.len());
                let value = self.expr(3);
                let keyword = ["", "let ", "const "][self.rng.gen_range(0..3)];
                self.names.push(name.clone());
                format!("{}{}{}={}{}", keyword, name, self.space(), self.space(), value)
            }
        }
    }

    fn program(&mut self) -> String {
        let count = self.rng.gen_range(1..8);
        let mut source = String::new();
        for _ in 0..count {
            source.push_str(&self.item());
            source.push_str(["\n", "\n\n", "\n\n\n"][self.rng.gen_range(0..3)]);
        }
        source
    }
}

#[test]
fn test_format_is_idempotent_on_generated_programs() -> Result<()> {
    for seed in 0..200 {
        let source = ProgramGenerator::new(seed).program();
        let once = format(&source).with_context(|| format!("seed {}: {}", seed, source))?;
        parse(&once).with_context(|| format!("seed {}: output does not parse:\n{}", seed, once))?;
        let twice = format(&once)?;
        assert_eq!(once, twice, "seed {}: not idempotent for\n{}", seed, source);
        assert!(once.ends_with('\n') && !once.ends_with("\n\n"), "seed {}", seed);
    }
    Ok(())
}

#[test]
fn test_format_keeps_comments_and_blank_lines() -> Result<()> {
    let source = "// header\n\n\n\nwidth=10 // mm\nfn area(w){return w*w}\n\n\nresult = area(width)\n";
    let formatted = format(source)?;
    assert_eq!(
        formatted,
        "// header\n\nwidth = 10 // mm\nfn area(w) {\n  return w * w\n}\n\nresult = area(width)\n"
    );
    Ok(())
}

#[test]
fn test_negated_expression_statement_stays_separate() -> Result<()> {
    let source = "a = 1\nb = a\n(-1)\n";
    let once = format(source)?;
    assert_eq!(once, "a = 1\nb = a\n(-1)\n");
    assert_eq!(format(&once)?, once);
    assert_eq!(parse(&once)?.body.items.len(), 3);

    // nothing precedes the first statement, so it needs no parentheses
    assert_eq!(format("(-1)\nx = 2")?, "-1\nx = 2\n");

    let nested = "fn f() {\n  x = 1\n  (-x) * 2\n}\n";
    let formatted = format(nested)?;
    assert_eq!(formatted, "fn f() {\n  x = 1\n  (-x * 2)\n}\n");
    assert_eq!(format(&formatted)?, formatted);
    Ok(())
}

#[test]
fn test_formatting_preserves_meaning() -> Result<()> {
    let source = "a=1-(2-3)\nb=(1-2)-3\nc=2^(3^2)\nd=(2^3)^2\ne=-(1+2)*3\nf=-2^2\ng=[1,2,3]|>len(%)";
    let formatted = format(source)?;
    let engine = Engine::default();
    assert_eq!(engine.run(source)?.memory, engine.run(&formatted)?.memory);
    Ok(())
}
