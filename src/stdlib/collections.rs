// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Array builtins and assertions

use super::{Args, Builtin};
use crate::ast::{Evaluator, Number, Value};
use crate::errors::EvalError;

pub(super) fn call<'a>(
    ev: &mut Evaluator<'a>,
    builtin: Builtin,
    args: Args<'a>,
) -> Result<Value<'a>, EvalError> {
    match builtin {
        Builtin::Len => {
            args.expect(1)?;
            let len = match args.get(0)? {
                Value::Array(items) => items.len(),
                Value::Object(map) => map.len(),
                Value::String(s) => s.chars().count(),
                other => {
                    return Err(args.semantic(format!("cannot take the length of a {}", other.type_name())))
                }
            };
            Ok(Value::Number(Number::unitless(len as f64)))
        }
        Builtin::Map => {
            args.expect(2)?;
            let function = args.function(1)?;
            let items = args.array(0)?.to_vec();
            let mut mapped = Vec::with_capacity(items.len());
            for item in items {
                mapped.push(ev.call_value(&function, vec![item], args.range)?);
            }
            Ok(Value::Array(mapped))
        }
        Builtin::Reduce => {
            args.expect(3)?;
            let function = args.function(2)?;
            let items = args.array(0)?.to_vec();
            let mut acc = args.get(1)?.clone();
            for item in items {
                acc = ev.call_value(&function, vec![item, acc], args.range)?;
            }
            Ok(acc)
        }
        Builtin::Push => {
            args.expect(2)?;
            let mut items = args.array(0)?.to_vec();
            items.push(args.get(1)?.clone());
            Ok(Value::Array(items))
        }
        Builtin::Assert => {
            args.expect_between(1, 2)?;
            if args.bool(0)? {
                return Ok(Value::None);
            }
            let message = match args.values().get(1) {
                Some(_) => args.string(1)?.to_string(),
                None => "condition was false".to_string(),
            };
            Err(EvalError::AssertionFailed {
                message,
                range: args.range,
            })
        }
        other => Err(args.semantic(format!("'{}' is not a collection function", other.name()))),
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::{evaluate, EvalOptions, MemoryItem};
    use crate::errors::EvalError;
    use crate::io::parse;

    fn run(source: &str) -> Result<crate::ast::ExecutionOutcome, EvalError> {
        evaluate(&parse(source).unwrap(), &EvalOptions::default())
    }

    #[test]
    fn test_map_reduce_push_len() {
        let source = "\
doubled = map([1..3], fn(x) { return x * 2 })
total = reduce(doubled, 0, fn(item, acc) { return acc + item })
longer = push(doubled, 8)
n = len(longer)";
        let outcome = run(source).unwrap();
        assert_eq!(outcome.memory.get("total").and_then(MemoryItem::as_number), Some(12.0));
        assert_eq!(outcome.memory.get("n").and_then(MemoryItem::as_number), Some(4.0));
    }

    #[test]
    fn test_builtins_are_first_class() {
        let outcome = run("r = map([4, 9], sqrt)").unwrap();
        let Some(MemoryItem::Array { value }) = outcome.memory.get("r") else {
            panic!("expected an array");
        };
        assert_eq!(value[1].as_number(), Some(3.0));
    }

    #[test]
    fn test_assert() {
        assert!(run("assert(1 < 2, 'fine')").is_ok());
        let err = run("assert(len([1]) == 2, 'expected two')").unwrap_err();
        assert_eq!(
            err,
            EvalError::AssertionFailed {
                message: "expected two".into(),
                range: crate::ast::SourceRange::new(0, 37),
            }
        );
    }
}
