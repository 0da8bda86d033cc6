//! End-to-end tests: surface text through parse, compile and run.
#![cfg(feature = "syntax")]
#![expect(clippy::unwrap_used)] // test code OK

use smallvec::smallvec;
use tacit::ast::{Block, Expr, Stmt};
use tacit::value::val;
use tacit::vm::{Machine, RunConfig};
use tacit::{Array, ErrorKind, Primitives, Value, compile, evaluate, run, syntax};

/// Expected outcome of one program
#[derive(Debug)]
enum TestResult {
    EvalResult(Value),        // evaluation succeeds with this value
    SpecificError(ErrorKind), // evaluation fails with this kind
}
use TestResult::*;

fn success<T: Into<Value>>(value: T) -> TestResult {
    EvalResult(val(value))
}

fn grid(rows: usize, cols: usize, data: Vec<i32>) -> Value {
    let data = data.into_iter().map(Value::from).collect();
    Value::Array(Array::new(smallvec![rows, cols], data).unwrap())
}

fn run_cases(cases: Vec<(&str, TestResult)>) {
    for (i, (source, expected)) in cases.into_iter().enumerate() {
        let test_id = format!("case #{} {source:?}", i + 1);
        match (evaluate(source), expected) {
            (Ok(actual), EvalResult(expected)) => {
                assert_eq!(actual, expected, "{test_id}");
            }
            (Err(e), SpecificError(kind)) => {
                assert_eq!(e.kind, kind, "{test_id}: {e}");
            }
            (Ok(actual), SpecificError(kind)) => {
                panic!("{test_id}: expected {kind} error, got {actual}");
            }
            (Err(e), EvalResult(expected)) => {
                panic!("{test_id}: expected {expected}, got error: {}", e.render(source));
            }
        }
    }
}

#[test]
fn test_arithmetic_and_broadcasting() {
    run_cases(vec![
        ("1 + 2", success(3)),
        ("2 × 3 + 4", success(14)),
        ("10 - 4", success(6)),
        ("- 5", success(-5)),
        ("⟨1, 2, 3⟩ + 10", success(vec![11, 12, 13])),
        ("1‿2‿3 × 2‿2‿2", success(vec![2, 4, 6])),
        // a shape-3 list repeats across both rows of a 2×3 array
        (
            "(2‿3 ⥊ ↕6) + 10‿20‿30",
            EvalResult(grid(2, 3, vec![10, 21, 32, 13, 24, 35])),
        ),
        ("1‿2 + 1‿2‿3", SpecificError(ErrorKind::Shape)),
        ("'a' + 2", success('c')),
        ("'d' - 'a'", success(3)),
        ("1 + 'a' + 'b'", SpecificError(ErrorKind::Domain)),
        ("√ 16", success(4)),
        ("3 = 3‿4", success(vec![1, 0])),
        ("⌊ 2.5‿¯2.5", success(vec![2, -3])),
    ]);
}

#[test]
fn test_structure() {
    run_cases(vec![
        ("≢ 2‿3 ⥊ 0", success(vec![2, 3])),
        ("⊑ 4‿5‿6", success(4)),
        ("1 ⊑ 4‿5‿6", success(5)),
        ("¯1 ⊑ 4‿5‿6", success(6)),
        ("5 ⊑ 4‿5‿6", SpecificError(ErrorKind::Index)),
        ("⌽ ↕4", success(vec![3, 2, 1, 0])),
        ("2 ↑ 7‿8‿9", success(vec![7, 8])),
        ("1 ↓ 7‿8‿9", success(vec![8, 9])),
        ("1‿2 ∾ 3", success(vec![1, 2, 3])),
        ("≠ \"hello\"", success(5)),
        ("0 ⥊ 1", SpecificError(ErrorKind::Shape)),
        ("2.5 ⥊ 1", SpecificError(ErrorKind::Shape)),
        ("4294967296‿4294967296 ⥊ 1", SpecificError(ErrorKind::Shape)),
        ("1e18 ↑ ⟨1, 2⟩", SpecificError(ErrorKind::Length)),
        ("≠ ↕ 1e18", SpecificError(ErrorKind::Length)),
        ("⥊ 2‿2 ⥊ ↕4", success(vec![0, 1, 2, 3])),
        ("1‿0‿2 / \"abc\"", EvalResult(Value::string("acc"))),
    ]);
}

#[test]
fn test_combinators() {
    run_cases(vec![
        ("+´ 1‿2‿3‿4", success(10)),
        ("(+´ ÷ ≠) 2‿4‿9", success(5)),
        ("+` 1‿2‿3", success(vec![1, 3, 6])),
        ("-¨ 1‿2", success(vec![-1, -2])),
        ("1‿2 ×⌜ 1‿2‿3", EvalResult(grid(2, 3, vec![1, 2, 3, 2, 4, 6]))),
        ("2 -˜ 10", success(8)),
        ("5˙ 1", success(5)),
        ("-∘⌽ 1‿2", success(vec![-2, -1])),
        ("1 +○≠ \"ab\"", success(3)),
        ("√⁼ 3", success(9)),
        ("+´˘ 2‿2 ⥊ ↕4", success(vec![1, 5])),
        ("1 ⊸ + 5", success(6)),
        ("(2 ⊸ ×) 5", success(10)),
        ("(× ⟜ 3) 5", success(15)),
        ("(+´⎉1) 2‿3 ⥊ ↕6", success(vec![3, 12])),
        // under with a declared inverse: reverse, negate, reverse back
        ("-⌾⌽ 1‿2‿3", success(vec![-1, -2, -3])),
        // no inverse for ⊣: rejected as soon as the combinator is built
        ("F ← -⌾⊣ ⋄ 0", SpecificError(ErrorKind::UndoUnavailable)),
        ("+´ ⟨⟩", SpecificError(ErrorKind::Domain)),
    ]);
}

#[test]
fn test_blocks_scopes_and_guards() {
    run_cases(vec![
        ("{𝕩 + 1} 2", success(3)),
        ("3 {𝕨 × 𝕩} 4", success(12)),
        ("a ← 5 ⋄ {a ← 1 ⋄ a} 0", success(1)),
        ("a ← 5 ⋄ {a ← 1 ⋄ a} 0 ⋄ a", success(5)),
        ("a ← 5 ⋄ {a + 𝕩} 1", success(6)),
        // fallback when the test is zero, otherwise continue
        ("{𝕩 ? \"fallback\" ⋄ \"main\"} 0", EvalResult(Value::string("fallback"))),
        ("{𝕩 ? \"fallback\" ⋄ \"main\"} 1", EvalResult(Value::string("main"))),
        ("{\"x\" ? 1 ⋄ 2} 0", SpecificError(ErrorKind::Domain)),
        ("{𝕩 ? 1} 0", SpecificError(ErrorKind::Compile)),
        ("Fact ← {𝕩 ≠ 0 ? 1 ⋄ 𝕩 × 𝕊 𝕩 - 1} ⋄ Fact 5", success(120)),
        ("Fib ← {𝕩 ≥ 2 ? 𝕩 ⋄ (𝕊 𝕩 - 1) + 𝕊 𝕩 - 2} ⋄ Fib 10", success(55)),
        ("Mk ← {n ← 𝕩 ⋄ {n + 𝕩}} ⋄ Add ← Mk 10 ⋄ Add 5", success(15)),
        ("n ← 0 ⋄ Inc ← {n ↩ n + 𝕩} ⋄ Inc 2 ⋄ Inc 3 ⋄ n", success(5)),
        ("n ← 10 ⋄ n -↩ 3 ⋄ n", success(7)),
        ("n ← 4 ⋄ n -↩ ⋄ n", success(-4)),
        ("a‿b ← 1‿2 ⋄ b - a", success(1)),
        ("⟨a, b⟩ ← 1‿2‿3", SpecificError(ErrorKind::Length)),
        ("missing + 1", SpecificError(ErrorKind::UndefinedName)),
        ("{undefined} 1", SpecificError(ErrorKind::UndefinedName)),
        // unbounded recursion stops at the default call depth
        ("{𝕊 𝕩} 0", SpecificError(ErrorKind::Runtime)),
        ("Sum ← {𝕩 ≠ 0 ? 0 ⋄ 𝕩 + 𝕊 𝕩 - 1} ⋄ Sum 1000", SpecificError(ErrorKind::Runtime)),
        ("a ← 1 ⋄ a ← 2", SpecificError(ErrorKind::Compile)),
        ("b ↩ 1", SpecificError(ErrorKind::UndefinedName)),
        ("", EvalResult(Value::nil())),
    ]);
}

#[test]
fn test_assertions_and_parse_errors() {
    run_cases(vec![
        ("! 1 = 1", success(1)),
        ("! 1 = 2", SpecificError(ErrorKind::Assertion)),
        ("1 +", SpecificError(ErrorKind::Parse)),
        ("(1 + 2", SpecificError(ErrorKind::Parse)),
    ]);
    let err = evaluate("\"sizes differ\" ! 0").unwrap_err();
    assert_eq!(err.message, "sizes differ");
}

#[test]
fn test_reshape_picks_cyclically() {
    let parent = Array::list((1..=6).map(Value::from).collect());
    let view = Array::reshape(smallvec![2, 3], &parent).unwrap();
    assert_eq!(view.pick(4).unwrap(), val(5));
    let longer = Array::reshape(smallvec![4, 2], &Array::list(vec![val(1), val(2), val(3)])).unwrap();
    assert_eq!(longer.pick(7).unwrap(), val(2));
}

#[test]
fn test_error_spans_point_at_statement() {
    let source = "a ← 1\nb ← a - 'x'\nb";
    let err = evaluate(source).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Domain);
    let span = err.span.unwrap();
    assert_eq!(span.line_col(source), (2, 1));
    assert!(err.render(source).contains("b ← a - 'x'"));
}

#[test]
fn test_recursion_compiles_each_block_once() {
    let block = syntax::parse_program("Sum ← {𝕩 ≠ 0 ? 0 ⋄ 𝕩 + 𝕊 𝕩 - 1} ⋄ Sum 50").unwrap();
    let program = compile(&block, &Primitives::standard(), &[]).unwrap();
    let machine = Machine::new(&program, RunConfig::default()).unwrap();
    assert_eq!(machine.compiled_blocks(), program.blocks.len());
    assert_eq!(machine.run(Vec::new()).unwrap().0, val(1275));
    assert_eq!(machine.compiled_blocks(), program.blocks.len());
}

#[test]
fn test_host_primitives_and_globals() {
    let mut primitives = Primitives::standard();
    let double = tacit::Function::new("double", |y: Value, _: Option<Value>| {
        Ok(Value::Number(y.as_number()? * 2.0))
    });
    primitives.register("double", double);
    primitives.register("answer", 42);

    let block = syntax::parse_program("•Double base + •answer").unwrap();
    let program = compile(&block, &primitives, &["base"]).unwrap();
    let (value, _) = run(&program, vec![val(8)]).unwrap();
    assert_eq!(value, val(100));

    // carrying top-level bindings into the next program, as the REPL does
    let first = compile(&syntax::parse_program("x ← 3 ⋄ y ← x × 2").unwrap(), &primitives, &[]).unwrap();
    let (_, frame) = run(&first, Vec::new()).unwrap();
    let names: Vec<&str> = first.globals().iter().map(|(name, _)| name.as_str()).collect();
    let values: Vec<Value> = first
        .globals()
        .iter()
        .map(|(_, slot)| frame.get(*slot).unwrap())
        .collect();
    assert_eq!(names, vec!["x", "y"]);
    let second = compile(&syntax::parse_program("x + y").unwrap(), &primitives, &names).unwrap();
    assert_eq!(run(&second, values).unwrap().0, val(9));
}

#[test]
fn test_ast_built_by_hand() {
    // a front end other than the surface syntax
    let block = Block::new(vec![
        Stmt::define("v", Expr::list(vec![Expr::num(3.0), Expr::num(1.0), Expr::num(2.0)])),
        Stmt::expr(Expr::call1(
            Expr::mod1('´', Expr::prim("⌈")),
            Expr::name("v"),
        )),
    ]);
    let program = compile(&block, &Primitives::standard(), &[]).unwrap();
    assert!(program.to_string().contains("MD1C"));
    assert_eq!(run(&program, Vec::new()).unwrap().0, val(3));
}
