use indexmap::IndexMap;
use indoc::indoc;
use sprig_core::{Type, TypeScheme};

use super::{Analysis, PackageTypes, analyze};
use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::macros::MacroTable;
use crate::source_map::SourceMap;
use crate::test_utils::{SNIPPET, analyze_err, analyze_ok, parse_ok};

/// Top-level bindings as `name: type` lines.
fn bindings(source: &str) -> String {
    let (_, analysis) = analyze_ok(source);
    analysis
        .bindings()
        .iter()
        .map(|(name, ty)| format!("{name}: {ty}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn message(source: &str) -> String {
    analyze_err(source).message()
}

fn lib_packages() -> PackageTypes {
    let add = Type::function(vec![Type::int(), Type::int()], Type::int());
    let id = Type::function(vec![Type::generic("T")], Type::generic("T"));

    let mut packages = PackageTypes::default();
    packages
        .paths
        .insert("example.com/app/lib".to_string(), "lib".to_string());
    packages.schemes.insert(
        "lib".to_string(),
        IndexMap::from([
            ("add".to_string(), TypeScheme::generalize(&add)),
            ("id".to_string(), TypeScheme::generalize(&id)),
        ]),
    );
    packages
}

fn analyze_with(source: &str, packages: &PackageTypes) -> Result<Analysis, Diagnostic> {
    let program = parse_ok(source);
    analyze(&program, packages, &mut MacroTable::new())
        .map_err(|e| e.locate(&SourceMap::single(SNIPPET, source)))
}

#[test]
fn literal_types() {
    let input = indoc! {r#"
    (def i 1)
    (def f 2.5)
    (def s "x")
    (def b true)
    (def k :key)
    (def v nil)
    (def xs [1 2])
    (def m (map ["a" 1.5 "b" 2.0]))
    "#};

    insta::assert_snapshot!(bindings(input), @r"
    i: int
    f: float
    s: string
    b: bool
    k: symbol
    v: void
    xs: [int]
    m: (map string float)
    ");
}

#[test]
fn function_types() {
    let input = indoc! {r#"
    (def add (fn [a: int b: int] -> int (+ a b)))
    (def three (add 1 2))
    (def twice (fn [f: (fn [int] int) x: int] -> int (f (f x))))
    (def fact (fn [n: int] -> int (if (< n 2) 1 (* n (fact (- n 1))))))
    (def r ((fn [a: int] -> int a) 1))
    (def g (fn [] -> void 1))
    "#};

    insta::assert_snapshot!(bindings(input), @r"
    add: (fn [int int] int)
    three: int
    twice: (fn [(fn [int] int) int] int)
    fact: (fn [int] int)
    r: int
    g: (fn [] void)
    ");
}

#[test]
fn generic_calls_substitute_result() {
    let input = indoc! {r#"
    (def id (fn [x: 'T] -> 'T x))
    (def n (id 1))
    (def s (id "a"))
    (def first (fn [xs: ['T]] -> 'T (get xs 0)))
    (def f (first [1.5]))
    "#};

    insta::assert_snapshot!(bindings(input), @r"
    id: (fn ['T] 'T)
    n: int
    s: string
    first: (fn [['T]] 'T)
    f: float
    ");
}

#[test]
fn schemes_quantify_generics() {
    let (_, analysis) = analyze_ok(indoc! {r#"
    (def id (fn [x: 'T] -> 'T x))
    (def n 1)
    (record Point [x: int y: int])
    "#});

    insta::assert_snapshot!(analysis.scheme("id").unwrap(), @"(forall ['T] (fn ['T] 'T))");
    insta::assert_snapshot!(analysis.scheme("n").unwrap(), @"int");
    insta::assert_snapshot!(analysis.scheme("Point").unwrap(), @"Point");
    assert!(analysis.scheme("missing").is_none());
}

#[test]
fn if_types() {
    insta::assert_snapshot!(bindings("(def a (if true 1 2))\n(def b (if false 1))"), @r"
    a: int
    b: void
    ");
}

#[test]
fn non_boolean_condition() {
    insta::assert_snapshot!(analyze_err("(def x (if 1 2 3))").render_text(), @r"
    test.sprig:1:12: error: [T002]: `if` condition must be `bool`
      Expected: bool
      Got: int
      Offender: 1
    ");
}

#[test]
fn branch_types_must_agree() {
    let err = analyze_err(r#"(if true 1 "a")"#);
    assert_eq!(err.kind(), DiagnosticKind::BranchTypeMismatch);
    assert_eq!(err.message(), "`if` branches have incompatible types");

    assert_eq!(
        message("(if true)"),
        "malformed `if`: expected `(if cond then else?)`"
    );
}

#[test]
fn undefined_symbol() {
    insta::assert_snapshot!(analyze_err("(def y (+ x 1))").render_text(), @"test.sprig:1:11: error: [T001]: `x` is not defined");
}

#[test]
fn arrays_are_homogeneous() {
    let err = analyze_err(r#"(def xs [1 "a"])"#);
    assert_eq!(err.kind(), DiagnosticKind::HeterogeneousArray);
    assert_eq!(err.message(), "array elements must all have the same type");
    assert_eq!(err.location().unwrap().to_string(), "test.sprig:1:12");
}

#[test]
fn maps() {
    insta::assert_snapshot!(bindings(indoc! {r#"
    (def m (map ["a" 1]))
    (def v (get m "a"))
    (def e: (map string int) (map []))
    "#}), @r"
    m: (map string int)
    v: int
    e: (map string int)
    ");

    let err = analyze_err("(map [1])");
    assert_eq!(err.kind(), DiagnosticKind::MalformedMap);
    insta::assert_snapshot!(err.render_text(), @r"
    test.sprig:1:1: error: [C001]: malformed map literal: every key needs a value
      Suggestion: write map literals as `(map [key value ...])`
    ");

    assert_eq!(
        message(r#"(map ["a" 1 "b" "c"])"#),
        "map values must all have the same type"
    );
    let err = analyze_err(r#"(get (map ["a" 1]) 2)"#);
    assert_eq!(err.kind(), DiagnosticKind::TypeMismatch);
}

#[test]
fn missing_annotations() {
    let err = analyze_err("(def f (fn [x: int] x))");
    assert_eq!(err.kind(), DiagnosticKind::MissingTypeAnnotation);
    assert_eq!(err.message(), "missing type annotation for the return type");

    insta::assert_snapshot!(analyze_err("(def f (fn [x] -> int 1))").render_text(), @r"
    test.sprig:1:13: error: [F005]: missing type annotation for parameter `x`
      Offender: x
      Suggestion: annotate parameters as `name: Type` and add `-> Type` before the body
    ");
}

#[test]
fn unknown_type_annotation() {
    assert_eq!(
        message("(def f (fn [x: Nope] -> int 1))"),
        "unknown type `Nope`"
    );
}

#[test]
fn argument_types() {
    let input = indoc! {r#"
    (def pick (fn [a: 'T b: 'T] -> 'T a))
    (pick 1 "a")
    "#};
    let err = analyze_err(input);
    assert_eq!(err.kind(), DiagnosticKind::ArgumentTypeMismatch);
    assert_eq!(err.message(), "argument 2 of `pick` has the wrong type");

    let input = indoc! {r#"
    (def f (fn [a: int] -> int a))
    (f "s")
    "#};
    insta::assert_snapshot!(analyze_err(input).render_text(), @r#"
    test.sprig:2:4: error: [T012]: argument 1 of `f` has the wrong type
      Expected: int
      Got: string
      Offender: "s"
    "#);
}

#[test]
fn calls_check_callee_and_count() {
    let err = analyze_err("(def x 1)\n(x 2)");
    assert_eq!(err.kind(), DiagnosticKind::NotCallable);
    assert_eq!(err.message(), "`x` is not a function");

    assert_eq!(
        message("(def f (fn [a: int] -> int a))\n(f 1 2)"),
        "`f` expects 1 argument(s), found 2"
    );
}

#[test]
fn return_type_is_checked() {
    let err = analyze_err(r#"(def f (fn [] -> int "s"))"#);
    assert_eq!(err.kind(), DiagnosticKind::ReturnTypeMismatch);
    assert_eq!(err.message(), "function body does not match its return type");
}

#[test]
fn annotated_defs() {
    insta::assert_snapshot!(bindings("(def xs: [int] [])"), @"xs: [int]");

    insta::assert_snapshot!(analyze_err("(def x: float 1)").render_text(), @r"
    test.sprig:1:15: error: [T014]: type mismatch
      Expected: float
      Got: int
      Offender: 1
    ");
}

#[test]
fn malformed_defs() {
    assert_eq!(
        message("(def x)"),
        "malformed `def`: expected `(def name value)` or `(def name: Type value)`"
    );
    assert_eq!(
        message("(def 1 2)"),
        "malformed `def`: the defined name must be a symbol"
    );
    assert_eq!(message("(def if 1)"), "malformed `def`: the name is reserved");
    assert_eq!(
        message("(def x: 1)"),
        "malformed `def`: `x:` needs both a type and a value"
    );
}

#[test]
fn operators() {
    insta::assert_snapshot!(bindings(indoc! {r#"
    (def a (+ 1 2 3))
    (def b (* 1.5 2.0))
    (def c (< 1 2))
    (def d (and true (not false)))
    (def e (= "a" "b"))
    "#}), @r"
    a: int
    b: float
    c: bool
    d: bool
    e: bool
    ");
}

#[test]
fn operator_errors() {
    insta::assert_snapshot!(analyze_err("(+ 1 2.5)").render_text(), @r"
    test.sprig:1:6: error: [T006]: operands of `+` must be numbers of one type
      Expected: int
      Got: float
      Offender: 2.5
    ");

    let err = analyze_err(r#"(+ "a" 1)"#);
    assert_eq!(err.kind(), DiagnosticKind::NonNumericOperand);
    assert_eq!(err.to_json()["params"]["expected"], "int or float");

    assert_eq!(message("(and true 1)"), "operands of `and` must be `bool`");
    assert_eq!(
        message(r#"(= 1 "a")"#),
        "operands of `=` must be comparable values of one type"
    );
    assert_eq!(message("(not true false)"), "`not` expects 1 operand(s), found 2");
    assert_eq!(message("(+ 1)"), "`+` expects at least 2 operand(s), found 1");
}

#[test]
fn equality_needs_comparable_operands() {
    insta::assert_snapshot!(bindings(indoc! {r#"
    (record Point [x: int y: int])
    (def a (= (Point [1 2]) (Point [1 2])))
    (def b (!= :k :j))
    "#}), @r"
    a: bool
    b: bool
    ");

    insta::assert_snapshot!(analyze_err("(= [1] [1])").render_text(), @r"
    test.sprig:1:4: error: [T008]: operands of `=` must be comparable values of one type
      Expected: a comparable type
      Got: [int]
      Offender: [1]
      Suggestion: compare lists, maps and functions through their elements
    ");

    let err = analyze_err(r#"(!= (map ["a" 1]) (map ["a" 1]))"#);
    assert_eq!(err.kind(), DiagnosticKind::EqualityOperandMismatch);

    let err = analyze_err("(def f (fn [] -> int 1))\n(= f f)");
    assert_eq!(err.kind(), DiagnosticKind::EqualityOperandMismatch);
    assert_eq!(err.location().unwrap().to_string(), "test.sprig:2:4");

    let err = analyze_err("(record Bag [xs: [int]])\n(= (Bag [[1]]) (Bag [[1]]))");
    assert_eq!(err.kind(), DiagnosticKind::EqualityOperandMismatch);
}

#[test]
fn duplicates_and_shadowing() {
    let input = indoc! {r#"
    (def x 1)
    (def f (fn [x: string] -> string x))
    (def y (do (def x true) x))
    "#};
    insta::assert_snapshot!(bindings(input), @r"
    x: int
    f: (fn [string] string)
    y: bool
    ");

    insta::assert_snapshot!(analyze_err("(def x 1)\n(def x 2)").render_text(), @"test.sprig:2:6: error: [D001]: `x` is already defined in this scope");

    let err = analyze_err("(fn [a: int a: int] -> int a)");
    assert_eq!(err.kind(), DiagnosticKind::DuplicateSymbol);
}

#[test]
fn do_scope_ends_with_block() {
    let err = analyze_err("(do (def t 1) t)\n(def u t)");
    assert_eq!(err.kind(), DiagnosticKind::UndefinedSymbol);
    assert_eq!(err.location().unwrap().to_string(), "test.sprig:2:8");
}

#[test]
fn only_global_defs_are_counted() {
    let (_, analysis) = analyze_ok(indoc! {r#"
    (def a 1)
    (do (def b 2) b)
    (def c (fn [] -> int (do (def d 1) d)))
    "#});

    assert_eq!(analysis.top_level_defs(), 2);
    assert_eq!(analysis.bindings().keys().collect::<Vec<_>>(), ["a", "c"]);
}

#[test]
fn if_branches_are_scoped() {
    let (_, analysis) = analyze_ok(indoc! {r#"
    (def a 1)
    (if true (def b 2) (def c 3))
    (if false (do (def d 4) d))
    "#});
    assert_eq!(analysis.top_level_defs(), 1);
    assert_eq!(analysis.bindings().keys().collect::<Vec<_>>(), ["a"]);

    let err = analyze_err("(if true (def x 1))\nx");
    assert_eq!(err.kind(), DiagnosticKind::UndefinedSymbol);
    assert_eq!(err.location().unwrap().to_string(), "test.sprig:2:1");

    let err = analyze_err("(if true (def y 1) (def z y))");
    assert_eq!(err.kind(), DiagnosticKind::UndefinedSymbol);
}

#[test]
fn every_node_is_typed() {
    let (program, analysis) = analyze_ok("(def x (+ 1 2))");

    let def = &program.forms[0];
    let sum = &def.as_list().unwrap()[2];
    assert_eq!(analysis.type_of(def.id), Some(&Type::void()));
    assert_eq!(analysis.type_of(sum.id), Some(&Type::int()));
    assert_eq!(analysis.def_type(def.id), Some(&Type::int()));
    assert_eq!(analysis.next_id(), program.next_id);
}

#[test]
fn collections() {
    insta::assert_snapshot!(bindings(indoc! {r#"
    (def a (len "abc"))
    (def b (empty? []))
    (def c (slice [1 2] 1))
    (def d (append [1] [2]))
    (def e (get [1.5] 0))
    "#}), @r"
    a: int
    b: bool
    c: [int]
    d: [int]
    e: float
    ");
}

#[test]
fn collection_errors() {
    insta::assert_snapshot!(analyze_err(r#"(get [1 2] "a")"#).render_text(), @r#"
    test.sprig:1:12: error: [T009]: `get` index must be `int`
      Expected: int
      Got: string
      Offender: "a"
      Suggestion: indices are `int` values
    "#);

    let err = analyze_err("(len 5)");
    assert_eq!(err.kind(), DiagnosticKind::NotIndexable);
    assert_eq!(err.message(), "`len` cannot be applied to this value");

    let err = analyze_err(r#"(append [1] ["a"])"#);
    assert_eq!(err.kind(), DiagnosticKind::TypeMismatch);

    assert_eq!(message("(get [1])"), "`get` expects 2 operand(s), found 1");
}

#[test]
fn records() {
    let input = indoc! {r#"
    (record Point [x: int y: int])
    (def p (Point [1 2]))
    (def px (. p x))
    (def flip (fn [q: Point] -> Point (Point [(. q y) (. q x)])))
    "#};
    let (_, analysis) = analyze_ok(input);

    insta::assert_snapshot!(bindings(input), @r"
    p: Point
    px: int
    flip: (fn [Point] Point)
    ");
    assert_eq!(analysis.records().keys().collect::<Vec<_>>(), ["Point"]);
    assert_eq!(
        analysis.records()["Point"].field("y"),
        Some(&Type::int())
    );
}

#[test]
fn record_errors() {
    assert_eq!(
        message("(record P [x: int])\n(def p (P [1 2]))"),
        "malformed construction of `P`: expected 1 field value(s), found 2"
    );
    assert_eq!(
        message("(record P [x: int])\n(def p (P [1]))\n(. p z)"),
        "record `P` has no field `z`"
    );
    assert_eq!(
        message("(record P [x: int])\n(def q P)"),
        "malformed construction of `P`: a record name is not a value"
    );
    assert_eq!(
        message("(record P [x: int x: int])"),
        "malformed record declaration: field `x` is declared twice"
    );
    assert_eq!(
        message("(record P [x])"),
        "malformed record declaration: field `x` needs a type: `x: Type`"
    );

    let err = analyze_err("(record P [x: int])\n(P [\"s\"])");
    assert_eq!(err.kind(), DiagnosticKind::TypeMismatch);
    assert_eq!(err.to_json()["params"]["field"], "x");
}

#[test]
fn records_are_nominal() {
    let input = indoc! {r#"
    (record A [x: int])
    (record B [x: int])
    (def f (fn [a: A] -> int (. a x)))
    (f (B [1]))
    "#};

    insta::assert_snapshot!(analyze_err(input).render_text(), @r"
    test.sprig:4:4: error: [R003]: record type mismatch
      Expected: A
      Got: B
      Offender: (B [1])
    ");
}

#[test]
fn macros_expand_in_place() {
    let input = indoc! {r#"
    (macro inc! [x] (+ x 1))
    (macro sum! [& xs] (+ 0 xs))
    (def y (inc! 2))
    (def s (sum! 1 2))
    "#};
    let (program, analysis) = analyze_ok(input);

    insta::assert_snapshot!(bindings(input), @r"
    y: int
    s: int
    ");
    let invocation = &program.forms[2].as_list().unwrap()[2];
    insta::assert_snapshot!(analysis.expansion(invocation.id).unwrap(), @"(+ 2 1)");
    assert!(analysis.next_id() > program.next_id);
}

#[test]
fn macro_errors_point_at_call_site() {
    let input = indoc! {r#"
    (macro bad! [] (+ 1 "a"))
    (def z (bad!))
    "#};

    insta::assert_snapshot!(analyze_err(input).render_text(), @r#"
    test.sprig:2:8: error: [T006]: operands of `+` must be numbers of one type
      Expected: int
      Got: string
      Offender: "a"
    "#);
}

#[test]
fn macro_declaration_errors() {
    insta::assert_snapshot!(analyze_err("(macro if! [] 1)").render_text(), @r"
    test.sprig:1:8: error: [M002]: `if!` is reserved and cannot name a macro
      Suggestion: choose a name that does not shadow a special form
    ");
    assert_eq!(
        message("(macro m! [] 1)\n(macro m! [] 2)"),
        "macro `m!` is already defined"
    );
    assert_eq!(
        message("(macro m [] 1)"),
        "malformed macro definition: macro names must end in `!`"
    );
    assert_eq!(
        message("(macro m! [a a] 1)"),
        "malformed macro definition: parameter names must be distinct"
    );
    assert_eq!(
        message("(macro m! [& xs ys] 1)"),
        "malformed macro definition: the `&` parameter must be last"
    );
}

#[test]
fn macro_invocation_errors() {
    let err = analyze_err("(nope! 1)");
    assert_eq!(err.kind(), DiagnosticKind::UnresolvedMacro);
    assert_eq!(err.message(), "macro `nope!` is not defined");

    let err = analyze_err("(macro two! [a b] a)\n(two! 1)");
    assert_eq!(err.kind(), DiagnosticKind::ArgumentCountMismatch);
    assert_eq!(err.message(), "`two!` expects 2 argument(s), found 1");
}

#[test]
fn recursive_macro_hits_depth_limit() {
    let handle = std::thread::Builder::new()
        .stack_size(64 * 1024 * 1024)
        .spawn(|| analyze_err("(macro again! [x] (again! x))\n(again! 1)"))
        .unwrap();
    let err = handle.join().unwrap();

    assert_eq!(err.kind(), DiagnosticKind::MacroRecursionLimit);
    assert_eq!(
        err.message(),
        "expanding `again!` exceeded the depth limit of 256"
    );
    assert_eq!(err.location().unwrap().to_string(), "test.sprig:2:1");
}

#[test]
fn exports() {
    let (_, analysis) = analyze_ok("(export a b)\n(def a 1)\n(def b 2)");
    assert_eq!(analysis.exports().iter().collect::<Vec<_>>(), ["a", "b"]);

    insta::assert_snapshot!(analyze_err("(export f)").render_text(), @r"
    test.sprig:1:9: error: [T001]: `f` is not defined
      Suggestion: exported names must be defined at the top level
    ");
    assert_eq!(
        message("(export b)\n(do (def b 1) b)"),
        "`b` is not defined"
    );
    assert_eq!(message("(export)"), "malformed `export`: expected at least one name");
    assert_eq!(
        message("(export lib/x)"),
        "malformed `export`: exported names must be plain symbols"
    );
    assert_eq!(
        message("(do (export x))"),
        "malformed `export`: exports are only allowed at the top level"
    );
}

#[test]
fn imports() {
    let err = analyze_err("(def y fmt/Println)");
    assert_eq!(err.message(), "`fmt` is not defined");
    assert_eq!(
        err.to_json()["suggestion"],
        "import the package before referring to `fmt/Println`"
    );

    assert_eq!(
        message(r#"(do (import "fmt"))"#),
        "malformed `import`: imports are only allowed at the top level"
    );

    let (_, analysis) = analyze_ok("(import \"fmt\")\n(def s (fmt/Sprint 1))");
    assert!(analysis.bindings()["s"].is_unknown());
}

#[test]
fn local_package_members_are_typed_from_schemes() {
    let packages = lib_packages();
    let source = indoc! {r#"
    (import "example.com/app/lib")
    (def z (lib/add 1 2))
    (def w (lib/id "s"))
    "#};

    let analysis = analyze_with(source, &packages).unwrap();
    assert_eq!(analysis.bindings()["z"], Type::int());
    assert_eq!(analysis.bindings()["w"], Type::string());

    let err = analyze_with(
        "(import \"example.com/app/lib\")\n(lib/add 1 \"x\")",
        &packages,
    )
    .unwrap_err();
    assert_eq!(err.kind(), DiagnosticKind::ArgumentTypeMismatch);
    assert_eq!(err.message(), "argument 2 of `lib/add` has the wrong type");
}
