use indexmap::{IndexMap, IndexSet};
use indoc::indoc;

use crate::analyze::Analysis;
use crate::codegen::{GenerateConfig, generate};
use crate::diagnostics::DiagnosticKind;
use crate::macros::{Macro, MacroRegistry, MacroTable};
use crate::resolve::PackageMetadata;
use crate::test_utils::{go, go_main, go_with, parse_ok};

#[test]
fn file_layout() {
    let input = indoc! {r#"
    (import [["strings" str] "fmt"])
    (import "fmt")
    (record Point [x: int y: int])
    (def k :ok)
    (fmt/Println (str/ToUpper "hi") k (Point [1 2]))
    "#};

    insta::assert_snapshot!(go(input), @r#"
    package main

    import (
        str "strings"
        "fmt"
    )

    type Symbol string

    type Point struct {
        x int64
        y int64
    }

    func main() {
        var k Symbol = Symbol("ok")
        _ = k
        fmt.Println(str.ToUpper("hi"), k, Point{x: 1, y: 2})
    }
    "#);
}

#[test]
fn empty_program() {
    insta::assert_snapshot!(go(""), @r"
    package main

    func main() {
    }
    ");
}

#[test]
fn package_name_is_configurable() {
    let program = parse_ok("(def x 1)");
    let mut macros = MacroTable::new();
    let analysis = crate::analyze::analyze(&program, &Default::default(), &mut macros).unwrap();
    let config = GenerateConfig::new().package_name("demo");

    let go = generate(&program, &analysis, &PackageMetadata::default(), &macros, &config).unwrap();

    assert!(go.starts_with("package demo\n"));
    assert!(go.contains("\tvar x int64 = 1\n"));
}

#[test]
fn operators_fold_left() {
    let input = indoc! {r#"
    (def sum (+ 1 2 3 4))
    (def all (and true false true))
    (def none (not all))
    (def same (= sum 10))
    "#};

    insta::assert_snapshot!(go_main(input), @r"
    var sum int64 = (((1 + 2) + 3) + 4)
    var all bool = ((true && false) && true)
    var none bool = !all
    var same bool = (sum == 10)
    ");
}

#[test]
fn lone_definition_is_marked_used() {
    insta::assert_snapshot!(go_main("(def x 1)"), @r"
    var x int64 = 1
    _ = x
    ");
    insta::assert_snapshot!(go_main("(def a 1)\n(def b \"s\")"), @r#"
    var a int64 = 1
    var b string = "s"
    "#);
}

#[test]
fn dynamic_types_use_short_declaration() {
    insta::assert_snapshot!(go_main("(def xs [])\n(def n 2)"), @r"
    xs := []any{}
    var n int64 = 2
    ");
}

#[test]
fn names_are_go_identifiers() {
    insta::assert_snapshot!(go_main("(def my-value 1)\n(def type 2)"), @r"
    var my_value int64 = 1
    var type_ int64 = 2
    ");
}

#[test]
fn recursive_function_is_declared_first() {
    let input = indoc! {r#"
    (def fact (fn [n: int] -> int
      (if (<= n 1) 1 (* n (fact (- n 1))))))
    "#};

    insta::assert_snapshot!(go_main(input), @r"
    var fact func(int64) int64
    fact = func(n int64) int64 {
        if (n <= 1) {
            return 1
        } else {
            return (n * fact((n - 1)))
        }
    }
    _ = fact
    ");
}

#[test]
fn void_function_returns_nil() {
    let input = indoc! {r#"
    (import "fmt")
    (def greet (fn [name: string] -> void (fmt/Println name)))
    (greet "you")
    "#};

    insta::assert_snapshot!(go_main(input), @r#"
    var greet func(string) any
    greet = func(name string) any {
        fmt.Println(name)
        return nil
    }
    _ = greet
    greet("you")
    "#);
}

#[test]
fn generic_result_is_asserted() {
    let input = indoc! {r#"
    (def id (fn [x: 'T] -> 'T x))
    (def n (id 1))
    "#};

    insta::assert_snapshot!(go_main(input), @r"
    var id func(any) any
    id = func(x any) any {
        return x
    }
    var n int64 = id(int64(1)).(int64)
    ");
}

#[test]
fn list_argument_is_copied_into_generic_parameter() {
    let input = indoc! {r#"
    (def first (fn [xs: ['T]] -> 'T (get xs 0)))
    (def n (first [1 2]))
    "#};

    insta::assert_snapshot!(go_main(input), @r"
    var first func([]any) any
    first = func(xs []any) any {
        return func() any {
            __seq := xs
            __idx := int64(0)
            if int64(len(__seq)) > __idx {
                return __seq[__idx]
            }
            return nil
        }()
    }
    var n int64 = first(func(xs []int64) []any {
        out := make([]any, len(xs))
        for i, x := range xs {
            out[i] = x
        }
        return out
    }([]int64{1, 2})).(int64)
    ");
}

#[test]
fn generic_list_result_is_copied_back() {
    let input = indoc! {r#"
    (def wrap (fn [x: 'T] -> ['T] [x]))
    (def xs (wrap 1))
    "#};

    insta::assert_snapshot!(go_main(input), @r"
    var wrap func(any) []any
    wrap = func(x any) []any {
        return []any{x}
    }
    var xs []int64 = func(xs []any) []int64 {
        out := make([]int64, len(xs))
        for i, x := range xs {
            out[i] = x.(int64)
        }
        return out
    }(wrap(int64(1)))
    ");
}

#[test]
fn function_argument_is_wrapped_for_generic_parameter() {
    let input = indoc! {r#"
    (def call (fn [f: (fn ['T] 'T) x: 'T] -> 'T (f x)))
    (def inc (fn [n: int] -> int (+ n 1)))
    (def r (call inc 2))
    "#};

    insta::assert_snapshot!(go_main(input), @r"
    var call func(func(any) any, any) any
    call = func(f func(any) any, x any) any {
        return f(x)
    }
    var inc func(int64) int64
    inc = func(n int64) int64 {
        return (n + 1)
    }
    var r int64 = call(func(f func(int64) int64) func(any) any {
        return func(p0 any) any {
            return f(p0.(int64))
        }
    }(inc), int64(2)).(int64)
    ");
}

#[test]
fn map_argument_is_copied_into_generic_parameter() {
    let input = indoc! {r#"
    (def size (fn [m: (map string 'V)] -> int (len m)))
    (def n (size (map ["a" 1])))
    "#};

    let go = go_main(input);
    assert!(
        go.contains(indoc! {"
        var n int64 = size(func(m map[string]int64) map[string]any {
            out := make(map[string]any, len(m))
            for k, v := range m {
                out[k] = v
            }
            return out
        }(map[string]int64{\"a\": 1}))"}),
        "{go}"
    );
}

#[test]
fn immediately_applied_function() {
    insta::assert_snapshot!(go_main("(def r ((fn [x: int] -> int (* x 2)) 5))"), @r"
    var r int64 = func(x int64) int64 {
        return (x * 2)
    }(5)
    _ = r
    ");
}

#[test]
fn if_and_do_as_values() {
    let input = indoc! {r#"
    (def m (if true "a" "b"))
    (def r (do (def a 1) (+ a 2)))
    (def e (do))
    "#};

    insta::assert_snapshot!(go_main(input), @r#"
    var m string = func() string {
        if true {
            return "a"
        } else {
            return "b"
        }
    }()
    var r int64 = func() int64 {
        var a int64 = 1
        return (a + 2)
    }()
    var e any = nil
    "#);
}

#[test]
fn if_statement_branches() {
    let input = indoc! {r#"
    (import "fmt")
    (def n 3)
    (if (> n 2) (fmt/Println "big") (do (fmt/Println "small") (fmt/Println n)))
    "#};

    insta::assert_snapshot!(go_main(input), @r#"
    var n int64 = 3
    _ = n
    if (n > 2) {
        fmt.Println("big")
    } else {
        fmt.Println("small")
        fmt.Println(n)
    }
    "#);
}

#[test]
fn decidable_condition_is_folded() {
    let input = indoc! {r#"
    (import "fmt")
    (if (= (len []) 0) (fmt/Println "empty"))
    (if (empty? [1]) (fmt/Println "never"))
    "#};

    insta::assert_snapshot!(go_main(input), @r#"
    if true {
        fmt.Println("empty")
    }
    if false {
        fmt.Println("never")
    }
    "#);
}

#[test]
fn top_level_block_and_expressions() {
    let input = indoc! {r#"
    (import "fmt")
    (do (fmt/Println 1) (fmt/Println 2))
    (+ 1 2)
    nil
    "s"
    "#};

    insta::assert_snapshot!(go_main(input), @r#"
    {
        fmt.Println(1)
        fmt.Println(2)
    }
    _ = (1 + 2)
    _ = "s"
    "#);
}

#[test]
fn get_on_literal_sequence_has_folded_guard() {
    insta::assert_snapshot!(go_main("(def v (get [1 2 3] 1))"), @r"
    var v int64 = func() int64 {
        __seq := []int64{1, 2, 3}
        __idx := int64(1)
        if true {
            return __seq[__idx]
        }
        return 0
    }()
    _ = v
    ");
}

#[test]
fn get_on_empty_literal_falls_back_to_nil() {
    insta::assert_snapshot!(go_main("(def v (get [] 0))"), @r"
    v := func() any {
        __seq := []any{}
        __idx := int64(0)
        if false {
            return __seq[__idx]
        }
        return nil
    }()
    _ = v
    ");
}

#[test]
fn get_on_variable_checks_bounds() {
    let input = indoc! {r#"
    (def xs [1 2])
    (def i 1)
    (def y (get xs i))
    "#};

    insta::assert_snapshot!(go_main(input), @r"
    var xs []int64 = []int64{1, 2}
    var i int64 = 1
    var y int64 = func() int64 {
        __seq := xs
        __idx := int64(i)
        if int64(len(__seq)) > __idx {
            return __seq[__idx]
        }
        return 0
    }()
    ");
}

#[test]
fn slice_falls_back_to_empty_slice() {
    insta::assert_snapshot!(go_main("(def s (slice [1 2 3] 1))"), @r"
    var s []int64 = func() []int64 {
        __seq := []int64{1, 2, 3}
        __idx := int64(1)
        if true {
            return __seq[__idx:]
        }
        return []int64{}
    }()
    _ = s
    ");
}

#[test]
fn collection_primitives() {
    let input = indoc! {r#"
    (def e (empty? []))
    (def f (empty? [1]))
    (def g (len [1 2]))
    (def h (append [1] [2]))
    (def m (map ["a" 1 "b" 2]))
    (def v (get m "a"))
    "#};

    insta::assert_snapshot!(go_main(input), @r#"
    var e bool = true
    var f bool = false
    var g int64 = int64(len([]int64{1, 2}))
    var h []int64 = append([]int64{1}, []int64{2}...)
    var m map[string]int64 = map[string]int64{"a": 1, "b": 2}
    var v int64 = m["a"]
    "#);
}

#[test]
fn records_and_field_access() {
    let input = indoc! {r#"
    (record Point [x: int y: int])
    (def p (Point [1 2]))
    (def px (. p x))
    "#};

    insta::assert_snapshot!(go_main(input), @r"
    var p Point = Point{x: 1, y: 2}
    var px int64 = p.x
    ");
}

#[test]
fn macros_lower_through_their_expansion() {
    let input = indoc! {r#"
    (macro twice! [x] (+ x x))
    (def y (twice! 3))
    "#};

    insta::assert_snapshot!(go_main(input), @r"
    var y int64 = (3 + 3)
    _ = y
    ");
}

#[test]
fn unrecorded_invocation_is_expanded_from_registry() {
    let program = parse_ok("(twice! 2)");
    let mut macros = MacroTable::new();
    let mac = Macro {
        name: "twice!".to_string(),
        params: vec!["x".to_string()],
        rest: None,
        body: parse_ok("(+ x x)").forms.remove(0),
    };
    macros.register("twice!", mac).unwrap();
    let config = GenerateConfig::new();

    let go = generate(
        &program,
        &Analysis::default(),
        &PackageMetadata::default(),
        &macros,
        &config,
    )
    .unwrap();

    assert!(go.contains("\t_ = (2 + 2)\n"), "{go}");
}

#[test]
fn unknown_macro_is_reported() {
    let program = parse_ok("(twice! 2)");
    let macros = MacroTable::new();
    let config = GenerateConfig::new();

    let err = generate(
        &program,
        &Analysis::default(),
        &PackageMetadata::default(),
        &macros,
        &config,
    )
    .unwrap_err();

    assert_eq!(err.kind(), DiagnosticKind::UnresolvedMacro);
    assert_eq!(err.message(), "macro `twice!` is not defined");
}

fn lib_metadata() -> PackageMetadata {
    let mut metadata = PackageMetadata::default();
    metadata
        .types
        .paths
        .insert("example.com/app/lib".to_string(), "lib".to_string());
    metadata
        .ignore_imports
        .insert("example.com/app/lib".to_string());
    metadata
        .exports
        .insert("lib".to_string(), IndexSet::from(["add".to_string()]));
    metadata
}

#[test]
fn exported_member_lowers_to_namespace_field() {
    let input = indoc! {r#"
    (import "example.com/app/lib")
    (def y (lib/add 1 2))
    "#};

    let go = go_with(input, &lib_metadata()).unwrap();

    assert!(!go.contains("import ("), "{go}");
    assert!(go.contains("    y := lib.add(1, 2)\n"), "{go}");
}

#[test]
fn unexported_member_is_rejected() {
    let input = indoc! {r#"
    (import "example.com/app/lib")
    (def y lib/hidden)
    "#};

    let err = go_with(input, &lib_metadata()).unwrap_err();

    assert_eq!(err.kind(), DiagnosticKind::NotExported);
    assert_eq!(err.code(), "P002");
    insta::assert_snapshot!(err.message(), @"`hidden` is not exported by package `lib`");
}

#[test]
fn namespace_follows_package_definitions() {
    let lib = "(def add (fn [a: int b: int] -> int (+ a b)))\n";
    let input = format!("{lib}(def y 3)\n");
    let mut metadata = lib_metadata();
    metadata.ranges = IndexMap::from([("lib".to_string(), 0..lib.len())]);

    let go = go_with(&input, &metadata).unwrap();

    insta::assert_snapshot!(go, @r"
    package main

    func main() {
        var add func(int64, int64) int64
        add = func(a int64, b int64) int64 {
            return (a + b)
        }
        lib := struct {
            add func(int64, int64) int64
        }{add: add}
        _ = lib
        var y int64 = 3
    }
    ");
}

#[test]
fn namespaces_of_same_named_packages_stay_distinct() {
    let a = "(def inc (fn [n: int] -> int (+ n 1)))\n";
    let b = "(def dec (fn [n: int] -> int (- n 1)))\n";
    let entry = indoc! {r#"
    (import [["example.com/app/a/util" au] ["example.com/app/b/util" bu]])
    (def y (au/inc (bu/dec 1)))
    "#};
    let input = format!("{a}{b}{entry}");

    let mut metadata = PackageMetadata::default();
    for (path, key, export) in [
        ("example.com/app/a/util", "a/util", "inc"),
        ("example.com/app/b/util", "b/util", "dec"),
    ] {
        metadata.types.paths.insert(path.to_string(), key.to_string());
        metadata.ignore_imports.insert(path.to_string());
        metadata
            .exports
            .insert(key.to_string(), IndexSet::from([export.to_string()]));
    }
    metadata.ranges = IndexMap::from([
        ("a/util".to_string(), 0..a.len()),
        ("b/util".to_string(), a.len()..a.len() + b.len()),
    ]);

    let go = go_with(&input, &metadata).unwrap();

    insta::assert_snapshot!(go, @r"
    package main

    func main() {
        var inc func(int64) int64
        inc = func(n int64) int64 {
            return (n + 1)
        }
        a_util := struct {
            inc func(int64) int64
        }{inc: inc}
        _ = a_util
        var dec func(int64) int64
        dec = func(n int64) int64 {
            return (n - 1)
        }
        b_util := struct {
            dec func(int64) int64
        }{dec: dec}
        _ = b_util
        y := a_util.inc(b_util.dec(1))
    }
    ");
}
