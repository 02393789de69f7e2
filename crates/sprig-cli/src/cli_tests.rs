use std::fs;
use std::path::PathBuf;

use clap::Parser;
use indoc::indoc;
use tracing::Level;

use crate::cli::{Cli, ColorChoice};
use crate::compile::{self, CompileError};

fn parse(args: &[&str]) -> Cli {
    let mut argv = vec!["sprig"];
    argv.extend_from_slice(args);
    Cli::try_parse_from(argv).unwrap()
}

#[test]
fn defaults() {
    let cli = parse(&["main.sprig"]);

    assert_eq!(cli.input, PathBuf::from("main.sprig"));
    assert_eq!(cli.output, None);
    assert_eq!(cli.color, ColorChoice::Auto);
    assert_eq!(cli.package, "main");
    assert_eq!(cli.log_level(), Level::WARN);
}

#[test]
fn all_flags() {
    let cli = parse(&[
        "main.sprig",
        "-o",
        "out.go",
        "-vv",
        "--color",
        "never",
        "--package",
        "demo",
    ]);

    assert_eq!(cli.output, Some(PathBuf::from("out.go")));
    assert_eq!(cli.log_level(), Level::DEBUG);
    assert!(!cli.color.should_colorize());
    assert_eq!(cli.package, "demo");
}

#[test]
fn verbosity_saturates_at_trace() {
    assert_eq!(parse(&["a.sprig", "-v"]).log_level(), Level::INFO);
    assert_eq!(parse(&["a.sprig", "-vvvvv"]).log_level(), Level::TRACE);
}

#[test]
fn input_is_required() {
    assert!(Cli::try_parse_from(["sprig"]).is_err());
    assert!(Cli::try_parse_from(["sprig", "a.sprig", "--color", "sometimes"]).is_err());
}

#[test]
fn writes_go_to_output_file() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("main.sprig");
    let output = dir.path().join("main.go");
    fs::write(&input, "(def x 1)\n").unwrap();
    let cli = parse(&[
        input.to_str().unwrap(),
        "-o",
        output.to_str().unwrap(),
        "--package",
        "demo",
    ]);

    compile::run(&cli).unwrap();

    let go = fs::read_to_string(output).unwrap();
    assert!(go.starts_with("package demo\n"), "{go}");
    assert!(go.contains("\tvar x int64 = 1\n"), "{go}");
}

#[test]
fn unit_failure_is_reported_with_snippet() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("main.sprig");
    fs::write(
        &input,
        indoc! {r#"
        (def n 1)
        (if n 2 3)
        "#},
    )
    .unwrap();
    let cli = parse(&[input.to_str().unwrap()]);

    let err = compile::compile(&cli).unwrap_err();
    assert!(matches!(err, CompileError::Unit { .. }));

    let report = compile::report(&err, false);
    assert!(report.contains("[T002]: `if` condition must be `bool`"), "{report}");
    assert!(report.contains("main.sprig"), "{report}");
    assert!(report.ends_with('\n'));
}

#[test]
fn missing_input_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let cli = parse(&[dir.path().join("absent.sprig").to_str().unwrap()]);

    let err = compile::compile(&cli).unwrap_err();

    assert!(compile::report(&err, false).starts_with("error: cannot read "));
}
