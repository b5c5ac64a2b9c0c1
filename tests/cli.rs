//! Integration tests for the calcbook command line

use std::path::{Path, PathBuf};
use std::process::Command;

const BOOK: &str = r#"
[settings]
defaultDecimalPlaces = 1

[[calculations]]
id = "area"
title = "Area"
type = "standard"
equation = "width * height"
parameters = [{ name = "width", defaultValue = 3 }, { name = "height", defaultValue = 4 }]
resultUnit = "m2"

[[calculations]]
id = "volume"
title = "Volume"
type = "standard"
equation = "area * depth"
parameters = [
    { name = "area", type = "calculation", calcReference = "area" },
    { name = "depth", defaultValue = 2 },
]

[[calculations]]
id = "doubled"
type = "custom-script"
customCode = "return double(volume);"
parameters = [{ name = "volume", type = "calculation", calcReference = "volume" }]

[[calculations]]
id = "loop_a"
type = "standard"
equation = "b"
parameters = [{ name = "b", type = "calculation", calcReference = "loop_b" }]

[[calculations]]
id = "loop_b"
type = "standard"
equation = "a"
parameters = [{ name = "a", type = "calculation", calcReference = "loop_a" }]

[[functions]]
name = "double"
params = ["x"]
code = "x * 2"
"#;

fn write_book(dir: &Path) -> PathBuf {
    let path = dir.join("book.toml");
    std::fs::write(&path, BOOK).expect("Failed to write book");
    path
}

fn run_command(args: &[&str]) -> (String, String, i32) {
    let output = Command::new("cargo")
        .arg("run")
        .arg("-q")
        .arg("--")
        // Tests must be deterministic and not depend on a user's default.rhai.
        .arg("--no-default-functions")
        .args(args)
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let exit_code = output.status.code().unwrap_or(-1);

    (stdout, stderr, exit_code)
}

#[test]
fn test_execute_with_params_and_unit() {
    let dir = tempfile::tempdir().unwrap();
    let book = write_book(dir.path());
    let (stdout, _, code) = run_command(&[book.to_str().unwrap(), "area", "-p", "width=10"]);
    assert_eq!(stdout.trim(), "40.0 m2");
    assert_eq!(code, 0);
}

#[test]
fn test_referenced_calculations_and_functions() {
    let dir = tempfile::tempdir().unwrap();
    let book = write_book(dir.path());
    let (stdout, _, code) = run_command(&[book.to_str().unwrap(), "doubled"]);
    assert_eq!(stdout.trim(), "48.0");
    assert_eq!(code, 0);
}

#[test]
fn test_functions_file() {
    let dir = tempfile::tempdir().unwrap();
    let book = write_book(dir.path());
    let functions = dir.path().join("extra.rhai");
    std::fs::write(&functions, "fn double(x) {\n    x * 3\n}\n").unwrap();
    let (stdout, _, code) = run_command(&[
        book.to_str().unwrap(),
        "doubled",
        "-f",
        functions.to_str().unwrap(),
    ]);
    assert_eq!(stdout.trim(), "72.0");
    assert_eq!(code, 0);
}

#[test]
fn test_detailed_output_is_json() {
    let dir = tempfile::tempdir().unwrap();
    let book = write_book(dir.path());
    let (stdout, _, code) = run_command(&[book.to_str().unwrap(), "volume", "--detailed"]);
    assert_eq!(code, 0);
    let details: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(details["result"], 24);
    assert_eq!(details["formattedResult"], "24.0");
    assert_eq!(details["parameters"]["area"], 12);
    assert!(details["log"].as_array().unwrap().len() > 3);
}

#[test]
fn test_list_and_dependents() {
    let dir = tempfile::tempdir().unwrap();
    let book = write_book(dir.path());
    let (stdout, _, code) = run_command(&[book.to_str().unwrap(), "--list"]);
    assert_eq!(code, 0);
    assert!(stdout.lines().any(|l| l == "area\tstandard\tArea"));

    let (stdout, _, code) = run_command(&[book.to_str().unwrap(), "area", "--dependents"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "volume");
}

#[test]
fn test_cycle_exit_code() {
    let dir = tempfile::tempdir().unwrap();
    let book = write_book(dir.path());
    let (_, stderr, code) = run_command(&[book.to_str().unwrap(), "loop_a"]);
    assert!(stderr.contains("Circular dependency detected: loop_a -> loop_b -> loop_a"));
    assert_eq!(code, 1);
}

#[test]
fn test_unknown_calculation() {
    let dir = tempfile::tempdir().unwrap();
    let book = write_book(dir.path());
    let (_, stderr, code) = run_command(&[book.to_str().unwrap(), "nope"]);
    assert!(stderr.contains("Calculation not found: nope"));
    assert_eq!(code, 1);
}

#[test]
fn test_bad_arguments() {
    let (_, stderr, code) = run_command(&["--param"]);
    assert!(stderr.contains("--param requires a value"));
    assert_eq!(code, 1);
}
