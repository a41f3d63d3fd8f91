//! End-to-end tests for the compilation pipeline.

use quasar::{compile, compile_source, ErrorCode, NoImports};
use std::fs;

fn emit(source: &str) -> String {
    compile_source(source, "test.qsr", &mut NoImports).expect("compile failed")
}

fn expect_single_code(source: &str, code: ErrorCode) {
    let diags = compile_source(source, "test.qsr", &mut NoImports).unwrap_err();
    assert_eq!(diags.len(), 1, "expected one diagnostic, got {:?}", diags);
    assert_eq!(diags[0].code, code);
}

#[test]
fn scenario_factorial() {
    let source = r#"
fn fact(n: int) -> int { if n <= 1 { return 1 } return n * fact(n - 1) }
let r: int = fact(5)
print(r)
"#;
    let python = emit(source);
    assert_eq!(
        python,
        "def fact(n):\n    if (n <= 1):\n        return 1\n    return (n * fact((n - 1)))\nr = fact(5)\nprint(r)\n"
    );
}

#[test]
fn scenario_type_mismatch_diagnostic() {
    expect_single_code("let x: int = 3.14", ErrorCode::E0100);
}

#[test]
fn scenario_format_arity_mismatch() {
    expect_single_code(r#"print("x={}, y={}", 1)"#, ErrorCode::E0410);
}

#[test]
fn scenario_struct_nested_access_and_mutation() {
    let source = r#"
struct Point { x: int, y: int }
struct Line { start: Point, finish: Point }
let l: Line = Line { start: Point { x: 0, y: 0 }, finish: Point { x: 10, y: 10 } }
l.start.x = 100
print(l.start.x)
"#;
    let python = emit(source);
    assert!(python.starts_with("from dataclasses import dataclass\n"));
    assert!(python.contains("@dataclass\nclass Point:\n    x: int\n    y: int"));
    assert!(python.contains("@dataclass\nclass Line:\n    start: Point\n    finish: Point"));
    assert!(python.contains("l = Line(start=Point(x=0, y=0), finish=Point(x=10, y=10))"));
    assert!(python.contains("l.start.x = 100"));
    assert!(python.contains("print(l.start.x)"));
}

#[test]
fn scenario_enum_equality_and_branching() {
    let source = r#"
enum Color { Red, Green, Blue }
fn name(c: Color) -> str { if c == Color.Red { return "red" } if c == Color.Green { return "green" } return "blue" }
print(name(Color.Green))
"#;
    let python = emit(source);
    assert!(python.starts_with("from enum import Enum\n"));
    assert!(python.contains("class Color(Enum):"));
    assert!(python.contains("    Red = \"Red\""));
    assert!(python.contains("if (c == Color.Red):"));
    assert!(python.contains("print(name(Color.Green))"));
}

#[test]
fn scenario_missing_return_path() {
    expect_single_code("fn f(x: int) -> int { if x > 0 { return 1 } }", ErrorCode::E0303);
}

#[test]
fn scenario_builtin_static_modules() {
    let python = emit(r#"let e: bool = File.exists("x.txt")"#);
    assert!(python.starts_with("import os as _q_os\n"));
    assert!(python.contains("e = _q_os.path.exists(\"x.txt\")"));

    let python = emit("let args: [str] = Env.args()");
    assert!(python.starts_with("import sys as _q_sys\n"));
    assert!(python.contains("args = list(_q_sys.argv)"));
}

#[test]
fn scenario_reserved_builtin_names() {
    expect_single_code("let File: int = 1", ErrorCode::E0205);
}

#[test]
fn test_determinism() {
    let source = r#"
struct P { x: int }
enum C { A, B }
fn get(p: P) -> int { return p.x }
let p: P = P { x: 7 }
let d: Dict[str, int] = {"k": get(p)}
for i in 0..3 { print("i={}", i) }
"#;
    let first = emit(source);
    let second = emit(source);
    assert_eq!(first, second);
}

#[test]
fn test_lexer_reports_multiple_errors() {
    let diags = compile_source("let a: int = $1\nlet b: int = @2", "test.qsr", &mut NoImports)
        .unwrap_err();
    assert!(diags.len() >= 2);
    assert!(diags.iter().all(|d| d.code == ErrorCode::E0000));
}

#[test]
fn test_parser_reports_multiple_errors() {
    let diags = compile_source("let = 1\nconst = 2", "test.qsr", &mut NoImports).unwrap_err();
    assert!(diags.len() >= 2);
}

#[test]
fn test_analyzer_reports_independent_errors() {
    let diags = compile_source(
        "fn a() -> int { return \"s\" }\nfn b() -> int { return true }",
        "test.qsr",
        &mut NoImports,
    )
    .unwrap_err();
    assert_eq!(diags.len(), 2);
}

#[test]
fn test_diagnostics_carry_file_and_position() {
    let diags = compile_source("let x: int = 3.14", "prog.qsr", &mut NoImports).unwrap_err();
    assert_eq!(diags[0].file, "prog.qsr");
    assert_eq!(diags[0].span.start_line, 1);
    assert!(diags[0].span.start_column > 1);
}

#[test]
fn test_interior_mutability_of_const_collections() {
    let python = emit(
        "const XS: [int] = [1, 2]\nXS[0] = 9\npush(XS, 3)\nconst D: Dict[str, int] = {\"a\": 1}\nD[\"b\"] = 2",
    );
    assert!(python.contains("XS[0] = 9"));
    assert!(python.contains("XS.append(3)"));
    assert!(python.contains("D[\"b\"] = 2"));
}

#[test]
fn test_while_break_continue() {
    let python = emit(
        "let i: int = 0\nwhile true { i = i + 1 if i > 3 { break } continue }",
    );
    assert!(python.contains("while True:"));
    assert!(python.contains("break"));
    assert!(python.contains("continue"));
}

#[test]
fn test_string_pipeline() {
    let python = emit(
        r#"let line: str = " a,b,c "
let parts: [str] = line.trim().split(",")
print(parts.join(" | "))
"#,
    );
    assert!(python.contains("parts = line.strip().split(\",\")"));
    assert!(python.contains("print(\" | \".join(parts))"));
}

#[test]
fn test_local_import_pipeline() {
    let dir = tempfile::tempdir().expect("tempdir");
    let util = dir.path().join("util.qsr");
    fs::write(&util, "fn double(x: int) -> int { return x * 2 }\n").unwrap();

    let main = dir.path().join("main.qsr");
    fs::write(
        &main,
        "import \"./util.qsr\"\nlet n: int = util.double(21)\nprint(n)\n",
    )
    .unwrap();

    let python = compile(&main).expect("compile failed");
    assert!(python.contains("import util"));
    assert!(python.contains("n = util.double(21)"));
}

#[test]
fn test_local_import_signature_checked() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(
        dir.path().join("util.qsr"),
        "fn double(x: int) -> int { return x * 2 }\n",
    )
    .unwrap();
    let main = dir.path().join("main.qsr");
    fs::write(
        &main,
        "import \"./util.qsr\"\nlet n: int = util.double(\"oops\")\n",
    )
    .unwrap();

    let diags = compile(&main).unwrap_err();
    assert!(diags.iter().any(|d| d.code == ErrorCode::E0100));
}

#[test]
fn test_import_errors() {
    let dir = tempfile::tempdir().expect("tempdir");
    let main = dir.path().join("main.qsr");

    fs::write(&main, "import \"./missing.qsr\"\n").unwrap();
    let diags = compile(&main).unwrap_err();
    assert!(diags.iter().any(|d| d.code == ErrorCode::E0901));

    fs::write(dir.path().join("util.qsr"), "fn f() -> int { return 1 }\n").unwrap();
    fs::write(&main, "import \"./util.qsr\"\nimport \"./util.qsr\"\n").unwrap();
    let diags = compile(&main).unwrap_err();
    assert!(diags.iter().any(|d| d.code == ErrorCode::E0900));
}

#[test]
fn test_diagnostics_from_imported_file_carry_its_path() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(dir.path().join("bad.qsr"), "let x: int = 3.14\n").unwrap();
    let main = dir.path().join("main.qsr");
    fs::write(&main, "import \"./bad.qsr\"\n").unwrap();

    let diags = compile(&main).unwrap_err();
    assert!(diags.iter().any(|d| d.code == ErrorCode::E0100 && d.file.contains("bad.qsr")));
}

#[test]
fn test_circular_imports_defer_to_runtime() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(
        dir.path().join("a.qsr"),
        "import \"./b.qsr\"\nfn fa() -> int { return 1 }\n",
    )
    .unwrap();
    fs::write(
        dir.path().join("b.qsr"),
        "import \"./a.qsr\"\nfn fb() -> int { return 2 }\n",
    )
    .unwrap();

    let python = compile(&dir.path().join("a.qsr")).expect("cycle should not be a compile error");
    assert!(python.contains("import b"));
}

#[test]
fn test_diamond_import_compiles_once() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(dir.path().join("base.qsr"), "fn one() -> int { return 1 }\n").unwrap();
    fs::write(dir.path().join("left.qsr"), "import \"./base.qsr\"\n").unwrap();
    fs::write(dir.path().join("right.qsr"), "import \"./base.qsr\"\n").unwrap();
    let main = dir.path().join("main.qsr");
    fs::write(&main, "import \"./left.qsr\"\nimport \"./right.qsr\"\n").unwrap();

    let python = compile(&main).expect("diamond imports should compile");
    assert!(python.contains("import left"));
    assert!(python.contains("import right"));
}

#[test]
fn test_python_module_import_pipeline() {
    let python = emit("import math\nlet r: float = math.sqrt(2.0)\nprint(r)");
    assert_eq!(python, "import math\nr = math.sqrt(2.0)\nprint(r)\n");
}

#[test]
fn test_emitted_text_is_plausible_python() {
    // Structural sanity: balanced indentation, no tabs, every block
    // header ends with a colon.
    let python = emit(
        r#"
fn classify(n: int) -> str {
    if n < 0 { return "neg" }
    if n == 0 { return "zero" }
    return "pos"
}
for i in 0..5 { print(classify(i - 2)) }
"#,
    );
    for line in python.lines() {
        assert!(!line.contains('\t'));
        let indent = line.len() - line.trim_start().len();
        assert_eq!(indent % 4, 0, "indentation must be a multiple of 4: {:?}", line);
    }
    assert!(python.contains("def classify(n):"));
    assert!(python.contains("for i in range(0, 5):"));
}
