//! Integration tests for compile-time failures surfaced through the public
//! `compile`/`run` entry points, as distinct from the evaluator's own
//! internal parser unit tests.

use ouros::{run, ErrorKind, RunConfig};

#[test]
fn unterminated_function_header_is_a_syntax_error() {
    let err = run("def (:\n", RunConfig::default()).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Syntax);
}

#[test]
fn mismatched_brackets_are_a_syntax_error() {
    let err = run("x = [1, 2\n", RunConfig::default()).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Syntax);
}

#[test]
fn dangling_else_is_a_syntax_error() {
    let err = run("else:\n    pass\n", RunConfig::default()).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Syntax);
}

#[test]
fn syntax_error_message_is_not_empty() {
    let err = run("def (:\n", RunConfig::default()).unwrap_err();
    assert!(!err.message.is_empty());
    assert!(err.exception_class.is_none(), "a parse failure never raised a Python exception");
}

#[test]
fn well_formed_class_definition_compiles() {
    let result = run("class Widget:\n    pass\n", RunConfig::default());
    assert!(result.is_ok());
}

#[test]
fn well_formed_nested_control_flow_compiles() {
    let source = "\
for i in range(3):
    if i % 2 == 0:
        print(i)
    else:
        continue
";
    assert!(run(source, RunConfig::default()).is_ok());
}
