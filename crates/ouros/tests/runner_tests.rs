//! Integration tests for the Core API's `run`/`run_with_telemetry`/`Runner`
//! entry points, black-box against the public crate surface only.

use ouros::{
    run, run_with_telemetry, CapabilitySet, Error, ErrorKind, Exception, InMemoryFs, PrintWriter, RunConfig, RunProgress, Runner, Value,
};

fn config() -> RunConfig<InMemoryFs> {
    RunConfig::default()
}

#[test]
fn run_returns_a_top_level_return_value() {
    let value = run("return 1 + 2\n", config()).unwrap();
    assert!(matches!(value, Value::Int(n) if n == 3.into()));
}

#[test]
fn run_without_a_return_yields_none() {
    let value = run("x = 1\n", config()).unwrap();
    assert!(matches!(value, Value::None));
}

#[test]
fn uncaught_exception_carries_its_class_name() {
    let err = run("raise KeyError('missing')\n", config()).unwrap_err();
    assert_eq!(err.exception_class.as_deref(), Some("KeyError"));
}

#[test]
fn caught_exception_does_not_escape() {
    let source = "\
try:
    raise ValueError('nope')
except ValueError:
    pass
return 'recovered'
";
    let value = run(source, config()).unwrap();
    assert!(matches!(value, Value::Str(s) if &*s == "recovered"));
}

#[test]
fn telemetry_counts_every_print_event() {
    let (_, telemetry) = run_with_telemetry("print('a')\nprint('b')\nprint('c')\n", config()).unwrap();
    assert!(telemetry.event_count >= 3);
}

#[test]
fn suspend_with_no_driver_is_a_runtime_error() {
    let err = run("suspend(1)\n", config()).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Runtime);
}

#[test]
fn runner_suspends_then_completes_on_resume() {
    let mut runner = Runner::from_config("x = suspend('waiting')\nreturn x\n", config()).unwrap();
    let progress = runner.start().unwrap();
    let RunProgress::Suspended(snapshot) = progress else { panic!("expected a suspension") };
    assert!(matches!(snapshot.value(), Value::Str(s) if &**s == "waiting"));

    let progress = runner.resume(snapshot, Value::Str("done".into())).unwrap();
    let RunProgress::Complete(value) = progress else { panic!("expected completion") };
    assert!(matches!(value, Value::Str(s) if &*s == "done"));
}

#[test]
fn runner_describe_renders_user_values() {
    let mut runner = Runner::from_config("return [1, 2, 3]\n", config()).unwrap();
    let RunProgress::Complete(value) = runner.start().unwrap() else { panic!("expected completion") };
    let rendered = runner.describe(&value);
    assert_eq!(rendered, "[1, 2, 3]");
}

#[test]
fn output_since_excludes_earlier_events() {
    let mut runner = Runner::from_config("print('before')\n", config()).unwrap();
    runner.start().unwrap();
    let marker = runner.event_count();
    runner.load("print('after')\n").unwrap();
    runner.start().unwrap();
    let fresh = runner.output_since(marker);
    assert!(fresh.contains("after"));
    assert!(!fresh.contains("before"));
}

#[test]
fn unrestricted_capabilities_allow_network_policy_any() {
    let mut cfg = config();
    cfg.capabilities = CapabilitySet::unrestricted();
    let value = run("return 1\n", cfg).unwrap();
    assert!(matches!(value, Value::Int(n) if n == 1.into()));
}

#[derive(Default)]
struct NullPrint;
impl PrintWriter for NullPrint {
    fn write(&mut self, _text: &str) -> Result<(), Exception> {
        Ok(())
    }

    fn push(&mut self, _end: char) -> Result<(), Exception> {
        Ok(())
    }
}

#[test]
fn a_custom_print_writer_does_not_affect_event_based_output_extraction() {
    let mut cfg = config();
    cfg.print = Box::new(NullPrint);
    let (_, telemetry) = run_with_telemetry("print('still recorded')\n", cfg).unwrap();
    assert!(telemetry.event_count >= 1);
}

fn assert_error_kind(source: &str, expected: ErrorKind) {
    let err: Error = run(source, config()).unwrap_err();
    assert_eq!(err.kind, expected);
}

#[test]
fn timeout_error_is_never_hit_with_default_limits_on_trivial_programs() {
    assert_error_kind("raise TypeError('x')\n", ErrorKind::Runtime);
}
