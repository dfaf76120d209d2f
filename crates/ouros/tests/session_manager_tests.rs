//! Integration tests for `SessionManager`, exercising it the way a host
//! embedding a multi-turn REPL would: through the public crate API only.

use ouros::{CapabilitySet, InMemoryFs, ResourceLimits, SessionError, SessionManager, SessionProgress, Value};

fn manager() -> SessionManager<InMemoryFs> {
    SessionManager::new(ResourceLimits::default(), CapabilitySet::none(), InMemoryFs::new())
}

#[test]
fn default_session_exists_on_creation() {
    let mgr = manager();
    let sessions = mgr.list_sessions();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].id, "default");
}

#[test]
fn create_and_list_sessions() {
    let mut mgr = manager();
    mgr.create_session("alpha").unwrap();
    mgr.create_session("beta").unwrap();

    let ids: Vec<String> = mgr.list_sessions().into_iter().map(|s| s.id).collect();
    assert!(ids.contains(&"default".to_owned()));
    assert!(ids.contains(&"alpha".to_owned()));
    assert!(ids.contains(&"beta".to_owned()));
    assert_eq!(ids.len(), 3);
}

#[test]
fn create_duplicate_session_fails() {
    let mut mgr = manager();
    mgr.create_session("alpha").unwrap();
    let err = mgr.create_session("alpha").unwrap_err();
    assert!(matches!(err, SessionError::AlreadyExists(_)));
}

#[test]
fn destroy_session_removes_it() {
    let mut mgr = manager();
    mgr.create_session("temp").unwrap();
    assert_eq!(mgr.list_sessions().len(), 2);
    mgr.destroy_session("temp").unwrap();
    assert_eq!(mgr.list_sessions().len(), 1);
}

#[test]
fn destroy_default_session_fails() {
    let mut mgr = manager();
    let err = mgr.destroy_session("default").unwrap_err();
    assert!(matches!(err, SessionError::InvalidArgument(_)));
}

#[test]
fn destroy_nonexistent_session_fails() {
    let mut mgr = manager();
    let err = mgr.destroy_session("ghost").unwrap_err();
    assert!(matches!(err, SessionError::NotFound(_)));
}

#[test]
fn sessions_are_independent() {
    let mut mgr = manager();
    mgr.create_session("alpha").unwrap();

    mgr.execute(None, "x = 1\n").unwrap();
    mgr.execute(Some("alpha"), "x = 99\n").unwrap();

    let default_x = mgr.get_variable(None, "x").unwrap().unwrap();
    let alpha_x = mgr.get_variable(Some("alpha"), "x").unwrap().unwrap();
    assert!(matches!(default_x, Value::Int(n) if n == 1.into()));
    assert!(matches!(alpha_x, Value::Int(n) if n == 99.into()));
}

#[test]
fn execute_persists_globals_across_calls() {
    let mut mgr = manager();
    mgr.execute(None, "x = 41\n").unwrap();
    mgr.execute(None, "x = x + 1\n").unwrap();
    let x = mgr.get_variable(None, "x").unwrap().unwrap();
    assert!(matches!(x, Value::Int(n) if n == 42.into()));
}

#[test]
fn execute_reports_only_this_calls_output() {
    let mut mgr = manager();
    let first = mgr.execute(None, "print('first')\n").unwrap();
    assert!(first.stdout.contains("first"));
    let second = mgr.execute(None, "print('second')\n").unwrap();
    assert!(second.stdout.contains("second"));
    assert!(!second.stdout.contains("first"));
}

#[test]
fn set_variable_seeds_input_before_execute() {
    let mut mgr = manager();
    mgr.set_variable(None, "n", Value::Int(10.into())).unwrap();
    mgr.execute(None, "n = n * 2\n").unwrap();
    let n = mgr.get_variable(None, "n").unwrap().unwrap();
    assert!(matches!(n, Value::Int(v) if v == 20.into()));
}

#[test]
fn list_variables_reports_names_and_types() {
    let mut mgr = manager();
    mgr.execute(None, "count = 1\nname = 'ouros'\n").unwrap();
    let vars = mgr.list_variables(None).unwrap();
    let names: Vec<&str> = vars.iter().map(|v| v.name.as_str()).collect();
    assert!(names.contains(&"count"));
    assert!(names.contains(&"name"));
}

#[test]
fn rewind_restores_prior_bindings() {
    let mut mgr = manager();
    mgr.execute(None, "x = 1\n").unwrap();
    mgr.execute(None, "x = 2\n").unwrap();
    mgr.rewind(None).unwrap();
    let x = mgr.get_variable(None, "x").unwrap().unwrap();
    assert!(matches!(x, Value::Int(n) if n == 1.into()));
}

#[test]
fn rewind_with_empty_history_fails() {
    let mut mgr = manager();
    let err = mgr.rewind(None).unwrap_err();
    assert!(matches!(err, SessionError::InvalidState(_)));
}

#[test]
fn execute_on_unknown_session_is_not_found() {
    let mut mgr = manager();
    let err = mgr.execute(Some("ghost"), "x = 1\n").unwrap_err();
    assert!(matches!(err, SessionError::NotFound(_)));
}

#[test]
fn suspend_then_resume_round_trips_through_a_session() {
    let mut mgr = manager();
    let out = mgr.execute(None, "x = suspend(1)\n").unwrap();
    assert!(matches!(out.progress, SessionProgress::Suspended));

    let out = mgr.resume(None, Value::Int(41.into())).unwrap();
    assert!(matches!(out.progress, SessionProgress::Complete(_)));
    let x = mgr.get_variable(None, "x").unwrap().unwrap();
    assert!(matches!(x, Value::Int(n) if n == 41.into()));
}

#[test]
fn executing_while_suspended_is_rejected() {
    let mut mgr = manager();
    mgr.execute(None, "x = suspend(1)\n").unwrap();
    let err = mgr.execute(None, "y = 2\n").unwrap_err();
    assert!(matches!(err, SessionError::InvalidState(_)));
}

#[test]
fn resuming_without_a_pending_suspension_is_rejected() {
    let mut mgr = manager();
    mgr.execute(None, "x = 1\n").unwrap();
    let err = mgr.resume(None, Value::None).unwrap_err();
    assert!(matches!(err, SessionError::InvalidState(_)));
}

#[test]
fn describe_renders_a_completed_value() {
    let mut mgr = manager();
    let rendered = mgr.describe(None, &Value::Int(7.into())).unwrap();
    assert_eq!(rendered, "7");
}
