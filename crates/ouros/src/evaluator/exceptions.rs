//! `try`/`except`/`else`/`finally`, `raise`, and `with`, per spec.md §4.6.

use std::rc::Rc;

use crate::{
    ast::{Expr, Line, Stmt, WithItem},
    environment::Environment,
    exception::{Exception, RunError, RunResult},
    io::FilesystemBackend,
    resource::ResourceTracker,
    value::Value,
};

use super::{loc, truthy, Flow, Interpreter};

/// Runs a `try` statement: `body`, then either `handlers` (on a matching
/// raised exception) or `orelse` (if `body` raised nothing), with
/// `finalbody` always run last — its own escape (return/break/continue/a
/// new raise) replaces whatever `body`/`handlers`/`orelse` were doing.
pub fn eval_try<R: ResourceTracker, FS: FilesystemBackend>(interp: &mut Interpreter<R, FS>, stmt: &Stmt, env: &mut Environment) -> RunResult<Flow> {
    let Stmt::Try { body, handlers, orelse, finalbody, line } = stmt else { unreachable!() };

    let outcome = match interp.eval_block(body, env) {
        Ok(Flow::Normal) => interp.eval_block(orelse, env),
        Ok(other) => Ok(other),
        Err(RunError::Raised(exc)) => handle_exception(interp, exc, handlers, env, *line),
        Err(timeout) => Err(timeout),
    };

    match interp.eval_block(finalbody, env)? {
        Flow::Normal => outcome,
        other => Ok(other),
    }
}

fn handle_exception<R: ResourceTracker, FS: FilesystemBackend>(
    interp: &mut Interpreter<R, FS>,
    exc: Exception,
    handlers: &[crate::ast::ExceptHandler],
    env: &mut Environment,
    line: Line,
) -> RunResult<Flow> {
    for handler in handlers {
        let prefix = handler.exc_type.as_deref().unwrap_or("Exception");
        if !exc.matches(prefix) {
            continue;
        }
        if let Some(name) = &handler.name {
            let id = interp.intern(name);
            env.put(id, Value::Str(Rc::from(exc.message.as_str())));
        }
        interp.active_exceptions.push(exc);
        let result = interp.eval_block(&handler.body, env);
        interp.active_exceptions.pop();
        return result.map_err(|e| attach(e, line));
    }
    Err(RunError::Raised(exc))
}

/// Evaluates `raise`/re-`raise`, per spec.md §4.6 "Raise". A bare `raise`
/// re-raises whatever exception the innermost enclosing `except` is
/// handling; raising anything else expects a string-like value (a message)
/// or reuses a caught exception value's message, since this interpreter has
/// no dedicated exception-instance `Value` (see `exception.rs`'s module
/// doc on the stringly-typed design).
pub fn eval_raise<R: ResourceTracker, FS: FilesystemBackend>(
    interp: &mut Interpreter<R, FS>,
    exc: Option<&Expr>,
    cause: Option<&Expr>,
    line: Line,
    env: &mut Environment,
) -> RunResult<Flow> {
    let Some(exc_expr) = exc else {
        let Some(active) = interp.active_exceptions.last().cloned() else {
            return Err(interp.raise(Exception::new(crate::exception::ExcType::Exception, "No active exception to re-raise").with_frame(loc(line))));
        };
        return Err(RunError::Raised(active.with_frame(loc(line))));
    };
    let value = interp.eval_expr(exc_expr, env)?;
    let mut exception = value_to_exception(interp, &value, env, line)?;
    if let Some(cause_expr) = cause {
        let cause_value = interp.eval_expr(cause_expr, env)?;
        let cause_exception = value_to_exception(interp, &cause_value, env, line)?;
        exception = exception.with_cause(cause_exception);
    }
    Err(RunError::Raised(exception.with_frame(loc(line))))
}

/// Turns a `raise`d value into an [`Exception`]: a bare string becomes a
/// plain `Exception`, a call result carrying a known built-in exception
/// name (via `type(...).__name__`-style matching on a class `Value`)
/// becomes that `ExcType`, anything else becomes a user-defined exception
/// named after its class/type.
fn value_to_exception<R: ResourceTracker, FS: FilesystemBackend>(interp: &mut Interpreter<R, FS>, value: &Value, env: &mut Environment, line: Line) -> RunResult<Exception> {
    let (class_name, message) = match value {
        Value::Str(s) => ("Exception".to_string(), s.to_string()),
        Value::Instance(id) => (display_type_name(interp, value), instance_message(interp, *id)),
        other => (display_type_name(interp, other), interp.str_of(other, env).unwrap_or_default()),
    };
    match class_name.parse::<crate::exception::ExcType>() {
        Ok(exc_type) if exc_type != crate::exception::ExcType::UserDefined => Ok(Exception::new(exc_type, message)),
        _ => Ok(Exception::user_defined(class_name, message)),
    }
    .map(|e| e.with_frame(loc(line)))
}

/// Reads a raised instance's message directly off its attributes rather
/// than calling `__str__`, since a built-in exception constructor (e.g.
/// `ValueError(...)`) stores its argument as a plain attribute and isn't
/// guaranteed to define that dunder itself.
fn instance_message<R: ResourceTracker, FS: FilesystemBackend>(interp: &mut Interpreter<R, FS>, id: crate::heap::HeapId) -> String {
    let message_id = interp.intern("message");
    if let Some(Value::Str(s)) = interp.lookup_instance_attr(id, message_id) {
        return s.to_string();
    }
    let args_id = interp.intern("args");
    if let Some(Value::Tuple(items)) = interp.lookup_instance_attr(id, args_id) {
        if let Some(Value::Str(s)) = items.first() {
            return s.to_string();
        }
    }
    String::new()
}

fn display_type_name<R: ResourceTracker, FS: FilesystemBackend>(interp: &Interpreter<R, FS>, value: &Value) -> String {
    match value {
        Value::Instance(id) => {
            let crate::heap::HeapData::Instance(instance) = interp.heap.get(*id) else { return "object".to_string() };
            let crate::heap::HeapData::Class(class) = interp.heap.get(instance.class) else { return "object".to_string() };
            interp.interner.resolve(class.name).to_string()
        }
        other => other.type_name().to_string(),
    }
}

fn attach(err: RunError, line: Line) -> RunError {
    match err {
        RunError::Raised(e) => RunError::Raised(e.with_frame(loc(line))),
        other => other,
    }
}

/// Evaluates a `with` statement, per spec.md §4.6 "With": each item's
/// `__enter__` result binds to its target (if any); `__exit__` always runs,
/// even when the body raises, and can suppress that exception by returning
/// a truthy value.
pub fn eval_with<R: ResourceTracker, FS: FilesystemBackend>(
    interp: &mut Interpreter<R, FS>,
    items: &[WithItem],
    body: &[Stmt],
    line: Line,
    env: &mut Environment,
) -> RunResult<Flow> {
    let Some((first, rest)) = items.split_first() else {
        return interp.eval_block(body, env);
    };
    let ctx_value = interp.eval_expr(&first.ctx_expr, env)?;
    // File handles have no `__enter__`/`__exit__` of their own (`open()`
    // returns a `Value::FileHandle`, not an instance); `with` just binds the
    // handle itself and closes it on scope-exit, per spec.md §3.
    let entered = if matches!(ctx_value, Value::FileHandle(_)) {
        ctx_value.clone()
    } else {
        interp.call_method(&ctx_value, "__enter__", Vec::new(), env)?
    };
    if let Some(target) = &first.target {
        interp.bind_target(target, entered, env)?;
    }

    let result = eval_with(interp, rest, body, line, env);

    if let Value::FileHandle(handle_id) = ctx_value {
        interp.ctx.close_handle(handle_id).map_err(|e| interp.raise(e))?;
        return result;
    }

    let exit_args = match &result {
        Err(RunError::Raised(e)) => vec![
            Value::Str(Rc::from(e.class_name.as_str())),
            Value::Str(Rc::from(e.message.as_str())),
            Value::None,
        ],
        _ => vec![Value::None, Value::None, Value::None],
    };
    let exit_outcome = interp.call_method(&ctx_value, "__exit__", exit_args, env)?;

    match result {
        Err(RunError::Raised(_)) if truthy(interp, &exit_outcome, env)? => Ok(Flow::Normal),
        other => other,
    }
}
