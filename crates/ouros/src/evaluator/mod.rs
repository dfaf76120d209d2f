//! Tree-walking evaluator, per spec.md §4.6.
//!
//! [`Interpreter`] bundles everything a single program run threads through
//! every `eval_*` call: the container arena, the string interner, the
//! execution [`Context`], the trace hooks, and the `print()` writer. AST +
//! [`Environment`] flow through as explicit arguments instead, since a
//! function call needs its own environment while sharing the same
//! interpreter state.

mod classes;
mod exceptions;
mod expr;
mod generator;
mod operators;
mod patterns;
mod stmt;

pub use operators::{binop, compare, truthy, values_equal};

use std::rc::Rc;

use crate::{
    ast::{Line, Module, Stmt},
    context::Context,
    environment::Environment,
    exception::{Exception, RunError, RunResult, StackFrame},
    heap::Heap,
    intern::{Interner, StringId},
    io::{FilesystemBackend, PrintWriter},
    modules::ModuleTable,
    resource::ResourceTracker,
    tracer::VmTracer,
    types::ContFrame,
    value::Value,
};

/// Builds a traceback frame for a raise site where the enclosing function
/// name isn't threaded through; `call_function` fills in the real name when
/// wrapping a propagating exception at a call boundary.
pub(super) fn loc(line: Line) -> StackFrame {
    StackFrame { function_name: String::new(), line }
}

/// Every non-value way a statement sequence can finish, per spec.md §4.6's
/// `outcome`/signal model. Raised exceptions travel via `Result::Err`
/// instead of a `Flow` variant (see `exception.rs`'s module doc), so this
/// only needs the control-flow escapes that statements themselves handle.
pub enum Flow {
    Normal,
    Return(Value),
    Break,
    Continue,
    /// A `yield`/`yield from` was reached while driving a generator in
    /// `defer`/`defer_inner` mode. `frames` is the continuation to resume
    /// from, outermost frame first (see `generator.rs`).
    Yield { value: Value, frames: Vec<ContFrame> },
}

pub struct Interpreter<R: ResourceTracker, FS: FilesystemBackend> {
    pub heap: Heap,
    pub interner: Interner,
    pub ctx: Context<R, FS>,
    pub tracer: Box<dyn VmTracer>,
    pub print: Box<dyn PrintWriter>,
    pub modules: ModuleTable,
    /// The exception a currently-running `except` handler is handling, used
    /// to resolve a bare `raise` (re-raise). Pushed/popped around a
    /// handler's body by `exceptions::eval_try`.
    pub(super) active_exceptions: Vec<Exception>,
    /// Routes registered by decorators returning a `{register_route, method,
    /// path, handler}` sentinel while the innermost `class` body is still
    /// being evaluated; `classes::define_class` drains the slice it added
    /// into that class's own `routes`.
    pub(super) pending_routes: Vec<crate::object::RouteEntry>,
}

impl<R: ResourceTracker, FS: FilesystemBackend> Interpreter<R, FS> {
    pub fn new(ctx: Context<R, FS>, tracer: Box<dyn VmTracer>, print: Box<dyn PrintWriter>) -> Self {
        Self {
            heap: Heap::new(),
            interner: Interner::new(),
            ctx,
            tracer,
            print,
            modules: ModuleTable::with_builtins(),
            active_exceptions: Vec::new(),
            pending_routes: Vec::new(),
        }
    }

    #[must_use]
    pub fn intern(&mut self, name: &str) -> StringId {
        self.interner.intern(name)
    }

    /// Evaluates an entire module's top-level body in `env` (normally the
    /// module's own global-scope `Environment`).
    pub fn eval_module(&mut self, module: &Module, env: &mut Environment) -> RunResult<Value> {
        match self.eval_block(&module.body, env)? {
            Flow::Return(v) => Ok(v),
            _ => Ok(Value::None),
        }
    }

    /// The statement-loop dispatcher: checks the compute deadline on every
    /// iteration, short-circuits on any non-`Normal` flow.
    pub fn eval_block(&mut self, stmts: &[Stmt], env: &mut Environment) -> RunResult<Flow> {
        for (index, stmt) in stmts.iter().enumerate() {
            self.check_deadline()?;
            match self.eval_stmt(stmt, env)? {
                Flow::Normal => {}
                Flow::Yield { value, mut frames } => {
                    frames.insert(0, ContFrame::Stmts { body: rest_as_rc(stmts, index + 1), index: 0 });
                    return Ok(Flow::Yield { value, frames });
                }
                other => return Ok(other),
            }
        }
        Ok(Flow::Normal)
    }

    /// Charges elapsed compute time and converts a budget overrun into the
    /// uncatchable `TimeoutError` escape described in spec.md §4.6/§5.
    pub fn check_deadline(&mut self) -> RunResult<()> {
        self.ctx.check_deadline().map_err(|e| RunError::Timeout(e.to_exception()))
    }

    pub fn raise(&self, exc: Exception) -> RunError {
        RunError::Raised(exc)
    }

    /// Invokes any callable `Value`, the entry point `builtins.rs` uses to
    /// call a user-supplied `key`/predicate/mapping function.
    pub fn call(&mut self, callable: &Value, args: Vec<Value>, env: &mut Environment) -> RunResult<Value> {
        expr::call_value(self, callable, args, env)
    }

    /// Materializes any iterable `Value`, exposed for `builtins.rs` (`map`,
    /// `filter`, `zip`, `sorted`, ...).
    pub fn iterate_value(&mut self, value: &Value, env: &mut Environment, line: Line) -> RunResult<Vec<Value>> {
        self.iterate(value, env, line)
    }

    /// `str()`, exposed for `builtins.rs`.
    pub fn to_str(&mut self, value: &Value, env: &mut Environment) -> RunResult<String> {
        self.str_of(value, env)
    }

    /// `repr()`, exposed for `builtins.rs`.
    pub fn to_repr(&mut self, value: &Value, env: &mut Environment) -> RunResult<String> {
        self.repr(value, env)
    }

    /// `getattr`/`hasattr`/`setattr`'s attribute read, exposed for `builtins.rs`.
    pub fn get_attribute(&mut self, obj: &Value, attr: &str, line: Line) -> RunResult<Value> {
        self.get_attr(obj, attr, line)
    }

    /// Calls a bound/unbound method by name on a receiver, exposed for
    /// `builtins.rs` (`next()` driving an instance's `__next__`).
    pub fn call_method_value(&mut self, receiver: &Value, name: &str, args: Vec<Value>, env: &mut Environment) -> RunResult<Value> {
        self.call_method(receiver, name, args, env)
    }
}

fn rest_as_rc(stmts: &[Stmt], from: usize) -> Rc<[Stmt]> {
    Rc::from(stmts[from..].to_vec())
}
