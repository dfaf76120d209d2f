//! Core API: compile, run, and the suspend/resume driver, per spec.md §4.7.
//!
//! [`run`] is the simplest entry point: parse, execute a module's top-level
//! body to completion, surface the first raised exception as an [`Error`].
//! [`Runner`] is the statement-by-statement driver underneath it, the thing
//! that actually makes `suspend()` (§5) resumable: it advances
//! `module.body` one top-level statement at a time so that when a
//! `RunError::Suspended` escapes arbitrarily-nested evaluation, the driver
//! always knows exactly which statement to resume from next. This is
//! deliberately coarser than capturing an arbitrary mid-expression
//! continuation (this tree-walking evaluator has no VM frames to snapshot
//! at arbitrary points) — see DESIGN.md.

use std::{
    collections::HashMap,
    rc::Rc,
    time::{Duration, Instant},
};

use crate::{
    ast::{AssignTarget, Module, Stmt},
    capability::CapabilitySet,
    context::{Context, Event, EventKind, ProfileCounters},
    environment::Environment,
    evaluator::{Flow, Interpreter},
    exception::{ExcType, Exception, RunError},
    heap::HeapData,
    intern::StringId,
    io::{CapturingPrint, FilesystemBackend, InMemoryFs, PrintWriter},
    object::RouteEntry,
    parser::{self, ParseError},
    resource::{LimitedTracker, ResourceLimits, ResourceTracker},
    tracer::{NoopTracer, VmTracer},
    value::Value,
};

/// A run that never sets a deadline still runs under a [`LimitedTracker`]
/// internally, with the budget set far past anything a real program would
/// hit, so `Runner`/`run` don't need a second tracker type just to express
/// "unlimited".
pub(crate) const UNLIMITED_DEADLINE: Duration = Duration::from_secs(365 * 24 * 3600);

/// The Core API's flattened error taxonomy, per spec.md §7/§4.7.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Syntax,
    Runtime,
    Timeout,
    Io,
    Network,
    Permission,
    Import,
    Validation,
    RouteNotFound,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorKind::Syntax => "syntax",
            ErrorKind::Runtime => "runtime",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Io => "io",
            ErrorKind::Network => "network",
            ErrorKind::Permission => "permission",
            ErrorKind::Import => "import",
            ErrorKind::Validation => "validation",
            ErrorKind::RouteNotFound => "route_not_found",
        };
        f.write_str(s)
    }
}

/// A Core API-level failure: a classified kind, a human-readable message,
/// and (when it originated from a raised Python exception) the class name
/// that was raised.
#[derive(Debug, Clone)]
pub struct Error {
    pub kind: ErrorKind,
    pub message: String,
    pub exception_class: Option<String>,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for Error {}

impl From<ParseError> for Error {
    fn from(e: ParseError) -> Self {
        Error { kind: ErrorKind::Syntax, message: e.to_string(), exception_class: None }
    }
}

/// Maps a raised exception's class to the Core API's flattened error kind.
#[must_use]
pub fn classify(exc_type: ExcType) -> ErrorKind {
    match exc_type {
        ExcType::IOError | ExcType::FileNotFoundError => ErrorKind::Io,
        ExcType::NetworkError => ErrorKind::Network,
        ExcType::PermissionError => ErrorKind::Permission,
        ExcType::ImportError | ExcType::ModuleNotFoundError => ErrorKind::Import,
        ExcType::TimeoutError => ErrorKind::Timeout,
        _ => ErrorKind::Runtime,
    }
}

impl From<Exception> for Error {
    fn from(exc: Exception) -> Self {
        Error {
            kind: classify(exc.exc_type),
            message: exc.full_message(),
            exception_class: Some(exc.class_name.clone()),
        }
    }
}

impl From<RunError> for Error {
    fn from(err: RunError) -> Self {
        match err {
            RunError::Raised(exc) | RunError::Timeout(exc) => exc.into(),
            RunError::Suspended(_) => Error {
                kind: ErrorKind::Runtime,
                message: "suspend() was called but this run has no driver able to resume it".into(),
                exception_class: None,
            },
        }
    }
}

/// Parses `source` into a [`Module`], the AST [`run`]/[`Runner`] execute.
///
/// # Errors
/// Returns `Error { kind: ErrorKind::Syntax, .. }` if `source` doesn't parse.
pub fn compile(source: &str) -> Result<Module, Error> {
    parser::parse(source).map_err(Error::from)
}

/// Joins every recorded `print()` event's text, the "output extractor"
/// spec.md §4.7 names: the text a host would have seen on stdout, assembled
/// from the context's event log rather than from whichever [`PrintWriter`]
/// happened to be configured.
#[must_use]
pub fn output_of(events: &[Event]) -> String {
    events
        .iter()
        .filter_map(|e| match &e.kind {
            EventKind::Output { text } => Some(text.as_str()),
            _ => None,
        })
        .collect()
}

/// Per-run configuration bundling everything [`run`]/[`Runner`] need beyond
/// the source text itself.
pub struct RunConfig<FS: FilesystemBackend> {
    pub limits: ResourceLimits,
    pub capabilities: CapabilitySet,
    pub filesystem: FS,
    pub tracer: Box<dyn VmTracer>,
    pub print: Box<dyn PrintWriter>,
    pub profile: bool,
}

impl Default for RunConfig<InMemoryFs> {
    /// The sandboxed default: no capabilities, no host filesystem, output
    /// captured in memory rather than echoed anywhere.
    fn default() -> Self {
        Self {
            limits: ResourceLimits::default(),
            capabilities: CapabilitySet::none(),
            filesystem: InMemoryFs::new(),
            tracer: Box::new(NoopTracer),
            print: Box::new(CapturingPrint::default()),
            profile: false,
        }
    }
}

/// Compute time, wall time, and event-log counters for a completed run, per
/// spec.md §4.7/§6. `profile` is populated only when [`RunConfig::profile`]
/// (or [`Runner::enable_profiling`]) was set, mirroring the teacher's
/// `ProfilingTracer::report()`.
#[derive(Debug, Clone)]
pub struct Telemetry {
    pub compute_time: Duration,
    pub wall_time: Duration,
    pub event_count: usize,
    pub file_op_count: usize,
    pub profile: Option<ProfileReport>,
}

/// Per-line and per-function counters collected during a profiled run.
#[derive(Debug, Clone, Default)]
pub struct ProfileReport {
    pub line_hits: HashMap<u32, u64>,
    pub call_counts: HashMap<String, u64>,
    pub inclusive_time: HashMap<String, Duration>,
}

impl From<ProfileCounters> for ProfileReport {
    fn from(counters: ProfileCounters) -> Self {
        Self {
            line_hits: counters.line_hits,
            call_counts: counters.call_counts,
            inclusive_time: counters.inclusive_time,
        }
    }
}

/// What driving a [`Runner`] one step produced.
pub enum RunProgress {
    Complete(Value),
    Suspended(Snapshot),
}

/// An opaque token identifying a specific suspension of a [`Runner`].
///
/// Unlike the teacher's `Snapshot<T>` (a fully `postcard`-serialized,
/// cross-process copy of the whole VM), this is a lightweight in-process
/// handle: the `Runner` itself keeps the live interpreter/environment state
/// across a suspend, and a `Snapshot` only carries the suspended value plus
/// a generation counter checked against the `Runner`'s own, so a stale or
/// mismatched snapshot is rejected rather than silently resuming the wrong
/// suspension. See DESIGN.md for why: `Environment`'s scopes are
/// `Rc<RefCell<_>>` chains that aren't meaningfully `Serialize`-able without
/// serializing the whole heap arena alongside them.
#[derive(Debug, Clone)]
pub struct Snapshot {
    generation: u64,
    value: Value,
}

impl Snapshot {
    /// The value passed to `suspend(...)` that produced this snapshot.
    #[must_use]
    pub fn value(&self) -> &Value {
        &self.value
    }
}

/// Drives a compiled [`Module`]'s top-level body one statement at a time,
/// so a `suspend()` call partway through can hand control back to the host
/// and be resumed later without re-running anything already executed.
pub struct Runner<R: ResourceTracker, FS: FilesystemBackend> {
    interp: Interpreter<R, FS>,
    env: Environment,
    body: Rc<[Stmt]>,
    next_index: usize,
    generation: u64,
    wall_start: Instant,
}

impl<R: ResourceTracker, FS: FilesystemBackend> Runner<R, FS> {
    /// Parses `source` and builds a runner ready to `start()`.
    ///
    /// # Errors
    /// Returns `Error { kind: ErrorKind::Syntax, .. }` if `source` doesn't parse.
    pub fn new(
        source: &str,
        tracker: R,
        filesystem: FS,
        capabilities: CapabilitySet,
        max_recursion_depth: usize,
        tracer: Box<dyn VmTracer>,
        print: Box<dyn PrintWriter>,
    ) -> Result<Self, Error> {
        let module = compile(source)?;
        let ctx = Context::new(tracker, filesystem, capabilities, max_recursion_depth);
        Ok(Self {
            interp: Interpreter::new(ctx, tracer, print),
            env: Environment::new(),
            body: Rc::from(module.body),
            next_index: 0,
            generation: 0,
            wall_start: Instant::now(),
        })
    }

    pub fn enable_profiling(&mut self) {
        self.interp.ctx.enable_profiling();
    }

    /// Begins execution. Returns `RunProgress::Suspended` the first time a
    /// `suspend()` call is reached, or `RunProgress::Complete` if the
    /// program runs to the end (or hits a top-level `return`) without one.
    ///
    /// # Errors
    /// Returns `Error` if a raised exception escapes every `except` clause,
    /// or if the compute deadline is exceeded.
    pub fn start(&mut self) -> Result<RunProgress, Error> {
        self.drive()
    }

    /// Resumes a run previously paused by `suspend()`, feeding `value` back
    /// as that call's return value and, if the suspended statement was a
    /// bare `x = suspend(...)`, binding it to `x` before continuing.
    ///
    /// Other assignment shapes (`a, b = suspend(...)`, `d[k] = suspend(...)`,
    /// or `suspend()` nested inside a larger expression) discard the resume
    /// value, the same way any other expression statement's value is
    /// discarded — a documented scope limitation rather than a silent bug
    /// (see DESIGN.md).
    ///
    /// # Errors
    /// Returns `Error { kind: ErrorKind::Validation, .. }` if `snapshot`
    /// doesn't match this runner's current suspension (e.g. it was already
    /// consumed, or came from a different `Runner`).
    pub fn resume(&mut self, snapshot: Snapshot, value: Value) -> Result<RunProgress, Error> {
        if snapshot.generation != self.generation {
            return Err(Error {
                kind: ErrorKind::Validation,
                message: "snapshot does not match this runner's current suspension".into(),
                exception_class: None,
            });
        }
        if let Some(Stmt::Assign { target: AssignTarget::Name(name), .. }) = self.body.get(self.next_index.saturating_sub(1)) {
            let id = self.interp.intern(name);
            self.env.smart_put(id, value);
        }
        self.drive()
    }

    fn drive(&mut self) -> Result<RunProgress, Error> {
        while self.next_index < self.body.len() {
            self.interp.check_deadline().map_err(Error::from)?;
            let index = self.next_index;
            self.next_index += 1;
            match self.interp.eval_stmt(&self.body[index], &mut self.env) {
                Ok(Flow::Return(value)) => return Ok(RunProgress::Complete(value)),
                Ok(_) => {}
                Err(RunError::Suspended(value)) => {
                    let _ = self.interp.ctx.record(EventKind::Suspend);
                    self.generation += 1;
                    return Ok(RunProgress::Suspended(Snapshot { generation: self.generation, value }));
                }
                Err(other) => return Err(other.into()),
            }
        }
        Ok(RunProgress::Complete(Value::None))
    }

    #[must_use]
    pub fn telemetry(&self) -> Telemetry {
        Telemetry {
            compute_time: self.interp.ctx.compute_elapsed(),
            wall_time: self.wall_start.elapsed(),
            event_count: self.interp.ctx.events().len(),
            file_op_count: self.interp.ctx.events().iter().filter(|e| matches!(e.kind, EventKind::FileOp { .. })).count(),
            profile: self.interp.ctx.profile.clone().map(ProfileReport::from),
        }
    }

    #[must_use]
    pub fn output(&self) -> String {
        output_of(self.interp.ctx.events())
    }

    /// Number of events recorded so far, used by a host that wants
    /// `output_since` to report only what a particular call produced instead
    /// of this runner's entire lifetime of output.
    #[must_use]
    pub fn event_count(&self) -> usize {
        self.interp.ctx.events().len()
    }

    /// `print()` output recorded starting at event index `from`, as obtained
    /// from an earlier `event_count()` call.
    #[must_use]
    pub fn output_since(&self, from: usize) -> String {
        output_of(&self.interp.ctx.events()[from..])
    }

    /// Replaces the statement body this runner drives next, keeping its
    /// interpreter and environment — heap, globals, call state — intact.
    /// Used by a REPL-style host that feeds one code snippet at a time to a
    /// persisting session.
    ///
    /// # Errors
    /// Returns `Error { kind: ErrorKind::Syntax, .. }` if `source` doesn't parse.
    pub fn load(&mut self, source: &str) -> Result<(), Error> {
        let module = compile(source)?;
        self.body = Rc::from(module.body);
        self.next_index = 0;
        Ok(())
    }

    /// Copies this runner's current global bindings, used by a session's
    /// undo history to capture a restorable point before each `execute`.
    #[must_use]
    pub fn snapshot_globals(&self) -> Vec<(StringId, Value)> {
        self.env.snapshot_globals()
    }

    /// Restores global bindings captured by `snapshot_globals`. Does not
    /// undo mutations to shared heap containers (lists, dicts, instances)
    /// made after the snapshot was taken — only which names are bound to
    /// which values (see DESIGN.md).
    pub fn restore_globals(&mut self, bindings: Vec<(StringId, Value)>) {
        self.env.restore_globals(bindings);
    }

    /// Reads a global variable by name, for a host inspecting a session
    /// between `execute` calls.
    #[must_use]
    pub fn get_global(&mut self, name: &str) -> Option<Value> {
        let id = self.interp.intern(name);
        self.env.get(id)
    }

    /// Binds a global variable by name, for a host seeding a session with
    /// input values before `execute`.
    pub fn set_global(&mut self, name: &str, value: Value) {
        let id = self.interp.intern(name);
        self.env.put_global(id, value);
    }

    /// Names currently bound in the global scope, for a host listing a
    /// session's variables.
    #[must_use]
    pub fn global_names(&self) -> Vec<StringId> {
        self.env.snapshot_globals().into_iter().map(|(k, _)| k).collect()
    }

    /// Resolves an interned name back to its source text.
    #[must_use]
    pub fn resolve_name(&self, id: StringId) -> &str {
        self.interp.interner.resolve(id)
    }

    /// `str(value)`, for a host printing a result (e.g. a REPL echoing the
    /// value of a completed run). Falls back to `{value:?}` if the
    /// conversion itself raises (a `__str__` override is allowed to).
    #[must_use]
    pub fn describe(&mut self, value: &Value) -> String {
        self.interp.to_str(value, &mut self.env).unwrap_or_else(|_| format!("{value:?}"))
    }
}

impl<FS: FilesystemBackend> Runner<LimitedTracker, FS> {
    /// Builds a runner from a [`RunConfig`], translating `limits.deadline`
    /// into the internal [`LimitedTracker`] budget (a missing deadline maps
    /// to [`UNLIMITED_DEADLINE`] rather than needing a second tracker type).
    ///
    /// # Errors
    /// Returns `Error { kind: ErrorKind::Syntax, .. }` if `source` doesn't parse.
    pub fn from_config(source: &str, config: RunConfig<FS>) -> Result<Self, Error> {
        let deadline = config.limits.deadline.unwrap_or(UNLIMITED_DEADLINE);
        let mut runner = Self::new(
            source,
            LimitedTracker::new(deadline),
            config.filesystem,
            config.capabilities,
            config.limits.max_recursion_depth,
            config.tracer,
            config.print,
        )?;
        if config.profile {
            runner.enable_profiling();
        }
        Ok(runner)
    }
}

/// Runs `source` to completion, per spec.md §4.7.
///
/// A `suspend()` call with no driver able to resume it (this function
/// always drives straight through) surfaces as an `Error`; use [`Runner`]
/// directly for programs that suspend.
///
/// # Errors
/// Returns `Error` on a parse failure, an uncaught raised exception, a
/// compute-deadline overrun, or an unresolvable `suspend()`.
pub fn run<FS: FilesystemBackend>(source: &str, config: RunConfig<FS>) -> Result<Value, Error> {
    run_with_telemetry(source, config).map(|(value, _)| value)
}

/// Like [`run`], but also returns the run's [`Telemetry`].
///
/// # Errors
/// Same as [`run`].
pub fn run_with_telemetry<FS: FilesystemBackend>(source: &str, config: RunConfig<FS>) -> Result<(Value, Telemetry), Error> {
    let mut runner = Runner::from_config(source, config)?;
    match runner.start()? {
        RunProgress::Complete(value) => Ok((value, runner.telemetry())),
        RunProgress::Suspended(_) => Err(Error {
            kind: ErrorKind::Runtime,
            message: "suspend() was called but this run has no driver able to resume it".into(),
            exception_class: None,
        }),
    }
}

/// Dispatches an HTTP-style `{method, path}` request to the first matching
/// route registered (via the `{register_route}` decorator sentinel, see
/// `builtins.rs`/`evaluator/classes.rs`) on `instance`'s class or one of its
/// ancestors.
///
/// The HTTP transport itself (listening on a socket, parsing a request)
/// stays out of scope per spec.md §1; this is the piece that *is* in scope:
/// resolving a `(method, path)` pair against a routed object's class MRO and
/// invoking the matched handler.
///
/// # Errors
/// Returns `Error { kind: ErrorKind::RouteNotFound, .. }` if no route
/// matches, or whatever error the handler itself raises.
pub fn dispatch_route<R: ResourceTracker, FS: FilesystemBackend>(
    interp: &mut Interpreter<R, FS>,
    instance: &Value,
    method: &str,
    path: &str,
    env: &mut Environment,
) -> Result<Value, Error> {
    let Value::Instance(instance_id) = instance else {
        return Err(Error {
            kind: ErrorKind::RouteNotFound,
            message: "not a routable object".into(),
            exception_class: None,
        });
    };
    let HeapData::Instance(body) = interp.heap.get(*instance_id) else { unreachable!() };
    let HeapData::Class(class) = interp.heap.get(body.class) else { unreachable!() };
    let handler: Option<Value> = class.mro.iter().find_map(|&ancestor| {
        let HeapData::Class(c) = interp.heap.get(ancestor) else { return None };
        find_route(&c.routes, method, path)
    });
    let Some(handler) = handler else {
        return Err(Error {
            kind: ErrorKind::RouteNotFound,
            message: format!("no route registered for {method} {path}"),
            exception_class: None,
        });
    };
    interp.call(&handler, Vec::new(), env).map_err(Error::from)
}

fn find_route(routes: &[RouteEntry], method: &str, path: &str) -> Option<Value> {
    routes.iter().find(|r| r.method.eq_ignore_ascii_case(method) && r.path == path).map(|r| r.handler.clone())
}

#[cfg(test)]
mod tests {
    use num_bigint::BigInt;

    use super::*;
    use crate::io::InMemoryFs;

    fn as_int(value: &Value) -> BigInt {
        match value {
            Value::Int(n) => n.clone(),
            other => panic!("expected an int, got {}", other.type_name()),
        }
    }

    #[test]
    fn run_evaluates_a_simple_expression() {
        let config = RunConfig::default();
        let value = run("x = 1 + 2\n", config).unwrap();
        assert!(matches!(value, Value::None));
    }

    #[test]
    fn run_returns_the_value_of_a_top_level_return() {
        let config = RunConfig::default();
        let value = run("return 1 + 2\n", config).unwrap();
        assert_eq!(as_int(&value), BigInt::from(3));
    }

    #[test]
    fn syntax_error_is_classified_as_syntax() {
        let config = RunConfig::default();
        let err = run("def (:\n", config).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Syntax);
    }

    #[test]
    fn uncaught_exception_is_classified_by_type() {
        let config = RunConfig::default();
        let err = run("raise ValueError('boom')\n", config).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Runtime);
        assert_eq!(err.exception_class.as_deref(), Some("ValueError"));
    }

    #[test]
    fn output_of_joins_print_events() {
        let config = RunConfig::default();
        let (_, telemetry) = run_with_telemetry("print('a')\nprint('b')\n", config).unwrap();
        assert!(telemetry.event_count >= 2);
    }

    #[test]
    fn suspend_pauses_and_resumes_with_a_bound_value() {
        let config: RunConfig<InMemoryFs> = RunConfig::default();
        let deadline = config.limits.deadline.unwrap_or(UNLIMITED_DEADLINE);
        let mut runner = Runner::new(
            "x = suspend(1)\nreturn x + 1\n",
            LimitedTracker::new(deadline),
            config.filesystem,
            config.capabilities,
            config.limits.max_recursion_depth,
            config.tracer,
            config.print,
        )
        .unwrap();
        let progress = runner.start().unwrap();
        let RunProgress::Suspended(snapshot) = progress else { panic!("expected a suspension") };
        assert_eq!(as_int(snapshot.value()), BigInt::from(1));
        let progress = runner.resume(snapshot, Value::Int(41.into())).unwrap();
        let RunProgress::Complete(value) = progress else { panic!("expected completion") };
        assert_eq!(as_int(&value), BigInt::from(42));
    }

    #[test]
    fn resuming_with_a_stale_snapshot_is_rejected() {
        let config: RunConfig<InMemoryFs> = RunConfig::default();
        let deadline = config.limits.deadline.unwrap_or(UNLIMITED_DEADLINE);
        let mut runner = Runner::new(
            "x = suspend(1)\ny = suspend(2)\nreturn x + y\n",
            LimitedTracker::new(deadline),
            config.filesystem,
            config.capabilities,
            config.limits.max_recursion_depth,
            config.tracer,
            config.print,
        )
        .unwrap();
        let RunProgress::Suspended(first) = runner.start().unwrap() else { panic!("expected a suspension") };
        let _ = runner.resume(first.clone(), Value::Int(1.into())).unwrap();
        let err = runner.resume(first, Value::Int(1.into())).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }

    #[test]
    fn route_not_found_when_no_route_matches() {
        let mut interp = test_interpreter();
        let mut env = Environment::new();
        let class_id = interp.heap.alloc(HeapData::Class(crate::object::ClassBody {
            name: interp.intern("Widget"),
            bases: Vec::new(),
            mro: Vec::new(),
            attrs: indexmap::IndexMap::new(),
            routes: Vec::new(),
        }));
        let HeapData::Class(class) = interp.heap.get_mut(class_id) else { unreachable!() };
        class.mro = vec![class_id];
        let instance_id = interp.heap.alloc(HeapData::Instance(crate::object::InstanceBody {
            class: class_id,
            attrs: indexmap::IndexMap::new(),
        }));
        let err = dispatch_route(&mut interp, &Value::Instance(instance_id), "GET", "/", &mut env).unwrap_err();
        assert_eq!(err.kind, ErrorKind::RouteNotFound);
    }

    fn test_interpreter() -> Interpreter<crate::resource::NoLimitTracker, InMemoryFs> {
        let ctx = Context::new(crate::resource::NoLimitTracker::default(), InMemoryFs::new(), CapabilitySet::none(), 1000);
        Interpreter::new(ctx, Box::new(NoopTracer), Box::new(CapturingPrint::default()))
    }
}
