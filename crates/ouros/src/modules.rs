//! Import resolution and the module registry, per spec.md §6.
//!
//! A module is represented the same way a class instance is: a
//! `Value::Instance` whose attrs are its namespace, backed by one
//! freshly-allocated, empty `module` class per import so ordinary
//! attribute-access machinery (`object::resolve_attr`) finds entries without
//! any special-casing. Resolution order, per spec: process-registered
//! modules first, then the built-in `builtins`/`math` registry, then a
//! filesystem `.py` lookup executed in a fresh child environment sharing the
//! run's heap/interner/context, finally `ImportError`.

use indexmap::IndexMap;

use crate::{
    ast::Line,
    environment::Environment,
    evaluator::Interpreter,
    exception::{ExcType, Exception, RunResult},
    heap::HeapData,
    io::FilesystemBackend,
    object::ClassBody,
    resource::ResourceTracker,
    value::{BuiltinArity, BuiltinFunction, Value},
};

/// A module a host process registers ahead of time, resolved by name before
/// the built-in registry or filesystem lookup are tried.
pub trait ModuleRegistry {
    fn name(&self) -> &str;
    fn attrs(&self) -> Vec<(&'static str, Value)>;
}

/// The `builtins` namespace itself, always importable. Its members are also
/// what name resolution falls back to for bare calls like `len(x)` (see
/// `builtins::call`); importing `builtins` just exposes the same functions
/// as attributes of a module object.
struct BuiltinsModule;

impl ModuleRegistry for BuiltinsModule {
    fn name(&self) -> &str {
        "builtins"
    }

    fn attrs(&self) -> Vec<(&'static str, Value)> {
        crate::builtins::NAMES.iter().map(|&(name, arity)| (name, Value::Builtin(BuiltinFunction { name, arity }))).collect()
    }
}

/// An illustrative external-module stub backed by `f64` std functions,
/// demonstrating the registry contract end to end. The rest of the stdlib
/// surface named in spec.md §6 is out of scope and left to host-registered
/// modules.
struct MathModule;

impl ModuleRegistry for MathModule {
    fn name(&self) -> &str {
        "math"
    }

    fn attrs(&self) -> Vec<(&'static str, Value)> {
        let func = |name| Value::Builtin(BuiltinFunction { name, arity: BuiltinArity::Plain });
        vec![
            ("sqrt", func("math.sqrt")),
            ("floor", func("math.floor")),
            ("ceil", func("math.ceil")),
            ("pow", func("math.pow")),
            ("log", func("math.log")),
            ("sin", func("math.sin")),
            ("cos", func("math.cos")),
            ("pi", Value::Float(std::f64::consts::PI)),
            ("e", Value::Float(std::f64::consts::E)),
            ("inf", Value::Float(f64::INFINITY)),
            ("nan", Value::Float(f64::NAN)),
        ]
    }
}

/// Process-registered modules plus the always-available built-in ones.
pub struct ModuleTable {
    registered: Vec<Box<dyn ModuleRegistry>>,
}

impl ModuleTable {
    #[must_use]
    pub fn with_builtins() -> Self {
        Self { registered: vec![Box::new(BuiltinsModule), Box::new(MathModule)] }
    }

    #[must_use]
    pub fn empty() -> Self {
        Self { registered: Vec::new() }
    }

    /// Registers a host-provided module, taking priority over the built-in
    /// registry if the names collide.
    pub fn register(&mut self, module: Box<dyn ModuleRegistry>) {
        self.registered.insert(0, module);
    }

    fn find(&self, name: &str) -> Option<Vec<(&'static str, Value)>> {
        self.registered.iter().find(|m| m.name() == name).map(|m| m.attrs())
    }
}

/// Resolves `import <path>`/`from <path> import ...`, per spec.md §6.
pub fn import_module<R: ResourceTracker, FS: FilesystemBackend>(interp: &mut Interpreter<R, FS>, path: &str, line: Line) -> RunResult<Value> {
    if let Some(attrs) = interp.modules.find(path) {
        return Ok(module_value(interp, attrs));
    }
    let file_path = format!("{}.py", path.replace('.', "/"));
    if interp.ctx.filesystem().exists(&file_path) {
        return import_from_filesystem(interp, &file_path, line);
    }
    Err(interp.raise(Exception::new(ExcType::ModuleNotFoundError, format!("No module named '{path}'")).with_frame(crate::evaluator::loc(line))))
}

fn module_value<R: ResourceTracker, FS: FilesystemBackend>(interp: &mut Interpreter<R, FS>, attrs: Vec<(&'static str, Value)>) -> Value {
    let mut inst_attrs = IndexMap::new();
    for (name, value) in attrs {
        let id = interp.intern(name);
        inst_attrs.insert(id, value);
    }
    Value::Instance(module_instance(interp, inst_attrs))
}

fn module_instance<R: ResourceTracker, FS: FilesystemBackend>(interp: &mut Interpreter<R, FS>, attrs: IndexMap<crate::intern::StringId, Value>) -> crate::heap::HeapId {
    let name = interp.intern("module");
    let class_id = interp.heap.alloc(HeapData::Class(ClassBody { name, bases: Vec::new(), mro: Vec::new(), attrs: IndexMap::new(), routes: Vec::new() }));
    let HeapData::Class(class) = interp.heap.get_mut(class_id) else { unreachable!() };
    class.mro = vec![class_id];
    interp.heap.alloc(HeapData::Instance(crate::object::InstanceBody { class: class_id, attrs }))
}

fn import_from_filesystem<R: ResourceTracker, FS: FilesystemBackend>(interp: &mut Interpreter<R, FS>, file_path: &str, line: Line) -> RunResult<Value> {
    let bytes = interp
        .ctx
        .filesystem()
        .read(file_path)
        .map_err(|e| interp.raise(e.with_frame(crate::evaluator::loc(line))))?;
    let source = String::from_utf8_lossy(&bytes).into_owned();
    let module = crate::parser::parse(&source).map_err(|e| {
        interp.raise(Exception::new(ExcType::ImportError, format!("error importing '{file_path}': {e}")).with_frame(crate::evaluator::loc(line)))
    })?;

    let mut module_env = Environment::new();
    module_env.push_scope();
    interp.eval_module(&module, &mut module_env)?;
    let bindings = module_env.take_top_scope_bindings();
    let attrs: IndexMap<_, _> = bindings.into_iter().collect();
    Ok(Value::Instance(module_instance(interp, attrs)))
}
