//! Statement execution, function calls, and assignment targets, per
//! spec.md §4.6 "Statements"/"Calls"/"Assignment".

use std::rc::Rc;

use indexmap::IndexMap;

use crate::{
    ast::{AssignTarget, Line, Params, Stmt},
    context::EventKind,
    environment::Environment,
    exception::{ExcType, Exception, RunError, RunResult, StackFrame},
    heap::HeapData,
    io::FilesystemBackend,
    object::RouteEntry,
    resource::ResourceTracker,
    types::ContFrame,
    value::{FunctionValue, PyKey, Value},
};

use super::{expr::call_value_kw, loc, Flow, Interpreter};

impl<R: ResourceTracker, FS: FilesystemBackend> Interpreter<R, FS> {
    pub fn eval_stmt(&mut self, stmt: &Stmt, env: &mut Environment) -> RunResult<Flow> {
        match stmt {
            Stmt::Assign { target, value, line: _ } => {
                let v = self.eval_expr(value, env)?;
                self.bind_target(target, v, env)?;
                Ok(Flow::Normal)
            }
            Stmt::ChainedAssign { targets, value, line: _ } => {
                let v = self.eval_expr(value, env)?;
                for target in targets {
                    self.bind_target(target, v.clone(), env)?;
                }
                Ok(Flow::Normal)
            }
            Stmt::AugAssign { target, op, value, line } => {
                let current = self.read_target(target, env, *line)?;
                let rhs = self.eval_expr(value, env)?;
                let result = super::operators::binop(self, *op, current, rhs, env)?;
                self.bind_target(target, result, env)?;
                Ok(Flow::Normal)
            }
            Stmt::AnnotatedAssign { target, annotation: _, value, line: _ } => {
                if let Some(value) = value {
                    let v = self.eval_expr(value, env)?;
                    self.bind_target(target, v, env)?;
                }
                Ok(Flow::Normal)
            }
            Stmt::Def { name, params, body, decorators, is_generator, line } => {
                let func = self.make_function(name, params, body, *is_generator, decorators, env, *line)?;
                let id = self.intern(name);
                env.put(id, func);
                Ok(Flow::Normal)
            }
            Stmt::Class { name, bases, body, decorators, line } => {
                let class = super::classes::define_class(self, name, bases, body, decorators, *line, env)?;
                let id = self.intern(name);
                env.put(id, class);
                Ok(Flow::Normal)
            }
            Stmt::If { clauses, orelse, line: _ } => {
                for clause in clauses {
                    let t = self.eval_expr(&clause.test, env)?;
                    if super::operators::truthy(self, &t, env)? {
                        return self.eval_block(&clause.body, env);
                    }
                }
                self.eval_block(orelse, env)
            }
            Stmt::While { test, body, orelse, line: _ } => {
                let body_rc: Rc<[Stmt]> = Rc::from(body.clone());
                match run_while_loop(self, test, &body_rc, None, env)? {
                    Flow::Normal => self.eval_block(orelse, env),
                    Flow::Break => Ok(Flow::Normal),
                    other => Ok(other),
                }
            }
            Stmt::For { target, iter, body, orelse, line } => {
                let iterable = self.eval_expr(iter, env)?;
                let body_rc: Rc<[Stmt]> = Rc::from(body.clone());
                if let Value::Generator(id) = iterable {
                    let (items, deferred) = super::generator::drain_partial(self, id, env);
                    match run_for_loop(self, target, &body_rc, items, None, env)? {
                        Flow::Normal => match deferred {
                            Some(err) => Err(err),
                            None => self.eval_block(orelse, env),
                        },
                        Flow::Break => Ok(Flow::Normal),
                        other => Ok(other),
                    }
                } else {
                    let items = self.iterate(&iterable, env, *line)?;
                    match run_for_loop(self, target, &body_rc, items, None, env)? {
                        Flow::Normal => self.eval_block(orelse, env),
                        Flow::Break => Ok(Flow::Normal),
                        other => Ok(other),
                    }
                }
            }
            Stmt::Try { .. } => super::exceptions::eval_try(self, stmt, env),
            Stmt::Raise { exc, cause, line } => super::exceptions::eval_raise(self, exc.as_ref(), cause.as_ref(), *line, env),
            Stmt::Return { value, line: _ } => {
                let v = match value {
                    Some(e) => self.eval_expr(e, env)?,
                    None => Value::None,
                };
                Ok(Flow::Return(v))
            }
            Stmt::Yield { value, line: _ } => {
                let v = match value {
                    Some(e) => self.eval_expr(e, env)?,
                    None => Value::None,
                };
                self.yield_value(v)
            }
            Stmt::YieldFrom { value, line } => {
                let iterable = self.eval_expr(value, env)?;
                let items = self.iterate(&iterable, env, *line)?;
                for item in items {
                    self.yield_value(item)?;
                }
                Ok(Flow::Normal)
            }
            Stmt::Import { modules, line } => {
                for (module_path, alias) in modules {
                    let value = crate::modules::import_module(self, module_path, *line)?;
                    let bind_name = alias.clone().unwrap_or_else(|| module_path.split('.').next().unwrap_or(module_path).to_owned());
                    let id = self.intern(&bind_name);
                    env.put(id, value);
                }
                Ok(Flow::Normal)
            }
            Stmt::FromImport { module, names, line } => {
                let module_value = crate::modules::import_module(self, module, *line)?;
                for (name, alias) in names {
                    let attr = self.get_module_attr(&module_value, name, *line)?;
                    let bind_name = alias.clone().unwrap_or_else(|| name.clone());
                    let id = self.intern(&bind_name);
                    env.put(id, attr);
                }
                Ok(Flow::Normal)
            }
            Stmt::With { items, body, line } => super::exceptions::eval_with(self, items, body, *line, env),
            Stmt::Match { subject, cases, line } => super::patterns::eval_match(self, subject, cases, *line, env),
            Stmt::Del { targets, line } => {
                for t in targets {
                    self.eval_del(t, env, *line)?;
                }
                Ok(Flow::Normal)
            }
            Stmt::Assert { test, msg, line } => {
                let t = self.eval_expr(test, env)?;
                if !super::operators::truthy(self, &t, env)? {
                    let message = match msg {
                        Some(m) => {
                            let v = self.eval_expr(m, env)?;
                            self.str_of(&v, env)?
                        }
                        None => String::new(),
                    };
                    return Err(self.raise(Exception::new(ExcType::AssertionError, message).with_frame(loc(*line))));
                }
                Ok(Flow::Normal)
            }
            Stmt::Global { names, line: _ } => {
                for name in names {
                    let id = self.intern(name);
                    env.declare_global(id);
                }
                Ok(Flow::Normal)
            }
            Stmt::Nonlocal { names, line } => {
                for name in names {
                    let id = self.intern(name);
                    env.declare_nonlocal(id).map_err(|e| self.raise(e.with_frame(loc(*line))))?;
                }
                Ok(Flow::Normal)
            }
            Stmt::Pass => Ok(Flow::Normal),
            Stmt::Break => Ok(Flow::Break),
            Stmt::Continue => Ok(Flow::Continue),
            Stmt::Expr { value, line: _ } => {
                self.eval_expr(value, env)?;
                Ok(Flow::Normal)
            }
        }
    }

    /// Produces either a true suspension (`Defer`/`DeferInner`) or an
    /// in-place accumulation, depending on the generator mode the current
    /// call is being driven in; `None` mode means this is a plain (non-
    /// generator) evaluation context where `yield` cannot appear.
    fn yield_value(&mut self, value: Value) -> RunResult<Flow> {
        match self.ctx.generator_mode {
            crate::context::GeneratorMode::Accumulate => {
                self.ctx.accumulator.push(value);
                Ok(Flow::Normal)
            }
            crate::context::GeneratorMode::Defer | crate::context::GeneratorMode::DeferInner => Ok(Flow::Yield { value, frames: Vec::new() }),
            crate::context::GeneratorMode::None => Err(self.raise(Exception::new(ExcType::SyntaxError, "'yield' outside function"))),
        }
    }

    fn make_function(
        &mut self,
        name: &str,
        params: &Params,
        body: &[Stmt],
        is_generator: bool,
        decorators: &[crate::ast::Expr],
        env: &mut Environment,
        line: Line,
    ) -> RunResult<Value> {
        let name_id = self.intern(name);
        let mut func = Value::Function(Rc::new(FunctionValue {
            name: name_id,
            params: Rc::new(params.clone()),
            body: Rc::from(body.to_vec()),
            captured_env: env.propagate_scopes(),
            is_generator,
            decorators: Rc::from(decorators.to_vec()),
        }));
        for decorator in decorators.iter().rev() {
            let decorator_fn = self.eval_expr(decorator, env)?;
            func = call_value_kw(self, &decorator_fn, vec![func], Vec::new(), env).map_err(|e| attach(e, line))?;
            if let Some((route, handler)) = route_sentinel(self, &func) {
                self.pending_routes.push(route);
                func = handler;
            }
        }
        Ok(func)
    }

    /// Calls a plain (non-generator) function, pushing a fresh call    /// environment over its closure's captured scopes.
    pub(super) fn call_function(&mut self, f: &Rc<FunctionValue>, args: Vec<Value>, kwargs: Vec<(String, Value)>, env: &mut Environment) -> RunResult<Value> {
        self.call_function_with_defining_class(f, args, kwargs, None, env)
    }

    pub(super) fn call_function_with_defining_class(
        &mut self,
        f: &Rc<FunctionValue>,
        args: Vec<Value>,
        kwargs: Vec<(String, Value)>,
        defining_class: Option<crate::heap::HeapId>,
        _env: &mut Environment,
    ) -> RunResult<Value> {
        self.ctx.call_depth += 1;
        if self.ctx.call_depth > self.ctx.max_call_depth {
            self.ctx.call_depth -= 1;
            let err = crate::resource::ResourceError::Recursion { limit: self.ctx.max_call_depth, depth: self.ctx.call_depth }.to_exception();
            return Err(self.raise(err));
        }
        let mut call_env = Environment::merge_closure_scopes(&f.captured_env);
        if let Err(e) = self.bind_params(&f.params, &args, &kwargs, &mut call_env) {
            self.ctx.call_depth -= 1;
            return Err(e);
        }
        if let Some(instance) = args.first() {
            let self_id = self.intern("__self__");
            call_env.put(self_id, instance.clone());
        }
        if let Some(class_id) = defining_class {
            let class_attr = self.intern("__defining_class__");
            call_env.put(class_attr, Value::Class(class_id));
        }
        let fn_name = self.interner.resolve(f.name).to_owned();
        let _ = self.ctx.record(EventKind::CallEnter { name: fn_name.clone() });
        self.tracer.on_call_enter(&fn_name, self.ctx.call_depth);
        let result = self.eval_block(&f.body, &mut call_env);
        self.tracer.on_call_exit(&fn_name, self.ctx.call_depth);
        let _ = self.ctx.record(EventKind::CallExit { name: fn_name.clone() });
        self.ctx.call_depth -= 1;
        match result {
            Ok(Flow::Return(v)) => Ok(v),
            Ok(Flow::Yield { .. }) => Err(self.raise(Exception::new(ExcType::SyntaxError, "'yield' outside generator"))),
            Ok(_) => Ok(Value::None),
            Err(RunError::Raised(e)) => Err(RunError::Raised(e.with_frame(StackFrame { function_name: fn_name, line: 0 }))),
            Err(other) => Err(other),
        }
    }

    pub(super) fn bind_params(&mut self, params: &Params, args: &[Value], kwargs: &[(String, Value)], env: &mut Environment) -> RunResult<()> {
        let mut remaining_kwargs: Vec<(String, Value)> = kwargs.to_vec();
        let take_kw = |remaining: &mut Vec<(String, Value)>, name: &str| -> Option<Value> {
            let pos = remaining.iter().position(|(k, _)| k == name)?;
            Some(remaining.remove(pos).1)
        };
        for (i, p) in params.positional.iter().enumerate() {
            let value = if let Some(v) = args.get(i) {
                v.clone()
            } else if let Some(v) = take_kw(&mut remaining_kwargs, &p.name) {
                v
            } else if let Some(default) = &p.default {
                self.eval_expr(default, env)?
            } else {
                return Err(self.raise(Exception::new(ExcType::TypeError, format!("missing required argument: '{}'", p.name))));
            };
            let id = self.intern(&p.name);
            env.put(id, value);
        }
        let positional_count = params.positional.len();
        if let Some(name) = &params.star_args {
            let extra: Vec<Value> = args.get(positional_count..).map(<[Value]>::to_vec).unwrap_or_default();
            let id = self.intern(name);
            env.put(id, Value::Tuple(extra.into()));
        } else if args.len() > positional_count {
            return Err(self.raise(Exception::new(ExcType::TypeError, "too many positional arguments")));
        }
        for p in &params.kwonly {
            let value = if let Some(v) = take_kw(&mut remaining_kwargs, &p.name) {
                v
            } else if let Some(default) = &p.default {
                self.eval_expr(default, env)?
            } else {
                return Err(self.raise(Exception::new(ExcType::TypeError, format!("missing required keyword-only argument: '{}'", p.name))));
            };
            let id = self.intern(&p.name);
            env.put(id, value);
        }
        if let Some(name) = &params.star_kwargs {
            let mut map = IndexMap::new();
            for (k, v) in remaining_kwargs.drain(..) {
                let key = PyKey::Str(Rc::from(k.as_str()));
                map.insert(key, (Value::Str(Rc::from(k.as_str())), v));
            }
            let dict_id = self.heap.alloc(HeapData::Dict(map));
            let id = self.intern(name);
            env.put(id, Value::Dict(dict_id));
        } else if let Some((name, _)) = remaining_kwargs.first() {
            return Err(self.raise(Exception::new(ExcType::TypeError, format!("unexpected keyword argument '{name}'"))));
        }
        Ok(())
    }

    /// Reads the current value an assignment target names, used by
    /// augmented assignment (`x += 1`) before computing the new value.
    fn read_target(&mut self, target: &AssignTarget, env: &mut Environment, line: Line) -> RunResult<Value> {
        match target {
            AssignTarget::Name(name) => {
                let id = self.intern(name);
                env.get(id).ok_or_else(|| self.raise(Exception::new(ExcType::NameError, format!("name '{name}' is not defined")).with_frame(loc(line))))
            }
            AssignTarget::Subscript { object, index } => {
                let obj = self.eval_expr(object, env)?;
                let idx = self.eval_expr(index, env)?;
                self.subscript(&obj, &idx, line, env)
            }
            AssignTarget::Attribute { object, attr } => {
                let obj = self.eval_expr(object, env)?;
                self.get_attr(&obj, attr, line)
            }
            AssignTarget::Tuple { .. } => Err(self.raise(Exception::new(ExcType::SyntaxError, "cannot augment-assign a tuple target").with_frame(loc(line)))),
        }
    }

    /// Assigns `value` to `target`, per spec.md §4.6 "Assignment": plain
    /// names bind in the innermost scope (honoring `global`/`nonlocal`),
    /// tuple targets unpack (with at most one starred element), and
    /// subscript/attribute targets route to the receiver's own storage.
    pub(super) fn bind_target(&mut self, target: &AssignTarget, value: Value, env: &mut Environment) -> RunResult<()> {
        match target {
            AssignTarget::Name(name) => {
                let id = self.intern(name);
                env.smart_put(id, value);
                Ok(())
            }
            AssignTarget::Tuple { elements, star_at } => {
                let items = self.iterate(&value, env, 0)?;
                self.bind_tuple(elements, star_at, items, env)
            }
            AssignTarget::Subscript { object, index } => {
                let obj = self.eval_expr(object, env)?;
                let idx = self.eval_expr(index, env)?;
                self.assign_subscript(&obj, idx, value, env)
            }
            AssignTarget::Attribute { object, attr } => {
                let obj = self.eval_expr(object, env)?;
                self.assign_attribute(&obj, attr, value)
            }
        }
    }

    fn bind_tuple(&mut self, elements: &[AssignTarget], star_at: &Option<usize>, items: Vec<Value>, env: &mut Environment) -> RunResult<()> {
        match star_at {
            None => {
                if items.len() != elements.len() {
                    return Err(self.raise(Exception::new(
                        ExcType::ValueError,
                        format!("not enough values to unpack (expected {}, got {})", elements.len(), items.len()),
                    )));
                }
                for (target, item) in elements.iter().zip(items) {
                    self.bind_target(target, item, env)?;
                }
                Ok(())
            }
            Some(star_idx) => {
                let before = *star_idx;
                let after = elements.len() - star_idx - 1;
                if items.len() < before + after {
                    return Err(self.raise(Exception::new(ExcType::ValueError, "not enough values to unpack")));
                }
                for (target, item) in elements[..before].iter().zip(items.iter()) {
                    self.bind_target(target, item.clone(), env)?;
                }
                let middle: Vec<Value> = items[before..items.len() - after].to_vec();
                let middle_id = self.heap.alloc(HeapData::List(middle));
                self.bind_target(&elements[before], Value::List(middle_id), env)?;
                for (target, item) in elements[before + 1..].iter().zip(items[items.len() - after..].iter()) {
                    self.bind_target(target, item.clone(), env)?;
                }
                Ok(())
            }
        }
    }

    fn assign_subscript(&mut self, obj: &Value, idx: Value, value: Value, env: &mut Environment) -> RunResult<()> {
        match obj {
            Value::List(id) => {
                let HeapData::List(items) = self.heap.get(*id) else { unreachable!() };
                let len = items.len();
                let i = super::expr::normalize_index(&idx, len, 0, self)?;
                let HeapData::List(items) = self.heap.get_mut(*id) else { unreachable!() };
                items[i] = value;
                Ok(())
            }
            Value::Dict(id) => {
                let key = PyKey::from_value(&idx).map_err(|e| self.raise(e))?;
                let HeapData::Dict(map) = self.heap.get_mut(*id) else { unreachable!() };
                map.insert(key, (idx, value));
                Ok(())
            }
            Value::Instance(_) => {
                self.call_method(obj, "__setitem__", vec![idx, value], env)?;
                Ok(())
            }
            other => Err(self.raise(Exception::new(ExcType::TypeError, format!("'{}' object does not support item assignment", other.type_name())))),
        }
    }

    fn assign_attribute(&mut self, obj: &Value, attr: &str, value: Value) -> RunResult<()> {
        let name = self.intern(attr);
        match obj {
            Value::Instance(id) => {
                let HeapData::Instance(instance) = self.heap.get_mut(*id) else { unreachable!() };
                instance.attrs.insert(name, value);
                Ok(())
            }
            Value::Class(id) => {
                let HeapData::Class(class) = self.heap.get_mut(*id) else { unreachable!() };
                class.attrs.insert(name, value);
                Ok(())
            }
            other => Err(self.raise(Exception::new(ExcType::AttributeError, format!("'{}' object has no attribute '{attr}'", other.type_name())))),
        }
    }

    fn eval_del(&mut self, target: &crate::ast::Expr, env: &mut Environment, line: Line) -> RunResult<()> {
        match target {
            crate::ast::Expr::Var { name, .. } => {
                let id = self.intern(name);
                if !env.delete(id) {
                    return Err(self.raise(Exception::new(ExcType::NameError, format!("name '{name}' is not defined")).with_frame(loc(line))));
                }
                Ok(())
            }
            crate::ast::Expr::Subscript { object, index, .. } => {
                let obj = self.eval_expr(object, env)?;
                let idx = self.eval_expr(index, env)?;
                match obj {
                    Value::List(id) => {
                        let HeapData::List(items) = self.heap.get(id) else { unreachable!() };
                        let i = super::expr::normalize_index(&idx, items.len(), line, self)?;
                        let HeapData::List(items) = self.heap.get_mut(id) else { unreachable!() };
                        items.remove(i);
                        Ok(())
                    }
                    Value::Dict(id) => {
                        let key = PyKey::from_value(&idx).map_err(|e| self.raise(e))?;
                        let HeapData::Dict(map) = self.heap.get_mut(id) else { unreachable!() };
                        map.shift_remove(&key).ok_or_else(|| self.raise(Exception::new(ExcType::KeyError, "key not found")))?;
                        Ok(())
                    }
                    other => Err(self.raise(Exception::new(ExcType::TypeError, format!("cannot delete item from '{}'", other.type_name())))),
                }
            }
            crate::ast::Expr::GetAttr { object, attr, .. } => {
                let obj = self.eval_expr(object, env)?;
                let name = self.intern(attr);
                match obj {
                    Value::Instance(id) => {
                        let HeapData::Instance(instance) = self.heap.get_mut(id) else { unreachable!() };
                        instance.attrs.shift_remove(&name).ok_or_else(|| self.raise(crate::object::attribute_error("instance", attr)))?;
                        Ok(())
                    }
                    other => Err(self.raise(Exception::new(ExcType::TypeError, format!("cannot delete attribute from '{}'", other.type_name())))),
                }
            }
            _ => Err(self.raise(Exception::new(ExcType::SyntaxError, "invalid del target").with_frame(loc(line)))),
        }
    }

    fn get_module_attr(&mut self, module: &Value, name: &str, line: Line) -> RunResult<Value> {
        let Value::Instance(id) = module else {
            return Err(self.raise(Exception::new(ExcType::TypeError, "not a module").with_frame(loc(line))));
        };
        let sid = self.intern(name);
        let HeapData::Instance(instance) = self.heap.get(*id) else { unreachable!() };
        instance
            .attrs
            .get(&sid)
            .cloned()
            .ok_or_else(|| self.raise(Exception::new(ExcType::ImportError, format!("cannot import name '{name}'")).with_frame(loc(line))))
    }
}

fn attach(err: RunError, line: Line) -> RunError {
    match err {
        RunError::Raised(e) => RunError::Raised(e.with_frame(loc(line))),
        other => other,
    }
}

/// Drives a `while` loop, resuming mid-body when `resume_index` is given
/// (a suspended generator picking back up from a `ContFrame::While`).
pub(super) fn run_while_loop<R: ResourceTracker, FS: FilesystemBackend>(
    interp: &mut Interpreter<R, FS>,
    test: &crate::ast::Expr,
    body: &Rc<[Stmt]>,
    resume_index: Option<usize>,
    env: &mut Environment,
) -> RunResult<Flow> {
    if let Some(index) = resume_index {
        match interp.eval_block(&body[index..], env)? {
            Flow::Yield { value, mut frames } => {
                frames.insert(0, ContFrame::While { test: test.clone(), body: Rc::clone(body), index: 0 });
                return Ok(Flow::Yield { value, frames });
            }
            Flow::Break => return Ok(Flow::Break),
            Flow::Return(v) => return Ok(Flow::Return(v)),
            Flow::Continue | Flow::Normal => {}
        }
    }
    loop {
        interp.check_deadline()?;
        let t = interp.eval_expr(test, env)?;
        if !super::operators::truthy(interp, &t, env)? {
            return Ok(Flow::Normal);
        }
        match interp.eval_block(body, env)? {
            Flow::Yield { value, mut frames } => {
                frames.insert(0, ContFrame::While { test: test.clone(), body: Rc::clone(body), index: 0 });
                return Ok(Flow::Yield { value, frames });
            }
            Flow::Break => return Ok(Flow::Break),
            Flow::Return(v) => return Ok(Flow::Return(v)),
            Flow::Continue | Flow::Normal => continue,
        }
    }
}

/// Drives a `for` loop over already-materialized `items`, resuming mid-body
/// when `resume_index` is given (a suspended generator picking back up from
/// a `ContFrame::For`; the in-flight item's binding is still live in `env`).
pub(super) fn run_for_loop<R: ResourceTracker, FS: FilesystemBackend>(
    interp: &mut Interpreter<R, FS>,
    target: &AssignTarget,
    body: &Rc<[Stmt]>,
    mut items: Vec<Value>,
    resume_index: Option<usize>,
    env: &mut Environment,
) -> RunResult<Flow> {
    if let Some(index) = resume_index {
        match interp.eval_block(&body[index..], env)? {
            Flow::Yield { value, mut frames } => {
                frames.insert(0, ContFrame::For { target: target.clone(), remaining: items, body: Rc::clone(body), index: 0 });
                return Ok(Flow::Yield { value, frames });
            }
            Flow::Break => return Ok(Flow::Break),
            Flow::Return(v) => return Ok(Flow::Return(v)),
            Flow::Continue | Flow::Normal => {}
        }
    }
    while !items.is_empty() {
        interp.check_deadline()?;
        let item = items.remove(0);
        interp.bind_target(target, item, env)?;
        match interp.eval_block(body, env)? {
            Flow::Yield { value, mut frames } => {
                frames.insert(0, ContFrame::For { target: target.clone(), remaining: items, body: Rc::clone(body), index: 0 });
                return Ok(Flow::Yield { value, frames });
            }
            Flow::Break => return Ok(Flow::Break),
            Flow::Return(v) => return Ok(Flow::Return(v)),
            Flow::Continue | Flow::Normal => continue,
        }
    }
    Ok(Flow::Normal)
}

/// Recognises a decorator's return value as the `{register_route, method,
/// path, handler}` sentinel, per spec.md §4.6 "Decorators". Presence of the
/// `register_route` key is enough to trigger the special-case — the value
/// bound to it carries no meaning beyond marking the dict.
fn route_sentinel<R: ResourceTracker, FS: FilesystemBackend>(interp: &Interpreter<R, FS>, value: &Value) -> Option<(RouteEntry, Value)> {
    let Value::Dict(id) = value else { return None };
    let HeapData::Dict(map) = interp.heap.get(*id) else { return None };
    map.get(&PyKey::Str(Rc::from("register_route")))?;
    let string_at = |key: &str| match &map.get(&PyKey::Str(Rc::from(key)))?.1 {
        Value::Str(s) => Some(s.to_string()),
        _ => None,
    };
    let method = string_at("method")?;
    let path = string_at("path")?;
    let handler = map.get(&PyKey::Str(Rc::from("handler")))?.1.clone();
    Some((RouteEntry { method, path, handler: handler.clone() }, handler))
}
