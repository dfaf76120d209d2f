//! Expression evaluation and the call mechanism, per spec.md §4.6 "Expressions"
//! and "Calls".

use std::rc::Rc;

use num_bigint::BigInt;
use num_traits::ToPrimitive;
use smallvec::SmallVec;

use crate::{
    ast::{Comprehension, Expr, FStringPart, Literal},
    environment::Environment,
    exception::{ExcType, Exception, RunError, RunResult},
    heap::HeapData,
    io::FilesystemBackend,
    methods,
    resource::ResourceTracker,
    value::{BoundMethod, FunctionValue, Value},
};

use super::Interpreter;

impl<R: ResourceTracker, FS: FilesystemBackend> Interpreter<R, FS> {
    pub fn eval_expr(&mut self, expr: &Expr, env: &mut Environment) -> RunResult<Value> {
        match expr {
            Expr::Lit { value, .. } => Ok(literal_value(value)),
            Expr::Var { name, line } => {
                let id = self.intern(name);
                if let Some(v) = env.get(id) {
                    return Ok(v);
                }
                crate::builtins::lookup(name).ok_or_else(|| {
                    self.raise(Exception::new(ExcType::NameError, format!("name '{name}' is not defined")).with_frame(super::loc(*line)))
                })
            }
            Expr::Tuple { elements, .. } => Ok(Value::Tuple(self.eval_seq(elements, env)?.into())),
            Expr::List { elements, .. } => {
                let items = self.eval_seq(elements, env)?;
                Ok(Value::List(self.heap.alloc(HeapData::List(items))))
            }
            Expr::Set { elements, .. } => {
                let items = self.eval_seq(elements, env)?;
                let mut map = indexmap::IndexMap::new();
                for item in items {
                    let key = crate::value::PyKey::from_value(&item).map_err(|e| self.raise(e))?;
                    map.entry(key).or_insert(item);
                }
                Ok(Value::Set(self.heap.alloc(HeapData::Set(map))))
            }
            Expr::Dict { items, .. } => {
                let mut map = indexmap::IndexMap::new();
                for (key_expr, value_expr) in items {
                    let value = self.eval_expr(value_expr, env)?;
                    match key_expr {
                        Some(k) => {
                            let key_val = self.eval_expr(k, env)?;
                            let key = crate::value::PyKey::from_value(&key_val).map_err(|e| self.raise(e))?;
                            map.insert(key, (key_val, value));
                        }
                        None => {
                            // `**other` spread inside a dict literal.
                            if let Value::Dict(id) = value {
                                let HeapData::Dict(other) = self.heap.get(id) else { unreachable!() };
                                for (k, v) in other.clone() {
                                    map.insert(k, v);
                                }
                            }
                        }
                    }
                }
                Ok(Value::Dict(self.heap.alloc(HeapData::Dict(map))))
            }
            Expr::Call { func, args, starred, kwargs, double_star, line } => {
                self.eval_call(func, args, starred, kwargs, double_star.as_deref(), *line, env)
            }
            Expr::GetAttr { object, attr, line } => {
                let obj = self.eval_expr(object, env)?;
                self.get_attr(&obj, attr, *line)
            }
            Expr::Subscript { object, index, line } => {
                let obj = self.eval_expr(object, env)?;
                if let Expr::Slice { start, stop, step } = index.as_ref() {
                    return self.eval_slice(&obj, start.as_deref(), stop.as_deref(), step.as_deref(), env, *line);
                }
                let idx = self.eval_expr(index, env)?;
                self.subscript(&obj, &idx, *line, env)
            }
            Expr::Slice { .. } => Err(self.raise(Exception::new(ExcType::SyntaxError, "slice used outside subscript"))),
            Expr::BinOp { left, op, right, .. } => {
                let l = self.eval_expr(left, env)?;
                let r = self.eval_expr(right, env)?;
                super::operators::binop(self, *op, l, r, env)
            }
            Expr::BoolOp { op, values, .. } => self.eval_bool_op(*op, values, env),
            Expr::ChainedCompare { first, rest, .. } => self.eval_chained_compare(first, rest, env),
            Expr::UnaryOp { op, operand, .. } => {
                let v = self.eval_expr(operand, env)?;
                super::operators::unaryop(self, *op, v, env)
            }
            Expr::Ternary { test, body, orelse, .. } => {
                let t = self.eval_expr(test, env)?;
                if super::operators::truthy(self, &t, env)? {
                    self.eval_expr(body, env)
                } else {
                    self.eval_expr(orelse, env)
                }
            }
            Expr::Lambda { params, body, .. } => {
                let body_stmt = crate::ast::Stmt::Return { value: Some((**body).clone()), line: body.line() };
                let name = self.intern("<lambda>");
                Ok(Value::Function(Rc::new(FunctionValue {
                    name,
                    params: Rc::new(params.clone()),
                    body: Rc::from(vec![body_stmt]),
                    captured_env: env.propagate_scopes(),
                    is_generator: false,
                    decorators: Rc::from(Vec::new()),
                })))
            }
            Expr::FString { parts, .. } => self.eval_fstring(parts, env),
            Expr::ListComp { element, generators, .. } => {
                let items = self.eval_comprehension(element, generators, env)?;
                Ok(Value::List(self.heap.alloc(HeapData::List(items))))
            }
            Expr::SetComp { element, generators, .. } => {
                let items = self.eval_comprehension(element, generators, env)?;
                let mut map = indexmap::IndexMap::new();
                for item in items {
                    let key = crate::value::PyKey::from_value(&item).map_err(|e| self.raise(e))?;
                    map.entry(key).or_insert(item);
                }
                Ok(Value::Set(self.heap.alloc(HeapData::Set(map))))
            }
            Expr::GenExpr { element, generators, .. } => {
                let items = self.eval_comprehension(element, generators, env)?;
                Ok(Value::Tuple(items.into()))
            }
            Expr::DictComp { key, value, generators, .. } => {
                let pairs = self.eval_dict_comprehension(key, value, generators, env)?;
                let mut map = indexmap::IndexMap::new();
                for (k, v) in pairs {
                    let pk = crate::value::PyKey::from_value(&k).map_err(|e| self.raise(e))?;
                    map.insert(pk, (k, v));
                }
                Ok(Value::Dict(self.heap.alloc(HeapData::Dict(map))))
            }
            Expr::Walrus { name, value, .. } => {
                let v = self.eval_expr(value, env)?;
                let id = self.intern(name);
                env.smart_put(id, v.clone());
                Ok(v)
            }
            Expr::Starred { value, line } => Err(self.raise(
                Exception::new(ExcType::SyntaxError, "starred assignment target used as expression").with_frame(super::loc(*line)),
            )),
        }
    }

    /// Evaluates a comma-separated element list, expanding any `Expr::Starred`
    /// entries in place (list/tuple/set literals, call arguments).
    fn eval_seq(&mut self, elements: &[Expr], env: &mut Environment) -> RunResult<Vec<Value>> {
        let mut out = Vec::with_capacity(elements.len());
        for el in elements {
            if let Expr::Starred { value, line } = el {
                let v = self.eval_expr(value, env)?;
                out.extend(self.iterate(&v, env, *line)?);
            } else {
                out.push(self.eval_expr(el, env)?);
            }
        }
        Ok(out)
    }

    /// Materializes any iterable `Value` into a plain `Vec`, per spec.md
    /// §4.6's iteration protocol: native containers expand directly;
    /// instances delegate to `__iter__`/`__next__`, driven to exhaustion
    /// here since comprehensions and unpacking need the whole sequence.
    pub(super) fn iterate(&mut self, value: &Value, env: &mut Environment, line: u32) -> RunResult<Vec<Value>> {
        match value {
            Value::List(id) => {
                let HeapData::List(items) = self.heap.get(*id) else { unreachable!() };
                Ok(items.clone())
            }
            Value::Tuple(items) => Ok(items.to_vec()),
            Value::Str(s) => Ok(s.chars().map(|c| Value::Str(Rc::from(c.to_string().as_str()))).collect()),
            Value::Range(r) => Ok(r.to_vec().into_iter().map(|i| Value::Int(BigInt::from(i))).collect()),
            Value::Dict(id) => {
                let HeapData::Dict(map) = self.heap.get(*id) else { unreachable!() };
                Ok(map.values().map(|(k, _)| k.clone()).collect())
            }
            Value::Set(id) => {
                let HeapData::Set(map) = self.heap.get(*id) else { unreachable!() };
                Ok(map.values().cloned().collect())
            }
            Value::Generator(id) => super::generator::drain(self, *id, env),
            Value::Instance(id) => self.iterate_instance(*id, env, line),
            Value::Iterator(id) => {
                if let Some(inst) = self.ctx.iter_items(*id).cloned() {
                    let Value::Instance(iid) = inst else { unreachable!() };
                    return self.iterate_instance(iid, env, line);
                }
                let mut out = Vec::new();
                while let Some(v) = self.ctx.iter_next(*id) {
                    out.push(v);
                }
                Ok(out)
            }
            other => Err(self.raise(
                Exception::new(ExcType::TypeError, format!("'{}' object is not iterable", other.type_name())).with_frame(super::loc(line)),
            )),
        }
    }

    fn iterate_instance(&mut self, id: crate::heap::HeapId, env: &mut Environment, line: u32) -> RunResult<Vec<Value>> {
        let iter_name = self.intern("__iter__");
        let instance = Value::Instance(id);
        let iterator = if self.lookup_instance_attr(id, iter_name).is_some() {
            self.call_method(&instance, "__iter__", vec![], env)?
        } else {
            instance
        };
        let next_name = self.intern("__next__");
        let mut out = Vec::new();
        loop {
            self.check_deadline()?;
            let Value::Instance(iid) = &iterator else {
                return Err(self.raise(Exception::new(ExcType::TypeError, "iterator protocol requires __next__").with_frame(super::loc(line))));
            };
            if self.lookup_instance_attr(*iid, next_name).is_none() {
                return Err(self.raise(Exception::new(ExcType::TypeError, "iterator has no __next__").with_frame(super::loc(line))));
            }
            match self.call_method(&iterator, "__next__", vec![], env) {
                Ok(v) => out.push(v),
                Err(RunError::Raised(e)) if e.exc_type == ExcType::StopIteration => break,
                Err(e) => return Err(e),
            }
        }
        Ok(out)
    }

    pub(super) fn lookup_instance_attr(&self, id: crate::heap::HeapId, name: crate::intern::StringId) -> Option<Value> {
        let HeapData::Instance(instance) = self.heap.get(id) else { return None };
        crate::object::resolve_attr(instance, name, &self.heap, None).map(|(v, _)| v)
    }

    /// Calls a named method on `receiver`, which must already resolve it
    /// (used by the iteration protocol and by operator dunder dispatch).
    pub(super) fn call_method(&mut self, receiver: &Value, name: &str, args: Vec<Value>, env: &mut Environment) -> RunResult<Value> {
        let Value::Instance(id) = receiver else {
            return Err(self.raise(Exception::new(ExcType::TypeError, "call_method requires an instance")));
        };
        let sid = self.intern(name);
        let HeapData::Instance(instance) = self.heap.get(*id) else { unreachable!() };
        let Some((callable, defining_class)) = crate::object::resolve_attr(instance, sid, &self.heap, None) else {
            return Err(self.raise(crate::object::attribute_error(receiver.type_name(), name)));
        };
        let bound = Value::BoundMethod(Rc::new(BoundMethod {
            receiver: Box::new(receiver.clone()),
            callable: Box::new(callable),
            defining_class,
        }));
        call_value(self, &bound, args, env)
    }

    fn eval_bool_op(&mut self, op: crate::ast::BoolOp, values: &[Expr], env: &mut Environment) -> RunResult<Value> {
        let mut last = Value::None;
        for (i, expr) in values.iter().enumerate() {
            let v = self.eval_expr(expr, env)?;
            let truth = super::operators::truthy(self, &v, env)?;
            let short_circuit = match op {
                crate::ast::BoolOp::And => !truth,
                crate::ast::BoolOp::Or => truth,
            };
            last = v;
            if short_circuit || i == values.len() - 1 {
                return Ok(last);
            }
        }
        Ok(last)
    }

    fn eval_chained_compare(&mut self, first: &Expr, rest: &[(crate::ast::CmpOp, Expr)], env: &mut Environment) -> RunResult<Value> {
        let mut left = self.eval_expr(first, env)?;
        for (op, expr) in rest {
            let right = self.eval_expr(expr, env)?;
            if !super::operators::compare(self, *op, &left, &right, env)? {
                return Ok(Value::Bool(false));
            }
            left = right;
        }
        Ok(Value::Bool(true))
    }

    fn eval_fstring(&mut self, parts: &[FStringPart], env: &mut Environment) -> RunResult<Value> {
        let mut out = String::new();
        for part in parts {
            match part {
                FStringPart::Literal(s) => out.push_str(s),
                FStringPart::Expr { value, conversion, format_spec } => {
                    let v = self.eval_expr(value, env)?;
                    let text = self.format_value(&v, *conversion, format_spec.as_deref(), env)?;
                    out.push_str(&text);
                }
            }
        }
        Ok(Value::Str(Rc::from(out.as_str())))
    }

    fn format_value(&mut self, value: &Value, conversion: Option<char>, spec: Option<&str>, env: &mut Environment) -> RunResult<String> {
        let base = match conversion {
            Some('r') => self.repr(value, env)?,
            _ => self.str_of(value, env)?,
        };
        Ok(match spec {
            Some(s) if !s.is_empty() => apply_format_spec(value, s).unwrap_or(base),
            _ => base,
        })
    }

    /// `str()`, honoring a user class's `__str__` (falling back to `__repr__`).
    pub(super) fn str_of(&mut self, value: &Value, env: &mut Environment) -> RunResult<String> {
        if let Value::Instance(id) = value {
            let str_name = self.intern("__str__");
            if self.lookup_instance_attr(*id, str_name).is_some() {
                let result = self.call_method(value, "__str__", vec![], env)?;
                if let Value::Str(s) = result {
                    return Ok(s.to_string());
                }
            }
        }
        self.repr(value, env)
    }

    /// `repr()`, honoring a user class's `__repr__`.
    pub(super) fn repr(&mut self, value: &Value, env: &mut Environment) -> RunResult<String> {
        if let Value::Instance(id) = value {
            let repr_name = self.intern("__repr__");
            if self.lookup_instance_attr(*id, repr_name).is_some() {
                let result = self.call_method(value, "__repr__", vec![], env)?;
                if let Value::Str(s) = result {
                    return Ok(s.to_string());
                }
            }
        }
        Ok(self.display_value(value))
    }

    pub(super) fn display_value(&self, value: &Value) -> String {
        match value {
            Value::Int(i) => i.to_string(),
            Value::Float(f) => format_float(*f),
            Value::Bool(b) => if *b { "True" } else { "False" }.to_string(),
            Value::None => "None".to_string(),
            Value::Str(s) => s.to_string(),
            Value::Tuple(items) => {
                let inner: Vec<String> = items.iter().map(|v| self.repr_plain(v)).collect();
                if inner.len() == 1 {
                    format!("({},)", inner[0])
                } else {
                    format!("({})", inner.join(", "))
                }
            }
            Value::List(id) => {
                let HeapData::List(items) = self.heap.get(*id) else { unreachable!() };
                format!("[{}]", items.iter().map(|v| self.repr_plain(v)).collect::<Vec<_>>().join(", "))
            }
            Value::Dict(id) => {
                let HeapData::Dict(map) = self.heap.get(*id) else { unreachable!() };
                let parts: Vec<String> =
                    map.values().map(|(k, v)| format!("{}: {}", self.repr_plain(k), self.repr_plain(v))).collect();
                format!("{{{}}}", parts.join(", "))
            }
            Value::Set(id) => {
                let HeapData::Set(map) = self.heap.get(*id) else { unreachable!() };
                if map.is_empty() {
                    "set()".to_string()
                } else {
                    format!("{{{}}}", map.values().map(|v| self.repr_plain(v)).collect::<Vec<_>>().join(", "))
                }
            }
            Value::Range(r) => r.to_string(),
            Value::Function(f) => format!("<function {}>", self.interner_peek(f.name)),
            Value::Builtin(b) => format!("<built-in function {}>", b.name),
            Value::BoundMethod(_) => "<bound method>".to_string(),
            Value::Class(id) => {
                let HeapData::Class(c) = self.heap.get(*id) else { unreachable!() };
                format!("<class '{}'>", self.interner_peek(c.name))
            }
            Value::Instance(id) => {
                let HeapData::Instance(inst) = self.heap.get(*id) else { unreachable!() };
                let HeapData::Class(c) = self.heap.get(inst.class) else { unreachable!() };
                format!("<{} object>", self.interner_peek(c.name))
            }
            Value::FileHandle(_) => "<file>".to_string(),
            Value::Iterator(_) => "<iterator>".to_string(),
            Value::Generator(_) => "<generator object>".to_string(),
            Value::Super(_) => "<super>".to_string(),
        }
    }

    fn repr_plain(&self, value: &Value) -> String {
        if let Value::Str(s) = value {
            format!("'{s}'")
        } else {
            self.display_value(value)
        }
    }

    fn interner_peek(&self, id: crate::intern::StringId) -> &str {
        self.interner.resolve(id)
    }

    fn eval_call(
        &mut self,
        func: &Expr,
        args: &[Expr],
        starred: &[usize],
        kwargs: &[(String, Expr)],
        double_star: Option<&Expr>,
        line: u32,
        env: &mut Environment,
    ) -> RunResult<Value> {
        let callee = self.eval_expr(func, env)?;
        // Most calls pass a handful of positional/keyword arguments, so the
        // common case never touches the heap building these up.
        let mut positional: SmallVec<[Value; 4]> = SmallVec::with_capacity(args.len());
        for (i, a) in args.iter().enumerate() {
            if starred.contains(&i) {
                let v = self.eval_expr(a, env)?;
                positional.extend(self.iterate(&v, env, line)?);
            } else {
                positional.push(self.eval_expr(a, env)?);
            }
        }
        let mut named: SmallVec<[(String, Value); 4]> = SmallVec::with_capacity(kwargs.len());
        for (name, expr) in kwargs {
            named.push((name.clone(), self.eval_expr(expr, env)?));
        }
        if let Some(ds) = double_star {
            let v = self.eval_expr(ds, env)?;
            if let Value::Dict(id) = v {
                let HeapData::Dict(map) = self.heap.get(id) else { unreachable!() };
                for (_, (k, val)) in map.clone() {
                    if let Value::Str(name) = k {
                        named.push((name.to_string(), val));
                    }
                }
            }
        }
        call_value_kw(self, &callee, positional.into_vec(), named.into_vec(), env).map_err(|e| attach_frame(e, line))
    }

    pub(super) fn get_attr(&mut self, obj: &Value, attr: &str, line: u32) -> RunResult<Value> {
        match obj {
            Value::Instance(id) => {
                let name = self.intern(attr);
                let HeapData::Instance(instance) = self.heap.get(*id) else { unreachable!() };
                match crate::object::resolve_attr(instance, name, &self.heap, None) {
                    Some((value, defining_class)) => {
                        if matches!(value, Value::Function(_)) {
                            Ok(Value::BoundMethod(Rc::new(BoundMethod {
                                receiver: Box::new(obj.clone()),
                                callable: Box::new(value),
                                defining_class,
                            })))
                        } else {
                            Ok(value)
                        }
                    }
                    None => Err(self.raise(crate::object::attribute_error(obj.type_name(), attr).with_frame(super::loc(line)))),
                }
            }
            Value::Class(id) => {
                let name = self.intern(attr);
                let HeapData::Class(class) = self.heap.get(*id) else { unreachable!() };
                for ancestor in class.mro.clone() {
                    let HeapData::Class(c) = self.heap.get(ancestor) else { continue };
                    if let Some(v) = c.attrs.get(&name) {
                        return Ok(v.clone());
                    }
                }
                Err(self.raise(crate::object::attribute_error(&self.display_class_name(*id), attr).with_frame(super::loc(line))))
            }
            Value::Super(sv) => {
                let name = self.intern(attr);
                let Value::Instance(iid) = sv.instance.as_ref() else {
                    return Err(self.raise(Exception::new(ExcType::TypeError, "super() outside a method")));
                };
                for class_id in sv.remaining_mro.iter() {
                    let HeapData::Class(c) = self.heap.get(*class_id) else { continue };
                    if let Some(v) = c.attrs.get(&name) {
                        return Ok(Value::BoundMethod(Rc::new(BoundMethod {
                            receiver: Box::new(Value::Instance(*iid)),
                            callable: Box::new(v.clone()),
                            defining_class: Some(*class_id),
                        })));
                    }
                }
                Err(self.raise(Exception::new(ExcType::AttributeError, format!("'super' object has no attribute '{attr}'")).with_frame(super::loc(line))))
            }
            Value::Str(_) | Value::List(_) | Value::Tuple(_) | Value::Dict(_) | Value::Set(_) => {
                match known_method_name(obj, attr) {
                    Some(name) => Ok(Value::BoundMethod(Rc::new(BoundMethod {
                        receiver: Box::new(obj.clone()),
                        callable: Box::new(Value::Builtin(crate::value::BuiltinFunction { name, arity: crate::value::BuiltinArity::Plain })),
                        defining_class: None,
                    }))),
                    None => Err(self.raise(crate::object::attribute_error(obj.type_name(), attr).with_frame(super::loc(line)))),
                }
            }
            Value::FileHandle(handle_id) => match methods::file::known_name(attr) {
                Some(name) => Ok(Value::BoundMethod(Rc::new(BoundMethod {
                    receiver: Box::new(Value::FileHandle(*handle_id)),
                    callable: Box::new(Value::Builtin(crate::value::BuiltinFunction { name, arity: crate::value::BuiltinArity::Plain })),
                    defining_class: None,
                }))),
                None => Err(self.raise(crate::object::attribute_error("file", attr).with_frame(super::loc(line)))),
            },
            other => Err(self.raise(crate::object::attribute_error(other.type_name(), attr).with_frame(super::loc(line)))),
        }
    }

    fn display_class_name(&self, id: crate::heap::HeapId) -> String {
        let HeapData::Class(c) = self.heap.get(id) else { return "type".to_string() };
        self.interner.resolve(c.name).to_string()
    }

    fn eval_slice(
        &mut self,
        obj: &Value,
        start: Option<&Expr>,
        stop: Option<&Expr>,
        step: Option<&Expr>,
        env: &mut Environment,
        line: u32,
    ) -> RunResult<Value> {
        let to_i64 = |interp: &mut Self, e: Option<&Expr>, env: &mut Environment| -> RunResult<Option<i64>> {
            let Some(e) = e else { return Ok(None) };
            match interp.eval_expr(e, env)? {
                Value::Int(i) => Ok(i.to_i64()),
                Value::None => Ok(None),
                other => Err(interp.raise(Exception::new(ExcType::TypeError, format!("slice indices must be integers, not '{}'", other.type_name())))),
            }
        };
        let start_v = to_i64(self, start, env)?;
        let stop_v = to_i64(self, stop, env)?;
        let step_v = to_i64(self, step, env)?.unwrap_or(1);
        if step_v == 0 {
            return Err(self.raise(Exception::new(ExcType::ValueError, "slice step cannot be zero").with_frame(super::loc(line))));
        }
        match obj {
            Value::Str(s) => {
                let chars: Vec<char> = s.chars().collect();
                let indices = slice_indices(chars.len(), start_v, stop_v, step_v);
                let out: String = indices.into_iter().map(|i| chars[i]).collect();
                Ok(Value::Str(Rc::from(out.as_str())))
            }
            Value::Tuple(items) => {
                let indices = slice_indices(items.len(), start_v, stop_v, step_v);
                Ok(Value::Tuple(indices.into_iter().map(|i| items[i].clone()).collect()))
            }
            Value::List(id) => {
                let HeapData::List(items) = self.heap.get(*id) else { unreachable!() };
                let indices = slice_indices(items.len(), start_v, stop_v, step_v);
                let out: Vec<Value> = indices.into_iter().map(|i| items[i].clone()).collect();
                Ok(Value::List(self.heap.alloc(HeapData::List(out))))
            }
            other => Err(self.raise(Exception::new(ExcType::TypeError, format!("'{}' object is not subscriptable", other.type_name())).with_frame(super::loc(line)))),
        }
    }

    pub(super) fn subscript(&mut self, obj: &Value, idx: &Value, line: u32, env: &mut Environment) -> RunResult<Value> {
        if let Value::Instance(id) = obj {
            let name = self.intern("__getitem__");
            if self.lookup_instance_attr(*id, name).is_some() {
                return self.call_method(obj, "__getitem__", vec![idx.clone()], env).map_err(|e| attach_frame(e, line));
            }
        }
        match obj {
            Value::Str(s) => {
                let chars: Vec<char> = s.chars().collect();
                let i = normalize_index(idx, chars.len(), line, self)?;
                Ok(Value::Str(Rc::from(chars[i].to_string().as_str())))
            }
            Value::Tuple(items) => {
                let i = normalize_index(idx, items.len(), line, self)?;
                Ok(items[i].clone())
            }
            Value::List(id) => {
                let HeapData::List(items) = self.heap.get(*id) else { unreachable!() };
                let len = items.len();
                let i = normalize_index(idx, len, line, self)?;
                let HeapData::List(items) = self.heap.get(*id) else { unreachable!() };
                Ok(items[i].clone())
            }
            Value::Dict(id) => {
                let key = crate::value::PyKey::from_value(idx).map_err(|e| self.raise(e))?;
                let HeapData::Dict(map) = self.heap.get(*id) else { unreachable!() };
                map.get(&key).map(|(_, v)| v.clone()).ok_or_else(|| {
                    self.raise(Exception::new(ExcType::KeyError, self.display_value(idx)).with_frame(super::loc(line)))
                })
            }
            Value::Range(r) => {
                let Value::Int(i) = idx else {
                    return Err(self.raise(Exception::new(ExcType::TypeError, "range indices must be integers").with_frame(super::loc(line))));
                };
                let i = i.to_i64().unwrap_or(0);
                let i = if i < 0 { i + r.len() as i64 } else { i };
                if i < 0 || i as usize >= r.len() {
                    return Err(self.raise(Exception::new(ExcType::IndexError, "range object index out of range").with_frame(super::loc(line))));
                }
                Ok(Value::Int(BigInt::from(r.nth(i as usize))))
            }
            other => Err(self.raise(Exception::new(ExcType::TypeError, format!("'{}' object is not subscriptable", other.type_name())).with_frame(super::loc(line)))),
        }
    }

    fn eval_comprehension(&mut self, element: &Expr, generators: &[Comprehension], env: &mut Environment) -> RunResult<Vec<Value>> {
        let mut out = Vec::new();
        env.push_scope();
        let result = self.drive_comprehension(element, generators, 0, env, &mut out);
        env.drop_top_scope();
        result?;
        Ok(out)
    }

    fn drive_comprehension(
        &mut self,
        element: &Expr,
        generators: &[Comprehension],
        index: usize,
        env: &mut Environment,
        out: &mut Vec<Value>,
    ) -> RunResult<()> {
        let Some(gen) = generators.get(index) else {
            out.push(self.eval_expr(element, env)?);
            return Ok(());
        };
        let iterable = self.eval_expr(&gen.iter, env)?;
        let items = self.iterate(&iterable, env, gen.iter.line())?;
        for item in items {
            self.check_deadline()?;
            self.bind_target(&gen.target, item, env)?;
            let mut keep = true;
            for cond in &gen.ifs {
                let v = self.eval_expr(cond, env)?;
                if !super::operators::truthy(self, &v, env)? {
                    keep = false;
                    break;
                }
            }
            if keep {
                self.drive_comprehension(element, generators, index + 1, env, out)?;
            }
        }
        Ok(())
    }

    fn eval_dict_comprehension(
        &mut self,
        key: &Expr,
        value: &Expr,
        generators: &[Comprehension],
        env: &mut Environment,
    ) -> RunResult<Vec<(Value, Value)>> {
        let mut out = Vec::new();
        env.push_scope();
        let result = self.drive_dict_comprehension(key, value, generators, 0, env, &mut out);
        env.drop_top_scope();
        result?;
        Ok(out)
    }

    fn drive_dict_comprehension(
        &mut self,
        key: &Expr,
        value: &Expr,
        generators: &[Comprehension],
        index: usize,
        env: &mut Environment,
        out: &mut Vec<(Value, Value)>,
    ) -> RunResult<()> {
        let Some(gen) = generators.get(index) else {
            let k = self.eval_expr(key, env)?;
            let v = self.eval_expr(value, env)?;
            out.push((k, v));
            return Ok(());
        };
        let iterable = self.eval_expr(&gen.iter, env)?;
        let items = self.iterate(&iterable, env, gen.iter.line())?;
        for item in items {
            self.check_deadline()?;
            self.bind_target(&gen.target, item, env)?;
            let mut keep = true;
            for cond in &gen.ifs {
                let v = self.eval_expr(cond, env)?;
                if !super::operators::truthy(self, &v, env)? {
                    keep = false;
                    break;
                }
            }
            if keep {
                self.drive_dict_comprehension(key, value, generators, index + 1, env, out)?;
            }
        }
        Ok(())
    }
}

pub(super) fn attach_frame(err: RunError, line: u32) -> RunError {
    match err {
        RunError::Raised(e) => RunError::Raised(e.with_frame(super::loc(line))),
        other => other,
    }
}

fn known_method_name(receiver: &Value, name: &str) -> Option<&'static str> {
    match receiver {
        Value::Str(_) => methods::string::known_name(name),
        Value::List(_) => methods::list::known_name(name),
        Value::Tuple(_) => methods::tuple::known_name(name),
        Value::Dict(_) => methods::dict::known_name(name),
        Value::Set(_) => methods::set::known_name(name),
        _ => None,
    }
}

pub(super) fn normalize_index<R: ResourceTracker, FS: FilesystemBackend>(
    idx: &Value,
    len: usize,
    line: u32,
    interp: &mut Interpreter<R, FS>,
) -> RunResult<usize> {
    let Value::Int(i) = idx else {
        return Err(interp.raise(Exception::new(ExcType::TypeError, format!("indices must be integers, not '{}'", idx.type_name())).with_frame(super::loc(line))));
    };
    let i = i.to_i64().ok_or_else(|| interp.raise(Exception::new(ExcType::IndexError, "index out of range").with_frame(super::loc(line))))?;
    let norm = if i < 0 { i + len as i64 } else { i };
    if norm < 0 || norm as usize >= len {
        return Err(interp.raise(Exception::new(ExcType::IndexError, "index out of range").with_frame(super::loc(line))));
    }
    Ok(norm as usize)
}

fn slice_indices(len: usize, start: Option<i64>, stop: Option<i64>, step: i64) -> Vec<usize> {
    let len_i = len as i64;
    let clamp = |v: i64| -> i64 { v.clamp(if step > 0 { 0 } else { -1 }, if step > 0 { len_i } else { len_i - 1 }) };
    let norm = |v: i64| -> i64 { if v < 0 { v + len_i } else { v } };
    let (default_start, default_stop) = if step > 0 { (0, len_i) } else { (len_i - 1, -1) };
    let start = start.map(norm).map(clamp).unwrap_or(default_start);
    let stop = stop.map(norm).map(clamp).unwrap_or(default_stop);
    let mut out = Vec::new();
    let mut i = start;
    if step > 0 {
        while i < stop {
            out.push(i as usize);
            i += step;
        }
    } else {
        while i > stop {
            if i >= 0 && (i as usize) < len {
                out.push(i as usize);
            }
            i += step;
        }
    }
    out
}

pub(super) fn literal_value(lit: &Literal) -> Value {
    match lit {
        Literal::Int(i) => Value::Int(i.clone()),
        Literal::Float(f) => Value::Float(*f),
        Literal::Bool(b) => Value::Bool(*b),
        Literal::Str(s) => Value::Str(s.clone()),
        Literal::None => Value::None,
    }
}

fn format_float(f: f64) -> String {
    if f.is_infinite() {
        return if f > 0.0 { "inf".to_string() } else { "-inf".to_string() };
    }
    if f.is_nan() {
        return "nan".to_string();
    }
    if f == f.trunc() && f.abs() < 1e16 {
        format!("{f:.1}")
    } else {
        ryu::Buffer::new().format(f).to_string()
    }
}

fn apply_format_spec(value: &Value, spec: &str) -> Option<String> {
    if let Some(prec) = spec.strip_prefix('.').and_then(|rest| rest.strip_suffix('f')) {
        let precision: usize = prec.parse().ok()?;
        let f = match value {
            Value::Float(f) => *f,
            Value::Int(i) => i.to_f64()?,
            _ => return None,
        };
        return Some(format!("{f:.precision$}"));
    }
    if let Some(width) = spec.strip_suffix('d') {
        let width: usize = width.parse().ok()?;
        if let Value::Int(i) = value {
            return Some(format!("{i:>width$}"));
        }
    }
    None
}

/// Invokes any callable `Value` with purely positional arguments.
pub(super) fn call_value<R: ResourceTracker, FS: FilesystemBackend>(
    interp: &mut Interpreter<R, FS>,
    callee: &Value,
    args: Vec<Value>,
    env: &mut Environment,
) -> RunResult<Value> {
    call_value_kw(interp, callee, args, Vec::new(), env)
}

/// Invokes any callable `Value`, per spec.md §4.6 "Calls": user functions
/// push a fresh call environment over the closure's captured scopes and are
/// driven through `eval_block`; built-ins, bound methods, and class
/// constructors each have their own calling convention.
pub(super) fn call_value_kw<R: ResourceTracker, FS: FilesystemBackend>(
    interp: &mut Interpreter<R, FS>,
    callee: &Value,
    args: Vec<Value>,
    kwargs: Vec<(String, Value)>,
    env: &mut Environment,
) -> RunResult<Value> {
    match callee {
        Value::Function(f) => {
            if f.is_generator {
                return Ok(Value::Generator(interp.heap.alloc(HeapData::Generator(super::generator::make(interp, f, args, kwargs, env)?))));
            }
            interp.call_function(f, args, kwargs, env)
        }
        Value::BoundMethod(bm) => {
            let mut full_args = vec![(*bm.receiver).clone()];
            full_args.extend(args);
            match bm.callable.as_ref() {
                Value::Function(f) => {
                    if f.is_generator {
                        return Ok(Value::Generator(
                            interp.heap.alloc(HeapData::Generator(super::generator::make(interp, f, full_args, kwargs, env)?)),
                        ));
                    }
                    interp.call_function_with_defining_class(f, full_args, kwargs, bm.defining_class, env)
                }
                Value::Builtin(b) => {
                    if let Value::FileHandle(handle_id) = bm.receiver.as_ref() {
                        return methods::file::dispatch(*handle_id, b.name, &args, &mut interp.ctx)
                            .unwrap_or_else(|| Err(crate::object::attribute_error("file", b.name)))
                            .map(methods::MethodEffect::into_return_value)
                            .map_err(|e| interp.raise(e));
                    }
                    let receiver = (*bm.receiver).clone();
                    call_method_builtin(interp, &receiver, b.name, args, env)
                }
                _ => Err(interp.raise(Exception::new(ExcType::TypeError, "object is not callable"))),
            }
        }
        Value::Builtin(b) => crate::builtins::call(interp, b.name, b.arity, args, kwargs, env),
        Value::Class(id) => super::classes::instantiate(interp, *id, args, kwargs, env),
        other => Err(interp.raise(Exception::new(ExcType::TypeError, format!("'{}' object is not callable", other.type_name())))),
    }
}

fn call_method_builtin<R: ResourceTracker, FS: FilesystemBackend>(
    interp: &mut Interpreter<R, FS>,
    receiver: &Value,
    name: &str,
    args: Vec<Value>,
    env: &mut Environment,
) -> RunResult<Value> {
    if let Value::Instance(_) = receiver {
        return interp.call_method(receiver, name, args, env);
    }
    let effect = methods::bound_method(receiver, name, &args, &mut interp.heap)
        .ok_or_else(|| crate::object::attribute_error(receiver.type_name(), name))
        .map_err(|e| interp.raise(e))?
        .map_err(|e| interp.raise(e))?;
    // Mutating list/dict/set methods already write through `heap.get_mut` in
    // place; `new_receiver` carries the same `HeapId` and needs no write-back.
    Ok(effect.into_return_value())
}
