//! `class` statement evaluation, instantiation, and `super()`, per spec.md
//! §4.6 "Classes" and object.rs's C3-linearised MRO.

use std::rc::Rc;

use indexmap::IndexMap;

use crate::{
    ast::{Expr, Stmt},
    environment::Environment,
    exception::{ExcType, Exception, RunResult},
    heap::HeapData,
    io::FilesystemBackend,
    object::{compute_mro, ClassBody, InstanceBody},
    resource::ResourceTracker,
    value::{SuperValue, Value},
};

use super::{expr::call_value_kw, loc, Interpreter};

/// Evaluates a `class` statement: runs the body in a fresh namespace scope,
/// turns its final bindings into the class's attribute dict, links bases,
/// computes the MRO, and applies any class decorators.
pub fn define_class<R: ResourceTracker, FS: FilesystemBackend>(
    interp: &mut Interpreter<R, FS>,
    name: &str,
    bases: &[Expr],
    body: &[Stmt],
    decorators: &[Expr],
    line: u32,
    env: &mut Environment,
) -> RunResult<Value> {
    let mut base_ids = Vec::with_capacity(bases.len());
    for base_expr in bases {
        match interp.eval_expr(base_expr, env)? {
            Value::Class(id) => base_ids.push(id),
            other => {
                return Err(interp.raise(
                    Exception::new(ExcType::TypeError, format!("'{}' is not a valid base class", other.type_name())).with_frame(loc(line)),
                ))
            }
        }
    }

    let routes_start = interp.pending_routes.len();
    env.push_scope();
    let body_result = interp.eval_block(body, env);
    let bindings = env.take_top_scope_bindings();
    body_result?;
    let routes = interp.pending_routes.split_off(routes_start);

    let mut attrs = IndexMap::new();
    attrs.extend(bindings);

    let name_id = interp.intern(name);
    let class_id = interp.heap.alloc(HeapData::Class(ClassBody {
        name: name_id,
        bases: base_ids.clone(),
        mro: Vec::new(),
        attrs,
        routes,
    }));
    let mut mro = vec![class_id];
    mro.extend(compute_mro(&base_ids, &interp.heap));
    let HeapData::Class(class) = interp.heap.get_mut(class_id) else { unreachable!() };
    class.mro = mro;

    let mut value = Value::Class(class_id);
    for decorator in decorators.iter().rev() {
        let decorator_fn = interp.eval_expr(decorator, env)?;
        value = call_value_kw(interp, &decorator_fn, vec![value], Vec::new(), env).map_err(|e| super::expr::attach_frame(e, line))?;
    }
    Ok(value)
}

/// Constructs an instance of `class_id`: allocates the instance body and, if
/// the class (or an ancestor) defines `__init__`, calls it with `self`
/// prepended to `args`.
pub fn instantiate<R: ResourceTracker, FS: FilesystemBackend>(
    interp: &mut Interpreter<R, FS>,
    class_id: crate::heap::HeapId,
    args: Vec<Value>,
    kwargs: Vec<(String, Value)>,
    env: &mut Environment,
) -> RunResult<Value> {
    let instance_id = interp.heap.alloc(HeapData::Instance(InstanceBody { class: class_id, attrs: IndexMap::new() }));
    let instance = Value::Instance(instance_id);

    let init_name = interp.intern("__init__");
    let HeapData::Class(class) = interp.heap.get(class_id) else {
        return Err(interp.raise(Exception::new(ExcType::TypeError, "not a class")));
    };
    let found = class.mro.iter().find_map(|&ancestor| {
        let HeapData::Class(c) = interp.heap.get(ancestor) else { return None };
        c.attrs.get(&init_name).cloned().map(|v| (v, ancestor))
    });

    if let Some((init_value, defining_class)) = found {
        if let Value::Function(f) = init_value {
            let mut full_args = Vec::with_capacity(args.len() + 1);
            full_args.push(instance.clone());
            full_args.extend(args);
            interp.call_function_with_defining_class(&f, full_args, kwargs, Some(defining_class), env)?;
        }
    }
    Ok(instance)
}

/// Builds the `Value::Super` a zero-argument `super()` call produces, using
/// the hidden `__self__`/`__defining_class__` bindings the calling method's
/// frame was given (see `stmt.rs`'s `call_function_with_defining_class`).
pub fn make_super<R: ResourceTracker, FS: FilesystemBackend>(interp: &mut Interpreter<R, FS>, env: &mut Environment) -> RunResult<Value> {
    let self_id = interp.intern("__self__");
    let class_id = interp.intern("__defining_class__");
    let Some(instance) = env.get(self_id) else {
        return Err(interp.raise(Exception::new(ExcType::TypeError, "super(): no arguments and no enclosing method")));
    };
    let Some(Value::Class(defining_class)) = env.get(class_id) else {
        return Err(interp.raise(Exception::new(ExcType::TypeError, "super(): no enclosing class")));
    };
    let Value::Instance(instance_id) = &instance else {
        return Err(interp.raise(Exception::new(ExcType::TypeError, "super(): self is not an instance")));
    };
    let HeapData::Instance(body) = interp.heap.get(*instance_id) else { unreachable!() };
    let HeapData::Class(class) = interp.heap.get(body.class) else { unreachable!() };
    let pos = class.mro.iter().position(|&id| id == defining_class).unwrap_or(0);
    let remaining: Rc<[crate::heap::HeapId]> = Rc::from(&class.mro[pos + 1..]);
    Ok(Value::Super(Rc::new(SuperValue { instance: Box::new(instance), remaining_mro: remaining })))
}
