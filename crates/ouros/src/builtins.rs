//! Global built-in functions, resolved when a name has no binding in any
//! enclosing scope (see `evaluator/expr.rs`'s `Expr::Var`), per spec.md
//! §4.6 "Built-ins" and §6's `BuiltinsModule`.
//!
//! Exception class names (`ValueError`, `TypeError`, ...) live in this same
//! table: calling one builds a `Value::Instance` backed by a throwaway
//! synthetic class, with `message`/`args` attributes set so
//! `evaluator::exceptions::instance_message` can read a message back off
//! whatever `raise` does with the result without depending on this module's
//! representation choices.

use std::rc::Rc;

use indexmap::IndexMap;
use num_bigint::BigInt;
use num_traits::{Signed, ToPrimitive};

use crate::{
    ast::BinOp,
    environment::Environment,
    evaluator::{binop, compare, truthy, Interpreter},
    exception::{ExcType, Exception, RunError, RunResult},
    heap::HeapData,
    io::FilesystemBackend,
    object::{ClassBody, InstanceBody},
    resource::ResourceTracker,
    value::{BuiltinArity, PyKey, RangeValue, Value},
};

/// Every global name this module resolves, paired with its calling
/// convention. Doubles as the `builtins` module's namespace
/// (`modules::BuiltinsModule`) and as the answer to a bare-name lookup that
/// misses every enclosing scope.
pub const NAMES: &[(&str, BuiltinArity)] = &[
    ("print", BuiltinArity::KeywordAware),
    ("open", BuiltinArity::Plain),
    ("len", BuiltinArity::Plain),
    ("range", BuiltinArity::Plain),
    ("abs", BuiltinArity::Plain),
    ("min", BuiltinArity::KeywordAware),
    ("max", BuiltinArity::KeywordAware),
    ("sum", BuiltinArity::Plain),
    ("sorted", BuiltinArity::KeywordAware),
    ("reversed", BuiltinArity::Plain),
    ("enumerate", BuiltinArity::Plain),
    ("map", BuiltinArity::Plain),
    ("filter", BuiltinArity::Plain),
    ("zip", BuiltinArity::Plain),
    ("any", BuiltinArity::Plain),
    ("all", BuiltinArity::Plain),
    ("round", BuiltinArity::Plain),
    ("pow", BuiltinArity::Plain),
    ("divmod", BuiltinArity::Plain),
    ("chr", BuiltinArity::Plain),
    ("ord", BuiltinArity::Plain),
    ("hex", BuiltinArity::Plain),
    ("oct", BuiltinArity::Plain),
    ("bin", BuiltinArity::Plain),
    ("repr", BuiltinArity::Plain),
    ("str", BuiltinArity::TypeConstructor),
    ("int", BuiltinArity::TypeConstructor),
    ("float", BuiltinArity::TypeConstructor),
    ("bool", BuiltinArity::TypeConstructor),
    ("list", BuiltinArity::TypeConstructor),
    ("tuple", BuiltinArity::TypeConstructor),
    ("dict", BuiltinArity::TypeConstructor),
    ("set", BuiltinArity::TypeConstructor),
    ("type", BuiltinArity::Plain),
    ("isinstance", BuiltinArity::Plain),
    ("issubclass", BuiltinArity::Plain),
    ("id", BuiltinArity::Plain),
    ("hasattr", BuiltinArity::Plain),
    ("getattr", BuiltinArity::Plain),
    ("setattr", BuiltinArity::Plain),
    ("callable", BuiltinArity::Plain),
    ("iter", BuiltinArity::Plain),
    ("next", BuiltinArity::Plain),
    ("vars", BuiltinArity::Plain),
    ("suspend", BuiltinArity::Plain),
    ("Exception", BuiltinArity::Plain),
    ("SyntaxError", BuiltinArity::Plain),
    ("NameError", BuiltinArity::Plain),
    ("UnboundLocalError", BuiltinArity::Plain),
    ("TypeError", BuiltinArity::Plain),
    ("ValueError", BuiltinArity::Plain),
    ("IndexError", BuiltinArity::Plain),
    ("KeyError", BuiltinArity::Plain),
    ("AttributeError", BuiltinArity::Plain),
    ("ZeroDivisionError", BuiltinArity::Plain),
    ("ImportError", BuiltinArity::Plain),
    ("ModuleNotFoundError", BuiltinArity::Plain),
    ("RecursionError", BuiltinArity::Plain),
    ("TimeoutError", BuiltinArity::Plain),
    ("IOError", BuiltinArity::Plain),
    ("FileNotFoundError", BuiltinArity::Plain),
    ("PermissionError", BuiltinArity::Plain),
    ("NetworkError", BuiltinArity::Plain),
    ("AssertionError", BuiltinArity::Plain),
    ("StopIteration", BuiltinArity::Plain),
    ("NotImplementedError", BuiltinArity::Plain),
];

/// Resolves a bare name that no enclosing scope binds, per the LEGB
/// fallback `environment.rs` documents but leaves to the evaluator.
#[must_use]
pub fn lookup(name: &str) -> Option<Value> {
    NAMES
        .iter()
        .find(|(n, _)| *n == name)
        .map(|&(n, arity)| Value::Builtin(crate::value::BuiltinFunction { name: n, arity }))
}

pub fn call<R: ResourceTracker, FS: FilesystemBackend>(
    interp: &mut Interpreter<R, FS>,
    name: &str,
    _arity: BuiltinArity,
    args: Vec<Value>,
    kwargs: Vec<(String, Value)>,
    env: &mut Environment,
) -> RunResult<Value> {
    if let Some(stripped) = name.strip_prefix("math.") {
        return math_call(interp, stripped, args);
    }
    match name {
        "print" => builtin_print(interp, &args, &kwargs, env),
        "open" => builtin_open(interp, &args),
        "len" => builtin_len(interp, &args).map_err(|e| interp.raise(e)),
        "range" => builtin_range(&args).map_err(|e| interp.raise(e)),
        "abs" => builtin_abs(&args).map_err(|e| interp.raise(e)),
        "min" => extremum(interp, args, kwargs, env, true),
        "max" => extremum(interp, args, kwargs, env, false),
        "sum" => builtin_sum(interp, args, env),
        "sorted" => builtin_sorted(interp, args, kwargs, env),
        "reversed" => builtin_reversed(interp, &args, env),
        "enumerate" => builtin_enumerate(interp, &args, env),
        "map" => builtin_map(interp, args, env),
        "filter" => builtin_filter(interp, args, env),
        "zip" => builtin_zip(interp, &args, env),
        "any" => builtin_any_all(interp, &args, env, true),
        "all" => builtin_any_all(interp, &args, env, false),
        "round" => builtin_round(&args).map_err(|e| interp.raise(e)),
        "pow" => builtin_pow(&args).map_err(|e| interp.raise(e)),
        "divmod" => builtin_divmod(&args).map_err(|e| interp.raise(e)),
        "chr" => builtin_chr(&args).map_err(|e| interp.raise(e)),
        "ord" => builtin_ord(&args).map_err(|e| interp.raise(e)),
        "hex" => radix_string(&args, 16).map_err(|e| interp.raise(e)),
        "oct" => radix_string(&args, 8).map_err(|e| interp.raise(e)),
        "bin" => radix_string(&args, 2).map_err(|e| interp.raise(e)),
        "repr" => Ok(Value::Str(Rc::from(interp.to_repr(first(&args), env)?.as_str()))),
        "str" => Ok(Value::Str(Rc::from(interp.to_str(first(&args), env)?.as_str()))),
        "int" => builtin_int(interp, &args),
        "float" => builtin_float(&args).map_err(|e| interp.raise(e)),
        "bool" => Ok(Value::Bool(truthy(interp, first(&args), env)?)),
        "list" => builtin_list(interp, &args, env),
        "tuple" => builtin_tuple(interp, &args, env),
        "dict" => builtin_dict(interp, args, kwargs, env),
        "set" => builtin_set(interp, &args, env),
        "type" => Ok(builtin_type(interp, first(&args))),
        "isinstance" => Ok(Value::Bool(isinstance(interp, &args[0], &args[1]))),
        "issubclass" => Ok(Value::Bool(issubclass(interp, &args[0], &args[1]))),
        "id" => Ok(Value::Int(BigInt::from(builtin_id(first(&args))))),
        "hasattr" => builtin_hasattr(interp, &args, env),
        "getattr" => builtin_getattr(interp, args, env),
        "setattr" => builtin_setattr(interp, &args),
        "callable" => Ok(Value::Bool(is_callable(first(&args)))),
        "iter" => builtin_iter(interp, &args, env),
        "next" => builtin_next(interp, &args, env),
        "vars" => builtin_vars(interp, &args),
        "suspend" => Err(RunError::Suspended(args.into_iter().next().unwrap_or(Value::None))),
        other => {
            if let Ok(exc_type) = other.parse::<ExcType>() {
                if exc_type != ExcType::UserDefined {
                    return Ok(exception_instance(interp, other, args, env));
                }
            }
            Err(interp.raise(Exception::new(ExcType::NameError, format!("name '{other}' is not defined"))))
        }
    }
}

fn first(args: &[Value]) -> &Value {
    args.first().unwrap_or(&Value::None)
}

fn type_error(msg: impl Into<String>) -> Exception {
    Exception::new(ExcType::TypeError, msg)
}

// --- I/O -----------------------------------------------------------------

fn builtin_print<R: ResourceTracker, FS: FilesystemBackend>(
    interp: &mut Interpreter<R, FS>,
    args: &[Value],
    kwargs: &[(String, Value)],
    env: &mut Environment,
) -> RunResult<Value> {
    let mut sep = Some(' ');
    let mut end = Some('\n');
    for (k, v) in kwargs {
        let Value::Str(s) = v else { continue };
        let ch = s.chars().next();
        match k.as_str() {
            "sep" => sep = ch,
            "end" => end = ch,
            _ => {}
        }
    }
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            if let Some(c) = sep {
                interp.print.push(c).map_err(|e| interp.raise(e))?;
                let _ = interp.ctx.record(crate::context::EventKind::Output { text: c.to_string() });
            }
        }
        let text = interp.to_str(arg, env)?;
        interp.print.write(&text).map_err(|e| interp.raise(e))?;
        let _ = interp.ctx.record(crate::context::EventKind::Output { text: text.clone() });
    }
    if let Some(c) = end {
        interp.print.push(c).map_err(|e| interp.raise(e))?;
        let _ = interp.ctx.record(crate::context::EventKind::Output { text: c.to_string() });
    }
    Ok(Value::None)
}

/// `open(path, mode='r')`, returning a `Value::FileHandle` backed by
/// `Context`'s handle registry. Supported modes: `r`/`rb` (read), `w`/`wb`
/// (truncate and write), `a`/`ab` (append); binary suffixes are accepted but
/// don't change behavior since file contents are read/written as bytes
/// either way.
fn builtin_open<R: ResourceTracker, FS: FilesystemBackend>(interp: &mut Interpreter<R, FS>, args: &[Value]) -> RunResult<Value> {
    let Value::Str(path) = first(args) else { return Err(interp.raise(type_error("open() argument 'file' must be str"))) };
    let mode = match args.get(1) {
        Some(Value::Str(m)) => m.trim_end_matches('b'),
        Some(other) => return Err(interp.raise(type_error(format!("open() argument 'mode' must be str, not '{}'", other.type_name())))),
        None => "r",
    };
    let (write, append) = match mode {
        "r" => (false, false),
        "w" => (true, false),
        "a" => (true, true),
        other => return Err(interp.raise(Exception::new(ExcType::ValueError, format!("invalid mode: '{other}'")))),
    };
    let id = interp.ctx.open_handle(path, write, append).map_err(|e| interp.raise(e))?;
    Ok(Value::FileHandle(id))
}

// --- Sequence/numeric built-ins -------------------------------------------

fn builtin_len<R: ResourceTracker, FS: FilesystemBackend>(interp: &Interpreter<R, FS>, args: &[Value]) -> Result<Value, Exception> {
    let n = match first(args) {
        Value::Str(s) => s.chars().count(),
        Value::Tuple(items) => items.len(),
        Value::List(id) => match interp.heap.get(*id) {
            HeapData::List(items) => items.len(),
            _ => 0,
        },
        Value::Dict(id) => match interp.heap.get(*id) {
            HeapData::Dict(map) => map.len(),
            _ => 0,
        },
        Value::Set(id) => match interp.heap.get(*id) {
            HeapData::Set(map) => map.len(),
            _ => 0,
        },
        Value::Range(r) => r.len(),
        other => return Err(type_error(format!("object of type '{}' has no len()", other.type_name()))),
    };
    Ok(Value::Int(BigInt::from(n)))
}

fn to_i64(v: &Value) -> Option<i64> {
    match v {
        Value::Int(i) => i.to_i64(),
        Value::Bool(b) => Some(i64::from(*b)),
        _ => None,
    }
}

fn builtin_range(args: &[Value]) -> Result<Value, Exception> {
    let ints: Vec<i64> = args.iter().map(|v| to_i64(v).ok_or_else(|| type_error("range() arguments must be integers"))).collect::<Result<_, _>>()?;
    let (start, stop, step) = match ints[..] {
        [stop] => (0, stop, 1),
        [start, stop] => (start, stop, 1),
        [start, stop, step] => (start, stop, step),
        _ => return Err(type_error("range expected 1 to 3 arguments")),
    };
    if step == 0 {
        return Err(Exception::new(ExcType::ValueError, "range() arg 3 must not be zero"));
    }
    Ok(Value::Range(RangeValue { start, stop, step }))
}

fn builtin_abs(args: &[Value]) -> Result<Value, Exception> {
    match first(args) {
        Value::Int(i) => Ok(Value::Int(i.abs())),
        Value::Bool(b) => Ok(Value::Int(BigInt::from(u8::from(*b)))),
        Value::Float(f) => Ok(Value::Float(f.abs())),
        other => Err(type_error(format!("bad operand type for abs(): '{}'", other.type_name()))),
    }
}

fn extremum<R: ResourceTracker, FS: FilesystemBackend>(
    interp: &mut Interpreter<R, FS>,
    args: Vec<Value>,
    kwargs: Vec<(String, Value)>,
    env: &mut Environment,
    want_min: bool,
) -> RunResult<Value> {
    let key = kwargs.into_iter().find(|(k, _)| k == "key").map(|(_, v)| v);
    let items = if args.len() == 1 {
        interp.iterate_value(&args[0], env, 0)?
    } else {
        args
    };
    if items.is_empty() {
        return Err(interp.raise(Exception::new(ExcType::ValueError, "arg is an empty sequence")));
    }
    let mut best = items[0].clone();
    let mut best_key = match &key {
        Some(f) => interp.call(f, vec![best.clone()], env)?,
        None => best.clone(),
    };
    for item in items.into_iter().skip(1) {
        let item_key = match &key {
            Some(f) => interp.call(f, vec![item.clone()], env)?,
            None => item.clone(),
        };
        let better = if want_min { compare(interp, crate::ast::CmpOp::Lt, &item_key, &best_key, env)? } else { compare(interp, crate::ast::CmpOp::Gt, &item_key, &best_key, env)? };
        if better {
            best = item;
            best_key = item_key;
        }
    }
    Ok(best)
}

fn builtin_sum<R: ResourceTracker, FS: FilesystemBackend>(interp: &mut Interpreter<R, FS>, mut args: Vec<Value>, env: &mut Environment) -> RunResult<Value> {
    if args.is_empty() {
        return Err(interp.raise(type_error("sum() missing required argument: 'iterable'")));
    }
    let iterable = args.remove(0);
    let mut acc = args.into_iter().next().unwrap_or(Value::Int(BigInt::from(0)));
    for item in interp.iterate_value(&iterable, env, 0)? {
        acc = binop(interp, BinOp::Add, acc, item, env)?;
    }
    Ok(acc)
}

fn builtin_sorted<R: ResourceTracker, FS: FilesystemBackend>(
    interp: &mut Interpreter<R, FS>,
    args: Vec<Value>,
    kwargs: Vec<(String, Value)>,
    env: &mut Environment,
) -> RunResult<Value> {
    let key = kwargs.iter().find(|(k, _)| k == "key").map(|(_, v)| v.clone());
    let reverse = matches!(kwargs.iter().find(|(k, _)| k == "reverse"), Some((_, v)) if truthy(interp, v, env).unwrap_or(false));
    let mut items = interp.iterate_value(first(&args), env, 0)?;
    let mut keyed: Vec<(Value, Value)> = Vec::with_capacity(items.len());
    for item in items.drain(..) {
        let k = match &key {
            Some(f) => interp.call(f, vec![item.clone()], env)?,
            None => item.clone(),
        };
        keyed.push((k, item));
    }
    // Insertion sort: the language's own comparison can raise, which a
    // fallible `Vec::sort_by` closure has no way to propagate.
    for i in 1..keyed.len() {
        let mut j = i;
        while j > 0 && compare(interp, crate::ast::CmpOp::Lt, &keyed[j].0, &keyed[j - 1].0, env)? {
            keyed.swap(j, j - 1);
            j -= 1;
        }
    }
    let mut result: Vec<Value> = keyed.into_iter().map(|(_, v)| v).collect();
    if reverse {
        result.reverse();
    }
    Ok(Value::List(interp.heap.alloc(HeapData::List(result))))
}

fn builtin_reversed<R: ResourceTracker, FS: FilesystemBackend>(interp: &mut Interpreter<R, FS>, args: &[Value], env: &mut Environment) -> RunResult<Value> {
    let mut items = interp.iterate_value(first(args), env, 0)?;
    items.reverse();
    Ok(Value::Iterator(interp.ctx.new_iterator(items)))
}

fn builtin_enumerate<R: ResourceTracker, FS: FilesystemBackend>(interp: &mut Interpreter<R, FS>, args: &[Value], env: &mut Environment) -> RunResult<Value> {
    let start = args.get(1).and_then(to_i64).unwrap_or(0);
    let items = interp.iterate_value(first(args), env, 0)?;
    let pairs = items.into_iter().enumerate().map(|(i, v)| Value::Tuple(Rc::from(vec![Value::Int(BigInt::from(start + i as i64)), v]))).collect();
    Ok(Value::Iterator(interp.ctx.new_iterator(pairs)))
}

fn builtin_map<R: ResourceTracker, FS: FilesystemBackend>(interp: &mut Interpreter<R, FS>, mut args: Vec<Value>, env: &mut Environment) -> RunResult<Value> {
    if args.is_empty() {
        return Err(interp.raise(type_error("map() missing required argument: 'function'")));
    }
    let func = args.remove(0);
    let sequences: Vec<Vec<Value>> = args.iter().map(|a| interp.iterate_value(a, env, 0)).collect::<RunResult<_>>()?;
    let len = sequences.iter().map(Vec::len).min().unwrap_or(0);
    let mut out = Vec::with_capacity(len);
    for i in 0..len {
        let call_args: Vec<Value> = sequences.iter().map(|s| s[i].clone()).collect();
        out.push(interp.call(&func, call_args, env)?);
    }
    Ok(Value::Iterator(interp.ctx.new_iterator(out)))
}

fn builtin_filter<R: ResourceTracker, FS: FilesystemBackend>(interp: &mut Interpreter<R, FS>, mut args: Vec<Value>, env: &mut Environment) -> RunResult<Value> {
    if args.len() != 2 {
        return Err(interp.raise(type_error("filter() expected 2 arguments")));
    }
    let iterable = args.pop().unwrap();
    let pred = args.pop().unwrap();
    let mut out = Vec::new();
    for item in interp.iterate_value(&iterable, env, 0)? {
        let keep = if matches!(pred, Value::None) {
            truthy(interp, &item, env)?
        } else {
            let r = interp.call(&pred, vec![item.clone()], env)?;
            truthy(interp, &r, env)?
        };
        if keep {
            out.push(item);
        }
    }
    Ok(Value::Iterator(interp.ctx.new_iterator(out)))
}

fn builtin_zip<R: ResourceTracker, FS: FilesystemBackend>(interp: &mut Interpreter<R, FS>, args: &[Value], env: &mut Environment) -> RunResult<Value> {
    let sequences: Vec<Vec<Value>> = args.iter().map(|a| interp.iterate_value(a, env, 0)).collect::<RunResult<_>>()?;
    let len = sequences.iter().map(Vec::len).min().unwrap_or(0);
    let mut out = Vec::with_capacity(len);
    for i in 0..len {
        out.push(Value::Tuple(sequences.iter().map(|s| s[i].clone()).collect()));
    }
    Ok(Value::Iterator(interp.ctx.new_iterator(out)))
}

fn builtin_any_all<R: ResourceTracker, FS: FilesystemBackend>(interp: &mut Interpreter<R, FS>, args: &[Value], env: &mut Environment, is_any: bool) -> RunResult<Value> {
    let items = interp.iterate_value(first(args), env, 0)?;
    for item in items {
        let t = truthy(interp, &item, env)?;
        if is_any && t {
            return Ok(Value::Bool(true));
        }
        if !is_any && !t {
            return Ok(Value::Bool(false));
        }
    }
    Ok(Value::Bool(!is_any))
}

fn builtin_round(args: &[Value]) -> Result<Value, Exception> {
    let ndigits = args.get(1).and_then(to_i64);
    match (first(args), ndigits) {
        (Value::Int(i), _) => Ok(Value::Int(i.clone())),
        (Value::Bool(b), _) => Ok(Value::Int(BigInt::from(u8::from(*b)))),
        (Value::Float(f), None) => Ok(Value::Int(BigInt::from(f.round() as i64))),
        (Value::Float(f), Some(n)) => {
            let factor = 10f64.powi(n as i32);
            Ok(Value::Float((f * factor).round() / factor))
        }
        (other, _) => Err(type_error(format!("type {} doesn't define __round__ method", other.type_name()))),
    }
}

fn builtin_pow(args: &[Value]) -> Result<Value, Exception> {
    let base = first(args);
    let Some(exp) = args.get(1) else { return Err(type_error("pow() missing required argument: 'exp'")) };
    match (base, exp) {
        (Value::Int(b), Value::Int(e)) => match e.to_u32() {
            Some(e) => Ok(Value::Int(b.pow(e))),
            None => Ok(Value::Float(b.to_f64().unwrap_or(f64::NAN).powf(e.to_f64().unwrap_or(f64::NAN)))),
        },
        _ => {
            let b = to_f64(base).ok_or_else(|| type_error("unsupported operand type(s) for pow()"))?;
            let e = to_f64(exp).ok_or_else(|| type_error("unsupported operand type(s) for pow()"))?;
            Ok(Value::Float(b.powf(e)))
        }
    }
}

fn to_f64(v: &Value) -> Option<f64> {
    match v {
        Value::Int(i) => i.to_f64(),
        Value::Bool(b) => Some(f64::from(u8::from(*b))),
        Value::Float(f) => Some(*f),
        _ => None,
    }
}

fn builtin_divmod(args: &[Value]) -> Result<Value, Exception> {
    let a = first(args);
    let Some(b) = args.get(1) else { return Err(type_error("divmod() missing required argument")) };
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => {
            if y.is_zero() {
                return Err(Exception::new(ExcType::ZeroDivisionError, "integer division or modulo by zero"));
            }
            let quotient = x / y;
            let remainder = x - &quotient * y;
            let (quotient, remainder) = if !remainder.is_zero() && (remainder.is_negative() != y.is_negative()) {
                (quotient - BigInt::from(1), remainder + y)
            } else {
                (quotient, remainder)
            };
            Ok(Value::Tuple(Rc::from(vec![Value::Int(quotient), Value::Int(remainder)])))
        }
        _ => {
            let x = to_f64(a).ok_or_else(|| type_error("unsupported operand type(s) for divmod()"))?;
            let y = to_f64(b).ok_or_else(|| type_error("unsupported operand type(s) for divmod()"))?;
            if y == 0.0 {
                return Err(Exception::new(ExcType::ZeroDivisionError, "float divmod()"));
            }
            Ok(Value::Tuple(Rc::from(vec![Value::Float((x / y).floor()), Value::Float(x.rem_euclid(y))])))
        }
    }
}

fn builtin_chr(args: &[Value]) -> Result<Value, Exception> {
    let Value::Int(i) = first(args) else { return Err(type_error("an integer is required")) };
    let code = i.to_u32().ok_or_else(|| Exception::new(ExcType::ValueError, "chr() arg not in range"))?;
    let c = char::from_u32(code).ok_or_else(|| Exception::new(ExcType::ValueError, "chr() arg not in range(0x110000)"))?;
    Ok(Value::Str(Rc::from(c.to_string().as_str())))
}

fn builtin_ord(args: &[Value]) -> Result<Value, Exception> {
    let Value::Str(s) = first(args) else { return Err(type_error("ord() expected string")) };
    let mut chars = s.chars();
    let (Some(c), None) = (chars.next(), chars.next()) else {
        return Err(type_error("ord() expected a character, but string of different length found"));
    };
    Ok(Value::Int(BigInt::from(c as u32)))
}

fn radix_string(args: &[Value], radix: u32) -> Result<Value, Exception> {
    let Value::Int(i) = first(args) else { return Err(type_error("argument must be an int")) };
    let magnitude = i.abs();
    let digits = match radix {
        16 => format!("{magnitude:x}"),
        8 => format!("{magnitude:o}"),
        2 => format!("{magnitude:b}"),
        _ => unreachable!(),
    };
    let prefix = match radix {
        16 => "0x",
        8 => "0o",
        2 => "0b",
        _ => unreachable!(),
    };
    let sign_str = if i.is_negative() { "-" } else { "" };
    Ok(Value::Str(Rc::from(format!("{sign_str}{prefix}{digits}").as_str())))
}

// --- Type constructors -----------------------------------------------------

fn builtin_int<R: ResourceTracker, FS: FilesystemBackend>(interp: &mut Interpreter<R, FS>, args: &[Value]) -> RunResult<Value> {
    match first(args) {
        Value::Int(i) => Ok(Value::Int(i.clone())),
        Value::Bool(b) => Ok(Value::Int(BigInt::from(u8::from(*b)))),
        Value::Float(f) => Ok(Value::Int(BigInt::from(f.trunc() as i64))),
        Value::Str(s) => s
            .trim()
            .parse::<BigInt>()
            .map(Value::Int)
            .map_err(|_| interp.raise(Exception::new(ExcType::ValueError, format!("invalid literal for int() with base 10: '{s}'")))),
        Value::None => Ok(Value::Int(BigInt::from(0))),
        other => Err(interp.raise(type_error(format!("int() argument must be a string or a number, not '{}'", other.type_name())))),
    }
}

fn builtin_float(args: &[Value]) -> Result<Value, Exception> {
    match first(args) {
        Value::Float(f) => Ok(Value::Float(*f)),
        Value::Int(i) => Ok(Value::Float(i.to_f64().unwrap_or(f64::NAN))),
        Value::Bool(b) => Ok(Value::Float(f64::from(u8::from(*b)))),
        Value::Str(s) => s.trim().parse::<f64>().map(Value::Float).map_err(|_| Exception::new(ExcType::ValueError, format!("could not convert string to float: '{s}'"))),
        Value::None => Ok(Value::Float(0.0)),
        other => Err(type_error(format!("float() argument must be a string or a number, not '{}'", other.type_name()))),
    }
}

fn builtin_list<R: ResourceTracker, FS: FilesystemBackend>(interp: &mut Interpreter<R, FS>, args: &[Value], env: &mut Environment) -> RunResult<Value> {
    let items = match args.first() {
        Some(v) => interp.iterate_value(v, env, 0)?,
        None => Vec::new(),
    };
    Ok(Value::List(interp.heap.alloc(HeapData::List(items))))
}

fn builtin_tuple<R: ResourceTracker, FS: FilesystemBackend>(interp: &mut Interpreter<R, FS>, args: &[Value], env: &mut Environment) -> RunResult<Value> {
    let items = match args.first() {
        Some(v) => interp.iterate_value(v, env, 0)?,
        None => Vec::new(),
    };
    Ok(Value::Tuple(items.into()))
}

fn builtin_dict<R: ResourceTracker, FS: FilesystemBackend>(
    interp: &mut Interpreter<R, FS>,
    args: Vec<Value>,
    kwargs: Vec<(String, Value)>,
    env: &mut Environment,
) -> RunResult<Value> {
    let mut map = IndexMap::new();
    if let Some(v) = args.first() {
        for item in interp.iterate_value(v, env, 0)? {
            let Value::Tuple(pair) = item else {
                return Err(interp.raise(type_error("dict() argument must be an iterable of pairs")));
            };
            if pair.len() != 2 {
                return Err(interp.raise(Exception::new(ExcType::ValueError, "dictionary update sequence element has wrong length")));
            }
            let key = PyKey::from_value(&pair[0]).map_err(|e| interp.raise(e))?;
            map.insert(key, (pair[0].clone(), pair[1].clone()));
        }
    }
    for (k, v) in kwargs {
        let key_value = Value::Str(Rc::from(k.as_str()));
        map.insert(PyKey::Str(Rc::from(k.as_str())), (key_value, v));
    }
    Ok(Value::Dict(interp.heap.alloc(HeapData::Dict(map))))
}

fn builtin_set<R: ResourceTracker, FS: FilesystemBackend>(interp: &mut Interpreter<R, FS>, args: &[Value], env: &mut Environment) -> RunResult<Value> {
    let mut map = IndexMap::new();
    if let Some(v) = args.first() {
        for item in interp.iterate_value(v, env, 0)? {
            let key = PyKey::from_value(&item).map_err(|e| interp.raise(e))?;
            map.entry(key).or_insert(item);
        }
    }
    Ok(Value::Set(interp.heap.alloc(HeapData::Set(map))))
}

// --- Reflection ------------------------------------------------------------

fn builtin_type<R: ResourceTracker, FS: FilesystemBackend>(interp: &mut Interpreter<R, FS>, value: &Value) -> Value {
    match value {
        Value::Instance(id) => {
            let HeapData::Instance(inst) = interp.heap.get(*id) else { unreachable!() };
            Value::Class(inst.class)
        }
        other => Value::Builtin(crate::value::BuiltinFunction { name: type_constructor_name(other), arity: BuiltinArity::TypeConstructor }),
    }
}

fn type_constructor_name(value: &Value) -> &'static str {
    match value {
        Value::Int(_) => "int",
        Value::Bool(_) => "bool",
        Value::Float(_) => "float",
        Value::Str(_) => "str",
        Value::List(_) => "list",
        Value::Tuple(_) => "tuple",
        Value::Dict(_) => "dict",
        Value::Set(_) => "set",
        _ => "object",
    }
}

fn isinstance<R: ResourceTracker, FS: FilesystemBackend>(interp: &Interpreter<R, FS>, value: &Value, target: &Value) -> bool {
    match target {
        Value::Tuple(types) => types.iter().any(|t| isinstance(interp, value, t)),
        Value::Class(cls_id) => match value {
            Value::Instance(id) => {
                let HeapData::Instance(inst) = interp.heap.get(*id) else { return false };
                let HeapData::Class(c) = interp.heap.get(inst.class) else { return false };
                c.mro.contains(cls_id)
            }
            _ => false,
        },
        Value::Builtin(b) => type_matches_name(value, b.name),
        _ => false,
    }
}

fn type_matches_name(value: &Value, name: &str) -> bool {
    match name {
        "int" => matches!(value, Value::Int(_) | Value::Bool(_)),
        "float" => matches!(value, Value::Float(_)),
        "bool" => matches!(value, Value::Bool(_)),
        "str" => matches!(value, Value::Str(_)),
        "list" => matches!(value, Value::List(_)),
        "tuple" => matches!(value, Value::Tuple(_)),
        "dict" => matches!(value, Value::Dict(_)),
        "set" => matches!(value, Value::Set(_)),
        _ => false,
    }
}

fn issubclass<R: ResourceTracker, FS: FilesystemBackend>(interp: &Interpreter<R, FS>, value: &Value, target: &Value) -> bool {
    match (value, target) {
        (Value::Class(a), Value::Class(b)) => {
            let HeapData::Class(c) = interp.heap.get(*a) else { return false };
            c.mro.contains(b)
        }
        (Value::Builtin(a), Value::Builtin(b)) => a.name == b.name,
        _ => false,
    }
}

fn builtin_id(value: &Value) -> i64 {
    match value {
        Value::List(id) | Value::Dict(id) | Value::Set(id) | Value::Class(id) | Value::Instance(id) | Value::Generator(id) => id.index() as i64,
        Value::FileHandle(h) | Value::Iterator(h) => *h as i64,
        other => {
            use std::hash::{Hash, Hasher};
            let mut hasher = std::collections::hash_map::DefaultHasher::new();
            format!("{other:?}").hash(&mut hasher);
            hasher.finish() as i64
        }
    }
}

fn builtin_hasattr<R: ResourceTracker, FS: FilesystemBackend>(interp: &mut Interpreter<R, FS>, args: &[Value], _env: &mut Environment) -> RunResult<Value> {
    let Value::Str(attr) = &args[1] else { return Err(interp.raise(type_error("hasattr(): attribute name must be string"))) };
    Ok(Value::Bool(interp.get_attribute(&args[0], attr, 0).is_ok()))
}

fn builtin_getattr<R: ResourceTracker, FS: FilesystemBackend>(interp: &mut Interpreter<R, FS>, args: Vec<Value>, _env: &mut Environment) -> RunResult<Value> {
    let Value::Str(attr) = &args[1] else { return Err(interp.raise(type_error("getattr(): attribute name must be string"))) };
    match interp.get_attribute(&args[0], attr, 0) {
        Ok(v) => Ok(v),
        Err(e) => match args.get(2) {
            Some(default) => Ok(default.clone()),
            None => Err(e),
        },
    }
}

fn builtin_setattr<R: ResourceTracker, FS: FilesystemBackend>(interp: &mut Interpreter<R, FS>, args: &[Value]) -> RunResult<Value> {
    let Value::Instance(id) = &args[0] else { return Err(interp.raise(type_error("setattr() target must be an instance"))) };
    let Value::Str(attr) = &args[1] else { return Err(interp.raise(type_error("setattr(): attribute name must be string"))) };
    let attr_id = interp.intern(attr);
    let HeapData::Instance(inst) = interp.heap.get_mut(*id) else { unreachable!() };
    inst.attrs.insert(attr_id, args[2].clone());
    Ok(Value::None)
}

fn is_callable(value: &Value) -> bool {
    matches!(value, Value::Function(_) | Value::Builtin(_) | Value::BoundMethod(_) | Value::Class(_))
}

fn builtin_iter<R: ResourceTracker, FS: FilesystemBackend>(interp: &mut Interpreter<R, FS>, args: &[Value], env: &mut Environment) -> RunResult<Value> {
    match first(args) {
        Value::Instance(_) => Ok(Value::Iterator(interp.ctx.new_instance_iterator(first(args).clone()))),
        other => {
            let items = interp.iterate_value(other, env, 0)?;
            Ok(Value::Iterator(interp.ctx.new_iterator(items)))
        }
    }
}

fn builtin_next<R: ResourceTracker, FS: FilesystemBackend>(interp: &mut Interpreter<R, FS>, args: &[Value], env: &mut Environment) -> RunResult<Value> {
    let Value::Iterator(id) = first(args) else { return Err(interp.raise(type_error("next() argument must be an iterator"))) };
    if let Some(inst) = interp.ctx.iter_items(*id).cloned() {
        return match interp.call_method_value(&inst, "__next__", vec![], env) {
            Ok(v) => Ok(v),
            Err(RunError::Raised(e)) if e.exc_type == ExcType::StopIteration => match args.get(1) {
                Some(default) => Ok(default.clone()),
                None => Err(interp.raise(e)),
            },
            Err(e) => Err(e),
        };
    }
    match interp.ctx.iter_next(*id) {
        Some(v) => Ok(v),
        None => match args.get(1) {
            Some(default) => Ok(default.clone()),
            None => Err(interp.raise(Exception::new(ExcType::StopIteration, ""))),
        },
    }
}

fn builtin_vars<R: ResourceTracker, FS: FilesystemBackend>(interp: &mut Interpreter<R, FS>, args: &[Value]) -> RunResult<Value> {
    let Value::Instance(id) = first(args) else { return Err(interp.raise(type_error("vars() argument must have __dict__"))) };
    let HeapData::Instance(inst) = interp.heap.get(*id) else { unreachable!() };
    let mut map = IndexMap::new();
    for (k, v) in inst.attrs.clone() {
        let name = interp.interner.resolve(k).to_string();
        map.insert(PyKey::Str(Rc::from(name.as_str())), (Value::Str(Rc::from(name.as_str())), v));
    }
    Ok(Value::Dict(interp.heap.alloc(HeapData::Dict(map))))
}

// --- Exception construction --------------------------------------------------

fn exception_instance<R: ResourceTracker, FS: FilesystemBackend>(interp: &mut Interpreter<R, FS>, class_name: &str, args: Vec<Value>, env: &mut Environment) -> Value {
    let mut attrs = IndexMap::new();
    let args_id = interp.intern("args");
    attrs.insert(args_id, Value::Tuple(args.clone().into()));
    if let Some(first) = args.first() {
        let message_id = interp.intern("message");
        let text = interp.to_str(first, env).unwrap_or_default();
        attrs.insert(message_id, Value::Str(Rc::from(text.as_str())));
    }
    let name_id = interp.intern(class_name);
    let class_id = interp.heap.alloc(HeapData::Class(ClassBody { name: name_id, bases: Vec::new(), mro: Vec::new(), attrs: IndexMap::new(), routes: Vec::new() }));
    if let HeapData::Class(c) = interp.heap.get_mut(class_id) {
        c.mro = vec![class_id];
    }
    Value::Instance(interp.heap.alloc(HeapData::Instance(InstanceBody { class: class_id, attrs })))
}

// --- The `math` stub module --------------------------------------------------

fn math_call<R: ResourceTracker, FS: FilesystemBackend>(interp: &mut Interpreter<R, FS>, name: &str, args: Vec<Value>) -> RunResult<Value> {
    let x = to_f64(first(&args)).ok_or_else(|| interp.raise(type_error("a float is required")))?;
    let result = match name {
        "sqrt" => {
            if x < 0.0 {
                return Err(interp.raise(Exception::new(ExcType::ValueError, "math domain error")));
            }
            x.sqrt()
        }
        "floor" => return Ok(Value::Int(BigInt::from(x.floor() as i64))),
        "ceil" => return Ok(Value::Int(BigInt::from(x.ceil() as i64))),
        "log" => {
            if x <= 0.0 {
                return Err(interp.raise(Exception::new(ExcType::ValueError, "math domain error")));
            }
            x.ln()
        }
        "sin" => x.sin(),
        "cos" => x.cos(),
        "pow" => {
            let y = to_f64(&args[1]).ok_or_else(|| interp.raise(type_error("a float is required")))?;
            x.powf(y)
        }
        other => return Err(interp.raise(Exception::new(ExcType::AttributeError, format!("module 'math' has no attribute '{other}'")))),
    };
    Ok(Value::Float(result))
}
