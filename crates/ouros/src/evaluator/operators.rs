//! Binary/unary/comparison operator dispatch, per spec.md §4.6 "Operators".
//!
//! Tagged dispatch rather than a virtual method table: for each operator,
//! try the left operand's dunder, then the right operand's reflected dunder,
//! else fall back to the built-in rules below. This keeps the operator table
//! a flat, testable data structure per spec.md §9's design note.

use std::{cmp::Ordering, rc::Rc};

use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::{Signed, ToPrimitive, Zero};

use crate::{
    ast::{BinOp, CmpOp, UnaryOp},
    environment::Environment,
    exception::{ExcType, Exception, RunResult},
    heap::HeapData,
    io::FilesystemBackend,
    object,
    resource::ResourceTracker,
    value::Value,
};

use super::Interpreter;

/// Truthiness protocol, per spec.md §4.6: for instances, `__bool__` then
/// `__len__`; for built-ins, the fixed falsy set.
pub fn truthy<R: ResourceTracker, FS: FilesystemBackend>(
    interp: &mut Interpreter<R, FS>,
    value: &Value,
    env: &mut Environment,
) -> RunResult<bool> {
    match value {
        Value::None => Ok(false),
        Value::Bool(b) => Ok(*b),
        Value::Int(i) => Ok(!i.is_zero()),
        Value::Float(f) => Ok(*f != 0.0),
        Value::Str(s) => Ok(!s.is_empty()),
        Value::Tuple(items) => Ok(!items.is_empty()),
        Value::List(id) => match interp.heap.get(*id) {
            HeapData::List(items) => Ok(!items.is_empty()),
            _ => Ok(true),
        },
        Value::Dict(id) => match interp.heap.get(*id) {
            HeapData::Dict(map) => Ok(!map.is_empty()),
            _ => Ok(true),
        },
        Value::Set(id) => match interp.heap.get(*id) {
            HeapData::Set(map) => Ok(!map.is_empty()),
            _ => Ok(true),
        },
        Value::Range(r) => Ok(!r.is_empty()),
        Value::Instance(id) => {
            if let Some((method, _)) = lookup_dunder(interp, *id, "__bool__") {
                let v = super::expr::call_value(interp, &method, vec![], env)?;
                return truthy(interp, &v, env);
            }
            if let Some((method, _)) = lookup_dunder(interp, *id, "__len__") {
                let v = super::expr::call_value(interp, &method, vec![], env)?;
                return Ok(!matches!(v, Value::Int(i) if i.is_zero()));
            }
            Ok(true)
        }
        _ => Ok(true),
    }
}

fn lookup_dunder<R: ResourceTracker, FS: FilesystemBackend>(
    interp: &mut Interpreter<R, FS>,
    instance_id: crate::heap::HeapId,
    name: &str,
) -> Option<(Value, Option<crate::heap::HeapId>)> {
    let HeapData::Instance(instance) = interp.heap.get(instance_id) else { return None };
    let id = interp.intern(name);
    let (value, defining_class) = object::resolve_attr(instance, id, &interp.heap, None)?;
    let bound = Value::BoundMethod(Rc::new(crate::value::BoundMethod {
        receiver: Box::new(Value::Instance(instance_id)),
        callable: Box::new(value),
        defining_class,
    }));
    Some((bound, defining_class))
}

fn type_error(op: &str, left: &Value, right: &Value) -> Exception {
    Exception::new(
        ExcType::TypeError,
        format!("unsupported operand type(s) for {op}: '{}' and '{}'", left.type_name(), right.type_name()),
    )
}

/// Structural equality, used by `==`, dict/set key comparisons when the
/// value isn't hashed (e.g. `list.index`), and `in`.
#[must_use]
pub fn values_equal(a: &Value, b: &Value, heap: &crate::heap::Heap) -> bool {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => x == y,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Bool(x), Value::Int(y)) | (Value::Int(y), Value::Bool(x)) => BigInt::from(u8::from(*x)) == *y,
        (Value::Float(x), Value::Float(y)) => x == y,
        (Value::Int(x), Value::Float(y)) | (Value::Float(y), Value::Int(x)) => x.to_f64().is_some_and(|x| x == *y),
        (Value::Str(x), Value::Str(y)) => x == y,
        (Value::None, Value::None) => true,
        (Value::Tuple(x), Value::Tuple(y)) => x.len() == y.len() && x.iter().zip(y.iter()).all(|(a, b)| values_equal(a, b, heap)),
        (Value::List(x), Value::List(y)) => {
            let (HeapData::List(xs), HeapData::List(ys)) = (heap.get(*x), heap.get(*y)) else { return x == y };
            xs.len() == ys.len() && xs.iter().zip(ys.iter()).all(|(a, b)| values_equal(a, b, heap))
        }
        (Value::Dict(x), Value::Dict(y)) => x == y,
        (Value::Set(x), Value::Set(y)) => x == y,
        (Value::Range(x), Value::Range(y)) => x == y,
        (Value::Instance(x), Value::Instance(y)) => x == y,
        _ => false,
    }
}

fn compare_values(a: &Value, b: &Value, heap: &crate::heap::Heap) -> Result<Ordering, Exception> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => Ok(x.cmp(y)),
        (Value::Float(x), Value::Float(y)) => x.partial_cmp(y).ok_or_else(|| Exception::new(ExcType::ValueError, "nan comparison")),
        (Value::Int(x), Value::Float(y)) => x.to_f64().unwrap_or(f64::NAN).partial_cmp(y).ok_or_else(|| Exception::new(ExcType::ValueError, "nan comparison")),
        (Value::Float(x), Value::Int(y)) => x.partial_cmp(&y.to_f64().unwrap_or(f64::NAN)).ok_or_else(|| Exception::new(ExcType::ValueError, "nan comparison")),
        (Value::Bool(x), Value::Bool(y)) => Ok(x.cmp(y)),
        (Value::Str(x), Value::Str(y)) => Ok(x.cmp(y)),
        (Value::Tuple(x), Value::Tuple(y)) => {
            for (l, r) in x.iter().zip(y.iter()) {
                let ord = compare_values(l, r, heap)?;
                if ord != Ordering::Equal {
                    return Ok(ord);
                }
            }
            Ok(x.len().cmp(&y.len()))
        }
        (Value::List(x), Value::List(y)) => {
            let (HeapData::List(xs), HeapData::List(ys)) = (heap.get(*x), heap.get(*y)) else {
                return Err(type_error("<", a, b));
            };
            for (l, r) in xs.iter().zip(ys.iter()) {
                let ord = compare_values(l, r, heap)?;
                if ord != Ordering::Equal {
                    return Ok(ord);
                }
            }
            Ok(xs.len().cmp(&ys.len()))
        }
        _ => Err(type_error("<", a, b)),
    }
}

/// Promotes two numeric-ish values (`int`/`float`/`bool`) to a common
/// representation, per spec.md §4.6: booleans coerce to `0`/`1`; mixed
/// int/float promotes to float.
enum Numeric {
    Int(BigInt),
    Float(f64),
}

fn as_numeric(v: &Value) -> Option<Numeric> {
    match v {
        Value::Int(i) => Some(Numeric::Int(i.clone())),
        Value::Bool(b) => Some(Numeric::Int(BigInt::from(u8::from(*b)))),
        Value::Float(f) => Some(Numeric::Float(*f)),
        _ => None,
    }
}

pub fn binop<R: ResourceTracker, FS: FilesystemBackend>(
    interp: &mut Interpreter<R, FS>,
    op: BinOp,
    left: Value,
    right: Value,
    env: &mut Environment,
) -> RunResult<Value> {
    if let Some(v) = try_dunder_binop(interp, op, &left, &right, env)? {
        return Ok(v);
    }
    builtin_binop(interp, op, &left, &right)
}

fn dunder_name(op: BinOp, reflected: bool) -> &'static str {
    match (op, reflected) {
        (BinOp::Add, false) => "__add__",
        (BinOp::Add, true) => "__radd__",
        (BinOp::Sub, false) => "__sub__",
        (BinOp::Sub, true) => "__rsub__",
        (BinOp::Mul, false) => "__mul__",
        (BinOp::Mul, true) => "__rmul__",
        (BinOp::Div, false) => "__truediv__",
        (BinOp::Div, true) => "__rtruediv__",
        (BinOp::FloorDiv, false) => "__floordiv__",
        (BinOp::FloorDiv, true) => "__rfloordiv__",
        (BinOp::Mod, false) => "__mod__",
        (BinOp::Mod, true) => "__rmod__",
        (BinOp::Pow, false) => "__pow__",
        (BinOp::Pow, true) => "__rpow__",
        (BinOp::MatMul, false) => "__matmul__",
        (BinOp::MatMul, true) => "__rmatmul__",
        (BinOp::BitAnd, false) => "__and__",
        (BinOp::BitAnd, true) => "__rand__",
        (BinOp::BitOr, false) => "__or__",
        (BinOp::BitOr, true) => "__ror__",
        (BinOp::BitXor, false) => "__xor__",
        (BinOp::BitXor, true) => "__rxor__",
        (BinOp::LShift, false) => "__lshift__",
        (BinOp::LShift, true) => "__rlshift__",
        (BinOp::RShift, false) => "__rshift__",
        (BinOp::RShift, true) => "__rrshift__",
    }
}

fn try_dunder_binop<R: ResourceTracker, FS: FilesystemBackend>(
    interp: &mut Interpreter<R, FS>,
    op: BinOp,
    left: &Value,
    right: &Value,
    env: &mut Environment,
) -> RunResult<Option<Value>> {
    if let Value::Instance(id) = left
        && let Some((method, _)) = lookup_dunder(interp, *id, dunder_name(op, false))
    {
        return Ok(Some(super::expr::call_value(interp, &method, vec![right.clone()], env)?));
    }
    if let Value::Instance(id) = right
        && let Some((method, _)) = lookup_dunder(interp, *id, dunder_name(op, true))
    {
        return Ok(Some(super::expr::call_value(interp, &method, vec![left.clone()], env)?));
    }
    Ok(None)
}

fn builtin_binop<R: ResourceTracker, FS: FilesystemBackend>(
    interp: &mut Interpreter<R, FS>,
    op: BinOp,
    left: &Value,
    right: &Value,
) -> RunResult<Value> {
    match op {
        BinOp::Add => add(interp, left, right),
        BinOp::Mul => mul(interp, left, right),
        _ => arithmetic(op, left, right).map_err(|e| interp.raise(e)),
    }
}

fn add<R: ResourceTracker, FS: FilesystemBackend>(interp: &mut Interpreter<R, FS>, left: &Value, right: &Value) -> RunResult<Value> {
    match (left, right) {
        (Value::Str(a), Value::Str(b)) => Ok(Value::Str(Rc::from(format!("{a}{b}").as_str()))),
        (Value::Tuple(a), Value::Tuple(b)) => Ok(Value::Tuple(a.iter().chain(b.iter()).cloned().collect())),
        (Value::List(a), Value::List(b)) => {
            let (HeapData::List(xs), HeapData::List(ys)) = (interp.heap.get(*a), interp.heap.get(*b)) else {
                unreachable!()
            };
            let merged: Vec<Value> = xs.iter().chain(ys.iter()).cloned().collect();
            Ok(Value::List(interp.heap.alloc(HeapData::List(merged))))
        }
        _ => arithmetic(BinOp::Add, left, right).map_err(|e| interp.raise(e)),
    }
}

fn mul<R: ResourceTracker, FS: FilesystemBackend>(interp: &mut Interpreter<R, FS>, left: &Value, right: &Value) -> RunResult<Value> {
    let repeat_count = |v: &Value| -> Option<i64> {
        match v {
            Value::Int(i) => i.to_i64(),
            Value::Bool(b) => Some(i64::from(*b)),
            _ => None,
        }
    };
    match (left, right) {
        (Value::Str(s), other) | (other, Value::Str(s)) if repeat_count(other).is_some() => {
            let n = repeat_count(other).unwrap_or(0).max(0) as usize;
            Ok(Value::Str(Rc::from(s.repeat(n).as_str())))
        }
        (Value::Tuple(items), other) | (other, Value::Tuple(items)) if repeat_count(other).is_some() => {
            let n = repeat_count(other).unwrap_or(0).max(0) as usize;
            let repeated: Vec<Value> = items.iter().cloned().cycle().take(items.len() * n).collect();
            Ok(Value::Tuple(repeated.into()))
        }
        (Value::List(id), other) | (other, Value::List(id)) if repeat_count(other).is_some() => {
            let n = repeat_count(other).unwrap_or(0).max(0) as usize;
            let HeapData::List(items) = interp.heap.get(*id) else { unreachable!() };
            let repeated: Vec<Value> = items.iter().cloned().cycle().take(items.len() * n).collect();
            Ok(Value::List(interp.heap.alloc(HeapData::List(repeated))))
        }
        _ => arithmetic(BinOp::Mul, left, right).map_err(|e| interp.raise(e)),
    }
}

fn arithmetic(op: BinOp, left: &Value, right: &Value) -> Result<Value, Exception> {
    let (Some(l), Some(r)) = (as_numeric(left), as_numeric(right)) else {
        return Err(type_error(op_symbol(op), left, right));
    };
    match op {
        BinOp::BitAnd | BinOp::BitOr | BinOp::BitXor | BinOp::LShift | BinOp::RShift => {
            let (Numeric::Int(a), Numeric::Int(b)) = (l, r) else {
                return Err(type_error(op_symbol(op), left, right));
            };
            return Ok(Value::Int(int_bitwise(op, &a, &b)?));
        }
        _ => {}
    }
    match (l, r) {
        (Numeric::Int(a), Numeric::Int(b)) => int_arith(op, &a, &b),
        (Numeric::Int(a), Numeric::Float(b)) => float_arith(op, a.to_f64().unwrap_or(f64::NAN), b),
        (Numeric::Float(a), Numeric::Int(b)) => float_arith(op, a, b.to_f64().unwrap_or(f64::NAN)),
        (Numeric::Float(a), Numeric::Float(b)) => float_arith(op, a, b),
    }
}

fn op_symbol(op: BinOp) -> &'static str {
    match op {
        BinOp::Add => "+",
        BinOp::Sub => "-",
        BinOp::Mul => "*",
        BinOp::Div => "/",
        BinOp::FloorDiv => "//",
        BinOp::Mod => "%",
        BinOp::Pow => "**",
        BinOp::MatMul => "@",
        BinOp::BitAnd => "&",
        BinOp::BitOr => "|",
        BinOp::BitXor => "^",
        BinOp::LShift => "<<",
        BinOp::RShift => ">>",
    }
}

fn int_bitwise(op: BinOp, a: &BigInt, b: &BigInt) -> Result<BigInt, Exception> {
    Ok(match op {
        BinOp::BitAnd => a & b,
        BinOp::BitOr => a | b,
        BinOp::BitXor => a ^ b,
        BinOp::LShift => {
            let shift = b.to_u32().ok_or_else(|| Exception::new(ExcType::ValueError, "negative shift count"))?;
            a << shift
        }
        BinOp::RShift => {
            let shift = b.to_u32().ok_or_else(|| Exception::new(ExcType::ValueError, "negative shift count"))?;
            a >> shift
        }
        _ => unreachable!(),
    })
}

fn int_arith(op: BinOp, a: &BigInt, b: &BigInt) -> Result<Value, Exception> {
    match op {
        BinOp::Add => Ok(Value::Int(a + b)),
        BinOp::Sub => Ok(Value::Int(a - b)),
        BinOp::Mul => Ok(Value::Int(a * b)),
        BinOp::Div => {
            if b.is_zero() {
                return Err(Exception::new(ExcType::ZeroDivisionError, "division by zero"));
            }
            Ok(Value::Float(a.to_f64().unwrap_or(f64::NAN) / b.to_f64().unwrap_or(f64::NAN)))
        }
        BinOp::FloorDiv => {
            if b.is_zero() {
                return Err(Exception::new(ExcType::ZeroDivisionError, "integer division or modulo by zero"));
            }
            Ok(Value::Int(a.div_floor(b)))
        }
        BinOp::Mod => {
            if b.is_zero() {
                return Err(Exception::new(ExcType::ZeroDivisionError, "integer division or modulo by zero"));
            }
            Ok(Value::Int(a.mod_floor(b)))
        }
        BinOp::Pow => {
            if let Some(exp) = b.to_u32() {
                Ok(Value::Int(a.pow(exp)))
            } else {
                Ok(Value::Float(a.to_f64().unwrap_or(f64::NAN).powf(b.to_f64().unwrap_or(f64::NAN))))
            }
        }
        _ => Err(type_error(op_symbol(op), &Value::Int(a.clone()), &Value::Int(b.clone()))),
    }
}

fn float_arith(op: BinOp, a: f64, b: f64) -> Result<Value, Exception> {
    match op {
        BinOp::Add => Ok(Value::Float(a + b)),
        BinOp::Sub => Ok(Value::Float(a - b)),
        BinOp::Mul => Ok(Value::Float(a * b)),
        BinOp::Div => {
            if b == 0.0 {
                return Err(Exception::new(ExcType::ZeroDivisionError, "float division by zero"));
            }
            Ok(Value::Float(a / b))
        }
        BinOp::FloorDiv => {
            if b == 0.0 {
                return Err(Exception::new(ExcType::ZeroDivisionError, "float floor division by zero"));
            }
            Ok(Value::Float((a / b).floor()))
        }
        BinOp::Mod => {
            if b == 0.0 {
                return Err(Exception::new(ExcType::ZeroDivisionError, "float modulo"));
            }
            Ok(Value::Float(a.rem_euclid(b)))
        }
        BinOp::Pow => Ok(Value::Float(a.powf(b))),
        _ => Err(type_error(op_symbol(op), &Value::Float(a), &Value::Float(b))),
    }
}

/// Python's float `%` takes the divisor's sign (floor-division remainder),
/// unlike Rust's `%` (truncated remainder); `num_integer::Integer` only
/// covers integers, so floats still need this correction by hand.
trait FloatRemEuclid {
    fn rem_euclid(self, rhs: f64) -> f64;
}

impl FloatRemEuclid for f64 {
    fn rem_euclid(self, rhs: f64) -> f64 {
        let r = self % rhs;
        if r != 0.0 && (r < 0.0) != (rhs < 0.0) {
            r + rhs
        } else {
            r
        }
    }
}

pub fn unaryop<R: ResourceTracker, FS: FilesystemBackend>(
    interp: &mut Interpreter<R, FS>,
    op: UnaryOp,
    value: Value,
    env: &mut Environment,
) -> RunResult<Value> {
    if let Value::Instance(id) = &value {
        let name = match op {
            UnaryOp::Neg => "__neg__",
            UnaryOp::Pos => "__pos__",
            UnaryOp::Invert => "__invert__",
            UnaryOp::Not => "",
        };
        if !name.is_empty()
            && let Some((method, _)) = lookup_dunder(interp, *id, name)
        {
            return super::expr::call_value(interp, &method, vec![], env);
        }
    }
    match op {
        UnaryOp::Not => Ok(Value::Bool(!truthy(interp, &value, env)?)),
        UnaryOp::Pos => match as_numeric(&value) {
            Some(Numeric::Int(i)) => Ok(Value::Int(i)),
            Some(Numeric::Float(f)) => Ok(Value::Float(f)),
            None => Err(interp.raise(Exception::new(ExcType::TypeError, format!("bad operand type for unary +: '{}'", value.type_name())))),
        },
        UnaryOp::Neg => match as_numeric(&value) {
            Some(Numeric::Int(i)) => Ok(Value::Int(-i)),
            Some(Numeric::Float(f)) => Ok(Value::Float(-f)),
            None => Err(interp.raise(Exception::new(ExcType::TypeError, format!("bad operand type for unary -: '{}'", value.type_name())))),
        },
        UnaryOp::Invert => match value {
            Value::Int(i) => Ok(Value::Int(!i)),
            Value::Bool(b) => Ok(Value::Int(!BigInt::from(u8::from(b)))),
            other => Err(interp.raise(Exception::new(ExcType::TypeError, format!("bad operand type for unary ~: '{}'", other.type_name())))),
        },
    }
}

pub fn compare<R: ResourceTracker, FS: FilesystemBackend>(
    interp: &mut Interpreter<R, FS>,
    op: CmpOp,
    left: &Value,
    right: &Value,
    env: &mut Environment,
) -> RunResult<bool> {
    match op {
        CmpOp::Is => return Ok(identical(left, right)),
        CmpOp::IsNot => return Ok(!identical(left, right)),
        CmpOp::In | CmpOp::NotIn => {
            let found = contains(interp, right, left, env)?;
            return Ok(if op == CmpOp::In { found } else { !found });
        }
        _ => {}
    }
    if let Some(name) = eq_dunder_name(op)
        && let Value::Instance(id) = left
        && let Some((method, _)) = lookup_dunder(interp, *id, name)
    {
        let result = super::expr::call_value(interp, &method, vec![right.clone()], env)?;
        return truthy(interp, &result, env);
    }
    match op {
        CmpOp::Eq => Ok(values_equal(left, right, &interp.heap)),
        CmpOp::NotEq => Ok(!values_equal(left, right, &interp.heap)),
        CmpOp::Lt => Ok(compare_values(left, right, &interp.heap).map_err(|e| interp.raise(e))? == Ordering::Less),
        CmpOp::LtE => Ok(compare_values(left, right, &interp.heap).map_err(|e| interp.raise(e))? != Ordering::Greater),
        CmpOp::Gt => Ok(compare_values(left, right, &interp.heap).map_err(|e| interp.raise(e))? == Ordering::Greater),
        CmpOp::GtE => Ok(compare_values(left, right, &interp.heap).map_err(|e| interp.raise(e))? != Ordering::Less),
        CmpOp::In | CmpOp::NotIn | CmpOp::Is | CmpOp::IsNot => unreachable!("handled above"),
    }
}

fn eq_dunder_name(op: CmpOp) -> Option<&'static str> {
    match op {
        CmpOp::Eq => Some("__eq__"),
        CmpOp::NotEq => Some("__ne__"),
        CmpOp::Lt => Some("__lt__"),
        CmpOp::LtE => Some("__le__"),
        CmpOp::Gt => Some("__gt__"),
        CmpOp::GtE => Some("__ge__"),
        _ => None,
    }
}

fn identical(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::None, Value::None) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Int(x), Value::Int(y)) => x == y,
        (Value::Str(x), Value::Str(y)) => Rc::ptr_eq(x, y) || x == y,
        (Value::List(x), Value::List(y)) => x == y,
        (Value::Dict(x), Value::Dict(y)) => x == y,
        (Value::Set(x), Value::Set(y)) => x == y,
        (Value::Instance(x), Value::Instance(y)) => x == y,
        (Value::Class(x), Value::Class(y)) => x == y,
        _ => false,
    }
}

fn contains<R: ResourceTracker, FS: FilesystemBackend>(
    interp: &mut Interpreter<R, FS>,
    container: &Value,
    item: &Value,
    env: &mut Environment,
) -> RunResult<bool> {
    if let Value::Instance(id) = container
        && let Some((method, _)) = lookup_dunder(interp, *id, "__contains__")
    {
        let result = super::expr::call_value(interp, &method, vec![item.clone()], env)?;
        return truthy(interp, &result, env);
    }
    match container {
        Value::Str(s) => match item {
            Value::Str(needle) => Ok(s.contains(needle.as_ref())),
            other => Err(interp.raise(type_error("in", other, container))),
        },
        Value::Tuple(items) => Ok(items.iter().any(|v| values_equal(v, item, &interp.heap))),
        Value::List(id) => {
            let HeapData::List(items) = interp.heap.get(*id) else { unreachable!() };
            Ok(items.iter().any(|v| values_equal(v, item, &interp.heap)))
        }
        Value::Dict(id) => {
            let key = crate::value::PyKey::from_value(item).map_err(|e| interp.raise(e))?;
            let HeapData::Dict(map) = interp.heap.get(*id) else { unreachable!() };
            Ok(map.contains_key(&key))
        }
        Value::Set(id) => {
            let key = crate::value::PyKey::from_value(item).map_err(|e| interp.raise(e))?;
            let HeapData::Set(map) = interp.heap.get(*id) else { unreachable!() };
            Ok(map.contains_key(&key))
        }
        Value::Range(r) => match item {
            Value::Int(i) => i.to_i64().is_some_and(|i| {
                if r.step == 0 {
                    false
                } else {
                    let in_bounds = if r.step > 0 { i >= r.start && i < r.stop } else { i <= r.start && i > r.stop };
                    in_bounds && (i - r.start) % r.step == 0
                }
            }).then_some(true).map_or(Ok(false), Ok),
            _ => Ok(false),
        },
        other => Err(interp.raise(Exception::new(ExcType::TypeError, format!("argument of type '{}' is not iterable", other.type_name())))),
    }
}
