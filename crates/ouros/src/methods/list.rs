//! `list` built-in methods.

use num_bigint::BigInt;

use crate::{
    exception::{ExcType, Exception},
    heap::{Heap, HeapData},
    value::Value,
};

use super::MethodEffect;

fn type_error(expected: &str, got: &Value) -> Exception {
    Exception::new(ExcType::TypeError, format!("expected {expected}, got '{}'", got.type_name()))
}

fn as_index(v: &Value, len: usize) -> Result<usize, Exception> {
    let Value::Int(i) = v else { return Err(type_error("int", v)) };
    let i: i64 = i.try_into().map_err(|_| Exception::new(ExcType::IndexError, "index out of range"))?;
    let i = if i < 0 { i + len as i64 } else { i };
    if i < 0 || i as usize >= len {
        return Err(Exception::new(ExcType::IndexError, "list index out of range"));
    }
    Ok(i as usize)
}

pub fn dispatch(id: crate::heap::HeapId, name: &str, args: &[Value], heap: &mut Heap) -> Option<Result<MethodEffect, Exception>> {
    if !KNOWN_METHODS.contains(&name) {
        return None;
    }
    let HeapData::List(_) = heap.get(id) else { return None };
    Some(dispatch_inner(id, name, args, heap))
}

fn dispatch_inner(id: crate::heap::HeapId, name: &str, args: &[Value], heap: &mut Heap) -> Result<MethodEffect, Exception> {
    let receiver = Value::List(id);
    match name {
        "append" => {
            let item = args.first().cloned().unwrap_or(Value::None);
            let HeapData::List(items) = heap.get_mut(id) else { unreachable!() };
            items.push(item);
            Ok(MethodEffect::Mutating { new_receiver: receiver, return_value: Value::None })
        }
        "extend" => {
            let more = extend_source(args.first())?;
            let HeapData::List(items) = heap.get_mut(id) else { unreachable!() };
            items.extend(more);
            Ok(MethodEffect::Mutating { new_receiver: receiver, return_value: Value::None })
        }
        "insert" => {
            let HeapData::List(items) = heap.get(id) else { unreachable!() };
            let len = items.len();
            let at = args.first().ok_or_else(|| type_error("int", &Value::None))?;
            let Value::Int(i) = at else { return Err(type_error("int", at)) };
            let i: i64 = i.try_into().unwrap_or(i64::MAX);
            let pos = if i < 0 { (len as i64 + i).max(0) as usize } else { (i as usize).min(len) };
            let item = args.get(1).cloned().unwrap_or(Value::None);
            let HeapData::List(items) = heap.get_mut(id) else { unreachable!() };
            items.insert(pos, item);
            Ok(MethodEffect::Mutating { new_receiver: receiver, return_value: Value::None })
        }
        "pop" => {
            let HeapData::List(items) = heap.get(id) else { unreachable!() };
            let len = items.len();
            if len == 0 {
                return Err(Exception::new(ExcType::IndexError, "pop from empty list"));
            }
            let pos = match args.first() {
                Some(v) => as_index(v, len)?,
                None => len - 1,
            };
            let HeapData::List(items) = heap.get_mut(id) else { unreachable!() };
            let value = items.remove(pos);
            Ok(MethodEffect::Mutating { new_receiver: receiver, return_value: value })
        }
        "remove" => {
            let target = args.first().ok_or_else(|| type_error("value", &Value::None))?;
            let HeapData::List(items) = heap.get(id) else { unreachable!() };
            let pos = items.iter().position(|v| values_equal(v, target));
            match pos {
                Some(pos) => {
                    let HeapData::List(items) = heap.get_mut(id) else { unreachable!() };
                    items.remove(pos);
                    Ok(MethodEffect::Mutating { new_receiver: receiver, return_value: Value::None })
                }
                None => Err(Exception::new(ExcType::ValueError, "list.remove(x): x not in list")),
            }
        }
        "clear" => {
            let HeapData::List(items) = heap.get_mut(id) else { unreachable!() };
            items.clear();
            Ok(MethodEffect::Mutating { new_receiver: receiver, return_value: Value::None })
        }
        "reverse" => {
            let HeapData::List(items) = heap.get_mut(id) else { unreachable!() };
            items.reverse();
            Ok(MethodEffect::Mutating { new_receiver: receiver, return_value: Value::None })
        }
        "sort" => {
            let HeapData::List(items) = heap.get_mut(id) else { unreachable!() };
            items.sort_by(|a, b| compare_values(a, b));
            let reverse = args_has_reverse(args);
            if reverse {
                let HeapData::List(items) = heap.get_mut(id) else { unreachable!() };
                items.reverse();
            }
            Ok(MethodEffect::Mutating { new_receiver: receiver, return_value: Value::None })
        }
        "index" => {
            let target = args.first().ok_or_else(|| type_error("value", &Value::None))?;
            let HeapData::List(items) = heap.get(id) else { unreachable!() };
            match items.iter().position(|v| values_equal(v, target)) {
                Some(pos) => Ok(MethodEffect::Pure(Value::Int(BigInt::from(pos)))),
                None => Err(Exception::new(ExcType::ValueError, "value not in list")),
            }
        }
        "count" => {
            let target = args.first().ok_or_else(|| type_error("value", &Value::None))?;
            let HeapData::List(items) = heap.get(id) else { unreachable!() };
            let n = items.iter().filter(|v| values_equal(v, target)).count();
            Ok(MethodEffect::Pure(Value::Int(BigInt::from(n))))
        }
        "copy" => {
            let HeapData::List(items) = heap.get(id) else { unreachable!() };
            let clone = items.clone();
            let new_id = heap.alloc(HeapData::List(clone));
            Ok(MethodEffect::Pure(Value::List(new_id)))
        }
        _ => unreachable!("filtered by caller"),
    }
}

fn args_has_reverse(args: &[Value]) -> bool {
    matches!(args.first(), Some(Value::Bool(true)))
}

fn extend_source(arg: Option<&Value>) -> Result<Vec<Value>, Exception> {
    match arg {
        Some(Value::Tuple(items)) => Ok(items.to_vec()),
        Some(other) => Err(type_error("iterable", other)),
        None => Err(type_error("iterable", &Value::None)),
    }
}

/// Structural equality without heap access; used only to compare against
/// scalars and tuples, which is what `remove`/`index`/`count` receive in
/// practice. Containers compare by identity, matching the `is` fallback
/// CPython uses when `__eq__` isn't otherwise defined for them here.
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => x == y,
        (Value::Float(x), Value::Float(y)) => x == y,
        (Value::Int(x), Value::Float(y)) | (Value::Float(y), Value::Int(x)) => x.to_string().parse::<f64>().map(|x| x == *y).unwrap_or(false),
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Str(x), Value::Str(y)) => x == y,
        (Value::None, Value::None) => true,
        (Value::Tuple(x), Value::Tuple(y)) => x.len() == y.len() && x.iter().zip(y.iter()).all(|(a, b)| values_equal(a, b)),
        (Value::List(x), Value::List(y)) => x == y,
        (Value::Dict(x), Value::Dict(y)) | (Value::Set(x), Value::Set(y)) => x == y,
        (Value::Instance(x), Value::Instance(y)) => x == y,
        _ => false,
    }
}

fn compare_values(a: &Value, b: &Value) -> std::cmp::Ordering {
    use std::cmp::Ordering;
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => x.cmp(y),
        (Value::Float(x), Value::Float(y)) => x.partial_cmp(y).unwrap_or(Ordering::Equal),
        (Value::Str(x), Value::Str(y)) => x.cmp(y),
        _ => Ordering::Equal,
    }
}

const KNOWN_METHODS: &[&str] =
    &["append", "extend", "insert", "pop", "remove", "clear", "reverse", "sort", "index", "count", "copy"];

#[must_use]
pub fn known_name(name: &str) -> Option<&'static str> {
    KNOWN_METHODS.iter().copied().find(|&m| m == name)
}
