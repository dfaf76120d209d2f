//! `set` built-in methods.

use crate::{
    exception::{ExcType, Exception},
    heap::{Heap, HeapData},
    value::{PyKey, Value},
};

use super::MethodEffect;

fn type_error(expected: &str, got: &Value) -> Exception {
    Exception::new(ExcType::TypeError, format!("expected {expected}, got '{}'", got.type_name()))
}

pub fn dispatch(id: crate::heap::HeapId, name: &str, args: &[Value], heap: &mut Heap) -> Option<Result<MethodEffect, Exception>> {
    if !KNOWN_METHODS.contains(&name) {
        return None;
    }
    let HeapData::Set(_) = heap.get(id) else { return None };
    Some(dispatch_inner(id, name, args, heap))
}

fn other_set_entries(arg: &Value, heap: &Heap) -> Result<Vec<(PyKey, Value)>, Exception> {
    let Value::Set(other_id) = arg else { return Err(type_error("set", arg)) };
    let HeapData::Set(map) = heap.get(*other_id) else { return Err(type_error("set", arg)) };
    Ok(map.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
}

fn dispatch_inner(id: crate::heap::HeapId, name: &str, args: &[Value], heap: &mut Heap) -> Result<MethodEffect, Exception> {
    let receiver = Value::Set(id);
    match name {
        "add" => {
            let item = args.first().ok_or_else(|| type_error("value", &Value::None))?;
            let key = PyKey::from_value(item)?;
            let HeapData::Set(map) = heap.get_mut(id) else { unreachable!() };
            map.entry(key).or_insert_with(|| item.clone());
            Ok(MethodEffect::Mutating { new_receiver: receiver, return_value: Value::None })
        }
        "remove" => {
            let item = args.first().ok_or_else(|| type_error("value", &Value::None))?;
            let key = PyKey::from_value(item)?;
            let HeapData::Set(map) = heap.get_mut(id) else { unreachable!() };
            match map.shift_remove(&key) {
                Some(_) => Ok(MethodEffect::Mutating { new_receiver: receiver, return_value: Value::None }),
                None => Err(Exception::new(ExcType::KeyError, "key not found in set")),
            }
        }
        "discard" => {
            let item = args.first().ok_or_else(|| type_error("value", &Value::None))?;
            let key = PyKey::from_value(item)?;
            let HeapData::Set(map) = heap.get_mut(id) else { unreachable!() };
            map.shift_remove(&key);
            Ok(MethodEffect::Mutating { new_receiver: receiver, return_value: Value::None })
        }
        "clear" => {
            let HeapData::Set(map) = heap.get_mut(id) else { unreachable!() };
            map.clear();
            Ok(MethodEffect::Mutating { new_receiver: receiver, return_value: Value::None })
        }
        "copy" => {
            let HeapData::Set(map) = heap.get(id) else { unreachable!() };
            let clone = map.clone();
            let new_id = heap.alloc(HeapData::Set(clone));
            Ok(MethodEffect::Pure(Value::Set(new_id)))
        }
        "union" => {
            let other = other_set_entries(args.first().ok_or_else(|| type_error("set", &Value::None))?, heap)?;
            let HeapData::Set(map) = heap.get(id) else { unreachable!() };
            let mut result = map.clone();
            for (k, v) in other {
                result.entry(k).or_insert(v);
            }
            let new_id = heap.alloc(HeapData::Set(result));
            Ok(MethodEffect::Pure(Value::Set(new_id)))
        }
        "intersection" => {
            let other = other_set_entries(args.first().ok_or_else(|| type_error("set", &Value::None))?, heap)?;
            let other_keys: std::collections::HashSet<PyKey> = other.into_iter().map(|(k, _)| k).collect();
            let HeapData::Set(map) = heap.get(id) else { unreachable!() };
            let result: indexmap::IndexMap<PyKey, Value> =
                map.iter().filter(|(k, _)| other_keys.contains(*k)).map(|(k, v)| (k.clone(), v.clone())).collect();
            let new_id = heap.alloc(HeapData::Set(result));
            Ok(MethodEffect::Pure(Value::Set(new_id)))
        }
        "difference" => {
            let other = other_set_entries(args.first().ok_or_else(|| type_error("set", &Value::None))?, heap)?;
            let other_keys: std::collections::HashSet<PyKey> = other.into_iter().map(|(k, _)| k).collect();
            let HeapData::Set(map) = heap.get(id) else { unreachable!() };
            let result: indexmap::IndexMap<PyKey, Value> =
                map.iter().filter(|(k, _)| !other_keys.contains(*k)).map(|(k, v)| (k.clone(), v.clone())).collect();
            let new_id = heap.alloc(HeapData::Set(result));
            Ok(MethodEffect::Pure(Value::Set(new_id)))
        }
        "update" => {
            let other = other_set_entries(args.first().ok_or_else(|| type_error("set", &Value::None))?, heap)?;
            let HeapData::Set(map) = heap.get_mut(id) else { unreachable!() };
            for (k, v) in other {
                map.entry(k).or_insert(v);
            }
            Ok(MethodEffect::Mutating { new_receiver: receiver, return_value: Value::None })
        }
        _ => unreachable!("filtered by caller"),
    }
}

const KNOWN_METHODS: &[&str] =
    &["add", "remove", "discard", "clear", "copy", "union", "intersection", "difference", "update"];

#[must_use]
pub fn known_name(name: &str) -> Option<&'static str> {
    KNOWN_METHODS.iter().copied().find(|&m| m == name)
}
