//! `dict` built-in methods.

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
    let HeapData::Dict(_) = heap.get(id) else { return None };
    Some(dispatch_inner(id, name, args, heap))
}

fn dispatch_inner(id: crate::heap::HeapId, name: &str, args: &[Value], heap: &mut Heap) -> Result<MethodEffect, Exception> {
    let receiver = Value::Dict(id);
    match name {
        "get" => {
            let key = PyKey::from_value(args.first().ok_or_else(|| type_error("key", &Value::None))?)?;
            let default = args.get(1).cloned().unwrap_or(Value::None);
            let HeapData::Dict(map) = heap.get(id) else { unreachable!() };
            Ok(MethodEffect::Pure(map.get(&key).map_or(default, |(_, v)| v.clone())))
        }
        "keys" => {
            let HeapData::Dict(map) = heap.get(id) else { unreachable!() };
            let items: Vec<Value> = map.values().map(|(k, _)| k.clone()).collect();
            Ok(MethodEffect::Pure(Value::Tuple(items.into())))
        }
        "values" => {
            let HeapData::Dict(map) = heap.get(id) else { unreachable!() };
            let items: Vec<Value> = map.values().map(|(_, v)| v.clone()).collect();
            Ok(MethodEffect::Pure(Value::Tuple(items.into())))
        }
        "items" => {
            let HeapData::Dict(map) = heap.get(id) else { unreachable!() };
            let items: Vec<Value> = map.values().map(|(k, v)| Value::Tuple(vec![k.clone(), v.clone()].into())).collect();
            Ok(MethodEffect::Pure(Value::Tuple(items.into())))
        }
        "pop" => {
            let key = PyKey::from_value(args.first().ok_or_else(|| type_error("key", &Value::None))?)?;
            let HeapData::Dict(map) = heap.get_mut(id) else { unreachable!() };
            match map.shift_remove(&key) {
                Some((_, v)) => Ok(MethodEffect::Mutating { new_receiver: receiver, return_value: v }),
                None => match args.get(1) {
                    Some(default) => Ok(MethodEffect::Pure(default.clone())),
                    None => Err(Exception::new(ExcType::KeyError, "key not found")),
                },
            }
        }
        "setdefault" => {
            let key_value = args.first().ok_or_else(|| type_error("key", &Value::None))?;
            let key = PyKey::from_value(key_value)?;
            let default = args.get(1).cloned().unwrap_or(Value::None);
            let HeapData::Dict(map) = heap.get_mut(id) else { unreachable!() };
            let value = map.entry(key).or_insert_with(|| (key_value.clone(), default)).1.clone();
            Ok(MethodEffect::Mutating { new_receiver: receiver, return_value: value })
        }
        "update" => {
            let other = args.first().ok_or_else(|| type_error("mapping", &Value::None))?;
            let Value::Dict(other_id) = other else { return Err(type_error("dict", other)) };
            let HeapData::Dict(other_map) = heap.get(*other_id) else { return Err(type_error("dict", other)) };
            let entries: Vec<(PyKey, (Value, Value))> = other_map.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
            let HeapData::Dict(map) = heap.get_mut(id) else { unreachable!() };
            for (k, v) in entries {
                map.insert(k, v);
            }
            Ok(MethodEffect::Mutating { new_receiver: receiver, return_value: Value::None })
        }
        "clear" => {
            let HeapData::Dict(map) = heap.get_mut(id) else { unreachable!() };
            map.clear();
            Ok(MethodEffect::Mutating { new_receiver: receiver, return_value: Value::None })
        }
        "copy" => {
            let HeapData::Dict(map) = heap.get(id) else { unreachable!() };
            let clone = map.clone();
            let new_id = heap.alloc(HeapData::Dict(clone));
            Ok(MethodEffect::Pure(Value::Dict(new_id)))
        }
        _ => unreachable!("filtered by caller"),
    }
}

const KNOWN_METHODS: &[&str] = &["get", "keys", "values", "items", "pop", "setdefault", "update", "clear", "copy"];

#[must_use]
pub fn known_name(name: &str) -> Option<&'static str> {
    KNOWN_METHODS.iter().copied().find(|&m| m == name)
}
