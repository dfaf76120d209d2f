//! `match`/`case` structural pattern matching, per spec.md §4.6 "Match".

use crate::{
    ast::{Line, MatchCase, Pattern},
    environment::Environment,
    exception::RunResult,
    heap::HeapData,
    io::FilesystemBackend,
    resource::ResourceTracker,
    value::{PyKey, Value},
};

use super::{expr::literal_value, truthy, values_equal, Flow, Interpreter};

/// Evaluates a `match` statement: tries each `case` pattern in order,
/// binding captures only once a pattern (and its guard, if any) succeeds.
pub fn eval_match<R: ResourceTracker, FS: FilesystemBackend>(
    interp: &mut Interpreter<R, FS>,
    subject: &crate::ast::Expr,
    cases: &[MatchCase],
    _line: Line,
    env: &mut Environment,
) -> RunResult<Flow> {
    let value = interp.eval_expr(subject, env)?;
    for case in cases {
        let mut bindings = Vec::new();
        if !match_pattern(interp, &case.pattern, &value, &mut bindings)? {
            continue;
        }
        for (name, v) in bindings {
            let id = interp.intern(&name);
            env.put(id, v);
        }
        if let Some(guard) = &case.guard {
            let g = interp.eval_expr(guard, env)?;
            if !truthy(interp, &g, env)? {
                continue;
            }
        }
        return interp.eval_block(&case.body, env);
    }
    Ok(Flow::Normal)
}

/// Tests `pattern` against `value`, accumulating `name: value` captures
/// into `bindings` without touching `env` until the whole pattern (and its
/// guard) is known to succeed.
fn match_pattern<R: ResourceTracker, FS: FilesystemBackend>(
    interp: &mut Interpreter<R, FS>,
    pattern: &Pattern,
    value: &Value,
    bindings: &mut Vec<(String, Value)>,
) -> RunResult<bool> {
    match pattern {
        Pattern::Literal(lit) => Ok(values_equal(&literal_value(lit), value, &interp.heap)),
        Pattern::Wildcard => Ok(true),
        Pattern::Capture(name) => {
            bindings.push((name.clone(), value.clone()));
            Ok(true)
        }
        Pattern::Or(alts) => {
            for alt in alts {
                let mut local = Vec::new();
                if match_pattern(interp, alt, value, &mut local)? {
                    bindings.extend(local);
                    return Ok(true);
                }
            }
            Ok(false)
        }
        Pattern::Sequence { elements, star_at } => {
            let items = match value {
                Value::List(id) => {
                    let HeapData::List(items) = interp.heap.get(*id) else { unreachable!() };
                    items.clone()
                }
                Value::Tuple(items) => items.to_vec(),
                _ => return Ok(false),
            };
            match star_at {
                None => {
                    if items.len() != elements.len() {
                        return Ok(false);
                    }
                    for (pat, item) in elements.iter().zip(items.iter()) {
                        if !match_pattern(interp, pat, item, bindings)? {
                            return Ok(false);
                        }
                    }
                    Ok(true)
                }
                Some(star_idx) => {
                    let before = *star_idx;
                    let after = elements.len() - star_idx - 1;
                    if items.len() < before + after {
                        return Ok(false);
                    }
                    for (pat, item) in elements[..before].iter().zip(items.iter()) {
                        if !match_pattern(interp, pat, item, bindings)? {
                            return Ok(false);
                        }
                    }
                    let middle: Vec<Value> = items[before..items.len() - after].to_vec();
                    if let Pattern::Capture(name) = &elements[before] {
                        let middle_id = interp.heap.alloc(HeapData::List(middle));
                        bindings.push((name.clone(), Value::List(middle_id)));
                    }
                    for (pat, item) in elements[before + 1..].iter().zip(items[items.len() - after..].iter()) {
                        if !match_pattern(interp, pat, item, bindings)? {
                            return Ok(false);
                        }
                    }
                    Ok(true)
                }
            }
        }
        Pattern::Mapping { keys, patterns } => {
            let Value::Dict(id) = value else { return Ok(false) };
            let HeapData::Dict(map) = interp.heap.get(*id) else { unreachable!() };
            let map = map.clone();
            for (key_lit, pat) in keys.iter().zip(patterns.iter()) {
                let key = match PyKey::from_value(&literal_value(key_lit)) {
                    Ok(k) => k,
                    Err(_) => return Ok(false),
                };
                let Some((_, entry_value)) = map.get(&key) else { return Ok(false) };
                if !match_pattern(interp, pat, entry_value, bindings)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        Pattern::Class { name, positional, keyword } => {
            if !class_name_matches(interp, value, name) {
                return Ok(false);
            }
            let Value::Instance(id) = value else {
                return Ok(positional.is_empty() && keyword.is_empty());
            };
            if !positional.is_empty() {
                let match_args = lookup_match_args(interp, *id);
                if match_args.len() < positional.len() {
                    return Ok(false);
                }
                for (attr, pat) in match_args.iter().zip(positional.iter()) {
                    let Some(attr_value) = lookup_attr(interp, *id, attr) else { return Ok(false) };
                    if !match_pattern(interp, pat, &attr_value, bindings)? {
                        return Ok(false);
                    }
                }
            }
            for (attr, pat) in keyword {
                let Some(attr_value) = lookup_attr(interp, *id, attr) else { return Ok(false) };
                if !match_pattern(interp, pat, &attr_value, bindings)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
    }
}

fn class_name_matches<R: ResourceTracker, FS: FilesystemBackend>(interp: &mut Interpreter<R, FS>, value: &Value, name: &str) -> bool {
    match value {
        Value::Instance(id) => {
            let HeapData::Instance(instance) = interp.heap.get(*id) else { return false };
            let HeapData::Class(class) = interp.heap.get(instance.class) else { return false };
            interp.interner.resolve(class.name) == name
        }
        other => other.type_name() == name,
    }
}

fn lookup_attr<R: ResourceTracker, FS: FilesystemBackend>(interp: &mut Interpreter<R, FS>, id: crate::heap::HeapId, attr: &str) -> Option<Value> {
    let sid = interp.intern(attr);
    let HeapData::Instance(instance) = interp.heap.get(id) else { return None };
    crate::object::resolve_attr(instance, sid, &interp.heap, None).map(|(v, _)| v)
}

/// Reads a class's `__match_args__` tuple, used to match positional class
/// patterns (`case Point(x, y):`) against named attributes.
fn lookup_match_args<R: ResourceTracker, FS: FilesystemBackend>(interp: &mut Interpreter<R, FS>, id: crate::heap::HeapId) -> Vec<String> {
    let Some(Value::Tuple(items)) = lookup_attr(interp, id, "__match_args__") else { return Vec::new() };
    items
        .iter()
        .filter_map(|v| match v {
            Value::Str(s) => Some(s.to_string()),
            _ => None,
        })
        .collect()
}
