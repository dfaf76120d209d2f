//! `tuple` built-in methods. Tuples are immutable, so every result here is
//! [`MethodEffect::Pure`] and no heap access is needed.

use num_bigint::BigInt;

use crate::{
    exception::{ExcType, Exception},
    value::Value,
};

use super::MethodEffect;

fn type_error(expected: &str, got: &Value) -> Exception {
    Exception::new(ExcType::TypeError, format!("expected {expected}, got '{}'", got.type_name()))
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => x == y,
        (Value::Float(x), Value::Float(y)) => x == y,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Str(x), Value::Str(y)) => x == y,
        (Value::None, Value::None) => true,
        (Value::Tuple(x), Value::Tuple(y)) => x.len() == y.len() && x.iter().zip(y.iter()).all(|(a, b)| values_equal(a, b)),
        (Value::List(x), Value::List(y)) => x == y,
        (Value::Dict(x), Value::Dict(y)) | (Value::Set(x), Value::Set(y)) => x == y,
        _ => false,
    }
}

const KNOWN_METHODS: &[&str] = &["count", "index"];

#[must_use]
pub fn known_name(name: &str) -> Option<&'static str> {
    KNOWN_METHODS.iter().copied().find(|&m| m == name)
}

pub fn dispatch(items: &std::rc::Rc<[Value]>, name: &str, args: &[Value]) -> Option<Result<MethodEffect, Exception>> {
    let target = match name {
        "count" | "index" => args.first(),
        _ => return None,
    };
    let target = match target {
        Some(t) => t,
        None => return Some(Err(type_error("value", &Value::None))),
    };
    Some(match name {
        "count" => {
            let n = items.iter().filter(|v| values_equal(v, target)).count();
            Ok(MethodEffect::Pure(Value::Int(BigInt::from(n))))
        }
        "index" => match items.iter().position(|v| values_equal(v, target)) {
            Some(pos) => Ok(MethodEffect::Pure(Value::Int(BigInt::from(pos)))),
            None => Err(Exception::new(ExcType::ValueError, "tuple.index(x): x not in tuple")),
        },
        _ => unreachable!("filtered above"),
    })
}
