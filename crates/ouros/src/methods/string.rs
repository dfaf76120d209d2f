//! `str` built-in methods. Strings are immutable, so every method here
//! returns [`MethodEffect::Pure`].

use std::rc::Rc;

use crate::{
    exception::{ExcType, Exception},
    value::Value,
};

use super::MethodEffect;

fn type_error(expected: &str, got: &Value) -> Exception {
    Exception::new(ExcType::TypeError, format!("expected {expected}, got '{}'", got.type_name()))
}

fn as_str(v: &Value) -> Result<&str, Exception> {
    match v {
        Value::Str(s) => Ok(s),
        other => Err(type_error("str", other)),
    }
}

fn pure_str(s: impl Into<String>) -> MethodEffect {
    MethodEffect::Pure(Value::Str(Rc::from(s.into().as_str())))
}

pub fn dispatch(receiver: &Value, name: &str, args: &[Value]) -> Option<Result<MethodEffect, Exception>> {
    let Value::Str(s) = receiver else { return None };
    dispatch_inner(s, name, args).transpose()
}

fn dispatch_inner(s: &str, name: &str, args: &[Value]) -> Option<Result<MethodEffect, Exception>> {
    let compute = || -> Result<MethodEffect, Exception> {
        match name {
            "upper" => Ok(pure_str(s.to_uppercase())),
            "lower" => Ok(pure_str(s.to_lowercase())),
            "title" => Ok(pure_str(title_case(s))),
            "capitalize" => Ok(pure_str(capitalize(s))),
            "strip" => Ok(pure_str(strip_chars(s, args, true, true))),
            "lstrip" => Ok(pure_str(strip_chars(s, args, true, false))),
            "rstrip" => Ok(pure_str(strip_chars(s, args, false, true))),
            "startswith" => {
                let p = as_str(args.first().ok_or_else(|| type_error("str", &Value::None))?)?;
                Ok(MethodEffect::Pure(Value::Bool(s.starts_with(p))))
            }
            "endswith" => {
                let p = as_str(args.first().ok_or_else(|| type_error("str", &Value::None))?)?;
                Ok(MethodEffect::Pure(Value::Bool(s.ends_with(p))))
            }
            "find" => {
                let p = args.first().map(as_str).transpose()?.unwrap_or("");
                let idx = s.find(p).map_or(-1, |b| s[..b].chars().count() as i64);
                Ok(MethodEffect::Pure(Value::Int(idx.into())))
            }
            "index" => {
                let p = args.first().map(as_str).transpose()?.unwrap_or("");
                match s.find(p) {
                    Some(b) => Ok(MethodEffect::Pure(Value::Int((s[..b].chars().count() as i64).into()))),
                    None => Err(Exception::new(ExcType::ValueError, "substring not found")),
                }
            }
            "count" => {
                let p = args.first().map(as_str).transpose()?.unwrap_or("");
                let n = if p.is_empty() { s.chars().count() + 1 } else { s.matches(p).count() };
                Ok(MethodEffect::Pure(Value::Int((n as i64).into())))
            }
            "replace" => {
                let from = args.first().map(as_str).transpose()?.unwrap_or("");
                let to = args.get(1).map(as_str).transpose()?.unwrap_or("");
                Ok(pure_str(s.replace(from, to)))
            }
            "split" => {
                let parts: Vec<Value> = match args.first() {
                    None => s.split_whitespace().map(|p| Value::Str(Rc::from(p))).collect(),
                    Some(sep) => {
                        let sep = as_str(sep)?;
                        s.split(sep).map(|p| Value::Str(Rc::from(p))).collect()
                    }
                };
                Ok(MethodEffect::Pure(Value::Tuple(parts.into())))
            }
            "join" => {
                let pieces = args.first().ok_or_else(|| type_error("iterable", &Value::None))?;
                let Value::Tuple(items) = pieces else {
                    return Err(type_error("tuple", pieces));
                };
                let mut out = String::new();
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push_str(s);
                    }
                    out.push_str(as_str(item)?);
                }
                Ok(pure_str(out))
            }
            "zfill" => {
                let arg = args.first().unwrap_or(&Value::Int(0.into())).clone();
                let Value::Int(width) = &arg else {
                    return Err(type_error("int", &arg));
                };
                let width: usize = width.to_string().parse().unwrap_or(0);
                Ok(pure_str(zfill(s, width)))
            }
            "isdigit" => Ok(MethodEffect::Pure(Value::Bool(!s.is_empty() && s.chars().all(|c| c.is_ascii_digit())))),
            "isalpha" => Ok(MethodEffect::Pure(Value::Bool(!s.is_empty() && s.chars().all(char::is_alphabetic)))),
            _ => unreachable!("filtered by caller"),
        }
    };
    if !KNOWN_METHODS.contains(&name) {
        return None;
    }
    Some(compute())
}

const KNOWN_METHODS: &[&str] = &[
    "upper", "lower", "title", "capitalize", "strip", "lstrip", "rstrip", "startswith", "endswith", "find", "index",
    "count", "replace", "split", "join", "zfill", "isdigit", "isalpha",
];

#[must_use]
pub fn known_name(name: &str) -> Option<&'static str> {
    KNOWN_METHODS.iter().copied().find(|&m| m == name)
}

fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut start_of_word = true;
    for c in s.chars() {
        if c.is_alphabetic() {
            out.extend(if start_of_word { c.to_uppercase().collect::<Vec<_>>() } else { c.to_lowercase().collect::<Vec<_>>() });
            start_of_word = false;
        } else {
            out.push(c);
            start_of_word = true;
        }
    }
    out
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
        None => String::new(),
    }
}

fn strip_chars(s: &str, args: &[Value], left: bool, right: bool) -> String {
    let cut: Option<Vec<char>> = match args.first() {
        Some(Value::Str(chars)) => Some(chars.chars().collect()),
        _ => None,
    };
    let pred = |c: char| cut.as_ref().map_or(c.is_whitespace(), |set| set.contains(&c));
    let mut out = s;
    if left {
        out = out.trim_start_matches(pred);
    }
    if right {
        out = out.trim_end_matches(pred);
    }
    out.to_owned()
}

fn zfill(s: &str, width: usize) -> String {
    if s.len() >= width {
        return s.to_owned();
    }
    let (sign, digits) = match s.strip_prefix(['+', '-']) {
        Some(rest) => (&s[..1], rest),
        None => ("", s),
    };
    format!("{sign}{:0>width$}", digits, width = width - sign.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(s: &str, name: &str, args: &[Value]) -> MethodEffect {
        dispatch(&Value::Str(Rc::from(s)), name, args).unwrap().unwrap()
    }

    #[test]
    fn upper_and_lower_round_trip() {
        assert!(matches!(call("Hi", "upper", &[]), MethodEffect::Pure(Value::Str(s)) if &*s == "HI"));
        assert!(matches!(call("Hi", "lower", &[]), MethodEffect::Pure(Value::Str(s)) if &*s == "hi"));
    }

    #[test]
    fn split_default_splits_on_whitespace() {
        let MethodEffect::Pure(Value::Tuple(items)) = call("a b  c", "split", &[]) else { panic!() };
        assert_eq!(items.len(), 3);
    }

    #[test]
    fn zfill_pads_preserving_sign() {
        assert!(matches!(call("-7", "zfill", &[Value::Int(3.into())]), MethodEffect::Pure(Value::Str(s)) if &*s == "-07"));
    }
}
