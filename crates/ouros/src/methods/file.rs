//! File-handle methods (`.read()`, `.write()`, `.close()`, ...).
//!
//! Unlike the other `methods/` dispatchers, a file handle's state lives in
//! [`Context`]'s handle registry rather than the [`crate::heap::Heap`], so
//! this dispatcher takes `&mut Context` instead of `&mut Heap` and is called
//! from a separate branch in the evaluator's method-call handling rather
//! than through [`super::bound_method`].

use std::rc::Rc;

use crate::{
    context::Context,
    exception::{ExcType, Exception},
    io::FilesystemBackend,
    resource::ResourceTracker,
    value::Value,
};

use super::MethodEffect;

fn type_error(expected: &str, got: &Value) -> Exception {
    Exception::new(ExcType::TypeError, format!("expected {expected}, got '{}'", got.type_name()))
}

const KNOWN_METHODS: &[&str] = &["read", "readline", "readlines", "write", "close"];

#[must_use]
pub fn is_file_method(name: &str) -> bool {
    KNOWN_METHODS.contains(&name)
}

#[must_use]
pub fn known_name(name: &str) -> Option<&'static str> {
    KNOWN_METHODS.iter().copied().find(|&m| m == name)
}

pub fn dispatch<R: ResourceTracker, FS: FilesystemBackend>(
    handle_id: u64,
    name: &str,
    args: &[Value],
    ctx: &mut Context<R, FS>,
) -> Option<Result<MethodEffect, Exception>> {
    if !is_file_method(name) {
        return None;
    }
    Some(dispatch_inner(handle_id, name, args, ctx))
}

fn dispatch_inner<R: ResourceTracker, FS: FilesystemBackend>(
    handle_id: u64,
    name: &str,
    args: &[Value],
    ctx: &mut Context<R, FS>,
) -> Result<MethodEffect, Exception> {
    match name {
        "read" => {
            let size = match args.first() {
                Some(Value::Int(n)) => Some(usize::try_from(n).map_err(|_| type_error("int", &args[0]))?),
                Some(Value::None) | None => None,
                Some(other) => return Err(type_error("int", other)),
            };
            let bytes = ctx.read_handle(handle_id, size)?;
            let text = String::from_utf8_lossy(&bytes).into_owned();
            Ok(MethodEffect::Pure(Value::Str(Rc::from(text.as_str()))))
        }
        "readline" => {
            let mut line = Vec::new();
            loop {
                let chunk = ctx.read_handle(handle_id, Some(1))?;
                if chunk.is_empty() {
                    break;
                }
                let ended = chunk[0] == b'\n';
                line.push(chunk[0]);
                if ended {
                    break;
                }
            }
            let text = String::from_utf8_lossy(&line).into_owned();
            Ok(MethodEffect::Pure(Value::Str(Rc::from(text.as_str()))))
        }
        "readlines" => {
            let bytes = ctx.read_handle(handle_id, None)?;
            let text = String::from_utf8_lossy(&bytes).into_owned();
            let lines: Vec<Value> = text.split_inclusive('\n').map(|l| Value::Str(Rc::from(l))).collect();
            Ok(MethodEffect::Pure(Value::Tuple(lines.into())))
        }
        "write" => {
            let arg = args.first().ok_or_else(|| type_error("str", &Value::None))?;
            let Value::Str(s) = arg else { return Err(type_error("str", arg)) };
            let len = s.len();
            ctx.write_handle(handle_id, s.as_bytes())?;
            Ok(MethodEffect::Pure(Value::Int(len.into())))
        }
        "close" => {
            ctx.close_handle(handle_id)?;
            Ok(MethodEffect::Pure(Value::None))
        }
        _ => unreachable!("filtered by caller"),
    }
}
