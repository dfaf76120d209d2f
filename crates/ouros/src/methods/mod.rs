//! Built-in method dispatch, per spec.md §4.5.
//!
//! [`bound_method`] is the single entry point the evaluator consults on
//! attribute access before falling through to instance/class attribute
//! resolution (`object::resolve_attr`). Each primitive type gets its own
//! file, mirroring the teacher's builtins-per-concern layout.

pub mod dict;
pub mod file;
pub mod list;
pub mod set;
pub mod string;
pub mod tuple;

use crate::{exception::Exception, heap::Heap, value::Value};

/// The effect of calling a built-in method, per spec.md §4.5.
#[derive(Debug, Clone)]
pub enum MethodEffect {
    /// No mutation; this is the call expression's value.
    Pure(Value),
    /// The receiver was mutated in place. `new_receiver` is written back to
    /// the binding site via `Environment::put_at_source` (a no-op for
    /// heap-handle receivers, since the handle itself never changes —
    /// mutation already landed in the heap slot).
    Mutating { new_receiver: Value, return_value: Value },
}

impl MethodEffect {
    #[must_use]
    pub fn into_return_value(self) -> Value {
        match self {
            MethodEffect::Pure(v) | MethodEffect::Mutating { return_value: v, .. } => v,
        }
    }
}

/// Looks up and invokes a built-in method named `name` on `receiver`, if
/// one exists for its type. Returns `None` when `name` isn't a recognized
/// built-in method (the evaluator then falls through to attribute
/// resolution, which may still find a user-defined method of that name).
pub fn bound_method(receiver: &Value, name: &str, args: &[Value], heap: &mut Heap) -> Option<Result<MethodEffect, Exception>> {
    match receiver {
        Value::Str(_) => string::dispatch(receiver, name, args),
        Value::List(id) => list::dispatch(*id, name, args, heap),
        Value::Dict(id) => dict::dispatch(*id, name, args, heap),
        Value::Set(id) => set::dispatch(*id, name, args, heap),
        Value::Tuple(items) => tuple::dispatch(items, name, args),
        _ => None,
    }
}
