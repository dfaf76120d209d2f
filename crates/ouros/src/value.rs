//! The tagged sum of every runtime value, per spec.md §3.
//!
//! Containers (list/dict/set/class/instance/generator) carry a [`HeapId`]
//! handle rather than their data; immutable aggregates (string, tuple) carry
//! their data directly behind an `Rc` since Python never mutates them in
//! place. Equality, truthiness, and hashing for dict/set keys live in
//! `evaluator::operators` and here respectively, since comparing containers
//! needs heap access that `Value` alone doesn't have.

use std::{fmt, rc::Rc};

use num_bigint::BigInt;

use crate::{
    exception::{ExcType, Exception},
    heap::HeapId,
    intern::StringId,
};

/// The receiver + implementation of a user-defined function.
#[derive(Debug, Clone)]
pub struct FunctionValue {
    pub name: StringId,
    pub params: Rc<crate::ast::Params>,
    pub body: Rc<[crate::ast::Stmt]>,
    /// The environment captured at `def`-time, enabling closures.
    pub captured_env: crate::environment::Environment,
    pub is_generator: bool,
    pub decorators: Rc<[crate::ast::Expr]>,
}

/// Which calling convention a built-in callable uses, per spec.md §3.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinArity {
    /// `f(args...)`, no keyword handling.
    Plain,
    /// A type constructor (`int(...)`, `list(...)`, ...).
    TypeConstructor,
    /// Accepts keyword arguments (`sorted(x, key=..., reverse=...)`).
    KeywordAware,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuiltinFunction {
    pub name: &'static str,
    pub arity: BuiltinArity,
}

#[derive(Debug, Clone)]
pub struct BoundMethod {
    pub receiver: Box<Value>,
    pub callable: Box<Value>,
    /// The class a method was looked up on, recorded so `super()` called
    /// from inside it can skip that class in the MRO walk.
    pub defining_class: Option<HeapId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeValue {
    pub start: i64,
    pub stop: i64,
    pub step: i64,
}

impl RangeValue {
    #[must_use]
    pub fn len(&self) -> usize {
        if self.step == 0 {
            return 0;
        }
        let diff = if self.step > 0 {
            self.stop - self.start
        } else {
            self.start - self.stop
        };
        if diff <= 0 {
            0
        } else {
            let step_abs = self.step.unsigned_abs();
            ((diff.unsigned_abs()) as u64 + step_abs - 1) as usize / step_abs as usize
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn nth(&self, i: usize) -> i64 {
        self.start + self.step * i as i64
    }

    #[must_use]
    pub fn to_vec(&self) -> Vec<i64> {
        (0..self.len()).map(|i| self.nth(i)).collect()
    }
}

#[derive(Debug, Clone)]
pub struct SuperValue {
    pub instance: Box<Value>,
    /// Remaining classes in the MRO to search, starting *after* the class
    /// `super()` was called from.
    pub remaining_mro: Rc<[HeapId]>,
}

/// Every runtime value, per spec.md §3.
#[derive(Debug, Clone)]
pub enum Value {
    Int(BigInt),
    Float(f64),
    Bool(bool),
    None,
    Str(Rc<str>),
    List(HeapId),
    Tuple(Rc<[Value]>),
    Dict(HeapId),
    Set(HeapId),
    Range(RangeValue),
    Function(Rc<FunctionValue>),
    Builtin(BuiltinFunction),
    BoundMethod(Rc<BoundMethod>),
    Class(HeapId),
    Instance(HeapId),
    FileHandle(u64),
    Iterator(u64),
    Generator(HeapId),
    Super(Rc<SuperValue>),
}

impl Value {
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Bool(_) => "bool",
            Value::None => "NoneType",
            Value::Str(_) => "str",
            Value::List(_) => "list",
            Value::Tuple(_) => "tuple",
            Value::Dict(_) => "dict",
            Value::Set(_) => "set",
            Value::Range(_) => "range",
            Value::Function(_) => "function",
            Value::Builtin(_) => "builtin_function_or_method",
            Value::BoundMethod(_) => "method",
            Value::Class(_) => "type",
            Value::Instance(_) => "object",
            Value::FileHandle(_) => "file",
            Value::Iterator(_) => "iterator",
            Value::Generator(_) => "generator",
            Value::Super(_) => "super",
        }
    }
}

/// A hashable projection of a [`Value`], used as dict/set keys.
///
/// Mirrors CPython's rule that `hash(1) == hash(True) == hash(1.0)`: numeric
/// values are normalized to a single representation regardless of which
/// numeric `Value` variant produced them, so `{1: "a"}[True]` finds the same
/// slot `{1: "a"}[1]` does.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PyKey {
    Int(BigInt),
    /// Float bit pattern, used only for non-integral floats; integral
    /// floats (`2.0`) normalize to `Int` so they hash-equal `2`.
    Float(u64),
    Str(Rc<str>),
    None,
    Tuple(Rc<[PyKey]>),
}

impl PyKey {
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            PyKey::Int(i) => Value::Int(i.clone()),
            PyKey::Float(bits) => Value::Float(f64::from_bits(*bits)),
            PyKey::Str(s) => Value::Str(s.clone()),
            PyKey::None => Value::None,
            PyKey::Tuple(items) => Value::Tuple(items.iter().map(PyKey::to_value).collect()),
        }
    }

    /// Projects a [`Value`] to its dict/set key, rejecting the mutable
    /// container types Python itself treats as unhashable.
    pub fn from_value(value: &Value) -> Result<PyKey, Exception> {
        match value {
            Value::Int(i) => Ok(PyKey::Int(i.clone())),
            Value::Bool(b) => Ok(PyKey::Int(BigInt::from(u8::from(*b)))),
            Value::Float(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e18 => {
                Ok(PyKey::Int(BigInt::from(*f as i64)))
            }
            Value::Float(f) => Ok(PyKey::Float(f.to_bits())),
            Value::Str(s) => Ok(PyKey::Str(s.clone())),
            Value::None => Ok(PyKey::None),
            Value::Tuple(items) => {
                let keys = items.iter().map(PyKey::from_value).collect::<Result<Vec<_>, _>>()?;
                Ok(PyKey::Tuple(keys.into()))
            }
            other => Err(Exception::new(ExcType::TypeError, format!("unhashable type: '{}'", other.type_name()))),
        }
    }
}

impl fmt::Display for RangeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "range({}, {}, {})", self.start, self.stop, self.step)
    }
}
